//! Tensor-to-tile placement decoded from a compile-end event.
//!
//! The compiler emits each tensor as an 8-element array:
//! `[inst, index, shape, dtype, has_constant, has_aliases, num_elements, tiles]`
//! where `tiles` is a list of `[tile_id, element_count]` pairs.

use crate::utils::error::{PayloadError, QueryError};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

/// Elements of a tensor placed on one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub tile: u64,
    pub num_elements: u64,
}

/// A single output tensor of an instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// Name of the producing instruction
    pub inst: String,
    /// Output index on that instruction
    pub index: u64,
    pub shape: Vec<u64>,
    pub dtype: String,
    pub has_constant: bool,
    pub has_aliases: bool,
    pub num_elements: u64,
    pub tiles: Vec<Tile>,
}

impl Tensor {
    /// Distinct tiles this tensor is spread over
    pub fn tile_ids(&self) -> BTreeSet<u64> {
        self.tiles.iter().map(|t| t.tile).collect()
    }
}

type RawTensor = (String, u64, Vec<u64>, String, u8, u8, u64, Vec<(u64, u64)>);

#[derive(Deserialize)]
struct RawTensorMap {
    mappings: BTreeMap<String, Vec<RawTensor>>,
}

/// Tensor placement for every computation of a compiled program
#[derive(Debug, Clone, PartialEq)]
pub struct TensorMap {
    num_tiles_per_ipu: f64,
    mappings: BTreeMap<String, Vec<Tensor>>,
}

impl TensorMap {
    /// Parse a tensor map payload.
    ///
    /// `num_tiles` bounds every tile id; an empty payload yields an empty map.
    pub fn from_json(text: &str, num_tiles_per_ipu: f64, num_tiles: u64) -> Result<Self, PayloadError> {
        if text.trim().is_empty() {
            return Ok(Self::empty(num_tiles_per_ipu));
        }

        let raw: RawTensorMap = serde_json::from_str(text)?;
        let mut mappings = BTreeMap::new();

        for (computation, raw_tensors) in raw.mappings {
            let mut tensors = Vec::with_capacity(raw_tensors.len());

            for (inst, index, shape, dtype, has_constant, has_aliases, num_elements, raw_tiles) in
                raw_tensors
            {
                let mut tiles = Vec::with_capacity(raw_tiles.len());
                for (tile, count) in raw_tiles {
                    if tile >= num_tiles {
                        return Err(PayloadError::Schema(format!(
                            "tensor {}:{} in {} is mapped to tile {} but the target has {} tiles",
                            inst, index, computation, tile, num_tiles
                        )));
                    }
                    tiles.push(Tile {
                        tile,
                        num_elements: count,
                    });
                }

                tensors.push(Tensor {
                    inst,
                    index,
                    shape,
                    dtype,
                    has_constant: has_constant != 0,
                    has_aliases: has_aliases != 0,
                    num_elements,
                    tiles,
                });
            }

            mappings.insert(computation, tensors);
        }

        Ok(Self {
            num_tiles_per_ipu,
            mappings,
        })
    }

    pub fn empty(num_tiles_per_ipu: f64) -> Self {
        Self {
            num_tiles_per_ipu,
            mappings: BTreeMap::new(),
        }
    }

    pub fn num_tiles_per_ipu(&self) -> f64 {
        self.num_tiles_per_ipu
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Computation names, sorted
    pub fn computation_names(&self) -> Vec<String> {
        self.mappings.keys().cloned().collect()
    }

    pub fn tensors(&self, computation: &str) -> Result<&[Tensor], QueryError> {
        self.mappings
            .get(computation)
            .map(Vec::as_slice)
            .ok_or_else(|| QueryError::UnknownComputation(computation.to_string()))
    }

    pub fn all_tensors(&self) -> impl Iterator<Item = &Tensor> {
        self.mappings.values().flatten()
    }

    /// Tiles used by the given computations, or by every computation when
    /// `computations` is empty
    pub fn tile_ids<S: AsRef<str>>(&self, computations: &[S]) -> Result<BTreeSet<u64>, QueryError> {
        let mut ids = BTreeSet::new();

        if computations.is_empty() {
            for tensor in self.all_tensors() {
                ids.extend(tensor.tile_ids());
            }
            return Ok(ids);
        }

        for computation in computations {
            for tensor in self.tensors(computation.as_ref())? {
                ids.extend(tensor.tile_ids());
            }
        }

        Ok(ids)
    }

    /// IPUs used by the given computations (see [`TensorMap::tile_ids`])
    pub fn ipu_ids<S: AsRef<str>>(&self, computations: &[S]) -> Result<BTreeSet<u64>, QueryError> {
        Ok(self
            .tile_ids(computations)?
            .into_iter()
            .map(|tile| ipu_of_tile(tile, self.num_tiles_per_ipu))
            .collect())
    }
}

/// IPU hosting `tile`, floor-dividing by a possibly fractional tiles-per-IPU
pub fn ipu_of_tile(tile: u64, num_tiles_per_ipu: f64) -> u64 {
    (tile as f64 / num_tiles_per_ipu).floor() as u64
}
