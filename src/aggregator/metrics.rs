//! Memory metrics calculated from a compilation report.
//!
//! Tile memory is the main constraint when fitting a model onto IPUs; an
//! uneven distribution usually means one tile will overflow first.

use crate::parser::{ipu_of_tile, DecodedReport};
use crate::utils::error::QueryError;
use log::debug;
use serde::{Deserialize, Serialize};

/// Tile memory distribution statistics
///
/// **Public** - returned from calculate_memory_distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDistribution {
    /// Number of tiles reported
    pub tile_count: usize,

    /// Bytes across all tiles
    pub total: u64,

    /// Bytes on the fullest tile
    pub max: u64,

    /// Bytes on the emptiest tile
    pub min: u64,

    /// Mean bytes per tile
    pub mean: u64,

    /// Always-live bytes across all tiles
    pub always_live: u64,

    /// Index of the fullest tile
    pub busiest_tile: Option<usize>,
}

/// Calculate the tile memory distribution of a decoded report
///
/// **Public** - main entry point for metrics calculation
///
/// # Errors
/// * `QueryError::MissingEvent` - no compile-end event was decoded
pub fn calculate_memory_distribution(report: &DecodedReport) -> Result<MemoryDistribution, QueryError> {
    let tiles = report.each_tile_memory()?;
    let always_live = report.always_live_memory()?;

    if tiles.is_empty() {
        return Ok(MemoryDistribution {
            always_live,
            ..Default::default()
        });
    }

    let total: u64 = tiles.iter().sum();
    let busiest = tiles
        .iter()
        .enumerate()
        .max_by_key(|(index, bytes)| (**bytes, std::cmp::Reverse(*index)))
        .map(|(index, _)| index);

    let distribution = MemoryDistribution {
        tile_count: tiles.len(),
        total,
        max: tiles.iter().copied().max().unwrap_or(0),
        min: tiles.iter().copied().min().unwrap_or(0),
        mean: total / tiles.len() as u64,
        always_live,
        busiest_tile: busiest,
    };

    debug!("Memory distribution: {}", distribution.summary());

    Ok(distribution)
}

/// Bytes used on each IPU, folding tiles with the report's tiles-per-IPU
///
/// The result covers the IPUs the reported tiles map to, so it never
/// grows past one entry per tile whatever the target claims.
pub fn ipu_memory(report: &DecodedReport) -> Result<Vec<u64>, QueryError> {
    let tiles = report.each_tile_memory()?;
    let tiles_per_ipu = report.num_tiles_per_ipu()?;
    let mapped_ipus = match tiles.len() {
        0 => 0,
        n => ipu_of_tile(n as u64 - 1, tiles_per_ipu).saturating_add(1),
    };
    let len = mapped_ipus.min(report.num_ipus()?).min(tiles.len() as u64) as usize;
    let mut per_ipu = vec![0u64; len];

    for (tile, bytes) in tiles.iter().enumerate() {
        let ipu = ipu_of_tile(tile as u64, tiles_per_ipu) as usize;
        if ipu >= per_ipu.len() {
            per_ipu.resize(ipu + 1, 0);
        }
        per_ipu[ipu] += bytes;
    }

    Ok(per_ipu)
}

impl MemoryDistribution {
    /// Check if the fullest tile uses more than twice the mean
    ///
    /// **Public** - flags layouts likely to run out of memory on one tile
    pub fn is_imbalanced(&self) -> bool {
        self.tile_count > 0 && self.max > self.mean.saturating_mul(2)
    }

    /// Get human-readable summary
    ///
    /// **Public** - for logging and debugging
    pub fn summary(&self) -> String {
        format!(
            "Total: {} bytes | Tiles: {} | Mean: {} | Max: {} | Min: {} | Always live: {}",
            self.total, self.tile_count, self.mean, self.max, self.min, self.always_live
        )
    }
}
