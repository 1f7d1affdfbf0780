//! JSON payload schemas.
//!
//! These mirror the parts of the IPU compiler's JSON reports that we read.
//! Required fields are enforced at decode time; any additional keys in the
//! producer's output are ignored.

use crate::utils::error::PayloadError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decoded payload of a compile-end event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationReport {
    /// Device description the program was compiled for
    pub target: Target,

    /// Tile memory usage
    pub memory: Memory,

    pub vertex_types: NameList,

    pub compute_sets: NameList,

    /// Programs in execution order
    pub programs: Vec<Program>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    #[serde(rename = "numIPUs")]
    pub num_ipus: u64,

    #[serde(rename = "numTiles")]
    pub num_tiles: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub by_tile: TileTotals,
    pub liveness: Liveness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileTotals {
    /// Bytes used on each tile, excluding gaps
    pub total: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liveness {
    pub always_live: AlwaysLive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlwaysLive {
    pub bytes_by_tile: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameList {
    pub names: Vec<String>,
}

/// A program entry of the compilation report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Program type tag (e.g. "GlobalExchange")
    #[serde(rename = "type")]
    pub program_type: String,

    pub name: String,
}

impl CompilationReport {
    /// Parse and validate a compilation report payload
    pub fn from_json(text: &str) -> Result<Self, PayloadError> {
        let report: CompilationReport = serde_json::from_str(text)?;
        report.validate()?;
        Ok(report)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        if self.target.num_ipus == 0 {
            return Err(PayloadError::Schema("target.numIPUs must be positive".to_string()));
        }
        if self.target.num_tiles < self.target.num_ipus {
            return Err(PayloadError::Schema(format!(
                "target.numTiles ({}) is smaller than target.numIPUs ({})",
                self.target.num_tiles, self.target.num_ipus
            )));
        }
        Ok(())
    }

    /// Tiles per IPU as a real quotient.
    ///
    /// Tile to IPU mapping floor-divides by this value, so a non-integral
    /// quotient is kept as is rather than rounded.
    pub fn tiles_per_ipu(&self) -> f64 {
        self.target.num_tiles as f64 / self.target.num_ipus as f64
    }
}

/// Decoded payload of a host/device transfer event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransfer {
    pub tensors: Vec<TransferredTensor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferredTensor {
    pub name: String,
}

impl DataTransfer {
    pub fn from_json(text: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn names(&self) -> Vec<String> {
        self.tensors.iter().map(|t| t.name.clone()).collect()
    }
}

/// Role of an instruction in a training or inference graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MlType {
    InferenceFwd,
    TrainingFwd,
    TrainingBwd,
    TrainingWu,
}

impl MlType {
    /// All ML types, ordered by their 1-based code
    pub const ALL: [MlType; 4] = [
        Self::InferenceFwd,
        Self::TrainingFwd,
        Self::TrainingBwd,
        Self::TrainingWu,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::InferenceFwd),
            2 => Some(Self::TrainingFwd),
            3 => Some(Self::TrainingBwd),
            4 => Some(Self::TrainingWu),
            _ => None,
        }
    }
}

/// Per-instruction metadata attached to a compile-end event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstructionInfo {
    /// Instruction name -> ML type code
    #[serde(default)]
    pub ml_types: BTreeMap<String, u32>,
}

impl InstructionInfo {
    /// Parse an instruction info payload; an empty payload means no info
    pub fn from_json(text: &str) -> Result<Self, PayloadError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report_json() -> serde_json::Value {
        json!({
            "target": {"numIPUs": 2, "numTiles": 4, "architecture": "ipu1"},
            "memory": {
                "byTile": {"total": [10, 20, 30, 40], "totalIncludingGaps": [11, 21, 31, 41]},
                "liveness": {"alwaysLive": {"bytesByTile": [1, 2, 3, 4]}}
            },
            "vertexTypes": {"names": ["poplin::ConvPartial1x1Out"]},
            "computeSets": {"names": ["convXXX/Conv2D", "poolXXX"]},
            "programs": [{"type": "Sequence", "name": "main"}, {"type": "GlobalExchange", "name": "gx0"}]
        })
    }

    #[test]
    fn test_parse_report_ignores_extra_keys() {
        let report = CompilationReport::from_json(&report_json().to_string()).unwrap();

        assert_eq!(report.target.num_ipus, 2);
        assert_eq!(report.memory.by_tile.total, vec![10, 20, 30, 40]);
        assert_eq!(report.memory.liveness.always_live.bytes_by_tile.len(), 4);
        assert_eq!(report.programs[1].program_type, "GlobalExchange");
        assert_eq!(report.tiles_per_ipu(), 2.0);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let mut value = report_json();
        value.as_object_mut().unwrap().remove("computeSets");

        let err = CompilationReport::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, PayloadError::Json(_)));
    }

    #[test]
    fn test_zero_ipus_rejected() {
        let mut value = report_json();
        value["target"]["numIPUs"] = json!(0);

        let err = CompilationReport::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, PayloadError::Schema(_)));
    }

    #[test]
    fn test_fractional_tiles_per_ipu() {
        let mut value = report_json();
        value["target"]["numIPUs"] = json!(3);
        value["target"]["numTiles"] = json!(4);

        let report = CompilationReport::from_json(&value.to_string()).unwrap();
        assert!((report.tiles_per_ipu() - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_instruction_info_empty_payload() {
        let info = InstructionInfo::from_json("").unwrap();
        assert!(info.ml_types.is_empty());
    }

    #[test]
    fn test_data_transfer_names() {
        let transfer =
            DataTransfer::from_json(r#"{"tensors": [{"name": "a", "size": 4}, {"name": "b"}]}"#)
                .unwrap();
        assert_eq!(transfer.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_ml_type_codes() {
        assert_eq!(MlType::from_code(1), Some(MlType::InferenceFwd));
        assert_eq!(MlType::from_code(4), Some(MlType::TrainingWu));
        assert_eq!(MlType::from_code(0), None);
    }
}
