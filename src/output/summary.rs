//! Summary JSON schema.
//!
//! A compact, versioned snapshot of a decoded report, suitable for
//! archiving alongside test artifacts or comparing between runs.

use crate::aggregator::{calculate_memory_distribution, MemoryDistribution};
use crate::parser::DecodedReport;
use crate::utils::config::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level summary structure written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Schema version for compatibility checking
    pub version: String,

    /// Where the trace records came from (usually a file path)
    pub source: String,

    /// Number of events of each kind, keyed by protocol name
    pub event_counts: BTreeMap<String, usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ipus: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_tiles: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiles_per_ipu: Option<f64>,

    /// Tile memory statistics (absent without a compilation report)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryDistribution>,

    pub compute_set_count: usize,
    pub vertex_type_count: usize,
    pub program_count: usize,
    pub execution_report_count: usize,

    /// Records whose payload could not be decoded
    pub skipped_records: usize,

    /// Timestamp when the summary was generated
    pub generated_at: String,
}

/// Convert a decoded report to the summary format
///
/// **Public** - used by commands to create final output
pub fn to_summary(report: &DecodedReport, source: &str) -> ReportSummary {
    use chrono::Utc;

    let event_counts = report
        .event_counts()
        .iter()
        .map(|(kind, count)| (kind.as_str().to_string(), *count))
        .collect();

    ReportSummary {
        version: SCHEMA_VERSION.to_string(),
        source: source.to_string(),
        event_counts,
        num_ipus: report.num_ipus().ok(),
        num_tiles: report.num_tiles().ok(),
        tiles_per_ipu: report.num_tiles_per_ipu().ok(),
        memory: calculate_memory_distribution(report).ok(),
        compute_set_count: report.compute_sets().map(|c| c.len()).unwrap_or(0),
        vertex_type_count: report.vertices().map(|v| v.len()).unwrap_or(0),
        program_count: report.programs().map(|p| p.len()).unwrap_or(0),
        execution_report_count: report.execution_reports().map(|r| r.len()).unwrap_or(0),
        skipped_records: report.skipped_count(),
        generated_at: Utc::now().to_rfc3339(),
    }
}
