//! Expectation files and batch checking.
//!
//! Loads a TOML description of what a compiled program should look like
//! and runs every configured check against a decoded report.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::assertions::{self, CheckOutcome};
use crate::parser::DecodedReport;
use crate::utils::config::DEFAULT_TOLERANCE;
use crate::utils::error::CheckError;

/// Complete expectation configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Expectations {
    /// Event-level expectations
    #[serde(default)]
    pub events: EventExpectations,

    #[serde(default)]
    pub compute_sets: NameExpectations,

    #[serde(default)]
    pub global_exchanges: GlobalExchangeExpectations,

    #[serde(default)]
    pub vertices: VertexExpectations,

    #[serde(default)]
    pub memory: MemoryExpectations,

    /// Pipeline stage placement (optional)
    #[serde(default)]
    pub pipeline: Option<PipelineExpectations>,

    #[serde(default)]
    pub transfers: TransferExpectations,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EventExpectations {
    /// Exact number of trace records
    pub count: Option<usize>,

    /// Require a compile-end event with a report
    #[serde(default)]
    pub require_compile_end: bool,

    /// Require that the program has no compute sets
    #[serde(default)]
    pub no_compute_sets: bool,
}

/// Pattern lists for compute set names
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NameExpectations {
    /// Every name must match an entry and every entry must match a name
    pub whitelist: Option<Vec<String>>,

    /// Every entry must match at least one name
    pub contains: Option<Vec<String>>,

    /// No name may match an entry
    pub blacklist: Option<Vec<String>>,

    /// Exact match counts, pattern -> count
    pub matches: Option<Vec<MatchCount>>,
}

/// Global exchange program names
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalExchangeExpectations {
    /// Every exchange must match an entry and every entry must match an exchange
    pub whitelist: Option<Vec<String>>,
}

/// Vertex type names
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VertexExpectations {
    /// Every entry must match at least one vertex type
    pub contains: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MatchCount {
    pub pattern: String,
    pub count: usize,
}

/// Memory expectations in bytes
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryExpectations {
    /// Relative tolerance, defaults to `DEFAULT_TOLERANCE`
    pub tolerance: Option<f64>,
    pub total: Option<u64>,
    pub max_tile: Option<u64>,
    pub always_live: Option<u64>,
    /// Upper bound for every tile
    pub each_tile_below: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineExpectations {
    /// IPU expected for each stage, by stage index
    pub expected_ipus: Vec<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransferExpectations {
    pub host_to_device: Option<Vec<String>>,
    pub device_to_host: Option<Vec<String>>,
}

impl Expectations {
    pub fn from_toml(contents: &str) -> Result<Self, CheckError> {
        let expectations: Expectations = toml::from_str(contents)?;
        expectations.validate()?;
        Ok(expectations)
    }

    fn validate(&self) -> Result<(), CheckError> {
        if let Some(tolerance) = self.memory.tolerance {
            if !(0.0..1.0).contains(&tolerance) {
                return Err(CheckError::InvalidExpectations(format!(
                    "memory.tolerance must be in [0, 1), got {}",
                    tolerance
                )));
            }
        }
        Ok(())
    }

    pub fn tolerance(&self) -> f64 {
        self.memory.tolerance.unwrap_or(DEFAULT_TOLERANCE)
    }
}

/// Load expectations from a TOML file
///
/// # Errors
/// * `CheckError::IoError` - If file cannot be read
/// * `CheckError::ParseFailed` - If TOML is invalid
/// * `CheckError::InvalidExpectations` - If a value is out of range
pub fn load_expectations(path: impl AsRef<Path>) -> Result<Expectations, CheckError> {
    let contents = fs::read_to_string(path)?;
    Expectations::from_toml(&contents)
}

/// Outcomes of a batch of checks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckReport {
    pub outcomes: Vec<CheckOutcome>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// "PASSED" or "FAILED"
    pub fn status(&self) -> &'static str {
        if self.passed() {
            "PASSED"
        } else {
            "FAILED"
        }
    }
}

/// Run every check configured in `expectations`
pub fn run_checks(report: &DecodedReport, expectations: &Expectations) -> CheckReport {
    let mut outcomes = Vec::new();

    let events = &expectations.events;
    if let Some(count) = events.count {
        outcomes.push(assertions::event_count(report, count));
    }
    if events.require_compile_end {
        outcomes.push(assertions::contains_one_compile_event(report));
    }
    if events.no_compute_sets {
        outcomes.push(assertions::no_compute_set(report));
    }

    let cs = &expectations.compute_sets;
    if let Some(ok) = &cs.whitelist {
        outcomes.push(assertions::all_compute_sets_and_list(report, ok));
    }
    if let Some(ok) = &cs.contains {
        outcomes.push(assertions::compute_sets_contain_list(report, ok));
    }
    if let Some(blacklist) = &cs.blacklist {
        outcomes.push(assertions::compute_sets_not_in_blacklist(report, blacklist));
    }
    for m in cs.matches.iter().flatten() {
        outcomes.push(assertions::compute_sets_matches(report, &m.pattern, m.count));
    }

    if let Some(ok) = &expectations.global_exchanges.whitelist {
        outcomes.push(assertions::all_global_exchanges_and_list(report, ok));
    }
    if let Some(ok) = &expectations.vertices.contains {
        outcomes.push(assertions::vertices_contain_list(report, ok));
    }

    let memory = &expectations.memory;
    let tolerance = expectations.tolerance();
    if let Some(expected) = memory.total {
        outcomes.push(assertions::total_tile_memory(report, expected, tolerance));
    }
    if let Some(expected) = memory.max_tile {
        outcomes.push(assertions::max_tile_memory(report, expected, tolerance));
    }
    if let Some(expected) = memory.always_live {
        outcomes.push(assertions::always_live_memory(report, expected, tolerance));
    }
    if let Some(expected) = memory.each_tile_below {
        outcomes.push(assertions::each_tile_memory_is_less_than(report, expected, tolerance));
    }

    if let Some(pipeline) = &expectations.pipeline {
        outcomes.push(assertions::pipeline_stages_on_expected_ipu(
            report,
            &pipeline.expected_ipus,
        ));
    }

    if let Some(names) = &expectations.transfers.host_to_device {
        outcomes.push(assertions::host_to_device_event_names(report, names));
    }
    if let Some(names) = &expectations.transfers.device_to_host {
        outcomes.push(assertions::device_to_host_event_names(report, names));
    }

    CheckReport { outcomes }
}
