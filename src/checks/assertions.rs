//! Individual report checks.
//!
//! Each check inspects a [`DecodedReport`] and returns a [`CheckOutcome`]
//! rather than failing; callers decide whether a failed outcome is a test
//! failure or an exit code. A query error (e.g. no compile-end event) is
//! itself reported as a failed outcome.

use crate::matching::{
    check_whitelist, count_matches_in_list, items_matching_at_least_one_pattern,
    missing_whitelist_entries_in_names, names_in_blacklist,
};
use crate::parser::DecodedReport;
use crate::utils::config::{GLOBAL_EXCHANGE_PROGRAM_TYPE, STAGE_PATTERN_PREFIX};
use crate::utils::error::QueryError;
use serde::{Deserialize, Serialize};

/// Result of one check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Check identifier, e.g. "compute_sets.whitelist"
    pub name: String,
    pub passed: bool,
    /// Offending items or explanatory lines when the check failed
    pub details: Vec<String>,
}

impl CheckOutcome {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            details: Vec::new(),
        }
    }

    fn fail(name: &str, details: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            details,
        }
    }

    fn from_details(name: &str, details: Vec<String>) -> Self {
        if details.is_empty() {
            Self::pass(name)
        } else {
            Self::fail(name, details)
        }
    }

    fn from_query(name: &str, err: QueryError) -> Self {
        Self::fail(name, vec![err.to_string()])
    }
}

macro_rules! query_or_fail {
    ($name:expr, $query:expr) => {
        match $query {
            Ok(value) => value,
            Err(e) => return CheckOutcome::from_query($name, e),
        }
    };
}

fn whitelist_details(kind: &str, check: crate::matching::WhitelistCheck) -> Vec<String> {
    let mut details = Vec::new();
    for entry in check.unmatched_entries {
        details.push(format!("whitelist entry not found in {}: {}", kind, entry));
    }
    for name in check.unmatched_names {
        details.push(format!("{} not in whitelist: {}", kind, name));
    }
    details
}

/// Every compute set is whitelisted and every whitelist entry is used
pub fn all_compute_sets_and_list<P: AsRef<str>>(report: &DecodedReport, ok: &[P]) -> CheckOutcome {
    const NAME: &str = "compute_sets.whitelist";
    let names = query_or_fail!(NAME, report.compute_sets());
    CheckOutcome::from_details(NAME, whitelist_details("compute sets", check_whitelist(names, ok)))
}

/// Every global exchange program is whitelisted and every entry is used
pub fn all_global_exchanges_and_list<P: AsRef<str>>(report: &DecodedReport, ok: &[P]) -> CheckOutcome {
    const NAME: &str = "global_exchanges.whitelist";
    let names = query_or_fail!(NAME, report.program_names_of_type(GLOBAL_EXCHANGE_PROGRAM_TYPE));
    CheckOutcome::from_details(
        NAME,
        whitelist_details("global exchanges", check_whitelist(&names, ok)),
    )
}

/// Every whitelist entry matches at least one compute set
pub fn compute_sets_contain_list<P: AsRef<str>>(report: &DecodedReport, ok: &[P]) -> CheckOutcome {
    const NAME: &str = "compute_sets.contains";
    let names = query_or_fail!(NAME, report.compute_sets());
    CheckOutcome::from_details(NAME, missing_whitelist_entries_in_names(names, ok))
}

/// No compute set matches a blacklist entry
pub fn compute_sets_not_in_blacklist<P: AsRef<str>>(
    report: &DecodedReport,
    blacklist: &[P],
) -> CheckOutcome {
    const NAME: &str = "compute_sets.blacklist";
    let names = query_or_fail!(NAME, report.compute_sets());
    CheckOutcome::from_details(NAME, names_in_blacklist(names, blacklist))
}

/// Every whitelist entry matches at least one vertex type
pub fn vertices_contain_list<P: AsRef<str>>(report: &DecodedReport, ok: &[P]) -> CheckOutcome {
    const NAME: &str = "vertices.contains";
    let names = query_or_fail!(NAME, report.vertices());
    CheckOutcome::from_details(NAME, missing_whitelist_entries_in_names(names, ok))
}

/// Exactly `expected` compute sets match `pattern`
pub fn compute_sets_matches(report: &DecodedReport, pattern: &str, expected: usize) -> CheckOutcome {
    const NAME: &str = "compute_sets.matches";
    let names = query_or_fail!(NAME, report.compute_sets());
    let actual = count_matches_in_list(names, pattern);

    if actual == expected {
        CheckOutcome::pass(NAME)
    } else {
        CheckOutcome::fail(
            NAME,
            vec![format!(
                "expected {} compute sets matching '{}', found {}",
                expected, pattern, actual
            )],
        )
    }
}

/// The compiled program contains no compute sets (passes without a report)
pub fn no_compute_set(report: &DecodedReport) -> CheckOutcome {
    const NAME: &str = "compute_sets.none";
    match report.compute_sets() {
        Ok(names) if !names.is_empty() => CheckOutcome::fail(NAME, names.to_vec()),
        _ => CheckOutcome::pass(NAME),
    }
}

pub fn contains_one_compile_event(report: &DecodedReport) -> CheckOutcome {
    const NAME: &str = "events.compile_end";
    if report.has_compile_end() {
        CheckOutcome::pass(NAME)
    } else {
        CheckOutcome::fail(NAME, vec!["no compile-end event with a report".to_string()])
    }
}

/// The decoded record count equals `expected`
pub fn event_count(report: &DecodedReport, expected: usize) -> CheckOutcome {
    const NAME: &str = "events.count";
    let actual = report.record_count();
    if actual == expected {
        CheckOutcome::pass(NAME)
    } else {
        CheckOutcome::fail(NAME, vec![format!("expected {} events, found {}", expected, actual)])
    }
}

fn within(name: &str, what: &str, actual: u64, low: u64, high: u64) -> CheckOutcome {
    if (low..=high).contains(&actual) {
        CheckOutcome::pass(name)
    } else {
        CheckOutcome::fail(
            name,
            vec![format!("{} {} outside [{}, {}]", what, actual, low, high)],
        )
    }
}

/// `[int(expected * (1 - tol)), int(expected * (1 + tol))]`
fn tolerance_range(expected: u64, tolerance: f64) -> (u64, u64) {
    let low = (expected as f64 * (1.0 - tolerance)) as u64;
    let high = (expected as f64 * (1.0 + tolerance)) as u64;
    (low, high)
}

/// Every tile uses at most `expected * (1 + tolerance)` bytes
pub fn each_tile_memory_is_less_than(report: &DecodedReport, expected: u64, tolerance: f64) -> CheckOutcome {
    const NAME: &str = "memory.each_tile";
    let tiles = query_or_fail!(NAME, report.each_tile_memory());
    let (_, high) = tolerance_range(expected, tolerance);

    let details = tiles
        .iter()
        .enumerate()
        .filter(|(_, bytes)| **bytes > high)
        .map(|(tile, bytes)| format!("tile {} uses {} bytes (limit {})", tile, bytes, high))
        .collect();

    CheckOutcome::from_details(NAME, details)
}

pub fn total_tile_memory(report: &DecodedReport, expected: u64, tolerance: f64) -> CheckOutcome {
    const NAME: &str = "memory.total";
    let actual = query_or_fail!(NAME, report.total_tile_memory());
    let (low, high) = tolerance_range(expected, tolerance);
    within(NAME, "total tile memory", actual, low, high)
}

pub fn max_tile_memory(report: &DecodedReport, expected: u64, tolerance: f64) -> CheckOutcome {
    const NAME: &str = "memory.max_tile";
    let actual = query_or_fail!(NAME, report.max_tile_memory());
    let (low, high) = tolerance_range(expected, tolerance);
    within(NAME, "max tile memory", actual, low, high)
}

pub fn always_live_memory(report: &DecodedReport, expected: u64, tolerance: f64) -> CheckOutcome {
    const NAME: &str = "memory.always_live";
    let actual = query_or_fail!(NAME, report.always_live_memory());
    let (low, high) = tolerance_range(expected, tolerance);
    within(NAME, "always-live memory", actual, low, high)
}

/// Pipeline stage `i` (computations matching `*_stage_<i>_`) runs on
/// exactly one IPU, `expected_ipus[i]`, and there is no extra stage
pub fn pipeline_stages_on_expected_ipu(report: &DecodedReport, expected_ipus: &[u64]) -> CheckOutcome {
    const NAME: &str = "pipeline.stages";
    let tensor_map = query_or_fail!(NAME, report.tensor_map());
    let computations = tensor_map.computation_names();
    let mut details = Vec::new();

    let extra_stage = format!("{}{}_", STAGE_PATTERN_PREFIX, expected_ipus.len() + 1);
    if !items_matching_at_least_one_pattern(&computations, &[extra_stage]).is_empty() {
        details.push("the number of expected IPUs does not match the number of stages".to_string());
    }

    for (i, expected_ipu) in expected_ipus.iter().enumerate() {
        let stage_pattern = format!("{}{}_", STAGE_PATTERN_PREFIX, i);
        let stage = items_matching_at_least_one_pattern(&computations, &[stage_pattern]);

        if stage.is_empty() {
            details.push(format!("no stage {} found", i));
            continue;
        }

        let ipus = query_or_fail!(NAME, tensor_map.ipu_ids(&stage));
        if ipus.len() != 1 {
            details.push(format!("stage {} was mapped to more than one IPU: {:?}", i, ipus));
        } else if !ipus.contains(expected_ipu) {
            details.push(format!(
                "stage {} ran on IPU {:?}, expected IPU {}",
                i, ipus, expected_ipu
            ));
        }
    }

    CheckOutcome::from_details(NAME, details)
}

fn transfer_names(name: &str, actual: Result<Vec<String>, QueryError>, expected: &[String]) -> CheckOutcome {
    // No transfer event counts as zero transferred tensors
    let actual = actual.unwrap_or_default();
    let mut details = Vec::new();

    if actual.len() != expected.len() {
        details.push(format!(
            "expected {} transferred tensors, found {}",
            expected.len(),
            actual.len()
        ));
    }
    for pattern in expected {
        let matches = count_matches_in_list(&actual, pattern);
        if matches != 1 {
            details.push(format!("'{}' matched {} transferred tensors", pattern, matches));
        }
    }

    CheckOutcome::from_details(name, details)
}

/// The host-to-device transfer carried exactly the named tensors
pub fn host_to_device_event_names(report: &DecodedReport, names: &[String]) -> CheckOutcome {
    transfer_names("transfers.host_to_device", report.host_to_device_names(), names)
}

/// The device-to-host transfer carried exactly the named tensors
pub fn device_to_host_event_names(report: &DecodedReport, names: &[String]) -> CheckOutcome {
    transfer_names("transfers.device_to_host", report.device_to_host_names(), names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{decode_events, IpuTraceEvent};
    use serde_json::json;

    fn decoded() -> DecodedReport {
        let report = json!({
            "target": {"numIPUs": 2, "numTiles": 4},
            "memory": {
                "byTile": {"total": [100, 200, 300, 400]},
                "liveness": {"alwaysLive": {"bytesByTile": [10, 10, 10, 10]}}
            },
            "vertexTypes": {"names": ["poplin::ConvPartial1x1Out<float>"]},
            "computeSets": {"names": ["convXXX/Conv2D", "poolXXX"]},
            "programs": [
                {"type": "GlobalExchange", "name": "gx/stage_0"},
                {"type": "Sequence", "name": "main"}
            ]
        });
        let records = vec![IpuTraceEvent::compile_end("m", &report.to_string(), "").to_record()];
        decode_events(&records, None, "").unwrap()
    }

    #[test]
    fn test_compute_set_whitelist_failure_lists_names() {
        let outcome = all_compute_sets_and_list(&decoded(), &["convXXX"]);
        assert!(!outcome.passed);
        assert_eq!(outcome.details, vec!["compute sets not in whitelist: poolXXX"]);
    }

    #[test]
    fn test_compute_set_whitelist_pass() {
        assert!(all_compute_sets_and_list(&decoded(), &["convXXX", "pool"]).passed);
        assert!(all_global_exchanges_and_list(&decoded(), &["gx"]).passed);
    }

    #[test]
    fn test_blacklist_and_contains() {
        assert!(!compute_sets_not_in_blacklist(&decoded(), &["pool"]).passed);
        assert!(compute_sets_not_in_blacklist(&decoded(), &["bn"]).passed);
        assert!(compute_sets_contain_list(&decoded(), &["conv"]).passed);
        assert!(vertices_contain_list(&decoded(), &["poplin::Conv"]).passed);
        assert!(!vertices_contain_list(&decoded(), &["popops::"]).passed);
    }

    #[test]
    fn test_memory_tolerances() {
        let report = decoded();
        assert!(total_tile_memory(&report, 1000, 0.01).passed);
        assert!(!total_tile_memory(&report, 1100, 0.01).passed);
        assert!(max_tile_memory(&report, 400, 0.0).passed);
        assert!(always_live_memory(&report, 40, 0.01).passed);
        assert!(each_tile_memory_is_less_than(&report, 400, 0.01).passed);

        let outcome = each_tile_memory_is_less_than(&report, 250, 0.0);
        assert_eq!(outcome.details.len(), 2);
    }

    #[test]
    fn test_missing_report_fails_checks() {
        let empty = decode_events::<Vec<u8>>(&[], None, "").unwrap();

        let outcome = total_tile_memory(&empty, 100, 0.01);
        assert!(!outcome.passed);
        assert_eq!(outcome.details, vec!["no compile-end event observed"]);
        assert!(no_compute_set(&empty).passed);
        assert!(!contains_one_compile_event(&empty).passed);
    }

    #[test]
    fn test_compute_sets_matches() {
        assert!(compute_sets_matches(&decoded(), "*XXX*", 2).passed);
        assert!(!compute_sets_matches(&decoded(), "conv*", 2).passed);
    }
}
