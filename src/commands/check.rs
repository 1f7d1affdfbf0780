//! Check command implementation.
//!
//! Decodes a trace file, runs the checks configured in a TOML expectations
//! file, and renders a coloured pass/fail report for the terminal.

use super::inspect::decode_trace_file;
use super::models::CheckArgs;
use crate::checks::{load_expectations, run_checks, CheckReport};
use anyhow::{Context, Result};
use colored::*;
use log::info;

/// Execute the check command
///
/// **Public** - main entry point called from main.rs
///
/// Returns the check report; failed checks are not an `Err`, the caller
/// decides the exit status.
pub fn execute_check(args: CheckArgs) -> Result<CheckReport> {
    info!("Loading expectations from: {}", args.expectations.display());
    let mut expectations = load_expectations(&args.expectations).with_context(|| {
        format!("Failed to load expectations from {}", args.expectations.display())
    })?;

    if let Some(tolerance) = args.tolerance {
        expectations.memory.tolerance = Some(tolerance);
    }

    let report = decode_trace_file(&args.input, args.expected_count)?;
    let result = run_checks(&report, &expectations);

    info!(
        "Ran {} checks: {} failed",
        result.outcomes.len(),
        result.failure_count()
    );

    Ok(result)
}

/// Render a human-readable check report for the terminal
pub fn render_check_report(report: &CheckReport) -> String {
    let mut out = String::new();

    out.push_str("\n🔍 ");
    out.push_str(&"Trace Check Summary".bold().to_string());
    out.push_str("\n---------------------------------------------------\n");

    for outcome in &report.outcomes {
        let mark = if outcome.passed {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        };
        out.push_str(&format!("{} {}\n", mark, outcome.name));
        for detail in &outcome.details {
            out.push_str(&format!("    {}\n", detail));
        }
    }

    out.push_str("---------------------------------------------------\n");
    let status_msg = if report.passed() {
        "✅ STATUS: PASSED".green().bold()
    } else {
        format!("❌ STATUS: FAILED ({} failed checks)", report.failure_count())
            .red()
            .bold()
    };
    out.push_str(&status_msg.to_string());
    out.push('\n');

    out
}

/// Validate check arguments
pub fn validate_check_args(args: &CheckArgs) -> Result<()> {
    if !args.input.is_file() {
        anyhow::bail!("Trace file not found: {}", args.input.display());
    }

    if !args.expectations.is_file() {
        anyhow::bail!("Expectations file not found: {}", args.expectations.display());
    }

    if let Some(tolerance) = args.tolerance {
        if !(0.0..1.0).contains(&tolerance) {
            anyhow::bail!("Tolerance must be in [0, 1), got {}", tolerance);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckOutcome;
    use crate::parser::{write_records, IpuTraceEvent};
    use std::fs;

    fn write_inputs(dir: &std::path::Path, expectations: &str) -> CheckArgs {
        let input = dir.join("trace.bin");
        let toml_path = dir.join("expectations.toml");

        write_records(
            &input,
            &[
                IpuTraceEvent::load_engine("m").to_record(),
                IpuTraceEvent::execute("m", "{}").to_record(),
            ],
        )
        .unwrap();
        fs::write(&toml_path, expectations).unwrap();

        CheckArgs {
            input,
            expectations: toml_path,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_args_tolerance_out_of_range() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut args = write_inputs(temp_dir.path(), "");

        args.tolerance = Some(1.0);
        assert!(validate_check_args(&args).is_err());

        args.tolerance = Some(-0.1);
        assert!(validate_check_args(&args).is_err());

        args.tolerance = Some(0.05);
        assert!(validate_check_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_missing_expectations() {
        let args = CheckArgs {
            expectations: "/nonexistent/expectations.toml".into(),
            ..Default::default()
        };

        assert!(validate_check_args(&args).is_err());
    }

    #[test]
    fn test_execute_check_passes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let args = write_inputs(temp_dir.path(), "[events]\ncount = 2\n");

        let result = execute_check(args).unwrap();
        assert!(result.passed());
        assert_eq!(result.outcomes.len(), 1);
    }

    #[test]
    fn test_execute_check_reports_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let args = write_inputs(temp_dir.path(), "[events]\nrequire_compile_end = true\n");

        let result = execute_check(args).unwrap();
        assert!(!result.passed());
        assert_eq!(result.status(), "FAILED");
    }

    #[test]
    fn test_render_lists_failure_details() {
        let report = CheckReport {
            outcomes: vec![CheckOutcome {
                name: "compute_sets.blacklist".to_string(),
                passed: false,
                details: vec!["blacklisted compute set: poolXXX".to_string()],
            }],
        };

        let text = render_check_report(&report);
        assert!(text.contains("compute_sets.blacklist"));
        assert!(text.contains("poolXXX"));
        assert!(text.contains("1 failed checks"));
    }
}
