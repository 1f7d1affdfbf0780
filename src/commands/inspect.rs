//! Inspect command implementation.
//!
//! The inspect command:
//! 1. Reads length-delimited records from a trace file
//! 2. Decodes them into a report
//! 3. Logs the event histogram and memory distribution
//! 4. Writes the JSON summary and/or prints a text summary

use super::models::InspectArgs;
use crate::aggregator::{calculate_memory_distribution, ipu_memory};
use crate::output::{to_summary, write_summary};
use crate::parser::{read_records, DecodedReport, MlType, ReportDecoder};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::Path;
use std::time::Instant;

/// Read and decode a trace file
///
/// **Public** - shared by the inspect and check commands
pub fn decode_trace_file(input: &Path, expected_count: Option<usize>) -> Result<DecodedReport> {
    let records = read_records(input)
        .with_context(|| format!("Failed to read trace records from {}", input.display()))?;

    let mut decoder = ReportDecoder::new();
    if let Some(count) = expected_count {
        decoder = decoder.expect_count(count, format!("trace file {}", input.display()));
    }

    let report = decoder
        .decode(&records)
        .with_context(|| format!("Failed to decode trace file {}", input.display()))?;

    for diagnostic in report.diagnostics() {
        warn!("Skipped record {}: {}", diagnostic.index, diagnostic.reason);
    }

    Ok(report)
}

/// Execute the inspect command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Trace read or decode failures
/// * Summary write errors
pub fn execute_inspect(args: InspectArgs) -> Result<DecodedReport> {
    let start_time = Instant::now();

    info!("Inspecting trace file: {}", args.input.display());

    // Step 1: Read and decode
    info!("Step 1/3: Decoding trace records...");
    let report = decode_trace_file(&args.input, args.expected_count)?;

    info!(
        "Decoded {} records ({} events, {} skipped)",
        report.record_count(),
        report.total_events(),
        report.skipped_count()
    );
    for (kind, count) in report.event_counts() {
        debug!("  {}: {}", kind, count);
    }

    // Step 2: Memory statistics
    info!("Step 2/3: Calculating memory statistics...");
    match calculate_memory_distribution(&report) {
        Ok(dist) => {
            info!("Memory distribution: {}", dist.summary());
            if dist.is_imbalanced() {
                warn!(
                    "Tile memory is imbalanced: max {} bytes vs mean {} bytes",
                    dist.max, dist.mean
                );
            }
        }
        Err(e) => info!("No memory statistics: {}", e),
    }

    // Step 3: Write outputs
    info!("Step 3/3: Writing outputs...");
    let source = args.input.display().to_string();

    if let Some(output) = &args.output_json {
        let summary = to_summary(&report, &source);
        write_summary(&summary, output).context("Failed to write summary JSON")?;
        info!("✓ Summary written to: {}", output.display());
    }

    if args.print_summary {
        println!("{}", render_text_summary(&report, &source));
    }

    let elapsed = start_time.elapsed();
    info!("Inspect completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}

/// Plain-text summary of a decoded report
pub fn render_text_summary(report: &DecodedReport, source: &str) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);

    out.push_str(&format!("\n{}\n", rule));
    out.push_str("TRACE SUMMARY\n");
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!("Source:  {}\n", source));
    out.push_str(&format!("Records: {}\n", report.record_count()));

    out.push_str("\nEvents:\n");
    for (kind, count) in report.event_counts() {
        out.push_str(&format!("  {:<20} {}\n", kind.as_str(), count));
    }

    if let Ok(compile_end) = report.compile_end() {
        let target = &compile_end.report.target;
        out.push_str(&format!("\nModule:  {}\n", compile_end.module_name));
        out.push_str(&format!("IPUs:    {}\n", target.num_ipus));
        out.push_str(&format!("Tiles:   {}\n", target.num_tiles));
        out.push_str(&format!(
            "Compute sets: {} | Vertex types: {} | Programs: {}\n",
            compile_end.report.compute_sets.names.len(),
            compile_end.report.vertex_types.names.len(),
            compile_end.report.programs.len()
        ));

        if let Ok(dist) = calculate_memory_distribution(report) {
            out.push_str(&format!("Memory:  {}\n", dist.summary()));
        }
        if let Ok(per_ipu) = ipu_memory(report) {
            for (ipu, bytes) in per_ipu.iter().enumerate() {
                out.push_str(&format!("  IPU {}: {} bytes\n", ipu, bytes));
            }
        }
        if let Ok(counts) = report.ml_type_counts() {
            if counts.iter().any(|&c| c > 0) {
                out.push_str("ML types:\n");
                for (ml_type, count) in MlType::ALL.iter().zip(counts) {
                    out.push_str(&format!("  {:?}: {}\n", ml_type, count));
                }
            }
        }
    }

    if report.skipped_count() > 0 {
        out.push_str(&format!("\nSkipped records: {}\n", report.skipped_count()));
    }
    out.push_str(&rule);

    out
}

/// Validate inspect arguments
///
/// **Public** - can be called before execute_inspect for early validation
pub fn validate_inspect_args(args: &InspectArgs) -> Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Trace file not found: {}", args.input.display());
    }

    if args.input.is_dir() {
        anyhow::bail!("Trace path is a directory: {}", args.input.display());
    }

    if let Some(output) = &args.output_json {
        if output.is_dir() {
            anyhow::bail!("Output path is a directory: {}", output.display());
        }
    }

    Ok(())
}
