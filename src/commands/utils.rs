use crate::output::read_summary;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::Result;
use std::path::Path;

/// Validate a summary JSON file
pub fn validate_summary_file(file_path: impl AsRef<Path>) -> Result<()> {
    let file_path = file_path.as_ref();
    println!("Validating summary: {}", file_path.display());

    let summary = read_summary(file_path)?;

    if summary.version != SCHEMA_VERSION {
        anyhow::bail!(
            "Unsupported summary version {} (expected {})",
            summary.version,
            SCHEMA_VERSION
        );
    }

    println!("✓ Valid summary JSON");
    println!("  Version: {}", summary.version);
    println!("  Source: {}", summary.source);
    println!("  Events: {}", summary.event_counts.values().sum::<usize>());
    println!("  Compute Sets: {}", summary.compute_set_count);
    println!("  Skipped Records: {}", summary.skipped_records);

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("IPU Trace Report Summary Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string              - Schema version (e.g., '1.0.0')");
        println!("  source: string               - Trace file the summary came from");
        println!("  event_counts: object         - Events per kind (e.g., COMPILE_END)");
        println!("  num_ipus: number?            - IPUs in the compile target");
        println!("  num_tiles: number?           - Tiles in the compile target");
        println!("  tiles_per_ipu: number?       - numTiles / numIPUs");
        println!("  memory: object?              - Tile memory distribution");
        println!("    total, max, min: number    - Bytes across all tiles");
        println!("    mean: number               - Mean bytes per tile");
        println!("    always_live: number        - Always-live bytes");
        println!("    busiest_tile: number?      - Tile holding the most memory");
        println!("  compute_set_count: number    - Compute sets in the graph");
        println!("  vertex_type_count: number    - Vertex types in the graph");
        println!("  program_count: number        - Programs in the graph");
        println!("  execution_report_count: number - Execute events with a report");
        println!("  skipped_records: number      - Records whose payload was unreadable");
        println!("  generated_at: string         - ISO 8601 timestamp");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("IPU Trace Report v{}", env!("CARGO_PKG_VERSION"));
    println!("Summary Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Decodes IPU compiler and runtime trace events into queryable reports.");
}
