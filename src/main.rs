//! IPU Trace Report CLI
//!
//! Decodes IPU trace files and checks compiled programs against
//! expectations.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use ipu_trace_report::commands::{
    display_schema, display_version, execute_check, execute_inspect, render_check_report,
    validate_check_args, validate_inspect_args, validate_summary_file, CheckArgs, InspectArgs,
};

/// IPU Trace Report - decode and check IPU trace events
#[derive(Parser, Debug)]
#[command(name = "ipu-report")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a trace file and summarise it
    Inspect {
        /// Length-delimited trace file
        #[arg(short, long, env = "IPU_TRACE_FILE")]
        input: PathBuf,

        /// Exact number of records expected in the file
        #[arg(long)]
        expected_count: Option<usize>,

        /// Output path for JSON summary (optional)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Check a trace file against a TOML expectations file
    Check {
        /// Length-delimited trace file
        #[arg(short, long, env = "IPU_TRACE_FILE")]
        input: PathBuf,

        /// TOML expectations file
        #[arg(short, long, default_value = "expectations.toml")]
        expectations: PathBuf,

        /// Relative memory tolerance, overriding the expectations file
        #[arg(long)]
        tolerance: Option<f64>,

        /// Exact number of records expected in the file
        #[arg(long)]
        expected_count: Option<usize>,
    },

    /// Validate a summary JSON file
    Validate {
        /// Path to summary JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Inspect {
            input,
            expected_count,
            output,
            summary,
        } => {
            let args = InspectArgs {
                input,
                expected_count,
                output_json: output,
                print_summary: summary,
            };

            // Validate args first
            validate_inspect_args(&args)?;

            execute_inspect(args)?;
        }

        Commands::Check {
            input,
            expectations,
            tolerance,
            expected_count,
        } => {
            let args = CheckArgs {
                input,
                expectations,
                tolerance,
                expected_count,
            };

            validate_check_args(&args)?;

            let report = execute_check(args)?;
            println!("{}", render_check_report(&report));

            if !report.passed() {
                anyhow::bail!("{} check(s) failed", report.failure_count());
            }
        }

        Commands::Validate { file } => {
            validate_summary_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
