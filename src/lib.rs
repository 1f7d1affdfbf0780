//! IPU Trace Report
//!
//! Decoding of IPU compiler and runtime trace events into a queryable
//! report, plus the glob matching and assertions used to check compiled
//! programs in tests.
//!
//! This crate provides the core implementation for the
//! `ipu-report` CLI tool.
//!
//! ## Getting Started
//!
//! ```ignore
//! use ipu_trace_report::parser::{read_records, ReportDecoder};
//!
//! let records = read_records("trace.bin")?;
//! let report = ReportDecoder::new().expect_count(4, "one compile, one run").decode(&records)?;
//! println!("{} IPUs, {} bytes", report.num_ipus()?, report.total_tile_memory()?);
//! ```

pub mod aggregator;
pub mod checks;
pub mod commands;
pub mod matching;
pub mod output;
pub mod parser;
pub mod utils;
