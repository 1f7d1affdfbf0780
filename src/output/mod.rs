//! Output writers for report summaries.
//!
//! This module handles:
//! - Building the serialisable [`ReportSummary`]
//! - Writing and reading summary JSON files

pub mod json;
pub mod summary;

// Re-export main functions
pub use json::{read_summary, summary_to_string, write_summary};
pub use summary::{to_summary, ReportSummary};
