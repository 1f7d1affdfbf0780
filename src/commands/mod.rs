//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod check;
pub mod inspect;
pub mod models;
pub mod utils;

// Re-export main command functions
pub use check::{execute_check, render_check_report, validate_check_args};
pub use inspect::{execute_inspect, validate_inspect_args};
pub use models::{CheckArgs, InspectArgs};
pub use utils::{display_schema, display_version, validate_summary_file};
