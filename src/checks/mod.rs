//! Checks over decoded reports.
//!
//! Whitelist, blacklist, memory and placement checks, individually or
//! driven by a TOML expectations file.
//!
//! # Example
//! ```ignore
//! use ipu_trace_report::checks::{load_expectations, run_checks};
//!
//! let expectations = load_expectations("expectations.toml")?;
//! let result = run_checks(&decoded, &expectations);
//! assert!(result.passed());
//! ```

pub mod assertions;
mod expectations;

pub use assertions::CheckOutcome;
pub use expectations::{
    load_expectations, run_checks, CheckReport, EventExpectations, Expectations,
    GlobalExchangeExpectations, MatchCount, MemoryExpectations, NameExpectations,
    PipelineExpectations, TransferExpectations, VertexExpectations,
};
