//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use crate::parser::TraceEventKind;
use thiserror::Error;

/// Errors that can occur while framing or decoding a single trace record
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Protobuf decoding failed: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("Unknown trace event kind: {0}")]
    UnknownKind(i32),

    #[error("Record truncated: expected {expected} bytes, {available} available")]
    Truncated { expected: usize, available: usize },

    #[error("Record of {0} bytes exceeds the maximum record size")]
    TooLarge(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that abort a decode session
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Expected {expected} trace events but got {actual}: {message}")]
    CountMismatch {
        expected: usize,
        actual: usize,
        message: String,
    },

    #[error("Trace record {index} is not a valid event: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: RecordError,
    },

    #[error("More than one {0} event carried a payload")]
    DuplicateEvent(TraceEventKind),
}

/// Errors for a single event payload; these are collected, never raised
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("Payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload violates the report schema: {0}")]
    Schema(String),
}

/// Errors returned by queries over a decoded report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("no {} event observed", .0.describe())]
    MissingEvent(TraceEventKind),

    #[error("Compilation report has no tile memory entries")]
    EmptyTileMemory,

    #[error("Unknown computation: {0}")]
    UnknownComputation(String),

    #[error("Program index {index} out of range ({len} programs)")]
    ProgramIndexOutOfRange { index: usize, len: usize },

    #[error("Instruction {instruction} has invalid ML type {code}")]
    InvalidMlType { instruction: String, code: u32 },
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that can occur while loading expectations
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Expectations TOML parse error: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Invalid expectations: {0}")]
    InvalidExpectations(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
