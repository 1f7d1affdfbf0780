//! Trace decoding and report schema definitions.
//!
//! This module handles:
//! - Framing and decoding protobuf trace records
//! - Decoding compilation report, tensor map and transfer payloads
//! - Building the queryable [`DecodedReport`]

pub mod records;
pub mod report;
pub mod schema;
pub mod tensor_map;
pub mod trace_event;

// Re-export main types
pub use records::{encode_length_delimited, read_records, split_length_delimited, write_records};
pub use report::{decode_events, CompileEnd, DecodedReport, RecordDiagnostic, ReportDecoder, SkipReason};
pub use schema::{CompilationReport, DataTransfer, InstructionInfo, MlType, Program};
pub use tensor_map::{ipu_of_tile, Tensor, TensorMap, Tile};
pub use trace_event::{
    extract_all_compile_end_events, extract_all_execute_events, IpuTraceEvent, TraceEvent,
    TraceEventKind, TraceRecord,
};
