//! Configuration and constants for the decoder and CLI.

/// Current summary schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Relative tolerance used by the memory checks when none is given
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Largest single trace record we accept (matches the runtime's report cap)
pub const MAX_RECORD_SIZE: usize = 0x1000_0000; // 256MB

/// Program type tag of inter-IPU exchanges in the compilation report
pub const GLOBAL_EXCHANGE_PROGRAM_TYPE: &str = "GlobalExchange";

/// Number of ML type codes tracked in the instruction info (codes are 1-based)
pub const ML_TYPE_COUNT: usize = 4;

// Pipeline stage computations are named like "..._stage_<n>_..."
pub const STAGE_PATTERN_PREFIX: &str = "*_stage_";
