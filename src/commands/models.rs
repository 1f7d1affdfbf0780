use std::path::PathBuf;

/// Arguments for the inspect command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct InspectArgs {
    /// Length-delimited trace file
    pub input: PathBuf,

    /// Fail unless exactly this many records are present
    pub expected_count: Option<usize>,

    /// Output path for the JSON summary (optional)
    pub output_json: Option<PathBuf>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for InspectArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("trace.bin"),
            expected_count: None,
            output_json: None,
            print_summary: false,
        }
    }
}

/// Arguments for the check command
#[derive(Debug, Clone)]
pub struct CheckArgs {
    pub input: PathBuf,

    /// TOML expectations file
    pub expectations: PathBuf,

    /// Overrides the tolerance given in the expectations file
    pub tolerance: Option<f64>,

    /// Fail unless exactly this many records are present
    pub expected_count: Option<usize>,
}

impl Default for CheckArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::from("trace.bin"),
            expectations: PathBuf::from("expectations.toml"),
            tolerance: None,
            expected_count: None,
        }
    }
}
