//! Aggregation of decoded reports into memory metrics.
//!
//! This module summarises per-tile memory into:
//! - Distribution statistics (total, max, mean, busiest tile)
//! - Per-IPU totals

pub mod metrics;

// Re-export main types and functions
pub use metrics::{calculate_memory_distribution, ipu_memory, MemoryDistribution};
