// Normalized container resource metrics

use serde::{Deserialize, Serialize};

/// Metrics derived from one raw stats frame.
///
/// `cpu_percent` is always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub cpu_percent: f64,
    pub memory_used_bytes: u64,
    pub memory_limit_bytes: u64,
    pub blkio_read_bytes: u64,
    pub blkio_write_bytes: u64,
}
