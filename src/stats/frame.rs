// Wire schema of one raw stats document

use serde::Deserialize;

/// One sampling tick. Every section is optional; absent sections read as empty.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawStatsFrame {
    pub cpu_stats: Option<CpuSection>,
    pub precpu_stats: Option<CpuSection>,
    pub memory_stats: Option<MemorySection>,
    pub blkio_stats: Option<BlkioSection>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CpuSection {
    pub cpu_usage: Option<CpuUsage>,
    pub system_cpu_usage: Option<u64>,
    pub online_cpus: Option<u64>,
}

impl CpuSection {
    pub fn total_usage(&self) -> u64 {
        self.cpu_usage
            .as_ref()
            .and_then(|u| u.total_usage)
            .unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CpuUsage {
    pub total_usage: Option<u64>,
}

/// `usage` and `limit` are required; they stay optional here so their absence
/// surfaces as a missing-field error instead of a parse error.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct MemorySection {
    pub usage: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct BlkioSection {
    pub io_service_bytes_recursive: Option<Vec<BlkioEntry>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlkioEntry {
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub value: u64,
}
