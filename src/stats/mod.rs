// Stats sampler: raw stats frames in, normalized metrics out

mod frame;

use crate::error::DataError;
use crate::models::DerivedStats;
use crate::runtime::{ContainerHandle, RawStream};
use frame::{BlkioSection, CpuSection, MemorySection, RawStatsFrame};
use futures_util::stream::{self, BoxStream, StreamExt};

/// Turns a container's raw stats stream into one [`DerivedStats`] per tick.
pub struct StatsSampler {
    frames: RawStream,
}

impl StatsSampler {
    pub fn new<H: ContainerHandle>(handle: &H) -> Self {
        Self::from_frames(handle.stats_stream())
    }

    pub fn from_frames(frames: RawStream) -> Self {
        Self { frames }
    }

    /// Lazy, unbounded sequence of samples. The first error is yielded and ends the sequence.
    pub fn stream(self) -> BoxStream<'static, Result<DerivedStats, DataError>> {
        stream::unfold(Some(self.frames), |state| async move {
            let mut frames = state?;
            let item = match frames.next().await? {
                Ok(raw) => derive_stats(&raw),
                Err(e) => Err(e.into()),
            };
            let next = item.is_ok().then_some(frames);
            Some((item, next))
        })
        .boxed()
    }
}

/// Derive normalized metrics from one raw JSON stats document.
pub fn derive_stats(raw: &[u8]) -> Result<DerivedStats, DataError> {
    let frame: RawStatsFrame = serde_json::from_slice(raw)?;

    let cpu = frame.cpu_stats.unwrap_or_default();
    let precpu = frame.precpu_stats.unwrap_or_default();
    let cpu_percent = cpu_percent(&cpu, &precpu);

    let (memory_used_bytes, memory_limit_bytes) =
        memory_bytes(&frame.memory_stats.unwrap_or_default())?;
    let (blkio_read_bytes, blkio_write_bytes) = blkio_bytes(&frame.blkio_stats.unwrap_or_default());

    Ok(DerivedStats {
        cpu_percent,
        memory_used_bytes,
        memory_limit_bytes,
        blkio_read_bytes,
        blkio_write_bytes,
    })
}

// NOTE: the denominator subtracts the previous *container* usage from the current *system*
// usage, not the previous system usage. Kept as-is so readings match existing dashboards;
// it is most likely a bug in the formula clients were built against.
fn cpu_percent(cpu: &CpuSection, precpu: &CpuSection) -> f64 {
    let online_cpus = cpu.online_cpus.unwrap_or(0) as f64;
    let cpu_delta = cpu.total_usage() as f64 - precpu.total_usage() as f64;
    let system_delta = cpu.system_cpu_usage.unwrap_or(0) as f64 - precpu.total_usage() as f64;
    if system_delta > 0.0 {
        let percent = cpu_delta / system_delta * 100.0 * online_cpus;
        // Counter resets can make cpu_delta negative.
        if percent.is_finite() { percent.max(0.0) } else { 0.0 }
    } else {
        0.0
    }
}

fn memory_bytes(memory: &MemorySection) -> Result<(u64, u64), DataError> {
    let used = memory
        .usage
        .ok_or(DataError::MissingField("memory_stats.usage"))?;
    let limit = memory
        .limit
        .ok_or(DataError::MissingField("memory_stats.limit"))?;
    Ok((used, limit))
}

fn blkio_bytes(blkio: &BlkioSection) -> (u64, u64) {
    let Some(entries) = blkio.io_service_bytes_recursive.as_ref() else {
        return (0, 0);
    };
    entries.iter().fold((0u64, 0u64), |(read, write), e| match e.op.as_str() {
        "Read" => (read.saturating_add(e.value), write),
        "Write" => (read, write.saturating_add(e.value)),
        _ => (read, write),
    })
}
