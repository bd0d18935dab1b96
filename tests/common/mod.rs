// Shared test helpers: an in-memory container runtime

#![allow(dead_code)]

use bytes::Bytes;
use dockermon::error::RuntimeError;
use dockermon::runtime::{ContainerHandle, ContainerRuntime, RawStream};
use futures_util::StreamExt;
use futures_util::stream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Finite canned output for one container.
#[derive(Clone, Default)]
pub struct FakeHandle {
    pub log_chunks: Vec<Vec<u8>>,
    pub stats_frames: Vec<String>,
    /// Tail values requested through `log_stream`.
    pub requested_tails: Arc<Mutex<Vec<usize>>>,
}

impl FakeHandle {
    pub fn new(lines: &[&str], frames: Vec<String>) -> Self {
        Self {
            log_chunks: lines
                .iter()
                .map(|l| format!("{l}\n").into_bytes())
                .collect(),
            stats_frames: frames,
            requested_tails: Arc::default(),
        }
    }
}

impl ContainerHandle for FakeHandle {
    fn log_stream(&self, _follow: bool, tail: usize) -> RawStream {
        self.requested_tails.lock().unwrap().push(tail);
        let chunks: Vec<Result<Bytes, RuntimeError>> = self
            .log_chunks
            .iter()
            .cloned()
            .map(|c| Ok(Bytes::from(c)))
            .collect();
        stream::iter(chunks).boxed()
    }

    fn stats_stream(&self) -> RawStream {
        let frames: Vec<Result<Bytes, RuntimeError>> = self
            .stats_frames
            .iter()
            .cloned()
            .map(|f| Ok(Bytes::from(f)))
            .collect();
        stream::iter(frames).boxed()
    }
}

#[derive(Default)]
pub struct FakeRuntime {
    pub containers: HashMap<String, FakeHandle>,
    pub unavailable: bool,
}

impl FakeRuntime {
    pub fn with_container(name: &str, handle: FakeHandle) -> Self {
        let mut containers = HashMap::new();
        containers.insert(name.to_string(), handle);
        Self {
            containers,
            unavailable: false,
        }
    }
}

impl ContainerRuntime for FakeRuntime {
    type Handle = FakeHandle;

    async fn resolve(&self, id: &str) -> Result<FakeHandle, RuntimeError> {
        if self.unavailable {
            return Err(RuntimeError::Unavailable("daemon is not running".into()));
        }
        self.containers
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))
    }
}

/// A Docker-shaped stats document.
pub fn stats_frame(total: u64, system: u64, pre_total: u64, online: u64, usage: u64) -> String {
    serde_json::json!({
        "read": "2024-01-01T00:00:01Z",
        "cpu_stats": {
            "cpu_usage": { "total_usage": total },
            "system_cpu_usage": system,
            "online_cpus": online,
        },
        "precpu_stats": {
            "cpu_usage": { "total_usage": pre_total },
            "system_cpu_usage": 0,
        },
        "memory_stats": { "usage": usage, "limit": 1_000_000 },
        "blkio_stats": { "io_service_bytes_recursive": [
            { "major": 8, "minor": 0, "op": "Read", "value": 10 },
            { "major": 8, "minor": 0, "op": "Write", "value": 20 },
        ]},
    })
    .to_string()
}
