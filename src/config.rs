use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub streams: StreamsConfig,
    #[serde(default)]
    pub facade: FacadeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// The first read of at most this many bytes is taken as the whole request.
    #[serde(default = "default_request_buffer_size")]
    pub request_buffer_size: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Serve each connection as its own task instead of one at a time.
    #[serde(default)]
    pub concurrent_sessions: bool,
}

fn default_request_buffer_size() -> usize {
    1024
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamsConfig {
    /// Existing log lines replayed before following new output.
    #[serde(default = "default_log_tail")]
    pub log_tail: usize,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            log_tail: default_log_tail(),
        }
    }
}

fn default_log_tail() -> usize {
    crate::logs::DEFAULT_TAIL_BACKLOG
}

/// Optional axum front end with the same /stream semantics plus /health.
#[derive(Debug, Clone, Deserialize)]
pub struct FacadeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_facade_host")]
    pub host: String,
    #[serde(default = "default_facade_port")]
    pub port: u16,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_facade_host(),
            port: default_facade_port(),
        }
    }
}

fn default_facade_host() -> String {
    "0.0.0.0".into()
}

fn default_facade_port() -> u16 {
    8000
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            self.server.request_buffer_size > 0,
            "server.request_buffer_size must be > 0, got {}",
            self.server.request_buffer_size
        );
        anyhow::ensure!(
            self.server.request_timeout_ms > 0,
            "server.request_timeout_ms must be > 0, got {}",
            self.server.request_timeout_ms
        );
        if self.facade.enabled {
            anyhow::ensure!(
                self.facade.port > 0,
                "facade.port must be between 1 and 65535, got {}",
                self.facade.port
            );
            anyhow::ensure!(
                !(self.facade.port == self.server.port && self.facade.host == self.server.host),
                "facade and server cannot share {}:{}",
                self.server.host,
                self.server.port
            );
        }
        Ok(())
    }
}
