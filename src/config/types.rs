// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::num::NonZeroU64;
use std::time::Duration;

/// Main configuration structure, immutable after load
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub stream: StreamConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Listen backlog passed to `listen(2)`
    pub backlog: i32,
}

/// Remote object store configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub bucket: String,
    pub region: String,
    /// Base URL of an S3-compatible endpoint (path-style); AWS when unset
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Per-call timeout in seconds
    pub request_timeout: u64,
    /// Static credentials, used only when both halves are set
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

impl StoreConfig {
    /// Endpoint for logs; the SDK resolves the AWS one from the region
    pub fn endpoint_display(&self) -> String {
        self.endpoint.as_ref().map_or_else(
            || format!("aws ({})", self.region),
            |e| e.trim_end_matches('/').to_string(),
        )
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Streaming configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// Largest single ranged read issued against the store
    pub chunk_size: NonZeroU64,
    /// Largest window served by one response
    pub max_span: NonZeroU64,
    /// Per-session deadline in seconds, 0 disables it
    pub session_timeout: u64,
}

impl StreamConfig {
    pub const fn session_timeout(&self) -> Option<Duration> {
        if self.session_timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(self.session_timeout))
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined or json)
    pub access_log_format: AccessLogFormat,
    /// Directory for the appended log file; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
    pub log_file: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessLogFormat {
    Combined,
    Json,
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Seconds allowed for a client to send request headers
    pub header_read_timeout: u64,
    pub max_connections: Option<u64>,
    /// Seconds to wait for active connections after shutdown is signalled
    pub shutdown_grace: u64,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub default_content_type: String,
    pub enable_cors: bool,
    pub health_path: String,
}
