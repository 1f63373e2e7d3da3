// Configuration module entry point
// Loads configuration once at startup and holds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{
    AccessLogFormat, Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig,
    StoreConfig, StreamConfig,
};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources in increasing priority: built-in defaults, the config file
    /// (optional), then `RELAY_*` environment variables such as
    /// `RELAY_STORE__BUCKET`.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = Self::defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in defaults for `bucket`, ignoring config files and the environment
    pub fn with_bucket(bucket: &str) -> Result<Self, config::ConfigError> {
        let config: Self = Self::defaults()?
            .set_override("store.bucket", bucket)?
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError>
    {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.backlog", 1024)?
            .set_default("store.bucket", "")?
            .set_default("store.region", "us-east-1")?
            .set_default("store.request_timeout", 30)?
            .set_default("stream.chunk_size", 1_048_576)? // 1MiB
            .set_default("stream.max_span", 10_000_000)?
            .set_default("stream.session_timeout", 0)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("logging.log_file", "relay.log")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .set_default("performance.shutdown_grace", 10)?
            .set_default("http.server_name", "s3relay")?
            .set_default("http.default_content_type", "application/octet-stream")?
            .set_default("http.enable_cors", false)?
            .set_default("http.health_path", "/healthz")
    }

    /// Reject values serde accepts but the relay cannot run with
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.store.bucket.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "store.bucket must be set (e.g. RELAY_STORE__BUCKET=media)".to_string(),
            ));
        }
        if !self.http.health_path.starts_with('/') {
            return Err(config::ConfigError::Message(format!(
                "http.health_path must start with '/': {}",
                self.http.health_path
            )));
        }
        self.get_socket_addr()
            .map(|_| ())
            .map_err(config::ConfigError::Message)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
