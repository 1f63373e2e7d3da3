//! Log writer module
//!
//! Installs the global `tracing` subscriber: a console layer and, when a log
//! directory is configured, an append-only file layer behind a non-blocking
//! writer so that a slow disk never stalls a transfer.

use crate::config::LoggingConfig;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Timestamp layout of every log line
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Keeps the file writer flushing; drop it only at process exit
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize logging
///
/// Should be called once at application startup. `RUST_LOG` overrides the
/// configured level.
pub fn init(config: &LoggingConfig) -> io::Result<LogGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console = fmt::layer()
        .with_target(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()));

    let (file_layer, guard) = match config.log_dir.as_deref() {
        Some(dir) => {
            let (writer, guard) = open_log_file(dir, &config.log_file)?;
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    Ok(LogGuard { _file: guard })
}

/// Open `{dir}/{file}` for appending behind a lossy non-blocking writer
fn open_log_file(
    dir: &str,
    file: &str,
) -> io::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = Path::new(dir);
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir)?;
    }
    let appender = tracing_appender::rolling::never(dir, file);
    Ok(tracing_appender::non_blocking(appender))
}
