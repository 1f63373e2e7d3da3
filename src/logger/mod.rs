//! Logger module
//!
//! Provides logging for the relay:
//! - Subscriber setup (console plus optional appended log file)
//! - The injected `EventLog` capability used by handlers and sessions
//! - Access records in combined or JSON format

mod format;
pub mod writer;

pub use format::AccessRecord;
pub use writer::{init, LogGuard};

use crate::config::{AccessLogFormat, Config, LoggingConfig};
use crate::span::ByteSpan;
use crate::store::ObjectRef;
use std::net::SocketAddr;
use tracing::{debug, info, warn};

/// Structured event emitted while serving a request
#[derive(Debug, Clone, Copy)]
pub enum RelayEvent<'a> {
    RequestReceived {
        method: &'a str,
        path: &'a str,
        range: Option<&'a str>,
    },
    SizeResolved {
        object: &'a ObjectRef,
        size: u64,
    },
    RangeServed {
        session: u64,
        object: &'a ObjectRef,
        span: ByteSpan,
        total: u64,
    },
    Completed {
        session: u64,
        object: &'a ObjectRef,
        bytes: u64,
        chunks: usize,
    },
    Failed {
        session: Option<u64>,
        object: &'a ObjectRef,
        error: &'a (dyn std::error::Error + 'static),
    },
    Cancelled {
        session: u64,
        object: &'a ObjectRef,
        bytes: u64,
    },
    Access(&'a AccessRecord),
}

/// Fire-and-forget log sink passed to handlers and sessions
///
/// Implementations must neither block nor fail the caller.
pub trait EventLog: Send + Sync {
    fn emit(&self, event: &RelayEvent<'_>);
}

/// `EventLog` backed by `tracing`
pub struct TracingEventLog {
    access_log: bool,
    access_format: AccessLogFormat,
}

impl TracingEventLog {
    pub const fn new(config: &LoggingConfig) -> Self {
        Self {
            access_log: config.access_log,
            access_format: config.access_log_format,
        }
    }
}

impl EventLog for TracingEventLog {
    fn emit(&self, event: &RelayEvent<'_>) {
        match *event {
            RelayEvent::RequestReceived {
                method,
                path,
                range,
            } => {
                info!("[Request] {method} {path} range={}", range.unwrap_or("-"));
            }
            RelayEvent::SizeResolved { object, size } => {
                debug!("[Store] {object} is {size} bytes");
            }
            RelayEvent::RangeServed {
                session,
                object,
                span,
                total,
            } => {
                info!(session, "[Range] {object} bytes {span}/{total}");
            }
            RelayEvent::Completed {
                session,
                object,
                bytes,
                chunks,
            } => {
                info!(session, "[Transfer] {object} completed: {bytes} bytes in {chunks} chunks");
            }
            RelayEvent::Failed {
                session,
                object,
                error,
            } => {
                warn!(session, "[Transfer] {object} failed: {error}");
            }
            RelayEvent::Cancelled {
                session,
                object,
                bytes,
            } => {
                debug!(session, "[Transfer] {object} cancelled after {bytes} bytes");
            }
            RelayEvent::Access(record) => {
                if self.access_log {
                    info!(target: "access", "{}", record.format(self.access_format));
                }
            }
        }
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    info!("======================================");
    info!("Relay started successfully");
    info!("Listening on: http://{addr}");
    info!(
        "Store: {} (bucket {})",
        config.store.endpoint_display(),
        config.store.bucket
    );
    info!(
        "Window: {} bytes, chunk: {} bytes",
        config.stream.max_span, config.stream.chunk_size
    );
    if let Some(workers) = config.server.workers {
        info!("Worker threads: {workers}");
    }
    if let Some(ref dir) = config.logging.log_dir {
        info!("Log file: {dir}/{}", config.logging.log_file);
    }
    info!("======================================");
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{EventLog, RelayEvent};
    use std::sync::Mutex;

    /// Records a one-line summary of every event
    #[derive(Default)]
    pub struct RecordingLog {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingLog {
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.lines().iter().any(|l| l.contains(needle))
        }
    }

    impl EventLog for RecordingLog {
        fn emit(&self, event: &RelayEvent<'_>) {
            let line = match event {
                RelayEvent::RequestReceived { method, path, .. } => format!("request {method} {path}"),
                RelayEvent::SizeResolved { object, size } => format!("size {object} {size}"),
                RelayEvent::RangeServed { object, span, total, .. } => {
                    format!("range {object} {span}/{total}")
                }
                RelayEvent::Completed { bytes, chunks, .. } => {
                    format!("completed {bytes} {chunks}")
                }
                RelayEvent::Failed { error, .. } => format!("failed {error}"),
                RelayEvent::Cancelled { bytes, .. } => format!("cancelled {bytes}"),
                RelayEvent::Access(record) => format!("access {} {}", record.status, record.outcome),
            };
            self.lines.lock().unwrap().push(line);
        }
    }
}
