// Application state module
// Immutable configuration plus the collaborators shared by every session

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::types::Config;
use crate::logger::EventLog;
use crate::store::ObjectStore;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Read-only store client, safe for concurrent sessions
    pub store: Arc<dyn ObjectStore>,
    /// Injected log sink
    pub events: Arc<dyn EventLog>,
    /// Process-wide shutdown; sessions run on child tokens
    pub shutdown: CancellationToken,
    pub active_connections: AtomicUsize,

    session_ids: AtomicU64,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ObjectStore>, events: Arc<dyn EventLog>) -> Self {
        Self {
            config,
            store,
            events,
            shutdown: CancellationToken::new(),
            active_connections: AtomicUsize::new(0),
            session_ids: AtomicU64::new(1),
        }
    }

    /// Allocate an id for a new transfer session
    pub fn next_session_id(&self) -> u64 {
        self.session_ids.fetch_add(1, Ordering::Relaxed)
    }
}
