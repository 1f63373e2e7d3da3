//! Error Module
//!
//! Error types for the store collaborator, the range planner and the streaming relay.

use std::io;
use thiserror::Error;

/// Failure reported by an object store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The object does not exist (client error, 404)
    #[error("object not found: {0}")]
    NotFound(String),

    /// The store could not serve the call (server error, no retry)
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Requested start lies outside the object (416)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("range not satisfiable: start {start} of {total} bytes")]
pub struct RangeNotSatisfiable {
    pub start: u64,
    pub total: u64,
}

/// Terminal failure of a transfer session
#[derive(Error, Debug)]
pub enum RelayError {
    /// The sink rejected a write (client disconnected, disk error)
    #[error("sink error: {0}")]
    Sink(#[source] io::Error),

    /// A chunk fetch failed
    #[error("fetch error: {0}")]
    Fetch(#[from] StoreError),

    /// The session's cancellation token fired
    #[error("transfer cancelled")]
    Cancelled,
}

impl RelayError {
    /// Short label used in logs and access records
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Sink(_) => "sink_error",
            Self::Fetch(_) => "fetch_error",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Result type alias for store calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure of a whole-object download to a local file
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The output file could not be created or finalized
    #[error("output file: {0}")]
    Output(#[from] io::Error),

    #[error(transparent)]
    Relay(#[from] RelayError),
}
