//! Transfer session module
//!
//! Per-request state of one streamed response: the object, the served span,
//! the cursor and the cancellation token, plus the relay state machine.

use crate::span::ByteSpan;
use crate::store::ObjectRef;
use tokio_util::sync::CancellationToken;

/// Relay state machine
///
/// `Idle -> Fetching -> Writing -> (Fetching | Completed | Failed | Cancelled)`.
/// `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Fetching,
    Writing,
    Completed,
    Failed,
    Cancelled,
}

impl RelayState {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Totals of a completed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSummary {
    pub bytes: u64,
    pub chunks: usize,
}

#[derive(Debug)]
pub struct TransferSession {
    id: u64,
    object: ObjectRef,
    span: ByteSpan,
    /// Start of the next chunk to deliver, `None` once the span is written
    cursor: Option<u64>,
    state: RelayState,
    cancel: CancellationToken,
    bytes_written: u64,
    chunks_written: usize,
}

impl TransferSession {
    pub fn new(id: u64, object: ObjectRef, span: ByteSpan, cancel: CancellationToken) -> Self {
        Self {
            id,
            object,
            cursor: Some(span.start()),
            span,
            state: RelayState::Idle,
            cancel,
            bytes_written: 0,
            chunks_written: 0,
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn object(&self) -> &ObjectRef {
        &self.object
    }

    pub const fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    pub const fn state(&self) -> RelayState {
        self.state
    }

    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub const fn summary(&self) -> TransferSummary {
        TransferSummary {
            bytes: self.bytes_written,
            chunks: self.chunks_written,
        }
    }

    /// Move to `Fetching` or `Writing`; ignored once terminal
    pub(crate) fn enter(&mut self, state: RelayState) {
        debug_assert!(!state.is_terminal(), "use terminate() for {state:?}");
        if !self.state.is_terminal() {
            self.state = state;
        }
    }

    /// Record a chunk accepted by the sink and advance the cursor past it
    pub(crate) fn record_write(&mut self, chunk: ByteSpan) {
        debug_assert_eq!(Some(chunk.start()), self.cursor, "chunk out of order");
        self.bytes_written += chunk.len();
        self.chunks_written += 1;
        self.cursor = chunk
            .end()
            .checked_add(1)
            .filter(|next| *next <= self.span.end());
    }

    /// Enter a terminal state; returns `false` if the session already ended
    pub(crate) fn terminate(&mut self, state: RelayState) -> bool {
        debug_assert!(state.is_terminal());
        if self.state.is_terminal() {
            return false;
        }
        self.state = state;
        true
    }
}
