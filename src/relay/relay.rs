//! Streaming relay
//!
//! Drives a chunk sequence into a sink, one buffer at a time, and records the
//! single terminal outcome of the session.

use super::sequencer::FetchedBuffer;
use super::session::{RelayState, TransferSession, TransferSummary};
use super::sink::Sink;
use crate::error::{RelayError, StoreResult};
use crate::logger::{EventLog, RelayEvent};
use futures::{Stream, StreamExt};
use std::pin::pin;

/// Relay `sequence` into `sink` until it is exhausted, fails or is cancelled
///
/// The next chunk is requested only after the sink accepted the previous
/// one. The session's token is checked before every fetch and every write,
/// and a pending write is abandoned as soon as the token fires. On success
/// the sink is finished; on any failure it is aborted instead.
pub async fn relay<S, K>(
    session: &mut TransferSession,
    sequence: S,
    sink: &mut K,
    events: &dyn EventLog,
) -> Result<TransferSummary, RelayError>
where
    S: Stream<Item = StoreResult<FetchedBuffer>>,
    K: Sink + ?Sized,
{
    let mut outcome = drive(session, sequence, sink).await;
    if outcome.is_ok() {
        outcome = sink.finish().await.map_err(RelayError::Sink);
    }

    match &outcome {
        Ok(()) => {
            session.terminate(RelayState::Completed);
            let summary = session.summary();
            events.emit(&RelayEvent::Completed {
                session: session.id(),
                object: session.object(),
                bytes: summary.bytes,
                chunks: summary.chunks,
            });
        }
        Err(e @ RelayError::Cancelled) => {
            session.terminate(RelayState::Cancelled);
            sink.abort(e).await;
            events.emit(&RelayEvent::Cancelled {
                session: session.id(),
                object: session.object(),
                bytes: session.bytes_written(),
            });
        }
        Err(e) => {
            session.terminate(RelayState::Failed);
            sink.abort(e).await;
            events.emit(&RelayEvent::Failed {
                session: Some(session.id()),
                object: session.object(),
                error: e,
            });
        }
    }

    outcome.map(|()| session.summary())
}

async fn drive<S, K>(
    session: &mut TransferSession,
    sequence: S,
    sink: &mut K,
) -> Result<(), RelayError>
where
    S: Stream<Item = StoreResult<FetchedBuffer>>,
    K: Sink + ?Sized,
{
    let mut sequence = pin!(sequence);
    let cancel = session.cancel_token().clone();

    loop {
        if cancel.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        session.enter(RelayState::Fetching);
        let Some(fetched) = sequence.next().await else {
            return Ok(());
        };
        let FetchedBuffer { span, data } = fetched?;

        if cancel.is_cancelled() {
            return Err(RelayError::Cancelled);
        }
        session.enter(RelayState::Writing);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RelayError::Cancelled),
            written = sink.write(data) => written.map_err(RelayError::Sink)?,
        }
        session.record_write(span);
    }
}
