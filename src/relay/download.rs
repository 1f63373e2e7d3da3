//! Whole-object download
//!
//! Streams an entire object into a local file through the same resolver,
//! sequencer and relay as the HTTP path, with the window covering the whole
//! object.

use super::relay::relay;
use super::resolver::resolve_size;
use super::sequencer::ChunkSequencer;
use super::session::{TransferSession, TransferSummary};
use super::sink::{FileSink, Sink};
use crate::error::DownloadError;
use crate::http::range::plan_full;
use crate::logger::{EventLog, RelayEvent};
use crate::store::{ObjectRef, ObjectStore};
use std::num::NonZeroU64;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Download `object` into `output`
///
/// The partial file is removed when the transfer fails or is cancelled.
/// An empty object produces an empty file without any ranged read.
pub async fn download(
    store: Arc<dyn ObjectStore>,
    object: ObjectRef,
    output: &Path,
    chunk_size: NonZeroU64,
    events: &dyn EventLog,
    cancel: CancellationToken,
) -> Result<TransferSummary, DownloadError> {
    let total_size = resolve_size(store.as_ref(), &object, events).await?;
    let mut sink = FileSink::create(output).await?;

    let Some(total) = NonZeroU64::new(total_size) else {
        sink.finish().await?;
        return Ok(TransferSummary { bytes: 0, chunks: 0 });
    };

    let plan = plan_full(total);
    events.emit(&RelayEvent::RangeServed {
        session: 0,
        object: &object,
        span: plan.span,
        total: total_size,
    });

    let mut session = TransferSession::new(0, object.clone(), plan.span, cancel);
    let sequence = ChunkSequencer::new(store, object, plan.span, chunk_size);
    Ok(relay(&mut session, sequence.into_stream(), &mut sink, events).await?)
}
