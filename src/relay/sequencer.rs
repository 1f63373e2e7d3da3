//! Chunked fetch sequencer
//!
//! Lazily walks a span chunk by chunk, issuing one ranged store read per
//! chunk. Nothing is fetched ahead: the read for the next chunk starts only
//! when the consumer asks for it.

use crate::error::{StoreError, StoreResult};
use crate::span::{ByteSpan, Chunks};
use crate::store::{ObjectRef, ObjectStore};
use bytes::{Bytes, BytesMut};
use futures::{Stream, TryStreamExt};
use std::num::NonZeroU64;
use std::sync::Arc;

/// Bytes of one chunk, drained from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedBuffer {
    pub span: ByteSpan,
    pub data: Bytes,
}

/// Single-pass sequence of fetched chunks; ends after the first error
pub struct ChunkSequencer {
    store: Arc<dyn ObjectStore>,
    object: ObjectRef,
    chunks: Chunks,
    failed: bool,
}

impl ChunkSequencer {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        object: ObjectRef,
        span: ByteSpan,
        chunk_size: NonZeroU64,
    ) -> Self {
        Self {
            store,
            object,
            chunks: span.chunks(chunk_size),
            failed: false,
        }
    }

    /// Offset of the next chunk to fetch, `None` once exhausted or failed
    pub const fn cursor(&self) -> Option<u64> {
        if self.failed {
            None
        } else {
            self.chunks.cursor()
        }
    }

    /// Fetch the next chunk
    pub async fn next_chunk(&mut self) -> Option<StoreResult<FetchedBuffer>> {
        if self.failed {
            return None;
        }
        let span = self.chunks.next()?;
        match fetch_chunk(self.store.as_ref(), &self.object, span).await {
            Ok(data) => Some(Ok(FetchedBuffer { span, data })),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = StoreResult<FetchedBuffer>> + Send {
        futures::stream::unfold(self, |mut sequencer| async move {
            sequencer
                .next_chunk()
                .await
                .map(|item| (item, sequencer))
        })
    }
}

/// Read one chunk and drain it into a single buffer of exactly its length
async fn fetch_chunk(
    store: &dyn ObjectStore,
    object: &ObjectRef,
    span: ByteSpan,
) -> StoreResult<Bytes> {
    let expected = usize::try_from(span.len())
        .map_err(|_| StoreError::Unavailable(format!("chunk {span} too large")))?;
    let mut body = store.get_object(object, span).await?;

    let mut buffer = BytesMut::with_capacity(expected);
    while let Some(frame) = body.try_next().await? {
        if buffer.len() + frame.len() > expected {
            return Err(StoreError::Unavailable(format!(
                "{object}: store returned more than {expected} bytes for {span}"
            )));
        }
        buffer.extend_from_slice(&frame);
    }

    if buffer.len() != expected {
        return Err(StoreError::Unavailable(format!(
            "{object}: short read for {span}, got {} of {expected} bytes",
            buffer.len()
        )));
    }
    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use futures::StreamExt;

    fn nz(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    fn object() -> ObjectRef {
        ObjectRef::new("media", "clip.mp4")
    }

    fn store_with(len: usize) -> Arc<MemoryStore> {
        let store = MemoryStore::with_frame_size(64);
        #[allow(clippy::cast_possible_truncation)]
        store.insert(object(), (0..len).map(|i| i as u8).collect::<Vec<_>>());
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_three_chunks_in_order() {
        let store = store_with(1000);
        let sequencer =
            ChunkSequencer::new(store.clone(), object(), ByteSpan::new(0, 999).unwrap(), nz(400));

        let buffers: Vec<FetchedBuffer> = sequencer
            .into_stream()
            .map(Result::unwrap)
            .collect()
            .await;

        let spans: Vec<ByteSpan> = buffers.iter().map(|b| b.span).collect();
        assert_eq!(
            spans,
            vec![
                ByteSpan::new(0, 399).unwrap(),
                ByteSpan::new(400, 799).unwrap(),
                ByteSpan::new(800, 999).unwrap(),
            ]
        );
        assert_eq!(buffers[1].data.len(), 400);
        assert_eq!(buffers[1].data[0], (400 % 256) as u8);
        assert_eq!(buffers[2].data.len(), 200);
        assert_eq!(store.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_fetches_only_on_demand() {
        let store = store_with(1000);
        let mut sequencer =
            ChunkSequencer::new(store.clone(), object(), ByteSpan::new(0, 999).unwrap(), nz(400));
        assert_eq!(store.fetch_count(), 0);

        let first = sequencer.next_chunk().await.unwrap().unwrap();
        assert_eq!(first.span, ByteSpan::new(0, 399).unwrap());
        assert_eq!(store.fetch_count(), 1);
        assert_eq!(sequencer.cursor(), Some(400));
    }

    #[tokio::test]
    async fn test_failure_terminates_sequence() {
        // Object is shorter than the span, so the last chunk is a short read
        let store = store_with(900);
        let mut sequencer =
            ChunkSequencer::new(store.clone(), object(), ByteSpan::new(0, 999).unwrap(), nz(400));

        assert!(sequencer.next_chunk().await.unwrap().is_ok());
        assert!(sequencer.next_chunk().await.unwrap().is_ok());
        let err = sequencer.next_chunk().await.unwrap().unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(sequencer.next_chunk().await.is_none());
        assert_eq!(sequencer.cursor(), None);
        assert_eq!(store.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_missing_object_error_is_propagated() {
        let store = Arc::new(MemoryStore::new());
        let mut sequencer =
            ChunkSequencer::new(store, object(), ByteSpan::new(0, 9).unwrap(), nz(4));
        let err = sequencer.next_chunk().await.unwrap().unwrap_err();
        assert_eq!(err, StoreError::NotFound("media/clip.mp4".to_string()));
        assert!(sequencer.next_chunk().await.is_none());
    }
}
