//! In-memory object store
//!
//! Serves ranged reads from objects held in memory. Used by tests and for
//! exercising the relay without network access.

use super::{ByteStream, ObjectMeta, ObjectRef, ObjectStore};
use crate::error::{StoreError, StoreResult};
use crate::span::ByteSpan;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Frame size used when streaming a ranged read
const DEFAULT_FRAME_SIZE: usize = 64 * 1024;

pub struct MemoryStore {
    objects: RwLock<HashMap<ObjectRef, Bytes>>,
    frame_size: usize,
    heads: AtomicUsize,
    fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_frame_size(DEFAULT_FRAME_SIZE)
    }

    /// Split every ranged read into frames of at most `frame_size` bytes
    pub fn with_frame_size(frame_size: usize) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            frame_size: frame_size.max(1),
            heads: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, object: ObjectRef, data: impl Into<Bytes>) {
        let mut objects = self
            .objects
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        objects.insert(object, data.into());
    }

    /// Number of `get_object` calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of `head_object` calls served so far
    pub fn head_count(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    fn lookup(&self, object: &ObjectRef) -> StoreResult<Bytes> {
        let objects = self
            .objects
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        objects
            .get(object)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(object.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn head_object(&self, object: &ObjectRef) -> StoreResult<ObjectMeta> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        let data = self.lookup(object)?;
        Ok(ObjectMeta {
            size: data.len() as u64,
        })
    }

    async fn get_object(&self, object: &ObjectRef, span: ByteSpan) -> StoreResult<ByteStream> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let data = self.lookup(object)?;

        let start = usize::try_from(span.start()).unwrap_or(usize::MAX);
        if start >= data.len() {
            return Err(StoreError::Unavailable(format!(
                "range {span} outside {} bytes of {object}",
                data.len()
            )));
        }
        // Like S3, clamp the end of the range to the object
        let end = usize::try_from(span.end())
            .unwrap_or(usize::MAX)
            .min(data.len() - 1);
        let body = data.slice(start..=end);

        let frames: Vec<StoreResult<Bytes>> = (0..body.len())
            .step_by(self.frame_size)
            .map(|offset| Ok(body.slice(offset..(offset + self.frame_size).min(body.len()))))
            .collect();
        Ok(Box::pin(futures::stream::iter(frames)))
    }
}
