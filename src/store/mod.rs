//! Object store module
//!
//! The remote store is a collaborator: the relay only needs a metadata call
//! and a ranged read. Transport, signing and pooling belong to the
//! implementation.

pub mod memory;
pub mod s3;

use crate::error::StoreResult;
use crate::span::ByteSpan;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::fmt;
use std::pin::Pin;

pub use memory::MemoryStore;
pub use s3::S3ObjectStore;

/// Identifies a remote object (bucket + key)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Metadata returned by a HEAD call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
}

/// Body of a ranged read, as a stream of frames
pub type ByteStream = Pin<Box<dyn Stream<Item = StoreResult<Bytes>> + Send>>;

/// Read-only capability over a remote object store
///
/// Implementations are shared by all concurrent sessions.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch object metadata; `NotFound` and `Unavailable` must stay distinct
    async fn head_object(&self, object: &ObjectRef) -> StoreResult<ObjectMeta>;

    /// Start a ranged read of `span` (inclusive)
    async fn get_object(&self, object: &ObjectRef, span: ByteSpan) -> StoreResult<ByteStream>;
}
