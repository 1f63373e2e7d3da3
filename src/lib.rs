//! s3relay
//!
//! Streams byte ranges of objects held in an S3-compatible store to HTTP
//! clients. Every response serves one bounded window of the object, fetched
//! from the store chunk by chunk with no read-ahead, so memory per session
//! stays at one chunk and slow clients throttle store reads.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod relay;
pub mod server;
pub mod span;
pub mod store;
