//! Relay module
//!
//! The streaming core: size resolution, chunked fetching and the relay loop
//! that moves fetched buffers into a sink under one transfer session.

pub mod download;
#[allow(clippy::module_inception)]
pub mod relay;
pub mod resolver;
pub mod sequencer;
pub mod session;
pub mod sink;

pub use download::download;
pub use relay::relay;
pub use resolver::resolve_size;
pub use sequencer::{ChunkSequencer, FetchedBuffer};
pub use session::{RelayState, TransferSession, TransferSummary};
pub use sink::{channel, ChannelSink, FileSink, Sink};
