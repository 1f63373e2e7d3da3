//! Relay sinks
//!
//! A sink accepts the relay's buffers in order. `write` may suspend until the
//! consumer is ready for more data; that suspension is the backpressure the
//! relay waits on before requesting the next chunk.

use crate::error::RelayError;
use crate::http::response::ResponseBody;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::warn;

#[async_trait]
pub trait Sink: Send {
    /// Accept one buffer, suspending until the consumer has room for it
    async fn write(&mut self, data: Bytes) -> io::Result<()>;

    /// Finalize after the last buffer
    async fn finish(&mut self) -> io::Result<()>;

    /// Tear down after a failed or cancelled transfer
    async fn abort(&mut self, _error: &RelayError) {}
}

type FrameSender = mpsc::Sender<io::Result<Frame<Bytes>>>;

/// Sink feeding a streamed HTTP response body
pub struct ChannelSink {
    tx: Option<FrameSender>,
}

/// Create a response body and the sink that feeds it
///
/// The channel holds a single frame, so a write returns only once the
/// connection has taken the previous one.
pub fn channel() -> (ChannelSink, ResponseBody) {
    let (tx, rx) = mpsc::channel(1);
    let frames = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|frame| (frame, rx))
    });
    let body = StreamBody::new(frames).boxed();
    (ChannelSink { tx: Some(tx) }, body)
}

fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected")
}

#[async_trait]
impl Sink for ChannelSink {
    async fn write(&mut self, data: Bytes) -> io::Result<()> {
        let tx = self.tx.as_ref().ok_or_else(disconnected)?;
        tx.send(Ok(Frame::data(data)))
            .await
            .map_err(|_| disconnected())
    }

    async fn finish(&mut self) -> io::Result<()> {
        // Dropping the sender ends the body
        self.tx = None;
        Ok(())
    }

    async fn abort(&mut self, error: &RelayError) {
        // An error frame resets the connection. If the slot is still taken,
        // closing the body short of Content-Length has the same effect.
        if let Some(tx) = self.tx.take() {
            let _ = tx.try_send(Err(io::Error::other(error.to_string())));
        }
    }
}

/// Sink writing to a local file; the partial file is removed on abort
pub struct FileSink {
    file: BufWriter<File>,
    path: PathBuf,
}

impl FileSink {
    pub async fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).await?;
        Ok(Self {
            file: BufWriter::new(file),
            path,
        })
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn write(&mut self, data: Bytes) -> io::Result<()> {
        self.file.write_all(&data).await
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.file.flush().await?;
        self.file.get_ref().sync_all().await
    }

    async fn abort(&mut self, error: &RelayError) {
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(
                "Failed to remove partial file {} after {}: {e}",
                self.path.display(),
                error.kind()
            );
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Sink;
    use crate::error::RelayError;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::io;

    /// Collects writes in memory; optionally rejects the n-th write (1-based)
    #[derive(Default)]
    pub struct MemorySink {
        pub writes: Vec<Bytes>,
        pub fail_on_write: Option<usize>,
        pub finished: bool,
        pub aborted: Option<&'static str>,
        attempts: usize,
    }

    impl MemorySink {
        pub fn failing_on(write: usize) -> Self {
            Self {
                fail_on_write: Some(write),
                ..Self::default()
            }
        }

        pub fn bytes(&self) -> Vec<u8> {
            self.writes.iter().flat_map(|b| b.iter().copied()).collect()
        }
    }

    #[async_trait]
    impl Sink for MemorySink {
        async fn write(&mut self, data: Bytes) -> io::Result<()> {
            self.attempts += 1;
            if self.fail_on_write == Some(self.attempts) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
            }
            self.writes.push(data);
            Ok(())
        }

        async fn finish(&mut self) -> io::Result<()> {
            self.finished = true;
            Ok(())
        }

        async fn abort(&mut self, error: &RelayError) {
            self.aborted = Some(error.kind());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[tokio::test]
    async fn test_channel_sink_feeds_body() {
        let (mut sink, body) = channel();
        let reader = tokio::spawn(async move { body.collect().await.map(|c| c.to_bytes()) });

        sink.write(Bytes::from_static(b"hello ")).await.unwrap();
        sink.write(Bytes::from_static(b"world")).await.unwrap();
        sink.finish().await.unwrap();

        let collected = reader.await.unwrap().unwrap();
        assert_eq!(collected, Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_channel_sink_dropped_body_is_error() {
        let (mut sink, body) = channel();
        drop(body);
        let err = sink.write(Bytes::from_static(b"x")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_channel_sink_abort_errors_body() {
        let (mut sink, body) = channel();
        sink.abort(&RelayError::Fetch(StoreError::Unavailable("boom".into())))
            .await;
        assert!(body.collect().await.is_err());
    }

    #[tokio::test]
    async fn test_file_sink_writes_and_removes_on_abort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");

        let mut sink = FileSink::create(&path).await.unwrap();
        sink.write(Bytes::from_static(b"abc")).await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");

        let mut sink = FileSink::create(&path).await.unwrap();
        sink.write(Bytes::from_static(b"partial")).await.unwrap();
        sink.abort(&RelayError::Cancelled).await;
        assert!(!path.exists());
    }
}
