//! S3 store client
//!
//! HEAD and ranged GET through `aws-sdk-s3`. Requests are SigV4-signed with
//! `store.access_key_id`/`store.secret_access_key` when both are set, and with
//! the default provider chain otherwise (`AWS_*` environment variables,
//! profile files, instance metadata). A custom `endpoint` switches to
//! path-style addressing for S3-compatible gateways.

use super::{ByteStream, ObjectMeta, ObjectRef, ObjectStore};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::span::ByteSpan;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::Client;
use futures::stream;
use tracing::debug;

/// Store client shared by all sessions; the SDK pools connections internally
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub async fn new(config: &StoreConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(credentials) = static_credentials(config) {
            loader = loader.credentials_provider(credentials);
        }
        let shared = loader.load().await;

        // Failures surface to the session as they happen, never retried
        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .retry_config(RetryConfig::disabled())
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.request_timeout())
                    .build(),
            );
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        debug!(
            "Store client ready: endpoint={}, region={}, timeout={}s, static credentials={}",
            config.endpoint_display(),
            config.region,
            config.request_timeout,
            config.access_key_id.is_some()
        );

        Self {
            client: Client::from_conf(builder.build()),
        }
    }
}

fn static_credentials(config: &StoreConfig) -> Option<Credentials> {
    match (&config.access_key_id, &config.secret_access_key) {
        (Some(key_id), Some(secret)) => Some(Credentials::new(
            key_id.as_str(),
            secret.as_str(),
            None,
            None,
            "relay-config",
        )),
        _ => None,
    }
}

/// Map an SDK failure to the store error taxonomy
///
/// `missing` recognises the operation's modelled not-found error; a bare 404
/// or 410 counts as missing too, since HEAD responses carry no error body.
fn store_error<E>(error: &SdkError<E>, object: &ObjectRef, missing: fn(&E) -> bool) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = error.raw_response().map(|r| r.status().as_u16());
    if error.as_service_error().is_some_and(missing) || matches!(status, Some(404 | 410)) {
        return StoreError::NotFound(object.to_string());
    }
    match status {
        Some(status) => StoreError::Unavailable(format!(
            "store returned {status} for {object}: {}",
            DisplayErrorContext(error)
        )),
        None => StoreError::Unavailable(format!(
            "request for {object} failed: {}",
            DisplayErrorContext(error)
        )),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn head_object(&self, object: &ObjectRef) -> StoreResult<ObjectMeta> {
        let output = self
            .client
            .head_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| store_error(&e, object, HeadObjectError::is_not_found))?;

        let size = output
            .content_length()
            .and_then(|len| u64::try_from(len).ok())
            .ok_or_else(|| {
                StoreError::Unavailable(format!("HEAD for {object} returned no Content-Length"))
            })?;

        Ok(ObjectMeta { size })
    }

    async fn get_object(&self, object: &ObjectRef, span: ByteSpan) -> StoreResult<ByteStream> {
        let output = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .range(span.to_range_header())
            .send()
            .await
            .map_err(|e| store_error(&e, object, GetObjectError::is_no_such_key))?;

        // A full-object answer is only usable when it happens to be the span
        let expected = i64::try_from(span.len()).ok();
        if output.content_range().is_none() && output.content_length() != expected {
            return Err(StoreError::Unavailable(format!(
                "store ignored range {span} for {object}"
            )));
        }

        let body = stream::unfold(
            Some((output.body, object.to_string())),
            |state| async move {
                let (mut body, name) = state?;
                match body.next().await? {
                    Ok(frame) => Some((Ok(frame), Some((body, name)))),
                    Err(e) => Some((
                        Err(StoreError::Unavailable(format!(
                            "body read for {name} failed: {e}"
                        ))),
                        None,
                    )),
                }
            },
        );

        Ok(Box::pin(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;
    use crate::logger::testing::RecordingLog;
    use crate::relay::sink::testing::MemorySink;
    use crate::relay::{relay, ChunkSequencer, TransferSession};
    use bytes::Bytes;
    use futures::StreamExt;
    use http_body_util::Full;
    use hyper::body::Incoming;
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::{header, Method, Request, Response};
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::num::NonZeroU64;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    const OBJECT: &[u8] = b"0123456789abcdefghij";
    const KEY_ID: &str = "AKIDRELAYTEST";

    fn store_config(endpoint: &str) -> StoreConfig {
        StoreConfig {
            bucket: "media".to_string(),
            region: "us-east-1".to_string(),
            endpoint: Some(endpoint.to_string()),
            request_timeout: 5,
            access_key_id: Some(KEY_ID.to_string()),
            secret_access_key: Some("relay-test-secret".to_string()),
        }
    }

    type SeenAuth = Arc<Mutex<Vec<Option<String>>>>;

    /// Minimal S3 stand-in recording each request's `Authorization` header
    ///
    /// `/media/clip.mp4` exists, `/media/ignores-range` answers 200,
    /// `/media/private.mp4` is forbidden and `/media/broken` fails.
    async fn spawn_fake_s3() -> (String, SeenAuth) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: SeenAuth = Arc::default();
        let recorder = Arc::clone(&seen);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let recorder = Arc::clone(&recorder);
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let recorder = Arc::clone(&recorder);
                        async move {
                            recorder.lock().unwrap().push(
                                req.headers()
                                    .get(header::AUTHORIZATION)
                                    .map(|v| v.to_str().unwrap().to_string()),
                            );
                            Ok::<_, Infallible>(fake_response(&req))
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        (format!("http://{addr}"), seen)
    }

    fn fake_response(req: &Request<Incoming>) -> Response<Full<Bytes>> {
        let builder = Response::builder();
        let response = match (req.method(), req.uri().path()) {
            (&Method::HEAD, "/media/clip.mp4") => builder
                .header(header::CONTENT_LENGTH, OBJECT.len())
                .body(Full::new(Bytes::new())),
            (&Method::GET, "/media/clip.mp4") => {
                let range = req.headers()[header::RANGE].to_str().unwrap();
                let (start, end) = range
                    .trim_start_matches("bytes=")
                    .split_once('-')
                    .unwrap();
                let (start, end): (usize, usize) = (start.parse().unwrap(), end.parse().unwrap());
                builder
                    .status(206)
                    .header(
                        header::CONTENT_RANGE,
                        format!("bytes {start}-{end}/{}", OBJECT.len()),
                    )
                    .body(Full::new(Bytes::copy_from_slice(&OBJECT[start..=end])))
            }
            (&Method::GET, "/media/ignores-range") => {
                builder.body(Full::new(Bytes::from_static(OBJECT)))
            }
            (_, "/media/private.mp4") => builder.status(403).body(Full::new(Bytes::new())),
            (_, "/media/broken") => builder.status(500).body(Full::new(Bytes::new())),
            _ => builder.status(404).body(Full::new(Bytes::new())),
        };
        response.unwrap()
    }

    /// Answers one ranged GET with 8 of the 20 promised bytes, then hangs up
    async fn spawn_truncating_s3() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let head = "HTTP/1.1 206 Partial Content\r\n\
                        Content-Length: 20\r\n\
                        Content-Range: bytes 0-19/20\r\n\r\n";
            let _ = stream.write_all(head.as_bytes()).await;
            let _ = stream.write_all(&OBJECT[..8]).await;
            let _ = stream.shutdown().await;
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_head_and_ranged_get() {
        let (endpoint, _) = spawn_fake_s3().await;
        let store = S3ObjectStore::new(&store_config(&endpoint)).await;
        let object = ObjectRef::new("media", "clip.mp4");

        let meta = store.head_object(&object).await.unwrap();
        assert_eq!(meta.size, OBJECT.len() as u64);

        let span = ByteSpan::new(4, 9).unwrap();
        let body: Vec<Bytes> = store
            .get_object(&object, span)
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;
        assert_eq!(body.concat(), b"456789");
    }

    #[tokio::test]
    async fn test_requests_are_signed_with_configured_credentials() {
        let (endpoint, seen) = spawn_fake_s3().await;
        let store = S3ObjectStore::new(&store_config(&endpoint)).await;

        store
            .head_object(&ObjectRef::new("media", "clip.mp4"))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let authorization = seen[0].as_deref().unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDRELAYTEST/"));
        assert!(authorization.contains("/us-east-1/s3/aws4_request"));
    }

    #[tokio::test]
    async fn test_missing_and_failing_objects() {
        let (endpoint, seen) = spawn_fake_s3().await;
        let store = S3ObjectStore::new(&store_config(&endpoint)).await;

        let missing = store.head_object(&ObjectRef::new("media", "nope.mp4")).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));

        let missing = store
            .get_object(&ObjectRef::new("media", "nope.mp4"), ByteSpan::new(0, 4).unwrap())
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));

        let forbidden = store.head_object(&ObjectRef::new("media", "private.mp4")).await;
        assert!(matches!(forbidden, Err(StoreError::Unavailable(_))));

        let broken = store.head_object(&ObjectRef::new("media", "broken")).await;
        assert!(matches!(broken, Err(StoreError::Unavailable(_))));

        // One call each, nothing retried
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_ignored_range_is_rejected() {
        let (endpoint, _) = spawn_fake_s3().await;
        let store = S3ObjectStore::new(&store_config(&endpoint)).await;
        let result = store
            .get_object(
                &ObjectRef::new("media", "ignores-range"),
                ByteSpan::new(0, 4).unwrap(),
            )
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_body_cut_short_ends_with_error_frame() {
        let store = S3ObjectStore::new(&store_config(&spawn_truncating_s3().await)).await;

        let frames: Vec<StoreResult<Bytes>> = store
            .get_object(&ObjectRef::new("media", "clip.mp4"), ByteSpan::new(0, 19).unwrap())
            .await
            .unwrap()
            .collect()
            .await;

        let (last, delivered) = frames.split_last().unwrap();
        assert!(matches!(last, Err(StoreError::Unavailable(_))));
        let delivered: Vec<u8> = delivered
            .iter()
            .flat_map(|frame| frame.as_ref().unwrap().to_vec())
            .collect();
        assert!(delivered.len() <= 8);
        assert_eq!(&delivered[..], &OBJECT[..delivered.len()]);
    }

    #[tokio::test]
    async fn test_body_cut_short_fails_the_relay() {
        let store: Arc<dyn ObjectStore> =
            Arc::new(S3ObjectStore::new(&store_config(&spawn_truncating_s3().await)).await);
        let object = ObjectRef::new("media", "clip.mp4");
        let span = ByteSpan::new(0, 19).unwrap();

        let mut session = TransferSession::new(1, object.clone(), span, CancellationToken::new());
        let sequence =
            ChunkSequencer::new(store, object, span, NonZeroU64::new(20).unwrap()).into_stream();
        let mut sink = MemorySink::default();

        let err = relay(&mut session, sequence, &mut sink, &RecordingLog::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Fetch(StoreError::Unavailable(_))));
        assert!(sink.bytes().is_empty());
        assert_eq!(sink.aborted, Some("fetch_error"));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = S3ObjectStore::new(&store_config(&format!("http://{addr}"))).await;
        let result = store.head_object(&ObjectRef::new("media", "clip.mp4")).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_static_credentials_need_both_halves() {
        let mut config = store_config("http://127.0.0.1:9000");
        assert!(static_credentials(&config).is_some());
        config.secret_access_key = None;
        assert!(static_credentials(&config).is_none());
    }
}
