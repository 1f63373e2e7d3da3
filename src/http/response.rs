//! HTTP response building module
//!
//! Builders for the relay's responses. Every body is a `ResponseBody` so that
//! buffered error pages and streamed object bodies share one response type.

use crate::config::HttpConfig;
use crate::http::range::RangePlan;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{header, Response, StatusCode};
use std::io;
use tracing::error;

/// Body type of every response; an `Err` frame aborts the connection
pub type ResponseBody = BoxBody<Bytes, io::Error>;

/// Buffered body
pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

/// Empty body
pub fn empty() -> ResponseBody {
    Empty::new().map_err(|never| match never {}).boxed()
}

fn text_response(status: StatusCode, message: &'static str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CONTENT_LENGTH, message.len())
        .body(full(message))
        .unwrap_or_else(|e| fallback(status, &e))
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<ResponseBody> {
    text_response(StatusCode::NOT_FOUND, "404 Not Found")
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed");
    response
        .headers_mut()
        .insert(header::ALLOW, header::HeaderValue::from_static("GET, HEAD, OPTIONS"));
    response
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(total_size: u64) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CONTENT_RANGE, format!("bytes */{total_size}"))
        .body(full("Range Not Satisfiable"))
        .unwrap_or_else(|e| fallback(StatusCode::RANGE_NOT_SATISFIABLE, &e))
}

/// Build 502 Bad Gateway response (store unavailable)
pub fn build_502_response() -> Response<ResponseBody> {
    text_response(StatusCode::BAD_GATEWAY, "502 Bad Gateway")
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(header::ALLOW, "GET, HEAD, OPTIONS");

    if enable_cors {
        builder = builder
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .header(header::ACCESS_CONTROL_ALLOW_METHODS, "GET, HEAD, OPTIONS")
            .header(header::ACCESS_CONTROL_ALLOW_HEADERS, "Range")
            .header(
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                "Accept-Ranges, Content-Length, Content-Range",
            )
            .header(header::ACCESS_CONTROL_MAX_AGE, "86400");
    }

    builder
        .body(empty())
        .unwrap_or_else(|e| fallback(StatusCode::NO_CONTENT, &e))
}

/// Build health check response
pub fn build_health_response(status: &'static str) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(full(status))
        .unwrap_or_else(|e| fallback(StatusCode::OK, &e))
}

/// Build 206 Partial Content response around a (possibly streaming) body
pub fn build_partial_response(
    body: ResponseBody,
    plan: &RangePlan,
    content_type: &str,
    http: &HttpConfig,
) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, plan.content_length)
        .header(header::CONTENT_RANGE, plan.content_range.as_str())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::SERVER, http.server_name.as_str());

    if http.enable_cors {
        builder = builder
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .header(
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                "Accept-Ranges, Content-Length, Content-Range",
            );
    }

    builder
        .body(body)
        .unwrap_or_else(|e| fallback(StatusCode::INTERNAL_SERVER_ERROR, &e))
}

/// Log response build error and fall back to a bare status
fn fallback(status: StatusCode, e: &hyper::http::Error) -> Response<ResponseBody> {
    error!("Failed to build {status} response: {e}");
    let mut response = Response::new(empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
