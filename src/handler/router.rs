//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, the health
//! probe, object key extraction and dispatch to the object handler.

use crate::config::AppState;
use crate::handler::object;
use crate::http::{self, ResponseBody};
use crate::logger::RelayEvent;
use hyper::{header, Method, Request, Response};
use percent_encoding::percent_decode_str;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Request context encapsulating what the object handler needs
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub key: String,
    pub range_header: Option<String>,
    pub user_agent: Option<String>,
    pub peer_addr: SocketAddr,
    pub received_at: Instant,
}

impl RequestContext {
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type is accepted.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    match route(&req, &state, peer_addr) {
        Ok(ctx) => Ok(object::serve_object(ctx, &state).await),
        Err(resp) => Ok(resp),
    }
}

/// Answer requests that need no store access, or build the object request context
fn route<B>(
    req: &Request<B>,
    state: &AppState,
    peer_addr: SocketAddr,
) -> Result<RequestContext, Response<ResponseBody>> {
    let received_at = Instant::now();
    let method = req.method();
    let path = req.uri().path();
    let range_header = header_value(req, header::RANGE);

    state.events.emit(&RelayEvent::RequestReceived {
        method: method.as_str(),
        path,
        range: range_header.as_deref(),
    });

    // 1. Check HTTP method
    if let Some(resp) = check_http_method(method, state.config.http.enable_cors) {
        return Err(resp);
    }

    // 2. Health probe
    if path == state.config.http.health_path {
        return Err(http::build_health_response("ok"));
    }

    // 3. Object key
    let key = object_key(path).ok_or_else(http::build_404_response)?;

    Ok(RequestContext {
        method: method.clone(),
        path: path.to_string(),
        key,
        range_header,
        user_agent: header_value(req, header::USER_AGENT),
        peer_addr,
        received_at,
    })
}

/// Check HTTP method and return appropriate response for non-GET/HEAD methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<Response<ResponseBody>> {
    match *method {
        Method::GET | Method::HEAD => None,
        Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            warn!("Method not allowed: {method}");
            Some(http::build_405_response())
        }
    }
}

/// Object key for a request path: the path without its leading `/`, percent-decoded
///
/// Returns `None` for an empty key or one that is not valid UTF-8.
pub fn object_key(path: &str) -> Option<String> {
    let encoded = path.strip_prefix('/').unwrap_or(path);
    let key = percent_decode_str(encoded).decode_utf8().ok()?;
    if key.is_empty() {
        None
    } else {
        Some(key.into_owned())
    }
}

fn header_value<B>(req: &Request<B>, name: header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}
