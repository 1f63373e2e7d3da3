//! HTTP Range planning module
//!
//! Turns an inbound `Range` header into the single bounded window served by
//! one response.
//!
//! Only the first integer in the header is honoured, as the requested start.
//! An explicit end (`bytes=0-99`) is ignored and a header without any digits
//! counts as a request from offset 0. Every response is capped at `max_span`
//! bytes; players fetch the next window with a follow-up request.

use crate::error::RangeNotSatisfiable;
use crate::span::ByteSpan;
use std::num::NonZeroU64;

/// Window chosen for one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePlan {
    /// Inclusive span to stream
    pub span: ByteSpan,
    /// `Content-Length` of the response body
    pub content_length: u64,
    /// `Content-Range` header value, e.g. `bytes 500-799/1000`
    pub content_range: String,
}

/// Extract the requested start offset from a `Range` header
///
/// Returns `None` when the header holds no digits. A run of digits too large
/// for `u64` saturates, so it is reported as unsatisfiable rather than
/// silently restarting at 0.
pub fn requested_start(range_header: &str) -> Option<u64> {
    let digits: &str = range_header
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .filter(|d| !d.is_empty())?;

    Some(digits.parse().unwrap_or(u64::MAX))
}

/// Plan the span served for a request
///
/// # Examples
/// ```
/// use std::num::NonZeroU64;
/// use s3relay::http::range::plan;
///
/// let max_span = NonZeroU64::new(300).unwrap();
/// let plan = plan(Some("bytes=500-"), 1000, max_span).unwrap();
/// assert_eq!(plan.content_range, "bytes 500-799/1000");
/// assert_eq!(plan.content_length, 300);
/// ```
pub fn plan(
    range_header: Option<&str>,
    total_size: u64,
    max_span: NonZeroU64,
) -> Result<RangePlan, RangeNotSatisfiable> {
    let start = range_header.and_then(requested_start).unwrap_or(0);
    let not_satisfiable = RangeNotSatisfiable {
        start,
        total: total_size,
    };

    if start >= total_size {
        return Err(not_satisfiable);
    }
    let end = start
        .saturating_add(max_span.get() - 1)
        .min(total_size - 1);
    let span = ByteSpan::new(start, end).ok_or(not_satisfiable)?;

    Ok(RangePlan {
        span,
        content_length: span.len(),
        content_range: span.to_content_range(total_size),
    })
}

/// Plan covering the whole object regardless of any window limit
///
/// Empty objects have no span; callers handle them before planning.
pub fn plan_full(total_size: NonZeroU64) -> RangePlan {
    let span = ByteSpan::whole(total_size);
    RangePlan {
        span,
        content_length: span.len(),
        content_range: span.to_content_range(total_size.get()),
    }
}
