//! Byte span module
//!
//! Inclusive byte intervals and their partition into bounded chunk descriptors.

use std::fmt;
use std::num::NonZeroU64;

/// Inclusive `[start, end]` byte interval within an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteSpan {
    start: u64,
    end: u64,
}

impl ByteSpan {
    /// Create a span, rejecting `start > end`
    pub const fn new(start: u64, end: u64) -> Option<Self> {
        if start > end {
            None
        } else {
            Some(Self { start, end })
        }
    }

    /// Span covering a whole object of `size` bytes
    pub const fn whole(size: NonZeroU64) -> Self {
        Self {
            start: 0,
            end: size.get() - 1,
        }
    }

    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Number of bytes covered (never zero)
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Range` request header value for this span, e.g. `bytes=0-99`
    pub fn to_range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    /// `Content-Range` response header value for this span
    pub fn to_content_range(&self, total_size: u64) -> String {
        format!("bytes {}-{}/{total_size}", self.start, self.end)
    }

    /// Partition the span into ascending descriptors of at most `chunk_size` bytes
    pub const fn chunks(self, chunk_size: NonZeroU64) -> Chunks {
        Chunks {
            cursor: Some(self.start),
            end: self.end,
            chunk_size: chunk_size.get(),
        }
    }
}

impl fmt::Display for ByteSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Iterator over the chunk descriptors of a span
///
/// Descriptors are contiguous, non-overlapping and cover the span exactly.
#[derive(Debug, Clone)]
pub struct Chunks {
    /// Start of the next descriptor, `None` once the span is exhausted
    cursor: Option<u64>,
    end: u64,
    chunk_size: u64,
}

impl Chunks {
    /// Offset the next descriptor will start at
    pub const fn cursor(&self) -> Option<u64> {
        self.cursor
    }
}

impl Iterator for Chunks {
    type Item = ByteSpan;

    fn next(&mut self) -> Option<ByteSpan> {
        let start = self.cursor?;
        let end = start.saturating_add(self.chunk_size - 1).min(self.end);
        // end < self.end implies end + 1 cannot overflow
        self.cursor = if end == self.end { None } else { Some(end + 1) };
        Some(ByteSpan { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.map_or((0, Some(0)), |start| {
            let remaining = self.end - start;
            let count = usize::try_from(remaining / self.chunk_size + 1).ok();
            (count.unwrap_or(usize::MAX), count)
        })
    }
}

impl std::iter::FusedIterator for Chunks {}
