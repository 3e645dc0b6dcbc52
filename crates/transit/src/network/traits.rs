//! Pluggable networking traits.
//!
//! External crates implement these to provide data fetching capabilities.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::models::types::Result;

/// Inclusive byte range, as sent in an HTTP `Range` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// `len` bytes starting at `start`. `len` must be non-zero.
    pub fn from_len(start: u64, len: u64) -> Self {
        debug_assert!(len > 0);
        Self {
            start,
            end: start + len.max(1) - 1,
        }
    }

    /// Number of bytes covered.
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Fetch raw bytes, whole or by range, from a URL
///
/// Range requests that run past the end of the resource return the bytes
/// that exist, as HTTP servers do.
pub trait RangeFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

    fn fetch_range<'a>(
        &'a self,
        url: &'a str,
        range: ByteRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;
}
