//! In-memory fetcher for local files and tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use super::http::slice_range;
use super::traits::{ByteRange, RangeFetcher};
use crate::models::types::{Result, StreamError};

/// One request seen by a [`MemoryFetcher`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestRecord {
    pub url: String,
    pub range: Option<ByteRange>,
}

/// Serves byte buffers registered under URL keys.
///
/// Unknown URLs answer like a 404. Every request is recorded.
#[derive(Default)]
pub struct MemoryFetcher {
    files: HashMap<String, Arc<[u8]>>,
    requests: Mutex<Vec<RequestRecord>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.files.insert(url.into(), bytes.into());
    }

    pub fn with_file(mut self, url: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn requests(&self) -> Vec<RequestRecord> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of requests made for `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.url == url).count()
    }

    fn serve(&self, url: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RequestRecord {
                url: url.to_owned(),
                range,
            });
        }

        let file = self.files.get(url).ok_or_else(|| StreamError::Http {
            status: 404,
            url: url.to_owned(),
        })?;

        Ok(match range {
            Some(range) => slice_range(file, range).to_vec(),
            None => file.to_vec(),
        })
    }
}

impl RangeFetcher for MemoryFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move { self.serve(url, None) })
    }

    fn fetch_range<'a>(
        &'a self,
        url: &'a str,
        range: ByteRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            // Yield once so concurrent callers interleave like real requests.
            tokio::task::yield_now().await;
            self.serve(url, Some(range))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_ranges_and_records_requests() {
        let fetcher = MemoryFetcher::new().with_file("a.bin", vec![1u8, 2, 3, 4, 5]);

        let bytes = fetcher
            .fetch_range("a.bin", ByteRange::from_len(1, 2))
            .await
            .unwrap();
        assert_eq!(bytes, vec![2, 3]);

        let all = fetcher.fetch("a.bin").await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(fetcher.request_count("a.bin"), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let fetcher = MemoryFetcher::new();
        let error = fetcher.fetch("nope.bin").await.unwrap_err();
        assert!(matches!(error, StreamError::Http { status: 404, .. }));
    }
}
