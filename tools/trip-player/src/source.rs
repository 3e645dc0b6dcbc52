//! Fetcher that serves http(s) URLs over the network and everything else
//! from local files.

use std::future::Future;
use std::pin::Pin;

use zurich_transit::{ByteRange, FileRangeFetcher, HttpRangeFetcher, RangeFetcher, StreamError};

#[derive(Default)]
pub struct RoutingFetcher {
    http: HttpRangeFetcher,
    local: FileRangeFetcher,
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl RoutingFetcher {
    pub fn new() -> Self {
        Self {
            http: HttpRangeFetcher::new(),
            local: FileRangeFetcher::new(),
        }
    }
}

impl RangeFetcher for RoutingFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, StreamError>> + Send + 'a>> {
        if is_remote(url) {
            self.http.fetch(url)
        } else {
            self.local.fetch(url)
        }
    }

    fn fetch_range<'a>(
        &'a self,
        url: &'a str,
        range: ByteRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, StreamError>> + Send + 'a>> {
        if is_remote(url) {
            self.http.fetch_range(url, range)
        } else {
            self.local.fetch_range(url, range)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://tiles.example/trips.bin"));
        assert!(is_remote("http://localhost:8080/trips.bin"));
        assert!(!is_remote("data/trips.bin"));
        assert!(!is_remote("/srv/trips.bin"));
    }

    #[tokio::test]
    async fn test_local_paths_read_by_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.bin");
        tokio::fs::write(&path, b"GTFS\x01\x00").await.unwrap();
        let url = path.to_string_lossy().into_owned();

        let fetcher = RoutingFetcher::new();
        let bytes = fetcher.fetch_range(&url, ByteRange::from_len(0, 4)).await.unwrap();
        assert_eq!(bytes, b"GTFS");

        let missing = dir.path().join("missing.bin").to_string_lossy().into_owned();
        let error = fetcher.fetch(&missing).await.unwrap_err();
        assert!(error.is_fallback_trigger());
    }
}
