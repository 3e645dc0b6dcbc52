//! HTTP range fetcher backed by reqwest.

use std::future::Future;
use std::pin::Pin;

use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::traits::{ByteRange, RangeFetcher};
use crate::models::types::{Result, StreamError};

#[derive(Clone, Debug, Default)]
pub struct HttpRangeFetcher {
    client: Client,
}

impl HttpRangeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Http {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.bytes().await?;

        match range {
            // Server ignored the Range header and sent the whole resource.
            Some(range) if status == StatusCode::OK => {
                debug!(url, %range, "server ignored range request, slicing full body");
                Ok(slice_range(&body, range).to_vec())
            }
            _ => Ok(body.to_vec()),
        }
    }
}

impl RangeFetcher for HttpRangeFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(self.get(url, None))
    }

    fn fetch_range<'a>(
        &'a self,
        url: &'a str,
        range: ByteRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(self.get(url, Some(range)))
    }
}

/// The part of `body` covered by `range`, clamped to the body length.
pub(crate) fn slice_range(body: &[u8], range: ByteRange) -> &[u8] {
    let len = body.len() as u64;
    let start = range.start.min(len) as usize;
    let end = range.end.saturating_add(1).min(len) as usize;
    &body[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_range() {
        let body: Vec<u8> = (0..10).collect();
        assert_eq!(slice_range(&body, ByteRange::from_len(2, 3)), &[2, 3, 4]);
        assert_eq!(slice_range(&body, ByteRange::from_len(8, 100)), &[8, 9]);
        assert!(slice_range(&body, ByteRange::from_len(20, 4)).is_empty());
    }
}
