//! Range reads from local files.

use std::future::Future;
use std::io::SeekFrom;
use std::path::Path;
use std::pin::Pin;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::trace;

use super::traits::{ByteRange, RangeFetcher};
use crate::models::types::Result;

/// Treats URLs as file system paths, with an optional `file://` prefix.
///
/// Range requests seek and read only the requested bytes; a range past the
/// end of the file is clamped like an HTTP server would.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileRangeFetcher;

impl FileRangeFetcher {
    pub fn new() -> Self {
        Self
    }

    async fn read(&self, url: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        let mut file = File::open(path).await?;

        let Some(range) = range else {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes).await?;
            return Ok(bytes);
        };

        let len = file.metadata().await?.len();
        let start = range.start.min(len);
        let end = range.end.saturating_add(1).min(len);
        trace!(url, %range, len, "reading file range");

        file.seek(SeekFrom::Start(start)).await?;
        let mut bytes = Vec::with_capacity((end - start) as usize);
        file.take(end - start).read_to_end(&mut bytes).await?;
        Ok(bytes)
    }
}

impl RangeFetcher for FileRangeFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(self.read(url, None))
    }

    fn fetch_range<'a>(
        &'a self,
        url: &'a str,
        range: ByteRange,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(self.read(url, Some(range)))
    }
}
