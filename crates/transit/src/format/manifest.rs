//! Side-channel manifest listing the byte range of every hour chunk.
//!
//! The manifest, not the inline chunk index table, is the canonical source
//! of chunk locations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::types::{ChunkInfo, FormatError};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub chunks: Vec<ManifestChunk>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestChunk {
    pub hour: u32,
    pub offset: u32,
    pub size: u32,
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        serde_json::from_slice(bytes).map_err(|e| FormatError::Manifest(e.to_string()))
    }

    /// Manifest URL for a binary file: `trips.bin` becomes `trips.manifest.json`.
    ///
    /// Any query string or fragment is carried over unchanged.
    pub fn url_for(binary_url: &str) -> String {
        let path_end = binary_url.find(['?', '#']).unwrap_or(binary_url.len());
        let (path, suffix) = binary_url.split_at(path_end);
        let base = path.strip_suffix(".bin").unwrap_or(path);
        format!("{base}.manifest.json{suffix}")
    }

    /// Chunk byte ranges keyed by hour.
    ///
    /// Empty chunks are dropped; when an hour appears twice the last entry wins.
    pub fn chunk_index(&self) -> BTreeMap<u32, ChunkInfo> {
        let mut index = BTreeMap::new();

        for chunk in &self.chunks {
            if chunk.size == 0 {
                debug!(hour = chunk.hour, "skipping empty chunk in manifest");
                continue;
            }

            let info = ChunkInfo {
                hour: chunk.hour,
                byte_offset: chunk.offset,
                byte_size: chunk.size,
            };
            if index.insert(chunk.hour, info).is_some() {
                warn!(hour = chunk.hour, "duplicate hour in manifest");
            }
        }

        index
    }
}
