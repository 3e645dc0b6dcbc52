//! File header parsing and validation.

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, IntoBytes};

use super::layout::RawHeader;
use super::{GTFS_BINARY_MAGIC, GTFS_BINARY_VERSION, GTFS_HEADER_SIZE};
use crate::models::types::FormatError;

/// Counts and table offsets from the start of a binary trip file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub shape_count: u32,
    pub route_count: u32,
    pub headsign_count: u32,
    pub chunk_count: u32,
    pub shape_table_offset: u32,
    pub route_table_offset: u32,
}

impl Header {
    /// Parse and validate the header at the start of `bytes`.
    ///
    /// Only magic and version are checked; a corrupt file that gets past
    /// them will surface later as out-of-bounds or truncated tables.
    pub fn parse(bytes: &[u8]) -> Result<Self, FormatError> {
        let (raw, _) = RawHeader::read_from_prefix(bytes).map_err(|_| FormatError::Truncated {
            section: "header",
            needed: GTFS_HEADER_SIZE,
            available: bytes.len(),
        })?;

        let magic = raw.magic.get();
        if magic != GTFS_BINARY_MAGIC {
            return Err(FormatError::BadMagic {
                found: magic,
                expected: GTFS_BINARY_MAGIC,
            });
        }

        let version = raw.version.get();
        if version != GTFS_BINARY_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: version,
                expected: GTFS_BINARY_VERSION,
            });
        }

        let header = Self {
            shape_count: raw.shape_count.get(),
            route_count: raw.route_count.get(),
            headsign_count: raw.headsign_count.get(),
            chunk_count: raw.chunk_count.get(),
            shape_table_offset: raw.shape_table_offset.get(),
            route_table_offset: raw.route_table_offset.get(),
        };

        if (header.shape_table_offset as usize) < GTFS_HEADER_SIZE {
            return Err(FormatError::OffsetOutOfBounds {
                section: "shape table",
                offset: header.shape_table_offset,
            });
        }
        if header.route_table_offset < header.shape_table_offset {
            return Err(FormatError::OffsetOutOfBounds {
                section: "route table",
                offset: header.route_table_offset,
            });
        }

        Ok(header)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let raw = RawHeader {
            magic: U32::new(GTFS_BINARY_MAGIC),
            version: U32::new(GTFS_BINARY_VERSION),
            shape_count: U32::new(self.shape_count),
            route_count: U32::new(self.route_count),
            headsign_count: U32::new(self.headsign_count),
            chunk_count: U32::new(self.chunk_count),
            shape_table_offset: U32::new(self.shape_table_offset),
            route_table_offset: U32::new(self.route_table_offset),
            reserved: [U32::ZERO; 8],
        };
        raw.as_bytes().to_vec()
    }

    /// End of the byte range fetched for the master tables.
    ///
    /// Route names and headsigns have no recorded size, so this is a
    /// conservative over-estimate; the server clamps it to the file length.
    pub fn table_fetch_end(&self) -> usize {
        use super::{CHUNK_INDEX_ENTRY_SIZE, HEADSIGN_SIZE_ESTIMATE, ROUTE_RECORD_SIZE, TABLE_SLACK};

        (self.route_table_offset as usize)
            .saturating_add((self.route_count as usize).saturating_mul(ROUTE_RECORD_SIZE))
            .saturating_add((self.headsign_count as usize).saturating_mul(HEADSIGN_SIZE_ESTIMATE))
            .saturating_add((self.chunk_count as usize).saturating_mul(CHUNK_INDEX_ENTRY_SIZE))
            .saturating_add(TABLE_SLACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header {
            shape_count: 2,
            route_count: 1,
            headsign_count: 3,
            chunk_count: 4,
            shape_table_offset: GTFS_HEADER_SIZE as u32,
            route_table_offset: 200,
        }
    }

    #[test]
    fn test_header_parse() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes.len(), GTFS_HEADER_SIZE);
        assert_eq!(&bytes[..4], b"GTFS");
        assert_eq!(Header::parse(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            Header::parse(&bytes),
            Err(FormatError::BadMagic { .. })
        ));
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[4..8].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            Header::parse(&bytes),
            Err(FormatError::UnsupportedVersion { found: 7, .. })
        ));
    }

    #[test]
    fn test_short_header_rejected() {
        let bytes = sample().to_bytes();
        assert!(matches!(
            Header::parse(&bytes[..20]),
            Err(FormatError::Truncated { available: 20, .. })
        ));
    }

    #[test]
    fn test_route_table_before_shapes_rejected() {
        let header = Header {
            route_table_offset: 10,
            ..sample()
        };
        assert!(matches!(
            Header::parse(&header.to_bytes()),
            Err(FormatError::OffsetOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_table_fetch_end() {
        let end = sample().table_fetch_end();
        assert_eq!(end, 200 + 8 + 300 + 48 + 64 * 1024);
    }
}
