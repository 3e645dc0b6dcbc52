//! Binary trip file format.
//!
//! ```text
//! header            GTFS_HEADER_SIZE bytes
//! shape table       per shape: u32 point count, f32[count * 3]
//! route table       per route: u32 name offset, u8 type, u8 r, u8 g, u8 b
//! route names       null-terminated, offsets relative to the end of the table
//! headsign table    null-terminated strings (not read back yet)
//! chunk index       per chunk: u32 hour, u32 offset, u32 size (not read back)
//! chunk payloads    one per hour, located through the manifest
//! ```
//!
//! Integers are unsigned little-endian, floats are IEEE-754 single precision
//! little-endian. There is no compression and no checksum.

pub mod decode;
pub mod encode;
pub mod header;
pub mod layout;
pub mod manifest;

pub use decode::{decode_chunk, decode_routes, decode_shapes};
pub use encode::{BinaryEncoder, EncodedFile};
pub use header::Header;
pub use manifest::{Manifest, ManifestChunk};

/// `"GTFS"` read as a little-endian u32.
pub const GTFS_BINARY_MAGIC: u32 = u32::from_le_bytes(*b"GTFS");
pub const GTFS_BINARY_VERSION: u32 = 1;
pub const GTFS_HEADER_SIZE: usize = 64;

pub const ROUTE_RECORD_SIZE: usize = 8;
pub const TRIP_RECORD_SIZE: usize = 20;
pub const CHUNK_INDEX_ENTRY_SIZE: usize = 12;

/// Assumed upper bound for one encoded headsign when sizing the table fetch.
pub const HEADSIGN_SIZE_ESTIMATE: usize = 100;
/// Extra bytes fetched past the estimated end of the tables.
pub const TABLE_SLACK: usize = 64 * 1024;
