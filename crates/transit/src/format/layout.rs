//! Fixed-size on-disk records.
//!
//! All fields are byte-order aware and unaligned, so records can be read
//! straight out of any position in a downloaded buffer.

use std::mem::size_of;

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::{CHUNK_INDEX_ENTRY_SIZE, GTFS_HEADER_SIZE, ROUTE_RECORD_SIZE, TRIP_RECORD_SIZE};

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
pub struct RawHeader {
    pub magic: U32,
    pub version: U32,
    pub shape_count: U32,
    pub route_count: U32,
    pub headsign_count: U32,
    pub chunk_count: U32,
    pub shape_table_offset: U32,
    pub route_table_offset: U32,
    pub reserved: [U32; 8],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
pub struct RawRoute {
    pub name_offset: U32,
    pub route_type: u8,
    pub color: [u8; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
pub struct RawTrip {
    pub shape_index: U32,
    pub route_index: U16,
    pub headsign_index: U16,
    pub timestamp_count: U32,
    pub start_time: U32,
    pub reserved: U32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
pub struct RawChunkIndexEntry {
    pub hour: U32,
    pub offset: U32,
    pub size: U32,
}

const _: () = assert!(size_of::<RawHeader>() == GTFS_HEADER_SIZE);
const _: () = assert!(size_of::<RawRoute>() == ROUTE_RECORD_SIZE);
const _: () = assert!(size_of::<RawTrip>() == TRIP_RECORD_SIZE);
const _: () = assert!(size_of::<RawChunkIndexEntry>() == CHUNK_INDEX_ENTRY_SIZE);
