//! Table and chunk payload decoding.

use std::mem::size_of;
use std::sync::Arc;

use zerocopy::byteorder::little_endian::{F32, U32};
use zerocopy::{FromBytes, Immutable, KnownLayout};

use super::layout::{RawRoute, RawTrip};
use super::{ROUTE_RECORD_SIZE, TRIP_RECORD_SIZE};
use crate::identifiers::{HeadsignIndex, RouteIndex, ShapeIndex};
use crate::models::trip::BinaryTrip;
use crate::models::types::{FormatError, Route, RouteType, Shape};

/// Sequential little-endian reader over a downloaded buffer.
struct Reader<'a> {
    bytes: &'a [u8],
    position: usize,
    section: &'static str,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8], section: &'static str) -> Self {
        Self {
            bytes,
            position: 0,
            section,
        }
    }

    fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.position..]
    }

    fn truncated(&self, needed: usize) -> FormatError {
        FormatError::Truncated {
            section: self.section,
            needed,
            available: self.remaining().len(),
        }
    }

    fn read<T: FromBytes + KnownLayout + Immutable>(&mut self) -> Result<T, FormatError> {
        let (value, _) =
            T::read_from_prefix(self.remaining()).map_err(|_| self.truncated(size_of::<T>()))?;
        self.position += size_of::<T>();
        Ok(value)
    }

    fn read_u32(&mut self) -> Result<u32, FormatError> {
        Ok(self.read::<U32>()?.get())
    }

    fn read_f32s(&mut self, count: usize) -> Result<Vec<f32>, FormatError> {
        let needed = count
            .checked_mul(size_of::<F32>())
            .ok_or_else(|| self.truncated(usize::MAX))?;
        let (values, _) = <[F32]>::ref_from_prefix_with_elems(self.remaining(), count)
            .map_err(|_| self.truncated(needed))?;
        self.position += needed;
        Ok(values.iter().map(|value| value.get()).collect())
    }

    /// Refuse counts that cannot possibly fit before allocating for them.
    fn check_count(&self, count: u32, min_record_size: usize) -> Result<(), FormatError> {
        let needed = (count as usize).saturating_mul(min_record_size);
        if needed > self.remaining().len() {
            return Err(self.truncated(needed));
        }
        Ok(())
    }
}

/// Decode `count` shapes from a buffer starting at the shape table.
pub fn decode_shapes(bytes: &[u8], count: u32) -> Result<Vec<Shape>, FormatError> {
    let mut reader = Reader::new(bytes, "shape table");
    reader.check_count(count, size_of::<U32>())?;

    let mut shapes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let point_count = reader.read_u32()? as usize;
        let coordinates = reader.read_f32s(point_count.saturating_mul(3))?;
        shapes.push(Shape::new(coordinates));
    }

    Ok(shapes)
}

/// Byte length of an encoded shape table, for locating what follows it.
pub fn shape_table_len(bytes: &[u8], count: u32) -> Result<usize, FormatError> {
    let mut reader = Reader::new(bytes, "shape table");
    for _ in 0..count {
        let point_count = reader.read_u32()? as usize;
        let skip = point_count.saturating_mul(3 * size_of::<F32>());
        if skip > reader.remaining().len() {
            return Err(reader.truncated(skip));
        }
        reader.position += skip;
    }
    Ok(reader.position)
}

/// Decode `count` routes from a buffer starting at the route table.
///
/// Route names live in a blob directly after the fixed-size records and are
/// referenced by offset, so the buffer must extend past the table.
pub fn decode_routes(bytes: &[u8], count: u32) -> Result<Vec<Route>, FormatError> {
    let mut reader = Reader::new(bytes, "route table");
    reader.check_count(count, ROUTE_RECORD_SIZE)?;

    let records = (0..count)
        .map(|_| reader.read::<RawRoute>())
        .collect::<Result<Vec<_>, _>>()?;

    let names = reader.remaining();

    records
        .into_iter()
        .map(|record| {
            let offset = record.name_offset.get();
            Ok(Route {
                name: read_name(names, offset)?,
                route_type: RouteType::from_gtfs(record.route_type),
                color: record.color,
            })
        })
        .collect()
}

fn read_name(blob: &[u8], offset: u32) -> Result<Arc<str>, FormatError> {
    let tail = blob
        .get(offset as usize..)
        .ok_or(FormatError::RouteName {
            offset,
            reason: "offset past end of name blob",
        })?;
    let end = tail
        .iter()
        .position(|&byte| byte == 0)
        .ok_or(FormatError::RouteName {
            offset,
            reason: "missing null terminator",
        })?;
    let name = std::str::from_utf8(&tail[..end]).map_err(|_| FormatError::RouteName {
        offset,
        reason: "not valid UTF-8",
    })?;
    Ok(name.into())
}

/// Decode the trips of one hour chunk.
pub fn decode_chunk(bytes: &[u8]) -> Result<Vec<BinaryTrip>, FormatError> {
    let mut reader = Reader::new(bytes, "chunk");
    let trip_count = reader.read_u32()?;
    reader.check_count(trip_count, TRIP_RECORD_SIZE)?;

    let mut trips = Vec::with_capacity(trip_count as usize);
    for _ in 0..trip_count {
        let record = reader.read::<RawTrip>()?;
        let timestamps = reader.read_f32s(record.timestamp_count.get() as usize)?;

        trips.push(BinaryTrip {
            shape_index: ShapeIndex::new(record.shape_index.get()),
            route_index: RouteIndex::new(record.route_index.get()),
            headsign_index: HeadsignIndex::new(record.headsign_index.get()),
            timestamps,
            start_time: record.start_time.get(),
        });
    }

    Ok(trips)
}
