//! Binary trip file writer.
//!
//! Builds the file and its manifest from trips, deduplicating shapes, routes
//! and headsigns into dense index tables.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::IntoBytes;

use super::header::Header;
use super::layout::{RawChunkIndexEntry, RawRoute, RawTrip};
use super::manifest::{Manifest, ManifestChunk};
use super::{CHUNK_INDEX_ENTRY_SIZE, GTFS_HEADER_SIZE};
use crate::identifiers::{HeadsignIndex, RouteIndex, ShapeIndex};
use crate::models::trip::{BinaryTrip, RenderableTrip};
use crate::models::types::{FormatError, Route, RouteType};

/// A complete binary file plus the manifest describing its chunks.
#[derive(Clone, Debug)]
pub struct EncodedFile {
    pub binary: Vec<u8>,
    pub manifest: Manifest,
}

#[derive(Default)]
pub struct BinaryEncoder {
    shapes: Vec<Vec<f32>>,
    shape_lookup: HashMap<Vec<u32>, ShapeIndex>,
    routes: Vec<Route>,
    route_lookup: HashMap<(Arc<str>, RouteType, [u8; 3]), RouteIndex>,
    headsigns: Vec<String>,
    headsign_lookup: HashMap<String, HeadsignIndex>,
    chunks: BTreeMap<u32, Vec<BinaryTrip>>,
}

impl BinaryEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a shape from interleaved lng/lat/elevation values.
    pub fn add_shape(&mut self, coordinates: &[f32]) -> Result<ShapeIndex, FormatError> {
        // Keyed on bit patterns so identical paths share one entry.
        let key: Vec<u32> = coordinates.iter().map(|value| value.to_bits()).collect();
        if let Some(&index) = self.shape_lookup.get(&key) {
            return Ok(index);
        }

        let index = u32::try_from(self.shapes.len())
            .map(ShapeIndex::new)
            .map_err(|_| FormatError::Capacity {
                table: "shapes",
                limit: u32::MAX as usize,
            })?;
        self.shapes.push(coordinates.to_vec());
        self.shape_lookup.insert(key, index);
        Ok(index)
    }

    pub fn add_route(
        &mut self,
        name: &str,
        route_type: RouteType,
        color: [u8; 3],
    ) -> Result<RouteIndex, FormatError> {
        let name: Arc<str> = name.into();
        let key = (name.clone(), route_type, color);
        if let Some(&index) = self.route_lookup.get(&key) {
            return Ok(index);
        }

        let index = u16::try_from(self.routes.len())
            .map(RouteIndex::new)
            .map_err(|_| FormatError::Capacity {
                table: "routes",
                limit: u16::MAX as usize + 1,
            })?;
        self.routes.push(Route {
            name,
            route_type,
            color,
        });
        self.route_lookup.insert(key, index);
        Ok(index)
    }

    pub fn add_headsign(&mut self, text: &str) -> Result<HeadsignIndex, FormatError> {
        if let Some(&index) = self.headsign_lookup.get(text) {
            return Ok(index);
        }

        let index = u16::try_from(self.headsigns.len())
            .map(HeadsignIndex::new)
            .map_err(|_| FormatError::Capacity {
                table: "headsigns",
                limit: u16::MAX as usize + 1,
            })?;
        self.headsigns.push(text.to_owned());
        self.headsign_lookup.insert(text.to_owned(), index);
        Ok(index)
    }

    /// Add a trip to the chunk of the hour it starts in.
    pub fn add_trip(&mut self, trip: BinaryTrip) {
        self.chunks
            .entry(trip.start_time / 3600)
            .or_default()
            .push(trip);
    }

    /// Add a trip in its renderable form, as found in JSON datasets.
    ///
    /// Trips without timestamps cannot be placed in an hour and are skipped.
    pub fn add_renderable(&mut self, trip: &RenderableTrip) -> Result<(), FormatError> {
        let Some(first) = trip.start_time() else {
            debug!(route = %trip.route_short_name, "skipping trip without timestamps");
            return Ok(());
        };

        let coordinates: Vec<f32> = trip
            .path
            .iter()
            .flat_map(|point| point.iter().map(|&value| value as f32))
            .collect();

        let shape_index = self.add_shape(&coordinates)?;
        let route_index = self.add_route(
            &trip.route_short_name,
            trip.route_type,
            parse_hex_color(&trip.route_color)?,
        )?;
        let headsign_index = self.add_headsign(&trip.headsign)?;

        self.add_trip(BinaryTrip {
            shape_index,
            route_index,
            headsign_index,
            timestamps: trip.timestamps.iter().map(|&t| t as f32).collect(),
            start_time: first.max(0.0).floor() as u32,
        });
        Ok(())
    }

    pub fn finish(self) -> Result<EncodedFile, FormatError> {
        let mut body = Vec::new();

        for shape in &self.shapes {
            body.extend_from_slice(&((shape.len() / 3) as u32).to_le_bytes());
            for value in shape {
                body.extend_from_slice(&value.to_le_bytes());
            }
        }

        let route_table_offset = GTFS_HEADER_SIZE + body.len();
        let mut names = Vec::new();
        for route in &self.routes {
            let record = RawRoute {
                name_offset: U32::new(to_u32(names.len())?),
                route_type: route.route_type.to_gtfs(),
                color: route.color,
            };
            body.extend_from_slice(record.as_bytes());
            names.extend_from_slice(route.name.as_bytes());
            names.push(0);
        }
        body.extend_from_slice(&names);

        for headsign in &self.headsigns {
            body.extend_from_slice(headsign.as_bytes());
            body.push(0);
        }

        let payloads = self
            .chunks
            .iter()
            .map(|(&hour, trips)| Ok((hour, encode_chunk(trips)?)))
            .collect::<Result<Vec<_>, FormatError>>()?;

        let mut next_offset =
            GTFS_HEADER_SIZE + body.len() + payloads.len() * CHUNK_INDEX_ENTRY_SIZE;
        let mut manifest = Manifest::default();
        for (hour, payload) in &payloads {
            let chunk = ManifestChunk {
                hour: *hour,
                offset: to_u32(next_offset)?,
                size: to_u32(payload.len())?,
            };
            let entry = RawChunkIndexEntry {
                hour: U32::new(chunk.hour),
                offset: U32::new(chunk.offset),
                size: U32::new(chunk.size),
            };
            body.extend_from_slice(entry.as_bytes());
            manifest.chunks.push(chunk);
            next_offset += payload.len();
        }

        let header = Header {
            shape_count: to_u32(self.shapes.len())?,
            route_count: to_u32(self.routes.len())?,
            headsign_count: to_u32(self.headsigns.len())?,
            chunk_count: to_u32(payloads.len())?,
            shape_table_offset: GTFS_HEADER_SIZE as u32,
            route_table_offset: to_u32(route_table_offset)?,
        };

        let mut binary = header.to_bytes();
        binary.extend_from_slice(&body);
        for (_, payload) in payloads {
            binary.extend_from_slice(&payload);
        }
        to_u32(binary.len())?;

        Ok(EncodedFile { binary, manifest })
    }
}

fn encode_chunk(trips: &[BinaryTrip]) -> Result<Vec<u8>, FormatError> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&to_u32(trips.len())?.to_le_bytes());

    for trip in trips {
        let record = RawTrip {
            shape_index: U32::new(trip.shape_index.get()),
            route_index: U16::new(trip.route_index.get()),
            headsign_index: U16::new(trip.headsign_index.get()),
            timestamp_count: U32::new(to_u32(trip.timestamps.len())?),
            start_time: U32::new(trip.start_time),
            reserved: U32::ZERO,
        };
        payload.extend_from_slice(record.as_bytes());
        for timestamp in &trip.timestamps {
            payload.extend_from_slice(&timestamp.to_le_bytes());
        }
    }

    Ok(payload)
}

fn to_u32(value: usize) -> Result<u32, FormatError> {
    u32::try_from(value).map_err(|_| FormatError::Capacity {
        table: "file",
        limit: u32::MAX as usize,
    })
}

/// Parse `#rrggbb` or `rrggbb`.
pub fn parse_hex_color(text: &str) -> Result<[u8; 3], FormatError> {
    let hex = text.strip_prefix('#').unwrap_or(text);
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(FormatError::InvalidColor(text.to_owned()));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| FormatError::InvalidColor(text.to_owned()))
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}
