//! Core data types, enums and errors for the trip stream.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::identifiers::HeadsignIndex;

// ============================================================================
// Enums
// ============================================================================

/// GTFS route types
///
/// Stored as a single byte in the route table, so extended GTFS types that
/// do not fit are carried through as `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum RouteType {
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
    CableTram,
    AerialLift,
    Funicular,
    Trolleybus,
    Monorail,
    Other(u8),
}

impl RouteType {
    pub fn from_gtfs(value: u8) -> Self {
        match value {
            0 => Self::Tram,
            1 => Self::Subway,
            2 => Self::Rail,
            3 => Self::Bus,
            4 => Self::Ferry,
            5 => Self::CableTram,
            6 => Self::AerialLift,
            7 => Self::Funicular,
            11 => Self::Trolleybus,
            12 => Self::Monorail,
            other => Self::Other(other),
        }
    }

    pub fn to_gtfs(self) -> u8 {
        match self {
            Self::Tram => 0,
            Self::Subway => 1,
            Self::Rail => 2,
            Self::Bus => 3,
            Self::Ferry => 4,
            Self::CableTram => 5,
            Self::AerialLift => 6,
            Self::Funicular => 7,
            Self::Trolleybus => 11,
            Self::Monorail => 12,
            Self::Other(value) => value,
        }
    }
}

impl From<u8> for RouteType {
    fn from(value: u8) -> Self {
        Self::from_gtfs(value)
    }
}

impl From<RouteType> for u8 {
    fn from(value: RouteType) -> Self {
        value.to_gtfs()
    }
}

/// Rider-facing destination label.
///
/// The binary headsign table is not decoded yet; the loader hands out
/// placeholders that render as `Destination {index}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Headsign {
    Placeholder(HeadsignIndex),
    Decoded(Arc<str>),
}

impl Headsign {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder(_))
    }
}

impl fmt::Display for Headsign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placeholder(index) => write!(f, "Destination {index}"),
            Self::Decoded(text) => f.write_str(text),
        }
    }
}

// ============================================================================
// Master index entries
// ============================================================================

/// A polyline with elevation, stored as interleaved lng/lat/elevation triples.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub coordinates: Vec<f32>,
}

impl Shape {
    pub fn new(coordinates: Vec<f32>) -> Self {
        debug_assert!(coordinates.len() % 3 == 0);
        Self { coordinates }
    }

    pub fn point_count(&self) -> u32 {
        (self.coordinates.len() / 3) as u32
    }

    /// Iterate the points as `[lng, lat, elevation]`.
    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.coordinates
            .chunks_exact(3)
            .map(|point| [point[0], point[1], point[2]])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub name: Arc<str>,
    pub route_type: RouteType,
    pub color: [u8; 3],
}

impl Route {
    /// Display color as `#rrggbb`
    pub fn hex_color(&self) -> String {
        let [r, g, b] = self.color;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

/// Byte range of one hour chunk inside the binary file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkInfo {
    pub hour: u32,
    pub byte_offset: u32,
    pub byte_size: u32,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("bad magic number {found:#010x}, expected {expected:#010x}")]
    BadMagic { found: u32, expected: u32 },

    #[error("unsupported format version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("truncated {section}: needed {needed} bytes, {available} available")]
    Truncated {
        section: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{section} offset {offset} is out of bounds")]
    OffsetOutOfBounds { section: &'static str, offset: u32 },

    #[error("invalid route name at offset {offset}: {reason}")]
    RouteName { offset: u32, reason: &'static str },

    #[error("too many entries in {table} (limit {limit})")]
    Capacity { table: &'static str, limit: usize },

    #[error("invalid route color {0:?}")]
    InvalidColor(String),

    #[error("malformed manifest: {0}")]
    Manifest(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("request for {url} timed out")]
    Timeout { url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StreamError {
    /// Errors that switch playback over to the JSON fallback during setup.
    pub fn is_fallback_trigger(&self) -> bool {
        matches!(
            self,
            Self::Format(_)
                | Self::Network(_)
                | Self::Http { .. }
                | Self::Timeout { .. }
                | Self::Json(_)
                | Self::Io(_)
        )
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_type_from_gtfs() {
        assert_eq!(RouteType::from_gtfs(0), RouteType::Tram);
        assert_eq!(RouteType::from_gtfs(3), RouteType::Bus);
        assert_eq!(RouteType::from_gtfs(99), RouteType::Other(99));
        assert_eq!(RouteType::Other(99).to_gtfs(), 99);
        assert_eq!(RouteType::Trolleybus.to_gtfs(), 11);
    }

    #[test]
    fn test_route_type_serializes_as_number() {
        assert_eq!(serde_json::to_string(&RouteType::Bus).unwrap(), "3");
        let parsed: RouteType = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, RouteType::Tram);
    }

    #[test]
    fn test_hex_color_pads_channels() {
        let route = Route {
            name: "10".into(),
            route_type: RouteType::Tram,
            color: [0, 161, 224],
        };
        assert_eq!(route.hex_color(), "#00a1e0");

        let black = Route {
            color: [0, 0, 0],
            ..route
        };
        assert_eq!(black.hex_color(), "#000000");
    }

    #[test]
    fn test_headsign_display() {
        assert_eq!(
            Headsign::Placeholder(HeadsignIndex::new(4)).to_string(),
            "Destination 4"
        );
        assert_eq!(Headsign::Decoded("Bahnhofplatz".into()).to_string(), "Bahnhofplatz");
        assert!(Headsign::Placeholder(HeadsignIndex::new(0)).is_placeholder());
    }

    #[test]
    fn test_shape_points() {
        let shape = Shape::new(vec![0.0, 0.0, 400.0, 1.0, 1.0, 410.0]);
        assert_eq!(shape.point_count(), 2);
        let points: Vec<_> = shape.points().collect();
        assert_eq!(points[1], [1.0, 1.0, 410.0]);
    }

    #[test]
    fn test_fallback_triggers() {
        let format = StreamError::Format(FormatError::BadMagic {
            found: 0,
            expected: 1,
        });
        assert!(format.is_fallback_trigger());
        assert!(StreamError::Network("reset".into()).is_fallback_trigger());
        assert!(!StreamError::Config("window".into()).is_fallback_trigger());
    }
}
