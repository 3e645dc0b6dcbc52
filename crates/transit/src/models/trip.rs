//! Trip records: raw chunk entries and their renderable form.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::identifiers::{HeadsignIndex, RouteIndex, ShapeIndex};
use crate::models::types::RouteType;

/// One trip as stored in an hour chunk.
///
/// Timestamps are seconds since midnight of the service day and may exceed
/// 86400 for trips running past midnight.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryTrip {
    pub shape_index: ShapeIndex,
    pub route_index: RouteIndex,
    pub headsign_index: HeadsignIndex,
    pub timestamps: Vec<f32>,
    pub start_time: u32,
}

impl BinaryTrip {
    /// Time of the last recorded point, falling back to the start time.
    pub fn end_time(&self) -> f64 {
        self.timestamps
            .last()
            .map(|&t| t as f64)
            .unwrap_or(self.start_time as f64)
    }
}

/// All trips starting within one hour-of-day bucket.
#[derive(Debug)]
pub struct LoadedChunk {
    pub hour: u32,
    pub trips: Vec<BinaryTrip>,
    pub loaded_at: Instant,
}

/// A trip ready for the render layer.
///
/// Field names match the JSON fallback dataset so both sources share one type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderableTrip {
    pub path: Vec<[f64; 3]>,
    pub timestamps: Vec<f64>,
    pub route_color: String,
    pub route_short_name: String,
    pub route_type: RouteType,
    pub headsign: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<RouteIndex>,
}

impl RenderableTrip {
    pub fn start_time(&self) -> Option<f64> {
        self.timestamps.first().copied()
    }

    pub fn end_time(&self) -> Option<f64> {
        self.timestamps.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_time_without_timestamps() {
        let trip = BinaryTrip {
            shape_index: ShapeIndex::new(0),
            route_index: RouteIndex::new(0),
            headsign_index: HeadsignIndex::new(0),
            timestamps: vec![],
            start_time: 600,
        };
        assert_eq!(trip.end_time(), 600.0);
    }

    #[test]
    fn test_renderable_trip_from_fallback_json() {
        let json = r##"{
            "route_short_name": "33",
            "route_type": 3,
            "route_color": "#9ac83c",
            "headsign": "Triemli",
            "path": [[8.54, 47.37, 410.0], [8.55, 47.38, 412.0]],
            "timestamps": [30000, 30060]
        }"##;

        let trip: RenderableTrip = serde_json::from_str(json).unwrap();
        assert_eq!(trip.route_type, RouteType::Bus);
        assert_eq!(trip.route_id, None);
        assert_eq!(trip.start_time(), Some(30000.0));
        assert_eq!(trip.end_time(), Some(30060.0));
    }
}
