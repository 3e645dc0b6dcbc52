//! JSON trip dataset used when the binary stream is unavailable.
//!
//! The whole dataset is downloaded at once:
//!
//! ```json
//! { "metadata": { "trip_count": 1 },
//!   "trips": [{ "route_short_name": "10", "route_type": 0, "route_color": "#00a1e0",
//!               "headsign": "Flughafen", "path": [[8.54, 47.37, 408.0]],
//!               "timestamps": [28800] }] }
//! ```

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{LengthPolicy, StreamConfig};
use crate::models::traits::{SourceKind, TripSource};
use crate::models::trip::RenderableTrip;
use crate::models::types::Result;
use crate::network::traits::RangeFetcher;
use crate::provider::materialize::reconcile_lengths;
use crate::provider::visibility::TimeWindow;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackMetadata {
    #[serde(default)]
    pub trip_count: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackDocument {
    #[serde(default)]
    pub metadata: FallbackMetadata,
    pub trips: Vec<RenderableTrip>,
}

/// Fully resident trip list with the same windowing as the chunk stream.
#[derive(Clone, Debug)]
pub struct FallbackDataset {
    trips: Vec<RenderableTrip>,
    half_window: f64,
}

impl FallbackDataset {
    pub fn from_document(document: FallbackDocument, config: &StreamConfig) -> Self {
        let FallbackDocument { metadata, trips } = document;
        let total = trips.len();

        if let Some(expected) = metadata.trip_count {
            if expected != total as u64 {
                debug!(expected, found = total, "fallback trip count differs from metadata");
            }
        }

        let trips: Vec<RenderableTrip> = trips
            .into_iter()
            .filter_map(|trip| normalize(trip, config.length_policy))
            .collect();

        if trips.len() != total {
            debug!(dropped = total - trips.len(), "dropped unusable fallback trips");
        }

        Self {
            trips,
            half_window: config.visibility_half_window,
        }
    }

    pub fn from_slice(bytes: &[u8], config: &StreamConfig) -> Result<Self> {
        let document: FallbackDocument = serde_json::from_slice(bytes)?;
        Ok(Self::from_document(document, config))
    }

    pub async fn load(
        fetcher: &dyn RangeFetcher,
        url: &str,
        config: &StreamConfig,
    ) -> Result<Self> {
        let bytes = fetcher.fetch(url).await?;
        let dataset = Self::from_slice(&bytes, config)?;
        info!(url, trips = dataset.trips.len(), "loaded JSON trip dataset");
        Ok(dataset)
    }

    pub fn trips(&self) -> &[RenderableTrip] {
        &self.trips
    }

    pub fn visible_trips(&self, time_seconds: f64) -> Vec<RenderableTrip> {
        let window = TimeWindow::around(time_seconds, self.half_window);

        self.trips
            .iter()
            .filter(|trip| match (trip.start_time(), trip.end_time()) {
                (Some(start), Some(end)) => window.overlaps(start, end),
                _ => false,
            })
            .cloned()
            .collect()
    }
}

fn normalize(mut trip: RenderableTrip, policy: LengthPolicy) -> Option<RenderableTrip> {
    if !reconcile_lengths(&mut trip.path, &mut trip.timestamps, policy) {
        return None;
    }
    (!trip.path.is_empty()).then_some(trip)
}

impl TripSource for FallbackDataset {
    fn kind(&self) -> SourceKind {
        SourceKind::Json
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn prepare_hour<'a>(&'a self, _hour: u32) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(std::future::ready(()))
    }

    fn visible_trips(&self, time_seconds: f64) -> Vec<RenderableTrip> {
        FallbackDataset::visible_trips(self, time_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::{RouteType, StreamError};
    use crate::network::MemoryFetcher;

    const DOCUMENT: &str = r##"{
        "metadata": { "trip_count": 3 },
        "trips": [
            {
                "route_short_name": "10", "route_type": 0, "route_color": "#00a1e0",
                "headsign": "Flughafen",
                "path": [[8.54, 47.37, 408.0], [8.55, 47.38, 410.0], [8.56, 47.39, 412.0]],
                "timestamps": [28800, 28860, 28920]
            },
            {
                "route_short_name": "33", "route_type": 3, "route_color": "#9ac83c",
                "headsign": "Triemli",
                "path": [[8.50, 47.36, 420.0], [8.51, 47.36, 421.0]],
                "timestamps": [50000, 50100, 50200]
            },
            {
                "route_short_name": "N8", "route_type": 3, "route_color": "#000000",
                "headsign": "Bellevue",
                "path": [],
                "timestamps": [80000]
            }
        ]
    }"##;

    #[test]
    fn test_parse_and_normalize() {
        let config = StreamConfig::default();
        let dataset = FallbackDataset::from_slice(DOCUMENT.as_bytes(), &config).unwrap();

        // Empty path dropped, mismatched lengths truncated.
        assert_eq!(dataset.trips().len(), 2);
        assert_eq!(dataset.trips()[1].route_type, RouteType::Bus);
        assert_eq!(dataset.trips()[1].timestamps, vec![50000.0, 50100.0]);
    }

    #[test]
    fn test_reject_policy() {
        let config = StreamConfig {
            length_policy: LengthPolicy::Reject,
            ..Default::default()
        };
        let dataset = FallbackDataset::from_slice(DOCUMENT.as_bytes(), &config).unwrap();
        assert_eq!(dataset.trips().len(), 1);
    }

    #[test]
    fn test_visibility() {
        let config = StreamConfig::default();
        let dataset = FallbackDataset::from_slice(DOCUMENT.as_bytes(), &config).unwrap();

        let names = |t: f64| -> Vec<String> {
            dataset
                .visible_trips(t)
                .into_iter()
                .map(|trip| trip.route_short_name)
                .collect()
        };

        assert_eq!(names(28860.0), vec!["10"]);
        assert_eq!(names(51000.0), vec!["33"]);
        assert!(names(70000.0).is_empty());
    }

    #[tokio::test]
    async fn test_load_over_fetcher() {
        let fetcher = MemoryFetcher::new().with_file("trips.json", DOCUMENT.as_bytes().to_vec());
        let dataset = FallbackDataset::load(&fetcher, "trips.json", &StreamConfig::default())
            .await
            .unwrap();
        assert!(TripSource::is_ready(&dataset));
        assert_eq!(dataset.kind(), SourceKind::Json);

        let broken = MemoryFetcher::new().with_file("bad.json", b"{".to_vec());
        let error = FallbackDataset::load(&broken, "bad.json", &StreamConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(error, StreamError::Json(_)));
    }
}
