//! # zurich-transit
//!
//! Streaming GTFS trip playback for animated transit maps.
//!
//! ## Features
//!
//! - **Compact binary format**: Deduplicated shapes and routes plus hour chunks of trips
//! - **Range streaming**: Only the hours around the playback cursor are fetched
//! - **Bounded cache**: Resident hours follow the cursor, with a hard cap
//! - **JSON fallback**: A full trip list is used when the binary file is unusable
//! - **Pluggable networking**: Implement [`RangeFetcher`] for your own transport
//!
//! ## Example
//!
//! ```
//! use zurich_transit::prelude::*;
//!
//! let json = br##"{
//!     "metadata": { "trip_count": 1 },
//!     "trips": [{
//!         "route_short_name": "10", "route_type": 0, "route_color": "#00a1e0",
//!         "headsign": "Flughafen",
//!         "path": [[8.54, 47.37, 408.0], [8.55, 47.38, 410.0]],
//!         "timestamps": [28800, 28860]
//!     }]
//! }"##;
//!
//! let dataset = FallbackDataset::from_slice(json, &StreamConfig::default()).unwrap();
//!
//! // 08:01, inside the half-hour window of the trip
//! let visible = dataset.visible_trips(28_860.0);
//! assert_eq!(visible.len(), 1);
//! assert_eq!(visible[0].route_type, RouteType::Tram);
//! ```

pub mod config;
pub mod format;
pub mod identifiers;
pub mod models;
pub mod network;
pub mod playback;
pub mod provider;

// Re-exports for convenience
pub mod prelude {
    pub use crate::config::{LengthPolicy, PlaybackConfig, StreamConfig};
    pub use crate::identifiers::*;
    pub use crate::models::{traits::*, trip::*, types::*};
    pub use crate::network::{traits::*, FileRangeFetcher, HttpRangeFetcher, MemoryFetcher};
    pub use crate::playback::{Playback, PlaybackClock, PlaybackStatus};
    pub use crate::provider::{ChunkManager, FallbackDataset, MasterIndex};
}

pub use prelude::*;
