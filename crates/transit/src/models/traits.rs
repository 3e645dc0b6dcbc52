//! Traits for sources of renderable trips.
//!
//! The playback driver talks to trip data only through [`TripSource`], so the
//! binary chunk stream and the JSON fallback are interchangeable.

use std::future::Future;
use std::pin::Pin;

use crate::models::trip::RenderableTrip;

/// Which backing format a source reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Binary,
    Json,
}

/// Provider of time-windowed trips for the render layer
pub trait TripSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// True once enough data is resident to answer visibility queries.
    fn is_ready(&self) -> bool;

    /// Make the data around `hour` available. Never fails; missing hours
    /// simply contribute no trips.
    fn prepare_hour<'a>(&'a self, hour: u32) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

    /// Trips whose active interval overlaps the window around `time_seconds`.
    fn visible_trips(&self, time_seconds: f64) -> Vec<RenderableTrip>;
}
