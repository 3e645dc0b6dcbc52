//! Time-window visibility for trips.

use crate::models::trip::BinaryTrip;

pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Closed interval of playback time, in seconds since midnight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeWindow {
    pub min: f64,
    pub max: f64,
}

impl TimeWindow {
    pub fn around(time_seconds: f64, half_width: f64) -> Self {
        Self {
            min: time_seconds - half_width,
            max: time_seconds + half_width,
        }
    }

    /// True when `[start, end]` overlaps the window. Trips need not be
    /// fully contained.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        start <= self.max && end >= self.min
    }

    pub fn contains_trip(&self, trip: &BinaryTrip) -> bool {
        self.overlaps(trip.start_time as f64, trip.end_time())
    }
}

/// Hour bucket of a playback time. Negative times fall into hour zero.
pub fn hour_of(time_seconds: f64) -> u32 {
    (time_seconds / SECONDS_PER_HOUR).floor().max(0.0) as u32
}
