//! Simulated service-day clock.

use std::time::Duration;

use chrono::NaiveTime;

use crate::config::{PlaybackConfig, StreamConfig};
use crate::provider::visibility::{hour_of, SECONDS_PER_HOUR};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Playback cursor in seconds since midnight of the service day.
///
/// Runs between the start of `min_hour` and the end of `max_hour`, wrapping
/// back to the start when advanced past the end.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackClock {
    time_seconds: f64,
    speed: f64,
    min_time: f64,
    max_time: f64,
}

impl PlaybackClock {
    pub fn new(start_time: f64, speed: f64, stream: &StreamConfig) -> Self {
        let mut clock = Self {
            time_seconds: 0.0,
            speed,
            min_time: stream.min_hour as f64 * SECONDS_PER_HOUR,
            max_time: (stream.max_hour as f64 + 1.0) * SECONDS_PER_HOUR,
        };
        clock.seek(start_time);
        clock
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(config.start_time, config.speed, &config.stream)
    }

    pub fn time(&self) -> f64 {
        self.time_seconds
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.max(0.0);
    }

    /// Move forward by `elapsed` real time scaled by the speed multiplier.
    pub fn advance(&mut self, elapsed: Duration) {
        let span = self.max_time - self.min_time;
        let next = self.time_seconds + elapsed.as_secs_f64() * self.speed;

        self.time_seconds = if next >= self.max_time && span > 0.0 {
            self.min_time + (next - self.min_time).rem_euclid(span)
        } else {
            next.min(self.max_time)
        };
    }

    /// Jump to `time_seconds`, clamped to the service day.
    pub fn seek(&mut self, time_seconds: f64) {
        self.time_seconds = if time_seconds.is_nan() {
            self.min_time
        } else {
            time_seconds.clamp(self.min_time, self.max_time)
        };
    }

    pub fn current_hour(&self) -> u32 {
        hour_of(self.time_seconds)
    }

    /// Time of day for display. Hours past midnight wrap.
    pub fn wall_clock(&self) -> NaiveTime {
        let seconds = self.time_seconds.rem_euclid(SECONDS_PER_DAY) as u32;
        NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or(NaiveTime::MIN)
    }
}
