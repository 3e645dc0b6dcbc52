//! Tunables for chunk streaming and playback.

use std::time::Duration;

use serde::Deserialize;

use crate::models::types::{Result, StreamError};

/// What to do when a trip's path and timestamp arrays differ in length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    /// Cut both arrays to the shorter length.
    #[default]
    Truncate,
    /// Drop the trip.
    Reject,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Hours kept resident on each side of the current hour.
    pub window_radius: u32,
    pub max_cached_chunks: usize,
    pub min_hour: u32,
    pub max_hour: u32,
    /// Half width of the visibility window, in seconds.
    pub visibility_half_window: f64,
    #[serde(with = "duration_secs")]
    pub fetch_timeout: Duration,
    pub length_policy: LengthPolicy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window_radius: 1,
            max_cached_chunks: 5,
            min_hour: 0,
            max_hour: 27,
            visibility_half_window: 1800.0,
            fetch_timeout: Duration::from_secs(15),
            length_policy: LengthPolicy::Truncate,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_hour > self.max_hour {
            return Err(StreamError::Config(format!(
                "min_hour {} is after max_hour {}",
                self.min_hour, self.max_hour
            )));
        }

        let window = 2 * self.window_radius as usize + 1;
        if window > self.max_cached_chunks {
            return Err(StreamError::Config(format!(
                "a window of {window} hours does not fit in {} cached chunks",
                self.max_cached_chunks
            )));
        }

        if !(self.visibility_half_window.is_finite() && self.visibility_half_window >= 0.0) {
            return Err(StreamError::Config(
                "visibility_half_window must be a non-negative number".into(),
            ));
        }

        if self.fetch_timeout.is_zero() {
            return Err(StreamError::Config("fetch_timeout must be non-zero".into()));
        }

        Ok(())
    }

    /// Hours that should be resident while playing `current_hour`.
    pub fn target_hours(&self, current_hour: u32) -> std::ops::RangeInclusive<u32> {
        let start = current_hour
            .saturating_sub(self.window_radius)
            .max(self.min_hour);
        let end = current_hour
            .saturating_add(self.window_radius)
            .min(self.max_hour);
        start..=end
    }
}

/// Settings for the playback driver.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub binary_url: Option<String>,
    pub fallback_url: Option<String>,
    /// Simulated seconds per real second.
    pub speed: f64,
    /// Initial cursor, seconds since midnight.
    pub start_time: f64,
    pub stream: StreamConfig,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            binary_url: None,
            fallback_url: None,
            speed: 60.0,
            start_time: 8.0 * 3600.0,
            stream: StreamConfig::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<()> {
        self.stream.validate()?;

        if self.binary_url.is_none() && self.fallback_url.is_none() {
            return Err(StreamError::Config(
                "either binary_url or fallback_url is required".into(),
            ));
        }

        if !(self.speed.is_finite() && self.speed >= 0.0) {
            return Err(StreamError::Config("speed must be a non-negative number".into()));
        }

        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        StreamConfig::default().validate().unwrap();
    }

    #[test]
    fn test_target_hours_clipped() {
        let config = StreamConfig::default();
        assert_eq!(config.target_hours(8), 7..=9);
        assert_eq!(config.target_hours(0), 0..=1);
        assert_eq!(config.target_hours(27), 26..=27);
    }

    #[test]
    fn test_window_must_fit_cache() {
        let config = StreamConfig {
            window_radius: 3,
            max_cached_chunks: 5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StreamError::Config(_))));
    }

    #[test]
    fn test_config_from_json() {
        let config: StreamConfig = serde_json::from_str(
            r#"{ "window_radius": 2, "fetch_timeout": 2.5, "length_policy": "reject" }"#,
        )
        .unwrap();

        assert_eq!(config.window_radius, 2);
        assert_eq!(config.max_cached_chunks, 5);
        assert_eq!(config.fetch_timeout, Duration::from_millis(2500));
        assert_eq!(config.length_policy, LengthPolicy::Reject);
        config.validate().unwrap();
    }

    #[test]
    fn test_playback_needs_a_source() {
        let config = PlaybackConfig::default();
        assert!(config.validate().is_err());

        let config = PlaybackConfig {
            binary_url: Some("http://localhost/trips.bin".into()),
            ..Default::default()
        };
        config.validate().unwrap();
    }
}
