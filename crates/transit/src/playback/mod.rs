//! Playback driver: advances simulated time and keeps the active trip
//! source's window in step with the cursor.
//!
//! Frames never wait on the network. Crossing an hour boundary starts the
//! window update as a background task, and the frame draws from whatever is
//! already resident.

pub mod clock;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PlaybackConfig;
use crate::models::traits::{SourceKind, TripSource};
use crate::models::trip::RenderableTrip;
use crate::models::types::{Result, StreamError};
use crate::network::traits::RangeFetcher;
use crate::provider::chunk_manager::ChunkManager;
use crate::provider::fallback::FallbackDataset;

pub use clock::PlaybackClock;

/// Loading state surfaced to the UI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Loading,
    Ready(SourceKind),
    Failed(String),
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Idle => write!(f, "Idle"),
            PlaybackStatus::Loading => write!(f, "Loading transit data..."),
            PlaybackStatus::Ready(SourceKind::Binary) => write!(f, "Streaming trips"),
            PlaybackStatus::Ready(SourceKind::Json) => write!(f, "Playing trips (JSON fallback)"),
            PlaybackStatus::Failed(message) => write!(f, "Failed to load transit data: {message}"),
        }
    }
}

pub struct Playback {
    config: PlaybackConfig,
    fetcher: Arc<dyn RangeFetcher>,
    source: Option<Arc<dyn TripSource>>,
    clock: PlaybackClock,
    last_hour: Option<u32>,
    window_update: Option<JoinHandle<()>>,
    status: PlaybackStatus,
}

impl Playback {
    pub fn new(config: PlaybackConfig, fetcher: Arc<dyn RangeFetcher>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            clock: PlaybackClock::from_config(&config),
            config,
            fetcher,
            source: None,
            last_hour: None,
            window_update: None,
            status: PlaybackStatus::Idle,
        })
    }

    /// Open the binary stream, falling back to the JSON dataset when the
    /// binary file is unusable.
    pub async fn initialize(&mut self) -> Result<()> {
        self.status = PlaybackStatus::Loading;

        let mut binary_error = None;
        if let Some(url) = self.config.binary_url.clone() {
            match self.open_binary(&url).await {
                Ok(manager) => {
                    self.install(Arc::new(manager)).await;
                    return Ok(());
                }
                Err(error) if error.is_fallback_trigger() && self.config.fallback_url.is_some() => {
                    warn!(%url, %error, "binary trip stream unavailable, using JSON fallback");
                    binary_error = Some(error);
                }
                Err(error) => return Err(self.fail(error)),
            }
        }

        let Some(url) = self.config.fallback_url.clone() else {
            let error = binary_error
                .unwrap_or_else(|| StreamError::Config("no trip source configured".into()));
            return Err(self.fail(error));
        };

        match FallbackDataset::load(self.fetcher.as_ref(), &url, &self.config.stream).await {
            Ok(dataset) => {
                self.install(Arc::new(dataset)).await;
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    async fn open_binary(&self, url: &str) -> Result<ChunkManager> {
        let manager = ChunkManager::new(url, self.fetcher.clone(), self.config.stream.clone())?;
        manager.initialize().await?;
        Ok(manager)
    }

    /// Replace the active source and load the window around the cursor.
    ///
    /// Unlike later window updates, the first one is awaited.
    pub async fn install(&mut self, source: Arc<dyn TripSource>) {
        let kind = source.kind();
        self.source = Some(source);
        self.last_hour = None;
        self.sync_hour();
        self.settle().await;
        self.status = PlaybackStatus::Ready(kind);
        info!(?kind, time = %self.clock.wall_clock(), "trip source ready");
    }

    fn fail(&mut self, error: StreamError) -> StreamError {
        error!(%error, "no trip source available");
        self.status = PlaybackStatus::Failed(error.to_string());
        error
    }

    /// Start a background window update when the cursor changed hour.
    ///
    /// A newer update does not cancel an older one; the source resolves
    /// overlapping updates in favor of the latest hour.
    fn sync_hour(&mut self) {
        let hour = self.clock.current_hour();
        if self.last_hour == Some(hour) {
            return;
        }
        let Some(source) = self.source.clone() else {
            return;
        };

        debug!(hour, "updating trip window");
        self.last_hour = Some(hour);
        self.window_update = Some(tokio::spawn(async move {
            source.prepare_hour(hour).await;
        }));
    }

    /// Wait for the most recently started window update to finish.
    pub async fn settle(&mut self) {
        if let Some(update) = self.window_update.take() {
            if let Err(error) = update.await {
                warn!(%error, "window update task failed");
            }
        }
    }

    /// Advance by `elapsed` wall time and return the trips to draw.
    ///
    /// Must be called within a tokio runtime.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<RenderableTrip> {
        self.clock.advance(elapsed);
        self.sync_hour();
        self.visible_trips()
    }

    pub fn seek(&mut self, time_seconds: f64) -> Vec<RenderableTrip> {
        self.clock.seek(time_seconds);
        self.sync_hour();
        self.visible_trips()
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.clock.set_speed(speed);
    }

    /// Trips around the cursor, empty until the source is ready.
    pub fn visible_trips(&self) -> Vec<RenderableTrip> {
        match &self.source {
            Some(source) if source.is_ready() => source.visible_trips(self.clock.time()),
            _ => Vec::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.source.as_ref().is_some_and(|source| source.is_ready())
    }

    pub fn status(&self) -> &PlaybackStatus {
        &self.status
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source.as_ref().map(|source| source.kind())
    }
}
