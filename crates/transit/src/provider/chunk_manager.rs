//! Hour-chunk streaming: range fetching, in-flight deduplication, the
//! resident window and eviction.
//!
//! ## Residency
//!
//! Around the current hour `h`, the hours `h - W ..= h + W` (clipped to the
//! configured service hours) are kept resident. Everything else is evicted
//! after each window update, and the cache never holds more than
//! `max_cached_chunks` chunks; beyond that the oldest loads go first.
//!
//! ## Concurrency
//!
//! All methods take `&self`. The cache and in-flight maps sit behind mutexes
//! that are never held across an await. Overlapping window updates (rapid
//! scrubbing) evict against the most recently requested window, so the
//! newest cursor position wins regardless of which load settles last.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::ops::RangeInclusive;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use futures_util::future::{join_all, BoxFuture, Shared};
use futures_util::FutureExt;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::{LengthPolicy, StreamConfig};
use crate::format::decode_chunk;
use crate::models::traits::{SourceKind, TripSource};
use crate::models::trip::{BinaryTrip, LoadedChunk, RenderableTrip};
use crate::models::types::{ChunkInfo, Result, StreamError};
use crate::network::traits::{ByteRange, RangeFetcher};
use crate::provider::master_index::MasterIndex;
use crate::provider::materialize::{length_mismatch, to_renderable};
use crate::provider::visibility::TimeWindow;

type PendingChunk = Shared<BoxFuture<'static, Option<Arc<LoadedChunk>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Streams the hour chunks of one binary trip file.
///
/// One manager per binary URL; managers never share caches.
pub struct ChunkManager {
    binary_url: Arc<str>,
    fetcher: Arc<dyn RangeFetcher>,
    config: StreamConfig,
    index: OnceLock<Arc<MasterIndex>>,
    cache: Mutex<BTreeMap<u32, Arc<LoadedChunk>>>,
    in_flight: Mutex<HashMap<u32, PendingChunk>>,
    active_window: Mutex<Option<RangeInclusive<u32>>>,
}

impl ChunkManager {
    pub fn new(
        binary_url: impl Into<Arc<str>>,
        fetcher: Arc<dyn RangeFetcher>,
        config: StreamConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            binary_url: binary_url.into(),
            fetcher,
            config,
            index: OnceLock::new(),
            cache: Mutex::new(BTreeMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            active_window: Mutex::new(None),
        })
    }

    pub fn binary_url(&self) -> &str {
        &self.binary_url
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Load the master index if it is not loaded yet.
    ///
    /// The whole load shares one `fetch_timeout`.
    pub async fn initialize(&self) -> Result<Arc<MasterIndex>> {
        if let Some(index) = self.index.get() {
            return Ok(index.clone());
        }

        let load = MasterIndex::load(self.fetcher.as_ref(), &self.binary_url);
        let index = tokio::time::timeout(self.config.fetch_timeout, load)
            .await
            .map_err(|_| StreamError::Timeout {
                url: self.binary_url.to_string(),
            })??;
        let index = Arc::new(index);
        Ok(self.index.get_or_init(|| index).clone())
    }

    pub fn master_index(&self) -> Option<&Arc<MasterIndex>> {
        self.index.get()
    }

    /// Index loaded and at least one chunk resident.
    pub fn is_ready(&self) -> bool {
        self.index.get().is_some() && !lock(&self.cache).is_empty()
    }

    pub fn resident_hours(&self) -> Vec<u32> {
        lock(&self.cache).keys().copied().collect()
    }

    /// Drop every resident chunk.
    pub fn clear(&self) {
        lock(&self.cache).clear();
        *lock(&self.active_window) = None;
    }

    /// Load the chunk for `hour`.
    ///
    /// Returns `None` when the hour has no service or the load failed; the
    /// failure is logged and a later call retries. Concurrent calls for the
    /// same hour share a single request.
    pub async fn load_chunk(&self, hour: u32) -> Option<Arc<LoadedChunk>> {
        let Some(index) = self.index.get().cloned() else {
            warn!(hour, "chunk requested before the master index was loaded");
            return None;
        };

        let resident = lock(&self.cache).get(&hour).cloned();
        if resident.is_some() {
            return resident;
        }

        let Some(info) = index.chunk(hour) else {
            debug!(hour, "no trips scheduled in hour");
            return None;
        };

        let pending = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&hour) {
                Some(pending) => pending.clone(),
                None => {
                    // A load that settled since the cache check above is
                    // already cached: settled loads reach the cache before
                    // they leave `in_flight`.
                    let settled = lock(&self.cache).get(&hour).cloned();
                    if settled.is_some() {
                        return settled;
                    }
                    let pending = self.fetch_chunk(info, index);
                    in_flight.insert(hour, pending.clone());
                    pending
                }
            }
        };

        let chunk = pending.clone().await;

        if let Some(chunk) = &chunk {
            lock(&self.cache).insert(hour, chunk.clone());
        }

        let mut in_flight = lock(&self.in_flight);
        if in_flight
            .get(&hour)
            .is_some_and(|current| current.ptr_eq(&pending))
        {
            in_flight.remove(&hour);
        }
        drop(in_flight);

        chunk
    }

    fn fetch_chunk(&self, info: ChunkInfo, index: Arc<MasterIndex>) -> PendingChunk {
        let fetcher = self.fetcher.clone();
        let url = self.binary_url.clone();
        let timeout = self.config.fetch_timeout;
        let policy = self.config.length_policy;
        let hour = info.hour;

        async move {
            let range = ByteRange::from_len(info.byte_offset as u64, info.byte_size as u64);
            debug!(hour, %range, "fetching chunk");

            let fetch = fetcher.fetch_range(&url, range);
            let bytes = match tokio::time::timeout(timeout, fetch).await {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(error)) => {
                    warn!(hour, %error, "failed to fetch chunk");
                    return None;
                }
                Err(_) => {
                    warn!(hour, ?timeout, "chunk fetch timed out");
                    return None;
                }
            };

            let trips = match decode_chunk(&bytes) {
                Ok(trips) => trips,
                Err(error) => {
                    warn!(hour, %error, "failed to decode chunk");
                    return None;
                }
            };

            report_length_mismatches(&index, hour, &trips, policy);
            debug!(hour, trips = trips.len(), bytes = bytes.len(), "loaded chunk");

            Some(Arc::new(LoadedChunk {
                hour,
                trips,
                loaded_at: Instant::now(),
            }))
        }
        .boxed()
        .shared()
    }

    /// Make the window around `current_hour` resident and evict the rest.
    ///
    /// All missing hours load concurrently and the call returns once every
    /// load has settled. Hours without service or with failed loads are
    /// simply absent afterwards.
    pub async fn update_active_chunks(&self, current_hour: u32) {
        if self.index.get().is_none() {
            warn!(current_hour, "window update before the master index was loaded");
            return;
        }

        let window = self.config.target_hours(current_hour);
        *lock(&self.active_window) = Some(window.clone());

        let missing: Vec<u32> = {
            let cache = lock(&self.cache);
            window.filter(|hour| !cache.contains_key(hour)).collect()
        };

        join_all(missing.into_iter().map(|hour| self.load_chunk(hour))).await;

        self.evict();
    }

    fn evict(&self) {
        let window = lock(&self.active_window).clone();
        let mut cache = lock(&self.cache);

        if let Some(window) = window {
            cache.retain(|hour, _| {
                let keep = window.contains(hour);
                if !keep {
                    debug!(hour, "evicting chunk outside window");
                }
                keep
            });
        }

        while cache.len() > self.config.max_cached_chunks {
            let Some(oldest) = cache
                .values()
                .min_by_key(|chunk| (chunk.loaded_at, chunk.hour))
                .map(|chunk| chunk.hour)
            else {
                break;
            };
            debug!(hour = oldest, "evicting oldest chunk over cache cap");
            cache.remove(&oldest);
        }
    }

    /// Trips from resident chunks overlapping the window around
    /// `time_seconds`, in ascending hour order then file order.
    ///
    /// Trips in hours that are not resident are never returned, even if
    /// they would overlap.
    pub fn visible_trips(&self, time_seconds: f64) -> Vec<RenderableTrip> {
        let Some(index) = self.index.get() else {
            return Vec::new();
        };

        let window = TimeWindow::around(time_seconds, self.config.visibility_half_window);
        let chunks: Vec<Arc<LoadedChunk>> = lock(&self.cache).values().cloned().collect();

        chunks
            .iter()
            .flat_map(|chunk| chunk.trips.iter())
            .filter(|trip| window.contains_trip(trip))
            .filter_map(|trip| to_renderable(index, trip, self.config.length_policy))
            .collect()
    }
}

fn report_length_mismatches(
    index: &MasterIndex,
    hour: u32,
    trips: &[BinaryTrip],
    policy: LengthPolicy,
) {
    let mismatched = trips
        .iter()
        .filter(|trip| length_mismatch(index, trip).is_some())
        .count();

    if mismatched > 0 {
        warn!(
            hour,
            mismatched,
            ?policy,
            "trips with differing path and timestamp lengths"
        );
    }
}

impl TripSource for ChunkManager {
    fn kind(&self) -> SourceKind {
        SourceKind::Binary
    }

    fn is_ready(&self) -> bool {
        ChunkManager::is_ready(self)
    }

    fn prepare_hour<'a>(&'a self, hour: u32) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(self.update_active_chunks(hour))
    }

    fn visible_trips(&self, time_seconds: f64) -> Vec<RenderableTrip> {
        ChunkManager::visible_trips(self, time_seconds)
    }
}
