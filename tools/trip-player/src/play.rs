use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use zurich_transit::{Playback, PlaybackConfig, RenderableTrip};

use crate::source::RoutingFetcher;

/// Plays `frames` frames and returns the trips visible in the last one.
pub async fn run(
    config: PlaybackConfig,
    frames: u32,
    frame: Duration,
    dump: bool,
) -> Result<Vec<RenderableTrip>> {
    let fetcher = RoutingFetcher::new();
    let mut playback =
        Playback::new(config, Arc::new(fetcher)).context("Invalid playback config")?;
    info!("{}", playback.status());
    playback
        .initialize()
        .await
        .context("No trip source could be loaded")?;
    info!("{}", playback.status());

    let mut interval = tokio::time::interval(frame);
    let mut last_frame = tokio::time::Instant::now();
    let mut trips = playback.visible_trips();

    for _ in 0..frames {
        let now = interval.tick().await;
        trips = playback.tick(now - last_frame);
        last_frame = now;

        info!(
            time = %playback.clock().wall_clock(),
            hour = playback.clock().current_hour(),
            visible = trips.len(),
            routes = %summarize(&trips),
            "frame"
        );
    }

    if dump {
        println!("{}", serde_json::to_string_pretty(&trips)?);
    }

    Ok(trips)
}

/// Visible trip counts per route, busiest first, e.g. `10×4 S3×2`.
fn summarize(trips: &[RenderableTrip]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for trip in trips {
        *counts.entry(trip.route_short_name.as_str()).or_default() += 1;
    }

    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .iter()
        .take(8)
        .map(|(route, count)| format!("{route}×{count}"))
        .collect::<Vec<_>>()
        .join(" ")
}
