//! End-to-end streaming against a local HTTP server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use zurich_transit::format::{BinaryEncoder, EncodedFile};
use zurich_transit::prelude::*;

struct Served {
    binary: Vec<u8>,
    manifest: Vec<u8>,
    range_requests: AtomicUsize,
}

fn encode(hours: std::ops::RangeInclusive<u32>) -> EncodedFile {
    let mut encoder = BinaryEncoder::new();
    let shape = encoder
        .add_shape(&[8.5417, 47.3769, 408.0, 8.5435, 47.3780, 409.5, 8.5460, 47.3791, 411.0])
        .unwrap();
    let route = encoder.add_route("10", RouteType::Tram, [0, 161, 224]).unwrap();
    let headsign = encoder.add_headsign("Flughafen").unwrap();

    for hour in hours {
        let start = hour * 3600 + 300;
        encoder.add_trip(BinaryTrip {
            shape_index: shape,
            route_index: route,
            headsign_index: headsign,
            timestamps: vec![start as f32, (start + 90) as f32, (start + 180) as f32],
            start_time: start,
        });
    }

    encoder.finish().unwrap()
}

fn parse_range(value: &str) -> Option<(usize, usize)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

async fn serve_binary(State(served): State<Arc<Served>>, headers: HeaderMap) -> Response {
    let body = &served.binary;
    let Some((start, end)) = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_range)
    else {
        return (StatusCode::OK, body.clone()).into_response();
    };

    served.range_requests.fetch_add(1, Ordering::SeqCst);
    if start >= body.len() {
        return StatusCode::RANGE_NOT_SATISFIABLE.into_response();
    }
    let end = end.min(body.len() - 1);

    (
        StatusCode::PARTIAL_CONTENT,
        [(
            header::CONTENT_RANGE,
            format!("bytes {start}-{end}/{}", body.len()),
        )],
        body[start..=end].to_vec(),
    )
        .into_response()
}

/// Ignores Range headers like some static hosts do.
async fn serve_whole(State(served): State<Arc<Served>>) -> Vec<u8> {
    served.binary.clone()
}

async fn serve_manifest(State(served): State<Arc<Served>>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        served.manifest.clone(),
    )
        .into_response()
}

async fn start_server(file: EncodedFile) -> (String, Arc<Served>) {
    let served = Arc::new(Served {
        binary: file.binary,
        manifest: serde_json::to_vec(&file.manifest).unwrap(),
        range_requests: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/zurich/trips.bin", get(serve_binary))
        .route("/zurich/trips.manifest.json", get(serve_manifest))
        .route("/plain/trips.bin", get(serve_whole))
        .route("/plain/trips.manifest.json", get(serve_manifest))
        .with_state(served.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), served)
}

#[tokio::test]
async fn test_streams_window_over_http() {
    let (base, served) = start_server(encode(6..=12)).await;
    let manager = ChunkManager::new(
        format!("{base}/zurich/trips.bin"),
        Arc::new(HttpRangeFetcher::new()),
        StreamConfig::default(),
    )
    .unwrap();

    let index = manager.initialize().await.unwrap();
    assert_eq!(index.hours().collect::<Vec<_>>(), (6..=12).collect::<Vec<_>>());
    assert_eq!(served.range_requests.load(Ordering::SeqCst), 2);

    manager.update_active_chunks(8).await;
    assert_eq!(manager.resident_hours(), vec![7, 8, 9]);
    assert_eq!(served.range_requests.load(Ordering::SeqCst), 5);

    let trips = manager.visible_trips(8.0 * 3600.0 + 400.0);
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].route_short_name, "10");
    assert_eq!(trips[0].route_color, "#00a1e0");
    assert_eq!(trips[0].path.len(), 3);
    assert_eq!(trips[0].timestamps, vec![29100.0, 29190.0, 29280.0]);

    manager.update_active_chunks(9).await;
    assert_eq!(manager.resident_hours(), vec![8, 9, 10]);
    assert_eq!(served.range_requests.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_server_without_range_support() {
    let (base, _served) = start_server(encode(8..=8)).await;
    let manager = ChunkManager::new(
        format!("{base}/plain/trips.bin"),
        Arc::new(HttpRangeFetcher::new()),
        StreamConfig::default(),
    )
    .unwrap();

    manager.initialize().await.unwrap();
    manager.update_active_chunks(8).await;

    assert_eq!(manager.resident_hours(), vec![8]);
    assert_eq!(manager.visible_trips(29_100.0).len(), 1);
}

#[tokio::test]
async fn test_missing_binary_without_fallback() {
    let (base, _served) = start_server(encode(8..=8)).await;
    let config = PlaybackConfig {
        binary_url: Some(format!("{base}/missing/trips.bin")),
        fallback_url: None,
        ..Default::default()
    };

    let mut playback = Playback::new(config, Arc::new(HttpRangeFetcher::new())).unwrap();
    let error = playback.initialize().await.unwrap_err();

    assert!(matches!(error, StreamError::Http { status: 404, .. }));
    assert!(error.is_fallback_trigger());
    assert!(matches!(playback.status(), PlaybackStatus::Failed(_)));
}
