//! Joins raw chunk trips against the master index.

use tracing::trace;

use crate::config::LengthPolicy;
use crate::models::trip::{BinaryTrip, RenderableTrip};
use crate::provider::master_index::MasterIndex;

/// Build the renderable form of `trip`.
///
/// Returns `None` when the shape or route is missing from the index, when
/// the policy rejects a path/timestamp length mismatch, or when nothing of
/// the path is left.
pub fn to_renderable(
    index: &MasterIndex,
    trip: &BinaryTrip,
    policy: LengthPolicy,
) -> Option<RenderableTrip> {
    let shape = index.shape(trip.shape_index)?;
    let route = index.route(trip.route_index)?;

    let mut path: Vec<[f64; 3]> = shape
        .points()
        .map(|[lng, lat, elevation]| [lng as f64, lat as f64, elevation as f64])
        .collect();
    let mut timestamps: Vec<f64> = trip.timestamps.iter().map(|&t| t as f64).collect();

    if !reconcile_lengths(&mut path, &mut timestamps, policy) {
        return None;
    }
    if path.is_empty() {
        return None;
    }

    Some(RenderableTrip {
        path,
        timestamps,
        route_color: route.hex_color(),
        route_short_name: route.name.to_string(),
        route_type: route.route_type,
        headsign: index.headsign(trip.headsign_index).to_string(),
        route_id: Some(trip.route_index),
    })
}

/// Path and timestamp lengths of `trip` when they differ.
pub fn length_mismatch(index: &MasterIndex, trip: &BinaryTrip) -> Option<(usize, usize)> {
    let points = index.shape(trip.shape_index)?.point_count() as usize;
    let timestamps = trip.timestamps.len();
    (points != timestamps).then_some((points, timestamps))
}

/// Bring both arrays to the same length. Returns false if the policy drops
/// the trip instead.
pub(crate) fn reconcile_lengths<P, T>(
    path: &mut Vec<P>,
    timestamps: &mut Vec<T>,
    policy: LengthPolicy,
) -> bool {
    if path.len() == timestamps.len() {
        return true;
    }

    match policy {
        LengthPolicy::Truncate => {
            trace!(
                points = path.len(),
                timestamps = timestamps.len(),
                "truncating trip to shorter array"
            );
            let len = path.len().min(timestamps.len());
            path.truncate(len);
            timestamps.truncate(len);
            true
        }
        LengthPolicy::Reject => false,
    }
}
