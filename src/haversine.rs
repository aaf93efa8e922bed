//! Great-circle distance helpers.
//!
//! Coordinates follow the GeoJSON order used across the crate:
//! `[longitude, latitude]`.

use rayon::prelude::*;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Tracks shorter than this are summed sequentially.
const PARALLEL_THRESHOLD: usize = 4096;

/// Haversine distance between two `[lng, lat]` points in kilometers.
pub fn haversine_km(from: [f64; 2], to: [f64; 2]) -> f64 {
    let [lng1, lat1] = from;
    let [lng2, lat2] = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Length in kilometers of every consecutive segment of a path.
///
/// Long telemetry tracks (tens of thousands of fixes) are split across the
/// rayon pool.
pub fn segment_lengths_km(points: &[[f64; 2]]) -> Vec<f64> {
    if points.len() < 2 {
        return Vec::new();
    }
    if points.len() < PARALLEL_THRESHOLD {
        points.windows(2).map(|w| haversine_km(w[0], w[1])).collect()
    } else {
        points
            .par_windows(2)
            .map(|w| haversine_km(w[0], w[1]))
            .collect()
    }
}

/// Total path length in kilometers.
pub fn path_length_km(points: &[[f64; 2]]) -> f64 {
    segment_lengths_km(points).iter().sum()
}
