//! Utility functions for great-circle measurements on trail coordinates

use crate::Point;
use geo::{Bearing, Distance, Haversine};

/// Earth's mean radius in kilometers (the radius used by [`Haversine`])
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0088;

/// Maximum absolute latitude in degrees
pub const MAX_LATITUDE: f64 = 90.0;

/// Maximum absolute longitude in degrees
pub const MAX_LONGITUDE: f64 = 180.0;

/// Great-circle (haversine) distance between two points in kilometers
#[inline(always)]
pub fn haversine_km(a: Point, b: Point) -> f64 {
    Haversine.distance(a.to_geo(), b.to_geo()) / 1000.0
}

/// Initial great-circle bearing from `from` to `to`, in degrees clockwise from north
#[inline(always)]
pub fn bearing_degrees(from: Point, to: Point) -> f64 {
    Haversine.bearing(from.to_geo(), to.to_geo())
}

/// Deviation from a straight line at `b` along the path `a -> b -> c`, in degrees
///
/// This is `|180 - interior_angle|`, where the interior angle at `b` is derived from
/// the great-circle bearings `a -> b` and `b -> c`. A perfectly straight path yields 0,
/// a full reversal yields 180.
///
/// Returns `None` when the angle is undefined (coincident points or non-finite bearings).
pub fn straightness_deviation(a: Point, b: Point, c: Point) -> Option<f64> {
    if haversine_km(a, b) == 0.0 || haversine_km(b, c) == 0.0 {
        return None;
    }

    let incoming = bearing_degrees(a, b);
    let outgoing = bearing_degrees(b, c);
    if !incoming.is_finite() || !outgoing.is_finite() {
        return None;
    }

    // Signed turn in (-180, 180]
    let mut turn = (outgoing - incoming) % 360.0;
    if turn > 180.0 {
        turn -= 360.0;
    } else if turn <= -180.0 {
        turn += 360.0;
    }
    Some(turn.abs())
}

/// Check if a coordinate pair is finite and within WGS84 bounds
#[inline(always)]
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && lat.abs() <= MAX_LATITUDE
        && lon.abs() <= MAX_LONGITUDE
}
