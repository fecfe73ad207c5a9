//! Coordinate value types shared by every pipeline stage
//!
//! [`Point`] compares and hashes by coordinate value, so geometrically identical points
//! coming from different tracks unify into the same graph node. [`Segment`] is stored
//! normalized, which makes a segment and its reverse the same edge.

use crate::utils;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A geographic coordinate in WGS84 degrees
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

impl Point {
    /// Create a new point from latitude and longitude in degrees
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        // Fold -0.0 into 0.0 so that equal coordinates share one bit pattern
        Self {
            lat: lat + 0.0,
            lon: lon + 0.0,
        }
    }

    /// Convert to a `geo::Point` (x = longitude, y = latitude)
    #[inline]
    pub fn to_geo(self) -> geo::Point<f64> {
        geo::Point::new(self.lon, self.lat)
    }

    /// Check that both coordinates are finite and within WGS84 bounds
    #[inline]
    pub fn is_valid(&self) -> bool {
        utils::is_valid_coordinate(self.lat, self.lon)
    }

    /// Great-circle distance to another point in kilometers
    #[inline]
    pub fn distance_km(&self, other: &Point) -> f64 {
        utils::haversine_km(*self, *other)
    }
}

impl From<geo::Point<f64>> for Point {
    fn from(point: geo::Point<f64>) -> Self {
        Point::new(point.y(), point.x())
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Point {}

// The fields are public, so -0.0 may bypass `Point::new`; fold it again here
impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.lat + 0.0).to_bits().hash(state);
        (self.lon + 0.0).to_bits().hash(state);
    }
}

/// Lexicographic `(lat, lon)` order, used wherever ties must be broken deterministically
impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.lat + 0.0)
            .total_cmp(&(other.lat + 0.0))
            .then_with(|| (self.lon + 0.0).total_cmp(&(other.lon + 0.0)))
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An undirected trail link between two points
///
/// The endpoints are stored in ascending [`Point`] order, so `Segment::new(a, b)` and
/// `Segment::new(b, a)` are equal. No weight is stored: it is derived from the endpoints
/// when the segment becomes a graph edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    start: Point,
    end: Point,
}

impl Segment {
    /// Create a new segment between two points
    pub fn new(a: Point, b: Point) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Lower endpoint in lexicographic order
    #[inline]
    pub fn start(&self) -> Point {
        self.start
    }

    /// Upper endpoint in lexicographic order
    #[inline]
    pub fn end(&self) -> Point {
        self.end
    }

    /// A segment whose endpoints coincide
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Great-circle length in kilometers
    #[inline]
    pub fn length_km(&self) -> f64 {
        utils::haversine_km(self.start, self.end)
    }
}

/// A named destination the router must attempt to reach
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Target {
    pub name: String,
    pub location: Point,
}

impl Target {
    pub fn new(name: impl Into<String>, location: Point) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

/// Axis-aligned geographic search area
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundingBox {
    pub bottom_left: Point,
    pub top_right: Point,
}

impl BoundingBox {
    pub fn new(bottom_left: Point, top_right: Point) -> Self {
        Self {
            bottom_left,
            top_right,
        }
    }

    /// Inclusive containment test
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.lat >= self.bottom_left.lat
            && point.lat <= self.top_right.lat
            && point.lon >= self.bottom_left.lon
            && point.lon <= self.top_right.lon
    }

    /// Keep only the targets located inside this box, preserving their order
    pub fn filter_targets(&self, targets: &[Target]) -> Vec<Target> {
        let filtered: Vec<Target> = targets
            .iter()
            .filter(|target| self.contains(target.location))
            .cloned()
            .collect();

        tracing::debug!(
            "Filtered targets to search area: {} of {} kept",
            filtered.len(),
            targets.len()
        );
        filtered
    }
}
