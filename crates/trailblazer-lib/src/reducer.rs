//! Point reduction: raw GPS trail points to a compact segment set
//!
//! Raw points are clustered with k-means over (latitude, longitude); every cluster
//! centroid becomes a representative point. Consecutive points of the same track that
//! fall into different clusters then yield a segment between the two representatives.

use crate::{Config, Point, Result, Segment};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use time::OffsetDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single timestamped GPS record as delivered by the data-acquisition layer
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawPoint {
    pub lat: f64,
    pub lon: f64,
    pub timestamp: OffsetDateTime,
    /// Track identifier, unique within a page
    pub track: u32,
    /// Page identifier of the download batch the track came from
    pub page: u32,
}

/// Result of clustering a point cloud
#[derive(Clone, Debug, Default)]
pub struct Clustering {
    /// Representative point of each cluster
    pub centroids: Vec<Point>,
    /// Cluster index of every input point, in input order
    pub labels: Vec<usize>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RawPoint {
    pub fn new(lat: f64, lon: f64, timestamp: OffsetDateTime, track: u32, page: u32) -> Self {
        Self {
            lat,
            lon,
            timestamp,
            track,
            page,
        }
    }

    /// Coordinate of this record
    #[inline]
    pub fn point(&self) -> Point {
        Point::new(self.lat, self.lon)
    }

    /// Flatten one page of downloaded GPX data into raw records
    ///
    /// The track identifier is the position of the track within the page. Only track
    /// segments in which every point carries a timestamp are kept, and each of them is
    /// sorted chronologically.
    pub fn from_gpx_page(gpx: &gpx::Gpx, page: u32) -> Vec<RawPoint> {
        let mut records = Vec::new();

        for (track_index, track) in gpx.tracks.iter().enumerate() {
            for segment in &track.segments {
                let timed: Option<Vec<(OffsetDateTime, &gpx::Waypoint)>> = segment
                    .points
                    .iter()
                    .map(|waypoint| waypoint.time.map(|t| (OffsetDateTime::from(t), waypoint)))
                    .collect();

                let Some(mut timed) = timed else {
                    tracing::debug!(
                        "Skipping segment of track {} on page {}: missing timestamps",
                        track_index,
                        page
                    );
                    continue;
                };

                timed.sort_by_key(|(time, _)| *time);
                records.extend(timed.into_iter().map(|(time, waypoint)| {
                    RawPoint::new(
                        waypoint.point().y(),
                        waypoint.point().x(),
                        time,
                        track_index as u32,
                        page,
                    )
                }));
            }
        }

        records
    }

    /// Parse a GPX document and flatten it with [`RawPoint::from_gpx_page`]
    pub fn read_gpx_page<R: Read>(reader: R, page: u32) -> Result<Vec<RawPoint>> {
        let gpx = gpx::read(reader)?;
        Ok(Self::from_gpx_page(&gpx, page))
    }
}

/// Cluster points with k-means over (latitude, longitude)
///
/// Identical coordinates are clustered once with a multiplicity weight, and the
/// requested cluster count is clamped to the number of distinct points. Initial centers
/// are chosen by farthest-point traversal starting at the first point, so the result is
/// fully deterministic for a given input.
pub fn cluster_points(points: &[Point], n_clusters: usize, max_iterations: usize) -> Clustering {
    #[cfg(feature = "profiling")]
    profiling::scope!("reducer::cluster_points");

    // Collapse duplicates, remembering where each input point went
    let mut slots: HashMap<Point, usize> = HashMap::new();
    let mut distinct: Vec<Point> = Vec::new();
    let mut weights: Vec<usize> = Vec::new();
    let mut point_slot = Vec::with_capacity(points.len());
    for point in points {
        let slot = *slots.entry(*point).or_insert_with(|| {
            distinct.push(*point);
            weights.push(0);
            distinct.len() - 1
        });
        weights[slot] += 1;
        point_slot.push(slot);
    }

    let k = n_clusters.min(distinct.len());
    if k == 0 {
        return Clustering::default();
    }
    if k < n_clusters {
        tracing::debug!(
            "Clamping cluster count from {} to {} distinct points",
            n_clusters,
            k
        );
    }

    let mut centers = farthest_point_centers(&distinct, k);
    let mut assignment = vec![usize::MAX; distinct.len()];
    let mut converged = false;

    for iteration in 0..max_iterations {
        let changed = assign_to_nearest(&distinct, &centers, &mut assignment);
        if !changed {
            tracing::debug!("k-means converged after {} iterations", iteration);
            converged = true;
            break;
        }

        let mut sums = vec![[0.0_f64, 0.0_f64]; k];
        let mut counts = vec![0usize; k];
        for (i, point) in distinct.iter().enumerate() {
            let cluster = assignment[i];
            let weight = weights[i] as f64;
            sums[cluster][0] += point.lat * weight;
            sums[cluster][1] += point.lon * weight;
            counts[cluster] += weights[i];
        }
        for (center, (sum, count)) in centers.iter_mut().zip(sums.iter().zip(&counts)) {
            // Empty clusters keep their previous center
            if *count > 0 {
                *center = [sum[0] / *count as f64, sum[1] / *count as f64];
            }
        }
    }

    if !converged {
        // Labels must describe the final centers
        assign_to_nearest(&distinct, &centers, &mut assignment);
        tracing::debug!("k-means stopped after {} iterations", max_iterations);
    }

    Clustering {
        centroids: centers.iter().map(|c| Point::new(c[0], c[1])).collect(),
        labels: point_slot.iter().map(|&slot| assignment[slot]).collect(),
    }
}

/// Reduce raw trail points to a deduplicated, sorted set of segments
///
/// A segment is emitted between the representatives of two consecutive-in-time points
/// sharing track and page identifiers when they are at most `time_delta_secs` apart in
/// time, at most `distance_delta_km` apart on the ground, and in different clusters.
pub fn reduce_points(points: &[RawPoint], config: &Config) -> Result<Vec<Segment>> {
    #[cfg(feature = "profiling")]
    profiling::scope!("reducer::reduce_points");

    config.validate()?;

    let valid: Vec<&RawPoint> = points
        .iter()
        .filter(|record| {
            let ok = record.point().is_valid();
            if !ok {
                tracing::warn!(
                    "Skipping raw point with invalid coordinates: ({}, {})",
                    record.lat,
                    record.lon
                );
            }
            ok
        })
        .collect();

    if valid.is_empty() {
        tracing::info!("No raw points to reduce");
        return Ok(Vec::new());
    }

    let coordinates: Vec<Point> = valid.iter().map(|record| record.point()).collect();
    let clustering = cluster_points(
        &coordinates,
        config.n_clusters,
        config.kmeans_max_iterations,
    );

    // Group record indices per (page, track), then order each group by time
    let mut tracks: BTreeMap<(u32, u32), Vec<usize>> = BTreeMap::new();
    for (i, record) in valid.iter().enumerate() {
        tracks.entry((record.page, record.track)).or_default().push(i);
    }

    let mut segments = BTreeSet::new();
    let mut degenerate = 0usize;
    for indices in tracks.values_mut() {
        indices.sort_by_key(|&i| valid[i].timestamp);

        for pair in indices.windows(2) {
            let (i, j) = (pair[0], pair[1]);
            let (first, second) = (valid[i], valid[j]);

            let elapsed = (second.timestamp - first.timestamp).as_seconds_f64().abs();
            if elapsed > config.time_delta_secs {
                continue;
            }
            if coordinates[i].distance_km(&coordinates[j]) > config.distance_delta_km {
                continue;
            }
            let (label_i, label_j) = (clustering.labels[i], clustering.labels[j]);
            if label_i == label_j {
                continue;
            }

            let segment = Segment::new(
                clustering.centroids[label_i],
                clustering.centroids[label_j],
            );
            if segment.is_degenerate() {
                degenerate += 1;
                continue;
            }
            segments.insert(segment);
        }
    }

    if degenerate > 0 {
        tracing::debug!("Discarded {} degenerate segments", degenerate);
    }
    tracing::info!(
        "Reduced {} raw points into {} clusters and {} segments",
        valid.len(),
        clustering.centroids.len(),
        segments.len()
    );

    Ok(segments.into_iter().collect())
}

/// Pick `k` initial centers by repeatedly taking the point farthest from all chosen ones
fn farthest_point_centers(points: &[Point], k: usize) -> Vec<[f64; 2]> {
    let mut centers = Vec::with_capacity(k);
    let mut nearest = vec![f64::INFINITY; points.len()];
    let mut next = 0;

    for _ in 0..k {
        let chosen = points[next];
        centers.push([chosen.lat, chosen.lon]);

        let mut best_idx = 0;
        let mut best_dist = f64::NEG_INFINITY;
        for (i, point) in points.iter().enumerate() {
            let dist = squared_distance(point, &[chosen.lat, chosen.lon]);
            if dist < nearest[i] {
                nearest[i] = dist;
            }
            if nearest[i] > best_dist {
                best_dist = nearest[i];
                best_idx = i;
            }
        }
        next = best_idx;
    }

    centers
}

/// Assign every point to its nearest center (lowest index on ties).
/// Returns whether any assignment changed.
fn assign_to_nearest(points: &[Point], centers: &[[f64; 2]], assignment: &mut [usize]) -> bool {
    let nearest: Vec<usize> = points
        .par_iter()
        .map(|point| {
            let mut best_cluster = 0;
            let mut best_dist = f64::INFINITY;
            for (j, center) in centers.iter().enumerate() {
                let dist = squared_distance(point, center);
                if dist < best_dist {
                    best_dist = dist;
                    best_cluster = j;
                }
            }
            best_cluster
        })
        .collect();

    let mut changed = false;
    for (slot, cluster) in assignment.iter_mut().zip(nearest) {
        if *slot != cluster {
            *slot = cluster;
            changed = true;
        }
    }
    changed
}

#[inline(always)]
fn squared_distance(point: &Point, center: &[f64; 2]) -> f64 {
    (point.lat - center[0]).powi(2) + (point.lon - center[1]).powi(2)
}
