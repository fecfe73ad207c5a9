//! Pipeline configuration
//!
//! The thresholds are supplied by the caller for each area that is processed. They are
//! validated once, before any stage runs.

use crate::{Result, TrailError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for trail network construction and routing
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Number of k-means clusters, i.e. the target number of representative points.
    /// Clamped to the number of distinct raw points at reduction time.
    /// Default: 500
    pub n_clusters: usize,
    /// Maximum elapsed time between two consecutive raw points for them to form a
    /// segment, in seconds.
    /// Default: 300
    pub time_delta_secs: f64,
    /// Maximum great-circle distance between two consecutive raw points for them to
    /// form a segment, in kilometers.
    /// Default: 0.1
    pub distance_delta_km: f64,
    /// Angular tolerance for collinear node elision, in degrees.
    /// Default: 10.0
    pub epsilon_degrees: f64,
    /// Upper bound on Lloyd iterations during clustering.
    /// Default: 100
    pub kmeans_max_iterations: usize,
    /// Targets farther than this from every graph node are reported as too far from
    /// the trail network instead of being routed to their nearest node.
    /// Default: None (no limit)
    pub max_snap_distance_km: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            n_clusters: 500,
            time_delta_secs: 300.0,
            distance_delta_km: 0.1,
            epsilon_degrees: 10.0,
            kmeans_max_iterations: 100,
            max_snap_distance_km: None,
        }
    }
}

impl Config {
    /// Reject non-positive or non-finite thresholds before processing begins
    pub fn validate(&self) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(invalid("n_clusters", "must be a positive integer"));
        }
        if self.kmeans_max_iterations == 0 {
            return Err(invalid("kmeans_max_iterations", "must be a positive integer"));
        }
        check_positive("time_delta_secs", self.time_delta_secs)?;
        check_positive("distance_delta_km", self.distance_delta_km)?;
        check_positive("epsilon_degrees", self.epsilon_degrees)?;
        if self.epsilon_degrees >= 180.0 {
            return Err(invalid(
                "epsilon_degrees",
                format!("must be below 180, got {}", self.epsilon_degrees),
            ));
        }
        if let Some(limit) = self.max_snap_distance_km {
            check_positive("max_snap_distance_km", limit)?;
        }
        Ok(())
    }
}

fn check_positive(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            field,
            format!("must be a positive finite number, got {value}"),
        ));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> TrailError {
    TrailError::InvalidConfiguration {
        field,
        reason: reason.into(),
    }
}
