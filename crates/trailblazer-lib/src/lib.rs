//! Trailblazer Library - Trail Network Construction and Multi-Target Routing
//!
//! This library turns a dense cloud of timestamped GPS trail points into a compact,
//! weighted trail graph and computes the shortest walkable path from one origin to
//! many named targets (monuments) in a single pass.
//!
//! # Architecture
//!
//! Data flows strictly left to right, every stage producing a new immutable value:
//!
//! - **[`reduce_points`]**: k-means clustering plus segment synthesis ([`Segment`] set)
//! - **[`build_graph`]**: weighted undirected [`Graph`] from segments
//! - **[`simplify_graph`]**: removal of degree-2, near-collinear nodes with summed weights
//! - **[`find_routes`]**: single-source Dijkstra, [`RouteGraph`] and [`ReachabilityReport`]
//! - **[`TrailNetwork`]**: facade running the whole pipeline for one area
//!
//! # Performance Characteristics
//!
//! - **Reduction**: O(I × D × K) for I k-means iterations over D distinct points
//! - **Simplification**: O(V + E) worklist passes
//! - **Routing**: O((V + E) log V), independent of the number of targets

mod codec;
mod config;
mod graph;
mod network;
mod point;
mod reducer;
mod router;
mod simplify;
pub mod utils;

// Public API exports
pub use codec::{read_point_records, read_segments, write_point_records, write_segments};
pub use config::Config;
pub use graph::{Edge, Graph, build_graph};
pub use network::{NetworkInfo, TrailNetwork};
pub use point::{BoundingBox, Point, Segment, Target};
pub use reducer::{Clustering, RawPoint, cluster_points, reduce_points};
pub use router::{
    Reachability, ReachabilityEntry, ReachabilityReport, RouteEdge, RouteGraph, RouteNode,
    RoutePlan, UnreachableReason, find_routes,
};
pub use simplify::simplify_graph;

/// Error types for the trail network pipeline
#[derive(Debug, thiserror::Error)]
pub enum TrailError {
    #[error("Invalid configuration for `{field}`: {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("GPX parsing error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that all public types are accessible
        let _: fn(&[Segment]) -> Graph = build_graph;
        let _: fn(&Graph, f64) -> Graph = simplify_graph;
        let _: fn() -> Config = Config::default;
    }

    #[test]
    fn test_error_display() {
        let err = TrailError::InvalidConfiguration {
            field: "n_clusters",
            reason: "must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration for `n_clusters`: must be positive"
        );

        let err = TrailError::Parse {
            line: 3,
            reason: "expected 4 fields".to_string(),
        };
        assert!(err.to_string().contains("line 3"));
    }
}
