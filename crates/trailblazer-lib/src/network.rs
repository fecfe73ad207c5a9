//! TrailNetwork - Top-level pipeline for one area
//!
//! Runs reduction, graph construction and simplification once, keeps the simplified
//! graph and its statistics, and answers routing requests against it.

use crate::{
    Config, Graph, Point, RawPoint, Result, RoutePlan, Segment, Target, build_graph, find_routes,
    reduce_points, simplify_graph,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Statistics gathered while building a trail network
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkInfo {
    /// Number of raw point records supplied
    pub raw_points: usize,
    /// Number of distinct segments produced by the reducer
    pub segments: usize,
    /// Node count before simplification
    pub raw_nodes: usize,
    /// Edge count before simplification
    pub raw_edges: usize,
    /// Node count of the simplified graph
    pub nodes: usize,
    /// Edge count of the simplified graph
    pub edges: usize,
    /// Total trail length in kilometers
    pub total_length_km: f64,
}

/// Simplified trail graph of one area, ready for routing
#[derive(Debug, Clone)]
pub struct TrailNetwork {
    graph: Graph,
    config: Config,
    info: NetworkInfo,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TrailNetwork {
    /// Build a network from raw trail points
    ///
    /// The configuration is validated before any stage runs. No raw points yields an
    /// empty network, not an error.
    pub fn build(points: &[RawPoint], config: Config) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("network::build");

        config.validate()?;
        let segments = reduce_points(points, &config)?;
        let mut network = Self::from_segments(&segments, config)?;
        network.info.raw_points = points.len();
        Ok(network)
    }

    /// Build a network from already reduced segments, skipping the reducer
    pub fn from_segments(segments: &[Segment], config: Config) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("network::from_segments");

        config.validate()?;
        let raw = build_graph(segments);
        let graph = simplify_graph(&raw, config.epsilon_degrees);

        let info = NetworkInfo {
            raw_points: 0,
            segments: segments.len(),
            raw_nodes: raw.node_count(),
            raw_edges: raw.edge_count(),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            total_length_km: graph.total_length_km(),
        };

        tracing::info!(
            "Trail network ready: {} nodes and {} edges ({:.2} km of trails)",
            info.nodes,
            info.edges,
            info.total_length_km
        );

        Ok(Self {
            graph,
            config,
            info,
        })
    }

    /// Shortest paths from `origin` to every target over the simplified graph
    pub fn find_routes(&self, origin: Point, targets: &[Target]) -> Result<RoutePlan> {
        find_routes(&self.graph, origin, targets, &self.config)
    }

    /// The simplified graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn info(&self) -> &NetworkInfo {
        &self.info
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }
}
