//! Weighted undirected trail graph
//!
//! Nodes are kept sorted in lexicographic [`Point`] order, which gives every node a
//! stable index and makes any "first best" scan tie-break by coordinate. Each edge
//! stores its weight explicitly: a haversine length when built from segments, or the
//! sum of the replaced edges after simplification.

use crate::{Point, Segment};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// One direction of an undirected edge, as seen from its source node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    /// Index of the neighbouring node
    pub to: usize,
    /// Traversal cost in kilometers
    pub weight_km: f64,
}

/// Immutable undirected graph without self-loops or parallel edges
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    /// Node coordinates in ascending order
    nodes: Vec<Point>,
    /// Adjacency per node, sorted by neighbour index
    adjacency: Vec<SmallVec<[Edge; 4]>>,
    /// Number of undirected edges
    edge_count: usize,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from explicitly weighted undirected edges
    ///
    /// Self-loops are dropped. When the same pair of nodes appears more than once, only
    /// the lightest weight is kept.
    pub fn from_weighted_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (Point, Point, f64)>,
    {
        let mut links: BTreeMap<Point, BTreeMap<Point, f64>> = BTreeMap::new();

        for (a, b, weight_km) in edges {
            if a == b {
                tracing::debug!("Dropping self-loop at ({}, {})", a.lat, a.lon);
                continue;
            }
            for (from, to) in [(a, b), (b, a)] {
                links
                    .entry(from)
                    .or_default()
                    .entry(to)
                    .and_modify(|w| *w = w.min(weight_km))
                    .or_insert(weight_km);
            }
        }

        Self::from_links(&links)
    }

    /// Build from a symmetric adjacency map
    pub(crate) fn from_links(links: &BTreeMap<Point, BTreeMap<Point, f64>>) -> Self {
        let nodes: Vec<Point> = links.keys().copied().collect();
        let mut edge_count = 0;

        let adjacency: Vec<SmallVec<[Edge; 4]>> = links
            .values()
            .map(|neighbours| {
                edge_count += neighbours.len();
                // BTreeMap iteration is ascending, so indices come out sorted
                neighbours
                    .iter()
                    .filter_map(|(point, &weight_km)| {
                        let to = nodes.binary_search(point).ok()?;
                        Some(Edge { to, weight_km })
                    })
                    .collect()
            })
            .collect();

        Self {
            nodes,
            adjacency,
            edge_count: edge_count / 2,
        }
    }

    /// Symmetric adjacency map, the mutable working form used by the simplifier
    pub(crate) fn to_links(&self) -> BTreeMap<Point, BTreeMap<Point, f64>> {
        self.nodes
            .iter()
            .zip(&self.adjacency)
            .map(|(point, edges)| {
                let neighbours = edges
                    .iter()
                    .map(|edge| (self.nodes[edge.to], edge.weight_km))
                    .collect();
                (*point, neighbours)
            })
            .collect()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node coordinates in ascending order
    #[inline]
    pub fn nodes(&self) -> &[Point] {
        &self.nodes
    }

    /// Coordinate of the node at `index`
    #[inline]
    pub fn node(&self, index: usize) -> Option<Point> {
        self.nodes.get(index).copied()
    }

    /// Index of the node located exactly at `point`
    #[inline]
    pub fn node_index(&self, point: Point) -> Option<usize> {
        self.nodes.binary_search(&point).ok()
    }

    #[inline]
    pub fn contains_node(&self, point: Point) -> bool {
        self.node_index(point).is_some()
    }

    /// Outgoing edges of the node at `index`
    #[inline]
    pub fn neighbors(&self, index: usize) -> &[Edge] {
        self.adjacency
            .get(index)
            .map(|edges| edges.as_slice())
            .unwrap_or(&[])
    }

    #[inline]
    pub fn degree(&self, index: usize) -> usize {
        self.neighbors(index).len()
    }

    /// Weight of the edge between two node coordinates, if they are adjacent
    pub fn edge_weight(&self, a: Point, b: Point) -> Option<f64> {
        let from = self.node_index(a)?;
        let to = self.node_index(b)?;
        self.neighbors(from)
            .binary_search_by_key(&to, |edge| edge.to)
            .ok()
            .map(|i| self.neighbors(from)[i].weight_km)
    }

    /// Every undirected edge once, as `(lower, upper, weight_km)` in ascending order
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point, f64)> + '_ {
        self.adjacency.iter().enumerate().flat_map(move |(from, edges)| {
            edges
                .iter()
                .filter(move |edge| edge.to > from)
                .map(move |edge| (self.nodes[from], self.nodes[edge.to], edge.weight_km))
        })
    }

    /// Sum of all edge weights in kilometers
    pub fn total_length_km(&self) -> f64 {
        self.edges().map(|(_, _, weight)| weight).sum()
    }

    /// Node closest to `point` by great-circle distance, with that distance in km
    ///
    /// Ties are resolved in favour of the lexicographically smallest coordinate.
    pub fn nearest_node(&self, point: Point) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (index, node) in self.nodes.iter().enumerate() {
            let distance = point.distance_km(node);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((index, distance)),
            }
        }
        best
    }
}

/// Materialize a graph from trail segments
///
/// Every segment endpoint becomes a node and every segment an edge weighted by its
/// haversine length. Degenerate segments are skipped; duplicates collapse into one edge.
pub fn build_graph(segments: &[Segment]) -> Graph {
    #[cfg(feature = "profiling")]
    profiling::scope!("graph::build_graph");

    let graph = Graph::from_weighted_edges(
        segments
            .iter()
            .filter(|segment| !segment.is_degenerate())
            .map(|segment| (segment.start(), segment.end(), segment.length_km())),
    );

    tracing::info!(
        "Created graph with {} nodes and {} edges from {} segments",
        graph.node_count(),
        graph.edge_count(),
        segments.len()
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64) -> Point {
        Point::new(lat, lon)
    }

    #[test]
    fn test_empty_graph() {
        let graph = build_graph(&[]);
        assert!(graph.is_empty());
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.nearest_node(p(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_build_graph_nodes_and_weights() {
        let a = p(0.0, 0.0);
        let b = p(0.0, 0.001);
        let c = p(0.001, 0.001);
        let graph = build_graph(&[Segment::new(a, b), Segment::new(b, c)]);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        for point in [a, b, c] {
            assert!(graph.contains_node(point));
        }

        let weight = graph.edge_weight(a, b).unwrap();
        assert!((weight - a.distance_km(&b)).abs() < 1e-12);
        assert_eq!(graph.edge_weight(b, a), Some(weight));
        assert!(graph.edge_weight(a, c).is_none());
    }

    #[test]
    fn test_every_edge_endpoint_is_a_node() {
        let segments: Vec<Segment> = (0..10)
            .map(|i| {
                let i = i as f64;
                Segment::new(p(i * 0.001, 0.0), p(i * 0.001, 0.001 + i * 0.0005))
            })
            .collect();
        let graph = build_graph(&segments);

        for (a, b, _) in graph.edges() {
            assert!(graph.contains_node(a));
            assert!(graph.contains_node(b));
        }
        assert_eq!(graph.edges().count(), graph.edge_count());
    }

    #[test]
    fn test_duplicate_and_reversed_segments_collapse() {
        let a = p(0.0, 0.0);
        let b = p(0.0, 0.001);
        let graph = build_graph(&[Segment::new(a, b), Segment::new(b, a), Segment::new(a, b)]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.degree(graph.node_index(a).unwrap()), 1);
    }

    #[test]
    fn test_degenerate_segment_skipped() {
        let a = p(1.0, 1.0);
        let graph = build_graph(&[Segment::new(a, a)]);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_from_weighted_edges_keeps_lightest() {
        let a = p(0.0, 0.0);
        let b = p(0.0, 0.001);
        let graph = Graph::from_weighted_edges([(a, b, 5.0), (b, a, 2.0), (a, b, 3.0), (a, a, 1.0)]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_weight(a, b), Some(2.0));
    }

    #[test]
    fn test_nodes_sorted_and_neighbors_sorted() {
        let center = p(0.0, 0.0);
        let graph = build_graph(&[
            Segment::new(center, p(0.001, 0.0)),
            Segment::new(center, p(-0.001, 0.0)),
            Segment::new(center, p(0.0, 0.001)),
        ]);

        let nodes = graph.nodes();
        assert!(nodes.windows(2).all(|w| w[0] < w[1]));

        let index = graph.node_index(center).unwrap();
        let neighbors = graph.neighbors(index);
        assert_eq!(neighbors.len(), 3);
        assert!(neighbors.windows(2).all(|w| w[0].to < w[1].to));
    }

    #[test]
    fn test_nearest_node_tie_breaks_lexicographically() {
        let west = p(0.0, -0.001);
        let east = p(0.0, 0.001);
        let graph = build_graph(&[Segment::new(west, east)]);

        // Equidistant from both nodes
        let (index, distance) = graph.nearest_node(p(0.0, 0.0)).unwrap();
        assert_eq!(graph.node(index), Some(west));
        assert!((distance - west.distance_km(&p(0.0, 0.0))).abs() < 1e-12);

        let (index, _) = graph.nearest_node(p(0.0, 0.0009)).unwrap();
        assert_eq!(graph.node(index), Some(east));
    }

    #[test]
    fn test_links_round_trip_preserves_graph() {
        let graph = build_graph(&[
            Segment::new(p(0.0, 0.0), p(0.0, 0.001)),
            Segment::new(p(0.0, 0.001), p(0.001, 0.001)),
        ]);
        assert_eq!(Graph::from_links(&graph.to_links()), graph);
    }

    #[test]
    fn test_total_length() {
        let a = p(0.0, 0.0);
        let b = p(0.0, 0.001);
        let c = p(0.0, 0.002);
        let graph = build_graph(&[Segment::new(a, b), Segment::new(b, c)]);
        let expected = a.distance_km(&b) + b.distance_km(&c);
        assert!((graph.total_length_km() - expected).abs() < 1e-12);
    }
}
