//! Multi-target routing over a trail graph
//!
//! One Dijkstra run from the origin's nearest node yields the shortest-path tree of the
//! whole component; every target's distance and path are read off that single tree. The
//! union of the realized paths forms the [`RouteGraph`], and every target gets exactly
//! one entry in the [`ReachabilityReport`].

use crate::{Config, Graph, Point, Result, Target, TrailError};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a target could not be routed to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum UnreachableReason {
    /// The trail graph has no nodes at all
    EmptyGraph,
    /// The target's nearest node lies in a different component than the source
    Disconnected,
    /// The target is farther from every node than the configured snap limit
    TooFarFromTrail,
    /// The target's coordinates are not finite WGS84 values
    InvalidLocation,
}

/// Routing outcome for a single target
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Reachability {
    /// Cumulative trail distance from the source node to the target's node
    Reachable { distance_km: f64 },
    Unreachable(UnreachableReason),
}

impl Reachability {
    #[inline]
    pub fn is_reachable(&self) -> bool {
        matches!(self, Reachability::Reachable { .. })
    }

    #[inline]
    pub fn distance_km(&self) -> Option<f64> {
        match self {
            Reachability::Reachable { distance_km } => Some(*distance_km),
            Reachability::Unreachable(_) => None,
        }
    }
}

/// Report line for one input target
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReachabilityEntry {
    pub target: Target,
    /// Graph node the target was snapped to
    pub resolved: Option<Point>,
    /// Great-circle distance between the target and its resolved node, in km
    pub snap_distance_km: Option<f64>,
    pub status: Reachability,
}

/// One entry per input target, in input order
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReachabilityReport {
    entries: Vec<ReachabilityEntry>,
}

impl ReachabilityReport {
    #[inline]
    pub fn entries(&self) -> &[ReachabilityEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry whose target carries `name`
    pub fn get(&self, name: &str) -> Option<&ReachabilityEntry> {
        self.entries.iter().find(|entry| entry.target.name == name)
    }

    pub fn reachable_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status.is_reachable())
            .count()
    }

    pub fn unreachable_count(&self) -> usize {
        self.len() - self.reachable_count()
    }
}

/// A node of the route graph with what is needed to rebuild its path
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteNode {
    pub point: Point,
    /// Cumulative distance from the source node, in km
    pub distance_km: f64,
    /// Previous node on the shortest path; `None` for the source
    pub predecessor: Option<Point>,
}

/// An undirected route edge, stored with `start < end`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteEdge {
    pub start: Point,
    pub end: Point,
    pub weight_km: f64,
}

/// Union of the shortest paths from the source to every reachable target
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteGraph {
    /// Sorted by point
    nodes: Vec<RouteNode>,
    /// Sorted by (start, end)
    edges: Vec<RouteEdge>,
}

impl RouteGraph {
    #[inline]
    pub fn nodes(&self) -> &[RouteNode] {
        &self.nodes
    }

    #[inline]
    pub fn edges(&self) -> &[RouteEdge] {
        &self.edges
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, point: Point) -> Option<&RouteNode> {
        self.nodes
            .binary_search_by(|node| node.point.cmp(&point))
            .ok()
            .map(|i| &self.nodes[i])
    }

    /// Cumulative distance from the source to `point`, if it lies on the route graph
    pub fn distance_to(&self, point: Point) -> Option<f64> {
        self.node(point).map(|node| node.distance_km)
    }

    /// Node sequence from the source to `point`, both included
    pub fn path_to(&self, point: Point) -> Option<Vec<Point>> {
        let mut path = vec![point];
        let mut current = self.node(point)?;
        while let Some(previous) = current.predecessor {
            path.push(previous);
            current = self.node(previous)?;
        }
        path.reverse();
        Some(path)
    }

    pub fn contains_edge(&self, a: Point, b: Point) -> bool {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        self.edges
            .binary_search_by(|edge| edge.start.cmp(&start).then_with(|| edge.end.cmp(&end)))
            .is_ok()
    }

    /// Sum of all route edge weights in km
    pub fn total_length_km(&self) -> f64 {
        self.edges.iter().map(|edge| edge.weight_km).sum()
    }
}

/// Everything the router produces for one origin and target set
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoutePlan {
    /// Graph node the origin was snapped to; `None` for an empty graph
    pub source: Option<Point>,
    /// Great-circle distance between the origin and the source node, in km
    pub origin_snap_distance_km: Option<f64>,
    pub route_graph: RouteGraph,
    pub report: ReachabilityReport,
}

/// Single-source shortest-path tree over node indices
#[derive(Clone, Debug)]
pub(crate) struct ShortestPathTree {
    /// `f64::INFINITY` for nodes outside the source's component
    pub distances: Vec<f64>,
    pub predecessors: Vec<Option<usize>>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
struct State {
    cost: OrderedFloat<f64>,
    node: usize,
}

// Reversed so that `BinaryHeap` pops the cheapest state first; ties go to the lower index
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dijkstra from `source` over the whole graph
pub(crate) fn shortest_path_tree(graph: &Graph, source: usize) -> ShortestPathTree {
    let mut distances = vec![f64::INFINITY; graph.node_count()];
    let mut predecessors = vec![None; graph.node_count()];
    let mut heap = BinaryHeap::new();

    if source >= graph.node_count() {
        return ShortestPathTree {
            distances,
            predecessors,
        };
    }

    distances[source] = 0.0;
    heap.push(State {
        cost: OrderedFloat(0.0),
        node: source,
    });

    while let Some(State { cost, node }) = heap.pop() {
        // Stale entry
        if cost.0 > distances[node] {
            continue;
        }

        for edge in graph.neighbors(node) {
            let next = cost.0 + edge.weight_km;
            if next < distances[edge.to] {
                distances[edge.to] = next;
                predecessors[edge.to] = Some(node);
                heap.push(State {
                    cost: OrderedFloat(next),
                    node: edge.to,
                });
            }
        }
    }

    ShortestPathTree {
        distances,
        predecessors,
    }
}

/// Route from `origin` to every target over `graph`
///
/// The origin and each target are snapped to their nearest graph node (ties go to the
/// lexicographically smallest coordinate); snap distances are reported but never added
/// to path distances. Targets in another component, or beyond
/// [`Config::max_snap_distance_km`], are reported unreachable and contribute no edges.
pub fn find_routes(
    graph: &Graph,
    origin: Point,
    targets: &[Target],
    config: &Config,
) -> Result<RoutePlan> {
    #[cfg(feature = "profiling")]
    profiling::scope!("router::find_routes");

    config.validate()?;
    if !origin.is_valid() {
        return Err(TrailError::InvalidCoordinate(format!(
            "origin ({}, {}) is outside WGS84 bounds",
            origin.lat, origin.lon
        )));
    }

    let Some((source, origin_snap)) = graph.nearest_node(origin) else {
        tracing::info!(
            "Empty trail graph: all {} targets unreachable",
            targets.len()
        );
        let entries = targets
            .iter()
            .map(|target| ReachabilityEntry {
                target: target.clone(),
                resolved: None,
                snap_distance_km: None,
                status: Reachability::Unreachable(UnreachableReason::EmptyGraph),
            })
            .collect();
        return Ok(RoutePlan {
            report: ReachabilityReport { entries },
            ..RoutePlan::default()
        });
    };

    tracing::debug!("Origin snapped to nearest graph node ({:.3} km away)", origin_snap);

    let tree = shortest_path_tree(graph, source);

    let snapped: Vec<Option<(usize, f64)>> = targets
        .par_iter()
        .map(|target| {
            if target.location.is_valid() {
                graph.nearest_node(target.location)
            } else {
                None
            }
        })
        .collect();

    let mut included = vec![false; graph.node_count()];
    let mut edges: BTreeMap<(Point, Point), f64> = BTreeMap::new();
    let mut entries = Vec::with_capacity(targets.len());

    for (target, snap) in targets.iter().zip(snapped) {
        let Some((node, snap_distance)) = snap else {
            tracing::warn!("Target {} has invalid coordinates", target.name);
            entries.push(ReachabilityEntry {
                target: target.clone(),
                resolved: None,
                snap_distance_km: None,
                status: Reachability::Unreachable(UnreachableReason::InvalidLocation),
            });
            continue;
        };

        let status = match config.max_snap_distance_km {
            Some(limit) if snap_distance > limit => {
                tracing::debug!(
                    "{} is too far from any trail ({:.2} km)",
                    target.name,
                    snap_distance
                );
                Reachability::Unreachable(UnreachableReason::TooFarFromTrail)
            }
            _ if tree.distances[node].is_finite() => {
                collect_path(graph, &tree, node, &mut included, &mut edges);
                Reachability::Reachable {
                    distance_km: tree.distances[node],
                }
            }
            _ => Reachability::Unreachable(UnreachableReason::Disconnected),
        };

        entries.push(ReachabilityEntry {
            target: target.clone(),
            resolved: graph.node(node),
            snap_distance_km: Some(snap_distance),
            status,
        });
    }

    let nodes = included
        .iter()
        .enumerate()
        .filter(|(_, included)| **included)
        .filter_map(|(index, _)| {
            Some(RouteNode {
                point: graph.node(index)?,
                distance_km: tree.distances[index],
                predecessor: tree.predecessors[index].and_then(|p| graph.node(p)),
            })
        })
        .collect();
    let route_graph = RouteGraph {
        nodes,
        edges: edges
            .into_iter()
            .map(|((start, end), weight_km)| RouteEdge {
                start,
                end,
                weight_km,
            })
            .collect(),
    };
    let report = ReachabilityReport { entries };

    tracing::info!(
        "Routed {} targets: {} reachable, {} unreachable; route graph has {} nodes and {} edges",
        report.len(),
        report.reachable_count(),
        report.unreachable_count(),
        route_graph.node_count(),
        route_graph.edge_count()
    );

    Ok(RoutePlan {
        source: graph.node(source),
        origin_snap_distance_km: Some(origin_snap),
        route_graph,
        report,
    })
}

/// Add the tree path ending at `node` to the route, stopping at the first node already
/// included (paths from one source share their prefixes)
fn collect_path(
    graph: &Graph,
    tree: &ShortestPathTree,
    node: usize,
    included: &mut [bool],
    edges: &mut BTreeMap<(Point, Point), f64>,
) {
    let mut current = node;
    while !included[current] {
        included[current] = true;
        let Some(previous) = tree.predecessors[current] else {
            break;
        };

        if let (Some(a), Some(b)) = (graph.node(previous), graph.node(current)) {
            if let Some(weight) = graph.edge_weight(a, b) {
                let key = if a <= b { (a, b) } else { (b, a) };
                edges.insert(key, weight);
            }
        }
        current = previous;
    }
}
