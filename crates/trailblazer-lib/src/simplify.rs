//! Collinear node elision
//!
//! A node with exactly two neighbours whose path bends by less than `epsilon` degrees is
//! replaced by a single edge carrying the summed weight of the two edges it joined. The
//! summed weight keeps the true trail length, so shortest-path distances between the
//! remaining nodes never change.

use crate::{Graph, Point, utils};
use std::collections::BTreeSet;

/// Remove degree-2, near-collinear nodes until no node qualifies
///
/// Nodes are examined in ascending coordinate order; the neighbours of every removed
/// node are examined again, since their degree or geometry may have changed. Branch
/// points, dead ends and bends of `epsilon_degrees` or more are always kept, as is any
/// node whose bend angle is undefined. A non-positive `epsilon_degrees` removes nothing.
pub fn simplify_graph(graph: &Graph, epsilon_degrees: f64) -> Graph {
    #[cfg(feature = "profiling")]
    profiling::scope!("simplify::simplify_graph");

    let mut links = graph.to_links();
    let mut pending: BTreeSet<Point> = links.keys().copied().collect();
    let mut removed = 0usize;
    let mut undefined = 0usize;

    while let Some(node) = pending.pop_first() {
        let Some(neighbours) = links.get(&node) else {
            continue;
        };
        if neighbours.len() != 2 {
            continue;
        }

        let mut iter = neighbours.iter();
        let (Some((&a, &weight_ab)), Some((&c, &weight_bc))) = (iter.next(), iter.next()) else {
            continue;
        };
        // Neighbours are map keys: no parallel edges, so this never holds
        if a == c {
            continue;
        }

        let Some(deviation) = utils::straightness_deviation(a, node, c) else {
            undefined += 1;
            continue;
        };
        let straight = deviation < epsilon_degrees;
        if !straight {
            continue;
        }

        let merged = weight_ab + weight_bc;
        links.remove(&node);
        for (from, to) in [(a, c), (c, a)] {
            if let Some(edges) = links.get_mut(&from) {
                edges.remove(&node);
                edges
                    .entry(to)
                    .and_modify(|w| *w = w.min(merged))
                    .or_insert(merged);
            }
        }

        pending.insert(a);
        pending.insert(c);
        removed += 1;
    }

    if undefined > 0 {
        tracing::debug!("Kept {} nodes with an undefined bend angle", undefined);
    }

    let simplified = Graph::from_links(&links);
    tracing::info!(
        "Simplified graph: removed {} collinear nodes, {} nodes and {} edges remain",
        removed,
        simplified.node_count(),
        simplified.edge_count()
    );
    simplified
}
