//! Risk-weighted best-first search over a city graph.
//!
//! Cost `g` is the sum of danger scores of every area entered after the
//! start. The heuristic `h` is the great-circle distance (km) to the goal.
//! The two are in different units, so `h` is neither admissible nor
//! consistent for `g`: the result is the best path this priority order
//! finds, not a proven minimum.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::distance::{LatLon, haversine_km};
use crate::error::RouteError;
use crate::graph::{AreaId, CityGraph, CoordinateMap, DangerMap};

/// A route from start to end, both inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafePath {
    pub areas: Vec<AreaId>,
    /// Cumulative danger of every area after the start.
    pub cost: f64,
}

/// Frontier entry. Ordered so `BinaryHeap` pops the lowest `(f, g)` first;
/// equal keys pop in insertion order.
#[derive(Debug, Clone, Copy)]
struct Entry {
    f: f64,
    g: f64,
    seq: u64,
    node: NodeIndex,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.g.total_cmp(&self.g))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

/// Finds the lowest-danger route from `start` to `end`.
///
/// Returns `Ok(None)` when the frontier empties without reaching `end`.
///
/// # Errors
///
/// [`RouteError::UnknownArea`] when `start` or `end` is not in the graph
/// (the city field is left empty; `CityNetwork::route` fills it in), and
/// [`RouteError::IncompleteNetwork`] when a node lacks a coordinate or score.
pub fn find_safest_path(
    graph: &CityGraph,
    coords: &CoordinateMap,
    danger: &DangerMap,
    start: &str,
    end: &str,
) -> Result<Option<SafePath>, RouteError> {
    let unknown = |area: &str| RouteError::UnknownArea {
        city: String::new(),
        area: area.to_string(),
    };
    let start_idx = graph.node(start).ok_or_else(|| unknown(start))?;
    let end_idx = graph.node(end).ok_or_else(|| unknown(end))?;

    let g_inner = graph.inner();
    let n = g_inner.node_count();

    let mut location: Vec<LatLon> = Vec::with_capacity(n);
    let mut risk: Vec<f64> = Vec::with_capacity(n);
    for idx in g_inner.node_indices() {
        let area = &g_inner[idx];
        let missing = || RouteError::IncompleteNetwork(area.clone());
        location.push(*coords.get(area).ok_or_else(missing)?);
        risk.push(*danger.get(area).ok_or_else(missing)?);
    }

    let goal = location[end_idx.index()];
    let heuristic = |idx: NodeIndex| haversine_km(location[idx.index()], goal);

    let mut best_g = vec![f64::INFINITY; n];
    let mut came_from: Vec<Option<NodeIndex>> = vec![None; n];
    best_g[start_idx.index()] = 0.0;

    let mut seq = 0u64;
    let mut frontier = BinaryHeap::new();
    frontier.push(Entry {
        f: 0.0,
        g: 0.0,
        seq,
        node: start_idx,
    });

    let mut expanded = 0usize;
    while let Some(Entry { g, node, .. }) = frontier.pop() {
        if node == end_idx {
            log::debug!("Reached {end} after {expanded} expansions, cost {g:.3}");
            let areas = reconstruct(graph, &came_from, start_idx, end_idx);
            return Ok(Some(SafePath { areas, cost: g }));
        }
        expanded += 1;

        for neighbor in g_inner.neighbors(node) {
            let tentative = g + risk[neighbor.index()];
            if tentative < best_g[neighbor.index()] {
                came_from[neighbor.index()] = Some(node);
                best_g[neighbor.index()] = tentative;
                seq += 1;
                frontier.push(Entry {
                    f: tentative + heuristic(neighbor),
                    g: tentative,
                    seq,
                    node: neighbor,
                });
            }
        }
    }

    log::debug!("Frontier exhausted after {expanded} expansions without reaching {end}");
    Ok(None)
}

fn reconstruct(
    graph: &CityGraph,
    came_from: &[Option<NodeIndex>],
    start: NodeIndex,
    end: NodeIndex,
) -> Vec<AreaId> {
    let inner = graph.inner();
    let mut path = vec![inner[end].clone()];
    let mut cur = end;
    while cur != start {
        let Some(prev) = came_from[cur.index()] else {
            break;
        };
        path.push(inner[prev].clone());
        cur = prev;
    }
    path.reverse();
    path
}
