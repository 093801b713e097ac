// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::arena::{self, Cell, Edge, SIZE};
use crate::map::GameMap;
use crate::unit::Unit;
use fxhash::FxHashSet;
use pathfinding::directed::bfs::bfs_reach;
use std::collections::VecDeque;

const UNREACHED: u32 = u32::MAX;

/// The full cell sequence a mobile unit at `start` traverses toward
/// `target`. The first element is always `start`.
///
/// Routing reproduces the engine: shortest over unblocked cells to any
/// reachable cell of the target edge; when the whole edge is walled
/// off, to the most ideal reachable cell instead (deepest toward the
/// target, then laterally toward the target corner), where the unit
/// will self-destruct. A fully enclosed unit gets `[start]`.
///
/// Tie-breaks among equally short steps, in order: alternate the axis of
/// the previous step (the first step prefers vertical), then the
/// direction toward the target edge, then the fixed cardinal order
/// up, down, right, left.
pub fn path_to_edge(map: &GameMap, start: Cell, target: Edge) -> Vec<Cell> {
    if !start.in_arena() || map.contains_structure(start) {
        return vec![start];
    }

    let reachable: FxHashSet<Cell> =
        bfs_reach(start, |&c| c.neighbors().filter(|&n| !map.contains_structure(n)))
            .collect();

    let mut ends: Vec<Cell> = target
        .cells()
        .iter()
        .copied()
        .filter(|c| reachable.contains(c))
        .collect();

    if ends.is_empty() {
        // Walled off; run at the most ideal reachable cell and pop there.
        let mut best = (idealness(start, target), start);
        for &cell in &reachable {
            let score = idealness(cell, target);
            if score > best.0 || (score == best.0 && cell < best.1) {
                best = (score, cell);
            }
        }
        if best.1 == start {
            return vec![start];
        }
        ends.push(best.1);
    }

    let dist = distance_field(map, &ends);
    walk(start, target, &dist)
}

/// Recomputes a mobile unit's path from its current cell, after a
/// structure died somewhere during the previous frame.
pub fn repath(map: &GameMap, unit: &Unit) -> Vec<Cell> {
    let target = unit
        .target_edge
        .unwrap_or_else(|| unit.side.target_edge(unit.initial_cell));
    path_to_edge(map, unit.cell, target)
}

/// True iff the path ends on the given edge (the unit scores rather
/// than self-destructing).
pub fn reaches_edge(path: &[Cell], edge: Edge) -> bool {
    path.last().is_some_and(|&c| edge.contains(c))
}

/// Depth toward the target edge dominates; lateral progress toward the
/// target corner breaks ties. Cells on the edge itself beat everything.
fn idealness(cell: Cell, target: Edge) -> u32 {
    if target.contains(cell) {
        return u32::MAX;
    }
    let (right, up) = match target {
        Edge::TopRight => (true, true),
        Edge::TopLeft => (false, true),
        Edge::BottomRight => (true, false),
        Edge::BottomLeft => (false, false),
    };
    let depth = if up { cell.y } else { 27 - cell.y } as u32;
    let lateral = if right { cell.x } else { 27 - cell.x } as u32;
    depth * SIZE as u32 + lateral
}

/// Multi-source BFS over unblocked cells.
fn distance_field(map: &GameMap, sources: &[Cell]) -> Vec<u32> {
    let mut dist = vec![UNREACHED; SIZE as usize * SIZE as usize];
    let mut queue = VecDeque::new();
    for &source in sources {
        dist[source.index()] = 0;
        queue.push_back(source);
    }
    while let Some(cell) = queue.pop_front() {
        let next = dist[cell.index()] + 1;
        for n in cell.neighbors() {
            if dist[n.index()] == UNREACHED && !map.contains_structure(n) {
                dist[n.index()] = next;
                queue.push_back(n);
            }
        }
    }
    dist
}

fn walk(start: Cell, target: Edge, dist: &[u32]) -> Vec<Cell> {
    let (toward_right, toward_up) = match target {
        Edge::TopRight => (true, true),
        Edge::TopLeft => (false, true),
        Edge::BottomRight => (true, false),
        Edge::BottomLeft => (false, false),
    };

    let mut path = vec![start];
    let mut cur = start;
    let mut prev_vertical = None::<bool>;

    while dist[cur.index()] != 0 {
        let want = dist[cur.index()] - 1;
        let mut best: Option<(u8, u8, u8, Cell, bool)> = None;
        for (rank, n) in cur.neighbors().enumerate() {
            if dist[n.index()] != want {
                continue;
            }
            let vertical = n.x == cur.x;
            // The first step prefers vertical, later steps prefer turning.
            let keeps_axis = (prev_vertical.unwrap_or(false) == vertical) as u8;
            let toward = if vertical {
                (n.y > cur.y) == toward_up
            } else {
                (n.x > cur.x) == toward_right
            };
            let key = (keeps_axis, !toward as u8, rank as u8, n, vertical);
            if best.map_or(true, |b| (key.0, key.1, key.2) < (b.0, b.1, b.2)) {
                best = Some(key);
            }
        }
        let Some((_, _, _, next, vertical)) = best else {
            // The field guarantees a descending neighbor.
            debug_assert!(false, "broken distance field at {cur:?}");
            break;
        };
        path.push(next);
        cur = next;
        prev_vertical = Some(vertical);
    }
    path
}
