// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The opening book: the starting defense, its queue priorities, and
//! the split of that defense into the always-rebuilt critical set and
//! the hammer subset that thunder strike temporarily abandons.
//! Cells here are policy, not rules; any comparable opening works.

use crate::queue::{BuildQueue, Placement};
use common::arena::Cell;
use common::unit::UnitKind;

/// The roaming front wall alternates between these two flanks.
pub const BLOCKING_WALL_LEFT: Cell = Cell::new(6, 10);
pub const BLOCKING_WALL_RIGHT: Cell = Cell::new(21, 10);

const FRONT_TURRETS: [Cell; 4] = [
    Cell::new(3, 12),
    Cell::new(24, 12),
    Cell::new(7, 8),
    Cell::new(20, 8),
];
const FRONT_WALLS: [Cell; 4] = [
    Cell::new(3, 13),
    Cell::new(24, 13),
    Cell::new(7, 9),
    Cell::new(20, 9),
];
const CORNER_WALLS: [Cell; 6] = [
    Cell::new(0, 13),
    Cell::new(1, 13),
    Cell::new(2, 13),
    Cell::new(25, 13),
    Cell::new(26, 13),
    Cell::new(27, 13),
];
const SECOND_TURRETS: [Cell; 2] = [Cell::new(4, 11), Cell::new(23, 11)];
const SECOND_WALLS: [Cell; 4] = [
    Cell::new(4, 12),
    Cell::new(23, 12),
    Cell::new(5, 11),
    Cell::new(22, 11),
];
const FUNNEL_TURRETS: [Cell; 4] = [
    Cell::new(6, 9),
    Cell::new(21, 9),
    Cell::new(11, 4),
    Cell::new(16, 4),
];
const FUNNEL_WALLS: [Cell; 4] = [
    Cell::new(8, 8),
    Cell::new(19, 8),
    Cell::new(11, 5),
    Cell::new(16, 5),
];
const CORNER_TURRETS: [Cell; 6] = [
    Cell::new(1, 12),
    Cell::new(26, 12),
    Cell::new(8, 7),
    Cell::new(2, 12),
    Cell::new(25, 12),
    Cell::new(19, 7),
];
const LANE_WALLS: [Cell; 9] = [
    Cell::new(9, 7),
    Cell::new(18, 7),
    Cell::new(10, 6),
    Cell::new(17, 6),
    Cell::new(12, 4),
    Cell::new(13, 4),
    Cell::new(14, 4),
    Cell::new(15, 4),
    BLOCKING_WALL_LEFT,
];
const CORE_SUPPORTS: [Cell; 4] = [
    Cell::new(12, 3),
    Cell::new(13, 3),
    Cell::new(14, 3),
    Cell::new(15, 3),
];
const EXTRA_TURRETS: [Cell; 4] = [
    Cell::new(22, 12),
    Cell::new(6, 11),
    Cell::new(20, 10),
    Cell::new(8, 9),
];
const EXTRA_SUPPORTS: [Cell; 2] = [Cell::new(13, 2), Cell::new(14, 2)];
const EXTRA_WALLS: [Cell; 6] = [
    Cell::new(21, 12),
    Cell::new(7, 11),
    Cell::new(19, 11),
    Cell::new(9, 10),
    Cell::new(19, 10),
    Cell::new(9, 9),
];

/// Queues the whole opening, cheapest-priority-first layering.
pub fn seed(queue: &mut BuildQueue) {
    let build = |q: &mut BuildQueue, priority: f32, kind: UnitKind, cell: Cell| {
        q.push(priority, Placement::Build { kind, cell });
    };
    let upgrade = |q: &mut BuildQueue, priority: f32, cell: Cell| {
        q.push(priority, Placement::Upgrade { cell });
    };

    for (i, &cell) in FRONT_TURRETS.iter().enumerate() {
        build(queue, -1.0 + i as f32 * 0.01, UnitKind::Turret, cell);
        upgrade(queue, -1.0 + i as f32 * 0.015, cell);
    }
    for &cell in &FRONT_WALLS {
        build(queue, -0.9, UnitKind::Wall, cell);
    }
    for &cell in &CORNER_WALLS {
        build(queue, -0.8, UnitKind::Wall, cell);
    }
    for (i, &cell) in SECOND_TURRETS.iter().enumerate() {
        build(queue, -0.7 + i as f32 * 0.01, UnitKind::Turret, cell);
        upgrade(queue, -0.7 + i as f32 * 0.015, cell);
    }
    for &cell in &SECOND_WALLS {
        build(queue, -0.65, UnitKind::Wall, cell);
    }
    for &cell in &FUNNEL_TURRETS {
        build(queue, -0.6, UnitKind::Turret, cell);
    }
    for &cell in &FUNNEL_WALLS {
        build(queue, -0.55, UnitKind::Wall, cell);
    }
    for &cell in &FUNNEL_TURRETS[0..2] {
        upgrade(queue, -0.5, cell);
    }
    for &cell in &CORNER_TURRETS {
        build(queue, -0.45, UnitKind::Turret, cell);
    }
    for &cell in &LANE_WALLS {
        build(queue, -0.4, UnitKind::Wall, cell);
    }
    for &cell in &CORNER_TURRETS {
        upgrade(queue, -0.35, cell);
    }
    for &cell in &CORNER_WALLS {
        upgrade(queue, -0.35, cell);
    }
    for &cell in &CORE_SUPPORTS {
        build(queue, -0.3, UnitKind::Support, cell);
    }
    for &cell in &EXTRA_TURRETS {
        build(queue, -0.25, UnitKind::Turret, cell);
    }
    for &cell in &EXTRA_SUPPORTS {
        build(queue, -0.225, UnitKind::Support, cell);
    }
    for &cell in &EXTRA_WALLS {
        build(queue, -0.2, UnitKind::Wall, cell);
    }
    for &cell in &EXTRA_TURRETS {
        upgrade(queue, -0.15, cell);
    }
    for &cell in &FRONT_WALLS {
        upgrade(queue, -0.15, cell);
    }
}

/// The defensive backbone, reconciled against the live map every turn.
/// The hammer members sit on the corners thunder strike opens.
#[derive(Clone, Debug, Default)]
pub struct CriticalSet {
    pub walls: Vec<Cell>,
    pub hammer_walls: Vec<Cell>,
    pub turrets: Vec<Cell>,
    pub hammer_turrets: Vec<Cell>,
    pub supports: Vec<Cell>,
    pub hammer_supports: Vec<Cell>,
}

pub fn critical_set() -> CriticalSet {
    let mut set = CriticalSet::default();
    set.turrets.extend(FRONT_TURRETS);
    set.walls.extend(FRONT_WALLS);
    set.walls.extend([Cell::new(2, 13), Cell::new(25, 13)]);
    set.hammer_walls.extend([
        Cell::new(0, 13),
        Cell::new(1, 13),
        Cell::new(26, 13),
        Cell::new(27, 13),
    ]);
    set.turrets.extend(SECOND_TURRETS);
    set.walls.extend(SECOND_WALLS);
    set.turrets.extend(FUNNEL_TURRETS);
    set.walls.extend(FUNNEL_WALLS);
    set.hammer_turrets.extend([
        Cell::new(1, 12),
        Cell::new(2, 12),
        Cell::new(25, 12),
        Cell::new(26, 12),
    ]);
    set.turrets.extend([Cell::new(8, 7), Cell::new(19, 7)]);
    set.walls.extend(&LANE_WALLS[0..8]);
    set.supports.extend(CORE_SUPPORTS);
    set.turrets.extend(EXTRA_TURRETS);
    set.supports.extend(EXTRA_SUPPORTS);
    set.walls.extend(EXTRA_WALLS);
    set
}

/// Spawn lanes the opportunistic fill must never wall off.
pub const KEEP_CLEAR: [Cell; 58] = [
    Cell::new(13, 0),
    Cell::new(14, 0),
    Cell::new(13, 1),
    Cell::new(14, 1),
    Cell::new(15, 1),
    Cell::new(11, 2),
    Cell::new(12, 2),
    Cell::new(15, 2),
    Cell::new(16, 2),
    Cell::new(10, 3),
    Cell::new(11, 3),
    Cell::new(16, 3),
    Cell::new(17, 3),
    Cell::new(9, 4),
    Cell::new(10, 4),
    Cell::new(17, 4),
    Cell::new(18, 4),
    Cell::new(8, 5),
    Cell::new(9, 5),
    Cell::new(18, 5),
    Cell::new(19, 5),
    Cell::new(7, 6),
    Cell::new(8, 6),
    Cell::new(19, 6),
    Cell::new(20, 6),
    Cell::new(6, 7),
    Cell::new(7, 7),
    Cell::new(20, 7),
    Cell::new(21, 7),
    Cell::new(5, 8),
    Cell::new(6, 8),
    Cell::new(21, 8),
    Cell::new(22, 8),
    Cell::new(4, 9),
    Cell::new(5, 9),
    Cell::new(22, 9),
    Cell::new(23, 9),
    Cell::new(3, 10),
    Cell::new(4, 10),
    Cell::new(5, 10),
    Cell::new(6, 10),
    Cell::new(7, 10),
    Cell::new(8, 10),
    Cell::new(21, 10),
    Cell::new(22, 10),
    Cell::new(23, 10),
    Cell::new(24, 10),
    Cell::new(2, 11),
    Cell::new(3, 11),
    Cell::new(8, 11),
    Cell::new(20, 11),
    Cell::new(21, 11),
    Cell::new(24, 11),
    Cell::new(25, 11),
    Cell::new(8, 12),
    Cell::new(20, 12),
    Cell::new(8, 13),
    Cell::new(20, 13),
];

#[cfg(test)]
mod tests {
    use crate::opening::{critical_set, seed, KEEP_CLEAR};
    use crate::queue::BuildQueue;

    #[test]
    fn seed_front_turrets_first() {
        let mut queue = BuildQueue::default();
        seed(&mut queue);
        let first = queue.peek_priority().unwrap();
        assert_eq!(first, -1.0);
    }

    #[test]
    fn critical_and_hammer_are_disjoint() {
        let set = critical_set();
        for wall in &set.hammer_walls {
            assert!(!set.walls.contains(wall));
        }
        for turret in &set.hammer_turrets {
            assert!(!set.turrets.contains(turret));
        }
    }

    #[test]
    fn keep_clear_cells_are_in_arena() {
        for cell in KEEP_CLEAR {
            assert!(cell.in_arena(), "{cell:?}");
        }
    }
}
