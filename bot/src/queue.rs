// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::opening::CriticalSet;
use common::arena::Cell;
use common::protocol::{Command, TurnSubmission};
use common::state::GameState;
use common::unit::{Catalog, Side, UnitKind};
use fxhash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A queued structure placement. Lower priority builds earlier.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Placement {
    Build { kind: UnitKind, cell: Cell },
    Upgrade { cell: Cell },
}

#[derive(Clone, Debug)]
struct Entry {
    priority: f32,
    seq: u64,
    placement: Placement,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Inverted so the std max-heap pops the lowest (priority, seq):
    // priority order with FIFO ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then(other.seq.cmp(&self.seq))
    }
}

/// The defense plan: a cost-ascending queue of placements. Draining
/// suspends on the first unaffordable entry rather than skipping it,
/// and remembers every popped priority so a structure lost later can be
/// re-enqueued exactly where it used to sit.
#[derive(Clone, Debug, Default)]
pub struct BuildQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    recorded: FxHashMap<Placement, f32>,
}

impl BuildQueue {
    pub fn push(&mut self, priority: f32, placement: Placement) {
        self.heap.push(Entry {
            priority,
            seq: self.next_seq,
            placement,
        });
        self.next_seq += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn peek_priority(&self) -> Option<f32> {
        self.heap.peek().map(|e| e.priority)
    }

    pub fn recorded_priority(&self, placement: &Placement) -> Option<f32> {
        self.recorded.get(placement).copied()
    }

    /// Drains against the bottom player's SP. With a submission, placed
    /// structures also become outbound commands; without one this is
    /// the projected drain the interceptor search runs on a copy.
    pub fn drain(
        &mut self,
        state: &mut GameState,
        catalog: &Catalog,
        mut submission: Option<&mut TurnSubmission>,
    ) {
        while let Some(entry) = self.heap.pop() {
            let Entry {
                priority, placement, ..
            } = entry;
            self.recorded.insert(placement, priority);

            match placement {
                Placement::Upgrade { cell } => {
                    let Some((_, unit)) = state.map.structure_at(cell) else {
                        // Nothing standing; rebuild first. The repair
                        // pass re-queues the upgrade when it matters.
                        self.push(
                            priority - 0.01,
                            Placement::Build {
                                kind: UnitKind::Turret,
                                cell,
                            },
                        );
                        continue;
                    };
                    if unit.upgraded {
                        continue;
                    }
                    let cost = catalog.upgrade_cost(unit.kind);
                    if state.player(Side::Bottom).resources.whole_sp() < cost {
                        self.push(priority, placement);
                        break;
                    }
                    if state.attempt_upgrade(Side::Bottom, cell, catalog).is_ok() {
                        if let Some(sub) = submission.as_deref_mut() {
                            sub.push(Command::Upgrade { cell });
                        }
                    }
                }
                Placement::Build { kind, cell } => {
                    if state.player(Side::Bottom).resources.whole_sp() < catalog.cost(kind) {
                        self.push(priority, placement);
                        break;
                    }
                    if state.map.contains_structure(cell) {
                        // Already standing (ours or rebuilt earlier).
                        continue;
                    }
                    if state.can_spawn(kind, Side::Bottom, cell, catalog).is_err() {
                        // Legal issue other than affordability.
                        self.push(priority, placement);
                        break;
                    }
                    if state.attempt_spawn(kind, Side::Bottom, cell, 1, catalog) == 1 {
                        if let Some(sub) = submission.as_deref_mut() {
                            sub.push(Command::Spawn { kind, cell });
                        }
                    }
                }
            }
        }
    }
}

/// Re-enqueues every missing member of the critical set at its stored
/// priority. While thunder striking the hammer subset is left down on
/// purpose.
pub fn reconcile_critical(
    queue: &mut BuildQueue,
    critical: &CriticalSet,
    state: &GameState,
    thunder_striking: bool,
) {
    let groups: [(UnitKind, &[Cell], &[Cell]); 3] = [
        (UnitKind::Wall, &critical.walls, &critical.hammer_walls),
        (UnitKind::Turret, &critical.turrets, &critical.hammer_turrets),
        (
            UnitKind::Support,
            &critical.supports,
            &critical.hammer_supports,
        ),
    ];
    for (kind, always, hammer) in groups {
        let cells = always
            .iter()
            .chain(if thunder_striking { &[][..] } else { hammer });
        for &cell in cells {
            let standing = state
                .map
                .structure_at(cell)
                .is_some_and(|(_, u)| u.side == Side::Bottom && u.kind == kind);
            if standing {
                continue;
            }
            let build = Placement::Build { kind, cell };
            let Some(priority) = queue.recorded_priority(&build) else {
                // Never built in the first place; still queued.
                continue;
            };
            queue.push(priority, build);
            if kind == UnitKind::Turret {
                queue.push(priority, Placement::Upgrade { cell });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::opening::CriticalSet;
    use crate::queue::{reconcile_critical, BuildQueue, Placement};
    use common::arena::Cell;
    use common::state::GameState;
    use common::unit::{Catalog, Side, UnitKind};

    fn catalog() -> Catalog {
        Catalog::standard()
    }

    #[test]
    fn fifo_on_equal_priority() {
        let mut queue = BuildQueue::default();
        let catalog = catalog();
        let mut state = GameState::new(0);
        let a = Cell::new(10, 10);
        let b = Cell::new(11, 10);
        let c = Cell::new(12, 10);
        for cell in [a, b, c] {
            queue.push(
                1.0,
                Placement::Build {
                    kind: UnitKind::Wall,
                    cell,
                },
            );
        }
        // Enough SP for exactly two walls.
        state.player_mut(Side::Bottom).resources.sp = 2.0;
        queue.drain(&mut state, &catalog, None);
        assert!(state.map.contains_structure(a));
        assert!(state.map.contains_structure(b));
        assert!(!state.map.contains_structure(c));
        // The third entry stays queued, not skipped.
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn unaffordable_suspends_cheaper_entries_too() {
        let mut queue = BuildQueue::default();
        let catalog = catalog();
        let mut state = GameState::new(0);
        // Support (4 SP) ahead of a wall (1 SP), but only 2 SP total:
        // the drain must stop at the support, not skip to the wall.
        queue.push(
            0.0,
            Placement::Build {
                kind: UnitKind::Support,
                cell: Cell::new(13, 2),
            },
        );
        queue.push(
            1.0,
            Placement::Build {
                kind: UnitKind::Wall,
                cell: Cell::new(13, 5),
            },
        );
        state.player_mut(Side::Bottom).resources.sp = 2.0;
        queue.drain(&mut state, &catalog, None);
        assert!(!state.map.contains_structure(Cell::new(13, 2)));
        assert!(!state.map.contains_structure(Cell::new(13, 5)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn upgrade_of_empty_cell_synthesizes_a_build() {
        let mut queue = BuildQueue::default();
        let catalog = catalog();
        let mut state = GameState::new(0);
        let cell = Cell::new(10, 10);
        queue.push(0.5, Placement::Upgrade { cell });
        queue.drain(&mut state, &catalog, None);
        // The synthesized build lands the same drain at higher priority.
        let (_, unit) = state.map.structure_at(cell).unwrap();
        assert_eq!(unit.kind, UnitKind::Turret);
        assert!(!unit.upgraded);
    }

    #[test]
    fn upgrade_of_standing_structure_charges_and_marks() {
        let mut queue = BuildQueue::default();
        let catalog = catalog();
        let mut state = GameState::new(0);
        let cell = Cell::new(10, 10);
        state.attempt_spawn(UnitKind::Turret, Side::Bottom, cell, 1, &catalog);
        queue.push(0.0, Placement::Upgrade { cell });
        queue.drain(&mut state, &catalog, None);
        assert!(state.map.structure_at(cell).unwrap().1.upgraded);
        assert!(queue.is_empty());
    }

    #[test]
    fn repair_reenqueues_at_recorded_priority() {
        let mut queue = BuildQueue::default();
        let catalog = catalog();
        let mut state = GameState::new(0);
        let cell = Cell::new(3, 13);
        queue.push(
            -0.9,
            Placement::Build {
                kind: UnitKind::Wall,
                cell,
            },
        );
        queue.drain(&mut state, &catalog, None);
        assert!(state.map.contains_structure(cell));
        assert!(queue.is_empty());

        // The wall dies; reconciliation restores it at -0.9.
        let (id, _) = state.map.structure_at(cell).unwrap();
        state.map.remove(id);
        let critical = CriticalSet {
            walls: vec![cell],
            ..Default::default()
        };
        reconcile_critical(&mut queue, &critical, &state, false);
        assert_eq!(queue.peek_priority(), Some(-0.9));
    }

    #[test]
    fn hammer_members_skipped_while_striking() {
        let mut queue = BuildQueue::default();
        let catalog = catalog();
        let mut state = GameState::new(0);
        let cell = Cell::new(0, 13);
        queue.push(
            -0.8,
            Placement::Build {
                kind: UnitKind::Wall,
                cell,
            },
        );
        queue.drain(&mut state, &catalog, None);
        let (id, _) = state.map.structure_at(cell).unwrap();
        state.map.remove(id);

        let critical = CriticalSet {
            hammer_walls: vec![cell],
            ..Default::default()
        };
        reconcile_critical(&mut queue, &critical, &state, true);
        assert!(queue.is_empty());
        reconcile_critical(&mut queue, &critical, &state, false);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn never_built_members_are_not_repaired() {
        let mut queue = BuildQueue::default();
        let state = GameState::new(0);
        let critical = CriticalSet {
            walls: vec![Cell::new(3, 13)],
            ..Default::default()
        };
        reconcile_critical(&mut queue, &critical, &state, false);
        assert!(queue.is_empty());
    }
}
