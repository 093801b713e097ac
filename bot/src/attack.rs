// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Enumerates the finite catalog of attack plans the controller scores
//! by forward simulation: rushes, the scout/demolisher split, and
//! interceptor spoilers. Opponent plans come from the same generators
//! with the anchors reflected onto their side.

use common::arena::Cell;
use common::path;
use common::state::GameState;
use common::unit::{Catalog, Side, UnitKind};
use rand::Rng;

/// One deployment entry of an atomic attack plan.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Spawn {
    pub kind: UnitKind,
    pub cell: Cell,
    pub count: u32,
}

pub type AttackPlan = Vec<Spawn>;

/// Pours a plan onto the map for simulation, without charging.
pub fn apply_plan(state: &mut GameState, side: Side, plan: &[Spawn], catalog: &Catalog) {
    for spawn in plan {
        for _ in 0..spawn.count {
            let _ = state.map.add_unit(spawn.kind, side, spawn.cell, catalog);
        }
    }
}

fn spawnable(state: &GameState, side: Side, cell: Cell) -> bool {
    cell.in_arena() && side.on_home_edge(cell) && !state.map.contains_structure(cell)
}

/// A spawn cell works as a rush anchor only if its path terminates on
/// the enemy edge, not on a mid-board self-destruct.
fn anchors_a_rush(state: &GameState, side: Side, cell: Cell) -> Option<usize> {
    if !spawnable(state, side, cell) {
        return None;
    }
    let target = side.target_edge(cell);
    let route = path::path_to_edge(&state.map, cell, target);
    path::reaches_edge(&route, target).then_some(route.len())
}

/// Home-edge cells front-center outward, the order anchors are probed.
fn center_scan(side: Side) -> impl Iterator<Item = Cell> + 'static {
    let [left, right] = side.home_edges();
    (0..14usize).flat_map(move |offset| [left.cells()[13 - offset], right.cells()[offset]])
}

/// Home-edge cells scanned outward from the mid-flank anchors, the
/// probe order for demolisher lanes and spoiler interceptors.
fn flank_scan(side: Side) -> impl Iterator<Item = Cell> + 'static {
    let [left, right] = side.home_edges();
    (0..7i32).flat_map(move |offset| {
        [(left, 6), (right, 7)].into_iter().flat_map(move |(edge, anchor)| {
            [-1i32, 1].into_iter().filter_map(move |sign| {
                let idx = anchor + sign * offset;
                (0..14).contains(&idx).then(|| edge.cells()[idx as usize])
            })
        })
    })
}

fn best_center_anchor(state: &GameState, side: Side) -> Option<Cell> {
    center_scan(side).find(|&c| anchors_a_rush(state, side, c).is_some())
}

fn best_flank_anchor(state: &GameState, side: Side) -> Option<Cell> {
    flank_scan(side).find(|&c| anchors_a_rush(state, side, c).is_some())
}

/// Longest-route cell for scouts, shortest for demolishers; only worth
/// splitting when the spread is real.
fn split_anchors(state: &GameState, side: Side) -> Option<(Cell, Cell)> {
    let mut shortest: Option<(usize, Cell)> = None;
    let mut longest: Option<(usize, Cell)> = None;
    for cell in center_scan(side) {
        let Some(len) = anchors_a_rush(state, side, cell) else {
            continue;
        };
        if shortest.map_or(true, |(best, _)| len < best) {
            shortest = Some((len, cell));
        }
        if longest.map_or(true, |(best, _)| len > best) {
            longest = Some((len, cell));
        }
    }
    let ((min_len, demo), (max_len, scout)) = shortest.zip(longest)?;
    (max_len as f32 > 1.6 * min_len as f32).then_some((scout, demo))
}

/// The demolisher/scout head-count split by MP budget: a fixed table
/// for 4..=19, a coin flip at 20, a divisor rule from 21 up.
pub fn split_numbers(mp: u32, rng: &mut impl Rng) -> (u32, u32) {
    const TABLE: [(u32, u32); 16] = [
        (1, 1),
        (1, 2),
        (1, 3),
        (1, 4),
        (1, 5),
        (2, 3),
        (2, 4),
        (2, 5),
        (2, 6),
        (2, 7),
        (3, 5),
        (3, 6),
        (3, 7),
        (4, 5),
        (4, 6),
        (4, 7),
    ];
    match mp {
        0..=3 => (0, 0),
        4..=19 => TABLE[(mp - 4) as usize],
        20 => {
            if rng.gen_bool(0.5) {
                (4, 8)
            } else {
                (5, 5)
            }
        }
        _ => {
            let d = (mp - 1) / 5;
            (d - 1, 3 * (d - 1))
        }
    }
}

fn legal(state: &GameState, side: Side, plan: &AttackPlan) -> bool {
    !plan.is_empty()
        && plan
            .iter()
            .all(|s| s.count > 0 && spawnable(state, side, s.cell))
}

/// Our catalog for the turn: demolisher rush, scout rush, and the
/// split, all anchored where a lane is actually open.
pub fn our_candidates(state: &GameState, rng: &mut impl Rng) -> Vec<AttackPlan> {
    let mp = state.player(Side::Bottom).resources.whole_mp() as u32;
    let mut plans = Vec::new();

    if let Some(anchor) = best_flank_anchor(state, Side::Bottom) {
        if mp >= 3 {
            plans.push(vec![Spawn {
                kind: UnitKind::Demolisher,
                cell: anchor,
                count: mp / 3,
            }]);
        }
        plans.push(vec![Spawn {
            kind: UnitKind::Scout,
            cell: anchor,
            count: mp,
        }]);
    }

    if mp >= 4 {
        if let Some((scout_cell, demo_cell)) = split_anchors(state, Side::Bottom) {
            let (demos, scouts) = split_numbers(mp, rng);
            plans.push(vec![
                Spawn {
                    kind: UnitKind::Scout,
                    cell: scout_cell,
                    count: scouts,
                },
                Spawn {
                    kind: UnitKind::Demolisher,
                    cell: demo_cell,
                    count: demos,
                },
            ]);
        }
    }

    plans.retain(|p| legal(state, Side::Bottom, p));
    plans
}

/// The opponent's plausible plans, tiered by their MP. Mirrors our
/// generators onto the top side.
pub fn opponent_candidates(state: &GameState, rng: &mut impl Rng) -> Vec<AttackPlan> {
    let mp = state.player(Side::Top).resources.whole_mp() as u32;
    let mut plans = Vec::new();

    if let Some(anchor) = best_center_anchor(state, Side::Top) {
        plans.push(vec![Spawn {
            kind: UnitKind::Scout,
            cell: anchor,
            count: mp,
        }]);
        if mp >= 3 {
            plans.push(vec![Spawn {
                kind: UnitKind::Demolisher,
                cell: anchor,
                count: mp / 3,
            }]);
        }
    }

    if mp <= 10 {
        // Cheeky spoilers only make sense at low budgets.
        if let Some(anchor) = best_flank_anchor(state, Side::Top) {
            plans.push(vec![Spawn {
                kind: UnitKind::Interceptor,
                cell: anchor,
                count: mp,
            }]);
        }
    } else if mp >= 4 {
        if let Some((scout_cell, demo_cell)) = split_anchors(state, Side::Top) {
            let (demos, scouts) = split_numbers(mp, rng);
            plans.push(vec![
                Spawn {
                    kind: UnitKind::Scout,
                    cell: scout_cell,
                    count: scouts,
                },
                Spawn {
                    kind: UnitKind::Demolisher,
                    cell: demo_cell,
                    count: demos,
                },
            ]);
        }
    }

    plans.retain(|p| legal(state, Side::Top, p));
    plans
}

/// Our interceptor responses, tiered by the opponent's bank.
pub fn interceptor_options(state: &GameState, our_mp: u32, oppo_mp: u32) -> Vec<AttackPlan> {
    let single = |cell: Cell, count: u32| {
        vec![Spawn {
            kind: UnitKind::Interceptor,
            cell,
            count,
        }]
    };
    let mut options = if oppo_mp <= 9 || our_mp == 1 {
        vec![
            single(Cell::new(18, 4), 1),
            single(Cell::new(7, 6), 1),
            single(Cell::new(14, 0), 1),
        ]
    } else if oppo_mp <= 16 || our_mp == 2 {
        vec![
            vec![
                Spawn {
                    kind: UnitKind::Interceptor,
                    cell: Cell::new(7, 6),
                    count: 1,
                },
                Spawn {
                    kind: UnitKind::Interceptor,
                    cell: Cell::new(20, 6),
                    count: 1,
                },
            ],
            single(Cell::new(14, 0), 2),
            single(Cell::new(13, 0), 2),
        ]
    } else {
        vec![single(Cell::new(13, 0), 3), single(Cell::new(14, 0), 3)]
    };
    options.retain(|p| legal(state, Side::Bottom, p));
    options
}

#[cfg(test)]
mod tests {
    use crate::attack::{
        apply_plan, interceptor_options, opponent_candidates, our_candidates, split_numbers, Spawn,
    };
    use common::arena::Cell;
    use common::state::GameState;
    use common::unit::{Catalog, Side, UnitKind};
    use rand::rngs::mock::StepRng;

    fn rng() -> StepRng {
        StepRng::new(0, 1)
    }

    #[test]
    fn split_table_matches_budget() {
        let mut rng = rng();
        assert_eq!(split_numbers(4, &mut rng), (1, 1));
        assert_eq!(split_numbers(10, &mut rng), (2, 4));
        assert_eq!(split_numbers(19, &mut rng), (4, 7));
        // Divisor rule from 21 up.
        assert_eq!(split_numbers(21, &mut rng), (3, 9));
        assert_eq!(split_numbers(26, &mut rng), (4, 12));
        let twenty = split_numbers(20, &mut rng);
        assert!(twenty == (4, 8) || twenty == (5, 5));
    }

    #[test]
    fn open_board_yields_rushes() {
        let mut state = GameState::new(0);
        state.player_mut(Side::Bottom).resources.mp = 9.0;
        let plans = our_candidates(&state, &mut rng());
        assert!(!plans.is_empty());
        assert!(plans
            .iter()
            .any(|p| p.iter().any(|s| s.kind == UnitKind::Demolisher)));
        assert!(plans
            .iter()
            .any(|p| p.iter().any(|s| s.kind == UnitKind::Scout && s.count == 9)));
        for plan in &plans {
            for spawn in plan {
                assert!(Side::Bottom.on_home_edge(spawn.cell));
            }
        }
    }

    #[test]
    fn blocked_anchors_are_dropped() {
        let catalog = Catalog::standard();
        let mut state = GameState::new(0);
        state.player_mut(Side::Bottom).resources.mp = 9.0;
        // Wall off every bottom edge cell: nothing is spawnable.
        for edge in Side::Bottom.home_edges() {
            for &cell in edge.cells() {
                state
                    .map
                    .add_unit(UnitKind::Wall, Side::Bottom, cell, &catalog)
                    .unwrap();
            }
        }
        assert!(our_candidates(&state, &mut rng()).is_empty());
    }

    #[test]
    fn opponent_plans_spawn_on_their_edges() {
        let mut state = GameState::new(0);
        state.player_mut(Side::Top).resources.mp = 8.0;
        let plans = opponent_candidates(&state, &mut rng());
        assert!(!plans.is_empty());
        for plan in &plans {
            for spawn in plan {
                assert!(Side::Top.on_home_edge(spawn.cell), "{:?}", spawn.cell);
            }
        }
        // Low budget tier includes a spoiler option.
        assert!(plans
            .iter()
            .any(|p| p.iter().any(|s| s.kind == UnitKind::Interceptor)));
    }

    #[test]
    fn interceptor_tiers_scale_with_enemy_bank() {
        let state = GameState::new(0);
        let low = interceptor_options(&state, 5, 6);
        assert!(low.iter().all(|p| p.iter().map(|s| s.count).sum::<u32>() == 1));
        let mid = interceptor_options(&state, 5, 12);
        assert!(mid.iter().all(|p| p.iter().map(|s| s.count).sum::<u32>() == 2));
        let high = interceptor_options(&state, 5, 18);
        assert!(high.iter().all(|p| p.iter().map(|s| s.count).sum::<u32>() == 3));
    }

    #[test]
    fn apply_plan_stacks_without_charging() {
        let catalog = Catalog::standard();
        let mut state = GameState::new(0);
        let mp = state.player(Side::Bottom).resources.mp;
        apply_plan(
            &mut state,
            Side::Bottom,
            &vec![Spawn {
                kind: UnitKind::Scout,
                cell: Cell::new(13, 0),
                count: 5,
            }],
            &catalog,
        );
        assert_eq!(state.map.count(Side::Bottom, UnitKind::Scout), 5);
        assert_eq!(state.player(Side::Bottom).resources.mp, mp);
    }
}
