// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Turn orchestration: repair, drain the build plan, answer the
//! opponent's best simulated attack with interceptors, then search our
//! own attack catalog under a wall-clock budget and commit the best.

use crate::attack::{self, AttackPlan, Spawn};
use crate::opening::{self, CriticalSet};
use crate::queue::{self, BuildQueue};
use common::arena::Cell;
use common::protocol::{Command, TurnSubmission};
use common::sim::Simulator;
use common::state::GameState;
use common::unit::{Catalog, Side, UnitKind};
use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

/// Per-phase wall-clock budgets, polled between candidates.
const SEARCH_BUDGET: Duration = Duration::from_millis(750);
const FILL_BUDGET: Duration = Duration::from_millis(250);

/// No attack below this bank, and no commit that does not move enemy
/// health by more than this margin.
const ATTACK_MIN_MP: f32 = 6.0;
const COMMIT_MARGIN: f32 = 0.5;

/// Thunder strike arms above this bank with enough SP to re-wall.
const THUNDER_MIN_MP: f32 = 20.0;
const THUNDER_MIN_SP: f32 = 5.0;
const THUNDER_CHANNEL: Cell = Cell::new(22, 10);
const THUNDER_BURST_NEAR: Cell = Cell::new(12, 1);
const THUNDER_BURST_FAR: Cell = Cell::new(11, 2);

const INITIAL_SCREEN: Cell = Cell::new(20, 6);

struct Deadline(Instant);

impl Deadline {
    fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum BlockingWall {
    Center,
    Left,
    Right,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ThunderPhase {
    Idle,
    /// Hammer walls queued for removal; the burst goes out next turn.
    Prepared,
}

pub struct Deliberator {
    queue: BuildQueue,
    critical: CriticalSet,
    scored_on: Vec<Cell>,
    blocking_wall: BlockingWall,
    thunder: ThunderPhase,
    throw_interceptors: bool,
    rng: SmallRng,
}

impl Deliberator {
    pub fn new(seed: u64) -> Self {
        info!("random seed: {seed}");
        Self {
            queue: BuildQueue::default(),
            critical: opening::critical_set(),
            scored_on: Vec::new(),
            blocking_wall: BlockingWall::Center,
            thunder: ThunderPhase::Idle,
            throw_interceptors: true,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Records where the opponent scored on us, from breach events.
    pub fn on_breach(&mut self, cell: Cell) {
        debug!("scored on at {cell:?}");
        self.scored_on.push(cell);
    }

    pub fn take_turn(&mut self, turn_state: &GameState, catalog: &Catalog) -> TurnSubmission {
        let started = Instant::now();
        let mut state = turn_state.clone();
        let mut submission = TurnSubmission::default();

        if state.turn == 0 {
            opening::seed(&mut self.queue);
        }

        self.rotate_blocking_wall(&mut state, catalog, &mut submission);

        let striking = self.thunder == ThunderPhase::Prepared;
        queue::reconcile_critical(&mut self.queue, &self.critical, &state, striking);
        self.queue.drain(&mut state, catalog, Some(&mut submission));

        // Arming thunder strike reserves the leftover SP for re-walling.
        let arm_thunder = self.thunder == ThunderPhase::Idle && self.should_thunder_strike(&state);
        if self.thunder == ThunderPhase::Idle
            && !arm_thunder
            && self.queue.is_empty()
            && state.player(Side::Bottom).resources.whole_sp() > 2.0
        {
            self.opportunistic_fills(&mut state, catalog, &mut submission);
        }

        if state.turn == 0 {
            self.commit_plan(
                &mut state,
                catalog,
                &mut submission,
                &[Spawn {
                    kind: UnitKind::Interceptor,
                    cell: INITIAL_SCREEN,
                    count: 2,
                }],
            );
        } else if self.throw_interceptors && self.thunder == ThunderPhase::Idle && !arm_thunder {
            if let Some(plan) = self.interceptor_response(&state, catalog) {
                self.commit_plan(&mut state, catalog, &mut submission, &plan);
            }
        }

        match self.thunder {
            ThunderPhase::Prepared => self.thunder_burst(&mut state, catalog, &mut submission),
            ThunderPhase::Idle => {
                if arm_thunder {
                    self.prepare_thunder_strike(&state, &mut submission);
                } else if state.player(Side::Bottom).resources.mp >= ATTACK_MIN_MP {
                    if let Some(plan) = self.attack_search(&state, catalog) {
                        self.commit_plan(&mut state, catalog, &mut submission, &plan);
                    }
                }
            }
        }

        debug!(
            "turn {}: {} builds, {} deploys in {:?}",
            state.turn,
            submission.build_count(),
            submission.deploy_count(),
            started.elapsed()
        );
        submission
    }

    /// The roaming front wall hops flanks every turn: spawn on one
    /// side, queue its removal, swap sides next turn.
    fn rotate_blocking_wall(
        &mut self,
        state: &mut GameState,
        catalog: &Catalog,
        submission: &mut TurnSubmission,
    ) {
        let place = |state: &mut GameState, submission: &mut TurnSubmission, cell: Cell| {
            if state.attempt_spawn(UnitKind::Wall, Side::Bottom, cell, 1, catalog) == 1 {
                submission.push(Command::Spawn {
                    kind: UnitKind::Wall,
                    cell,
                });
            }
            submission.push(Command::Remove { cell });
        };
        match self.blocking_wall {
            BlockingWall::Center => {
                // The queue builds the left one; alternation starts once
                // it stands.
                if state.map.contains_structure(opening::BLOCKING_WALL_LEFT) {
                    self.blocking_wall = BlockingWall::Left;
                } else if state.map.contains_structure(opening::BLOCKING_WALL_RIGHT) {
                    self.blocking_wall = BlockingWall::Right;
                }
            }
            BlockingWall::Left => {
                place(state, submission, opening::BLOCKING_WALL_LEFT);
                self.blocking_wall = BlockingWall::Right;
            }
            BlockingWall::Right => {
                place(state, submission, opening::BLOCKING_WALL_RIGHT);
                self.blocking_wall = BlockingWall::Left;
            }
        }
    }

    /// Leftover SP after the plan drains goes into sampled turrets and
    /// walls, biased toward columns we have been scored on, alternating
    /// flanks by turn parity.
    fn opportunistic_fills(
        &mut self,
        state: &mut GameState,
        catalog: &Catalog,
        submission: &mut TurnSubmission,
    ) {
        let deadline = Deadline::after(FILL_BUDGET);
        let (mean_x, mean_y) = if state.turn % 2 == 0 {
            (9.0f32, 11.0f32)
        } else {
            (18.0, 11.0)
        };
        let spread = 3.0 + state.turn as f32 * 0.1;

        while state.player(Side::Bottom).resources.whole_sp() > 2.0 && !deadline.expired() {
            let mx = if !self.scored_on.is_empty() && self.rng.gen_bool(0.3) {
                let hit = self.scored_on[self.rng.gen_range(0..self.scored_on.len())];
                hit.x as f32
            } else {
                mean_x
            };
            let x = (mx + self.rng.gen_range(-spread..=spread)).round() as i32;
            let y = (mean_y + self.rng.gen_range(-spread..=spread)).round() as i32;
            if !(0..28).contains(&x) || !(0..28).contains(&y) {
                continue;
            }
            let cell = Cell::new(x as u8, y as u8);
            if !cell.in_arena() || opening::KEEP_CLEAR.contains(&cell) {
                continue;
            }

            if state
                .can_spawn(UnitKind::Turret, Side::Bottom, cell, catalog)
                .is_ok()
            {
                let kind = if self.rng.gen_bool(0.7) {
                    UnitKind::Turret
                } else {
                    UnitKind::Wall
                };
                if state.attempt_spawn(kind, Side::Bottom, cell, 1, catalog) == 1 {
                    submission.push(Command::Spawn { kind, cell });
                }
            } else if state
                .map
                .structure_at(cell)
                .is_some_and(|(_, u)| u.side == Side::Bottom && !u.upgraded)
                && state.attempt_upgrade(Side::Bottom, cell, catalog).is_ok()
            {
                submission.push(Command::Upgrade { cell });
            }
        }
    }

    /// Project the rest of the build plan, find the opponent attack
    /// that hurts us most, then pick the interceptor screen that best
    /// answers that specific attack.
    fn interceptor_response(&mut self, state: &GameState, catalog: &Catalog) -> Option<AttackPlan> {
        let mut projected = state.clone();
        let mut projected_queue = self.queue.clone();
        projected_queue.drain(&mut projected, catalog, None);

        let oppo_plans = attack::opponent_candidates(&projected, &mut self.rng);
        if oppo_plans.is_empty() {
            return None;
        }

        let deadline = Deadline::after(SEARCH_BUDGET);
        let mut worst: Option<(f32, &AttackPlan)> = None;
        for plan in &oppo_plans {
            if deadline.expired() {
                debug!("opponent projection budget elapsed");
                break;
            }
            let Some((score, _)) = self.simulate(&projected, None, Some(plan), catalog) else {
                continue;
            };
            if worst.map_or(true, |(s, _)| score < s) {
                worst = Some((score, plan));
            }
        }
        let (threat_score, threat) = worst?;
        debug!("worst projected attack scores {threat_score}: {threat:?}");

        let our_mp = state.player(Side::Bottom).resources.whole_mp() as u32;
        let oppo_mp = state.player(Side::Top).resources.whole_mp() as u32;
        let options = attack::interceptor_options(state, our_mp, oppo_mp);

        let deadline = Deadline::after(SEARCH_BUDGET);
        let mut best: Option<(f32, AttackPlan)> = None;
        for option in options {
            if deadline.expired() {
                debug!("interceptor response budget elapsed");
                break;
            }
            let Some((score, _)) = self.simulate(&projected, Some(&option), Some(threat), catalog)
            else {
                continue;
            };
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, option));
            }
        }
        best.map(|(_, plan)| plan)
    }

    /// Score every candidate under the budget; a lethal hit commits
    /// immediately, otherwise the best plan that moves enemy health by
    /// more than the margin.
    fn attack_search(&mut self, state: &GameState, catalog: &Catalog) -> Option<AttackPlan> {
        let plans = attack::our_candidates(state, &mut self.rng);
        let baseline = state.player(Side::Top).health;

        let deadline = Deadline::after(SEARCH_BUDGET);
        let mut best: Option<(f32, AttackPlan)> = None;
        for plan in plans {
            if deadline.expired() {
                debug!("attack search budget elapsed");
                break;
            }
            let Some((score, enemy_health)) = self.simulate(state, Some(&plan), None, catalog)
            else {
                continue;
            };
            if enemy_health <= 0.0 {
                debug!("lethal attack found: {plan:?}");
                return Some(plan);
            }
            if baseline - enemy_health > COMMIT_MARGIN
                && best.as_ref().map_or(true, |(s, _)| score > *s)
            {
                best = Some((score, plan));
            }
        }
        best.map(|(_, plan)| plan)
    }

    /// Rolls out one turn on a scratch copy. Returns the end-state
    /// score and the opponent's remaining health, or `None` when the
    /// simulator aborts (the candidate is skipped).
    fn simulate(
        &self,
        base: &GameState,
        ours: Option<&AttackPlan>,
        theirs: Option<&AttackPlan>,
        catalog: &Catalog,
    ) -> Option<(f32, f32)> {
        let mut copy = base.clone();
        if let Some(plan) = ours {
            attack::apply_plan(&mut copy, Side::Bottom, plan, catalog);
        }
        if let Some(plan) = theirs {
            attack::apply_plan(&mut copy, Side::Top, plan, catalog);
        }
        match Simulator::new(catalog).run(&mut copy) {
            Ok(_) => Some((copy.evaluate(), copy.player(Side::Top).health)),
            Err(e) => {
                warn!("simulation aborted: {e}");
                None
            }
        }
    }

    fn should_thunder_strike(&self, state: &GameState) -> bool {
        let resources = &state.player(Side::Bottom).resources;
        resources.mp > THUNDER_MIN_MP && resources.sp >= THUNDER_MIN_SP
    }

    /// Queue the corner walls for removal; the hole opens before the
    /// next turn and the hammer set stays down for it.
    fn prepare_thunder_strike(&mut self, state: &GameState, submission: &mut TurnSubmission) {
        info!("thunder strike armed");
        for &cell in &self.critical.hammer_walls {
            if state
                .map
                .structure_at(cell)
                .is_some_and(|(_, u)| u.side == Side::Bottom)
            {
                submission.push(Command::Remove { cell });
            }
        }
        self.thunder = ThunderPhase::Prepared;
    }

    /// The burst: a temporary channel wall steers the charge, scouts
    /// pour through, and the channel is queued away again. Repair
    /// re-walls the corners next turn.
    fn thunder_burst(
        &mut self,
        state: &mut GameState,
        catalog: &Catalog,
        submission: &mut TurnSubmission,
    ) {
        info!("thunder strike burst");
        if state.attempt_spawn(UnitKind::Wall, Side::Bottom, THUNDER_CHANNEL, 1, catalog) == 1 {
            submission.push(Command::Spawn {
                kind: UnitKind::Wall,
                cell: THUNDER_CHANNEL,
            });
        }
        submission.push(Command::Remove {
            cell: THUNDER_CHANNEL,
        });

        let mp = state.player(Side::Bottom).resources.whole_mp() as u32;
        let near = mp.min(5);
        self.commit_plan(
            state,
            catalog,
            submission,
            &[
                Spawn {
                    kind: UnitKind::Scout,
                    cell: THUNDER_BURST_NEAR,
                    count: near,
                },
                Spawn {
                    kind: UnitKind::Scout,
                    cell: THUNDER_BURST_FAR,
                    count: mp - near,
                },
            ],
        );
        self.thunder = ThunderPhase::Idle;
    }

    /// Charges and places a plan for real, mirroring each placed unit
    /// into the outbound deployment line.
    fn commit_plan(
        &mut self,
        state: &mut GameState,
        catalog: &Catalog,
        submission: &mut TurnSubmission,
        plan: &[Spawn],
    ) {
        for spawn in plan {
            let placed = state.attempt_spawn(spawn.kind, Side::Bottom, spawn.cell, spawn.count, catalog);
            for _ in 0..placed {
                submission.push(Command::Spawn {
                    kind: spawn.kind,
                    cell: spawn.cell,
                });
            }
            if placed < spawn.count {
                debug!(
                    "placed {placed}/{} of {:?} at {:?}",
                    spawn.count, spawn.kind, spawn.cell
                );
            }
        }
    }

    #[cfg(test)]
    fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::deliberate::Deliberator;
    use common::state::GameState;
    use common::unit::{Catalog, Side, UnitKind};

    #[test]
    fn opening_turn_builds_and_screens() {
        let catalog = Catalog::standard();
        let mut bot = Deliberator::new(7);
        let state = GameState::new(0);

        let submission = bot.take_turn(&state, &catalog);

        // 40 SP buys a healthy chunk of the opening; the rest stays
        // queued rather than skipped.
        assert!(submission.build_count() > 0);
        assert!(bot.queue_len() > 0);
        // The turn-zero interceptor screen goes out with the builds.
        assert!(submission.deploy_count() > 0);
    }

    #[test]
    fn attack_turn_commits_when_a_lane_is_open() {
        let catalog = Catalog::standard();
        let mut bot = Deliberator::new(11);
        bot.throw_interceptors = false;

        let mut state = GameState::new(3);
        state.player_mut(Side::Bottom).resources.mp = 9.0;
        state.player_mut(Side::Bottom).resources.sp = 0.0;
        // No opening seeded at turn 3; the board is open, so some rush
        // reaches the enemy edge and scores.
        let submission = bot.take_turn(&state, &catalog);
        assert!(submission.deploy_count() > 0);
    }

    #[test]
    fn thunder_strike_arms_then_bursts() {
        let catalog = Catalog::standard();
        let mut bot = Deliberator::new(13);
        bot.throw_interceptors = false;

        let mut armed = GameState::new(4);
        armed.player_mut(Side::Bottom).resources.mp = 25.0;
        armed.player_mut(Side::Bottom).resources.sp = 10.0;
        // Corner walls standing so the removals have something to pull.
        for &cell in &bot.critical.hammer_walls.clone() {
            armed
                .map
                .add_unit(UnitKind::Wall, Side::Bottom, cell, &catalog)
                .unwrap();
        }
        let first = bot.take_turn(&armed, &catalog);
        // Removal commands only; the burst waits for the hole.
        assert!(first.build_count() > 0);

        let mut open = GameState::new(5);
        open.player_mut(Side::Bottom).resources.mp = 28.0;
        open.player_mut(Side::Bottom).resources.sp = 6.0;
        let second = bot.take_turn(&open, &catalog);
        assert!(second.deploy_count() > 0);
    }
}
