// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::arena::{self, Cell, SIZE};
use crate::map::CellUnits;
use crate::path;
use crate::state::GameState;
use crate::target;
use crate::unit::{Catalog, ShieldPolicy, UnitKind};

/// Self-destruct blast radius and damage multiplier over spawn health.
const BLAST_RADIUS: f32 = 1.5;
const BLAST_FACTOR: f32 = 1.5;

/// A mobile unit must have walked this many Manhattan cells from spawn
/// for its self-destruct to deal damage.
const BLAST_MIN_TRAVEL: u32 = 5;

/// Deterministic roll-out of one turn of action frames. Owns a scratch
/// successor grid so repeated runs don't allocate per frame.
pub struct Simulator<'a> {
    catalog: &'a Catalog,
    shield_policy: ShieldPolicy,
    scratch: Vec<CellUnits>,
}

impl<'a> Simulator<'a> {
    /// Safety bound against pathological loops.
    pub const FRAME_CAP: u32 = 1000;

    pub fn new(catalog: &'a Catalog) -> Self {
        Self::with_shield_policy(catalog, ShieldPolicy::default())
    }

    pub fn with_shield_policy(catalog: &'a Catalog, shield_policy: ShieldPolicy) -> Self {
        Self {
            catalog,
            shield_policy,
            scratch: vec![CellUnits::new(); SIZE as usize * SIZE as usize],
        }
    }

    /// Runs the state forward until no mobile unit remains and nothing
    /// moved on the last frame, or the frame cap is hit. Returns the
    /// number of frames simulated.
    ///
    /// Any internal inconsistency (a mobile unit off its own path)
    /// aborts with `Err`; the caller skips the candidate.
    pub fn run(&mut self, state: &mut GameState) -> Result<u32, &'static str> {
        self.assign_paths(state);

        let mut frame = 0;
        let mut structures_destroyed = false;
        while frame < Self::FRAME_CAP {
            let outcome = self.frame(state, frame, structures_destroyed)?;
            structures_destroyed = outcome.structures_destroyed;
            frame += 1;
            if !outcome.any_mobile && !outcome.moved {
                break;
            }
        }
        Ok(frame)
    }

    /// Initial paths for freshly deployed mobile units.
    fn assign_paths(&self, state: &mut GameState) {
        let ids: Vec<u32> = state
            .map
            .iter()
            .filter(|(_, u)| !u.is_structure() && u.path.is_empty())
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            let new_path = path::repath(&state.map, state.map.unit(id));
            state.map.unit_mut(id).path = new_path;
        }
    }

    fn frame(
        &mut self,
        state: &mut GameState,
        frame: u32,
        repath_needed: bool,
    ) -> Result<FrameOutcome, &'static str> {
        self.shield_phase(state);
        let (moved, any_mobile, blast_cells) = self.movement_phase(state, frame, repath_needed)?;
        let mut structures_destroyed = self.self_destruct_phase(state, &blast_cells);
        structures_destroyed |= target::run_attacks(&mut state.map, self.catalog);
        Ok(FrameOutcome {
            moved,
            any_mobile,
            structures_destroyed,
        })
    }

    /// Each Support grants its one-shot shield to friendly mobile units
    /// in range that it has not shielded before.
    fn shield_phase(&self, state: &mut GameState) {
        for &cell in arena::cells() {
            let Some((_, support)) = state.map.structure_at(cell) else {
                continue;
            };
            if support.kind != UnitKind::Support {
                continue;
            }
            let side = support.side;
            let stats = support.stats(self.catalog);
            let (range, amount) = (stats.shield_range, stats.shield_per_unit);

            for covered in arena::cells_in_radius(cell, range) {
                let ids: CellUnits = state.map.ids_at(covered).collect();
                for id in ids {
                    let unit = state.map.unit_mut(id);
                    if unit.is_structure() || unit.side != side {
                        continue;
                    }
                    let eligible = match self.shield_policy {
                        ShieldPolicy::PerSupport => !unit.shielded_by.contains(&cell),
                        ShieldPolicy::OncePerUnit => unit.shielded_by.is_empty(),
                    };
                    if eligible {
                        unit.health += amount;
                        unit.shielded_by.push(cell);
                    }
                }
            }
        }
    }

    /// Structures copy through; mobile units step on their cadence,
    /// scoring at an enemy edge, queueing a self-destruct at any other
    /// path terminus, or advancing one cell. Returns whether anything
    /// moved, whether any mobile unit was seen, and the queued blast
    /// cells.
    fn movement_phase(
        &mut self,
        state: &mut GameState,
        frame: u32,
        repath_needed: bool,
    ) -> Result<(bool, bool, Vec<Cell>), &'static str> {
        let mut moved = false;
        let mut any_mobile = false;
        let mut blast_cells = Vec::new();

        for slot in &mut self.scratch {
            slot.clear();
        }

        for &cell in arena::cells() {
            let ids: CellUnits = state.map.ids_at(cell).collect();
            for id in ids {
                if !state.map.is_live(id) {
                    continue;
                }
                if state.map.unit(id).is_structure() {
                    self.scratch[cell.index()].push(id);
                    continue;
                }
                any_mobile = true;

                if repath_needed {
                    let new_path = path::repath(&state.map, state.map.unit(id));
                    state.map.unit_mut(id).path = new_path;
                }

                let (side, next) = {
                    let unit = state.map.unit(id);
                    let frames_per_step = unit.stats(self.catalog).frames_per_step.max(1);
                    if frame != 0 && frame % frames_per_step != 0 {
                        self.scratch[cell.index()].push(id);
                        continue;
                    }
                    let &terminus = unit.path.last().ok_or("mobile unit with empty path")?;
                    let next = if cell == terminus {
                        None
                    } else {
                        let here = unit
                            .path
                            .iter()
                            .position(|&c| c == cell)
                            .ok_or("mobile unit off its path")?;
                        Some(unit.path[here + 1])
                    };
                    (unit.side, next)
                };

                match next {
                    None => {
                        let enemy_edges = side.opponent().home_edges();
                        if enemy_edges.into_iter().any(|e| e.contains(cell)) {
                            // Scored.
                            state.player_mut(side.opponent()).health -= 1.0;
                            state.map.remove(id);
                        } else {
                            self.scratch[cell.index()].push(id);
                            blast_cells.push(cell);
                        }
                    }
                    Some(next) => {
                        state.map.unit_mut(id).cell = next;
                        self.scratch[next.index()].push(id);
                        moved = true;
                    }
                }
            }
        }

        std::mem::swap(&mut state.map.grid, &mut self.scratch);
        blast_cells.dedup();
        Ok((moved, any_mobile, blast_cells))
    }

    /// Every unit on a queued cell detonates: if it traveled at least
    /// the minimum distance it damages everything within the blast
    /// radius (its own cell excepted); it is removed either way.
    fn self_destruct_phase(&self, state: &mut GameState, blast_cells: &[Cell]) -> bool {
        let mut structures_destroyed = false;
        for &cell in blast_cells {
            let ids: CellUnits = state.map.ids_at(cell).collect();
            for id in ids {
                if !state.map.is_live(id) {
                    continue;
                }
                let (traveled, damage) = {
                    let unit = state.map.unit(id);
                    (
                        unit.cell.manhattan_distance(unit.initial_cell),
                        unit.max_health * BLAST_FACTOR,
                    )
                };
                if traveled >= BLAST_MIN_TRAVEL {
                    for hit_cell in arena::cells_in_radius(cell, BLAST_RADIUS) {
                        if hit_cell == cell {
                            continue;
                        }
                        let hit_ids: CellUnits = state.map.ids_at(hit_cell).collect();
                        for hit in hit_ids {
                            if !state.map.is_live(hit) {
                                continue;
                            }
                            let victim = state.map.unit_mut(hit);
                            victim.health -= damage;
                            if victim.health <= 0.0 {
                                structures_destroyed |= victim.is_structure();
                                state.map.remove(hit);
                            }
                        }
                    }
                }
                state.map.remove(id);
            }
        }
        structures_destroyed
    }
}

struct FrameOutcome {
    moved: bool,
    any_mobile: bool,
    structures_destroyed: bool,
}
