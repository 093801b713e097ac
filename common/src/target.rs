// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::arena::{self, Cell};
use crate::map::GameMap;
use crate::unit::{Catalog, Side};
use std::cmp::Ordering;

/// Ranking key for a candidate target, compared field by field:
/// mobile before structure, closer before farther, lower health first,
/// farther into the defender's territory, then nearer a diamond edge.
#[derive(Copy, Clone, Debug, PartialEq)]
struct TargetKey {
    structure: bool,
    distance_squared: u32,
    health: f32,
    depth: u8,
    edge_depth: u32,
}

impl TargetKey {
    fn new(attacker_side: Side, attacker_cell: Cell, cell: Cell, structure: bool, health: f32) -> Self {
        // Rule (d): y descending for the bottom attacker, ascending for
        // the top one.
        let depth = match attacker_side {
            Side::Bottom => 27 - cell.y,
            Side::Top => cell.y,
        };
        Self {
            structure,
            distance_squared: attacker_cell.distance_squared(cell),
            health,
            depth,
            edge_depth: cell.edge_depth(),
        }
    }

    fn cmp(&self, other: &Self) -> Ordering {
        self.structure
            .cmp(&other.structure)
            .then(self.distance_squared.cmp(&other.distance_squared))
            .then(self.health.total_cmp(&other.health))
            .then(self.depth.cmp(&other.depth))
            .then(self.edge_depth.cmp(&other.edge_depth))
    }
}

/// Selects the unit the attacker fires at this frame, or `None`.
/// Total given a fixed map: candidates are visited in sweep order and
/// strict key comparison keeps the first of any tie.
pub fn select_target(map: &GameMap, attacker_id: u32, catalog: &Catalog) -> Option<u32> {
    let attacker = map.unit(attacker_id);
    let stats = attacker.stats(catalog);
    if stats.damage_mobile <= 0.0 && stats.damage_structure <= 0.0 {
        return None;
    }

    let mut best: Option<(TargetKey, u32)> = None;
    for cell in arena::cells_in_radius(attacker.cell, stats.attack_range) {
        for (id, unit) in map.units_at(cell) {
            if unit.side == attacker.side {
                continue;
            }
            // Attackers without applicable damage skip that class.
            if unit.is_structure() {
                if stats.damage_structure <= 0.0 {
                    continue;
                }
            } else if stats.damage_mobile <= 0.0 {
                continue;
            }
            let key = TargetKey::new(
                attacker.side,
                attacker.cell,
                cell,
                unit.is_structure(),
                unit.health,
            );
            if best
                .as_ref()
                .map_or(true, |(b, _)| key.cmp(b) == Ordering::Less)
            {
                best = Some((key, id));
            }
        }
    }
    best.map(|(_, id)| id)
}

/// Applies the attacker's damage to `target_id`, removing it on death.
/// Returns true iff a structure was destroyed.
pub fn apply_damage(map: &mut GameMap, attacker_id: u32, target_id: u32, catalog: &Catalog) -> bool {
    let attacker = map.unit(attacker_id);
    let stats = attacker.stats(catalog);
    let target = map.unit(target_id);
    let damage = if target.is_structure() {
        stats.damage_structure
    } else {
        stats.damage_mobile
    };
    let target = map.unit_mut(target_id);
    target.health -= damage;
    if target.health <= 0.0 {
        let was_structure = target.is_structure();
        map.remove(target_id);
        was_structure
    } else {
        false
    }
}

/// The attack phase: every unit resolves targeting and fires, cells in
/// sweep order, units in insertion order. Mid-phase removals are
/// visible to later attackers. Returns true iff any structure died.
pub fn run_attacks(map: &mut GameMap, catalog: &Catalog) -> bool {
    let mut structures_destroyed = false;
    for &cell in arena::cells() {
        let ids: Vec<u32> = map.ids_at(cell).collect();
        for id in ids {
            if !map.is_live(id) {
                continue;
            }
            if let Some(target_id) = select_target(map, id, catalog) {
                structures_destroyed |= apply_damage(map, id, target_id, catalog);
            }
        }
    }
    structures_destroyed
}
