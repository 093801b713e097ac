// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::arena::Cell;
use crate::map::GameMap;
use crate::unit::{Catalog, Side, SideArray, UnitKind};

/// The two spendable currencies: Structural Points build and upgrade
/// structures, Mobile Points deploy mobile units. Placement tests
/// truncate to whole points.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Resources {
    pub sp: f32,
    pub mp: f32,
}

impl Resources {
    pub fn whole_sp(&self) -> f32 {
        self.sp.floor()
    }

    pub fn whole_mp(&self) -> f32 {
        self.mp.floor()
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Player {
    pub health: f32,
    pub resources: Resources,
}

impl Player {
    pub const INITIAL_HEALTH: f32 = 30.0;
    pub const INITIAL_SP: f32 = 40.0;
    pub const INITIAL_MP: f32 = 5.0;

    fn initial() -> Self {
        Self {
            health: Self::INITIAL_HEALTH,
            resources: Resources {
                sp: Self::INITIAL_SP,
                mp: Self::INITIAL_MP,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GameState {
    pub turn: u32,
    pub map: GameMap,
    pub players: SideArray<Player>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GameState {
    // Deterministic end-state ranking; monotone in own health and own
    // structure counts.
    pub const HEALTH_WEIGHT: f32 = 1.0;
    pub const TURRET_WEIGHT: f32 = 0.3;
    pub const SUPPORT_WEIGHT: f32 = 0.2;
    pub const WALL_WEIGHT: f32 = 0.1;

    pub fn new(turn: u32) -> Self {
        Self {
            turn,
            map: GameMap::new(),
            players: SideArray::from_fn(|_| Player::initial()),
        }
    }

    pub fn player(&self, side: Side) -> &Player {
        &self.players[side]
    }

    pub fn player_mut(&mut self, side: Side) -> &mut Player {
        &mut self.players[side]
    }

    /// Spawn legality for the deployment phase, before charging.
    pub fn can_spawn(
        &self,
        kind: UnitKind,
        side: Side,
        cell: Cell,
        catalog: &Catalog,
    ) -> Result<(), &'static str> {
        if !cell.in_arena() {
            return Err("outside arena");
        }
        if self.map.contains_structure(cell) {
            return Err("structure in the way");
        }
        if kind.is_structure() {
            if !side.owns_half(cell) {
                return Err("not our half");
            }
            if self.map.ids_at(cell).next().is_some() {
                return Err("cell occupied");
            }
            if self.player(side).resources.whole_sp() < catalog.cost(kind) {
                return Err("insufficient SP");
            }
        } else {
            if !side.on_home_edge(cell) {
                return Err("not an edge cell");
            }
            if self.player(side).resources.whole_mp() < catalog.cost(kind) {
                return Err("insufficient MP");
            }
        }
        Ok(())
    }

    /// Places up to `count` units, charging as it goes. Returns the
    /// number actually placed.
    pub fn attempt_spawn(
        &mut self,
        kind: UnitKind,
        side: Side,
        cell: Cell,
        count: u32,
        catalog: &Catalog,
    ) -> u32 {
        let mut placed = 0;
        for _ in 0..count {
            if self.can_spawn(kind, side, cell, catalog).is_err() {
                break;
            }
            if self.map.add_unit(kind, side, cell, catalog).is_err() {
                break;
            }
            let resources = &mut self.player_mut(side).resources;
            if kind.is_structure() {
                resources.sp -= catalog.cost(kind);
            } else {
                resources.mp -= catalog.cost(kind);
            }
            placed += 1;
        }
        placed
    }

    /// Upgrades the structure at `cell`, charging SP. Upgrading an
    /// already-upgraded structure succeeds without charge.
    pub fn attempt_upgrade(
        &mut self,
        side: Side,
        cell: Cell,
        catalog: &Catalog,
    ) -> Result<(), &'static str> {
        let (id, unit) = self.map.structure_at(cell).ok_or("nothing to upgrade")?;
        if unit.side != side {
            return Err("not ours");
        }
        if unit.upgraded {
            return Ok(());
        }
        let cost = catalog.upgrade_cost(unit.kind);
        if self.player(side).resources.whole_sp() < cost {
            return Err("insufficient SP");
        }
        self.player_mut(side).resources.sp -= cost;
        self.map.unit_mut(id).upgrade(catalog);
        Ok(())
    }

    /// End-state score from the bottom player's perspective.
    pub fn evaluate(&self) -> f32 {
        let diff = |kind| {
            self.map.count(Side::Bottom, kind) as f32 - self.map.count(Side::Top, kind) as f32
        };
        Self::HEALTH_WEIGHT * (self.player(Side::Bottom).health - self.player(Side::Top).health)
            + Self::TURRET_WEIGHT * diff(UnitKind::Turret)
            + Self::SUPPORT_WEIGHT * diff(UnitKind::Support)
            + Self::WALL_WEIGHT * diff(UnitKind::Wall)
    }
}
