// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::arena::{Cell, Edge};
use crate::enum_array::EnumArray;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use smallvec::SmallVec;
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// The two players, named for the half of the diamond they defend.
/// The local player is always [`Side::Bottom`]; opponent coordinates are
/// reflected into this frame at the wire boundary.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    EnumIter,
    EnumCount,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum Side {
    Bottom,
    Top,
}

pub type SideArray<V> = EnumArray<Side, V, { <Side as EnumCount>::COUNT }>;

impl Side {
    pub fn iter() -> impl Iterator<Item = Self> + 'static {
        <Self as IntoEnumIterator>::iter()
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::Bottom => Self::Top,
            Self::Top => Self::Bottom,
        }
    }

    /// The two edges mobile units of this side spawn on.
    pub fn home_edges(self) -> [Edge; 2] {
        match self {
            Self::Bottom => [Edge::BottomLeft, Edge::BottomRight],
            Self::Top => [Edge::TopLeft, Edge::TopRight],
        }
    }

    /// True iff `cell` is on this side's half of the board.
    pub fn owns_half(self, cell: Cell) -> bool {
        match self {
            Self::Bottom => cell.y <= 13,
            Self::Top => cell.y >= 14,
        }
    }

    pub fn on_home_edge(self, cell: Cell) -> bool {
        self.home_edges().into_iter().any(|e| e.contains(cell))
    }

    /// The edge a unit of this side spawned at `cell` runs toward.
    /// Spawns off the home edges (hypothetical states) pick the diagonal
    /// by which lateral half they sit in.
    pub fn target_edge(self, spawn: Cell) -> Edge {
        for edge in self.home_edges() {
            if edge.contains(spawn) {
                return edge.opposite();
            }
        }
        match (self, spawn.x < 14) {
            (Self::Bottom, true) => Edge::TopRight,
            (Self::Bottom, false) => Edge::TopLeft,
            (Self::Top, true) => Edge::BottomRight,
            (Self::Top, false) => Edge::BottomLeft,
        }
    }
}

/// Unit kinds in wire order: spawn code 0..=5.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Display,
    EnumIter,
    EnumCount,
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum UnitKind {
    /// Cheap blocker.
    Wall,
    /// Shields passing friendly mobile units once each.
    Support,
    /// Stationary gun, mobile targets only.
    Turret,
    /// Fast, fragile scorer.
    Scout,
    /// Slow, outranges turrets, shreds structures.
    Demolisher,
    /// Defensive roamer whose path-end self-destruct clears rushes.
    Interceptor,
}

pub type KindArray<V> = EnumArray<UnitKind, V, { <UnitKind as EnumCount>::COUNT }>;

impl UnitKind {
    pub fn iter() -> impl Iterator<Item = Self> + 'static {
        <Self as IntoEnumIterator>::iter()
    }

    pub fn is_structure(self) -> bool {
        matches!(self, Self::Wall | Self::Support | Self::Turret)
    }

    pub fn is_mobile(self) -> bool {
        !self.is_structure()
    }
}

/// Immutable per-kind data. Structures charge SP, mobile units MP.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct UnitStats {
    pub cost: f32,
    pub upgrade_cost: f32,
    pub health: f32,
    pub attack_range: f32,
    pub shield_range: f32,
    pub shield_per_unit: f32,
    pub damage_mobile: f32,
    pub damage_structure: f32,
    /// A mobile unit steps on frame `f` iff `f == 0` or
    /// `f % frames_per_step == 0`. Zero for structures.
    pub frames_per_step: u32,
}

/// One shield per (Support, unit) pair per game, or the conservative
/// once-ever-per-unit reading.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ShieldPolicy {
    #[default]
    PerSupport,
    OncePerUnit,
}

/// Per-kind stats, base and upgraded, plus the wire shorthands.
/// Built once from the engine config and passed around by reference.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub base: KindArray<UnitStats>,
    pub upgraded: KindArray<UnitStats>,
    pub shorthands: KindArray<String>,
    pub remove_shorthand: String,
    pub upgrade_shorthand: String,
}

impl Catalog {
    pub fn stats(&self, kind: UnitKind, upgraded: bool) -> &UnitStats {
        if upgraded {
            &self.upgraded[kind]
        } else {
            &self.base[kind]
        }
    }

    pub fn cost(&self, kind: UnitKind) -> f32 {
        self.base[kind].cost
    }

    pub fn upgrade_cost(&self, kind: UnitKind) -> f32 {
        self.base[kind].upgrade_cost
    }

    /// The starter config shipped with the engine. Tests and offline runs
    /// use it; live games rebuild the catalog from the config document.
    pub fn standard() -> Self {
        fn stats(kind: UnitKind) -> UnitStats {
            match kind {
                UnitKind::Wall => UnitStats {
                    cost: 1.0,
                    upgrade_cost: 1.5,
                    health: 60.0,
                    ..Default::default()
                },
                UnitKind::Support => UnitStats {
                    cost: 4.0,
                    upgrade_cost: 4.0,
                    health: 30.0,
                    shield_range: 3.5,
                    shield_per_unit: 3.0,
                    ..Default::default()
                },
                UnitKind::Turret => UnitStats {
                    cost: 2.0,
                    upgrade_cost: 4.0,
                    health: 75.0,
                    attack_range: 2.5,
                    damage_mobile: 5.0,
                    ..Default::default()
                },
                UnitKind::Scout => UnitStats {
                    cost: 1.0,
                    health: 15.0,
                    attack_range: 3.5,
                    damage_mobile: 2.0,
                    damage_structure: 2.0,
                    frames_per_step: 1,
                    ..Default::default()
                },
                UnitKind::Demolisher => UnitStats {
                    cost: 3.0,
                    health: 5.0,
                    attack_range: 4.5,
                    damage_mobile: 8.0,
                    damage_structure: 8.0,
                    frames_per_step: 2,
                    ..Default::default()
                },
                UnitKind::Interceptor => UnitStats {
                    cost: 1.0,
                    health: 40.0,
                    attack_range: 4.5,
                    damage_mobile: 20.0,
                    frames_per_step: 4,
                    ..Default::default()
                },
            }
        }

        fn upgraded(kind: UnitKind) -> UnitStats {
            let base = stats(kind);
            match kind {
                UnitKind::Wall => UnitStats {
                    health: 120.0,
                    ..base
                },
                UnitKind::Support => UnitStats {
                    shield_range: 7.0,
                    shield_per_unit: 4.0,
                    ..base
                },
                UnitKind::Turret => UnitStats {
                    attack_range: 3.5,
                    damage_mobile: 15.0,
                    ..base
                },
                _ => base,
            }
        }

        const SHORTHANDS: [&str; 6] = ["FF", "EF", "DF", "PI", "EI", "SI"];
        Self {
            base: KindArray::from_fn(stats),
            upgraded: KindArray::from_fn(upgraded),
            shorthands: KindArray::from_fn(|k| SHORTHANDS[k as u8 as usize].to_owned()),
            remove_shorthand: "RM".to_owned(),
            upgrade_shorthand: "UP".to_owned(),
        }
    }
}

/// A structure or mobile unit occupying a cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    pub kind: UnitKind,
    pub side: Side,
    pub upgraded: bool,
    pub health: f32,
    /// Spawn health; shields add on top of `health` without raising this,
    /// and self-destruct damage scales off it.
    pub max_health: f32,
    pub cell: Cell,
    /// Spawn location, retained for self-destruct eligibility.
    pub initial_cell: Cell,
    /// Mobile only; where the unit is headed.
    pub target_edge: Option<Edge>,
    /// Mobile only; first element is the current cell before a step.
    pub path: Vec<Cell>,
    /// Support cells that have already shielded this unit.
    pub shielded_by: SmallVec<[Cell; 2]>,
}

impl Unit {
    pub fn structure(kind: UnitKind, side: Side, cell: Cell, catalog: &Catalog) -> Self {
        debug_assert!(kind.is_structure());
        let health = catalog.stats(kind, false).health;
        Self {
            kind,
            side,
            upgraded: false,
            health,
            max_health: health,
            cell,
            initial_cell: cell,
            target_edge: None,
            path: Vec::new(),
            shielded_by: SmallVec::new(),
        }
    }

    pub fn mobile(kind: UnitKind, side: Side, cell: Cell, catalog: &Catalog) -> Self {
        debug_assert!(kind.is_mobile());
        let health = catalog.stats(kind, false).health;
        Self {
            kind,
            side,
            upgraded: false,
            health,
            max_health: health,
            cell,
            initial_cell: cell,
            target_edge: Some(side.target_edge(cell)),
            path: Vec::new(),
            shielded_by: SmallVec::new(),
        }
    }

    pub fn is_structure(&self) -> bool {
        self.kind.is_structure()
    }

    pub fn stats<'a>(&self, catalog: &'a Catalog) -> &'a UnitStats {
        catalog.stats(self.kind, self.upgraded)
    }

    /// In-place upgrade. A second upgrade is a no-op.
    pub fn upgrade(&mut self, catalog: &Catalog) {
        if self.upgraded || !self.is_structure() {
            return;
        }
        let gained = catalog.stats(self.kind, true).health - self.max_health;
        self.upgraded = true;
        self.max_health += gained;
        self.health += gained.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use crate::arena::{Cell, Edge};
    use crate::unit::{Catalog, Side, Unit, UnitKind};

    #[test]
    fn kinds_partition() {
        assert!(UnitKind::Wall.is_structure());
        assert!(UnitKind::Support.is_structure());
        assert!(UnitKind::Turret.is_structure());
        assert!(UnitKind::Scout.is_mobile());
        assert!(UnitKind::Demolisher.is_mobile());
        assert!(UnitKind::Interceptor.is_mobile());
    }

    #[test]
    fn wire_order() {
        assert_eq!(UnitKind::Wall as u8, 0);
        assert_eq!(UnitKind::Interceptor as u8, 5);
    }

    #[test]
    fn target_edges_oppose_spawn_edges() {
        assert_eq!(
            Side::Bottom.target_edge(Cell::new(13, 0)),
            Edge::TopRight
        );
        assert_eq!(
            Side::Bottom.target_edge(Cell::new(14, 0)),
            Edge::TopLeft
        );
        assert_eq!(Side::Top.target_edge(Cell::new(14, 27)), Edge::BottomLeft);
        assert_eq!(Side::Top.target_edge(Cell::new(13, 27)), Edge::BottomRight);
    }

    #[test]
    fn upgrade_is_idempotent() {
        let catalog = Catalog::standard();
        let mut wall = Unit::structure(UnitKind::Wall, Side::Bottom, Cell::new(13, 13), &catalog);
        wall.upgrade(&catalog);
        assert_eq!(wall.max_health, 120.0);
        assert_eq!(wall.health, 120.0);
        let before = wall.clone();
        wall.upgrade(&catalog);
        assert_eq!(wall, before);
    }

    #[test]
    fn upgrade_keeps_damage_taken() {
        let catalog = Catalog::standard();
        let mut wall = Unit::structure(UnitKind::Wall, Side::Bottom, Cell::new(13, 13), &catalog);
        wall.health = 20.0;
        wall.upgrade(&catalog);
        assert_eq!(wall.max_health, 120.0);
        assert_eq!(wall.health, 80.0);
    }

    #[test]
    fn mobile_cadence() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.stats(UnitKind::Scout, false).frames_per_step, 1);
        assert_eq!(catalog.stats(UnitKind::Demolisher, false).frames_per_step, 2);
        assert_eq!(catalog.stats(UnitKind::Interceptor, false).frames_per_step, 4);
    }
}
