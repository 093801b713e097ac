// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::arena::{self, Cell, SIZE};
use crate::unit::{Catalog, Side, Unit, UnitKind};
use smallvec::SmallVec;

/// Per-cell shortlist of unit ids, in insertion order.
pub type CellUnits = SmallVec<[u32; 4]>;

#[derive(Clone, Debug, PartialEq)]
struct Slot {
    unit: Unit,
    live: bool,
}

/// All units on the board. Units live in a flat arena indexed by id;
/// dead units are tombstoned, not moved, so ids stay stable within a
/// turn. The grid holds id shortlists per cell. Cloning the map is the
/// deep copy the simulator runs on.
#[derive(Clone, Debug, PartialEq)]
pub struct GameMap {
    slots: Vec<Slot>,
    pub(crate) grid: Vec<CellUnits>,
}

impl Default for GameMap {
    fn default() -> Self {
        Self::new()
    }
}

impl GameMap {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            grid: vec![CellUnits::new(); SIZE as usize * SIZE as usize],
        }
    }

    pub fn unit(&self, id: u32) -> &Unit {
        let slot = &self.slots[id as usize];
        debug_assert!(slot.live);
        &slot.unit
    }

    pub fn unit_mut(&mut self, id: u32) -> &mut Unit {
        let slot = &mut self.slots[id as usize];
        debug_assert!(slot.live);
        &mut slot.unit
    }

    pub fn is_live(&self, id: u32) -> bool {
        self.slots[id as usize].live
    }

    /// Live unit ids at `cell`, insertion order.
    pub fn ids_at(&self, cell: Cell) -> impl Iterator<Item = u32> + '_ {
        self.grid[cell.index()].iter().copied()
    }

    pub fn units_at(&self, cell: Cell) -> impl Iterator<Item = (u32, &Unit)> + '_ {
        self.ids_at(cell).map(move |id| (id, self.unit(id)))
    }

    pub fn contains_structure(&self, cell: Cell) -> bool {
        self.structure_at(cell).is_some()
    }

    pub fn structure_at(&self, cell: Cell) -> Option<(u32, &Unit)> {
        self.units_at(cell).find(|(_, u)| u.is_structure())
    }

    /// Places a fresh unit. Structures may not overlap structures.
    pub fn add_unit(
        &mut self,
        kind: UnitKind,
        side: Side,
        cell: Cell,
        catalog: &Catalog,
    ) -> Result<u32, &'static str> {
        if !cell.in_arena() {
            return Err("outside arena");
        }
        if self.contains_structure(cell) {
            return Err("structure in the way");
        }
        let unit = if kind.is_structure() {
            Unit::structure(kind, side, cell, catalog)
        } else {
            Unit::mobile(kind, side, cell, catalog)
        };
        Ok(self.push(unit))
    }

    /// Places a unit carrying externally determined state (wire health,
    /// simulator successor rebuilds).
    pub fn add_existing_unit(&mut self, unit: Unit) -> u32 {
        debug_assert!(unit.cell.in_arena());
        self.push(unit)
    }

    fn push(&mut self, unit: Unit) -> u32 {
        let id = self.slots.len() as u32;
        self.grid[unit.cell.index()].push(id);
        self.slots.push(Slot { unit, live: true });
        id
    }

    /// Tombstones the unit and unlinks it from its cell.
    pub fn remove(&mut self, id: u32) {
        let slot = &mut self.slots[id as usize];
        debug_assert!(slot.live);
        slot.live = false;
        let cell = slot.unit.cell;
        self.grid[cell.index()].retain(|&mut i| i != id);
    }

    /// All live units in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Unit)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.live)
            .map(|(i, s)| (i as u32, &s.unit))
    }

    pub fn count(&self, side: Side, kind: UnitKind) -> usize {
        self.iter()
            .filter(|(_, u)| u.side == side && u.kind == kind)
            .count()
    }

    pub fn any_mobile(&self) -> bool {
        self.iter().any(|(_, u)| !u.is_structure())
    }

    /// In-range lookup, spec'd O(radius^2) per call.
    pub fn locations_in_range(cell: Cell, radius: f32) -> impl Iterator<Item = Cell> + 'static {
        arena::cells_in_radius(cell, radius)
    }
}

#[cfg(test)]
mod tests {
    use crate::arena::Cell;
    use crate::map::GameMap;
    use crate::unit::{Catalog, Side, UnitKind};

    #[test]
    fn structures_occupy_alone() {
        let catalog = Catalog::standard();
        let mut map = GameMap::new();
        let cell = Cell::new(13, 6);
        map.add_unit(UnitKind::Wall, Side::Bottom, cell, &catalog)
            .unwrap();
        assert_eq!(
            map.add_unit(UnitKind::Turret, Side::Bottom, cell, &catalog),
            Err("structure in the way")
        );
        assert!(map.contains_structure(cell));
    }

    #[test]
    fn mobiles_stack_in_insertion_order() {
        let catalog = Catalog::standard();
        let mut map = GameMap::new();
        let cell = Cell::new(13, 0);
        let a = map
            .add_unit(UnitKind::Scout, Side::Bottom, cell, &catalog)
            .unwrap();
        let b = map
            .add_unit(UnitKind::Scout, Side::Bottom, cell, &catalog)
            .unwrap();
        let ids: Vec<_> = map.ids_at(cell).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn removal_tombstones() {
        let catalog = Catalog::standard();
        let mut map = GameMap::new();
        let cell = Cell::new(13, 0);
        let a = map
            .add_unit(UnitKind::Scout, Side::Bottom, cell, &catalog)
            .unwrap();
        let b = map
            .add_unit(UnitKind::Scout, Side::Bottom, cell, &catalog)
            .unwrap();
        map.remove(a);
        assert!(!map.is_live(a));
        assert!(map.is_live(b));
        let ids: Vec<_> = map.ids_at(cell).collect();
        assert_eq!(ids, vec![b]);
        // Ids are stable across removals.
        assert_eq!(map.unit(b).kind, UnitKind::Scout);
    }

    #[test]
    fn out_of_arena_rejected() {
        let catalog = Catalog::standard();
        let mut map = GameMap::new();
        assert!(map
            .add_unit(UnitKind::Wall, Side::Bottom, Cell::new(0, 0), &catalog)
            .is_err());
    }
}
