// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: AGPL-3.0-or-later

use glam::Vec2;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::sync::LazyLock;
use strum::{EnumIter, IntoEnumIterator};

/// Side length of the square that bounds the diamond playfield.
pub const SIZE: u8 = 28;

/// Cells per diamond edge.
pub const EDGE_LEN: usize = 14;

/// Grid coordinates, `(0, 0)` at the bottom-left friendly corner.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Cell {
    pub x: u8,
    pub y: u8,
}

impl Cell {
    #[inline]
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// True iff the cell lies inside the diamond.
    #[inline]
    pub fn in_arena(self) -> bool {
        if self.x >= SIZE || self.y >= SIZE {
            return false;
        }
        let x2 = self.x as i32 * 2;
        let y2 = self.y as i32 * 2;
        (x2 - 27).abs() + (y2 - 27).abs() <= 28
    }

    /// Maps a cell to the same cell in the opponent's frame of reference.
    #[inline]
    pub fn reflect(self) -> Self {
        Self::new(27 - self.x, 27 - self.y)
    }

    #[inline]
    pub fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) as u32 + self.y.abs_diff(other.y) as u32
    }

    /// Deterministic distance squared.
    #[inline]
    pub fn distance_squared(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x) as u32;
        let dy = self.y.abs_diff(other.y) as u32;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }

    /// Euclidean distance, used for attack and shield ranges.
    pub fn distance(self, other: Self) -> f32 {
        self.as_vec2().distance(other.as_vec2())
    }

    /// True iff `other` is within Euclidean `radius` of `self`.
    #[inline]
    pub fn within(self, other: Self, radius: f32) -> bool {
        self.distance_squared(other) as f32 <= radius * radius
    }

    /// The four cardinal neighbors that are in the arena, in the fixed
    /// order up, down, right, left.
    pub fn neighbors(self) -> impl Iterator<Item = Cell> + 'static {
        let Cell { x, y } = self;
        [(0i32, 1i32), (0, -1), (1, 0), (-1, 0)]
            .into_iter()
            .filter_map(move |(dx, dy)| {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || ny < 0 {
                    return None;
                }
                let n = Cell::new(nx as u8, ny as u8);
                n.in_arena().then_some(n)
            })
    }

    /// Dense index for 28x28 tables, lexicographic in `(x, y)`.
    #[inline]
    pub fn index(self) -> usize {
        self.x as usize * SIZE as usize + self.y as usize
    }

    /// How far the cell sits from the nearest diamond edge (0 = on an edge).
    pub fn edge_depth(self) -> u32 {
        let x = self.x as i32;
        let y = self.y as i32;
        let depths = [x + y - 13, 41 - x - y, 14 - x + y, 14 + x - y];
        depths.into_iter().min().unwrap().max(0) as u32
    }
}

/// The four diamond edges.
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
    IntoPrimitive,
    TryFromPrimitive,
)]
#[repr(u8)]
pub enum Edge {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

static EDGE_CELLS: LazyLock<[[Cell; EDGE_LEN]; 4]> = LazyLock::new(|| {
    let mut out = [[Cell::default(); EDGE_LEN]; 4];
    for i in 0..EDGE_LEN as u8 {
        out[Edge::TopLeft as usize][i as usize] = Cell::new(i, 14 + i);
        out[Edge::TopRight as usize][i as usize] = Cell::new(14 + i, 27 - i);
        out[Edge::BottomLeft as usize][i as usize] = Cell::new(i, 13 - i);
        out[Edge::BottomRight as usize][i as usize] = Cell::new(14 + i, i);
    }
    out
});

impl Edge {
    pub fn iter() -> impl Iterator<Item = Self> + 'static {
        <Self as IntoEnumIterator>::iter()
    }

    pub fn cells(self) -> &'static [Cell; EDGE_LEN] {
        &EDGE_CELLS[self as usize]
    }

    pub fn contains(self, cell: Cell) -> bool {
        if !cell.in_arena() {
            return false;
        }
        let x = cell.x as i32;
        let y = cell.y as i32;
        match self {
            Self::TopLeft => y - x == 14,
            Self::TopRight => x + y == 41,
            Self::BottomLeft => x + y == 13,
            Self::BottomRight => x - y == 14,
        }
    }

    /// The edge a unit spawned here runs toward (the diagonally opposite one).
    pub fn opposite(self) -> Self {
        match self {
            Self::TopLeft => Self::BottomRight,
            Self::TopRight => Self::BottomLeft,
            Self::BottomLeft => Self::TopRight,
            Self::BottomRight => Self::TopLeft,
        }
    }
}

static CELLS: LazyLock<Vec<Cell>> = LazyLock::new(|| {
    let mut out = Vec::new();
    for x in 0..SIZE {
        for y in 0..SIZE {
            let cell = Cell::new(x, y);
            if cell.in_arena() {
                out.push(cell);
            }
        }
    }
    out
});

/// All in-arena cells in the fixed lexicographic `(x, y)` sweep order.
pub fn cells() -> &'static [Cell] {
    &CELLS
}

/// In-arena cells within Euclidean `radius` of `center`, in sweep order.
/// Walks the bounding box only; no allocation.
pub fn cells_in_radius(center: Cell, radius: f32) -> impl Iterator<Item = Cell> + 'static {
    let r = radius.ceil() as i32;
    let min_x = (center.x as i32 - r).max(0);
    let max_x = (center.x as i32 + r).min(SIZE as i32 - 1);
    let min_y = (center.y as i32 - r).max(0);
    let max_y = (center.y as i32 + r).min(SIZE as i32 - 1);
    (min_x..=max_x).flat_map(move |x| {
        (min_y..=max_y).filter_map(move |y| {
            let cell = Cell::new(x as u8, y as u8);
            (cell.in_arena() && center.within(cell, radius)).then_some(cell)
        })
    })
}

#[cfg(test)]
mod tests {
    use crate::arena::{cells, cells_in_radius, Cell, Edge, EDGE_LEN};

    #[test]
    fn arena_cell_count() {
        // 14 rows per half, widths 2, 4, .., 28.
        assert_eq!(cells().len(), 420);
    }

    #[test]
    fn corners() {
        assert!(Cell::new(0, 13).in_arena());
        assert!(Cell::new(13, 0).in_arena());
        assert!(Cell::new(27, 14).in_arena());
        assert!(Cell::new(14, 27).in_arena());
        assert!(!Cell::new(0, 12).in_arena());
        assert!(!Cell::new(12, 0).in_arena());
        assert!(!Cell::new(27, 27).in_arena());
    }

    #[test]
    fn reflect_involutive() {
        for &cell in cells() {
            assert_eq!(cell.reflect().reflect(), cell);
            assert!(cell.reflect().in_arena());
        }
    }

    #[test]
    fn edges_partition_the_boundary() {
        for edge in Edge::iter() {
            assert_eq!(edge.cells().len(), EDGE_LEN);
            for &cell in edge.cells() {
                assert!(cell.in_arena());
                assert!(edge.contains(cell));
                assert_eq!(cell.edge_depth(), 0);
            }
        }
        assert!(Edge::BottomLeft.contains(Cell::new(13, 0)));
        assert!(Edge::BottomRight.contains(Cell::new(14, 0)));
        assert!(Edge::TopLeft.contains(Cell::new(0, 14)));
        assert!(Edge::TopRight.contains(Cell::new(14, 27)));
    }

    #[test]
    fn reflection_swaps_edges() {
        for &cell in Edge::BottomLeft.cells() {
            assert!(Edge::TopRight.contains(cell.reflect()));
        }
    }

    #[test]
    fn radius_query() {
        let center = Cell::new(13, 13);
        let hits: Vec<_> = cells_in_radius(center, 1.5).collect();
        // Self plus 4 cardinal plus 4 diagonal neighbors.
        assert_eq!(hits.len(), 9);
        assert!(hits.contains(&center));
        assert!(!hits.contains(&Cell::new(15, 13)));
    }

    #[test]
    fn neighbor_order_is_fixed() {
        let n: Vec<_> = Cell::new(13, 13).neighbors().collect();
        assert_eq!(
            n,
            vec![
                Cell::new(13, 14),
                Cell::new(13, 12),
                Cell::new(14, 13),
                Cell::new(12, 13)
            ]
        );
    }
}
