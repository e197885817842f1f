//! Hex coordinate system: offset grid, cube coordinates, world positions.
//!
//! Cells are laid out in rows of "pointy-top" hexagons. Storage uses the
//! offset (column, row) pair, while all adjacency and distance math uses
//! cube coordinates where `x + y + z == 0`. Only `x` and `z` are stored;
//! `y` is always derived, so the sum-to-zero invariant cannot be broken.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six edges of a hex cell, clockwise from north-east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HexDirection {
    NE = 0,
    E = 1,
    SE = 2,
    SW = 3,
    W = 4,
    NW = 5,
}

impl HexDirection {
    /// All directions in index order. Search code iterates this for
    /// deterministic tie-breaking.
    pub const ALL: [HexDirection; 6] = [
        HexDirection::NE,
        HexDirection::E,
        HexDirection::SE,
        HexDirection::SW,
        HexDirection::W,
        HexDirection::NW,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Self {
        Self::ALL[(self.index() + 3) % 6]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + 5) % 6]
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % 6]
    }

    /// Cube offset `(dx, dz)` of the neighbor in this direction.
    fn cube_offset(self) -> (i32, i32) {
        match self {
            HexDirection::NE => (0, 1),
            HexDirection::E => (1, 0),
            HexDirection::SE => (1, -1),
            HexDirection::SW => (0, -1),
            HexDirection::W => (-1, 0),
            HexDirection::NW => (-1, 1),
        }
    }
}

/// Cube coordinates of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HexCoordinates {
    x: i32,
    z: i32,
}

impl HexCoordinates {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        -self.x - self.z
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    /// Convert an offset `(column, row)` pair. Odd rows are shifted half a
    /// cell to the east.
    pub fn from_offset(column: i32, row: i32) -> Self {
        Self::new(column - row.div_euclid(2), row)
    }

    /// Inverse of [`HexCoordinates::from_offset`].
    pub fn to_offset(&self) -> (i32, i32) {
        (self.x + self.z.div_euclid(2), self.z)
    }

    pub fn neighbor(&self, direction: HexDirection) -> Self {
        let (dx, dz) = direction.cube_offset();
        Self::new(self.x + dx, self.z + dz)
    }

    /// Number of steps between two cells on an unobstructed grid.
    pub fn distance_to(&self, other: &HexCoordinates) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y() - other.y()).unsigned_abs();
        let dz = (self.z - other.z).unsigned_abs();
        (dx + dy + dz) / 2
    }

    /// World-space centre of the cell on the ground plane, as `(x, z)`.
    pub fn to_world(&self, outer_radius: f32) -> (f32, f32) {
        let inner = outer_radius * crate::metrics::OUTER_TO_INNER;
        let wx = (self.x as f32 + self.z as f32 * 0.5) * inner * 2.0;
        let wz = self.z as f32 * outer_radius * 1.5;
        (wx, wz)
    }

    /// Find the cell containing a world-space point.
    ///
    /// Rounds each cube axis independently; if the rounded triple does not
    /// sum to zero, the axis with the largest rounding error is rebuilt from
    /// the other two.
    pub fn from_position(wx: f32, wz: f32, outer_radius: f32) -> Self {
        let inner = outer_radius * crate::metrics::OUTER_TO_INNER;
        let mut x = wx / (inner * 2.0);
        let mut y = -x;
        let offset = wz / (outer_radius * 3.0);
        x -= offset;
        y -= offset;
        let z = -x - y;

        let mut ix = x.round() as i32;
        let iy = y.round() as i32;
        let mut iz = z.round() as i32;

        if ix + iy + iz != 0 {
            let dx = (x - ix as f32).abs();
            let dy = (y - iy as f32).abs();
            let dz = (z - iz as f32).abs();
            if dx > dy && dx > dz {
                ix = -iy - iz;
            } else if dz > dy {
                iz = -ix - iy;
            }
        }

        Self::new(ix, iz)
    }
}

/// A point in map-local world space. `y` is up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPos {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn lerp(self, other: WorldPos, t: f32) -> WorldPos {
        WorldPos::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    pub fn distance(self, other: WorldPos) -> f32 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for HexCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y(), self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_roundtrip_is_identity() {
        for row in -6..12 {
            for column in -6..12 {
                let c = HexCoordinates::from_offset(column, row);
                assert_eq!(c.x() + c.y() + c.z(), 0);
                assert_eq!(c.to_offset(), (column, row));
            }
        }
    }

    #[test]
    fn opposite_is_involution() {
        for d in HexDirection::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_ne!(d.opposite(), d);
            assert_eq!(d.next().previous(), d);
        }
        assert_eq!(HexDirection::NE.opposite(), HexDirection::SW);
        assert_eq!(HexDirection::E.opposite(), HexDirection::W);
    }

    #[test]
    fn neighbor_and_back() {
        let origin = HexCoordinates::from_offset(3, 3);
        for d in HexDirection::ALL {
            let n = origin.neighbor(d);
            assert_eq!(origin.distance_to(&n), 1);
            assert_eq!(n.neighbor(d.opposite()), origin);
        }
    }

    #[test]
    fn distance_along_row() {
        let a = HexCoordinates::from_offset(0, 0);
        let b = HexCoordinates::from_offset(4, 0);
        assert_eq!(a.distance_to(&b), 4);
        assert_eq!(b.distance_to(&a), 4);
    }

    #[test]
    fn distance_diagonal() {
        // Two rows up from an even row, same column, is two steps away.
        let a = HexCoordinates::from_offset(2, 0);
        let b = HexCoordinates::from_offset(2, 2);
        assert_eq!(a.distance_to(&b), 2);
    }

    #[test]
    fn position_roundtrip_at_centres() {
        for row in 0..8 {
            for column in 0..8 {
                let c = HexCoordinates::from_offset(column, row);
                let (wx, wz) = c.to_world(10.0);
                assert_eq!(HexCoordinates::from_position(wx, wz, 10.0), c);
            }
        }
    }

    #[test]
    fn position_near_edge_stays_valid() {
        // Points off-centre still resolve to a valid triple.
        let c = HexCoordinates::from_offset(2, 1);
        let (wx, wz) = c.to_world(10.0);
        for (ox, oz) in [(3.0, 2.0), (-4.0, 3.0), (2.0, -5.0), (-6.0, -1.0)] {
            let hit = HexCoordinates::from_position(wx + ox, wz + oz, 10.0);
            assert_eq!(hit.x() + hit.y() + hit.z(), 0);
            assert_eq!(hit, c);
        }
    }

    #[test]
    fn display_shows_cube_triple() {
        let c = HexCoordinates::new(1, 2);
        assert_eq!(c.to_string(), "(1, -3, 2)");
    }
}
