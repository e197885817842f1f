//! Units: cell occupants that act as visibility observers.
//!
//! A unit holds exactly one cell and no two units share one. Every
//! registered unit contributes `vision_range` visibility around its
//! location; the grid moves that contribution whenever the unit moves.

use crate::cell::CellIndex;
use crate::grid::HexGrid;
use crate::pathfinding::{move_cost, MovePolicy, Path};
use crate::travel;

pub type UnitId = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct HexUnit {
    id: UnitId,
    location: CellIndex,
    /// Facing around the vertical axis, degrees in `[0, 360)`.
    orientation: f32,
}

impl HexUnit {
    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn location(&self) -> CellIndex {
        self.location
    }

    pub fn orientation(&self) -> f32 {
        self.orientation
    }
}

/// Units ordered by id.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Vec<HexUnit>,
    next_id: UnitId,
}

impl UnitRegistry {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HexUnit> {
        self.units.iter()
    }

    pub fn get(&self, id: UnitId) -> Option<&HexUnit> {
        self.position(id).map(|i| &self.units[i])
    }

    /// Unit standing on a cell.
    pub fn at(&self, cell: CellIndex) -> Option<&HexUnit> {
        self.units.iter().find(|u| u.location == cell)
    }

    fn position(&self, id: UnitId) -> Option<usize> {
        self.units.binary_search_by_key(&id, |u| u.id).ok()
    }

    fn insert(&mut self, location: CellIndex, orientation: f32) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;
        self.units.push(HexUnit {
            id,
            location,
            orientation: normalize_degrees(orientation),
        });
        id
    }

    fn remove(&mut self, id: UnitId) -> Option<HexUnit> {
        self.position(id).map(|i| self.units.remove(i))
    }

    fn get_mut(&mut self, id: UnitId) -> Option<&mut HexUnit> {
        match self.position(id) {
            Some(i) => Some(&mut self.units[i]),
            None => None,
        }
    }
}

fn normalize_degrees(degrees: f32) -> f32 {
    if degrees.is_finite() {
        degrees.rem_euclid(360.0)
    } else {
        0.0
    }
}

impl HexGrid {
    pub fn units(&self) -> &UnitRegistry {
        &self.units
    }

    pub fn unit_at(&self, cell: CellIndex) -> Option<UnitId> {
        self.units.at(cell).map(|u| u.id)
    }

    /// A unit may stand on a cell that is dry and unoccupied.
    pub fn is_valid_destination(&self, cell: CellIndex) -> bool {
        self.cell(cell).is_some_and(|c| !c.is_underwater()) && self.units.at(cell).is_none()
    }

    /// Place a unit and start its vision. `None` if the cell is not a valid
    /// destination.
    pub fn add_unit(&mut self, cell: CellIndex, orientation: f32) -> Option<UnitId> {
        if !self.is_valid_destination(cell) {
            return None;
        }
        let id = self.units.insert(cell, orientation);
        let range = self.config().vision_range;
        self.increase_visibility(cell, range);
        log::debug!("Unit {} added at cell {}", id, cell);
        Some(id)
    }

    /// Remove a unit and withdraw its vision.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<HexUnit> {
        let unit = self.units.remove(id)?;
        let range = self.config().vision_range;
        self.decrease_visibility(unit.location, range);
        Some(unit)
    }

    /// Teleport a unit. Returns false if the unit is unknown or the target is
    /// not a valid destination.
    pub fn move_unit(&mut self, id: UnitId, cell: CellIndex) -> bool {
        let Some(from) = self.units.get(id).map(|u| u.location) else {
            return false;
        };
        if from == cell {
            return true;
        }
        if !self.is_valid_destination(cell) {
            return false;
        }
        self.relocate(id, from, cell);
        true
    }

    /// Move a unit to the end of a path that starts at its location, facing
    /// along the final step. Vision moves from start to goal in one update.
    ///
    /// Every step must cross an edge to a neighbor that `policy` allows.
    pub fn travel(&mut self, id: UnitId, path: &Path, policy: &MovePolicy) -> bool {
        let Some(from) = self.units.get(id).map(|u| u.location) else {
            return false;
        };
        let (Some(start), Some(goal)) = (path.start(), path.goal()) else {
            return false;
        };
        if start != from {
            return false;
        }
        if goal != from && !self.is_valid_destination(goal) {
            return false;
        }
        let walkable = path.cells.windows(2).all(|step| {
            self.direction_between(step[0], step[1])
                .is_some_and(|d| move_cost(self, step[0], d, policy).is_some())
        });
        if !walkable {
            return false;
        }

        let facing = match path.cells.len() {
            n if n >= 2 => {
                let a = self.cells[path.cells[n - 2]].position;
                let b = self.cells[path.cells[n - 1]].position;
                travel::orientation_towards(a, b)
            }
            _ => None,
        };
        self.relocate(id, from, goal);
        if let (Some(degrees), Some(unit)) = (facing, self.units.get_mut(id)) {
            unit.orientation = degrees;
        }
        true
    }

    pub fn set_unit_orientation(&mut self, id: UnitId, degrees: f32) -> bool {
        match self.units.get_mut(id) {
            Some(unit) => {
                unit.orientation = normalize_degrees(degrees);
                true
            }
            None => false,
        }
    }

    fn relocate(&mut self, id: UnitId, from: CellIndex, to: CellIndex) {
        let range = self.config().vision_range;
        self.decrease_visibility(from, range);
        if let Some(unit) = self.units.get_mut(id) {
            unit.location = to;
        }
        self.increase_visibility(to, range);
    }
}
