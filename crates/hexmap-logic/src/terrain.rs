//! Terrain editing rules: elevation, water, rivers, roads, features.
//!
//! Every setter is a silent no-op when the edit is invalid or changes
//! nothing; callers that need to know in advance probe the predicates
//! (`is_valid_river_destination`, `can_add_road`). Paired edge state (rivers,
//! roads) is always written on both endpoints before any refresh is queued,
//! and a change to a cell's view elevation rebuilds fog of war for all units.

use crate::cell::CellIndex;
use crate::coords::HexDirection;
use crate::grid::HexGrid;

impl HexGrid {
    // ── Predicates ──────────────────────────────────────────────────────

    /// Whether a river may flow from `index` across `direction`.
    pub fn is_valid_river_destination(&self, index: CellIndex, direction: HexDirection) -> bool {
        match self.neighbor(index, direction) {
            Some(to) => self.river_flows(index, to),
            None => false,
        }
    }

    /// Downhill, level, or out of a lake whose surface meets the target.
    fn river_flows(&self, from: CellIndex, to: CellIndex) -> bool {
        let (a, b) = (&self.cells[from], &self.cells[to]);
        a.elevation >= b.elevation || a.water_level == b.elevation
    }

    /// Whether `add_road(index, direction)` would take effect.
    pub fn can_add_road(&self, index: CellIndex, direction: HexDirection) -> bool {
        let Some(cell) = self.cells.get(index) else {
            return false;
        };
        let Some(other) = cell.neighbor(direction) else {
            return false;
        };
        !cell.has_road_through_edge(direction)
            && !cell.has_river_through_edge(direction)
            && !cell.is_special()
            && !self.cells[other].is_special()
            && (cell.elevation - self.cells[other].elevation).abs()
                <= self.metrics().max_road_climb
    }

    // ── Elevation & water ───────────────────────────────────────────────

    pub fn set_elevation(&mut self, index: CellIndex, elevation: i32) {
        let Some(cell) = self.cells.get_mut(index) else {
            return;
        };
        if cell.elevation == elevation {
            return;
        }
        let original_view = cell.view_elevation();
        cell.elevation = elevation;
        self.refresh_position(index);
        self.validate_rivers(index);

        let max_climb = self.metrics().max_road_climb;
        for direction in HexDirection::ALL {
            if self.cells[index].has_road_through_edge(direction)
                && self
                    .elevation_difference(index, direction)
                    .is_some_and(|diff| diff > max_climb)
            {
                self.set_road(index, direction, false);
            }
        }

        self.refresh(index);
        if self.cells[index].view_elevation() != original_view {
            self.rebuild_visibility();
        }
    }

    pub fn set_water_level(&mut self, index: CellIndex, water_level: i32) {
        let Some(cell) = self.cells.get_mut(index) else {
            return;
        };
        if cell.water_level == water_level {
            return;
        }
        let original_view = cell.view_elevation();
        cell.water_level = water_level;
        self.validate_rivers(index);
        self.refresh(index);
        if self.cells[index].view_elevation() != original_view {
            self.rebuild_visibility();
        }
    }

    fn validate_rivers(&mut self, index: CellIndex) {
        if let Some(direction) = self.cells[index].outgoing_river {
            if !self.is_valid_river_destination(index, direction) {
                self.remove_outgoing_river(index);
            }
        }
        if let Some(direction) = self.cells[index].incoming_river {
            let valid = self
                .neighbor(index, direction)
                .is_some_and(|from| self.river_flows(from, index));
            if !valid {
                self.remove_incoming_river(index);
            }
        }
    }

    // ── Features ────────────────────────────────────────────────────────

    pub fn set_terrain_type(&mut self, index: CellIndex, terrain_type: u8) {
        if let Some(cell) = self.cells.get_mut(index) {
            if cell.terrain_type != terrain_type {
                cell.terrain_type = terrain_type;
                self.refresh_self_only(index);
            }
        }
    }

    pub fn set_urban_level(&mut self, index: CellIndex, level: u8) {
        if let Some(cell) = self.cells.get_mut(index) {
            if cell.urban_level != level {
                cell.urban_level = level;
                self.refresh_self_only(index);
            }
        }
    }

    pub fn set_farm_level(&mut self, index: CellIndex, level: u8) {
        if let Some(cell) = self.cells.get_mut(index) {
            if cell.farm_level != level {
                cell.farm_level = level;
                self.refresh_self_only(index);
            }
        }
    }

    pub fn set_plant_level(&mut self, index: CellIndex, level: u8) {
        if let Some(cell) = self.cells.get_mut(index) {
            if cell.plant_level != level {
                cell.plant_level = level;
                self.refresh_self_only(index);
            }
        }
    }

    /// Place or clear a special feature. Refused while a river touches the
    /// cell; placing one removes the cell's roads.
    pub fn set_special_index(&mut self, index: CellIndex, special_index: u8) {
        let Some(cell) = self.cells.get_mut(index) else {
            return;
        };
        if cell.special_index == special_index || cell.has_river() {
            return;
        }
        cell.special_index = special_index;
        self.remove_roads(index);
        self.refresh_self_only(index);
    }

    pub fn set_walled(&mut self, index: CellIndex, walled: bool) {
        if let Some(cell) = self.cells.get_mut(index) {
            if cell.walled != walled {
                cell.walled = walled;
                self.refresh(index);
            }
        }
    }

    // ── Rivers ──────────────────────────────────────────────────────────

    pub fn set_outgoing_river(&mut self, index: CellIndex, direction: HexDirection) {
        let Some(cell) = self.cells.get(index) else {
            return;
        };
        if cell.outgoing_river == Some(direction) {
            return;
        }
        let Some(neighbor) = cell.neighbor(direction) else {
            return;
        };
        if !self.river_flows(index, neighbor) {
            return;
        }

        self.remove_outgoing_river(index);
        if self.cells[index].incoming_river == Some(direction) {
            self.remove_incoming_river(index);
        }
        self.remove_incoming_river(neighbor);

        let cell = &mut self.cells[index];
        cell.outgoing_river = Some(direction);
        cell.special_index = 0;
        let other = &mut self.cells[neighbor];
        other.incoming_river = Some(direction.opposite());
        other.special_index = 0;

        if self.cells[index].has_road_through_edge(direction) {
            self.set_road(index, direction, false);
        }
        self.refresh_self_only(index);
        self.refresh_self_only(neighbor);
    }

    pub fn remove_outgoing_river(&mut self, index: CellIndex) {
        let Some(direction) = self.cells.get(index).and_then(|c| c.outgoing_river) else {
            return;
        };
        self.cells[index].outgoing_river = None;
        if let Some(neighbor) = self.neighbor(index, direction) {
            self.cells[neighbor].incoming_river = None;
            self.refresh_self_only(neighbor);
        }
        self.refresh_self_only(index);
    }

    pub fn remove_incoming_river(&mut self, index: CellIndex) {
        let Some(direction) = self.cells.get(index).and_then(|c| c.incoming_river) else {
            return;
        };
        self.cells[index].incoming_river = None;
        if let Some(neighbor) = self.neighbor(index, direction) {
            self.cells[neighbor].outgoing_river = None;
            self.refresh_self_only(neighbor);
        }
        self.refresh_self_only(index);
    }

    pub fn remove_river(&mut self, index: CellIndex) {
        self.remove_outgoing_river(index);
        self.remove_incoming_river(index);
    }

    // ── Roads ───────────────────────────────────────────────────────────

    pub fn add_road(&mut self, index: CellIndex, direction: HexDirection) {
        if self.can_add_road(index, direction) {
            self.set_road(index, direction, true);
        }
    }

    pub fn remove_roads(&mut self, index: CellIndex) {
        if index >= self.cells.len() {
            return;
        }
        for direction in HexDirection::ALL {
            if self.cells[index].has_road_through_edge(direction) {
                self.set_road(index, direction, false);
            }
        }
    }

    /// Write a road flag on both endpoints of an edge.
    fn set_road(&mut self, index: CellIndex, direction: HexDirection, state: bool) {
        let Some(neighbor) = self.neighbor(index, direction) else {
            return;
        };
        self.cells[index].roads[direction.index()] = state;
        self.cells[neighbor].roads[direction.opposite().index()] = state;
        self.refresh_self_only(neighbor);
        self.refresh_self_only(index);
    }

    // ── Fog of war flags ────────────────────────────────────────────────

    /// Cells that are not explorable never report visible or explored.
    pub fn set_explorable(&mut self, index: CellIndex, explorable: bool) {
        if let Some(cell) = self.cells.get_mut(index) {
            if cell.explorable != explorable {
                cell.explorable = explorable;
                self.events.visibility_changed.insert(index);
            }
        }
    }
}
