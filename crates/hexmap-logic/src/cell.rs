//! A single map cell: terrain truth plus fog-of-war counters.
//!
//! Cells live in the grid's arena and refer to each other by index. All
//! fields are read through accessors; only the grid (via the rules in
//! `terrain`, `visibility` and `persistence`) writes them.

use crate::coords::{HexCoordinates, HexDirection, WorldPos};
use crate::metrics::{HexMetrics, STREAM_BED_ELEVATION_OFFSET, WATER_ELEVATION_OFFSET};

/// Index of a cell in its grid's arena.
pub type CellIndex = usize;

#[derive(Debug, Clone)]
pub struct HexCell {
    pub(crate) index: CellIndex,
    pub(crate) coordinates: HexCoordinates,
    pub(crate) chunk: usize,
    pub(crate) position: WorldPos,
    pub(crate) neighbors: [Option<CellIndex>; 6],

    pub(crate) terrain_type: u8,
    pub(crate) elevation: i32,
    pub(crate) water_level: i32,
    pub(crate) urban_level: u8,
    pub(crate) farm_level: u8,
    pub(crate) plant_level: u8,
    pub(crate) special_index: u8,
    pub(crate) walled: bool,
    pub(crate) incoming_river: Option<HexDirection>,
    pub(crate) outgoing_river: Option<HexDirection>,
    pub(crate) roads: [bool; 6],

    // Fog of war
    pub(crate) visibility: u32,
    pub(crate) explored: bool,
    pub(crate) explorable: bool,
}

impl HexCell {
    pub(crate) fn new(
        index: CellIndex,
        coordinates: HexCoordinates,
        chunk: usize,
        position: WorldPos,
    ) -> Self {
        Self {
            index,
            coordinates,
            chunk,
            position,
            neighbors: [None; 6],
            terrain_type: 0,
            elevation: 0,
            water_level: 0,
            urban_level: 0,
            farm_level: 0,
            plant_level: 0,
            special_index: 0,
            walled: false,
            incoming_river: None,
            outgoing_river: None,
            roads: [false; 6],
            visibility: 0,
            explored: false,
            explorable: true,
        }
    }

    pub fn index(&self) -> CellIndex {
        self.index
    }

    pub fn coordinates(&self) -> HexCoordinates {
        self.coordinates
    }

    /// Chunk this cell is rendered with.
    pub fn chunk(&self) -> usize {
        self.chunk
    }

    /// Cached world position, including elevation and its jitter.
    pub fn position(&self) -> WorldPos {
        self.position
    }

    pub fn neighbor(&self, direction: HexDirection) -> Option<CellIndex> {
        self.neighbors[direction.index()]
    }

    /// Present neighbors with their directions, in direction order.
    pub fn neighbors(&self) -> impl Iterator<Item = (HexDirection, CellIndex)> + '_ {
        HexDirection::ALL
            .into_iter()
            .filter_map(move |d| self.neighbors[d.index()].map(|n| (d, n)))
    }

    // ── Terrain ─────────────────────────────────────────────────────────

    pub fn terrain_type(&self) -> u8 {
        self.terrain_type
    }

    pub fn elevation(&self) -> i32 {
        self.elevation
    }

    pub fn water_level(&self) -> i32 {
        self.water_level
    }

    pub fn is_underwater(&self) -> bool {
        self.water_level > self.elevation
    }

    /// The higher of terrain elevation and water surface.
    pub fn view_elevation(&self) -> i32 {
        self.elevation.max(self.water_level)
    }

    pub fn urban_level(&self) -> u8 {
        self.urban_level
    }

    pub fn farm_level(&self) -> u8 {
        self.farm_level
    }

    pub fn plant_level(&self) -> u8 {
        self.plant_level
    }

    pub fn special_index(&self) -> u8 {
        self.special_index
    }

    pub fn is_special(&self) -> bool {
        self.special_index > 0
    }

    pub fn walled(&self) -> bool {
        self.walled
    }

    // ── Rivers ──────────────────────────────────────────────────────────

    pub fn incoming_river(&self) -> Option<HexDirection> {
        self.incoming_river
    }

    pub fn outgoing_river(&self) -> Option<HexDirection> {
        self.outgoing_river
    }

    pub fn has_incoming_river(&self) -> bool {
        self.incoming_river.is_some()
    }

    pub fn has_outgoing_river(&self) -> bool {
        self.outgoing_river.is_some()
    }

    pub fn has_river(&self) -> bool {
        self.incoming_river.is_some() || self.outgoing_river.is_some()
    }

    /// Source or mouth of a river: exactly one of incoming/outgoing.
    pub fn has_river_begin_or_end(&self) -> bool {
        self.incoming_river.is_some() != self.outgoing_river.is_some()
    }

    pub fn river_begin_or_end_direction(&self) -> Option<HexDirection> {
        if !self.has_river_begin_or_end() {
            return None;
        }
        self.incoming_river.or(self.outgoing_river)
    }

    pub fn has_river_through_edge(&self, direction: HexDirection) -> bool {
        self.incoming_river == Some(direction) || self.outgoing_river == Some(direction)
    }

    pub fn stream_bed_y(&self, metrics: &HexMetrics) -> f32 {
        (self.elevation as f32 + STREAM_BED_ELEVATION_OFFSET) * metrics.elevation_step
    }

    pub fn river_surface_y(&self, metrics: &HexMetrics) -> f32 {
        (self.elevation as f32 + WATER_ELEVATION_OFFSET) * metrics.elevation_step
    }

    pub fn water_surface_y(&self, metrics: &HexMetrics) -> f32 {
        (self.water_level as f32 + WATER_ELEVATION_OFFSET) * metrics.elevation_step
    }

    // ── Roads ───────────────────────────────────────────────────────────

    pub fn has_road_through_edge(&self, direction: HexDirection) -> bool {
        self.roads[direction.index()]
    }

    pub fn has_roads(&self) -> bool {
        self.roads.iter().any(|&r| r)
    }

    /// Road edges packed as bit `direction` of a byte.
    pub fn road_mask(&self) -> u8 {
        let mut mask = 0u8;
        for (i, &road) in self.roads.iter().enumerate() {
            if road {
                mask |= 1 << i;
            }
        }
        mask
    }

    // ── Fog of war ──────────────────────────────────────────────────────

    /// Number of observers currently seeing this cell.
    pub fn visibility_count(&self) -> u32 {
        self.visibility
    }

    pub fn is_visible(&self) -> bool {
        self.visibility > 0 && self.explorable
    }

    pub fn is_explored(&self) -> bool {
        self.explored && self.explorable
    }

    pub fn is_explorable(&self) -> bool {
        self.explorable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> HexCell {
        HexCell::new(0, HexCoordinates::new(0, 0), 0, WorldPos::default())
    }

    #[test]
    fn underwater_and_view_elevation() {
        let mut c = cell();
        c.elevation = 2;
        c.water_level = 3;
        assert!(c.is_underwater());
        assert_eq!(c.view_elevation(), 3);
        c.water_level = 2;
        assert!(!c.is_underwater());
        assert_eq!(c.view_elevation(), 2);
    }

    #[test]
    fn river_begin_or_end() {
        let mut c = cell();
        assert!(!c.has_river_begin_or_end());
        c.incoming_river = Some(HexDirection::W);
        assert!(c.has_river_begin_or_end());
        assert_eq!(c.river_begin_or_end_direction(), Some(HexDirection::W));
        c.outgoing_river = Some(HexDirection::E);
        assert!(!c.has_river_begin_or_end());
        assert_eq!(c.river_begin_or_end_direction(), None);
        assert!(c.has_river_through_edge(HexDirection::E));
        assert!(!c.has_river_through_edge(HexDirection::NE));
    }

    #[test]
    fn road_mask_bits() {
        let mut c = cell();
        c.roads[HexDirection::NE.index()] = true;
        c.roads[HexDirection::W.index()] = true;
        assert_eq!(c.road_mask(), 0b01_0001);
        assert!(c.has_roads());
    }

    #[test]
    fn unexplorable_hides_state() {
        let mut c = cell();
        c.visibility = 2;
        c.explored = true;
        c.explorable = false;
        assert!(!c.is_visible());
        assert!(!c.is_explored());
        assert_eq!(c.visibility_count(), 2);
    }
}
