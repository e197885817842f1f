//! Save/load of map state.
//!
//! Uses bincode. A file is a `u32` format version followed by the body for
//! that version; the version is checked before anything else is read, so an
//! unknown file is rejected without being partially parsed. Each cell is a
//! flat record in a fixed field order. Positions, chunk membership and
//! visibility counts are derived, so they are recomputed on load rather than
//! stored.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::cell::{CellIndex, HexCell};
use crate::config::{ConfigError, MapConfig};
use crate::coords::{HexCoordinates, HexDirection};
use crate::grid::{GridEvents, HexGrid};

/// Current format version (increment when the format changes).
pub const MAP_FORMAT_VERSION: u32 = 2;

/// Version 1: no explored flags, no units.
const LEGACY_VERSION: u32 = 1;

const RIVER_FLAG: u8 = 128;

/// One cell, in on-disk field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    pub terrain_type: u8,
    pub elevation: i32,
    pub water_level: i32,
    pub urban_level: u8,
    pub farm_level: u8,
    pub plant_level: u8,
    pub special_index: u8,
    pub walled: bool,
    /// `0` for none, otherwise `128 + direction`.
    pub incoming_river: u8,
    pub outgoing_river: u8,
    /// Bit `direction` set for each road edge.
    pub roads: u8,
    pub explored: bool,
}

#[derive(Serialize, Deserialize)]
struct LegacyCellRecord {
    terrain_type: u8,
    elevation: i32,
    water_level: i32,
    urban_level: u8,
    farm_level: u8,
    plant_level: u8,
    special_index: u8,
    walled: bool,
    incoming_river: u8,
    outgoing_river: u8,
    roads: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub coordinates: HexCoordinates,
    pub orientation: f32,
}

/// Body of a current-version file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub cell_count_x: u32,
    pub cell_count_z: u32,
    pub cells: Vec<CellRecord>,
    pub units: Vec<UnitRecord>,
}

#[derive(Serialize, Deserialize)]
struct LegacyMapData {
    cell_count_x: u32,
    cell_count_z: u32,
    cells: Vec<LegacyCellRecord>,
}

impl From<LegacyMapData> for MapData {
    fn from(legacy: LegacyMapData) -> Self {
        Self {
            cell_count_x: legacy.cell_count_x,
            cell_count_z: legacy.cell_count_z,
            cells: legacy
                .cells
                .into_iter()
                .map(|c| CellRecord {
                    terrain_type: c.terrain_type,
                    elevation: c.elevation,
                    water_level: c.water_level,
                    urban_level: c.urban_level,
                    farm_level: c.farm_level,
                    plant_level: c.plant_level,
                    special_index: c.special_index,
                    walled: c.walled,
                    incoming_river: c.incoming_river,
                    outgoing_river: c.outgoing_river,
                    roads: c.roads,
                    explored: false,
                })
                .collect(),
            units: Vec::new(),
        }
    }
}

fn encode_river(direction: Option<HexDirection>) -> u8 {
    direction.map_or(0, |d| RIVER_FLAG + d.index() as u8)
}

fn decode_river(byte: u8, cell: CellIndex) -> Result<Option<HexDirection>, SaveError> {
    if byte == 0 {
        return Ok(None);
    }
    byte.checked_sub(RIVER_FLAG)
        .and_then(HexDirection::from_index)
        .map(Some)
        .ok_or(SaveError::Corrupt {
            cell,
            reason: "invalid river direction",
        })
}

impl CellRecord {
    fn capture(cell: &HexCell) -> Self {
        Self {
            terrain_type: cell.terrain_type,
            elevation: cell.elevation,
            water_level: cell.water_level,
            urban_level: cell.urban_level,
            farm_level: cell.farm_level,
            plant_level: cell.plant_level,
            special_index: cell.special_index,
            walled: cell.walled,
            incoming_river: encode_river(cell.incoming_river),
            outgoing_river: encode_river(cell.outgoing_river),
            roads: cell.road_mask(),
            explored: cell.explored,
        }
    }

    fn apply(&self, cell: &mut HexCell) -> Result<(), SaveError> {
        let index = cell.index;
        if self.roads >= 1 << 6 {
            return Err(SaveError::Corrupt {
                cell: index,
                reason: "invalid road mask",
            });
        }
        cell.incoming_river = decode_river(self.incoming_river, index)?;
        cell.outgoing_river = decode_river(self.outgoing_river, index)?;
        cell.terrain_type = self.terrain_type;
        cell.elevation = self.elevation;
        cell.water_level = self.water_level;
        cell.urban_level = self.urban_level;
        cell.farm_level = self.farm_level;
        cell.plant_level = self.plant_level;
        cell.special_index = self.special_index;
        cell.walled = self.walled;
        for (i, road) in cell.roads.iter_mut().enumerate() {
            *road = self.roads & (1 << i) != 0;
        }
        cell.explored = self.explored;
        Ok(())
    }
}

impl MapData {
    /// Snapshot a grid.
    pub fn capture(grid: &HexGrid) -> Self {
        Self {
            cell_count_x: grid.cell_count_x(),
            cell_count_z: grid.cell_count_z(),
            cells: grid.cells().iter().map(CellRecord::capture).collect(),
            units: grid
                .units()
                .iter()
                .map(|u| UnitRecord {
                    coordinates: grid.cells()[u.location()].coordinates(),
                    orientation: u.orientation(),
                })
                .collect(),
        }
    }

    /// Build a grid from this snapshot. The map size comes from the data;
    /// everything else from `config`.
    pub fn restore(&self, mut config: MapConfig) -> Result<HexGrid, SaveError> {
        // Header sizes are untrusted; match them against the records before
        // anything is allocated.
        let expected = (self.cell_count_x as usize).checked_mul(self.cell_count_z as usize);
        if expected != Some(self.cells.len()) {
            return Err(SaveError::SizeMismatch {
                expected: expected.unwrap_or(usize::MAX),
                found: self.cells.len(),
            });
        }
        config.cell_count_x = self.cell_count_x;
        config.cell_count_z = self.cell_count_z;
        let mut grid = HexGrid::new(config).map_err(SaveError::Config)?;

        for (record, cell) in self.cells.iter().zip(grid.cells.iter_mut()) {
            record.apply(cell)?;
        }
        check_edges(&grid)?;
        for index in 0..grid.cell_count() {
            grid.refresh_position(index);
        }

        for unit in &self.units {
            let placed = grid
                .cell_at(unit.coordinates)
                .and_then(|cell| grid.add_unit(cell, unit.orientation));
            if placed.is_none() {
                return Err(SaveError::Corrupt {
                    cell: grid.cell_at(unit.coordinates).unwrap_or(usize::MAX),
                    reason: "unit on an invalid cell",
                });
            }
        }

        // Everything is new to collaborators.
        grid.events = GridEvents::default();
        grid.events.dirty_chunks.extend(0..grid.chunk_count());
        Ok(grid)
    }
}

/// Rivers and roads must be recorded on both sides of their edge.
fn check_edges(grid: &HexGrid) -> Result<(), SaveError> {
    let cells = grid.cells();
    let corrupt = |cell, reason| Err(SaveError::Corrupt { cell, reason });
    for cell in cells {
        if let Some(d) = cell.outgoing_river {
            match cell.neighbor(d) {
                Some(n) if cells[n].incoming_river == Some(d.opposite()) => {}
                _ => return corrupt(cell.index, "unmatched outgoing river"),
            }
        }
        if let Some(d) = cell.incoming_river {
            match cell.neighbor(d) {
                Some(n) if cells[n].outgoing_river == Some(d.opposite()) => {}
                _ => return corrupt(cell.index, "unmatched incoming river"),
            }
        }
        for d in HexDirection::ALL {
            if !cell.has_road_through_edge(d) {
                continue;
            }
            match cell.neighbor(d) {
                Some(n) if cells[n].has_road_through_edge(d.opposite()) => {}
                _ => return corrupt(cell.index, "unmatched road"),
            }
            if cell.has_river_through_edge(d) {
                return corrupt(cell.index, "road and river share an edge");
            }
        }
    }
    Ok(())
}

/// Save the map to a writer.
pub fn save_map<W: Write>(mut writer: W, grid: &HexGrid) -> Result<(), SaveError> {
    let data = MapData::capture(grid);
    bincode::serialize_into(&mut writer, &MAP_FORMAT_VERSION)?;
    bincode::serialize_into(&mut writer, &data)?;
    log::info!(
        "Saved map {}×{} ({} units)",
        data.cell_count_x,
        data.cell_count_z,
        data.units.len()
    );
    Ok(())
}

/// Read a map body of any supported version.
pub fn read_map_data<R: Read>(mut reader: R) -> Result<MapData, SaveError> {
    let version: u32 = bincode::deserialize_from(&mut reader)?;
    match version {
        MAP_FORMAT_VERSION => Ok(bincode::deserialize_from(&mut reader)?),
        LEGACY_VERSION => {
            let legacy: LegacyMapData = bincode::deserialize_from(&mut reader)?;
            Ok(legacy.into())
        }
        found => {
            log::warn!("Rejected map with unsupported format version {}", found);
            Err(SaveError::UnsupportedVersion { found })
        }
    }
}

/// Load a map from a reader, rebuilding derived state.
pub fn load_map<R: Read>(reader: R, config: MapConfig) -> Result<HexGrid, SaveError> {
    let data = read_map_data(reader)?;
    let grid = data.restore(config).inspect_err(|e| log::warn!("Rejected map: {}", e))?;
    log::info!(
        "Loaded map {}×{} ({} units)",
        grid.cell_count_x(),
        grid.cell_count_z(),
        grid.units().len()
    );
    Ok(grid)
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    UnsupportedVersion { found: u32 },
    /// Stored map size is not a valid configuration.
    Config(Vec<ConfigError>),
    SizeMismatch { expected: usize, found: usize },
    Corrupt { cell: CellIndex, reason: &'static str },
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::UnsupportedVersion { found } => write!(
                f,
                "Unsupported map format version {} (current is {})",
                found, MAP_FORMAT_VERSION
            ),
            SaveError::Config(errors) => {
                write!(f, "Invalid map configuration:")?;
                for e in errors {
                    write!(f, " {};", e)?;
                }
                Ok(())
            }
            SaveError::SizeMismatch { expected, found } => {
                write!(f, "Map has {} cell records, expected {}", found, expected)
            }
            SaveError::Corrupt { cell, reason } => {
                write!(f, "Corrupt map data at cell {}: {}", cell, reason)
            }
        }
    }
}

impl std::error::Error for SaveError {}
