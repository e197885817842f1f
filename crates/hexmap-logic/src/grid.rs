//! The cell arena: construction, lookup, adjacency, and change tracking.
//!
//! `HexGrid` owns every cell in a flat `Vec`, indexed row-major by offset
//! coordinates. Neighbor links are indices into that arena and are always
//! mutual. Mutation rules live in `terrain`; this module only provides the
//! scaffolding they share: refresh bookkeeping and the events collaborators
//! drain after each edit.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cell::{CellIndex, HexCell};
use crate::config::{validate_config, ConfigError, MapConfig};
use crate::coords::{HexCoordinates, HexDirection, WorldPos};
use crate::metrics::{EdgeType, HexMetrics, TerrainNoise};
use crate::pathfinding::Pathfinder;
use crate::units::UnitRegistry;
use crate::visibility::{Observer, VisionSearch};

/// Change notifications accumulated since the last drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridEvents {
    /// Chunks whose meshes must be rebuilt.
    pub dirty_chunks: BTreeSet<usize>,
    /// Cells whose terrain, river, road or feature state changed.
    pub changed_cells: BTreeSet<CellIndex>,
    /// Cells whose visible/explored state changed.
    pub visibility_changed: BTreeSet<CellIndex>,
}

impl GridEvents {
    pub fn is_empty(&self) -> bool {
        self.dirty_chunks.is_empty()
            && self.changed_cells.is_empty()
            && self.visibility_changed.is_empty()
    }
}

pub struct HexGrid {
    config: MapConfig,
    noise: Arc<TerrainNoise>,
    chunk_count_x: u32,
    chunk_count_z: u32,
    pub(crate) cells: Vec<HexCell>,
    pub(crate) events: GridEvents,
    pub(crate) units: UnitRegistry,
    pub(crate) vision: VisionSearch,
    pub(crate) observers: Vec<Observer>,
    pub(crate) pathfinder: Pathfinder,
}

impl HexGrid {
    /// Build a flat grid at elevation 0 from a configuration.
    pub fn new(config: MapConfig) -> Result<Self, Vec<ConfigError>> {
        let noise = Arc::new(TerrainNoise::new(config.seed, &config.metrics));
        Self::with_noise(config, noise)
    }

    /// Build a grid sharing an existing noise source.
    pub fn with_noise(config: MapConfig, noise: Arc<TerrainNoise>) -> Result<Self, Vec<ConfigError>> {
        let errors = validate_config(&config);
        if !errors.is_empty() {
            return Err(errors);
        }

        let m = &config.metrics;
        let chunk_count_x = config.cell_count_x.div_ceil(m.chunk_size_x);
        let chunk_count_z = config.cell_count_z.div_ceil(m.chunk_size_z);
        let count = (config.cell_count_x * config.cell_count_z) as usize;

        let mut grid = Self {
            chunk_count_x,
            chunk_count_z,
            cells: Vec::with_capacity(count),
            events: GridEvents::default(),
            units: UnitRegistry::default(),
            vision: VisionSearch::default(),
            observers: Vec::new(),
            pathfinder: Pathfinder::default(),
            noise,
            config,
        };

        for row in 0..grid.config.cell_count_z {
            for column in 0..grid.config.cell_count_x {
                let index = grid.cells.len();
                let coordinates = HexCoordinates::from_offset(column as i32, row as i32);
                let chunk = (column / grid.config.metrics.chunk_size_x
                    + (row / grid.config.metrics.chunk_size_z) * chunk_count_x)
                    as usize;
                let (wx, wz) = coordinates.to_world(grid.config.metrics.outer_radius);
                grid.cells.push(HexCell::new(
                    index,
                    coordinates,
                    chunk,
                    WorldPos::new(wx, 0.0, wz),
                ));
                grid.refresh_position(index);
            }
        }
        grid.connect_neighbors();

        log::info!(
            "Built hex grid {}×{} ({} cells, {} chunks, seed {})",
            grid.config.cell_count_x,
            grid.config.cell_count_z,
            grid.cells.len(),
            grid.chunk_count(),
            grid.noise.seed()
        );
        Ok(grid)
    }

    fn connect_neighbors(&mut self) {
        for index in 0..self.cells.len() {
            let coordinates = self.cells[index].coordinates;
            // Linking W, SW and SE from each cell covers every edge once;
            // set_neighbor mirrors the other three.
            for direction in [HexDirection::W, HexDirection::SW, HexDirection::SE] {
                if let Some(other) = self.cell_at(coordinates.neighbor(direction)) {
                    self.set_neighbor(index, direction, other);
                }
            }
        }
    }

    fn set_neighbor(&mut self, index: CellIndex, direction: HexDirection, other: CellIndex) {
        self.cells[index].neighbors[direction.index()] = Some(other);
        self.cells[other].neighbors[direction.opposite().index()] = Some(index);
    }

    // ── Configuration ───────────────────────────────────────────────────

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn metrics(&self) -> &HexMetrics {
        &self.config.metrics
    }

    pub fn noise(&self) -> &Arc<TerrainNoise> {
        &self.noise
    }

    pub fn cell_count_x(&self) -> u32 {
        self.config.cell_count_x
    }

    pub fn cell_count_z(&self) -> u32 {
        self.config.cell_count_z
    }

    pub fn chunk_count(&self) -> usize {
        (self.chunk_count_x * self.chunk_count_z) as usize
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    pub fn cell(&self, index: CellIndex) -> Option<&HexCell> {
        self.cells.get(index)
    }

    pub fn cell_at_offset(&self, column: i32, row: i32) -> Option<CellIndex> {
        if column < 0
            || row < 0
            || column >= self.config.cell_count_x as i32
            || row >= self.config.cell_count_z as i32
        {
            return None;
        }
        Some((column + row * self.config.cell_count_x as i32) as usize)
    }

    pub fn cell_at(&self, coordinates: HexCoordinates) -> Option<CellIndex> {
        let (column, row) = coordinates.to_offset();
        self.cell_at_offset(column, row)
    }

    /// Cell under a map-local world position (ground plane `x`, `z`).
    pub fn cell_at_position(&self, x: f32, z: f32) -> Option<CellIndex> {
        self.cell_at(HexCoordinates::from_position(
            x,
            z,
            self.config.metrics.outer_radius,
        ))
    }

    pub fn neighbor(&self, index: CellIndex, direction: HexDirection) -> Option<CellIndex> {
        self.cells.get(index)?.neighbor(direction)
    }

    /// Direction of the edge shared by two adjacent cells.
    pub fn direction_between(&self, from: CellIndex, to: CellIndex) -> Option<HexDirection> {
        HexDirection::ALL
            .into_iter()
            .find(|&d| self.neighbor(from, d) == Some(to))
    }

    pub fn edge_type(&self, index: CellIndex, direction: HexDirection) -> Option<EdgeType> {
        let other = self.neighbor(index, direction)?;
        self.edge_type_between(index, other)
    }

    pub fn edge_type_between(&self, a: CellIndex, b: CellIndex) -> Option<EdgeType> {
        let (a, b) = (self.cells.get(a)?, self.cells.get(b)?);
        Some(self.config.metrics.edge_type(a.elevation, b.elevation))
    }

    /// Absolute elevation difference across an edge.
    pub fn elevation_difference(&self, index: CellIndex, direction: HexDirection) -> Option<i32> {
        let other = self.neighbor(index, direction)?;
        Some((self.cells[index].elevation - self.cells[other].elevation).abs())
    }

    /// Cells belonging to a chunk, in index order.
    pub fn chunk_cells(&self, chunk: usize) -> Vec<CellIndex> {
        self.cells
            .iter()
            .filter(|c| c.chunk == chunk)
            .map(|c| c.index)
            .collect()
    }

    // ── Change tracking ─────────────────────────────────────────────────

    /// Take all notifications accumulated since the previous call.
    pub fn drain_events(&mut self) -> GridEvents {
        std::mem::take(&mut self.events)
    }

    /// Mark the cell's chunk, and neighboring chunks it borders, dirty.
    pub(crate) fn refresh(&mut self, index: CellIndex) {
        let chunk = self.cells[index].chunk;
        self.events.dirty_chunks.insert(chunk);
        self.events.changed_cells.insert(index);
        for (_, n) in self.cells[index].neighbors() {
            let other = self.cells[n].chunk;
            if other != chunk {
                self.events.dirty_chunks.insert(other);
            }
        }
    }

    /// Mark only the cell's own chunk dirty.
    pub(crate) fn refresh_self_only(&mut self, index: CellIndex) {
        self.events.dirty_chunks.insert(self.cells[index].chunk);
        self.events.changed_cells.insert(index);
    }

    /// Recompute the cached world height from elevation plus jitter.
    pub(crate) fn refresh_position(&mut self, index: CellIndex) {
        let m = &self.config.metrics;
        let cell = &self.cells[index];
        let base = WorldPos::new(cell.position.x, 0.0, cell.position.z);
        let y = cell.elevation as f32 * m.elevation_step
            + self.noise.elevation_jitter(base, m.elevation_perturb_strength);
        self.cells[index].position.y = y;
    }
}
