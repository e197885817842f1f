//! Map configuration: grid size, seed, metrics, and the movement cost table.
//!
//! Everything a grid needs at construction lives in `MapConfig`. The harness
//! loads it from JSON; missing fields fall back to the defaults below.
//!
//! ```
//! use hexmap_logic::config::{validate_config, MapConfig};
//!
//! let mut config = MapConfig::default();
//! config.cell_count_x = 10;
//! config.cell_count_z = 10;
//! assert!(validate_config(&config).is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::metrics::HexMetrics;

/// Largest grid `validate_config` accepts, in cells.
pub const MAX_CELLS: u64 = 1 << 22;

/// Largest single cost-table entry. Bucket-queue priorities are sums of
/// these, so they must stay small.
pub const MAX_MOVE_COST: u32 = 1000;

/// Terrain type indices used by the default cost table.
pub mod terrain_types {
    pub const SAND: u8 = 0;
    pub const GRASS: u8 = 1;
    pub const MUD: u8 = 2;
    pub const STONE: u8 = 3;
    pub const SNOW: u8 = 4;
}

/// Per-step movement costs. All values are integer cost units.
///
/// | Entry | Default |
/// |-------|---------|
/// | sand / grass / mud / stone / snow | 5 / 5 / 8 / 6 / 7 |
/// | unknown terrain type | 5 |
/// | slope penalty | +5 |
/// | river crossing penalty | +5 |
/// | cliff penalty (only when cliffs are passable) | +15 |
/// | road (replaces everything above) | 1 |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveCosts {
    /// Cost of entering a cell, indexed by its terrain type.
    pub terrain: Vec<u32>,
    /// Cost for terrain types past the end of `terrain`.
    pub fallback: u32,
    pub slope_penalty: u32,
    pub river_penalty: u32,
    pub cliff_penalty: u32,
    pub road: u32,
}

impl Default for MoveCosts {
    fn default() -> Self {
        Self {
            terrain: vec![5, 5, 8, 6, 7],
            fallback: 5,
            slope_penalty: 5,
            river_penalty: 5,
            cliff_penalty: 15,
            road: 1,
        }
    }
}

impl MoveCosts {
    pub fn terrain_cost(&self, terrain_type: u8) -> u32 {
        self.terrain
            .get(terrain_type as usize)
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Cheapest possible single step, the per-step factor of the heuristic.
    pub fn min_step(&self, roads: bool) -> u32 {
        let terrain_min = self
            .terrain
            .iter()
            .copied()
            .chain(std::iter::once(self.fallback))
            .min()
            .unwrap_or(self.fallback);
        if roads {
            terrain_min.min(self.road)
        } else {
            terrain_min
        }
    }
}

/// Everything needed to build a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub cell_count_x: u32,
    pub cell_count_z: u32,
    /// Seed for elevation noise and the hash grid.
    pub seed: u64,
    pub metrics: HexMetrics,
    pub move_costs: MoveCosts,
    /// How far (in cells) a unit sees.
    pub vision_range: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cell_count_x: 20,
            cell_count_z: 15,
            seed: 1234,
            metrics: HexMetrics::default(),
            move_costs: MoveCosts::default(),
            vision_range: 3,
        }
    }
}

impl MapConfig {
    /// Default config with a different grid size.
    pub fn with_size(cell_count_x: u32, cell_count_z: u32) -> Self {
        Self {
            cell_count_x,
            cell_count_z,
            ..Self::default()
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Grid has no cells along an axis.
    EmptyGrid { cell_count_x: u32, cell_count_z: u32 },
    /// Grid has more than [`MAX_CELLS`] cells.
    GridTooLarge { cell_count_x: u32, cell_count_z: u32 },
    /// Chunk dimension of zero.
    InvalidChunkSize { chunk_size_x: u32, chunk_size_z: u32 },
    /// Negative slope limit or road climb.
    NegativeLimit(&'static str),
    /// A movement cost of zero would break the bucket queue's ordering.
    ZeroMoveCost(&'static str),
    /// A movement cost above [`MAX_MOVE_COST`].
    MoveCostTooLarge(&'static str),
    /// Hash grid with no entries.
    EmptyHashGrid,
    /// Non-positive cell radius.
    InvalidRadius,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyGrid {
                cell_count_x,
                cell_count_z,
            } => write!(f, "grid must have cells: {}×{}", cell_count_x, cell_count_z),
            ConfigError::GridTooLarge {
                cell_count_x,
                cell_count_z,
            } => write!(
                f,
                "grid {}×{} exceeds {} cells",
                cell_count_x, cell_count_z, MAX_CELLS
            ),
            ConfigError::InvalidChunkSize {
                chunk_size_x,
                chunk_size_z,
            } => write!(f, "invalid chunk size {}×{}", chunk_size_x, chunk_size_z),
            ConfigError::NegativeLimit(name) => write!(f, "{} must not be negative", name),
            ConfigError::ZeroMoveCost(name) => write!(f, "move cost '{}' must be at least 1", name),
            ConfigError::MoveCostTooLarge(name) => {
                write!(f, "move cost '{}' must be at most {}", name, MAX_MOVE_COST)
            }
            ConfigError::EmptyHashGrid => write!(f, "hash grid size must be positive"),
            ConfigError::InvalidRadius => write!(f, "outer radius must be positive"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a map configuration, returning all errors found.
pub fn validate_config(config: &MapConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let m = &config.metrics;
    let costs = &config.move_costs;

    if config.cell_count_x == 0 || config.cell_count_z == 0 {
        errors.push(ConfigError::EmptyGrid {
            cell_count_x: config.cell_count_x,
            cell_count_z: config.cell_count_z,
        });
    } else if config.cell_count_x as u64 * config.cell_count_z as u64 > MAX_CELLS {
        errors.push(ConfigError::GridTooLarge {
            cell_count_x: config.cell_count_x,
            cell_count_z: config.cell_count_z,
        });
    }
    if m.chunk_size_x == 0 || m.chunk_size_z == 0 {
        errors.push(ConfigError::InvalidChunkSize {
            chunk_size_x: m.chunk_size_x,
            chunk_size_z: m.chunk_size_z,
        });
    }
    if m.slope_limit < 0 {
        errors.push(ConfigError::NegativeLimit("slope_limit"));
    }
    if m.max_road_climb < 0 {
        errors.push(ConfigError::NegativeLimit("max_road_climb"));
    }
    if m.hash_grid_size == 0 {
        errors.push(ConfigError::EmptyHashGrid);
    }
    if m.outer_radius <= 0.0 || !m.outer_radius.is_finite() {
        errors.push(ConfigError::InvalidRadius);
    }

    if costs.terrain.iter().any(|&c| c == 0) {
        errors.push(ConfigError::ZeroMoveCost("terrain"));
    }
    if costs.fallback == 0 {
        errors.push(ConfigError::ZeroMoveCost("fallback"));
    }
    if costs.road == 0 {
        errors.push(ConfigError::ZeroMoveCost("road"));
    }
    let entries = [
        ("fallback", costs.fallback),
        ("slope_penalty", costs.slope_penalty),
        ("river_penalty", costs.river_penalty),
        ("cliff_penalty", costs.cliff_penalty),
        ("road", costs.road),
    ];
    if costs.terrain.iter().any(|&c| c > MAX_MOVE_COST) {
        errors.push(ConfigError::MoveCostTooLarge("terrain"));
    }
    for (name, cost) in entries {
        if cost > MAX_MOVE_COST {
            errors.push(ConfigError::MoveCostTooLarge(name));
        }
    }

    errors
}
