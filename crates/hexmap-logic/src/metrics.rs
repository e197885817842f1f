//! Map metrics and the seeded noise tables shared by every cell.
//!
//! `HexMetrics` is plain configuration (sizes, steps, limits). `TerrainNoise`
//! is built once from a seed and shared immutably (behind an `Arc`) by the
//! grid and any mesh or prop-placement collaborator, so identical positions
//! always perturb identically.

use noise::{NoiseFn, Perlin};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::coords::WorldPos;

/// Ratio of a hexagon's inner (edge) radius to its outer (corner) radius.
pub const OUTER_TO_INNER: f32 = 0.866_025_4;

/// Elevation offsets used to place river beds and water surfaces.
pub const STREAM_BED_ELEVATION_OFFSET: f32 = -1.75;
pub const WATER_ELEVATION_OFFSET: f32 = -0.5;

const FEATURE_THRESHOLDS: [[f32; 3]; 3] = [[0.0, 0.0, 0.4], [0.0, 0.4, 0.6], [0.4, 0.6, 0.8]];

/// Classification of the boundary between two adjacent cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeType {
    Flat,
    Slope,
    Cliff,
}

/// Geometric and topological constants of a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HexMetrics {
    /// Centre-to-corner distance of a cell.
    pub outer_radius: f32,
    /// World-space height of one elevation level.
    pub elevation_step: f32,
    /// Horizontal jitter applied to mesh vertices.
    pub cell_perturb_strength: f32,
    /// Vertical jitter applied to a cell's centre.
    pub elevation_perturb_strength: f32,
    /// World-to-noise sampling scale.
    pub noise_scale: f32,
    pub chunk_size_x: u32,
    pub chunk_size_z: u32,
    /// Largest elevation difference still classified as a slope.
    pub slope_limit: i32,
    /// Largest elevation difference a road may span.
    pub max_road_climb: i32,
    pub hash_grid_size: u32,
    pub hash_grid_scale: f32,
}

impl Default for HexMetrics {
    fn default() -> Self {
        Self {
            outer_radius: 10.0,
            elevation_step: 3.0,
            cell_perturb_strength: 4.0,
            elevation_perturb_strength: 1.0,
            noise_scale: 0.003,
            chunk_size_x: 5,
            chunk_size_z: 5,
            slope_limit: 1,
            max_road_climb: 1,
            hash_grid_size: 256,
            hash_grid_scale: 0.25,
        }
    }
}

impl HexMetrics {
    pub fn inner_radius(&self) -> f32 {
        self.outer_radius * OUTER_TO_INNER
    }

    pub fn edge_type(&self, elevation1: i32, elevation2: i32) -> EdgeType {
        if elevation1 == elevation2 {
            return EdgeType::Flat;
        }
        if (elevation2 - elevation1).abs() <= self.slope_limit {
            EdgeType::Slope
        } else {
            EdgeType::Cliff
        }
    }

    /// Density thresholds for urban/farm/plant prop placement at a level
    /// (1..=3). Level 0 places nothing.
    pub fn feature_thresholds(&self, level: u8) -> Option<[f32; 3]> {
        match level {
            1..=3 => Some(FEATURE_THRESHOLDS[level as usize - 1]),
            _ => None,
        }
    }
}

/// Five random values attached to a hash-grid cell, in `[0, 0.999)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexHash {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
}

impl HexHash {
    fn generate(rng: &mut StdRng) -> Self {
        Self {
            a: rng.gen::<f32>() * 0.999,
            b: rng.gen::<f32>() * 0.999,
            c: rng.gen::<f32>() * 0.999,
            d: rng.gen::<f32>() * 0.999,
            e: rng.gen::<f32>() * 0.999,
        }
    }
}

/// Seeded noise source and hash grid.
pub struct TerrainNoise {
    seed: u64,
    perlin: Perlin,
    noise_scale: f64,
    hash_grid: Vec<HexHash>,
    hash_grid_size: usize,
    hash_grid_scale: f32,
}

impl TerrainNoise {
    pub fn new(seed: u64, metrics: &HexMetrics) -> Self {
        let size = metrics.hash_grid_size.max(1) as usize;
        let mut rng = StdRng::seed_from_u64(seed);
        let hash_grid = (0..size * size).map(|_| HexHash::generate(&mut rng)).collect();
        Self {
            seed,
            perlin: Perlin::new(seed as u32),
            noise_scale: metrics.noise_scale as f64,
            hash_grid,
            hash_grid_size: size,
            hash_grid_scale: metrics.hash_grid_scale,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Four noise channels at a position, each mapped into `[0, 1]`.
    pub fn sample(&self, position: WorldPos) -> [f32; 4] {
        let px = position.x as f64 * self.noise_scale;
        let pz = position.z as f64 * self.noise_scale;
        let mut out = [0.0; 4];
        for (channel, value) in out.iter_mut().enumerate() {
            let n = self.perlin.get([px, pz, channel as f64 * 7.31 + 0.5]);
            *value = ((n as f32 + 1.0) * 0.5).clamp(0.0, 1.0);
        }
        out
    }

    /// Vertical jitter for a cell centre, in `[-strength, strength]`.
    pub fn elevation_jitter(&self, position: WorldPos, strength: f32) -> f32 {
        (self.sample(position)[1] * 2.0 - 1.0) * strength
    }

    /// Horizontal jitter applied to mesh vertices.
    pub fn perturb(&self, position: WorldPos, strength: f32) -> WorldPos {
        let s = self.sample(position);
        WorldPos::new(
            position.x + (s[0] * 2.0 - 1.0) * strength,
            position.y,
            position.z + (s[2] * 2.0 - 1.0) * strength,
        )
    }

    /// Deterministic hash for a world position; wraps around the grid.
    pub fn sample_hash_grid(&self, position: WorldPos) -> HexHash {
        let size = self.hash_grid_size as i64;
        let x = ((position.x * self.hash_grid_scale) as i64).rem_euclid(size);
        let z = ((position.z * self.hash_grid_scale) as i64).rem_euclid(size);
        self.hash_grid[(x + z * size) as usize]
    }
}

impl std::fmt::Debug for TerrainNoise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainNoise")
            .field("seed", &self.seed)
            .field("hash_grid_size", &self.hash_grid_size)
            .finish()
    }
}
