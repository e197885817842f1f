//! Spatial core of a hex tile-map.
//!
//! This crate contains the cell graph and everything that reads it: terrain
//! editing rules, pathfinding, and fog of war. It has no engine or renderer
//! dependency. Collaborators read cell state through accessors and drain
//! [`grid::GridEvents`] to learn which chunks and cells to redraw.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`cell`] | Per-cell terrain record and read-only accessors |
//! | [`config`] | Map configuration, movement cost table, validation |
//! | [`coords`] | Cube/offset/world coordinates, directions, hex distance |
//! | [`grid`] | Cell arena, neighbor wiring, lookup, chunk change tracking |
//! | [`metrics`] | Cell geometry constants, edge types, seeded noise and hash grid |
//! | [`pathfinding`] | Bucket-queue A* with movement policies and turn budgets |
//! | [`persistence`] | Versioned binary save/load of maps |
//! | [`terrain`] | Mutation rules for elevation, water, rivers, roads, features |
//! | [`travel`] | Bézier travel animation sampled by elapsed time |
//! | [`units`] | Units as cell occupants and visibility observers |
//! | [`visibility`] | Reference-counted fog of war with elevation occlusion |

pub mod cell;
pub mod config;
pub mod coords;
pub mod grid;
pub mod metrics;
pub mod pathfinding;
pub mod persistence;
pub mod terrain;
pub mod travel;
pub mod units;
pub mod visibility;

pub use cell::{CellIndex, HexCell};
pub use config::MapConfig;
pub use coords::{HexCoordinates, HexDirection, WorldPos};
pub use grid::HexGrid;
pub use pathfinding::{MovePolicy, Path, Pathfinder, SearchOutcome};
