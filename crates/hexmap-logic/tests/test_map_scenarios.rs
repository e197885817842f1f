//! Integration tests for the map core.
//!
//! Exercises: grid construction → terrain edits → pathfinding → fog of war
//! → save/load, on hand-built scenarios and on seeded random terrain.
//!
//! Optimality is checked against a brute-force Bellman-Ford relaxation over
//! the same step costs.

use hexmap_logic::cell::CellIndex;
use hexmap_logic::config::MapConfig;
use hexmap_logic::coords::{HexCoordinates, HexDirection};
use hexmap_logic::grid::HexGrid;
use hexmap_logic::pathfinding::{advance, move_cost, MovePolicy, Path, RiverCrossing};
use hexmap_logic::persistence::{load_map, save_map, MapData};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Helpers ────────────────────────────────────────────────────────────

fn flat_grid(x: u32, z: u32) -> HexGrid {
    HexGrid::new(MapConfig::with_size(x, z)).unwrap()
}

/// Rough terrain with water, walls, roads and rivers, all from one seed.
fn random_grid(seed: u64, x: u32, z: u32) -> HexGrid {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut g = flat_grid(x, z);
    for i in 0..g.cell_count() {
        g.set_elevation(i, rng.gen_range(0..4));
        g.set_terrain_type(i, rng.gen_range(0..6));
        if rng.gen_bool(0.1) {
            let level = g.cells()[i].elevation() + 1;
            g.set_water_level(i, level);
        }
        if rng.gen_bool(0.1) {
            g.set_walled(i, true);
        }
    }
    for _ in 0..(x * z) / 2 {
        let i = rng.gen_range(0..g.cell_count());
        let d = HexDirection::ALL[rng.gen_range(0..6)];
        if rng.gen_bool(0.5) {
            g.add_road(i, d);
        } else {
            g.set_outgoing_river(i, d);
        }
    }
    g
}

/// Minimum distance by relaxing every edge until nothing improves.
fn reference_cost(g: &HexGrid, start: CellIndex, goal: CellIndex, policy: &MovePolicy) -> Option<u32> {
    let n = g.cell_count();
    let mut dist: Vec<Option<u32>> = vec![None; n];
    dist[start] = Some(0);
    for _ in 0..n {
        let mut changed = false;
        for u in 0..n {
            let Some(du) = dist[u] else {
                continue;
            };
            for (d, v) in g.cells()[u].neighbors() {
                let Some(cost) = move_cost(g, u, d, policy) else {
                    continue;
                };
                let Some(dv) = advance(du, cost, policy.speed) else {
                    continue;
                };
                if dist[v].map_or(true, |old| dv < old) {
                    dist[v] = Some(dv);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    dist[goal]
}

/// Walk a path step by step, recomputing its cost.
fn replay_cost(g: &HexGrid, path: &Path, policy: &MovePolicy) -> Option<u32> {
    let mut distance = 0;
    for pair in path.cells.windows(2) {
        let d = g.direction_between(pair[0], pair[1])?;
        let cost = move_cost(g, pair[0], d, policy)?;
        distance = advance(distance, cost, policy.speed)?;
    }
    Some(distance)
}

fn policies() -> Vec<MovePolicy> {
    vec![
        MovePolicy::default(),
        MovePolicy::with_speed(12),
        MovePolicy {
            water_passable: true,
            cliffs_passable: true,
            use_roads: false,
            rivers: RiverCrossing::Free,
            walls_block: false,
            speed: None,
        },
        MovePolicy {
            rivers: RiverCrossing::Blocked,
            speed: Some(20),
            ..MovePolicy::default()
        },
    ]
}

// ── Grid structure ─────────────────────────────────────────────────────

#[test]
fn neighbors_are_symmetric() {
    let g = flat_grid(9, 7);
    for cell in g.cells() {
        for d in HexDirection::ALL {
            if let Some(n) = cell.neighbor(d) {
                assert_eq!(g.neighbor(n, d.opposite()), Some(cell.index()));
            }
        }
        assert!(cell.neighbors().count() > 0);
    }
}

#[test]
fn offset_coordinates_round_trip() {
    for row in -4..6 {
        for column in -4..6 {
            let c = HexCoordinates::from_offset(column, row);
            assert_eq!(c.to_offset(), (column, row));
            assert_eq!(c.x() + c.y() + c.z(), 0);
        }
    }
}

#[test]
fn neighbor_distance_is_one() {
    let g = flat_grid(6, 6);
    for cell in g.cells() {
        for (_, n) in cell.neighbors() {
            let other = g.cells()[n].coordinates();
            assert_eq!(cell.coordinates().distance_to(&other), 1);
        }
    }
}

// ── Pathfinding scenarios ──────────────────────────────────────────────

#[test]
fn flat_straight_path() {
    let mut g = flat_grid(5, 5);
    let start = g.cell_at_offset(0, 0).unwrap();
    let goal = g.cell_at_offset(4, 0).unwrap();
    let path = g.find_path(start, goal, &MovePolicy::default()).unwrap();
    assert_eq!(path.len(), 5);
    assert_eq!(path.cost, 4 * 5);
}

#[test]
fn road_reduces_path_cost() {
    let mut g = flat_grid(5, 5);
    let start = g.cell_at_offset(0, 0).unwrap();
    let goal = g.cell_at_offset(4, 0).unwrap();
    let before = g.find_path(start, goal, &MovePolicy::default()).unwrap();
    for pair in before.cells.windows(2) {
        let d = g.direction_between(pair[0], pair[1]).unwrap();
        g.add_road(pair[0], d);
    }
    let after = g.find_path(start, goal, &MovePolicy::default()).unwrap();
    assert!(after.cost < before.cost);
    assert_eq!(after.cost, 4);
}

#[test]
fn path_steps_are_adjacent_and_allowed() {
    let mut g = random_grid(7, 8, 6);
    let policy = MovePolicy::default();
    let goal = g.cell_count() - 1;
    if let Some(path) = g.find_path(0, goal, &policy) {
        assert_eq!(path.start(), Some(0));
        assert_eq!(path.goal(), Some(goal));
        assert_eq!(replay_cost(&g, &path, &policy), Some(path.cost));
    }
}

#[test]
fn matches_brute_force_on_random_terrain() {
    for seed in 0..12u64 {
        let mut g = random_grid(seed, 7, 7);
        let mut rng = StdRng::seed_from_u64(seed ^ 0xabcd);
        for policy in policies() {
            for _ in 0..6 {
                let start = rng.gen_range(0..g.cell_count());
                let goal = rng.gen_range(0..g.cell_count());
                let expected = if start == goal {
                    Some(0)
                } else {
                    reference_cost(&g, start, goal, &policy)
                };
                let found = g.find_path(start, goal, &policy);
                assert_eq!(
                    found.as_ref().map(|p| p.cost),
                    expected,
                    "seed {seed} {start}→{goal} {policy:?}"
                );
                if let Some(path) = found {
                    assert_eq!(replay_cost(&g, &path, &policy), Some(path.cost));
                }
            }
        }
    }
}

#[test]
fn deterministic_paths() {
    let mut a = random_grid(42, 9, 9);
    let mut b = random_grid(42, 9, 9);
    let goal = a.cell_count() - 1;
    for policy in policies() {
        assert_eq!(a.find_path(0, goal, &policy), b.find_path(0, goal, &policy));
    }
}

#[test]
fn edits_between_searches_are_seen() {
    let mut g = flat_grid(5, 1);
    let policy = MovePolicy::default();
    assert!(g.find_path(0, 4, &policy).is_some());
    g.set_water_level(2, 1);
    assert!(g.find_path(0, 4, &policy).is_none());
    g.set_water_level(2, 0);
    assert_eq!(g.find_path(0, 4, &policy).map(|p| p.cost), Some(20));
}

// ── Terrain rules ──────────────────────────────────────────────────────

#[test]
fn raising_downstream_cell_removes_river() {
    let mut g = flat_grid(5, 5);
    let source = g.cell_at_offset(2, 2).unwrap();
    let target = g.neighbor(source, HexDirection::E).unwrap();
    g.set_outgoing_river(source, HexDirection::E);
    assert_eq!(g.cells()[target].incoming_river(), Some(HexDirection::W));

    g.set_elevation(target, 2);
    assert!(!g.cells()[source].has_outgoing_river());
    assert!(!g.cells()[target].has_incoming_river());
}

#[test]
fn random_edits_keep_edges_consistent() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut g = flat_grid(8, 8);
    for _ in 0..3000 {
        let i = rng.gen_range(0..g.cell_count());
        let d = HexDirection::ALL[rng.gen_range(0..6)];
        match rng.gen_range(0..9) {
            0 => g.set_elevation(i, rng.gen_range(-1..4)),
            1 => g.set_water_level(i, rng.gen_range(0..3)),
            2 | 3 => g.set_outgoing_river(i, d),
            4 | 5 => g.add_road(i, d),
            6 => g.remove_roads(i),
            7 => g.set_special_index(i, rng.gen_range(0..3)),
            _ => g.remove_river(i),
        }
    }

    for cell in g.cells() {
        if let (Some(a), Some(b)) = (cell.incoming_river(), cell.outgoing_river()) {
            assert_ne!(a, b, "river doubles back at {}", cell.index());
        }
        if cell.is_special() {
            assert!(!cell.has_river());
            assert!(!cell.has_roads());
        }
        for d in HexDirection::ALL {
            let road = cell.has_road_through_edge(d);
            let river = cell.has_river_through_edge(d);
            assert!(!(road && river), "road and river share edge at {}", cell.index());
            let Some(n) = cell.neighbor(d) else {
                assert!(!road && !river);
                continue;
            };
            let other = &g.cells()[n];
            assert_eq!(road, other.has_road_through_edge(d.opposite()));
            if cell.outgoing_river() == Some(d) {
                assert_eq!(other.incoming_river(), Some(d.opposite()));
            }
            if road {
                let diff = (cell.elevation() - other.elevation()).abs();
                assert!(diff <= g.metrics().max_road_climb);
            }
        }
    }
}

// ── Visibility ─────────────────────────────────────────────────────────

#[test]
fn matched_visibility_calls_restore_counts() {
    let mut g = random_grid(99, 8, 8);
    let mut rng = StdRng::seed_from_u64(5);
    let baseline: Vec<u32> = g.cells().iter().map(|c| c.visibility_count()).collect();

    let mut observers = Vec::new();
    for _ in 0..20 {
        let center = rng.gen_range(0..g.cell_count());
        let range = rng.gen_range(0..5);
        g.increase_visibility(center, range);
        observers.push((center, range));
    }
    while let Some((center, range)) = observers.pop() {
        g.decrease_visibility(center, range);
    }
    let after: Vec<u32> = g.cells().iter().map(|c| c.visibility_count()).collect();
    assert_eq!(baseline, after);
}

#[test]
fn unmatched_decreases_clamp_at_zero() {
    let mut g = random_grid(3, 6, 6);
    let mut rng = StdRng::seed_from_u64(11);
    let mut increases = 0;
    for _ in 0..200 {
        let center = rng.gen_range(0..g.cell_count());
        if rng.gen_bool(0.3) {
            g.increase_visibility(center, 2);
            increases += 1;
        } else {
            g.decrease_visibility(center, 2);
        }
        assert!(g.cells().iter().all(|c| c.visibility_count() <= increases));
    }
}

#[test]
fn counts_track_active_observers_across_edits() {
    let mut g = random_grid(21, 8, 8);
    let mut rng = StdRng::seed_from_u64(21);
    let mut active: Vec<(CellIndex, u32)> = Vec::new();

    for _ in 0..80 {
        match rng.gen_range(0..3) {
            0 => {
                let center = rng.gen_range(0..g.cell_count());
                let range = rng.gen_range(0..4);
                g.increase_visibility(center, range);
                active.push((center, range));
            }
            1 if !active.is_empty() => {
                let (center, range) = active.swap_remove(rng.gen_range(0..active.len()));
                g.decrease_visibility(center, range);
            }
            _ => {
                let cell = rng.gen_range(0..g.cell_count());
                g.set_elevation(cell, rng.gen_range(0..5));
            }
        }

        let mut expected = vec![0u32; g.cell_count()];
        for &(center, range) in &active {
            for index in g.visible_cells(center, range) {
                expected[index] += 1;
            }
        }
        let counts: Vec<u32> = g.cells().iter().map(|c| c.visibility_count()).collect();
        assert_eq!(counts, expected);
    }
}

#[test]
fn units_follow_terrain_changes() {
    let mut g = flat_grid(9, 3);
    let eye = g.cell_at_offset(0, 1).unwrap();
    g.add_unit(eye, 0.0).unwrap();
    let far = g.cell_at_offset(3, 1).unwrap();
    assert!(g.cells()[far].is_visible());

    // A wall of high ground between the unit and the far cell.
    for row in 0..3 {
        let c = g.cell_at_offset(2, row).unwrap();
        g.set_elevation(c, 4);
    }
    assert!(!g.cells()[far].is_visible());
    assert!(g.cells()[far].is_explored());
}

// ── Persistence ────────────────────────────────────────────────────────

#[test]
fn random_map_survives_save_load() {
    let mut g = random_grid(17, 10, 8);
    let spots: Vec<CellIndex> = (0..g.cell_count()).step_by(7).collect();
    for cell in spots {
        g.add_unit(cell, 30.0);
    }

    let mut bytes = Vec::new();
    save_map(&mut bytes, &g).unwrap();
    let mut loaded = load_map(bytes.as_slice(), MapConfig::default()).unwrap();

    assert_eq!(MapData::capture(&loaded), MapData::capture(&g));
    let goal = g.cell_count() - 1;
    let policy = MovePolicy::default();
    assert_eq!(loaded.find_path(0, goal, &policy), g.find_path(0, goal, &policy));
    for (a, b) in g.cells().iter().zip(loaded.cells()) {
        assert_eq!(a.visibility_count(), b.visibility_count());
    }
}
