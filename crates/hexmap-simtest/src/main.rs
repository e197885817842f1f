//! Hexmap Headless Harness
//!
//! Builds maps and drives the map core end to end: terrain editing,
//! pathfinding, fog of war, unit travel and save/load. Runs entirely
//! in-process with no renderer.
//!
//! Usage:
//!   cargo run -p hexmap-simtest
//!   cargo run -p hexmap-simtest -- --verbose
//!   cargo run -p hexmap-simtest -- --config map.json
//!   RUST_LOG=debug cargo run -p hexmap-simtest

use hexmap_logic::config::{validate_config, MapConfig};
use hexmap_logic::coords::{HexCoordinates, HexDirection};
use hexmap_logic::grid::HexGrid;
use hexmap_logic::pathfinding::{MovePolicy, SearchOutcome};
use hexmap_logic::persistence::{load_map, save_map, SaveError, MAP_FORMAT_VERSION};
use hexmap_logic::travel::{travel_duration, travel_pose, DEFAULT_TRAVEL_SPEED};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1));
    println!("=== Hexmap Harness ===\n");

    let mut results = Vec::new();

    // 1. Configuration
    let config = match load_config(config_path.map(String::as_str), &mut results) {
        Some(config) => config,
        None => {
            summarize(&results, verbose);
            std::process::exit(1);
        }
    };

    // 2. Grid structure
    results.extend(validate_grid(&config, verbose));

    // 3. Sculpted terrain and edit rules
    let mut grid = match HexGrid::new(config.clone()) {
        Ok(grid) => grid,
        Err(errors) => {
            results.push(TestResult {
                name: "grid_build".into(),
                passed: false,
                detail: format!("{} config errors", errors.len()),
            });
            summarize(&results, verbose);
            std::process::exit(1);
        }
    };
    sculpt(&mut grid);
    results.extend(validate_terrain(&mut grid, verbose));

    // 4. Pathfinding
    results.extend(validate_pathfinding(&mut grid, verbose));

    // 5. Fog of war and units
    results.extend(validate_visibility(&mut grid, verbose));

    // 6. Travel animation
    results.extend(validate_travel(&mut grid, verbose));

    // 7. Save/load
    results.extend(validate_persistence(&grid, &config, verbose));

    if !summarize(&results, verbose) {
        std::process::exit(1);
    }
}

/// Print the summary; true if everything passed.
fn summarize(results: &[TestResult], verbose: bool) -> bool {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );
    failed == 0
}

// ── 1. Configuration ────────────────────────────────────────────────────

fn load_config(path: Option<&str>, results: &mut Vec<TestResult>) -> Option<MapConfig> {
    println!("--- Configuration ---");
    let config = match path {
        None => MapConfig::default(),
        Some(path) => {
            let parsed = std::fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|text| serde_json::from_str::<MapConfig>(&text).map_err(|e| e.to_string()));
            match parsed {
                Ok(config) => config,
                Err(e) => {
                    results.push(TestResult {
                        name: "config_parse".into(),
                        passed: false,
                        detail: format!("{}: {}", path, e),
                    });
                    return None;
                }
            }
        }
    };

    let errors = validate_config(&config);
    results.push(TestResult {
        name: "config_valid".into(),
        passed: errors.is_empty(),
        detail: if errors.is_empty() {
            format!(
                "{}×{} cells, seed {}",
                config.cell_count_x, config.cell_count_z, config.seed
            )
        } else {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    });
    errors.is_empty().then_some(config)
}

// ── 2. Grid ─────────────────────────────────────────────────────────────

fn validate_grid(config: &MapConfig, verbose: bool) -> Vec<TestResult> {
    println!("--- Grid ---");
    let mut results = Vec::new();
    let Ok(grid) = HexGrid::new(config.clone()) else {
        results.push(TestResult {
            name: "grid_build".into(),
            passed: false,
            detail: "config rejected".into(),
        });
        return results;
    };

    let expected = (config.cell_count_x * config.cell_count_z) as usize;
    results.push(TestResult {
        name: "grid_cell_count".into(),
        passed: grid.cell_count() == expected,
        detail: format!("{} cells, {} chunks", grid.cell_count(), grid.chunk_count()),
    });

    let mut asymmetric = 0;
    let mut isolated = 0;
    for cell in grid.cells() {
        if cell.neighbors().count() == 0 && grid.cell_count() > 1 {
            isolated += 1;
        }
        for (d, n) in cell.neighbors() {
            if grid.neighbor(n, d.opposite()) != Some(cell.index()) {
                asymmetric += 1;
            }
        }
    }
    results.push(TestResult {
        name: "grid_neighbors_mutual".into(),
        passed: asymmetric == 0 && isolated == 0,
        detail: format!("{} asymmetric links, {} isolated cells", asymmetric, isolated),
    });

    let mispositioned = grid
        .cells()
        .iter()
        .filter(|c| {
            let p = c.position();
            grid.cell_at_position(p.x, p.z) != Some(c.index())
        })
        .count();
    results.push(TestResult {
        name: "grid_position_lookup".into(),
        passed: mispositioned == 0,
        detail: format!("{} cells not found at their own centre", mispositioned),
    });

    let round_trip = (-8..8).all(|row| {
        (-8..8).all(|col| HexCoordinates::from_offset(col, row).to_offset() == (col, row))
    });
    results.push(TestResult {
        name: "grid_offset_round_trip".into(),
        passed: round_trip,
        detail: "offset → cube → offset".into(),
    });

    if verbose {
        println!(
            "  Grid: {}×{}, {} chunks",
            grid.cell_count_x(),
            grid.cell_count_z(),
            grid.chunk_count()
        );
    }
    results
}

// ── 3. Terrain ──────────────────────────────────────────────────────────

/// Rough up a flat grid from the noise source: hills, a lake, roads, rivers.
fn sculpt(grid: &mut HexGrid) {
    let noise = grid.noise().clone();
    for i in 0..grid.cell_count() {
        let p = grid.cells()[i].position();
        let sample = noise.sample(p);
        grid.set_elevation(i, (sample[3] * 8.0) as i32 - 2);
        grid.set_terrain_type(i, (noise.sample_hash_grid(p).a * 5.0) as u8);
    }
    // Cells sculpted below zero sit under the default water level.
    // Rivers run downhill from every fifth cell.
    for i in (0..grid.cell_count()).step_by(5) {
        let downhill = HexDirection::ALL
            .into_iter()
            .filter(|&d| grid.is_valid_river_destination(i, d))
            .min_by_key(|&d| grid.neighbor(i, d).map(|n| grid.cells()[n].elevation()));
        if let Some(d) = downhill {
            grid.set_outgoing_river(i, d);
        }
    }
    for i in (0..grid.cell_count()).step_by(3) {
        for d in [HexDirection::E, HexDirection::NE] {
            grid.add_road(i, d);
        }
    }
    grid.drain_events();
}

fn validate_terrain(grid: &mut HexGrid, verbose: bool) -> Vec<TestResult> {
    println!("--- Terrain ---");
    let mut results = Vec::new();

    let mut mirror_errors = 0;
    let mut shared_edges = 0;
    let mut steep_roads = 0;
    let max_climb = grid.metrics().max_road_climb;
    for cell in grid.cells() {
        for (d, n) in cell.neighbors() {
            let other = &grid.cells()[n];
            if cell.has_road_through_edge(d) != other.has_road_through_edge(d.opposite()) {
                mirror_errors += 1;
            }
            if cell.outgoing_river() == Some(d) && other.incoming_river() != Some(d.opposite()) {
                mirror_errors += 1;
            }
            if cell.has_road_through_edge(d) && cell.has_river_through_edge(d) {
                shared_edges += 1;
            }
            if cell.has_road_through_edge(d) && (cell.elevation() - other.elevation()).abs() > max_climb {
                steep_roads += 1;
            }
        }
    }
    results.push(TestResult {
        name: "terrain_edges_mirrored".into(),
        passed: mirror_errors == 0,
        detail: format!("{} one-sided rivers/roads", mirror_errors),
    });
    results.push(TestResult {
        name: "terrain_roads_avoid_rivers".into(),
        passed: shared_edges == 0 && steep_roads == 0,
        detail: format!("{} shared edges, {} steep roads", shared_edges, steep_roads),
    });

    // Raising the mouth of a river above its source cuts the river.
    let river = (0..grid.cell_count())
        .find(|&i| grid.cells()[i].has_outgoing_river());
    match river {
        Some(source) => {
            let d = grid.cells()[source].outgoing_river();
            let target = d.and_then(|d| grid.neighbor(source, d));
            if let Some(target) = target {
                let before = grid.cells()[target].elevation();
                let raised = grid.cells()[source].elevation().max(grid.cells()[source].water_level()) + 2;
                grid.set_elevation(target, raised);
                let cut = !grid.cells()[source].has_outgoing_river()
                    && !grid.cells()[target].has_incoming_river();
                grid.set_elevation(target, before);
                results.push(TestResult {
                    name: "terrain_raise_cuts_river".into(),
                    passed: cut,
                    detail: format!("river {} → {} removed on both ends", source, target),
                });
            }
        }
        None => results.push(TestResult {
            name: "terrain_raise_cuts_river".into(),
            passed: true,
            detail: "no rivers on this map (skipped)".into(),
        }),
    }

    let events = grid.drain_events();
    results.push(TestResult {
        name: "terrain_edits_emit_events".into(),
        passed: river.is_none() || !events.dirty_chunks.is_empty(),
        detail: format!(
            "{} dirty chunks, {} changed cells",
            events.dirty_chunks.len(),
            events.changed_cells.len()
        ),
    });

    if verbose {
        let rivers = grid.cells().iter().filter(|c| c.has_outgoing_river()).count();
        let roads = grid.cells().iter().filter(|c| c.has_roads()).count();
        let water = grid.cells().iter().filter(|c| c.is_underwater()).count();
        println!("  Terrain: {} river sources, {} road cells, {} underwater", rivers, roads, water);
    }
    results
}

// ── 4. Pathfinding ──────────────────────────────────────────────────────

fn validate_pathfinding(grid: &mut HexGrid, verbose: bool) -> Vec<TestResult> {
    println!("--- Pathfinding ---");
    let mut results = Vec::new();

    // Flat reference scenario
    let mut flat = match HexGrid::new(MapConfig::with_size(5, 5)) {
        Ok(g) => g,
        Err(_) => return results,
    };
    let (start, goal) = (0, 4);
    let path = flat.find_path(start, goal, &MovePolicy::default());
    results.push(TestResult {
        name: "pathfind_flat_straight".into(),
        passed: path.as_ref().is_some_and(|p| p.len() == 5 && p.cost == 20),
        detail: format!("(0,0)→(4,0): {:?}", path.as_ref().map(|p| (p.len(), p.cost))),
    });

    if let Some(path) = &path {
        for pair in path.cells.windows(2) {
            if let Some(d) = HexDirection::ALL
                .into_iter()
                .find(|&d| flat.neighbor(pair[0], d) == Some(pair[1]))
            {
                flat.add_road(pair[0], d);
            }
        }
    }
    let road = flat.find_path(start, goal, &MovePolicy::default());
    results.push(TestResult {
        name: "pathfind_road_cheaper".into(),
        passed: matches!((&path, &road), (Some(a), Some(b)) if b.cost < a.cost),
        detail: format!("road cost {:?}", road.as_ref().map(|p| p.cost)),
    });

    let same = flat.find_path(7, 7, &MovePolicy::default());
    results.push(TestResult {
        name: "pathfind_same_cell".into(),
        passed: same.as_ref().is_some_and(|p| p.cells == vec![7] && p.cost == 0),
        detail: "start == goal → single cell".into(),
    });

    // Sculpted map: every found path must replay to its reported cost.
    let policy = MovePolicy::with_speed(24);
    let mut found = 0;
    let mut bad = 0;
    let mut total_turns = 0;
    let step = (grid.cell_count() / 10).max(1);
    for goal in (0..grid.cell_count()).step_by(step) {
        if let Some(path) = grid.find_path(0, goal, &policy) {
            found += 1;
            total_turns += path.turns(24);
            let mut distance = 0;
            for pair in path.cells.windows(2) {
                let cost = HexDirection::ALL
                    .into_iter()
                    .find(|&d| grid.neighbor(pair[0], d) == Some(pair[1]))
                    .and_then(|d| grid.move_cost(pair[0], d, &policy))
                    .and_then(|c| hexmap_logic::pathfinding::advance(distance, c, policy.speed));
                match cost {
                    Some(d) => distance = d,
                    None => {
                        bad += 1;
                        break;
                    }
                }
            }
            if distance != path.cost {
                bad += 1;
            }
        }
    }
    results.push(TestResult {
        name: "pathfind_costs_replay".into(),
        passed: bad == 0,
        detail: format!("{} paths found, {} inconsistent, {} turns total", found, bad, total_turns),
    });

    let far = grid.cell_count() - 1;
    let bounded = grid.find_path_within(0, far, &MovePolicy::default(), 1);
    results.push(TestResult {
        name: "pathfind_budget_abandons".into(),
        passed: grid.cell_count() <= 2 || !matches!(bounded, SearchOutcome::Found(_)),
        detail: format!("1 expansion → {:?}", outcome_name(&bounded)),
    });

    if verbose {
        println!("  Pathfinding: {} paths on sculpted map", found);
    }
    results
}

fn outcome_name(outcome: &SearchOutcome) -> &'static str {
    match outcome {
        SearchOutcome::Found(_) => "found",
        SearchOutcome::NoPath => "no path",
        SearchOutcome::Abandoned => "abandoned",
    }
}

// ── 5. Visibility ───────────────────────────────────────────────────────

fn validate_visibility(grid: &mut HexGrid, verbose: bool) -> Vec<TestResult> {
    println!("--- Visibility ---");
    let mut results = Vec::new();

    let before: Vec<u32> = grid.cells().iter().map(|c| c.visibility_count()).collect();
    let centers: Vec<usize> = (0..grid.cell_count()).step_by(11).collect();
    for &c in &centers {
        grid.increase_visibility(c, 3);
    }
    for &c in centers.iter().rev() {
        grid.decrease_visibility(c, 3);
    }
    let after: Vec<u32> = grid.cells().iter().map(|c| c.visibility_count()).collect();
    results.push(TestResult {
        name: "visibility_matched_restores".into(),
        passed: before == after,
        detail: format!("{} observers added and removed", centers.len()),
    });

    grid.decrease_visibility(0, 2);
    grid.decrease_visibility(0, 2);
    results.push(TestResult {
        name: "visibility_clamped".into(),
        passed: grid.cells().iter().all(|c| c.visibility_count() < 1_000_000),
        detail: "unmatched decreases stop at zero".into(),
    });

    let dry = (0..grid.cell_count()).filter(|&i| grid.is_valid_destination(i)).step_by(13);
    let spots: Vec<usize> = dry.collect();
    let ids: Vec<u32> = spots.iter().filter_map(|&c| grid.add_unit(c, 0.0)).collect();
    let visible = grid.cells().iter().filter(|c| c.is_visible()).count();
    let explored = grid.cells().iter().filter(|c| c.is_explored()).count();
    results.push(TestResult {
        name: "visibility_units_see".into(),
        passed: ids.is_empty() || (visible > 0 && explored >= visible),
        detail: format!("{} units, {} visible, {} explored", ids.len(), visible, explored),
    });

    for id in ids {
        grid.remove_unit(id);
    }
    let lingering = grid.cells().iter().filter(|c| c.visibility_count() > 0).count();
    results.push(TestResult {
        name: "visibility_units_removed".into(),
        passed: lingering == 0,
        detail: format!("{} cells still visible", lingering),
    });

    if verbose {
        println!("  Visibility: {} cells explored", explored);
    }
    results
}

// ── 6. Travel ───────────────────────────────────────────────────────────

fn validate_travel(grid: &mut HexGrid, _verbose: bool) -> Vec<TestResult> {
    println!("--- Travel ---");
    let mut results = Vec::new();

    let Some(start) = (0..grid.cell_count()).find(|&i| grid.is_valid_destination(i)) else {
        return results;
    };
    let goal = (start + 1..grid.cell_count())
        .rev()
        .find(|&g| grid.is_valid_destination(g) && grid.find_path(start, g, &MovePolicy::default()).is_some());
    let Some(goal) = goal else {
        return results;
    };
    let Some(id) = grid.add_unit(start, 0.0) else {
        return results;
    };
    let Some(path) = grid.find_path(start, goal, &MovePolicy::default()) else {
        return results;
    };

    let points: Vec<_> = path.cells.iter().map(|&c| grid.cells()[c].position()).collect();
    let duration = travel_duration(points.len(), DEFAULT_TRAVEL_SPEED);
    let end = travel_pose(&points, duration, DEFAULT_TRAVEL_SPEED);
    let reaches = end.is_some_and(|p| p.finished && p.position.distance(points[points.len() - 1]) < 1e-3);
    results.push(TestResult {
        name: "travel_reaches_goal".into(),
        passed: reaches,
        detail: format!("{} cells in {:.2}s", points.len(), duration),
    });

    let moved = grid.travel(id, &path, &MovePolicy::default());
    let at_goal = grid.units().get(id).is_some_and(|u| u.location() == goal);
    results.push(TestResult {
        name: "travel_moves_unit".into(),
        passed: moved && at_goal && grid.cells()[goal].is_visible(),
        detail: format!("unit {} → cell {}", id, goal),
    });
    grid.remove_unit(id);
    results
}

// ── 7. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(grid: &HexGrid, config: &MapConfig, _verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut bytes = Vec::new();
    let saved = save_map(&mut bytes, grid);
    let loaded = saved
        .map_err(|e| e.to_string())
        .and_then(|_| load_map(bytes.as_slice(), config.clone()).map_err(|e| e.to_string()));
    let detail = match &loaded {
        Ok(_) => format!("{} bytes, format v{}", bytes.len(), MAP_FORMAT_VERSION),
        Err(e) => e.clone(),
    };
    let same = loaded.as_ref().is_ok_and(|g| {
        g.cells().iter().zip(grid.cells()).all(|(a, b)| {
            a.elevation() == b.elevation()
                && a.water_level() == b.water_level()
                && a.terrain_type() == b.terrain_type()
                && a.incoming_river() == b.incoming_river()
                && a.outgoing_river() == b.outgoing_river()
                && a.road_mask() == b.road_mask()
                && a.is_explored() == b.is_explored()
        })
    });
    results.push(TestResult {
        name: "persist_round_trip".into(),
        passed: same,
        detail,
    });

    let mut future = bytes.clone();
    if future.len() >= 4 {
        future[..4].copy_from_slice(&(MAP_FORMAT_VERSION + 1).to_le_bytes());
    }
    let rejected = matches!(
        load_map(future.as_slice(), config.clone()),
        Err(SaveError::UnsupportedVersion { .. })
    );
    results.push(TestResult {
        name: "persist_rejects_unknown_version".into(),
        passed: rejected,
        detail: format!("v{} refused", MAP_FORMAT_VERSION + 1),
    });
    results
}
