//! Shortest-cost pathfinding over the cell graph.
//!
//! A* with a hex-distance heuristic scaled by the cheapest possible step, so
//! it never overestimates. The frontier is a bucket queue: one singly-linked
//! chain of cells per integer priority, threaded through each cell's search
//! scratch. Edge costs are positive and the heuristic is consistent, so
//! dequeued priorities never decrease and the bucket cursor only moves
//! forward.
//!
//! Scratch entries are stamped with a search phase. The phase advances by
//! two per search: `phase` means "in the frontier", `phase + 1` means
//! "closed", anything older is unvisited. No per-search reset of the grid is
//! needed, and an abandoned search leaves nothing the next one will misread.

use crate::cell::CellIndex;
use crate::coords::HexDirection;
use crate::grid::HexGrid;
use crate::metrics::EdgeType;

/// How a river crossing affects movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiverCrossing {
    Free,
    Penalized,
    Blocked,
}

/// Movement rules for one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePolicy {
    /// Movement points per turn. A step that does not fit in the remainder
    /// of a turn starts on the next one. `None` disables turns.
    pub speed: Option<u32>,
    pub water_passable: bool,
    pub cliffs_passable: bool,
    /// Roads replace the terrain cost with the road cost.
    pub use_roads: bool,
    pub rivers: RiverCrossing,
    /// Block moves between a walled and an unwalled cell.
    pub walls_block: bool,
}

impl Default for MovePolicy {
    fn default() -> Self {
        Self {
            speed: None,
            water_passable: false,
            cliffs_passable: false,
            use_roads: true,
            rivers: RiverCrossing::Penalized,
            walls_block: true,
        }
    }
}

impl MovePolicy {
    pub fn with_speed(speed: u32) -> Self {
        Self {
            speed: Some(speed),
            ..Self::default()
        }
    }
}

/// Cost of stepping from `from` across `direction`, or `None` if forbidden.
pub fn move_cost(
    grid: &HexGrid,
    from: CellIndex,
    direction: HexDirection,
    policy: &MovePolicy,
) -> Option<u32> {
    let to = grid.neighbor(from, direction)?;
    let (a, b) = (&grid.cells()[from], &grid.cells()[to]);

    if b.is_underwater() && !policy.water_passable {
        return None;
    }
    if policy.walls_block && a.walled() != b.walled() {
        return None;
    }
    let edge = grid.metrics().edge_type(a.elevation(), b.elevation());
    if edge == EdgeType::Cliff && !policy.cliffs_passable {
        return None;
    }
    let river = a.has_river_through_edge(direction);
    if river && policy.rivers == RiverCrossing::Blocked {
        return None;
    }

    let costs = &grid.config().move_costs;
    if policy.use_roads && a.has_road_through_edge(direction) {
        return Some(costs.road);
    }
    let mut cost = costs.terrain_cost(b.terrain_type());
    match edge {
        EdgeType::Flat => {}
        EdgeType::Slope => cost += costs.slope_penalty,
        EdgeType::Cliff => cost += costs.cliff_penalty,
    }
    if river && policy.rivers == RiverCrossing::Penalized {
        cost += costs.river_penalty;
    }
    Some(cost)
}

/// Turn in which a unit arrives having spent `distance` movement points.
pub fn turn_of(distance: u32, speed: u32) -> u32 {
    distance.saturating_sub(1) / speed.max(1)
}

/// Accumulated distance after taking a step of `cost`.
///
/// With a speed budget, movement left over at the end of a turn is lost when
/// the next step does not fit. Steps costing more than a whole turn are
/// impossible. `None` also when the distance would overflow.
pub fn advance(distance: u32, cost: u32, speed: Option<u32>) -> Option<u32> {
    let next = distance.checked_add(cost)?;
    let Some(speed) = speed else {
        return Some(next);
    };
    if cost > speed || speed == 0 {
        return None;
    }
    let turn = turn_of(next, speed);
    if turn > turn_of(distance, speed) {
        turn.checked_mul(speed)?.checked_add(cost)
    } else {
        Some(next)
    }
}

/// An ordered route from start to goal, both inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub cells: Vec<CellIndex>,
    /// Accumulated distance at the goal.
    pub cost: u32,
}

impl Path {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn start(&self) -> Option<CellIndex> {
        self.cells.first().copied()
    }

    pub fn goal(&self) -> Option<CellIndex> {
        self.cells.last().copied()
    }

    /// Number of turns the path takes at the given speed.
    pub fn turns(&self, speed: u32) -> u32 {
        if self.cost == 0 {
            0
        } else {
            turn_of(self.cost, speed) + 1
        }
    }
}

/// Result of a search that may be cut short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(Path),
    /// The frontier emptied before reaching the goal.
    NoPath,
    /// The expansion budget ran out first.
    Abandoned,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PathScratch {
    phase: u32,
    distance: u32,
    heuristic: u32,
    from: Option<CellIndex>,
    next_with_same_priority: Option<CellIndex>,
}

impl PathScratch {
    fn priority(&self) -> u32 {
        self.distance.saturating_add(self.heuristic)
    }
}

/// Bucket priority queue keyed by integer priority.
#[derive(Debug, Default)]
pub(crate) struct SearchFrontier {
    buckets: Vec<Option<CellIndex>>,
    count: usize,
    minimum: usize,
}

impl SearchFrontier {
    pub(crate) fn len(&self) -> usize {
        self.count
    }

    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
        self.count = 0;
        self.minimum = usize::MAX;
    }

    pub(crate) fn enqueue(&mut self, scratch: &mut [PathScratch], cell: CellIndex, priority: u32) {
        let priority = priority as usize;
        self.count += 1;
        if priority < self.minimum {
            self.minimum = priority;
        }
        if priority >= self.buckets.len() {
            self.buckets.resize(priority + 1, None);
        }
        scratch[cell].next_with_same_priority = self.buckets[priority];
        self.buckets[priority] = Some(cell);
    }

    pub(crate) fn dequeue(&mut self, scratch: &[PathScratch]) -> Option<CellIndex> {
        while self.minimum < self.buckets.len() {
            if let Some(cell) = self.buckets[self.minimum] {
                self.buckets[self.minimum] = scratch[cell].next_with_same_priority;
                self.count -= 1;
                return Some(cell);
            }
            self.minimum += 1;
        }
        None
    }

    /// Move a cell filed under `old_priority` to its current priority.
    ///
    /// A cell has a single chain link, so it is unlinked from the old chain
    /// rather than left behind as a stale entry.
    pub(crate) fn change(&mut self, scratch: &mut [PathScratch], cell: CellIndex, old_priority: u32) {
        let old = old_priority as usize;
        let next = scratch[cell].next_with_same_priority;
        let mut current = self.buckets.get(old).copied().flatten();
        if current == Some(cell) {
            self.buckets[old] = next;
        } else {
            while let Some(c) = current {
                let following = scratch[c].next_with_same_priority;
                if following == Some(cell) {
                    scratch[c].next_with_same_priority = next;
                    break;
                }
                current = following;
            }
        }
        self.count -= 1;
        let priority = scratch[cell].priority();
        self.enqueue(scratch, cell, priority);
    }
}

/// Reusable search state. Each `Pathfinder` is its own phase namespace, so
/// separate instances never disturb each other's scratch.
#[derive(Debug, Default)]
pub struct Pathfinder {
    phase: u32,
    scratch: Vec<PathScratch>,
    frontier: SearchFrontier,
    last_expansions: usize,
}

impl Pathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells closed by the most recent search.
    pub fn last_expansions(&self) -> usize {
        self.last_expansions
    }

    /// Minimum-cost path, or `None` if the goal is unreachable.
    pub fn find_path(
        &mut self,
        grid: &HexGrid,
        start: CellIndex,
        goal: CellIndex,
        policy: &MovePolicy,
    ) -> Option<Path> {
        match self.search(grid, start, goal, policy, usize::MAX) {
            SearchOutcome::Found(path) => Some(path),
            SearchOutcome::NoPath | SearchOutcome::Abandoned => None,
        }
    }

    /// Like [`Pathfinder::find_path`] but gives up after closing
    /// `max_expansions` cells.
    pub fn find_path_within(
        &mut self,
        grid: &HexGrid,
        start: CellIndex,
        goal: CellIndex,
        policy: &MovePolicy,
        max_expansions: usize,
    ) -> SearchOutcome {
        self.search(grid, start, goal, policy, max_expansions)
    }

    fn begin_phase(&mut self, cell_count: usize) {
        if self.scratch.len() != cell_count {
            self.scratch = vec![PathScratch::default(); cell_count];
            self.phase = 0;
        }
        if self.phase >= u32::MAX - 2 {
            for s in &mut self.scratch {
                s.phase = 0;
            }
            self.phase = 0;
        }
        self.phase += 2;
    }

    fn search(
        &mut self,
        grid: &HexGrid,
        start: CellIndex,
        goal: CellIndex,
        policy: &MovePolicy,
        max_expansions: usize,
    ) -> SearchOutcome {
        self.last_expansions = 0;
        let (Some(start_cell), Some(goal_cell)) = (grid.cell(start), grid.cell(goal)) else {
            return SearchOutcome::NoPath;
        };
        if start == goal {
            return SearchOutcome::Found(Path {
                cells: vec![start],
                cost: 0,
            });
        }

        self.begin_phase(grid.cell_count());
        let open = self.phase;
        let closed = self.phase + 1;
        let goal_coordinates = goal_cell.coordinates();
        let min_step = grid.config().move_costs.min_step(policy.use_roads);
        let heuristic = |index: CellIndex| {
            grid.cells()[index]
                .coordinates()
                .distance_to(&goal_coordinates)
                .saturating_mul(min_step)
        };

        self.frontier.clear();
        self.scratch[start] = PathScratch {
            phase: open,
            distance: 0,
            heuristic: heuristic(start_cell.index()),
            from: None,
            next_with_same_priority: None,
        };
        let priority = self.scratch[start].priority();
        self.frontier.enqueue(&mut self.scratch, start, priority);

        while let Some(current) = self.frontier.dequeue(&self.scratch) {
            if self.scratch[current].phase == closed {
                continue;
            }
            self.scratch[current].phase = closed;

            if current == goal {
                let path = self.reconstruct(goal);
                log::debug!(
                    "Path {}→{}: {} cells, cost {}, {} expansions",
                    start,
                    goal,
                    path.len(),
                    path.cost,
                    self.last_expansions
                );
                return SearchOutcome::Found(path);
            }
            if self.last_expansions >= max_expansions {
                log::debug!(
                    "Path {}→{} abandoned after {} expansions, {} cells still open",
                    start,
                    goal,
                    max_expansions,
                    self.frontier.len()
                );
                return SearchOutcome::Abandoned;
            }
            self.last_expansions += 1;

            let current_distance = self.scratch[current].distance;
            for (direction, neighbor) in grid.cells()[current].neighbors() {
                if self.scratch[neighbor].phase == closed {
                    continue;
                }
                let Some(cost) = move_cost(grid, current, direction, policy) else {
                    continue;
                };
                let Some(distance) = advance(current_distance, cost, policy.speed) else {
                    continue;
                };

                let entry = &mut self.scratch[neighbor];
                if entry.phase < open {
                    *entry = PathScratch {
                        phase: open,
                        distance,
                        heuristic: heuristic(neighbor),
                        from: Some(current),
                        next_with_same_priority: None,
                    };
                    let priority = entry.priority();
                    self.frontier.enqueue(&mut self.scratch, neighbor, priority);
                } else if distance < entry.distance {
                    let old_priority = entry.priority();
                    entry.distance = distance;
                    entry.from = Some(current);
                    self.frontier.change(&mut self.scratch, neighbor, old_priority);
                }
            }
        }

        log::debug!(
            "No path {}→{} after {} expansions",
            start,
            goal,
            self.last_expansions
        );
        SearchOutcome::NoPath
    }

    fn reconstruct(&self, goal: CellIndex) -> Path {
        let mut cells = vec![goal];
        let mut current = goal;
        while let Some(from) = self.scratch[current].from {
            cells.push(from);
            current = from;
        }
        cells.reverse();
        Path {
            cells,
            cost: self.scratch[goal].distance,
        }
    }
}

impl HexGrid {
    /// Minimum-cost path using the grid's own search state.
    pub fn find_path(
        &mut self,
        start: CellIndex,
        goal: CellIndex,
        policy: &MovePolicy,
    ) -> Option<Path> {
        let mut finder = std::mem::take(&mut self.pathfinder);
        let path = finder.find_path(self, start, goal, policy);
        self.pathfinder = finder;
        path
    }

    pub fn find_path_within(
        &mut self,
        start: CellIndex,
        goal: CellIndex,
        policy: &MovePolicy,
        max_expansions: usize,
    ) -> SearchOutcome {
        let mut finder = std::mem::take(&mut self.pathfinder);
        let outcome = finder.find_path_within(self, start, goal, policy, max_expansions);
        self.pathfinder = finder;
        outcome
    }

    pub fn move_cost(&self, from: CellIndex, direction: HexDirection, policy: &MovePolicy) -> Option<u32> {
        move_cost(self, from, direction, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{terrain_types, MapConfig};

    fn grid(x: u32, z: u32) -> HexGrid {
        HexGrid::new(MapConfig::with_size(x, z)).unwrap()
    }

    fn at(g: &HexGrid, column: i32, row: i32) -> CellIndex {
        g.cell_at_offset(column, row).unwrap()
    }

    // ── Bucket queue ────────────────────────────────────────────────────

    #[test]
    fn frontier_dequeues_in_priority_order() {
        let mut scratch = vec![PathScratch::default(); 5];
        let mut f = SearchFrontier::default();
        f.clear();
        f.enqueue(&mut scratch, 0, 7);
        f.enqueue(&mut scratch, 1, 3);
        f.enqueue(&mut scratch, 2, 5);
        f.enqueue(&mut scratch, 3, 3);
        assert_eq!(f.len(), 4);
        // Same-priority cells come out last-in first-out.
        assert_eq!(f.dequeue(&scratch), Some(3));
        assert_eq!(f.dequeue(&scratch), Some(1));
        assert_eq!(f.dequeue(&scratch), Some(2));
        assert_eq!(f.dequeue(&scratch), Some(0));
        assert_eq!(f.dequeue(&scratch), None);
        assert_eq!(f.len(), 0);
    }

    #[test]
    fn frontier_change_unlinks_from_middle_of_chain() {
        let mut scratch = vec![PathScratch::default(); 4];
        let mut f = SearchFrontier::default();
        f.clear();
        for cell in 0..3 {
            scratch[cell].distance = 9;
            f.enqueue(&mut scratch, cell, 9);
        }
        // Chain for 9 is 2 → 1 → 0; lower cell 1 to priority 4.
        scratch[1].distance = 4;
        f.change(&mut scratch, 1, 9);
        assert_eq!(f.len(), 3);
        assert_eq!(f.dequeue(&scratch), Some(1));
        assert_eq!(f.dequeue(&scratch), Some(2));
        assert_eq!(f.dequeue(&scratch), Some(0));
        assert_eq!(f.dequeue(&scratch), None);
    }

    #[test]
    fn frontier_change_head_of_chain() {
        let mut scratch = vec![PathScratch::default(); 2];
        let mut f = SearchFrontier::default();
        f.clear();
        scratch[0].distance = 6;
        scratch[1].distance = 6;
        f.enqueue(&mut scratch, 0, 6);
        f.enqueue(&mut scratch, 1, 6);
        scratch[1].distance = 2;
        f.change(&mut scratch, 1, 6);
        assert_eq!(f.dequeue(&scratch), Some(1));
        assert_eq!(f.dequeue(&scratch), Some(0));
    }

    // ── Costs ───────────────────────────────────────────────────────────

    #[test]
    fn advance_without_speed_adds() {
        assert_eq!(advance(10, 5, None), Some(15));
    }

    #[test]
    fn advance_wastes_leftover_turn() {
        // 20 of 24 spent; a 10-cost step starts next turn.
        assert_eq!(advance(20, 10, Some(24)), Some(34));
        assert_eq!(advance(20, 4, Some(24)), Some(24));
        assert_eq!(advance(0, 24, Some(24)), Some(24));
        assert_eq!(advance(0, 25, Some(24)), None);
    }

    #[test]
    fn advance_refuses_overflowing_distance() {
        assert_eq!(advance(u32::MAX - 2, 5, None), None);
        assert_eq!(advance(u32::MAX - 3, 10, Some(24)), None);
        assert_eq!(advance(u32::MAX - 5, 5, None), Some(u32::MAX));
    }

    #[test]
    fn move_cost_rules() {
        let mut g = grid(6, 6);
        let c = at(&g, 2, 2);
        let policy = MovePolicy::default();
        assert_eq!(g.move_cost(c, HexDirection::E, &policy), Some(5));

        let e = g.neighbor(c, HexDirection::E).unwrap();
        g.set_terrain_type(e, terrain_types::MUD);
        assert_eq!(g.move_cost(c, HexDirection::E, &policy), Some(8));

        let w = g.neighbor(c, HexDirection::W).unwrap();
        g.set_elevation(w, 1);
        assert_eq!(g.move_cost(c, HexDirection::W, &policy), Some(10));
        g.add_road(c, HexDirection::W);
        assert_eq!(g.move_cost(c, HexDirection::W, &policy), Some(1));
        let no_roads = MovePolicy {
            use_roads: false,
            ..MovePolicy::default()
        };
        assert_eq!(g.move_cost(c, HexDirection::W, &no_roads), Some(10));

        let ne = g.neighbor(c, HexDirection::NE).unwrap();
        g.set_elevation(ne, 3);
        assert_eq!(g.move_cost(c, HexDirection::NE, &policy), None);
        let climber = MovePolicy {
            cliffs_passable: true,
            ..MovePolicy::default()
        };
        assert_eq!(g.move_cost(c, HexDirection::NE, &climber), Some(20));
    }

    #[test]
    fn move_cost_water_walls_rivers() {
        let mut g = grid(6, 6);
        let c = at(&g, 2, 2);
        let se = g.neighbor(c, HexDirection::SE).unwrap();
        g.set_water_level(se, 1);
        assert_eq!(g.move_cost(c, HexDirection::SE, &MovePolicy::default()), None);
        let swimmer = MovePolicy {
            water_passable: true,
            ..MovePolicy::default()
        };
        assert_eq!(g.move_cost(c, HexDirection::SE, &swimmer), Some(5));

        let sw = g.neighbor(c, HexDirection::SW).unwrap();
        g.set_walled(sw, true);
        assert_eq!(g.move_cost(c, HexDirection::SW, &MovePolicy::default()), None);
        let siege = MovePolicy {
            walls_block: false,
            ..MovePolicy::default()
        };
        assert_eq!(g.move_cost(c, HexDirection::SW, &siege), Some(5));

        g.set_outgoing_river(c, HexDirection::E);
        assert_eq!(g.move_cost(c, HexDirection::E, &MovePolicy::default()), Some(10));
        let blocked = MovePolicy {
            rivers: RiverCrossing::Blocked,
            ..MovePolicy::default()
        };
        assert_eq!(g.move_cost(c, HexDirection::E, &blocked), None);
        let free = MovePolicy {
            rivers: RiverCrossing::Free,
            ..MovePolicy::default()
        };
        assert_eq!(g.move_cost(c, HexDirection::E, &free), Some(5));
    }

    // ── Search ──────────────────────────────────────────────────────────

    #[test]
    fn same_cell_is_single_cell_path() {
        let mut g = grid(4, 4);
        let c = at(&g, 1, 1);
        let path = g.find_path(c, c, &MovePolicy::default()).unwrap();
        assert_eq!(path.cells, vec![c]);
        assert_eq!(path.cost, 0);
        assert_eq!(path.turns(24), 0);
    }

    #[test]
    fn straight_line_path() {
        let mut g = grid(5, 5);
        let start = at(&g, 0, 0);
        let goal = at(&g, 4, 0);
        let path = g.find_path(start, goal, &MovePolicy::default()).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.cost, 20);
        assert_eq!(path.start(), Some(start));
        assert_eq!(path.goal(), Some(goal));
        for pair in path.cells.windows(2) {
            let a = g.cells()[pair[0]].coordinates();
            let b = g.cells()[pair[1]].coordinates();
            assert_eq!(a.distance_to(&b), 1);
        }
    }

    #[test]
    fn invalid_indices_have_no_path() {
        let mut g = grid(3, 3);
        assert_eq!(g.find_path(0, 100, &MovePolicy::default()), None);
        assert_eq!(g.find_path(100, 0, &MovePolicy::default()), None);
    }

    #[test]
    fn water_barrier_means_no_path() {
        let mut g = grid(5, 5);
        for row in 0..5 {
            let c = at(&g, 2, row);
            g.set_water_level(c, 1);
        }
        let start = at(&g, 0, 2);
        let goal = at(&g, 4, 2);
        assert_eq!(g.find_path(start, goal, &MovePolicy::default()), None);
        let swimmer = MovePolicy {
            water_passable: true,
            ..MovePolicy::default()
        };
        assert!(g.find_path(start, goal, &swimmer).is_some());
    }

    #[test]
    fn detours_around_costly_cells() {
        let mut config = MapConfig::with_size(5, 3);
        config.move_costs.fallback = 50;
        let mut g = HexGrid::new(config).unwrap();
        let start = at(&g, 0, 1);
        let goal = at(&g, 4, 1);
        for column in 1..4 {
            let c = at(&g, column, 1);
            g.set_terrain_type(c, 200);
        }
        let path = g.find_path(start, goal, &MovePolicy::default()).unwrap();
        // The only four-step route is straight through the costly row.
        assert_eq!(path.len(), 6);
        assert_eq!(path.cost, 25);
        for &c in &path.cells[1..path.len() - 1] {
            assert_ne!(g.cells()[c].coordinates().z(), 1);
        }
    }

    #[test]
    fn repeated_searches_agree() {
        let mut g = grid(8, 8);
        let start = at(&g, 0, 0);
        let goal = at(&g, 7, 6);
        let first = g.find_path(start, goal, &MovePolicy::default()).unwrap();
        for _ in 0..5 {
            let again = g.find_path(start, goal, &MovePolicy::default()).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn separate_pathfinders_agree() {
        let g = grid(6, 6);
        let mut a = Pathfinder::new();
        let mut b = Pathfinder::new();
        let policy = MovePolicy::default();
        let pa = a.find_path(&g, 0, 35, &policy);
        let pb = b.find_path(&g, 0, 35, &policy);
        assert_eq!(pa, pb);
        assert!(a.last_expansions() > 0);
    }

    #[test]
    fn budget_abandons_then_next_search_is_clean() {
        let mut g = grid(10, 10);
        let start = at(&g, 0, 0);
        let goal = at(&g, 9, 9);
        let policy = MovePolicy::default();
        assert_eq!(
            g.find_path_within(start, goal, &policy, 3),
            SearchOutcome::Abandoned
        );
        let path = match g.find_path_within(start, goal, &policy, usize::MAX) {
            SearchOutcome::Found(path) => path,
            other => panic!("expected a path, got {other:?}"),
        };
        assert_eq!(Some(path), g.find_path(start, goal, &policy));
    }

    #[test]
    fn speed_budget_counts_turns() {
        let mut g = grid(8, 1);
        let start = at(&g, 0, 0);
        let goal = at(&g, 7, 0);
        let path = g.find_path(start, goal, &MovePolicy::with_speed(12)).unwrap();
        // Two 5-cost steps per 12-point turn: 7 steps take 4 turns.
        assert_eq!(path.len(), 8);
        assert_eq!(path.turns(12), 4);
        assert_eq!(path.cost, 3 * 12 + 5);
    }

    #[test]
    fn step_larger_than_speed_is_impossible() {
        let mut g = grid(3, 1);
        assert_eq!(g.find_path(0, 2, &MovePolicy::with_speed(4)), None);
    }
}
