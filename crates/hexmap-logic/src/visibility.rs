//! Fog of war.
//!
//! Each cell keeps a count of the observers that currently see it. An
//! observer's visible set is a breadth-first search out to its range. A cell
//! is only added to the search when the straight sightline from the
//! observer's eye to the cell's view elevation clears every cell on the
//! traversal path between them; anything blocked is not expanded from that
//! direction.
//!
//! The search keeps its own phase-stamped scratch, separate from the
//! pathfinder's.
//!
//! The grid also records every active observer, so that an edit which moves
//! sightlines can recount from scratch.

use std::collections::VecDeque;

use crate::cell::{CellIndex, HexCell};
use crate::grid::HexGrid;

#[derive(Debug, Clone, Copy, Default)]
struct VisionScratch {
    phase: u32,
    distance: u32,
    from: Option<CellIndex>,
}

/// One outstanding `increase_visibility` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observer {
    pub center: CellIndex,
    pub range: u32,
}

/// Reusable range-search state.
#[derive(Debug, Default)]
pub struct VisionSearch {
    phase: u32,
    scratch: Vec<VisionScratch>,
    frontier: VecDeque<CellIndex>,
}

impl VisionSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells visible from `center` within `range` steps, in visit order.
    /// The center itself is always first. Each cell appears at most once.
    pub fn visible_cells(&mut self, grid: &HexGrid, center: CellIndex, range: u32) -> Vec<CellIndex> {
        let mut visible = Vec::new();
        if center >= grid.cell_count() {
            return visible;
        }
        self.begin_phase(grid.cell_count());
        let phase = self.phase;
        let cells = grid.cells();
        let eye = cells[center].view_elevation() as i64;

        self.frontier.clear();
        self.scratch[center] = VisionScratch {
            phase,
            distance: 0,
            from: None,
        };
        self.frontier.push_back(center);

        while let Some(current) = self.frontier.pop_front() {
            visible.push(current);
            let distance = self.scratch[current].distance;
            if distance >= range {
                continue;
            }
            for (_, neighbor) in cells[current].neighbors() {
                if self.scratch[neighbor].phase == phase {
                    continue;
                }
                // Not stamped when blocked: another cell of the same ring may
                // still have a clear line to it.
                if self.occluded(cells, current, eye, distance + 1, cells[neighbor].view_elevation()) {
                    continue;
                }
                self.scratch[neighbor] = VisionScratch {
                    phase,
                    distance: distance + 1,
                    from: Some(current),
                };
                self.frontier.push_back(neighbor);
            }
        }
        visible
    }

    fn begin_phase(&mut self, cell_count: usize) {
        if self.scratch.len() != cell_count {
            self.scratch = vec![VisionScratch::default(); cell_count];
            self.phase = 0;
        }
        if self.phase == u32::MAX {
            for s in &mut self.scratch {
                s.phase = 0;
            }
            self.phase = 0;
        }
        self.phase += 1;
    }

    /// Whether any cell on the path back from `via` to the center rises
    /// strictly above the line from the eye (distance 0) to the target at
    /// `target_distance`.
    fn occluded(
        &self,
        cells: &[HexCell],
        via: CellIndex,
        eye: i64,
        target_distance: u32,
        target_view: i32,
    ) -> bool {
        let n = target_distance as i64;
        let rise = target_view as i64 - eye;
        let mut step = Some(via);
        while let Some(s) = step {
            let entry = self.scratch[s];
            if entry.distance == 0 {
                break;
            }
            let k = entry.distance as i64;
            // view(s) > eye + rise * k / n, scaled by n
            if cells[s].view_elevation() as i64 * n > eye * n + rise * k {
                return true;
            }
            step = entry.from;
        }
        false
    }
}

impl HexGrid {
    /// Cells an observer at `center` would see within `range`.
    pub fn visible_cells(&mut self, center: CellIndex, range: u32) -> Vec<CellIndex> {
        let mut search = std::mem::take(&mut self.vision);
        let cells = search.visible_cells(self, center, range);
        self.vision = search;
        cells
    }

    /// Observers whose visibility is currently applied.
    pub fn observers(&self) -> &[Observer] {
        &self.observers
    }

    /// Add one observer's worth of visibility around `center`.
    pub fn increase_visibility(&mut self, center: CellIndex, range: u32) {
        if center >= self.cells.len() {
            return;
        }
        self.observers.push(Observer { center, range });
        for index in self.visible_cells(center, range) {
            let cell = &mut self.cells[index];
            cell.visibility += 1;
            if cell.visibility == 1 {
                cell.explored = true;
                self.events.visibility_changed.insert(index);
            }
        }
    }

    /// Remove one observer's worth of visibility. Counts stop at zero.
    ///
    /// A call with no matching observer still lowers the counts it reaches;
    /// the next rebuild restores them from the observers that remain.
    pub fn decrease_visibility(&mut self, center: CellIndex, range: u32) {
        let observer = Observer { center, range };
        match self.observers.iter().rposition(|o| *o == observer) {
            Some(i) => {
                self.observers.swap_remove(i);
            }
            None => log::warn!("No observer at cell {} with range {}", center, range),
        }
        for index in self.visible_cells(center, range) {
            let cell = &mut self.cells[index];
            if cell.visibility == 0 {
                log::warn!(
                    "Visibility underflow at cell {} {}; unmatched decrease from {}",
                    index,
                    cell.coordinates,
                    center
                );
                continue;
            }
            cell.visibility -= 1;
            if cell.visibility == 0 {
                self.events.visibility_changed.insert(index);
            }
        }
    }

    /// Drop a cell's count to zero. Explored stays set. Observers stay
    /// registered, so a later rebuild counts the cell again.
    pub fn reset_visibility(&mut self, index: CellIndex) {
        if let Some(cell) = self.cells.get_mut(index) {
            if cell.visibility > 0 {
                cell.visibility = 0;
                self.events.visibility_changed.insert(index);
            }
        }
    }

    pub fn reset_all_visibility(&mut self) {
        for index in 0..self.cells.len() {
            self.reset_visibility(index);
        }
    }

    /// Recompute every count from the active observers.
    ///
    /// Called after an edit changes a view elevation.
    pub fn rebuild_visibility(&mut self) {
        let observers = self.observers.clone();
        let mut counts = vec![0u32; self.cells.len()];
        for observer in &observers {
            for index in self.visible_cells(observer.center, observer.range) {
                counts[index] += 1;
            }
        }

        for (cell, count) in self.cells.iter_mut().zip(counts) {
            let was_visible = cell.visibility > 0;
            let was_explored = cell.explored;
            cell.visibility = count;
            if count > 0 {
                cell.explored = true;
            }
            if was_visible != (count > 0) || was_explored != cell.explored {
                self.events.visibility_changed.insert(cell.index);
            }
        }
        log::debug!("Rebuilt visibility for {} observers", observers.len());
    }
}
