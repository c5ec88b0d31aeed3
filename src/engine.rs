use rand::{rngs::StdRng, SeedableRng};

use crate::catalog::{Module, ModuleCatalog};
use crate::collapse::{choose_module, commit_collapse, select_target};
use crate::counts::{GlobalCounts, GlobalLimits};
use crate::error::WfcError;
use crate::grid::Grid;
use crate::propagate::propagate;
use crate::snapshot::{Snapshot, SnapshotStack};
use crate::ModuleId;

/// Orchestrates select -> snapshot -> collapse -> propagate -> backtrack.
/// Owns the grid, catalog, counters, snapshot stack, and the seeded RNG;
/// the only source of randomness in the crate besides `RejectionSampler`'s
/// outer seed draw.
pub struct Engine {
    width: usize,
    height: usize,
    grid: Grid,
    catalog: ModuleCatalog,
    counts: GlobalCounts,
    limits: GlobalLimits,
    snapshot_stack: SnapshotStack,
    rng: StdRng,
    heuristics_on: bool,
    /// (x, y, id) pairs applied via `remove_possibility` before `run()`;
    /// replayed verbatim if the at-most-once relaxation retry re-initializes
    /// the grid from scratch.
    hard_constraints: Vec<(usize, usize, ModuleId)>,
}

impl Engine {
    pub fn new(width: usize, height: usize, modules: Vec<Module>) -> Result<Self, WfcError> {
        let catalog = ModuleCatalog::new(modules)?;
        let grid = Grid::new(width, height, &catalog)?;
        Ok(Engine {
            width,
            height,
            grid,
            catalog,
            counts: GlobalCounts::new(),
            limits: GlobalLimits::new(),
            snapshot_stack: SnapshotStack::new(),
            rng: StdRng::from_entropy(),
            heuristics_on: false,
            hard_constraints: Vec::new(),
        })
    }

    pub fn set_seed(&mut self, seed: u32) {
        self.rng = StdRng::seed_from_u64(seed as u64);
    }

    pub fn set_global_module_limit(&mut self, id: impl Into<ModuleId>, cap: u32) {
        self.limits.set(id, cap);
    }

    pub fn set_heuristic_tie_breaking(&mut self, on: bool) {
        self.heuristics_on = on;
    }

    /// `None` (the default) means unbounded history.
    pub fn set_snapshot_budget(&mut self, budget: Option<usize>) {
        self.snapshot_stack = SnapshotStack::with_budget(budget);
    }

    /// Pre-run hook: apply an initial hard constraint. Must be called
    /// before `run()`. Propagates eagerly so unsatisfiable setups fail fast
    /// rather than only surfacing once the main loop reaches that cell.
    pub fn remove_possibility(&mut self, x: usize, y: usize, id: &str) -> Result<(), WfcError> {
        self.grid.remove_possibility(x, y, id)?;
        self.hard_constraints.push((x, y, id.to_string()));
        let _ = propagate(&mut self.grid, &self.catalog, (x, y));
        Ok(())
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn global_counts(&self) -> &GlobalCounts {
        &self.counts
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    fn any_contradiction(&self) -> bool {
        self.grid
            .cells()
            .iter()
            .any(|c| !c.is_collapsed && c.possible_modules.is_empty())
    }

    /// Restore the most recent snapshot, forbid the choice that led to the
    /// contradiction, and re-propagate; recursing (via loop) into an older
    /// snapshot if that cell or the re-propagation itself is still dead.
    /// `Err(UnsatisfiableAfterBacktracking)` means the whole search space is
    /// exhausted.
    fn backtrack(&mut self) -> Result<(), WfcError> {
        loop {
            let Some(snapshot) = self.snapshot_stack.pop() else {
                return Err(WfcError::UnsatisfiableAfterBacktracking);
            };
            let Snapshot {
                cell_x,
                cell_y,
                attempted_module_id,
                possibilities_by_cell,
                counts_before,
            } = snapshot;

            self.grid.restore_possibilities(&possibilities_by_cell);
            self.counts = counts_before;

            log::debug!(
                "backtracking from ({cell_x}, {cell_y}), rejecting module '{attempted_module_id}'"
            );
            self.grid
                .remove_possibility(cell_x, cell_y, &attempted_module_id)?;

            let target_is_dead = self
                .grid
                .cell(cell_x, cell_y)
                .expect("snapshot coordinates stay in bounds")
                .possible_modules
                .is_empty();
            if target_is_dead {
                continue;
            }

            if propagate(&mut self.grid, &self.catalog, (cell_x, cell_y)).is_err() {
                continue;
            }
            return Ok(());
        }
    }

    fn run_once(&mut self) -> Result<(), WfcError> {
        loop {
            if self.grid.is_fully_collapsed() {
                return Ok(());
            }

            let target = select_target(&self.grid, &mut self.rng, self.heuristics_on);
            let (x, y) = match target {
                Some(t) => t,
                None => {
                    if self.any_contradiction() {
                        self.backtrack()?;
                        continue;
                    }
                    return Ok(());
                }
            };

            let possible = self
                .grid
                .cell(x, y)
                .expect("select_target returns in-bounds coords")
                .possible_modules
                .clone();
            if possible.is_empty() {
                self.backtrack()?;
                continue;
            }

            let Some(module_id) =
                choose_module(&possible, &self.catalog, &self.counts, &self.limits, &mut self.rng)
            else {
                self.backtrack()?;
                continue;
            };

            let snapshot = Snapshot {
                cell_x: x,
                cell_y: y,
                attempted_module_id: module_id.clone(),
                possibilities_by_cell: self.grid.snapshot_possibilities(),
                counts_before: self.counts.clone(),
            };
            if !self.snapshot_stack.push(snapshot) {
                return Err(WfcError::OutOfBudget);
            }

            commit_collapse(
                self.grid.cell_mut(x, y).expect("target is in bounds"),
                &module_id,
                &mut self.counts,
            );

            if propagate(&mut self.grid, &self.catalog, (x, y)).is_err() {
                self.backtrack()?;
                continue;
            }
        }
    }

    /// Re-initialize the grid and snapshot stack from scratch, replaying
    /// the pre-run hard constraints, for the relaxation retry. Counts reset
    /// to zero; the RNG is left untouched so the relaxed attempt continues
    /// the same deterministic stream rather than restarting it.
    fn reset_for_relaxation(&mut self) -> Result<(), WfcError> {
        self.grid = Grid::new(self.width, self.height, &self.catalog)?;
        self.counts = GlobalCounts::new();
        self.snapshot_stack.clear();
        for (x, y, id) in self.hard_constraints.clone() {
            self.grid.remove_possibility(x, y, &id)?;
            let _ = propagate(&mut self.grid, &self.catalog, (x, y));
        }
        Ok(())
    }

    /// Run the solver. `Ok(true)` on success, `Ok(false)` if the search
    /// space (including the at-most-once relaxation retry, when enabled)
    /// was exhausted. `Err(WfcError::OutOfBudget)` if a configured snapshot
    /// budget was exceeded; that and `UnsatisfiableAfterBacktracking` (which
    /// this method collapses to `Ok(false)`) are the only failure kinds
    /// allowed to reach the caller.
    pub fn run(&mut self, relaxation: bool) -> Result<bool, WfcError> {
        match self.run_once() {
            Ok(()) => Ok(true),
            Err(WfcError::UnsatisfiableAfterBacktracking) if relaxation => {
                log::debug!("top-level search exhausted; relaxing global caps and retrying");
                self.limits.lift_all();
                self.reset_for_relaxation()?;
                match self.run_once() {
                    Ok(()) => Ok(true),
                    Err(WfcError::UnsatisfiableAfterBacktracking) => Ok(false),
                    Err(e) => Err(e),
                }
            }
            Err(WfcError::UnsatisfiableAfterBacktracking) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
