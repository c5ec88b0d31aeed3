use rand::Rng;

use crate::catalog::ModuleCatalog;
use crate::counts::{GlobalCounts, GlobalLimits};
use crate::grid::Grid;
use crate::{Direction, ModuleId};

/// Scan the grid for the lowest-entropy uncollapsed, non-contradictory cell.
///
/// Returns `None` iff every cell is either collapsed or has an empty
/// possibility set; in the latter case the caller must check for a
/// contradiction separately, since that is not reported here.
pub fn select_target(
    grid: &Grid,
    rng: &mut impl Rng,
    heuristics_on: bool,
) -> Option<(usize, usize)> {
    let mut min_entropy = usize::MAX;
    let mut candidates: Vec<(usize, usize)> = Vec::new();

    for (i, cell) in grid.cells().iter().enumerate() {
        if cell.is_collapsed || cell.possible_modules.is_empty() {
            continue;
        }
        let entropy = cell.entropy();
        if entropy < min_entropy {
            min_entropy = entropy;
            candidates.clear();
            candidates.push(grid.coords(i));
        } else if entropy == min_entropy {
            candidates.push(grid.coords(i));
        }
    }

    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return Some(candidates[0]);
    }

    if heuristics_on {
        let mut best_frontier = None;
        let mut best: Vec<(usize, usize)> = Vec::new();
        for &(x, y) in &candidates {
            let frontier = count_collapsed_neighbors(grid, x, y);
            match best_frontier {
                None => {
                    best_frontier = Some(frontier);
                    best.push((x, y));
                }
                Some(f) if frontier > f => {
                    best_frontier = Some(frontier);
                    best.clear();
                    best.push((x, y));
                }
                Some(f) if frontier == f => best.push((x, y)),
                _ => {}
            }
        }
        let idx = rng.gen_range(0..best.len());
        Some(best[idx])
    } else {
        let idx = rng.gen_range(0..candidates.len());
        Some(candidates[idx])
    }
}

fn count_collapsed_neighbors(grid: &Grid, x: usize, y: usize) -> usize {
    Direction::ALL
        .iter()
        .filter_map(|&d| grid.neighbor(x, y, d))
        .filter(|&(nx, ny)| grid.cell(nx, ny).map(|c| c.is_collapsed).unwrap_or(false))
        .count()
}

/// Filter a cell's possibilities to those not at their global cap, then draw
/// one weighted by module weight. `None` means every remaining candidate is
/// capped out; a backtrackable "cap exhausted" failure, distinct from a
/// cell-level contradiction (the possibility set itself is still non-empty).
pub fn choose_module(
    possible_modules: &std::collections::HashSet<ModuleId>,
    catalog: &ModuleCatalog,
    counts: &GlobalCounts,
    limits: &GlobalLimits,
    rng: &mut impl Rng,
) -> Option<ModuleId> {
    let mut candidates: Vec<&ModuleId> = possible_modules
        .iter()
        .filter(|id| !counts.is_at_cap(id, limits))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    // Sorted so that, for a fixed RNG draw, the chosen id is a deterministic
    // function of the draw rather than of HashSet iteration order.
    candidates.sort();

    let total_weight: f64 = candidates
        .iter()
        .map(|id| catalog.get(id).map(|m| m.weight).unwrap_or(0.0))
        .sum();

    let mut roll = rng.gen::<f64>() * total_weight;
    for id in &candidates {
        let weight = catalog.get(id).map(|m| m.weight).unwrap_or(0.0);
        if roll < weight {
            return Some((*id).clone());
        }
        roll -= weight;
    }
    // Floating-point rounding may leave a residual roll; fall back to the
    // last candidate rather than panicking.
    candidates.last().map(|id| (*id).clone())
}

/// Commit a cell to `id`: collapse it, narrow its possibility set to the
/// singleton, and bump the global count.
pub fn commit_collapse(cell: &mut crate::grid::Cell, id: &ModuleId, counts: &mut GlobalCounts) {
    cell.is_collapsed = true;
    cell.chosen_module_id = Some(id.clone());
    cell.possible_modules.clear();
    cell.possible_modules.insert(id.clone());
    counts.increment(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Module;
    use rand::SeedableRng;

    fn catalog(weights: &[(&str, f64)]) -> ModuleCatalog {
        ModuleCatalog::new(
            weights
                .iter()
                .map(|(id, w)| Module::new(*id, *w))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn select_target_picks_lowest_entropy() {
        let cat = catalog(&[("a", 1.0), ("b", 1.0)]);
        let mut grid = Grid::new(2, 1, &cat).unwrap();
        grid.pin_to(0, 0, "a").unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let target = select_target(&grid, &mut rng, false).unwrap();
        assert_eq!(target, (0, 0));
    }

    #[test]
    fn select_target_none_when_all_collapsed() {
        let cat = catalog(&[("a", 1.0)]);
        let mut grid = Grid::new(1, 1, &cat).unwrap();
        grid.cell_mut(0, 0).unwrap().is_collapsed = true;
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        assert_eq!(select_target(&grid, &mut rng, false), None);
    }

    #[test]
    fn choose_module_respects_cap() {
        let cat = catalog(&[("a", 1.0), ("b", 1.0)]);
        let mut limits = GlobalLimits::new();
        limits.set("a", 0);
        let mut counts = GlobalCounts::new();
        counts.increment("a"); // already at the (zero) cap, though 0 cap is degenerate; use 1 below instead
        limits.set("a", 1);

        let possible: std::collections::HashSet<ModuleId> =
            ["a".to_string(), "b".to_string()].into_iter().collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let chosen = choose_module(&possible, &cat, &counts, &limits, &mut rng);
        assert_eq!(chosen, Some("b".to_string()));
    }

    #[test]
    fn choose_module_none_when_all_capped() {
        let cat = catalog(&[("a", 1.0)]);
        let mut limits = GlobalLimits::new();
        limits.set("a", 1);
        let mut counts = GlobalCounts::new();
        counts.increment("a");

        let possible: std::collections::HashSet<ModuleId> = ["a".to_string()].into_iter().collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        assert_eq!(choose_module(&possible, &cat, &counts, &limits, &mut rng), None);
    }
}
