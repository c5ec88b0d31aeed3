use std::collections::HashSet;

use crate::catalog::ModuleCatalog;
use crate::grid::Grid;
use crate::Direction;

/// After any change that reduces a cell's possibility set, propagate
/// arc-consistency outward from that cell. Returns `Ok(())` on success, or
/// `Err(())` the moment any cell's possibility set empties out; a
/// contradiction, which the caller (the Engine) resolves via backtrack.
///
/// Uses a LIFO worklist; re-pushing a coordinate is harmless since
/// termination only depends on each push corresponding to at least one
/// removed possibility from a finite set.
pub fn propagate(grid: &mut Grid, catalog: &ModuleCatalog, origin: (usize, usize)) -> Result<(), ()> {
    let mut worklist = vec![origin];

    while let Some((x, y)) = worklist.pop() {
        let current = grid.cell(x, y).expect("worklist coordinates stay in bounds");
        let support: Vec<_> = if current.is_collapsed {
            current
                .chosen_module_id
                .iter()
                .cloned()
                .collect()
        } else {
            current.possible_modules.iter().cloned().collect()
        };

        for direction in Direction::ALL {
            let Some((nx, ny)) = grid.neighbor(x, y, direction) else {
                continue;
            };
            let neighbor = grid.cell(nx, ny).expect("neighbor() returns in-bounds coords");
            if neighbor.is_collapsed {
                continue;
            }

            // Union of every support id's precomputed partner set on this
            // side, so each candidate is a plain set-membership check rather
            // than a support x candidate compatibility scan.
            let mut supported: HashSet<&str> = HashSet::new();
            for s in &support {
                supported.extend(catalog.compatible_partners(s, direction).iter().map(String::as_str));
            }

            let to_remove: Vec<_> = neighbor
                .possible_modules
                .iter()
                .filter(|candidate| !supported.contains(candidate.as_str()))
                .cloned()
                .collect();

            if to_remove.is_empty() {
                continue;
            }

            let neighbor_mut = grid
                .cell_mut(nx, ny)
                .expect("neighbor() returns in-bounds coords");
            for id in &to_remove {
                neighbor_mut.possible_modules.remove(id);
            }

            if neighbor_mut.possible_modules.is_empty() {
                return Err(());
            }
            worklist.push((nx, ny));
        }
    }

    Ok(())
}
