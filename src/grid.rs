use std::collections::HashSet;

use crate::catalog::ModuleCatalog;
use crate::error::WfcError;
use crate::ModuleId;

/// A single grid cell: a possibility set over module ids, plus the
/// collapsed/chosen bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub possible_modules: HashSet<ModuleId>,
    pub is_collapsed: bool,
    pub chosen_module_id: Option<ModuleId>,
}

impl Cell {
    fn new(all_ids: HashSet<ModuleId>) -> Self {
        Cell {
            possible_modules: all_ids,
            is_collapsed: false,
            chosen_module_id: None,
        }
    }

    /// |possibleModules| - the solver's actual selection metric.
    pub fn entropy(&self) -> usize {
        self.possible_modules.len()
    }
}

/// Row-major 2D array of cells, width x height, width/height >= 1.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize, catalog: &ModuleCatalog) -> Result<Self, WfcError> {
        if width == 0 || height == 0 {
            return Err(WfcError::InvalidDimensions { width, height });
        }
        let all_ids: HashSet<ModuleId> = catalog.all_ids().cloned().collect();
        let cells = (0..width * height)
            .map(|_| Cell::new(all_ids.clone()))
            .collect();
        Ok(Grid {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn cell_mut(&mut self, x: usize, y: usize) -> Option<&mut Cell> {
        self.index(x, y).map(move |i| &mut self.cells[i])
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_fully_collapsed(&self) -> bool {
        self.cells.iter().all(|c| c.is_collapsed)
    }

    /// Neighbor coordinate in `direction` from (x, y), or `None` if out of bounds.
    pub fn neighbor(&self, x: usize, y: usize, direction: crate::Direction) -> Option<(usize, usize)> {
        let (dx, dy) = direction.offset();
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        if nx >= 0 && ny >= 0 && (nx as usize) < self.width && (ny as usize) < self.height {
            Some((nx as usize, ny as usize))
        } else {
            None
        }
    }

    /// Drop `id` from (x, y)'s possibility set if present. Does not
    /// propagate; the caller is responsible for checking emptiness and for
    /// invoking the propagator afterward.
    pub fn remove_possibility(&mut self, x: usize, y: usize, id: &str) -> Result<bool, WfcError> {
        let cell = self
            .cell_mut(x, y)
            .ok_or(WfcError::InvalidCoordinate { x, y })?;
        Ok(cell.possible_modules.remove(id))
    }

    /// Equivalent to `remove_possibility` for every id other than `id`;
    /// used for initial hard constraints ("this cell must be module X").
    pub fn pin_to(&mut self, x: usize, y: usize, id: &str) -> Result<(), WfcError> {
        let cell = self
            .cell_mut(x, y)
            .ok_or(WfcError::InvalidCoordinate { x, y })?;
        cell.possible_modules.retain(|m| m == id);
        Ok(())
    }

    /// Full deep copy of every cell's possibility set, row-major; the
    /// payload a `Snapshot` carries.
    pub fn snapshot_possibilities(&self) -> Vec<HashSet<ModuleId>> {
        self.cells
            .iter()
            .map(|c| c.possible_modules.clone())
            .collect()
    }

    /// Restore every cell's possibility set from a prior snapshot, and
    /// uncollapse every cell (uniform reset; simpler and correct since the
    /// snapshot already holds the full pre-collapse state).
    pub fn restore_possibilities(&mut self, possibilities: &[HashSet<ModuleId>]) {
        for (cell, saved) in self.cells.iter_mut().zip(possibilities) {
            cell.is_collapsed = false;
            cell.chosen_module_id = None;
            cell.possible_modules = saved.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Module;

    fn catalog(ids: &[&str]) -> ModuleCatalog {
        ModuleCatalog::new(ids.iter().map(|id| Module::new(*id, 1.0)).collect()).unwrap()
    }

    #[test]
    fn rejects_zero_dimensions() {
        let cat = catalog(&["a"]);
        assert!(matches!(
            Grid::new(0, 3, &cat).unwrap_err(),
            WfcError::InvalidDimensions { .. }
        ));
        assert!(matches!(
            Grid::new(3, 0, &cat).unwrap_err(),
            WfcError::InvalidDimensions { .. }
        ));
    }

    #[test]
    fn every_cell_starts_in_full_superposition() {
        let cat = catalog(&["a", "b", "c"]);
        let grid = Grid::new(2, 2, &cat).unwrap();
        for cell in grid.cells() {
            assert!(!cell.is_collapsed);
            assert_eq!(cell.possible_modules.len(), 3);
        }
    }

    #[test]
    fn remove_possibility_and_pin_to() {
        let cat = catalog(&["a", "b", "c"]);
        let mut grid = Grid::new(2, 2, &cat).unwrap();
        assert!(grid.remove_possibility(0, 0, "b").unwrap());
        assert!(!grid.remove_possibility(0, 0, "b").unwrap());
        assert_eq!(grid.cell(0, 0).unwrap().possible_modules.len(), 2);

        grid.pin_to(1, 1, "c").unwrap();
        let cell = grid.cell(1, 1).unwrap();
        assert_eq!(cell.possible_modules.len(), 1);
        assert!(cell.possible_modules.contains("c"));
    }

    #[test]
    fn out_of_bounds_coordinate_is_an_error() {
        let cat = catalog(&["a"]);
        let mut grid = Grid::new(2, 2, &cat).unwrap();
        assert!(matches!(
            grid.remove_possibility(5, 5, "a").unwrap_err(),
            WfcError::InvalidCoordinate { x: 5, y: 5 }
        ));
    }

    #[test]
    fn neighbor_respects_bounds() {
        let cat = catalog(&["a"]);
        let grid = Grid::new(2, 2, &cat).unwrap();
        assert_eq!(grid.neighbor(0, 0, crate::Direction::Top), None);
        assert_eq!(
            grid.neighbor(0, 0, crate::Direction::Right),
            Some((1, 0))
        );
    }
}
