//! Cubic voxel occupancy grid.
//!
//! Used both for the mutable construction grid and for the per-episode
//! target. Cells are stored flat in `x`-major order (`(x * N + y) * N + z`),
//! which is also the order in which grids are flattened into observations.

use crate::error::EnvError;
use crate::types::Coord;

/// A cubic occupancy grid of side `size`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoxelGrid {
    size: usize,
    cells: Vec<bool>,
}

impl VoxelGrid {
    /// Creates an empty grid of side `size`.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![false; size * size * size],
        }
    }

    /// Side length of the grid.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells (`size³`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Flat index of an in-bounds coordinate.
    pub fn index(&self, coord: Coord) -> Option<usize> {
        if !coord.in_bounds(self.size) {
            return None;
        }
        let n = self.size;
        Some((coord.x as usize * n + coord.y as usize) * n + coord.z as usize)
    }

    /// Coordinate of a flat index.
    pub fn coord_of(&self, index: usize) -> Coord {
        let n = self.size;
        Coord::new(
            (index / (n * n)) as i32,
            ((index / n) % n) as i32,
            (index % n) as i32,
        )
    }

    /// Occupancy at `coord`; out-of-bounds cells read as empty.
    pub fn is_occupied(&self, coord: Coord) -> bool {
        self.index(coord).map(|i| self.cells[i]).unwrap_or(false)
    }

    /// Sets occupancy at `coord`. Writing the current value again is a no-op.
    pub fn set(&mut self, coord: Coord, occupied: bool) -> Result<(), EnvError> {
        let idx = self.index(coord).ok_or(EnvError::OutOfBounds {
            coord,
            grid_size: self.size,
        })?;
        self.cells[idx] = occupied;
        Ok(())
    }

    /// Empties every cell.
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// Number of occupied cells.
    pub fn count_occupied(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Iterates over the coordinates of occupied cells in flat order.
    pub fn occupied(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c)
            .map(|(i, _)| self.coord_of(i))
    }

    /// Raw cell slice in flat order.
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Appends the grid as `{0.0, 1.0}` values in flat order.
    pub fn extend_features(&self, out: &mut Vec<f64>) {
        out.extend(self.cells.iter().map(|&c| if c { 1.0 } else { 0.0 }));
    }

    /// Counts `(correct, wrong)` blocks of `self` relative to `target`:
    /// occupied cells that are / are not target cells.
    pub fn compare(&self, target: &VoxelGrid) -> (usize, usize) {
        self.cells
            .iter()
            .zip(target.cells.iter())
            .filter(|(&built, _)| built)
            .fold((0, 0), |(correct, wrong), (_, &wanted)| {
                if wanted {
                    (correct + 1, wrong)
                } else {
                    (correct, wrong + 1)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_empty() {
        let g = VoxelGrid::new(4);
        assert_eq!(g.len(), 64);
        assert_eq!(g.count_occupied(), 0);
    }

    #[test]
    fn set_and_read_back() {
        let mut g = VoxelGrid::new(4);
        let c = Coord::new(1, 2, 3);
        g.set(c, true).unwrap();
        assert!(g.is_occupied(c));
        assert_eq!(g.count_occupied(), 1);
        // Idempotent duplicate write.
        g.set(c, true).unwrap();
        assert_eq!(g.count_occupied(), 1);
    }

    #[test]
    fn set_out_of_bounds_errors() {
        let mut g = VoxelGrid::new(4);
        let err = g.set(Coord::new(4, 0, 0), true).unwrap_err();
        assert!(matches!(err, EnvError::OutOfBounds { grid_size: 4, .. }));
    }

    #[test]
    fn out_of_bounds_reads_empty() {
        let g = VoxelGrid::new(2);
        assert!(!g.is_occupied(Coord::new(-1, 0, 0)));
    }

    #[test]
    fn index_and_coord_agree() {
        let g = VoxelGrid::new(5);
        for i in 0..g.len() {
            assert_eq!(g.index(g.coord_of(i)), Some(i));
        }
        assert_eq!(g.index(Coord::new(1, 0, 0)), Some(25));
    }

    #[test]
    fn compare_counts_correct_and_wrong() {
        let mut target = VoxelGrid::new(3);
        target.set(Coord::new(0, 0, 0), true).unwrap();
        target.set(Coord::new(1, 0, 0), true).unwrap();
        let mut built = VoxelGrid::new(3);
        built.set(Coord::new(0, 0, 0), true).unwrap();
        built.set(Coord::new(2, 2, 2), true).unwrap();
        assert_eq!(built.compare(&target), (1, 1));
    }

    #[test]
    fn occupied_iterates_coords() {
        let mut g = VoxelGrid::new(3);
        g.set(Coord::new(2, 1, 0), true).unwrap();
        let cells: Vec<_> = g.occupied().collect();
        assert_eq!(cells, vec![Coord::new(2, 1, 0)]);
    }
}
