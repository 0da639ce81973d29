//! Target structures and the suppliers that produce them.
//!
//! A [`TargetStructure`] is the voxel configuration agents must reproduce.
//! It is built once per episode, either from an external voxel list
//! (sanitized here, at the ingestion boundary) or by a [`TargetGenerator`].

pub mod dataset;
pub mod procedural;

use rand::rngs::StdRng;
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::EnvError;
use crate::grid::VoxelGrid;
use crate::types::Coord;

pub use dataset::{DatasetTargets, TrainingPair};
#[cfg(feature = "serde")]
pub use dataset::{load_training_pairs, parse_training_pairs, save_training_pairs};
pub use procedural::{ProceduralTargets, ShapeKind};

/// How out-of-range voxel coordinates are handled at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CoordinatePolicy {
    /// Silently discard voxels outside the grid (a warning is logged).
    #[default]
    Drop,
    /// Move each out-of-range component to the nearest valid index.
    Clamp,
    /// Fail with [`EnvError::OutOfBounds`] on the first bad voxel.
    Reject,
}

/// An immutable per-episode target occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetStructure {
    grid: VoxelGrid,
    label: String,
}

impl TargetStructure {
    /// Wraps an existing occupancy grid.
    pub fn from_grid(grid: VoxelGrid, label: impl Into<String>) -> Self {
        Self {
            grid,
            label: label.into(),
        }
    }

    /// An empty target of side `size`.
    pub fn empty(size: usize) -> Self {
        Self::from_grid(VoxelGrid::new(size), "empty")
    }

    /// Builds a target from an external voxel list.
    ///
    /// Duplicate voxels are harmless. Out-of-range voxels are handled
    /// according to `policy`, so nothing outside `[0, size)³` ever reaches
    /// the grid.
    pub fn from_voxels(
        size: usize,
        voxels: &[Coord],
        policy: CoordinatePolicy,
        label: impl Into<String>,
    ) -> Result<Self, EnvError> {
        let label = label.into();
        let mut grid = VoxelGrid::new(size);
        let mut dropped = 0usize;
        let mut clamped = 0usize;

        for &voxel in voxels {
            let cell = if voxel.in_bounds(size) {
                voxel
            } else {
                match policy {
                    CoordinatePolicy::Drop => {
                        dropped += 1;
                        continue;
                    }
                    CoordinatePolicy::Clamp if size > 0 => {
                        clamped += 1;
                        voxel.clamped(size)
                    }
                    CoordinatePolicy::Clamp | CoordinatePolicy::Reject => {
                        return Err(EnvError::OutOfBounds {
                            coord: voxel,
                            grid_size: size,
                        })
                    }
                }
            };
            grid.set(cell, true)?;
        }

        if dropped > 0 || clamped > 0 {
            warn!(
                label = %label,
                dropped,
                clamped,
                grid_size = size,
                "out-of-range target voxels sanitized"
            );
        }

        Ok(Self { grid, label })
    }

    /// Occupancy grid of the target.
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.grid.size()
    }

    /// Human-readable label (shape name or text prompt).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// True if `coord` is a target cell.
    pub fn contains(&self, coord: Coord) -> bool {
        self.grid.is_occupied(coord)
    }

    /// Number of target cells.
    pub fn cell_count(&self) -> usize {
        self.grid.count_occupied()
    }

    /// True if the target has no cells.
    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// Target cells as a voxel list.
    pub fn voxels(&self) -> Vec<Coord> {
        self.grid.occupied().collect()
    }

    /// Fraction of target cells filled in `built`, in `[0, 1]`.
    ///
    /// An empty target scores 0.0.
    pub fn match_score(&self, built: &VoxelGrid) -> f64 {
        let total = self.cell_count();
        if total == 0 {
            return 0.0;
        }
        let (correct, _) = built.compare(&self.grid);
        correct as f64 / total as f64
    }

    /// Four-level stepped pyramid centred in a 10-wide grid.
    pub fn fallback_pyramid() -> Vec<Coord> {
        let levels = 4;
        let mut voxels = Vec::new();
        for level in 0..levels {
            let size = levels - level;
            let offset = (size - 1) as f64 / 2.0;
            for i in 0..size {
                for j in 0..size {
                    let x = (i as f64 - offset + 5.0) as i32;
                    let z = (j as f64 - offset + 5.0) as i32;
                    voxels.push(Coord::new(x, level, z));
                }
            }
        }
        voxels
    }

    /// Eight-wide, three-high wall centred in a 10-wide grid.
    pub fn fallback_wall() -> Vec<Coord> {
        let (width, height) = (8, 3);
        let start_x = 5 - width / 2;
        let z = 5;
        (0..width)
            .flat_map(|i| (0..height).map(move |h| Coord::new(start_x + i, h, z)))
            .collect()
    }
}

/// A supplier of episode targets.
///
/// Implementations draw any randomness from the supplied generator so that
/// episodes are reproducible from the environment seed.
pub trait TargetGenerator: Send + Sync {
    /// Produces the target for the next episode on a grid of side `grid_size`.
    fn generate(
        &mut self,
        grid_size: usize,
        rng: &mut StdRng,
    ) -> Result<TargetStructure, EnvError>;

    /// Returns a human-readable name for this generator.
    fn name(&self) -> &str;
}
