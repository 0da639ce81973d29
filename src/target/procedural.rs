//! Procedural target shapes.
//!
//! Generates a diverse family of grounded 3D structures so that policies
//! learn to build arbitrary targets rather than memorizing one. Every
//! shape is clipped to the grid, so small grids produce truncated shapes
//! instead of panicking.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{TargetGenerator, TargetStructure};
use crate::error::EnvError;
use crate::grid::VoxelGrid;
use crate::types::Coord;

/// Families of procedurally generated targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ShapeKind {
    Pyramid,
    Tower,
    Wall,
    Cube,
    Staircase,
    Bridge,
    Arch,
    Platform,
    RandomSparse,
}

impl ShapeKind {
    /// Returns all shape kinds.
    pub fn all() -> [ShapeKind; 9] {
        [
            ShapeKind::Pyramid,
            ShapeKind::Tower,
            ShapeKind::Wall,
            ShapeKind::Cube,
            ShapeKind::Staircase,
            ShapeKind::Bridge,
            ShapeKind::Arch,
            ShapeKind::Platform,
            ShapeKind::RandomSparse,
        ]
    }

    /// Builds this shape on a grid of side `size`.
    ///
    /// Never returns an empty grid for `size > 0`: if clipping removes every
    /// cell, the ground cell at the horizontal centre is used instead.
    pub fn build(&self, size: usize, rng: &mut StdRng) -> VoxelGrid {
        let mut b = Builder::new(size);
        let n = size as i32;
        let center = n / 2;

        match self {
            ShapeKind::Pyramid => {
                let max_height = 4;
                for y in 0..max_height {
                    let side = max_height - y;
                    let off = (n - side) / 2;
                    b.fill(off..off + side, y..y + 1, off..off + side);
                }
            }
            ShapeKind::Tower => {
                let height = pick(rng, 3, 6);
                let x = pick(rng, 2, n - 2);
                let z = pick(rng, 2, n - 2);
                b.fill(x..x + 1, 0..height, z..z + 1);
            }
            ShapeKind::Wall => {
                let height = pick(rng, 2, 5);
                let at = pick(rng, 2, n - 2);
                if rng.gen_bool(0.5) {
                    b.fill(at..at + 1, 0..height, 0..n);
                } else {
                    b.fill(0..n, 0..height, at..at + 1);
                }
            }
            ShapeKind::Cube => {
                let side = pick(rng, 2, 4);
                let x = pick(rng, 1, n - side - 1);
                let z = pick(rng, 1, n - side - 1);
                b.fill(x..x + side, 0..side, z..z + side);
            }
            ShapeKind::Staircase => {
                for i in 0..5_i32.min(n - 2) {
                    b.set(Coord::new(i + 1, i, center));
                }
            }
            ShapeKind::Bridge => {
                let height = 3;
                b.fill(2..3, 0..height, center..center + 1);
                b.fill(6..7, 0..height, center..center + 1);
                b.fill(2..7, height - 1..height, center..center + 1);
            }
            ShapeKind::Arch => {
                b.fill(2..3, 0..3, center..center + 1);
                b.fill(5..6, 0..3, center..center + 1);
                b.fill(2..6, 2..3, center..center + 1);
            }
            ShapeKind::Platform => {
                let height = pick(rng, 1, 4);
                let side = pick(rng, 3, 5);
                let off = (n - side) / 2;
                b.fill(off..off + side, height..height + 1, off..off + side);
            }
            ShapeKind::RandomSparse => {
                let blocks = pick(rng, 5, 16);
                for _ in 0..blocks {
                    let x = pick(rng, 1, n - 1);
                    let y = pick(rng, 0, 4_i32.min(n - 1));
                    let z = pick(rng, 1, n - 1);
                    b.set(Coord::new(x, y, z));
                }
            }
        }

        if b.grid.count_occupied() == 0 && size > 0 {
            b.set(Coord::new(center, 0, center));
        }
        b.grid
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Pyramid => "pyramid",
            ShapeKind::Tower => "tower",
            ShapeKind::Wall => "wall",
            ShapeKind::Cube => "cube",
            ShapeKind::Staircase => "staircase",
            ShapeKind::Bridge => "bridge",
            ShapeKind::Arch => "arch",
            ShapeKind::Platform => "platform",
            ShapeKind::RandomSparse => "random_sparse",
        };
        f.write_str(name)
    }
}

/// Uniform integer in `[lo, hi)`, or `lo` when the range is empty.
fn pick(rng: &mut StdRng, lo: i32, hi: i32) -> i32 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// Clipping writer over a fresh grid.
struct Builder {
    grid: VoxelGrid,
}

impl Builder {
    fn new(size: usize) -> Self {
        Self {
            grid: VoxelGrid::new(size),
        }
    }

    fn set(&mut self, coord: Coord) {
        // Out-of-range cells are clipped.
        let _ = self.grid.set(coord, true);
    }

    fn fill(
        &mut self,
        xs: std::ops::Range<i32>,
        ys: std::ops::Range<i32>,
        zs: std::ops::Range<i32>,
    ) {
        for x in xs {
            for y in ys.clone() {
                for z in zs.clone() {
                    self.set(Coord::new(x, y, z));
                }
            }
        }
    }
}

/// Draws a random shape kind for every episode.
#[derive(Debug, Clone)]
pub struct ProceduralTargets {
    kinds: Vec<ShapeKind>,
}

impl ProceduralTargets {
    /// Generator over all shape kinds.
    pub fn new() -> Self {
        Self {
            kinds: ShapeKind::all().to_vec(),
        }
    }

    /// Generator restricted to the given kinds.
    ///
    /// An empty list falls back to all kinds.
    pub fn with_kinds(kinds: Vec<ShapeKind>) -> Self {
        if kinds.is_empty() {
            return Self::new();
        }
        Self { kinds }
    }

    /// Shape kinds this generator draws from.
    pub fn kinds(&self) -> &[ShapeKind] {
        &self.kinds
    }
}

impl Default for ProceduralTargets {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetGenerator for ProceduralTargets {
    fn generate(
        &mut self,
        grid_size: usize,
        rng: &mut StdRng,
    ) -> Result<TargetStructure, EnvError> {
        let kind = *self
            .kinds
            .choose(rng)
            .ok_or_else(|| EnvError::InvalidConfig("no shape kinds configured".into()))?;
        let grid = kind.build(grid_size, rng);
        Ok(TargetStructure::from_grid(grid, kind.to_string()))
    }

    fn name(&self) -> &str {
        "procedural"
    }
}
