//! Scent field: a dense potential derived from a sparse binary target.
//!
//! The field is computed in three stages:
//!
//! 1. Exact Euclidean distance transform of the target complement
//!    (separable lower-envelope algorithm, `O(N³)`).
//! 2. Normalization by the largest distance and inversion, so target cells
//!    score 1 and the farthest cell scores 0.
//! 3. Separable Gaussian smoothing with reflecting boundaries.
//!
//! [`ScentField::compute`] is a pure function of the target and the
//! parameters; [`ScentCache`] memoizes it across episodes that reuse a
//! target.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::grid::VoxelGrid;
use crate::types::Coord;

/// Smoothing parameters for the scent field.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScentParams {
    /// Standard deviation of the Gaussian kernel, in cells.
    pub sigma: f64,
    /// Kernel radius in standard deviations.
    pub truncate: f64,
    /// Force target cells to exactly 1.0 after smoothing.
    pub pin_targets: bool,
}

impl ScentParams {
    /// Kernel radius in cells.
    pub fn radius(&self) -> usize {
        (self.truncate * self.sigma + 0.5).max(0.0) as usize
    }

    /// Normalized 1D Gaussian weights over `[-radius, radius]`.
    pub fn kernel(&self) -> Vec<f64> {
        let r = self.radius() as i64;
        let weights: Vec<f64> = (-r..=r)
            .map(|i| {
                let t = i as f64 / self.sigma;
                (-0.5 * t * t).exp()
            })
            .collect();
        let total: f64 = weights.iter().sum();
        weights.into_iter().map(|w| w / total).collect()
    }
}

impl Default for ScentParams {
    fn default() -> Self {
        Self {
            sigma: 0.5,
            truncate: 4.0,
            pin_targets: true,
        }
    }
}

/// A scalar field over the grid with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScentField {
    size: usize,
    values: Vec<f64>,
}

impl ScentField {
    /// An all-zero field.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size * size],
        }
    }

    /// Computes the field for `target`.
    ///
    /// An empty target yields an all-zero field. A target with no empty
    /// cells (zero maximum distance) mirrors the target.
    pub fn compute(target: &VoxelGrid, params: &ScentParams) -> Self {
        let size = target.size();
        if target.count_occupied() == 0 {
            return Self::zeros(size);
        }

        let distances = distance_transform(target);
        let max_dist = distances.iter().copied().fold(0.0_f64, f64::max);
        let raw: Vec<f64> = if max_dist > 0.0 {
            distances.iter().map(|d| 1.0 - d / max_dist).collect()
        } else {
            target
                .cells()
                .iter()
                .map(|&c| if c { 1.0 } else { 0.0 })
                .collect()
        };

        let mut values = gaussian_smooth(&raw, size, params);
        for (v, &is_target) in values.iter_mut().zip(target.cells()) {
            *v = if params.pin_targets && is_target {
                1.0
            } else {
                v.clamp(0.0, 1.0)
            };
        }
        trace!(size, max_dist, "scent field computed");
        Self { size, values }
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Field value at `coord`; out-of-bounds cells read as 0.0.
    pub fn get(&self, coord: Coord) -> f64 {
        if !coord.in_bounds(self.size) {
            return 0.0;
        }
        let n = self.size;
        self.values[(coord.x as usize * n + coord.y as usize) * n + coord.z as usize]
    }

    /// Values in flat grid order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Euclidean distance from every cell to the nearest occupied cell of
/// `grid`, in flat grid order. Every value is `f64::INFINITY` when the grid
/// is empty.
pub fn distance_transform(grid: &VoxelGrid) -> Vec<f64> {
    let n = grid.size();
    let mut sq: Vec<f64> = grid
        .cells()
        .iter()
        .map(|&c| if c { 0.0 } else { f64::INFINITY })
        .collect();

    let mut line = vec![0.0; n];
    let mut out = vec![0.0; n];
    let mut scratch = Envelope::with_capacity(n);

    // Strides of the z, y and x axes in flat order.
    for stride in [1, n, n * n] {
        for start in line_starts(n, stride) {
            for (i, slot) in line.iter_mut().enumerate() {
                *slot = sq[start + i * stride];
            }
            scratch.transform(&line, &mut out);
            for (i, &v) in out.iter().enumerate() {
                sq[start + i * stride] = v;
            }
        }
    }

    sq.into_iter().map(f64::sqrt).collect()
}

/// Flat indices of the first cell of every line along the axis with `stride`.
fn line_starts(n: usize, stride: usize) -> impl Iterator<Item = usize> {
    let total = n * n * n;
    (0..total).filter(move |&i| (i / stride) % n == 0)
}

/// Scratch buffers for the 1D lower envelope of parabolas.
struct Envelope {
    vertices: Vec<usize>,
    bounds: Vec<f64>,
}

impl Envelope {
    fn with_capacity(n: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(n),
            bounds: Vec::with_capacity(n),
        }
    }

    /// 1D squared distance transform of the sampled function `f`.
    fn transform(&mut self, f: &[f64], out: &mut [f64]) {
        self.vertices.clear();
        self.bounds.clear();

        for q in 0..f.len() {
            if !f[q].is_finite() {
                continue;
            }
            let fq = f[q] + (q * q) as f64;
            while let Some(&p) = self.vertices.last() {
                let fp = f[p] + (p * p) as f64;
                let s = (fq - fp) / (2.0 * (q - p) as f64);
                if s <= *self.bounds.last().unwrap_or(&f64::NEG_INFINITY) {
                    self.vertices.pop();
                    self.bounds.pop();
                } else {
                    self.vertices.push(q);
                    self.bounds.push(s);
                    break;
                }
            }
            if self.vertices.is_empty() {
                self.vertices.push(q);
                self.bounds.push(f64::NEG_INFINITY);
            }
        }

        if self.vertices.is_empty() {
            out.fill(f64::INFINITY);
            return;
        }

        let mut k = 0;
        for (q, slot) in out.iter_mut().enumerate() {
            while k + 1 < self.vertices.len() && self.bounds[k + 1] < q as f64 {
                k += 1;
            }
            let p = self.vertices[k];
            let d = q as f64 - p as f64;
            *slot = d * d + f[p];
        }
    }
}

/// Separable Gaussian filter with half-sample symmetric reflection.
fn gaussian_smooth(values: &[f64], n: usize, params: &ScentParams) -> Vec<f64> {
    let kernel = params.kernel();
    let r = params.radius() as i64;
    let mut current = values.to_vec();
    let mut line = vec![0.0; n];

    for stride in [1, n, n * n] {
        for start in line_starts(n, stride) {
            for (i, slot) in line.iter_mut().enumerate() {
                *slot = current[start + i * stride];
            }
            for i in 0..n {
                let acc: f64 = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * line[reflect(i as i64 + k as i64 - r, n)])
                    .sum();
                current[start + i * stride] = acc;
            }
        }
    }
    current
}

/// Maps an index into `[0, n)` by mirroring about the edges (`d c b a | a b c d`).
fn reflect(i: i64, n: usize) -> usize {
    let n = n as i64;
    let m = i.rem_euclid(2 * n);
    (if m < n { m } else { 2 * n - 1 - m }) as usize
}

/// Memoizes scent fields by target occupancy.
///
/// Entries are evicted in insertion order once `capacity` is reached. A
/// capacity of zero disables storage; every lookup then recomputes.
#[derive(Debug)]
pub struct ScentCache {
    params: ScentParams,
    capacity: usize,
    entries: IndexMap<VoxelGrid, Arc<ScentField>>,
    hits: u64,
    misses: u64,
}

impl ScentCache {
    /// Creates a cache holding at most `capacity` fields.
    pub fn new(params: ScentParams, capacity: usize) -> Self {
        Self {
            params,
            capacity,
            entries: IndexMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the field for `target`, computing it on a miss.
    pub fn get_or_compute(&mut self, target: &VoxelGrid) -> Arc<ScentField> {
        if let Some(field) = self.entries.get(target) {
            self.hits += 1;
            return Arc::clone(field);
        }
        self.misses += 1;
        let field = Arc::new(ScentField::compute(target, &self.params));
        if self.capacity > 0 {
            if self.entries.len() >= self.capacity {
                self.entries.shift_remove_index(0);
            }
            self.entries.insert(target.clone(), Arc::clone(&field));
        }
        field
    }

    /// Smoothing parameters used for every entry.
    pub fn params(&self) -> &ScentParams {
        &self.params
    }

    /// Number of stored fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no fields are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups served from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that triggered a computation.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drops every stored field.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
