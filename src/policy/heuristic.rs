//! Scent-climbing heuristic policy.
//!
//! Works from the observation vector alone, in either observation mode.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::trait_::Policy;
use crate::config::{EnvConfig, ObservationMode};
use crate::observation::ObservationLayout;
use crate::types::{Action, Coord};

const HORIZONTAL: [Action; 4] = [Action::Forward, Action::Right, Action::Backward, Action::Left];

/// Greedy baseline that builds the target one cell at a time.
///
/// Local mode: climb the scent gradient through unoccupied neighbours and
/// place on a cell whose scent is pinned at 1.0 (a target cell).
///
/// Global mode: walk to the lowest, then nearest, unfilled target cell and
/// place there.
///
/// In both modes an empty-handed agent on an empty cell picks up a block
/// first, and with probability `epsilon` a uniformly random action is taken
/// instead.
pub struct ScentClimbPolicy {
    layout: ObservationLayout,
    mode: ObservationMode,
    grid_size: usize,
    epsilon: f64,
    rng: StdRng,
}

impl ScentClimbPolicy {
    /// Creates a policy for observations produced under `config`.
    pub fn new(config: &EnvConfig, seed: u64) -> Self {
        Self {
            layout: ObservationLayout::for_config(config),
            mode: config.observation,
            grid_size: config.grid_size,
            epsilon: 0.05,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Sets the exploration rate (clamped to `[0, 1]`).
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon.clamp(0.0, 1.0);
        self
    }

    fn select_one(&mut self, obs: &[f64]) -> Action {
        if obs.len() != self.layout.len {
            return Action::Down;
        }
        if self.epsilon > 0.0 && self.rng.gen_bool(self.epsilon) {
            let all = Action::all();
            return all[self.rng.gen_range(0..all.len())];
        }

        let chosen = match self.mode {
            ObservationMode::Local { size } => self.local_action(obs, size),
            ObservationMode::Global => self.global_action(obs),
        };
        chosen.unwrap_or_else(|| self.wander())
    }

    fn wander(&mut self) -> Action {
        HORIZONTAL
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(Action::Forward)
    }

    fn local_action(&self, obs: &[f64], size: usize) -> Option<Action> {
        let grid = &obs[self.layout.grid.clone()];
        let scent = &obs[self.layout.scent.clone()?];
        let holding = obs[self.layout.holding] > 0.5;

        let s = size as i32;
        let half = s / 2;
        let idx = |dx: i32, dy: i32, dz: i32| {
            (((dx + half) * s + (dy + half)) * s + (dz + half)) as usize
        };
        let here = idx(0, 0, 0);
        let filled = grid[here] > 0.5;

        if holding && !filled && scent[here] >= 1.0 - 1e-9 {
            return Some(Action::Place);
        }
        if !holding && !filled {
            return Some(Action::Pickup);
        }
        if half == 0 {
            return None;
        }

        Action::all()
            .into_iter()
            .filter_map(|a| a.displacement().map(|(dx, dy, dz)| (a, idx(dx, dy, dz))))
            .filter(|&(_, i)| grid[i] < 0.5)
            .max_by(|a, b| scent[a.1].total_cmp(&scent[b.1]))
            .filter(|&(_, i)| scent[i] > scent[here])
            .map(|(a, _)| a)
    }

    fn global_action(&self, obs: &[f64]) -> Option<Action> {
        let n = self.grid_size;
        let grid = &obs[self.layout.grid.clone()];
        let target = &obs[self.layout.target.clone()?];
        let holding = obs[self.layout.holding] > 0.5;

        let denorm = |v: f64| (v * n as f64).round() as i32;
        let pos = Coord::new(denorm(obs[0]), denorm(obs[1]), denorm(obs[2]));
        let here = flat_index(pos, n)?;

        if !holding && grid[here] < 0.5 {
            return Some(Action::Pickup);
        }

        let goal = (0..n.pow(3))
            .filter(|&i| target[i] > 0.5 && grid[i] < 0.5)
            .map(|i| coord_at(i, n))
            .min_by_key(|c| (c.y, manhattan(*c, pos)))?;

        let (dx, dy, dz) = (goal.x - pos.x, goal.y - pos.y, goal.z - pos.z);
        let action = if dx < 0 {
            Action::Forward
        } else if dx > 0 {
            Action::Backward
        } else if dz > 0 {
            Action::Right
        } else if dz < 0 {
            Action::Left
        } else if dy > 0 {
            Action::Up
        } else if dy < 0 {
            Action::Down
        } else {
            Action::Place
        };
        Some(action)
    }
}

impl Policy for ScentClimbPolicy {
    fn select_actions(&mut self, observations: &[Vec<f64>]) -> Vec<usize> {
        observations
            .iter()
            .map(|obs| self.select_one(obs).code())
            .collect()
    }

    fn name(&self) -> &str {
        "scent_climb"
    }
}

fn flat_index(c: Coord, n: usize) -> Option<usize> {
    c.in_bounds(n)
        .then(|| (c.x as usize * n + c.y as usize) * n + c.z as usize)
}

fn coord_at(i: usize, n: usize) -> Coord {
    Coord::new((i / (n * n)) as i32, ((i / n) % n) as i32, (i % n) as i32)
}

fn manhattan(a: Coord, b: Coord) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs() + (a.z - b.z).abs()
}
