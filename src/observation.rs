//! Observation encoding for the construction environment.
//!
//! Builds per-agent flat feature vectors in one of two layouts:
//!
//! ```text
//! Global: [pos(3)] ++ [grid(N³)] ++ [holding(1)] ++ [target(N³)]
//! Local:  [pos(3)] ++ [grid patch(s³)] ++ [scent patch(s³)] ++ [holding(1)]
//! ```
//!
//! Local patches are centred on the agent and zero-padded outside the grid.
//! Language conditioning is appended by the policy, never here.

use std::ops::Range;

use crate::agent::AgentState;
use crate::config::{EnvConfig, ObservationMode};
use crate::grid::VoxelGrid;
use crate::scent::ScentField;
use crate::target::TargetStructure;
use crate::types::Coord;

/// Offsets of each feature group inside an observation vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationLayout {
    pub position: Range<usize>,
    pub grid: Range<usize>,
    /// Local mode only.
    pub scent: Option<Range<usize>>,
    pub holding: usize,
    /// Global mode only.
    pub target: Option<Range<usize>>,
    pub len: usize,
}

impl ObservationLayout {
    /// Layout for the configured observation mode.
    pub fn for_config(config: &EnvConfig) -> Self {
        match config.observation {
            ObservationMode::Global => {
                let cells = config.grid_size.pow(3);
                let grid = 3..3 + cells;
                let holding = grid.end;
                let target = holding + 1..holding + 1 + cells;
                Self {
                    position: 0..3,
                    len: target.end,
                    grid,
                    scent: None,
                    holding,
                    target: Some(target),
                }
            }
            ObservationMode::Local { size } => {
                let cells = size.pow(3);
                let grid = 3..3 + cells;
                let scent = grid.end..grid.end + cells;
                let holding = scent.end;
                Self {
                    position: 0..3,
                    grid,
                    scent: Some(scent),
                    holding,
                    target: None,
                    len: holding + 1,
                }
            }
        }
    }
}

/// Builds observation vectors for agents.
pub struct ObservationBuilder;

impl ObservationBuilder {
    /// Builds the observation vector for one agent.
    pub fn build(
        agent: &AgentState,
        grid: &VoxelGrid,
        target: &TargetStructure,
        scent: &ScentField,
        config: &EnvConfig,
    ) -> Vec<f64> {
        let mut obs = Vec::with_capacity(config.observation_dim());
        obs.extend(agent.position_features(grid.size()));

        match config.observation {
            ObservationMode::Global => {
                grid.extend_features(&mut obs);
                obs.push(holding_feature(agent));
                target.grid().extend_features(&mut obs);
            }
            ObservationMode::Local { size } => {
                let (grid_patch, scent_patch) = Self::local_patch(grid, scent, agent.position, size);
                obs.extend(grid_patch);
                obs.extend(scent_patch);
                obs.push(holding_feature(agent));
            }
        }

        obs
    }

    /// Builds observations for all agents, in agent index order.
    pub fn build_all(
        agents: &[AgentState],
        grid: &VoxelGrid,
        target: &TargetStructure,
        scent: &ScentField,
        config: &EnvConfig,
    ) -> Vec<Vec<f64>> {
        agents
            .iter()
            .map(|a| Self::build(a, grid, target, scent, config))
            .collect()
    }

    /// Extracts `size³` patches of occupancy and scent centred on `center`.
    ///
    /// Cells are ordered by `dx`, then `dy`, then `dz`, each ascending.
    /// Cells outside the grid read as 0.0.
    pub fn local_patch(
        grid: &VoxelGrid,
        scent: &ScentField,
        center: Coord,
        size: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        let half = (size / 2) as i32;
        let cells = size.pow(3);
        let mut grid_patch = Vec::with_capacity(cells);
        let mut scent_patch = Vec::with_capacity(cells);

        for dx in -half..=half {
            for dy in -half..=half {
                for dz in -half..=half {
                    let c = center.offset(dx, dy, dz);
                    grid_patch.push(if grid.is_occupied(c) { 1.0 } else { 0.0 });
                    scent_patch.push(scent.get(c));
                }
            }
        }

        (grid_patch, scent_patch)
    }
}

fn holding_feature(agent: &AgentState) -> f64 {
    if agent.holding {
        1.0
    } else {
        0.0
    }
}
