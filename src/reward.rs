//! Shaped reward function for the construction environment.
//!
//! Computed once per step, after every agent's action has been applied.

use crate::agent::AgentState;
use crate::config::{RewardConfig, RewardMode};
use crate::grid::VoxelGrid;
use crate::target::TargetStructure;

/// Computes per-agent rewards.
pub struct RewardComputer;

impl RewardComputer {
    /// Computes one reward per agent, in agent index order.
    ///
    /// # Components (per-agent mode)
    ///
    /// 1. **Correct cell**: `+correct_bonus` if the agent's cell is filled and
    ///    is a target cell.
    /// 2. **Wrong cell**: `-wrong_penalty` if the agent's cell is filled but
    ///    not a target cell.
    /// 3. **Progress**: `+progress_scale × match_score`, identical for all.
    /// 4. **Time**: `-time_penalty`.
    /// 5. **Idle on target**: `-idle_penalty` if the agent carries nothing
    ///    while standing in an unfilled target cell.
    ///
    /// # Shared mode
    ///
    /// Every agent receives
    /// `progress_scale × match_score - wrong_penalty × wrong_blocks - time_penalty`.
    pub fn compute(
        agents: &[AgentState],
        grid: &VoxelGrid,
        target: &TargetStructure,
        config: &RewardConfig,
    ) -> Vec<f64> {
        let match_score = target.match_score(grid);
        let progress = config.progress_scale * match_score;

        match config.mode {
            RewardMode::Shared => {
                let (_, wrong) = grid.compare(target.grid());
                let reward = progress - config.wrong_penalty * wrong as f64 - config.time_penalty;
                vec![reward; agents.len()]
            }
            RewardMode::PerAgent => agents
                .iter()
                .map(|agent| progress - config.time_penalty + Self::positional(agent, grid, target, config))
                .collect(),
        }
    }

    /// Position-dependent terms (1, 2 and 5) for one agent.
    pub fn positional(
        agent: &AgentState,
        grid: &VoxelGrid,
        target: &TargetStructure,
        config: &RewardConfig,
    ) -> f64 {
        let filled = grid.is_occupied(agent.position);
        let wanted = target.contains(agent.position);

        let mut reward = 0.0;
        if filled && wanted {
            reward += config.correct_bonus;
        }
        if filled && !wanted {
            reward -= config.wrong_penalty;
        }
        if !agent.holding && wanted && !filled {
            reward -= config.idle_penalty;
        }
        reward
    }
}
