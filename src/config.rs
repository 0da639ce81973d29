//! Configuration for the construction environment.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::EnvError;
use crate::scent::ScentParams;
use crate::target::CoordinatePolicy;
use crate::types::Action;

/// What each agent observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ObservationMode {
    /// Position, the whole grid, the holding flag and the whole target.
    /// Grows as `O(N³)`; intended for small training grids.
    Global,
    /// Position, a `size³` patch of the grid and of the scent field centred
    /// on the agent, and the holding flag. Independent of the grid size.
    Local { size: usize },
}

/// How per-agent rewards are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RewardMode {
    /// Position-dependent terms per agent plus a shared progress term.
    PerAgent,
    /// One identical reward for every agent, from global progress and the
    /// total number of wrong blocks.
    Shared,
}

/// How actions of different agents within one step interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConflictPolicy {
    /// Agents act in ascending index order; later agents see the effects of
    /// earlier ones within the same step.
    #[default]
    Sequential,
    /// Every agent acts against the grid as it was at the start of the step;
    /// placements are committed together afterwards.
    Simultaneous,
}

/// Reward weights.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RewardConfig {
    pub mode: RewardMode,
    /// Bonus for standing in a filled target cell (per-agent mode).
    pub correct_bonus: f64,
    /// Penalty for standing in a filled non-target cell (per-agent mode),
    /// or per wrong block in the grid (shared mode).
    pub wrong_penalty: f64,
    /// Scale applied to the match score, shared by all agents.
    pub progress_scale: f64,
    /// Penalty subtracted every step.
    pub time_penalty: f64,
    /// Penalty for standing empty-handed in an unfilled target cell
    /// (per-agent mode).
    pub idle_penalty: f64,
}

impl RewardConfig {
    /// Weights of the local-observation variant.
    pub fn per_agent() -> Self {
        Self {
            mode: RewardMode::PerAgent,
            correct_bonus: 100.0,
            wrong_penalty: 2.0,
            progress_scale: 20.0,
            time_penalty: 0.1,
            idle_penalty: 5.0,
        }
    }

    /// Weights of the global-observation variant.
    pub fn shared() -> Self {
        Self {
            mode: RewardMode::Shared,
            correct_bonus: 0.0,
            wrong_penalty: 0.5,
            progress_scale: 10.0,
            time_penalty: 0.01,
            idle_penalty: 0.0,
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self::per_agent()
    }
}

/// Configuration for [`ConstructionEnv`](crate::environment::ConstructionEnv).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvConfig {
    // --- Geometry ---
    /// Number of builder agents.
    pub n_agents: usize,
    /// Side length N of the cubic grid.
    pub grid_size: usize,

    // --- Episode ---
    /// Maximum number of steps per episode.
    pub max_steps: u32,
    /// The episode ends once the match score strictly exceeds this value.
    pub match_threshold: f64,
    /// Whether agents start each episode carrying a block.
    pub agents_start_holding: bool,

    // --- Dynamics ---
    pub conflict: ConflictPolicy,

    // --- Target ingestion ---
    pub coordinate_policy: CoordinatePolicy,

    // --- Observation ---
    pub observation: ObservationMode,

    // --- Reward ---
    pub reward: RewardConfig,

    // --- Scent field ---
    pub scent: ScentParams,
    /// Number of distinct targets whose scent fields are kept between
    /// episodes.
    pub scent_cache_capacity: usize,
}

impl EnvConfig {
    /// Preset for the whole-grid observation variant with a fully shared
    /// reward.
    pub fn global_variant() -> Self {
        Self {
            n_agents: 3,
            match_threshold: 0.8,
            observation: ObservationMode::Global,
            reward: RewardConfig::shared(),
            ..Self::default()
        }
    }

    /// Number of possible actions per agent.
    pub fn action_dim(&self) -> usize {
        Action::COUNT
    }

    /// Side length of the local patch, if in local mode.
    pub fn local_size(&self) -> Option<usize> {
        match self.observation {
            ObservationMode::Local { size } => Some(size),
            ObservationMode::Global => None,
        }
    }

    /// Observation dimension per agent.
    pub fn observation_dim(&self) -> usize {
        match self.observation {
            ObservationMode::Global => 3 + 2 * self.grid_size.pow(3) + 1,
            ObservationMode::Local { size } => 3 + 2 * size.pow(3) + 1,
        }
    }

    /// Checks the configuration for values the environment cannot run with.
    pub fn validate(&self) -> Result<(), EnvError> {
        if self.grid_size == 0 {
            return Err(EnvError::InvalidConfig("grid_size must be positive".into()));
        }
        if self.grid_size > i32::MAX as usize || self.grid_size.checked_pow(3).is_none() {
            return Err(EnvError::InvalidConfig(format!(
                "grid_size {} is too large",
                self.grid_size
            )));
        }
        if self.n_agents == 0 {
            return Err(EnvError::InvalidConfig("n_agents must be positive".into()));
        }
        if self.max_steps == 0 {
            return Err(EnvError::InvalidConfig("max_steps must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(EnvError::InvalidConfig(format!(
                "match_threshold {} is outside [0, 1]",
                self.match_threshold
            )));
        }
        if let ObservationMode::Local { size } = self.observation {
            if size == 0 || size % 2 == 0 || size.checked_pow(3).is_none() {
                return Err(EnvError::InvalidConfig(format!(
                    "local observation size must be odd and positive, got {}",
                    size
                )));
            }
        }
        if self.scent.sigma.is_nan() || self.scent.sigma <= 0.0 {
            return Err(EnvError::InvalidConfig("scent sigma must be positive".into()));
        }
        if self.scent.truncate < 0.0 {
            return Err(EnvError::InvalidConfig(
                "scent truncate must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            n_agents: 5,
            grid_size: 8,
            max_steps: 150,
            match_threshold: 0.85,
            agents_start_holding: true,
            conflict: ConflictPolicy::Sequential,
            coordinate_policy: CoordinatePolicy::Drop,
            observation: ObservationMode::Local { size: 3 },
            reward: RewardConfig::per_agent(),
            scent: ScentParams::default(),
            scent_cache_capacity: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = EnvConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.action_dim(), 8);
        assert_eq!(cfg.local_size(), Some(3));
    }

    #[test]
    fn global_variant_is_valid() {
        let cfg = EnvConfig::global_variant();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.match_threshold, 0.8);
        assert_eq!(cfg.reward.mode, RewardMode::Shared);
    }

    #[test]
    fn observation_dim_matches() {
        let local = EnvConfig::default();
        assert_eq!(local.observation_dim(), 3 + 27 + 27 + 1);
        let global = EnvConfig::global_variant();
        assert_eq!(global.observation_dim(), 3 + 512 + 1 + 512);
    }

    #[test]
    fn local_mode_dim_is_independent_of_grid_size() {
        let small = EnvConfig::default();
        let large = EnvConfig {
            grid_size: 128,
            ..EnvConfig::default()
        };
        assert_eq!(small.observation_dim(), large.observation_dim());
    }

    #[test]
    fn even_patch_is_rejected() {
        let cfg = EnvConfig {
            observation: ObservationMode::Local { size: 4 },
            ..EnvConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(EnvError::InvalidConfig(_))));
    }

    #[test]
    fn bad_threshold_is_rejected() {
        let cfg = EnvConfig {
            match_threshold: 1.5,
            ..EnvConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_grid_is_rejected() {
        let cfg = EnvConfig {
            grid_size: 0,
            ..EnvConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn grid_with_overflowing_cell_count_is_rejected() {
        let cfg = EnvConfig {
            grid_size: 3_000_000,
            ..EnvConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(EnvError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_local_patch_is_rejected() {
        let cfg = EnvConfig {
            observation: ObservationMode::Local { size: 3_000_001 },
            ..EnvConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_roundtrips_through_json() {
        let cfg = EnvConfig::global_variant();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EnvConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.observation, ObservationMode::Global);
        assert_eq!(back.reward.mode, RewardMode::Shared);
        assert_eq!(back.n_agents, cfg.n_agents);
        assert!((back.match_threshold - cfg.match_threshold).abs() < 1e-12);
    }
}
