//! Evaluation metrics for the construction environment.
//!
//! Runs full episodes with a policy and aggregates episode-level results.

use std::fmt;

use crate::environment::{ConstructionEnv, TerminalReason};
use crate::error::EnvError;
use crate::policy::Policy;

/// Aggregated evaluation metrics over multiple episodes.
#[derive(Debug, Clone)]
pub struct EvaluationMetrics {
    /// Mean match score at episode end.
    pub mean_match_score: f64,
    /// Fraction of episodes that ended by exceeding the match threshold.
    pub completion_rate: f64,
    /// Mean number of steps per episode.
    pub mean_episode_length: f64,
    /// Mean cumulative reward per agent per episode.
    pub mean_cumulative_reward: f64,
    /// Mean number of correctly placed blocks at episode end.
    pub mean_correct_blocks: f64,
    /// Mean number of misplaced blocks at episode end.
    pub mean_wrong_blocks: f64,
    /// Number of episodes evaluated.
    pub n_episodes: usize,
}

#[derive(Debug, Default)]
struct EpisodeStats {
    match_score: f64,
    completed: bool,
    length: u32,
    cumulative_reward: f64,
    correct_blocks: usize,
    wrong_blocks: usize,
}

impl EvaluationMetrics {
    /// Evaluates a policy over multiple episodes and returns aggregated metrics.
    ///
    /// Each episode starts with `env.reset(None)`, so the environment needs a
    /// target generator or a previously loaded target.
    ///
    /// # Arguments
    ///
    /// * `env` - The environment to evaluate in
    /// * `policy` - The policy to evaluate
    /// * `n_episodes` - Number of episodes to run
    pub fn evaluate(
        env: &mut ConstructionEnv,
        policy: &mut dyn Policy,
        n_episodes: usize,
    ) -> Result<Self, EnvError> {
        let mut all_stats = Vec::with_capacity(n_episodes);

        for _ in 0..n_episodes {
            let mut obs = env.reset(None)?;
            let mut stats = EpisodeStats::default();

            loop {
                let actions = policy.select_actions(&obs);
                let result = env.step(&actions)?;
                obs = result.observations;

                if result.done {
                    stats.match_score = result.info.match_score;
                    stats.completed = result.info.terminal == Some(TerminalReason::Matched);
                    stats.length = result.info.step;
                    stats.correct_blocks = result.info.correct_blocks;
                    stats.wrong_blocks = result.info.wrong_blocks;
                    let rewards = env.cumulative_rewards();
                    stats.cumulative_reward =
                        rewards.iter().sum::<f64>() / rewards.len().max(1) as f64;
                    break;
                }
            }

            all_stats.push(stats);
        }

        let n = all_stats.len().max(1) as f64;
        let mean = |f: fn(&EpisodeStats) -> f64| all_stats.iter().map(f).sum::<f64>() / n;

        Ok(Self {
            mean_match_score: mean(|s| s.match_score),
            completion_rate: mean(|s| if s.completed { 1.0 } else { 0.0 }),
            mean_episode_length: mean(|s| s.length as f64),
            mean_cumulative_reward: mean(|s| s.cumulative_reward),
            mean_correct_blocks: mean(|s| s.correct_blocks as f64),
            mean_wrong_blocks: mean(|s| s.wrong_blocks as f64),
            n_episodes,
        })
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "=== Evaluation Metrics ({} episodes) ===",
            self.n_episodes
        )?;
        writeln!(
            f,
            "  Mean match score:        {:.1}%",
            self.mean_match_score * 100.0
        )?;
        writeln!(
            f,
            "  Completion rate:         {:.1}%",
            self.completion_rate * 100.0
        )?;
        writeln!(
            f,
            "  Mean episode length:     {:.1}",
            self.mean_episode_length
        )?;
        writeln!(f, "  Mean correct blocks:     {:.1}", self.mean_correct_blocks)?;
        writeln!(f, "  Mean wrong blocks:       {:.1}", self.mean_wrong_blocks)?;
        writeln!(
            f,
            "  Mean cumulative reward:  {:.2}",
            self.mean_cumulative_reward
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvConfig;
    use crate::policy::RandomPolicy;
    use crate::target::ProceduralTargets;

    #[test]
    fn evaluate_completes() {
        let config = EnvConfig {
            max_steps: 10,
            ..EnvConfig::default()
        };
        let mut env =
            ConstructionEnv::with_generator(config.clone(), Box::new(ProceduralTargets::new()), 42)
                .unwrap();
        let mut policy = RandomPolicy::new(config.action_dim(), 0);
        let metrics = EvaluationMetrics::evaluate(&mut env, &mut policy, 3).unwrap();
        assert_eq!(metrics.n_episodes, 3);
        assert!(metrics.mean_episode_length <= 10.0);
        assert!((0.0..=1.0).contains(&metrics.mean_match_score));
        assert!(metrics.to_string().contains("3 episodes"));
    }

    #[test]
    fn evaluate_without_target_fails() {
        let mut env = ConstructionEnv::new(EnvConfig::default(), 0).unwrap();
        let mut policy = RandomPolicy::new(8, 0);
        let err = EvaluationMetrics::evaluate(&mut env, &mut policy, 1).unwrap_err();
        assert_eq!(err, EnvError::MissingTarget);
    }
}
