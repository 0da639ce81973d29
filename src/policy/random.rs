//! Random policy for testing and baselines.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::trait_::Policy;

/// Uniformly random action selection.
///
/// Each agent independently selects a random action from `[0, action_dim)`.
/// Used for sanity checks and as a lower-bound baseline.
pub struct RandomPolicy {
    action_dim: usize,
    rng: StdRng,
}

impl RandomPolicy {
    /// Creates a new random policy.
    ///
    /// # Arguments
    ///
    /// * `action_dim` - Number of possible actions (8 for the construction env);
    ///   raised to 1 if zero.
    /// * `seed` - Seed for reproducible rollouts.
    pub fn new(action_dim: usize, seed: u64) -> Self {
        Self {
            action_dim: action_dim.max(1),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn select_actions(&mut self, observations: &[Vec<f64>]) -> Vec<usize> {
        (0..observations.len())
            .map(|_| self.rng.gen_range(0..self.action_dim))
            .collect()
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_policy_returns_correct_count() {
        let mut policy = RandomPolicy::new(8, 0);
        let obs = vec![vec![0.0; 10]; 4]; // 4 agents
        let actions = policy.select_actions(&obs);
        assert_eq!(actions.len(), 4);
    }

    #[test]
    fn random_policy_actions_in_range() {
        let mut policy = RandomPolicy::new(8, 1);
        let obs = vec![vec![0.0; 10]; 100];
        let actions = policy.select_actions(&obs);
        for a in actions {
            assert!(a < 8);
        }
    }

    #[test]
    fn zero_action_dim_yields_first_action() {
        let mut policy = RandomPolicy::new(0, 3);
        let actions = policy.select_actions(&vec![vec![0.0; 4]; 5]);
        assert_eq!(actions, vec![0; 5]);
    }

    #[test]
    fn random_policy_is_reproducible() {
        let obs = vec![vec![0.0; 4]; 16];
        let a = RandomPolicy::new(8, 7).select_actions(&obs);
        let b = RandomPolicy::new(8, 7).select_actions(&obs);
        assert_eq!(a, b);
    }
}
