//! Policy trait for the construction environment.

/// A policy that selects actions for agents based on observations.
///
/// Actions are codes in `0..8`, see [`Action`](crate::types::Action):
/// - 0..=3: horizontal moves
/// - 4, 5: up, down
/// - 6: place the carried block
/// - 7: pick up a block
pub trait Policy: Send + Sync {
    /// Selects one action per agent given their observations.
    ///
    /// # Arguments
    ///
    /// * `observations` - Per-agent observation vectors (from [`ObservationBuilder`](crate::observation::ObservationBuilder))
    ///
    /// # Returns
    ///
    /// A vector of action codes, one per agent.
    fn select_actions(&mut self, observations: &[Vec<f64>]) -> Vec<usize>;

    /// Returns a human-readable name for this policy.
    fn name(&self) -> &str;
}
