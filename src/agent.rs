//! Agent state and per-agent action semantics.

use rand::rngs::StdRng;
use rand::Rng;

use crate::grid::VoxelGrid;
use crate::types::{Action, Coord};

/// State of a single builder agent.
///
/// Position is always inside the grid; only [`AgentState::apply`] moves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentState {
    /// Stable identifier (`agent_<index>`).
    pub id: String,
    /// Current cell.
    pub position: Coord,
    /// Whether the agent carries a block.
    pub holding: bool,
}

impl AgentState {
    /// Creates a new agent.
    pub fn new(id: impl Into<String>, position: Coord, holding: bool) -> Self {
        Self {
            id: id.into(),
            position,
            holding,
        }
    }

    /// Identifier used for the agent at `index`.
    pub fn id_for(index: usize) -> String {
        format!("agent_{}", index)
    }

    /// Random ground-level cell on one of the four edges of the horizontal
    /// square.
    pub fn spawn_position(rng: &mut StdRng, size: usize) -> Coord {
        let n = size as i32;
        let last = n - 1;
        let along = rng.gen_range(0..n);
        match rng.gen_range(0..4) {
            0 => Coord::new(0, 0, along),
            1 => Coord::new(along, 0, last),
            2 => Coord::new(last, 0, along),
            _ => Coord::new(along, 0, 0),
        }
    }

    /// Applies one action against `grid`, returning the cell to fill if the
    /// action places a block.
    ///
    /// The grid is only read here; the caller commits placements, which
    /// lets it choose between sequential and simultaneous resolution.
    /// Every blocked or inapplicable action is a no-op.
    pub fn apply(&mut self, action: Action, grid: &VoxelGrid) -> Option<Coord> {
        let size = grid.size();
        match action {
            Action::Forward | Action::Right | Action::Backward | Action::Left | Action::Down => {
                if let Some((dx, dy, dz)) = action.displacement() {
                    let next = self.position.offset(dx, dy, dz);
                    if next.in_bounds(size) {
                        self.position = next;
                    }
                }
                None
            }
            Action::Up => {
                let next = self.position.offset(0, 1, 0);
                let supported = self.position.y == 0 || grid.is_occupied(self.position.below());
                if supported && next.in_bounds(size) {
                    self.position = next;
                }
                None
            }
            Action::Place => {
                if self.holding {
                    self.holding = false;
                    Some(self.position)
                } else {
                    None
                }
            }
            Action::Pickup => {
                if !self.holding && !grid.is_occupied(self.position) {
                    self.holding = true;
                }
                None
            }
        }
    }

    /// Normalized position features `[x/N, y/N, z/N]`.
    pub fn position_features(&self, size: usize) -> [f64; 3] {
        self.position.normalized(size)
    }
}
