//! voxswarm - multi-agent voxel construction environment
//!
//! A reinforcement-learning environment in which several builder agents move
//! on a cubic voxel grid, carry and place unit blocks, and are rewarded for
//! reproducing a target 3D structure. Targets come from explicit voxel
//! lists, a procedural shape generator, or text-labelled datasets.
//!
//! Agents can observe the whole grid or a local patch of the grid plus a
//! target-derived scent field whose gradient points towards unfilled target
//! cells. The local view has a fixed size independent of the grid.

pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod grid;
pub mod metrics;
pub mod observation;
pub mod policy;
pub mod reward;
pub mod scent;
pub mod target;
pub mod types;

pub use agent::AgentState;
pub use config::{ConflictPolicy, EnvConfig, ObservationMode, RewardConfig, RewardMode};
pub use environment::{ConstructionEnv, StepInfo, StepResult, TerminalReason};
pub use error::EnvError;
#[cfg(feature = "serde")]
pub use error::DatasetError;
pub use grid::VoxelGrid;
pub use metrics::EvaluationMetrics;
pub use observation::{ObservationBuilder, ObservationLayout};
pub use policy::{Policy, RandomPolicy, ScentClimbPolicy};
pub use reward::RewardComputer;
pub use scent::{ScentCache, ScentField, ScentParams};
pub use target::{
    CoordinatePolicy, DatasetTargets, ProceduralTargets, ShapeKind, TargetGenerator,
    TargetStructure, TrainingPair,
};
pub use types::{Action, Coord};
