//! Multi-agent construction environment.
//!
//! Implements the episode loop: reset (clear grid, load or generate the
//! target, refresh the scent field, spawn agents) and step (resolve actions
//! in agent order → reward → observe → terminate).

use std::fmt::{self, Write as _};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, warn};

use crate::agent::AgentState;
use crate::config::{ConflictPolicy, EnvConfig};
use crate::error::EnvError;
use crate::grid::VoxelGrid;
use crate::observation::ObservationBuilder;
use crate::reward::RewardComputer;
use crate::scent::{ScentCache, ScentField};
use crate::target::{TargetGenerator, TargetStructure, TrainingPair};
use crate::types::{Action, Coord};

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalReason {
    /// The match score exceeded the configured threshold.
    Matched,
    /// The step counter reached `max_steps`.
    MaxSteps,
}

/// Episode-level diagnostics returned with every step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// Steps taken so far this episode.
    pub step: u32,
    /// Fraction of target cells filled.
    pub match_score: f64,
    /// Filled cells that are target cells.
    pub correct_blocks: usize,
    /// Filled cells that are not target cells.
    pub wrong_blocks: usize,
    /// Set on the step that ends the episode.
    pub terminal: Option<TerminalReason>,
}

/// Result of a single environment step. Vectors are indexed by agent.
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Per-agent observations after the step.
    pub observations: Vec<Vec<f64>>,
    /// Per-agent rewards.
    pub rewards: Vec<f64>,
    /// Per-agent done flags (all equal to `done`).
    pub dones: Vec<bool>,
    /// Whether the episode is over.
    pub done: bool,
    pub info: StepInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Terminal,
}

/// The multi-agent voxel construction environment.
///
/// Agents move on a cubic grid, carry and place unit blocks, and are
/// rewarded for reproducing a target structure.
///
/// # Lifecycle
///
/// 1. Create with [`ConstructionEnv::new`] (or [`ConstructionEnv::with_generator`]).
/// 2. Call one of the `reset` methods to start an episode.
/// 3. Call [`ConstructionEnv::step`] with one action code per agent until `done`.
///
/// Agents are always processed in ascending index order. Under
/// [`ConflictPolicy::Sequential`] a later agent sees the blocks placed by
/// earlier agents in the same step.
pub struct ConstructionEnv {
    config: EnvConfig,
    agents: Vec<AgentState>,
    grid: VoxelGrid,
    target: Option<TargetStructure>,
    scent: Arc<ScentField>,
    scent_cache: ScentCache,
    scent_refreshes: u64,
    generator: Option<Box<dyn TargetGenerator>>,
    step_count: u32,
    phase: Phase,
    rng: StdRng,
    seed: u64,
    cumulative_rewards: Vec<f64>,
}

impl fmt::Debug for ConstructionEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructionEnv")
            .field("config", &self.config)
            .field("agents", &self.agents)
            .field("target", &self.target.as_ref().map(|t| t.label()))
            .field("generator", &self.generator.as_ref().map(|g| g.name()))
            .field("step_count", &self.step_count)
            .field("phase", &self.phase)
            .field("seed", &self.seed)
            .field("scent_cache", &self.scent_cache)
            .finish_non_exhaustive()
    }
}

impl ConstructionEnv {
    /// Creates an environment without a target generator; every reset must
    /// then supply a target (or reuse the previous one).
    ///
    /// # Arguments
    ///
    /// * `config` - Environment configuration, validated here
    /// * `seed` - Random seed for reproducible spawns and targets
    pub fn new(config: EnvConfig, seed: u64) -> Result<Self, EnvError> {
        config.validate()?;
        let size = config.grid_size;
        Ok(Self {
            scent_cache: ScentCache::new(config.scent, config.scent_cache_capacity),
            agents: Vec::new(),
            grid: VoxelGrid::new(size),
            target: None,
            scent: Arc::new(ScentField::zeros(size)),
            scent_refreshes: 0,
            generator: None,
            step_count: 0,
            phase: Phase::Idle,
            rng: StdRng::seed_from_u64(seed),
            seed,
            cumulative_rewards: Vec::new(),
            config,
        })
    }

    /// Creates an environment that draws a target from `generator` whenever
    /// a reset does not supply one.
    pub fn with_generator(
        config: EnvConfig,
        generator: Box<dyn TargetGenerator>,
        seed: u64,
    ) -> Result<Self, EnvError> {
        let mut env = Self::new(config, seed)?;
        env.generator = Some(generator);
        Ok(env)
    }

    /// Replaces the fallback target generator.
    pub fn set_generator(&mut self, generator: Box<dyn TargetGenerator>) {
        self.generator = Some(generator);
    }

    /// Sets the seed used by the next reset.
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Starts a new episode.
    ///
    /// With `Some(voxels)` the target is built from the voxel list
    /// (sanitized per [`EnvConfig::coordinate_policy`]). With `None` the
    /// configured generator supplies the target; without a generator the
    /// previous target is reused, and if there is none the reset fails with
    /// [`EnvError::MissingTarget`].
    pub fn reset(&mut self, voxels: Option<&[Coord]>) -> Result<Vec<Vec<f64>>, EnvError> {
        let target = voxels
            .map(|v| {
                TargetStructure::from_voxels(
                    self.config.grid_size,
                    v,
                    self.config.coordinate_policy,
                    "custom",
                )
            })
            .transpose()?;
        self.begin_episode(target)
    }

    /// Starts a new episode on a text-labelled dataset record.
    pub fn reset_with_pair(&mut self, pair: &TrainingPair) -> Result<Vec<Vec<f64>>, EnvError> {
        let target = pair.to_target(self.config.grid_size, self.config.coordinate_policy)?;
        self.begin_episode(Some(target))
    }

    /// Starts a new episode on a prepared target.
    pub fn reset_with_target(
        &mut self,
        target: TargetStructure,
    ) -> Result<Vec<Vec<f64>>, EnvError> {
        if target.size() != self.config.grid_size {
            return Err(EnvError::GridSizeMismatch {
                expected: self.config.grid_size,
                actual: target.size(),
            });
        }
        self.begin_episode(Some(target))
    }

    fn begin_episode(
        &mut self,
        supplied: Option<TargetStructure>,
    ) -> Result<Vec<Vec<f64>>, EnvError> {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.seed = self.seed.wrapping_add(1); // different seed each episode

        let size = self.config.grid_size;
        let (target, source) = match supplied {
            Some(t) => (t, "supplied"),
            None => match (self.generator.as_mut(), self.target.as_ref()) {
                (Some(generator), _) => (generator.generate(size, &mut self.rng)?, "generator"),
                (None, Some(previous)) => (previous.clone(), "previous"),
                (None, None) => return Err(EnvError::MissingTarget),
            },
        };

        if target.is_empty() {
            warn!(label = target.label(), "episode target has no cells");
        }
        self.install_target(target);

        self.grid.clear();
        self.step_count = 0;
        self.phase = Phase::Running;
        self.cumulative_rewards = vec![0.0; self.config.n_agents];
        self.agents = (0..self.config.n_agents)
            .map(|i| {
                AgentState::new(
                    AgentState::id_for(i),
                    AgentState::spawn_position(&mut self.rng, size),
                    self.config.agents_start_holding,
                )
            })
            .collect();

        debug!(
            source,
            label = self.target.as_ref().map(|t| t.label()).unwrap_or_default(),
            voxels = self.target.as_ref().map(|t| t.cell_count()).unwrap_or(0),
            agents = self.agents.len(),
            "episode reset"
        );

        Ok(self.observe())
    }

    /// Installs a new target, refreshing the scent field only if the
    /// occupancy actually changed.
    fn install_target(&mut self, target: TargetStructure) {
        let unchanged = self
            .target
            .as_ref()
            .is_some_and(|current| current.grid() == target.grid());
        if unchanged {
            debug!("target unchanged; keeping scent field");
        } else {
            let misses = self.scent_cache.misses();
            self.scent = self.scent_cache.get_or_compute(target.grid());
            self.scent_refreshes += 1;
            debug!(
                cached = self.scent_cache.misses() == misses,
                "scent field refreshed"
            );
        }
        self.target = Some(target);
    }

    /// Executes one environment step.
    ///
    /// # Arguments
    ///
    /// * `actions` - One action code per agent, indexed by agent. Codes
    ///   outside `0..8` and missing entries are no-ops; extra entries are
    ///   ignored.
    ///
    /// Returns [`EnvError::EpisodeNotRunning`] before the first reset and
    /// after the episode has ended.
    pub fn step(&mut self, actions: &[usize]) -> Result<StepResult, EnvError> {
        if self.phase != Phase::Running {
            return Err(EnvError::EpisodeNotRunning);
        }
        if actions.len() != self.agents.len() {
            warn!(
                expected = self.agents.len(),
                got = actions.len(),
                "action count mismatch; missing agents idle"
            );
        }

        // 1. Resolve actions in agent order
        self.resolve_actions(actions)?;
        self.step_count += 1;

        let target = self.target.as_ref().ok_or(EnvError::EpisodeNotRunning)?;

        // 2. Rewards
        let rewards = RewardComputer::compute(&self.agents, &self.grid, target, &self.config.reward);
        for (total, r) in self.cumulative_rewards.iter_mut().zip(&rewards) {
            *total += r;
        }

        // 3. Termination
        let match_score = target.match_score(&self.grid);
        let (correct_blocks, wrong_blocks) = self.grid.compare(target.grid());
        let terminal = if match_score > self.config.match_threshold {
            Some(TerminalReason::Matched)
        } else if self.step_count >= self.config.max_steps {
            Some(TerminalReason::MaxSteps)
        } else {
            None
        };
        if let Some(reason) = terminal {
            self.phase = Phase::Terminal;
            debug!(?reason, step = self.step_count, match_score, "episode finished");
        }

        // 4. Observations
        let observations = self.observe();
        let done = terminal.is_some();

        Ok(StepResult {
            observations,
            dones: vec![done; self.agents.len()],
            rewards,
            done,
            info: StepInfo {
                step: self.step_count,
                match_score,
                correct_blocks,
                wrong_blocks,
                terminal,
            },
        })
    }

    fn resolve_actions(&mut self, actions: &[usize]) -> Result<(), EnvError> {
        match self.config.conflict {
            ConflictPolicy::Sequential => {
                for (i, agent) in self.agents.iter_mut().enumerate() {
                    let Some(action) = decode(i, actions.get(i).copied()) else {
                        continue;
                    };
                    if let Some(cell) = agent.apply(action, &self.grid) {
                        self.grid.set(cell, true)?;
                    }
                }
            }
            ConflictPolicy::Simultaneous => {
                let snapshot = self.grid.clone();
                let mut placements = Vec::new();
                for (i, agent) in self.agents.iter_mut().enumerate() {
                    let Some(action) = decode(i, actions.get(i).copied()) else {
                        continue;
                    };
                    placements.extend(agent.apply(action, &snapshot));
                }
                for cell in placements {
                    self.grid.set(cell, true)?;
                }
            }
        }
        Ok(())
    }

    /// Builds observations for every agent from the current state.
    pub fn observe(&self) -> Vec<Vec<f64>> {
        match &self.target {
            Some(target) => ObservationBuilder::build_all(
                &self.agents,
                &self.grid,
                target,
                &self.scent,
                &self.config,
            ),
            None => Vec::new(),
        }
    }

    /// Moves agent `index` to `position` and sets its holding flag.
    ///
    /// Intended for scripted scenarios and evaluation setups.
    pub fn place_agent(
        &mut self,
        index: usize,
        position: Coord,
        holding: bool,
    ) -> Result<(), EnvError> {
        let size = self.config.grid_size;
        if !position.in_bounds(size) {
            return Err(EnvError::OutOfBounds {
                coord: position,
                grid_size: size,
            });
        }
        let agent = self.agents.get_mut(index).ok_or_else(|| {
            EnvError::InvalidConfig(format!("no agent with index {}", index))
        })?;
        agent.position = position;
        agent.holding = holding;
        Ok(())
    }

    /// Environment configuration.
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Agent states, in index order.
    pub fn agents(&self) -> &[AgentState] {
        &self.agents
    }

    /// Returns the number of agents.
    pub fn n_agents(&self) -> usize {
        self.agents.len()
    }

    /// Current construction grid.
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Target of the current episode, if one has been loaded.
    pub fn target(&self) -> Option<&TargetStructure> {
        self.target.as_ref()
    }

    /// Scent field of the current target.
    pub fn scent(&self) -> &ScentField {
        &self.scent
    }

    /// Number of times the scent field has been replaced because the
    /// target changed.
    pub fn scent_refreshes(&self) -> u64 {
        self.scent_refreshes
    }

    /// Scent field memoization statistics.
    pub fn scent_cache(&self) -> &ScentCache {
        &self.scent_cache
    }

    /// Steps taken this episode.
    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// True between a reset and the terminal step.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// True once the episode has ended.
    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Terminal
    }

    /// Current match score (0.0 before the first reset).
    pub fn match_score(&self) -> f64 {
        self.target
            .as_ref()
            .map(|t| t.match_score(&self.grid))
            .unwrap_or(0.0)
    }

    /// Per-agent reward accumulated this episode.
    pub fn cumulative_rewards(&self) -> &[f64] {
        &self.cumulative_rewards
    }

    /// Layer-by-layer text view of the grid, target and agents.
    ///
    /// `A` agent, `#` built block, `+` unfilled target cell, `.` empty.
    /// Layers with nothing to show are skipped.
    pub fn render(&self) -> String {
        let n = self.config.grid_size as i32;
        let mut out = String::new();
        let label = self.target.as_ref().map(|t| t.label()).unwrap_or("-");
        let _ = writeln!(
            out,
            "Step: {} | Target: '{}' | Match: {:.1}%",
            self.step_count,
            label,
            self.match_score() * 100.0
        );

        for y in 0..n {
            let agent_here =
                |x: i32, z: i32| self.agents.iter().any(|a| a.position == Coord::new(x, y, z));
            let wanted = |c: Coord| self.target.as_ref().is_some_and(|t| t.contains(c));

            let layer_has_content = (0..n).any(|x| {
                (0..n).any(|z| {
                    let c = Coord::new(x, y, z);
                    agent_here(x, z) || self.grid.is_occupied(c) || wanted(c)
                })
            });
            if !layer_has_content {
                continue;
            }

            let _ = writeln!(out, "  y={}:", y);
            for x in 0..n {
                let row: String = (0..n)
                    .map(|z| {
                        let c = Coord::new(x, y, z);
                        if agent_here(x, z) {
                            'A'
                        } else if self.grid.is_occupied(c) {
                            '#'
                        } else if wanted(c) {
                            '+'
                        } else {
                            '.'
                        }
                    })
                    .collect();
                let _ = writeln!(out, "    {}", row);
            }
        }
        out
    }
}

/// Decodes the action of agent `index`; invalid and missing codes are no-ops.
fn decode(index: usize, code: Option<usize>) -> Option<Action> {
    let code = code?;
    let action = Action::from_code(code);
    if action.is_none() {
        debug!(agent = index, code, "invalid action code treated as no-op");
    }
    action
}
