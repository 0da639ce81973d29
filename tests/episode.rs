//! End-to-end episode tests against the public environment API.

use proptest::prelude::*;
use voxswarm::{
    Action, ConstructionEnv, Coord, CoordinatePolicy, EnvConfig, EnvError, ProceduralTargets,
    TerminalReason,
};

fn corner_cube() -> Vec<Coord> {
    let mut voxels = Vec::new();
    for x in 0..2 {
        for y in 0..2 {
            for z in 0..2 {
                voxels.push(Coord::new(x, y, z));
            }
        }
    }
    voxels
}

fn single_agent() -> EnvConfig {
    EnvConfig {
        n_agents: 1,
        grid_size: 8,
        ..EnvConfig::default()
    }
}

#[test]
fn walk_to_corner_and_place_first_block() {
    let mut env = ConstructionEnv::new(single_agent(), 17).unwrap();
    let target = corner_cube();
    env.reset(Some(&target)).unwrap();
    assert!(env.agents()[0].holding);

    let start = env.agents()[0].position;
    let walk = std::iter::repeat(Action::Forward)
        .take(start.x as usize)
        .chain(std::iter::repeat(Action::Left).take(start.z as usize));
    for action in walk {
        let r = env.step(&[action.code()]).unwrap();
        assert!(!r.done);
    }
    assert_eq!(env.agents()[0].position, target[0]);

    let r = env.step(&[Action::Place.code()]).unwrap();
    assert!(env.grid().is_occupied(target[0]));
    assert!(!env.agents()[0].holding);
    assert!(r.rewards[0] >= 100.0);
    assert!((r.info.match_score - 1.0 / 8.0).abs() < 1e-12);
    assert_eq!(r.info.correct_blocks, 1);
    assert_eq!(r.info.wrong_blocks, 0);
}

#[test]
fn move_down_at_ground_is_noop() {
    let mut env = ConstructionEnv::new(single_agent(), 3).unwrap();
    env.reset(Some(&corner_cube())).unwrap();
    let before = env.agents()[0].position;
    assert_eq!(before.y, 0);
    env.step(&[Action::Down.code()]).unwrap();
    assert_eq!(env.agents()[0].position, before);
}

#[test]
fn pickup_on_empty_cell_leaves_grid_untouched() {
    let config = EnvConfig {
        agents_start_holding: false,
        ..single_agent()
    };
    let mut env = ConstructionEnv::new(config, 3).unwrap();
    env.reset(Some(&corner_cube())).unwrap();
    assert!(!env.agents()[0].holding);
    env.step(&[Action::Pickup.code()]).unwrap();
    assert!(env.agents()[0].holding);
    assert_eq!(env.grid().count_occupied(), 0);
}

#[test]
fn invalid_action_code_is_noop() {
    let mut env = ConstructionEnv::new(single_agent(), 3).unwrap();
    env.reset(Some(&corner_cube())).unwrap();
    let before = env.agents()[0].clone();
    let r = env.step(&[42]).unwrap();
    assert_eq!(env.agents()[0], before);
    assert_eq!(r.info.step, 1);
}

#[test]
fn empty_target_scores_zero_and_never_matches() {
    let config = EnvConfig {
        max_steps: 3,
        ..single_agent()
    };
    let mut env = ConstructionEnv::new(config, 3).unwrap();
    env.reset(Some(&[])).unwrap();
    assert!(env.scent().values().iter().all(|&v| v == 0.0));

    let mut last = None;
    for _ in 0..3 {
        last = Some(env.step(&[Action::Place.code()]).unwrap());
    }
    let last = last.unwrap();
    assert_eq!(last.info.match_score, 0.0);
    assert_eq!(last.info.terminal, Some(TerminalReason::MaxSteps));
}

#[test]
fn coordinate_policies_at_ingestion() {
    let voxels = [Coord::new(1, 0, 1), Coord::new(9, 0, -2)];

    let mut dropping = ConstructionEnv::new(single_agent(), 0).unwrap();
    dropping.reset(Some(&voxels)).unwrap();
    assert_eq!(dropping.target().unwrap().cell_count(), 1);

    let clamp_cfg = EnvConfig {
        coordinate_policy: CoordinatePolicy::Clamp,
        ..single_agent()
    };
    let mut clamp = ConstructionEnv::new(clamp_cfg, 0).unwrap();
    clamp.reset(Some(&voxels)).unwrap();
    assert!(clamp.target().unwrap().contains(Coord::new(7, 0, 0)));

    let reject_cfg = EnvConfig {
        coordinate_policy: CoordinatePolicy::Reject,
        ..single_agent()
    };
    let mut reject = ConstructionEnv::new(reject_cfg, 0).unwrap();
    let err = reject.reset(Some(&voxels)).unwrap_err();
    assert!(matches!(err, EnvError::OutOfBounds { .. }));
    assert!(!reject.is_running());
}

#[test]
fn missing_target_is_reported() {
    let mut env = ConstructionEnv::new(single_agent(), 0).unwrap();
    assert_eq!(env.reset(None).unwrap_err(), EnvError::MissingTarget);
}

#[test]
fn procedural_episodes_run_to_completion() {
    let config = EnvConfig {
        max_steps: 20,
        ..EnvConfig::default()
    };
    let mut env =
        ConstructionEnv::with_generator(config, Box::new(ProceduralTargets::new()), 8).unwrap();
    for _ in 0..3 {
        env.reset(None).unwrap();
        assert!(env.target().is_some_and(|t| !t.is_empty()));
        let mut steps = 0;
        loop {
            let r = env.step(&[0, 1, 2, 3, 4]).unwrap();
            steps += 1;
            if r.done {
                break;
            }
        }
        assert!(steps <= 20);
    }
}

#[cfg(feature = "serde")]
#[test]
fn dataset_records_drive_episodes_in_order() {
    use voxswarm::target::parse_training_pairs;
    use voxswarm::DatasetTargets;

    let json = r#"[
        {"text": "a small tower", "voxels": [{"x": 3, "y": 0, "z": 3}, {"x": 3, "y": 1, "z": 3}], "voxel_count": 2},
        {"text": "a single block", "voxels": [{"x": 1, "y": 0, "z": 1}], "voxel_count": 1}
    ]"#;
    let pairs = parse_training_pairs(json).unwrap();
    let dataset = DatasetTargets::new(pairs, CoordinatePolicy::Drop).unwrap();
    let mut env = ConstructionEnv::with_generator(single_agent(), Box::new(dataset), 0).unwrap();

    let labels: Vec<String> = (0..3)
        .map(|_| {
            env.reset(None).unwrap();
            env.target().unwrap().label().to_string()
        })
        .collect();
    assert_eq!(labels, ["a small tower", "a single block", "a small tower"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn episode_invariants_hold(
        seed in any::<u64>(),
        n_agents in 1usize..4,
        codes in prop::collection::vec(0usize..10, 1..120),
    ) {
        let config = EnvConfig {
            n_agents,
            grid_size: 5,
            max_steps: 40,
            ..EnvConfig::default()
        };
        let mut env =
            ConstructionEnv::with_generator(config, Box::new(ProceduralTargets::new()), seed)
                .unwrap();
        env.reset(None).unwrap();

        for chunk in codes.chunks(n_agents) {
            if !env.is_running() {
                break;
            }
            let r = env.step(chunk).unwrap();
            prop_assert!((0.0..=1.0).contains(&r.info.match_score));
            prop_assert!(r.info.step <= 40);
            for agent in env.agents() {
                prop_assert!(agent.position.in_bounds(5));
            }

            let target = env.target().unwrap();
            let all_filled = target.voxels().iter().all(|&c| env.grid().is_occupied(c));
            prop_assert_eq!(r.info.match_score == 1.0, all_filled);
            prop_assert_eq!(r.done, r.info.terminal.is_some());
        }
    }
}
