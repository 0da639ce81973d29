// Demonstration: run the construction environment and evaluate a baseline policy.
//
// Build/run from this repo root:
//   cargo run --example construction_demo -- --policy scent --episodes 20
//
// Options:
//   --policy random|scent   policy to evaluate (default: scent)
//   --episodes N            number of evaluation episodes (default: 10)
//   --seed N                environment and policy seed (default: 42)
//   --global                use whole-grid observations and the shared reward
//   --dataset PATH          replay text-labelled targets from a JSON file
//   --render                print one rendered episode before evaluating
//
// Logging follows RUST_LOG, e.g. RUST_LOG=voxswarm=trace.

use std::env;
use std::error::Error;

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use voxswarm::{
    ConstructionEnv, EnvConfig, EvaluationMetrics, Policy, ProceduralTargets, RandomPolicy,
    ScentClimbPolicy, TargetGenerator,
};

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("voxswarm=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    let policy_name = arg_value(&args, "--policy").unwrap_or("scent");
    let episodes: usize = arg_value(&args, "--episodes")
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);
    let seed: u64 = arg_value(&args, "--seed")
        .and_then(|s| s.parse().ok())
        .unwrap_or(42);

    let config = if has_flag(&args, "--global") {
        EnvConfig::global_variant()
    } else {
        EnvConfig::default()
    };

    let generator = build_generator(&args, &config)?;
    info!(generator = generator.name(), "target source");
    let mut env = ConstructionEnv::with_generator(config.clone(), generator, seed)?;

    let mut policy: Box<dyn Policy> = match policy_name {
        "random" => Box::new(RandomPolicy::new(config.action_dim(), seed)),
        "scent" => Box::new(ScentClimbPolicy::new(&config, seed)),
        other => {
            eprintln!("Unknown --policy '{}'; expected 'scent' or 'random'.", other);
            std::process::exit(2);
        }
    };

    if has_flag(&args, "--render") {
        let mut obs = env.reset(None)?;
        println!("{}", env.render());
        loop {
            let result = env.step(&policy.select_actions(&obs))?;
            obs = result.observations;
            if result.done {
                break;
            }
        }
        println!("{}", env.render());
    }

    let metrics = EvaluationMetrics::evaluate(&mut env, policy.as_mut(), episodes)?;
    println!("Policy: {}", policy.name());
    println!("{}", metrics);
    Ok(())
}

#[cfg(feature = "serde")]
fn build_generator(
    args: &[String],
    config: &EnvConfig,
) -> Result<Box<dyn TargetGenerator>, Box<dyn Error>> {
    use voxswarm::target::{load_training_pairs, DatasetTargets};

    match arg_value(args, "--dataset") {
        Some(path) => {
            let pairs = load_training_pairs(path)?;
            Ok(Box::new(DatasetTargets::new(pairs, config.coordinate_policy)?))
        }
        None => Ok(Box::new(ProceduralTargets::new())),
    }
}

#[cfg(not(feature = "serde"))]
fn build_generator(
    args: &[String],
    _config: &EnvConfig,
) -> Result<Box<dyn TargetGenerator>, Box<dyn Error>> {
    if arg_value(args, "--dataset").is_some() {
        return Err("--dataset requires the 'serde' feature".into());
    }
    Ok(Box::new(ProceduralTargets::new()))
}

fn arg_value<'a>(args: &'a [String], key: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}
