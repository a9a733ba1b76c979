//! Monte Carlo Pi Estimation - compare two ways of splitting rounds.
//!
//! Every worker throws darts at the unit square in rounds. The first run
//! gives each worker every round; the second divides the rounds among the
//! workers. The leader appends one CSV row per run to the result store.
//!
//! Run with: cargo run --release --example pi_estimate -- 100 10000 --ranks 4

use clap::Parser;
use ferrocomm::estimate::Estimator;
use ferrocomm::record::ResultStore;
use ferrocomm::{config, EstimateConfig, Universe};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(about = "Distributed dartboard estimation of pi")]
struct Args {
    /// Total number of rounds
    total_rounds: u64,

    /// Total number of darts thrown per round
    total_darts: u64,

    /// Number of workers
    #[arg(short, long, env = "FERROCOMM_RANKS", default_value_t = 4)]
    ranks: usize,

    /// Seed for the sampling sources
    #[arg(short, long, default_value_t = config::DEFAULT_SEED)]
    seed: u64,

    /// Result store
    #[arg(short, long, default_value = config::DEFAULT_RESULTS_PATH)]
    output: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match EstimateConfig::new(args.total_rounds, args.total_darts) {
        Ok(config) => config.with_seed(args.seed).with_results_path(args.output),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let universe = match Universe::new(args.ranks) {
        Ok(universe) => universe,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate_for(universe.size()) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let store = ResultStore::new(config.results_path());
    let estimator = Estimator::new(config);
    match universe.run(|world| estimator.run(&world, Some(&store))) {
        Ok(results) => {
            for result in &results[0] {
                println!(
                    "{:<30} pi = {:.10}  error = {:.2e}  time = {:.4}s",
                    result.run_type,
                    result.pi_est,
                    result.error(),
                    result.time_taken
                );
            }
            println!("\nReal value of PI: {:.13}", std::f64::consts::PI);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("run failed: {e}");
            ExitCode::FAILURE
        }
    }
}
