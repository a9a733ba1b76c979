//! Scatter a random vector, gather the chunk means, and time it.
//!
//! Run with: cargo run --example scatter_gather -- --ranks 4 --len 10000

use clap::Parser;
use ferrocomm::means::{random_vector, scatter_means};
use ferrocomm::{Result, Universe};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser)]
struct Args {
    /// Number of workers
    #[arg(short, long, env = "FERROCOMM_RANKS", default_value_t = 4)]
    ranks: usize,

    /// Length of the scattered vector
    #[arg(short, long, default_value_t = 10_000)]
    len: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let universe = Universe::new(args.ranks)?;
    let reports = universe.run(|world| {
        let data = if world.is_leader() {
            random_vector(args.len, &mut StdRng::from_entropy())
        } else {
            Vec::new()
        };
        scatter_means(&world, &data, args.len, 0)
    })?;

    if let Some(report) = &reports[0] {
        println!("[0] Chunk means (master discarded): {:?}", report.means);
        println!("[0] The mean of means is {:.6}", report.mean_of_means);
        println!("[0] Time elapsed: {:.6} secs", report.elapsed);
    }
    Ok(())
}
