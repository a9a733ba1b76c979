//! Broadcast a few random vectors and let every rank average them.
//!
//! Run with: cargo run --example broadcast_rounds

use ferrocomm::means::broadcast_means;
use ferrocomm::{Result, Universe};

const RANKS: usize = 4;
const VECTOR_SIZE: usize = 10;
const ROUNDS: usize = 2;

fn main() -> Result<()> {
    env_logger::init();

    let universe = Universe::new(RANKS)?;
    let means = universe.run(|world| {
        if world.is_leader() {
            println!("[0] Number of tasks = {}", world.size());
        }
        world.barrier()?;
        broadcast_means(&world, ROUNDS, VECTOR_SIZE, &mut rand::thread_rng(), 0)
    })?;

    for (rank, per_round) in means.iter().enumerate().skip(1) {
        for (round, mean) in per_round.iter().enumerate() {
            println!("[{rank}] Mean of the vector[{round}] is: {mean}");
        }
    }
    Ok(())
}
