//! Point-to-plane distances - typed point-to-point messages.
//!
//! Rank 0 sends one plane and point to each of ranks 1-3, which compute the
//! distance and forward it to rank 4 for reporting.
//!
//! Run with: cargo run --example plane_distance

use ferrocomm::plane;
use ferrocomm::{Result, Universe};

fn main() -> Result<()> {
    env_logger::init();

    let problems = plane::default_problems();
    let universe = Universe::new(problems.len() + 2)?;
    let reports = universe.run(|world| plane::run(&world, &problems))?;

    let collector = plane::collector_rank(problems.len()) as usize;
    if let Some(distances) = &reports[collector] {
        for d in distances {
            println!("[{collector}] Distance from rank {}: {:.6}", d.source, d.value);
        }
    }
    Ok(())
}
