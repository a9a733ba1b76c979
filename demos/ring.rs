//! Ring communication example - point-to-point communication.
//!
//! Each worker sends data to the next worker in a ring pattern.
//!
//! Run with: cargo run --example ring

use ferrocomm::{Result, Universe};

fn main() -> Result<()> {
    env_logger::init();

    Universe::new(4)?.run(|world| {
        let rank = world.rank();
        let size = world.size();

        let next = (rank + 1) % size;
        let prev = (rank + size - 1) % size;

        let send_data = vec![rank as f64 * 100.0 + 1.0, rank as f64 * 100.0 + 2.0];
        let mut recv_data = vec![0.0; 2];

        println!("Rank {rank}: sending {send_data:?} to rank {next}");

        // Sends only enqueue, so every rank can send before receiving.
        world.send(&send_data, next, 0)?;
        let status = world.recv(&mut recv_data, prev, 0)?;
        println!(
            "Rank {rank}: received {recv_data:?} from rank {} (tag={}, count={})",
            status.source, status.tag, status.count
        );

        let expected = vec![prev as f64 * 100.0 + 1.0, prev as f64 * 100.0 + 2.0];
        assert_eq!(recv_data, expected, "Data mismatch!");

        world.barrier()?;

        if world.is_leader() {
            println!("\nRing communication test passed!");
        }
        Ok(())
    })?;
    Ok(())
}
