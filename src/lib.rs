//! # ferrocomm
//!
//! Rank-based message passing for a fixed group of cooperating workers.
//!
//! A [`Universe`] runs one worker per thread, each bound to a stable rank, and
//! hands every worker a [`Communicator`] providing:
//! - Generic point-to-point `send` / `recv` / `probe` over any [`Datatype`]
//! - Blocking collectives: barrier, broadcast, scatter, gather, reduce
//! - A typed channel for fixed-shape `f64` messages with a count-mismatch
//!   averaging fallback ([`MessageKind`], [`Received`])
//!
//! On top of that layer the crate ships the distributed dartboard estimator of
//! π ([`estimate`]), its CSV result store ([`record`]), and the tutorial flows
//! that exercise the channel and collectives ([`plane`], [`means`]).
//!
//! ## Quick Start
//!
//! ```
//! use ferrocomm::{ReduceOp, Universe};
//!
//! fn main() -> Result<(), ferrocomm::Error> {
//!     let universe = Universe::new(4)?;
//!
//!     universe.run(|world| {
//!         let rank = world.rank();
//!
//!         // Broadcast from the leader
//!         let mut data = vec![0.0f64; 100];
//!         if world.is_leader() {
//!             data.fill(42.0);
//!         }
//!         world.broadcast(&mut data, 0)?;
//!
//!         // All-reduce a scalar
//!         let sum = world.allreduce_scalar(rank as f64, ReduceOp::Sum)?;
//!         assert_eq!(sum, 6.0);
//!         Ok(())
//!     })?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! A worker that returns an error or panics aborts the whole group: every
//! peer blocked in a communication call wakes with [`Error::Aborted`]. A
//! worker that simply never reaches a collective its peers are waiting on
//! hangs the group; there are no timeouts.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

mod channel;
mod comm;
pub mod config;
mod datatype;
mod error;
pub mod estimate;
mod fabric;
pub mod means;
pub mod plane;
pub mod record;
mod status;

pub use channel::{MessageKind, Received};
pub use comm::{Communicator, LEADER};
pub use config::EstimateConfig;
pub use datatype::{Datatype, DatatypeTag};
pub use error::{Error, Result};
pub use fabric::{ANY_SOURCE, ANY_TAG};
pub use status::Status;

use fabric::Fabric;
use log::{debug, error};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Instant;

/// Reduction operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ReduceOp {
    /// Sum of values
    Sum = 0,
    /// Maximum value
    Max = 1,
    /// Minimum value
    Min = 2,
    /// Product of values
    Prod = 3,
}

/// A fixed-size group of workers.
///
/// The universe is the bootstrap for a group: it fixes the membership size,
/// spawns one thread per rank, hands each a [`Communicator`], and joins them
/// once every worker has returned. Several universes may run side by side in
/// one process; they share nothing.
///
/// # Example
///
/// ```
/// use ferrocomm::Universe;
///
/// let universe = Universe::new(4).expect("group size must be positive");
/// let ranks = universe.run(|world| Ok(world.rank())).unwrap();
/// assert_eq!(ranks, vec![0, 1, 2, 3]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Universe {
    size: usize,
}

impl Universe {
    /// Create a group of `size` workers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGroupSize`] if `size` is zero or does not fit
    /// in a rank.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 || size > i32::MAX as usize {
            return Err(Error::InvalidGroupSize(size));
        }
        Ok(Universe { size })
    }

    /// Number of workers in the group.
    pub fn size(&self) -> i32 {
        self.size as i32
    }

    /// Run `worker` once per rank, each on its own thread, and return the
    /// per-rank results in rank order.
    ///
    /// If any worker fails, the group is aborted and the first failure that
    /// is not itself an [`Error::Aborted`] is returned. A panicking worker
    /// aborts the group and the panic is resumed on the caller's thread.
    pub fn run<F, R>(&self, worker: F) -> Result<Vec<R>>
    where
        F: Fn(Communicator) -> Result<R> + Sync,
        R: Send,
    {
        let fabric = Arc::new(Fabric::new(self.size));
        let worker = &worker;

        let (joined, spawn_error) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.size);
            let mut spawn_error = None;
            for rank in 0..self.size {
                let comm = Communicator::new(rank as i32, Arc::clone(&fabric));
                let worker_fabric = Arc::clone(&fabric);
                let spawned = thread::Builder::new()
                    .name(format!("rank-{rank}"))
                    .spawn_scoped(scope, move || {
                        let _guard = AbortOnPanic(&worker_fabric);
                        let result = worker(comm);
                        if let Err(e) = &result {
                            if !matches!(e, Error::Aborted) {
                                error!("rank {rank} failed: {e}");
                            }
                            worker_fabric.abort();
                        }
                        result
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        fabric.abort();
                        spawn_error = Some(e);
                        break;
                    }
                }
            }
            let joined: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
            (joined, spawn_error)
        });

        if let Some(e) = spawn_error {
            return Err(Error::Io(e));
        }

        let mut results = Vec::with_capacity(self.size);
        let mut first_error = None;
        for outcome in joined {
            match outcome {
                Err(payload) => std::panic::resume_unwind(payload),
                Ok(Ok(value)) => results.push(value),
                Ok(Err(e)) => {
                    // Peers of a failed worker report Aborted; keep the cause.
                    let replace = match &first_error {
                        None => true,
                        Some(Error::Aborted) => !matches!(e, Error::Aborted),
                        Some(_) => false,
                    };
                    if replace {
                        first_error = Some(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("group of {} workers finished", self.size);
                Ok(results)
            }
        }
    }

    /// Get the current wall-clock time in seconds.
    ///
    /// Monotonic and high-resolution; only differences between two readings
    /// are meaningful.
    pub fn wtime() -> f64 {
        static EPOCH: OnceLock<Instant> = OnceLock::new();
        EPOCH.get_or_init(Instant::now).elapsed().as_secs_f64()
    }
}

/// Aborts the group if the owning worker unwinds.
struct AbortOnPanic<'a>(&'a Fabric);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_group_is_rejected() {
        assert!(matches!(Universe::new(0), Err(Error::InvalidGroupSize(0))));
    }

    #[test]
    fn results_in_rank_order() {
        let universe = Universe::new(5).unwrap();
        let out = universe
            .run(|world| Ok((world.rank(), world.size(), world.is_leader())))
            .unwrap();
        assert_eq!(out.len(), 5);
        for (i, (rank, size, leader)) in out.into_iter().enumerate() {
            assert_eq!(rank, i as i32);
            assert_eq!(size, 5);
            assert_eq!(leader, i == 0);
        }
    }

    #[test]
    fn single_worker_group() {
        let out = Universe::new(1)
            .unwrap()
            .run(|world| {
                world.barrier()?;
                world.reduce_sum(2.5, 0)
            })
            .unwrap();
        assert_eq!(out, vec![2.5]);
    }

    #[test]
    fn failure_aborts_peers() {
        let universe = Universe::new(3).unwrap();
        let result = universe.run(|world| {
            if world.rank() == 2 {
                return Err(Error::Config("rank 2 gives up".into()));
            }
            // Never satisfied: rank 2 leaves before the barrier.
            world.barrier()
        });
        match result {
            Err(Error::Config(msg)) => assert_eq!(msg, "rank 2 gives up"),
            other => panic!("expected the root-cause error, got {other:?}"),
        }
    }

    #[test]
    fn aborted_run_leaves_next_run_usable() {
        let universe = Universe::new(3).unwrap();
        let failed = universe.run(|world| {
            if world.is_leader() {
                return Err(Error::Internal("leader quits".into()));
            }
            world.barrier()
        });
        assert!(matches!(failed, Err(Error::Internal(_))));

        let sums = universe
            .run(|world| world.allreduce_scalar(world.rank(), ReduceOp::Sum))
            .unwrap();
        assert_eq!(sums, vec![3, 3, 3]);
    }

    #[test]
    fn panic_aborts_peers_and_resumes() {
        let universe = Universe::new(2).unwrap();
        let outcome = std::panic::catch_unwind(|| {
            universe.run(|world| {
                if world.rank() == 1 {
                    panic!("worker bug");
                }
                let mut buf = [0.0f64];
                world.recv(&mut buf, 1, 0).map(|_| ())
            })
        });
        assert!(outcome.is_err());
    }

    #[test]
    fn independent_universes() {
        let a = Universe::new(2).unwrap();
        let b = Universe::new(3).unwrap();
        let (ra, rb) = thread::scope(|s| {
            let ha = s.spawn(|| a.run(|w| w.allreduce_scalar(1i32, ReduceOp::Sum)));
            let hb = s.spawn(|| b.run(|w| w.allreduce_scalar(1i32, ReduceOp::Sum)));
            (ha.join().unwrap(), hb.join().unwrap())
        });
        assert_eq!(ra.unwrap(), vec![2, 2]);
        assert_eq!(rb.unwrap(), vec![3, 3, 3]);
    }

    #[test]
    fn wtime_is_monotonic() {
        let t0 = Universe::wtime();
        let t1 = Universe::wtime();
        assert!(t1 >= t0);
    }
}
