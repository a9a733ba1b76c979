//! Distributed dartboard estimation of π.
//!
//! Every worker throws darts at the square `[-1, 1]²` in rounds and keeps a
//! running average of its per-round estimates. The running averages are
//! summed at the leader and divided by the group size. Two strategies decide
//! how many rounds each worker runs:
//!
//! - [`Strategy::SameRounds`]: every worker runs all `R` rounds.
//! - [`Strategy::DividedRounds`]: each worker runs `R / size` rounds. The
//!   division truncates, so `R % size` rounds are never run.
//!
//! In both, a round throws `D / size` darts per worker.

use crate::comm::{Communicator, LEADER};
use crate::config::EstimateConfig;
use crate::error::{Error, Result};
use crate::record::{ResultStore, RunResult};
use crate::Universe;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Throw `darts` darts uniformly at `[-1, 1]²` and return `4 * hits / darts`,
/// where a hit lands inside the unit circle.
///
/// # Errors
///
/// Returns [`Error::InvalidCount`] if `darts` is zero.
pub fn dboard<R: Rng + ?Sized>(darts: u64, rng: &mut R) -> Result<f64> {
    if darts == 0 {
        return Err(Error::InvalidCount(0));
    }
    let mut score: u64 = 0;
    for _ in 0..darts {
        let x: f64 = rng.gen_range(-1.0..=1.0);
        let y: f64 = rng.gen_range(-1.0..=1.0);
        if x * x + y * y <= 1.0 {
            score += 1;
        }
    }
    Ok(4.0 * score as f64 / darts as f64)
}

/// A worker's running average of its per-round estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EstimationState {
    average: f64,
    samples: u64,
}

impl EstimationState {
    /// An empty state: average 0 over no samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into the running average.
    pub fn fold(&mut self, sample: f64) {
        let n = self.samples as f64;
        self.average = (self.average * n + sample) / (n + 1.0);
        self.samples += 1;
    }

    /// Current running average.
    pub fn average(&self) -> f64 {
        self.average
    }

    /// Number of samples folded so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }
}

/// How rounds are assigned to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Every worker runs every round.
    SameRounds,
    /// Rounds are divided evenly across workers; the remainder is dropped.
    DividedRounds,
}

impl Strategy {
    /// Both strategies, in the order a full run executes them.
    pub const ALL: [Strategy; 2] = [Strategy::SameRounds, Strategy::DividedRounds];

    /// Label written in the `run_type` column.
    pub fn label(self) -> &'static str {
        match self {
            Strategy::SameRounds => "SAME ROUND FOR EACH PROCESS",
            Strategy::DividedRounds => "DIVIDE ROUND AMONG PROCESSES",
        }
    }

    /// Rounds per worker when the strategy divides them, `None` otherwise.
    pub fn rounds_per_task(self, total_rounds: u64, size: i32) -> Option<u64> {
        match self {
            Strategy::SameRounds => None,
            Strategy::DividedRounds => Some(total_rounds / size.max(1) as u64),
        }
    }

    /// Rounds a single worker runs.
    pub fn rounds_for_worker(self, total_rounds: u64, size: i32) -> u64 {
        self.rounds_per_task(total_rounds, size)
            .unwrap_or(total_rounds)
    }
}

/// Runs the estimation strategies over a group.
#[derive(Debug, Clone)]
pub struct Estimator {
    config: EstimateConfig,
}

impl Estimator {
    /// Create an estimator for `config`.
    pub fn new(config: EstimateConfig) -> Self {
        Estimator { config }
    }

    /// The run configuration.
    pub fn config(&self) -> &EstimateConfig {
        &self.config
    }

    /// Run one strategy. Every worker must call this with the same
    /// strategy; the leader gets the result, the others `None`.
    ///
    /// The sampling source is reseeded from `seed + rank` on entry, so two
    /// strategies run back to back in one process see the same streams.
    pub fn run_strategy(
        &self,
        comm: &Communicator,
        strategy: Strategy,
    ) -> Result<Option<RunResult>> {
        let size = comm.size();
        let rank = comm.rank();
        self.config.validate_for(size)?;

        let total_rounds = self.config.total_rounds();
        let darts = self.config.darts_per_task(size);
        let rounds = strategy.rounds_for_worker(total_rounds, size);
        if strategy == Strategy::DividedRounds && comm.is_leader() {
            let dropped = total_rounds % size as u64;
            if dropped != 0 {
                warn!(
                    "{total_rounds} rounds do not divide across {size} workers, dropping {dropped}"
                );
            }
            if rounds == 0 {
                warn!("fewer rounds than workers, every worker contributes 0");
            }
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed().wrapping_add(rank as u64));
        let mut state = EstimationState::new();

        let start = Universe::wtime();
        for round in 0..rounds {
            state.fold(dboard(darts, &mut rng)?);
            debug!(
                "rank {rank}: after {} darts, average value of pi = {:.8}",
                darts * (round + 1),
                state.average()
            );
        }
        let sum = comm.reduce_sum(state.average(), LEADER)?;
        let time_taken = Universe::wtime() - start;

        if !comm.is_leader() {
            return Ok(None);
        }
        let pi_est = sum / f64::from(size);
        info!(
            "{}: pi = {pi_est:.10} (error {:.2e}) with {size} workers in {time_taken:.4}s",
            strategy.label(),
            (pi_est - std::f64::consts::PI).abs()
        );
        Ok(Some(RunResult {
            run_type: strategy.label().to_string(),
            ranks: size,
            total_rounds,
            rounds_per_task: strategy.rounds_per_task(total_rounds, size),
            total_darts: self.config.total_darts(),
            darts_per_task: darts,
            time_taken,
            pi_est,
        }))
    }

    /// Run both strategies, separated by a barrier. The leader records each
    /// result in `store` as soon as the strategy completes.
    ///
    /// A failed write is logged and returned to the leader only after the
    /// remaining strategy has run, so no other worker waits on it.
    pub fn run(
        &self,
        comm: &Communicator,
        store: Option<&ResultStore>,
    ) -> Result<Vec<RunResult>> {
        let mut results = Vec::new();
        let mut record_error = None;
        for (i, strategy) in Strategy::ALL.into_iter().enumerate() {
            if i > 0 {
                comm.barrier()?;
            }
            let Some(result) = self.run_strategy(comm, strategy)? else {
                continue;
            };
            if let Some(store) = store {
                if let Err(e) = store.record(&result) {
                    error!("failed to record {}: {e}", result.run_type);
                    record_error.get_or_insert(e);
                }
            }
            results.push(result);
        }
        match record_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}
