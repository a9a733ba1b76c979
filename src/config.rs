//! Estimator run configuration.
//!
//! The two run parameters are the total number of rounds and the total
//! number of darts per round, both positive. Everything else has a default.
//! Invalid values are configuration errors raised before any worker
//! communicates.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Seed used when none is given, as in the original dartboard program.
pub const DEFAULT_SEED: u64 = 5;

/// Default location of the result store.
pub const DEFAULT_RESULTS_PATH: &str = "data/results.csv";

/// Validated parameters for one estimator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimateConfig {
    total_rounds: u64,
    total_darts: u64,
    seed: u64,
    results_path: PathBuf,
}

impl EstimateConfig {
    /// Create a configuration from the two run parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if either value is zero.
    pub fn new(total_rounds: u64, total_darts: u64) -> Result<Self> {
        if total_rounds == 0 {
            return Err(Error::Config("total rounds must be positive".into()));
        }
        if total_darts == 0 {
            return Err(Error::Config("total darts must be positive".into()));
        }
        Ok(EstimateConfig {
            total_rounds,
            total_darts,
            seed: DEFAULT_SEED,
            results_path: PathBuf::from(DEFAULT_RESULTS_PATH),
        })
    }

    /// Use `seed` for the sampling sources.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Write results to `path`.
    pub fn with_results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_path = path.into();
        self
    }

    /// Total rounds across the run.
    pub fn total_rounds(&self) -> u64 {
        self.total_rounds
    }

    /// Total darts thrown per round across the group.
    pub fn total_darts(&self) -> u64 {
        self.total_darts
    }

    /// Base seed for the sampling sources.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Location of the result store.
    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    /// Darts each worker throws per round (integer division).
    pub fn darts_per_task(&self, size: i32) -> u64 {
        self.total_darts / size.max(1) as u64
    }

    /// Check that a group of `size` workers can run this configuration.
    pub fn validate_for(&self, size: i32) -> Result<()> {
        if size < 1 {
            return Err(Error::Config(format!("invalid group size {size}")));
        }
        if self.darts_per_task(size) == 0 {
            return Err(Error::Config(format!(
                "{} darts cannot be split across {size} workers",
                self.total_darts
            )));
        }
        Ok(())
    }
}
