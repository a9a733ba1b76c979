//! Append-only CSV store of estimator run results.
//!
//! The store is a comma-separated file whose first line is a fixed header.
//! The header is written only when the file is empty, so repeated runs keep
//! appending rows under a single header. Only the group leader writes.

use crate::error::{Error, Result};
use log::info;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Header row, in [`RunResult`] field order.
pub const HEADER: &str =
    "run_type,ranks,total_rounds,rounds_per_task,total_darts,darts_per_task,time_taken,pi_est";

/// Written in the `rounds_per_task` column when the strategy does not split
/// rounds across workers.
pub const NOT_APPLICABLE: &str = "N/A";

/// One estimator run as stored in the result file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Strategy label.
    pub run_type: String,
    /// Group size.
    pub ranks: i32,
    /// Rounds requested for the run.
    pub total_rounds: u64,
    /// Rounds each worker ran, when the strategy divides them.
    pub rounds_per_task: Option<u64>,
    /// Darts per round across the group.
    pub total_darts: u64,
    /// Darts each worker threw per round.
    pub darts_per_task: u64,
    /// Wall-clock seconds measured by the leader.
    pub time_taken: f64,
    /// Final estimate of π.
    pub pi_est: f64,
}

impl RunResult {
    /// Absolute error of the estimate against π.
    pub fn error(&self) -> f64 {
        (self.pi_est - std::f64::consts::PI).abs()
    }

    /// Format as one CSV row (no trailing newline).
    pub fn to_row(&self) -> String {
        let rounds_per_task = self
            .rounds_per_task
            .map_or_else(|| NOT_APPLICABLE.to_string(), |r| r.to_string());
        format!(
            "{},{},{},{},{},{},{},{}",
            self.run_type,
            self.ranks,
            self.total_rounds,
            rounds_per_task,
            self.total_darts,
            self.darts_per_task,
            self.time_taken,
            self.pi_est
        )
    }

    /// Parse one CSV row written by [`to_row`](Self::to_row).
    pub fn from_row(row: &str) -> Result<Self> {
        let fields: Vec<&str> = row.trim_end().split(',').collect();
        if fields.len() != 8 {
            return Err(Error::Internal(format!(
                "expected 8 fields, found {} in '{row}'",
                fields.len()
            )));
        }
        let rounds_per_task = match fields[3] {
            NOT_APPLICABLE => None,
            value => Some(parse_field(value, "rounds_per_task")?),
        };
        Ok(RunResult {
            run_type: fields[0].to_string(),
            ranks: parse_field(fields[1], "ranks")?,
            total_rounds: parse_field(fields[2], "total_rounds")?,
            rounds_per_task,
            total_darts: parse_field(fields[4], "total_darts")?,
            darts_per_task: parse_field(fields[5], "darts_per_task")?,
            time_taken: parse_field(fields[6], "time_taken")?,
            pi_est: parse_field(fields[7], "pi_est")?,
        })
    }
}

fn parse_field<T: std::str::FromStr>(value: &str, name: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Internal(format!("invalid {name} '{value}'")))
}

/// Handle on a CSV result file.
#[derive(Debug, Clone)]
pub struct ResultStore {
    path: PathBuf,
}

impl ResultStore {
    /// Refer to the store at `path`. Nothing is touched until the first
    /// [`record`](Self::record).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ResultStore { path: path.into() }
    }

    /// Location of the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `result`, writing the header first if the store is empty.
    pub fn record(&self, result: &RunResult) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut out = String::new();
        if file.metadata()?.len() == 0 {
            out.push_str(HEADER);
            out.push('\n');
        }
        out.push_str(&result.to_row());
        out.push('\n');
        file.write_all(out.as_bytes())?;
        file.flush()?;
        info!(
            "recorded {} ({} ranks) in {}",
            result.run_type,
            result.ranks,
            self.path.display()
        );
        Ok(())
    }

    /// Read every row back. A missing or empty store yields no rows.
    pub fn load(&self) -> Result<Vec<RunResult>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut results = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() || (i == 0 && line.trim_end() == HEADER) {
                continue;
            }
            results.push(RunResult::from_row(&line)?);
        }
        Ok(results)
    }
}
