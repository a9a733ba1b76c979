//! Point-to-plane distance flow over the typed channel.
//!
//! Rank 0 distributes one problem per worker, each worker computes the
//! signed distance from its point to its plane and forwards it to the
//! collector, and the collector drains one value per worker.
//!
//! For `n` problems the layout is: distributor `0`, workers `1..=n`,
//! collector `n + 1`. Any further ranks stay idle.

use crate::channel::MessageKind;
use crate::comm::Communicator;
use crate::error::{Error, Result};
use log::{debug, info};

/// Rank that hands out problems.
pub const DISTRIBUTOR: i32 = 0;

/// Plane `a·x + b·y + c·z = d` and a point to measure against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneProblem {
    /// Plane normal `(a, b, c)`.
    pub coefficients: [f64; 3],
    /// Point `(x, y, z)`.
    pub point: [f64; 3],
    /// Plane offset `d`.
    pub offset: f64,
}

impl PlaneProblem {
    /// Signed distance `(a·x + b·y + c·z − d) / sqrt(a² + b² + c²)`.
    pub fn distance(&self) -> f64 {
        plane_distance(self.coefficients, self.point, self.offset)
    }
}

/// Signed distance from `point` to the plane `coefficients · p = offset`.
pub fn plane_distance(coefficients: [f64; 3], point: [f64; 3], offset: f64) -> f64 {
    let [a, b, c] = coefficients;
    let [x, y, z] = point;
    (a * x + b * y + c * z - offset) / (a * a + b * b + c * c).sqrt()
}

/// The three problems of the tutorial run: normals `(1,2,3)`, `(4,5,6)`,
/// `(7,8,9)` against points `(1.13,2.13,3.13)`, `(4.13,5.13,6.13)`,
/// `(7.13,8.13,9.13)`, all with offset 10.
pub fn default_problems() -> Vec<PlaneProblem> {
    (0..3)
        .map(|i| {
            let base = 3.0 * i as f64;
            PlaneProblem {
                coefficients: [base + 1.0, base + 2.0, base + 3.0],
                point: [base + 1.13, base + 2.13, base + 3.13],
                offset: 10.0,
            }
        })
        .collect()
}

/// What a rank does in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sends every problem out.
    Distributor,
    /// Solves the problem with this index.
    Worker(usize),
    /// Receives every distance.
    Collector,
    /// Takes no part.
    Idle,
}

impl Role {
    /// Role of `rank` when solving `problems` problems.
    pub fn for_rank(rank: i32, problems: usize) -> Role {
        let collector = problems as i32 + 1;
        match rank {
            DISTRIBUTOR => Role::Distributor,
            r if r == collector => Role::Collector,
            r if r > DISTRIBUTOR && r < collector => Role::Worker(r as usize - 1),
            _ => Role::Idle,
        }
    }
}

/// Rank of the collector for `problems` problems.
pub fn collector_rank(problems: usize) -> i32 {
    problems as i32 + 1
}

/// A distance reported to the collector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distance {
    /// Worker that computed it.
    pub source: i32,
    /// The reported value (a mean, if the worker sent several).
    pub value: f64,
}

/// Run the flow on the calling rank. The collector returns every distance
/// in worker order; the other ranks return `None`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the group is smaller than `problems + 2`.
pub fn run(comm: &Communicator, problems: &[PlaneProblem]) -> Result<Option<Vec<Distance>>> {
    let needed = problems.len() + 2;
    if (comm.size() as usize) < needed {
        return Err(Error::Config(format!(
            "{} problems need {needed} workers, group has {}",
            problems.len(),
            comm.size()
        )));
    }
    match Role::for_rank(comm.rank(), problems.len()) {
        Role::Distributor => distribute(comm, problems).map(|()| None),
        Role::Worker(_) => solve(comm, collector_rank(problems.len())).map(|_| None),
        Role::Collector => collect(comm, problems.len()).map(Some),
        Role::Idle => Ok(None),
    }
}

/// Send problem `i` to worker rank `i + 1`.
pub fn distribute(comm: &Communicator, problems: &[PlaneProblem]) -> Result<()> {
    for (i, problem) in problems.iter().enumerate() {
        let dest = i as i32 + 1;
        comm.send_kind(MessageKind::Coefficients, dest, &problem.coefficients)?;
        comm.send_kind(MessageKind::Variables, dest, &problem.point)?;
        comm.send_kind(MessageKind::Constant, dest, &[problem.offset])?;
        debug!("distributor: problem {i} sent to rank {dest}");
    }
    Ok(())
}

/// Receive one problem from the distributor, solve it, and forward the
/// distance to `collector`.
pub fn solve(comm: &Communicator, collector: i32) -> Result<f64> {
    let point = receive_triple(comm, MessageKind::Variables)?;
    let coefficients = receive_triple(comm, MessageKind::Coefficients)?;
    let offset = comm
        .receive_kind(MessageKind::Constant, DISTRIBUTOR)?
        .into_values()[0];

    let distance = plane_distance(coefficients, point, offset);
    debug!("rank {}: distance {distance}", comm.rank());
    comm.send_kind(MessageKind::Constant, collector, &[distance])?;
    Ok(distance)
}

fn receive_triple(comm: &Communicator, kind: MessageKind) -> Result<[f64; 3]> {
    let values = comm.receive_kind(kind, DISTRIBUTOR)?.into_values();
    match values[..] {
        [a, b, c] => Ok([a, b, c]),
        // A reshaped triple collapses to one mean; spread it over the axes.
        [mean] => Ok([mean; 3]),
        _ => Err(Error::InvalidCount(values.len() as i64)),
    }
}

/// Drain one distance from each of the `workers` worker ranks, in rank order.
pub fn collect(comm: &Communicator, workers: usize) -> Result<Vec<Distance>> {
    let mut distances = Vec::with_capacity(workers);
    for source in 1..=workers as i32 {
        let value = comm
            .receive_kind(MessageKind::Constant, source)?
            .into_values()[0];
        distances.push(Distance { source, value });
    }
    for d in &distances {
        info!("distance from rank {}: {:.6}", d.source, d.value);
    }
    Ok(distances)
}
