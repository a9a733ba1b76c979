//! Vector-mean flows over the collectives.
//!
//! [`scatter_means`] splits an integer vector across the group and gathers
//! the chunk means back; [`broadcast_means`] pushes freshly drawn vectors to
//! every worker and has each of them average what it received.

use crate::comm::Communicator;
use crate::datatype::Datatype;
use crate::error::{Error, Result};
use crate::Universe;
use log::{debug, info};
use rand::Rng;

/// Arithmetic mean of `values`; NaN when empty.
pub fn mean<T: Datatype>(values: &[T]) -> f64 {
    values.iter().map(|v| v.as_f64()).sum::<f64>() / values.len() as f64
}

/// `len` values drawn uniformly from `0..100`.
pub fn random_vector<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<i32> {
    (0..len).map(|_| rng.gen_range(0..100)).collect()
}

/// What the root learns from [`scatter_means`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeanReport {
    /// Mean of each non-root worker's chunk, in rank order.
    pub means: Vec<f64>,
    /// Mean of `means`.
    pub mean_of_means: f64,
    /// Seconds from before the scatter to after the gather.
    pub elapsed: f64,
}

/// Scatter `data` from `root` in equal chunks of `len / size`, have every
/// non-root worker average its chunk, and gather the means at `root`.
///
/// `len` must be the same on every worker; `data` is only read at root and
/// must hold `len` values there. Trailing values that do not fill a chunk
/// are not sent. The root's own chunk is not averaged and its slot is
/// discarded from the report.
pub fn scatter_means(
    comm: &Communicator,
    data: &[i32],
    len: usize,
    root: i32,
) -> Result<Option<MeanReport>> {
    let size = comm.size() as usize;
    if size < 2 {
        return Err(Error::Config("scatter means need at least 2 workers".into()));
    }
    let chunk = len / size;
    if chunk == 0 {
        return Err(Error::Config(format!(
            "{len} values cannot be split across {size} workers"
        )));
    }
    let is_root = comm.rank() == root;
    if is_root && data.len() != len {
        return Err(Error::InvalidBuffer);
    }

    let start = Universe::wtime();
    let send = if is_root { &data[..chunk * size] } else { &[][..] };
    let mut piece = vec![0i32; chunk];
    comm.scatter(send, &mut piece, root)?;

    let local_mean = if is_root { 0.0 } else { mean(&piece) };
    if !is_root {
        debug!(
            "rank {}: received {chunk} values, mean {local_mean}",
            comm.rank()
        );
    }
    let gathered = comm.gather_scalar(local_mean, root)?;
    if !is_root {
        return Ok(None);
    }

    let means: Vec<f64> = gathered
        .into_iter()
        .enumerate()
        .filter(|&(rank, _)| rank as i32 != root)
        .map(|(_, m)| m)
        .collect();
    let mean_of_means = mean(&means);
    let elapsed = Universe::wtime() - start;
    info!("mean of {} chunk means is {mean_of_means} ({elapsed:.6}s)", means.len());
    Ok(Some(MeanReport {
        means,
        mean_of_means,
        elapsed,
    }))
}

/// Broadcast `rounds` random vectors of `len` values from `root`; every
/// worker returns the mean of each vector it received.
///
/// `rng` is only drawn from at root.
pub fn broadcast_means<R: Rng + ?Sized>(
    comm: &Communicator,
    rounds: usize,
    len: usize,
    rng: &mut R,
    root: i32,
) -> Result<Vec<f64>> {
    let mut buffer = vec![0i32; len];
    let mut means = Vec::with_capacity(rounds);
    for round in 0..rounds {
        if comm.rank() == root {
            buffer = random_vector(len, rng);
        }
        comm.broadcast(&mut buffer, root)?;
        let m = mean(&buffer);
        debug!(
            "rank {}: mean of vector {round} is {m} {buffer:?}",
            comm.rank()
        );
        means.push(m);
    }
    Ok(means)
}
