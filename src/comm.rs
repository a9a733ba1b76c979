//! Per-worker communicator: identity, point-to-point and collective operations.

use crate::datatype::Datatype;
use crate::error::{Error, Result};
use crate::fabric::Fabric;
use crate::status::Status;
use crate::ReduceOp;
use log::debug;
use std::sync::Arc;

/// Rank of the group leader: the root of the estimator's collectives and the
/// only worker that writes results.
pub const LEADER: i32 = 0;

// Reserved tags for collective traffic. User tags must be >= 0.
const TAG_BCAST: i32 = -10;
const TAG_SCATTER: i32 = -11;
const TAG_GATHER: i32 = -12;
const TAG_REDUCE: i32 = -13;

/// Receives take a user tag or [`ANY_TAG`](crate::ANY_TAG); reserved tags are
/// never addressable.
fn check_recv_tag(tag: i32) -> Result<()> {
    if tag < 0 && tag != crate::ANY_TAG {
        Err(Error::InvalidTag(tag))
    } else {
        Ok(())
    }
}

/// A worker's handle on its group.
///
/// Each worker receives exactly one communicator from
/// [`Universe::run`](crate::Universe::run). It carries the worker's rank and a
/// shared handle on the group's message fabric, and provides point-to-point
/// and collective communication.
///
/// Unlike an MPI communicator this handle is `Send`: a worker is a thread, and
/// its communicator is moved onto that thread at start-up.
///
/// # Example
///
/// ```
/// use ferrocomm::Universe;
///
/// Universe::new(3)
///     .unwrap()
///     .run(|world| {
///         println!("I am rank {} of {}", world.rank(), world.size());
///         Ok(())
///     })
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct Communicator {
    rank: i32,
    fabric: Arc<Fabric>,
}

impl Communicator {
    pub(crate) fn new(rank: i32, fabric: Arc<Fabric>) -> Self {
        Communicator { rank, fabric }
    }

    /// Get the rank of the calling worker in this group.
    pub fn rank(&self) -> i32 {
        self.rank
    }

    /// Get the number of workers in this group.
    pub fn size(&self) -> i32 {
        self.fabric.size() as i32
    }

    /// Whether the calling worker is the group leader (rank 0).
    pub fn is_leader(&self) -> bool {
        self.rank == LEADER
    }

    /// Abort the whole group. Every worker blocked in, or later entering, a
    /// communication call fails with [`Error::Aborted`].
    pub fn abort(&self) {
        self.fabric.abort();
    }

    // ========================================================================
    // Synchronization
    // ========================================================================

    /// Barrier synchronization.
    ///
    /// All workers in the group must call this function. No worker
    /// will return until all workers have entered the barrier.
    pub fn barrier(&self) -> Result<()> {
        debug!("rank {}: barrier", self.rank);
        self.fabric.rendezvous()
    }

    // ========================================================================
    // Point-to-Point Communication
    // ========================================================================

    /// Send a slice of values to another worker.
    ///
    /// Returns once the message has been handed to the destination's
    /// mailbox, not once it has been received.
    pub fn send<T: Datatype>(&self, data: &[T], dest: i32, tag: i32) -> Result<()> {
        if tag < 0 {
            return Err(Error::InvalidTag(tag));
        }
        self.fabric.post(self.rank, dest, tag, data.to_vec())
    }

    /// Receive values from another worker into `data`.
    ///
    /// Use [`ANY_SOURCE`](crate::ANY_SOURCE) and [`ANY_TAG`](crate::ANY_TAG)
    /// as wildcards. The message may be shorter than `data`; the returned
    /// status carries the actual count. A longer message fails with
    /// [`Error::Truncated`] and is consumed.
    pub fn recv<T: Datatype>(&self, data: &mut [T], source: i32, tag: i32) -> Result<Status> {
        let (received, status) = self.recv_vec(source, tag)?;
        if received.len() > data.len() {
            return Err(Error::Truncated {
                count: received.len(),
                capacity: data.len(),
            });
        }
        data[..received.len()].copy_from_slice(&received);
        Ok(status)
    }

    /// Receive a whole message, whatever its length.
    pub fn recv_vec<T: Datatype>(&self, source: i32, tag: i32) -> Result<(Vec<T>, Status)> {
        self.check_source(source)?;
        check_recv_tag(tag)?;
        let envelope = self.fabric.take(self.rank, source, tag)?;
        let status = envelope.status();
        Ok((envelope.into_vec()?, status))
    }

    /// Block until a matching message is available and describe it without
    /// receiving it.
    pub fn probe<T: Datatype>(&self, source: i32, tag: i32) -> Result<Status> {
        self.check_source(source)?;
        check_recv_tag(tag)?;
        self.fabric.peek(self.rank, source, tag)
    }

    fn check_source(&self, source: i32) -> Result<()> {
        if source == crate::ANY_SOURCE {
            Ok(())
        } else {
            Error::check_rank(source, self.size())
        }
    }

    // ========================================================================
    // Blocking Collectives
    // ========================================================================

    /// Broadcast a slice of values from root to all workers.
    ///
    /// # Arguments
    ///
    /// * `data` - Buffer to broadcast (input at root, output at others)
    /// * `root` - Rank of the root worker
    pub fn broadcast<T: Datatype>(&self, data: &mut [T], root: i32) -> Result<()> {
        self.enter_collective("broadcast", root)?;
        if self.rank == root {
            for dest in (0..self.size()).filter(|&r| r != root) {
                self.fabric.post(self.rank, dest, TAG_BCAST, data.to_vec())?;
            }
        } else {
            let received: Vec<T> = self.fabric.take(self.rank, root, TAG_BCAST)?.into_vec()?;
            if received.len() != data.len() {
                return Err(Error::InvalidBuffer);
            }
            data.copy_from_slice(&received);
        }
        Ok(())
    }

    /// Scatter values from root to all workers.
    ///
    /// Root sends `recv.len() * size` elements total; worker `i` receives
    /// the slice starting at `i * recv.len()`. `send` is only significant at
    /// root.
    pub fn scatter<T: Datatype>(&self, send: &[T], recv: &mut [T], root: i32) -> Result<()> {
        self.enter_collective("scatter", root)?;
        if self.rank == root {
            let chunk = recv.len();
            if send.len() != chunk * self.size() as usize {
                return Err(Error::InvalidBuffer);
            }
            for dest in 0..self.size() {
                let piece = &send[dest as usize * chunk..(dest as usize + 1) * chunk];
                if dest == root {
                    recv.copy_from_slice(piece);
                } else {
                    self.fabric.post(self.rank, dest, TAG_SCATTER, piece.to_vec())?;
                }
            }
        } else {
            let piece: Vec<T> = self
                .fabric
                .take(self.rank, root, TAG_SCATTER)?
                .into_vec()?;
            if piece.len() != recv.len() {
                return Err(Error::InvalidBuffer);
            }
            recv.copy_from_slice(&piece);
        }
        Ok(())
    }

    /// Gather values to the root worker.
    ///
    /// Each worker sends `send.len()` elements. Root receives them in rank
    /// order into `recv`, which must hold `send.len() * size` elements at
    /// root and is ignored elsewhere.
    pub fn gather<T: Datatype>(&self, send: &[T], recv: &mut [T], root: i32) -> Result<()> {
        self.enter_collective("gather", root)?;
        if self.rank != root {
            return self.fabric.post(self.rank, root, TAG_GATHER, send.to_vec());
        }
        let chunk = send.len();
        if recv.len() != chunk * self.size() as usize {
            return Err(Error::InvalidBuffer);
        }
        for source in 0..self.size() {
            let slot = &mut recv[source as usize * chunk..(source as usize + 1) * chunk];
            if source == root {
                slot.copy_from_slice(send);
                continue;
            }
            let piece: Vec<T> = self.fabric.take(self.rank, source, TAG_GATHER)?.into_vec()?;
            if piece.len() != chunk {
                return Err(Error::InvalidBuffer);
            }
            slot.copy_from_slice(&piece);
        }
        Ok(())
    }

    /// Gather one value from every worker.
    ///
    /// Root receives a vector whose index `i` holds worker `i`'s value; the
    /// other workers receive an empty vector.
    pub fn gather_scalar<T: Datatype>(&self, value: T, root: i32) -> Result<Vec<T>> {
        let mut recv = if self.rank == root {
            vec![value; self.size() as usize]
        } else {
            Vec::new()
        };
        self.gather(&[value], &mut recv, root)?;
        Ok(recv)
    }

    /// Reduce values to the root worker.
    ///
    /// # Arguments
    ///
    /// * `send` - Data to send from this worker
    /// * `recv` - Buffer for result (only significant at root)
    /// * `op` - Reduction operation
    /// * `root` - Rank of the root worker
    ///
    /// Contributions are combined in rank order, so the floating-point result
    /// may differ from another summation order within rounding error.
    pub fn reduce<T: Datatype>(
        &self,
        send: &[T],
        recv: &mut [T],
        op: ReduceOp,
        root: i32,
    ) -> Result<()> {
        if send.len() != recv.len() {
            return Err(Error::InvalidBuffer);
        }
        self.enter_collective("reduce", root)?;
        if self.rank != root {
            return self.fabric.post(self.rank, root, TAG_REDUCE, send.to_vec());
        }
        let mut contributions = Vec::with_capacity(self.size() as usize);
        for source in 0..self.size() {
            if source == root {
                contributions.push(send.to_vec());
                continue;
            }
            let piece: Vec<T> = self.fabric.take(self.rank, source, TAG_REDUCE)?.into_vec()?;
            if piece.len() != send.len() {
                return Err(Error::InvalidBuffer);
            }
            contributions.push(piece);
        }
        let mut contributions = contributions.into_iter();
        if let Some(first) = contributions.next() {
            recv.copy_from_slice(&first);
        }
        for piece in contributions {
            for (acc, value) in recv.iter_mut().zip(piece) {
                *acc = acc.combine(value, op);
            }
        }
        Ok(())
    }

    /// Reduce a single value to the root worker.
    ///
    /// Root receives the reduction; other workers get their own value back.
    pub fn reduce_scalar<T: Datatype>(&self, value: T, op: ReduceOp, root: i32) -> Result<T> {
        let mut recv = [value];
        self.reduce(&[value], &mut recv, op, root)?;
        Ok(recv[0])
    }

    /// Sum a single `f64` across the group at `root`.
    pub fn reduce_sum(&self, value: f64, root: i32) -> Result<f64> {
        self.reduce_scalar(value, ReduceOp::Sum, root)
    }

    /// All-reduce a single value: reduce at rank 0, then broadcast.
    pub fn allreduce_scalar<T: Datatype>(&self, value: T, op: ReduceOp) -> Result<T> {
        let mut buf = [self.reduce_scalar(value, op, LEADER)?];
        self.broadcast(&mut buf, LEADER)?;
        Ok(buf[0])
    }

    /// Every collective starts by joining the group latch, so no worker
    /// observes a result before all workers have entered the call.
    fn enter_collective(&self, name: &str, root: i32) -> Result<()> {
        Error::check_rank(root, self.size())?;
        debug!("rank {}: {name} (root {root})", self.rank);
        self.fabric.rendezvous()
    }
}

impl std::fmt::Debug for Communicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communicator")
            .field("rank", &self.rank)
            .field("size", &self.size())
            .finish()
    }
}
