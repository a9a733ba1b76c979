//! In-process message medium shared by every worker of a group.
//!
//! Each rank owns a mailbox. Senders push envelopes into the destination's
//! mailbox; receivers pick the oldest envelope matching `(source, tag)`,
//! which keeps delivery FIFO per ordered pair and tag. Collectives
//! synchronise through a counting latch. Aborting the fabric wakes every
//! blocked worker with [`Error::Aborted`].

use crate::datatype::{Datatype, DatatypeTag};
use crate::error::{Error, Result};
use crate::status::Status;
use log::{debug, error};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// Wildcard source for [`Communicator::recv`](crate::Communicator::recv) and
/// [`Communicator::probe`](crate::Communicator::probe).
pub const ANY_SOURCE: i32 = -1;

/// Wildcard tag. Matches user tags only, never collective traffic.
pub const ANY_TAG: i32 = -1;

/// A message in flight.
pub(crate) struct Envelope {
    source: i32,
    tag: i32,
    datatype: DatatypeTag,
    count: usize,
    payload: Box<dyn Any + Send>,
}

impl Envelope {
    fn matches(&self, source: i32, tag: i32) -> bool {
        let source_ok = source == ANY_SOURCE || self.source == source;
        let tag_ok = if tag == ANY_TAG {
            self.tag >= 0
        } else {
            self.tag == tag
        };
        source_ok && tag_ok
    }

    pub(crate) fn status(&self) -> Status {
        Status {
            source: self.source,
            tag: self.tag,
            count: self.count,
        }
    }

    /// Unwrap the payload as a vector of `T`.
    pub(crate) fn into_vec<T: Datatype>(self) -> Result<Vec<T>> {
        if self.datatype != T::TAG {
            return Err(Error::DatatypeMismatch {
                expected: T::TAG,
                found: self.datatype,
            });
        }
        self.payload
            .downcast::<Vec<T>>()
            .map(|data| *data)
            .map_err(|_| Error::Internal("Payload does not match its datatype tag".into()))
    }
}

#[derive(Default)]
struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
    arrived: Condvar,
}

#[derive(Default)]
struct LatchState {
    arrived: usize,
    generation: u64,
}

struct Latch {
    parties: usize,
    state: Mutex<LatchState>,
    released: Condvar,
}

/// Shared transport for one group.
pub(crate) struct Fabric {
    mailboxes: Vec<Mailbox>,
    latch: Latch,
    aborted: AtomicBool,
}

impl Fabric {
    pub(crate) fn new(size: usize) -> Self {
        Fabric {
            mailboxes: (0..size).map(|_| Mailbox::default()).collect(),
            latch: Latch {
                parties: size,
                state: Mutex::new(LatchState::default()),
                released: Condvar::new(),
            },
            aborted: AtomicBool::new(false),
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.mailboxes.len()
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn check_alive(&self) -> Result<()> {
        if self.is_aborted() {
            Err(Error::Aborted)
        } else {
            Ok(())
        }
    }

    fn mailbox(&self, rank: i32) -> Result<&Mailbox> {
        Error::check_rank(rank, self.size() as i32)?;
        Ok(&self.mailboxes[rank as usize])
    }

    /// Hand `data` off to `dest`'s mailbox. Returns once enqueued.
    pub(crate) fn post<T: Datatype>(
        &self,
        source: i32,
        dest: i32,
        tag: i32,
        data: Vec<T>,
    ) -> Result<()> {
        self.check_alive()?;
        let mailbox = self.mailbox(dest)?;
        debug!(
            "post {} x {:?} from {source} to {dest} (tag {tag})",
            data.len(),
            T::TAG
        );
        let envelope = Envelope {
            source,
            tag,
            datatype: T::TAG,
            count: data.len(),
            payload: Box::new(data),
        };
        mailbox.queue.lock().push_back(envelope);
        mailbox.arrived.notify_all();
        Ok(())
    }

    /// Block until an envelope matching `(source, tag)` is in `rank`'s
    /// mailbox, then remove and return it.
    pub(crate) fn take(&self, rank: i32, source: i32, tag: i32) -> Result<Envelope> {
        self.wait_for(rank, |queue| {
            let index = queue.iter().position(|e| e.matches(source, tag))?;
            queue.remove(index)
        })
    }

    /// Block until an envelope matching `(source, tag)` is available and
    /// describe it without consuming it.
    pub(crate) fn peek(&self, rank: i32, source: i32, tag: i32) -> Result<Status> {
        self.wait_for(rank, |queue| {
            queue
                .iter()
                .find(|e| e.matches(source, tag))
                .map(Envelope::status)
        })
    }

    fn wait_for<R>(
        &self,
        rank: i32,
        mut select: impl FnMut(&mut VecDeque<Envelope>) -> Option<R>,
    ) -> Result<R> {
        let mailbox = self.mailbox(rank)?;
        let mut queue = mailbox.queue.lock();
        loop {
            // Checked under the lock so an abort cannot slip between the
            // check and the wait.
            self.check_alive()?;
            if let Some(found) = select(&mut *queue) {
                return Ok(found);
            }
            mailbox.arrived.wait(&mut queue);
        }
    }

    /// Counting latch: returns once every rank has arrived.
    pub(crate) fn rendezvous(&self) -> Result<()> {
        let latch = &self.latch;
        let mut state = latch.state.lock();
        self.check_alive()?;
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == latch.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            latch.released.notify_all();
            return Ok(());
        }
        while state.generation == generation {
            self.check_alive()?;
            latch.released.wait(&mut state);
        }
        Ok(())
    }

    /// Tear the group down. Every blocked or future call fails with
    /// [`Error::Aborted`].
    pub(crate) fn abort(&self) {
        if self.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        error!("aborting group of {} workers", self.size());
        for mailbox in &self.mailboxes {
            let _queue = mailbox.queue.lock();
            mailbox.arrived.notify_all();
        }
        let _state = self.latch.state.lock();
        self.latch.released.notify_all();
    }
}
