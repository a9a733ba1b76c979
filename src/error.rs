//! Error types for ferrocomm

use crate::datatype::DatatypeTag;
use thiserror::Error;

/// Result type for group operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for group operations
#[derive(Error, Debug)]
pub enum Error {
    /// A group must contain at least one worker
    #[error("Invalid group size: {0}")]
    InvalidGroupSize(usize),

    /// Invalid rank specified
    #[error("Invalid rank: {0}")]
    InvalidRank(i32),

    /// Tag outside the user tag range
    #[error("Invalid tag: {0}")]
    InvalidTag(i32),

    /// Invalid buffer provided
    #[error("Invalid buffer")]
    InvalidBuffer,

    /// Invalid count specified
    #[error("Invalid count: {0}")]
    InvalidCount(i64),

    /// Incoming message is larger than the receive buffer
    #[error("Message truncated: {count} elements into a buffer of {capacity}")]
    Truncated {
        /// Elements carried by the message
        count: usize,
        /// Elements the receive buffer can hold
        capacity: usize,
    },

    /// Message element type differs from the receiver's
    #[error("Datatype mismatch: expected {expected:?}, found {found:?}")]
    DatatypeMismatch {
        /// Datatype the receiver asked for
        expected: DatatypeTag,
        /// Datatype the sender used
        found: DatatypeTag,
    },

    /// Another worker failed and the whole group was torn down
    #[error("Group aborted")]
    Aborted,

    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Result store I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check that `rank` addresses a member of a group of `size` workers.
    pub fn check_rank(rank: i32, size: i32) -> Result<()> {
        if (0..size).contains(&rank) {
            Ok(())
        } else {
            Err(Error::InvalidRank(rank))
        }
    }
}
