//! Message status information.
//!
//! This module provides the [`Status`] struct returned by probe and receive
//! operations, containing metadata about a message.

/// Information about a probed or received message.
///
/// Returned by [`Communicator::probe`](crate::Communicator::probe) to describe
/// an incoming message without consuming it, and by
/// [`Communicator::recv`](crate::Communicator::recv) once it has been consumed.
///
/// # Example
///
/// ```
/// use ferrocomm::Universe;
///
/// Universe::new(2)
///     .unwrap()
///     .run(|world| {
///         if world.rank() == 0 {
///             world.send(&[1.0f64, 2.0], 1, 7)?;
///         } else {
///             let status = world.probe::<f64>(0, 7)?;
///             assert_eq!((status.source, status.tag, status.count), (0, 7, 2));
///         }
///         Ok(())
///     })
///     .unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Source rank of the message.
    pub source: i32,
    /// Tag of the message.
    pub tag: i32,
    /// Number of elements in the message.
    pub count: usize,
}
