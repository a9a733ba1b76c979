//! Typed channel: fixed-shape `f64` messages tagged by kind.
//!
//! Each [`MessageKind`] has a tag and an expected element count. A receive
//! that finds a message of a different length does not fail: it takes the
//! whole payload and collapses it to its arithmetic mean, reported as
//! [`Received::Averaged`] so callers can tell the degraded path apart.

use crate::comm::Communicator;
use crate::error::{Error, Result};
use log::{debug, warn};

/// Kinds of typed message, each with its own tag and shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Plane coefficients `(a, b, c)`.
    Coefficients,
    /// Point coordinates `(x, y, z)`.
    Variables,
    /// A single scalar, such as a plane offset or a computed distance.
    Constant,
}

impl MessageKind {
    /// Tag used on the wire.
    pub fn tag(self) -> i32 {
        match self {
            MessageKind::Coefficients => 1,
            MessageKind::Variables => 2,
            MessageKind::Constant => 3,
        }
    }

    /// Number of elements a well-formed message of this kind carries.
    pub fn expected_count(self) -> usize {
        match self {
            MessageKind::Coefficients | MessageKind::Variables => 3,
            MessageKind::Constant => 1,
        }
    }
}

/// Outcome of a typed receive.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    /// The message had the expected shape.
    Exact(Vec<f64>),
    /// The message had `count` elements instead of the expected number and
    /// was collapsed to their mean.
    Averaged {
        /// Mean of every received element.
        value: f64,
        /// Number of elements actually received.
        count: usize,
    },
}

impl Received {
    /// The usable values: the payload itself, or the single mean.
    pub fn into_values(self) -> Vec<f64> {
        match self {
            Received::Exact(values) => values,
            Received::Averaged { value, .. } => vec![value],
        }
    }

    /// Whether the averaging fallback was taken.
    pub fn is_averaged(&self) -> bool {
        matches!(self, Received::Averaged { .. })
    }
}

impl Communicator {
    /// Send `values` to `dest` tagged with `kind`.
    ///
    /// `values` must hold exactly `kind.expected_count()` elements.
    pub fn send_kind(&self, kind: MessageKind, dest: i32, values: &[f64]) -> Result<()> {
        if values.len() != kind.expected_count() {
            return Err(Error::InvalidCount(values.len() as i64));
        }
        debug!(
            "rank {}: send {kind:?} {values:?} to {dest}",
            self.rank()
        );
        self.send(values, dest, kind.tag())
    }

    /// Receive the next `kind` message from `source`.
    ///
    /// A payload whose length differs from `kind.expected_count()` is
    /// received in full and returned as its mean.
    pub fn receive_kind(&self, kind: MessageKind, source: i32) -> Result<Received> {
        let status = self.probe::<f64>(source, kind.tag())?;
        let (values, _) = self.recv_vec::<f64>(source, kind.tag())?;
        if status.count == kind.expected_count() {
            debug!(
                "rank {}: received {kind:?} {values:?} from {source}",
                self.rank()
            );
            return Ok(Received::Exact(values));
        }

        let count = values.len();
        let value = if count == 0 {
            // Mean of nothing; an empty payload carries no value.
            f64::NAN
        } else {
            values.iter().sum::<f64>() / count as f64
        };
        warn!(
            "rank {}: received {count} {kind:?} values from {source}, expected {}, taking mean {value}",
            self.rank(),
            kind.expected_count()
        );
        Ok(Received::Averaged { value, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Universe;

    #[test]
    fn kinds_have_distinct_tags() {
        let kinds = [
            MessageKind::Coefficients,
            MessageKind::Variables,
            MessageKind::Constant,
        ];
        let tags: std::collections::HashSet<_> = kinds.iter().map(|k| k.tag()).collect();
        assert_eq!(tags.len(), 3);
        assert!(kinds.iter().all(|k| k.tag() >= 0));
    }

    #[test]
    fn expected_counts() {
        assert_eq!(MessageKind::Coefficients.expected_count(), 3);
        assert_eq!(MessageKind::Variables.expected_count(), 3);
        assert_eq!(MessageKind::Constant.expected_count(), 1);
    }

    #[test]
    fn exact_receive() {
        let out = Universe::new(2)
            .unwrap()
            .run(|world| {
                if world.rank() == 0 {
                    world.send_kind(MessageKind::Variables, 1, &[1.0, 2.0, 3.0])?;
                    Ok(None)
                } else {
                    Ok(Some(world.receive_kind(MessageKind::Variables, 0)?))
                }
            })
            .unwrap();
        assert_eq!(out[1], Some(Received::Exact(vec![1.0, 2.0, 3.0])));
    }

    #[test]
    fn oversized_constant_is_averaged() {
        let out = Universe::new(2)
            .unwrap()
            .run(|world| {
                if world.rank() == 0 {
                    world.send(&[1.0f64, 2.0, 3.0, 4.0, 10.0], 1, MessageKind::Constant.tag())?;
                    Ok(None)
                } else {
                    Ok(Some(world.receive_kind(MessageKind::Constant, 0)?))
                }
            })
            .unwrap();
        let received = out[1].clone().unwrap();
        assert!(received.is_averaged());
        assert_eq!(
            received,
            Received::Averaged {
                value: 4.0,
                count: 5
            }
        );
        assert_eq!(received.into_values(), vec![4.0]);
    }

    #[test]
    fn short_coefficients_are_averaged() {
        let out = Universe::new(2)
            .unwrap()
            .run(|world| {
                if world.rank() == 1 {
                    world.send(&[2.0f64, 6.0], 0, MessageKind::Coefficients.tag())?;
                    Ok(None)
                } else {
                    Ok(Some(world.receive_kind(MessageKind::Coefficients, 1)?))
                }
            })
            .unwrap();
        assert_eq!(
            out[0],
            Some(Received::Averaged {
                value: 4.0,
                count: 2
            })
        );
    }

    #[test]
    fn typed_send_checks_shape() {
        let out = Universe::new(1).unwrap().run(|world| {
            world.send_kind(MessageKind::Constant, 0, &[1.0, 2.0])
        });
        assert!(matches!(out, Err(Error::InvalidCount(2))));
    }

    #[test]
    fn kinds_do_not_cross() {
        let out = Universe::new(2)
            .unwrap()
            .run(|world| {
                if world.rank() == 0 {
                    world.send_kind(MessageKind::Coefficients, 1, &[1.0, 2.0, 3.0])?;
                    world.send_kind(MessageKind::Constant, 1, &[10.0])?;
                    Ok(vec![])
                } else {
                    // Receive in the opposite order from the sends.
                    let d = world.receive_kind(MessageKind::Constant, 0)?;
                    let a = world.receive_kind(MessageKind::Coefficients, 0)?;
                    let mut values = d.into_values();
                    values.extend(a.into_values());
                    Ok(values)
                }
            })
            .unwrap();
        assert_eq!(out[1], vec![10.0, 1.0, 2.0, 3.0]);
    }
}
