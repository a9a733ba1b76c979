//! Element datatype trait and type tag mapping.
//!
//! This module provides the [`Datatype`] trait, a sealed trait that maps Rust
//! primitive types to the tags carried by every message envelope, and the
//! element-wise combination used by reductions.
//!
//! # Supported Types
//!
//! | Rust Type | Tag Value |
//! |-----------|-----------|
//! | `f32`     | 0         |
//! | `f64`     | 1         |
//! | `i32`     | 2         |
//! | `i64`     | 3         |
//! | `u8`      | 4         |
//! | `u32`     | 5         |
//! | `u64`     | 6         |

use crate::ReduceOp;

/// Internal module to seal the trait — prevents external implementations.
mod sealed {
    pub trait Sealed {}
}

/// Tag recorded in each envelope so a receiver can reject payloads of the
/// wrong element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DatatypeTag {
    /// 32-bit floating point
    F32 = 0,
    /// 64-bit floating point
    F64 = 1,
    /// 32-bit signed integer
    I32 = 2,
    /// 64-bit signed integer
    I64 = 3,
    /// 8-bit unsigned integer
    U8 = 4,
    /// 32-bit unsigned integer
    U32 = 5,
    /// 64-bit unsigned integer
    U64 = 6,
}

/// Trait for types that can travel between workers.
///
/// This is a **sealed trait** — it cannot be implemented outside this crate.
/// Supported types: [`f32`], [`f64`], [`i32`], [`i64`], [`u8`], [`u32`], [`u64`].
///
/// # Example
///
/// ```
/// use ferrocomm::Universe;
///
/// let universe = Universe::new(2).unwrap();
/// universe
///     .run(|world| {
///         let mut data_f64 = vec![1.0f64; 10];
///         world.broadcast(&mut data_f64, 0)?;
///
///         let mut data_i32 = vec![42i32; 10];
///         world.broadcast(&mut data_i32, 0)
///     })
///     .unwrap();
/// ```
pub trait Datatype: sealed::Sealed + Copy + Send + Sync + std::fmt::Debug + 'static {
    /// The tag recorded in message envelopes.
    const TAG: DatatypeTag;

    /// Combine two values under a reduction operation.
    fn combine(self, other: Self, op: ReduceOp) -> Self;

    /// Widen to `f64`, used for statistics over received values.
    fn as_f64(self) -> f64;
}

macro_rules! impl_float_datatype {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl Datatype for $ty {
            const TAG: DatatypeTag = $tag;

            fn combine(self, other: Self, op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Sum => self + other,
                    ReduceOp::Prod => self * other,
                    ReduceOp::Max => self.max(other),
                    ReduceOp::Min => self.min(other),
                }
            }

            fn as_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

macro_rules! impl_int_datatype {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl Datatype for $ty {
            const TAG: DatatypeTag = $tag;

            fn combine(self, other: Self, op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Sum => self.wrapping_add(other),
                    ReduceOp::Prod => self.wrapping_mul(other),
                    ReduceOp::Max => self.max(other),
                    ReduceOp::Min => self.min(other),
                }
            }

            fn as_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_float_datatype!(f32, DatatypeTag::F32);
impl_float_datatype!(f64, DatatypeTag::F64);
impl_int_datatype!(i32, DatatypeTag::I32);
impl_int_datatype!(i64, DatatypeTag::I64);
impl_int_datatype!(u8, DatatypeTag::U8);
impl_int_datatype!(u32, DatatypeTag::U32);
impl_int_datatype!(u64, DatatypeTag::U64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datatype_tag_values_are_sequential() {
        let tags = [
            DatatypeTag::F32,
            DatatypeTag::F64,
            DatatypeTag::I32,
            DatatypeTag::I64,
            DatatypeTag::U8,
            DatatypeTag::U32,
            DatatypeTag::U64,
        ];
        for (i, tag) in tags.iter().enumerate() {
            assert_eq!(*tag as i32, i as i32, "Tag {tag:?} should have value {i}");
        }
    }

    #[test]
    fn type_tags() {
        assert_eq!(f32::TAG, DatatypeTag::F32);
        assert_eq!(f64::TAG, DatatypeTag::F64);
        assert_eq!(i32::TAG, DatatypeTag::I32);
        assert_eq!(i64::TAG, DatatypeTag::I64);
        assert_eq!(u8::TAG, DatatypeTag::U8);
        assert_eq!(u32::TAG, DatatypeTag::U32);
        assert_eq!(u64::TAG, DatatypeTag::U64);
    }

    #[test]
    fn float_combine() {
        assert_eq!(1.5f64.combine(2.0, ReduceOp::Sum), 3.5);
        assert_eq!(1.5f64.combine(2.0, ReduceOp::Prod), 3.0);
        assert_eq!(1.5f64.combine(2.0, ReduceOp::Max), 2.0);
        assert_eq!(1.5f64.combine(2.0, ReduceOp::Min), 1.5);
    }

    #[test]
    fn int_combine() {
        assert_eq!(3i32.combine(-4, ReduceOp::Sum), -1);
        assert_eq!(3i32.combine(-4, ReduceOp::Prod), -12);
        assert_eq!(3i32.combine(-4, ReduceOp::Max), 3);
        assert_eq!(3i32.combine(-4, ReduceOp::Min), -4);
        assert_eq!(u8::MAX.combine(1, ReduceOp::Sum), 0);
    }

    #[test]
    fn widening() {
        assert_eq!(7u8.as_f64(), 7.0);
        assert_eq!((-2i64).as_f64(), -2.0);
        assert_eq!(0.25f32.as_f64(), 0.25);
    }
}
