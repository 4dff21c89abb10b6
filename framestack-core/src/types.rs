use approx::RelativeEq;
use num_traits::{Float, NumAssignOps};
use std::fmt::Debug;

/// A trait representing the element types a [`Matrix`](crate::Matrix) can hold.
///
/// Strictly reserved to floating point types (`f32`, `f64`): every transform
/// accumulates gradients, which needs addition and scaling.
pub trait Element:
    Float // Includes Num + Copy + Bounded + Signed + etc.
    + NumAssignOps
    + RelativeEq<Epsilon = Self>
    + Debug
    + Default
    + Send
    + Sync
    + 'static
{
}

impl Element for f32 {}
impl Element for f64 {}
