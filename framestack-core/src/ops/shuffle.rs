// framestack-core/src/ops/shuffle.rs

//! The tensor shuffle kernel behind frame stacking and unstacking.
//!
//! A buffer of `D * A * M * B * T` elements is read as a 5-axis tensor
//! `(D, A, M, B, T)` with `D` varying fastest, and written as `(D, B, M, A, T)`,
//! i.e. the axes `A` and `B` swap places.
//!
//! Stacking `K` consecutive frames of `S` interleaved sequences into one frame
//! `K` times taller is exactly such a swap with `A = S` and `B = K`:
//!
//! ```text
//!  input (D=2, S=2, K=3, T=2), sequences abcdef and uvwxyz:
//!    storage  aubvcw dxeyfz     -> (D, S, M, K, T)
//!             AUBVCW DXEYFZ
//!  output:
//!    storage  abcuvw defxyz     -> (D, K, M, S, T)
//!             ABCUVW DEFXYZ
//! ```
//!
//! Unstacking is the inverse swap with `A = K` and `B = S`.

use crate::error::FrameStackError;
use crate::types::Element;

/// The 5-axis decomposition `(D, S, M, K, T)` of a stacked/unstacked buffer.
///
/// `M` is a reserved singleton axis kept for generality of the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decomposition {
    /// Feature dimension (rows of the short frames).
    pub d: usize,
    /// Number of parallel sequences.
    pub s: usize,
    /// Reserved axis, always 1 for frame stacking.
    pub m: usize,
    /// Stacking factor.
    pub k: usize,
    /// Number of time steps on the reduced (stacked) timeline.
    pub t: usize,
}

impl Decomposition {
    /// Builds `(d, s, 1, k, t)`.
    ///
    /// # Arguments
    /// * `d` - Rows of a short frame.
    /// * `s` - Parallel sequences.
    /// * `k` - Frames stacked into one.
    /// * `t` - Time steps after stacking.
    pub fn new(d: usize, s: usize, k: usize, t: usize) -> Self {
        Decomposition { d, s, m: 1, k, t }
    }

    pub fn numel(&self) -> usize {
        self.d * self.s * self.m * self.k * self.t
    }

    pub(crate) fn check_len(&self, len: usize, operation: &str) -> Result<(), FrameStackError> {
        if self.numel() != len {
            return Err(FrameStackError::ShapeMismatch {
                expected: vec![self.d, self.s, self.m, self.k, self.t],
                actual: vec![len],
                operation: format!("{} (decomposition does not cover the buffer)", operation),
            });
        }
        Ok(())
    }
}

/// `dst = scale_dst * dst + scale_acc * shuffle(src)`, swapping axes `a` and `b`.
///
/// `src` is laid out as `(d, a, m, b, t)` and `dst` as `(d, b, m, a, t)`.
/// A `scale_dst` of zero overwrites the destination without reading it, so
/// stale values (including NaN) never leak into the result.
///
/// The decomposition is trusted: both slices must hold exactly
/// `d * a * m * b * t` elements. Source and destination are distinct borrows,
/// so overlapping views cannot be expressed.
///
/// # Arguments
/// * `scale_dst` - Factor applied to the existing destination; zero overwrites.
/// * `src` - Source elements in `(d, a, m, b, t)` order.
/// * `d`, `a`, `m`, `b`, `t` - Axis extents, `d` fastest.
/// * `scale_acc` - Factor applied to the shuffled source.
/// * `dst` - Destination elements in `(d, b, m, a, t)` order.
#[allow(clippy::too_many_arguments)]
pub fn tensor_shuffle_scale_and_add<T: Element>(
    scale_dst: T,
    src: &[T],
    d: usize,
    a: usize,
    m: usize,
    b: usize,
    t: usize,
    scale_acc: T,
    dst: &mut [T],
) {
    debug_assert_eq!(src.len(), d * a * m * b * t);
    debug_assert_eq!(dst.len(), src.len());

    let overwrite = scale_dst == T::zero();
    // Walk the source in storage order; each run of `d` elements is contiguous in both.
    let mut src_offset = 0;
    for it in 0..t {
        for ib in 0..b {
            for im in 0..m {
                for ia in 0..a {
                    let dst_offset = (((it * a + ia) * m + im) * b + ib) * d;
                    let from = &src[src_offset..src_offset + d];
                    let to = &mut dst[dst_offset..dst_offset + d];
                    if overwrite {
                        for (o, &i) in to.iter_mut().zip(from) {
                            *o = scale_acc * i;
                        }
                    } else {
                        for (o, &i) in to.iter_mut().zip(from) {
                            *o = scale_dst * *o + scale_acc * i;
                        }
                    }
                    src_offset += d;
                }
            }
        }
    }
}

/// Stacks: `(D, S, M, K, T)` -> `(D, K, M, S, T)`.
///
/// # Returns
/// `ShapeMismatch` if either slice does not hold exactly `dims.numel()` elements.
pub fn stack<T: Element>(
    src: &[T],
    dims: Decomposition,
    add_to: bool,
    dst: &mut [T],
) -> Result<(), FrameStackError> {
    dims.check_len(src.len(), "stack")?;
    dims.check_len(dst.len(), "stack")?;
    let scale_dst = if add_to { T::one() } else { T::zero() };
    tensor_shuffle_scale_and_add(scale_dst, src, dims.d, dims.s, dims.m, dims.k, dims.t, T::one(), dst);
    Ok(())
}

/// Unstacks: `(D, K, M, S, T)` -> `(D, S, M, K, T)`.
pub fn unstack<T: Element>(
    src: &[T],
    dims: Decomposition,
    add_to: bool,
    dst: &mut [T],
) -> Result<(), FrameStackError> {
    dims.check_len(src.len(), "unstack")?;
    dims.check_len(dst.len(), "unstack")?;
    let scale_dst = if add_to { T::one() } else { T::zero() };
    tensor_shuffle_scale_and_add(scale_dst, src, dims.d, dims.k, dims.m, dims.s, dims.t, T::one(), dst);
    Ok(())
}

#[cfg(test)]
#[path = "shuffle_test.rs"]
mod tests;
