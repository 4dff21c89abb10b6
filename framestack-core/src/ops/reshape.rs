// framestack-core/src/ops/reshape.rs

//! Reinterprets a buffer with a different row count.
//!
//! Without a batch layout this is a flat reinterpretation: a `rows x cols`
//! buffer becomes `num_rows x (cols * rows / num_rows)` with the column-major
//! element order unchanged.
//!
//! With a batch layout it adds or removes a nested time dimension:
//! - `num_rows > rows` stacks `K = num_rows / rows` consecutive frames of each
//!   sequence into one frame `K` times taller;
//! - `num_rows < rows` splits each frame into `K = rows / num_rows` consecutive
//!   frames.
//!
//! Parallel sequences are treated independently. Only the collapse of a
//! `K`-step sequence into a single frame (and its inverse) is supported.

use super::shuffle::{self, Decomposition};
use super::transform::{
    check_arity, check_input_index, log_validation, Arity, NodeShape, Operand, OperandMut, PassPlan, Transform,
};
use crate::error::FrameStackError;
use crate::image::ImageLayout;
use crate::layout::{AddressRange, BatchLayout};
use crate::matrix::Matrix;
use crate::persist::{load_config, save_config};
use crate::types::Element;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

const OPERATION: &str = "Reshape";

/// Stacks `k` consecutive frames into a single frame that is `k` times taller.
///
/// `from` holds `(D, S, M, K, T)` and `to` receives `(D, K, M, S, T)` where
/// `D = from.rows()`.
///
/// # Arguments
/// * `range` - Must select the whole minibatch.
/// * `layout` - Layout of the reduced timeline of `to`.
/// * `from` - Short frames, `D x (S * K * T)`.
/// * `to` - Tall frames, `(D * k) x (S * T)`.
/// * `k` - Number of frames stacked into one.
/// * `add_to` - Accumulate into `to` instead of overwriting it.
///
/// # Returns
/// `Ok(())`, or an error if the range is partial or the buffers do not match
/// the decomposition.
pub fn stack_frames<T: Element>(
    range: &AddressRange<'_>,
    layout: &BatchLayout,
    from: &Matrix<T>,
    to: &mut Matrix<T>,
    k: usize,
    add_to: bool,
) -> Result<(), FrameStackError> {
    let dims = frame_decomposition(range, layout, from.rows(), to, k, "stack_frames")?;
    check_same_len(from, to, "stack_frames")?;
    shuffle::stack(from.as_slice(), dims, add_to, to.as_mut_slice())
}

/// Splits frames of `D * k` rows into `k` consecutive frames of `D` rows.
///
/// The inverse of [`stack_frames`]: `layout` and `range` refer to the reduced
/// timeline of `from`, and `D = to.rows()`. Used for the forward pass of an
/// unstacking reshape and the backward pass of a stacking one.
pub fn unstack_frames<T: Element>(
    range: &AddressRange<'_>,
    layout: &BatchLayout,
    from: &Matrix<T>,
    to: &mut Matrix<T>,
    k: usize,
    add_to: bool,
) -> Result<(), FrameStackError> {
    let dims = frame_decomposition(range, layout, to.rows(), from, k, "unstack_frames")?;
    check_same_len(from, to, "unstack_frames")?;
    shuffle::unstack(from.as_slice(), dims, add_to, to.as_mut_slice())
}

// `reduced` is the tall buffer whose columns follow `layout`.
fn frame_decomposition<T: Element>(
    range: &AddressRange<'_>,
    layout: &BatchLayout,
    d: usize,
    reduced: &Matrix<T>,
    k: usize,
    operation: &str,
) -> Result<Decomposition, FrameStackError> {
    let cols = range.with_layout(layout).columns(reduced.cols())?;
    if cols != (0..reduced.cols()) {
        return Err(FrameStackError::misuse(
            operation,
            "frames can only be regrouped over the full minibatch",
        ));
    }
    if reduced.rows() != d * k {
        return Err(FrameStackError::ShapeMismatch {
            expected: vec![d * k, reduced.cols()],
            actual: reduced.shape().to_vec(),
            operation: operation.to_string(),
        });
    }
    Ok(Decomposition::new(
        d,
        layout.num_parallel_sequences(),
        k,
        layout.num_time_steps(),
    ))
}

fn check_same_len<T: Element>(a: &Matrix<T>, b: &Matrix<T>, operation: &str) -> Result<(), FrameStackError> {
    if a.len() != b.len() {
        return Err(FrameStackError::ShapeMismatch {
            expected: a.shape().to_vec(),
            actual: b.shape().to_vec(),
            operation: operation.to_string(),
        });
    }
    Ok(())
}

/// How the frames are regrouped for a given input row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regroup {
    /// Same row count, frames pass through.
    Identity,
    /// Remove a nested time dimension by stacking `k` frames.
    Stack(usize),
    /// Add a nested time dimension of `k` steps.
    Unstack(usize),
}

/// Changes the row count of its single input to `num_rows`.
///
/// Without a batch layout the columns absorb the difference. With one, the
/// factor between the row counts becomes a nested time dimension that is
/// stacked into or split out of each frame.
///
/// Persisted as `(num_rows, width, height, channels)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reshape {
    num_rows: usize,
    image_layout: ImageLayout,
}

impl Reshape {
    /// `image_layout` may leave dimensions at zero; two given dimensions are
    /// completed from `num_rows`, none means the image shape is not tracked.
    pub fn new(num_rows: usize, image_layout: ImageLayout) -> Self {
        Reshape { num_rows, image_layout }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn image_layout(&self) -> ImageLayout {
        self.image_layout
    }

    fn regroup(&self, rows: usize) -> Result<Regroup, FrameStackError> {
        let n = self.num_rows;
        if n == 0 || rows == 0 {
            return Err(FrameStackError::config(
                OPERATION,
                format!("row dimensions must be positive (output {}, input {})", n, rows),
            ));
        }
        if n > rows {
            if n % rows != 0 {
                return Err(not_multiple(n, rows));
            }
            Ok(Regroup::Stack(n / rows))
        } else if n < rows {
            if rows % n != 0 {
                return Err(not_multiple(n, rows));
            }
            Ok(Regroup::Unstack(rows / n))
        } else {
            Ok(Regroup::Identity)
        }
    }

    fn new_cols(&self, rows: usize, cols: usize) -> usize {
        cols * rows / self.num_rows
    }

    /// Derives the layout of the output timeline from the input's.
    ///
    /// # Arguments
    /// * `input_rows` - Row count of the input buffer.
    /// * `input_layout` - Layout of the input's columns.
    ///
    /// # Returns
    /// The output layout: `(S, 1)` when stacking, `(S, K)` with one sentence
    /// per sequence when unstacking, a copy of the input's otherwise. Stacking
    /// from more than `K` steps or unstacking from more than one step fails
    /// with `UnsupportedOperation`.
    pub fn derive_layout(&self, input_rows: usize, input_layout: &BatchLayout) -> Result<BatchLayout, FrameStackError> {
        let s = input_layout.num_parallel_sequences();
        let t = input_layout.num_time_steps();
        match self.regroup(input_rows)? {
            Regroup::Identity => Ok(input_layout.clone()),
            Regroup::Stack(k) => {
                if t != k {
                    return Err(FrameStackError::UnsupportedOperation(format!(
                        "{}: removing a nested time dimension only works when going back to a single frame per sequence ({} steps, factor {})",
                        OPERATION, t, k
                    )));
                }
                // Single-frame sequences carry no boundary information.
                Ok(BatchLayout::new(s, 1))
            }
            Regroup::Unstack(k) => {
                if t != 1 {
                    return Err(FrameStackError::UnsupportedOperation(format!(
                        "{}: adding a nested time dimension only works when coming from a single frame per sequence ({} steps)",
                        OPERATION, t
                    )));
                }
                let mut layout = BatchLayout::new(s, k);
                for seq in 0..s {
                    layout.set_as_sentence(seq, 0, k)?;
                }
                Ok(layout)
            }
        }
    }

    fn infer_image(&mut self, input: ImageLayout) -> Result<ImageLayout, FrameStackError> {
        self.image_layout = self.image_layout.infer_from_rows(self.num_rows, OPERATION)?;
        if self.image_layout.is_fully_specified() {
            return Ok(self.image_layout);
        }
        if input.is_image() {
            warn!(
                "{} operation cannot inherit image size information from its input ({}). Image size info is lost.",
                OPERATION, input
            );
        }
        Ok(ImageLayout::new(1, 1, self.num_rows))
    }

    fn params(&self) -> String {
        format!(
            "numRows={}, imageWidth={}, imageHeight={}, imageChannels={}",
            self.num_rows, self.image_layout.width, self.image_layout.height, self.image_layout.channels
        )
    }

    /// Writes `(num_rows, width, height, channels)` to `writer`.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), FrameStackError> {
        save_config(writer, self)
    }

    /// Reads a configuration written by [`save`](Self::save).
    pub fn load<R: Read + ?Sized>(reader: &mut R) -> Result<Self, FrameStackError> {
        load_config(reader)
    }
}

fn not_multiple(num_rows: usize, rows: usize) -> FrameStackError {
    FrameStackError::config(
        OPERATION,
        format!(
            "output row dimension {} is not an integer multiple or divisor of input dimension {}",
            num_rows, rows
        ),
    )
}

fn layouts<'a>(
    output: Option<&'a BatchLayout>,
    input: Option<&'a BatchLayout>,
) -> Result<Option<(&'a BatchLayout, &'a BatchLayout)>, FrameStackError> {
    match (output, input) {
        (None, None) => Ok(None),
        (Some(o), Some(i)) => Ok(Some((o, i))),
        _ => Err(FrameStackError::LayoutMismatch {
            operation: OPERATION.to_string(),
            message: "layout presence must be the same on input and output".to_string(),
        }),
    }
}

impl Transform for Reshape {
    fn operation_name(&self) -> &'static str {
        OPERATION
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn validate(&mut self, inputs: &[NodeShape], is_final_pass: bool) -> Result<NodeShape, FrameStackError> {
        log_validation(OPERATION, &self.params(), inputs);
        check_arity(OPERATION, self.arity(), inputs)?;
        let input = inputs[0];
        if self.num_rows == 0 {
            return Err(FrameStackError::config(OPERATION, "output row dimension must be positive"));
        }

        // Columns may still be provisional before the final pass (e.g. 1 or 3),
        // so the integer-multiple conditions are only enforced there.
        let new_cols = self.new_cols(input.rows, input.cols);
        if is_final_pass {
            self.regroup(input.rows)?;
            // With a layout the current column count may be bogus.
            if !input.has_layout && input.rows * input.cols != self.num_rows * new_cols {
                return Err(FrameStackError::InternalError(format!(
                    "{} operation: unexpected dimension mismatch ({} x {} cannot be reinterpreted with {} rows)",
                    OPERATION, input.rows, input.cols, self.num_rows
                )));
            }
        }

        let image = self.infer_image(input.image)?;
        Ok(NodeShape {
            rows: self.num_rows,
            cols: new_cols,
            has_layout: input.has_layout,
            image,
        })
    }

    fn prepare_pass<T: Element>(&self, inputs: &[Operand<'_, T>]) -> Result<PassPlan, FrameStackError> {
        check_arity(OPERATION, self.arity(), inputs)?;
        let input = inputs[0];
        let (rows, cols) = (input.matrix.rows(), input.matrix.cols());
        self.regroup(rows)?;
        let new_cols = self.new_cols(rows, cols);
        let layout = match input.layout {
            None => {
                if rows * cols != self.num_rows * new_cols {
                    return Err(FrameStackError::ShapeMismatch {
                        expected: vec![self.num_rows, new_cols],
                        actual: vec![rows, cols],
                        operation: OPERATION.to_string(),
                    });
                }
                None
            }
            Some(in_layout) => {
                if in_layout.num_cols() != cols {
                    return Err(FrameStackError::ShapeMismatch {
                        expected: vec![in_layout.num_cols()],
                        actual: vec![cols],
                        operation: format!("{} (input columns vs. batch layout)", OPERATION),
                    });
                }
                Some(self.derive_layout(rows, in_layout)?)
            }
        };
        debug!("{}: pass plan {} x {} -> {} x {}", OPERATION, rows, cols, self.num_rows, new_cols);
        Ok(PassPlan { rows: self.num_rows, cols: new_cols, layout })
    }

    fn evaluate<T: Element>(
        &self,
        range: &AddressRange<'_>,
        inputs: &[Operand<'_, T>],
        output: OperandMut<'_, T>,
    ) -> Result<(), FrameStackError> {
        check_arity(OPERATION, self.arity(), inputs)?;
        let input = inputs[0];
        let rows = input.matrix.rows();
        let new_cols = self.new_cols(rows, input.matrix.cols());
        output.matrix.verify_size(self.num_rows, new_cols, OPERATION)?;
        check_same_len(input.matrix, output.matrix, OPERATION)?;

        match layouts(output.layout, input.layout)? {
            // Just a reshape: copy the values as one long vector.
            None => {
                output.matrix.as_mut_slice().copy_from_slice(input.matrix.as_slice());
                Ok(())
            }
            Some((out_layout, in_layout)) => {
                if !range.is_all_frames() {
                    return Err(FrameStackError::misuse(
                        OPERATION,
                        "cannot be run from inside a loop since it changes the time base",
                    ));
                }
                match self.regroup(rows)? {
                    Regroup::Identity => {
                        output.matrix.as_mut_slice().copy_from_slice(input.matrix.as_slice());
                        Ok(())
                    }
                    Regroup::Stack(k) => stack_frames(
                        &range.with_layout(out_layout),
                        out_layout,
                        input.matrix,
                        output.matrix,
                        k,
                        false,
                    ),
                    Regroup::Unstack(k) => unstack_frames(
                        &range.with_layout(in_layout),
                        in_layout,
                        input.matrix,
                        output.matrix,
                        k,
                        false,
                    ),
                }
            }
        }
    }

    fn backpropagate<T: Element>(
        &self,
        input_index: usize,
        range: &AddressRange<'_>,
        output_gradient: Operand<'_, T>,
        input_gradient: OperandMut<'_, T>,
    ) -> Result<(), FrameStackError> {
        check_input_index(OPERATION, input_index, 1)?;
        let rows = input_gradient.matrix.rows();
        check_same_len(output_gradient.matrix, input_gradient.matrix, OPERATION)?;

        match layouts(output_gradient.layout, input_gradient.layout)? {
            None => {
                input_gradient
                    .matrix
                    .as_mut_slice()
                    .iter_mut()
                    .zip(output_gradient.matrix.as_slice())
                    .for_each(|(g, &o)| *g += o);
                Ok(())
            }
            Some((out_layout, in_layout)) => match self.regroup(rows)? {
                Regroup::Identity => {
                    let cols = 0..input_gradient.matrix.cols();
                    input_gradient.matrix.add_assign_from(output_gradient.matrix, cols)
                }
                Regroup::Stack(k) => unstack_frames(
                    &range.with_layout(out_layout),
                    out_layout,
                    output_gradient.matrix,
                    input_gradient.matrix,
                    k,
                    true,
                ),
                Regroup::Unstack(k) => stack_frames(
                    &range.with_layout(in_layout),
                    in_layout,
                    output_gradient.matrix,
                    input_gradient.matrix,
                    k,
                    true,
                ),
            },
        }
    }
}

impl fmt::Display for Reshape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", OPERATION, self.params())
    }
}

#[cfg(test)]
#[path = "reshape_test.rs"]
mod tests;
