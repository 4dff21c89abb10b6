// framestack-core/src/ops/row_repeat.rs

//! Duplicates the rows of a matrix a number of times.

use super::transform::{
    check_arity, check_input_index, columns_of, infer_standard_layout, log_validation, Arity, NodeShape, Operand,
    OperandMut, PassPlan, Transform,
};
use crate::error::FrameStackError;
use crate::image::with_height;
use crate::layout::AddressRange;
use crate::persist::{load_config, save_config};
use crate::types::Element;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

const OPERATION: &str = "RowRepeat";

/// How the forward pass produces its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPath {
    /// One repeat: the output is a plain copy of the input.
    Copy,
    /// Tile the input rows vertically.
    Tile(usize),
}

/// Tiles the rows of its single input `num_repeats` times vertically.
///
/// The gradient of every tile is summed back onto the input. Persisted as
/// `(num_repeats)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRepeat {
    num_repeats: usize,
}

impl RowRepeat {
    pub fn new(num_repeats: usize) -> Self {
        RowRepeat { num_repeats }
    }

    pub fn num_repeats(&self) -> usize {
        self.num_repeats
    }

    /// The forward strategy: a plain copy for a single repeat, tiling otherwise.
    pub fn path(&self) -> RepeatPath {
        if self.num_repeats == 1 {
            RepeatPath::Copy
        } else {
            RepeatPath::Tile(self.num_repeats)
        }
    }

    fn repeated_rows(&self, rows: usize) -> Result<usize, FrameStackError> {
        rows.checked_mul(self.num_repeats).ok_or_else(|| {
            FrameStackError::config(
                OPERATION,
                format!("{} rows repeated {} times overflows the row count", rows, self.num_repeats),
            )
        })
    }

    fn params(&self) -> String {
        format!("numRepeats={}", self.num_repeats)
    }

    /// Writes `(num_repeats)`.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), FrameStackError> {
        save_config(writer, self)
    }

    pub fn load<R: Read + ?Sized>(reader: &mut R) -> Result<Self, FrameStackError> {
        load_config(reader)
    }
}

impl Transform for RowRepeat {
    fn operation_name(&self) -> &'static str {
        OPERATION
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn validate(&mut self, inputs: &[NodeShape], _is_final_pass: bool) -> Result<NodeShape, FrameStackError> {
        log_validation(OPERATION, &self.params(), inputs);
        check_arity(OPERATION, self.arity(), inputs)?;
        if self.num_repeats == 0 {
            return Err(FrameStackError::config(OPERATION, "numRepeats must be positive"));
        }
        let input = inputs[0];
        let rows = self.repeated_rows(input.rows)?;
        let height = input.image.height.saturating_mul(self.num_repeats);
        Ok(NodeShape {
            rows,
            cols: input.cols,
            has_layout: input.has_layout,
            image: with_height(input.image, height, OPERATION, true),
        })
    }

    fn prepare_pass<T: Element>(&self, inputs: &[Operand<'_, T>]) -> Result<PassPlan, FrameStackError> {
        check_arity(OPERATION, self.arity(), inputs)?;
        Ok(PassPlan {
            rows: self.repeated_rows(inputs[0].matrix.rows())?,
            cols: inputs[0].matrix.cols(),
            layout: infer_standard_layout(OPERATION, inputs)?,
        })
    }

    fn evaluate<T: Element>(
        &self,
        range: &AddressRange<'_>,
        inputs: &[Operand<'_, T>],
        output: OperandMut<'_, T>,
    ) -> Result<(), FrameStackError> {
        check_arity(OPERATION, self.arity(), inputs)?;
        let input = inputs[0];
        let cols = columns_of(range, input.layout, input.matrix.cols())?;
        match self.path() {
            RepeatPath::Copy => output.matrix.set_value(input.matrix, cols),
            RepeatPath::Tile(n) => output.matrix.assign_repeat_of(input.matrix, n, cols),
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
        let cols = columns_of(range, input_gradient.layout, input_gradient.matrix.cols())?;
        input_gradient
            .matrix
            .add_to_row_repeat_of(output_gradient.matrix, self.num_repeats, cols)
    }
}

impl fmt::Display for RowRepeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", OPERATION, self.params())
    }
}

#[cfg(test)]
#[path = "row_repeat_test.rs"]
mod tests;
