// framestack-core/src/ops/row_slice.rs

//! Extracts a contiguous band of rows. Every column is one sample, so only
//! whole row ranges can be taken.

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

const OPERATION: &str = "RowSlice";

/// Selects rows `[start_index, start_index + num_rows)` of its single input.
///
/// Persisted as `(start_index, num_rows)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSlice {
    start_index: usize,
    num_rows: usize,
}

impl RowSlice {
    /// Creates a slice transform.
    ///
    /// # Arguments
    /// * `start_index` - First input row to copy.
    /// * `num_rows` - Number of rows in the output.
    ///
    /// Bounds are only checked against the input shape on the final validation pass.
    pub fn new(start_index: usize, num_rows: usize) -> Self {
        RowSlice { start_index, num_rows }
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn params(&self) -> String {
        format!("startIndex={}, numRows={}", self.start_index, self.num_rows)
    }

    /// Writes `(start_index, num_rows)`.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), FrameStackError> {
        save_config(writer, self)
    }

    pub fn load<R: Read + ?Sized>(reader: &mut R) -> Result<Self, FrameStackError> {
        load_config(reader)
    }
}

impl Transform for RowSlice {
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
        let end = self.start_index.checked_add(self.num_rows);
        if is_final_pass && end.map_or(true, |end| end > input.rows) {
            return Err(FrameStackError::config(
                OPERATION,
                format!(
                    "startIndex {} + numRows {} exceeds number of rows {} in the input",
                    self.start_index, self.num_rows, input.rows
                ),
            ));
        }
        Ok(NodeShape {
            rows: self.num_rows,
            cols: input.cols,
            has_layout: input.has_layout,
            // The height is recomputed on purpose, so no warning.
            image: with_height(input.image, self.num_rows, OPERATION, false),
        })
    }

    fn prepare_pass<T: Element>(&self, inputs: &[Operand<'_, T>]) -> Result<PassPlan, FrameStackError> {
        check_arity(OPERATION, self.arity(), inputs)?;
        Ok(PassPlan {
            rows: self.num_rows,
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
        output
            .matrix
            .assign_row_slice_of(input.matrix, self.start_index, self.num_rows, cols)
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
            .add_to_row_slice_of(output_gradient.matrix, self.start_index, self.num_rows, cols)
    }
}

impl fmt::Display for RowSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", OPERATION, self.params())
    }
}

#[cfg(test)]
#[path = "row_slice_test.rs"]
mod tests;
