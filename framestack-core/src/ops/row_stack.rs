// framestack-core/src/ops/row_stack.rs

//! Stacks a variable number of inputs on top of each other.

use super::transform::{
    check_arity, check_input_index, columns_of, infer_standard_layout, log_validation, Arity, NodeShape, Operand,
    OperandMut, PassPlan, Transform,
};
use crate::error::FrameStackError;
use crate::image::with_height;
use crate::layout::AddressRange;
use crate::types::Element;
use std::fmt;

const OPERATION: &str = "RowStack";

/// Holds no configuration of its own; the row offsets are recomputed from the
/// input shapes on every validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowStack {
    /// Start row of each input in the stacked output (cumulative sum of heights).
    start_row_indices: Vec<usize>,
}

impl RowStack {
    /// Creates a row stack. Offsets are filled in by the first validation.
    pub fn new() -> Self {
        RowStack::default()
    }

    /// Start row of each input as computed by the last validation.
    pub fn start_row_indices(&self) -> &[usize] {
        &self.start_row_indices
    }

    /// Checks that the offsets cached by validation still describe inputs of
    /// the given heights.
    fn check_offsets<I>(&self, heights: I) -> Result<(), FrameStackError>
    where
        I: ExactSizeIterator<Item = usize>,
    {
        if self.start_row_indices.len() != heights.len() {
            return Err(FrameStackError::misuse(
                OPERATION,
                format!(
                    "validated for {} inputs, called with {}",
                    self.start_row_indices.len(),
                    heights.len()
                ),
            ));
        }
        let mut expected = 0;
        for (i, (height, &start)) in heights.zip(&self.start_row_indices).enumerate() {
            if start != expected {
                return Err(FrameStackError::ShapeMismatch {
                    expected: vec![expected],
                    actual: vec![start],
                    operation: format!("{} (start row of input {} no longer matches the input heights)", OPERATION, i),
                });
            }
            expected += height;
        }
        Ok(())
    }

    fn offset_of(&self, input_index: usize) -> Result<usize, FrameStackError> {
        self.start_row_indices.get(input_index).copied().ok_or_else(|| {
            FrameStackError::misuse(
                OPERATION,
                format!("input {} has no row offset; validate the node first", input_index),
            )
        })
    }
}

impl Transform for RowStack {
    fn operation_name(&self) -> &'static str {
        OPERATION
    }

    fn arity(&self) -> Arity {
        Arity::Variable
    }

    fn validate(&mut self, inputs: &[NodeShape], is_final_pass: bool) -> Result<NodeShape, FrameStackError> {
        log_validation(OPERATION, "", inputs);
        check_arity(OPERATION, self.arity(), inputs)?;
        let num_cols = inputs[0].cols;

        let mut offsets = Vec::with_capacity(inputs.len());
        let mut total_rows = 0;
        for (i, input) in inputs.iter().enumerate() {
            if is_final_pass && input.cols != num_cols {
                return Err(FrameStackError::ColumnMismatch {
                    operation: OPERATION.to_string(),
                    input_index: i,
                    expected: num_cols,
                    actual: input.cols,
                });
            }
            offsets.push(total_rows);
            total_rows += input.rows;
        }
        self.start_row_indices = offsets;

        Ok(NodeShape {
            rows: total_rows,
            cols: num_cols,
            has_layout: inputs.iter().any(|s| s.has_layout),
            image: with_height(inputs[0].image, total_rows, OPERATION, true),
        })
    }

    fn prepare_pass<T: Element>(&self, inputs: &[Operand<'_, T>]) -> Result<PassPlan, FrameStackError> {
        check_arity(OPERATION, self.arity(), inputs)?;
        self.check_offsets(inputs.iter().map(|op| op.matrix.rows()))?;
        let num_cols = inputs[0].matrix.cols();
        for (i, input) in inputs.iter().enumerate() {
            if input.matrix.cols() != num_cols {
                return Err(FrameStackError::ColumnMismatch {
                    operation: OPERATION.to_string(),
                    input_index: i,
                    expected: num_cols,
                    actual: input.matrix.cols(),
                });
            }
        }
        Ok(PassPlan {
            rows: inputs.iter().map(|op| op.matrix.rows()).sum(),
            cols: num_cols,
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
        self.check_offsets(inputs.iter().map(|op| op.matrix.rows()))?;
        let total: usize = inputs.iter().map(|op| op.matrix.rows()).sum();
        if total != output.matrix.rows() {
            return Err(FrameStackError::ShapeMismatch {
                expected: vec![total],
                actual: vec![output.matrix.rows()],
                operation: format!("{} (output rows)", OPERATION),
            });
        }
        let cols = columns_of(range, output.layout, output.matrix.cols())?;
        for (i, input) in inputs.iter().enumerate() {
            let start = self.offset_of(i)?;
            output
                .matrix
                .assign_to_row_slice_of(input.matrix, start, input.matrix.rows(), cols.clone())?;
        }
        Ok(())
    }

    fn backpropagate<T: Element>(
        &self,
        input_index: usize,
        range: &AddressRange<'_>,
        output_gradient: Operand<'_, T>,
        input_gradient: OperandMut<'_, T>,
    ) -> Result<(), FrameStackError> {
        check_input_index(OPERATION, input_index, self.start_row_indices.len())?;
        let start = self.offset_of(input_index)?;
        let rows = input_gradient.matrix.rows();
        let end = self
            .start_row_indices
            .get(input_index + 1)
            .copied()
            .unwrap_or(output_gradient.matrix.rows());
        if end.checked_sub(start) != Some(rows) {
            return Err(FrameStackError::ShapeMismatch {
                expected: vec![end.saturating_sub(start)],
                actual: vec![rows],
                operation: format!("{} (gradient band of input {})", OPERATION, input_index),
            });
        }
        let cols = columns_of(range, input_gradient.layout, input_gradient.matrix.cols())?;
        input_gradient
            .matrix
            .add_with_row_slice_of(output_gradient.matrix, start, rows, cols)
    }
}

impl fmt::Display for RowStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}()", OPERATION)
    }
}

#[cfg(test)]
#[path = "row_stack_test.rs"]
mod tests;
