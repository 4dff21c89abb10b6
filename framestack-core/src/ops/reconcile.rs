// framestack-core/src/ops/reconcile.rs

//! Passes data through while adopting the batch layout of a second input.
//!
//! Used after a branch that rebuilt an identical layout object: downstream
//! nodes see the layout of `inputs[1]`, and evaluation checks that the values
//! really are the same.

use super::transform::{
    check_arity, check_input_index, log_validation, Arity, NodeShape, Operand, OperandMut, PassPlan, Transform,
};
use crate::error::FrameStackError;
use crate::layout::AddressRange;
use crate::types::Element;
use std::fmt;

const OPERATION: &str = "ReconcileLayout";

/// Two inputs: `(data, layout_source)`. Carries no configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileLayout;

impl ReconcileLayout {
    pub fn new() -> Self {
        ReconcileLayout
    }
}

impl Transform for ReconcileLayout {
    fn operation_name(&self) -> &'static str {
        OPERATION
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn validate(&mut self, inputs: &[NodeShape], is_final_pass: bool) -> Result<NodeShape, FrameStackError> {
        log_validation(OPERATION, "", inputs);
        check_arity(OPERATION, self.arity(), inputs)?;
        if is_final_pass && !(inputs[0].has_layout && inputs[1].has_layout) {
            return Err(FrameStackError::config(OPERATION, "both inputs must have a batch layout"));
        }
        Ok(NodeShape { has_layout: true, ..inputs[0] })
    }

    fn prepare_pass<T: Element>(&self, inputs: &[Operand<'_, T>]) -> Result<PassPlan, FrameStackError> {
        check_arity(OPERATION, self.arity(), inputs)?;
        Ok(PassPlan {
            rows: inputs[0].matrix.rows(),
            cols: inputs[0].matrix.cols(),
            layout: inputs[1].layout.cloned(),
        })
    }

    fn evaluate<T: Element>(
        &self,
        range: &AddressRange<'_>,
        inputs: &[Operand<'_, T>],
        output: OperandMut<'_, T>,
    ) -> Result<(), FrameStackError> {
        check_arity(OPERATION, self.arity(), inputs)?;
        let (data, source) = (inputs[0], inputs[1]);
        if data.layout != source.layout {
            return Err(FrameStackError::LayoutMismatch {
                operation: OPERATION.to_string(),
                message: "the data input's batch layout differs from the layout source".to_string(),
            });
        }
        let cols = range.with_optional_layout(data.layout).columns(data.matrix.cols())?;
        output.matrix.set_value(data.matrix, cols)
    }

    fn backpropagate<T: Element>(
        &self,
        input_index: usize,
        range: &AddressRange<'_>,
        output_gradient: Operand<'_, T>,
        input_gradient: OperandMut<'_, T>,
    ) -> Result<(), FrameStackError> {
        check_input_index(OPERATION, input_index, 2)?;
        if input_index == 1 {
            // The layout source does not contribute values.
            return Ok(());
        }
        let cols = range
            .with_optional_layout(input_gradient.layout)
            .columns(input_gradient.matrix.cols())?;
        input_gradient.matrix.add_assign_from(output_gradient.matrix, cols)
    }
}

impl fmt::Display for ReconcileLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}()", OPERATION)
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
