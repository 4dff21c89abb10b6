// framestack-core/src/ops/transform.rs

use crate::error::FrameStackError;
use crate::image::ImageLayout;
use crate::layout::{AddressRange, BatchLayout};
use crate::matrix::Matrix;
use crate::types::Element;
use std::fmt;
use std::ops::Range;

/// Static shape of a node as seen by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeShape {
    pub rows: usize,
    pub cols: usize,
    /// Whether the node's columns carry a batch layout.
    pub has_layout: bool,
    pub image: ImageLayout,
}

impl NodeShape {
    /// A plain matrix shape without sequence structure.
    pub fn new(rows: usize, cols: usize) -> Self {
        NodeShape {
            rows,
            cols,
            has_layout: false,
            image: ImageLayout::column(rows),
        }
    }

    /// A minibatch shape whose columns follow a batch layout.
    pub fn minibatch(rows: usize, cols: usize) -> Self {
        NodeShape { has_layout: true, ..NodeShape::new(rows, cols) }
    }

    pub fn with_image(self, image: ImageLayout) -> Self {
        NodeShape { image, ..self }
    }
}

impl fmt::Display for NodeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.rows, self.cols)
    }
}

/// A read-only buffer together with the layout its columns follow.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a, T> {
    pub matrix: &'a Matrix<T>,
    pub layout: Option<&'a BatchLayout>,
}

impl<'a, T> Operand<'a, T> {
    pub fn new(matrix: &'a Matrix<T>, layout: Option<&'a BatchLayout>) -> Self {
        Operand { matrix, layout }
    }
}

/// A writable buffer together with the layout its columns follow.
#[derive(Debug)]
pub struct OperandMut<'a, T> {
    pub matrix: &'a mut Matrix<T>,
    pub layout: Option<&'a BatchLayout>,
}

impl<'a, T> OperandMut<'a, T> {
    pub fn new(matrix: &'a mut Matrix<T>, layout: Option<&'a BatchLayout>) -> Self {
        OperandMut { matrix, layout }
    }
}

/// Output size and layout of a node for the current minibatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassPlan {
    pub rows: usize,
    pub cols: usize,
    pub layout: Option<BatchLayout>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variable,
}

/// The capability every transform offers to the graph driver.
///
/// The driver calls `validate` whenever input shapes may have changed,
/// `prepare_pass` once per minibatch (then sizes the output buffer from the
/// plan), `evaluate` once per forward pass and `backpropagate` once per input
/// per backward pass. Every buffer and layout is passed in explicitly.
pub trait Transform {
    /// Name used in logs and error messages, e.g. `"RowSlice"`.
    fn operation_name(&self) -> &'static str;

    /// Number of inputs the transform accepts.
    fn arity(&self) -> Arity;

    /// Checks the input shapes and returns the output shape. Hard errors for
    /// shapes that may still be provisional are only raised on the final pass.
    fn validate(&mut self, inputs: &[NodeShape], is_final_pass: bool) -> Result<NodeShape, FrameStackError>;

    /// Computes the output size and batch layout for the current minibatch.
    ///
    /// # Arguments
    /// * `inputs` - The input buffers with their layouts.
    ///
    /// # Returns
    /// The plan the driver sizes the output buffer from, or an error if the
    /// buffers no longer agree with the validated shapes.
    fn prepare_pass<T: Element>(&self, inputs: &[Operand<'_, T>]) -> Result<PassPlan, FrameStackError>;

    /// Writes the output for the columns selected by `range`.
    fn evaluate<T: Element>(
        &self,
        range: &AddressRange<'_>,
        inputs: &[Operand<'_, T>],
        output: OperandMut<'_, T>,
    ) -> Result<(), FrameStackError>;

    /// Accumulates the gradient of input `input_index` from the output gradient.
    fn backpropagate<T: Element>(
        &self,
        input_index: usize,
        range: &AddressRange<'_>,
        output_gradient: Operand<'_, T>,
        input_gradient: OperandMut<'_, T>,
    ) -> Result<(), FrameStackError>;
}

pub(crate) fn check_arity<U>(operation: &str, arity: Arity, inputs: &[U]) -> Result<(), FrameStackError> {
    match arity {
        Arity::Fixed(n) if inputs.len() != n => Err(FrameStackError::config(
            operation,
            format!("expects {} input(s), got {}", n, inputs.len()),
        )),
        Arity::Variable if inputs.is_empty() => {
            Err(FrameStackError::config(operation, "expects at least one input"))
        }
        _ => Ok(()),
    }
}

pub(crate) fn check_input_index(operation: &str, index: usize, arity: usize) -> Result<(), FrameStackError> {
    if index >= arity {
        return Err(FrameStackError::InputIndexOutOfRange {
            operation: operation.to_string(),
            index,
            arity,
        });
    }
    Ok(())
}

/// Output layout of a node whose only change is the row dimension: all inputs
/// that carry a layout must agree on it.
pub(crate) fn infer_standard_layout<T>(
    operation: &str,
    inputs: &[Operand<'_, T>],
) -> Result<Option<BatchLayout>, FrameStackError> {
    let mut found: Option<&BatchLayout> = None;
    for (i, input) in inputs.iter().enumerate() {
        if let Some(layout) = input.layout {
            match found {
                Some(first) if first != layout => {
                    return Err(FrameStackError::LayoutMismatch {
                        operation: operation.to_string(),
                        message: format!("input {} has a different batch layout than the first input", i),
                    })
                }
                Some(_) => {}
                None => found = Some(layout),
            }
        }
    }
    Ok(found.cloned())
}

/// Resolves `range` to columns of a buffer under the given layout.
pub(crate) fn columns_of(
    range: &AddressRange<'_>,
    layout: Option<&BatchLayout>,
    cols: usize,
) -> Result<Range<usize>, FrameStackError> {
    range.with_optional_layout(layout).columns(cols)
}

pub(crate) fn log_validation(operation: &str, params: &str, inputs: &[NodeShape]) {
    let mut parts: Vec<String> = inputs
        .iter()
        .enumerate()
        .map(|(i, s)| format!("input{}{}", i, s))
        .collect();
    if !params.is_empty() {
        parts.push(params.to_string());
    }
    log::debug!("Validating --> {}({})", operation, parts.join(", "));
}
