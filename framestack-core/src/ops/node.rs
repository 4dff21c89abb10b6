// framestack-core/src/ops/node.rs

use super::reconcile::ReconcileLayout;
use super::reshape::Reshape;
use super::row_repeat::RowRepeat;
use super::row_slice::RowSlice;
use super::row_stack::RowStack;
use super::transform::{Arity, NodeShape, Operand, OperandMut, PassPlan, Transform};
use crate::error::FrameStackError;
use crate::layout::AddressRange;
use crate::types::Element;
use std::fmt;
use std::io::{Read, Write};

/// Persisted tag identifying the kind of a [`TransformNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    Reshape,
    RowSlice,
    RowStack,
    RowRepeat,
    ReconcileLayout,
}

impl TransformKind {
    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::Reshape => "Reshape",
            TransformKind::RowSlice => "RowSlice",
            TransformKind::RowStack => "RowStack",
            TransformKind::RowRepeat => "RowRepeat",
            TransformKind::ReconcileLayout => "ReconcileLayout",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Reshape" => Some(TransformKind::Reshape),
            "RowSlice" => Some(TransformKind::RowSlice),
            "RowStack" => Some(TransformKind::RowStack),
            "RowRepeat" => Some(TransformKind::RowRepeat),
            "ReconcileLayout" => Some(TransformKind::ReconcileLayout),
            _ => None,
        }
    }
}

/// Every transform the crate provides, behind one closed type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformNode {
    Reshape(Reshape),
    RowSlice(RowSlice),
    RowStack(RowStack),
    RowRepeat(RowRepeat),
    ReconcileLayout(ReconcileLayout),
}

macro_rules! dispatch {
    ($node:expr, $t:ident => $body:expr) => {
        match $node {
            TransformNode::Reshape($t) => $body,
            TransformNode::RowSlice($t) => $body,
            TransformNode::RowStack($t) => $body,
            TransformNode::RowRepeat($t) => $body,
            TransformNode::ReconcileLayout($t) => $body,
        }
    };
}

impl TransformNode {
    pub fn kind(&self) -> TransformKind {
        match self {
            TransformNode::Reshape(_) => TransformKind::Reshape,
            TransformNode::RowSlice(_) => TransformKind::RowSlice,
            TransformNode::RowStack(_) => TransformKind::RowStack,
            TransformNode::RowRepeat(_) => TransformKind::RowRepeat,
            TransformNode::ReconcileLayout(_) => TransformKind::ReconcileLayout,
        }
    }

    /// Writes the node's configuration. The kind tag is not written; the
    /// caller stores it next to the node.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), FrameStackError> {
        match self {
            TransformNode::Reshape(t) => t.save(writer),
            TransformNode::RowSlice(t) => t.save(writer),
            TransformNode::RowRepeat(t) => t.save(writer),
            // Configured entirely by their inputs.
            TransformNode::RowStack(_) | TransformNode::ReconcileLayout(_) => Ok(()),
        }
    }

    /// Rebuilds a node of the given kind from a configuration written by
    /// [`save`](Self::save).
    ///
    /// # Arguments
    /// * `kind` - The tag stored next to the configuration.
    /// * `reader` - Source positioned at the configuration.
    ///
    /// # Returns
    /// The node, or `FrameStackError::Io` if the configuration cannot be read.
    pub fn load<R: Read + ?Sized>(kind: TransformKind, reader: &mut R) -> Result<Self, FrameStackError> {
        let node = match kind {
            TransformKind::Reshape => TransformNode::Reshape(Reshape::load(reader)?),
            TransformKind::RowSlice => TransformNode::RowSlice(RowSlice::load(reader)?),
            TransformKind::RowStack => TransformNode::RowStack(RowStack::new()),
            TransformKind::RowRepeat => TransformNode::RowRepeat(RowRepeat::load(reader)?),
            TransformKind::ReconcileLayout => TransformNode::ReconcileLayout(ReconcileLayout::new()),
        };
        log::debug!("Loaded {}", node);
        Ok(node)
    }
}

impl Transform for TransformNode {
    fn operation_name(&self) -> &'static str {
        dispatch!(self, t => t.operation_name())
    }

    fn arity(&self) -> Arity {
        dispatch!(self, t => t.arity())
    }

    fn validate(&mut self, inputs: &[NodeShape], is_final_pass: bool) -> Result<NodeShape, FrameStackError> {
        dispatch!(self, t => t.validate(inputs, is_final_pass))
    }

    fn prepare_pass<T: Element>(&self, inputs: &[Operand<'_, T>]) -> Result<PassPlan, FrameStackError> {
        dispatch!(self, t => t.prepare_pass(inputs))
    }

    fn evaluate<T: Element>(
        &self,
        range: &AddressRange<'_>,
        inputs: &[Operand<'_, T>],
        output: OperandMut<'_, T>,
    ) -> Result<(), FrameStackError> {
        dispatch!(self, t => t.evaluate(range, inputs, output))
    }

    fn backpropagate<T: Element>(
        &self,
        input_index: usize,
        range: &AddressRange<'_>,
        output_gradient: Operand<'_, T>,
        input_gradient: OperandMut<'_, T>,
    ) -> Result<(), FrameStackError> {
        dispatch!(self, t => t.backpropagate(input_index, range, output_gradient, input_gradient))
    }
}

impl fmt::Display for TransformNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, t => fmt::Display::fmt(t, f))
    }
}

impl From<Reshape> for TransformNode {
    fn from(t: Reshape) -> Self {
        TransformNode::Reshape(t)
    }
}

impl From<RowSlice> for TransformNode {
    fn from(t: RowSlice) -> Self {
        TransformNode::RowSlice(t)
    }
}

impl From<RowStack> for TransformNode {
    fn from(t: RowStack) -> Self {
        TransformNode::RowStack(t)
    }
}

impl From<RowRepeat> for TransformNode {
    fn from(t: RowRepeat) -> Self {
        TransformNode::RowRepeat(t)
    }
}

impl From<ReconcileLayout> for TransformNode {
    fn from(t: ReconcileLayout) -> Self {
        TransformNode::ReconcileLayout(t)
    }
}
