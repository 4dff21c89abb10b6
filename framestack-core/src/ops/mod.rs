//! # Transform Operations Module (`ops`)
//!
//! The row-addressing and reshaping transforms, organised one per submodule.
//!
//! ## Structure:
//!
//! - [`shuffle`]: the 5-axis shuffle kernel all frame regrouping is built on.
//! - [`transform`]: the [`Transform`](transform::Transform) capability the graph
//!   driver calls, plus the shape and operand types it exchanges.
//! - [`reshape`]: `Reshape` and the `stack_frames` / `unstack_frames` helpers.
//! - [`row_slice`], [`row_stack`], [`row_repeat`]: row-band transforms that keep
//!   the time base.
//! - [`reconcile`]: adopts the batch layout of a second input.
//! - [`node`]: the closed [`TransformNode`](node::TransformNode) enum.

pub mod node;
pub mod reconcile;
pub mod reshape;
pub mod row_repeat;
pub mod row_slice;
pub mod row_stack;
pub mod shuffle;
pub mod transform;

pub use node::{TransformKind, TransformNode};
pub use reconcile::ReconcileLayout;
pub use reshape::{stack_frames, unstack_frames, Reshape};
pub use row_repeat::{RepeatPath, RowRepeat};
pub use row_slice::RowSlice;
pub use row_stack::RowStack;
pub use shuffle::{tensor_shuffle_scale_and_add, Decomposition};
pub use transform::{Arity, NodeShape, Operand, OperandMut, PassPlan, Transform};
