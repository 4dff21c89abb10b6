// Main modules of the crate
pub mod error;
pub mod image;
pub mod layout;
pub mod matrix;
pub mod ops;
pub mod types;

mod persist;

pub use error::{ErrorCategory, FrameStackError};
pub use image::ImageLayout;
pub use layout::{AddressRange, BatchLayout, SentenceSpan};
pub use matrix::Matrix;
pub use ops::{
    NodeShape, Operand, OperandMut, PassPlan, ReconcileLayout, Reshape, RowRepeat, RowSlice, RowStack, Transform,
    TransformKind, TransformNode,
};
pub use types::Element;
// Re-export traits required by public functions/structs
pub use num_traits;
