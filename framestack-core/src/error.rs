use thiserror::Error;

/// Broad class of a [`FrameStackError`].
///
/// Configuration errors are geometrically invalid user settings, internal
/// consistency errors signal a caller bug (shapes that passed validation but
/// no longer line up), misuse errors are calls the transform refuses to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    InternalConsistency,
    Misuse,
    Unsupported,
    Io,
}

/// Custom error type for the framestack transforms.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum FrameStackError {
    #[error("{operation} operation: {message}")]
    InvalidConfiguration { operation: String, message: String },

    #[error("{operation} operation: the input {input_index} has {actual} columns, expected {expected}")]
    ColumnMismatch {
        operation: String,
        input_index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{operation} operation: incompatible batch layouts: {message}")]
    LayoutMismatch { operation: String, message: String },

    #[error("{operation} operation: image layout error: {message}")]
    ImageLayout { operation: String, message: String },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("{operation} operation: {message}")]
    InvalidOperation { operation: String, message: String },

    #[error("{operation} operation: input index {index} out of range for {arity} input(s)")]
    InputIndexOutOfRange {
        operation: String,
        index: usize,
        arity: usize,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl FrameStackError {
    /// Returns the class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FrameStackError::InvalidConfiguration { .. }
            | FrameStackError::ColumnMismatch { .. }
            | FrameStackError::LayoutMismatch { .. }
            | FrameStackError::ImageLayout { .. } => ErrorCategory::Configuration,
            FrameStackError::ShapeMismatch { .. } | FrameStackError::InternalError(_) => {
                ErrorCategory::InternalConsistency
            }
            FrameStackError::InvalidOperation { .. }
            | FrameStackError::InputIndexOutOfRange { .. } => ErrorCategory::Misuse,
            FrameStackError::UnsupportedOperation(_) => ErrorCategory::Unsupported,
            FrameStackError::Io(_) => ErrorCategory::Io,
        }
    }

    pub(crate) fn config(operation: &str, message: impl Into<String>) -> Self {
        FrameStackError::InvalidConfiguration {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn misuse(operation: &str, message: impl Into<String>) -> Self {
        FrameStackError::InvalidOperation {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for FrameStackError {
    fn from(err: std::io::Error) -> Self {
        FrameStackError::Io(err.to_string())
    }
}
