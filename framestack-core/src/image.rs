// framestack-core/src/image.rs

//! Image shape metadata carried alongside the row dimension.
//!
//! Only bookkeeping: nothing here changes numeric results. Transforms that
//! cannot keep an input's image shape meaningful fall back to a column layout
//! and log a warning.

use crate::error::FrameStackError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageLayout {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl ImageLayout {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        ImageLayout { width, height, channels }
    }

    /// Plain vector data: one pixel wide, `rows` high, one channel.
    pub fn column(rows: usize) -> Self {
        ImageLayout::new(1, rows, 1)
    }

    pub fn num_elements(&self) -> usize {
        self.width * self.height * self.channels
    }

    pub fn is_fully_specified(&self) -> bool {
        self.width > 0 && self.height > 0 && self.channels > 0
    }

    /// True when the layout carries more than a column of values.
    pub fn is_image(&self) -> bool {
        self.width * self.channels != 1
    }

    /// Completes a partially configured layout so it multiplies to `num_rows`.
    ///
    /// Any two given dimensions determine the third. A layout with no dimension
    /// given is returned as is. A single given dimension is an error.
    pub fn infer_from_rows(&self, num_rows: usize, operation: &str) -> Result<ImageLayout, FrameStackError> {
        let err = |message: &str| FrameStackError::ImageLayout {
            operation: operation.to_string(),
            message: message.to_string(),
        };
        let divide = |a: usize, b: usize| -> Result<usize, FrameStackError> {
            if num_rows % (a * b) != 0 {
                Err(err("image row size is not a multiple of specified image dimensions"))
            } else {
                Ok(num_rows / (a * b))
            }
        };

        let mut out = *self;
        match (self.width > 0, self.height > 0, self.channels > 0) {
            (false, false, false) => {}
            (true, true, true) => {
                if self.num_elements() != num_rows {
                    return Err(err("image dimensions do not match row size"));
                }
            }
            (true, true, false) => out.channels = divide(self.width, self.height)?,
            (true, false, true) => out.height = divide(self.width, self.channels)?,
            (false, true, true) => out.width = divide(self.height, self.channels)?,
            _ => return Err(err("at least two image dimensions must be specified")),
        }
        Ok(out)
    }
}

impl fmt::Display for ImageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} x {}", self.width, self.height, self.channels)
    }
}

/// Derives an output image layout by overriding the height of the input's,
/// warning when the input described a real image whose shape is now lost.
pub(crate) fn with_height(input: ImageLayout, height: usize, operation: &str, warn_on_loss: bool) -> ImageLayout {
    if warn_on_loss && input.is_image() {
        warn!(
            "{} operation cannot inherit image size information from its input ({}). Image size info is lost.",
            operation, input
        );
    }
    ImageLayout { height, ..input }
}
