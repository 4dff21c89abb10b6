// framestack-core/src/matrix/mod.rs

//! Dense 2-D buffers.
//!
//! A [`Matrix`] stores its elements column-major: every column is one frame
//! (one time step of one parallel sequence) and the rows of a column are
//! contiguous in memory. Column ranges are therefore contiguous sub-slices,
//! which is what lets the transforms carve frame ranges without copying.

pub mod create;
pub mod row_band;

use crate::error::FrameStackError;
use crate::types::Element;
use approx::{AbsDiffEq, RelativeEq};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Element> Matrix<T> {
    /// Creates a matrix from column-major data.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, FrameStackError> {
        if data.len() != rows * cols {
            return Err(FrameStackError::ShapeMismatch {
                expected: vec![rows * cols],
                actual: vec![data.len()],
                operation: "Matrix::from_vec".to_string(),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `[rows, cols]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Changes the dimensions. Contents are zeroed when the shape changes and
    /// kept as they are otherwise.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        if self.rows == rows && self.cols == cols {
            return;
        }
        self.rows = rows;
        self.cols = cols;
        self.data.clear();
        self.data.resize(rows * cols, T::zero());
    }

    /// Fails with `ShapeMismatch` unless the matrix is `rows x cols`.
    pub fn verify_size(&self, rows: usize, cols: usize, operation: &str) -> Result<(), FrameStackError> {
        if self.rows != rows || self.cols != cols {
            return Err(FrameStackError::ShapeMismatch {
                expected: vec![rows, cols],
                actual: vec![self.rows, self.cols],
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row < self.rows && col < self.cols {
            Some(self.data[col * self.rows + row])
        } else {
            None
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<(), FrameStackError> {
        if row >= self.rows || col >= self.cols {
            return Err(FrameStackError::ShapeMismatch {
                expected: vec![self.rows, self.cols],
                actual: vec![row, col],
                operation: "Matrix::set (index out of bounds)".to_string(),
            });
        }
        self.data[col * self.rows + row] = value;
        Ok(())
    }

    /// The whole buffer as one long column-major vector.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Contiguous elements of the columns in `cols`.
    ///
    /// # Errors
    /// `ShapeMismatch` when `cols` is reversed or reaches past the last column.
    pub fn column_slice(&self, cols: Range<usize>) -> Result<&[T], FrameStackError> {
        self.check_columns(&cols, "column_slice")?;
        Ok(&self.data[cols.start * self.rows..cols.end * self.rows])
    }

    pub fn column_slice_mut(&mut self, cols: Range<usize>) -> Result<&mut [T], FrameStackError> {
        self.check_columns(&cols, "column_slice_mut")?;
        let rows = self.rows;
        Ok(&mut self.data[cols.start * rows..cols.end * rows])
    }

    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|e| *e = value);
    }

    /// Copies `src[:, cols]` into `self[:, cols]`. Both matrices must have the same shape.
    pub fn set_value(&mut self, src: &Matrix<T>, cols: Range<usize>) -> Result<(), FrameStackError> {
        self.check_same_shape(src, "set_value")?;
        self.column_slice_mut(cols.clone())?
            .copy_from_slice(src.column_slice(cols)?);
        Ok(())
    }

    /// Accumulates `src[:, cols]` into `self[:, cols]`.
    pub fn add_assign_from(&mut self, src: &Matrix<T>, cols: Range<usize>) -> Result<(), FrameStackError> {
        self.check_same_shape(src, "add_assign_from")?;
        self.column_slice_mut(cols.clone())?
            .iter_mut()
            .zip(src.column_slice(cols)?)
            .for_each(|(d, &s)| *d += s);
        Ok(())
    }

    pub(crate) fn check_columns(&self, cols: &Range<usize>, operation: &str) -> Result<(), FrameStackError> {
        if cols.start > cols.end || cols.end > self.cols {
            return Err(FrameStackError::ShapeMismatch {
                expected: vec![self.rows, self.cols],
                actual: vec![cols.start, cols.end],
                operation: format!("{} (column range out of bounds)", operation),
            });
        }
        Ok(())
    }

    fn check_same_shape(&self, src: &Matrix<T>, operation: &str) -> Result<(), FrameStackError> {
        if self.rows != src.rows || self.cols != src.cols {
            return Err(FrameStackError::ShapeMismatch {
                expected: vec![self.rows, self.cols],
                actual: vec![src.rows, src.cols],
                operation: operation.to_string(),
            });
        }
        Ok(())
    }
}

impl<T: Element> AbsDiffEq for Matrix<T> {
    type Epsilon = T;

    fn default_epsilon() -> T {
        T::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: T) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl<T: Element> RelativeEq for Matrix<T> {
    fn default_max_relative() -> T {
        T::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: T, max_relative: T) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}

#[cfg(test)]
#[path = "matrix_test.rs"]
mod tests;
