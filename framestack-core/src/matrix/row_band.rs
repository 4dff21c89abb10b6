// framestack-core/src/matrix/row_band.rs

//! Row-band copy and accumulate primitives.
//!
//! All of them operate on a column range shared by source and destination, so
//! both must have the same column count. Only the row extents differ.

use super::Matrix;
use crate::error::FrameStackError;
use crate::types::Element;
use std::ops::Range;

impl<T: Element> Matrix<T> {
    /// `self[:, cols] = src[start..start + num_rows, cols]`
    pub fn assign_row_slice_of(
        &mut self,
        src: &Matrix<T>,
        start: usize,
        num_rows: usize,
        cols: Range<usize>,
    ) -> Result<(), FrameStackError> {
        check_band(src, self, start, num_rows, &cols, "assign_row_slice_of")?;
        for c in cols {
            let from = c * src.rows + start;
            let to = c * self.rows;
            self.data[to..to + num_rows].copy_from_slice(&src.data[from..from + num_rows]);
        }
        Ok(())
    }

    /// `self[:, cols] += src[start..start + num_rows, cols]`
    pub fn add_with_row_slice_of(
        &mut self,
        src: &Matrix<T>,
        start: usize,
        num_rows: usize,
        cols: Range<usize>,
    ) -> Result<(), FrameStackError> {
        check_band(src, self, start, num_rows, &cols, "add_with_row_slice_of")?;
        for c in cols {
            let from = c * src.rows + start;
            let to = c * self.rows;
            add_slices(&mut self.data[to..to + num_rows], &src.data[from..from + num_rows]);
        }
        Ok(())
    }

    /// `self[start..start + num_rows, cols] = src[:, cols]`
    pub fn assign_to_row_slice_of(
        &mut self,
        src: &Matrix<T>,
        start: usize,
        num_rows: usize,
        cols: Range<usize>,
    ) -> Result<(), FrameStackError> {
        check_band(self, src, start, num_rows, &cols, "assign_to_row_slice_of")?;
        for c in cols {
            let from = c * src.rows;
            let to = c * self.rows + start;
            self.data[to..to + num_rows].copy_from_slice(&src.data[from..from + num_rows]);
        }
        Ok(())
    }

    /// `self[start..start + num_rows, cols] += src[:, cols]`
    pub fn add_to_row_slice_of(
        &mut self,
        src: &Matrix<T>,
        start: usize,
        num_rows: usize,
        cols: Range<usize>,
    ) -> Result<(), FrameStackError> {
        check_band(self, src, start, num_rows, &cols, "add_to_row_slice_of")?;
        for c in cols {
            let from = c * src.rows;
            let to = c * self.rows + start;
            add_slices(&mut self.data[to..to + num_rows], &src.data[from..from + num_rows]);
        }
        Ok(())
    }

    /// Tiles the rows of `src` vertically `num_repeats` times into `self[:, cols]`.
    pub fn assign_repeat_of(
        &mut self,
        src: &Matrix<T>,
        num_repeats: usize,
        cols: Range<usize>,
    ) -> Result<(), FrameStackError> {
        check_repeat(self, src, num_repeats, &cols, "assign_repeat_of")?;
        let band = src.rows;
        for c in cols {
            let from = c * band;
            for tile in 0..num_repeats {
                let to = c * self.rows + tile * band;
                self.data[to..to + band].copy_from_slice(&src.data[from..from + band]);
            }
        }
        Ok(())
    }

    /// Sums the `num_repeats` row tiles of `src[:, cols]` into `self[:, cols]`.
    pub fn add_to_row_repeat_of(
        &mut self,
        src: &Matrix<T>,
        num_repeats: usize,
        cols: Range<usize>,
    ) -> Result<(), FrameStackError> {
        check_repeat(src, self, num_repeats, &cols, "add_to_row_repeat_of")?;
        let band = self.rows;
        for c in cols {
            let to = c * band;
            for tile in 0..num_repeats {
                let from = c * src.rows + tile * band;
                add_slices(&mut self.data[to..to + band], &src.data[from..from + band]);
            }
        }
        Ok(())
    }
}

fn add_slices<T: Element>(dst: &mut [T], src: &[T]) {
    dst.iter_mut().zip(src).for_each(|(d, &s)| *d += s);
}

// `tall` holds the band, `short` is exactly `num_rows` high.
fn check_band<T: Element>(
    tall: &Matrix<T>,
    short: &Matrix<T>,
    start: usize,
    num_rows: usize,
    cols: &Range<usize>,
    operation: &str,
) -> Result<(), FrameStackError> {
    let fits = start.checked_add(num_rows).map_or(false, |end| end <= tall.rows);
    if !fits || short.rows != num_rows || tall.cols != short.cols {
        return Err(FrameStackError::ShapeMismatch {
            expected: vec![tall.rows, tall.cols],
            actual: vec![start, num_rows, short.rows, short.cols],
            operation: operation.to_string(),
        });
    }
    tall.check_columns(cols, operation)
}

fn check_repeat<T: Element>(
    tiled: &Matrix<T>,
    single: &Matrix<T>,
    num_repeats: usize,
    cols: &Range<usize>,
    operation: &str,
) -> Result<(), FrameStackError> {
    let expected_rows = single.rows.checked_mul(num_repeats);
    if expected_rows != Some(tiled.rows) || tiled.cols != single.cols {
        return Err(FrameStackError::ShapeMismatch {
            expected: vec![single.rows, num_repeats, single.cols],
            actual: vec![tiled.rows, tiled.cols],
            operation: operation.to_string(),
        });
    }
    tiled.check_columns(cols, operation)
}
