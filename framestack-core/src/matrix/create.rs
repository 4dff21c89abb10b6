// framestack-core/src/matrix/create.rs

use super::Matrix;
use crate::types::Element;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

impl<T: Element> Matrix<T> {
    /// Creates a new `rows x cols` matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::full(rows, cols, T::zero())
    }

    /// Creates a new matrix filled with ones.
    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::full(rows, cols, T::one())
    }

    /// Creates a new matrix filled with a specific value.
    pub fn full(rows: usize, cols: usize, value: T) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Creates a matrix whose element at `(row, col)` is `f(row, col)`.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for c in 0..cols {
            for r in 0..rows {
                data.push(f(r, c));
            }
        }
        Matrix { rows, cols, data }
    }

    /// Creates a matrix with values drawn uniformly from `[0, 1)`.
    pub fn rand(rows: usize, cols: usize) -> Self {
        Self::rand_with(rows, cols, &mut rand::thread_rng())
    }

    pub fn rand_with<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        Self::from_fn(rows, cols, |_, _| cast(rng.gen::<f64>()))
    }

    /// Creates a matrix with values drawn from the standard normal distribution.
    pub fn randn(rows: usize, cols: usize) -> Self {
        Self::randn_with(rows, cols, &mut rand::thread_rng())
    }

    pub fn randn_with<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        Self::from_fn(rows, cols, |_, _| {
            let v: f64 = StandardNormal.sample(&mut *rng);
            cast(v)
        })
    }
}

fn cast<T: Element>(v: f64) -> T {
    <T as num_traits::NumCast>::from(v).unwrap_or_else(T::zero)
}
