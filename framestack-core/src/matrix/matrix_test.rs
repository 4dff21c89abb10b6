use super::*;
use crate::error::FrameStackError;
use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn counting(rows: usize, cols: usize) -> Matrix<f32> {
    Matrix::from_fn(rows, cols, |r, c| (c * rows + r) as f32)
}

#[test]
fn test_from_vec_is_column_major() {
    let m = Matrix::from_vec(2, 3, vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(m.get(0, 0), Some(1.0));
    assert_eq!(m.get(1, 0), Some(2.0));
    assert_eq!(m.get(0, 1), Some(3.0));
    assert_eq!(m.get(1, 2), Some(6.0));
    assert_eq!(m.get(2, 0), None);
}

#[test]
fn test_from_vec_length_mismatch() {
    let result = Matrix::from_vec(2, 3, vec![1.0f64; 5]);
    assert!(matches!(result, Err(FrameStackError::ShapeMismatch { .. })));
}

#[test]
fn test_resize_keeps_or_zeroes() {
    let mut m = counting(2, 2);
    m.resize(2, 2);
    assert_eq!(m.as_slice(), &[0.0, 1.0, 2.0, 3.0]);
    m.resize(1, 4);
    assert_eq!(m.shape(), [1, 4]);
    assert!(m.as_slice().iter().all(|&v| v == 0.0));
}

#[test]
fn test_verify_size() {
    let m = Matrix::<f32>::zeros(3, 4);
    assert!(m.verify_size(3, 4, "test").is_ok());
    let err = m.verify_size(4, 3, "test").unwrap_err();
    assert!(matches!(err, FrameStackError::ShapeMismatch { .. }));
}

#[test]
fn test_set_value_and_accumulate_on_column_range() {
    let src = counting(2, 3);
    let mut dst = Matrix::zeros(2, 3);
    dst.set_value(&src, 1..2).unwrap();
    assert_eq!(dst.as_slice(), &[0.0, 0.0, 2.0, 3.0, 0.0, 0.0]);
    dst.add_assign_from(&src, 0..3).unwrap();
    assert_eq!(dst.as_slice(), &[0.0, 1.0, 4.0, 6.0, 4.0, 5.0]);
}

#[test]
fn test_column_range_out_of_bounds() {
    let src = counting(2, 3);
    let mut dst = Matrix::zeros(2, 3);
    assert!(dst.set_value(&src, 1..4).is_err());

    assert_eq!(src.column_slice(1..3).unwrap(), &[2.0, 3.0, 4.0, 5.0]);
    let err = src.column_slice(2..4).unwrap_err();
    assert!(matches!(err, FrameStackError::ShapeMismatch { .. }));
    assert!(dst.column_slice_mut(0..4).is_err());
    dst.column_slice_mut(2..3).unwrap().fill(9.0);
    assert_eq!(dst.get(1, 2), Some(9.0));
}

#[test]
fn test_row_slice_primitives() {
    let src = counting(4, 2); // columns [0 1 2 3], [4 5 6 7]
    let mut band = Matrix::zeros(2, 2);
    band.assign_row_slice_of(&src, 1, 2, 0..2).unwrap();
    assert_eq!(band.as_slice(), &[1.0, 2.0, 5.0, 6.0]);

    let mut grad = Matrix::zeros(4, 2);
    grad.add_to_row_slice_of(&band, 1, 2, 0..2).unwrap();
    grad.add_to_row_slice_of(&band, 1, 2, 1..2).unwrap();
    assert_eq!(grad.as_slice(), &[0.0, 1.0, 2.0, 0.0, 0.0, 10.0, 12.0, 0.0]);
}

#[test]
fn test_row_slice_band_exceeds_rows() {
    let src = counting(4, 2);
    let mut band = Matrix::zeros(3, 2);
    let result = band.assign_row_slice_of(&src, 2, 3, 0..2);
    assert!(matches!(result, Err(FrameStackError::ShapeMismatch { .. })));
}

#[test]
fn test_band_bounds_do_not_overflow() {
    let src = counting(4, 2);
    let mut band = Matrix::zeros(2, 2);
    let result = band.assign_row_slice_of(&src, usize::MAX, 2, 0..2);
    assert!(matches!(result, Err(FrameStackError::ShapeMismatch { .. })));

    let mut grad = Matrix::zeros(4, 2);
    let result = grad.add_to_row_slice_of(&band, usize::MAX - 1, 2, 0..2);
    assert!(matches!(result, Err(FrameStackError::ShapeMismatch { .. })));

    let mut single = Matrix::zeros(2, 2);
    let result = single.add_to_row_repeat_of(&src, usize::MAX, 0..2);
    assert!(matches!(result, Err(FrameStackError::ShapeMismatch { .. })));
}

#[test]
fn test_assign_to_and_add_with_row_slice() {
    let part = counting(2, 2);
    let mut whole = Matrix::zeros(5, 2);
    whole.assign_to_row_slice_of(&part, 3, 2, 0..2).unwrap();
    assert_eq!(whole.get(3, 0), Some(0.0));
    assert_eq!(whole.get(4, 0), Some(1.0));
    assert_eq!(whole.get(3, 1), Some(2.0));
    assert_eq!(whole.get(4, 1), Some(3.0));

    let mut back = Matrix::ones(2, 2);
    back.add_with_row_slice_of(&whole, 3, 2, 0..2).unwrap();
    assert_eq!(back.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_repeat_and_its_adjoint() {
    let src = counting(2, 2);
    let mut tiled = Matrix::zeros(6, 2);
    tiled.assign_repeat_of(&src, 3, 0..2).unwrap();
    assert_eq!(
        tiled.as_slice(),
        &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 2.0, 3.0, 2.0, 3.0, 2.0, 3.0]
    );

    let mut grad = Matrix::zeros(2, 2);
    grad.add_to_row_repeat_of(&tiled, 3, 0..2).unwrap();
    assert_eq!(grad.as_slice(), &[0.0, 3.0, 6.0, 9.0]);
}

#[test]
fn test_random_creation_is_seedable() {
    let a = Matrix::<f64>::randn_with(3, 4, &mut StdRng::seed_from_u64(7));
    let b = Matrix::<f64>::randn_with(3, 4, &mut StdRng::seed_from_u64(7));
    assert_relative_eq!(a, b);
    let u = Matrix::<f32>::rand(5, 5);
    assert!(u.as_slice().iter().all(|&v| (0.0..1.0).contains(&v)));
}
