use super::*;
use crate::error::ErrorCategory;
use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn counting(rows: usize, cols: usize) -> Matrix<f64> {
    Matrix::from_fn(rows, cols, |r, c| (c * rows + r) as f64)
}

fn plain(rows: usize, cols: usize) -> NodeShape {
    NodeShape::new(rows, cols)
}

#[test]
fn test_validate_rejects_non_multiple() {
    let mut reshape = Reshape::new(3, ImageLayout::default());
    let err = reshape.validate(&[plain(5, 4)], true).unwrap_err();
    assert!(matches!(err, FrameStackError::InvalidConfiguration { .. }));
    assert_eq!(err.category(), ErrorCategory::Configuration);
    let message = err.to_string();
    assert!(message.contains('3') && message.contains('5'), "{}", message);
}

#[test]
fn test_validate_defers_checks_until_final_pass() {
    let mut reshape = Reshape::new(3, ImageLayout::default());
    let shape = reshape.validate(&[plain(5, 1)], false).unwrap();
    assert_eq!(shape.rows, 3);
}

#[test]
fn test_validate_element_count_mismatch_without_layout() {
    let mut reshape = Reshape::new(8, ImageLayout::default());
    let err = reshape.validate(&[plain(4, 3)], true).unwrap_err();
    assert!(matches!(err, FrameStackError::InternalError(_)));
    assert_eq!(err.category(), ErrorCategory::InternalConsistency);

    // A layout absorbs the remainder, so the same shape passes.
    let shape = reshape.validate(&[NodeShape::minibatch(4, 3)], true).unwrap();
    assert!(shape.has_layout);
}

#[test]
fn test_validate_zero_rows_is_rejected() {
    let mut reshape = Reshape::new(0, ImageLayout::default());
    assert!(reshape.validate(&[plain(4, 6)], false).is_err());
}

#[test]
fn test_flat_reshape_preserves_element_order() {
    let mut reshape = Reshape::new(8, ImageLayout::default());
    let shape = reshape.validate(&[plain(4, 6)], true).unwrap();
    assert_eq!((shape.rows, shape.cols), (8, 3));
    assert!(!shape.has_layout);

    let input = counting(4, 6);
    let plan = reshape.prepare_pass(&[Operand::new(&input, None)]).unwrap();
    assert_eq!(plan, PassPlan { rows: 8, cols: 3, layout: None });

    let mut output = Matrix::zeros(plan.rows, plan.cols);
    reshape
        .evaluate(&AddressRange::all(), &[Operand::new(&input, None)], OperandMut::new(&mut output, None))
        .unwrap();
    assert_eq!(output.as_slice(), input.as_slice());
}

#[test]
fn test_flat_reshape_backward_accumulates() {
    let reshape = Reshape::new(8, ImageLayout::default());
    let out_grad = counting(8, 3);
    let mut in_grad = Matrix::ones(4, 6);
    for _ in 0..2 {
        reshape
            .backpropagate(
                0,
                &AddressRange::all(),
                Operand::new(&out_grad, None),
                OperandMut::new(&mut in_grad, None),
            )
            .unwrap();
    }
    let expected: Vec<f64> = (0..24).map(|v| 1.0 + 2.0 * v as f64).collect();
    assert_eq!(in_grad.as_slice(), expected.as_slice());
}

#[test]
fn test_evaluate_rejects_wrong_output_size() {
    let reshape = Reshape::new(8, ImageLayout::default());
    let input = counting(4, 6);
    let mut output = Matrix::zeros(3, 8);
    let err = reshape
        .evaluate(&AddressRange::all(), &[Operand::new(&input, None)], OperandMut::new(&mut output, None))
        .unwrap_err();
    assert!(matches!(err, FrameStackError::ShapeMismatch { .. }));
}

#[test]
fn test_stack_with_layout() {
    // D=2, S=2, K=3: each sequence has three frames, collapsed into one frame of six rows.
    let mut reshape = Reshape::new(6, ImageLayout::default());
    reshape.validate(&[NodeShape::minibatch(2, 6)], true).unwrap();

    let in_layout = BatchLayout::new(2, 3);
    let input = counting(2, 6);
    let plan = reshape.prepare_pass(&[Operand::new(&input, Some(&in_layout))]).unwrap();
    assert_eq!((plan.rows, plan.cols), (6, 2));
    let out_layout = plan.layout.clone().unwrap();
    assert_eq!(out_layout, BatchLayout::new(2, 1));

    let mut output = Matrix::zeros(6, 2);
    reshape
        .evaluate(
            &AddressRange::all(),
            &[Operand::new(&input, Some(&in_layout))],
            OperandMut::new(&mut output, Some(&out_layout)),
        )
        .unwrap();
    // Input columns are (s0,t0) (s1,t0) (s0,t1) (s1,t1) (s0,t2) (s1,t2).
    let expected = Matrix::from_vec(
        6,
        2,
        vec![0.0, 1.0, 4.0, 5.0, 8.0, 9.0, 2.0, 3.0, 6.0, 7.0, 10.0, 11.0],
    )
    .unwrap();
    assert_eq!(output, expected);

    // Backward of stacking hands every element back to where it came from.
    let mut in_grad = Matrix::zeros(2, 6);
    for _ in 0..2 {
        reshape
            .backpropagate(
                0,
                &AddressRange::all(),
                Operand::new(&output, Some(&out_layout)),
                OperandMut::new(&mut in_grad, Some(&in_layout)),
            )
            .unwrap();
    }
    let doubled = Matrix::from_fn(2, 6, |r, c| 2.0 * input.get(r, c).unwrap_or(0.0));
    assert_relative_eq!(in_grad, doubled);
}

#[test]
fn test_unstack_with_layout_round_trips() {
    let mut rng = StdRng::seed_from_u64(11);
    let unstack = Reshape::new(3, ImageLayout::default());
    let stack = Reshape::new(12, ImageLayout::default());

    let in_layout = BatchLayout::new(5, 1);
    let input = Matrix::<f64>::randn_with(12, 5, &mut rng);
    let plan = unstack.prepare_pass(&[Operand::new(&input, Some(&in_layout))]).unwrap();
    let mid_layout = plan.layout.clone().unwrap();
    assert_eq!(mid_layout.num_parallel_sequences(), 5);
    assert_eq!(mid_layout.num_time_steps(), 4);
    assert!(!mid_layout.is_all_none());

    let mut mid = Matrix::zeros(plan.rows, plan.cols);
    unstack
        .evaluate(
            &AddressRange::all(),
            &[Operand::new(&input, Some(&in_layout))],
            OperandMut::new(&mut mid, Some(&mid_layout)),
        )
        .unwrap();

    let plan = stack.prepare_pass(&[Operand::new(&mid, Some(&mid_layout))]).unwrap();
    let back_layout = plan.layout.clone().unwrap();
    let mut back = Matrix::zeros(plan.rows, plan.cols);
    stack
        .evaluate(
            &AddressRange::all(),
            &[Operand::new(&mid, Some(&mid_layout))],
            OperandMut::new(&mut back, Some(&back_layout)),
        )
        .unwrap();
    assert_eq!(back, input);
}

#[test]
fn test_unstack_backward_is_stack() {
    let unstack = Reshape::new(2, ImageLayout::default());
    let in_layout = BatchLayout::new(2, 1);
    let input = counting(6, 2);
    let out_layout = unstack.derive_layout(6, &in_layout).unwrap();

    let mut out = Matrix::zeros(2, 6);
    unstack
        .evaluate(
            &AddressRange::all(),
            &[Operand::new(&input, Some(&in_layout))],
            OperandMut::new(&mut out, Some(&out_layout)),
        )
        .unwrap();

    let mut in_grad = Matrix::zeros(6, 2);
    unstack
        .backpropagate(
            0,
            &AddressRange::all(),
            Operand::new(&out, Some(&out_layout)),
            OperandMut::new(&mut in_grad, Some(&in_layout)),
        )
        .unwrap();
    assert_eq!(in_grad, input);
}

#[test]
fn test_partial_range_is_rejected() {
    let reshape = Reshape::new(4, ImageLayout::default());
    let in_layout = BatchLayout::new(1, 2);
    let out_layout = BatchLayout::new(1, 1);
    let input = counting(2, 2);
    let mut output = Matrix::zeros(4, 1);
    let err = reshape
        .evaluate(
            &AddressRange::time_step(0),
            &[Operand::new(&input, Some(&in_layout))],
            OperandMut::new(&mut output, Some(&out_layout)),
        )
        .unwrap_err();
    assert!(matches!(err, FrameStackError::InvalidOperation { .. }));
    assert_eq!(err.category(), ErrorCategory::Misuse);
}

#[test]
fn test_multi_step_nesting_is_unsupported() {
    let stack = Reshape::new(4, ImageLayout::default());
    let err = stack.derive_layout(2, &BatchLayout::new(3, 4)).unwrap_err();
    assert!(matches!(err, FrameStackError::UnsupportedOperation(_)));

    let unstack = Reshape::new(2, ImageLayout::default());
    let err = unstack.derive_layout(4, &BatchLayout::new(3, 2)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unsupported);
}

#[test]
fn test_same_row_count_with_layout_passes_through() {
    let reshape = Reshape::new(3, ImageLayout::default());
    let layout = BatchLayout::new(2, 4);
    assert_eq!(reshape.derive_layout(3, &layout).unwrap(), layout);

    let input = counting(3, 8);
    let mut output = Matrix::zeros(3, 8);
    reshape
        .evaluate(
            &AddressRange::all(),
            &[Operand::new(&input, Some(&layout))],
            OperandMut::new(&mut output, Some(&layout)),
        )
        .unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_layout_presence_must_match() {
    let reshape = Reshape::new(4, ImageLayout::default());
    let layout = BatchLayout::new(1, 1);
    let input = counting(2, 2);
    let mut output = Matrix::zeros(4, 1);
    let err = reshape
        .evaluate(
            &AddressRange::all(),
            &[Operand::new(&input, None)],
            OperandMut::new(&mut output, Some(&layout)),
        )
        .unwrap_err();
    assert!(matches!(err, FrameStackError::LayoutMismatch { .. }));
}

#[test]
fn test_image_layout_inference() {
    let mut reshape = Reshape::new(8, ImageLayout::new(2, 0, 2));
    let shape = reshape.validate(&[plain(4, 6)], true).unwrap();
    assert_eq!(shape.image, ImageLayout::new(2, 2, 2));
    assert_eq!(reshape.image_layout(), ImageLayout::new(2, 2, 2));

    let mut bad = Reshape::new(8, ImageLayout::new(3, 3, 3));
    assert!(matches!(
        bad.validate(&[plain(4, 6)], true),
        Err(FrameStackError::ImageLayout { .. })
    ));

    // No configured image: a degenerate 1 x 1 x numRows layout, even if the input was an image.
    let mut lossy = Reshape::new(8, ImageLayout::default());
    let input = plain(4, 6).with_image(ImageLayout::new(2, 1, 2));
    let shape = lossy.validate(&[input], true).unwrap();
    assert_eq!(shape.image, ImageLayout::new(1, 1, 8));
}

#[test]
fn test_save_load() {
    let reshape = Reshape::new(12, ImageLayout::new(2, 3, 2));
    let mut bytes = Vec::new();
    reshape.save(&mut bytes).unwrap();
    assert_eq!(bytes.len(), 32);
    // Fixed order: numRows, width, height, channels.
    let fields: Vec<u64> = bytes
        .chunks(8)
        .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
        .collect();
    assert_eq!(fields, vec![12, 2, 3, 2]);
    let loaded = Reshape::load(&mut bytes.as_slice()).unwrap();
    assert_eq!(loaded, reshape);
    assert_eq!(
        loaded.to_string(),
        "Reshape(numRows=12, imageWidth=2, imageHeight=3, imageChannels=2)"
    );
}

#[test]
fn test_backpropagate_rejects_other_inputs() {
    let reshape = Reshape::new(8, ImageLayout::default());
    let out_grad = counting(8, 3);
    let mut in_grad = Matrix::zeros(4, 6);
    let err = reshape
        .backpropagate(1, &AddressRange::all(), Operand::new(&out_grad, None), OperandMut::new(&mut in_grad, None))
        .unwrap_err();
    assert!(matches!(err, FrameStackError::InputIndexOutOfRange { .. }));
}
