use framestack_core::{
    AddressRange, BatchLayout, FrameStackError, Matrix, NodeShape, Operand, OperandMut, Transform,
};

/// A buffer as the graph driver holds it: values plus the layout of its columns.
#[derive(Debug, Clone)]
pub struct Value {
    pub matrix: Matrix<f64>,
    pub layout: Option<BatchLayout>,
}

#[allow(dead_code)]
impl Value {
    pub fn plain(matrix: Matrix<f64>) -> Self {
        Value { matrix, layout: None }
    }

    pub fn batched(matrix: Matrix<f64>, layout: BatchLayout) -> Self {
        Value { matrix, layout: Some(layout) }
    }

    pub fn shape(&self) -> NodeShape {
        if self.layout.is_some() {
            NodeShape::minibatch(self.matrix.rows(), self.matrix.cols())
        } else {
            NodeShape::new(self.matrix.rows(), self.matrix.cols())
        }
    }

    pub fn operand(&self) -> Operand<'_, f64> {
        Operand::new(&self.matrix, self.layout.as_ref())
    }
}

/// Runs the validate, prepare and evaluate steps the external scheduler
/// would perform for one node over a full minibatch.
#[allow(dead_code)]
pub fn forward<N: Transform>(node: &mut N, inputs: &[&Value]) -> Result<Value, FrameStackError> {
    let shapes: Vec<NodeShape> = inputs.iter().map(|v| v.shape()).collect();
    node.validate(&shapes, true)?;

    let operands: Vec<Operand<'_, f64>> = inputs.iter().map(|v| v.operand()).collect();
    let plan = node.prepare_pass(&operands)?;
    let mut output = Matrix::zeros(0, 0);
    output.resize(plan.rows, plan.cols);
    node.evaluate(
        &AddressRange::all(),
        &operands,
        OperandMut::new(&mut output, plan.layout.as_ref()),
    )?;
    Ok(Value { matrix: output, layout: plan.layout })
}

/// Accumulates the gradient of `inputs[input_index]` into a fresh zero buffer.
#[allow(dead_code)]
pub fn backward<N: Transform>(
    node: &N,
    input_index: usize,
    input: &Value,
    output_gradient: &Value,
) -> Result<Matrix<f64>, FrameStackError> {
    let mut gradient = Matrix::zeros(input.matrix.rows(), input.matrix.cols());
    node.backpropagate(
        input_index,
        &AddressRange::all(),
        output_gradient.operand(),
        OperandMut::new(&mut gradient, input.layout.as_ref()),
    )?;
    Ok(gradient)
}

#[allow(dead_code)]
pub fn dot(a: &Matrix<f64>, b: &Matrix<f64>) -> f64 {
    a.as_slice().iter().zip(b.as_slice()).map(|(x, y)| x * y).sum()
}
