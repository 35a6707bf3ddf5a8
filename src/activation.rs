//! Parameter-free activation layers.
//!
//! Both layers record the input shape of their last `forward`. The gradient
//! itself is computed from the `input` handed to `backward`, so a `predict`
//! in between cannot change it.

use crate::loss::softmax_cross_entropy_backward;
use crate::{Error, Result, Tensor};

/// Element-wise `max(0, x)`.
#[derive(Debug, Clone, Default)]
pub struct Relu {
    forward_shape: Option<Vec<usize>>,
}

impl Relu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward pass without touching the forward record.
    pub fn apply(&self, input: &Tensor) -> Result<Tensor> {
        let out = input.as_slice().iter().map(|&x| x.max(0.0)).collect();
        Tensor::new(input.shape().to_vec(), out)
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        let out = self.apply(input)?;
        self.forward_shape = Some(input.shape().to_vec());
        Ok(out)
    }

    /// `dL/dx = dL/dy` where `x > 0`, else 0 (including at `x == 0`).
    pub fn backward(&mut self, input: &Tensor, output_grad: &Tensor) -> Result<Tensor> {
        let forward_shape = self
            .forward_shape
            .as_deref()
            .ok_or(Error::MissingForward { layer: "relu" })?;
        if input.shape() != forward_shape || output_grad.shape() != input.shape() {
            return Err(Error::ShapeMismatch(format!(
                "relu backward: forward input {forward_shape:?}, input {:?}, output grad {:?}",
                input.shape(),
                output_grad.shape()
            )));
        }
        self.forward_shape = None;

        let d_input = input
            .as_slice()
            .iter()
            .zip(output_grad.as_slice())
            .map(|(&x, &g)| if x > 0.0 { g } else { 0.0 })
            .collect();
        Tensor::new(input.shape().to_vec(), d_input)
    }
}

/// Row-wise softmax over the last dimension.
#[derive(Debug, Clone, Default)]
pub struct Softmax {
    forward_shape: Option<Vec<usize>>,
}

impl Softmax {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward pass without touching the forward record.
    pub fn apply(&self, input: &Tensor) -> Result<Tensor> {
        if input.is_empty() {
            return Err(Error::EmptyTensor);
        }

        let cols = input.cols();
        let mut out = Vec::with_capacity(input.len());
        for r in 0..input.rows() {
            let row = input.row(r);
            // Shift by the row max for numerical stability.
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let start = out.len();
            let mut sum = 0.0_f32;
            for &x in row {
                let e = (x - max).exp();
                sum += e;
                out.push(e);
            }
            let inv_sum = 1.0 / sum;
            for v in &mut out[start..start + cols] {
                *v *= inv_sum;
            }
        }
        Tensor::new(input.shape().to_vec(), out)
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        let out = self.apply(input)?;
        self.forward_shape = Some(input.shape().to_vec());
        Ok(out)
    }

    /// Jacobian-vector product: `dL/dx_i = y_i * (dL/dy_i - Σ_j y_j dL/dy_j)`,
    /// with `y` recomputed from `input`.
    pub fn backward(&mut self, input: &Tensor, output_grad: &Tensor) -> Result<Tensor> {
        self.check_backward(input, output_grad)?;
        let output = self.apply(input)?;

        let mut d_input = Vec::with_capacity(output.len());
        for r in 0..output.rows() {
            let y = output.row(r);
            let g = output_grad.row(r);
            let dot = y.iter().zip(g).fold(0.0_f32, |acc, (&y, &g)| y.mul_add(g, acc));
            d_input.extend(y.iter().zip(g).map(|(&y, &g)| y * (g - dot)));
        }
        Tensor::new(output.shape().to_vec(), d_input)
    }

    /// Backward of softmax followed by cross-entropy, taken directly with
    /// respect to the logits: `(softmax(input) - target) / rows`.
    ///
    /// Stays exact when the output saturates, where the product of the raw
    /// cross-entropy gradient and the Jacobian underflows.
    pub fn backward_cross_entropy(&mut self, input: &Tensor, target: &Tensor) -> Result<Tensor> {
        self.check_backward(input, target)?;
        let probs = self.apply(input)?;

        let mut d_input = vec![0.0_f32; probs.len()];
        softmax_cross_entropy_backward(
            probs.as_slice(),
            target.as_slice(),
            probs.rows(),
            &mut d_input,
        );
        Tensor::new(probs.shape().to_vec(), d_input)
    }

    /// Validates shapes, then consumes the forward record.
    fn check_backward(&mut self, input: &Tensor, other: &Tensor) -> Result<()> {
        let forward_shape = self
            .forward_shape
            .as_deref()
            .ok_or(Error::MissingForward { layer: "softmax" })?;
        if input.shape() != forward_shape || other.shape() != input.shape() {
            return Err(Error::ShapeMismatch(format!(
                "softmax backward: forward input {forward_shape:?}, input {:?}, grad/target {:?}",
                input.shape(),
                other.shape()
            )));
        }
        self.forward_shape = None;
        Ok(())
    }
}
