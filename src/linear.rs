//! Fully connected layer without bias: `y = x · W`.
//!
//! Shapes:
//! - weights: `(in_dim, out_dim)`, row-major
//! - input: `(.., in_dim)`, folded into `rows` rows
//! - output: `(.., out_dim)`
//! - `backward` returns `dL/dx` with the input's shape and stores
//!   `dL/dW = xᵀ · dL/dy` (summed over rows) until `update_weights`.

use rand::Rng;

use crate::matmul::gemm_f32;
use crate::{Error, Init, Result, Tensor};

#[derive(Debug, Clone)]
pub struct Linear {
    in_dim: usize,
    out_dim: usize,
    weights: Tensor,
    weight_grad: Option<Tensor>,
    forward_shape: Option<Vec<usize>>,
}

impl Linear {
    /// Wrap an existing `(in_dim, out_dim)` weight matrix.
    pub fn new(weights: Tensor) -> Result<Self> {
        let &[in_dim, out_dim] = weights.shape() else {
            return Err(Error::InvalidShape(format!(
                "linear weights must be rank 2, got shape {:?}",
                weights.shape()
            )));
        };
        if in_dim == 0 || out_dim == 0 {
            return Err(Error::InvalidShape(format!(
                "linear weights must have dims > 0, got ({in_dim}, {out_dim})"
            )));
        }
        Ok(Self {
            in_dim,
            out_dim,
            weights,
            weight_grad: None,
            forward_shape: None,
        })
    }

    pub fn random<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        init: Init,
        rng: &mut R,
    ) -> Result<Self> {
        let (low, high) = init.bounds(in_dim, out_dim);
        Self::new(Tensor::random(vec![in_dim, out_dim], low, high, rng)?)
    }

    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    #[inline]
    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    #[inline]
    pub fn weights_mut(&mut self) -> &mut Tensor {
        &mut self.weights
    }

    /// Gradient produced by the last `backward`, if not yet applied.
    #[inline]
    pub fn weight_grad(&self) -> Option<&Tensor> {
        self.weight_grad.as_ref()
    }

    /// Forward pass without touching the forward record.
    pub fn apply(&self, input: &Tensor) -> Result<Tensor> {
        if input.cols() != self.in_dim {
            return Err(Error::ShapeMismatch(format!(
                "linear expects trailing dim {}, got input shape {:?}",
                self.in_dim,
                input.shape()
            )));
        }

        let rows = input.rows();
        let mut shape = input.shape().to_vec();
        if let Some(last) = shape.last_mut() {
            *last = self.out_dim;
        }
        let mut out = vec![0.0_f32; rows * self.out_dim];

        gemm_f32(
            rows,
            self.out_dim,
            self.in_dim,
            1.0,
            input.as_slice(),
            self.in_dim,
            1,
            self.weights.as_slice(),
            self.out_dim,
            1,
            0.0,
            &mut out,
            self.out_dim,
            1,
        );

        Tensor::new(shape, out)
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        let out = self.apply(input)?;
        self.forward_shape = Some(input.shape().to_vec());
        Ok(out)
    }

    /// `input` must be the tensor passed to the matching `forward`.
    pub fn backward(&mut self, input: &Tensor, output_grad: &Tensor) -> Result<Tensor> {
        let forward_shape = self
            .forward_shape
            .as_deref()
            .ok_or(Error::MissingForward { layer: "linear" })?;
        if input.shape() != forward_shape {
            return Err(Error::ShapeMismatch(format!(
                "linear backward input shape {:?} differs from forward input shape {forward_shape:?}",
                input.shape()
            )));
        }

        let rows = input.rows();
        if output_grad.cols() != self.out_dim || output_grad.rows() != rows {
            return Err(Error::ShapeMismatch(format!(
                "linear expects output grad of {rows} rows x {} cols, got shape {:?}",
                self.out_dim,
                output_grad.shape()
            )));
        }
        self.forward_shape = None;

        // dL/dx = dL/dy · Wᵀ
        let mut d_input = vec![0.0_f32; rows * self.in_dim];
        gemm_f32(
            rows,
            self.in_dim,
            self.out_dim,
            1.0,
            output_grad.as_slice(),
            self.out_dim,
            1,
            self.weights.as_slice(),
            1,
            self.out_dim,
            0.0,
            &mut d_input,
            self.in_dim,
            1,
        );

        // dL/dW = xᵀ · dL/dy
        let mut d_weights = vec![0.0_f32; self.in_dim * self.out_dim];
        gemm_f32(
            self.in_dim,
            self.out_dim,
            rows,
            1.0,
            input.as_slice(),
            1,
            self.in_dim,
            output_grad.as_slice(),
            self.out_dim,
            1,
            0.0,
            &mut d_weights,
            self.out_dim,
            1,
        );

        self.weight_grad = Some(Tensor::new(vec![self.in_dim, self.out_dim], d_weights)?);
        Tensor::new(input.shape().to_vec(), d_input)
    }

    /// Plain gradient step: `W -= lr * dL/dW`.
    ///
    /// Consumes the pending gradient, so a second call without another
    /// `backward` fails with [`Error::NoGradientAvailable`].
    pub fn update_weights(&mut self, lr: f32) -> Result<()> {
        if !(lr.is_finite() && lr > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {lr}"
            )));
        }
        let grad = self.weight_grad.take().ok_or(Error::NoGradientAvailable)?;
        for (w, &g) in self.weights.as_mut_slice().iter_mut().zip(grad.as_slice()) {
            *w -= lr * g;
        }
        Ok(())
    }
}
