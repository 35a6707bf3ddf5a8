//! The layer enum the network walks over.
//!
//! Every variant follows the same contract:
//!
//! - `forward(x)` returns a fresh output tensor and records what `backward`
//!   needs.
//! - `backward(x, dL/dy)` takes the same `x` that was passed to `forward` and
//!   returns `dL/dx` with the shape of `x`. It consumes the forward record, so
//!   each forward is matched by at most one backward.
//! - `update_weights(lr)` applies the gradient from the last backward.
//!   Parameter-free layers treat it as a no-op.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Linear, Relu, Result, Softmax, Tensor};

/// Weight initializer for linear layers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Init {
    /// Uniform in `[low, high)`.
    Uniform { low: f32, high: f32 },
    /// Xavier/Glorot uniform: `±sqrt(6 / (in + out))`.
    Xavier,
    /// He/Kaiming uniform: `±sqrt(6 / in)`.
    He,
}

impl Init {
    pub(crate) fn bounds(self, in_dim: usize, out_dim: usize) -> (f32, f32) {
        match self {
            Init::Uniform { low, high } => (low, high),
            Init::Xavier => {
                let limit = (6.0 / (in_dim + out_dim).max(1) as f32).sqrt();
                (-limit, limit)
            }
            Init::He => {
                let limit = (6.0 / in_dim.max(1) as f32).sqrt();
                (-limit, limit)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Layer {
    Linear(Linear),
    Relu(Relu),
    Softmax(Softmax),
}

impl Layer {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Linear(_) => "linear",
            Layer::Relu(_) => "relu",
            Layer::Softmax(_) => "softmax",
        }
    }

    #[inline]
    pub fn is_parameterized(&self) -> bool {
        matches!(self, Layer::Linear(_))
    }

    /// Forward pass that leaves the forward record untouched.
    pub fn apply(&self, input: &Tensor) -> Result<Tensor> {
        match self {
            Layer::Linear(l) => l.apply(input),
            Layer::Relu(l) => l.apply(input),
            Layer::Softmax(l) => l.apply(input),
        }
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        match self {
            Layer::Linear(l) => l.forward(input),
            Layer::Relu(l) => l.forward(input),
            Layer::Softmax(l) => l.forward(input),
        }
    }

    pub fn backward(&mut self, input: &Tensor, output_grad: &Tensor) -> Result<Tensor> {
        match self {
            Layer::Linear(l) => l.backward(input, output_grad),
            Layer::Relu(l) => l.backward(input, output_grad),
            Layer::Softmax(l) => l.backward(input, output_grad),
        }
    }

    pub fn update_weights(&mut self, lr: f32) -> Result<()> {
        match self {
            Layer::Linear(l) => l.update_weights(lr),
            Layer::Relu(_) | Layer::Softmax(_) => Ok(()),
        }
    }

    #[inline]
    pub fn as_linear(&self) -> Option<&Linear> {
        match self {
            Layer::Linear(l) => Some(l),
            _ => None,
        }
    }

    #[inline]
    pub fn as_linear_mut(&mut self) -> Option<&mut Linear> {
        match self {
            Layer::Linear(l) => Some(l),
            _ => None,
        }
    }
}

impl From<Linear> for Layer {
    fn from(value: Linear) -> Self {
        Layer::Linear(value)
    }
}

impl From<Relu> for Layer {
    fn from(value: Relu) -> Self {
        Layer::Relu(value)
    }
}

impl From<Softmax> for Layer {
    fn from(value: Softmax) -> Self {
        Layer::Softmax(value)
    }
}
