//! Loss functions.
//!
//! Contract: [`Loss::backward`] returns the exact derivative of the value
//! [`Loss::forward`] computes, taken with respect to the predictions.
//! `CrossEntropy` expects probabilities (the output of a `Softmax` layer), so
//! its raw derivative `-t / (p + ε)` still has to go through the softmax
//! Jacobian. That product underflows once a probability drops below ε, so
//! [`Network::backward_loss`](crate::Network::backward_loss) skips it when the
//! network ends in `Softmax` and the loss is `CrossEntropy`, and seeds the
//! backward pass with [`softmax_cross_entropy_backward`] instead.
//!
//! Both losses treat the prediction as a matrix (see [`Tensor::rows`]).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result, Tensor};

/// Keeps `ln` finite when a predicted probability is exactly 0.
pub const CROSS_ENTROPY_EPS: f32 = 1e-7;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Supported loss functions.
pub enum Loss {
    /// Cross-entropy over probabilities, summed over classes and averaged
    /// over rows.
    #[default]
    CrossEntropy,
    /// Mean of squared errors over all elements.
    MeanSquaredError,
}

impl Loss {
    /// Scalar loss for `pred` against `target`.
    pub fn forward(self, pred: &Tensor, target: &Tensor) -> Result<f32> {
        check_shapes(pred, target)?;
        Ok(match self {
            Loss::CrossEntropy => cross_entropy(pred.as_slice(), target.as_slice(), pred.rows()),
            Loss::MeanSquaredError => mse(pred.as_slice(), target.as_slice()),
        })
    }

    /// Gradient of [`Loss::forward`] with respect to `pred`, shaped like `pred`.
    pub fn backward(self, pred: &Tensor, target: &Tensor) -> Result<Tensor> {
        check_shapes(pred, target)?;
        let mut d_pred = vec![0.0_f32; pred.len()];
        match self {
            Loss::CrossEntropy => cross_entropy_backward(
                pred.as_slice(),
                target.as_slice(),
                pred.rows(),
                &mut d_pred,
            ),
            Loss::MeanSquaredError => mse_backward(pred.as_slice(), target.as_slice(), &mut d_pred),
        }
        Tensor::new(pred.shape().to_vec(), d_pred)
    }
}

fn check_shapes(pred: &Tensor, target: &Tensor) -> Result<()> {
    if pred.shape() != target.shape() {
        return Err(Error::ShapeMismatch(format!(
            "prediction shape {:?} does not match target shape {:?}",
            pred.shape(),
            target.shape()
        )));
    }
    if pred.is_empty() {
        return Err(Error::EmptyTensor);
    }
    Ok(())
}

/// Cross-entropy: `-Σ t_i ln((p_i + ε) / (1 + ε))`, averaged over `rows`.
///
/// Dividing by `1 + ε` makes a perfect one-hot prediction score exactly 0
/// and keeps the loss non-negative for `p` in `[0, 1]`.
#[inline]
pub fn cross_entropy(probs: &[f32], target: &[f32], rows: usize) -> f32 {
    debug_assert_eq!(probs.len(), target.len());
    debug_assert!(rows > 0);

    let norm = 1.0 + CROSS_ENTROPY_EPS;
    let mut sum = 0.0_f32;
    for (&p, &t) in probs.iter().zip(target) {
        if t != 0.0 {
            sum -= t * ((p + CROSS_ENTROPY_EPS) / norm).ln();
        }
    }
    sum / rows as f32
}

/// Writes `d_probs[i] = -t_i / (p_i + ε) / rows`.
#[inline]
pub fn cross_entropy_backward(probs: &[f32], target: &[f32], rows: usize, d_probs: &mut [f32]) {
    debug_assert_eq!(probs.len(), target.len());
    debug_assert_eq!(probs.len(), d_probs.len());
    debug_assert!(rows > 0);

    let inv_rows = 1.0 / rows as f32;
    for ((d, &p), &t) in d_probs.iter_mut().zip(probs).zip(target) {
        *d = -t / (p + CROSS_ENTROPY_EPS) * inv_rows;
    }
}

/// Combined softmax + cross-entropy gradient with respect to the logits:
/// writes `d_logits[i] = (probs[i] - target[i]) / rows`.
#[inline]
pub fn softmax_cross_entropy_backward(
    probs: &[f32],
    target: &[f32],
    rows: usize,
    d_logits: &mut [f32],
) {
    debug_assert_eq!(probs.len(), target.len());
    debug_assert_eq!(probs.len(), d_logits.len());
    debug_assert!(rows > 0);

    let inv_rows = 1.0 / rows as f32;
    for ((d, &p), &t) in d_logits.iter_mut().zip(probs).zip(target) {
        *d = (p - t) * inv_rows;
    }
}

/// Mean squared error: `mean((pred - target)^2)`.
#[inline]
pub fn mse(pred: &[f32], target: &[f32]) -> f32 {
    debug_assert_eq!(pred.len(), target.len());
    debug_assert!(!pred.is_empty());

    let mut sum_sq = 0.0_f32;
    for (&p, &t) in pred.iter().zip(target) {
        let diff = p - t;
        sum_sq = diff.mul_add(diff, sum_sq);
    }
    sum_sq / pred.len() as f32
}

/// Writes `d_pred[i] = 2 * (pred[i] - target[i]) / N`.
#[inline]
pub fn mse_backward(pred: &[f32], target: &[f32], d_pred: &mut [f32]) {
    debug_assert_eq!(pred.len(), target.len());
    debug_assert_eq!(pred.len(), d_pred.len());

    let scale = 2.0 / pred.len() as f32;
    for ((d, &p), &t) in d_pred.iter_mut().zip(pred).zip(target) {
        *d = (p - t) * scale;
    }
}
