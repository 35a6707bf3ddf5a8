//! Metrics.
//!
//! Metrics are evaluation helpers; they do not participate in backprop.

use crate::{Error, Result, Tensor};

/// Running classification accuracy (argmax of prediction vs argmax of target).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accuracy {
    correct: usize,
    total: usize,
}

impl Accuracy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one prediction given its class indices.
    #[inline]
    pub fn record(&mut self, predicted: usize, target: usize) {
        if predicted == target {
            self.correct += 1;
        }
        self.total += 1;
    }

    /// Record one prediction given the raw tensors; returns whether it was correct.
    pub fn record_tensors(&mut self, pred: &Tensor, target: &Tensor) -> Result<bool> {
        let predicted = pred.max_idx()?;
        let expected = target.max_idx()?;
        self.record(predicted, expected);
        Ok(predicted == expected)
    }

    #[inline]
    pub fn correct(&self) -> usize {
        self.correct
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Accuracy in percent.
    ///
    /// Fails with [`Error::UndefinedAccuracy`] when nothing was recorded.
    pub fn percent(&self) -> Result<f32> {
        accuracy_percent(self.correct, self.total)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// `correct * 100 / total`, guarded against an empty set.
pub fn accuracy_percent(correct: usize, total: usize) -> Result<f32> {
    if total == 0 {
        return Err(Error::UndefinedAccuracy);
    }
    Ok(correct as f32 * 100.0 / total as f32)
}

/// Mean of the recorded values; `None` when empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    #[inline]
    pub fn push(&mut self, value: f32) {
        self.sum += f64::from(value);
        self.count += 1;
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f32> {
        (self.count > 0).then(|| (self.sum / self.count as f64) as f32)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
