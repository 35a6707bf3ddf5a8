//! Dataset collaborator.
//!
//! The training loop only needs random access to labeled samples, expressed by
//! [`DataSource`]. [`Dataset`] is the in-memory implementation: inputs and
//! targets are stored contiguously in row-major layout and handed out as
//! `[1, dim]` tensors.

use crate::{Error, Result, Tensor};

/// One labeled example. For classification `target` is one-hot.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub input: Tensor,
    pub target: Tensor,
}

/// Random-access source of samples.
pub trait DataSource {
    /// Number of samples.
    fn len(&self) -> usize;

    /// The `index`-th sample; fails with [`Error::IndexOutOfRange`] when
    /// `index >= self.len()`.
    fn sample(&self, index: usize) -> Result<Sample>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    inputs: Vec<f32>,
    targets: Vec<f32>,
    len: usize,
    input_dim: usize,
    target_dim: usize,
}

impl Dataset {
    /// Build a dataset from flat buffers.
    ///
    /// `inputs` is `(len, input_dim)` and `targets` is `(len, target_dim)`.
    pub fn from_flat(
        inputs: Vec<f32>,
        targets: Vec<f32>,
        input_dim: usize,
        target_dim: usize,
    ) -> Result<Self> {
        if input_dim == 0 || target_dim == 0 {
            return Err(Error::InvalidData(format!(
                "input_dim and target_dim must be > 0, got {input_dim} and {target_dim}"
            )));
        }
        if !inputs.len().is_multiple_of(input_dim) {
            return Err(Error::InvalidData(format!(
                "inputs length {} is not divisible by input_dim {input_dim}",
                inputs.len()
            )));
        }

        let len = inputs.len() / input_dim;
        if targets.len() != len * target_dim {
            return Err(Error::InvalidData(format!(
                "targets length {} does not match len * target_dim ({len} * {target_dim})",
                targets.len()
            )));
        }

        Ok(Self {
            inputs,
            targets,
            len,
            input_dim,
            target_dim,
        })
    }

    /// Build a dataset from per-sample rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f32>], targets: &[Vec<f32>]) -> Result<Self> {
        if inputs.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "inputs/targets length mismatch: {} vs {}",
                inputs.len(),
                targets.len()
            )));
        }

        let input_dim = inputs.first().map(|r| r.len()).unwrap_or(0);
        let target_dim = targets.first().map(|r| r.len()).unwrap_or(0);
        let inputs = flatten(inputs, input_dim, "input")?;
        let targets = flatten(targets, target_dim, "target")?;
        Self::from_flat(inputs, targets, input_dim, target_dim)
    }

    /// A dataset with no samples.
    pub fn empty(input_dim: usize, target_dim: usize) -> Result<Self> {
        Self::from_flat(Vec::new(), Vec::new(), input_dim, target_dim)
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn target_dim(&self) -> usize {
        self.target_dim
    }

    /// Raw `idx`-th input row.
    ///
    /// Panics if `idx >= len`.
    #[inline]
    pub fn input(&self, idx: usize) -> &[f32] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    /// Raw `idx`-th target row.
    ///
    /// Panics if `idx >= len`.
    #[inline]
    pub fn target(&self, idx: usize) -> &[f32] {
        let start = idx * self.target_dim;
        &self.targets[start..start + self.target_dim]
    }
}

impl DataSource for Dataset {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn sample(&self, index: usize) -> Result<Sample> {
        if index >= self.len {
            return Err(Error::IndexOutOfRange {
                index: vec![index],
                shape: vec![self.len],
            });
        }
        Ok(Sample {
            input: Tensor::new(vec![1, self.input_dim], self.input(index).to_vec())?,
            target: Tensor::new(vec![1, self.target_dim], self.target(index).to_vec())?,
        })
    }
}

fn flatten(rows: &[Vec<f32>], dim: usize, what: &str) -> Result<Vec<f32>> {
    let mut flat = Vec::with_capacity(rows.len() * dim);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != dim {
            return Err(Error::InvalidData(format!(
                "{what} row {i} has len {}, expected {dim}",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }
    Ok(flat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_from_flat_validates_shapes() {
        let ok = Dataset::from_flat(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0], 2, 1);
        assert!(ok.is_ok());

        let err = Dataset::from_flat(vec![0.0, 1.0, 2.0], vec![0.0], 2, 1);
        assert!(err.is_err());
    }

    #[test]
    fn sample_returns_row_tensors() {
        let ds = Dataset::from_rows(
            &[vec![0.0, 1.0], vec![2.0, 3.0]],
            &[vec![1.0, 0.0], vec![0.0, 1.0]],
        )
        .unwrap();
        assert_eq!(ds.len(), 2);

        let s = ds.sample(1).unwrap();
        assert_eq!(s.input.shape(), &[1, 2]);
        assert_eq!(s.input.as_slice(), &[2.0, 3.0]);
        assert_eq!(s.target.max_idx().unwrap(), 1);
    }

    #[test]
    fn sample_out_of_range_fails() {
        let ds = Dataset::from_rows(&[vec![0.0]], &[vec![1.0]]).unwrap();
        assert!(matches!(
            ds.sample(1),
            Err(Error::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn empty_dataset_has_no_samples() {
        let ds = Dataset::empty(3, 2).unwrap();
        assert!(ds.is_empty());
        assert!(ds.sample(0).is_err());
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let err = Dataset::from_rows(&[vec![0.0, 1.0], vec![2.0]], &[vec![1.0], vec![0.0]]);
        assert!(matches!(err, Err(Error::InvalidData(_))));
    }
}
