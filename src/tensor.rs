//! Shaped `f32` buffers.
//!
//! A [`Tensor`] is a row-major buffer plus an immutable shape. Layers view a
//! tensor of any rank as a matrix: the last dimension gives the columns and
//! all leading dimensions are folded into rows. A rank-1 tensor is one row.

use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Build a tensor from a shape and a row-major buffer.
    ///
    /// Zero-sized dimensions are allowed and produce an empty tensor.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::InvalidShape("tensor rank must be >= 1".to_owned()));
        }
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::ShapeMismatch(format!(
                "shape {shape:?} holds {expected} elements, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: Vec<usize>) -> Result<Self> {
        let len = shape.iter().product();
        Self::new(shape, vec![0.0; len])
    }

    /// Build a `[rows, cols]` tensor from per-row vectors.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::ShapeMismatch(format!(
                    "row {i} has len {}, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Self::new(vec![rows.len(), cols], data)
    }

    /// Uniformly random tensor with every element in `[low, high)`.
    pub fn random<R: Rng + ?Sized>(
        shape: Vec<usize>,
        low: f32,
        high: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if shape.is_empty() || shape.contains(&0) {
            return Err(Error::InvalidShape(format!(
                "random tensor needs a non-empty shape with dims > 0, got {shape:?}"
            )));
        }
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(Error::InvalidConfig(format!(
                "random bounds must be finite with low < high, got [{low}, {high})"
            )));
        }

        let dist = Uniform::new(low, high);
        let len = shape.iter().product();
        let data = (0..len).map(|_| dist.sample(rng)).collect();
        Ok(Self { shape, data })
    }

    pub fn random_with_seed(shape: Vec<usize>, low: f32, high: f32, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::random(shape, low, high, &mut rng)
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Size of the last dimension.
    #[inline]
    pub fn cols(&self) -> usize {
        *self.shape.last().unwrap_or(&0)
    }

    /// Product of all leading dimensions (1 for a rank-1 tensor).
    #[inline]
    pub fn rows(&self) -> usize {
        self.shape[..self.shape.len().saturating_sub(1)]
            .iter()
            .product()
    }

    /// Returns the `i`-th row of the matrix view.
    ///
    /// Panics if `i >= self.rows()`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        let cols = self.cols();
        &self.data[i * cols..(i + 1) * cols]
    }

    /// Element at a multi-index.
    pub fn at(&self, index: &[usize]) -> Result<f32> {
        let flat = self.flat_index(index)?;
        Ok(self.data[flat])
    }

    pub fn set(&mut self, index: &[usize], value: f32) -> Result<()> {
        let flat = self.flat_index(index)?;
        self.data[flat] = value;
        Ok(())
    }

    /// Flat index of the first maximum element.
    ///
    /// NaN elements never win the comparison.
    pub fn max_idx(&self) -> Result<usize> {
        let (first, rest) = self.data.split_first().ok_or(Error::EmptyTensor)?;
        let mut best = 0;
        let mut best_val = *first;
        for (i, &v) in rest.iter().enumerate() {
            if v > best_val || best_val.is_nan() {
                best = i + 1;
                best_val = v;
            }
        }
        Ok(best)
    }

    fn flat_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.shape.len()
            || index.iter().zip(&self.shape).any(|(&i, &dim)| i >= dim)
        {
            return Err(Error::IndexOutOfRange {
                index: index.to_vec(),
                shape: self.shape.clone(),
            });
        }

        let mut flat = 0;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            flat = flat * dim + i;
        }
        Ok(flat)
    }
}
