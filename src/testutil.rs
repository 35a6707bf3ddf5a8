//! Helpers shared by the gradient-check tests.

use crate::Tensor;

pub(crate) fn assert_close(analytic: f32, numeric: f32, abs_tol: f32, rel_tol: f32) {
    let diff = (analytic - numeric).abs();
    let scale = analytic.abs().max(numeric.abs()).max(1.0);
    assert!(
        diff <= abs_tol || diff / scale <= rel_tol,
        "analytic={analytic} numeric={numeric} diff={diff}"
    );
}

/// Central-difference gradient of a scalar function of `x`, one element at a time.
pub(crate) fn numeric_grad<F>(x: &Tensor, mut f: F) -> Vec<f32>
where
    F: FnMut(&Tensor) -> f32,
{
    let eps = 1e-3_f32;
    let mut shifted = x.clone();
    let mut grad = Vec::with_capacity(x.len());
    for i in 0..x.len() {
        let orig = shifted.as_slice()[i];

        shifted.as_mut_slice()[i] = orig + eps;
        let plus = f(&shifted);
        shifted.as_mut_slice()[i] = orig - eps;
        let minus = f(&shifted);
        shifted.as_mut_slice()[i] = orig;

        grad.push((plus - minus) / (2.0 * eps));
    }
    grad
}
