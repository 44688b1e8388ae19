//! First-order (linearized) propagation of Gaussian uncertainty.
use crate::error::{invalid_argument, Result};
use crate::util;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// A differentiable vector function $f:\mathbb{R}^n\to\mathbb{R}^m$.
pub trait JacobianEvaluator {
    /// Number of input variables `n`.
    fn input_dim(&self) -> usize;

    /// $f(x)$ together with the $m\times n$ Jacobian $\partial f/\partial x$ at `x`.
    fn evaluate(&self, x: ArrayView1<f64>) -> Result<(Array1<f64>, Array2<f64>)>;
}

impl<T: JacobianEvaluator + ?Sized> JacobianEvaluator for &T {
    fn input_dim(&self) -> usize {
        (**self).input_dim()
    }

    fn evaluate(&self, x: ArrayView1<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
        (**self).evaluate(x)
    }
}

/// Adapts a closure returning `(f(x), J(x))` into a [`JacobianEvaluator`].
///
/// Inputs of the wrong length and Jacobians of the wrong shape are rejected.
#[derive(Clone, Debug)]
pub struct FnEvaluator<F> {
    input_dim: usize,
    f: F,
}

impl<F> FnEvaluator<F>
where
    F: Fn(ArrayView1<f64>) -> (Array1<f64>, Array2<f64>),
{
    pub fn new(input_dim: usize, f: F) -> Self {
        FnEvaluator { input_dim, f }
    }
}

impl<F> JacobianEvaluator for FnEvaluator<F>
where
    F: Fn(ArrayView1<f64>) -> (Array1<f64>, Array2<f64>),
{
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn evaluate(&self, x: ArrayView1<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
        if x.len() != self.input_dim {
            return Err(invalid_argument(format!(
                "function takes {} inputs, got {}",
                self.input_dim,
                x.len()
            )));
        }
        let (y, jacobian) = (self.f)(x);
        if jacobian.dim() != (y.len(), self.input_dim) {
            return Err(invalid_argument(format!(
                "expected a {}x{} jacobian, got {:?}",
                y.len(),
                self.input_dim,
                jacobian.dim()
            )));
        }
        Ok((y, jacobian))
    }
}

/// Mean $f(\mu)$ and covariance $J\Sigma J^T$ of `f` applied to
/// $N(\mu, \Sigma)$, to first order.
///
/// Exact for affine `f`; otherwise only accurate while $\Sigma$ is small
/// compared to the curvature of `f`.
pub fn linearize<E: JacobianEvaluator + ?Sized>(
    evaluator: &E,
    mean: ArrayView1<f64>,
    covariance: ArrayView2<f64>,
) -> Result<(Array1<f64>, Array2<f64>)> {
    let (y, jacobian) = evaluator.evaluate(mean)?;
    let (rows, cols) = covariance.dim();
    if rows != cols || jacobian.ncols() != rows || jacobian.nrows() != y.len() {
        return Err(invalid_argument(format!(
            "cannot propagate a {}x{} covariance through a {}x{} jacobian with {} outputs",
            rows,
            cols,
            jacobian.nrows(),
            jacobian.ncols(),
            y.len()
        )));
    }
    let propagated = jacobian.dot(&covariance).dot(&jacobian.t());
    Ok((y, util::symmetrize(&propagated)))
}
