//! Covariance validation and eigen-decomposition.
use crate::config::Tolerance;
use crate::error::{invalid_covariance, Result};
use crate::util;
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::eigh::{EigValsh, Eigh};
use ndarray_linalg::solveh::UPLO;
use serde::{Deserialize, Serialize};

/// `true` iff `matrix` is a usable covariance: non-empty, square, finite,
/// symmetric and positive semi-definite (default tolerances).
///
/// Both checks are relative to the magnitude of the matrix itself, so a
/// valid covariance stays valid under any positive scaling.
pub fn is_valid_covariance(matrix: ArrayView2<f64>) -> bool {
    is_valid_covariance_with(matrix, &Tolerance::DEFAULT)
}

/// Like [`is_valid_covariance`] with explicit tolerances.
pub fn is_valid_covariance_with(matrix: ArrayView2<f64>, tolerance: &Tolerance) -> bool {
    check_covariance(matrix, tolerance).is_ok()
}

/// Validator with a reason attached, used by constructors and setters.
pub(crate) fn check_covariance(matrix: ArrayView2<f64>, tolerance: &Tolerance) -> Result<()> {
    let (rows, cols) = matrix.dim();
    if rows == 0 || rows != cols {
        return Err(invalid_covariance(format!(
            "expected a non-empty square matrix, got {}x{}",
            rows, cols
        )));
    }
    if matrix.iter().any(|x| !x.is_finite()) {
        return Err(invalid_covariance("matrix has non-finite entries"));
    }
    if !util::is_symmetric(matrix, tolerance.symmetry) {
        return Err(invalid_covariance("matrix is not symmetric"));
    }
    let eig_vals = matrix
        .eigvalsh(UPLO::Lower)
        .map_err(|e| invalid_covariance(format!("eigenvalues unavailable: {}", e)))?;
    let scale = eig_vals.fold(0., |acc: f64, x| acc.max(x.abs()));
    if let Some(min) = eig_vals.iter().cloned().find(|&x| x < -tolerance.eigenvalue * scale) {
        return Err(invalid_covariance(format!(
            "matrix is not positive semi-definite (eigenvalue {})",
            min
        )));
    }
    Ok(())
}

/// Orthonormal eigenbasis of a covariance matrix.
///
/// Column `i` of [`basis`](Self::basis) is the eigenvector paired with
/// `variances[i]`; variances are sorted in descending order, so the first
/// column is the principal axis. $\Sigma = B \operatorname{diag}(\lambda) B^T$.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CovarianceBasis {
    basis: Array2<f64>,
    variances: Array1<f64>,
}

impl CovarianceBasis {
    /// Decomposes a symmetric matrix. Only the lower triangle is read.
    pub fn decompose(covariance: ArrayView2<f64>) -> Result<Self> {
        if !covariance.is_square() {
            let (rows, cols) = covariance.dim();
            return Err(invalid_covariance(format!(
                "cannot decompose a {}x{} matrix",
                rows, cols
            )));
        }
        let (mut eig_vals, mut eig_vecs) = covariance.eigh(UPLO::Lower)?;
        // LAPACK returns ascending order
        let d = eig_vals.len();
        for i in 0..d / 2 {
            util::swap_cols(&mut eig_vecs, i, d - 1 - i);
            eig_vals.swap(i, d - 1 - i);
        }
        let mut clamped = 0;
        eig_vals.mapv_inplace(|x| {
            if x < 0. {
                clamped += 1;
                0.
            } else {
                x
            }
        });
        if clamped > 0 {
            debug!("clamped {} negative eigenvalue(s) to zero", clamped);
        }
        debug!("decomposed {}x{} covariance, variances {}", d, d, eig_vals);
        Ok(Self {
            basis: eig_vecs,
            variances: eig_vals,
        })
    }

    pub fn dim(&self) -> usize {
        self.variances.len()
    }

    /// Orthonormal matrix whose columns are the eigen-axes.
    pub fn basis(&self) -> ArrayView2<f64> {
        self.basis.view()
    }

    /// Variance along each eigen-axis.
    pub fn variances(&self) -> ArrayView1<f64> {
        self.variances.view()
    }

    pub fn std_devs(&self) -> Array1<f64> {
        self.variances.mapv(f64::sqrt)
    }

    /// Coordinates of `v` in the eigenbasis, $B^T v$.
    pub fn project(&self, v: ArrayView1<f64>) -> Array1<f64> {
        self.basis.t().dot(&v)
    }

    /// $B \operatorname{diag}(\lambda) B^T$
    pub fn reconstruct(&self) -> Array2<f64> {
        let scaled = &self.basis * &self.variances.view().insert_axis(Axis(0));
        scaled.dot(&self.basis.t())
    }
}
