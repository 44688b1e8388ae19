//! Error taxonomy shared by every operation in the crate.
use ndarray_linalg::error::LinalgError;
use thiserror::Error;

/// Everything that can go wrong while building or evaluating a distribution.
#[derive(Error, Debug)]
pub enum MvnError {
    /// Malformed input shape: wrong vector length, empty vector, zero
    /// dimension, or a probability outside of `(0, 1)`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The matrix is not square, not symmetric or not positive semi-definite.
    #[error("invalid covariance matrix: {0}")]
    InvalidCovariance(String),
    /// Mean and covariance dimensions disagree, so nothing can be evaluated.
    #[error("distribution is not ready: mean has {mean} entries, covariance is {rows}x{cols}")]
    NotReady {
        mean: usize,
        rows: usize,
        cols: usize,
    },
    /// The covariance has (numerically) zero variance along some axis and
    /// cannot be inverted.
    #[error("covariance matrix is singular")]
    Singular,
    /// Failure reported by the LAPACK back-end.
    #[error(transparent)]
    Linalg(#[from] LinalgError),
}

pub type Result<T> = std::result::Result<T, MvnError>;

pub(crate) fn invalid_argument(message: impl Into<String>) -> MvnError {
    MvnError::InvalidArgument(message.into())
}

pub(crate) fn invalid_covariance(message: impl Into<String>) -> MvnError {
    MvnError::InvalidCovariance(message.into())
}
