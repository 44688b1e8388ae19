//! `mvnormal` provides a multivariate Normal distribution with full
//! covariance: density, eigenbasis CDF and its inverse, Mahalanobis
//! distance, correlated sampling and first-order propagation of uncertainty
//! through differentiable functions.
//!
//! The CDF treats the distribution as independent along the eigen-axes of
//! its covariance, i.e. it is the probability of the whitened coordinates
//! all lying below those of `x`. This makes it exactly invertible.
//!
//! ```no_run
//! use mvnormal::MultivariateNormal;
//! use ndarray::array;
//!
//! let dist = MultivariateNormal::new(array![0., 1.], array![[2., 0.5], [0.5, 1.]])?;
//! let x = dist.inv_cdf(array![0.9, 0.2].view())?;
//! assert!((dist.cdf(x.view())? - 0.18).abs() < 1e-9);
//! # Ok::<(), mvnormal::MvnError>(())
//! ```
#[cfg(feature = "blas-src")]
extern crate blas_src;
extern crate ndarray;
extern crate ndarray_linalg;
extern crate ndarray_rand;
extern crate ndarray_stats;
extern crate statrs;

pub mod config;
pub mod covariance;
pub mod distributions;
pub mod error;
pub mod normal;
pub mod propagation;
pub mod sampler;
mod util;

pub use config::Tolerance;
pub use covariance::{is_valid_covariance, is_valid_covariance_with, CovarianceBasis};
pub use distributions::{joint_probability, MultivariateNormal};
pub use error::{MvnError, Result};
pub use propagation::{FnEvaluator, JacobianEvaluator};
pub use sampler::{sample_moments, MultivariateGaussianSampler};

/// `erf`/`erfc` family of error functions
///
/// Re-exported from [statrs](https://crates.io/crates/statrs)
pub mod gauss {
    pub use statrs::function::erf::{erf, erf_inv, erfc, erfc_inv};
}
