//! Correlated Gaussian sampling.
use crate::config::Tolerance;
use crate::covariance::{check_covariance, CovarianceBasis};
use crate::distributions::MultivariateNormal;
use crate::error::{invalid_argument, Result};
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use ndarray_linalg::cholesky::Cholesky;
use ndarray_linalg::solveh::UPLO;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use ndarray_stats::CorrelationExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Matrix `L` with $LL^T = \Sigma$.
///
/// Lower Cholesky factor when it exists; singular (semi-definite)
/// covariances fall back to $B\operatorname{diag}(\sqrt{\lambda})$ from the
/// eigenbasis.
pub fn covariance_factor(covariance: ArrayView2<f64>) -> Result<Array2<f64>> {
    match covariance.cholesky(UPLO::Lower) {
        Ok(lower) => Ok(lower),
        Err(e) => {
            debug!("cholesky failed ({}), factoring through the eigenbasis", e);
            let basis = CovarianceBasis::decompose(covariance)?;
            Ok(&basis.basis() * &basis.std_devs().insert_axis(Axis(0)))
        }
    }
}

/// Draws $\mu + Lz$ with $z\sim N(0, I)$ from an owned random source.
///
/// The sampler is also an endless [`Iterator`] over samples.
#[derive(Clone, Debug)]
pub struct MultivariateGaussianSampler<R: Rng = StdRng> {
    rng: R,
    mean: Array1<f64>,
    factor: Array2<f64>,
}

impl MultivariateGaussianSampler<StdRng> {
    /// Reproducible sampler seeded through [`StdRng::seed_from_u64`].
    pub fn seeded(seed: u64, mean: Array1<f64>, covariance: Array2<f64>) -> Result<Self> {
        Self::new(StdRng::seed_from_u64(seed), mean, covariance)
    }
}

impl<R: Rng> MultivariateGaussianSampler<R> {
    pub fn new(rng: R, mean: Array1<f64>, covariance: Array2<f64>) -> Result<Self> {
        if mean.is_empty() {
            return Err(invalid_argument("mean must not be empty"));
        }
        check_covariance(covariance.view(), &Tolerance::DEFAULT)?;
        if mean.len() != covariance.nrows() {
            return Err(invalid_argument(format!(
                "mean has {} entries but covariance is {}x{}",
                mean.len(),
                covariance.nrows(),
                covariance.ncols()
            )));
        }
        let factor = covariance_factor(covariance.view())?;
        Ok(Self { rng, mean, factor })
    }

    /// Samples `distribution`, which must be ready.
    pub fn from_distribution(rng: R, distribution: &MultivariateNormal) -> Result<Self> {
        distribution.ensure_ready()?;
        let factor = covariance_factor(distribution.covariance())?;
        Ok(Self {
            rng,
            mean: distribution.mean().to_owned(),
            factor,
        })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> ArrayView1<f64> {
        self.mean.view()
    }

    /// The factor `L` used to correlate the draws.
    pub fn factor(&self) -> ArrayView2<f64> {
        self.factor.view()
    }

    pub fn draw(&mut self) -> Array1<f64> {
        let ind_sample = Array1::random_using(self.dim(), StandardNormal, &mut self.rng);
        &self.mean + self.factor.dot(&ind_sample)
    }

    /// [`draw`](Self::draw) into caller-provided storage of length `d`.
    pub fn draw_into(&mut self, mut out: ArrayViewMut1<f64>) -> Result<()> {
        if out.len() != self.dim() {
            return Err(invalid_argument(format!(
                "output has length {}, sampler dimension is {}",
                out.len(),
                self.dim()
            )));
        }
        let ind_sample = Array1::random_using(self.dim(), StandardNormal, &mut self.rng);
        out.assign(&self.mean);
        out += &self.factor.dot(&ind_sample);
        Ok(())
    }

    /// `n` samples, one per row.
    pub fn sample_n(&mut self, n: usize) -> Array2<f64> {
        let ind_samples = Array2::random_using((n, self.dim()), StandardNormal, &mut self.rng);
        ind_samples.dot(&self.factor.t()) + &self.mean.view().insert_axis(Axis(0))
    }
}

impl<R: Rng> Iterator for MultivariateGaussianSampler<R> {
    type Item = Array1<f64>;

    fn next(&mut self) -> Option<Array1<f64>> {
        Some(self.draw())
    }
}

/// Empirical mean and covariance (`ddof = 1`) of samples stored one per row.
pub fn sample_moments(samples: ArrayView2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    if samples.nrows() < 2 || samples.ncols() == 0 {
        return Err(invalid_argument(format!(
            "need at least two non-empty samples, got {}x{}",
            samples.nrows(),
            samples.ncols()
        )));
    }
    let mean = samples
        .mean_axis(Axis(0))
        .ok_or_else(|| invalid_argument("no samples"))?;
    let covariance = samples
        .t()
        .cov(1.)
        .map_err(|e| invalid_argument(e.to_string()))?;
    Ok((mean, covariance))
}
