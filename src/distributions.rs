//! High level distributions
use crate::config::Tolerance;
use crate::covariance::{check_covariance, CovarianceBasis};
use crate::error::{invalid_argument, MvnError, Result};
use crate::normal;
use crate::propagation::{self, JacobianEvaluator};
use crate::sampler;
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Zip};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use num::traits::FloatConst;
use rand::prelude::Distribution;
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

/// Product of per-axis probabilities, the joint probability of independent
/// events.
pub fn joint_probability(p: ArrayView1<f64>) -> f64 {
    p.product()
}

/// Multivariate normal distribution with full covariance
///
/// Mean and covariance are owned copies; the dimensions only have to agree
/// once something is evaluated (see [`is_ready`](Self::is_ready)). The
/// eigenbasis of the covariance is computed on first use and cached until
/// the covariance changes.
#[derive(Clone, Debug)]
pub struct MultivariateNormal {
    mean: Array1<f64>,
    covariance: Array2<f64>,
    tolerance: Tolerance,
    basis: RefCell<Option<Rc<CovarianceBasis>>>,
}

impl Default for MultivariateNormal {
    fn default() -> Self {
        Self::standard()
    }
}

impl MultivariateNormal {
    /// One-dimensional standard normal.
    pub fn standard() -> Self {
        Self::from_parts(Array1::zeros(1), Array2::eye(1))
    }

    /// Standard normal in `d` dimensions: zero mean, identity covariance.
    pub fn with_dimension(d: usize) -> Result<Self> {
        if d < 1 {
            return Err(invalid_argument("dimension must be at least 1"));
        }
        Ok(Self::from_parts(Array1::zeros(d), Array2::eye(d)))
    }

    /// Validates `covariance` before taking ownership of both arrays.
    pub fn new(mean: Array1<f64>, covariance: Array2<f64>) -> Result<Self> {
        check_mean(&mean)?;
        check_covariance(covariance.view(), &Tolerance::DEFAULT)?;
        Ok(Self::from_parts(mean, covariance))
    }

    /// Like [`new`](Self::new) but trusts the caller that `covariance` is
    /// symmetric positive semi-definite.
    pub fn new_unchecked(mean: Array1<f64>, covariance: Array2<f64>) -> Result<Self> {
        check_mean(&mean)?;
        Ok(Self::from_parts(mean, covariance))
    }

    fn from_parts(mean: Array1<f64>, covariance: Array2<f64>) -> Self {
        MultivariateNormal {
            mean,
            covariance,
            tolerance: Tolerance::DEFAULT,
            basis: RefCell::new(None),
        }
    }

    /// Tolerances used by later validation and singularity checks.
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    pub fn mean(&self) -> ArrayView1<f64> {
        self.mean.view()
    }

    pub fn covariance(&self) -> ArrayView2<f64> {
        self.covariance.view()
    }

    /// Dimension of the mean vector.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn set_mean(&mut self, mean: Array1<f64>) -> Result<()> {
        check_mean(&mean)?;
        self.mean = mean;
        Ok(())
    }

    pub fn set_covariance(&mut self, covariance: Array2<f64>) -> Result<()> {
        check_covariance(covariance.view(), &self.tolerance)?;
        self.set_covariance_unchecked(covariance);
        Ok(())
    }

    pub fn set_covariance_unchecked(&mut self, covariance: Array2<f64>) {
        self.covariance = covariance;
        self.basis.replace(None);
    }

    /// `true` iff the mean length matches both covariance dimensions.
    pub fn is_ready(&self) -> bool {
        let (rows, cols) = self.covariance.dim();
        self.mean.len() == rows && rows == cols
    }

    pub(crate) fn ensure_ready(&self) -> Result<usize> {
        if self.is_ready() {
            Ok(self.mean.len())
        } else {
            let (rows, cols) = self.covariance.dim();
            Err(MvnError::NotReady {
                mean: self.mean.len(),
                rows,
                cols,
            })
        }
    }

    fn check_point(&self, x: ArrayView1<f64>) -> Result<usize> {
        let d = self.ensure_ready()?;
        if x.len() != d {
            return Err(invalid_argument(format!(
                "expected a point of dimension {}, got {}",
                d,
                x.len()
            )));
        }
        Ok(d)
    }

    fn cached_basis(&self) -> Result<Rc<CovarianceBasis>> {
        if let Some(basis) = self.basis.borrow().as_ref() {
            return Ok(Rc::clone(basis));
        }
        let basis = Rc::new(CovarianceBasis::decompose(self.covariance.view())?);
        self.basis.replace(Some(Rc::clone(&basis)));
        Ok(basis)
    }

    /// (Re)computes the eigenbasis of the covariance, caches it and returns
    /// a copy.
    pub fn process_covariance(&self) -> Result<CovarianceBasis> {
        let basis = CovarianceBasis::decompose(self.covariance.view())?;
        self.basis.replace(Some(Rc::new(basis.clone())));
        Ok(basis)
    }

    /// Coordinates of `x - mean` along each eigen-axis in standard deviations,
    /// together with $\ln|\Sigma|$. Fails on singular covariances.
    fn whiten(&self, x: ArrayView1<f64>) -> Result<(Array1<f64>, f64)> {
        self.check_point(x)?;
        let basis = self.cached_basis()?;
        let variances = basis.variances();
        let largest = variances.fold(0., |acc: f64, &v| acc.max(v));
        if variances
            .iter()
            .any(|&v| v <= self.tolerance.eigenvalue * largest)
        {
            return Err(MvnError::Singular);
        }
        let dev = &x - &self.mean;
        let z = basis.project(dev.view()) / variances.mapv(f64::sqrt);
        let logdet = variances.mapv(f64::ln).sum();
        Ok((z, logdet))
    }

    pub fn squared_mahalanobis_distance(&self, x: ArrayView1<f64>) -> Result<f64> {
        let (z, _) = self.whiten(x)?;
        Ok(z.dot(&z))
    }

    pub fn mahalanobis_distance(&self, x: ArrayView1<f64>) -> Result<f64> {
        self.squared_mahalanobis_distance(x).map(f64::sqrt)
    }

    // Source: <http://gregorygundersen.com/blog/2019/10/30/scipy-multivariate/>
    pub fn log_density(&self, x: ArrayView1<f64>) -> Result<f64> {
        let (z, logdet) = self.whiten(x)?;
        let maha_dist = z.dot(&z);
        Ok(-0.5 * ((z.len() as f64) * f64::TAU().ln() + maha_dist + logdet))
    }

    /// $(2\pi)^{-d/2}|\Sigma|^{-1/2}\exp(-\frac{1}{2}(x-\mu)^T\Sigma^{-1}(x-\mu))$
    pub fn density(&self, x: ArrayView1<f64>) -> Result<f64> {
        self.log_density(x).map(f64::exp)
    }

    /// Per-axis standard scores of `x` in the eigenbasis. Axes without
    /// variance score $\pm\infty$, or 0 when `x` sits on the mean along them.
    fn axis_scores(
        &self,
        x: ArrayView1<f64>,
        basis_out: Option<&mut CovarianceBasis>,
    ) -> Result<Array1<f64>> {
        self.check_point(x)?;
        let basis = self.cached_basis()?;
        let variances = basis.variances();
        let largest = variances.fold(0., |acc: f64, &v| acc.max(v));
        let degenerate = self.tolerance.eigenvalue * largest;
        let on_mean = (self.tolerance.eigenvalue * largest).sqrt();
        let dev = &x - &self.mean;
        let scores = Zip::from(&basis.project(dev.view()))
            .and(variances)
            .map_collect(|&proj, &var| {
                if var > degenerate {
                    proj / var.sqrt()
                } else if proj.abs() <= on_mean {
                    0.
                } else {
                    proj.signum() * f64::INFINITY
                }
            });
        if let Some(out) = basis_out {
            *out = (*basis).clone();
        }
        Ok(scores)
    }

    /// Probability mass below `x` with every eigen-axis treated as an
    /// independent normal: $\prod_i \Phi(b_i^T(x-\mu)/\sqrt{\lambda_i})$.
    pub fn cdf(&self, x: ArrayView1<f64>) -> Result<f64> {
        Ok(self.axis_scores(x, None)?.mapv(normal::cdf).product())
    }

    /// [`cdf`](Self::cdf) that also copies the eigenbasis it used into
    /// `basis_out`.
    pub fn cdf_with_basis(
        &self,
        x: ArrayView1<f64>,
        basis_out: &mut CovarianceBasis,
    ) -> Result<f64> {
        Ok(self
            .axis_scores(x, Some(basis_out))?
            .mapv(normal::cdf)
            .product())
    }

    /// Natural log of [`cdf`](Self::cdf), stays finite in dimensions where
    /// the product underflows.
    pub fn ln_cdf(&self, x: ArrayView1<f64>) -> Result<f64> {
        Ok(self.axis_scores(x, None)?.mapv(normal::ln_cdf).sum())
    }

    pub fn joint_probability(p: ArrayView1<f64>) -> f64 {
        joint_probability(p)
    }

    fn inv_cdf_impl(
        &self,
        p: ArrayView1<f64>,
        mut out: ArrayViewMut1<f64>,
        basis_out: Option<&mut CovarianceBasis>,
    ) -> Result<()> {
        let d = self.ensure_ready()?;
        if p.len() != d || out.len() != d {
            return Err(invalid_argument(format!(
                "expected {} probabilities and an output of length {}, got {} and {}",
                d,
                d,
                p.len(),
                out.len()
            )));
        }
        if let Some(&bad) = p.iter().find(|&&pi| !(pi > 0. && pi < 1.)) {
            return Err(invalid_argument(format!(
                "probability {} is outside of (0, 1)",
                bad
            )));
        }
        let basis = self.cached_basis()?;
        let offsets = Zip::from(&p)
            .and(basis.variances())
            .map_collect(|&pi, &var| normal::inv_cdf(pi) * var.sqrt());
        out.assign(&self.mean);
        out += &basis.basis().dot(&offsets);
        if let Some(basis_out) = basis_out {
            *basis_out = (*basis).clone();
        }
        Ok(())
    }

    /// Point whose per-axis cumulative probabilities are `p`, the inverse of
    /// [`cdf`](Self::cdf): `cdf(inv_cdf(p)) == joint_probability(p)` for
    /// non-singular covariances.
    pub fn inv_cdf(&self, p: ArrayView1<f64>) -> Result<Array1<f64>> {
        let mut out = Array1::zeros(self.mean.len());
        self.inv_cdf_impl(p, out.view_mut(), None)?;
        Ok(out)
    }

    pub fn inv_cdf_with_basis(
        &self,
        p: ArrayView1<f64>,
        basis_out: &mut CovarianceBasis,
    ) -> Result<Array1<f64>> {
        let mut out = Array1::zeros(self.mean.len());
        self.inv_cdf_impl(p, out.view_mut(), Some(basis_out))?;
        Ok(out)
    }

    /// Non-allocating [`inv_cdf`](Self::inv_cdf).
    pub fn inv_cdf_into(&self, p: ArrayView1<f64>, out: ArrayViewMut1<f64>) -> Result<()> {
        self.inv_cdf_impl(p, out, None)
    }

    pub fn inv_cdf_into_with_basis(
        &self,
        p: ArrayView1<f64>,
        out: ArrayViewMut1<f64>,
        basis_out: &mut CovarianceBasis,
    ) -> Result<()> {
        self.inv_cdf_impl(p, out, Some(basis_out))
    }

    /// Inverse of a joint probability `q`, assuming every axis carries the
    /// same marginal probability $q^{1/d}$.
    pub fn inv_cdf_joint(&self, q: f64) -> Result<Array1<f64>> {
        let d = self.ensure_ready()?;
        if !(q > 0. && q < 1.) {
            return Err(invalid_argument(format!(
                "joint probability {} is outside of (0, 1)",
                q
            )));
        }
        let marginal = q.powf(1. / d as f64);
        self.inv_cdf(Array1::from_elem(d, marginal).view())
    }

    /// First-order propagation of `N(mean, covariance)` through `evaluator`:
    /// the result has mean $f(\mu)$ and covariance $J\Sigma J^T$.
    pub fn propagate<E: JacobianEvaluator + ?Sized>(
        evaluator: &E,
        mean: ArrayView1<f64>,
        covariance: ArrayView2<f64>,
    ) -> Result<MultivariateNormal> {
        let (y, cov) = propagation::linearize(evaluator, mean, covariance)?;
        MultivariateNormal::new_unchecked(y, cov)
    }

    /// [`propagate`](Self::propagate) writing into an existing distribution.
    pub fn propagate_into<E: JacobianEvaluator + ?Sized>(
        evaluator: &E,
        mean: ArrayView1<f64>,
        covariance: ArrayView2<f64>,
        result: &mut MultivariateNormal,
    ) -> Result<()> {
        let (y, cov) = propagation::linearize(evaluator, mean, covariance)?;
        result.set_mean(y)?;
        result.set_covariance_unchecked(cov);
        Ok(())
    }

    pub fn propagate_this<E: JacobianEvaluator + ?Sized>(
        &self,
        evaluator: &E,
    ) -> Result<MultivariateNormal> {
        debug!("propagating {}-dimensional distribution", self.dim());
        Self::propagate(evaluator, self.mean.view(), self.covariance.view())
            .map(|result| result.with_tolerance(self.tolerance))
    }

    pub fn propagate_this_into<E: JacobianEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        result: &mut MultivariateNormal,
    ) -> Result<()> {
        debug!("propagating {}-dimensional distribution", self.dim());
        Self::propagate_into(evaluator, self.mean.view(), self.covariance.view(), result)
    }
}

fn check_mean(mean: &Array1<f64>) -> Result<()> {
    if mean.is_empty() {
        Err(invalid_argument("mean must not be empty"))
    } else {
        Ok(())
    }
}

/// Draws one correlated sample. Panics if the distribution is not ready or
/// its covariance cannot be factored; use
/// [`MultivariateGaussianSampler`](crate::sampler::MultivariateGaussianSampler)
/// to draw repeatedly with error handling.
impl Distribution<Array1<f64>> for MultivariateNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        let sample_size = self
            .ensure_ready()
            .unwrap_or_else(|e| panic!("cannot sample: {}", e));
        let lower = sampler::covariance_factor(self.covariance.view())
            .unwrap_or_else(|e| panic!("cannot sample: {}", e));
        let ind_sample = Array1::random_using(sample_size, StandardNormal, rng);
        &self.mean + lower.dot(&ind_sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::{array, Axis};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn correlated() -> MultivariateNormal {
        MultivariateNormal::new(array![1., -2.], array![[2., 0.6], [0.6, 1.]]).unwrap()
    }

    #[test]
    fn default_is_standard_normal() {
        let dist = MultivariateNormal::default();
        assert_eq!(dist.dim(), 1);
        assert_eq!(dist.mean(), array![0.]);
        assert_eq!(dist.covariance(), array![[1.]]);
        assert!(dist.is_ready());
        assert_approx_eq!(dist.density(array![0.].view()).unwrap(), normal::pdf(0.), 1e-12);
    }

    #[test]
    fn with_dimension() {
        let dist = MultivariateNormal::with_dimension(3).unwrap();
        assert_eq!(dist.mean(), Array1::<f64>::zeros(3));
        assert_eq!(dist.covariance(), Array2::<f64>::eye(3));
        assert!(matches!(
            MultivariateNormal::with_dimension(0),
            Err(MvnError::InvalidArgument(_))
        ));
    }

    #[test]
    fn construction_errors() {
        assert!(matches!(
            MultivariateNormal::new(Array1::zeros(0), Array2::eye(1)),
            Err(MvnError::InvalidArgument(_))
        ));
        assert!(matches!(
            MultivariateNormal::new(array![0., 0.], array![[1., 0.5], [0., 1.]]),
            Err(MvnError::InvalidCovariance(_))
        ));
        assert!(matches!(
            MultivariateNormal::new(array![0., 0.], Array2::zeros((2, 3))),
            Err(MvnError::InvalidCovariance(_))
        ));
        assert!(matches!(
            MultivariateNormal::new(array![0., 0.], array![[1., 3.], [3., 1.]]),
            Err(MvnError::InvalidCovariance(_))
        ));
        // validation skipped
        assert!(MultivariateNormal::new_unchecked(array![0., 0.], array![[1., 3.], [3., 1.]]).is_ok());
    }

    #[test]
    fn mismatched_dimensions_are_not_ready() {
        let mut dist = MultivariateNormal::new(array![0., 0., 0.], Array2::eye(2)).unwrap();
        assert!(!dist.is_ready());
        let x = array![0., 0.];
        assert!(matches!(
            dist.density(x.view()),
            Err(MvnError::NotReady { mean: 3, rows: 2, cols: 2 })
        ));
        assert!(matches!(dist.cdf(x.view()), Err(MvnError::NotReady { .. })));
        assert!(matches!(dist.inv_cdf(x.view()), Err(MvnError::NotReady { .. })));
        assert!(matches!(
            dist.mahalanobis_distance(x.view()),
            Err(MvnError::NotReady { .. })
        ));
        dist.set_mean(array![1., 1.]).unwrap();
        assert!(dist.is_ready());
        assert!(dist.density(x.view()).is_ok());
    }

    #[test]
    fn setters() {
        let mut dist = correlated();
        assert!(matches!(
            dist.set_mean(Array1::zeros(0)),
            Err(MvnError::InvalidArgument(_))
        ));
        assert!(matches!(
            dist.set_covariance(array![[1., 2.], [0., 1.]]),
            Err(MvnError::InvalidCovariance(_))
        ));
        assert_eq!(dist.covariance(), array![[2., 0.6], [0.6, 1.]]);
        dist.set_covariance_unchecked(Array2::zeros((2, 3)));
        assert!(!dist.is_ready());
    }

    #[test]
    fn setting_covariance_clears_cached_basis() {
        let mut dist = MultivariateNormal::with_dimension(2).unwrap();
        let mut basis = CovarianceBasis::default();
        dist.cdf_with_basis(array![0., 0.].view(), &mut basis).unwrap();
        assert_approx_eq!(basis.variances()[0], 1., 1e-12);
        dist.set_covariance(array![[4., 0.], [0., 1.]]).unwrap();
        dist.cdf_with_basis(array![0., 0.].view(), &mut basis).unwrap();
        assert_approx_eq!(basis.variances()[0], 4., 1e-12);
    }

    #[test]
    fn wrong_point_length() {
        let dist = correlated();
        let x = array![1., 2., 3.];
        assert!(matches!(dist.density(x.view()), Err(MvnError::InvalidArgument(_))));
        assert!(matches!(dist.cdf(x.view()), Err(MvnError::InvalidArgument(_))));
        assert!(matches!(
            dist.squared_mahalanobis_distance(x.view()),
            Err(MvnError::InvalidArgument(_))
        ));
        assert!(matches!(
            dist.inv_cdf(array![0.5].view()),
            Err(MvnError::InvalidArgument(_))
        ));
        let mut out = Array1::zeros(3);
        assert!(matches!(
            dist.inv_cdf_into(array![0.5, 0.5].view(), out.view_mut()),
            Err(MvnError::InvalidArgument(_))
        ));
    }

    #[test]
    fn density_peaks_at_mean() {
        let dist = correlated();
        let peak = dist.density(dist.mean()).unwrap();
        for offset in &[array![0.1, 0.], array![0., -0.1], array![0.3, 0.3], array![-1., 2.]] {
            let x = &dist.mean() + offset;
            assert!(dist.density(x.view()).unwrap() < peak);
        }
        let det: f64 = 2. * 1. - 0.6 * 0.6;
        assert_approx_eq!(peak, 1. / (f64::TAU() * det.sqrt()), 1e-12);
    }

    #[test]
    fn density_integrates_to_one() {
        let dist = correlated();
        let step = 0.05;
        let mut total = 0.;
        for i in 0..400 {
            for j in 0..320 {
                let x = array![-9. + i as f64 * step, -10. + j as f64 * step];
                total += dist.density(x.view()).unwrap() * step * step;
            }
        }
        assert_approx_eq!(total, 1., 1e-4);

        let dist = MultivariateNormal::new(array![3.], array![[0.25]]).unwrap();
        let total: f64 = (0..2000)
            .map(|i| dist.density(array![i as f64 * 0.005 - 2.].view()).unwrap() * 0.005)
            .sum();
        assert_approx_eq!(total, 1., 1e-6);
    }

    #[test]
    fn mahalanobis() {
        let dist = MultivariateNormal::new(array![0., 0.], array![[4., 0.], [0., 1.]]).unwrap();
        let x = array![2., 1.];
        assert_approx_eq!(dist.squared_mahalanobis_distance(x.view()).unwrap(), 2., 1e-12);
        assert_approx_eq!(dist.mahalanobis_distance(x.view()).unwrap(), 2f64.sqrt(), 1e-12);
        assert_approx_eq!(dist.mahalanobis_distance(dist.mean()).unwrap(), 0., 1e-12);
    }

    #[test]
    fn singular_covariance_cannot_be_inverted() {
        let dist = MultivariateNormal::new(array![0., 0.], array![[1., 1.], [1., 1.]]).unwrap();
        let x = array![0.5, 0.5];
        assert!(matches!(dist.density(x.view()), Err(MvnError::Singular)));
        assert!(matches!(
            dist.mahalanobis_distance(x.view()),
            Err(MvnError::Singular)
        ));
        // cdf still works, the degenerate axis is a point mass
        assert_approx_eq!(dist.cdf(dist.mean()).unwrap(), 0.25, 1e-9);
    }

    #[test]
    fn tiny_variance_axes_are_not_rounded_to_the_mean() {
        let dist = MultivariateNormal::new(array![0., 0.], array![[1e-12, 0.], [0., 0.]]).unwrap();
        assert_approx_eq!(dist.cdf(dist.mean()).unwrap(), 0.25, 1e-12);
        // eigenvector signs are arbitrary, one side of the point mass scores 1, the other 0
        let above = dist.cdf(array![0., 1e-6].view()).unwrap();
        let below = dist.cdf(array![0., -1e-6].view()).unwrap();
        assert_approx_eq!(above + below, 0.5, 1e-12);
        assert_approx_eq!(above * below, 0., 1e-12);
    }

    #[test]
    fn ln_cdf_survives_underflow() {
        let dist = MultivariateNormal::with_dimension(400).unwrap();
        let x = Array1::from_elem(400, -2.);
        assert_eq!(dist.cdf(x.view()).unwrap(), 0.);
        let ln_cdf = dist.ln_cdf(x.view()).unwrap();
        assert!(ln_cdf.is_finite());
        assert_approx_eq!(ln_cdf, 400. * normal::cdf(-2.).ln(), 1e-8);
    }

    #[test]
    fn cdf_at_mean() {
        assert_approx_eq!(correlated().cdf(array![1., -2.].view()).unwrap(), 0.25, 1e-12);
        let dist = MultivariateNormal::new(
            array![1., 2., 3.],
            array![[3., 0.2, 0.1], [0.2, 2., -0.4], [0.1, -0.4, 1.]],
        )
        .unwrap();
        assert_approx_eq!(dist.cdf(dist.mean()).unwrap(), 0.125, 1e-12);
        assert_approx_eq!(dist.ln_cdf(dist.mean()).unwrap(), 0.125f64.ln(), 1e-12);
    }

    #[test]
    fn cdf_along_an_eigen_axis() {
        let dist = correlated();
        let basis = dist.process_covariance().unwrap();
        let axis = basis.basis().index_axis(Axis(1), 0).to_owned();
        let sd = basis.std_devs()[0];
        for &(k, expected) in &[(1., 0.84134), (-2., 0.02275), (0.5, 0.69146)] {
            let x = &dist.mean() + &(&axis * (k * sd));
            assert_approx_eq!(dist.cdf(x.view()).unwrap(), expected * 0.5, 1e-3);
        }
    }

    #[test]
    fn inv_cdf_round_trip() {
        let dist = correlated();
        let p = array![0.2, 0.9];
        let x = dist.inv_cdf(p.view()).unwrap();
        assert_approx_eq!(dist.cdf(x.view()).unwrap(), joint_probability(p.view()), 1e-9);
        let center = dist.inv_cdf(array![0.5, 0.5].view()).unwrap();
        assert_approx_eq!(center[0], 1., 1e-12);
        assert_approx_eq!(center[1], -2., 1e-12);
    }

    #[test]
    fn inv_cdf_rejects_bad_probabilities() {
        let dist = correlated();
        for p in &[array![0., 0.5], array![0.5, 1.], array![f64::NAN, 0.5], array![-0.1, 0.5]] {
            assert!(matches!(dist.inv_cdf(p.view()), Err(MvnError::InvalidArgument(_))));
        }
    }

    #[test]
    fn inv_cdf_variants_agree() {
        let dist = correlated();
        let p = array![0.3, 0.6];
        let expected = dist.inv_cdf(p.view()).unwrap();

        let mut basis = CovarianceBasis::default();
        let with_basis = dist.inv_cdf_with_basis(p.view(), &mut basis).unwrap();
        assert_eq!(with_basis, expected);
        assert_eq!(basis, dist.process_covariance().unwrap());

        let mut out = Array1::zeros(2);
        dist.inv_cdf_into(p.view(), out.view_mut()).unwrap();
        assert_eq!(out, expected);

        let mut other_basis = CovarianceBasis::default();
        let mut out = Array1::zeros(2);
        dist.inv_cdf_into_with_basis(p.view(), out.view_mut(), &mut other_basis)
            .unwrap();
        assert_eq!(out, expected);
        assert_eq!(other_basis, basis);

        let mut cdf_basis = CovarianceBasis::default();
        dist.cdf_with_basis(out.view(), &mut cdf_basis).unwrap();
        assert_eq!(cdf_basis, basis);
    }

    #[test]
    fn inv_cdf_joint() {
        let dist = correlated();
        for &q in &[0.01, 0.25, 0.5, 0.9] {
            let x = dist.inv_cdf_joint(q).unwrap();
            assert_approx_eq!(dist.cdf(x.view()).unwrap(), q, 1e-9);
        }
        // equal marginals: sqrt(0.25) = 0.5 on each axis lands on the mean
        let x = dist.inv_cdf_joint(0.25).unwrap();
        assert_approx_eq!(x[0], 1., 1e-9);
        assert_approx_eq!(x[1], -2., 1e-9);
        for &q in &[0., 1., -0.5, 1.5, f64::NAN] {
            assert!(matches!(dist.inv_cdf_joint(q), Err(MvnError::InvalidArgument(_))));
        }
        // readiness is reported before the range of q
        let not_ready = MultivariateNormal::new(array![0., 0., 0.], Array2::eye(2)).unwrap();
        assert!(matches!(not_ready.inv_cdf_joint(0.), Err(MvnError::NotReady { .. })));
        assert!(matches!(not_ready.inv_cdf_joint(0.5), Err(MvnError::NotReady { .. })));
    }

    #[test]
    fn joint_probability_is_a_product() {
        assert_approx_eq!(joint_probability(array![0.5, 0.5, 0.2].view()), 0.05, 1e-15);
        assert_approx_eq!(
            MultivariateNormal::joint_probability(array![0.9].view()),
            0.9,
            1e-15
        );
        assert_eq!(joint_probability(array![0.3, 0.].view()), 0.);
    }

    #[test]
    fn process_covariance_basis() {
        let dist = correlated();
        let basis = dist.process_covariance().unwrap();
        let b = basis.basis().to_owned();
        let orthonormality = b.t().dot(&b) - Array2::<f64>::eye(2);
        assert!(util::max_abs(orthonormality.view()) < 1e-6);
        let reconstruction = basis.reconstruct() - dist.covariance();
        assert!(util::max_abs(reconstruction.view()) < 1e-6);
    }

    #[test]
    fn distribution_trait_sampling() {
        let dist = correlated();
        let mut rng = StdRng::seed_from_u64(7);
        let n = 20_000;
        let mut total = Array1::<f64>::zeros(2);
        for _ in 0..n {
            total += &dist.sample(&mut rng);
        }
        let mean = total / n as f64;
        assert_approx_eq!(mean[0], 1., 0.05);
        assert_approx_eq!(mean[1], -2., 0.05);
    }

    proptest! {
        #[test]
        fn cdf_inverts_inv_cdf(p0 in 0.001f64..0.999, p1 in 0.001f64..0.999, p2 in 0.001f64..0.999) {
            let dist = MultivariateNormal::new(
                array![0.5, -1., 4.],
                array![[2., 0.3, -0.2], [0.3, 1.5, 0.4], [-0.2, 0.4, 0.8]],
            )
            .unwrap();
            let p = array![p0, p1, p2];
            let x = dist.inv_cdf(p.view()).unwrap();
            let cdf = dist.cdf(x.view()).unwrap();
            prop_assert!((cdf - joint_probability(p.view())).abs() < 1e-6);
        }
    }
}
