//! Univariate standard normal helpers built on the `erf` family.
use num::traits::FloatConst;
use statrs::function::erf::{erfc, erfc_inv};

/// $\Phi(z) = \Pr(Z \le z)$ for $Z\sim N(0,1)$
pub fn cdf(z: f64) -> f64 {
    0.5 * erfc(-z * f64::FRAC_1_SQRT_2())
}

/// $\ln\Phi(z)$, keeps precision in the upper tail where $\Phi(z) \to 1$
pub fn ln_cdf(z: f64) -> f64 {
    if z > 0. {
        (-0.5 * erfc(z * f64::FRAC_1_SQRT_2())).ln_1p()
    } else {
        cdf(z).ln()
    }
}

/// quantile function $\Phi^{-1}(p)$; `p = 0` and `p = 1` map to $\mp\infty$
pub fn inv_cdf(p: f64) -> f64 {
    -f64::SQRT_2() * erfc_inv(2. * p)
}

/// density of $N(0,1)$
pub fn pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / f64::TAU().sqrt()
}

/// distance of `x` from `mean` in units of `std_dev`
pub fn mahalanobis(x: f64, mean: f64, std_dev: f64) -> f64 {
    ((x - mean) / std_dev).abs()
}
