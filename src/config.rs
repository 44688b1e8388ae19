use serde::{Deserialize, Serialize};

/// Numerical tolerances used when validating and inverting covariances.
///
/// Both values are relative: `symmetry` is scaled by the largest absolute
/// entry of the matrix, `eigenvalue` by the largest absolute eigenvalue.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub symmetry: f64,
    pub eigenvalue: f64,
}

impl Tolerance {
    pub const DEFAULT: Tolerance = Tolerance {
        symmetry: 1e-9,
        eigenvalue: 1e-9,
    };
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
