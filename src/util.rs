use ndarray::{Array2, ArrayView2, Zip};

pub fn swap_cols<S: Clone>(matrix: &mut Array2<S>, a: usize, b: usize) {
    let a_temp = matrix.column(a).to_owned();
    let b_temp = matrix.column(b).to_owned();
    matrix.column_mut(a).assign(&b_temp);
    matrix.column_mut(b).assign(&a_temp);
}

/// Largest absolute entry, or `NaN` if any entry is `NaN`.
pub fn max_abs(matrix: ArrayView2<f64>) -> f64 {
    matrix.fold(0., |acc: f64, &x| {
        if x.is_nan() || acc.is_nan() {
            f64::NAN
        } else {
            acc.max(x.abs())
        }
    })
}

/// `matrix` equals its transpose within `tol` scaled by its largest entry.
pub fn is_symmetric(matrix: ArrayView2<f64>, tol: f64) -> bool {
    if !matrix.is_square() {
        return false;
    }
    let scale = max_abs(matrix);
    Zip::from(matrix)
        .and(matrix.t())
        .all(|&a, &b| (a - b).abs() <= tol * scale)
}

/// `(M + Mᵗ) / 2`, removes the roundoff asymmetry of products like `J·Σ·Jᵗ`.
pub fn symmetrize(matrix: &Array2<f64>) -> Array2<f64> {
    (matrix + &matrix.t()) * 0.5
}
