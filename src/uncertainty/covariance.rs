//! # Covariance Matrix Calculations
//!
//! This module estimates the parameter covariance of a least-squares fit
//! from the Jacobian at the solution.

use crate::error::{PvFitError, Result};
use crate::utils::matrix_convert::ndarray_to_nalgebra;
use ndarray::{Array1, Array2};

/// Calculate the covariance matrix from the Jacobian at the solution.
///
/// The estimate is
///   covar = s² · pinv(JᵀJ),  s² = cost / (m − n)
/// where the pseudo-inverse is built from the SVD of J, discarding singular
/// values below `eps · max(m, n) · s_max`. The residual variance `s²` is
/// folded in, so the result does not assume absolute measurement errors.
///
/// When there are no degrees of freedom (`m <= n`) the covariance cannot be
/// estimated and every entry is +∞.
///
/// # Arguments
///
/// * `jacobian` - The m×n Jacobian of the residuals at the solution
/// * `cost` - The sum of squared residuals at the solution
///
/// # Returns
///
/// * The n×n covariance matrix
pub fn calculate_covariance(jacobian: &Array2<f64>, cost: f64) -> Result<Array2<f64>> {
    let (m, n) = jacobian.dim();

    if m <= n {
        log::warn!(
            "covariance of the parameters could not be estimated: {} residuals for {} parameters",
            m,
            n
        );
        return Ok(Array2::from_elem((n, n), f64::INFINITY));
    }

    if jacobian.iter().any(|v| !v.is_finite()) {
        return Err(PvFitError::LinearAlgebraError(
            "Jacobian at the solution contains non-finite values".to_string(),
        ));
    }

    let svd = ndarray_to_nalgebra(jacobian).svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| {
        PvFitError::LinearAlgebraError("SVD did not produce right singular vectors".to_string())
    })?;
    let singular_values = svd.singular_values;

    let s_max = singular_values.iter().copied().fold(0.0, f64::max);
    let threshold = f64::EPSILON * m.max(n) as f64 * s_max;

    let mut pcov = Array2::zeros((n, n));
    let mut dropped = 0;
    for (k, &s) in singular_values.iter().enumerate() {
        if s <= threshold {
            dropped += 1;
            continue;
        }
        let inv_s2 = 1.0 / (s * s);
        for i in 0..n {
            for j in 0..n {
                pcov[[i, j]] += v_t[(k, i)] * v_t[(k, j)] * inv_s2;
            }
        }
    }

    if dropped > 0 {
        log::warn!(
            "Jacobian is rank deficient: {} of {} singular values discarded",
            dropped,
            singular_values.len()
        );
    }

    let s_sq = cost / (m - n) as f64;
    Ok(pcov * s_sq)
}

/// Calculate correlation matrix from covariance matrix.
///
/// The correlation matrix is calculated as:
///   correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])
///
/// Entries whose normalization is zero or not finite are NaN.
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();

    Array2::from_shape_fn((n, n), |(i, j)| {
        let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
        if !(denom.is_finite() && denom > 0.0) {
            f64::NAN
        } else if i == j {
            1.0
        } else {
            covar[[i, j]] / denom
        }
    })
}

/// Extract standard errors from the covariance matrix.
///
/// Standard errors are the square roots of the diagonal elements
/// of the covariance matrix.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar.diag().mapv(f64::sqrt)
}
