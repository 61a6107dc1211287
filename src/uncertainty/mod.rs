//! # Uncertainty Calculation
//!
//! Parameter uncertainties of a least-squares fit, estimated from the
//! Jacobian at the solution:
//!
//! - Covariance matrix scaled by the residual variance
//! - Correlation matrix
//! - Standard errors for each parameter
//! - Reduced chi-square and degrees of freedom

mod covariance;

pub use covariance::{calculate_correlation, calculate_covariance, standard_errors_from_covariance};

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Structure to hold uncertainty calculation results.
#[derive(Debug, Clone)]
pub struct UncertaintyResult {
    /// Covariance matrix for the parameters
    pub covariance: Array2<f64>,

    /// Correlation matrix for the parameters
    pub correlation: Array2<f64>,

    /// Standard errors for each parameter
    pub standard_errors: Array1<f64>,

    /// Reduced chi-square, cost / nfree (+∞ without degrees of freedom)
    pub redchi: f64,

    /// Degrees of freedom, residual count minus parameter count
    pub nfree: usize,
}

/// Calculate all uncertainty estimates from the Jacobian at the solution.
///
/// # Arguments
///
/// * `jacobian` - The m×n Jacobian of the residuals at the solution
/// * `cost` - The sum of squared residuals at the solution
pub fn uncertainty_from_jacobian(jacobian: &Array2<f64>, cost: f64) -> Result<UncertaintyResult> {
    let (m, n) = jacobian.dim();
    let nfree = m.saturating_sub(n);
    let redchi = if nfree > 0 {
        cost / nfree as f64
    } else {
        f64::INFINITY
    };

    let covariance = calculate_covariance(jacobian, cost)?;
    let correlation = calculate_correlation(&covariance);
    let standard_errors = standard_errors_from_covariance(&covariance);

    Ok(UncertaintyResult {
        covariance,
        correlation,
        standard_errors,
        redchi,
        nfree,
    })
}
