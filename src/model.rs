//! Model trait and the multi-peak pseudo-Voigt model.
//!
//! This module defines the Model trait, which provides a common interface for
//! curves whose parameters are adjusted by the optimizer, and implements the
//! additive multi-peak model used by the fit engine. The number of peaks is
//! never fixed at construction time: it is read from the length of whatever
//! parameter vector is passed in.

use crate::error::{PvFitError, Result};
use crate::peak::{peaks_from_vector, Peak, PARAMS_PER_PEAK};
use ndarray::{Array1, Array2};

/// A trait representing a parametric curve that can be fit to data.
pub trait Model {
    /// Evaluates the model at the given x values.
    ///
    /// # Arguments
    ///
    /// * `x` - The independent variable values at which to evaluate the model
    /// * `params` - The flat parameter vector
    ///
    /// # Returns
    ///
    /// * The model's predicted values at the given x values
    fn eval(&self, x: &Array1<f64>, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Calculates the Jacobian matrix of the model with respect to its parameters.
    ///
    /// `J[i, j] = df(x_i)/dp_j`. Models without analytical derivatives keep the
    /// default, and the problem adapter falls back to finite differences.
    fn jacobian(&self, _x: &Array1<f64>, _params: &Array1<f64>) -> Result<Array2<f64>> {
        Err(PvFitError::NotImplemented(
            "Default jacobian implementation is not available.".to_string(),
        ))
    }

    /// Returns whether this model has a custom Jacobian implementation.
    fn has_custom_jacobian(&self) -> bool {
        false
    }
}

/// Sum of an arbitrary number of pseudo-Voigt peaks.
///
/// Parameters are laid out as repeating `[height, center, width, ratio]`
/// quadruples.
#[derive(Debug, Clone, Copy, Default)]
pub struct PseudoVoigtSum;

impl PseudoVoigtSum {
    /// Create the model.
    pub fn new() -> Self {
        Self
    }
}

impl Model for PseudoVoigtSum {
    fn eval(&self, x: &Array1<f64>, params: &Array1<f64>) -> Result<Array1<f64>> {
        fitting_function(x, params)
    }

    fn jacobian(&self, x: &Array1<f64>, params: &Array1<f64>) -> Result<Array2<f64>> {
        let peaks = peaks_from_vector(params)?;
        let mut jac = Array2::zeros((x.len(), params.len()));

        for (k, peak) in peaks.iter().enumerate() {
            peak.validate()?;
            let col = k * PARAMS_PER_PEAK;

            for (i, &x_val) in x.iter().enumerate() {
                let grad = peak.gradient(x_val);
                for (j, &g) in grad.iter().enumerate() {
                    jac[[i, col + j]] = g;
                }
            }
        }

        Ok(jac)
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}

/// Sum of pseudo-Voigt peaks described by a flat parameter vector.
///
/// An empty parameter vector gives a zero curve of the same length as `x`.
///
/// # Errors
///
/// * `InvalidParameterVector` if the length of `params` is not a multiple
///   of 4, or a peak has a non-positive width
pub fn fitting_function(x: &Array1<f64>, params: &Array1<f64>) -> Result<Array1<f64>> {
    let peaks = peaks_from_vector(params)?;
    eval_peaks(x, &peaks)
}

/// Sum of the given peaks evaluated at `x`.
pub fn eval_peaks(x: &Array1<f64>, peaks: &[Peak]) -> Result<Array1<f64>> {
    let mut result = Array1::zeros(x.len());
    for peak in peaks {
        peak.accumulate(x, &mut result)?;
    }
    Ok(result)
}
