//! Problem definition trait and the curve-fitting adapter.
//!
//! This module defines the `Problem` trait, which represents a nonlinear
//! least squares problem to be solved with the Levenberg-Marquardt algorithm,
//! and `CurveFitProblem`, which turns a [`Model`] plus observed data into one.

use crate::error::{PvFitError, Result};
use crate::model::Model;
use ndarray::{Array1, Array2};

/// A trait representing a nonlinear least squares problem.
///
/// This trait defines the interface for problems that can be solved using
/// the Levenberg-Marquardt algorithm.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values at which to evaluate the residuals
    ///
    /// # Returns
    ///
    /// * A vector of residuals, or an error if the evaluation fails
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix of the residuals at the given parameters.
    ///
    /// The default implementation uses forward finite differences.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Check if this problem provides a custom Jacobian implementation.
    fn has_custom_jacobian(&self) -> bool {
        false
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// Adapter that fits a [`Model`] to observed `(x, y)` data.
///
/// Residuals are `y - f(x; p)`, so the Jacobian of the residuals is the
/// negated model Jacobian.
#[derive(Debug, Clone)]
pub struct CurveFitProblem<M: Model> {
    model: M,
    x_data: Array1<f64>,
    y_data: Array1<f64>,
    n_params: usize,
}

impl<M: Model> CurveFitProblem<M> {
    /// Create a new problem.
    ///
    /// # Arguments
    ///
    /// * `model` - The model to fit
    /// * `x_data` - The independent variable values
    /// * `y_data` - The observed dependent variable values
    /// * `n_params` - Length of the parameter vectors that will be passed in
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` if `x_data` and `y_data` differ in length
    pub fn new(model: M, x_data: Array1<f64>, y_data: Array1<f64>, n_params: usize) -> Result<Self> {
        if x_data.len() != y_data.len() {
            return Err(PvFitError::DimensionMismatch(format!(
                "x has {} points but y has {}",
                x_data.len(),
                y_data.len()
            )));
        }

        Ok(Self {
            model,
            x_data,
            y_data,
            n_params,
        })
    }

    /// Get a reference to the x data
    pub fn x_data(&self) -> &Array1<f64> {
        &self.x_data
    }

    /// Get a reference to the y data
    pub fn y_data(&self) -> &Array1<f64> {
        &self.y_data
    }

    /// Get a reference to the model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Model prediction at the given parameters.
    pub fn predict(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.model.eval(&self.x_data, params)
    }

    fn check_params(&self, params: &Array1<f64>) -> Result<()> {
        if params.len() != self.n_params {
            return Err(PvFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                self.n_params,
                params.len()
            )));
        }
        Ok(())
    }
}

impl<M: Model> Problem for CurveFitProblem<M> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.check_params(params)?;
        let y_pred = self.predict(params)?;
        Ok(&self.y_data - &y_pred)
    }

    fn parameter_count(&self) -> usize {
        self.n_params
    }

    fn residual_count(&self) -> usize {
        self.x_data.len()
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        self.check_params(params)?;

        if self.model.has_custom_jacobian() {
            let jac = self.model.jacobian(&self.x_data, params)?;

            if jac.shape() != &[self.x_data.len(), self.n_params] {
                return Err(PvFitError::DimensionMismatch(format!(
                    "Expected Jacobian of shape [{}, {}], got {:?}",
                    self.x_data.len(),
                    self.n_params,
                    jac.shape()
                )));
            }

            // Negate the Jacobian since residuals = y - f(x)
            Ok(-jac)
        } else {
            crate::utils::finite_difference::jacobian(self, params, None)
        }
    }

    fn has_custom_jacobian(&self) -> bool {
        self.model.has_custom_jacobian()
    }
}
