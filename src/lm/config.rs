//! Configuration options for the Levenberg-Marquardt algorithm.
//!
//! This module defines the convergence tolerances, the damping schedule and
//! the choice of Jacobian evaluation used by the bounded solver.

use crate::error::{PvFitError, Result};
use serde::{Deserialize, Serialize};

/// Method for calculating the Jacobian matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiffMethod {
    /// Use the analytical Jacobian provided by the problem, falling back to
    /// forward differences when the problem has none
    #[default]
    Analytical,

    /// Use forward finite differences
    FiniteDifference,

    /// Use central finite differences
    CentralDifference,
}

/// Configuration options for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of iterations. Default: 500
    pub max_iterations: usize,

    /// Tolerance for relative change in cost. Default: 1e-8
    pub ftol: f64,

    /// Tolerance for relative change in parameter values. Default: 1e-8
    pub xtol: f64,

    /// Tolerance for the scaled gradient. Default: 1e-8
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda after a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda after a good step. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda. Default: 1e12
    pub max_lambda: f64,

    /// Method to use for calculating the Jacobian. Default: Analytical
    pub diff_method: DiffMethod,

    /// Spread finite-difference columns over the Rayon pool. Ignored without
    /// the `parallel` feature. Default: false
    pub parallel_jacobian: bool,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-8,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            diff_method: DiffMethod::default(),
            parallel_jacobian: false,
        }
    }
}

impl LmConfig {
    /// Check that tolerances and damping factors are usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(PvFitError::InvalidInput(
                "max_iterations must be at least 1".to_string(),
            ));
        }

        for (name, value) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PvFitError::InvalidInput(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }

        if !(self.initial_lambda > 0.0 && self.min_lambda > 0.0)
            || self.min_lambda > self.max_lambda
        {
            return Err(PvFitError::InvalidInput(format!(
                "invalid damping range: initial {}, min {}, max {}",
                self.initial_lambda, self.min_lambda, self.max_lambda
            )));
        }

        if !(self.lambda_up_factor > 1.0 && self.lambda_down_factor > 0.0 && self.lambda_down_factor < 1.0)
        {
            return Err(PvFitError::InvalidInput(format!(
                "lambda factors must satisfy up > 1 and 0 < down < 1, got {} and {}",
                self.lambda_up_factor, self.lambda_down_factor
            )));
        }

        Ok(())
    }

    /// Load a configuration from JSON. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
