//! Trust region implementation for the Levenberg-Marquardt algorithm.
//!
//! This module adapts the damping parameter based on the agreement between
//! predicted and actual reduction in cost.

use super::config::LmConfig;

/// Gain ratio below which the damping is raised even for accepted steps.
const POOR_GAIN_RATIO: f64 = 0.25;

/// Damping controller for the Levenberg-Marquardt algorithm.
#[derive(Debug, Clone)]
pub struct TrustRegion {
    /// Current value of the damping parameter
    pub lambda: f64,

    /// Minimum allowed value for the damping parameter
    pub lambda_min: f64,

    /// Maximum allowed value for the damping parameter
    pub lambda_max: f64,

    /// Factor to increase lambda by when step is rejected
    pub lambda_increase_factor: f64,

    /// Factor to decrease lambda by when step is very good
    pub lambda_decrease_factor: f64,

    /// Minimum gain ratio required to accept a step
    pub min_gain_ratio: f64,

    /// Gain ratio above which to decrease lambda
    pub good_gain_ratio: f64,
}

impl Default for TrustRegion {
    fn default() -> Self {
        Self::from_config(&LmConfig::default())
    }
}

impl TrustRegion {
    /// Creates a new TrustRegion with default parameters.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a TrustRegion following the damping schedule of `config`.
    pub fn from_config(config: &LmConfig) -> Self {
        Self {
            lambda: config.initial_lambda.clamp(config.min_lambda, config.max_lambda),
            lambda_min: config.min_lambda,
            lambda_max: config.max_lambda,
            lambda_increase_factor: config.lambda_up_factor,
            lambda_decrease_factor: config.lambda_down_factor,
            min_gain_ratio: 1e-3,
            good_gain_ratio: 0.75,
        }
    }

    /// Updates the damping parameter based on the gain ratio.
    ///
    /// # Arguments
    ///
    /// * `gain_ratio` - The ratio of actual reduction to predicted reduction
    ///
    /// # Returns
    ///
    /// * Whether the step is accepted
    pub fn update_lambda(&mut self, gain_ratio: f64) -> bool {
        if gain_ratio > self.min_gain_ratio {
            if gain_ratio > self.good_gain_ratio {
                self.lambda = (self.lambda * self.lambda_decrease_factor).max(self.lambda_min);
            } else if gain_ratio < POOR_GAIN_RATIO {
                self.lambda = (self.lambda * self.lambda_increase_factor.sqrt()).min(self.lambda_max);
            }
            true
        } else {
            self.reject();
            false
        }
    }

    /// Increase the damping after a failed or rejected step.
    pub fn reject(&mut self) {
        self.lambda = (self.lambda * self.lambda_increase_factor).min(self.lambda_max);
    }

    /// Whether the damping has hit its upper limit.
    pub fn is_saturated(&self) -> bool {
        self.lambda >= self.lambda_max
    }

    /// Calculates the gain ratio between actual and predicted reduction.
    ///
    /// # Arguments
    ///
    /// * `current_cost` - The current cost function value
    /// * `new_cost` - The new cost function value after the step
    /// * `predicted_reduction` - The predicted reduction in cost
    ///
    /// # Returns
    ///
    /// * The gain ratio (actual reduction / predicted reduction)
    pub fn gain_ratio(current_cost: f64, new_cost: f64, predicted_reduction: f64) -> f64 {
        let actual_reduction = current_cost - new_cost;

        if !new_cost.is_finite() {
            return f64::NEG_INFINITY;
        }

        if predicted_reduction.abs() < 1e-300 {
            if actual_reduction.abs() < 1e-300 {
                1.0
            } else {
                0.0
            }
        } else {
            actual_reduction / predicted_reduction
        }
    }
}
