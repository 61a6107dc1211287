//! Convergence criteria for the Levenberg-Marquardt algorithm.
//!
//! The tests follow MINPACK: relative reduction of the cost, relative size
//! of the step and the largest scaled gradient component.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Possible convergence states for an optimization algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// The algorithm has converged due to a small parameter change.
    ParameterConvergence,

    /// The algorithm has converged due to a small function value change.
    FunctionValueConvergence,

    /// The algorithm has converged due to a small gradient.
    GradientConvergence,

    /// The algorithm has terminated due to reaching the maximum number of iterations.
    MaxIterationsReached,

    /// The damping parameter reached its upper limit without an acceptable step.
    DampingSaturated,
}

impl ConvergenceStatus {
    /// Returns true if the optimization has terminated (either converged or failed).
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    /// Returns true if the optimization has converged.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
        )
    }

    /// Returns a description of the convergence status.
    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small function value change",
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::DampingSaturated => "Terminated: damping parameter saturated",
        }
    }
}

/// Criteria for determining when an optimization algorithm has converged.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for relative change in parameter values.
    pub xtol: f64,

    /// Tolerance for relative change in cost.
    pub ftol: f64,

    /// Tolerance for the scaled gradient.
    pub gtol: f64,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            xtol: 1e-8,
            ftol: 1e-8,
            gtol: 1e-8,
        }
    }
}

impl ConvergenceCriteria {
    /// Creates a new set of convergence criteria with the given tolerances.
    pub fn new(xtol: f64, ftol: f64, gtol: f64) -> Self {
        Self { xtol, ftol, gtol }
    }

    /// Gradient test, evaluated before a step is computed.
    ///
    /// The gradient `Jᵀr` is scaled per column by `‖J_j‖ · ‖r‖`, which makes
    /// it the cosine between the residual vector and each Jacobian column.
    ///
    /// # Arguments
    ///
    /// * `jacobian` - The Jacobian at the current position
    /// * `residuals` - The residuals at the current position
    pub fn check_gradient(&self, jacobian: &Array2<f64>, residuals: &Array1<f64>) -> ConvergenceStatus {
        let residual_norm = residuals.dot(residuals).sqrt();
        if residual_norm == 0.0 {
            return ConvergenceStatus::GradientConvergence;
        }

        let gradient = jacobian.t().dot(residuals);
        let scaled_max = jacobian
            .columns()
            .into_iter()
            .zip(gradient.iter())
            .map(|(column, &g)| {
                let column_norm = column.dot(&column).sqrt();
                if column_norm == 0.0 {
                    0.0
                } else {
                    g.abs() / (column_norm * residual_norm)
                }
            })
            .fold(0.0, f64::max);

        if scaled_max <= self.gtol {
            ConvergenceStatus::GradientConvergence
        } else {
            ConvergenceStatus::Running
        }
    }

    /// Cost and step tests, evaluated after a step has been accepted.
    ///
    /// # Arguments
    ///
    /// * `params` - The parameter values before the step
    /// * `step` - The accepted step
    /// * `cost` - The cost before the step
    /// * `new_cost` - The cost after the step
    /// * `predicted_reduction` - The reduction predicted by the linear model
    /// * `gain_ratio` - Actual over predicted reduction
    pub fn check_step(
        &self,
        params: &Array1<f64>,
        step: &Array1<f64>,
        cost: f64,
        new_cost: f64,
        predicted_reduction: f64,
        gain_ratio: f64,
    ) -> ConvergenceStatus {
        if cost > 0.0 {
            let actual_rel = (cost - new_cost).abs() / cost;
            let predicted_rel = predicted_reduction.abs() / cost;
            if actual_rel <= self.ftol && predicted_rel <= self.ftol && gain_ratio <= 2.0 {
                return ConvergenceStatus::FunctionValueConvergence;
            }
        } else if new_cost == 0.0 {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        if self.step_is_negligible(params, step) {
            return ConvergenceStatus::ParameterConvergence;
        }

        ConvergenceStatus::Running
    }

    /// Whether `‖step‖ ≤ xtol · (‖params‖ + xtol)`.
    pub fn step_is_negligible(&self, params: &Array1<f64>, step: &Array1<f64>) -> bool {
        let step_norm = step.dot(step).sqrt();
        let params_norm = params.dot(params).sqrt();
        step_norm <= self.xtol * (params_norm + self.xtol)
    }
}
