//! Implementation of the bounded Levenberg-Marquardt algorithm.
//!
//! Box constraints are handled by optimizing unconstrained internal
//! variables that map into the box through [`BoundsTransform`]. The Jacobian
//! with respect to the internal variables follows from the chain rule, so
//! the problem itself only ever sees external (bounded) parameter values.

use ndarray::{Array1, Array2, Axis};
use std::fmt;

use crate::error::{PvFitError, Result};
use crate::parameters::{BoundsPair, BoundsTransform};
use crate::problem::Problem;
use crate::utils::finite_difference;

use super::config::{DiffMethod, LmConfig};
use super::convergence::{ConvergenceCriteria, ConvergenceStatus};
use super::step::LmStep;
use super::trust_region::TrustRegion;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of trial steps performed
    pub iterations: usize,

    /// Number of residual evaluations, excluding those spent on Jacobians
    pub func_evals: usize,

    /// Number of Jacobian evaluations
    pub jac_evals: usize,

    /// Why the iteration stopped
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,

    /// Jacobian of the residuals with respect to the external parameters at
    /// the solution
    pub jacobian: Array2<f64>,
}

impl LmResult {
    /// Whether the optimization converged.
    pub fn success(&self) -> bool {
        self.status.is_converged()
    }
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success())?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// Current iterate of the solver.
struct Iterate {
    internal: Array1<f64>,
    external: Array1<f64>,
    residuals: Array1<f64>,
    cost: f64,
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for relative change in cost.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for relative change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for the scaled gradient.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the method used for calculating the Jacobian.
    pub fn with_differentiation_method(mut self, method: DiffMethod) -> Self {
        self.config.diff_method = method;
        self
    }

    /// Evaluate finite-difference Jacobians in parallel.
    pub fn with_parallel_jacobian(mut self, parallel: bool) -> Self {
        self.config.parallel_jacobian = parallel;
        self
    }

    /// Minimize the sum of squared residuals subject to box constraints.
    ///
    /// The initial guess is clipped into the box and moved off any bound it
    /// touches before the first evaluation.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to solve
    /// * `initial_params` - Initial guess for the parameter values
    /// * `bounds` - Lower and upper bound of every parameter
    ///
    /// # Returns
    ///
    /// * `Result<LmResult>` - The result of the optimization, or
    ///   `ConvergenceFailure` carrying the last iterate when no tolerance was
    ///   met within the iteration budget
    pub fn minimize<P: Problem + Sync>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
        bounds: &BoundsPair,
    ) -> Result<LmResult> {
        self.config.validate()?;

        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(PvFitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }
        if bounds.len() != n_params {
            return Err(PvFitError::DimensionMismatch(format!(
                "Expected bounds for {} parameters, got {}",
                n_params,
                bounds.len()
            )));
        }
        bounds.validate()?;

        if let Some(i) = initial_params.iter().position(|v| !v.is_finite()) {
            return Err(PvFitError::InvalidParameterVector(format!(
                "initial value at index {} is not finite: {}",
                i, initial_params[i]
            )));
        }

        let transforms = bounds.transforms();
        let start = bounds.make_strictly_feasible(&initial_params);
        let internal = start
            .iter()
            .zip(transforms.iter())
            .map(|(&v, t)| t.to_internal(v))
            .collect::<Result<Array1<f64>>>()?;

        let residuals = problem.eval(&start)?;
        let cost = residuals.dot(&residuals);
        if !cost.is_finite() {
            return Err(PvFitError::FunctionEvaluation(
                "residuals at the initial guess are not finite".to_string(),
            ));
        }

        let mut current = Iterate {
            internal,
            external: start,
            residuals,
            cost,
        };
        let mut func_evals = 1;
        let mut jac_evals = 0;
        let mut iterations = 0;

        let criteria = ConvergenceCriteria::new(self.config.xtol, self.config.ftol, self.config.gtol);
        let mut trust_region = TrustRegion::from_config(&self.config);
        let mut scaling = Array1::zeros(0);

        let status = 'outer: loop {
            let jac_external = self.jacobian(problem, &current.external)?;
            jac_evals += 1;
            let jac_internal = chain_rule(&jac_external, &transforms, &current.internal);
            LmStep::update_scaling(&mut scaling, &jac_internal);

            let status = criteria.check_gradient(&jac_internal, &current.residuals);
            if status.is_terminated() {
                break status;
            }

            // Retry with increasing damping until a step is accepted
            loop {
                if iterations >= self.config.max_iterations {
                    break 'outer ConvergenceStatus::MaxIterationsReached;
                }
                iterations += 1;

                let step = LmStep::calculate_step(&jac_internal, &current.residuals, &scaling, &trust_region)?;
                let internal = &current.internal + &step.step;
                let external = to_external(&transforms, &internal);

                let residuals = problem.eval(&external)?;
                func_evals += 1;
                let new_cost = residuals.dot(&residuals);

                let gain_ratio = TrustRegion::gain_ratio(current.cost, new_cost, step.predicted_reduction);
                if trust_region.update_lambda(gain_ratio) {
                    log::debug!(
                        "iteration {}: cost {:.6e} -> {:.6e}, gain ratio {:.3}, lambda {:.3e}",
                        iterations,
                        current.cost,
                        new_cost,
                        gain_ratio,
                        trust_region.lambda
                    );

                    let status = criteria.check_step(
                        &current.internal,
                        &step.step,
                        current.cost,
                        new_cost,
                        step.predicted_reduction,
                        gain_ratio,
                    );
                    current = Iterate {
                        internal,
                        external,
                        residuals,
                        cost: new_cost,
                    };
                    if status.is_terminated() {
                        break 'outer status;
                    }
                    continue 'outer;
                }

                if trust_region.is_saturated() {
                    // The damped step has collapsed below the parameter tolerance
                    if criteria.step_is_negligible(&current.internal, &step.step) {
                        break 'outer ConvergenceStatus::ParameterConvergence;
                    }
                    break 'outer ConvergenceStatus::DampingSaturated;
                }
            }
        };

        if !status.is_converged() {
            let message = format!(
                "{} after {} iterations (cost {:.6e})",
                status.description(),
                iterations,
                current.cost
            );
            log::warn!("{}", message);
            return Err(PvFitError::ConvergenceFailure {
                message,
                iterations,
                last_params: current.external,
            });
        }

        log::info!(
            "{} after {} iterations, cost {:.6e}",
            status.description(),
            iterations,
            current.cost
        );

        let jacobian = self.jacobian(problem, &current.external)?;
        jac_evals += 1;

        Ok(LmResult {
            params: current.external,
            residuals: current.residuals,
            cost: current.cost,
            iterations,
            func_evals,
            jac_evals,
            status,
            message: status.description().to_string(),
            jacobian,
        })
    }

    /// Jacobian of the residuals with respect to the external parameters.
    fn jacobian<P: Problem + Sync>(&self, problem: &P, params: &Array1<f64>) -> Result<Array2<f64>> {
        match self.config.diff_method {
            DiffMethod::Analytical if problem.has_custom_jacobian() => problem.jacobian(params),
            DiffMethod::Analytical | DiffMethod::FiniteDifference => {
                #[cfg(feature = "parallel")]
                {
                    if self.config.parallel_jacobian {
                        return crate::utils::parallel::jacobian_parallel(problem, params, None);
                    }
                }
                finite_difference::jacobian(problem, params, None)
            }
            DiffMethod::CentralDifference => {
                #[cfg(feature = "parallel")]
                {
                    if self.config.parallel_jacobian {
                        return crate::utils::parallel::jacobian_central_parallel(
                            problem, params, None,
                        );
                    }
                }
                finite_difference::jacobian_central(problem, params, None)
            }
        }
    }
}

/// Map internal values back into the box.
fn to_external(transforms: &[BoundsTransform], internal: &Array1<f64>) -> Array1<f64> {
    internal
        .iter()
        .zip(transforms.iter())
        .map(|(&v, t)| t.to_external(v))
        .collect()
}

/// Scale each Jacobian column by d(external)/d(internal).
fn chain_rule(
    jac_external: &Array2<f64>,
    transforms: &[BoundsTransform],
    internal: &Array1<f64>,
) -> Array2<f64> {
    let mut jac = jac_external.clone();
    for (j, mut column) in jac.axis_iter_mut(Axis(1)).enumerate() {
        column *= transforms[j].derivative(internal[j]);
    }
    jac
}
