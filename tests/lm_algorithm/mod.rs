//! Integration tests for the Levenberg-Marquardt algorithm on generic problems.

use approx::assert_relative_eq;
use ndarray::{array, Array1, Array2};
use pvfit_rs::lm::{ConvergenceStatus, DiffMethod, LevenbergMarquardt, LmConfig};
use pvfit_rs::parameters::BoundsPair;
use pvfit_rs::{Problem, PvFitError, Result};

/// Test Problem: exponential decay y = a * exp(-k * t)
struct DecayProblem {
    t: Array1<f64>,
    y: Array1<f64>,
}

impl DecayProblem {
    fn new(a: f64, k: f64) -> Self {
        let t = Array1::linspace(0.0, 5.0, 26);
        let y = t.mapv(|t| a * (-k * t).exp());
        Self { t, y }
    }
}

impl Problem for DecayProblem {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != 2 {
            return Err(PvFitError::DimensionMismatch(format!(
                "Expected 2 parameters, got {}",
                params.len()
            )));
        }

        let (a, k) = (params[0], params[1]);
        Ok(&self.y - &self.t.mapv(|t| a * (-k * t).exp()))
    }

    fn parameter_count(&self) -> usize {
        2
    }

    fn residual_count(&self) -> usize {
        self.t.len()
    }

    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>> {
        let (a, k) = (params[0], params[1]);
        let mut jac = Array2::zeros((self.t.len(), 2));

        for (i, &t) in self.t.iter().enumerate() {
            let e = (-k * t).exp();
            jac[[i, 0]] = -e;
            jac[[i, 1]] = a * t * e;
        }

        Ok(jac)
    }

    fn has_custom_jacobian(&self) -> bool {
        true
    }
}

#[test]
fn test_decay_unbounded() {
    let problem = DecayProblem::new(4.0, 0.8);
    let solver = LevenbergMarquardt::new();

    let result = solver
        .minimize(&problem, array![1.0, 0.1], &BoundsPair::unbounded(2))
        .unwrap();

    assert!(result.success(), "{}", result.message);
    assert_relative_eq!(result.params[0], 4.0, epsilon = 1e-6);
    assert_relative_eq!(result.params[1], 0.8, epsilon = 1e-6);
    assert!(result.cost < 1e-12);
    assert_eq!(result.jacobian.dim(), (26, 2));
}

#[test]
fn test_decay_with_bounds() {
    let problem = DecayProblem::new(4.0, 0.8);
    let bounds = BoundsPair::new(array![0.0, 0.0], array![10.0, 0.5]).unwrap();

    let result = LevenbergMarquardt::new()
        .minimize(&problem, array![1.0, 0.1], &bounds)
        .unwrap();

    assert!(bounds.contains(&result.params));
    // The decay rate is held at its upper bound
    assert!(result.params[1] > 0.49);
    assert!(result.params[0] < 4.0);
}

#[test]
fn test_differentiation_methods_agree() {
    let problem = DecayProblem::new(2.5, 1.3);
    let bounds = BoundsPair::unbounded(2);
    let initial = array![1.0, 1.0];

    let analytic = LevenbergMarquardt::new()
        .minimize(&problem, initial.clone(), &bounds)
        .unwrap();

    for method in [DiffMethod::FiniteDifference, DiffMethod::CentralDifference] {
        for parallel in [false, true] {
            let result = LevenbergMarquardt::new()
                .with_differentiation_method(method)
                .with_parallel_jacobian(parallel)
                .minimize(&problem, initial.clone(), &bounds)
                .unwrap();

            assert_relative_eq!(result.params[0], analytic.params[0], epsilon = 1e-5);
            assert_relative_eq!(result.params[1], analytic.params[1], epsilon = 1e-5);
        }
    }
}

#[test]
fn test_exhausted_budget() {
    let problem = DecayProblem::new(4.0, 0.8);
    let solver = LevenbergMarquardt::with_config(LmConfig {
        max_iterations: 2,
        ..LmConfig::default()
    });

    match solver.minimize(&problem, array![100.0, 5.0], &BoundsPair::unbounded(2)) {
        Err(PvFitError::ConvergenceFailure {
            iterations,
            last_params,
            ..
        }) => {
            assert_eq!(iterations, 2);
            assert_eq!(last_params.len(), 2);
            assert!(last_params.iter().all(|v| v.is_finite()));
        }
        other => panic!("Expected ConvergenceFailure, got {:?}", other),
    }
}

#[test]
fn test_invalid_configuration() {
    let problem = DecayProblem::new(4.0, 0.8);
    let solver = LevenbergMarquardt::new().with_ftol(-1.0);

    assert!(solver
        .minimize(&problem, array![1.0, 1.0], &BoundsPair::unbounded(2))
        .is_err());
}

#[test]
fn test_status_messages() {
    assert!(ConvergenceStatus::GradientConvergence.is_converged());
    assert!(!ConvergenceStatus::MaxIterationsReached.is_converged());
    assert!(ConvergenceStatus::DampingSaturated.is_terminated());
    assert!(!ConvergenceStatus::Running.is_terminated());
}
