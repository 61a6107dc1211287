//! Tests for the peak profile and the multi-peak model

use approx::assert_relative_eq;
use ndarray::{array, Array1};
use pvfit_rs::model::{eval_peaks, fitting_function, Model, PseudoVoigtSum};
use pvfit_rs::peak::{peaks_from_vector, peaks_to_vector, pseudo_voigt};
use pvfit_rs::problem::{CurveFitProblem, Problem};
use pvfit_rs::utils::finite_difference;
use pvfit_rs::{Peak, PvFitError};

#[test]
fn test_height_and_half_maximum() {
    let x = array![100.0, 90.0, 110.0];
    for &ratio in &[0.0, 0.3, 0.7, 1.0] {
        let y = pseudo_voigt(&x, 20.0, 100.0, 20.0, ratio).unwrap();
        assert_relative_eq!(y[0], 20.0, epsilon = 1e-10);
        assert_relative_eq!(y[1], 10.0, epsilon = 1e-10);
        assert_relative_eq!(y[2], 10.0, epsilon = 1e-10);
    }
}

#[test]
fn test_profile_is_symmetric_and_positive() {
    let peak = Peak::new(3.0, 50.0, 7.0, 0.4);
    for d in [0.5, 3.0, 10.0, 100.0] {
        let left = peak.value_at(50.0 - d).unwrap();
        let right = peak.value_at(50.0 + d).unwrap();
        assert_relative_eq!(left, right, epsilon = 1e-12);
        assert!(left > 0.0 && left < 3.0);
    }
}

#[test]
fn test_sum_is_additive() {
    let x = Array1::linspace(0.0, 600.0, 301);
    let a = array![51.0, 200.0, 85.0, 0.7];
    let b = array![10.0, 272.0, 37.0, 0.8];
    let both = array![51.0, 200.0, 85.0, 0.7, 10.0, 272.0, 37.0, 0.8];

    let sum = fitting_function(&x, &a).unwrap() + fitting_function(&x, &b).unwrap();
    let joint = fitting_function(&x, &both).unwrap();

    for (s, j) in sum.iter().zip(joint.iter()) {
        assert_relative_eq!(*s, *j, epsilon = 1e-12);
    }
}

#[test]
fn test_zero_peaks_give_zero_curve() {
    let x = Array1::linspace(-5.0, 5.0, 11);
    let y = fitting_function(&x, &Array1::zeros(0)).unwrap();
    assert_eq!(y, Array1::<f64>::zeros(11));

    let y = eval_peaks(&x, &[]).unwrap();
    assert_eq!(y.len(), 11);
}

#[test]
fn test_malformed_vectors() {
    let x = array![0.0, 1.0];

    let result = fitting_function(&x, &array![1.0, 2.0, 3.0]);
    assert!(matches!(result, Err(PvFitError::InvalidParameterVector(_))));

    let result = fitting_function(&x, &array![1.0, 0.0, 0.0, 0.5]);
    assert!(matches!(result, Err(PvFitError::InvalidParameterVector(_))));

    let result = fitting_function(&x, &array![1.0, 0.0, -2.0, 0.5]);
    assert!(matches!(result, Err(PvFitError::InvalidParameterVector(_))));
}

#[test]
fn test_vector_layout_round_trip() {
    let peaks = vec![Peak::new(1.0, 2.0, 3.0, 0.4), Peak::new(5.0, 6.0, 7.0, 0.8)];
    let params = peaks_to_vector(&peaks);
    assert_eq!(params, array![1.0, 2.0, 3.0, 0.4, 5.0, 6.0, 7.0, 0.8]);
    assert_eq!(peaks_from_vector(&params).unwrap(), peaks);
}

#[test]
fn test_analytic_jacobian_matches_central_differences() {
    let x = Array1::linspace(150.0, 320.0, 60);
    let params = array![51.0, 200.0, 85.0, 0.7, 10.0, 272.0, 37.0, 0.8];
    let y = Array1::zeros(x.len());

    let problem = CurveFitProblem::new(PseudoVoigtSum, x, y, params.len()).unwrap();
    assert!(problem.has_custom_jacobian());

    let analytic = problem.jacobian(&params).unwrap();
    let numeric = finite_difference::jacobian_central(&problem, &params, Some(1e-6)).unwrap();

    assert_eq!(analytic.dim(), numeric.dim());
    for (a, n) in analytic.iter().zip(numeric.iter()) {
        assert_relative_eq!(*a, *n, epsilon = 1e-6, max_relative = 1e-5);
    }
}

#[test]
fn test_model_jacobian_sign() {
    // Residuals are y - f, so the problem Jacobian is the negated model Jacobian
    let x = array![0.0, 1.0, 2.0];
    let params = array![2.0, 1.0, 1.5, 0.5];
    let problem = CurveFitProblem::new(PseudoVoigtSum, x.clone(), Array1::zeros(3), 4).unwrap();

    let model_jac = PseudoVoigtSum.jacobian(&x, &params).unwrap();
    let problem_jac = problem.jacobian(&params).unwrap();
    assert_eq!(problem_jac, -model_jac);
}

#[test]
fn test_area_of_pure_profiles() {
    let x = Array1::linspace(-5000.0, 5000.0, 2_000_001);
    let dx = x[1] - x[0];

    let gauss = Peak::new(2.0, 0.0, 10.0, 1.0);
    let integral: f64 = gauss.eval(&x).unwrap().sum() * dx;
    assert_relative_eq!(integral, gauss.area(), max_relative = 1e-6);

    let lorentz = Peak::new(2.0, 0.0, 10.0, 0.0);
    let integral: f64 = lorentz.eval(&x).unwrap().sum() * dx;
    // Lorentzian tails beyond the window carry about w / (π · 5000) of the area
    assert_relative_eq!(integral, lorentz.area(), max_relative = 2e-3);
}
