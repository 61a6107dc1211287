//! Tests for peak fitting: recoverability, uncertainties and input validation

use crate::test_helpers::{init_logging, noisy_spectrum, rel_err, two_peaks, two_peaks_guess};
use approx::assert_relative_eq;
use ndarray::{array, Array1};
use pvfit_rs::lm::{DiffMethod, LmConfig};
use pvfit_rs::parameters::{characteristic_scale, derive_bounds, BoundsPair, DEFAULT_SCALE_DIVISOR};
use pvfit_rs::peak::peaks_to_vector;
use pvfit_rs::{curve_fit, fitting_function, FitReport, Peak, PeakFitter, PvFitError};

#[test]
fn test_recovers_two_noisy_peaks() {
    init_logging();

    let truth = two_peaks();
    let (x, y) = noisy_spectrum(&truth, 0.1, 2024);

    let result = PeakFitter::new()
        .fit_with_derived_bounds(&x, &y, &two_peaks_guess())
        .unwrap();
    let fitted = result.peaks().unwrap();

    assert_eq!(fitted.len(), 2);
    for (fit, true_peak) in fitted.iter().zip(truth.iter()) {
        assert!(rel_err(fit.height, true_peak.height) < 0.05, "{:?}", fit);
        assert!((fit.center - true_peak.center).abs() < 1.0, "{:?}", fit);
        assert!(rel_err(fit.width, true_peak.width) < 0.05, "{:?}", fit);
        assert!((fit.shape_ratio - true_peak.shape_ratio).abs() < 0.1, "{:?}", fit);
    }
}

#[test]
fn test_uncertainties_reflect_noise_level() {
    let truth = two_peaks();
    let (x, y) = noisy_spectrum(&truth, 0.1, 7);

    let result = PeakFitter::new()
        .fit_with_derived_bounds(&x, &y, &two_peaks_guess())
        .unwrap();

    assert_eq!(result.nfree, x.len() - 8);
    // Reduced chi-square estimates sigma²
    assert!((result.redchi - 0.01).abs() < 0.003, "redchi = {}", result.redchi);

    let truth_vec = peaks_to_vector(&truth);
    for i in 0..8 {
        let error = result.standard_errors[i];
        assert!(error.is_finite() && error > 0.0);
        assert!(
            (result.params[i] - truth_vec[i]).abs() < 5.0 * error,
            "parameter {} off by more than 5 sigma",
            i
        );
        assert_relative_eq!(result.correlation[[i, i]], 1.0, epsilon = 1e-12);
    }

    // Residuals are y minus the fitted curve
    let curve = fitting_function(&x, &result.params).unwrap();
    for i in [0, 100, 200] {
        assert_relative_eq!(result.residuals[i], y[i] - curve[i], epsilon = 1e-10);
    }
}

#[test]
fn test_fitted_values_respect_bounds() {
    let truth = vec![Peak::new(20.0, 100.0, 15.0, 0.5)];
    let x = Array1::linspace(0.0, 200.0, 401);
    let y = fitting_function(&x, &peaks_to_vector(&truth)).unwrap();

    // The true height lies above the box
    let initial = array![10.0, 100.0, 15.0, 0.5];
    let bounds = derive_bounds(&initial, 2.0).unwrap();
    let result = curve_fit(&x, &y, &initial, &bounds).unwrap();

    assert!(bounds.contains(&result.params));
    assert!(result.params[0] > 12.5);
}

#[test]
fn test_height_at_active_bound_is_optimal() {
    init_logging();

    let truth = vec![Peak::new(20.0, 100.0, 15.0, 0.5)];
    let x = Array1::linspace(0.0, 200.0, 401);
    let y = fitting_function(&x, &peaks_to_vector(&truth)).unwrap();

    let initial = array![10.0, 100.0, 15.0, 0.5];
    let bounds = derive_bounds(&initial, 2.0).unwrap();
    let result = curve_fit(&x, &y, &initial, &bounds).unwrap();

    // Best fit with the height held at its upper bound
    let mut pinned_bounds = bounds.clone();
    pinned_bounds.lower[0] = bounds.upper[0];
    let mut pinned_start = initial.clone();
    pinned_start[0] = bounds.upper[0];
    let pinned = curve_fit(&x, &y, &pinned_start, &pinned_bounds).unwrap();

    assert_relative_eq!(result.params[0], bounds.upper[0], max_relative = 1e-4);
    assert!(
        result.cost <= pinned.cost * (1.0 + 1e-6),
        "bounded fit stopped at cost {} above the pinned optimum {}",
        result.cost,
        pinned.cost
    );
}

#[test]
fn test_differentiation_methods_agree_on_peaks() {
    let (x, y) = noisy_spectrum(&two_peaks(), 0.1, 11);
    let guess = two_peaks_guess();

    let analytic = PeakFitter::new()
        .fit_with_derived_bounds(&x, &y, &guess)
        .unwrap();
    let central = PeakFitter::new()
        .with_config(LmConfig {
            diff_method: DiffMethod::CentralDifference,
            ..LmConfig::default()
        })
        .fit_with_derived_bounds(&x, &y, &guess)
        .unwrap();

    for i in 0..8 {
        assert_relative_eq!(
            analytic.params[i],
            central.params[i],
            epsilon = 1e-3,
            max_relative = 1e-3
        );
    }
}

#[test]
fn test_dimension_validation() {
    let x = Array1::linspace(0.0, 10.0, 11);
    let y = Array1::zeros(10);
    let initial = array![1.0, 5.0, 1.0, 0.5];
    let bounds = derive_bounds(&initial, 1.0).unwrap();

    assert!(matches!(
        curve_fit(&x, &y, &initial, &bounds),
        Err(PvFitError::DimensionMismatch(_))
    ));

    let y = Array1::zeros(11);
    assert!(matches!(
        curve_fit(&x, &y, &array![1.0, 5.0, 1.0], &BoundsPair::unbounded(3)),
        Err(PvFitError::DimensionMismatch(_))
    ));
    assert!(matches!(
        curve_fit(&x, &y, &initial, &BoundsPair::unbounded(8)),
        Err(PvFitError::DimensionMismatch(_))
    ));
}

#[test]
fn test_unbounded_width_is_rejected() {
    let x = Array1::linspace(0.0, 10.0, 11);
    let y = Array1::zeros(11);
    let initial = array![1.0, 5.0, 1.0, 0.5];

    match curve_fit(&x, &y, &initial, &BoundsPair::unbounded(4)) {
        Err(PvFitError::InvalidBounds { index, .. }) => assert_eq!(index, 2),
        other => panic!("Expected InvalidBounds, got {:?}", other),
    }
}

#[test]
fn test_budget_exhaustion_reports_last_iterate() {
    let (x, y) = noisy_spectrum(&two_peaks(), 0.1, 3);

    let result = PeakFitter::new()
        .with_max_iterations(1)
        .fit_with_derived_bounds(&x, &y, &two_peaks_guess());

    match result {
        Err(PvFitError::ConvergenceFailure {
            iterations,
            last_params,
            message,
        }) => {
            assert_eq!(iterations, 1);
            assert_eq!(last_params.len(), 8);
            assert!(!message.is_empty());
        }
        other => panic!("Expected ConvergenceFailure, got {:?}", other),
    }
}

#[test]
fn test_report_lists_every_parameter() {
    let (x, y) = noisy_spectrum(&two_peaks(), 0.1, 5);
    let guess = peaks_to_vector(&two_peaks_guess());
    let x_scale = characteristic_scale(&x, DEFAULT_SCALE_DIVISOR).unwrap();
    let bounds = derive_bounds(&guess, x_scale).unwrap();

    let result = curve_fit(&x, &y, &guess, &bounds).unwrap();
    let report = FitReport::new(&guess, &result).unwrap().to_string();

    assert_eq!(report.lines().filter(|l| l.starts_with("Peak 1|")).count(), 4);
    assert!(report.contains("FWHM"));
    assert!(report.lines().last().unwrap().starts_with("params error sum = "));

    let fitted = result.fitted_peaks();
    assert_eq!(fitted.len(), 2);
    assert_eq!(fitted[1].center.value, result.params[5]);
    assert_eq!(fitted[1].center.error, result.standard_errors[5]);
}
