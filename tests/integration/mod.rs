//! End-to-end workflows: synthetic data, manual guess, fit, report

use crate::test_helpers::{init_logging, rel_err};
use approx::assert_relative_eq;
use pvfit_rs::synthetic::{reference_peaks, Noise};
use pvfit_rs::{
    FitReport, FitResult, PeakFitter, PeakSession, SessionConfig, SessionEvent, SyntheticSpectrum,
};

#[test]
fn test_session_guess_to_fit() {
    init_logging();

    let truth = reference_peaks();
    let (x, y) = SyntheticSpectrum::new(truth.clone())
        .with_noise(Noise::Gaussian { sigma: 0.1 })
        .with_seed(17)
        .generate()
        .unwrap();

    let config = SessionConfig::from_data(&x, &y).unwrap();
    let increment = config.x_scale * config.scrolling_speed / 10.0;
    let base = config.base_width();
    let mut session = PeakSession::new(config).unwrap();

    // Click slightly off each top, then scroll to roughly the right width
    for peak in &truth {
        session.click(peak.center + 3.0, peak.height * 1.05).unwrap();
        let steps = ((peak.width * 1.1 - base) / increment).round() as i32;
        session
            .apply(SessionEvent::ResizeLastPeak { steps })
            .unwrap();
    }
    session.apply(SessionEvent::ToggleSum).unwrap();
    session.apply(SessionEvent::Finish).unwrap();

    let guess = session.parameter_vector().unwrap();
    assert_eq!(guess.len(), 16);

    let result = PeakFitter::new()
        .fit_with_derived_bounds(&x, &y, session.peaks())
        .unwrap();
    let fitted = result.peaks().unwrap();

    for (fit, true_peak) in fitted.iter().zip(truth.iter()) {
        assert!(rel_err(fit.height, true_peak.height) < 0.1, "{:?}", fit);
        assert!((fit.center - true_peak.center).abs() < 3.0, "{:?}", fit);
    }

    let report = FitReport::new(&guess, &result).unwrap();
    assert_eq!(report.to_string().lines().count(), 2 + 16 + 1);
}

#[test]
fn test_result_json_round_trip() {
    let (x, y) = SyntheticSpectrum::new(reference_peaks()[..1].to_vec())
        .with_noise(Noise::Gaussian { sigma: 0.05 })
        .with_seed(1)
        .generate()
        .unwrap();

    let guess = [pvfit_rs::Peak::new(48.0, 204.0, 90.0, 0.5)];
    let result = PeakFitter::new()
        .fit_with_derived_bounds(&x, &y, &guess)
        .unwrap();

    let json = result.to_json().unwrap();
    let back: FitResult = serde_json::from_str(&json).unwrap();

    assert_eq!(back.params.len(), 4);
    assert_eq!(back.iterations, result.iterations);
    for i in 0..4 {
        assert_relative_eq!(back.params[i], result.params[i], max_relative = 1e-15);
        assert_relative_eq!(
            back.standard_errors[i],
            result.standard_errors[i],
            max_relative = 1e-15
        );
    }
}

#[test]
fn test_reference_spectrum_is_reproducible() {
    let a = SyntheticSpectrum::reference().with_seed(3).generate().unwrap();
    let b = SyntheticSpectrum::reference().with_seed(3).generate().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.0.len(), 436);
}
