//! Tests for the interactive peak editing session

use approx::assert_relative_eq;
use ndarray::Array1;
use pvfit_rs::session::EditRecord;
use pvfit_rs::{Peak, PeakSession, PvFitError, SessionConfig, SessionEvent, SessionState};

fn session() -> PeakSession {
    // Markers are 10 wide and 4 tall
    PeakSession::new(SessionConfig::new(10.0, 4.0)).unwrap()
}

#[test]
fn test_config_from_data() {
    let x = Array1::linspace(0.0, 700.0, 71);
    let y = Array1::linspace(0.0, 35.0, 71);
    let config = SessionConfig::from_data(&x, &y).unwrap();

    assert_relative_eq!(config.x_scale, 10.0, epsilon = 1e-12);
    assert_relative_eq!(config.y_scale, 1.0, epsilon = 1e-12);
    assert_relative_eq!(config.base_width(), 50.0, epsilon = 1e-12);
}

#[test]
fn test_full_editing_sequence() {
    let mut s = session();
    assert_eq!(s.state(), SessionState::Idle);

    s.click(200.0, 50.0).unwrap();
    s.click(270.0, 10.0).unwrap();
    s.apply(SessionEvent::ResizeLastPeak { steps: -20 }).unwrap();
    s.apply(SessionEvent::ToggleSum).unwrap();
    assert_eq!(s.state(), SessionState::SumDisplayed);

    // A stray third peak, then removed by clicking on its marker
    s.click(400.0, 3.0).unwrap();
    assert_eq!(s.state(), SessionState::PeakAdded);
    assert_eq!(s.click(401.0, 2.5).unwrap(), SessionEvent::RemovePeak { index: 2 });

    let peaks = s.clone().finish().unwrap();
    assert_eq!(
        peaks,
        vec![Peak::new(50.0, 200.0, 50.0, 0.5), Peak::new(10.0, 270.0, 30.0, 0.5)]
    );

    s.apply(SessionEvent::Finish).unwrap();
    let params = s.parameter_vector().unwrap();
    assert_eq!(params.len(), 8);
    assert_eq!(params[6], 30.0);
}

#[test]
fn test_first_matching_marker_is_removed() {
    let mut s = session();
    s.apply(SessionEvent::AddPeak { x: 100.0, y: 5.0 }).unwrap();
    s.apply(SessionEvent::AddPeak { x: 102.0, y: 5.0 }).unwrap();

    // Inside both markers
    assert_eq!(s.hit_test(101.0, 5.0), Some(0));
    s.click(101.0, 5.0).unwrap();
    assert_eq!(s.peaks(), &[Peak::new(5.0, 102.0, 50.0, 0.5)]);
}

#[test]
fn test_marker_boundary() {
    let mut s = session();
    s.apply(SessionEvent::AddPeak { x: 0.0, y: 0.0 }).unwrap();

    assert_eq!(s.hit_test(5.0, 0.0), Some(0));
    assert_eq!(s.hit_test(0.0, 2.0), Some(0));
    assert_eq!(s.hit_test(4.0, 1.5), None);
    assert_eq!(s.hit_test(0.0, 2.01), None);
}

#[test]
fn test_sum_curve_tracks_peaks() {
    let mut s = session();
    let x = Array1::linspace(0.0, 400.0, 81);
    assert!(s.sum_curve(&x).unwrap().iter().all(|&v| v == 0.0));

    s.apply(SessionEvent::AddPeak { x: 200.0, y: 8.0 }).unwrap();
    let curve = s.sum_curve(&x).unwrap();
    assert_relative_eq!(curve[40], 8.0, epsilon = 1e-12);
}

#[test]
fn test_edit_log_records_changes() {
    let mut s = session();
    s.apply(SessionEvent::AddPeak { x: 1.0, y: 1.0 }).unwrap();
    s.apply(SessionEvent::ResizeLastPeak { steps: 2 }).unwrap();
    s.apply(SessionEvent::ToggleSum).unwrap();
    s.apply(SessionEvent::ToggleSum).unwrap();
    s.apply(SessionEvent::RemovePeak { index: 0 }).unwrap();

    let log = s.edit_log();
    assert_eq!(log.len(), 5);
    assert!(matches!(log[0], EditRecord::Added { index: 0, .. }));
    assert_eq!(log[1], EditRecord::Resized { index: 0, width: 52.0 });
    assert_eq!(log[2], EditRecord::SumShown);
    assert_eq!(log[3], EditRecord::SumHidden);
    assert!(matches!(log[4], EditRecord::Removed { index: 0, .. }));
    assert_eq!(s.state(), SessionState::Idle);
}

#[test]
fn test_rejected_events() {
    let mut s = session();
    assert!(matches!(
        s.apply(SessionEvent::AddPeak { x: f64::NAN, y: 1.0 }),
        Err(PvFitError::InvalidInput(_))
    ));
    assert!(s.peaks().is_empty());

    s.apply(SessionEvent::Finish).unwrap();
    assert!(matches!(
        s.apply(SessionEvent::AddPeak { x: 1.0, y: 1.0 }),
        Err(PvFitError::InvalidState(_))
    ));
}
