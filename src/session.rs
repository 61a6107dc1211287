//! Interactive construction of an initial guess.
//!
//! A [`PeakSession`] collects peaks placed by a user (clicking on a plot,
//! scrolling to widen the last peak, toggling the display of the summed
//! curve) and hands them over as the initial guess for a fit once the
//! session is finished. It holds no plotting code: a front end translates its
//! input events into [`SessionEvent`]s or calls [`PeakSession::click`].
//!
//! ```rust
//! use ndarray::Array1;
//! use pvfit_rs::session::{PeakSession, SessionConfig, SessionEvent, SessionState};
//!
//! let x = Array1::linspace(0.0, 700.0, 351);
//! let y = x.mapv(|v: f64| (-(v - 300.0).powi(2) / 800.0).exp() * 40.0);
//!
//! let mut session = PeakSession::new(SessionConfig::from_data(&x, &y).unwrap()).unwrap();
//! session.apply(SessionEvent::AddPeak { x: 300.0, y: 40.0 }).unwrap();
//! session.apply(SessionEvent::ResizeLastPeak { steps: 3 }).unwrap();
//! session.apply(SessionEvent::Finish).unwrap();
//!
//! assert_eq!(session.state(), SessionState::Done);
//! assert_eq!(session.parameter_vector().unwrap().len(), 4);
//! ```

use crate::error::{PvFitError, Result};
use crate::model::eval_peaks;
use crate::parameters::{characteristic_scale, DEFAULT_SCALE_DIVISOR};
use crate::peak::{peaks_to_vector, Peak};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Fraction of the base width below which scrolling cannot shrink a peak.
const MIN_WIDTH_FRACTION: f64 = 1e-3;

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No peaks placed
    Idle,

    /// At least one peak placed
    PeakAdded,

    /// The summed curve of the current peaks is on display
    SumDisplayed,

    /// The guess is final; no more edits are accepted
    Done,
}

/// User actions understood by a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// Place a peak with its top at `(x, y)`
    AddPeak { x: f64, y: f64 },

    /// Delete the peak at `index`
    RemovePeak { index: usize },

    /// Widen (positive) or narrow (negative) the most recent peak. Zero
    /// steps is a no-op.
    ResizeLastPeak { steps: i32 },

    /// Show or hide the summed curve
    ToggleSum,

    /// Accept the current peaks as the initial guess
    Finish,
}

/// Entry of the edit log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EditRecord {
    /// A peak was appended at `index`
    Added { index: usize, peak: Peak },

    /// The peak at `index` was removed
    Removed { index: usize, peak: Peak },

    /// The last peak, at `index`, got a new width
    Resized { index: usize, width: f64 },

    /// The sum curve was switched on
    SumShown,

    /// The sum curve was switched off
    SumHidden,

    /// The session was closed
    Finished,
}

/// Settings of a peak editing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Characteristic scale of the x data
    pub x_scale: f64,

    /// Height of the marker around a peak top
    pub y_scale: f64,

    /// Width of a new peak in units of `x_scale`. Default: 5.0
    pub initial_width: f64,

    /// Shape ratio given to every new peak. Default: 0.5
    pub initial_shape_ratio: f64,

    /// Width change per scroll step, in tenths of `x_scale`. Default: 1.0
    pub scrolling_speed: f64,
}

impl SessionConfig {
    /// Create a configuration with explicit scales and default settings.
    pub fn new(x_scale: f64, y_scale: f64) -> Self {
        Self {
            x_scale,
            y_scale,
            initial_width: 5.0,
            initial_shape_ratio: 0.5,
            scrolling_speed: 1.0,
        }
    }

    /// Derive the scales from the data to be fitted.
    ///
    /// `x_scale` is the characteristic scale of `x`; `y_scale` is twice that
    /// of `y`.
    pub fn from_data(x: &Array1<f64>, y: &Array1<f64>) -> Result<Self> {
        let x_scale = characteristic_scale(x, DEFAULT_SCALE_DIVISOR)?;
        let y_scale = 2.0 * characteristic_scale(y, DEFAULT_SCALE_DIVISOR)?;
        Ok(Self::new(x_scale, y_scale))
    }

    /// Set the width of new peaks in units of `x_scale`.
    pub fn with_initial_width(mut self, width: f64) -> Self {
        self.initial_width = width;
        self
    }

    /// Set the shape ratio of new peaks.
    pub fn with_initial_shape_ratio(mut self, ratio: f64) -> Self {
        self.initial_shape_ratio = ratio;
        self
    }

    /// Set the scrolling speed.
    pub fn with_scrolling_speed(mut self, speed: f64) -> Self {
        self.scrolling_speed = speed;
        self
    }

    /// Width given to a new peak.
    pub fn base_width(&self) -> f64 {
        self.initial_width * self.x_scale
    }

    /// Check that every setting is usable.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("x_scale", self.x_scale),
            ("y_scale", self.y_scale),
            ("initial_width", self.initial_width),
            ("scrolling_speed", self.scrolling_speed),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PvFitError::InvalidInput(format!(
                    "{} must be finite and positive, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.initial_shape_ratio) {
            return Err(PvFitError::InvalidInput(format!(
                "initial shape ratio must lie in [0, 1], got {}",
                self.initial_shape_ratio
            )));
        }

        Ok(())
    }
}

/// Mutable state of a peak editing session.
#[derive(Debug, Clone)]
pub struct PeakSession {
    config: SessionConfig,
    peaks: Vec<Peak>,
    /// Accumulated scroll offset of each peak, relative to the base width
    offsets: Vec<f64>,
    state: SessionState,
    log: Vec<EditRecord>,
}

impl PeakSession {
    /// Start an empty session.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            peaks: Vec::new(),
            offsets: Vec::new(),
            state: SessionState::Idle,
            log: Vec::new(),
        })
    }

    /// The session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The peaks placed so far, in placement order.
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// Every edit applied so far.
    pub fn edit_log(&self) -> &[EditRecord] {
        &self.log
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// * `InvalidState` for any event once the session is done
    /// * `InvalidInput` for a non-finite peak position or an out-of-range
    ///   removal index
    pub fn apply(&mut self, event: SessionEvent) -> Result<()> {
        if self.state == SessionState::Done {
            return Err(PvFitError::InvalidState(format!(
                "session is finished, cannot apply {:?}",
                event
            )));
        }

        match event {
            SessionEvent::AddPeak { x, y } => self.add_peak(x, y),
            SessionEvent::RemovePeak { index } => self.remove_peak(index),
            SessionEvent::ResizeLastPeak { steps } => {
                self.resize_last_peak(steps);
                Ok(())
            }
            SessionEvent::ToggleSum => {
                self.toggle_sum();
                Ok(())
            }
            SessionEvent::Finish => {
                self.state = SessionState::Done;
                self.log.push(EditRecord::Finished);
                log::debug!("session finished with {} peaks", self.peaks.len());
                Ok(())
            }
        }
    }

    /// Handle a click at `(x, y)`.
    ///
    /// A click inside the marker of an existing peak removes that peak;
    /// anywhere else it places a new one. Returns the event that was applied.
    pub fn click(&mut self, x: f64, y: f64) -> Result<SessionEvent> {
        let event = match self.hit_test(x, y) {
            Some(index) => SessionEvent::RemovePeak { index },
            None => SessionEvent::AddPeak { x, y },
        };
        self.apply(event)?;
        Ok(event)
    }

    /// Index of the first peak whose marker contains `(x, y)`.
    ///
    /// The marker is an ellipse centered on the peak top with semi-axes
    /// `x_scale / 2` and `y_scale / 2`.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<usize> {
        let rx = self.config.x_scale / 2.0;
        let ry = self.config.y_scale / 2.0;

        self.peaks.iter().position(|peak| {
            let dx = (x - peak.center) / rx;
            let dy = (y - peak.height) / ry;
            dx * dx + dy * dy <= 1.0
        })
    }

    /// Summed curve of the current peaks, for display.
    pub fn sum_curve(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        eval_peaks(x, &self.peaks)
    }

    /// The final initial guess as a flat parameter vector.
    ///
    /// # Errors
    ///
    /// * `InvalidState` unless the session is done
    pub fn parameter_vector(&self) -> Result<Array1<f64>> {
        if self.state != SessionState::Done {
            return Err(PvFitError::InvalidState(format!(
                "parameter vector requested in state {:?}",
                self.state
            )));
        }
        Ok(peaks_to_vector(&self.peaks))
    }

    /// Finish the session and return the peaks.
    pub fn finish(mut self) -> Result<Vec<Peak>> {
        self.apply(SessionEvent::Finish)?;
        Ok(self.peaks)
    }

    fn add_peak(&mut self, x: f64, y: f64) -> Result<()> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(PvFitError::InvalidInput(format!(
                "peak position must be finite, got ({}, {})",
                x, y
            )));
        }

        let peak = Peak::new(y, x, self.config.base_width(), self.config.initial_shape_ratio);
        self.peaks.push(peak);
        self.offsets.push(0.0);
        self.state = SessionState::PeakAdded;
        self.log.push(EditRecord::Added {
            index: self.peaks.len() - 1,
            peak,
        });
        Ok(())
    }

    fn remove_peak(&mut self, index: usize) -> Result<()> {
        if index >= self.peaks.len() {
            return Err(PvFitError::InvalidInput(format!(
                "no peak at index {} ({} peaks present)",
                index,
                self.peaks.len()
            )));
        }

        let peak = self.peaks.remove(index);
        self.offsets.remove(index);
        self.state = if self.peaks.is_empty() {
            SessionState::Idle
        } else {
            SessionState::PeakAdded
        };
        self.log.push(EditRecord::Removed { index, peak });
        Ok(())
    }

    fn resize_last_peak(&mut self, steps: i32) {
        if steps == 0 {
            return;
        }
        let Some(index) = self.peaks.len().checked_sub(1) else {
            return;
        };

        let base = self.config.base_width();
        let increment = self.config.x_scale * self.config.scrolling_speed / 10.0;
        let mut offset = self.offsets[index];
        let mut width = self.peaks[index].width;

        for _ in 0..steps.unsigned_abs() {
            offset += increment * f64::from(steps.signum());
            if offset > -(1.0 - MIN_WIDTH_FRACTION) * base {
                width = base + offset;
            } else {
                width = base * MIN_WIDTH_FRACTION;
                offset = -(1.0 - MIN_WIDTH_FRACTION) * base;
            }
        }

        self.offsets[index] = offset;
        self.peaks[index].width = width;
        self.state = SessionState::PeakAdded;
        self.log.push(EditRecord::Resized { index, width });
    }

    fn toggle_sum(&mut self) {
        match self.state {
            SessionState::PeakAdded => {
                self.state = SessionState::SumDisplayed;
                self.log.push(EditRecord::SumShown);
            }
            SessionState::SumDisplayed => {
                self.state = SessionState::PeakAdded;
                self.log.push(EditRecord::SumHidden);
            }
            SessionState::Idle | SessionState::Done => {}
        }
    }
}
