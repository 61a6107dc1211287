//! # pvfit-rs
//!
//! `pvfit-rs` fits sums of pseudo-Voigt peaks to one-dimensional spectra with
//! a bounded Levenberg-Marquardt solver, and reports parameter uncertainties
//! from the covariance of the fit.
//!
//! The library provides:
//! - The pseudo-Voigt peak profile and the multi-peak model
//! - Box bounds derived from an initial guess
//! - A Levenberg-Marquardt solver honoring box bounds
//! - Covariance, correlation and standard errors of the fitted parameters
//! - An interactive peak editing session for building initial guesses
//! - Synthetic spectra for demonstrations and tests
//!
//! ## Basic Usage
//!
//! ```
//! use pvfit_rs::{Peak, PeakFitter, SyntheticSpectrum};
//!
//! let truth = vec![Peak::new(51.0, 200.0, 85.0, 0.7), Peak::new(10.0, 272.0, 37.0, 0.8)];
//! let (x, y) = SyntheticSpectrum::new(truth).generate().unwrap();
//!
//! let guess = [Peak::new(55.0, 205.0, 90.0, 0.5), Peak::new(9.0, 268.0, 40.0, 0.5)];
//! let result = PeakFitter::new().fit_with_derived_bounds(&x, &y, &guess).unwrap();
//!
//! let peaks = result.peaks().unwrap();
//! assert!((peaks[0].center - 200.0).abs() < 1e-3);
//! ```

pub mod error;
pub mod fit;
pub mod lm;
pub mod model;
pub mod parameters;
pub mod peak;
pub mod problem;
pub mod report;
pub mod session;
pub mod synthetic;
pub mod uncertainty;
pub mod utils;

// Re-exports for convenience
pub use error::{PvFitError, Result};
pub use fit::{curve_fit, FitResult, PeakFitter};
pub use lm::{LevenbergMarquardt, LmConfig, LmResult};
pub use model::{fitting_function, Model, PseudoVoigtSum};
pub use parameters::{derive_bounds, BoundsPair, BoundsPolicy, BoundsRule};
pub use peak::{pseudo_voigt, Peak};
pub use problem::{CurveFitProblem, Problem};
pub use report::{FitReport, FittedPeak};
pub use session::{PeakSession, SessionConfig, SessionEvent, SessionState};
pub use synthetic::SyntheticSpectrum;
pub use uncertainty::UncertaintyResult;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
