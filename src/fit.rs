//! Fitting a sum of pseudo-Voigt peaks to data.
//!
//! [`PeakFitter`] checks the inputs, runs the bounded Levenberg-Marquardt
//! solver on a [`CurveFitProblem`] built from [`PseudoVoigtSum`], and
//! estimates parameter uncertainties from the Jacobian at the solution.
//! [`curve_fit`] is the flat-vector shorthand with default settings.
//!
//! # Example
//!
//! ```rust
//! use ndarray::{array, Array1};
//! use pvfit_rs::fit::curve_fit;
//! use pvfit_rs::model::fitting_function;
//! use pvfit_rs::parameters::{characteristic_scale, derive_bounds};
//!
//! let x = Array1::range(0.0, 100.0, 0.5);
//! let truth = array![8.0, 40.0, 6.0, 0.6];
//! let y = fitting_function(&x, &truth).unwrap();
//!
//! let initial = array![7.0, 41.0, 7.0, 0.5];
//! let bounds = derive_bounds(&initial, characteristic_scale(&x, 70.0).unwrap()).unwrap();
//! let result = curve_fit(&x, &y, &initial, &bounds).unwrap();
//!
//! assert!((result.params[1] - 40.0).abs() < 1e-4);
//! ```

use crate::error::{PvFitError, Result};
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::model::PseudoVoigtSum;
use crate::parameters::{characteristic_scale, BoundsPair, BoundsRule, DEFAULT_SCALE_DIVISOR};
use crate::peak::{peaks_from_vector, peaks_to_vector, Peak, PARAMS_PER_PEAK};
use crate::problem::CurveFitProblem;
use crate::report::FittedPeak;
use crate::uncertainty::uncertainty_from_jacobian;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Outcome of a peak fit.
///
/// Vectors indexed by parameter follow the flat `[h, x0, w, r, ...]`
/// layout of the initial guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Fitted parameter vector
    pub params: Array1<f64>,

    /// Standard error of each fitted parameter
    #[serde(with = "crate::utils::serde_float::array")]
    pub standard_errors: Array1<f64>,

    /// Covariance matrix of the fitted parameters
    #[serde(with = "crate::utils::serde_float::array")]
    pub covariance: Array2<f64>,

    /// Correlation matrix of the fitted parameters
    #[serde(with = "crate::utils::serde_float::array")]
    pub correlation: Array2<f64>,

    /// Data minus model at the fitted parameters
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Reduced chi-square
    #[serde(with = "crate::utils::serde_float")]
    pub redchi: f64,

    /// Degrees of freedom
    pub nfree: usize,

    /// Number of solver iterations
    pub iterations: usize,

    /// Number of residual evaluations
    pub func_evals: usize,

    /// Why the solver stopped
    pub message: String,
}

impl FitResult {
    /// Result for a fit without any peak.
    fn empty(y: &Array1<f64>) -> Self {
        let cost = y.dot(y);
        let nfree = y.len();
        Self {
            params: Array1::zeros(0),
            standard_errors: Array1::zeros(0),
            covariance: Array2::zeros((0, 0)),
            correlation: Array2::zeros((0, 0)),
            residuals: y.clone(),
            cost,
            redchi: if nfree > 0 {
                cost / nfree as f64
            } else {
                f64::INFINITY
            },
            nfree,
            iterations: 0,
            func_evals: 0,
            message: "No peaks to fit".to_string(),
        }
    }

    /// Number of fitted peaks.
    pub fn n_peaks(&self) -> usize {
        self.params.len() / PARAMS_PER_PEAK
    }

    /// The fitted peaks without their errors.
    pub fn peaks(&self) -> Result<Vec<Peak>> {
        peaks_from_vector(&self.params)
    }

    /// The fitted peaks, each field paired with its standard error.
    pub fn fitted_peaks(&self) -> Vec<FittedPeak> {
        let values = self.params.to_vec();
        let errors = self.standard_errors.to_vec();
        values
            .chunks_exact(PARAMS_PER_PEAK)
            .zip(errors.chunks_exact(PARAMS_PER_PEAK))
            .map(|(values, errors)| FittedPeak::from_slices(values, errors))
            .collect()
    }

    /// Sum of all standard errors, a rough indication of the overall
    /// uncertainty of the fit.
    pub fn error_sum(&self) -> f64 {
        self.standard_errors.sum()
    }

    /// Serialize the result to JSON. Infinite and NaN values are written as
    /// the strings `"inf"`, `"-inf"` and `"nan"` and read back by `from_json`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a result written by [`FitResult::to_json`].
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Fits sums of pseudo-Voigt peaks with a configurable solver.
#[derive(Debug, Clone, Default)]
pub struct PeakFitter {
    config: LmConfig,
    rule: BoundsRule,
}

impl PeakFitter {
    /// Create a fitter with the default solver settings and bounds rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given solver configuration.
    pub fn with_config(mut self, config: LmConfig) -> Self {
        self.config = config;
        self
    }

    /// Use the given rule when bounds are derived from the initial guess.
    pub fn with_bounds_rule(mut self, rule: BoundsRule) -> Self {
        self.rule = rule;
        self
    }

    /// Set the maximum number of solver iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// The solver configuration.
    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// The bounds rule.
    pub fn bounds_rule(&self) -> &BoundsRule {
        &self.rule
    }

    /// Fit typed peaks within explicit bounds.
    pub fn fit(
        &self,
        x: &Array1<f64>,
        y: &Array1<f64>,
        initial: &[Peak],
        bounds: &BoundsPair,
    ) -> Result<FitResult> {
        self.fit_vector(x, y, &peaks_to_vector(initial), bounds)
    }

    /// Fit typed peaks, deriving bounds from them with the characteristic
    /// scale of `x`.
    pub fn fit_with_derived_bounds(
        &self,
        x: &Array1<f64>,
        y: &Array1<f64>,
        initial: &[Peak],
    ) -> Result<FitResult> {
        let x_scale = characteristic_scale(x, DEFAULT_SCALE_DIVISOR)?;
        self.fit_with_scale(x, y, initial, x_scale)
    }

    /// Fit typed peaks, deriving bounds from them with the given x-scale.
    pub fn fit_with_scale(
        &self,
        x: &Array1<f64>,
        y: &Array1<f64>,
        initial: &[Peak],
        x_scale: f64,
    ) -> Result<FitResult> {
        let initial = peaks_to_vector(initial);
        let bounds = self.rule.derive(&initial, x_scale)?;
        self.fit_vector(x, y, &initial, &bounds)
    }

    /// Fit a flat parameter vector within explicit bounds.
    ///
    /// # Arguments
    ///
    /// * `x` - Sample positions
    /// * `y` - Observed values, same length as `x`
    /// * `initial` - Initial guess, a whole number of peak quadruples
    /// * `bounds` - Lower and upper bound of every parameter
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` for `x`/`y`, quadruple or bounds length problems
    /// * `InvalidBounds` for an inverted or NaN pair, or a width lower bound
    ///   that is not positive
    /// * `InvalidParameterVector` for a non-finite value or non-positive
    ///   width in the initial guess
    /// * `ConvergenceFailure` when the solver exhausts its budget
    pub fn fit_vector(
        &self,
        x: &Array1<f64>,
        y: &Array1<f64>,
        initial: &Array1<f64>,
        bounds: &BoundsPair,
    ) -> Result<FitResult> {
        self.check_inputs(x, y, initial, bounds)?;

        if initial.is_empty() {
            log::debug!("no peaks given, returning the data as residuals");
            return Ok(FitResult::empty(y));
        }

        log::info!(
            "fitting {} peaks to {} points",
            initial.len() / PARAMS_PER_PEAK,
            x.len()
        );

        let problem = CurveFitProblem::new(PseudoVoigtSum, x.clone(), y.clone(), initial.len())?;
        let solver = LevenbergMarquardt::with_config(self.config.clone());
        let solution = solver.minimize(&problem, initial.clone(), bounds)?;

        let uncertainty = uncertainty_from_jacobian(&solution.jacobian, solution.cost)?;

        Ok(FitResult {
            params: solution.params,
            standard_errors: uncertainty.standard_errors,
            covariance: uncertainty.covariance,
            correlation: uncertainty.correlation,
            residuals: solution.residuals,
            cost: solution.cost,
            redchi: uncertainty.redchi,
            nfree: uncertainty.nfree,
            iterations: solution.iterations,
            func_evals: solution.func_evals,
            message: solution.message,
        })
    }

    fn check_inputs(
        &self,
        x: &Array1<f64>,
        y: &Array1<f64>,
        initial: &Array1<f64>,
        bounds: &BoundsPair,
    ) -> Result<()> {
        if x.len() != y.len() {
            return Err(PvFitError::DimensionMismatch(format!(
                "x has {} points but y has {}",
                x.len(),
                y.len()
            )));
        }

        if initial.len() % PARAMS_PER_PEAK != 0 {
            return Err(PvFitError::DimensionMismatch(format!(
                "initial guess has length {}, not a multiple of {}",
                initial.len(),
                PARAMS_PER_PEAK
            )));
        }

        if bounds.lower.len() != initial.len() || bounds.upper.len() != initial.len() {
            return Err(PvFitError::DimensionMismatch(format!(
                "bounds have lengths {} and {} for {} parameters",
                bounds.lower.len(),
                bounds.upper.len(),
                initial.len()
            )));
        }

        bounds.validate()?;

        for index in (2..initial.len()).step_by(PARAMS_PER_PEAK) {
            if bounds.lower[index] <= 0.0 {
                return Err(PvFitError::invalid_bounds(
                    index,
                    bounds.lower[index],
                    bounds.upper[index],
                    "width lower bound must be positive",
                ));
            }
        }

        for peak in peaks_from_vector(initial)? {
            peak.validate()?;
        }

        Ok(())
    }
}

/// Fit a flat parameter vector with default solver settings.
///
/// See [`PeakFitter::fit_vector`].
pub fn curve_fit(
    x: &Array1<f64>,
    y: &Array1<f64>,
    initial: &Array1<f64>,
    bounds: &BoundsPair,
) -> Result<FitResult> {
    PeakFitter::default().fit_vector(x, y, initial, bounds)
}
