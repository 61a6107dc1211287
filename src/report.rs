//! Human-readable fit summaries.
//!
//! [`FitReport`] prints, for every parameter of every peak, the initial
//! guess next to the fitted value and its standard error:
//!
//! ```text
//!                               Initial guess     After fitting
//!
//! Peak 0|   Height              :     51.00     ->      50.87 ± 0.21
//! Peak 0|   Center              :    195.00     ->     200.02 ± 0.14
//! ...
//! params error sum = 1.234
//! ```

use crate::error::{PvFitError, Result};
use crate::fit::FitResult;
use crate::peak::{Peak, PARAMETER_NAMES, PARAMS_PER_PEAK};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fitted value with its standard error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    /// Fitted value
    pub value: f64,

    /// Standard error of the value
    #[serde(with = "crate::utils::serde_float")]
    pub error: f64,
}

impl fmt::Display for ParameterEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} ± {:.2}", self.value, self.error)
    }
}

/// One fitted peak, each field paired with its standard error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedPeak {
    pub height: ParameterEstimate,
    pub center: ParameterEstimate,
    pub width: ParameterEstimate,
    pub shape_ratio: ParameterEstimate,
}

impl FittedPeak {
    /// Pair one quadruple of values with the matching quadruple of errors.
    ///
    /// Both slices hold `[height, center, width, shape_ratio]`; missing
    /// trailing entries are NaN.
    pub fn from_slices(values: &[f64], errors: &[f64]) -> Self {
        let estimate = |i: usize| ParameterEstimate {
            value: values.get(i).copied().unwrap_or(f64::NAN),
            error: errors.get(i).copied().unwrap_or(f64::NAN),
        };

        Self {
            height: estimate(0),
            center: estimate(1),
            width: estimate(2),
            shape_ratio: estimate(3),
        }
    }

    /// The fitted peak without errors.
    pub fn peak(&self) -> Peak {
        Peak::new(
            self.height.value,
            self.center.value,
            self.width.value,
            self.shape_ratio.value,
        )
    }

    /// The four estimates in parameter-vector order.
    pub fn estimates(&self) -> [ParameterEstimate; PARAMS_PER_PEAK] {
        [self.height, self.center, self.width, self.shape_ratio]
    }
}

impl fmt::Display for FittedPeak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "h={}, x0={}, w={}, G/L={}",
            self.height, self.center, self.width, self.shape_ratio
        )
    }
}

/// Side-by-side table of the initial guess and the fit result.
#[derive(Debug, Clone, Copy)]
pub struct FitReport<'a> {
    initial: &'a Array1<f64>,
    result: &'a FitResult,
}

impl<'a> FitReport<'a> {
    /// Create a report, checking that the initial guess matches the result.
    pub fn new(initial: &'a Array1<f64>, result: &'a FitResult) -> Result<Self> {
        if initial.len() != result.params.len() || result.standard_errors.len() != result.params.len() {
            return Err(PvFitError::DimensionMismatch(format!(
                "initial guess has {} parameters, fit result has {} values and {} errors",
                initial.len(),
                result.params.len(),
                result.standard_errors.len()
            )));
        }

        Ok(Self { initial, result })
    }
}

impl fmt::Display for FitReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>47}{:>19}", "Initial guess", "After fitting")?;
        writeln!(f)?;

        for (i, (&initial, (&value, &error))) in self
            .initial
            .iter()
            .zip(self.result.params.iter().zip(self.result.standard_errors.iter()))
            .enumerate()
        {
            writeln!(
                f,
                "Peak {}|   {:<20}:  {:8.2}     ->     {:6.2} ± {:4.2}",
                i / PARAMS_PER_PEAK,
                PARAMETER_NAMES[i % PARAMS_PER_PEAK],
                initial,
                value,
                error
            )?;
        }

        write!(f, "params error sum = {:.3}", self.result.error_sum())
    }
}
