//! Parameter bounds implementation
//!
//! This module provides per-parameter box constraints and the Minuit-style
//! parameter transformation that lets an unconstrained optimizer work inside
//! them, together with the [`BoundsPair`] that the fit engine consumes.

use crate::error::{PvFitError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};

/// Relative distance by which starting values sitting on a bound are moved
/// into the interior.
const FEASIBILITY_STEP: f64 = 1e-10;

/// Represents the bounds constraints on a parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Minimum allowed value for the parameter
    pub min: f64,

    /// Maximum allowed value for the parameter
    pub max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// Create a new bounds constraint, checking that `min <= max`.
    ///
    /// `index` is only used to locate the offending parameter in the error.
    ///
    /// # Examples
    ///
    /// ```
    /// use pvfit_rs::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(3, 0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert!(Bounds::new(3, 10.0, 0.0).is_err());
    /// ```
    pub fn new(index: usize, min: f64, max: f64) -> Result<Self> {
        if min.is_nan() || max.is_nan() {
            return Err(PvFitError::invalid_bounds(index, min, max, "bound is NaN"));
        }
        if min > max {
            return Err(PvFitError::invalid_bounds(
                index,
                min,
                max,
                "lower bound exceeds upper bound",
            ));
        }

        Ok(Self { min, max })
    }

    /// Create an unbounded constraint (negative infinity to positive infinity)
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Check if a value is within the bounds
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Check if the parameter is bounded from below
    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    /// Check if the parameter is bounded from above
    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// Check if the bounds pin the parameter to a single value
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    /// Clamp a value to be within the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Clamp a value into the bounds and move it off any finite bound it
    /// sits on.
    ///
    /// The sine and square-root transforms have a zero derivative exactly on
    /// a bound, which would freeze the parameter there.
    pub fn strictly_feasible(&self, value: f64) -> f64 {
        if self.is_fixed() {
            return self.min;
        }

        let value = self.clamp(value);
        let mut result = value;

        if self.has_lower_bound() && value <= self.min {
            result = self.min + FEASIBILITY_STEP * self.min.abs().max(1.0);
        } else if self.has_upper_bound() && value >= self.max {
            result = self.max - FEASIBILITY_STEP * self.max.abs().max(1.0);
        }

        // The step overshoots very narrow intervals
        if !self.is_within_bounds(result) || (result == self.min || result == self.max) {
            result = self.min + (self.max - self.min) / 2.0;
        }

        result
    }
}

/// Implements the Minuit-style parameter transformations for handling bounds constraints
///
/// This allows the optimizer to work with unbounded parameters internally, while the
/// external values are constrained to be within the specified bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    /// Create a new bounds transform
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    /// The bounds this transform maps into.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Transform an internal parameter value to an external value
    pub fn to_external(&self, internal_value: f64) -> f64 {
        let b = self.bounds;

        if b.is_fixed() {
            return b.min;
        }

        match (b.has_lower_bound(), b.has_upper_bound()) {
            (false, false) => internal_value,
            (true, false) => b.min - 1.0 + (internal_value * internal_value + 1.0).sqrt(),
            (false, true) => b.max + 1.0 - (internal_value * internal_value + 1.0).sqrt(),
            (true, true) => b.min + (internal_value.sin() + 1.0) * (b.max - b.min) / 2.0,
        }
    }

    /// Transform an external parameter value to an internal value
    ///
    /// # Returns
    ///
    /// The corresponding internal value, or an error if the external value is
    /// not finite or lies outside the bounds
    pub fn to_internal(&self, external_value: f64) -> Result<f64> {
        let b = self.bounds;

        if !external_value.is_finite() {
            return Err(PvFitError::InvalidParameterVector(format!(
                "non-finite parameter value {}",
                external_value
            )));
        }

        if !b.is_within_bounds(external_value) {
            return Err(PvFitError::InvalidParameterVector(format!(
                "value {} is outside bounds [{}, {}]",
                external_value, b.min, b.max
            )));
        }

        if b.is_fixed() {
            return Ok(0.0);
        }

        let internal = match (b.has_lower_bound(), b.has_upper_bound()) {
            (false, false) => external_value,
            (true, false) => ((external_value - b.min + 1.0).powi(2) - 1.0).sqrt(),
            (false, true) => ((b.max - external_value + 1.0).powi(2) - 1.0).sqrt(),
            (true, true) => {
                let scaled = 2.0 * (external_value - b.min) / (b.max - b.min) - 1.0;
                // Ensure scaled is in [-1, 1] for asin
                scaled.clamp(-1.0, 1.0).asin()
            }
        };

        Ok(internal)
    }

    /// Derivative of the external value with respect to the internal value.
    ///
    /// Multiplying a Jacobian column by this factor gives the Jacobian with
    /// respect to the internal parameter.
    pub fn derivative(&self, internal_value: f64) -> f64 {
        let b = self.bounds;

        if b.is_fixed() {
            return 0.0;
        }

        match (b.has_lower_bound(), b.has_upper_bound()) {
            (false, false) => 1.0,
            (true, false) => internal_value / (internal_value * internal_value + 1.0).sqrt(),
            (false, true) => -internal_value / (internal_value * internal_value + 1.0).sqrt(),
            (true, true) => (b.max - b.min) * internal_value.cos() / 2.0,
        }
    }
}

/// Element-wise lower and upper bounds for a flat parameter vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundsPair {
    /// Lower bound of each parameter
    pub lower: Array1<f64>,

    /// Upper bound of each parameter
    pub upper: Array1<f64>,
}

impl BoundsPair {
    /// Create a bounds pair, checking lengths and ordering.
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self> {
        let pair = Self { lower, upper };
        pair.validate()?;
        Ok(pair)
    }

    /// Bounds that leave all `n` parameters free.
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: Array1::from_elem(n, NEG_INFINITY),
            upper: Array1::from_elem(n, INFINITY),
        }
    }

    /// Number of bounded parameters.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Whether the pair holds no parameters.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Check that both sides have the same length and that every pair is
    /// ordered.
    pub fn validate(&self) -> Result<()> {
        if self.lower.len() != self.upper.len() {
            return Err(PvFitError::DimensionMismatch(format!(
                "lower bounds have length {}, upper bounds have length {}",
                self.lower.len(),
                self.upper.len()
            )));
        }

        for index in 0..self.lower.len() {
            Bounds::new(index, self.lower[index], self.upper[index])?;
        }

        Ok(())
    }

    /// Bounds of the parameter at `index`.
    ///
    /// The pair is assumed to be valid; call [`BoundsPair::validate`] first.
    pub fn get(&self, index: usize) -> Bounds {
        Bounds {
            min: self.lower[index],
            max: self.upper[index],
        }
    }

    /// One transform per parameter.
    pub fn transforms(&self) -> Vec<BoundsTransform> {
        (0..self.len())
            .map(|i| BoundsTransform::new(self.get(i)))
            .collect()
    }

    /// Whether every element of `params` lies within its bounds.
    pub fn contains(&self, params: &Array1<f64>) -> bool {
        params.len() == self.len()
            && params
                .iter()
                .enumerate()
                .all(|(i, &v)| self.get(i).is_within_bounds(v))
    }

    /// Clip `params` into the box.
    pub fn clip(&self, params: &Array1<f64>) -> Array1<f64> {
        Array1::from_iter(params.iter().enumerate().map(|(i, &v)| self.get(i).clamp(v)))
    }

    /// Clip `params` into the box and move values off the bounds they touch.
    pub fn make_strictly_feasible(&self, params: &Array1<f64>) -> Array1<f64> {
        Array1::from_iter(
            params
                .iter()
                .enumerate()
                .map(|(i, &v)| self.get(i).strictly_feasible(v)),
        )
    }
}
