//! Derivation of fitting bounds from a manual initial guess.
//!
//! Each peak of the reference vector gets a box around it:
//!
//! | field       | lower               | upper               |
//! |-------------|---------------------|---------------------|
//! | height      | 0.75 × h            | 1.32 × h            |
//! | center      | x0 − 2 × x_scale    | x0 + 2 × x_scale    |
//! | width       | 0.5 × w             | 10 × w              |
//! | shape ratio | 0                   | 1                   |
//!
//! `x_scale` is a single value shared by every peak, usually
//! [`characteristic_scale`] of the x data.

use crate::error::{PvFitError, Result};
use crate::parameters::bounds::BoundsPair;
use crate::peak::{peaks_from_vector, PARAMS_PER_PEAK};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Divisor applied to a data range to get its characteristic scale.
pub const DEFAULT_SCALE_DIVISOR: f64 = 70.0;

/// `(max - min) / divisor` of `values`.
///
/// Used for the center bounds (x data) and for the size of peak markers in
/// an editing session.
pub fn characteristic_scale(values: &Array1<f64>, divisor: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(PvFitError::InvalidInput(
            "cannot compute the scale of an empty sequence".to_string(),
        ));
    }
    if !(divisor.is_finite() && divisor > 0.0) {
        return Err(PvFitError::InvalidInput(format!(
            "scale divisor must be positive, got {}",
            divisor
        )));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok((max - min) / divisor)
}

/// What to do when a multiplier turns a bound pair upside down, which
/// happens for a negative height guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundsPolicy {
    /// Fail with `InvalidBounds`, naming the offending index.
    #[default]
    Reject,

    /// Swap the pair so that lower <= upper.
    Sort,
}

/// Multipliers and offsets used to turn an initial guess into bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsRule {
    /// Lower height bound as a fraction of the initial height. Default: 0.75
    pub height_lower: f64,

    /// Upper height bound as a fraction of the initial height. Default: 1.32
    pub height_upper: f64,

    /// Allowed center shift in units of the x-scale. Default: 2.0
    pub center_span: f64,

    /// Lower width bound as a fraction of the initial width. Default: 0.5
    pub width_lower: f64,

    /// Upper width bound as a multiple of the initial width. Default: 10.0
    pub width_upper: f64,

    /// Lower bound of the shape ratio. Default: 0.0
    pub ratio_lower: f64,

    /// Upper bound of the shape ratio. Default: 1.0
    pub ratio_upper: f64,

    /// Handling of inverted pairs. Default: Reject
    pub policy: BoundsPolicy,
}

impl Default for BoundsRule {
    fn default() -> Self {
        Self {
            height_lower: 0.75,
            height_upper: 1.32,
            center_span: 2.0,
            width_lower: 0.5,
            width_upper: 10.0,
            ratio_lower: 0.0,
            ratio_upper: 1.0,
            policy: BoundsPolicy::Reject,
        }
    }
}

impl BoundsRule {
    /// Create the default rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy for inverted bound pairs.
    pub fn with_policy(mut self, policy: BoundsPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the height multipliers.
    pub fn with_height_factors(mut self, lower: f64, upper: f64) -> Self {
        self.height_lower = lower;
        self.height_upper = upper;
        self
    }

    /// Set the center span in units of the x-scale.
    pub fn with_center_span(mut self, span: f64) -> Self {
        self.center_span = span;
        self
    }

    /// Set the width multipliers.
    pub fn with_width_factors(mut self, lower: f64, upper: f64) -> Self {
        self.width_lower = lower;
        self.width_upper = upper;
        self
    }

    /// Load a rule from JSON. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the rule to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Derive bounds from a reference parameter vector.
    ///
    /// # Arguments
    ///
    /// * `reference` - The manual initial guess, as a flat parameter vector
    /// * `x_scale` - Characteristic scale of the x data, shared by all peaks
    ///
    /// # Returns
    ///
    /// * The bounds pair, or `InvalidParameterVector` for a malformed
    ///   reference, `InvalidInput` for a bad scale, `InvalidBounds` for an
    ///   inverted pair under [`BoundsPolicy::Reject`]
    pub fn derive(&self, reference: &Array1<f64>, x_scale: f64) -> Result<BoundsPair> {
        if !(x_scale.is_finite() && x_scale >= 0.0) {
            return Err(PvFitError::InvalidInput(format!(
                "x-scale must be finite and non-negative, got {}",
                x_scale
            )));
        }

        for peak in peaks_from_vector(reference)? {
            peak.validate()?;
        }

        let n = reference.len();
        let mut lower = Array1::zeros(n);
        let mut upper = Array1::zeros(n);

        for (i, &value) in reference.iter().enumerate() {
            let (lo, hi) = match i % PARAMS_PER_PEAK {
                0 => (value * self.height_lower, value * self.height_upper),
                1 => (
                    value - self.center_span * x_scale,
                    value + self.center_span * x_scale,
                ),
                2 => (value * self.width_lower, value * self.width_upper),
                _ => (self.ratio_lower, self.ratio_upper),
            };

            let (lo, hi) = if lo > hi {
                match self.policy {
                    BoundsPolicy::Reject => {
                        return Err(PvFitError::invalid_bounds(
                            i,
                            lo,
                            hi,
                            "derived from the initial guess is inverted",
                        ))
                    }
                    BoundsPolicy::Sort => {
                        log::debug!("swapping inverted bounds at index {}: [{}, {}]", i, lo, hi);
                        (hi, lo)
                    }
                }
            } else {
                (lo, hi)
            };

            lower[i] = lo;
            upper[i] = hi;
        }

        BoundsPair::new(lower, upper)
    }
}

/// Derive bounds with the default rule.
///
/// See [`BoundsRule::derive`].
pub fn derive_bounds(reference: &Array1<f64>, x_scale: f64) -> Result<BoundsPair> {
    BoundsRule::default().derive(reference, x_scale)
}
