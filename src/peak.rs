//! Pseudo-Voigt peak profile.
//!
//! A pseudo-Voigt profile is a weighted sum of a unit-area Gaussian and a
//! unit-area Lorentzian sharing the same center and full width at half
//! maximum (FWHM). The profile is scaled so that `height` is the value of
//! the curve at its center, whatever the Gaussian/Lorentzian mix.
//!
//! The profile is defined as:
//!
//! ```text
//! G(x) = (2/w) * sqrt(ln2/π) * exp(-(4 ln2 / w²) (x - x0)²)
//! L(x) = (1/π) * (w/2) / ((x - x0)² + (w/2)²)
//! I    = h * π * (w/2) / (1 + factor * (sqrt(π ln2) - 1))
//! f(x) = I * (factor * G(x) + (1 - factor) * L(x))
//! ```

use crate::error::{PvFitError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::f64::consts::{LN_2, PI};

/// Number of parameters describing one peak in a flat parameter vector.
pub const PARAMS_PER_PEAK: usize = 4;

/// Display names of the four peak parameters, in parameter-vector order.
pub const PARAMETER_NAMES: [&str; PARAMS_PER_PEAK] =
    ["Height", "Center", "FWHM", "Ratio Gauss/Lorentz"];

/// A single pseudo-Voigt peak.
///
/// The field order matches the layout of one quadruple in a flat parameter
/// vector: `[height, center, width, shape_ratio]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Value of the profile at its center
    pub height: f64,

    /// Position of the peak on the x-axis
    pub center: f64,

    /// Full width at half maximum, must be > 0
    pub width: f64,

    /// Weight of the Gaussian term; `1 - shape_ratio` weights the Lorentzian
    pub shape_ratio: f64,
}

/// Partial derivatives of a peak profile at one point, in parameter order.
pub type PeakGradient = [f64; PARAMS_PER_PEAK];

impl Peak {
    /// Create a new peak.
    pub fn new(height: f64, center: f64, width: f64, shape_ratio: f64) -> Self {
        Self {
            height,
            center,
            width,
            shape_ratio,
        }
    }

    /// Build a peak from one quadruple of a flat parameter vector.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        if values.len() != PARAMS_PER_PEAK {
            return Err(PvFitError::InvalidParameterVector(format!(
                "expected {} values for a peak, got {}",
                PARAMS_PER_PEAK,
                values.len()
            )));
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Flatten the peak to `[height, center, width, shape_ratio]`.
    pub fn to_array(&self) -> [f64; PARAMS_PER_PEAK] {
        [self.height, self.center, self.width, self.shape_ratio]
    }

    /// Check that the peak can be evaluated.
    ///
    /// The width must be strictly positive and every field finite. The shape
    /// ratio is not checked here: keeping it in `[0, 1]` is the job of the
    /// fitting bounds.
    pub fn validate(&self) -> Result<()> {
        if self.to_array().iter().any(|v| !v.is_finite()) {
            return Err(PvFitError::InvalidParameterVector(format!(
                "peak at center {} has a non-finite parameter",
                self.center
            )));
        }

        if self.width <= 0.0 {
            return Err(PvFitError::InvalidParameterVector(format!(
                "peak at center {} has non-positive width {}",
                self.center, self.width
            )));
        }

        Ok(())
    }

    /// Evaluate the profile at every point of `x`.
    pub fn eval(&self, x: &Array1<f64>) -> Result<Array1<f64>> {
        self.validate()?;
        Ok(x.mapv(|x_val| self.value_unchecked(x_val)))
    }

    /// Evaluate the profile at a single point.
    pub fn value_at(&self, x: f64) -> Result<f64> {
        self.validate()?;
        Ok(self.value_unchecked(x))
    }

    /// Add the profile to `acc` in place. Used by the multi-peak model to
    /// avoid one allocation per peak.
    pub(crate) fn accumulate(&self, x: &Array1<f64>, acc: &mut Array1<f64>) -> Result<()> {
        self.validate()?;
        acc.zip_mut_with(x, |a, &x_val| *a += self.value_unchecked(x_val));
        Ok(())
    }

    /// The normalization that turns the unit-area mix into a profile of
    /// height `height`.
    pub fn intensity(&self) -> f64 {
        let half_width = self.width / 2.0;
        self.height * PI * half_width / self.normalization()
    }

    /// Area under the profile.
    ///
    /// Both components have unit area, so the area is the intensity itself.
    pub fn area(&self) -> f64 {
        self.intensity()
    }

    fn normalization(&self) -> f64 {
        1.0 + self.shape_ratio * ((PI * LN_2).sqrt() - 1.0)
    }

    fn value_unchecked(&self, x: f64) -> f64 {
        let gauss = gaussian(x, self.center, self.width);
        let lorentz = lorentzian(x, self.center, self.width);
        self.intensity() * (self.shape_ratio * gauss + (1.0 - self.shape_ratio) * lorentz)
    }

    /// Partial derivatives of the profile at `x` with respect to
    /// `(height, center, width, shape_ratio)`.
    ///
    /// Writing `d = x - x0`, `a = w/2`, `s = sqrt(π ln2)`, `N = 1 + r (s - 1)`,
    /// `e = exp(-4 ln2 d² / w²)` and `l = a² / (d² + a²)`, the profile
    /// simplifies to `f = h / N * (r s e + (1 - r) l)`, which is what is
    /// differentiated here.
    pub fn gradient(&self, x: f64) -> PeakGradient {
        let Peak {
            height: h,
            center: x0,
            width: w,
            shape_ratio: r,
        } = *self;

        let s = (PI * LN_2).sqrt();
        let k = 4.0 * LN_2;
        let d = x - x0;
        let a = w / 2.0;
        let denom = d * d + a * a;

        let e = (-k * d * d / (w * w)).exp();
        let l = a * a / denom;
        let n = self.normalization();
        let shape = r * s * e + (1.0 - r) * l;

        let de_dx0 = e * 2.0 * k * d / (w * w);
        let dl_dx0 = 2.0 * d * a * a / (denom * denom);
        let de_dw = e * 2.0 * k * d * d / (w * w * w);
        let dl_dw = a * d * d / (denom * denom);

        let d_height = shape / n;
        let d_center = h / n * (r * s * de_dx0 + (1.0 - r) * dl_dx0);
        let d_width = h / n * (r * s * de_dw + (1.0 - r) * dl_dw);
        let d_ratio = h * ((s * e - l) * n - shape * (s - 1.0)) / (n * n);

        [d_height, d_center, d_width, d_ratio]
    }
}

/// Unit-area Gaussian with FWHM `w` centered at `x0`.
pub fn gaussian(x: f64, x0: f64, w: f64) -> f64 {
    (2.0 / w) * (LN_2 / PI).sqrt() * (-(4.0 * LN_2 / (w * w)) * (x - x0).powi(2)).exp()
}

/// Unit-area Lorentzian with FWHM `w` centered at `x0`.
pub fn lorentzian(x: f64, x0: f64, w: f64) -> f64 {
    let half_width = w / 2.0;
    (1.0 / PI) * half_width / ((x - x0).powi(2) + half_width * half_width)
}

/// Evaluate a single pseudo-Voigt profile.
///
/// # Arguments
///
/// * `x` - Evaluation points
/// * `h` - Height of the peak
/// * `x0` - Center of the peak
/// * `w` - Full width at half maximum, must be > 0
/// * `factor` - Weight of the Gaussian term
///
/// # Returns
///
/// * The profile at every point of `x`, or `InvalidParameterVector` when
///   `w <= 0`
pub fn pseudo_voigt(x: &Array1<f64>, h: f64, x0: f64, w: f64, factor: f64) -> Result<Array1<f64>> {
    Peak::new(h, x0, w, factor).eval(x)
}

/// Split a flat parameter vector into peaks.
///
/// The vector must hold whole quadruples; an empty vector gives no peaks.
pub fn peaks_from_vector(params: &Array1<f64>) -> Result<Vec<Peak>> {
    if params.len() % PARAMS_PER_PEAK != 0 {
        return Err(PvFitError::InvalidParameterVector(format!(
            "length {} is not a multiple of {}",
            params.len(),
            PARAMS_PER_PEAK
        )));
    }

    let values = params.to_vec();
    values
        .chunks_exact(PARAMS_PER_PEAK)
        .map(Peak::from_slice)
        .collect()
}

/// Flatten peaks into the `[h0, x0_0, w0, r0, h1, ...]` interchange layout.
pub fn peaks_to_vector(peaks: &[Peak]) -> Array1<f64> {
    peaks.iter().flat_map(|p| p.to_array()).collect()
}
