//! Synthetic spectra for demonstrations, tests and benchmarks.
//!
//! ```rust
//! use pvfit_rs::synthetic::{Noise, SyntheticSpectrum};
//!
//! let (x, y) = SyntheticSpectrum::reference()
//!     .with_noise(Noise::Gaussian { sigma: 0.1 })
//!     .with_seed(7)
//!     .generate()
//!     .unwrap();
//! assert_eq!(x.len(), y.len());
//! ```

use crate::error::{PvFitError, Result};
use crate::model::eval_peaks;
use crate::peak::Peak;
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Noise added on top of the noise-free curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Noise {
    /// Exact curve
    None,

    /// `U[0, 1) · mean(y) · scale` added to every point
    Uniform { scale: f64 },

    /// Zero-mean normal noise with standard deviation `sigma`
    Gaussian { sigma: f64 },
}

impl Noise {
    /// Noise levels must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let (name, level) = match *self {
            Noise::None => return Ok(()),
            Noise::Uniform { scale } => ("uniform scale", scale),
            Noise::Gaussian { sigma } => ("gaussian sigma", sigma),
        };
        if !level.is_finite() || level < 0.0 {
            return Err(PvFitError::InvalidInput(format!(
                "{} must be finite and non-negative, got {}",
                name, level
            )));
        }
        Ok(())
    }
}

/// The four demonstration peaks, `(51, 200, 85, 0.7)`, `(10, 272, 37, 0.8)`,
/// `(2.7, 317, 39, 0.52)` and `(3.9, 471, 62, 0.25)`.
pub fn reference_peaks() -> Vec<Peak> {
    vec![
        Peak::new(51.0, 200.0, 85.0, 0.7),
        Peak::new(10.0, 272.0, 37.0, 0.8),
        Peak::new(2.7, 317.0, 39.0, 0.52),
        Peak::new(3.9, 471.0, 62.0, 0.25),
    ]
}

/// Points `start, start + step, ...` strictly below `stop`.
pub fn arange(start: f64, stop: f64, step: f64) -> Result<Array1<f64>> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite()) || step <= 0.0 {
        return Err(PvFitError::InvalidInput(format!(
            "invalid grid: start={}, stop={}, step={}",
            start, stop, step
        )));
    }

    let n = ((stop - start) / step).ceil().max(0.0) as usize;
    Ok(Array1::from_shape_fn(n, |i| start + i as f64 * step))
}

/// Builder for a noisy sum of pseudo-Voigt peaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpectrum {
    /// Peaks summed into the clean signal
    pub peaks: Vec<Peak>,
    /// First grid point
    pub start: f64,
    /// Exclusive end of the grid
    pub stop: f64,
    /// Grid spacing
    pub step: f64,
    /// Noise added on top of the signal
    pub noise: Noise,
    /// RNG seed, the same seed gives the same spectrum
    pub seed: u64,
}

impl SyntheticSpectrum {
    /// A noise-free spectrum of `peaks` on the grid `0..584` with step 1.34.
    pub fn new(peaks: Vec<Peak>) -> Self {
        Self {
            peaks,
            start: 0.0,
            stop: 584.0,
            step: 1.34,
            noise: Noise::None,
            seed: 0,
        }
    }

    /// The demonstration spectrum: [`reference_peaks`] with uniform noise of
    /// a fifth of the mean intensity.
    pub fn reference() -> Self {
        Self::new(reference_peaks()).with_noise(Noise::Uniform { scale: 0.2 })
    }

    /// Set the x grid.
    pub fn with_grid(mut self, start: f64, stop: f64, step: f64) -> Self {
        self.start = start;
        self.stop = stop;
        self.step = step;
        self
    }

    /// Set the noise model.
    pub fn with_noise(mut self, noise: Noise) -> Self {
        self.noise = noise;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The x grid.
    pub fn x(&self) -> Result<Array1<f64>> {
        arange(self.start, self.stop, self.step)
    }

    /// Generate `(x, y)`. The same seed always gives the same data.
    pub fn generate(&self) -> Result<(Array1<f64>, Array1<f64>)> {
        self.noise.validate()?;
        let x = self.x()?;
        let mut y = eval_peaks(&x, &self.peaks)?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        match self.noise {
            Noise::None => {}
            Noise::Uniform { scale } => {
                let amplitude = y.mean().unwrap_or(0.0) * scale;
                y.mapv_inplace(|v| v + rng.gen::<f64>() * amplitude);
            }
            Noise::Gaussian { sigma } => {
                let normal = Normal::new(0.0, sigma).map_err(|e| {
                    PvFitError::InvalidInput(format!("invalid noise level {}: {}", sigma, e))
                })?;
                y.mapv_inplace(|v| v + normal.sample(&mut rng));
            }
        }

        log::debug!(
            "generated synthetic spectrum: {} points, {} peaks, {:?}",
            x.len(),
            self.peaks.len(),
            self.noise
        );

        Ok((x, y))
    }
}
