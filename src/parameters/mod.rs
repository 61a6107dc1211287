//! # Parameter Bounds
//!
//! Box constraints for flat peak parameter vectors.
//!
//! ## Core Components
//!
//! - [`Bounds`] and [`BoundsTransform`]: bounds of one parameter and the
//!   Minuit-style transform that keeps the optimizer inside them
//! - [`BoundsPair`]: element-wise lower/upper vectors consumed by the fit engine
//! - [`BoundsRule`]: derivation of a [`BoundsPair`] from a manual initial guess
//!
//! ## Example Usage
//!
//! ```rust
//! use ndarray::array;
//! use pvfit_rs::parameters::{characteristic_scale, derive_bounds};
//!
//! let x = ndarray::Array1::linspace(0.0, 700.0, 501);
//! let x_scale = characteristic_scale(&x, 70.0).unwrap();
//!
//! let initial = array![51.0, 200.0, 85.0, 0.5];
//! let bounds = derive_bounds(&initial, x_scale).unwrap();
//! assert!(bounds.contains(&initial));
//! ```

pub mod bounds;
pub mod derive;

// Re-export key types
pub use bounds::{Bounds, BoundsPair, BoundsTransform};
pub use derive::{
    characteristic_scale, derive_bounds, BoundsPolicy, BoundsRule, DEFAULT_SCALE_DIVISOR,
};
