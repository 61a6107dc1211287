//! Utility functions and helpers for the pvfit-rs library.

pub mod finite_difference;
pub mod matrix_convert;
#[cfg(feature = "parallel")]
pub mod parallel;
pub mod serde_float;

// Re-export commonly used utilities
pub use finite_difference::{jacobian, jacobian_central};
pub use matrix_convert::{
    nalgebra_to_ndarray, nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra,
};

#[cfg(feature = "parallel")]
pub use parallel::{jacobian_central_parallel, jacobian_parallel};
