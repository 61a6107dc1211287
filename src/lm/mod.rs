//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides a bounded Levenberg-Marquardt solver for nonlinear
//! least-squares problems. Box constraints are enforced through a variable
//! transform, the damping follows a gain-ratio trust region and convergence
//! is judged on cost, step and gradient tolerances.

pub mod algorithm;
pub mod config;
pub mod convergence;
pub mod step;
pub mod trust_region;

// Re-export key types
pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::{DiffMethod, LmConfig};
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use step::{LmStep, SolveMethod, StepResult};
pub use trust_region::TrustRegion;
