use ndarray::Array1;
use thiserror::Error;

/// Error types for the pvfit-rs library.
#[derive(Error, Debug)]
pub enum PvFitError {
    /// A parameter vector whose length is not a multiple of 4, or which holds
    /// a non-positive width or a non-finite value.
    #[error("Invalid parameter vector: {0}")]
    InvalidParameterVector(String),

    /// A bound pair that the optimizer cannot work with.
    #[error("Invalid bounds at index {index}: [{lower}, {upper}] {reason}")]
    InvalidBounds {
        index: usize,
        lower: f64,
        upper: f64,
        reason: String,
    },

    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The optimizer ran out of budget before satisfying any tolerance.
    ///
    /// `last_params` holds the last accepted iterate (external parameter
    /// space) for diagnostic use.
    #[error("Fit failed to converge after {iterations} iterations: {message}")]
    ConvergenceFailure {
        message: String,
        iterations: usize,
        last_params: Array1<f64>,
    },

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// Error during function evaluation.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An operation that the current state does not allow.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Not implemented functionality.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl PvFitError {
    /// Shorthand for an inverted or otherwise unusable bound pair.
    pub(crate) fn invalid_bounds(index: usize, lower: f64, upper: f64, reason: &str) -> Self {
        PvFitError::InvalidBounds {
            index,
            lower,
            upper,
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for pvfit-rs operations.
pub type Result<T> = std::result::Result<T, PvFitError>;
