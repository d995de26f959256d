//! Error types for the tempcast library.

use thiserror::Error;

/// Result type alias for tempcast operations.
pub type Result<T> = std::result::Result<T, TempcastError>;

/// Errors that can occur while loading, analyzing or forecasting a series.
#[derive(Error, Debug)]
pub enum TempcastError {
    /// Input data is empty (or became empty after cleaning).
    #[error("empty input data")]
    EmptyData,

    /// Insufficient observations for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Mismatched lengths between paired sequences.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Dates are not strictly increasing.
    #[error("date order error: {0}")]
    DateOrder(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Numerical failure during estimation or evaluation.
    #[error("computation error: {0}")]
    Computation(String),

    /// Chart rendering failure.
    #[error("chart error: {0}")]
    Chart(String),

    /// CSV parsing failure.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
