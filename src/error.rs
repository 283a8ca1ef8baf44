//! Error types for the demandcast pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, DemandError>;

/// Errors that can occur while sanitizing, modeling, or forecasting demand data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DemandError {
    /// A required input column is absent. Fatal: the run stops here.
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// Input failed validation for a reason other than a missing column.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Too few observations for the requested operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Model fitting failed. Carries enough context for the caller to
    /// decide remediation; the pipeline never retries automatically.
    #[error("model fit failed for {context} (key {selection_key}, spec {spec}): {reason}")]
    ModelFit {
        /// Entity label, or "aggregate" for the whole-series flow.
        context: String,
        selection_key: i32,
        /// Display form of the requested SARIMA orders.
        spec: String,
        reason: String,
    },

    /// A persisted model artifact could not be read or written.
    /// Readers treat this as a cache miss and refit.
    #[error("model cache error: {0}")]
    CacheIo(String),

    /// Failure writing a forecast export file.
    #[error("export error: {0}")]
    Export(String),

    /// Timestamp ordering or parsing problem.
    #[error("timestamp error: {0}")]
    Timestamp(String),

    /// Mismatched lengths between parallel vectors.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Numerical failure during computation.
    #[error("computation error: {0}")]
    Computation(String),
}
