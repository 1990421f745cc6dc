//! Unified error handling for inference routines.
//!
//! This module defines `InferenceError`, the error type used by repetition
//! aggregation, normal-approximation intervals and the multiplier
//! bootstrap. It groups configuration failures (levels, draw counts),
//! shape problems and unsupported settings with a catch-all variant. An
//! alias `InferenceResult<T>` standardizes the return type across inference
//! code.

/// Unified error type for inference routines.
///
/// Designed to integrate with `anyhow::Error` via `From`, and to provide
/// readable diagnostics through `Display`.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    // ---- Configuration ----
    /// Confidence level outside `(0, 1)`.
    InvalidLevel { level: f64 },

    /// Bootstrap needs at least one draw.
    InvalidBootstrapDraws { n_boot: usize },

    /// Standard error is negative or non-finite.
    InvalidStandardError { index: usize, se: f64 },

    // ---- Shapes ----
    /// No repetitions or no treatments to aggregate.
    EmptyInput { what: &'static str },

    /// Inputs of incompatible shapes.
    ShapeMismatch { what: &'static str, expected: usize, found: usize },

    // ---- Unsupported ----
    Unimplemented { reason: &'static str },

    // ---- Anyhow catchall ----
    Anyhow(String),

    // ---- Fallback ----
    UnknownError,
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl From<anyhow::Error> for InferenceError {
    fn from(err: anyhow::Error) -> Self {
        InferenceError::Anyhow(err.to_string())
    }
}

impl std::error::Error for InferenceError {}

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            InferenceError::InvalidLevel { level } => {
                write!(f, "Inference Error: level must be in (0, 1), got {level}")
            }
            InferenceError::InvalidBootstrapDraws { n_boot } => write!(
                f,
                "Inference Error: number of bootstrap draws must be positive, got {n_boot}"
            ),
            InferenceError::InvalidStandardError { index, se } => write!(
                f,
                "Inference Error: standard error {se} at position {index} is not a finite non-negative number"
            ),

            // ---- Shapes ----
            InferenceError::EmptyInput { what } => write!(f, "Inference Error: empty {what}"),
            InferenceError::ShapeMismatch { what, expected, found } => write!(
                f,
                "Inference Error: {what} has length {found}, expected {expected}"
            ),

            // ---- Unsupported ----
            InferenceError::Unimplemented { reason } => write!(f, "{reason}"),

            // ---- Anyhow catchall ----
            InferenceError::Anyhow(msg) => write!(f, "Inference Error: {}", msg),

            // ---- Fallback ----
            InferenceError::UnknownError => write!(f, "Inference Error: Unknown error occurred"),
        }
    }
}
