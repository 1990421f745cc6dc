//! Error surface for the optimization layer.
//!
//! `OptError` covers the penalized likelihood fits behind the built-in
//! classifiers and the bracketed scalar root finder used by nonlinear
//! scores. Argmin failures are downcast into named variants so callers never
//! see a raw `argmin::core::Error`.
use argmin::core::{ArgminError, Error};

/// Result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Signals the adapter to fall back to finite differences.
    GradientNotImplemented,

    /// Gradient length does not match the parameter length.
    GradientDimMismatch { expected: usize, found: usize },

    /// Gradient elements need to be finite.
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- MLEOptions ----
    /// Gradient tolerance needs to be positive and finite.
    InvalidTolGrad { tol: f64, reason: &'static str },

    /// Cost change tolerance needs to be positive and finite.
    InvalidTolCost { tol: f64, reason: &'static str },

    /// Maximum iterations needs to be positive.
    InvalidMaxIter { max_iter: usize, reason: &'static str },

    /// At least one stopping rule must be provided.
    NoTolerancesProvided,

    /// Unknown line searcher name.
    InvalidLineSearch { name: String, reason: &'static str },

    /// L-BFGS history needs to be at least 1.
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    // ---- Objective ----
    /// Objective returned a non-finite value.
    NonFiniteCost { value: f64 },

    /// Objective input failed a model-level check.
    InvalidObjectiveInput { reason: String },

    // ---- Optimizer outcome ----
    /// Estimated parameters must be finite.
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },

    /// Solver finished without a parameter vector.
    MissingThetaHat,

    // ---- Root finding ----
    /// Bracket endpoints are not finite or not ordered.
    InvalidBracket { lower: f64, upper: f64 },

    /// The function has the same sign at both ends of the bracket.
    RootNotBracketed { lower: f64, upper: f64, f_lower: f64, f_upper: f64 },

    /// Iteration budget exhausted before the root was located.
    RootNotConverged { iterations: u64, last: f64, residual: f64 },

    // ---- Argmin ----
    /// Wrapper for argmin::InvalidParameter.
    InvalidParameter { text: String },
    /// Wrapper for argmin::NotImplemented.
    NotImplemented { text: String },
    /// Wrapper for argmin::NotInitialized.
    NotInitialized { text: String },
    /// Wrapper for argmin::ConditionViolated.
    ConditionViolated { text: String },
    /// Wrapper for argmin::PotentialBug.
    PotentialBug { text: String },
    /// Any other argmin error, rendered to text.
    BackendError { text: String },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientNotImplemented => write!(f, "Analytic gradient not implemented"),
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- MLEOptions ----
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost change tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => write!(f, "No tolerances provided"),
            OptError::InvalidLineSearch { name, reason } => {
                write!(f, "Invalid line searcher '{name}': {reason}")
            }
            OptError::InvalidLBFGSMem { mem, reason } => {
                write!(f, "Invalid L-BFGS memory {mem}: {reason}")
            }

            // ---- Objective ----
            OptError::NonFiniteCost { value } => write!(f, "Non-finite objective value: {value}"),
            OptError::InvalidObjectiveInput { reason } => {
                write!(f, "Invalid objective input: {reason}")
            }

            // ---- Optimizer outcome ----
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid estimated parameter at index {index}: {value}: {reason}")
            }
            OptError::MissingThetaHat => write!(f, "Missing estimated parameters (theta hat)"),

            // ---- Root finding ----
            OptError::InvalidBracket { lower, upper } => {
                write!(f, "Invalid root bracket [{lower}, {upper}]")
            }
            OptError::RootNotBracketed { lower, upper, f_lower, f_upper } => write!(
                f,
                "Root not bracketed: f({lower}) = {f_lower} and f({upper}) = {f_upper} share a sign"
            ),
            OptError::RootNotConverged { iterations, last, residual } => write!(
                f,
                "Root finding did not converge after {iterations} iterations \
                 (last = {last}, residual = {residual})"
            ),

            // ---- Argmin ----
            OptError::InvalidParameter { text } => write!(f, "Invalid parameter: {text}"),
            OptError::NotImplemented { text } => write!(f, "Not implemented: {text}"),
            OptError::NotInitialized { text } => write!(f, "Not initialized: {text}"),
            OptError::ConditionViolated { text } => write!(f, "Condition violated: {text}"),
            OptError::PotentialBug { text } => write!(f, "Potential bug: {text}"),
            OptError::BackendError { text } => write!(f, "Backend error: {text}"),

            // ---- Fallback ----
            OptError::UnknownError => write!(f, "Unknown optimizer error"),
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Errors raised inside our own cost closures round-trip unchanged.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(argmin_err) => match argmin_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}
