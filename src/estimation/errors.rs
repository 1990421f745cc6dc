//! Top-level error type of the estimation engine.
//!
//! Every module error converts into [`DMLError`]; [`DMLError::category`]
//! sorts failures into configuration, structural, numerical and
//! unimplemented-combination errors.
use crate::{
    data::DataError,
    inference::InferenceError,
    learners::LearnerError,
    optimization::errors::OptError,
    resampling::ResamplingError,
};

#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Result alias for estimation operations.
pub type DMLResult<T> = Result<T, DMLError>;

/// Coarse classification of a [`DMLError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad parameters, learner capabilities or model specifications.
    Configuration,
    /// Invalid fold partitions, shapes or estimator state.
    Structural,
    /// Non-convergence, singular moments, degenerate folds.
    Numerical,
    /// A requested combination without an implementation.
    Unimplemented,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DMLError {
    // ---- Configuration ----
    /// Numeric option outside its valid range.
    InvalidParameter { name: &'static str, value: f64, reason: String },

    /// Dataset unsuitable for the chosen score (non-binary treatment,
    /// missing instrument, ...).
    InvalidData { reason: String },

    /// No learner supplied for a required role.
    MissingLearner { role: String },

    /// A learner lacks the capability a role needs.
    CapabilityMismatch { role: String, learner: String, reason: &'static str },

    /// Role dependencies are unknown, cyclic or deeper than two levels.
    InvalidRoleGraph { role: String, reason: String },

    // ---- Structural ----
    /// Operation not allowed in the current estimator state.
    InvalidState { state: &'static str, action: &'static str },

    /// Array lengths disagree inside the engine.
    ShapeMismatch { what: &'static str, expected: usize, found: usize },

    // ---- Numerical ----
    /// Empty or single-class training subset for a nuisance role.
    DegenerateFold { role: String, rep: usize, fold: usize, reason: String },

    /// A learner failed while fitting or predicting a role.
    NuisanceFit { role: String, rep: usize, fold: usize, source: LearnerError },

    /// `mean(psi_a)` is zero or non-finite.
    SingularJacobian { treatment: String, rep: usize, value: f64 },

    /// A linear system inside a score (local-polynomial Gram matrix,
    /// preliminary partialling-out denominator) cannot be solved.
    SingularSystem { system: &'static str, value: f64 },

    /// Estimate or variance is non-finite.
    NonFiniteEstimate { treatment: String, rep: usize, what: &'static str },

    /// Root finding or refit iteration did not converge.
    NonConvergence { treatment: String, rep: usize, reason: String },

    // ---- Unimplemented ----
    Unimplemented(String),

    // ---- Wrapped module errors ----
    Data(DataError),
    Resampling(ResamplingError),
    Learner(LearnerError),
    Optimization(OptError),
    Inference(InferenceError),
}

impl DMLError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DMLError::InvalidParameter { .. }
            | DMLError::InvalidData { .. }
            | DMLError::MissingLearner { .. }
            | DMLError::CapabilityMismatch { .. }
            | DMLError::InvalidRoleGraph { .. }
            | DMLError::Learner(_) => ErrorCategory::Configuration,
            DMLError::InvalidState { .. }
            | DMLError::ShapeMismatch { .. }
            | DMLError::Data(_)
            | DMLError::Resampling(_) => ErrorCategory::Structural,
            DMLError::DegenerateFold { .. }
            | DMLError::NuisanceFit { .. }
            | DMLError::SingularJacobian { .. }
            | DMLError::SingularSystem { .. }
            | DMLError::NonFiniteEstimate { .. }
            | DMLError::NonConvergence { .. }
            | DMLError::Optimization(_) => ErrorCategory::Numerical,
            DMLError::Unimplemented(_) => ErrorCategory::Unimplemented,
            DMLError::Inference(e) => match e {
                InferenceError::Unimplemented { .. } => ErrorCategory::Unimplemented,
                InferenceError::InvalidLevel { .. }
                | InferenceError::InvalidBootstrapDraws { .. } => ErrorCategory::Configuration,
                _ => ErrorCategory::Numerical,
            },
        }
    }

    pub(crate) fn unimplemented(msg: &str) -> Self {
        DMLError::Unimplemented(msg.to_string())
    }
}

impl std::error::Error for DMLError {}

impl std::fmt::Display for DMLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            DMLError::InvalidParameter { reason, .. } => write!(f, "{reason}"),
            DMLError::InvalidData { reason } => write!(f, "Invalid data: {reason}"),
            DMLError::MissingLearner { role } => {
                write!(f, "No learner supplied for nuisance role {role}")
            }
            DMLError::CapabilityMismatch { role, learner, reason } => {
                write!(f, "Learner {learner} cannot serve role {role}: {reason}")
            }
            DMLError::InvalidRoleGraph { role, reason } => {
                write!(f, "Invalid nuisance dependency for role {role}: {reason}")
            }

            // ---- Structural ----
            DMLError::InvalidState { state, action } => {
                write!(f, "Cannot {action} while the estimator is in state {state}")
            }
            DMLError::ShapeMismatch { what, expected, found } => {
                write!(f, "Shape mismatch for {what}: expected {expected}, found {found}")
            }

            // ---- Numerical ----
            DMLError::DegenerateFold { role, rep, fold, reason } => write!(
                f,
                "Degenerate training set for role {role} (repetition {rep}, fold {fold}): {reason}"
            ),
            DMLError::NuisanceFit { role, rep, fold, source } => write!(
                f,
                "Fitting role {role} failed (repetition {rep}, fold {fold}): {source}"
            ),
            DMLError::SingularJacobian { treatment, rep, value } => write!(
                f,
                "Score Jacobian mean(psi_a) = {value} is not invertible for treatment {treatment} (repetition {rep})"
            ),
            DMLError::SingularSystem { system, value } => {
                write!(f, "Singular {system} (value {value}); the score cannot be formed")
            }
            DMLError::NonFiniteEstimate { treatment, rep, what } => write!(
                f,
                "Non-finite {what} for treatment {treatment} (repetition {rep})"
            ),
            DMLError::NonConvergence { treatment, rep, reason } => write!(
                f,
                "Estimation did not converge for treatment {treatment} (repetition {rep}): {reason}"
            ),

            // ---- Unimplemented ----
            DMLError::Unimplemented(msg) => write!(f, "{msg}"),

            // ---- Wrapped module errors ----
            DMLError::Data(e) => write!(f, "{e}"),
            DMLError::Resampling(e) => write!(f, "Sample splitting error: {e}"),
            DMLError::Learner(e) => write!(f, "{e}"),
            DMLError::Optimization(e) => write!(f, "{e}"),
            DMLError::Inference(e) => write!(f, "{e}"),
        }
    }
}

impl From<DataError> for DMLError {
    fn from(err: DataError) -> Self {
        DMLError::Data(err)
    }
}

impl From<ResamplingError> for DMLError {
    fn from(err: ResamplingError) -> Self {
        DMLError::Resampling(err)
    }
}

impl From<LearnerError> for DMLError {
    fn from(err: LearnerError) -> Self {
        DMLError::Learner(err)
    }
}

impl From<OptError> for DMLError {
    fn from(err: OptError) -> Self {
        DMLError::Optimization(err)
    }
}

impl From<InferenceError> for DMLError {
    fn from(err: InferenceError) -> Self {
        DMLError::Inference(err)
    }
}

/// Surface estimation errors as Python `ValueError`s carrying the message.
#[cfg(feature = "python-bindings")]
impl From<DMLError> for PyErr {
    fn from(err: DMLError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
