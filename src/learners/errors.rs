//! Errors raised by nuisance learners.
use crate::optimization::errors::OptError;

/// Result alias for learner operations.
pub type LearnerResult<T> = Result<T, LearnerError>;

#[derive(Debug, Clone, PartialEq)]
pub enum LearnerError {
    // ---- Configuration ----
    /// Hyperparameter outside its valid range.
    InvalidHyperparameter { learner: String, name: &'static str, value: f64, reason: &'static str },

    /// Probability output requested from a learner without it.
    ProbaNotSupported { learner: String },

    // ---- Fitting ----
    /// Training set has no rows.
    EmptyTrainingSet { learner: String },

    /// Feature and target row counts differ.
    DimensionMismatch { learner: String, expected: usize, found: usize },

    /// Classifier target contains a value other than 0 or 1.
    NonBinaryTarget { learner: String, value: f64 },

    /// Classifier target has only one class.
    SingleClass { learner: String, class: f64 },

    /// The underlying optimizer failed.
    Optimization(OptError),

    // ---- Prediction ----
    /// `predict` called before `fit`.
    NotFitted { learner: String },

    /// Prediction features have a different width than training features.
    FeatureCountMismatch { learner: String, expected: usize, found: usize },
}

impl std::error::Error for LearnerError {}

impl std::fmt::Display for LearnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            LearnerError::InvalidHyperparameter { learner, name, value, reason } => {
                write!(f, "Learner {learner}: invalid {name} = {value}: {reason}")
            }
            LearnerError::ProbaNotSupported { learner } => write!(
                f,
                "Learner {learner} does not provide predicted probabilities"
            ),

            // ---- Fitting ----
            LearnerError::EmptyTrainingSet { learner } => {
                write!(f, "Learner {learner}: training set is empty")
            }
            LearnerError::DimensionMismatch { learner, expected, found } => write!(
                f,
                "Learner {learner}: features have {expected} rows but target has {found}"
            ),
            LearnerError::NonBinaryTarget { learner, value } => write!(
                f,
                "Learner {learner}: classification target must be 0 or 1, found {value}"
            ),
            LearnerError::SingleClass { learner, class } => write!(
                f,
                "Learner {learner}: training target contains the single class {class}"
            ),
            LearnerError::Optimization(e) => write!(f, "Learner optimization failed: {e}"),

            // ---- Prediction ----
            LearnerError::NotFitted { learner } => {
                write!(f, "Learner {learner} must be fitted before predicting")
            }
            LearnerError::FeatureCountMismatch { learner, expected, found } => write!(
                f,
                "Learner {learner}: fitted on {expected} features, got {found}"
            ),
        }
    }
}

impl From<OptError> for LearnerError {
    fn from(err: OptError) -> Self {
        LearnerError::Optimization(err)
    }
}
