//! Errors for fold generation and partition validation.

/// Result alias for resampling operations.
pub type ResamplingResult<T> = Result<T, ResamplingError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ResamplingError {
    // ---- Configuration ----
    /// Cross-fitting needs at least two folds.
    InvalidFolds { n_folds: usize, reason: &'static str },

    /// At least one repetition is required.
    InvalidRepetitions { n_rep: usize },

    /// More folds than observations.
    TooManyFolds { n_folds: usize, n_obs: usize },

    /// More folds than distinct clusters in one clustering dimension.
    TooManyFoldsForClusters { n_folds: usize, n_clusters: usize, dim: usize },

    /// A stratum has fewer members than folds.
    StratumTooSmall { label: f64, count: usize, n_folds: usize },

    // ---- Partition structure ----
    /// Partition built for a different sample size.
    NObsMismatch { expected: usize, found: usize },

    /// No repetitions supplied.
    NoRepetitions,

    /// A repetition has fewer than two folds.
    TooFewFolds { rep: usize, n_folds: usize },

    /// Index outside `0..n_obs`.
    IndexOutOfRange { rep: usize, fold: usize, index: usize, n_obs: usize },

    /// Observation appears in more than one test set.
    DuplicateTestIndex { rep: usize, index: usize },

    /// Observation appears in no test set.
    MissingTestIndex { rep: usize, index: usize },

    /// Observation is both trained on and predicted in the same fold.
    TrainTestOverlap { rep: usize, fold: usize, index: usize },

    /// Train or test set of a fold is empty.
    EmptyFold { rep: usize, fold: usize, which: &'static str },
}

impl std::error::Error for ResamplingError {}

impl std::fmt::Display for ResamplingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            ResamplingError::InvalidFolds { n_folds, reason } => {
                write!(f, "Invalid number of folds {n_folds}: {reason}")
            }
            ResamplingError::InvalidRepetitions { n_rep } => {
                write!(f, "Invalid number of repetitions {n_rep}: must be at least 1")
            }
            ResamplingError::TooManyFolds { n_folds, n_obs } => {
                write!(f, "Cannot split {n_obs} observations into {n_folds} folds")
            }
            ResamplingError::TooManyFoldsForClusters { n_folds, n_clusters, dim } => write!(
                f,
                "Cannot split {n_clusters} clusters of dimension {dim} into {n_folds} folds"
            ),
            ResamplingError::StratumTooSmall { label, count, n_folds } => write!(
                f,
                "Stratum {label} has {count} members, fewer than the {n_folds} folds"
            ),

            // ---- Partition structure ----
            ResamplingError::NObsMismatch { expected, found } => write!(
                f,
                "Sample splitting built for {found} observations, data has {expected}"
            ),
            ResamplingError::NoRepetitions => write!(f, "Sample splitting has no repetitions"),
            ResamplingError::TooFewFolds { rep, n_folds } => {
                write!(f, "Repetition {rep} has {n_folds} folds; at least 2 are required")
            }
            ResamplingError::IndexOutOfRange { rep, fold, index, n_obs } => write!(
                f,
                "Repetition {rep}, fold {fold}: index {index} out of range for {n_obs} observations"
            ),
            ResamplingError::DuplicateTestIndex { rep, index } => write!(
                f,
                "Repetition {rep}: observation {index} appears in more than one test set"
            ),
            ResamplingError::MissingTestIndex { rep, index } => {
                write!(f, "Repetition {rep}: observation {index} appears in no test set")
            }
            ResamplingError::TrainTestOverlap { rep, fold, index } => write!(
                f,
                "Repetition {rep}, fold {fold}: observation {index} is in both train and test"
            ),
            ResamplingError::EmptyFold { rep, fold, which } => {
                write!(f, "Repetition {rep}, fold {fold}: {which} set is empty")
            }
        }
    }
}
