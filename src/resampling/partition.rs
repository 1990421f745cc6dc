//! Fold partitions and their structural validation.
use crate::resampling::errors::{ResamplingError, ResamplingResult};

/// One cross-fitting fold: fit on `train`, predict on `test`.
///
/// `test_clusters[m]` holds the ids of clustering dimension `m` whose
/// observations form the test side of this fold. It is empty for
/// unclustered splits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FoldSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub test_clusters: Vec<Vec<i64>>,
}

impl FoldSplit {
    pub fn new(train: Vec<usize>, test: Vec<usize>) -> Self {
        Self { train, test, test_clusters: Vec::new() }
    }
}

/// The folds of one repetition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FoldPartition {
    pub folds: Vec<FoldSplit>,
}

impl FoldPartition {
    pub fn new(folds: Vec<FoldSplit>) -> Self {
        Self { folds }
    }

    /// Build from `(train, test)` pairs.
    pub fn from_pairs(pairs: Vec<(Vec<usize>, Vec<usize>)>) -> Self {
        Self { folds: pairs.into_iter().map(|(tr, te)| FoldSplit::new(tr, te)).collect() }
    }

    pub fn n_folds(&self) -> usize {
        self.folds.len()
    }

    /// Check the partition invariant for repetition `rep`.
    ///
    /// Errors
    /// ------
    /// - [`ResamplingError::TooFewFolds`] for fewer than two folds.
    /// - [`ResamplingError::EmptyFold`] for an empty train or test set.
    /// - [`ResamplingError::IndexOutOfRange`] for any index `≥ n_obs`.
    /// - [`ResamplingError::TrainTestOverlap`] when a fold trains on one of
    ///   its own test observations.
    /// - [`ResamplingError::DuplicateTestIndex`] /
    ///   [`ResamplingError::MissingTestIndex`] when the test sets do not
    ///   cover `0..n_obs` exactly once.
    pub fn validate(&self, n_obs: usize, rep: usize) -> ResamplingResult<()> {
        if self.folds.len() < 2 {
            return Err(ResamplingError::TooFewFolds { rep, n_folds: self.folds.len() });
        }
        let mut seen = vec![false; n_obs];
        let mut in_test = vec![false; n_obs];
        for (fold, split) in self.folds.iter().enumerate() {
            if split.test.is_empty() {
                return Err(ResamplingError::EmptyFold { rep, fold, which: "test" });
            }
            if split.train.is_empty() {
                return Err(ResamplingError::EmptyFold { rep, fold, which: "train" });
            }
            for &index in &split.test {
                if index >= n_obs {
                    return Err(ResamplingError::IndexOutOfRange { rep, fold, index, n_obs });
                }
                if seen[index] {
                    return Err(ResamplingError::DuplicateTestIndex { rep, index });
                }
                seen[index] = true;
                in_test[index] = true;
            }
            for &index in &split.train {
                if index >= n_obs {
                    return Err(ResamplingError::IndexOutOfRange { rep, fold, index, n_obs });
                }
                if in_test[index] {
                    return Err(ResamplingError::TrainTestOverlap { rep, fold, index });
                }
            }
            for &index in &split.test {
                in_test[index] = false;
            }
        }
        match seen.iter().position(|&s| !s) {
            Some(index) => Err(ResamplingError::MissingTestIndex { rep, index }),
            None => Ok(()),
        }
    }
}

/// SampleSplits — the fold partitions of every repetition.
///
/// Either drawn by [`SampleSplitter`](super::SampleSplitter) or supplied by
/// the caller to reuse splits across estimations. Supplied splits are
/// validated before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSplits {
    pub n_obs: usize,
    pub partitions: Vec<FoldPartition>,
}

impl SampleSplits {
    /// Wrap caller-supplied partitions after validating them.
    pub fn new(n_obs: usize, partitions: Vec<FoldPartition>) -> ResamplingResult<Self> {
        let splits = Self { n_obs, partitions };
        splits.validate()?;
        Ok(splits)
    }

    pub fn n_rep(&self) -> usize {
        self.partitions.len()
    }

    /// Validate every repetition.
    pub fn validate(&self) -> ResamplingResult<()> {
        if self.partitions.is_empty() {
            return Err(ResamplingError::NoRepetitions);
        }
        self.partitions
            .iter()
            .enumerate()
            .try_for_each(|(rep, part)| part.validate(self.n_obs, rep))
    }

    /// Validate against a dataset of `n_obs` rows.
    pub fn validate_for(&self, n_obs: usize) -> ResamplingResult<()> {
        if self.n_obs != n_obs {
            return Err(ResamplingError::NObsMismatch { expected: n_obs, found: self.n_obs });
        }
        self.validate()
    }
}
