//! Repeated K-fold sample splitting: plain, stratified and clustered.
use std::collections::BTreeMap;

use ndarray::{ArrayView1, ArrayView2};
use rand::{rngs::StdRng, seq::SliceRandom};

use crate::resampling::{
    errors::{ResamplingError, ResamplingResult},
    partition::{FoldPartition, FoldSplit, SampleSplits},
    seeding::stream_rng,
};

/// SampleSplitter — draws `n_rep` independent K-fold partitions.
///
/// Purpose
/// -------
/// Generate the cross-fitting folds of every repetition from an explicit
/// seed. Repetition `r` uses its own generator derived from `(seed, r)`, so
/// partitions are reproducible and independent of evaluation order.
///
/// Fields
/// ------
/// - `n_folds`: folds per repetition, `≥ 2`.
/// - `n_rep`: number of repetitions, `≥ 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSplitter {
    n_folds: usize,
    n_rep: usize,
}

impl SampleSplitter {
    /// Errors
    /// ------
    /// - [`ResamplingError::InvalidFolds`] for `n_folds < 2`.
    /// - [`ResamplingError::InvalidRepetitions`] for `n_rep == 0`.
    pub fn new(n_folds: usize, n_rep: usize) -> ResamplingResult<Self> {
        if n_folds < 2 {
            return Err(ResamplingError::InvalidFolds {
                n_folds,
                reason: "cross-fitting requires at least 2 folds",
            });
        }
        if n_rep == 0 {
            return Err(ResamplingError::InvalidRepetitions { n_rep });
        }
        Ok(Self { n_folds, n_rep })
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    pub fn n_rep(&self) -> usize {
        self.n_rep
    }

    /// Shuffled K-fold over `0..n_obs`.
    ///
    /// The first `n_obs % n_folds` folds receive one extra observation.
    /// Test and train index lists are sorted.
    pub fn split(&self, n_obs: usize, seed: u64) -> ResamplingResult<SampleSplits> {
        if self.n_folds > n_obs {
            return Err(ResamplingError::TooManyFolds { n_folds: self.n_folds, n_obs });
        }
        let partitions = (0..self.n_rep)
            .map(|rep| {
                let mut rng = stream_rng(seed, &[rep as u64]);
                let assignment = kfold_assignment(n_obs, self.n_folds, &mut rng);
                partition_from_assignment(&assignment, self.n_folds)
            })
            .collect();
        Ok(SampleSplits { n_obs, partitions })
    }

    /// K-fold preserving the class ratio of `labels` in every fold.
    ///
    /// Members of each class are shuffled and dealt round-robin over the
    /// folds; the dealing position carries over between classes so fold
    /// sizes differ by at most one.
    ///
    /// Errors
    /// ------
    /// - [`ResamplingError::TooManyFolds`] when `n_folds > labels.len()`.
    /// - [`ResamplingError::StratumTooSmall`] when a class has fewer members
    ///   than folds.
    pub fn split_stratified(
        &self, labels: ArrayView1<f64>, seed: u64,
    ) -> ResamplingResult<SampleSplits> {
        let n_obs = labels.len();
        if self.n_folds > n_obs {
            return Err(ResamplingError::TooManyFolds { n_folds: self.n_folds, n_obs });
        }
        let mut strata: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for (i, &v) in labels.iter().enumerate() {
            strata.entry(v.to_bits()).or_default().push(i);
        }
        for (&bits, members) in &strata {
            if members.len() < self.n_folds {
                return Err(ResamplingError::StratumTooSmall {
                    label: f64::from_bits(bits),
                    count: members.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        let partitions = (0..self.n_rep)
            .map(|rep| {
                let mut rng = stream_rng(seed, &[rep as u64]);
                let mut assignment = vec![0usize; n_obs];
                let mut deal = 0usize;
                for members in strata.values() {
                    let mut shuffled = members.clone();
                    shuffled.shuffle(&mut rng);
                    for i in shuffled {
                        assignment[i] = deal % self.n_folds;
                        deal += 1;
                    }
                }
                partition_from_assignment(&assignment, self.n_folds)
            })
            .collect();
        Ok(SampleSplits { n_obs, partitions })
    }

    /// K-fold over cluster identifiers.
    ///
    /// With one clustering dimension, every cluster is assigned to a fold
    /// and its observations follow it. With `M` dimensions, each
    /// dimension's clusters are split separately and the folds are the
    /// `K^M` combinations: an observation is tested in a combination when
    /// each of its clusters lies in the matching test fold, and trained on
    /// when none of them does.
    ///
    /// Errors
    /// ------
    /// - [`ResamplingError::TooManyFoldsForClusters`] when a dimension has
    ///   fewer distinct clusters than folds.
    pub fn split_clustered(
        &self, cluster_ids: ArrayView2<i64>, seed: u64,
    ) -> ResamplingResult<SampleSplits> {
        let n_obs = cluster_ids.nrows();
        let n_dims = cluster_ids.ncols();
        let uniques: Vec<Vec<i64>> = (0..n_dims)
            .map(|m| {
                let mut ids = cluster_ids.column(m).to_vec();
                ids.sort_unstable();
                ids.dedup();
                ids
            })
            .collect();
        for (dim, ids) in uniques.iter().enumerate() {
            if ids.len() < self.n_folds {
                return Err(ResamplingError::TooManyFoldsForClusters {
                    n_folds: self.n_folds,
                    n_clusters: ids.len(),
                    dim,
                });
            }
        }

        let partitions = (0..self.n_rep)
            .map(|rep| {
                // Fold of every cluster id, per dimension.
                let cluster_fold: Vec<BTreeMap<i64, usize>> = uniques
                    .iter()
                    .enumerate()
                    .map(|(m, ids)| {
                        let mut rng = stream_rng(seed, &[rep as u64, m as u64]);
                        let assignment = kfold_assignment(ids.len(), self.n_folds, &mut rng);
                        ids.iter().copied().zip(assignment).collect()
                    })
                    .collect();
                let obs_fold: Vec<Vec<usize>> = (0..n_dims)
                    .map(|m| {
                        cluster_ids
                            .column(m)
                            .iter()
                            .map(|id| cluster_fold[m].get(id).copied().unwrap_or(0))
                            .collect()
                    })
                    .collect();

                let folds = fold_combinations(self.n_folds, n_dims)
                    .into_iter()
                    .map(|combo| {
                        let mut split = FoldSplit::default();
                        for i in 0..n_obs {
                            if (0..n_dims).all(|m| obs_fold[m][i] == combo[m]) {
                                split.test.push(i);
                            } else if (0..n_dims).all(|m| obs_fold[m][i] != combo[m]) {
                                split.train.push(i);
                            }
                        }
                        split.test_clusters = (0..n_dims)
                            .map(|m| {
                                uniques[m]
                                    .iter()
                                    .copied()
                                    .filter(|id| cluster_fold[m].get(id) == Some(&combo[m]))
                                    .collect()
                            })
                            .collect();
                        split
                    })
                    .collect();
                FoldPartition::new(folds)
            })
            .collect();
        Ok(SampleSplits { n_obs, partitions })
    }
}

/// Fold label for each of `n` items after one shuffle.
fn kfold_assignment(n: usize, n_folds: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();
    perm.shuffle(rng);
    let base = n / n_folds;
    let extra = n % n_folds;
    let mut assignment = vec![0usize; n];
    let mut start = 0;
    for fold in 0..n_folds {
        let size = base + usize::from(fold < extra);
        for &i in &perm[start..start + size] {
            assignment[i] = fold;
        }
        start += size;
    }
    assignment
}

fn partition_from_assignment(assignment: &[usize], n_folds: usize) -> FoldPartition {
    let folds = (0..n_folds)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..assignment.len()).partition(|&i| assignment[i] == fold);
            FoldSplit::new(train, test)
        })
        .collect();
    FoldPartition::new(folds)
}

/// All `n_folds^n_dims` fold tuples in lexicographic order.
fn fold_combinations(n_folds: usize, n_dims: usize) -> Vec<Vec<usize>> {
    (0..n_dims).fold(vec![Vec::new()], |acc, _| {
        acc.into_iter()
            .flat_map(|prefix| {
                (0..n_folds).map(move |k| {
                    let mut next = prefix.clone();
                    next.push(k);
                    next
                })
            })
            .collect()
    })
}
