//! Asymptotic variance of the cross-fitted estimator.
//!
//! - Independent observations: `σ² = mean(ψ²) / (J² · n)`.
//! - One-way clustering: fold-wise cluster sums, scaled by the number of
//!   test clusters and divided by the number of clusters `G`.
//! - Two-way clustering: both dimensions' cluster sums within each fold,
//!   scaled by `min(|I_k|, |J_l|) / (|I_k|·|J_l|)²`, divided by
//!   `min(G₁, G₂)`.
use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array1, ArrayView2};

use crate::{
    estimation::errors::{DMLError, DMLResult},
    resampling::FoldPartition,
};

/// Variance of `θ̂` for independent observations.
pub(crate) fn iid_variance(psi: &Array1<f64>, j_hat: f64) -> f64 {
    let n = psi.len() as f64;
    let mean_sq = psi.mapv(|v| v * v).mean().unwrap_or(f64::NAN);
    mean_sq / (j_hat * j_hat) / n
}

/// Per-fold cluster structure of one repetition.
#[derive(Debug, Clone)]
pub(crate) struct ClusterFolds<'a> {
    ids: ArrayView2<'a, i64>,
    /// `test_clusters[k][m]`: ids of dimension `m` on the test side of fold `k`.
    test_clusters: Vec<Vec<Vec<i64>>>,
}

impl<'a> ClusterFolds<'a> {
    /// # Errors
    /// [`DMLError::Unimplemented`] for more than two clustering dimensions.
    pub(crate) fn new(partition: &FoldPartition, ids: ArrayView2<'a, i64>) -> DMLResult<Self> {
        if ids.ncols() > 2 {
            return Err(DMLError::unimplemented(
                "Multi-way (n_ways > 2) clustering not yet implemented.",
            ));
        }
        let test_clusters = partition
            .folds
            .iter()
            .map(|split| {
                if split.test_clusters.len() == ids.ncols() {
                    split.test_clusters.clone()
                } else {
                    (0..ids.ncols())
                        .map(|m| {
                            let set: BTreeSet<i64> = split.test.iter().map(|&i| ids[[i, m]]).collect();
                            set.into_iter().collect()
                        })
                        .collect()
                }
            })
            .collect();
        Ok(Self { ids, test_clusters })
    }

    /// Fold weights `1 / Π_m |I_k^m|` used by the clustered DML2 solve.
    pub(crate) fn scales(&self) -> Vec<f64> {
        self.test_clusters
            .iter()
            .map(|dims| 1.0 / dims.iter().map(|c| c.len().max(1) as f64).product::<f64>())
            .collect()
    }

    fn n_clusters(&self, dim: usize) -> f64 {
        self.ids.column(dim).iter().collect::<BTreeSet<_>>().len() as f64
    }

    /// Squared within-cluster score sums over `rows`, for dimension `dim`.
    fn squared_cluster_sums(&self, rows: &[usize], psi: &Array1<f64>, dim: usize) -> f64 {
        let mut sums: BTreeMap<i64, f64> = BTreeMap::new();
        for &i in rows {
            *sums.entry(self.ids[[i, dim]]).or_insert(0.0) += psi[i];
        }
        sums.values().map(|s| s * s).sum()
    }

    /// Clustered `(σ², J)` for scores `psi` with Jacobian terms `psi_a`.
    pub(crate) fn variance(
        &self, partition: &FoldPartition, psi: &Array1<f64>, psi_a: &Array1<f64>,
    ) -> (f64, f64) {
        let n_folds = partition.n_folds() as f64;
        let mut gamma = 0.0;
        let mut j_hat = 0.0;
        for (split, dims) in partition.folds.iter().zip(self.test_clusters.iter()) {
            let sum_a: f64 = split.test.iter().map(|&i| psi_a[i]).sum();
            match dims.as_slice() {
                [first] => {
                    let size = first.len().max(1) as f64;
                    gamma += self.squared_cluster_sums(&split.test, psi, 0) / size;
                    j_hat += sum_a / size;
                }
                [first, second] => {
                    let (a, b) = (first.len().max(1) as f64, second.len().max(1) as f64);
                    let scale = a.min(b) / (a * b).powi(2);
                    gamma += scale
                        * (self.squared_cluster_sums(&split.test, psi, 0)
                            + self.squared_cluster_sums(&split.test, psi, 1));
                    j_hat += sum_a / (a * b);
                }
                _ => {}
            }
        }
        gamma /= n_folds;
        j_hat /= n_folds;
        let n_clusters = match self.ids.ncols() {
            1 => self.n_clusters(0),
            _ => self.n_clusters(0).min(self.n_clusters(1)),
        };
        (gamma / (j_hat * j_hat) / n_clusters, j_hat)
    }
}
