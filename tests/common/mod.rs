//! Shared simulation designs for the integration tests.
//!
//! Every generator is seeded explicitly so each test sees the same sample
//! on every run.
#![allow(dead_code)]

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;
use rust_doubleml::data::DMLData;

fn normal_matrix(rng: &mut StdRng, n: usize, p: usize) -> Array2<f64> {
    Array2::from_shape_simple_fn((n, p), || rng.sample(StandardNormal))
}

/// Purpose
/// -------
/// Partially linear design `Y = θ·D + g(X) + ε`, `D = m(X) + v` with
/// linear nuisances, so OLS learners are correctly specified.
///
/// Parameters
/// ----------
/// - `n`, `p`: observations and covariates (`p ≥ 3`).
/// - `theta`: true effect.
/// - `seed`: generator seed.
pub fn make_plr_data(n: usize, p: usize, theta: f64, seed: u64) -> DMLData {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = normal_matrix(&mut rng, n, p);
    let d = Array1::from_shape_fn(n, |i| {
        0.8 * x[[i, 0]] + 0.4 * x[[i, 2]] + rng.sample::<f64, _>(StandardNormal)
    });
    let y = Array1::from_shape_fn(n, |i| {
        theta * d[i] + x[[i, 0]] - 0.5 * x[[i, 1]] + 0.25 * x[[i, 2]]
            + rng.sample::<f64, _>(StandardNormal)
    });
    let d = d.insert_axis(ndarray::Axis(1));
    DMLData::from_arrays(y, d, x).expect("simulated PLR data is valid")
}

/// Partially linear design with two treatments and effects `thetas`.
pub fn make_two_treatment_plr_data(n: usize, thetas: (f64, f64), seed: u64) -> DMLData {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = normal_matrix(&mut rng, n, 4);
    let mut d = Array2::<f64>::zeros((n, 2));
    for i in 0..n {
        d[[i, 0]] = 0.6 * x[[i, 0]] + rng.sample::<f64, _>(StandardNormal);
        d[[i, 1]] = -0.5 * x[[i, 1]] + 0.3 * x[[i, 2]] + rng.sample::<f64, _>(StandardNormal);
    }
    let y = Array1::from_shape_fn(n, |i| {
        thetas.0 * d[[i, 0]] + thetas.1 * d[[i, 1]] + x[[i, 0]] + 0.5 * x[[i, 3]]
            + rng.sample::<f64, _>(StandardNormal)
    });
    DMLData::from_arrays(y, d, x).expect("simulated two-treatment data is valid")
}

/// Purpose
/// -------
/// Interactive design with a binary treatment drawn from a logistic
/// propensity in the first covariate and a constant effect `theta`.
pub fn make_irm_data(n: usize, theta: f64, seed: u64) -> DMLData {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = normal_matrix(&mut rng, n, 3);
    let d = Array1::from_shape_fn(n, |i| {
        let p = 1.0 / (1.0 + (-0.7 * x[[i, 0]]).exp());
        f64::from(u8::from(rng.gen::<f64>() < p))
    });
    let y = Array1::from_shape_fn(n, |i| {
        theta * d[i] + x[[i, 0]] + 0.5 * x[[i, 2]] + rng.sample::<f64, _>(StandardNormal)
    });
    DMLData::from_arrays(y, d.insert_axis(ndarray::Axis(1)), x).expect("simulated IRM data is valid")
}

/// Binary treatment fully determined by the sign of the first covariate.
pub fn make_separated_irm_data(n: usize, seed: u64) -> DMLData {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = normal_matrix(&mut rng, n, 2);
    let d = Array1::from_shape_fn(n, |i| f64::from(u8::from(x[[i, 0]] > 0.0)));
    let y = Array1::from_shape_fn(n, |i| d[i] + x[[i, 1]] + rng.sample::<f64, _>(StandardNormal));
    DMLData::from_arrays(y, d.insert_axis(ndarray::Axis(1)), x).expect("separated data is valid")
}

/// Randomized binary treatment with `Y = D + 0.5·X₁ + ε`; the median of
/// `Y(1)` is one.
pub fn make_quantile_data(n: usize, seed: u64) -> DMLData {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = normal_matrix(&mut rng, n, 2);
    let d = Array1::from_shape_fn(n, |_| f64::from(u8::from(rng.gen::<f64>() < 0.5)));
    let y = Array1::from_shape_fn(n, |i| d[i] + 0.5 * x[[i, 0]] + rng.sample::<f64, _>(StandardNormal));
    DMLData::from_arrays(y, d.insert_axis(ndarray::Axis(1)), x).expect("quantile data is valid")
}

/// Purpose
/// -------
/// Sharp discontinuity at zero: `s ~ U(−1, 1)`, `D = 1{s ≥ 0}`,
/// `Y = τ·D + s + 0.5·X₁ + 0.3·ε`.
pub fn make_rdd_data(n: usize, tau: f64, seed: u64) -> DMLData {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = normal_matrix(&mut rng, n, 2);
    let s = Array1::from_shape_fn(n, |_| rng.gen_range(-1.0..1.0));
    let d = s.mapv(|v| f64::from(u8::from(v >= 0.0)));
    let y = Array1::from_shape_fn(n, |i| {
        tau * d[i] + s[i] + 0.5 * x[[i, 0]] + 0.3 * rng.sample::<f64, _>(StandardNormal)
    });
    DMLData::from_arrays(y, d.insert_axis(ndarray::Axis(1)), x)
        .and_then(|data| data.with_score_variable(s))
        .expect("RDD data is valid")
}

/// Purpose
/// -------
/// Partially linear design with cluster-level shocks in `D` and `Y`.
///
/// Parameters
/// ----------
/// - `n_clusters`, `per_cluster`: one-way cluster layout; row `i` belongs
///   to cluster `i / per_cluster`.
/// - `theta`: true effect.
pub fn make_clustered_plr_data(n_clusters: usize, per_cluster: usize, theta: f64, seed: u64) -> DMLData {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = n_clusters * per_cluster;
    let x = normal_matrix(&mut rng, n, 3);
    let shocks: Vec<(f64, f64)> = (0..n_clusters)
        .map(|_| (rng.sample::<f64, _>(StandardNormal), rng.sample::<f64, _>(StandardNormal)))
        .collect();
    let d = Array1::from_shape_fn(n, |i| {
        0.5 * x[[i, 0]] + 0.5 * shocks[i / per_cluster].0 + rng.sample::<f64, _>(StandardNormal)
    });
    let y = Array1::from_shape_fn(n, |i| {
        theta * d[i] + x[[i, 1]] + 0.5 * shocks[i / per_cluster].1 + rng.sample::<f64, _>(StandardNormal)
    });
    let ids = Array2::from_shape_fn((n, 1), |(i, _)| (i / per_cluster) as i64);
    DMLData::from_arrays(y, d.insert_axis(ndarray::Axis(1)), x)
        .and_then(|data| data.with_clusters(ids))
        .expect("clustered data is valid")
}

/// Purpose
/// -------
/// Partially linear IV design: `D` is endogenous through `v`, and the
/// continuous instrument `Z = 0.5·X₁ + ν` shifts `D` only.
///
/// `Y = θ·D + X₁ − 0.5·X₃ + 0.8·v + ε`, `D = 0.7·Z + 0.3·X₂ + v`.
pub fn make_pliv_data(n: usize, theta: f64, seed: u64) -> DMLData {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = normal_matrix(&mut rng, n, 3);
    let z = Array1::from_shape_fn(n, |i| 0.5 * x[[i, 0]] + rng.sample::<f64, _>(StandardNormal));
    let v = Array1::from_shape_fn(n, |_| rng.sample::<f64, _>(StandardNormal));
    let d = Array1::from_shape_fn(n, |i| 0.7 * z[i] + 0.3 * x[[i, 1]] + v[i]);
    let y = Array1::from_shape_fn(n, |i| {
        theta * d[i] + x[[i, 0]] - 0.5 * x[[i, 2]] + 0.8 * v[i] + rng.sample::<f64, _>(StandardNormal)
    });
    DMLData::from_arrays(y, d.insert_axis(ndarray::Axis(1)), x)
        .and_then(|data| data.with_instruments(z.insert_axis(ndarray::Axis(1))))
        .expect("simulated PLIV data is valid")
}

/// Purpose
/// -------
/// One-sided noncompliance design with a randomized binary instrument.
///
/// Compliance types are drawn independently of `X`: 20% always-takers
/// (outcome shift +0.5), 20% never-takers (shift −0.5), 60% compliers
/// with `D = Z`. `Y = D + 0.5·X₁ + shift + ε`, so the complier effect is
/// one and the complier median of `Y(1)` is one.
pub fn make_compliance_data(n: usize, seed: u64) -> DMLData {
    let mut rng = StdRng::seed_from_u64(seed);
    let x = normal_matrix(&mut rng, n, 2);
    let mut z = Array1::<f64>::zeros(n);
    let mut d = Array1::<f64>::zeros(n);
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        z[i] = f64::from(u8::from(rng.gen::<f64>() < 0.5));
        let kind: f64 = rng.gen();
        let (treated, shift) = match kind {
            k if k < 0.2 => (1.0, 0.5),
            k if k < 0.4 => (0.0, -0.5),
            _ => (z[i], 0.0),
        };
        d[i] = treated;
        y[i] = treated + 0.5 * x[[i, 0]] + shift + rng.sample::<f64, _>(StandardNormal);
    }
    DMLData::from_arrays(y, d.insert_axis(ndarray::Axis(1)), x)
        .and_then(|data| data.with_instruments(z.insert_axis(ndarray::Axis(1))))
        .expect("compliance data is valid")
}

/// Purpose
/// -------
/// Partially linear design on a full `g₁ × g₂` grid of two crossed
/// cluster dimensions, with additive shocks of both dimensions in `D` and
/// `Y`. Row `i` belongs to clusters `(i / g₂, i % g₂)`.
pub fn make_two_way_clustered_plr_data(g1: usize, g2: usize, theta: f64, seed: u64) -> DMLData {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = g1 * g2;
    let x = normal_matrix(&mut rng, n, 3);
    let mut draw = |g: usize| -> Vec<(f64, f64)> {
        (0..g)
            .map(|_| (rng.sample::<f64, _>(StandardNormal), rng.sample::<f64, _>(StandardNormal)))
            .collect()
    };
    let (rows, cols) = (draw(g1), draw(g2));
    let d = Array1::from_shape_fn(n, |i| {
        let (a, b) = (rows[i / g2].0, cols[i % g2].0);
        0.5 * x[[i, 0]] + 0.5 * a + 0.5 * b + rng.sample::<f64, _>(StandardNormal)
    });
    let y = Array1::from_shape_fn(n, |i| {
        let (a, b) = (rows[i / g2].1, cols[i % g2].1);
        theta * d[i] + x[[i, 1]] + 0.5 * a + 0.5 * b + rng.sample::<f64, _>(StandardNormal)
    });
    let ids = Array2::from_shape_fn((n, 2), |(i, m)| if m == 0 { (i / g2) as i64 } else { (i % g2) as i64 });
    DMLData::from_arrays(y, d.insert_axis(ndarray::Axis(1)), x)
        .and_then(|data| data.with_clusters(ids))
        .expect("two-way clustered data is valid")
}
