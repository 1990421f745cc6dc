//! Integration tests for the double machine learning pipeline.
//!
//! Purpose
//! -------
//! - Validate the end-to-end path from simulated data, through repeated
//!   cross-fitting and nuisance estimation, to aggregated estimates,
//!   standard errors and confidence intervals.
//! - Exercise each score family on a design where its nuisances are
//!   (approximately) correctly specified by the built-in learners.
//!
//! Coverage
//! --------
//! - `estimation::DoubleML` with PLR, PLIV, IRM, IIVM, PQ, LPQ and RDD
//!   scores.
//! - DML1 vs DML2, repetition aggregation, explicit sample splits and
//!   parallel repetitions.
//! - Nominal coverage of the PLR interval over repeated simulations.
//! - One- and two-way clustered variance, propensity trimming under perfect
//!   separation, the multiplier bootstrap and joint bands.
//! - Unimplemented-combination and state errors.
//!
//! Exclusions
//! ----------
//! - Closed-form score formulas and low-level helpers; these are covered
//!   by unit tests.
//! - Python bindings.
mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;
use rust_doubleml::{
    estimation::{DMLError, DMLOptions, DMLProcedure, DoubleML, ErrorCategory, EstimatorState},
    inference::{BootstrapMethod, BootstrapOptions, InferenceError},
    learners::{LearnerSet, LogisticClassifier, OlsRegressor},
    scores::{IivmScore, IrmKind, IrmScore, LpqScore, PlivScore, PlrScore, PqScore, RddScore},
};

use common::{
    make_clustered_plr_data, make_compliance_data, make_irm_data, make_pliv_data, make_plr_data,
    make_quantile_data, make_rdd_data, make_separated_irm_data, make_two_treatment_plr_data,
    make_two_way_clustered_plr_data,
};

fn plr_learners() -> LearnerSet {
    LearnerSet::new().with("ml_l", OlsRegressor::new()).with("ml_m", OlsRegressor::new())
}

fn irm_learners() -> LearnerSet {
    LearnerSet::new().with("ml_g", OlsRegressor::new()).with("ml_m", LogisticClassifier::new())
}

#[test]
// Purpose
// -------
// PLR recovers a known effect with OLS nuisances.
//
// Given
// -----
// - n = 500, p = 10, θ₀ = 0.5; three folds, one repetition.
//
// Expect
// ------
// - |θ̂ − 0.5| < 0.15, a positive finite se and a 95% interval that
//   contains θ̂ symmetrically.
fn plr_recovers_known_effect() {
    // Arrange
    let data = make_plr_data(500, 10, 0.5, 7);
    let options = DMLOptions::new(3, 1).expect("valid options");
    let mut dml = DoubleML::new(data, PlrScore::default(), plr_learners(), options).expect("valid");

    // Act
    dml.fit().expect("fit succeeds");

    // Assert
    let coef = dml.coef().expect("fitted")[0];
    let se = dml.se().expect("fitted")[0];
    assert!((coef - 0.5).abs() < 0.15, "coef {coef}");
    assert!(se.is_finite() && se > 0.0 && se < 0.2, "se {se}");
    let ci = dml.confint(0.95).expect("interval");
    assert_abs_diff_eq!(ci[[0, 1]] - coef, coef - ci[[0, 0]], epsilon = 1e-12);
    let summary = dml.summary().expect("summary");
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].treatment, "d1");
    assert!(!summary[0].to_string().is_empty());
}

#[test]
// Purpose
// -------
// The 95% interval covers the true effect at close to its nominal rate.
//
// Given
// -----
// - 200 independent PLR samples (seeds 0..200), n = 500, p = 10,
//   θ₀ = 0.5; five folds.
//
// Expect
// ------
// - Coverage between 90% and 99% (the binomial band around 95% at
//   200 draws is about ±3 percentage points at two standard errors).
fn plr_interval_has_nominal_coverage() {
    // Arrange
    let n_sims = 200u64;
    let mut covered = 0u64;

    // Act
    for seed in 0..n_sims {
        let data = make_plr_data(500, 10, 0.5, seed);
        let options = DMLOptions::default().with_seed(seed);
        let mut dml = DoubleML::new(data, PlrScore::default(), plr_learners(), options).expect("valid");
        dml.fit().expect("fit succeeds");
        let ci = dml.confint(0.95).expect("interval");
        if ci[[0, 0]] <= 0.5 && 0.5 <= ci[[0, 1]] {
            covered += 1;
        }
    }

    // Assert
    let rate = covered as f64 / n_sims as f64;
    assert!((0.90..=0.99).contains(&rate), "coverage {covered}/{n_sims}");
}

#[test]
// Purpose
// -------
// DML1 and DML2 agree closely on the same split and nuisances.
//
// Given
// -----
// - The PLR design, one explicit split shared by both procedures.
//
// Expect
// ------
// - |θ̂_DML1 − θ̂_DML2| < 0.05 and identical fold roots.
fn dml1_and_dml2_are_close() {
    let data = make_plr_data(500, 5, 0.5, 11);
    let mut dml2 = DoubleML::new(data.clone(), PlrScore::default(), plr_learners(), DMLOptions::new(4, 1).expect("valid"))
        .expect("valid");
    dml2.fit().expect("DML2 fit");
    let splits = dml2.smpls().expect("drawn").clone();

    let options = DMLOptions::new(4, 1).expect("valid").with_procedure(DMLProcedure::Dml1);
    let mut dml1 = DoubleML::new(data, PlrScore::default(), plr_learners(), options).expect("valid");
    dml1.set_sample_splitting(splits).expect("valid splits");
    dml1.fit().expect("DML1 fit");

    let (a, b) = (dml1.coef().expect("fitted")[0], dml2.coef().expect("fitted")[0]);
    assert!((a - b).abs() < 0.05, "DML1 {a} vs DML2 {b}");
    assert_eq!(dml1.repetitions()[0][0].fold_thetas, dml2.repetitions()[0][0].fold_thetas);
}

#[test]
// Purpose
// -------
// Reusing an explicit split reproduces the estimate exactly.
//
// Given
// -----
// - Two estimators on the same data and the same supplied partitions.
//
// Expect
// ------
// - Bit-identical coefficients and standard errors.
fn explicit_split_is_reproducible() {
    let data = make_plr_data(300, 5, 0.5, 3);
    let mut first = DoubleML::new(data.clone(), PlrScore::default(), plr_learners(), DMLOptions::new(5, 2).expect("valid"))
        .expect("valid");
    first.fit().expect("first fit");
    let splits = first.smpls().expect("drawn").clone();

    let mut second = DoubleML::new(data, PlrScore::default(), plr_learners(), DMLOptions::default()).expect("valid");
    second.set_sample_splitting(splits).expect("valid splits");
    second.fit().expect("second fit");

    assert_eq!(first.coef().expect("fitted"), second.coef().expect("fitted"));
    assert_eq!(first.se().expect("fitted"), second.se().expect("fitted"));
    assert_eq!(second.options().n_rep, 2);
}

#[test]
// Purpose
// -------
// Repetitions aggregate by the median rule and do not depend on threads.
//
// Given
// -----
// - Three repetitions, fitted serially and on the rayon pool.
//
// Expect
// ------
// - `coef` is the median of `all_coef`; `se` is at least the smallest
//   per-repetition se; both runs agree exactly.
fn repetitions_aggregate_by_median() {
    let data = make_plr_data(300, 5, 0.5, 21);
    let options = DMLOptions::new(3, 3).expect("valid");
    let mut serial = DoubleML::new(data.clone(), PlrScore::default(), plr_learners(), options).expect("valid");
    serial.fit().expect("serial fit");
    let mut parallel =
        DoubleML::new(data, PlrScore::default(), plr_learners(), options.parallel(true)).expect("valid");
    parallel.fit().expect("parallel fit");

    let all = serial.all_coef().expect("fitted");
    assert_eq!(all.dim(), (1, 3));
    let mut thetas = all.row(0).to_vec();
    thetas.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(serial.coef().expect("fitted")[0], thetas[1]);

    let mut ses = serial.all_se().expect("fitted").row(0).to_vec();
    ses.sort_by(|a, b| a.total_cmp(b));
    assert!(serial.se().expect("fitted")[0] >= ses[0]);

    assert_eq!(serial.all_coef().expect("fitted"), parallel.all_coef().expect("fitted"));
    assert_eq!(parallel.state(), EstimatorState::Aggregated);
}

#[test]
// Purpose
// -------
// IRM estimates the ATE and the ATTE with a logistic propensity.
//
// Given
// -----
// - Binary treatment with logistic propensity, constant effect 1.0;
//   stratified folds.
//
// Expect
// ------
// - Both estimands lie within 0.35 of 1.0.
fn irm_recovers_constant_effect() {
    for kind in [IrmKind::Ate, IrmKind::Atte] {
        let data = make_irm_data(800, 1.0, 5);
        let options = DMLOptions::new(3, 1).expect("valid").stratified(true);
        let mut dml = DoubleML::new(data, IrmScore::new(kind, false), irm_learners(), options).expect("valid");
        dml.fit().expect("IRM fit");
        let coef = dml.coef().expect("fitted")[0];
        assert!((coef - 1.0).abs() < 0.35, "{kind:?}: coef {coef}");
    }
}

#[test]
// Purpose
// -------
// Perfect separation saturates the propensity; trimming keeps the
// estimate finite.
//
// Given
// -----
// - D = 1{X₁ > 0}; trimming at 0.05.
//
// Expect
// ------
// - Finite coefficient and standard error; every propensity prediction
//   lies in [0.05, 0.95].
fn trimming_keeps_separated_design_finite() {
    let data = make_separated_irm_data(400, 9);
    let options = DMLOptions::new(3, 1).expect("valid").with_trimming(0.05).expect("valid threshold");
    let mut dml = DoubleML::new(data, IrmScore::default(), irm_learners(), options).expect("valid");

    dml.fit().expect("finite estimate despite separation");

    assert!(dml.coef().expect("fitted")[0].is_finite());
    assert!(dml.se().expect("fitted")[0].is_finite());
    let m = dml.repetitions()[0][0].predictions.get("ml_m").expect("propensity");
    assert!(m.iter().all(|&p| (0.05 - 1e-12..=0.95 + 1e-12).contains(&p)));
}

#[test]
// Purpose
// -------
// One-way clustered PLR yields a finite cluster-robust se.
//
// Given
// -----
// - 60 clusters of 8 rows with cluster shocks in D and Y; θ₀ = 0.5.
//
// Expect
// ------
// - |θ̂ − 0.5| < 0.25 and a positive finite se; every fold's test set is
//   a union of whole clusters.
fn clustered_plr_estimates() {
    let data = make_clustered_plr_data(60, 8, 0.5, 13);
    let mut dml =
        DoubleML::new(data, PlrScore::default(), plr_learners(), DMLOptions::new(3, 1).expect("valid")).expect("valid");

    dml.fit().expect("clustered fit");

    let coef = dml.coef().expect("fitted")[0];
    let se = dml.se().expect("fitted")[0];
    assert!((coef - 0.5).abs() < 0.25, "coef {coef}");
    assert!(se.is_finite() && se > 0.0);
    for split in &dml.smpls().expect("drawn").partitions[0].folds {
        let clusters: std::collections::BTreeSet<usize> = split.test.iter().map(|&i| i / 8).collect();
        let rows = clusters.len() * 8;
        assert_eq!(split.test.len(), rows);
    }
}

#[test]
// Purpose
// -------
// Two-way clustered PLR yields a cluster-robust se of the right size.
//
// Given
// -----
// - A 30 × 30 grid of crossed clusters with shocks in both dimensions;
//   θ₀ = 0.5; three folds per dimension (nine fold combinations).
//
// Expect
// ------
// - |θ̂ − 0.5| < 0.35; se in (0.03, 0.4); each fold's test rows share no
//   cluster in either dimension with its train rows.
fn two_way_clustered_plr_estimates() {
    // Arrange
    let data = make_two_way_clustered_plr_data(30, 30, 0.5, 37);
    let mut dml =
        DoubleML::new(data, PlrScore::default(), plr_learners(), DMLOptions::new(3, 1).expect("valid")).expect("valid");

    // Act
    dml.fit().expect("two-way clustered fit");

    // Assert
    let coef = dml.coef().expect("fitted")[0];
    let se = dml.se().expect("fitted")[0];
    assert!((coef - 0.5).abs() < 0.35, "coef {coef}");
    assert!(se > 0.03 && se < 0.4, "se {se}");
    let folds = &dml.smpls().expect("drawn").partitions[0].folds;
    assert_eq!(folds.len(), 9);
    for split in folds {
        for &i in &split.test {
            assert!(split.train.iter().all(|&k| k / 30 != i / 30 && k % 30 != i % 30));
        }
    }
}

#[test]
// Purpose
// -------
// PLIV recovers the effect of an endogenous treatment.
//
// Given
// -----
// - Continuous instrument, n = 2000, θ₀ = 0.5; OLS for ml_l, ml_m, ml_r.
//
// Expect
// ------
// - |θ̂ − 0.5| < 0.25 with a positive finite se.
fn pliv_recovers_endogenous_effect() {
    // Arrange
    let data = make_pliv_data(2000, 0.5, 41);
    let learners = LearnerSet::new()
        .with("ml_l", OlsRegressor::new())
        .with("ml_m", OlsRegressor::new())
        .with("ml_r", OlsRegressor::new());
    let mut dml =
        DoubleML::new(data, PlivScore::default(), learners, DMLOptions::new(5, 1).expect("valid")).expect("valid");

    // Act
    dml.fit().expect("PLIV fit");

    // Assert
    let coef = dml.coef().expect("fitted")[0];
    let se = dml.se().expect("fitted")[0];
    assert!((coef - 0.5).abs() < 0.25, "coef {coef}");
    assert!(se.is_finite() && se > 0.0 && se < 0.3, "se {se}");
}

#[test]
// Purpose
// -------
// IIVM recovers the complier effect with a randomized instrument.
//
// Given
// -----
// - 20% always-takers, 20% never-takers, complier effect 1, n = 2000;
//   OLS for ml_g and logistic learners for ml_m and ml_r.
//
// Expect
// ------
// - |θ̂ − 1| < 0.35 with a positive finite se; both ml_r0 and ml_r1 are
//   fitted.
fn iivm_recovers_complier_effect() {
    // Arrange
    let data = make_compliance_data(2000, 43);
    let learners = LearnerSet::new()
        .with("ml_g", OlsRegressor::new())
        .with("ml_m", LogisticClassifier::new())
        .with("ml_r", LogisticClassifier::new());
    let mut dml =
        DoubleML::new(data, IivmScore::default(), learners, DMLOptions::new(5, 1).expect("valid")).expect("valid");

    // Act
    dml.fit().expect("IIVM fit");

    // Assert
    let coef = dml.coef().expect("fitted")[0];
    let se = dml.se().expect("fitted")[0];
    assert!((coef - 1.0).abs() < 0.35, "coef {coef}");
    assert!(se.is_finite() && se > 0.0 && se < 0.3, "se {se}");
    let preds = &dml.repetitions()[0][0].predictions;
    assert!(preds.get("ml_r0").is_ok() && preds.get("ml_r1").is_ok());
}

#[test]
// Purpose
// -------
// LPQ finds the complier median of Y(1) through the instrument-split
// nuisances and the preliminary quantile.
//
// Given
// -----
// - The compliance design (complier median of Y(1) is 1), n = 2000;
//   τ = 0.5 for D = 1; logistic learners for ml_m and ml_g.
//
// Expect
// ------
// - |θ̂ − 1| < 0.35 with a positive finite se; every LPQ role has
//   predictions and each fold carries a preliminary quantile.
fn local_potential_quantile_recovers_complier_median() {
    // Arrange
    let data = make_compliance_data(2000, 47);
    let learners = LearnerSet::new()
        .with("ml_m", LogisticClassifier::new())
        .with("ml_g", LogisticClassifier::new());
    let score = LpqScore::new(0.5, 1.0).expect("valid quantile");
    let mut dml = DoubleML::new(data, score, learners, DMLOptions::new(5, 1).expect("valid")).expect("valid");

    // Act
    dml.fit().expect("LPQ fit");

    // Assert
    let coef = dml.coef().expect("fitted")[0];
    let se = dml.se().expect("fitted")[0];
    assert!((coef - 1.0).abs() < 0.35, "coef {coef}");
    assert!(se.is_finite() && se > 0.0 && se < 0.4, "se {se}");
    let preds = &dml.repetitions()[0][0].predictions;
    for role in ["ml_m_z", "ml_m_d_z0", "ml_m_d_z1", "ml_g_du_z0", "ml_g_du_z1"] {
        assert!(preds.get(role).is_ok(), "missing {role}");
    }
    assert_eq!(preds.thresholds().len(), 5);
    assert!(preds.thresholds().iter().all(|q| q.is_some_and(f64::is_finite)));
}

#[test]
// Purpose
// -------
// The potential median of Y(1) is found by root finding.
//
// Given
// -----
// - Randomized treatment, Y = D + 0.5·X₁ + ε; τ = 0.5 for D = 1.
//
// Expect
// ------
// - |θ̂ − 1| < 0.3 with a finite positive se.
fn potential_quantile_recovers_median() {
    let data = make_quantile_data(1000, 17);
    let learners = LearnerSet::new().with("ml_g", LogisticClassifier::new()).with("ml_m", LogisticClassifier::new());
    let score = PqScore::new(0.5, 1.0).expect("valid quantile");
    let mut dml = DoubleML::new(data, score, learners, DMLOptions::new(3, 1).expect("valid")).expect("valid");

    dml.fit().expect("PQ fit");

    let coef = dml.coef().expect("fitted")[0];
    let se = dml.se().expect("fitted")[0];
    assert!((coef - 1.0).abs() < 0.3, "coef {coef}");
    assert!(se.is_finite() && se > 0.0);
    assert_eq!(dml.repetitions()[0][0].refit_rounds, 0);
}

#[test]
// Purpose
// -------
// Refit rounds either settle or fail explicitly.
//
// Given
// -----
// - The PQ design with up to 25 refit rounds of `ml_g`.
//
// Expect
// ------
// - A successful fit reports at least one refit round; a failure is
//   `NonConvergence`, never a stale estimate.
fn quantile_refit_rounds_settle_or_fail() {
    let data = make_quantile_data(600, 23);
    let learners = LearnerSet::new().with("ml_g", LogisticClassifier::new()).with("ml_m", LogisticClassifier::new());
    let options = DMLOptions::new(3, 1).expect("valid").with_refit_rounds(25);
    let mut dml =
        DoubleML::new(data, PqScore::new(0.5, 1.0).expect("valid"), learners, options).expect("valid");

    match dml.fit() {
        Ok(()) => assert!(dml.repetitions()[0][0].refit_rounds >= 1),
        Err(err) => {
            assert!(matches!(err, DMLError::NonConvergence { .. }), "{err}");
            assert_eq!(dml.state(), EstimatorState::Failed);
        }
    }
}

#[test]
// Purpose
// -------
// Sharp RDD recovers the jump at the cutoff.
//
// Given
// -----
// - s ~ U(−1, 1), D = 1{s ≥ 0}, jump τ = 0.5, n = 2000; OLS nuisances
//   on each side.
//
// Expect
// ------
// - |θ̂ − 0.5| < 0.3 and a positive finite se.
fn rdd_recovers_jump() {
    let data = make_rdd_data(2000, 0.5, 29);
    let learners = LearnerSet::new().with("ml_g_left", OlsRegressor::new()).with("ml_g_right", OlsRegressor::new());
    let score = RddScore::new(0.0, None, 1).expect("valid RDD");
    let mut dml = DoubleML::new(data, score, learners, DMLOptions::new(5, 1).expect("valid")).expect("valid");

    dml.fit().expect("RDD fit");

    let coef = dml.coef().expect("fitted")[0];
    let se = dml.se().expect("fitted")[0];
    assert!((coef - 0.5).abs() < 0.3, "coef {coef}");
    assert!(se.is_finite() && se > 0.0);
}

#[test]
// Purpose
// -------
// The joint band covers the pointwise intervals of two treatments.
//
// Given
// -----
// - Two-treatment PLR; Normal and Rademacher bootstraps with 500 draws.
//
// Expect
// ------
// - Joint bounds enclose the pointwise 95% bounds for each treatment.
fn joint_band_is_wider_than_pointwise() {
    let data = make_two_treatment_plr_data(600, (0.5, -0.3), 31);
    let mut dml =
        DoubleML::new(data, PlrScore::default(), plr_learners(), DMLOptions::new(3, 1).expect("valid")).expect("valid");
    dml.fit().expect("fit");
    let pointwise = dml.confint(0.95).expect("pointwise");

    for method in [BootstrapMethod::Normal, BootstrapMethod::Rademacher] {
        dml.bootstrap(BootstrapOptions { method, n_boot: 500, seed: 4 }).expect("bootstrap");
        let joint = dml.confint_joint(0.95).expect("joint band");
        assert_eq!(joint.dim(), (2, 2));
        for j in 0..2 {
            assert!(joint[[j, 0]] <= pointwise[[j, 0]], "{method:?} lower {j}");
            assert!(joint[[j, 1]] >= pointwise[[j, 1]], "{method:?} upper {j}");
        }
    }
}

#[test]
// Purpose
// -------
// Unsupported combinations and out-of-order calls fail explicitly.
//
// Given
// -----
// - IRM and bootstrap with clustered data; external splits for clustered
//   data; joint bands before a bootstrap; zero bootstrap draws.
//
// Expect
// ------
// - Unimplemented errors, `InvalidState` and a configuration error.
fn unsupported_combinations_fail_explicitly() {
    let clustered = make_clustered_plr_data(20, 5, 0.5, 1);
    let binary_d = Array2::from_shape_fn((100, 1), |(i, _)| (i % 2) as f64);
    let irm_data = rust_doubleml::data::DMLData::from_arrays(
        clustered.outcome().to_owned(),
        binary_d,
        clustered.covariates().to_owned(),
    )
    .and_then(|d| d.with_clusters(clustered.cluster_ids().expect("clusters").to_owned()))
    .expect("valid data");
    let irm = DoubleML::new(irm_data, IrmScore::default(), irm_learners(), DMLOptions::default());
    let err = irm.expect_err("IRM has no clustered variant");
    assert_eq!(err.category(), ErrorCategory::Unimplemented);

    let mut plr =
        DoubleML::new(clustered, PlrScore::default(), plr_learners(), DMLOptions::new(2, 1).expect("valid")).expect("valid");
    plr.draw_sample_splitting().expect("clustered split");
    let splits = plr.smpls().expect("drawn").clone();
    assert!(matches!(plr.set_sample_splitting(splits), Err(DMLError::Unimplemented(_))));
    plr.fit().expect("clustered fit");
    let boot = plr.bootstrap(BootstrapOptions::default());
    assert!(matches!(boot, Err(DMLError::Inference(InferenceError::Unimplemented { .. }))));

    let mut dml = DoubleML::new(make_plr_data(200, 3, 0.5, 2), PlrScore::default(), plr_learners(), DMLOptions::default())
        .expect("valid");
    assert!(matches!(dml.bootstrap(BootstrapOptions::default()), Err(DMLError::InvalidState { .. })));
    dml.fit().expect("fit");
    assert!(matches!(dml.confint_joint(0.95), Err(DMLError::InvalidState { .. })));
    let zero = dml.bootstrap(BootstrapOptions { n_boot: 0, ..BootstrapOptions::default() });
    assert_eq!(zero.expect_err("zero draws").category(), ErrorCategory::Configuration);
}
