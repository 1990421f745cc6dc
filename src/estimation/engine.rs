//! DoubleML estimator: cross-fitting, score solving and repetition
//! aggregation behind one state machine.
//!
//! The estimator owns the dataset, the score model, the learners and the
//! options. `fit` runs every repetition through four stages and keeps the
//! per-repetition diagnostics for inspection.
use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::{
    data::{DMLData, TreatmentContext, is_binary},
    estimation::{
        errors::{DMLError, DMLResult},
        options::DMLOptions,
        solver::{TreatmentFit, TreatmentSolver},
        state::EstimatorState,
        variance::{ClusterFolds, iid_variance},
    },
    inference::{
        BootstrapOptions, InferenceError, MultiplierBootstrap, NormalInference,
        aggregate_repetitions, joint_confint,
    },
    learners::LearnerSet,
    nuisance::{NuisanceFitter, NuisancePredictions, RoleKind, RoleTarget, validate_roles},
    resampling::{FoldPartition, SampleSplits, SampleSplitter, derive_seed},
    scores::{ScoreElements, ScoreInput, ScoreModel, Trimming, elements::CLUSTER_UNSUPPORTED},
};

/// Stream id separating nuisance half-split draws from fold draws.
const NUISANCE_STREAM: u64 = 1;

/// One row of [`DoubleML::summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub treatment: String,
    pub coef: f64,
    pub se: f64,
    pub t_stat: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

impl std::fmt::Display for SummaryRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<12} {:>10.4} {:>10.4} {:>8.3} {:>8.4} [{:>9.4}, {:>9.4}]",
            self.treatment, self.coef, self.se, self.t_stat, self.p_value, self.ci_lower, self.ci_upper
        )
    }
}

/// DoubleML — cross-fitted estimator of one causal parameter per treatment.
///
/// Fields are private; results are exposed through accessors that fail
/// with [`DMLError::InvalidState`] before a successful `fit`.
#[derive(Debug)]
pub struct DoubleML {
    data: DMLData,
    model: ScoreModel,
    learners: LearnerSet,
    options: DMLOptions,
    state: EstimatorState,
    smpls: Option<SampleSplits>,
    /// `repetitions[r][j]`: repetition `r`, treatment `j`.
    repetitions: Vec<Vec<TreatmentFit>>,
    all_coef: Option<Array2<f64>>,
    all_se: Option<Array2<f64>>,
    coef: Option<Array1<f64>>,
    se: Option<Array1<f64>>,
    boot_t: Option<Vec<Array2<f64>>>,
    last_error: Option<String>,
}

impl DoubleML {
    /// Build an estimator after checking the whole configuration.
    ///
    /// ## Steps
    /// 1. Validate `options` and the score's data requirements.
    /// 2. Reject clustered data for scores without a clustered variant and
    ///    more than two clustering dimensions.
    /// 3. Check learner coverage, classifier capabilities and the role
    ///    dependency graph.
    /// 4. Require binary targets wherever a classifier is plugged into a
    ///    regression role.
    ///
    /// ## Errors
    /// Configuration errors ([`DMLError::InvalidParameter`],
    /// [`DMLError::InvalidData`], [`DMLError::MissingLearner`],
    /// [`DMLError::CapabilityMismatch`], [`DMLError::InvalidRoleGraph`]) and
    /// [`DMLError::Unimplemented`] for unsupported combinations. No learner
    /// is fitted.
    pub fn new(
        data: DMLData, model: impl Into<ScoreModel>, learners: LearnerSet, options: DMLOptions,
    ) -> DMLResult<Self> {
        let model = model.into();
        options.validate()?;
        model.validate(&data)?;
        if data.n_cluster_vars() > 0 {
            if !model.supports_clustering() {
                return Err(DMLError::unimplemented(CLUSTER_UNSUPPORTED));
            }
            if data.n_cluster_vars() > 2 {
                return Err(DMLError::unimplemented(
                    "Multi-way (n_ways > 2) clustering not yet implemented.",
                ));
            }
        }
        let roles = model.roles();
        validate_roles(&roles, &learners)?;
        for role in roles.iter().filter(|r| r.kind == RoleKind::Regression) {
            let Some(learner) = learners.get(role.learner) else { continue };
            if !learner.is_classifier() {
                continue;
            }
            let binary = match role.target {
                RoleTarget::Outcome => is_binary(data.outcome()),
                RoleTarget::Treatment => data.treatments().columns().into_iter().all(is_binary),
                RoleTarget::Instrument => data.instruments().map_or(false, |z| z.columns().into_iter().all(is_binary)),
                _ => true,
            };
            if !binary {
                return Err(DMLError::CapabilityMismatch {
                    role: role.name.to_string(),
                    learner: learner.name().to_string(),
                    reason: "a classifier was supplied for a role whose target is not binary",
                });
            }
        }

        log::debug!(
            "{} estimator with {} treatment(s), {} folds, {} repetition(s)",
            model.name(),
            data.n_treat(),
            options.n_folds,
            options.n_rep
        );
        Ok(Self {
            data,
            model,
            learners,
            options,
            state: EstimatorState::Unfit,
            smpls: None,
            repetitions: Vec::new(),
            all_coef: None,
            all_se: None,
            coef: None,
            se: None,
            boot_t: None,
            last_error: None,
        })
    }

    // ---- Sample splitting -------------------------------------------------

    /// Draw `n_rep` fresh fold partitions from `options.seed`.
    ///
    /// Clustered data is split over cluster ids; with `options.stratify`
    /// the folds preserve the class ratio of the first treatment.
    pub fn draw_sample_splitting(&mut self) -> DMLResult<()> {
        self.require_idle("draw a sample splitting")?;
        let splitter = SampleSplitter::new(self.options.n_folds, self.options.n_rep)?;
        let splits = match self.data.cluster_ids() {
            Some(ids) => splitter.split_clustered(ids, self.options.seed)?,
            None if self.options.stratify => {
                splitter.split_stratified(self.data.treatment(0)?, self.options.seed)?
            }
            None => splitter.split(self.data.n_obs(), self.options.seed)?,
        };
        self.install_splits(splits);
        Ok(())
    }

    /// Use caller-supplied fold partitions for every later `fit`.
    ///
    /// # Errors
    /// - [`DMLError::Unimplemented`] for clustered data.
    /// - [`DMLError::Resampling`] when the partitions do not cover the
    ///   sample exactly or were built for another sample size.
    pub fn set_sample_splitting(&mut self, splits: SampleSplits) -> DMLResult<()> {
        self.require_idle("set the sample splitting")?;
        if self.data.n_cluster_vars() > 0 {
            return Err(DMLError::unimplemented(
                "Externally setting the sample splitting for clustered data is not implemented.",
            ));
        }
        splits.validate_for(self.data.n_obs())?;
        self.options.n_rep = splits.n_rep();
        self.install_splits(splits);
        Ok(())
    }

    fn install_splits(&mut self, splits: SampleSplits) {
        self.smpls = Some(splits);
        self.clear_results();
        self.state = EstimatorState::Split;
    }

    pub fn smpls(&self) -> Option<&SampleSplits> {
        self.smpls.as_ref()
    }

    // ---- Estimation -------------------------------------------------------

    /// Cross-fit the nuisances and estimate every treatment effect.
    ///
    /// ## Steps
    /// 1. `Split`: draw partitions unless some are already installed.
    /// 2. `NuisanceFitted`: out-of-fold predictions per repetition and
    ///    treatment.
    /// 3. `Scored`: score elements of linear models.
    /// 4. `Solved`: closed-form or bracketed roots, Jacobian checks and
    ///    (clustered) variances.
    /// 5. `Aggregated`: median aggregation across repetitions.
    ///
    /// Repetitions run on the rayon pool when `options.parallel` is set;
    /// results do not depend on it.
    ///
    /// ## Errors
    /// Any stage error moves the estimator to `Failed`, is recorded in
    /// [`last_error`](Self::last_error) and returned. Calling `fit` in the
    /// middle of a run is [`DMLError::InvalidState`].
    pub fn fit(&mut self) -> DMLResult<()> {
        if !self.state.can_fit() {
            return Err(DMLError::InvalidState { state: self.state.as_str(), action: "fit" });
        }
        log::info!(
            "fitting {} for {} treatment(s) on {} observations",
            self.model.name(),
            self.data.n_treat(),
            self.data.n_obs()
        );
        match self.run_fit() {
            Ok(()) => {
                self.last_error = None;
                log::info!("{} fit finished: coef = {:?}", self.model.name(), self.coef);
                Ok(())
            }
            Err(err) => {
                log::warn!("{} fit failed in state {}: {err}", self.model.name(), self.state);
                self.state = EstimatorState::Failed;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn run_fit(&mut self) -> DMLResult<()> {
        if self.smpls.is_none() {
            self.draw_sample_splitting()?;
        }
        self.clear_results();
        let splits = self.smpls.clone().ok_or(DMLError::InvalidState {
            state: EstimatorState::Unfit.as_str(),
            action: "fit without a sample splitting",
        })?;
        let contexts = (0..self.data.n_treat())
            .map(|j| self.data.treatment_context(j))
            .collect::<Result<Vec<_>, _>>()?;
        let trimming = self.options.trimming()?;
        let nuisance_seed = derive_seed(self.options.seed, NUISANCE_STREAM);

        let predictions = self.run_repetitions(vec![(); splits.n_rep()], |rep, ()| {
            let partition = &splits.partitions[rep];
            log::debug!("repetition {rep}: fitting nuisances on {} folds", partition.n_folds());
            contexts
                .iter()
                .map(|ctx| self.fitter(ctx, partition, rep, nuisance_seed, trimming).fit_predict())
                .collect::<DMLResult<Vec<_>>>()
        })?;
        self.state = EstimatorState::NuisanceFitted;

        let scored = self.run_repetitions(predictions, |_, preds| {
            contexts
                .iter()
                .zip(preds)
                .map(|(ctx, p)| {
                    let elements = match self.model.is_linear() {
                        true => Some(self.model.elements(&ScoreInput::new(ctx, &self.data, &p), 0.0)?),
                        false => None,
                    };
                    Ok((p, elements))
                })
                .collect::<DMLResult<Vec<_>>>()
        })?;
        self.state = EstimatorState::Scored;

        let fits = self.run_repetitions(scored, |rep, treatments| {
            let partition = &splits.partitions[rep];
            let fits = contexts
                .iter()
                .zip(treatments)
                .map(|(ctx, (preds, elements))| {
                    let fitter = self.fitter(ctx, partition, rep, nuisance_seed, trimming);
                    self.solve_treatment(&fitter, ctx, partition, rep, preds, elements)
                })
                .collect::<DMLResult<Vec<_>>>()?;
            log::debug!(
                "repetition {rep}: coef = {:?}",
                fits.iter().map(|f| f.theta).collect::<Vec<_>>()
            );
            Ok(fits)
        })?;
        self.state = EstimatorState::Solved;

        let n_treat = contexts.len();
        let n_rep = fits.len();
        let all_coef = Array2::from_shape_fn((n_treat, n_rep), |(j, r)| fits[r][j].theta);
        let all_se = Array2::from_shape_fn((n_treat, n_rep), |(j, r)| fits[r][j].se);
        let (coef, se) = aggregate_repetitions(all_coef.view(), all_se.view())?;

        self.repetitions = fits;
        self.all_coef = Some(all_coef);
        self.all_se = Some(all_se);
        self.coef = Some(coef);
        self.se = Some(se);
        self.state = EstimatorState::Aggregated;
        Ok(())
    }

    fn fitter<'a>(
        &'a self, ctx: &'a TreatmentContext, partition: &'a FoldPartition, rep: usize, seed: u64,
        trimming: Trimming,
    ) -> NuisanceFitter<'a> {
        NuisanceFitter::new(ctx, &self.data, partition, &self.learners, &self.model, trimming, rep, seed)
    }

    /// Map `f` over per-repetition items, in parallel when configured.
    fn run_repetitions<T, U, F>(&self, items: Vec<T>, f: F) -> DMLResult<Vec<U>>
    where
        T: Send,
        U: Send,
        F: Fn(usize, T) -> DMLResult<U> + Send + Sync,
    {
        if self.options.parallel {
            items.into_par_iter().enumerate().map(|(rep, item)| f(rep, item)).collect()
        } else {
            items.into_iter().enumerate().map(|(rep, item)| f(rep, item)).collect()
        }
    }

    fn solve_treatment(
        &self, fitter: &NuisanceFitter, ctx: &TreatmentContext, partition: &FoldPartition, rep: usize,
        mut predictions: NuisancePredictions, elements: Option<ScoreElements>,
    ) -> DMLResult<TreatmentFit> {
        let solver = TreatmentSolver {
            model: &self.model,
            data: &self.data,
            ctx,
            partition,
            options: &self.options,
            rep,
        };
        let clusters = match self.data.cluster_ids() {
            Some(ids) => Some(ClusterFolds::new(partition, ids)?),
            None => None,
        };

        let solution = match elements {
            Some(elements) => {
                solver.check_jacobian(elements.psi_a.mean().unwrap_or(f64::NAN))?;
                let scales = clusters.as_ref().map(ClusterFolds::scales);
                solver.solve_linear(elements, scales.as_deref())?
            }
            None => solver.solve_nonlinear(fitter, &mut predictions)?,
        };

        let psi = solution.elements.psi(solution.theta);
        let (variance, j_hat) = match &clusters {
            Some(folds) => folds.variance(partition, &psi, &solution.elements.psi_a),
            None => {
                let j_hat = solution.elements.psi_a.mean().unwrap_or(f64::NAN);
                (iid_variance(&psi, j_hat), j_hat)
            }
        };
        solver.check_jacobian(j_hat)?;
        solver.check_finite(solution.theta, "coefficient")?;
        let se = variance.sqrt();
        solver.check_finite(se, "standard error")?;

        Ok(TreatmentFit {
            treatment: ctx.name.clone(),
            theta: solution.theta,
            se,
            j_hat,
            fold_thetas: solution.fold_thetas,
            elements: solution.elements,
            psi,
            predictions,
            refit_rounds: solution.refit_rounds,
        })
    }

    /// Hyperparameter tuning is not provided by this crate.
    ///
    /// # Errors
    /// Always [`DMLError::Unimplemented`], with a message naming the model.
    pub fn tune(&mut self) -> DMLResult<()> {
        Err(DMLError::unimplemented(self.model.tuning_message()))
    }

    // ---- Bootstrap & inference --------------------------------------------

    /// Multiplier bootstrap of the fitted scores, one draw set per
    /// repetition, kept for [`confint_joint`](Self::confint_joint).
    ///
    /// # Errors
    /// - [`DMLError::InvalidState`] before a successful fit.
    /// - [`InferenceError::Unimplemented`] for clustered data.
    /// - [`InferenceError::InvalidBootstrapDraws`] for `n_boot = 0`.
    pub fn bootstrap(&mut self, options: BootstrapOptions) -> DMLResult<()> {
        self.require_fitted("bootstrap")?;
        if self.data.n_cluster_vars() > 0 {
            return Err(InferenceError::Unimplemented {
                reason: "Multiplier bootstrap for clustered data is not implemented.",
            }
            .into());
        }
        let boot = MultiplierBootstrap::from_options(&options)?;
        let n = self.data.n_obs();
        let draws = self
            .repetitions
            .iter()
            .enumerate()
            .map(|(rep, fits)| {
                let mut psi = Array2::<f64>::zeros((n, fits.len()));
                for (j, fit) in fits.iter().enumerate() {
                    psi.column_mut(j).assign(&fit.psi);
                }
                let j_hat: Array1<f64> = fits.iter().map(|f| f.j_hat).collect();
                let se: Array1<f64> = fits.iter().map(|f| f.se).collect();
                boot.draw(psi.view(), j_hat.view(), se.view(), rep)
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("drew {} bootstrap replications for {} repetition(s)", boot.n_boot(), draws.len());
        self.boot_t = Some(draws);
        Ok(())
    }

    pub fn coef(&self) -> DMLResult<&Array1<f64>> {
        self.coef.as_ref().ok_or(self.not_fitted("read coefficients"))
    }

    pub fn se(&self) -> DMLResult<&Array1<f64>> {
        self.se.as_ref().ok_or(self.not_fitted("read standard errors"))
    }

    /// Per-repetition coefficients, `(n_treat, n_rep)`.
    pub fn all_coef(&self) -> DMLResult<&Array2<f64>> {
        self.all_coef.as_ref().ok_or(self.not_fitted("read per-repetition coefficients"))
    }

    /// Per-repetition standard errors, `(n_treat, n_rep)`.
    pub fn all_se(&self) -> DMLResult<&Array2<f64>> {
        self.all_se.as_ref().ok_or(self.not_fitted("read per-repetition standard errors"))
    }

    /// Diagnostics of every repetition, indexed `[rep][treatment]`.
    pub fn repetitions(&self) -> &[Vec<TreatmentFit>] {
        &self.repetitions
    }

    pub fn t_stat(&self) -> DMLResult<Array1<f64>> {
        Ok(self.inference()?.t_stat())
    }

    pub fn pval(&self) -> DMLResult<Array1<f64>> {
        Ok(self.inference()?.p_value()?)
    }

    /// Pointwise normal intervals, `(n_treat, 2)`.
    pub fn confint(&self, level: f64) -> DMLResult<Array2<f64>> {
        Ok(self.inference()?.confint(level)?)
    }

    /// Simultaneous band from the draws of the last [`bootstrap`](Self::bootstrap).
    pub fn confint_joint(&self, level: f64) -> DMLResult<Array2<f64>> {
        self.require_fitted("compute a joint confidence interval")?;
        let draws = self.boot_t.as_deref().ok_or(DMLError::InvalidState {
            state: self.state.as_str(),
            action: "compute a joint confidence interval before bootstrap",
        })?;
        let (all_coef, all_se) = (self.all_coef()?, self.all_se()?);
        Ok(joint_confint(all_coef.view(), all_se.view(), draws, level)?)
    }

    /// Coefficient table with 95% intervals.
    pub fn summary(&self) -> DMLResult<Vec<SummaryRow>> {
        let inference = self.inference()?;
        let t = inference.t_stat();
        let p = inference.p_value()?;
        let ci = inference.confint(0.95)?;
        Ok(self
            .data
            .d_cols()
            .iter()
            .enumerate()
            .map(|(j, name)| SummaryRow {
                treatment: name.clone(),
                coef: inference.coef()[j],
                se: inference.se()[j],
                t_stat: t[j],
                p_value: p[j],
                ci_lower: ci[[j, 0]],
                ci_upper: ci[[j, 1]],
            })
            .collect())
    }

    fn inference(&self) -> DMLResult<NormalInference> {
        Ok(NormalInference::new(self.coef()?.clone(), self.se()?.clone())?)
    }

    // ---- State ------------------------------------------------------------

    pub fn state(&self) -> EstimatorState {
        self.state
    }

    /// Message of the error that moved the estimator to `Failed`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn model(&self) -> &ScoreModel {
        &self.model
    }

    pub fn options(&self) -> &DMLOptions {
        &self.options
    }

    pub fn data(&self) -> &DMLData {
        &self.data
    }

    fn require_idle(&self, action: &'static str) -> DMLResult<()> {
        match self.state.can_fit() {
            true => Ok(()),
            false => Err(DMLError::InvalidState { state: self.state.as_str(), action }),
        }
    }

    fn require_fitted(&self, action: &'static str) -> DMLResult<()> {
        match self.state.is_fitted() {
            true => Ok(()),
            false => Err(self.not_fitted(action)),
        }
    }

    fn not_fitted(&self, action: &'static str) -> DMLError {
        DMLError::InvalidState { state: self.state.as_str(), action }
    }

    fn clear_results(&mut self) {
        self.repetitions.clear();
        self.all_coef = None;
        self.all_se = None;
        self.coef = None;
        self.se = None;
        self.boot_t = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        learners::{ConstantClassifier, ConstantRegressor, LogisticClassifier, OlsRegressor},
        scores::{IrmScore, PlrScore, PqScore},
    };
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Construction checks, the state machine and failure bookkeeping. Full
    // estimation scenarios live in the integration tests.
    // -------------------------------------------------------------------------

    fn small_plr_data() -> DMLData {
        let n = 40;
        let x = Array2::from_shape_fn((n, 1), |(i, _)| (i as f64 * 0.37).sin());
        let d = Array2::from_shape_fn((n, 1), |(i, _)| x[[i, 0]] + (i as f64 * 1.3).cos());
        let y = Array1::from_shape_fn(n, |i| 0.5 * d[[i, 0]] + x[[i, 0]] + (i as f64 * 2.1).sin() * 0.1);
        DMLData::from_arrays(y, d, x).expect("valid data")
    }

    fn plr_learners() -> LearnerSet {
        LearnerSet::new().with("ml_l", OlsRegressor::new()).with("ml_m", OlsRegressor::new())
    }

    #[test]
    // Purpose
    // -------
    // Results are unavailable before `fit` and available after it.
    //
    // Given
    // -----
    // - A PLR estimator with OLS learners on a smooth design.
    //
    // Expect
    // ------
    // - `coef()` is `InvalidState` while `Unfit`; after `fit` the state is
    //   `Aggregated` and one repetition with one treatment is stored.
    fn fit_moves_to_aggregated() {
        let options = DMLOptions::new(4, 1).expect("valid options");
        let mut dml = DoubleML::new(small_plr_data(), PlrScore::default(), plr_learners(), options)
            .expect("valid configuration");
        assert!(matches!(dml.coef(), Err(DMLError::InvalidState { .. })));

        dml.fit().expect("fit succeeds");

        assert_eq!(dml.state(), EstimatorState::Aggregated);
        assert_eq!(dml.repetitions().len(), 1);
        assert_eq!(dml.repetitions()[0].len(), 1);
        assert!(dml.coef().expect("fitted")[0].is_finite());
        assert_eq!(dml.smpls().expect("drawn").n_rep(), 1);
        assert!(dml.last_error().is_none());
    }

    #[test]
    // Purpose
    // -------
    // A failing fit is recorded and leaves the estimator in `Failed`.
    //
    // Given
    // -----
    // - PLR with a constant `ml_m` equal to the treatment mean and a
    //   treatment that is constant, so every residual is zero.
    //
    // Expect
    // ------
    // - `SingularJacobian`; state `Failed`; `last_error` holds the message.
    fn failure_is_recorded() {
        let n = 12;
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let d = Array2::from_elem((n, 1), 1.0);
        let y = Array1::from_shape_fn(n, |i| i as f64);
        let data = DMLData::from_arrays(y, d, x).expect("valid data");
        let learners = LearnerSet::new().with("ml_l", ConstantRegressor::mean()).with("ml_m", ConstantRegressor::mean());
        let mut dml = DoubleML::new(data, PlrScore::default(), learners, DMLOptions::new(3, 1).expect("valid"))
            .expect("valid configuration");

        let err = dml.fit().expect_err("zero Jacobian");

        assert!(matches!(err, DMLError::SingularJacobian { .. }));
        assert_eq!(dml.state(), EstimatorState::Failed);
        assert_eq!(dml.last_error(), Some(err.to_string().as_str()));
    }

    #[test]
    // Purpose
    // -------
    // Configuration problems surface at construction.
    //
    // Given
    // -----
    // - IRM without `ml_m`; PLR with a classifier on a continuous treatment;
    //   PQ with clustered data.
    //
    // Expect
    // ------
    // - `MissingLearner`, `CapabilityMismatch` and `Unimplemented`.
    fn construction_rejects_bad_configurations() {
        let n = 20;
        let x = Array2::from_shape_fn((n, 1), |(i, _)| i as f64);
        let d = Array2::from_shape_fn((n, 1), |(i, _)| (i % 2) as f64);
        let y = Array1::from_shape_fn(n, |i| i as f64);
        let binary = DMLData::from_arrays(y.clone(), d, x.clone()).expect("valid data");

        let missing = DoubleML::new(
            binary.clone(),
            IrmScore::default(),
            LearnerSet::new().with("ml_g", OlsRegressor::new()),
            DMLOptions::default(),
        );
        assert!(matches!(missing, Err(DMLError::MissingLearner { .. })));

        let mismatch = DoubleML::new(
            small_plr_data(),
            PlrScore::default(),
            LearnerSet::new().with("ml_l", OlsRegressor::new()).with("ml_m", LogisticClassifier::new()),
            DMLOptions::default(),
        );
        assert!(matches!(mismatch, Err(DMLError::CapabilityMismatch { .. })));

        let clustered = binary
            .with_clusters(Array2::from_shape_fn((n, 1), |(i, _)| (i / 4) as i64))
            .expect("valid clusters");
        let learners = LearnerSet::new().with("ml_g", ConstantClassifier::prior()).with("ml_m", ConstantClassifier::prior());
        let pq = DoubleML::new(clustered, PqScore::new(0.5, 1.0).expect("valid"), learners, DMLOptions::default());
        assert!(matches!(pq, Err(DMLError::Unimplemented(_))));
    }

    #[test]
    // Purpose
    // -------
    // External splits are validated and fix the number of repetitions.
    //
    // Given
    // -----
    // - A two-repetition partition of 40 rows, then one with a missing row.
    //
    // Expect
    // ------
    // - The first is accepted and `n_rep` becomes 2; the second is a
    //   resampling error.
    fn external_splits_are_validated() {
        let mut dml = DoubleML::new(small_plr_data(), PlrScore::default(), plr_learners(), DMLOptions::default())
            .expect("valid configuration");
        let even: Vec<usize> = (0..40).filter(|i| i % 2 == 0).collect();
        let odd: Vec<usize> = (0..40).filter(|i| i % 2 == 1).collect();
        let part = FoldPartition::from_pairs(vec![(odd.clone(), even.clone()), (even.clone(), odd.clone())]);
        let splits = SampleSplits::new(40, vec![part.clone(), part]).expect("two repetitions");

        dml.set_sample_splitting(splits).expect("valid splits");
        assert_eq!(dml.options().n_rep, 2);
        assert_eq!(dml.state(), EstimatorState::Split);

        let short = FoldPartition::from_pairs(vec![(odd.clone(), even[1..].to_vec()), (even, odd)]);
        let bad = SampleSplits { n_obs: 40, partitions: vec![short] };
        assert!(matches!(dml.set_sample_splitting(bad), Err(DMLError::Resampling(_))));
    }

    #[test]
    // Purpose
    // -------
    // Tuning is an explicit unimplemented combination.
    //
    // Given
    // -----
    // - A PLR estimator.
    //
    // Expect
    // ------
    // - `tune()` is `Unimplemented`.
    fn tuning_is_unimplemented() {
        let mut dml = DoubleML::new(small_plr_data(), PlrScore::default(), plr_learners(), DMLOptions::default())
            .expect("valid configuration");
        assert!(matches!(dml.tune(), Err(DMLError::Unimplemented(_))));
    }
}
