//! Cross-fitted nuisance estimation for one treatment and one repetition.
use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView1, Axis};
use rand::seq::SliceRandom;

use crate::{
    data::{DMLData, TreatmentContext},
    estimation::errors::{DMLError, DMLResult},
    learners::LearnerSet,
    nuisance::roles::{NuisanceRole, RoleKind, RoleStage, RoleTarget, TrainFilter},
    resampling::{FoldPartition, stream_rng},
    scores::{PrelimInput, ScoreInput, ScoreModel, Trimming},
};

/// Out-of-fold predictions of every role, plus what was needed to build
/// them.
///
/// Fields
/// ------
/// - `preds`: role name → prediction array of length `n_obs`.
/// - `thresholds`: per-fold preliminary quantile (quantile scores only).
/// - `halves`: per-fold `(first, second)` halves of the train fold.
/// - `preliminary_effect`: full-sample effect behind dependent roles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NuisancePredictions {
    preds: BTreeMap<String, Array1<f64>>,
    thresholds: Vec<Option<f64>>,
    halves: Vec<Option<(Vec<usize>, Vec<usize>)>>,
    preliminary_effect: Option<f64>,
}

impl NuisancePredictions {
    /// Predictions supplied directly, keyed by role name.
    pub fn from_arrays(entries: Vec<(&str, Array1<f64>)>) -> Self {
        let preds = entries.into_iter().map(|(role, values)| (role.to_string(), values)).collect();
        Self { preds, ..Self::default() }
    }

    /// # Errors
    /// [`DMLError::InvalidRoleGraph`] when no predictions exist for `role`.
    pub fn get(&self, role: &str) -> DMLResult<ArrayView1<'_, f64>> {
        self.preds.get(role).map(|v| v.view()).ok_or_else(|| DMLError::InvalidRoleGraph {
            role: role.to_string(),
            reason: "no out-of-fold predictions for this role".to_string(),
        })
    }

    pub fn insert(&mut self, role: &str, values: Array1<f64>) {
        self.preds.insert(role.to_string(), values);
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.preds.keys().map(String::as_str)
    }

    pub fn thresholds(&self) -> &[Option<f64>] {
        &self.thresholds
    }

    pub fn preliminary_effect(&self) -> Option<f64> {
        self.preliminary_effect
    }
}

/// Values a role target is anchored at.
#[derive(Debug, Clone, Copy, Default)]
struct TargetAnchor {
    quantile: Option<f64>,
    effect: Option<f64>,
}

/// NuisanceFitter — fits every role of a score across the folds of one
/// repetition.
///
/// Purpose
/// -------
/// Produce out-of-fold predictions for each [`NuisanceRole`] the score
/// declares, running the three role stages in order:
///
/// 1. `Preliminary`: per fold, the train rows are halved (stratified by
///    the treatment, and the instrument when halves are filtered on it).
///    Preliminary roles fit on the first half and predict the second; the
///    score then turns those predictions into the fold's preliminary
///    quantile.
/// 2. `Main`: fit on the (filtered) train rows, predict the test rows.
/// 3. `Dependent`: once all main predictions exist, the score's
///    full-sample preliminary effect anchors the targets of these roles.
///
/// Invariants
/// ----------
/// - Each learner is a fresh `clone_unfitted()` copy per fold and role.
/// - Classification roles, and regression roles backed by a classifier,
///   predict probabilities.
/// - Roles flagged `trim` are clipped by [`Trimming`] after prediction.
/// - Every returned array is finite at every index.
///
/// Errors
/// ------
/// - [`DMLError::DegenerateFold`] for an empty or single-class training
///   subset.
/// - [`DMLError::CapabilityMismatch`] when a classifier meets a non-binary
///   target.
/// - [`DMLError::NuisanceFit`] when a learner fails.
/// - [`DMLError::NonFiniteEstimate`] for non-finite predictions.
#[derive(Debug, Clone, Copy)]
pub struct NuisanceFitter<'a> {
    ctx: &'a TreatmentContext,
    data: &'a DMLData,
    partition: &'a FoldPartition,
    learners: &'a LearnerSet,
    model: &'a ScoreModel,
    trimming: Trimming,
    rep: usize,
    seed: u64,
}

impl<'a> NuisanceFitter<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: &'a TreatmentContext, data: &'a DMLData, partition: &'a FoldPartition,
        learners: &'a LearnerSet, model: &'a ScoreModel, trimming: Trimming, rep: usize, seed: u64,
    ) -> Self {
        Self { ctx, data, partition, learners, model, trimming, rep, seed }
    }

    pub fn fit_predict(&self) -> DMLResult<NuisancePredictions> {
        let roles = self.model.roles();
        let n_folds = self.partition.n_folds();
        let mut out = NuisancePredictions {
            thresholds: vec![None; n_folds],
            halves: vec![None; n_folds],
            ..NuisancePredictions::default()
        };

        let needs_halves =
            roles.iter().any(|r| r.stage == RoleStage::Preliminary || r.train_filter.uses_first_half());
        if needs_halves {
            self.fit_preliminary(&roles, &mut out)?;
        }

        for role in roles.iter().filter(|r| r.stage == RoleStage::Main) {
            let values = self.fit_out_of_fold(role, &out, None)?;
            out.insert(role.name, values);
        }

        let dependents: Vec<&NuisanceRole> =
            roles.iter().filter(|r| r.stage == RoleStage::Dependent).collect();
        if !dependents.is_empty() {
            let input = ScoreInput::new(self.ctx, self.data, &out);
            let effect = self.model.preliminary_effect(&input)?;
            log::debug!(
                "{}: preliminary effect {effect:.6} for treatment {} (repetition {})",
                self.model.name(),
                self.ctx.name,
                self.rep
            );
            out.preliminary_effect = Some(effect);
            for role in dependents {
                let values = self.fit_out_of_fold(role, &out, None)?;
                out.insert(role.name, values);
            }
        }
        Ok(out)
    }

    /// Re-fit `role` on the stored first halves with its targets anchored
    /// at `threshold` instead of the per-fold preliminary quantiles.
    ///
    /// # Errors
    /// [`DMLError::InvalidRoleGraph`] for an unknown role or when
    /// `predictions` carries no half splits; otherwise as
    /// [`fit_predict`](Self::fit_predict).
    pub fn refit_at_threshold(
        &self, predictions: &mut NuisancePredictions, role: &str, threshold: f64,
    ) -> DMLResult<()> {
        let roles = self.model.roles();
        let role = roles.iter().find(|r| r.name == role).ok_or_else(|| DMLError::InvalidRoleGraph {
            role: role.to_string(),
            reason: "role is not declared by the score".to_string(),
        })?;
        let values = self.fit_out_of_fold(role, predictions, Some(threshold))?;
        predictions.insert(role.name, values);
        Ok(())
    }

    fn fit_preliminary(&self, roles: &[NuisanceRole], out: &mut NuisancePredictions) -> DMLResult<()> {
        let needs_quantile = roles
            .iter()
            .any(|r| matches!(r.target, RoleTarget::OutcomeIndicatorAtPreliminaryQuantile { .. }));
        let stratify_on_instrument =
            roles.iter().any(|r| matches!(r.train_filter, TrainFilter::InstrumentEqualsOnHalf(_)));
        let y = self.data.outcome();
        let z = self.instrument();

        for (fold, split) in self.partition.folds.iter().enumerate() {
            let (first, second) = self.split_halves(&split.train, fold, stratify_on_instrument);
            let mut prelim = BTreeMap::new();
            for role in roles.iter().filter(|r| r.stage == RoleStage::Preliminary) {
                let mut values = self.fit_role_on(role, &first, &second, fold, TargetAnchor::default())?;
                if role.trim {
                    values = self.trimming.clip(role.name, values);
                }
                prelim.insert(role.name, values);
            }
            if needs_quantile {
                let input = PrelimInput {
                    y: y.select(Axis(0), &second),
                    d: self.ctx.d.select(Axis(0), &second),
                    z: z.map(|z| z.select(Axis(0), &second)),
                    preds: prelim,
                };
                out.thresholds[fold] = Some(self.model.preliminary_threshold(&input)?);
            }
            out.halves[fold] = Some((first, second));
        }
        Ok(())
    }

    /// Fit `role` once per fold and scatter the test predictions.
    fn fit_out_of_fold(
        &self, role: &NuisanceRole, out: &NuisancePredictions, threshold: Option<f64>,
    ) -> DMLResult<Array1<f64>> {
        let n = self.data.n_obs();
        let mut values = Array1::from_elem(n, f64::NAN);
        for (fold, split) in self.partition.folds.iter().enumerate() {
            let train = match role.train_filter.uses_first_half() {
                true => match out.halves.get(fold).and_then(Option::as_ref) {
                    Some((first, _)) => first.as_slice(),
                    None => {
                        return Err(DMLError::InvalidRoleGraph {
                            role: role.name.to_string(),
                            reason: format!("no half split available for fold {fold}"),
                        });
                    }
                },
                false => split.train.as_slice(),
            };
            let anchor = TargetAnchor {
                quantile: threshold.or(out.thresholds.get(fold).copied().flatten()),
                effect: out.preliminary_effect,
            };
            let fold_preds = self.fit_role_on(role, train, &split.test, fold, anchor)?;
            for (&i, &p) in split.test.iter().zip(fold_preds.iter()) {
                values[i] = p;
            }
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(DMLError::NonFiniteEstimate {
                treatment: self.ctx.name.clone(),
                rep: self.rep,
                what: "nuisance prediction",
            });
        }
        if role.trim {
            values = self.trimming.clip(role.name, values);
        }
        Ok(values)
    }

    fn fit_role_on(
        &self, role: &NuisanceRole, train: &[usize], predict: &[usize], fold: usize,
        anchor: TargetAnchor,
    ) -> DMLResult<Array1<f64>> {
        let degenerate = |reason: String| DMLError::DegenerateFold {
            role: role.name.to_string(),
            rep: self.rep,
            fold,
            reason,
        };

        let rows = self.filter_rows(role, train)?;
        if rows.is_empty() {
            return Err(degenerate(format!("no training observations pass filter {:?}", role.train_filter)));
        }
        let target = self.target(role, &rows, anchor)?;

        let learner = self
            .learners
            .get(role.learner)
            .ok_or_else(|| DMLError::MissingLearner { role: role.learner.to_string() })?;
        let use_proba = role.kind == RoleKind::Classification || learner.is_classifier();
        if use_proba {
            if let Some(&value) = target.iter().find(|&&v| v != 0.0 && v != 1.0) {
                return Err(DMLError::CapabilityMismatch {
                    role: role.name.to_string(),
                    learner: learner.name().to_string(),
                    reason: if value.is_finite() {
                        "classifier needs a binary target with values 0 and 1"
                    } else {
                        "classifier target is not finite"
                    },
                });
            }
            let first = target[0];
            if target.iter().all(|&v| v == first) {
                return Err(degenerate(format!("training target has the single class {first}")));
            }
        }

        let fit_err = |source| DMLError::NuisanceFit {
            role: role.name.to_string(),
            rep: self.rep,
            fold,
            source,
        };
        let mut fitted = learner.clone_unfitted();
        let x_train = self.ctx.x.select(Axis(0), &rows);
        fitted.fit(x_train.view(), target.view()).map_err(fit_err)?;
        let x_pred = self.ctx.x.select(Axis(0), predict);
        let preds = match use_proba {
            true => fitted.predict_proba(x_pred.view()),
            false => fitted.predict(x_pred.view()),
        }
        .map_err(fit_err)?;
        log::debug!(
            "fitted {} ({}) on {} rows, repetition {}, fold {fold}",
            role.name,
            fitted.name(),
            rows.len(),
            self.rep
        );
        Ok(preds)
    }

    fn filter_rows(&self, role: &NuisanceRole, train: &[usize]) -> DMLResult<Vec<usize>> {
        let keep = |column: ArrayView1<f64>, pred: &dyn Fn(f64) -> bool| -> Vec<usize> {
            train.iter().copied().filter(|&i| pred(column[i])).collect()
        };
        let rows = match role.train_filter {
            TrainFilter::All => train.to_vec(),
            TrainFilter::TreatmentEquals(v) | TrainFilter::TreatmentEqualsOnHalf(v) => {
                keep(self.ctx.d.view(), &|d| d == v)
            }
            TrainFilter::InstrumentEquals(v) | TrainFilter::InstrumentEqualsOnHalf(v) => {
                keep(self.require_instrument()?, &|z| z == v)
            }
            TrainFilter::ScoreBelowCutoff(c) => keep(self.require_score_var()?, &|s| s < c),
            TrainFilter::ScoreAtOrAboveCutoff(c) => keep(self.require_score_var()?, &|s| s >= c),
        };
        Ok(rows)
    }

    fn target(&self, role: &NuisanceRole, rows: &[usize], anchor: TargetAnchor) -> DMLResult<Array1<f64>> {
        let y = self.data.outcome();
        let missing = |what: &str| DMLError::InvalidRoleGraph {
            role: role.name.to_string(),
            reason: format!("target needs the {what}, which is not available yet"),
        };
        let target = match role.target {
            RoleTarget::Outcome => y.select(Axis(0), rows),
            RoleTarget::Treatment => self.ctx.d.select(Axis(0), rows),
            RoleTarget::Instrument => self.require_instrument()?.select(Axis(0), rows),
            RoleTarget::OutcomeIndicatorAtPreliminaryQuantile { treatment_level } => {
                let q = anchor.quantile.ok_or_else(|| missing("preliminary quantile"))?;
                rows.iter()
                    .map(|&i| {
                        let at_level = treatment_level.map_or(true, |t| self.ctx.d[i] == t);
                        f64::from(u8::from(at_level && y[i] <= q))
                    })
                    .collect()
            }
            RoleTarget::OutcomeNetOfPreliminaryEffect => {
                let theta0 = anchor.effect.ok_or_else(|| missing("preliminary effect"))?;
                rows.iter().map(|&i| y[i] - theta0 * self.ctx.d[i]).collect()
            }
        };
        Ok(target)
    }

    /// Stratified halving of a train fold.
    ///
    /// Rows are grouped by treatment value (and instrument value when
    /// requested), shuffled within groups and dealt alternately to the two
    /// halves, continuing the alternation across groups.
    fn split_halves(&self, train: &[usize], fold: usize, by_instrument: bool) -> (Vec<usize>, Vec<usize>) {
        let mut rng =
            stream_rng(self.seed, &[self.rep as u64, self.ctx.treat_idx as u64, fold as u64]);
        let z = if by_instrument { self.instrument() } else { None };
        let mut groups: BTreeMap<(u64, u64), Vec<usize>> = BTreeMap::new();
        for &i in train {
            let key = (self.ctx.d[i].to_bits(), z.map_or(0, |z| z[i].to_bits()));
            groups.entry(key).or_default().push(i);
        }

        let (mut first, mut second) = (Vec::new(), Vec::new());
        let mut turn = 0usize;
        for members in groups.values_mut() {
            members.shuffle(&mut rng);
            for &i in members.iter() {
                if turn % 2 == 0 { first.push(i) } else { second.push(i) }
                turn += 1;
            }
        }
        first.sort_unstable();
        second.sort_unstable();
        (first, second)
    }

    fn instrument(&self) -> Option<ArrayView1<'a, f64>> {
        self.data.instruments().map(|z| z.index_axis_move(Axis(1), 0))
    }

    fn require_instrument(&self) -> DMLResult<ArrayView1<'a, f64>> {
        self.instrument().ok_or_else(|| DMLError::InvalidData {
            reason: "nuisance role requires an instrument".to_string(),
        })
    }

    fn require_score_var(&self) -> DMLResult<ArrayView1<'a, f64>> {
        self.data.score_var().ok_or_else(|| DMLError::InvalidData {
            reason: "nuisance role requires a running variable s".to_string(),
        })
    }
}
