//! Solving the cross-fitted moment for one treatment and one repetition.
use std::cell::RefCell;

use ndarray::Array1;

use crate::{
    data::{DMLData, TreatmentContext},
    estimation::{
        errors::{DMLError, DMLResult},
        options::{DMLOptions, DMLProcedure},
    },
    nuisance::{NuisanceFitter, NuisancePredictions},
    optimization::{errors::OptError, numerical_stability::PSI_A_WARN_TOL, root_finding::find_root_bracketed},
    resampling::FoldPartition,
    scores::{ScoreElements, ScoreInput, ScoreModel},
};

/// TreatmentFit — everything one repetition produced for one treatment.
///
/// Fields
/// ------
/// - `treatment`: treatment column name.
/// - `theta`, `se`: the repetition's estimate and standard error.
/// - `j_hat`: `mean(psi_a)` (fold-weighted for clustered data).
/// - `fold_thetas`: the moment solved within each test fold.
/// - `elements`: `psi_a`, `psi_b` at `theta`.
/// - `psi`: `psi_a·θ + psi_b`.
/// - `predictions`: the out-of-fold nuisance predictions.
/// - `refit_rounds`: outer refit rounds used (nonlinear scores).
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentFit {
    pub treatment: String,
    pub theta: f64,
    pub se: f64,
    pub j_hat: f64,
    pub fold_thetas: Vec<f64>,
    pub elements: ScoreElements,
    pub psi: Array1<f64>,
    pub predictions: NuisancePredictions,
    pub refit_rounds: usize,
}

/// Point estimate of one repetition before variance estimation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Solution {
    pub theta: f64,
    pub fold_thetas: Vec<f64>,
    pub elements: ScoreElements,
    pub refit_rounds: usize,
}

/// Per-treatment moment solver.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreatmentSolver<'a> {
    pub model: &'a ScoreModel,
    pub data: &'a DMLData,
    pub ctx: &'a TreatmentContext,
    pub partition: &'a FoldPartition,
    pub options: &'a DMLOptions,
    pub rep: usize,
}

impl TreatmentSolver<'_> {
    /// Closed-form solve of a linear score.
    ///
    /// DML1 averages the fold roots; DML2 pools all scores, weighting folds
    /// by `cluster_scales` when given.
    pub(crate) fn solve_linear(
        &self, elements: ScoreElements, cluster_scales: Option<&[f64]>,
    ) -> DMLResult<Solution> {
        let fold_thetas = self.fold_roots(&elements);
        let theta = match (self.options.procedure, cluster_scales) {
            (DMLProcedure::Dml1, _) => mean(&fold_thetas),
            (DMLProcedure::Dml2, None) => elements.solve_linear(None).0,
            (DMLProcedure::Dml2, Some(scales)) => {
                let (mut sum_a, mut sum_b) = (0.0, 0.0);
                for (split, &scale) in self.partition.folds.iter().zip(scales) {
                    sum_a += scale * split.test.iter().map(|&i| elements.psi_a[i]).sum::<f64>();
                    sum_b += scale * split.test.iter().map(|&i| elements.psi_b[i]).sum::<f64>();
                }
                -sum_b / sum_a
            }
        };
        self.check_finite(theta, "coefficient")?;
        Ok(Solution { theta, fold_thetas, elements, refit_rounds: 0 })
    }

    /// Bracketed root of a nonlinear score, with optional outer refits of
    /// the `θ`-dependent nuisances.
    ///
    /// Errors
    /// ------
    /// - [`DMLError::Optimization`] wrapping `RootNotBracketed` when the
    ///   moment does not change sign over the outcome range.
    /// - [`DMLError::NonConvergence`] when Brent exhausts its budget or the
    ///   refit rounds do not settle within `root.tol`.
    pub(crate) fn solve_nonlinear(
        &self, fitter: &NuisanceFitter, predictions: &mut NuisancePredictions,
    ) -> DMLResult<Solution> {
        let mut theta = self.root(predictions)?;
        let mut rounds = 0;
        if self.options.max_refit_rounds > 0 && !self.model.refit_roles().is_empty() {
            let mut settled = false;
            while rounds < self.options.max_refit_rounds {
                rounds += 1;
                for role in self.model.refit_roles() {
                    fitter.refit_at_threshold(predictions, role, theta)?;
                }
                let next = self.root(predictions)?;
                let step = (next - theta).abs();
                log::debug!(
                    "{} refit round {rounds}: θ = {next:.6} (step {step:.3e}), repetition {}",
                    self.model.name(),
                    self.rep
                );
                theta = next;
                if step <= self.options.root.tol {
                    settled = true;
                    break;
                }
            }
            if !settled {
                return Err(self.non_convergence(format!(
                    "refit iterations did not settle within {} rounds",
                    self.options.max_refit_rounds
                )));
            }
        }

        let input = ScoreInput::new(self.ctx, self.data, predictions);
        let elements = self.model.elements(&input, theta)?;
        let fold_thetas = self.fold_roots(&elements);
        Ok(Solution { theta, fold_thetas, elements, refit_rounds: rounds })
    }

    /// `mean(psi_a)` check: zero or non-finite is an error, tiny values warn.
    pub(crate) fn check_jacobian(&self, j_hat: f64) -> DMLResult<()> {
        if j_hat == 0.0 || !j_hat.is_finite() {
            return Err(DMLError::SingularJacobian {
                treatment: self.ctx.name.clone(),
                rep: self.rep,
                value: j_hat,
            });
        }
        if j_hat.abs() < PSI_A_WARN_TOL {
            log::warn!(
                "mean(psi_a) = {j_hat:e} is close to zero for treatment {} (repetition {}); the estimate is unstable",
                self.ctx.name,
                self.rep
            );
        }
        Ok(())
    }

    pub(crate) fn check_finite(&self, value: f64, what: &'static str) -> DMLResult<()> {
        if !value.is_finite() {
            return Err(DMLError::NonFiniteEstimate {
                treatment: self.ctx.name.clone(),
                rep: self.rep,
                what,
            });
        }
        Ok(())
    }

    fn fold_roots(&self, elements: &ScoreElements) -> Vec<f64> {
        self.partition.folds.iter().map(|split| elements.solve_linear(Some(&split.test)).0).collect()
    }

    /// Root of the pooled moment (DML2) or the average of fold roots (DML1)
    /// over `[min Y − δ, max Y + δ]`.
    fn root(&self, predictions: &NuisancePredictions) -> DMLResult<f64> {
        let input = ScoreInput::new(self.ctx, self.data, predictions);
        let y = self.data.outcome();
        let (lo, hi) = y.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
        let delta = 1e-6 * (1.0 + (hi - lo).abs());
        let (lower, upper) = (lo - delta, hi + delta);

        // Brent's closure cannot return `Result`; the first score error is
        // parked here and `NaN` is returned in its place.
        let score_err: RefCell<Option<DMLError>> = RefCell::new(None);
        let moment = |rows: Option<&[usize]>, theta: f64| -> f64 {
            match self.model.elements(&input, theta) {
                Ok(el) => {
                    let psi = el.psi(theta);
                    match rows {
                        Some(rows) => rows.iter().map(|&i| psi[i]).sum::<f64>() / rows.len().max(1) as f64,
                        None => psi.mean().unwrap_or(f64::NAN),
                    }
                }
                Err(e) => {
                    let mut slot = score_err.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                    f64::NAN
                }
            }
        };

        let root = match self.options.procedure {
            DMLProcedure::Dml2 => self.bracketed(&|theta| moment(None, theta), lower, upper),
            DMLProcedure::Dml1 => self
                .partition
                .folds
                .iter()
                .map(|split| self.bracketed(&|theta| moment(Some(split.test.as_slice()), theta), lower, upper))
                .collect::<DMLResult<Vec<f64>>>()
                .map(|roots| mean(&roots)),
        };
        if let Some(err) = score_err.take() {
            return Err(err);
        }
        root
    }

    fn bracketed<F: Fn(f64) -> f64>(&self, f: &F, lower: f64, upper: f64) -> DMLResult<f64> {
        match find_root_bracketed(f, lower, upper, &self.options.root) {
            Ok(outcome) => Ok(outcome.root),
            Err(OptError::RootNotConverged { iterations, last, residual }) => {
                Err(self.non_convergence(format!(
                    "Brent stopped after {iterations} iterations at {last} with residual {residual:e}"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn non_convergence(&self, reason: String) -> DMLError {
        DMLError::NonConvergence { treatment: self.ctx.name.clone(), rep: self.rep, reason }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len().max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        learners::{ConstantClassifier, LearnerSet},
        scores::{PlrScore, PqScore, Trimming},
    };
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // DML1/DML2 combination rules, the Jacobian guard, and the root solve
    // of a quantile moment.
    // -------------------------------------------------------------------------

    fn fixture() -> (DMLData, FoldPartition) {
        let data = DMLData::from_arrays(
            array![1.0, 2.0, 3.0, 4.0],
            array![[1.0], [0.0], [1.0], [0.0]],
            Array2::zeros((4, 1)),
        )
        .expect("valid data");
        let partition = FoldPartition::from_pairs(vec![(vec![2, 3], vec![0, 1]), (vec![0, 1], vec![2, 3])]);
        (data, partition)
    }

    #[test]
    // Purpose
    // -------
    // DML1 averages fold roots while DML2 pools the sums.
    //
    // Given
    // -----
    // - psi_a = [−1, −1, −2, −2], psi_b = [1, 1, 8, 0]; two folds.
    //
    // Expect
    // ------
    // - Fold roots 1 and 2; DML1 θ = 1.5; DML2 θ = 10/6.
    fn dml1_and_dml2_combine_folds_differently() {
        let (data, partition) = fixture();
        let ctx = data.treatment_context(0).expect("context");
        let model = ScoreModel::from(PlrScore::default());
        let elements = ScoreElements { psi_a: array![-1.0, -1.0, -2.0, -2.0], psi_b: array![1.0, 1.0, 8.0, 0.0] };

        let dml1 = DMLOptions::default().with_procedure(DMLProcedure::Dml1);
        let solver = TreatmentSolver { model: &model, data: &data, ctx: &ctx, partition: &partition, options: &dml1, rep: 0 };
        let sol = solver.solve_linear(elements.clone(), None).expect("solve");
        assert_eq!(sol.fold_thetas, vec![1.0, 2.0]);
        assert_abs_diff_eq!(sol.theta, 1.5);

        let dml2 = DMLOptions::default();
        let solver = TreatmentSolver { options: &dml2, ..solver };
        let sol = solver.solve_linear(elements, None).expect("solve");
        assert_abs_diff_eq!(sol.theta, 10.0 / 6.0, epsilon = 1e-12);

        assert!(matches!(solver.check_jacobian(0.0), Err(DMLError::SingularJacobian { .. })));
        assert!(solver.check_jacobian(1e-12).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // The quantile moment is solved by bracketed root finding.
    //
    // Given
    // -----
    // - PQ median of Y(1) with m = 1, g = 0.5 and treated outcomes {1, 3}.
    //
    // Expect
    // ------
    // - The weighted CDF of the treated jumps to 0.5 at y = 1, so the root
    //   lies in [1, 3).
    fn quantile_moment_is_solved_by_brent() {
        let (data, partition) = fixture();
        let ctx = data.treatment_context(0).expect("context");
        let model = ScoreModel::from(PqScore::new(0.5, 1.0).expect("valid"));
        let learners = LearnerSet::new().with("ml_g", ConstantClassifier::prior()).with("ml_m", ConstantClassifier::prior());
        let options = DMLOptions::default();
        let fitter = NuisanceFitter::new(&ctx, &data, &partition, &learners, &model, Trimming::default(), 0, 1);
        let mut preds = NuisancePredictions::from_arrays(vec![
            ("ml_g", array![0.5, 0.5, 0.5, 0.5]),
            ("ml_m", array![0.99, 0.99, 0.99, 0.99]),
        ]);
        let solver = TreatmentSolver { model: &model, data: &data, ctx: &ctx, partition: &partition, options: &options, rep: 0 };

        let sol = solver.solve_nonlinear(&fitter, &mut preds).expect("root");

        assert!(sol.theta >= 1.0 - 1e-6 && sol.theta < 3.0, "theta {}", sol.theta);
        assert_eq!(sol.refit_rounds, 0);
    }

    #[test]
    // Purpose
    // -------
    // A score error inside the root search is reported as itself, not as
    // a non-finite moment value.
    //
    // Given
    // -----
    // - The PQ moment with the `ml_g` predictions missing, under DML2 and
    //   DML1.
    //
    // Expect
    // ------
    // - `InvalidRoleGraph` naming `ml_g` in both procedures.
    fn score_errors_surface_from_the_root_search() {
        let (data, partition) = fixture();
        let ctx = data.treatment_context(0).expect("context");
        let model = ScoreModel::from(PqScore::new(0.5, 1.0).expect("valid"));
        let learners = LearnerSet::new().with("ml_g", ConstantClassifier::prior()).with("ml_m", ConstantClassifier::prior());
        let fitter = NuisanceFitter::new(&ctx, &data, &partition, &learners, &model, Trimming::default(), 0, 1);

        for procedure in [DMLProcedure::Dml2, DMLProcedure::Dml1] {
            let options = DMLOptions::default().with_procedure(procedure);
            let mut preds = NuisancePredictions::from_arrays(vec![("ml_m", array![0.99, 0.99, 0.99, 0.99])]);
            let solver = TreatmentSolver { model: &model, data: &data, ctx: &ctx, partition: &partition, options: &options, rep: 0 };

            let err = solver.solve_nonlinear(&fitter, &mut preds).expect_err("missing ml_g");

            assert!(
                matches!(&err, DMLError::InvalidRoleGraph { role, .. } if role == "ml_g"),
                "{procedure:?}: {err}"
            );
        }
    }
}
