//! Score inputs, score elements and the per-model score interface.
use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView1, Axis};

use crate::{
    data::{DMLData, TreatmentContext, is_binary},
    estimation::errors::{DMLError, DMLResult},
    nuisance::{NuisancePredictions, NuisanceRole},
};

/// ScoreElements — the linear decomposition `ψ(θ) = psi_a·θ + psi_b`.
///
/// For scores that are nonlinear in `θ`, the pair is the linearization at
/// the evaluation point: `psi_a = ∂ψ/∂θ` and `psi_b = ψ(θ) − psi_a·θ`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreElements {
    pub psi_a: Array1<f64>,
    pub psi_b: Array1<f64>,
}

impl ScoreElements {
    /// Per-observation score `psi_a·θ + psi_b`.
    pub fn psi(&self, theta: f64) -> Array1<f64> {
        &self.psi_a * theta + &self.psi_b
    }

    /// Closed-form root of `Σ_rows (psi_a·θ + psi_b) = 0`.
    ///
    /// Returns the pair `(θ, mean(psi_a))` over `rows`, or over every
    /// observation when `rows` is `None`.
    pub fn solve_linear(&self, rows: Option<&[usize]>) -> (f64, f64) {
        let (sum_a, sum_b, count) = match rows {
            Some(rows) => rows.iter().fold((0.0, 0.0, 0usize), |(a, b, c), &i| {
                (a + self.psi_a[i], b + self.psi_b[i], c + 1)
            }),
            None => (self.psi_a.sum(), self.psi_b.sum(), self.psi_a.len()),
        };
        let theta = -sum_b / sum_a;
        (theta, sum_a / count.max(1) as f64)
    }
}

/// Observed columns and out-of-fold predictions a score is evaluated on.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput<'a> {
    pub y: ArrayView1<'a, f64>,
    pub d: ArrayView1<'a, f64>,
    pub z: Option<ArrayView1<'a, f64>>,
    pub s: Option<ArrayView1<'a, f64>>,
    pub preds: &'a NuisancePredictions,
}

impl<'a> ScoreInput<'a> {
    pub fn new(
        ctx: &'a TreatmentContext, data: &'a DMLData, preds: &'a NuisancePredictions,
    ) -> Self {
        Self {
            y: data.outcome(),
            d: ctx.d.view(),
            z: data.instruments().map(|z| z.index_axis_move(Axis(1), 0)),
            s: data.score_var(),
            preds,
        }
    }

    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    pub fn pred(&self, role: &str) -> DMLResult<ArrayView1<'a, f64>> {
        self.preds.get(role)
    }

    pub fn instrument(&self) -> DMLResult<ArrayView1<'a, f64>> {
        self.z.ok_or_else(|| DMLError::InvalidData { reason: "score requires an instrument".to_string() })
    }

    pub fn score_var(&self) -> DMLResult<ArrayView1<'a, f64>> {
        self.s.ok_or_else(|| DMLError::InvalidData {
            reason: "score requires a running variable s".to_string(),
        })
    }
}

/// Rows of the second half of a train fold, where preliminary thresholds
/// are computed.
#[derive(Debug, Clone, PartialEq)]
pub struct PrelimInput {
    pub y: Array1<f64>,
    pub d: Array1<f64>,
    pub z: Option<Array1<f64>>,
    pub preds: BTreeMap<&'static str, Array1<f64>>,
}

impl PrelimInput {
    pub fn pred(&self, role: &'static str) -> DMLResult<&Array1<f64>> {
        self.preds.get(role).ok_or_else(|| DMLError::InvalidRoleGraph {
            role: role.to_string(),
            reason: "preliminary prediction missing".to_string(),
        })
    }
}

/// OrthogonalScore — what every score model supplies to the engine.
///
/// Required:
/// - `name`, `roles`, `validate`, `elements`.
///
/// Optional (defaults in parentheses):
/// - `is_linear` (`true`): nonlinear scores are solved by root finding.
/// - `supports_clustering` (`false`).
/// - `preliminary_threshold`: quantile guess from half-fold predictions,
///   required when a role targets the preliminary quantile.
/// - `preliminary_effect`: full-sample effect for dependent roles.
/// - `refit_roles` (none): roles re-fitted at the current `θ` during
///   outer refit rounds.
/// - `tuning_message`: error text when tuning is requested.
pub trait OrthogonalScore {
    fn name(&self) -> &'static str;

    fn roles(&self) -> Vec<NuisanceRole>;

    fn validate(&self, data: &DMLData) -> DMLResult<()>;

    fn elements(&self, input: &ScoreInput, theta: f64) -> DMLResult<ScoreElements>;

    fn is_linear(&self) -> bool {
        true
    }

    fn supports_clustering(&self) -> bool {
        false
    }

    fn preliminary_threshold(&self, _input: &PrelimInput) -> DMLResult<f64> {
        Err(DMLError::Unimplemented(format!(
            "{} score has no preliminary threshold",
            self.name()
        )))
    }

    fn preliminary_effect(&self, _input: &ScoreInput) -> DMLResult<f64> {
        Err(DMLError::Unimplemented(format!("{} score has no preliminary effect", self.name())))
    }

    fn refit_roles(&self) -> &'static [&'static str] {
        &[]
    }

    fn tuning_message(&self) -> &'static str {
        "Nuisance tuning not implemented."
    }
}

// ---- Shared validation helpers ----

pub(crate) const CLUSTER_UNSUPPORTED: &str = "Estimation with clustering not implemented.";

pub(crate) fn reject_clusters(data: &DMLData) -> DMLResult<()> {
    if data.n_cluster_vars() > 0 {
        return Err(DMLError::unimplemented(CLUSTER_UNSUPPORTED));
    }
    Ok(())
}

pub(crate) fn require_binary_treatments(data: &DMLData, model: &str) -> DMLResult<()> {
    for (j, name) in data.d_cols().iter().enumerate() {
        if !is_binary(data.treatment(j)?) {
            return Err(DMLError::InvalidData {
                reason: format!(
                    "Incompatible data. To fit an {model} model with DML exclusively binary variables with values 0 and 1 need to be specified as treatment variables; {name} is not."
                ),
            });
        }
    }
    Ok(())
}

pub(crate) fn require_single_instrument(data: &DMLData, model: &str, binary: bool) -> DMLResult<()> {
    let z = data.instruments().filter(|z| z.ncols() == 1).ok_or_else(|| DMLError::InvalidData {
        reason: format!(
            "Incompatible data. To fit an {model} model with DML exactly one instrument variable needs to be specified; found {}.",
            data.n_instr()
        ),
    })?;
    if binary && !is_binary(z.column(0)) {
        return Err(DMLError::InvalidData {
            reason: format!(
                "Incompatible data. To fit an {model} model with DML exactly one binary variable with values 0 and 1 needs to be specified as instrumental variable."
            ),
        });
    }
    Ok(())
}

/// Inverse-probability weights, optionally rescaled to mean one.
pub(crate) fn ipw(indicator: ArrayView1<f64>, prob: &Array1<f64>, normalize: bool) -> Array1<f64> {
    let w = &indicator / prob;
    if normalize {
        let mean = w.mean().unwrap_or(0.0);
        if mean > 0.0 {
            return w / mean;
        }
    }
    w
}
