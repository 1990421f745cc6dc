//! Nuisance role declarations: what each learner is trained on.
use crate::{
    estimation::errors::{DMLError, DMLResult},
    learners::LearnerSet,
};

/// Whether a role needs probabilities or plain predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    Regression,
    Classification,
}

/// Training target of a role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoleTarget {
    Outcome,
    Treatment,
    Instrument,
    /// `1{Y ≤ q}` at the fold's preliminary quantile `q`, multiplied by
    /// `1{D = level}` when a level is given.
    OutcomeIndicatorAtPreliminaryQuantile { treatment_level: Option<f64> },
    /// `Y − θ₀·D` with `θ₀` the full-sample preliminary effect.
    OutcomeNetOfPreliminaryEffect,
}

/// Row filter applied to the training side of a fold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrainFilter {
    All,
    TreatmentEquals(f64),
    InstrumentEquals(f64),
    ScoreBelowCutoff(f64),
    ScoreAtOrAboveCutoff(f64),
    /// First half of the train fold, restricted to `D = v`.
    TreatmentEqualsOnHalf(f64),
    /// First half of the train fold, restricted to `Z = v`.
    InstrumentEqualsOnHalf(f64),
}

impl TrainFilter {
    pub fn uses_first_half(&self) -> bool {
        matches!(self, TrainFilter::TreatmentEqualsOnHalf(_) | TrainFilter::InstrumentEqualsOnHalf(_))
    }
}

/// When a role is fitted within a repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoleStage {
    /// Fit on the first half of each train fold, predict the second half.
    Preliminary,
    /// Fit on the train fold, predict the test fold.
    Main,
    /// Like `Main`, but only after a full-sample preliminary estimate exists.
    Dependent,
}

/// NuisanceRole — one out-of-fold prediction the score consumes.
///
/// Fields
/// ------
/// - `name`: key of the prediction array (`"ml_m_prelim"`).
/// - `learner`: key into the [`LearnerSet`] (`"ml_m"`); several roles may
///   share a learner.
/// - `kind`, `target`, `train_filter`, `stage`: see the enums above.
/// - `depends_on`: role whose output this role's target needs.
/// - `trim`: clip predictions to the propensity trimming bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct NuisanceRole {
    pub name: &'static str,
    pub learner: &'static str,
    pub kind: RoleKind,
    pub target: RoleTarget,
    pub train_filter: TrainFilter,
    pub depends_on: Option<&'static str>,
    pub stage: RoleStage,
    pub trim: bool,
}

impl NuisanceRole {
    /// Main-stage regression on all training rows.
    pub fn regression(name: &'static str, target: RoleTarget) -> Self {
        Self {
            name,
            learner: name,
            kind: RoleKind::Regression,
            target,
            train_filter: TrainFilter::All,
            depends_on: None,
            stage: RoleStage::Main,
            trim: false,
        }
    }

    /// Main-stage classification on all training rows, trimmed.
    pub fn propensity(name: &'static str, target: RoleTarget) -> Self {
        Self { kind: RoleKind::Classification, trim: true, ..Self::regression(name, target) }
    }

    pub fn learner(mut self, learner: &'static str) -> Self {
        self.learner = learner;
        self
    }

    pub fn filter(mut self, filter: TrainFilter) -> Self {
        self.train_filter = filter;
        self
    }

    pub fn classification(mut self) -> Self {
        self.kind = RoleKind::Classification;
        self
    }

    pub fn stage(mut self, stage: RoleStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn depends_on(mut self, role: &'static str) -> Self {
        self.depends_on = Some(role);
        self
    }
}

/// validate_roles — check learner coverage, capabilities and dependencies.
///
/// Runs once per estimator, before any fitting.
///
/// Errors
/// ------
/// - [`DMLError::MissingLearner`] when a role's learner key is absent.
/// - [`DMLError::CapabilityMismatch`] when a classification role is given
///   a regressor.
/// - [`DMLError::InvalidRoleGraph`] for unknown dependencies, dependency
///   chains longer than two levels, or a dependency fitted no earlier than
///   its dependent.
pub fn validate_roles(roles: &[NuisanceRole], learners: &LearnerSet) -> DMLResult<()> {
    for role in roles {
        let learner = learners
            .get(role.learner)
            .ok_or_else(|| DMLError::MissingLearner { role: role.learner.to_string() })?;
        if role.kind == RoleKind::Classification && !learner.is_classifier() {
            return Err(DMLError::CapabilityMismatch {
                role: role.name.to_string(),
                learner: learner.name().to_string(),
                reason: "role requires predicted probabilities from a classifier",
            });
        }
        if let Some(dep) = role.depends_on {
            let parent = roles.iter().find(|r| r.name == dep).ok_or_else(|| {
                DMLError::InvalidRoleGraph {
                    role: role.name.to_string(),
                    reason: format!("depends on unknown role {dep}"),
                }
            })?;
            if parent.depends_on.is_some() {
                return Err(DMLError::InvalidRoleGraph {
                    role: role.name.to_string(),
                    reason: format!("dependency chain through {dep} is deeper than two levels"),
                });
            }
            if parent.stage >= role.stage {
                return Err(DMLError::InvalidRoleGraph {
                    role: role.name.to_string(),
                    reason: format!("dependency {dep} is not fitted before this role"),
                });
            }
        }
    }
    Ok(())
}
