//! nuisance — declaration and cross-fitted estimation of nuisance functions.
//!
//! Purpose
//! -------
//! Describe which conditional expectations a score needs ([`NuisanceRole`])
//! and fit them out of fold so that every observation's prediction comes
//! from a learner that never saw it ([`NuisanceFitter`]).
//!
//! Key behaviors
//! -------------
//! - [`validate_roles`] checks learner coverage, classifier capabilities and
//!   the role dependency graph once per estimator.
//! - [`NuisanceFitter::fit_predict`] runs the preliminary, main and
//!   dependent stages for one treatment and one repetition.
//! - [`NuisanceFitter::refit_at_threshold`] re-anchors quantile-indicator
//!   roles during outer refit rounds.
//!
//! Invariants & assumptions
//! ------------------------
//! - Dependency chains are at most two levels deep and point to an earlier
//!   stage.
//! - Fitting holds no state between calls; all randomness comes from the
//!   explicit seed.

pub mod fitter;
pub mod roles;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::fitter::{NuisanceFitter, NuisancePredictions};
pub use self::roles::{NuisanceRole, RoleKind, RoleStage, RoleTarget, TrainFilter, validate_roles};
