//! scores — orthogonal moment functions for every supported model.
//!
//! Purpose
//! -------
//! Turn observed data and out-of-fold nuisance predictions into the linear
//! score decomposition `ψ(θ) = psi_a·θ + psi_b` that the estimation engine
//! solves and differentiates.
//!
//! Key behaviors
//! -------------
//! - Each model declares its nuisance roles, validates the dataset and
//!   computes [`ScoreElements`] from a [`ScoreInput`].
//! - Nonlinear scores (PQ, LPQ) return their linearization at the current
//!   `θ`, so variance and bootstrap formulas are shared with linear ones.
//! - [`Trimming`] bounds propensity predictions away from 0 and 1.
//!
//! Invariants & assumptions
//! ------------------------
//! - Predictions passed to a score are out-of-fold for every observation.
//! - Scores never mutate their inputs and hold no fitted state.
//!
//! Conventions
//! -----------
//! - Role names follow the `ml_*` keys used in [`LearnerSet`](crate::learners::LearnerSet).
//! - Binary variables take exactly the values 0 and 1.
//!
//! Testing notes
//! -------------
//! - Each score file checks its elements on hand-computable inputs and its
//!   validation rules.

pub mod elements;
pub mod iivm;
pub mod irm;
pub mod model;
pub mod pliv;
pub mod plr;
pub mod quantile;
pub mod rdd;
pub mod trimming;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::elements::{OrthogonalScore, PrelimInput, ScoreElements, ScoreInput};
pub use self::iivm::{IivmScore, Subgroups};
pub use self::irm::{IrmKind, IrmScore};
pub use self::model::ScoreModel;
pub use self::pliv::PlivScore;
pub use self::plr::{PlrKind, PlrScore};
pub use self::quantile::{LpqScore, PqScore};
pub use self::rdd::RddScore;
pub use self::trimming::Trimming;
