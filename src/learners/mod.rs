//! learners — the pluggable nuisance-estimator interface and built-ins.
//!
//! Purpose
//! -------
//! Define the [`Learner`] capability the cross-fitting engine relies on
//! (`fit`, `predict`, optional `predict_proba`) and ship a few learners
//! that need no external ML stack.
//!
//! Key behaviors
//! -------------
//! - [`OlsRegressor`]: least squares (optionally ridge) through an
//!   eigen-truncated pseudo-inverse.
//! - [`LogisticClassifier`]: L2-penalized logistic regression maximized with
//!   the argmin L-BFGS stack in `optimization`.
//! - [`ConstantRegressor`] / [`ConstantClassifier`]: feature-free baselines.
//! - [`LearnerSet`]: role name → learner map handed to an estimator.
//!
//! Invariants & assumptions
//! ------------------------
//! - `clone_unfitted` never carries fitted state; every fold fits a fresh
//!   copy.
//! - Classifiers accept only 0/1 targets with both classes present.

pub mod dummy;
pub mod errors;
pub mod linear;
pub mod logistic;
pub mod traits;

pub use self::dummy::{ConstantClassifier, ConstantRegressor, ConstantStrategy};
pub use self::errors::{LearnerError, LearnerResult};
pub use self::linear::OlsRegressor;
pub use self::logistic::LogisticClassifier;
pub use self::traits::{Learner, LearnerSet};
