//! optimization — argmin-backed solvers and numeric helpers.
//!
//! Purpose
//! -------
//! Provide the numerical machinery the estimators need but do not own:
//! likelihood maximization for parametric nuisance learners and bracketed
//! root finding for moment conditions that are nonlinear in the target
//! parameter.
//!
//! Key behaviors
//! -------------
//! - [`loglik_optimizer`]: L-BFGS maximization of `ℓ(θ)` with analytic or
//!   finite-difference gradients.
//! - [`root_finding`]: Brent root finding with explicit bracket checks and
//!   explicit non-convergence errors.
//! - [`numerical_stability`]: overflow-safe logistic/softplus transforms and
//!   shared tolerances.
//! - [`errors`]: a single [`OptError`](errors::OptError) surface; argmin
//!   errors are downcast into named variants.
//!
//! Conventions
//! -----------
//! - No logging here; callers decide what to report.
//! - Every fallible entry point returns `OptResult<T>`.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;
pub mod root_finding;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::prelude::*;
    pub use super::numerical_stability::prelude::*;
    pub use super::root_finding::{RootOptions, RootOutcome, find_root_bracketed};
}
