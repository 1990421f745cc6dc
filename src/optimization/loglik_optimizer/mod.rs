//! loglik_optimizer — argmin-powered maximization of likelihood objectives.
//!
//! Purpose
//! -------
//! Fit parametric nuisance learners (currently the penalized logistic
//! classifier) by maximizing a log-likelihood `ℓ(θ)` with L-BFGS. Models
//! implement [`LogLikelihood`] and call [`maximize`].
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `ℓ(θ)` into the argmin cost
//!   `c(θ) = -ℓ(θ)` and supplies a finite-difference gradient when the model
//!   has no analytic one.
//! - [`maximize`] validates the starting point, builds L-BFGS with a
//!   More-Thuente or Hager-Zhang line search and returns an
//!   [`OptimOutcome`].
//! - [`Tolerances`] and [`MLEOptions`] are validated on construction.
//!
//! Invariants & assumptions
//! ------------------------
//! - `value`/`grad` report invalid inputs as [`OptError`](super::errors::OptError)
//!   values, never panics.
//! - Outcome parameters and values are finite; otherwise construction of
//!   [`OptimOutcome`] fails.
//!
//! Testing notes
//! -------------
//! - `adapter`: sign conventions and FD fallback.
//! - `run`: convergence on concave quadratics for both line searches.
//! - `traits`, `validation`: configuration rules and error paths.

pub mod adapter;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::run::maximize;
pub use self::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

pub mod prelude {
    pub use super::run::maximize;
    pub use super::traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
