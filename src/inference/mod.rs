//! inference — from per-repetition estimates to reported uncertainty.
//!
//! Purpose
//! -------
//! Aggregate point estimates and standard errors across repeated sample
//! splits, and provide normal-approximation tests, pointwise intervals and
//! multiplier-bootstrap joint bands on top of them.
//!
//! Key behaviors
//! -------------
//! - [`aggregate_repetitions`] applies the median rule, inflating standard
//!   errors by the dispersion of estimates across splits.
//! - [`NormalInference`] computes t-statistics, two-sided p-values and
//!   `level` intervals from the standard normal.
//! - [`MultiplierBootstrap`] perturbs per-observation scores with
//!   normal, Rademacher, Bayesian or Mammen wild multipliers;
//!   [`joint_confint`] turns the draws into a simultaneous band.
//!
//! Invariants & assumptions
//! ------------------------
//! - Per-repetition arrays are laid out `(n_treat, n_rep)`.
//! - Standard errors are finite and non-negative; the bootstrap requires
//!   them strictly positive.
//! - Bootstrap randomness is seeded explicitly per repetition.
//!
//! Conventions
//! -----------
//! - Quantiles interpolate linearly between order statistics.
//! - Intervals are returned as `(n_treat, 2)` arrays of lower/upper bounds.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the aggregation rule, textbook normal quantities,
//!   multiplier moments and the joint critical value.

pub mod aggregation;
pub mod bootstrap;
pub mod confidence;
pub mod errors;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::aggregation::aggregate_repetitions;
pub use self::bootstrap::{BootstrapMethod, BootstrapOptions, MultiplierBootstrap, joint_confint};
pub use self::confidence::NormalInference;
pub use self::errors::{InferenceError, InferenceResult};

pub(crate) use self::aggregation::quantile_sorted;
