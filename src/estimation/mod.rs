//! estimation — the cross-fitting engine.
//!
//! Purpose
//! -------
//! Drive sample splitting, nuisance fitting, score construction and moment
//! solving for every repetition and treatment, and aggregate the results
//! into one estimate and standard error per treatment.
//!
//! Key behaviors
//! -------------
//! - [`DoubleML`] validates its whole configuration at construction and
//!   walks [`EstimatorState`] from `Unfit` to `Aggregated` during `fit`;
//!   any error moves it to `Failed` and is kept for inspection.
//! - Linear scores are solved in closed form under [`DMLProcedure::Dml1`]
//!   or [`DMLProcedure::Dml2`]; nonlinear scores use a bracketed Brent root
//!   with optional refit rounds of `θ`-dependent nuisances.
//! - Variances follow the sandwich formula, with one-way and two-way
//!   cluster-robust variants.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every observation receives exactly one out-of-fold prediction per
//!   nuisance role and repetition.
//! - `mean(psi_a)` must be finite and non-zero; tiny values are logged.
//! - Repetitions are independent; running them on the rayon pool does not
//!   change results.
//!
//! Conventions
//! -----------
//! - Per-repetition arrays are `(n_treat, n_rep)`.
//! - [`DMLError::category`] sorts failures into configuration, structural,
//!   numerical and unimplemented errors.
//!
//! Testing notes
//! -------------
//! - Unit tests cover options, the solver rules, cluster variances and the
//!   estimator state machine; estimation accuracy is checked in
//!   `tests/integration_dml_pipeline.rs`.

pub mod engine;
pub mod errors;
pub mod options;
pub mod solver;
pub mod state;
pub(crate) mod variance;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::engine::{DoubleML, SummaryRow};
pub use self::errors::{DMLError, DMLResult, ErrorCategory};
pub use self::options::{DMLOptions, DMLProcedure};
pub use self::solver::TreatmentFit;
pub use self::state::EstimatorState;
