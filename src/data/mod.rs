//! data — the row-aligned dataset consumed by the estimators.
//!
//! Purpose
//! -------
//! Store outcome, treatments, covariates, instruments, cluster ids and the
//! discontinuity running variable with their column names, and hand out
//! typed views plus explicit per-treatment contexts.
//!
//! Key behaviors
//! -------------
//! - [`DMLData::from_arrays`] / [`DMLData::from_columns`] validate shapes,
//!   finiteness, name uniqueness and pairwise-disjoint roles up front.
//! - [`DMLData::treatment_context`] returns a [`TreatmentContext`] holding
//!   the selected treatment and its covariate block, optionally augmented
//!   with the other treatments.
//!
//! Invariants & assumptions
//! ------------------------
//! - After construction every accessor is infallible except the
//!   treatment-index lookups.
//! - The container is read-only once built and is shared by reference
//!   across parallel repetitions.
//!
//! Conventions
//! -----------
//! - Default names follow `y`, `d1..`, `X1..`, `z1..`, `cluster1..`, `s`.
//! - Cluster ids are `i64`; one column per clustering dimension.
//!
//! Testing notes
//! -------------
//! - `validation`: each rejection path.
//! - `container`: constructors, role defaults and treatment contexts.

pub mod container;
pub mod context;
pub mod errors;
pub mod validation;

// ---- Re-exports (primary surface) -----------------------------------------

pub use self::container::{ColumnRoles, DMLData};
pub use self::context::TreatmentContext;
pub use self::errors::{DataError, DataResult};
pub use self::validation::is_binary;
