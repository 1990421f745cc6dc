//! numerical_stability — guarded transforms and shared numeric tolerances.
//!
//! Purpose
//! -------
//! Keep the overflow-safe scalar transforms used by the logistic learner
//! and the small tolerances shared by the learners and the estimation
//! engine in one place.
//!
//! Conventions
//! -----------
//! - Pure functions over `f64`; no logging, no allocation.
//! - Domain validation happens upstream; inputs are assumed finite.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    EIGEN_EPS, PSI_A_WARN_TOL, safe_log_logistic, safe_logistic, safe_softplus,
};

pub mod prelude {
    pub use super::transformations::{
        EIGEN_EPS, PSI_A_WARN_TOL, safe_log_logistic, safe_logistic, safe_softplus,
    };
}
