//! Numerically guarded scalar transforms and shared tolerances.
//!
//! # Provided items
//! - [`EIGEN_EPS`]: relative cutoff below which eigenvalues of a Gram
//!   matrix are treated as zero by the pseudo-inverse solvers.
//! - [`PSI_A_WARN_TOL`]: magnitude of `mean(psi_a)` under which the
//!   estimation engine warns about weak identification.
//! - [`safe_softplus(x)`]: stable `ln(1 + exp(x))`.
//! - [`safe_logistic(x)`]: stable `1 / (1 + exp(-x))`.
//! - [`safe_log_logistic(x)`]: stable `ln σ(x)`.

/// Relative eigenvalue cutoff for pseudo-inverses.
///
/// An eigenvalue `λ_k` is kept only when `λ_k > EIGEN_EPS · λ_max`.
pub const EIGEN_EPS: f64 = 1e-10;

/// Warning threshold for the Jacobian of a moment condition.
pub const PSI_A_WARN_TOL: f64 = 1e-8;

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// For `x > 20` the correction `ln1p(exp(-x))` is below `f64` resolution
/// relative to `x`, so `x` itself is returned.
///
/// # Parameters
/// - `x`: real input
///
/// # Returns
/// - `softplus(x)` as `f64`, never `+∞` for finite `x`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Numerically stable logistic function `σ(x) = 1 / (1 + exp(-x))`.
///
/// Evaluates `exp` only on non-positive arguments so neither branch can
/// overflow.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Stable `ln σ(x) = -softplus(-x)`.
pub fn safe_log_logistic(x: f64) -> f64 {
    -safe_softplus(-x)
}
