//! root_finding — bracketed scalar root finding for nonlinear moments.
//!
//! Purpose
//! -------
//! Solve `f(θ) = 0` for a scalar, possibly discontinuous, moment function
//! such as the empirical quantile score `mean(1{Y ≤ θ} ...) - τ`. The
//! solver is argmin's Brent method, which keeps a sign-changing bracket and
//! therefore terminates on step functions where Newton steps would stall.
//!
//! Key behaviors
//! -------------
//! - Verifies the bracket before iterating; equal signs at both ends are
//!   reported as [`OptError::RootNotBracketed`] instead of guessing.
//! - Exact zeros at an endpoint short-circuit the solver.
//! - Exhausting `max_iter` is [`OptError::RootNotConverged`], never a
//!   silently returned stale iterate.
//!
//! Conventions
//! -----------
//! - The moment closure is infallible and must return finite values on the
//!   bracket; a non-finite evaluation aborts with
//!   [`OptError::NonFiniteCost`].
//! - For a jump discontinuity the returned root lies within `tol` of the
//!   jump location; which side is returned is left to Brent's update rule.
use argmin::core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::brent::BrentRoot;

use crate::optimization::errors::{OptError, OptResult};

/// Stopping rules for [`find_root_bracketed`].
///
/// Fields
/// ------
/// - `tol`: absolute bracket tolerance handed to Brent.
/// - `max_iter`: iteration cap; reaching it is a convergence failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootOptions {
    pub tol: f64,
    pub max_iter: u64,
}

impl RootOptions {
    /// # Errors
    /// - [`OptError::InvalidTolCost`] for a non-finite or non-positive `tol`.
    /// - [`OptError::InvalidMaxIter`] for `max_iter == 0`.
    pub fn new(tol: f64, max_iter: u64) -> OptResult<Self> {
        if !tol.is_finite() || tol <= 0.0 {
            return Err(OptError::InvalidTolCost {
                tol,
                reason: "Root tolerance must be finite and positive.",
            });
        }
        if max_iter == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Root finding needs at least one iteration.",
            });
        }
        Ok(Self { tol, max_iter })
    }
}

impl Default for RootOptions {
    fn default() -> Self {
        Self { tol: 1e-8, max_iter: 100 }
    }
}

/// Located root and its diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootOutcome {
    pub root: f64,
    pub residual: f64,
    pub iterations: u64,
}

struct ScalarEquation<'a, F: Fn(f64) -> f64> {
    f: &'a F,
}

impl<'a, F: Fn(f64) -> f64> CostFunction for ScalarEquation<'a, F> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, theta: &f64) -> Result<f64, Error> {
        let value = (self.f)(*theta);
        if !value.is_finite() {
            return Err((OptError::NonFiniteCost { value }).into());
        }
        Ok(value)
    }
}

/// find_root_bracketed — solve `f(θ) = 0` on `[lower, upper]`.
///
/// Parameters
/// ----------
/// - `f`: moment function of the scalar target.
/// - `lower`, `upper`: finite bracket with `lower < upper`.
/// - `opts`: tolerance and iteration cap.
///
/// Returns
/// -------
/// `OptResult<RootOutcome>` with the root, `f(root)` and the iteration count.
///
/// Errors
/// ------
/// - [`OptError::InvalidBracket`] for a degenerate or non-finite bracket.
/// - [`OptError::RootNotBracketed`] when `f(lower)` and `f(upper)` share a
///   strict sign.
/// - [`OptError::RootNotConverged`] when Brent stops on the iteration cap.
/// - [`OptError::NonFiniteCost`] for non-finite evaluations.
pub fn find_root_bracketed<F: Fn(f64) -> f64>(
    f: &F, lower: f64, upper: f64, opts: &RootOptions,
) -> OptResult<RootOutcome> {
    if !lower.is_finite() || !upper.is_finite() || lower >= upper {
        return Err(OptError::InvalidBracket { lower, upper });
    }
    let f_lower = f(lower);
    let f_upper = f(upper);
    if !f_lower.is_finite() {
        return Err(OptError::NonFiniteCost { value: f_lower });
    }
    if !f_upper.is_finite() {
        return Err(OptError::NonFiniteCost { value: f_upper });
    }
    if f_lower == 0.0 {
        return Ok(RootOutcome { root: lower, residual: 0.0, iterations: 0 });
    }
    if f_upper == 0.0 {
        return Ok(RootOutcome { root: upper, residual: 0.0, iterations: 0 });
    }
    if f_lower.signum() == f_upper.signum() {
        return Err(OptError::RootNotBracketed { lower, upper, f_lower, f_upper });
    }

    let problem = ScalarEquation { f };
    let solver = BrentRoot::new(lower, upper, opts.tol);
    let result = Executor::new(problem, solver)
        .configure(|state| state.max_iters(opts.max_iter))
        .run()?;
    let state = result.state();
    let iterations = state.get_iter();
    let root = state.get_param().copied().ok_or(OptError::MissingThetaHat)?;
    let residual = f(root);

    match state.get_termination_status() {
        TerminationStatus::Terminated(
            TerminationReason::SolverConverged | TerminationReason::TargetCostReached,
        ) => Ok(RootOutcome { root, residual, iterations }),
        _ => Err(OptError::RootNotConverged { iterations, last: root, residual }),
    }
}
