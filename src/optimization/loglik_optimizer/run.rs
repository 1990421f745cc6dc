//! Solver construction and execution for likelihood maximization.
//!
//! [`maximize`] validates the starting point, builds an L-BFGS solver with
//! the configured line search, runs it through argmin's `Executor`, and
//! normalizes the final state into an [`OptimOutcome`].
use argmin::core::{Executor, IterState, Solver, State};
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        adapter::ArgMinAdapter,
        traits::{LineSearcher, LogLikelihood, MLEOptions, OptimOutcome},
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Theta,
        },
    },
};

/// maximize — maximize `ℓ(θ)` with L-BFGS.
///
/// Parameters
/// ----------
/// - `f`: objective implementing [`LogLikelihood`].
/// - `theta0`: starting point, consumed by the executor.
/// - `data`: payload passed to `value`/`grad`.
/// - `opts`: tolerances, line search and memory.
///
/// Returns
/// -------
/// `OptResult<OptimOutcome>` with the best parameters and `ℓ(θ̂)`.
///
/// Errors
/// ------
/// - Propagates `f.check`.
/// - Argmin configuration or runtime failures (line search breakdown,
///   non-finite cost) mapped into `OptError`.
pub fn maximize<F: LogLikelihood>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MLEOptions,
) -> OptResult<OptimOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

/// L-BFGS with Hager-Zhang line search and the configured tolerances.
pub fn build_optimizer_hager_zhang(opts: &MLEOptions) -> OptResult<LbfgsHagerZhang> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsHagerZhang::new(HagerZhangLS::new(), mem), opts)
}

/// L-BFGS with More-Thuente line search and the configured tolerances.
pub fn build_optimizer_more_thuente(opts: &MLEOptions) -> OptResult<LbfgsMoreThuente> {
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    configure_lbfgs(LbfgsMoreThuente::new(MoreThuenteLS::new(), mem), opts)
}

/// Apply optional gradient and cost-change tolerances. `None` keeps
/// argmin's defaults.
fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &MLEOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

/// Run a configured solver and convert its final state.
///
/// The best parameter is taken from argmin's best-cost bookkeeping, and
/// the reported value is `ℓ = -c` at that point.
fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MLEOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, IterState<Theta, Grad, (), (), (), Cost>>,
{
    let mut optimizer = Executor::new(problem, solver).configure(|state| state.param(theta0));
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )
}
