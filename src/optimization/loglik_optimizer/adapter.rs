//! Adapter exposing a [`LogLikelihood`] as an argmin minimization problem.
//!
//! The cost is `c(θ) = -ℓ(θ)`. Analytic gradients are negated; when none is
//! provided, the **cost** is finite-differenced directly so no sign flip is
//! needed on that branch.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    loglik_optimizer::{
        traits::LogLikelihood,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// Bridges a model objective to argmin's `CostFunction` and `Gradient`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogLikelihood> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogLikelihood> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

impl<'a, F: LogLikelihood> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate `c(θ) = -ℓ(θ)`, rejecting non-finite objective values.
    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let output = self.f.value(theta, self.data)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        Ok(-output)
    }
}

impl<'a, F: LogLikelihood> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Gradient of the cost at `θ`.
    ///
    /// Uses `-∇ℓ(θ)` when the model implements `grad`. Otherwise central
    /// differences of the cost are tried first; if a cost evaluation failed
    /// or the result is not finite, forward differences are used once.
    /// The finite-difference closure cannot return `Result`, so the first
    /// error is parked in `closure_err` and `NaN` is returned in its place.
    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = theta.len();
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |theta: &Theta| -> f64 {
                    match self.cost(theta) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let fd_grad = theta.central_diff(&cost_func);
                if closure_err.borrow().is_none() && validate_grad(&fd_grad, dim).is_ok() {
                    return Ok(fd_grad);
                }
                forward_diff_checked(theta, &cost_func, &closure_err)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Forward-difference gradient with error capture.
///
/// # Errors
/// Returns the first error captured by `func` during differencing, or a
/// validation error if the gradient is not finite.
fn forward_diff_checked<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> Result<Grad, Error> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Sign conventions of the adapter and the finite-difference fallback.
    // -------------------------------------------------------------------------

    struct Quadratic;

    impl LogLikelihood for Quadratic {
        type Data = ();

        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            Ok(-(theta[0] - 1.0).powi(2) - 2.0 * (theta[1] + 0.5).powi(2))
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // The cost is the negated objective and the FD gradient is the cost
    // gradient.
    //
    // Given
    // -----
    // - A concave quadratic without an analytic gradient.
    //
    // Expect
    // ------
    // - `cost(θ) = -ℓ(θ)`.
    // - The FD gradient at the origin equals `(-2, 2)` up to FD error.
    fn adapter_negates_objective_and_differentiates_cost() {
        let model = Quadratic;
        let adapter = ArgMinAdapter::new(&model, &());
        let theta = array![0.0, 0.0];

        let cost = adapter.cost(&theta).expect("cost should evaluate");
        let grad = adapter.gradient(&theta).expect("FD gradient should evaluate");

        assert_relative_eq!(cost, 1.0 + 0.5, epsilon = 1e-12);
        assert_relative_eq!(grad[0], -2.0, epsilon = 1e-5);
        assert_relative_eq!(grad[1], 2.0, epsilon = 1e-5);
    }
}
