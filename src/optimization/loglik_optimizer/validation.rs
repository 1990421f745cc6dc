//! Validation helpers shared by the optimizer configuration and outcome
//! types.
//!
//! - [`verify_tol_grad`], [`verify_tol_cost`]: tolerances must be finite and
//!   strictly positive when provided.
//! - [`validate_grad`]: dimension and finiteness of a gradient.
//! - [`validate_theta_hat`]: presence and finiteness of the estimate.
//! - [`validate_value`]: finiteness of the objective.
use crate::optimization::{
    errors::{OptError, OptResult},
    loglik_optimizer::types::{Grad, Theta},
};

/// Validate the optional gradient-norm tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolGrad`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate the optional cost-change tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolCost`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if `grad.len() != dim`.
/// - [`OptError::InvalidGradient`] for the first non-finite element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    match grad.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(OptError::InvalidGradient {
            index,
            value: grad[index],
            reason: "Gradient elements must be finite.",
        }),
        None => Ok(()),
    }
}

/// Validate and unwrap the solver's best parameter vector.
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if the solver produced none.
/// - [`OptError::InvalidThetaHat`] if any element is non-finite.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingThetaHat)?;
    if let Some(index) = theta.iter().position(|v| !v.is_finite()) {
        return Err(OptError::InvalidThetaHat {
            index,
            value: theta[index],
            reason: "Parameter estimates must be finite.",
        });
    }
    Ok(theta)
}

/// Validate that an objective value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Error paths of the tolerance and outcome validators.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Tolerances must be strictly positive and finite.
    //
    // Given
    // -----
    // - Zero, negative and NaN tolerances.
    //
    // Expect
    // ------
    // - Each is rejected; `None` and a positive value pass.
    fn tolerance_validators_reject_non_positive_and_nan() {
        assert!(verify_tol_grad(Some(0.0)).is_err());
        assert!(verify_tol_cost(Some(-1.0)).is_err());
        assert!(verify_tol_grad(Some(f64::NAN)).is_err());
        assert!(verify_tol_grad(None).is_ok());
        assert!(verify_tol_cost(Some(1e-8)).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // The first non-finite gradient entry is reported by index.
    //
    // Given
    // -----
    // - A gradient `[1, NaN, inf]`.
    //
    // Expect
    // ------
    // - `InvalidGradient` with `index == 1`.
    fn validate_grad_reports_first_non_finite_index() {
        let g = array![1.0, f64::NAN, f64::INFINITY];
        match validate_grad(&g, 3) {
            Err(OptError::InvalidGradient { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            validate_grad(&g, 2),
            Err(OptError::GradientDimMismatch { expected: 2, found: 3 })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A missing estimate is an error, not a silent zero vector.
    //
    // Given
    // -----
    // - `None` as the solver's best parameter.
    //
    // Expect
    // ------
    // - `MissingThetaHat`.
    fn validate_theta_hat_requires_presence() {
        assert_eq!(validate_theta_hat(None), Err(OptError::MissingThetaHat));
        assert!(validate_theta_hat(Some(array![0.5])).is_ok());
    }
}
