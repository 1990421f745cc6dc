//! Normal-approximation tests and confidence intervals.
use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::inference::errors::{InferenceError, InferenceResult};

/// Reject levels outside the open unit interval.
pub(crate) fn validate_level(level: f64) -> InferenceResult<()> {
    if !(level > 0.0 && level < 1.0) {
        return Err(InferenceError::InvalidLevel { level });
    }
    Ok(())
}

pub(crate) fn standard_normal() -> InferenceResult<Normal> {
    Ok(Normal::new(0.0, 1.0).map_err(anyhow::Error::from)?)
}

/// NormalInference — t-statistics, p-values and pointwise intervals from
/// aggregated coefficients and standard errors.
///
/// Fields
/// ------
/// - `coef`: point estimates, one per treatment.
/// - `se`: standard errors aligned with `coef`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalInference {
    coef: Array1<f64>,
    se: Array1<f64>,
}

impl NormalInference {
    /// # Errors
    /// - [`InferenceError::EmptyInput`] for no coefficients.
    /// - [`InferenceError::ShapeMismatch`] when lengths differ.
    /// - [`InferenceError::InvalidStandardError`] for a negative or
    ///   non-finite standard error.
    pub fn new(coef: Array1<f64>, se: Array1<f64>) -> InferenceResult<Self> {
        if coef.is_empty() {
            return Err(InferenceError::EmptyInput { what: "coefficients" });
        }
        if se.len() != coef.len() {
            return Err(InferenceError::ShapeMismatch {
                what: "standard errors",
                expected: coef.len(),
                found: se.len(),
            });
        }
        if let Some((index, &s)) = se.iter().enumerate().find(|(_, s)| !(s.is_finite() && **s >= 0.0)) {
            return Err(InferenceError::InvalidStandardError { index, se: s });
        }
        Ok(Self { coef, se })
    }

    pub fn coef(&self) -> &Array1<f64> {
        &self.coef
    }

    pub fn se(&self) -> &Array1<f64> {
        &self.se
    }

    pub fn t_stat(&self) -> Array1<f64> {
        &self.coef / &self.se
    }

    /// Two-sided p-values `2(1 − Φ(|t|))`.
    pub fn p_value(&self) -> InferenceResult<Array1<f64>> {
        let normal = standard_normal()?;
        Ok(self.t_stat().mapv(|t| 2.0 * (1.0 - normal.cdf(t.abs()))))
    }

    /// Pointwise intervals `coef ± z_{1−α/2}·se`, shape `(n_treat, 2)`.
    pub fn confint(&self, level: f64) -> InferenceResult<Array2<f64>> {
        validate_level(level)?;
        let crit = standard_normal()?.inverse_cdf(1.0 - (1.0 - level) / 2.0);
        let mut out = Array2::<f64>::zeros((self.coef.len(), 2));
        for (j, (&c, &s)) in self.coef.iter().zip(self.se.iter()).enumerate() {
            out[[j, 0]] = c - crit * s;
            out[[j, 1]] = c + crit * s;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Textbook normal quantities and level validation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A 95% interval uses the 1.96 critical value.
    //
    // Given
    // -----
    // - coef = [1.96, 0], se = [1, 2].
    //
    // Expect
    // ------
    // - t = [1.96, 0]; p ≈ [0.05, 1]; interval [0, 3.92] for the first.
    fn normal_interval_matches_textbook() {
        let inf = NormalInference::new(array![1.96, 0.0], array![1.0, 2.0]).expect("valid");
        let p = inf.p_value().expect("p-values");
        assert_abs_diff_eq!(p[0], 0.05, epsilon = 1e-3);
        assert_abs_diff_eq!(p[1], 1.0, epsilon = 1e-12);
        let ci = inf.confint(0.95).expect("interval");
        assert_abs_diff_eq!(ci[[0, 0]], 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(ci[[0, 1]], 3.92, epsilon = 1e-3);
    }

    #[test]
    // Purpose
    // -------
    // Levels outside (0, 1) and mismatched inputs are rejected.
    //
    // Given
    // -----
    // - Level 1.0; se of the wrong length.
    //
    // Expect
    // ------
    // - `InvalidLevel`, `ShapeMismatch`.
    fn invalid_inputs_are_rejected() {
        let inf = NormalInference::new(array![1.0], array![1.0]).expect("valid");
        assert_eq!(inf.confint(1.0), Err(InferenceError::InvalidLevel { level: 1.0 }));
        assert!(matches!(
            NormalInference::new(array![1.0, 2.0], array![1.0]),
            Err(InferenceError::ShapeMismatch { .. })
        ));
    }
}
