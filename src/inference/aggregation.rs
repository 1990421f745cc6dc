//! Combining per-repetition estimates into final point estimates and
//! standard errors.
use ndarray::{Array1, ArrayView2};

use crate::inference::errors::{InferenceError, InferenceResult};

/// aggregate_repetitions — median aggregation across sample splits.
///
/// Parameters
/// ----------
/// - `thetas`: `(n_treat, n_rep)` per-repetition point estimates.
/// - `ses`: `(n_treat, n_rep)` per-repetition standard errors.
///
/// Returns
/// -------
/// `(θ, se)` per treatment with
/// `θ_j = median_r θ_jr` and
/// `se_j = sqrt(median_r (se_jr² + (θ_jr − θ_j)²))`.
///
/// The second term charges the dispersion across splits to the final
/// standard error. With a single repetition both reduce to the inputs.
///
/// Errors
/// ------
/// - [`InferenceError::EmptyInput`] when there are no treatments or no
///   repetitions.
/// - [`InferenceError::ShapeMismatch`] when the two arrays differ in shape.
/// - [`InferenceError::InvalidStandardError`] for a negative or non-finite
///   standard error.
pub fn aggregate_repetitions(
    thetas: ArrayView2<f64>, ses: ArrayView2<f64>,
) -> InferenceResult<(Array1<f64>, Array1<f64>)> {
    let (n_treat, n_rep) = thetas.dim();
    if n_treat == 0 {
        return Err(InferenceError::EmptyInput { what: "treatments" });
    }
    if n_rep == 0 {
        return Err(InferenceError::EmptyInput { what: "repetitions" });
    }
    if ses.nrows() != n_treat {
        return Err(InferenceError::ShapeMismatch {
            what: "standard errors (treatments)",
            expected: n_treat,
            found: ses.nrows(),
        });
    }
    if ses.ncols() != n_rep {
        return Err(InferenceError::ShapeMismatch {
            what: "standard errors (repetitions)",
            expected: n_rep,
            found: ses.ncols(),
        });
    }
    if let Some((index, &se)) = ses.iter().enumerate().find(|(_, se)| !(se.is_finite() && **se >= 0.0)) {
        return Err(InferenceError::InvalidStandardError { index, se });
    }

    let mut coef = Array1::<f64>::zeros(n_treat);
    let mut se = Array1::<f64>::zeros(n_treat);
    for j in 0..n_treat {
        let theta_j = median(thetas.row(j).to_vec());
        let spread: Vec<f64> = thetas
            .row(j)
            .iter()
            .zip(ses.row(j).iter())
            .map(|(&t, &s)| s * s + (t - theta_j).powi(2))
            .collect();
        coef[j] = theta_j;
        se[j] = median(spread).sqrt();
    }
    Ok((coef, se))
}

/// Median with averaging of the two central values for even lengths.
pub(crate) fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    quantile_sorted(&values, 0.5)
}

/// Empirical quantile of ascending `sorted` with linear interpolation
/// between order statistics (position `(n − 1)·p`).
///
/// Returns NaN for an empty slice.
pub(crate) fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}
