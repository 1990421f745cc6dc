//! Sharp regression discontinuity with flexible covariate adjustment.
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1};

use crate::{
    data::DMLData,
    estimation::errors::{DMLError, DMLResult},
    nuisance::{NuisanceRole, RoleTarget, TrainFilter},
    scores::elements::{OrthogonalScore, ScoreElements, ScoreInput, reject_clusters},
};

/// RddScore — jump of the covariate-adjusted outcome at `cutoff`.
///
/// Purpose
/// -------
/// Remove the part of `Y` explained by covariates on either side of the
/// cutoff, then estimate the discontinuity of the adjusted outcome
/// `M = Y − (ĝ_left + ĝ_right)/2` with a triangular-kernel local polynomial
/// of order `p` in the running variable `s`.
///
/// Score
/// -----
/// With `l_i` the equivalent-kernel weight of the jump coefficient and
/// `e_i` the local-polynomial residual, the score is
/// `ψ_i = n·l_i·e_i + τ̂ − θ`, so `psi_a = −1`. Since `Σ l_i e_i = 0` the
/// full-sample root is the local-polynomial jump `τ̂`.
///
/// Invariants
/// ----------
/// - The treatment equals `1{s ≥ cutoff}` (sharp design); fuzzy designs
///   are rejected at validation.
/// - `order ≥ 1`; a supplied bandwidth is positive and finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RddScore {
    cutoff: f64,
    bandwidth: Option<f64>,
    order: usize,
}

impl RddScore {
    /// # Errors
    /// [`DMLError::InvalidParameter`] for a non-finite cutoff, a
    /// non-positive bandwidth or `order = 0`.
    pub fn new(cutoff: f64, bandwidth: Option<f64>, order: usize) -> DMLResult<Self> {
        if !cutoff.is_finite() {
            return Err(DMLError::InvalidParameter {
                name: "cutoff",
                value: cutoff,
                reason: format!("Cutoff has to be finite. Cutoff {cutoff} passed."),
            });
        }
        if let Some(h) = bandwidth {
            if !(h.is_finite() && h > 0.0) {
                return Err(DMLError::InvalidParameter {
                    name: "bandwidth",
                    value: h,
                    reason: format!("Bandwidth has to be positive and finite. Bandwidth {h} passed."),
                });
            }
        }
        if order == 0 {
            return Err(DMLError::InvalidParameter {
                name: "order",
                value: 0.0,
                reason: "Polynomial order has to be at least 1.".to_string(),
            });
        }
        Ok(Self { cutoff, bandwidth, order })
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Bandwidth used for `s`: the configured value or `1.06·sd(s)·n^{-1/5}`.
    pub fn bandwidth_for(&self, s: ArrayView1<f64>) -> f64 {
        self.bandwidth.unwrap_or_else(|| {
            let n = s.len().max(1) as f64;
            let sd = if s.len() > 1 { s.std(1.0) } else { 0.0 };
            1.06 * sd * n.powf(-0.2)
        })
    }

    /// Local-polynomial regressors `[1, T, u, T·u, …, u^p, T·u^p]`.
    fn regressors(&self, treated: f64, u: f64) -> DVector<f64> {
        let mut r = DVector::<f64>::zeros(2 + 2 * self.order);
        r[0] = 1.0;
        r[1] = treated;
        let mut pow = 1.0;
        for k in 1..=self.order {
            pow *= u;
            r[2 * k] = pow;
            r[2 * k + 1] = treated * pow;
        }
        r
    }
}

impl OrthogonalScore for RddScore {
    fn name(&self) -> &'static str {
        "RDD"
    }

    fn roles(&self) -> Vec<NuisanceRole> {
        vec![
            NuisanceRole::regression("ml_g_left", RoleTarget::Outcome)
                .filter(TrainFilter::ScoreBelowCutoff(self.cutoff)),
            NuisanceRole::regression("ml_g_right", RoleTarget::Outcome)
                .filter(TrainFilter::ScoreAtOrAboveCutoff(self.cutoff)),
        ]
    }

    fn validate(&self, data: &DMLData) -> DMLResult<()> {
        reject_clusters(data)?;
        let s = data.score_var().ok_or_else(|| DMLError::InvalidData {
            reason: "Incompatible data. A regression discontinuity design needs a score variable s."
                .to_string(),
        })?;
        let h = self.bandwidth_for(s);
        if !(h.is_finite() && h > 0.0) {
            return Err(DMLError::InvalidParameter {
                name: "bandwidth",
                value: h,
                reason: format!("Default bandwidth {h} is not positive; the score variable is constant."),
            });
        }
        for j in 0..data.n_treat() {
            let d = data.treatment(j)?;
            let sharp = d.iter().zip(s.iter()).all(|(&dv, &sv)| dv == f64::from(u8::from(sv >= self.cutoff)));
            if !sharp {
                return Err(DMLError::unimplemented(
                    "Estimation of fuzzy RDD not implemented; the treatment must equal 1{s >= cutoff}.",
                ));
            }
        }
        Ok(())
    }

    fn elements(&self, input: &ScoreInput, _theta: f64) -> DMLResult<ScoreElements> {
        let n = input.n_obs();
        let s = input.score_var()?;
        let g_left = input.pred("ml_g_left")?;
        let g_right = input.pred("ml_g_right")?;
        let adjusted = &input.y - &((&g_left + &g_right) * 0.5);
        let h = self.bandwidth_for(s);

        let dim = 2 + 2 * self.order;
        let mut gram = DMatrix::<f64>::zeros(dim, dim);
        let mut cross = DVector::<f64>::zeros(dim);
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            let u = s[i] - self.cutoff;
            let w = (1.0 - u.abs() / h).max(0.0);
            let r = self.regressors(input.d[i], u);
            if w > 0.0 {
                gram += &r * r.transpose() * w;
                cross += &r * (w * adjusted[i]);
            }
            rows.push((w, r));
        }
        let gram_det = gram.determinant();
        let gram_inv = gram.try_inverse().ok_or(DMLError::SingularSystem {
            system: "local-polynomial Gram matrix",
            value: gram_det,
        })?;
        let beta = &gram_inv * cross;

        let mut psi_b = Array1::<f64>::zeros(n);
        let mut tau = 0.0;
        let mut leverage = Array1::<f64>::zeros(n);
        for (i, (w, r)) in rows.iter().enumerate() {
            if *w > 0.0 {
                leverage[i] = w * (&gram_inv * r)[1];
                tau += leverage[i] * adjusted[i];
            }
        }
        for (i, (_, r)) in rows.iter().enumerate() {
            let resid = adjusted[i] - r.dot(&beta);
            psi_b[i] = n as f64 * leverage[i] * resid + tau;
        }
        Ok(ScoreElements { psi_a: Array1::from_elem(n, -1.0), psi_b })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nuisance::NuisancePredictions;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Parameter checks, the sharp-design requirement and recovery of an
    // exact jump.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A noiseless piecewise-linear outcome has its jump recovered exactly.
    //
    // Given
    // -----
    // - y = 1 + 2·T + 0.5·s with T = 1{s ≥ 0}; zero covariate nuisances;
    //   bandwidth 2, order 1.
    //
    // Expect
    // ------
    // - psi_a ≡ −1 and every psi_b equals the jump 2.
    fn exact_jump_is_recovered() {
        let s = array![-0.9, -0.5, -0.2, 0.1, 0.4, 0.8];
        let d = s.mapv(|v: f64| if v >= 0.0 { 1.0 } else { 0.0 });
        let y = &d * 2.0 + &s * 0.5 + 1.0;
        let preds = NuisancePredictions::from_arrays(vec![
            ("ml_g_left", Array1::zeros(6)),
            ("ml_g_right", Array1::zeros(6)),
        ]);
        let input = ScoreInput { y: y.view(), d: d.view(), z: None, s: Some(s.view()), preds: &preds };
        let score = RddScore::new(0.0, Some(2.0), 1).expect("valid");
        let el = score.elements(&input, 0.0).expect("elements");
        for i in 0..6 {
            assert_abs_diff_eq!(el.psi_a[i], -1.0);
            assert_abs_diff_eq!(el.psi_b[i], 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // Fuzzy designs and missing running variables are rejected.
    //
    // Given
    // -----
    // - A dataset without `s`, then with `s` but one treated row below the
    //   cutoff.
    //
    // Expect
    // ------
    // - InvalidData, then Unimplemented.
    fn validation_requires_sharp_design() {
        let data = DMLData::from_arrays(
            array![1.0, 2.0, 3.0, 4.0],
            array![[1.0], [0.0], [1.0], [1.0]],
            Array2::zeros((4, 1)),
        )
        .expect("valid data");
        let score = RddScore::new(0.0, None, 1).expect("valid");
        assert!(matches!(score.validate(&data), Err(DMLError::InvalidData { .. })));

        let fuzzy = data.with_score_variable(array![-1.0, -0.5, 0.5, 1.0]).expect("valid s");
        assert!(matches!(score.validate(&fuzzy), Err(DMLError::Unimplemented(_))));
        assert!(RddScore::new(0.0, Some(-1.0), 1).is_err());
        assert!(RddScore::new(0.0, None, 0).is_err());
    }

    #[test]
    // Purpose
    // -------
    // A bandwidth that leaves no observation with positive weight cannot
    // form the local-polynomial fit.
    //
    // Given
    // -----
    // - Running variable values at least 0.5 from the cutoff, bandwidth
    //   0.1.
    //
    // Expect
    // ------
    // - `SingularSystem` naming the Gram matrix.
    fn empty_kernel_window_is_singular() {
        let s = array![-0.9, -0.5, 0.5, 0.9];
        let d = s.mapv(|v: f64| if v >= 0.0 { 1.0 } else { 0.0 });
        let y = d.clone();
        let preds = NuisancePredictions::from_arrays(vec![
            ("ml_g_left", Array1::zeros(4)),
            ("ml_g_right", Array1::zeros(4)),
        ]);
        let input = ScoreInput { y: y.view(), d: d.view(), z: None, s: Some(s.view()), preds: &preds };
        let score = RddScore::new(0.0, Some(0.1), 1).expect("valid");

        let err = score.elements(&input, 0.0).expect_err("no weight in the window");

        assert!(matches!(err, DMLError::SingularSystem { system, .. } if system.contains("Gram")), "{err}");
    }
}
