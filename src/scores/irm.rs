//! Interactive regression model for binary treatments: ATE and ATTE.
use ndarray::Array1;

use crate::{
    data::DMLData,
    estimation::errors::{DMLError, DMLResult},
    nuisance::{NuisanceRole, RoleTarget, TrainFilter},
    scores::elements::{
        OrthogonalScore, ScoreElements, ScoreInput, ipw, reject_clusters,
        require_binary_treatments,
    },
};

/// Target effect of the IRM score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrmKind {
    /// Average treatment effect.
    #[default]
    Ate,
    /// Average treatment effect on the treated.
    Atte,
}

/// IRM score.
///
/// Roles: `ml_g0` / `ml_g1` (Y on X among controls / treated; `ml_g1` only
/// for ATE) and `ml_m` (propensity, trimmed).
///
/// - ATE: `psi_a = −1`,
///   `psi_b = g1 − g0 + D(Y − g1)/m − (1 − D)(Y − g0)/(1 − m)`.
/// - ATTE: `psi_a = −D/p̄`,
///   `psi_b = [D(Y − g0) − m(1 − D)(Y − g0)/(1 − m)]/p̄`, with `p̄` the
///   treated share.
///
/// With `normalize_ipw`, the inverse-probability weights of each arm are
/// rescaled to mean one (ATE) or the control weights to mean `p̄` (ATTE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IrmScore {
    pub kind: IrmKind,
    pub normalize_ipw: bool,
}

impl IrmScore {
    pub fn new(kind: IrmKind, normalize_ipw: bool) -> Self {
        Self { kind, normalize_ipw }
    }
}

impl OrthogonalScore for IrmScore {
    fn name(&self) -> &'static str {
        "IRM"
    }

    fn roles(&self) -> Vec<NuisanceRole> {
        let mut roles = vec![
            NuisanceRole::regression("ml_g0", RoleTarget::Outcome)
                .learner("ml_g")
                .filter(TrainFilter::TreatmentEquals(0.0)),
        ];
        if self.kind == IrmKind::Ate {
            roles.push(
                NuisanceRole::regression("ml_g1", RoleTarget::Outcome)
                    .learner("ml_g")
                    .filter(TrainFilter::TreatmentEquals(1.0)),
            );
        }
        roles.push(NuisanceRole::propensity("ml_m", RoleTarget::Treatment));
        roles
    }

    fn validate(&self, data: &DMLData) -> DMLResult<()> {
        reject_clusters(data)?;
        require_binary_treatments(data, "IRM")
    }

    fn elements(&self, input: &ScoreInput, _theta: f64) -> DMLResult<ScoreElements> {
        let n = input.n_obs();
        let y = input.y;
        let d = input.d;
        let g0 = input.pred("ml_g0")?;
        let m = input.pred("ml_m")?.to_owned();
        let control = d.mapv(|v| 1.0 - v);
        let y_res0 = &y - &g0;
        match self.kind {
            IrmKind::Ate => {
                let g1 = input.pred("ml_g1")?;
                let h1 = ipw(d, &m, self.normalize_ipw);
                let h0 = ipw(control.view(), &m.mapv(|p| 1.0 - p), self.normalize_ipw);
                let psi_b = &g1 - &g0 + &(&h1 * &(&y - &g1)) - &(&h0 * &y_res0);
                Ok(ScoreElements { psi_a: Array1::from_elem(n, -1.0), psi_b })
            }
            IrmKind::Atte => {
                let p_bar = d.mean().unwrap_or(0.0);
                if p_bar <= 0.0 {
                    return Err(DMLError::InvalidData {
                        reason: "ATTE requires at least one treated observation".to_string(),
                    });
                }
                let mut w0 = &m * &control / &m.mapv(|p| 1.0 - p);
                if self.normalize_ipw {
                    let mean = w0.mean().unwrap_or(0.0);
                    if mean > 0.0 {
                        w0 *= p_bar / mean;
                    }
                }
                let psi_b = (&d * &y_res0 - &w0 * &y_res0) / p_bar;
                Ok(ScoreElements { psi_a: d.mapv(|v| -v / p_bar), psi_b })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nuisance::NuisancePredictions;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // ATE and ATTE elements on hand-computable inputs.
    // -------------------------------------------------------------------------

    fn fixture() -> (Array1<f64>, Array1<f64>, NuisancePredictions) {
        let y = array![3.0, 1.0, 2.0, 0.0];
        let d = array![1.0, 0.0, 1.0, 0.0];
        let preds = NuisancePredictions::from_arrays(vec![
            ("ml_g0", array![1.0, 1.0, 1.0, 1.0]),
            ("ml_g1", array![2.0, 2.0, 2.0, 2.0]),
            ("ml_m", array![0.5, 0.5, 0.5, 0.5]),
        ]);
        (y, d, preds)
    }

    #[test]
    // Purpose
    // -------
    // ATE elements reproduce the doubly robust formula.
    //
    // Given
    // -----
    // - g0 = 1, g1 = 2, m = 0.5; y = [3, 1, 2, 0], d = [1, 0, 1, 0].
    //
    // Expect
    // ------
    // - psi_b = [3, 1, 1, 3]; θ = mean(psi_b) = 2.
    fn ate_elements_match_formula() {
        let (y, d, preds) = fixture();
        let input = ScoreInput { y: y.view(), d: d.view(), z: None, s: None, preds: &preds };
        let el = IrmScore::default().elements(&input, 0.0).expect("elements");
        assert_eq!(el.psi_b, array![3.0, 1.0, 1.0, 3.0]);
        let (theta, j) = el.solve_linear(None);
        assert_abs_diff_eq!(theta, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(j, -1.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // ATTE weights by the treated share.
    //
    // Given
    // -----
    // - Same inputs; p̄ = 0.5.
    //
    // Expect
    // ------
    // - psi_a = [−2, 0, −2, 0]; psi_b = [4, 0, 2, 2]; θ = 2.
    fn atte_elements_scale_by_treated_share() {
        let (y, d, preds) = fixture();
        let input = ScoreInput { y: y.view(), d: d.view(), z: None, s: None, preds: &preds };
        let el = IrmScore::new(IrmKind::Atte, false).elements(&input, 0.0).expect("elements");
        assert_eq!(el.psi_a, array![-2.0, 0.0, -2.0, 0.0]);
        assert_eq!(el.psi_b, array![4.0, 0.0, 2.0, 2.0]);
        assert_abs_diff_eq!(el.solve_linear(None).0, 2.0, epsilon = 1e-12);
    }
}
