//! Partially linear regression: `Y = θ·D + g(X) + ε`, `D = m(X) + v`.
use ndarray::Array1;

use crate::{
    data::DMLData,
    estimation::errors::{DMLError, DMLResult},
    nuisance::{NuisanceRole, RoleStage, RoleTarget},
    scores::elements::{OrthogonalScore, ScoreElements, ScoreInput},
};

/// Which orthogonal moment identifies `θ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlrKind {
    /// `ψ = (Y − l(X) − θ(D − m(X)))(D − m(X))` with `l = E[Y|X]`.
    #[default]
    PartiallingOut,
    /// `ψ = (Y − θD − g(X))(D − m(X))` with `g = E[Y − θD | X]`, where `g`
    /// is fitted on `Y − θ₀D` at the partialling-out estimate `θ₀`.
    IvType,
}

/// PLR score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlrScore {
    pub kind: PlrKind,
}

impl PlrScore {
    pub fn new(kind: PlrKind) -> Self {
        Self { kind }
    }

    fn residuals(input: &ScoreInput) -> DMLResult<(Array1<f64>, Array1<f64>)> {
        let u = &input.y - &input.pred("ml_l")?;
        let v = &input.d - &input.pred("ml_m")?;
        Ok((u, v))
    }
}

impl OrthogonalScore for PlrScore {
    fn name(&self) -> &'static str {
        "PLR"
    }

    fn roles(&self) -> Vec<NuisanceRole> {
        let mut roles = vec![
            NuisanceRole::regression("ml_l", RoleTarget::Outcome),
            NuisanceRole::regression("ml_m", RoleTarget::Treatment),
        ];
        if self.kind == PlrKind::IvType {
            roles.push(
                NuisanceRole::regression("ml_g", RoleTarget::OutcomeNetOfPreliminaryEffect)
                    .stage(RoleStage::Dependent)
                    .depends_on("ml_l"),
            );
        }
        roles
    }

    fn validate(&self, _data: &DMLData) -> DMLResult<()> {
        Ok(())
    }

    fn supports_clustering(&self) -> bool {
        true
    }

    fn elements(&self, input: &ScoreInput, _theta: f64) -> DMLResult<ScoreElements> {
        let (u, v) = Self::residuals(input)?;
        match self.kind {
            PlrKind::PartiallingOut => Ok(ScoreElements { psi_a: -(&v * &v), psi_b: &v * &u }),
            PlrKind::IvType => {
                let g = input.pred("ml_g")?;
                Ok(ScoreElements { psi_a: -(&v * &input.d), psi_b: &v * &(&input.y - &g) })
            }
        }
    }

    /// Full-sample partialling-out estimate `Σ v·u / Σ v²`.
    fn preliminary_effect(&self, input: &ScoreInput) -> DMLResult<f64> {
        let (u, v) = Self::residuals(input)?;
        let denom = v.dot(&v);
        if denom == 0.0 || !denom.is_finite() {
            return Err(DMLError::SingularSystem {
                system: "preliminary partialling-out denominator Σv²",
                value: denom,
            });
        }
        Ok(v.dot(&u) / denom)
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
    // Score elements for both moments and the preliminary effect.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Partialling-out elements and IV-type elements match their formulas.
    //
    // Given
    // -----
    // - y = [1, 2, 4], d = [0, 1, 2], l = [1, 2, 3], m = [0.5, 1, 1.5],
    //   g = [1, 1, 1].
    //
    // Expect
    // ------
    // - PO: psi_a = −v², psi_b = v·u; IV: psi_a = −v·d, psi_b = v·(y − g);
    //   preliminary effect Σvu/Σv² = 0.5/0.5 = 1.
    fn elements_follow_plr_moments() {
        let y = array![1.0, 2.0, 4.0];
        let d = array![0.0, 1.0, 2.0];
        let preds = NuisancePredictions::from_arrays(vec![
            ("ml_l", array![1.0, 2.0, 3.0]),
            ("ml_m", array![0.5, 1.0, 1.5]),
            ("ml_g", array![1.0, 1.0, 1.0]),
        ]);
        let input = ScoreInput { y: y.view(), d: d.view(), z: None, s: None, preds: &preds };

        let po = PlrScore::new(PlrKind::PartiallingOut).elements(&input, 0.0).expect("elements");
        assert_eq!(po.psi_a, array![-0.25, 0.0, -0.25]);
        assert_eq!(po.psi_b, array![0.0, 0.0, 0.5]);

        let iv = PlrScore::new(PlrKind::IvType).elements(&input, 0.0).expect("elements");
        assert_eq!(iv.psi_a, array![0.0, 0.0, -1.0]);
        assert_eq!(iv.psi_b, array![0.0, 0.0, 1.5]);

        let theta0 = PlrScore::default().preliminary_effect(&input).expect("effect");
        assert_abs_diff_eq!(theta0, 1.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The IV-type moment adds a dependent-stage outcome role.
    //
    // Given
    // -----
    // - Both PLR kinds.
    //
    // Expect
    // ------
    // - Two roles for partialling-out; three for IV-type with `ml_g`
    //   depending on `ml_l`.
    fn iv_type_declares_dependent_role() {
        assert_eq!(PlrScore::default().roles().len(), 2);
        let roles = PlrScore::new(PlrKind::IvType).roles();
        let g = roles.iter().find(|r| r.name == "ml_g").expect("ml_g role");
        assert_eq!(g.stage, RoleStage::Dependent);
        assert_eq!(g.depends_on, Some("ml_l"));
    }

    #[test]
    // Purpose
    // -------
    // A treatment explained exactly by its nuisance leaves nothing to
    // partial out.
    //
    // Given
    // -----
    // - d = m, so every residual v is zero.
    //
    // Expect
    // ------
    // - `SingularSystem` carrying Σv² = 0.
    fn preliminary_effect_rejects_zero_residual_variance() {
        let y = array![1.0, 2.0, 4.0];
        let d = array![0.0, 1.0, 2.0];
        let preds = NuisancePredictions::from_arrays(vec![
            ("ml_l", array![1.0, 2.0, 3.0]),
            ("ml_m", array![0.0, 1.0, 2.0]),
        ]);
        let input = ScoreInput { y: y.view(), d: d.view(), z: None, s: None, preds: &preds };

        let err = PlrScore::default().preliminary_effect(&input).expect_err("zero denominator");

        assert!(matches!(err, DMLError::SingularSystem { value, .. } if value == 0.0), "{err}");
    }
}
