//! Partially linear IV regression with a single instrument.
use crate::{
    data::DMLData,
    estimation::errors::DMLResult,
    nuisance::{NuisanceRole, RoleTarget},
    scores::elements::{OrthogonalScore, ScoreElements, ScoreInput, require_single_instrument},
};

/// PLIV score, partialling-out form:
/// `ψ = (Y − l(X) − θ(D − r(X)))(Z − m(X))`.
///
/// Roles: `ml_l` (Y on X), `ml_m` (Z on X), `ml_r` (D on X).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlivScore;

impl OrthogonalScore for PlivScore {
    fn name(&self) -> &'static str {
        "PLIV"
    }

    fn roles(&self) -> Vec<NuisanceRole> {
        vec![
            NuisanceRole::regression("ml_l", RoleTarget::Outcome),
            NuisanceRole::regression("ml_m", RoleTarget::Instrument),
            NuisanceRole::regression("ml_r", RoleTarget::Treatment),
        ]
    }

    fn validate(&self, data: &DMLData) -> DMLResult<()> {
        require_single_instrument(data, "PLIV", false)
    }

    fn supports_clustering(&self) -> bool {
        true
    }

    fn elements(&self, input: &ScoreInput, _theta: f64) -> DMLResult<ScoreElements> {
        let u = &input.y - &input.pred("ml_l")?;
        let w = &input.d - &input.pred("ml_r")?;
        let v = &input.instrument()? - &input.pred("ml_m")?;
        Ok(ScoreElements { psi_a: -(&w * &v), psi_b: &u * &v })
    }
}
