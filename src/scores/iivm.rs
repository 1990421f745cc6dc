//! Interactive IV model: local average treatment effect with a binary
//! instrument.
use ndarray::Array1;

use crate::{
    data::DMLData,
    estimation::errors::DMLResult,
    nuisance::{NuisanceRole, RoleTarget, TrainFilter},
    scores::elements::{
        OrthogonalScore, ScoreElements, ScoreInput, ipw, reject_clusters,
        require_binary_treatments, require_single_instrument,
    },
};

/// Which non-complier groups may exist.
///
/// Excluding always-takers fixes `r0 = P(D=1|Z=0,X) = 0`; excluding
/// never-takers fixes `r1 = 1`. The corresponding learner is not fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subgroups {
    pub always_takers: bool,
    pub never_takers: bool,
}

impl Default for Subgroups {
    fn default() -> Self {
        Self { always_takers: true, never_takers: true }
    }
}

/// IIVM (LATE) score.
///
/// `psi_b = g1 − g0 + Z(Y − g1)/m − (1 − Z)(Y − g0)/(1 − m)` and
/// `psi_a = −[r1 − r0 + Z(D − r1)/m − (1 − Z)(D − r0)/(1 − m)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IivmScore {
    pub subgroups: Subgroups,
    pub normalize_ipw: bool,
}

impl OrthogonalScore for IivmScore {
    fn name(&self) -> &'static str {
        "IIVM"
    }

    fn roles(&self) -> Vec<NuisanceRole> {
        let mut roles = vec![
            NuisanceRole::regression("ml_g0", RoleTarget::Outcome)
                .learner("ml_g")
                .filter(TrainFilter::InstrumentEquals(0.0)),
            NuisanceRole::regression("ml_g1", RoleTarget::Outcome)
                .learner("ml_g")
                .filter(TrainFilter::InstrumentEquals(1.0)),
            NuisanceRole::propensity("ml_m", RoleTarget::Instrument),
        ];
        if self.subgroups.always_takers {
            roles.push(
                NuisanceRole::regression("ml_r0", RoleTarget::Treatment)
                    .learner("ml_r")
                    .classification()
                    .filter(TrainFilter::InstrumentEquals(0.0)),
            );
        }
        if self.subgroups.never_takers {
            roles.push(
                NuisanceRole::regression("ml_r1", RoleTarget::Treatment)
                    .learner("ml_r")
                    .classification()
                    .filter(TrainFilter::InstrumentEquals(1.0)),
            );
        }
        roles
    }

    fn validate(&self, data: &DMLData) -> DMLResult<()> {
        reject_clusters(data)?;
        require_binary_treatments(data, "IIVM")?;
        require_single_instrument(data, "IIVM", true)
    }

    fn elements(&self, input: &ScoreInput, _theta: f64) -> DMLResult<ScoreElements> {
        let n = input.n_obs();
        let y = input.y;
        let d = input.d;
        let z = input.instrument()?;
        let g0 = input.pred("ml_g0")?;
        let g1 = input.pred("ml_g1")?;
        let m = input.pred("ml_m")?.to_owned();
        let r0 = match self.subgroups.always_takers {
            true => input.pred("ml_r0")?.to_owned(),
            false => Array1::zeros(n),
        };
        let r1 = match self.subgroups.never_takers {
            true => input.pred("ml_r1")?.to_owned(),
            false => Array1::ones(n),
        };

        let h1 = ipw(z, &m, self.normalize_ipw);
        let h0 = ipw(z.mapv(|v| 1.0 - v).view(), &m.mapv(|p| 1.0 - p), self.normalize_ipw);
        let psi_b = &g1 - &g0 + &(&h1 * &(&y - &g1)) - &(&h0 * &(&y - &g0));
        let psi_a = -(&r1 - &r0 + &(&h1 * &(&d - &r1)) - &(&h0 * &(&d - &r0)));
        Ok(ScoreElements { psi_a, psi_b })
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
    // Role sets under subgroup restrictions and the Wald-type moment.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Excluding both non-complier groups drops both treatment learners and
    // pins r0 = 0, r1 = 1.
    //
    // Given
    // -----
    // - One-sided compliance: D = Z, constant g and m = 0.5.
    //
    // Expect
    // ------
    // - Three roles; psi_a ≡ −1 and θ = 2, the outcome gap between Z arms.
    fn subgroup_exclusion_pins_first_stage() {
        let score = IivmScore {
            subgroups: Subgroups { always_takers: false, never_takers: false },
            normalize_ipw: false,
        };
        assert_eq!(score.roles().len(), 3);

        let y = array![2.0, 0.0, 3.0, 1.0];
        let z = array![1.0, 0.0, 1.0, 0.0];
        let preds = NuisancePredictions::from_arrays(vec![
            ("ml_g0", array![0.5, 0.5, 0.5, 0.5]),
            ("ml_g1", array![2.5, 2.5, 2.5, 2.5]),
            ("ml_m", array![0.5, 0.5, 0.5, 0.5]),
        ]);
        let input = ScoreInput { y: y.view(), d: z.view(), z: Some(z.view()), s: None, preds: &preds };
        let el = score.elements(&input, 0.0).expect("elements");
        for &a in el.psi_a.iter() {
            assert_abs_diff_eq!(a, -1.0, epsilon = 1e-12);
        }
        // mean(Y | Z=1) − mean(Y | Z=0) = 2.5 − 0.5.
        assert_abs_diff_eq!(el.solve_linear(None).0, 2.0, epsilon = 1e-12);
    }
}
