//! Closed set of score models the engine dispatches over.
use crate::{
    data::DMLData,
    estimation::errors::DMLResult,
    nuisance::NuisanceRole,
    scores::{
        elements::{OrthogonalScore, PrelimInput, ScoreElements, ScoreInput},
        iivm::IivmScore,
        irm::IrmScore,
        pliv::PlivScore,
        plr::PlrScore,
        quantile::{LpqScore, PqScore},
        rdd::RddScore,
    },
};

/// ScoreModel — the model/score variant an estimator is built for.
///
/// Every variant implements [`OrthogonalScore`]; the enum forwards each
/// call to the inner score so the engine never needs a trait object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreModel {
    Plr(PlrScore),
    Pliv(PlivScore),
    Irm(IrmScore),
    Iivm(IivmScore),
    Pq(PqScore),
    Lpq(LpqScore),
    Rdd(RddScore),
}

impl ScoreModel {
    fn inner(&self) -> &dyn OrthogonalScore {
        match self {
            ScoreModel::Plr(s) => s,
            ScoreModel::Pliv(s) => s,
            ScoreModel::Irm(s) => s,
            ScoreModel::Iivm(s) => s,
            ScoreModel::Pq(s) => s,
            ScoreModel::Lpq(s) => s,
            ScoreModel::Rdd(s) => s,
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner().name()
    }

    pub fn roles(&self) -> Vec<NuisanceRole> {
        self.inner().roles()
    }

    pub fn is_linear(&self) -> bool {
        self.inner().is_linear()
    }

    pub fn supports_clustering(&self) -> bool {
        self.inner().supports_clustering()
    }

    pub fn validate(&self, data: &DMLData) -> DMLResult<()> {
        self.inner().validate(data)
    }

    pub fn elements(&self, input: &ScoreInput, theta: f64) -> DMLResult<ScoreElements> {
        self.inner().elements(input, theta)
    }

    pub fn preliminary_threshold(&self, input: &PrelimInput) -> DMLResult<f64> {
        self.inner().preliminary_threshold(input)
    }

    pub fn preliminary_effect(&self, input: &ScoreInput) -> DMLResult<f64> {
        self.inner().preliminary_effect(input)
    }

    pub fn refit_roles(&self) -> &'static [&'static str] {
        self.inner().refit_roles()
    }

    pub fn tuning_message(&self) -> &'static str {
        self.inner().tuning_message()
    }
}

impl From<PlrScore> for ScoreModel {
    fn from(score: PlrScore) -> Self {
        ScoreModel::Plr(score)
    }
}

impl From<PlivScore> for ScoreModel {
    fn from(score: PlivScore) -> Self {
        ScoreModel::Pliv(score)
    }
}

impl From<IrmScore> for ScoreModel {
    fn from(score: IrmScore) -> Self {
        ScoreModel::Irm(score)
    }
}

impl From<IivmScore> for ScoreModel {
    fn from(score: IivmScore) -> Self {
        ScoreModel::Iivm(score)
    }
}

impl From<PqScore> for ScoreModel {
    fn from(score: PqScore) -> Self {
        ScoreModel::Pq(score)
    }
}

impl From<LpqScore> for ScoreModel {
    fn from(score: LpqScore) -> Self {
        ScoreModel::Lpq(score)
    }
}

impl From<RddScore> for ScoreModel {
    fn from(score: RddScore) -> Self {
        ScoreModel::Rdd(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::{irm::IrmKind, plr::PlrKind};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Dispatch of capability flags to the wrapped scores.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Linearity, clustering support and tuning messages follow the variant.
    //
    // Given
    // -----
    // - PLR, IRM and PQ models.
    //
    // Expect
    // ------
    // - Only PLR supports clustering; only PQ is nonlinear and carries the
    //   quantile tuning message.
    fn flags_follow_variant() {
        let plr = ScoreModel::from(PlrScore::new(PlrKind::PartiallingOut));
        let irm = ScoreModel::from(IrmScore::new(IrmKind::Ate, false));
        let pq = ScoreModel::from(PqScore::new(0.5, 1.0).expect("valid"));

        assert!(plr.supports_clustering() && !irm.supports_clustering());
        assert!(plr.is_linear() && irm.is_linear() && !pq.is_linear());
        assert_eq!(plr.tuning_message(), "Nuisance tuning not implemented.");
        assert_eq!(pq.tuning_message(), "Nuisance tuning not implemented for potential quantiles.");
        assert_eq!(pq.refit_roles(), &["ml_g"]);
        assert_eq!(irm.name(), "IRM");
    }
}
