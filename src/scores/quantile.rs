//! Potential quantiles (PQ) and local potential quantiles (LPQ).
//!
//! Both scores are nonlinear in `θ` through the indicator `1{Y ≤ θ}`. The
//! engine solves them by bracketed root finding and linearizes them at the
//! root with a Gaussian kernel density estimate of the outcome:
//! `psi_a = ∂ψ/∂θ`, `psi_b = ψ(θ) − psi_a·θ`.
//!
//! The indicator nuisances (`ml_g`, `ml_g_du_z*`) are trained on the first
//! half of each train fold against a preliminary quantile that is computed on
//! the second half, so both splits come from the nuisance fitter.
use ndarray::{Array1, ArrayView1};
use statrs::distribution::{Continuous, Normal};

use crate::{
    data::DMLData,
    estimation::errors::{DMLError, DMLResult},
    inference::quantile_sorted,
    nuisance::{NuisanceRole, RoleStage, RoleTarget, TrainFilter},
    scores::elements::{
        OrthogonalScore, PrelimInput, ScoreElements, ScoreInput, ipw, reject_clusters,
        require_binary_treatments, require_single_instrument,
    },
};

const TUNING_MESSAGE: &str = "Nuisance tuning not implemented for potential quantiles.";

/// PqScore — potential quantile `θ = q_τ(Y(t))` for a binary treatment.
///
/// Score
/// -----
/// With `m_t = P(D = t | X)` and `w = 1{D = t}/m_t`:
/// `ψ = w(1{Y ≤ θ} − g) + g − τ`, where `g = P(Y ≤ θ | D = t, X)` is
/// learned at the fold's preliminary quantile. The derivative is
/// `∂ψ/∂θ = w·K_h(Y − θ)`.
///
/// Roles
/// -----
/// - `ml_m_prelim`: propensity on the first half of the train fold, used to
///   locate the preliminary quantile on the second half.
/// - `ml_g`: `1{Y ≤ q}` on first-half rows with `D = t` (classifier).
/// - `ml_m`: propensity on the full train fold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PqScore {
    quantile: f64,
    treatment: f64,
    kde_bandwidth: Option<f64>,
    normalize_ipw: bool,
}

impl PqScore {
    /// # Errors
    /// [`DMLError::InvalidParameter`] when `quantile ∉ (0, 1)` or
    /// `treatment ∉ {0, 1}`.
    pub fn new(quantile: f64, treatment: f64) -> DMLResult<Self> {
        validate_quantile(quantile)?;
        validate_treatment_level(treatment)?;
        Ok(Self { quantile, treatment, kde_bandwidth: None, normalize_ipw: false })
    }

    /// Fix the kernel bandwidth instead of using Silverman's rule.
    pub fn with_bandwidth(mut self, h: f64) -> DMLResult<Self> {
        validate_bandwidth(h)?;
        self.kde_bandwidth = Some(h);
        Ok(self)
    }

    pub fn with_normalize_ipw(mut self, normalize_ipw: bool) -> Self {
        self.normalize_ipw = normalize_ipw;
        self
    }

    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    pub fn treatment(&self) -> f64 {
        self.treatment
    }

    fn weights(&self, d: ArrayView1<f64>, m: &Array1<f64>) -> Array1<f64> {
        let level = self.treatment;
        let indicator = d.mapv(|v| f64::from(u8::from(v == level)));
        let m_t = if level == 1.0 { m.clone() } else { m.mapv(|p| 1.0 - p) };
        ipw(indicator.view(), &m_t, self.normalize_ipw)
    }
}

impl OrthogonalScore for PqScore {
    fn name(&self) -> &'static str {
        "PQ"
    }

    fn roles(&self) -> Vec<NuisanceRole> {
        vec![
            NuisanceRole::propensity("ml_m_prelim", RoleTarget::Treatment)
                .learner("ml_m")
                .stage(RoleStage::Preliminary),
            NuisanceRole::regression(
                "ml_g",
                RoleTarget::OutcomeIndicatorAtPreliminaryQuantile { treatment_level: None },
            )
            .classification()
            .filter(TrainFilter::TreatmentEqualsOnHalf(self.treatment))
            .depends_on("ml_m_prelim"),
            NuisanceRole::propensity("ml_m", RoleTarget::Treatment),
        ]
    }

    fn validate(&self, data: &DMLData) -> DMLResult<()> {
        reject_clusters(data)?;
        require_binary_treatments(data, "PQ")
    }

    fn is_linear(&self) -> bool {
        false
    }

    fn elements(&self, input: &ScoreInput, theta: f64) -> DMLResult<ScoreElements> {
        let y = input.y;
        let g = input.pred("ml_g")?;
        let m = input.pred("ml_m")?.to_owned();
        let w = self.weights(input.d, &m);
        let below = y.mapv(|v| f64::from(u8::from(v <= theta)));

        let psi = &w * &(&below - &g) + &g - self.quantile;
        let psi_a = &w * &kernel_density(y, theta, self.kde_bandwidth)?;
        let psi_b = psi - &psi_a * theta;
        Ok(ScoreElements { psi_a, psi_b })
    }

    /// Weighted-CDF inversion on the second half of the train fold.
    fn preliminary_threshold(&self, input: &PrelimInput) -> DMLResult<f64> {
        let m = input.pred("ml_m_prelim")?;
        let w = self.weights(input.d.view(), m);
        Ok(first_crossing(input.y.view(), &w, self.quantile))
    }

    fn refit_roles(&self) -> &'static [&'static str] {
        &["ml_g"]
    }

    fn tuning_message(&self) -> &'static str {
        TUNING_MESSAGE
    }
}

/// LpqScore — local potential quantile for compliers with a binary
/// instrument.
///
/// With `sgn = +1` for `t = 1` and `−1` for `t = 0`, `h1 = Z/m_z`,
/// `h0 = (1 − Z)/(1 − m_z)` and `ind = 1{D = t}·1{Y ≤ θ}`:
///
/// - `num = sgn·[g1 − g0 + h1(ind − g1) − h0(ind − g0)]`
/// - `den = m_d1 − m_d0 + h1(D − m_d1) − h0(D − m_d0)`
/// - `ψ = num − τ·den`
///
/// `den` estimates the complier share and does not depend on `θ`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LpqScore {
    quantile: f64,
    treatment: f64,
    kde_bandwidth: Option<f64>,
    normalize_ipw: bool,
}

impl LpqScore {
    /// # Errors
    /// Same parameter checks as [`PqScore::new`].
    pub fn new(quantile: f64, treatment: f64) -> DMLResult<Self> {
        validate_quantile(quantile)?;
        validate_treatment_level(treatment)?;
        Ok(Self { quantile, treatment, kde_bandwidth: None, normalize_ipw: false })
    }

    pub fn with_bandwidth(mut self, h: f64) -> DMLResult<Self> {
        validate_bandwidth(h)?;
        self.kde_bandwidth = Some(h);
        Ok(self)
    }

    pub fn with_normalize_ipw(mut self, normalize_ipw: bool) -> Self {
        self.normalize_ipw = normalize_ipw;
        self
    }

    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    pub fn treatment(&self) -> f64 {
        self.treatment
    }

    fn sign(&self) -> f64 {
        if self.treatment == 1.0 { 1.0 } else { -1.0 }
    }

    fn level_indicator(&self, d: ArrayView1<f64>) -> Array1<f64> {
        let level = self.treatment;
        d.mapv(|v| f64::from(u8::from(v == level)))
    }
}

impl OrthogonalScore for LpqScore {
    fn name(&self) -> &'static str {
        "LPQ"
    }

    fn roles(&self) -> Vec<NuisanceRole> {
        let indicator =
            RoleTarget::OutcomeIndicatorAtPreliminaryQuantile { treatment_level: Some(self.treatment) };
        vec![
            NuisanceRole::propensity("ml_m_z_prelim", RoleTarget::Instrument)
                .learner("ml_m")
                .stage(RoleStage::Preliminary),
            NuisanceRole::propensity("ml_m_z", RoleTarget::Instrument).learner("ml_m"),
            NuisanceRole::regression("ml_m_d_z0", RoleTarget::Treatment)
                .learner("ml_m")
                .classification()
                .filter(TrainFilter::InstrumentEquals(0.0)),
            NuisanceRole::regression("ml_m_d_z1", RoleTarget::Treatment)
                .learner("ml_m")
                .classification()
                .filter(TrainFilter::InstrumentEquals(1.0)),
            NuisanceRole::regression("ml_g_du_z0", indicator)
                .learner("ml_g")
                .classification()
                .filter(TrainFilter::InstrumentEqualsOnHalf(0.0))
                .depends_on("ml_m_z_prelim"),
            NuisanceRole::regression("ml_g_du_z1", indicator)
                .learner("ml_g")
                .classification()
                .filter(TrainFilter::InstrumentEqualsOnHalf(1.0))
                .depends_on("ml_m_z_prelim"),
        ]
    }

    fn validate(&self, data: &DMLData) -> DMLResult<()> {
        reject_clusters(data)?;
        require_binary_treatments(data, "LPQ")?;
        require_single_instrument(data, "LPQ", true)
    }

    fn is_linear(&self) -> bool {
        false
    }

    fn elements(&self, input: &ScoreInput, theta: f64) -> DMLResult<ScoreElements> {
        let y = input.y;
        let d = input.d;
        let z = input.instrument()?;
        let m_z = input.pred("ml_m_z")?.to_owned();
        let m_d0 = input.pred("ml_m_d_z0")?;
        let m_d1 = input.pred("ml_m_d_z1")?;
        let g0 = input.pred("ml_g_du_z0")?;
        let g1 = input.pred("ml_g_du_z1")?;

        let h1 = ipw(z, &m_z, self.normalize_ipw);
        let h0 = ipw(z.mapv(|v| 1.0 - v).view(), &m_z.mapv(|p| 1.0 - p), self.normalize_ipw);
        let dt = self.level_indicator(d);
        let below = y.mapv(|v| f64::from(u8::from(v <= theta)));
        let ind = &dt * &below;

        let num = (&g1 - &g0 + &(&h1 * &(&ind - &g1)) - &(&h0 * &(&ind - &g0))) * self.sign();
        let den = &m_d1 - &m_d0 + &(&h1 * &(&d - &m_d1)) - &(&h0 * &(&d - &m_d0));
        let psi = num - &den * self.quantile;

        let density = kernel_density(y, theta, self.kde_bandwidth)?;
        let psi_a = (&h1 - &h0) * &dt * &density * self.sign();
        let psi_b = psi - &psi_a * theta;
        Ok(ScoreElements { psi_a, psi_b })
    }

    /// Complier-weighted CDF inversion on the second half of the train fold.
    fn preliminary_threshold(&self, input: &PrelimInput) -> DMLResult<f64> {
        let m = input.pred("ml_m_z_prelim")?;
        let z = input.z.as_ref().ok_or_else(|| DMLError::InvalidData {
            reason: "score requires an instrument".to_string(),
        })?;
        let a = z / m - &(z.mapv(|v| 1.0 - v) / m.mapv(|p| 1.0 - p));
        let complier_share = (&a * &input.d).mean().unwrap_or(0.0);
        let contributions = &a * &self.level_indicator(input.d.view()) * self.sign();
        Ok(first_crossing(input.y.view(), &contributions, self.quantile * complier_share))
    }

    fn refit_roles(&self) -> &'static [&'static str] {
        &["ml_g_du_z0", "ml_g_du_z1"]
    }

    fn tuning_message(&self) -> &'static str {
        TUNING_MESSAGE
    }
}

// ---- Shared helpers ----

fn validate_quantile(quantile: f64) -> DMLResult<()> {
    if !(quantile > 0.0 && quantile < 1.0) {
        return Err(DMLError::InvalidParameter {
            name: "quantile",
            value: quantile,
            reason: format!("Quantile has be between 0 or 1. Quantile {quantile} passed."),
        });
    }
    Ok(())
}

fn validate_treatment_level(treatment: f64) -> DMLResult<()> {
    if treatment != 0.0 && treatment != 1.0 {
        return Err(DMLError::InvalidParameter {
            name: "treatment",
            value: treatment,
            reason: format!(
                "Treatment indicator has to be either 0 or 1. Treatment indicator {treatment} passed."
            ),
        });
    }
    Ok(())
}

fn validate_bandwidth(h: f64) -> DMLResult<()> {
    if !(h.is_finite() && h > 0.0) {
        return Err(DMLError::InvalidParameter {
            name: "kde_bandwidth",
            value: h,
            reason: format!("kde bandwidth has to be positive and finite. Bandwidth {h} passed."),
        });
    }
    Ok(())
}

/// Silverman's rule of thumb, `0.9·min(sd, IQR/1.349)·n^{-1/5}`.
///
/// Falls back to `n^{-1/5}` when the spread is zero.
pub(crate) fn silverman_bandwidth(y: ArrayView1<f64>) -> f64 {
    let n = y.len().max(1) as f64;
    let rate = n.powf(-0.2);
    let sd = if y.len() > 1 { y.std(1.0) } else { 0.0 };
    let mut sorted = y.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let iqr = quantile_sorted(&sorted, 0.75) - quantile_sorted(&sorted, 0.25);
    let spread = sd.min(iqr / 1.349);
    if spread > 0.0 && spread.is_finite() { 0.9 * spread * rate } else { rate }
}

/// Gaussian kernel `K_h(y_i − θ)` for every observation.
fn kernel_density(y: ArrayView1<f64>, theta: f64, bandwidth: Option<f64>) -> DMLResult<Array1<f64>> {
    let h = bandwidth.unwrap_or_else(|| silverman_bandwidth(y));
    let kernel = Normal::new(0.0, h).map_err(|e| DMLError::InvalidParameter {
        name: "kde_bandwidth",
        value: h,
        reason: e.to_string(),
    })?;
    Ok(y.mapv(|v| kernel.pdf(v - theta)))
}

/// Smallest `y` at which the running sum of `contributions / n`, taken in
/// increasing order of `y`, reaches `target`. Returns `max(y)` when it
/// never does.
fn first_crossing(y: ArrayView1<f64>, contributions: &Array1<f64>, target: f64) -> f64 {
    let n = y.len().max(1) as f64;
    let mut order: Vec<usize> = (0..y.len()).collect();
    order.sort_by(|&a, &b| y[a].total_cmp(&y[b]));
    let mut cum = 0.0;
    for &i in &order {
        cum += contributions[i] / n;
        if cum >= target {
            return y[i];
        }
    }
    order.last().map_or(f64::NAN, |&i| y[i])
}
