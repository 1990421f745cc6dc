//! Multiplier bootstrap for simultaneous (joint) confidence bands.
//!
//! The bootstrap perturbs the estimated influence functions
//! `−ψ_i / J` with i.i.d. mean-zero, unit-variance multipliers and studentizes
//! by the repetition's standard error. One multiplier vector is drawn per
//! bootstrap replicate and shared across treatments, which preserves their
//! dependence in the joint band.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::{Rng, rngs::StdRng};
use rand_distr::{Distribution, Exp1, StandardNormal};

use crate::{
    inference::{
        aggregation::{median, quantile_sorted},
        confidence::validate_level,
        errors::{InferenceError, InferenceResult},
    },
    resampling::stream_rng,
};

/// Mammen two-point weights: `(1 − √5)/2` with probability
/// `(√5 + 1)/(2√5)`, otherwise `(1 + √5)/2`.
const MAMMEN_LOW: f64 = -0.618_033_988_749_895;
const MAMMEN_HIGH: f64 = 1.618_033_988_749_895;
const MAMMEN_P_LOW: f64 = 0.723_606_797_749_979;

/// Multiplier distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapMethod {
    /// Standard normal multipliers.
    #[default]
    Normal,
    /// `±1` with equal probability.
    Rademacher,
    /// `Exp(1) − 1` (Bayesian bootstrap).
    Bayes,
    /// Mammen's two-point wild bootstrap weights.
    Wild,
}

/// Bootstrap configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BootstrapOptions {
    pub method: BootstrapMethod,
    pub n_boot: usize,
    pub seed: u64,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self { method: BootstrapMethod::Normal, n_boot: 500, seed: 42 }
    }
}

/// MultiplierBootstrap — draws studentized bootstrap statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiplierBootstrap {
    method: BootstrapMethod,
    n_boot: usize,
    seed: u64,
}

impl MultiplierBootstrap {
    /// # Errors
    /// [`InferenceError::InvalidBootstrapDraws`] for `n_boot = 0`.
    pub fn new(method: BootstrapMethod, n_boot: usize, seed: u64) -> InferenceResult<Self> {
        if n_boot == 0 {
            return Err(InferenceError::InvalidBootstrapDraws { n_boot });
        }
        Ok(Self { method, n_boot, seed })
    }

    pub fn from_options(opts: &BootstrapOptions) -> InferenceResult<Self> {
        Self::new(opts.method, opts.n_boot, opts.seed)
    }

    pub fn n_boot(&self) -> usize {
        self.n_boot
    }

    pub fn method(&self) -> BootstrapMethod {
        self.method
    }

    fn weight(&self, rng: &mut StdRng) -> f64 {
        match self.method {
            BootstrapMethod::Normal => StandardNormal.sample(rng),
            BootstrapMethod::Rademacher => {
                if rng.gen::<bool>() {
                    1.0
                } else {
                    -1.0
                }
            }
            BootstrapMethod::Bayes => {
                let e: f64 = Exp1.sample(rng);
                e - 1.0
            }
            BootstrapMethod::Wild => {
                if rng.gen::<f64>() < MAMMEN_P_LOW { MAMMEN_LOW } else { MAMMEN_HIGH }
            }
        }
    }

    /// draw — bootstrap t-statistics for one repetition.
    ///
    /// Parameters
    /// ----------
    /// - `psi`: `(n, n_treat)` scores evaluated at the repetition's estimates.
    /// - `j_hat`: `mean(psi_a)` per treatment.
    /// - `se`: the repetition's standard errors.
    /// - `rep`: repetition index; selects the random stream.
    ///
    /// Returns
    /// -------
    /// `(n_boot, n_treat)` array with
    /// `t*_{b,j} = −Σ_i ξ_{b,i} ψ_{ij} / (n · J_j · se_j)`.
    ///
    /// Errors
    /// ------
    /// - [`InferenceError::EmptyInput`] for an empty score matrix.
    /// - [`InferenceError::ShapeMismatch`] when `j_hat` or `se` do not
    ///   match the treatments of `psi`.
    /// - [`InferenceError::InvalidStandardError`] for a zero, negative or
    ///   non-finite standard error.
    pub fn draw(
        &self, psi: ArrayView2<f64>, j_hat: ArrayView1<f64>, se: ArrayView1<f64>, rep: usize,
    ) -> InferenceResult<Array2<f64>> {
        let (n, n_treat) = psi.dim();
        if n == 0 || n_treat == 0 {
            return Err(InferenceError::EmptyInput { what: "scores" });
        }
        for (what, found) in [("Jacobian", j_hat.len()), ("standard errors", se.len())] {
            if found != n_treat {
                return Err(InferenceError::ShapeMismatch { what, expected: n_treat, found });
            }
        }
        if let Some((index, &s)) = se.iter().enumerate().find(|(_, s)| !(s.is_finite() && **s > 0.0)) {
            return Err(InferenceError::InvalidStandardError { index, se: s });
        }

        let scale: Array1<f64> = (&j_hat * &se) * -(n as f64);
        let mut rng = stream_rng(self.seed, &[rep as u64]);
        let mut out = Array2::<f64>::zeros((self.n_boot, n_treat));
        let mut xi = Array1::<f64>::zeros(n);
        for b in 0..self.n_boot {
            xi.mapv_inplace(|_| self.weight(&mut rng));
            let sums = psi.t().dot(&xi);
            out.row_mut(b).assign(&(&sums / &scale));
        }
        Ok(out)
    }
}

/// joint_confint — simultaneous band from per-repetition bootstrap draws.
///
/// Parameters
/// ----------
/// - `coef_r`, `se_r`: `(n_treat, n_rep)` per-repetition estimates and
///   standard errors.
/// - `boot_t`: one `(n_boot, n_treat)` draw per repetition.
/// - `level`: coverage in `(0, 1)`.
///
/// Returns
/// -------
/// `(n_treat, 2)` lower/upper bounds. For each repetition the critical
/// value is the `level` quantile of `max_j |t*_{b,j}|`; the bounds
/// `θ_jr ± c_r·se_jr` are then aggregated by their median over repetitions.
///
/// Errors
/// ------
/// - [`InferenceError::InvalidLevel`] for a level outside `(0, 1)`.
/// - [`InferenceError::EmptyInput`] / [`InferenceError::ShapeMismatch`]
///   for missing or misaligned draws.
pub fn joint_confint(
    coef_r: ArrayView2<f64>, se_r: ArrayView2<f64>, boot_t: &[Array2<f64>], level: f64,
) -> InferenceResult<Array2<f64>> {
    validate_level(level)?;
    let (n_treat, n_rep) = coef_r.dim();
    if n_rep == 0 || n_treat == 0 {
        return Err(InferenceError::EmptyInput { what: "repetitions" });
    }
    if se_r.dim() != coef_r.dim() {
        return Err(InferenceError::ShapeMismatch {
            what: "per-repetition standard errors",
            expected: n_treat * n_rep,
            found: se_r.len(),
        });
    }
    if boot_t.len() != n_rep {
        return Err(InferenceError::ShapeMismatch {
            what: "bootstrap draws (repetitions)",
            expected: n_rep,
            found: boot_t.len(),
        });
    }

    let mut lower = vec![Vec::with_capacity(n_rep); n_treat];
    let mut upper = vec![Vec::with_capacity(n_rep); n_treat];
    for (r, draws) in boot_t.iter().enumerate() {
        if draws.ncols() != n_treat {
            return Err(InferenceError::ShapeMismatch {
                what: "bootstrap draws (treatments)",
                expected: n_treat,
                found: draws.ncols(),
            });
        }
        let mut max_abs: Vec<f64> = draws
            .rows()
            .into_iter()
            .map(|row| row.iter().fold(0.0_f64, |acc, &t| acc.max(t.abs())))
            .collect();
        max_abs.sort_by(|a, b| a.total_cmp(b));
        let crit = quantile_sorted(&max_abs, level);
        for j in 0..n_treat {
            lower[j].push(coef_r[[j, r]] - crit * se_r[[j, r]]);
            upper[j].push(coef_r[[j, r]] + crit * se_r[[j, r]]);
        }
    }

    let mut out = Array2::<f64>::zeros((n_treat, 2));
    for j in 0..n_treat {
        out[[j, 0]] = median(std::mem::take(&mut lower[j]));
        out[[j, 1]] = median(std::mem::take(&mut upper[j]));
    }
    Ok(out)
}
