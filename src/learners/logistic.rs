//! L2-penalized logistic regression fitted by L-BFGS.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s};

use crate::{
    learners::{
        errors::{LearnerError, LearnerResult},
        traits::{Learner, check_binary_target, check_training_shape},
    },
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{Grad, LogLikelihood, MLEOptions, Theta, maximize},
        numerical_stability::{safe_logistic, safe_softplus},
    },
};

/// LogisticClassifier — binary classifier for propensity-type nuisances.
///
/// Purpose
/// -------
/// Estimate `P(y = 1 | x)` by maximizing the mean Bernoulli log-likelihood
/// minus `‖w‖² / (2·C·n)` on standardized features. The intercept is not
/// penalized. The penalty keeps coefficients finite under perfect
/// separation, so predicted probabilities saturate near 0/1 instead of
/// diverging.
///
/// Fields
/// ------
/// - `c`: inverse regularization strength, `> 0` (default `1.0`).
/// - `fit_intercept`: include an unpenalized intercept (default `true`).
/// - `mle`: L-BFGS tolerances and line search.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticClassifier {
    pub c: f64,
    pub fit_intercept: bool,
    pub mle: MLEOptions,
    fitted: Option<LogisticFit>,
}

#[derive(Debug, Clone, PartialEq)]
struct LogisticFit {
    mean: Array1<f64>,
    scale: Array1<f64>,
    theta: Theta,
}

impl Default for LogisticClassifier {
    fn default() -> Self {
        Self { c: 1.0, fit_intercept: true, mle: MLEOptions::default(), fitted: None }
    }
}

impl LogisticClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier with inverse penalty strength `c`.
    ///
    /// # Errors
    /// [`LearnerError::InvalidHyperparameter`] unless `c` is finite and
    /// positive.
    pub fn with_c(c: f64) -> LearnerResult<Self> {
        if !c.is_finite() || c <= 0.0 {
            return Err(LearnerError::InvalidHyperparameter {
                learner: "logistic".to_string(),
                name: "C",
                value: c,
                reason: "inverse regularization strength must be finite and positive",
            });
        }
        Ok(Self { c, ..Self::default() })
    }

    pub fn with_mle_options(mut self, mle: MLEOptions) -> Self {
        self.mle = mle;
        self
    }

    /// Linear index `η = b + zᵀw` on standardized features.
    fn linear_index(&self, x: &ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        let fit = self
            .fitted
            .as_ref()
            .ok_or_else(|| LearnerError::NotFitted { learner: self.name().to_string() })?;
        if x.ncols() != fit.mean.len() {
            return Err(LearnerError::FeatureCountMismatch {
                learner: self.name().to_string(),
                expected: fit.mean.len(),
                found: x.ncols(),
            });
        }
        let z = (x - &fit.mean) / &fit.scale;
        let p = fit.mean.len();
        let intercept = if self.fit_intercept { fit.theta[p] } else { 0.0 };
        Ok(z.dot(&fit.theta.slice(s![..p])) + intercept)
    }
}

/// Training payload for the penalized Bernoulli likelihood.
struct BernoulliData {
    z: Array2<f64>,
    y: Array1<f64>,
    penalty: f64,
    fit_intercept: bool,
}

/// `ℓ(θ) = mean[y·η − softplus(η)] − penalty/2 · ‖w‖²`, with θ = [w; b].
struct PenalizedBernoulli;

impl PenalizedBernoulli {
    fn eta(theta: &Theta, data: &BernoulliData) -> Array1<f64> {
        let p = data.z.ncols();
        let intercept = if data.fit_intercept { theta[p] } else { 0.0 };
        data.z.dot(&theta.slice(s![..p])) + intercept
    }
}

impl LogLikelihood for PenalizedBernoulli {
    type Data = BernoulliData;

    fn value(&self, theta: &Theta, data: &BernoulliData) -> OptResult<f64> {
        let eta = Self::eta(theta, data);
        let n = data.y.len() as f64;
        let loglik: f64 =
            eta.iter().zip(data.y.iter()).map(|(&e, &y)| y * e - safe_softplus(e)).sum::<f64>() / n;
        let w = theta.slice(s![..data.z.ncols()]);
        Ok(loglik - 0.5 * data.penalty * w.dot(&w))
    }

    fn check(&self, theta: &Theta, data: &BernoulliData) -> OptResult<()> {
        let expected = data.z.ncols() + usize::from(data.fit_intercept);
        if theta.len() != expected {
            return Err(OptError::InvalidObjectiveInput {
                reason: format!("parameter length {} does not match {expected}", theta.len()),
            });
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &BernoulliData) -> OptResult<Grad> {
        let p = data.z.ncols();
        let n = data.y.len() as f64;
        let resid = &data.y - &Self::eta(theta, data).mapv(safe_logistic);
        let mut grad = Array1::<f64>::zeros(theta.len());
        let gw = data.z.t().dot(&resid) / n - &(&theta.slice(s![..p]) * data.penalty);
        grad.slice_mut(s![..p]).assign(&gw);
        if data.fit_intercept {
            grad[p] = resid.sum() / n;
        }
        Ok(grad)
    }
}

impl Learner for LogisticClassifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> LearnerResult<()> {
        check_training_shape(self.name(), &x, &y)?;
        check_binary_target(self.name(), &y)?;

        let n = x.nrows() as f64;
        let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scale = x
            .var_axis(Axis(0), 0.0)
            .mapv(|v| if v > 0.0 { v.sqrt() } else { 1.0 });
        let z = (&x - &mean) / &scale;
        let data = BernoulliData {
            z,
            y: y.to_owned(),
            penalty: 1.0 / (self.c * n),
            fit_intercept: self.fit_intercept,
        };

        let mut theta0 = Theta::zeros(x.ncols() + usize::from(self.fit_intercept));
        if self.fit_intercept {
            let share = y.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
            theta0[x.ncols()] = (share / (1.0 - share)).ln();
        }
        let outcome = maximize(&PenalizedBernoulli, theta0, &data, &self.mle)?;
        if !outcome.converged {
            log::debug!(
                "logistic fit stopped without convergence after {} iterations ({})",
                outcome.iterations,
                outcome.status
            );
        }
        self.fitted = Some(LogisticFit { mean, scale, theta: outcome.theta_hat });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        Ok(self.linear_index(&x)?.mapv(|e| if e >= 0.0 { 1.0 } else { 0.0 }))
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        Ok(self.linear_index(&x)?.mapv(safe_logistic))
    }

    fn is_classifier(&self) -> bool {
        true
    }

    fn clone_unfitted(&self) -> Box<dyn Learner> {
        Box::new(Self { fitted: None, ..self.clone() })
    }

    fn name(&self) -> &str {
        "logistic"
    }
}
