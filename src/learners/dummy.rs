//! Constant learners: fixed or training-mean predictions.
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::learners::{
    errors::{LearnerError, LearnerResult},
    traits::{Learner, check_binary_target, check_training_shape},
};

/// How a constant learner picks its prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantStrategy {
    /// Always predict the given value; `fit` only checks shapes.
    Fixed(f64),
    /// Predict the training-target mean.
    Mean,
}

/// ConstantRegressor — ignores features.
///
/// `ConstantRegressor::fixed(0.0)` turns a nuisance off (for example the
/// outcome adjustment of a plain local-polynomial discontinuity estimate);
/// `ConstantRegressor::mean()` is the intercept-only baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantRegressor {
    pub strategy: ConstantStrategy,
    value: Option<f64>,
}

impl ConstantRegressor {
    pub fn fixed(value: f64) -> Self {
        Self { strategy: ConstantStrategy::Fixed(value), value: None }
    }

    pub fn mean() -> Self {
        Self { strategy: ConstantStrategy::Mean, value: None }
    }
}

impl Learner for ConstantRegressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> LearnerResult<()> {
        check_training_shape(self.name(), &x, &y)?;
        self.value = Some(match self.strategy {
            ConstantStrategy::Fixed(v) => v,
            ConstantStrategy::Mean => y.mean().unwrap_or(0.0),
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        let value =
            self.value.ok_or_else(|| LearnerError::NotFitted { learner: self.name().to_string() })?;
        Ok(Array1::from_elem(x.nrows(), value))
    }

    fn clone_unfitted(&self) -> Box<dyn Learner> {
        Box::new(Self { strategy: self.strategy, value: None })
    }

    fn name(&self) -> &str {
        "constant_regressor"
    }
}

/// ConstantClassifier — predicts one probability for every row.
///
/// With [`ConstantStrategy::Mean`] the probability is the training share
/// of ones (the class prior).
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantClassifier {
    pub strategy: ConstantStrategy,
    proba: Option<f64>,
}

impl ConstantClassifier {
    pub fn fixed(proba: f64) -> Self {
        Self { strategy: ConstantStrategy::Fixed(proba), proba: None }
    }

    pub fn prior() -> Self {
        Self { strategy: ConstantStrategy::Mean, proba: None }
    }

    fn fitted(&self) -> LearnerResult<f64> {
        self.proba.ok_or_else(|| LearnerError::NotFitted { learner: self.name().to_string() })
    }
}

impl Learner for ConstantClassifier {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> LearnerResult<()> {
        check_training_shape(self.name(), &x, &y)?;
        self.proba = Some(match self.strategy {
            ConstantStrategy::Fixed(p) => p,
            ConstantStrategy::Mean => {
                check_binary_target(self.name(), &y)?;
                y.mean().unwrap_or(0.5)
            }
        });
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        let label = if self.fitted()? >= 0.5 { 1.0 } else { 0.0 };
        Ok(Array1::from_elem(x.nrows(), label))
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        Ok(Array1::from_elem(x.nrows(), self.fitted()?))
    }

    fn is_classifier(&self) -> bool {
        true
    }

    fn clone_unfitted(&self) -> Box<dyn Learner> {
        Box::new(Self { strategy: self.strategy, proba: None })
    }

    fn name(&self) -> &str {
        "constant_classifier"
    }
}
