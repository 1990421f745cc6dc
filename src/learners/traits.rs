//! The learner capability interface and the role-to-learner map.
use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::learners::errors::{LearnerError, LearnerResult};

/// Learner — a fittable nuisance estimator.
///
/// Required:
/// - `fit(x, y)` trains in place on the given rows.
/// - `predict(x)` returns predictions; classifiers return hard 0/1 labels.
/// - `clone_unfitted()` returns a fresh copy with the same hyperparameters
///   and no fitted state. Cross-fitting calls it once per fold.
/// - `name()` identifies the learner in errors and logs.
///
/// Optional:
/// - `predict_proba(x)` returns `P(y = 1 | x)`. The default reports
///   [`LearnerError::ProbaNotSupported`].
/// - `is_classifier()` defaults to `false`.
///
/// Learners are `Send + Sync` so repetitions can run on worker threads.
pub trait Learner: Send + Sync + std::fmt::Debug {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> LearnerResult<()>;

    fn predict(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>>;

    fn predict_proba(&self, _x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        Err(LearnerError::ProbaNotSupported { learner: self.name().to_string() })
    }

    fn is_classifier(&self) -> bool {
        false
    }

    fn clone_unfitted(&self) -> Box<dyn Learner>;

    fn name(&self) -> &str;
}

/// Shared input checks used by the built-in learners.
pub(crate) fn check_training_shape(
    learner: &str, x: &ArrayView2<f64>, y: &ArrayView1<f64>,
) -> LearnerResult<()> {
    if x.nrows() != y.len() {
        return Err(LearnerError::DimensionMismatch {
            learner: learner.to_string(),
            expected: x.nrows(),
            found: y.len(),
        });
    }
    if y.is_empty() {
        return Err(LearnerError::EmptyTrainingSet { learner: learner.to_string() });
    }
    Ok(())
}

/// Reject non-binary targets and single-class targets.
pub(crate) fn check_binary_target(learner: &str, y: &ArrayView1<f64>) -> LearnerResult<()> {
    if let Some(&value) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(LearnerError::NonBinaryTarget { learner: learner.to_string(), value });
    }
    let first = y[0];
    if y.iter().all(|&v| v == first) {
        return Err(LearnerError::SingleClass { learner: learner.to_string(), class: first });
    }
    Ok(())
}

/// LearnerSet — learners keyed by nuisance role name.
///
/// Cloning produces unfitted copies, so a set can be handed to several
/// estimators without sharing fitted state.
#[derive(Debug, Default)]
pub struct LearnerSet {
    learners: BTreeMap<String, Box<dyn Learner>>,
}

impl LearnerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `learner` to `role`, replacing any previous assignment.
    pub fn with<L: Learner + 'static>(mut self, role: &str, learner: L) -> Self {
        self.learners.insert(role.to_string(), Box::new(learner));
        self
    }

    /// Assign an already boxed learner.
    pub fn with_boxed(mut self, role: &str, learner: Box<dyn Learner>) -> Self {
        self.learners.insert(role.to_string(), learner);
        self
    }

    pub fn get(&self, role: &str) -> Option<&dyn Learner> {
        self.learners.get(role).map(|l| l.as_ref())
    }

    pub fn contains(&self, role: &str) -> bool {
        self.learners.contains_key(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.learners.keys().map(String::as_str)
    }
}

impl Clone for LearnerSet {
    fn clone(&self) -> Self {
        Self {
            learners: self.learners.iter().map(|(k, l)| (k.clone(), l.clone_unfitted())).collect(),
        }
    }
}
