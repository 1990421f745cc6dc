//! rust_doubleml — double/debiased machine learning with cross-fitting.
//!
//! Purpose
//! -------
//! Estimate causal parameters (partially linear and interactive regression
//! effects, instrumental-variable effects, potential and local quantiles,
//! sharp regression-discontinuity effects) from user-supplied nuisance
//! learners, with Neyman-orthogonal scores and repeated cross-fitting. When
//! the `python-bindings` feature is enabled, this module also defines the
//! `_rust_doubleml` extension module.
//!
//! Key behaviors
//! -------------
//! - [`data`]: the dataset container and per-treatment contexts.
//! - [`resampling`]: repeated, stratified and clustered K-fold partitions.
//! - [`learners`]: the nuisance learner capability trait and built-in
//!   learners.
//! - [`nuisance`]: role declarations and out-of-fold fitting.
//! - [`scores`]: the closed set of orthogonal scores.
//! - [`estimation`]: the [`DoubleML`](estimation::DoubleML) state machine.
//! - [`inference`]: repetition aggregation, normal inference and the
//!   multiplier bootstrap.
//! - [`optimization`]: argmin-backed likelihood maximization and root
//!   finding.
//!
//! Invariants & assumptions
//! ------------------------
//! - All heavy numerical work lives in the inner modules; the PyO3 items in
//!   this file perform only input conversion and error mapping.
//! - The library logs through the `log` facade and never installs a logger.
//!
//! Conventions
//! -----------
//! - Python-exposed classes live under `_rust_doubleml.models` and choose
//!   built-in learners by name.
//! - Errors from the core are converted to `ValueError` at the boundary.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module; end-to-end estimation scenarios
//!   are in `tests/`.

pub mod data;
pub mod estimation;
pub mod inference;
pub mod learners;
pub mod nuisance;
pub mod optimization;
pub mod resampling;
pub mod scores;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    estimation::{DMLOptions, DoubleML},
    learners::LearnerSet,
    scores::{IrmKind, IrmScore, PlrScore},
    utils::{extract_dml_data, extract_procedure, learner_by_name},
};

/// Shared read-only surface of the Python estimator classes.
#[cfg(feature = "python-bindings")]
fn interval_rows(dml: &DoubleML, level: f64) -> PyResult<Vec<(f64, f64)>> {
    let ci = dml.confint(level)?;
    Ok(ci.rows().into_iter().map(|r| (r[0], r[1])).collect())
}

/// PLR — partially linear regression estimator for Python callers.
///
/// Constructed via
/// `PLR(y, d, x, n_folds=5, n_rep=1, learner_l="ols", learner_m="ols",
/// dml_procedure="dml2", seed=42)`. Learners are chosen by name.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_doubleml.models")]
pub struct PLR {
    inner: DoubleML,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PLR {
    #[new]
    #[pyo3(
        signature = (
            y,
            d,
            x,
            n_folds = 5,
            n_rep = 1,
            learner_l = "ols",
            learner_m = "ols",
            dml_procedure = None,
            seed = 42,
        ),
        text_signature = "(y, d, x, /, n_folds=5, n_rep=1, learner_l='ols', learner_m='ols', \
                          dml_procedure=None, seed=42)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new<'py>(
        py: Python<'py>, y: &Bound<'py, PyAny>, d: &Bound<'py, PyAny>, x: &Bound<'py, PyAny>,
        n_folds: usize, n_rep: usize, learner_l: &str, learner_m: &str,
        dml_procedure: Option<&str>, seed: u64,
    ) -> PyResult<Self> {
        let data = extract_dml_data(py, y, d, x)?;
        let learners = LearnerSet::new()
            .with_boxed("ml_l", learner_by_name(learner_l, false)?)
            .with_boxed("ml_m", learner_by_name(learner_m, false)?);
        let options = DMLOptions::new(n_folds, n_rep)?
            .with_procedure(extract_procedure(dml_procedure)?)
            .with_seed(seed);
        let inner = DoubleML::new(data, PlrScore::default(), learners, options)?;
        Ok(PLR { inner })
    }

    pub fn fit(&mut self) -> PyResult<()> {
        Ok(self.inner.fit()?)
    }

    #[getter]
    pub fn coef(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.coef()?.to_vec())
    }

    #[getter]
    pub fn se(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.se()?.to_vec())
    }

    #[getter]
    pub fn pval(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.pval()?.to_vec())
    }

    #[pyo3(signature = (level = 0.95))]
    pub fn confint(&self, level: f64) -> PyResult<Vec<(f64, f64)>> {
        interval_rows(&self.inner, level)
    }
}

/// IRM — interactive regression estimator (ATE or ATTE) for Python callers.
///
/// Constructed via
/// `IRM(y, d, x, n_folds=5, n_rep=1, learner_g="ols", learner_m="logistic",
/// score="ATE", dml_procedure=None, trimming_threshold=0.01, seed=42)`.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_doubleml.models")]
pub struct IRM {
    inner: DoubleML,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl IRM {
    #[new]
    #[pyo3(
        signature = (
            y,
            d,
            x,
            n_folds = 5,
            n_rep = 1,
            learner_g = "ols",
            learner_m = "logistic",
            score = "ATE",
            dml_procedure = None,
            trimming_threshold = 0.01,
            seed = 42,
        ),
        text_signature = "(y, d, x, /, n_folds=5, n_rep=1, learner_g='ols', \
                          learner_m='logistic', score='ATE', dml_procedure=None, \
                          trimming_threshold=0.01, seed=42)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new<'py>(
        py: Python<'py>, y: &Bound<'py, PyAny>, d: &Bound<'py, PyAny>, x: &Bound<'py, PyAny>,
        n_folds: usize, n_rep: usize, learner_g: &str, learner_m: &str, score: &str,
        dml_procedure: Option<&str>, trimming_threshold: f64, seed: u64,
    ) -> PyResult<Self> {
        let kind = match score.to_uppercase().as_str() {
            "ATE" => IrmKind::Ate,
            "ATTE" => IrmKind::Atte,
            other => {
                return Err(pyo3::exceptions::PyValueError::new_err(format!(
                    "invalid score {:?} (expected 'ATE' or 'ATTE')",
                    other
                )));
            }
        };
        let data = extract_dml_data(py, y, d, x)?;
        let learners = LearnerSet::new()
            .with_boxed("ml_g", learner_by_name(learner_g, false)?)
            .with_boxed("ml_m", learner_by_name(learner_m, true)?);
        let options = DMLOptions::new(n_folds, n_rep)?
            .with_procedure(extract_procedure(dml_procedure)?)
            .with_trimming(trimming_threshold)?
            .with_seed(seed);
        let inner = DoubleML::new(data, IrmScore::new(kind, false), learners, options)?;
        Ok(IRM { inner })
    }

    pub fn fit(&mut self) -> PyResult<()> {
        Ok(self.inner.fit()?)
    }

    #[getter]
    pub fn coef(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.coef()?.to_vec())
    }

    #[getter]
    pub fn se(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.se()?.to_vec())
    }

    #[getter]
    pub fn pval(&self) -> PyResult<Vec<f64>> {
        Ok(self.inner.pval()?.to_vec())
    }

    #[pyo3(signature = (level = 0.95))]
    pub fn confint(&self, level: f64) -> PyResult<Vec<(f64, f64)>> {
        interval_rows(&self.inner, level)
    }
}

/// Module initializer of the `_rust_doubleml` extension.
///
/// Registers the `models` submodule and adds it to `sys.modules` so that
/// `rust_doubleml.models` imports work.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_doubleml<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let models_mod = PyModule::new(_py, "models")?;
    models_mod.add_class::<PLR>()?;
    models_mod.add_class::<IRM>()?;
    m.add_submodule(&models_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("rust_doubleml.models", models_mod)?;
    Ok(())
}
