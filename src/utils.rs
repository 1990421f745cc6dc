//! Conversion helpers for the optional Python bindings.
#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    data::DMLData,
    estimation::DMLProcedure,
    learners::{ConstantClassifier, ConstantRegressor, Learner, LogisticClassifier, OlsRegressor},
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
};

#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Copy a numpy vector into the crate's `ndarray` type.
///
/// `numpy` may resolve to a different `ndarray` release than this crate, so
/// buffers are copied element-wise instead of through `to_owned`.
#[cfg(feature = "python-bindings")]
fn owned_vector(arr: &PyReadonlyArray1<'_, f64>) -> Array1<f64> {
    arr.as_array().iter().copied().collect()
}

#[cfg(feature = "python-bindings")]
fn owned_matrix(arr: &PyReadonlyArray2<'_, f64>) -> PyResult<Array2<f64>> {
    let view = arr.as_array();
    let (n_rows, n_cols) = view.dim();
    Array2::from_shape_vec((n_rows, n_cols), view.iter().copied().collect())
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// A 2-D float array, a pandas DataFrame, or a 1-D input read as one column.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<Array2<f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray2<f64>>() {
        return owned_matrix(&arr_ro);
    }
    if let Ok(obj) = raw_data.call_method("to_numpy", (), None) {
        if let Ok(frame_ro) = obj.extract::<PyReadonlyArray2<f64>>() {
            return owned_matrix(&frame_ro);
        }
    }
    if let Ok(rows) = raw_data.extract::<Vec<Vec<f64>>>() {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != n_cols) {
            return Err(PyValueError::new_err("all rows must have the same number of columns"));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        return Array2::from_shape_vec((n_rows, n_cols), flat)
            .map_err(|e| PyValueError::new_err(e.to_string()));
    }
    let values = owned_vector(&extract_f64_array(py, raw_data)?);
    let n = values.len();
    values
        .into_shape((n, 1))
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

#[cfg(feature = "python-bindings")]
pub fn extract_dml_data<'py>(
    py: Python<'py>, y: &Bound<'py, PyAny>, d: &Bound<'py, PyAny>, x: &Bound<'py, PyAny>,
) -> PyResult<DMLData> {
    let y_vec = owned_vector(&extract_f64_array(py, y)?);
    let d_mat = extract_f64_matrix(py, d)?;
    let x_mat = extract_f64_matrix(py, x)?;
    DMLData::from_arrays(y_vec, d_mat, x_mat).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Built-in learner by name: `"ols"`, `"ridge"`, `"logistic"` or `"mean"`.
///
/// `"mean"` is the constant-mean regressor, or the class-prior classifier
/// when `classifier` is set.
#[cfg(feature = "python-bindings")]
pub fn learner_by_name(name: &str, classifier: bool) -> PyResult<Box<dyn Learner>> {
    let learner: Box<dyn Learner> = match (name.to_lowercase().as_str(), classifier) {
        ("ols" | "linear", _) => Box::new(OlsRegressor::new()),
        ("ridge", _) => Box::new(
            OlsRegressor::ridge(1.0).map_err(|e| PyValueError::new_err(e.to_string()))?,
        ),
        ("logistic" | "logit", _) => Box::new(LogisticClassifier::new()),
        ("mean" | "constant", false) => Box::new(ConstantRegressor::mean()),
        ("mean" | "constant" | "prior", true) => Box::new(ConstantClassifier::prior()),
        (other, _) => {
            return Err(PyValueError::new_err(format!(
                "invalid learner {:?} (expected 'ols', 'ridge', 'logistic', or 'mean')",
                other
            )));
        }
    };
    Ok(learner)
}

#[cfg(feature = "python-bindings")]
pub fn extract_procedure(name: Option<&str>) -> PyResult<DMLProcedure> {
    match name.unwrap_or("dml2").to_lowercase().as_str() {
        "dml1" => Ok(DMLProcedure::Dml1),
        "dml2" => Ok(DMLProcedure::Dml2),
        other => Err(PyValueError::new_err(format!(
            "invalid dml_procedure {:?} (expected 'dml1' or 'dml2')",
            other
        ))),
    }
}
