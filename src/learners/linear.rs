//! Ordinary least squares with an eigen-truncated pseudo-inverse.
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::{
    learners::{
        errors::{LearnerError, LearnerResult},
        traits::{Learner, check_training_shape},
    },
    optimization::numerical_stability::EIGEN_EPS,
};

/// OlsRegressor — least squares, optionally ridge-penalized.
///
/// Purpose
/// -------
/// Default regression learner for outcome and treatment nuisances. Solves
/// `(XᵀX + ridge·P) β = Xᵀy`, where `P` is the identity without the
/// intercept entry, through a symmetric eigendecomposition that drops
/// eigenvalues below `EIGEN_EPS · λ_max`. Collinear designs therefore get
/// the minimum-norm solution instead of an error.
///
/// Fields
/// ------
/// - `fit_intercept`: prepend a constant column (default `true`).
/// - `ridge`: non-negative L2 penalty on the slopes (default `0`).
#[derive(Debug, Clone, PartialEq)]
pub struct OlsRegressor {
    pub fit_intercept: bool,
    pub ridge: f64,
    coef: Option<Array1<f64>>,
}

impl Default for OlsRegressor {
    fn default() -> Self {
        Self { fit_intercept: true, ridge: 0.0, coef: None }
    }
}

impl OlsRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ridge-penalized variant.
    ///
    /// # Errors
    /// [`LearnerError::InvalidHyperparameter`] for a negative or non-finite
    /// penalty.
    pub fn ridge(alpha: f64) -> LearnerResult<Self> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(LearnerError::InvalidHyperparameter {
                learner: "ols".to_string(),
                name: "ridge",
                value: alpha,
                reason: "penalty must be finite and non-negative",
            });
        }
        Ok(Self { ridge: alpha, ..Self::default() })
    }

    pub fn without_intercept(mut self) -> Self {
        self.fit_intercept = false;
        self
    }

    /// Fitted coefficients, intercept first when present.
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coef.as_ref()
    }

    fn design(&self, x: &ArrayView2<f64>) -> Array2<f64> {
        if !self.fit_intercept {
            return x.to_owned();
        }
        let mut design = Array2::<f64>::ones((x.nrows(), x.ncols() + 1));
        design.slice_mut(ndarray::s![.., 1..]).assign(x);
        design
    }
}

impl Learner for OlsRegressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> LearnerResult<()> {
        check_training_shape(self.name(), &x, &y)?;
        let design = self.design(&x);
        let k = design.ncols();
        let mut gram = design.t().dot(&design);
        let offset = usize::from(self.fit_intercept);
        for j in offset..k {
            gram[[j, j]] += self.ridge;
        }
        let xty = design.t().dot(&y);
        self.coef = Some(pseudo_inverse_solve(&gram, &xty));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        let coef = self
            .coef
            .as_ref()
            .ok_or_else(|| LearnerError::NotFitted { learner: self.name().to_string() })?;
        let design = self.design(&x);
        if design.ncols() != coef.len() {
            return Err(LearnerError::FeatureCountMismatch {
                learner: self.name().to_string(),
                expected: coef.len() - usize::from(self.fit_intercept),
                found: x.ncols(),
            });
        }
        Ok(design.dot(coef))
    }

    fn clone_unfitted(&self) -> Box<dyn Learner> {
        Box::new(Self { coef: None, ..self.clone() })
    }

    fn name(&self) -> &str {
        "ols"
    }
}

/// Solve `A β = b` for symmetric positive semi-definite `A` via
/// `β = Σ_{λ_k > ε λ_max} q_k q_kᵀ b / λ_k`.
pub(crate) fn pseudo_inverse_solve(a: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let k = a.ncols();
    if k == 0 {
        return Array1::zeros(0);
    }
    let mut a_nalg = DMatrix::<f64>::zeros(k, k);
    fill_dmatrix(a, &mut a_nalg);
    let eigen = a_nalg.symmetric_eigen();
    let lambda_max = eigen.eigenvalues.iter().cloned().fold(0.0_f64, f64::max);
    let cutoff = EIGEN_EPS * lambda_max.max(1.0);
    let b_nalg = DVector::from_iterator(k, b.iter().cloned());
    let q = &eigen.eigenvectors;
    let mut beta = DVector::<f64>::zeros(k);
    for (j, &lambda) in eigen.eigenvalues.iter().enumerate() {
        if lambda > cutoff {
            let qj = q.column(j);
            beta += qj * (qj.dot(&b_nalg) / lambda);
        }
    }
    Array1::from_iter(beta.iter().cloned())
}

/// Copy a square `ndarray` matrix into a preallocated `DMatrix`.
pub(crate) fn fill_dmatrix(src: &Array2<f64>, dst: &mut DMatrix<f64>) {
    for j in 0..src.ncols() {
        for i in 0..src.nrows() {
            dst[(i, j)] = src[[i, j]];
        }
    }
}
