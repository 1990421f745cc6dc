//! The estimation dataset and its column bookkeeping.
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, concatenate};

use crate::data::{
    context::TreatmentContext,
    errors::{DataError, DataResult},
    validation::{
        check_disjoint, check_finite_1d, check_finite_2d, check_names, check_rows, check_unique,
        cluster_ids_from_f64,
    },
};

/// DMLData — outcome, treatments, covariates and optional design columns.
///
/// Purpose
/// -------
/// Hold the row-aligned arrays an estimator reads, together with their
/// column names, and guarantee on construction that shapes agree, values
/// are finite and no column plays two roles.
///
/// Fields
/// ------
/// - `y`: outcome, length `n`.
/// - `d`: treatments, `n × n_treat`.
/// - `x`: covariates, `n × p` (may have zero columns).
/// - `z`: optional instruments, `n × n_instr`.
/// - `clusters`: optional integer cluster ids, `n × n_cluster_vars`.
/// - `s`: optional running variable for regression discontinuity designs.
/// - `use_other_treat_as_covariate`: when several treatments are present,
///   append the non-selected ones to the covariates of each treatment
///   context (default `true`).
///
/// Invariants
/// ----------
/// - `n ≥ 1`, `n_treat ≥ 1`.
/// - Every block has `n` rows and only finite values.
/// - Column names are unique and the role sets (outcome, treatment,
///   covariate, instrument, cluster, score) are pairwise disjoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DMLData {
    y: Array1<f64>,
    d: Array2<f64>,
    x: Array2<f64>,
    z: Option<Array2<f64>>,
    clusters: Option<Array2<i64>>,
    s: Option<Array1<f64>>,
    y_col: String,
    d_cols: Vec<String>,
    x_cols: Vec<String>,
    z_cols: Vec<String>,
    cluster_cols: Vec<String>,
    s_col: Option<String>,
    use_other_treat_as_covariate: bool,
}

/// Role assignment for [`DMLData::from_columns`].
///
/// `x_cols = None` means "every column not claimed by another role".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnRoles {
    pub y_col: String,
    pub d_cols: Vec<String>,
    pub x_cols: Option<Vec<String>>,
    pub z_cols: Vec<String>,
    pub cluster_cols: Vec<String>,
    pub s_col: Option<String>,
}

impl ColumnRoles {
    pub fn new(y_col: &str, d_cols: &[&str]) -> Self {
        Self {
            y_col: y_col.to_string(),
            d_cols: d_cols.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn x_cols(mut self, cols: &[&str]) -> Self {
        self.x_cols = Some(cols.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn z_cols(mut self, cols: &[&str]) -> Self {
        self.z_cols = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn cluster_cols(mut self, cols: &[&str]) -> Self {
        self.cluster_cols = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn s_col(mut self, col: &str) -> Self {
        self.s_col = Some(col.to_string());
        self
    }
}

fn default_names(prefix: &str, k: usize) -> Vec<String> {
    (1..=k).map(|j| format!("{prefix}{j}")).collect()
}

impl DMLData {
    /// Build a dataset from arrays with default names (`y`, `d1..`, `X1..`).
    ///
    /// # Errors
    /// - [`DataError::NoObservations`] / [`DataError::NoTreatment`] for empty
    ///   inputs.
    /// - [`DataError::LengthMismatch`] when row counts differ.
    /// - [`DataError::NonFiniteValue`] for NaN or infinite entries.
    pub fn from_arrays(y: Array1<f64>, d: Array2<f64>, x: Array2<f64>) -> DataResult<Self> {
        let d_cols = default_names("d", d.ncols());
        let x_cols = default_names("X", x.ncols());
        let data = Self {
            y,
            d,
            x,
            z: None,
            clusters: None,
            s: None,
            y_col: "y".to_string(),
            d_cols,
            x_cols,
            z_cols: Vec::new(),
            cluster_cols: Vec::new(),
            s_col: None,
            use_other_treat_as_covariate: true,
        };
        data.validate()?;
        Ok(data)
    }

    /// Attach instruments named `z1..`.
    pub fn with_instruments(mut self, z: Array2<f64>) -> DataResult<Self> {
        self.z_cols = default_names("z", z.ncols());
        self.z = Some(z);
        self.validate()?;
        Ok(self)
    }

    /// Attach integer cluster ids named `cluster1..`, one column per
    /// clustering dimension.
    pub fn with_clusters(mut self, clusters: Array2<i64>) -> DataResult<Self> {
        self.cluster_cols = default_names("cluster", clusters.ncols());
        self.clusters = Some(clusters);
        self.validate()?;
        Ok(self)
    }

    /// Attach the running variable `s` of a discontinuity design.
    pub fn with_score_variable(mut self, s: Array1<f64>) -> DataResult<Self> {
        self.s_col = Some("s".to_string());
        self.s = Some(s);
        self.validate()?;
        Ok(self)
    }

    /// Toggle appending the other treatments to each treatment's covariates.
    pub fn with_other_treat_as_covariate(mut self, flag: bool) -> Self {
        self.use_other_treat_as_covariate = flag;
        self
    }

    /// Build a dataset from named columns.
    ///
    /// Parameters
    /// ----------
    /// - `columns`: `(name, values)` pairs, all of equal length.
    /// - `roles`: which names play which role. When `roles.x_cols` is
    ///   `None`, every remaining column becomes a covariate in input order.
    ///
    /// Errors
    /// ------
    /// - [`DataError::DuplicateColumn`] for repeated names in `columns`.
    /// - [`DataError::UnknownColumn`] when a role names a missing column.
    /// - [`DataError::OverlappingRoles`] when a column is claimed twice.
    /// - Any shape or finiteness error of [`DMLData::from_arrays`].
    pub fn from_columns(
        columns: Vec<(String, Array1<f64>)>, roles: &ColumnRoles,
    ) -> DataResult<Self> {
        check_unique(columns.iter().map(|(n, _)| n))?;
        let s_cols: Vec<String> = roles.s_col.iter().cloned().collect();
        let y_cols = vec![roles.y_col.clone()];
        let x_cols: Vec<String> = match &roles.x_cols {
            Some(cols) => cols.clone(),
            None => columns
                .iter()
                .map(|(n, _)| n.clone())
                .filter(|n| {
                    *n != roles.y_col
                        && !roles.d_cols.contains(n)
                        && !roles.z_cols.contains(n)
                        && !roles.cluster_cols.contains(n)
                        && !s_cols.contains(n)
                })
                .collect(),
        };
        check_disjoint(&[
            ("outcome", y_cols.as_slice()),
            ("treatment", roles.d_cols.as_slice()),
            ("covariate", x_cols.as_slice()),
            ("instrument", roles.z_cols.as_slice()),
            ("cluster", roles.cluster_cols.as_slice()),
            ("score", s_cols.as_slice()),
        ])?;

        let n_obs = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let lookup = |name: &String| -> DataResult<ArrayView1<f64>> {
            columns
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.view())
                .ok_or_else(|| DataError::UnknownColumn { name: name.clone() })
        };
        let stack = |names: &[String]| -> DataResult<Array2<f64>> {
            let mut block = Array2::<f64>::zeros((n_obs, names.len()));
            for (j, name) in names.iter().enumerate() {
                let col = lookup(name)?;
                check_rows("column", n_obs, col.len())?;
                block.column_mut(j).assign(&col);
            }
            Ok(block)
        };

        let y = lookup(&roles.y_col)?.to_owned();
        let mut data = Self::from_arrays(y, stack(&roles.d_cols)?, stack(&x_cols)?)?;
        data.y_col = roles.y_col.clone();
        data.d_cols = roles.d_cols.clone();
        data.x_cols = x_cols;
        if !roles.z_cols.is_empty() {
            data.z = Some(stack(&roles.z_cols)?);
            data.z_cols = roles.z_cols.clone();
        }
        if !roles.cluster_cols.is_empty() {
            let raw = stack(&roles.cluster_cols)?;
            data.clusters = Some(cluster_ids_from_f64(&roles.cluster_cols, raw.view())?);
            data.cluster_cols = roles.cluster_cols.clone();
        }
        if let Some(s_col) = &roles.s_col {
            data.s = Some(lookup(s_col)?.to_owned());
            data.s_col = Some(s_col.clone());
        }
        data.validate()?;
        Ok(data)
    }

    fn validate(&self) -> DataResult<()> {
        let n = self.y.len();
        if n == 0 {
            return Err(DataError::NoObservations);
        }
        if self.d.ncols() == 0 {
            return Err(DataError::NoTreatment);
        }
        check_finite_1d(&self.y_col, self.y.view())?;
        check_rows("treatment matrix", n, self.d.nrows())?;
        check_names("treatment", &self.d_cols, self.d.ncols())?;
        check_finite_2d(&self.d_cols, self.d.view())?;
        check_rows("covariate matrix", n, self.x.nrows())?;
        check_names("covariate", &self.x_cols, self.x.ncols())?;
        check_finite_2d(&self.x_cols, self.x.view())?;
        if let Some(z) = &self.z {
            check_rows("instrument matrix", n, z.nrows())?;
            check_names("instrument", &self.z_cols, z.ncols())?;
            check_finite_2d(&self.z_cols, z.view())?;
        }
        if let Some(c) = &self.clusters {
            check_rows("cluster matrix", n, c.nrows())?;
            check_names("cluster", &self.cluster_cols, c.ncols())?;
        }
        if let Some(s) = &self.s {
            check_rows("score variable", n, s.len())?;
            check_finite_1d(self.s_col.as_deref().unwrap_or("s"), s.view())?;
        }
        let y_cols = [self.y_col.clone()];
        let s_cols: Vec<String> = self.s_col.iter().cloned().collect();
        check_unique(
            y_cols
                .iter()
                .chain(&self.d_cols)
                .chain(&self.x_cols)
                .chain(&self.z_cols)
                .chain(&self.cluster_cols)
                .chain(&s_cols),
        )?;
        check_disjoint(&[
            ("outcome", &y_cols[..]),
            ("treatment", &self.d_cols[..]),
            ("covariate", &self.x_cols[..]),
            ("instrument", &self.z_cols[..]),
            ("cluster", &self.cluster_cols[..]),
            ("score", &s_cols[..]),
        ])
    }

    // ---- Accessors ----

    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    pub fn n_treat(&self) -> usize {
        self.d.ncols()
    }

    pub fn n_covariates(&self) -> usize {
        self.x.ncols()
    }

    pub fn n_instr(&self) -> usize {
        self.z.as_ref().map_or(0, |z| z.ncols())
    }

    pub fn n_cluster_vars(&self) -> usize {
        self.clusters.as_ref().map_or(0, |c| c.ncols())
    }

    pub fn outcome(&self) -> ArrayView1<'_, f64> {
        self.y.view()
    }

    /// Treatment column `idx`.
    ///
    /// # Errors
    /// [`DataError::TreatmentIndexOutOfRange`] for `idx ≥ n_treat`.
    pub fn treatment(&self, idx: usize) -> DataResult<ArrayView1<'_, f64>> {
        if idx >= self.n_treat() {
            return Err(DataError::TreatmentIndexOutOfRange { index: idx, n_treat: self.n_treat() });
        }
        Ok(self.d.column(idx))
    }

    pub fn treatments(&self) -> ArrayView2<'_, f64> {
        self.d.view()
    }

    pub fn covariates(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    /// Instruments, or `None` when the design has none.
    pub fn instruments(&self) -> Option<ArrayView2<'_, f64>> {
        self.z.as_ref().map(|z| z.view())
    }

    pub fn cluster_ids(&self) -> Option<ArrayView2<'_, i64>> {
        self.clusters.as_ref().map(|c| c.view())
    }

    pub fn score_var(&self) -> Option<ArrayView1<'_, f64>> {
        self.s.as_ref().map(|s| s.view())
    }

    pub fn y_col(&self) -> &str {
        &self.y_col
    }

    pub fn d_cols(&self) -> &[String] {
        &self.d_cols
    }

    pub fn x_cols(&self) -> &[String] {
        &self.x_cols
    }

    pub fn z_cols(&self) -> &[String] {
        &self.z_cols
    }

    pub fn use_other_treat_as_covariate(&self) -> bool {
        self.use_other_treat_as_covariate
    }

    /// treatment_context — explicit slices for estimating treatment `idx`.
    ///
    /// Returns
    /// -------
    /// A [`TreatmentContext`] with the selected treatment column and the
    /// covariate block for its nuisance models. With
    /// `use_other_treat_as_covariate` and more than one treatment, the
    /// other treatment columns are appended to `x` in their original order.
    ///
    /// Errors
    /// ------
    /// - [`DataError::TreatmentIndexOutOfRange`] for an invalid `idx`.
    pub fn treatment_context(&self, idx: usize) -> DataResult<TreatmentContext> {
        let d = self.treatment(idx)?.to_owned();
        let x = if self.use_other_treat_as_covariate && self.n_treat() > 1 {
            let others: Vec<usize> = (0..self.n_treat()).filter(|&j| j != idx).collect();
            let other_d = self.d.select(Axis(1), &others);
            concatenate(Axis(1), &[self.x.view(), other_d.view()])
                .map_err(|e| DataError::Shape { reason: e.to_string() })?
        } else {
            self.x.clone()
        };
        Ok(TreatmentContext { treat_idx: idx, name: self.d_cols[idx].clone(), d, x })
    }
}
