//! Per-treatment view of the dataset.
use ndarray::{Array1, Array2};

/// TreatmentContext — the slices used to estimate one treatment effect.
///
/// Built by [`DMLData::treatment_context`](super::DMLData::treatment_context)
/// and passed by reference through nuisance fitting and score evaluation,
/// so no shared object ever carries an "active treatment" flag.
///
/// Fields
/// ------
/// - `treat_idx`: column index of the treatment in the dataset.
/// - `name`: treatment column name, used in summaries and logs.
/// - `d`: the treatment column, length `n`.
/// - `x`: covariates for this treatment's nuisance models; includes the
///   other treatments when the dataset requests it.
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentContext {
    pub treat_idx: usize,
    pub name: String,
    pub d: Array1<f64>,
    pub x: Array2<f64>,
}
