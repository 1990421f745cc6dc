//! Validation helpers for the data container.
//!
//! Each helper checks one invariant and returns the first violation as a
//! [`DataError`]: row counts, finiteness, integral cluster ids, name
//! uniqueness and pairwise-disjoint column roles.
use std::collections::HashSet;

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::data::errors::{DataError, DataResult};

/// Row count of a block must equal `n_obs`.
pub fn check_rows(what: &'static str, n_obs: usize, found: usize) -> DataResult<()> {
    if found != n_obs {
        return Err(DataError::LengthMismatch { what, expected: n_obs, found });
    }
    Ok(())
}

/// Number of supplied names must equal the column count of the block.
pub fn check_names(what: &'static str, names: &[String], columns: usize) -> DataResult<()> {
    if names.len() != columns {
        return Err(DataError::ColumnCountMismatch { what, names: names.len(), columns });
    }
    Ok(())
}

/// Every entry of a single column must be finite.
pub fn check_finite_1d(column: &str, values: ArrayView1<f64>) -> DataResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(row) => Err(DataError::NonFiniteValue {
            column: column.to_string(),
            row,
            value: values[row],
        }),
        None => Ok(()),
    }
}

/// Every entry of a block must be finite; `names[j]` labels column `j`.
pub fn check_finite_2d(names: &[String], values: ArrayView2<f64>) -> DataResult<()> {
    for (j, col) in values.columns().into_iter().enumerate() {
        check_finite_1d(&names[j], col)?;
    }
    Ok(())
}

/// `2^63`: the smallest float above `i64::MAX`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Convert floating cluster ids to integers, rejecting fractional values
/// and values an `i64` cannot hold.
pub fn cluster_ids_from_f64(
    names: &[String], values: ArrayView2<f64>,
) -> DataResult<Array2<i64>> {
    let mut out = Array2::<i64>::zeros(values.raw_dim());
    for ((row, col), &v) in values.indexed_iter() {
        if !v.is_finite() || v.fract() != 0.0 {
            return Err(DataError::NonIntegerClusterId {
                column: names[col].clone(),
                row,
                value: v,
            });
        }
        if !(-I64_BOUND..I64_BOUND).contains(&v) {
            return Err(DataError::ClusterIdOutOfRange {
                column: names[col].clone(),
                row,
                value: v,
            });
        }
        out[[row, col]] = v as i64;
    }
    Ok(out)
}

/// Names must be unique across the whole dataset.
pub fn check_unique<'a, I: IntoIterator<Item = &'a String>>(names: I) -> DataResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(DataError::DuplicateColumn { name: name.clone() });
        }
    }
    Ok(())
}

/// Column roles must be pairwise disjoint.
///
/// `roles` pairs a role label with the names assigned to it; the first
/// name found in two roles is reported together with both labels.
pub fn check_disjoint(roles: &[(&'static str, &[String])]) -> DataResult<()> {
    for (i, &(first, a)) in roles.iter().enumerate() {
        for &(second, b) in roles.iter().skip(i + 1) {
            if let Some(name) = a.iter().find(|n| b.contains(n)) {
                return Err(DataError::OverlappingRoles {
                    name: name.clone(),
                    first,
                    second,
                });
            }
        }
    }
    Ok(())
}

/// `true` when every value is exactly 0 or 1.
pub fn is_binary(values: ArrayView1<f64>) -> bool {
    values.iter().all(|&v| v == 0.0 || v == 1.0)
}
