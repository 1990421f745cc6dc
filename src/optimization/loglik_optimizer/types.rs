//! loglik_optimizer::types — numeric aliases and solver wiring.
//!
//! Every optimizer module refers to these aliases instead of naming
//! `ndarray` or argmin generics directly, so a backend bump touches one
//! file.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::Array1;
use std::collections::HashMap;

/// Coefficient vector being optimized (e.g. logistic weights and intercept).
pub type Theta = Array1<f64>;

/// Gradient of the objective, same length as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective value.
pub type Cost = f64;

/// Function-evaluation counters reported by argmin (`"cost_count"`, ...).
pub type FnEvalMap = HashMap<String, u64>;

/// Default L-BFGS history size.
pub const DEFAULT_LBFGS_MEM: usize = 7;

pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
