//! Propensity trimming.
use ndarray::Array1;

use crate::estimation::errors::{DMLError, DMLResult};

/// Trimming — clamps propensity-type predictions to `[t, 1 − t]`.
///
/// Every denominator built from a trimmed prediction is bounded by
/// `1 / t` in magnitude. Clipping is logged at `warn` with the number of
/// affected predictions; it is the only silent adjustment the engine makes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trimming {
    threshold: f64,
}

impl Trimming {
    /// # Errors
    /// [`DMLError::InvalidParameter`] unless `0 < threshold < 0.5`.
    pub fn new(threshold: f64) -> DMLResult<Self> {
        if !(threshold > 0.0 && threshold < 0.5) {
            return Err(DMLError::InvalidParameter {
                name: "trimming_threshold",
                value: threshold,
                reason: format!(
                    "Invalid trimming_threshold {threshold}. trimming_threshold has to be between 0 and 0.5."
                ),
            });
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Clamp `values` to the trimming bounds, logging how many moved.
    pub fn clip(&self, role: &str, values: Array1<f64>) -> Array1<f64> {
        let (lo, hi) = (self.threshold, 1.0 - self.threshold);
        let mut clipped = 0usize;
        let out = values.mapv(|v| {
            if v < lo {
                clipped += 1;
                lo
            } else if v > hi {
                clipped += 1;
                hi
            } else {
                v
            }
        });
        if clipped > 0 {
            log::warn!(
                "trimmed {clipped} of {} predictions of {role} to [{lo}, {hi}]",
                out.len()
            );
        }
        out
    }
}

impl Default for Trimming {
    fn default() -> Self {
        Self { threshold: 1e-2 }
    }
}
