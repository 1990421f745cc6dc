//! DML options — configuration of cross-fitting, solving and trimming.
//!
//! Purpose
//! -------
//! Collect every estimator-level knob in one validated struct so the engine
//! receives explicit settings instead of loose arguments.
//!
//! Key behaviors
//! -------------
//! - [`DMLOptions::default`] reproduces the usual DoubleML setup: five
//!   folds, one repetition, DML2, trimming at `1e-2`.
//! - [`DMLOptions::validate`] checks ranges once, before any fitting.
//!
//! Conventions
//! -----------
//! - `seed` is the only source of randomness; fold draws, half splits and
//!   bootstrap streams are derived from it.
use crate::{
    estimation::errors::{DMLError, DMLResult},
    optimization::root_finding::RootOptions,
    scores::Trimming,
};

/// How fold-level score sums are combined into `θ̂`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DMLProcedure {
    /// Solve the moment within each fold and average the fold estimates.
    Dml1,
    /// Solve the moment once on the pooled out-of-fold scores.
    #[default]
    Dml2,
}

/// DMLOptions — estimator configuration.
///
/// Fields
/// ------
/// - `n_folds`: cross-fitting folds `K ≥ 2` (default 5).
/// - `n_rep`: independent sample splits (default 1).
/// - `procedure`: [`DMLProcedure`] (default DML2).
/// - `trimming_threshold`: propensity clipping level in `(0, 0.5)`.
/// - `seed`: base seed for every random stream (default 42).
/// - `parallel`: run repetitions on the rayon pool.
/// - `stratify`: stratify folds by the first treatment column.
/// - `root`: bracketed root-finder settings for nonlinear scores.
/// - `max_refit_rounds`: outer rounds re-fitting `θ`-dependent nuisances at
///   the current root (0 disables refitting).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DMLOptions {
    pub n_folds: usize,
    pub n_rep: usize,
    pub procedure: DMLProcedure,
    pub trimming_threshold: f64,
    pub seed: u64,
    pub parallel: bool,
    pub stratify: bool,
    pub root: RootOptions,
    pub max_refit_rounds: usize,
}

impl Default for DMLOptions {
    fn default() -> Self {
        Self {
            n_folds: 5,
            n_rep: 1,
            procedure: DMLProcedure::Dml2,
            trimming_threshold: 1e-2,
            seed: 42,
            parallel: false,
            stratify: false,
            root: RootOptions::default(),
            max_refit_rounds: 0,
        }
    }
}

impl DMLOptions {
    /// Defaults with the given fold and repetition counts.
    ///
    /// # Errors
    /// As [`validate`](Self::validate).
    pub fn new(n_folds: usize, n_rep: usize) -> DMLResult<Self> {
        let opts = Self { n_folds, n_rep, ..Self::default() };
        opts.validate()?;
        Ok(opts)
    }

    pub fn with_procedure(mut self, procedure: DMLProcedure) -> Self {
        self.procedure = procedure;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_trimming(mut self, threshold: f64) -> DMLResult<Self> {
        Trimming::new(threshold)?;
        self.trimming_threshold = threshold;
        Ok(self)
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn stratified(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    pub fn with_refit_rounds(mut self, rounds: usize) -> Self {
        self.max_refit_rounds = rounds;
        self
    }

    /// Check ranges of every field.
    ///
    /// Errors
    /// ------
    /// - [`DMLError::InvalidParameter`] for `n_folds < 2`, `n_rep = 0`, a
    ///   trimming threshold outside `(0, 0.5)`, or invalid root options.
    pub fn validate(&self) -> DMLResult<()> {
        if self.n_folds < 2 {
            return Err(DMLError::InvalidParameter {
                name: "n_folds",
                value: self.n_folds as f64,
                reason: format!(
                    "The number of folds must be larger than or equal to 2. {} was passed.",
                    self.n_folds
                ),
            });
        }
        if self.n_rep == 0 {
            return Err(DMLError::InvalidParameter {
                name: "n_rep",
                value: 0.0,
                reason: "The number of repetitions for the sample splitting must be larger than or equal to 1. 0 was passed.".to_string(),
            });
        }
        self.trimming()?;
        RootOptions::new(self.root.tol, self.root.max_iter)?;
        Ok(())
    }

    pub(crate) fn trimming(&self) -> DMLResult<Trimming> {
        Trimming::new(self.trimming_threshold)
    }
}
