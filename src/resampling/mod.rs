//! resampling — cross-fitting fold generation and validation.
//!
//! Purpose
//! -------
//! Produce the repeated K-fold partitions that cross-fitting runs on, and
//! check caller-supplied partitions before they are used.
//!
//! Key behaviors
//! -------------
//! - [`SampleSplitter`] draws plain, stratified or cluster-level folds from
//!   an explicit seed, one derived generator per repetition.
//! - Multiway clustering yields the product of per-dimension folds; test
//!   sets still partition the sample while train sets exclude every
//!   cluster touching the test fold.
//! - [`SampleSplits::validate`] enforces full, non-overlapping test
//!   coverage and train/test disjointness.
//!
//! Conventions
//! -----------
//! - Index lists are sorted ascending.
//! - Repetition `r` seeds from `derive_seed(seed, r)`.

pub mod errors;
pub mod partition;
pub mod seeding;
pub mod splitter;

pub use self::errors::{ResamplingError, ResamplingResult};
pub use self::partition::{FoldPartition, FoldSplit, SampleSplits};
pub use self::seeding::{derive_seed, stream_rng};
pub use self::splitter::SampleSplitter;
