//! Lifecycle of a [`DoubleML`](super::DoubleML) estimator.

/// Estimator state.
///
/// `fit` walks `Split → NuisanceFitted → Scored → Solved → Aggregated`
/// across all repetitions at once; any error moves to `Failed`. A new fit
/// may start from `Split`, `Aggregated` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EstimatorState {
    #[default]
    Unfit,
    Split,
    NuisanceFitted,
    Scored,
    Solved,
    Aggregated,
    Failed,
}

impl EstimatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorState::Unfit => "Unfit",
            EstimatorState::Split => "Split",
            EstimatorState::NuisanceFitted => "NuisanceFitted",
            EstimatorState::Scored => "Scored",
            EstimatorState::Solved => "Solved",
            EstimatorState::Aggregated => "Aggregated",
            EstimatorState::Failed => "Failed",
        }
    }

    /// Whether `fit` may be called.
    pub fn can_fit(&self) -> bool {
        matches!(
            self,
            EstimatorState::Unfit
                | EstimatorState::Split
                | EstimatorState::Aggregated
                | EstimatorState::Failed
        )
    }

    pub fn is_fitted(&self) -> bool {
        *self == EstimatorState::Aggregated
    }
}

impl std::fmt::Display for EstimatorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
