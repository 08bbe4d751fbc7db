//! Metrics module for reserve modeling and signal preprocessing.

pub mod analytics;
pub mod smoothing;

pub use smoothing::{RollingAverage, SmoothingStage};

// Re-export key analytics types for convenience
pub use analytics::{
    BalanceError, BalanceSeries, BalanceSimulator, BalanceSummary, DepletionComparator,
    FitError, FittedModel, HyperbolicFit, HyperbolicFitter, ModelKind, Sample, Trial,
};
