//! wbal - Critical Power and Reserve Balance Modeling
//!
//! Fits the hyperbolic rate-duration model (CP/W' for power, CMR/M' for muscle
//! deoxygenation) to timed exhaustion trials, then simulates how the finite
//! reserve depletes and recovers over a recorded workout.

pub mod metrics;
pub mod pipeline;
pub mod recording;
pub mod storage;

// Re-export commonly used types
pub use metrics::analytics::{
    AnalyticsError, AnalyticsResult, BalanceSeries, BalanceSimulator, FittedModel,
    HyperbolicFitter, ModelKind, Sample, Trial,
};
pub use pipeline::{BalancePipeline, PipelineOutput};
pub use storage::config::AppConfig;
