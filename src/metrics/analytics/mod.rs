//! Reserve analytics.
//!
//! This module provides:
//! - Hyperbolic model fitting (CP/W', CMR/M')
//! - Reserve balance simulation (W' bal, M' bal)

pub mod balance;
pub mod critical_power;
pub mod error;
pub mod kind;

// Re-exports for convenience
pub use balance::{
    BalanceError, BalancePoint, BalanceSeries, BalanceSimulator, BalanceState, BalanceSummary,
    DepletionComparator, Regime, Sample, DEFAULT_TAU_SECS,
};
pub use critical_power::{FitError, FittedModel, HyperbolicFit, HyperbolicFitter, Trial};
pub use error::{AnalyticsError, AnalyticsResult};
pub use kind::ModelKind;
