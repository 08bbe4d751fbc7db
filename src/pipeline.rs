//! Workout balance pipeline.
//!
//! Wires the optional smoothing stage in front of the balance simulator for
//! one model kind:
//! 1. Smooth the rate signal (rolling mean + backward fill), if configured
//! 2. Simulate the reserve balance against the model
//! 3. Summarise depletion

use tracing::info;

use crate::metrics::analytics::{
    AnalyticsResult, BalanceSeries, BalanceSimulator, BalanceSummary, FittedModel, ModelKind,
    Sample,
};
use crate::metrics::smoothing::SmoothingStage;
use crate::storage::config::AppConfig;

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Balance at every input sample.
    pub series: BalanceSeries,
    /// Whether the simulator ran on a smoothed signal.
    pub smoothed: bool,
    /// Depletion statistics.
    pub summary: BalanceSummary,
}

/// Smoothing followed by balance simulation.
#[derive(Debug, Clone)]
pub struct BalancePipeline {
    kind: ModelKind,
    smoothing: Option<SmoothingStage>,
    simulator: BalanceSimulator,
}

impl BalancePipeline {
    /// Create a pipeline from explicit parts.
    pub fn new(
        kind: ModelKind,
        smoothing: Option<SmoothingStage>,
        simulator: BalanceSimulator,
    ) -> Self {
        Self {
            kind,
            smoothing,
            simulator,
        }
    }

    /// Create a pipeline for a model of the given kind from configuration.
    pub fn from_config(
        config: &AppConfig,
        kind: ModelKind,
        model: FittedModel,
    ) -> AnalyticsResult<Self> {
        Ok(Self::new(
            kind,
            config.smoothing_for(kind),
            config.simulator_for(kind, model)?,
        ))
    }

    /// Replace the smoothing stage.
    pub fn with_smoothing(mut self, smoothing: Option<SmoothingStage>) -> Self {
        self.smoothing = smoothing;
        self
    }

    /// Simulator in use.
    pub fn simulator(&self) -> &BalanceSimulator {
        &self.simulator
    }

    /// Run over a workout.
    pub fn run(&self, samples: &[Sample]) -> AnalyticsResult<PipelineOutput> {
        let series = match &self.smoothing {
            Some(stage) => self.simulator.simulate(&stage.apply_to_samples(samples))?,
            None => self.simulator.simulate(samples)?,
        };
        let summary = series.summary();

        info!(
            kind = %self.kind,
            samples = series.len(),
            min_balance = summary.min_balance,
            min_balance_at = summary.min_balance_at,
            time_depleting_secs = summary.time_depleting_secs,
            time_exhausted_secs = summary.time_exhausted_secs,
            "{} balance simulated",
            self.kind.capacity_label()
        );

        Ok(PipelineOutput {
            series,
            smoothed: self.smoothing.is_some(),
            summary,
        })
    }
}
