//! Reserve balance (W' bal / M' bal) simulation.
//!
//! The reserve starts full at the first sample and is folded forward one
//! sample at a time:
//! - Depletion: while the rate is beyond the asymptote the reserve drains
//!   linearly, `balance - |rate - asymptote| * dt`
//! - Recovery: otherwise it relaxes exponentially back toward capacity,
//!   `balance + (capacity - balance) * (1 - exp(-dt / tau))`
//!
//! After every step the balance is clamped to `[0, capacity]`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::critical_power::FittedModel;
use super::kind::ModelKind;

/// Default recovery time constant in seconds.
pub const DEFAULT_TAU_SECS: f64 = 300.0;

/// Direction in which the rate has to cross the asymptote to drain the reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepletionComparator {
    /// Deplete while `rate > asymptote` (power).
    #[default]
    GreaterThan,
    /// Deplete while `rate < asymptote` (deoxygenation).
    LessThan,
}

impl DepletionComparator {
    /// Whether the rate is in the depletion regime.
    pub fn is_depleting(&self, rate: f64, asymptote: f64) -> bool {
        match self {
            Self::GreaterThan => rate > asymptote,
            Self::LessThan => rate < asymptote,
        }
    }

    /// How far past the asymptote the rate is, in the depleting direction.
    pub fn excess(&self, rate: f64, asymptote: f64) -> f64 {
        match self {
            Self::GreaterThan => rate - asymptote,
            Self::LessThan => asymptote - rate,
        }
    }
}

impl std::fmt::Display for DepletionComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DepletionComparator::GreaterThan => write!(f, "greater-than"),
            DepletionComparator::LessThan => write!(f, "less-than"),
        }
    }
}

impl std::str::FromStr for DepletionComparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greater-than" | "gt" | ">" => Ok(Self::GreaterThan),
            "less-than" | "lt" | "<" => Ok(Self::LessThan),
            other => Err(format!("unknown depletion comparator: {other}")),
        }
    }
}

/// One rate reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds since the start of the workout.
    pub timestamp: f64,
    /// Instantaneous (or smoothed) rate.
    pub rate: f64,
}

impl Sample {
    /// Create a sample.
    pub fn new(timestamp: f64, rate: f64) -> Self {
        Self { timestamp, rate }
    }
}

/// Update law applied on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    /// Linear drain beyond the asymptote.
    Depletion,
    /// Exponential reconstitution toward capacity.
    Recovery,
}

/// Balance simulation errors.
#[derive(Debug, Error, PartialEq)]
pub enum BalanceError {
    /// Timestamps went backwards.
    #[error("timestamps not ascending at index {index} ({current} < {previous})")]
    OutOfOrderInput {
        index: usize,
        previous: f64,
        current: f64,
    },

    /// No samples to simulate.
    #[error("sample series is empty")]
    EmptySeries,

    /// Model parameters cannot describe a reserve.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Recovery time constant is not a positive finite number.
    #[error("invalid recovery time constant: {0}")]
    InvalidTimeConstant(f64),

    /// A timestamp or rate is NaN or infinite.
    #[error("non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    /// A single step went backwards in time or had a non-finite input.
    #[error("invalid step of {dt}s at rate {rate}")]
    InvalidStep { dt: f64, rate: f64 },
}

/// Balance simulator for one fitted model.
#[derive(Debug, Clone, Copy)]
pub struct BalanceSimulator {
    model: FittedModel,
    tau_secs: f64,
    comparator: DepletionComparator,
}

impl BalanceSimulator {
    /// Create a simulator with the default time constant and power polarity.
    pub fn new(model: FittedModel) -> Result<Self, BalanceError> {
        if !model.asymptote.is_finite() {
            return Err(BalanceError::InvalidModel(format!(
                "asymptote must be finite, got {}",
                model.asymptote
            )));
        }
        if !model.capacity.is_finite() || model.capacity <= 0.0 {
            return Err(BalanceError::InvalidModel(format!(
                "capacity must be positive and finite, got {}",
                model.capacity
            )));
        }

        Ok(Self {
            model,
            tau_secs: DEFAULT_TAU_SECS,
            comparator: DepletionComparator::default(),
        })
    }

    /// Create a simulator for a fitted model of the given kind.
    ///
    /// The reserve sign and the depletion comparator follow the kind.
    pub fn for_kind(model: FittedModel, kind: ModelKind) -> Result<Self, BalanceError> {
        Ok(Self::new(model.reserve_for(kind))?.with_comparator(kind.default_comparator()))
    }

    /// Set the recovery time constant.
    pub fn with_tau(mut self, tau_secs: f64) -> Result<Self, BalanceError> {
        if !tau_secs.is_finite() || tau_secs <= 0.0 {
            return Err(BalanceError::InvalidTimeConstant(tau_secs));
        }
        self.tau_secs = tau_secs;
        Ok(self)
    }

    /// Set the depletion comparator.
    pub fn with_comparator(mut self, comparator: DepletionComparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// Model parameters in use.
    pub fn model(&self) -> FittedModel {
        self.model
    }

    /// Recovery time constant in seconds.
    pub fn tau_secs(&self) -> f64 {
        self.tau_secs
    }

    /// Depletion comparator in use.
    pub fn comparator(&self) -> DepletionComparator {
        self.comparator
    }

    /// Fresh state with a full reserve.
    pub fn start(&self) -> BalanceState {
        BalanceState {
            balance: self.model.capacity,
            simulator: *self,
        }
    }

    /// Run the simulation over a whole series.
    ///
    /// The series is validated up front, so an error never leaves partial output.
    pub fn simulate(&self, samples: &[Sample]) -> Result<BalanceSeries, BalanceError> {
        validate_series(samples)?;

        debug!(
            samples = samples.len(),
            asymptote = self.model.asymptote,
            capacity = self.model.capacity,
            tau = self.tau_secs,
            comparator = %self.comparator,
            "simulating reserve balance"
        );

        let mut state = self.start();
        let mut points = Vec::with_capacity(samples.len());
        let mut previous: Option<f64> = None;

        for sample in samples {
            let regime = match previous {
                Some(prev) => state.step(sample.timestamp - prev, sample.rate)?,
                None => None,
            };
            previous = Some(sample.timestamp);

            points.push(BalancePoint {
                timestamp: sample.timestamp,
                rate: sample.rate,
                balance: state.balance(),
                regime,
            });
        }

        Ok(BalanceSeries {
            capacity: self.model.capacity,
            points,
        })
    }
}

fn validate_series(samples: &[Sample]) -> Result<(), BalanceError> {
    if samples.is_empty() {
        return Err(BalanceError::EmptySeries);
    }

    for (index, sample) in samples.iter().enumerate() {
        if !sample.timestamp.is_finite() || !sample.rate.is_finite() {
            return Err(BalanceError::NonFiniteSample { index });
        }
        if index > 0 {
            let previous = samples[index - 1].timestamp;
            if sample.timestamp < previous {
                return Err(BalanceError::OutOfOrderInput {
                    index,
                    previous,
                    current: sample.timestamp,
                });
            }
        }
    }

    Ok(())
}

/// Running reserve level.
#[derive(Debug, Clone, Copy)]
pub struct BalanceState {
    balance: f64,
    simulator: BalanceSimulator,
}

impl BalanceState {
    /// Current reserve, always within `[0, capacity]`.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Advance by `dt` seconds at `rate`.
    ///
    /// Returns the regime applied, or `None` when `dt` is zero and the balance
    /// is left unchanged. A negative or non-finite `dt`, or a non-finite rate,
    /// is rejected.
    pub fn step(&mut self, dt: f64, rate: f64) -> Result<Option<Regime>, BalanceError> {
        if !dt.is_finite() || dt < 0.0 || !rate.is_finite() {
            return Err(BalanceError::InvalidStep { dt, rate });
        }
        if dt == 0.0 {
            return Ok(None);
        }

        let BalanceSimulator {
            model,
            tau_secs,
            comparator,
        } = self.simulator;

        let (next, regime) = if comparator.is_depleting(rate, model.asymptote) {
            (
                self.balance - comparator.excess(rate, model.asymptote) * dt,
                Regime::Depletion,
            )
        } else {
            let recovered = (model.capacity - self.balance) * (1.0 - (-dt / tau_secs).exp());
            (self.balance + recovered, Regime::Recovery)
        };

        self.balance = next.clamp(0.0, model.capacity);
        Ok(Some(regime))
    }
}

/// Balance at one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    /// Sample timestamp in seconds.
    pub timestamp: f64,
    /// Rate the step was driven by.
    pub rate: f64,
    /// Reserve remaining after the step.
    pub balance: f64,
    /// Regime applied to reach this point (`None` for the first sample and zero-length steps).
    pub regime: Option<Regime>,
}

/// Reserve balance aligned 1:1 with the input samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSeries {
    capacity: f64,
    points: Vec<BalancePoint>,
}

impl BalanceSeries {
    /// Capacity the series was simulated against.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// All points in input order.
    pub fn points(&self) -> &[BalancePoint] {
        &self.points
    }

    /// Balance values only.
    pub fn balances(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.balance).collect()
    }

    /// Get the number of points in the series.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the series has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Summarise depletion over the workout.
    pub fn summary(&self) -> BalanceSummary {
        let mut summary = BalanceSummary {
            min_balance: self.capacity,
            min_balance_at: self.points.first().map_or(0.0, |p| p.timestamp),
            time_depleting_secs: 0.0,
            time_exhausted_secs: 0.0,
            final_balance: self.points.last().map_or(self.capacity, |p| p.balance),
        };

        for pair in self.points.windows(2) {
            let dt = pair[1].timestamp - pair[0].timestamp;
            if pair[1].regime == Some(Regime::Depletion) {
                summary.time_depleting_secs += dt;
            }
            if pair[1].balance <= 0.0 {
                summary.time_exhausted_secs += dt;
            }
        }

        for point in &self.points {
            if point.balance < summary.min_balance {
                summary.min_balance = point.balance;
                summary.min_balance_at = point.timestamp;
            }
        }

        summary
    }
}

/// Depletion statistics for a balance series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceSummary {
    /// Lowest reserve reached.
    pub min_balance: f64,
    /// Timestamp of the lowest reserve.
    pub min_balance_at: f64,
    /// Seconds spent in the depletion regime.
    pub time_depleting_secs: f64,
    /// Seconds spent with the reserve fully drained.
    pub time_exhausted_secs: f64,
    /// Reserve at the last sample.
    pub final_balance: f64,
}
