//! Physiological signal the hyperbolic model is applied to.

use serde::{Deserialize, Serialize};

use super::balance::DepletionComparator;

/// Which rate signal a model describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Power output: Critical Power and W'.
    #[default]
    Power,
    /// Muscle deoxygenation rate: Critical Metabolic Rate and M'.
    Oxygenation,
}

impl ModelKind {
    /// Comparator that selects the depletion regime for this signal.
    ///
    /// Deoxygenation is negative, so the reserve drains when the rate falls
    /// below the threshold.
    pub fn default_comparator(&self) -> DepletionComparator {
        match self {
            Self::Power => DepletionComparator::GreaterThan,
            Self::Oxygenation => DepletionComparator::LessThan,
        }
    }

    /// Short name of the threshold rate.
    pub fn asymptote_label(&self) -> &'static str {
        match self {
            Self::Power => "CP",
            Self::Oxygenation => "CMR",
        }
    }

    /// Short name of the reserve.
    pub fn capacity_label(&self) -> &'static str {
        match self {
            Self::Power => "W'",
            Self::Oxygenation => "M'",
        }
    }

    /// Unit of the rate signal.
    pub fn rate_unit(&self) -> &'static str {
        match self {
            Self::Power => "W",
            Self::Oxygenation => "%/s",
        }
    }

    /// Unit of the reserve.
    pub fn capacity_unit(&self) -> &'static str {
        match self {
            Self::Power => "J",
            Self::Oxygenation => "%",
        }
    }

    /// Zero-based CSV column holding the rate in a raw workout export.
    ///
    /// Power files are `time,power`; oxygenation files are
    /// `time,SmO2,SmO2_accel,...` and the model runs on the SmO2 acceleration.
    pub fn default_rate_column(&self) -> usize {
        match self {
            Self::Power => 1,
            Self::Oxygenation => 2,
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::Power => write!(f, "power"),
            ModelKind::Oxygenation => write!(f, "oxygenation"),
        }
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "power" | "cp" => Ok(Self::Power),
            "oxygenation" | "smo2" | "cmr" => Ok(Self::Oxygenation),
            other => Err(format!("unknown model kind: {other}")),
        }
    }
}
