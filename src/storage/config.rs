//! Application configuration.
//!
//! Settings are kept in a TOML file in the platform data directory. A missing
//! file means defaults; command line flags override individual values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::metrics::analytics::{
    BalanceError, BalanceSimulator, DepletionComparator, FittedModel, HyperbolicFitter, ModelKind,
    DEFAULT_TAU_SECS,
};
use crate::metrics::smoothing::{SmoothingStage, DEFAULT_WINDOW_SIZE};

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Solver settings
    pub fit: FitSettings,
    /// Balance simulation settings
    pub simulation: SimulationSettings,
    /// Smoothing settings
    pub smoothing: SmoothingSettings,
    /// Manually entered model parameters
    pub model: ModelSettings,
}

impl AppConfig {
    /// Fitter configured from the solver settings.
    pub fn fitter(&self) -> HyperbolicFitter {
        HyperbolicFitter::new()
            .with_max_iterations(self.fit.max_iterations)
            .with_tolerances(self.fit.ftol, self.fit.xtol)
    }

    /// Simulator for a model of the given kind.
    pub fn simulator_for(
        &self,
        kind: ModelKind,
        model: FittedModel,
    ) -> Result<BalanceSimulator, BalanceError> {
        let simulator =
            BalanceSimulator::for_kind(model, kind)?.with_tau(self.simulation.tau_secs)?;

        Ok(match self.simulation.comparator {
            Some(comparator) => simulator.with_comparator(comparator),
            None => simulator,
        })
    }

    /// Smoothing stage for the given kind, if enabled.
    pub fn smoothing_for(&self, kind: ModelKind) -> Option<SmoothingStage> {
        let enabled = match kind {
            ModelKind::Power => self.smoothing.enabled_for_power,
            ModelKind::Oxygenation => self.smoothing.enabled_for_oxygenation,
        };
        enabled.then(|| SmoothingStage::new(self.smoothing.window_size))
    }

    /// Operator-supplied model for the given kind.
    pub fn manual_model(&self, kind: ModelKind) -> Option<FittedModel> {
        match kind {
            ModelKind::Power => self.model.power,
            ModelKind::Oxygenation => self.model.oxygenation,
        }
    }
}

/// Solver-related settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    /// Iteration budget
    pub max_iterations: usize,
    /// Relative cost-reduction tolerance
    pub ftol: f64,
    /// Relative step tolerance
    pub xtol: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1.5e-8,
            xtol: 1.5e-8,
        }
    }
}

/// Balance simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Recovery time constant in seconds
    pub tau_secs: f64,
    /// Override of the per-kind depletion comparator
    pub comparator: Option<DepletionComparator>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tau_secs: DEFAULT_TAU_SECS,
            comparator: None,
        }
    }
}

/// Smoothing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingSettings {
    /// Rolling window size in samples
    pub window_size: usize,
    /// Smooth power before simulating
    pub enabled_for_power: bool,
    /// Smooth deoxygenation before simulating
    pub enabled_for_oxygenation: bool,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            enabled_for_power: false,
            enabled_for_oxygenation: true,
        }
    }
}

/// Model parameters entered by hand instead of fitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// CP / W'
    pub power: Option<FittedModel>,
    /// CMR / M'
    pub oxygenation: Option<FittedModel>,
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "providenceit", "wbal")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load application configuration from a file, falling back to defaults if it is absent.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save application configuration to a file.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
