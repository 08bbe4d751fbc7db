//! Analytics error types.

use thiserror::Error;

use super::balance::BalanceError;
use super::critical_power::FitError;
use crate::recording::types::{ExportError, ImportError};
use crate::storage::config::ConfigError;

/// Errors that can occur anywhere between reading trials and writing a balance series.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Model fitting failed.
    #[error("Fit failed: {0}")]
    Fit(#[from] FitError),

    /// Balance simulation failed.
    #[error("Balance simulation failed: {0}")]
    Balance(#[from] BalanceError),

    /// Input could not be read.
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    /// Output could not be written.
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for analytics operations.
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
