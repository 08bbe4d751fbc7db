//! Error types for reading workout tables and writing balance output.

use thiserror::Error;

/// Errors while reading trial or sample tables.
#[derive(Debug, Error)]
pub enum ImportError {
    /// No usable rows in the input
    #[error("Input has no usable rows")]
    NoData,

    /// A field could not be read as a number
    #[error("Line {line}, column {column}: cannot parse {value:?} as a number")]
    InvalidNumber {
        line: u64,
        column: usize,
        value: String,
    },

    /// Malformed CSV input
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors during balance export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No samples to export
    #[error("Series has no data to export")]
    NoData,

    /// Raw samples and balance series are not aligned
    #[error("Length mismatch: {samples} samples but {balance} balance values")]
    LengthMismatch { samples: usize, balance: usize },

    /// Failed to write export data
    #[error("Failed to write data: {0}")]
    WriteFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
