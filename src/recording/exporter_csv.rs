//! CSV export of a workout augmented with its reserve balance.

use std::io::Write;

use crate::metrics::analytics::{BalanceSeries, Sample};
use crate::recording::types::ExportError;

/// Export raw samples alongside the simulated balance.
///
/// With `include_model_rate` the rate the simulator actually saw (e.g. the
/// smoothed signal) is written as an extra `smoothed_rate` column.
pub fn export_balance_csv(
    samples: &[Sample],
    series: &BalanceSeries,
    include_model_rate: bool,
) -> Result<String, ExportError> {
    if samples.is_empty() {
        return Err(ExportError::NoData);
    }
    if samples.len() != series.len() {
        return Err(ExportError::LengthMismatch {
            samples: samples.len(),
            balance: series.len(),
        });
    }

    let mut output = Vec::new();

    // Write header
    let header = if include_model_rate {
        "timestamp,rate,smoothed_rate,balance"
    } else {
        "timestamp,rate,balance"
    };
    writeln!(output, "{header}").map_err(|e| ExportError::WriteFailed(e.to_string()))?;

    // Write data rows
    for (sample, point) in samples.iter().zip(series.points()) {
        let written = if include_model_rate {
            writeln!(
                output,
                "{},{},{},{:.3}",
                sample.timestamp, sample.rate, point.rate, point.balance
            )
        } else {
            writeln!(
                output,
                "{},{},{:.3}",
                sample.timestamp, sample.rate, point.balance
            )
        };
        written.map_err(|e| ExportError::WriteFailed(e.to_string()))?;
    }

    String::from_utf8(output).map_err(|e| ExportError::WriteFailed(e.to_string()))
}

/// Export a balance series to CSV and write to a file.
pub fn export_balance_csv_to_file(
    samples: &[Sample],
    series: &BalanceSeries,
    include_model_rate: bool,
    path: &std::path::Path,
) -> Result<(), ExportError> {
    let content = export_balance_csv(samples, series, include_model_rate)?;
    std::fs::write(path, content)?;
    Ok(())
}
