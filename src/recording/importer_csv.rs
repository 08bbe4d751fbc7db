//! CSV import of trial tables and workout sample tables.
//!
//! Both inputs are headerless comma-separated rows. A leading header row is
//! tolerated when none of its used columns is a number. Rows with a missing,
//! empty or NaN value in a used column are dropped; anything else that is not
//! a number is an error.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::metrics::analytics::{Sample, Trial};
use crate::recording::types::ImportError;

/// Outcome of reading one field.
enum Field {
    Value(f64),
    Missing,
}

fn read_field(record: &StringRecord, column: usize, line: u64) -> Result<Field, ImportError> {
    let Some(raw) = record.get(column) else {
        return Ok(Field::Missing);
    };
    if raw.is_empty() {
        return Ok(Field::Missing);
    }

    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Field::Value(v)),
        Ok(_) => Ok(Field::Missing),
        Err(_) => Err(ImportError::InvalidNumber {
            line,
            column,
            value: raw.to_string(),
        }),
    }
}

/// Parse rows, pulling out the given columns.
///
/// Returns one `Vec<f64>` per kept row with the values in `columns` order.
fn parse_rows(content: &str, columns: &[usize]) -> Result<Vec<Vec<f64>>, ImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    let mut seen_first = false;

    for result in reader.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line());
        let is_first = !seen_first;
        seen_first = true;

        let fields: Vec<Result<Field, ImportError>> = columns
            .iter()
            .map(|&column| read_field(&record, column, line))
            .collect();

        // A header has text where numbers belong and no number anywhere
        let has_value = fields.iter().any(|f| matches!(f, Ok(Field::Value(_))));
        if is_first && !has_value && fields.iter().any(Result::is_err) {
            debug!(line, "skipping header row");
            continue;
        }

        let mut values = Vec::with_capacity(columns.len());
        let mut dropped = false;
        for field in fields {
            match field? {
                Field::Value(v) => values.push(v),
                Field::Missing => dropped = true,
            }
        }

        if dropped {
            debug!(line, "dropping row with missing values");
            continue;
        }
        rows.push(values);
    }

    if rows.is_empty() {
        return Err(ImportError::NoData);
    }

    Ok(rows)
}

/// Parse a trial table with `rate,duration` rows.
pub fn parse_trials_csv(content: &str) -> Result<Vec<Trial>, ImportError> {
    let rows = parse_rows(content, &[0, 1])?;
    Ok(rows.into_iter().map(|r| Trial::new(r[1], r[0])).collect())
}

/// Parse a workout table, reading time from column 0 and the rate from `rate_column`.
pub fn parse_samples_csv(content: &str, rate_column: usize) -> Result<Vec<Sample>, ImportError> {
    let rows = parse_rows(content, &[0, rate_column])?;
    let samples: Vec<Sample> = rows.into_iter().map(|r| Sample::new(r[0], r[1])).collect();

    debug!(samples = samples.len(), rate_column, "parsed workout samples");
    Ok(samples)
}

/// Read a trial table from a file.
pub fn import_trials_from_file(path: &Path) -> Result<Vec<Trial>, ImportError> {
    let content = std::fs::read_to_string(path)?;
    parse_trials_csv(&content)
}

/// Read a workout table from a file.
pub fn import_samples_from_file(path: &Path, rate_column: usize) -> Result<Vec<Sample>, ImportError> {
    let content = std::fs::read_to_string(path)?;
    parse_samples_csv(&content, rate_column)
}
