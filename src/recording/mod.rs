//! Reading trial and workout tables, and writing balance output.

pub mod exporter_csv;
pub mod importer_csv;
pub mod types;

pub use exporter_csv::{export_balance_csv, export_balance_csv_to_file};
pub use importer_csv::{
    import_samples_from_file, import_trials_from_file, parse_samples_csv, parse_trials_csv,
};
pub use types::{ExportError, ImportError};
