//! Loading and saving participant datasets.
//!
//! A dataset is three named collections, `Driver`, `Rider` and `Shifter`.
//! Supported layouts:
//!
//! - **JSON file** (`.json`): `{"version": "1.0.0", "Driver": [...], "Rider": [...], "Shifter": [...]}`
//! - **CSV directory**: `Driver.csv`, `Rider.csv`, `Shifter.csv`
//! - **Mixed CSV file** (`.csv`): one file, role taken from the `type` column
//!
//! ## Columns
//!
//! | Column | Description | Required |
//! |--------|-------------|----------|
//! | id | Unique id within the role | Yes |
//! | route_start / route_end | Location labels | No |
//! | Start_lat, Start_lon, End_lat, End_lon | Endpoints in degrees | Yes |
//! | departure_time | `YYYY-MM-DD HH:MM[:SS]` | Yes |
//! | seats | Positive integer | Drivers and shifters |
//! | Pet, Smoker, Disable | YES / NO (riders also BOTH) | Yes |
//!
//! Records are validated as they are read; the first invalid record aborts the
//! load with a [`ParseError::Validation`] naming the role, row and field.

use std::path::Path;

use thiserror::Error;

use crate::core::dataset::Dataset;
use crate::utils::validation::DataValidationError;

pub mod delimited;
pub mod json;
pub mod record;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON dataset: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CSV dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid record: {0}")]
    Validation(#[from] DataValidationError),

    #[error("Invalid dataset format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported dataset format: {0}")]
    UnsupportedFormat(String),
}

/// Load a dataset, choosing the layout from the path
///
/// # Errors
///
/// Returns `ParseError::UnsupportedFormat` for unknown extensions, otherwise
/// any error of the selected reader.
pub fn load_dataset(path: &Path) -> Result<Dataset, ParseError> {
    if path.is_dir() {
        return delimited::parse_dataset_dir(path);
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("json") => json::parse_dataset_file(path),
        Some("csv") => delimited::parse_mixed_file(path),
        Some(ext) => Err(ParseError::UnsupportedFormat(ext.to_string())),
        None => Err(ParseError::UnsupportedFormat(format!(
            "{} (expected a .json file, a .csv file or a directory)",
            path.display()
        ))),
    }
}

/// Save a dataset: `.json` paths get a JSON file, anything else becomes a
/// directory of per-role CSV files
///
/// # Errors
///
/// Returns any write error of the selected writer.
pub fn save_dataset(dataset: &Dataset, path: &Path) -> Result<(), ParseError> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        json::write_dataset_file(dataset, path)
    } else {
        delimited::write_dataset_dir(dataset, path)
    }
}
