use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::core::dataset::Dataset;
use crate::core::participant::Participant;
use crate::core::types::Role;
use crate::parsing::record::{ParticipantRecord, RawRecord};
use crate::parsing::ParseError;
use crate::utils::validation::{check_participant_limit, DataValidationError};

/// Dataset file version for compatibility checking
pub const DATASET_VERSION: &str = "1.0.0";

/// Serializable dataset layout: one array per role
#[derive(Debug, Serialize)]
struct DatasetFile {
    version: &'static str,
    #[serde(rename = "Driver")]
    drivers: Vec<ParticipantRecord>,
    #[serde(rename = "Rider")]
    riders: Vec<ParticipantRecord>,
    #[serde(rename = "Shifter")]
    shifters: Vec<ParticipantRecord>,
}

/// Parse a JSON dataset file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or any error from
/// [`parse_dataset_json`].
pub fn parse_dataset_file(path: &Path) -> Result<Dataset, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_dataset_json(&content)
}

/// Parse a JSON dataset of the form
/// `{"version": "1.0.0", "Driver": [...], "Rider": [...], "Shifter": [...]}`
///
/// Numeric fields may be written as JSON numbers or strings.
///
/// # Errors
///
/// Returns `ParseError::Json` for malformed JSON, `ParseError::InvalidFormat`
/// if a role collection is missing or not an array of objects, or
/// `ParseError::Validation` for the first invalid record.
pub fn parse_dataset_json(json: &str) -> Result<Dataset, ParseError> {
    let root: Value = serde_json::from_str(json)?;
    let root = root
        .as_object()
        .ok_or_else(|| ParseError::InvalidFormat("dataset must be a JSON object".to_string()))?;

    match root.get("version").and_then(Value::as_str) {
        Some(DATASET_VERSION) | None => {}
        Some(other) => warn!(
            "Dataset version mismatch (expected {}, found {})",
            DATASET_VERSION, other
        ),
    }

    let drivers = parse_collection(root, Role::Driver)?;
    let riders = parse_collection(root, Role::Rider)?;
    let shifters = parse_collection(root, Role::Shifter)?;

    Ok(Dataset::new(drivers, riders, shifters)?)
}

fn parse_collection(root: &Map<String, Value>, role: Role) -> Result<Vec<Participant>, ParseError> {
    let key = role.to_string();
    let items = root
        .get(&key)
        .ok_or_else(|| ParseError::InvalidFormat(format!("missing '{key}' collection")))?
        .as_array()
        .ok_or_else(|| ParseError::InvalidFormat(format!("'{key}' must be an array")))?;

    let mut participants = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let object = item.as_object().ok_or_else(|| {
            ParseError::InvalidFormat(format!("{key} entry {} is not an object", i + 1))
        })?;

        if check_participant_limit(participants.len()) {
            return Err(DataValidationError::TooManyParticipants { role }.into());
        }

        participants.push(raw_from_object(object).into_participant(role, i + 1)?);
    }
    Ok(participants)
}

fn raw_from_object(object: &Map<String, Value>) -> RawRecord {
    let field = |names: &[&str]| names.iter().find_map(|name| object.get(*name)).and_then(scalar);

    RawRecord {
        id: field(&["id"]),
        kind: field(&["type"]),
        route_start: field(&["route_start"]),
        start_lat: field(&["Start_lat", "start_lat"]),
        start_lon: field(&["Start_lon", "start_lon"]),
        route_end: field(&["route_end"]),
        end_lat: field(&["End_lat", "end_lat"]),
        end_lon: field(&["End_lon", "end_lon"]),
        departure_time: field(&["departure_time"]),
        seats: field(&["seats"]),
        pet: field(&["Pet", "pet"]),
        smoker: field(&["Smoker", "smoker"]),
        disable: field(&["Disable", "disable"]),
    }
}

/// Text form of a JSON scalar; `null` is treated as absent
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Render a dataset in the JSON layout read by [`parse_dataset_json`]
///
/// # Errors
///
/// Returns `ParseError::Json` if serialization fails.
pub fn dataset_to_json(dataset: &Dataset) -> Result<String, ParseError> {
    let records = |role: Role| -> Vec<ParticipantRecord> {
        dataset.pool(role).iter().map(ParticipantRecord::from).collect()
    };
    let file = DatasetFile {
        version: DATASET_VERSION,
        drivers: records(Role::Driver),
        riders: records(Role::Rider),
        shifters: records(Role::Shifter),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

/// Write a dataset as a JSON file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be written.
pub fn write_dataset_file(dataset: &Dataset, path: &Path) -> Result<(), ParseError> {
    std::fs::write(path, dataset_to_json(dataset)?)?;
    Ok(())
}
