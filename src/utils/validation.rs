//! Centralized field validation for participant records.
//!
//! Every value read from a dataset passes through one of these helpers before
//! it becomes part of a [`Participant`](crate::core::participant::Participant).
//! Nothing is coerced: a value that does not parse cleanly rejects the record.

use chrono::NaiveDateTime;

use crate::core::types::{Attribute, Preference, Role};

/// Maximum number of participants accepted per role (DOS protection)
pub const MAX_PARTICIPANTS_PER_ROLE: usize = 10_000;

/// Accepted departure time layouts, tried in order
pub const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Layout used when writing departure times back out
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A record rejected at load time
#[derive(Debug, thiserror::Error)]
pub enum DataValidationError {
    #[error("{role} {record}: missing required field '{field}'")]
    MissingField {
        role: Role,
        record: String,
        field: &'static str,
    },

    #[error("{role} {record}: field '{field}' is not a number: '{value}'")]
    InvalidNumber {
        role: Role,
        record: String,
        field: &'static str,
        value: String,
    },

    #[error("{role} {record}: field '{field}' out of range: {value}")]
    CoordinateOutOfRange {
        role: Role,
        record: String,
        field: &'static str,
        value: f64,
    },

    #[error("{role} {record}: invalid departure_time '{value}' (expected YYYY-MM-DD HH:MM[:SS])")]
    InvalidTimestamp {
        role: Role,
        record: String,
        value: String,
    },

    #[error("{role} {record}: seats must be a positive integer, got '{value}'")]
    InvalidSeats {
        role: Role,
        record: String,
        value: String,
    },

    #[error("{role} {record}: {attribute} must be one of {allowed}, got '{value}'")]
    InvalidPreference {
        role: Role,
        record: String,
        attribute: Attribute,
        value: String,
        allowed: &'static str,
    },

    #[error("{role}: duplicate id '{id}'")]
    DuplicateId { role: Role, id: String },

    #[error("{role} pool expected, found a {found} record '{id}'")]
    WrongRole { role: Role, found: Role, id: String },

    #[error("Too many {role} records: exceeds maximum of {MAX_PARTICIPANTS_PER_ROLE}")]
    TooManyParticipants { role: Role },
}

/// Require a non-blank value
///
/// # Errors
///
/// Returns `DataValidationError::MissingField` when the value is absent or blank.
pub fn require<'a>(
    role: Role,
    record: &str,
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, DataValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DataValidationError::MissingField {
            role,
            record: record.to_string(),
            field,
        }),
    }
}

/// Parse a latitude (`is_latitude`) or longitude in degrees
///
/// # Errors
///
/// Returns an error if the value is missing, not a finite number, or outside
/// [-90, 90] for latitudes / [-180, 180] for longitudes.
pub fn parse_degrees(
    role: Role,
    record: &str,
    field: &'static str,
    value: Option<&str>,
    is_latitude: bool,
) -> Result<f64, DataValidationError> {
    let raw = require(role, record, field, value)?;
    let degrees: f64 = raw
        .parse()
        .map_err(|_| DataValidationError::InvalidNumber {
            role,
            record: record.to_string(),
            field,
            value: raw.to_string(),
        })?;

    let limit = if is_latitude { 90.0 } else { 180.0 };
    if !degrees.is_finite() || degrees.abs() > limit {
        return Err(DataValidationError::CoordinateOutOfRange {
            role,
            record: record.to_string(),
            field,
            value: degrees,
        });
    }
    Ok(degrees)
}

/// Parse a departure timestamp in one of [`TIMESTAMP_FORMATS`]
///
/// # Errors
///
/// Returns `DataValidationError::InvalidTimestamp` if no format matches.
pub fn parse_timestamp(
    role: Role,
    record: &str,
    value: Option<&str>,
) -> Result<NaiveDateTime, DataValidationError> {
    let raw = require(role, record, "departure_time", value)?;
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| DataValidationError::InvalidTimestamp {
            role,
            record: record.to_string(),
            value: raw.to_string(),
        })
}

/// Parse a seat capacity (must be >= 1).
///
/// Spreadsheet exports often write integers as `3.0`; an integral float is
/// accepted, a fractional one is not.
///
/// # Errors
///
/// Returns `DataValidationError::InvalidSeats` for anything that is not a
/// positive integer.
pub fn parse_seats(role: Role, record: &str, value: Option<&str>) -> Result<u32, DataValidationError> {
    let raw = require(role, record, "seats", value)?;
    let invalid = || DataValidationError::InvalidSeats {
        role,
        record: record.to_string(),
        value: raw.to_string(),
    };

    let seats = match raw.parse::<i64>() {
        Ok(n) => n,
        Err(_) => {
            let f: f64 = raw.parse().map_err(|_| invalid())?;
            if !f.is_finite() || f.fract() != 0.0 {
                return Err(invalid());
            }
            #[allow(clippy::cast_possible_truncation)] // integral, range-checked below
            {
                f as i64
            }
        }
    };

    u32::try_from(seats)
        .ok()
        .filter(|&s| s >= 1)
        .ok_or_else(invalid)
}

/// Parse a preference answer within the domain allowed for `role`
///
/// # Errors
///
/// Returns `DataValidationError::MissingField` if blank, or
/// `DataValidationError::InvalidPreference` for values outside the domain.
pub fn parse_preference(
    role: Role,
    record: &str,
    attribute: Attribute,
    field: &'static str,
    value: Option<&str>,
) -> Result<Preference, DataValidationError> {
    let raw = require(role, record, field, value)?;
    Preference::parse(raw)
        .filter(|p| p.allowed_for(role))
        .ok_or_else(|| DataValidationError::InvalidPreference {
            role,
            record: record.to_string(),
            attribute,
            value: raw.to_string(),
            allowed: if role == Role::Rider {
                "YES, NO, BOTH"
            } else {
                "YES, NO"
            },
        })
}

/// Check if adding another participant to a pool would exceed the limit.
///
/// Call this with the current count BEFORE adding the next participant.
#[must_use]
pub fn check_participant_limit(count: usize) -> bool {
    count >= MAX_PARTICIPANTS_PER_ROLE
}
