use serde::{Deserialize, Serialize};

use crate::core::participant::{Participant, Trip};
use crate::core::types::{Attribute, Coordinate, Preferences, Role};
use crate::utils::validation::{
    parse_degrees, parse_preference, parse_seats, parse_timestamp, require, DataValidationError,
    OUTPUT_TIMESTAMP_FORMAT,
};

/// One participant row as read from disk, before validation.
///
/// Every field is kept as optional text so that a missing or malformed value
/// can be reported against the row it came from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub route_start: Option<String>,

    #[serde(default, rename = "Start_lat", alias = "start_lat")]
    pub start_lat: Option<String>,

    #[serde(default, rename = "Start_lon", alias = "start_lon")]
    pub start_lon: Option<String>,

    #[serde(default)]
    pub route_end: Option<String>,

    #[serde(default, rename = "End_lat", alias = "end_lat")]
    pub end_lat: Option<String>,

    #[serde(default, rename = "End_lon", alias = "end_lon")]
    pub end_lon: Option<String>,

    #[serde(default)]
    pub departure_time: Option<String>,

    #[serde(default)]
    pub seats: Option<String>,

    #[serde(default, rename = "Pet", alias = "pet")]
    pub pet: Option<String>,

    #[serde(default, rename = "Smoker", alias = "smoker")]
    pub smoker: Option<String>,

    #[serde(default, rename = "Disable", alias = "disable")]
    pub disable: Option<String>,
}

impl RawRecord {
    /// Describe the record for error messages, e.g. `row 4 (id R3)`
    #[must_use]
    pub fn locator(&self, row: usize) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => format!("row {row} (id {id})"),
            _ => format!("row {row}"),
        }
    }

    /// Validate every field and build a participant of `role`.
    ///
    /// `row` is the 1-based position of the record in its source, used only
    /// in error messages.
    ///
    /// # Errors
    ///
    /// Returns the first `DataValidationError` found.
    pub fn into_participant(self, role: Role, row: usize) -> Result<Participant, DataValidationError> {
        let record = self.locator(row);
        let id = require(role, &record, "id", self.id.as_deref())?.to_string();

        let start = Coordinate::new(
            parse_degrees(role, &record, "Start_lat", self.start_lat.as_deref(), true)?,
            parse_degrees(role, &record, "Start_lon", self.start_lon.as_deref(), false)?,
        );
        let end = Coordinate::new(
            parse_degrees(role, &record, "End_lat", self.end_lat.as_deref(), true)?,
            parse_degrees(role, &record, "End_lon", self.end_lon.as_deref(), false)?,
        );
        let departure = parse_timestamp(role, &record, self.departure_time.as_deref())?;

        let preferences = Preferences::new(
            parse_preference(role, &record, Attribute::Pet, "Pet", self.pet.as_deref())?,
            parse_preference(role, &record, Attribute::Smoker, "Smoker", self.smoker.as_deref())?,
            parse_preference(role, &record, Attribute::Disable, "Disable", self.disable.as_deref())?,
        );

        let seats = if role.has_seats() {
            Some(parse_seats(role, &record, self.seats.as_deref())?)
        } else {
            None
        };

        let trip = Trip::new(id, start, end, departure)
            .with_labels(
                self.route_start.unwrap_or_default().trim(),
                self.route_end.unwrap_or_default().trim(),
            )
            .with_preferences(preferences);

        Participant::new(role, trip, seats)
    }
}

/// A validated participant in the on-disk column layout
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub route_start: String,
    #[serde(rename = "Start_lat")]
    pub start_lat: f64,
    #[serde(rename = "Start_lon")]
    pub start_lon: f64,
    pub route_end: String,
    #[serde(rename = "End_lat")]
    pub end_lat: f64,
    #[serde(rename = "End_lon")]
    pub end_lon: f64,
    pub departure_time: String,
    pub seats: Option<u32>,
    #[serde(rename = "Pet")]
    pub pet: String,
    #[serde(rename = "Smoker")]
    pub smoker: String,
    #[serde(rename = "Disable")]
    pub disable: String,
}

impl From<&Participant> for ParticipantRecord {
    fn from(participant: &Participant) -> Self {
        let trip = participant.trip();
        Self {
            id: trip.id.clone(),
            kind: participant.role().as_type_str(),
            route_start: trip.start_label.clone(),
            start_lat: trip.start.lat,
            start_lon: trip.start.lon,
            route_end: trip.end_label.clone(),
            end_lat: trip.end.lat,
            end_lon: trip.end.lon,
            departure_time: trip.departure.format(OUTPUT_TIMESTAMP_FORMAT).to_string(),
            seats: participant.seats(),
            pet: trip.preferences.pet.to_string(),
            smoker: trip.preferences.smoker.to_string(),
            disable: trip.preferences.disable.to_string(),
        }
    }
}
