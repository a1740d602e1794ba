use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::types::{Coordinate, Preferences, Role};
use crate::utils::validation::DataValidationError;

/// The journey a participant wants to make, common to every role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// Unique identifier within the participant's role
    pub id: String,

    /// Free-text origin label (e.g. a postcode)
    #[serde(default)]
    pub start_label: String,

    /// Free-text destination label
    #[serde(default)]
    pub end_label: String,

    pub start: Coordinate,
    pub end: Coordinate,

    /// Departure time, naive local time shared by the whole batch
    pub departure: NaiveDateTime,

    pub preferences: Preferences,
}

impl Trip {
    pub fn new(
        id: impl Into<String>,
        start: Coordinate,
        end: Coordinate,
        departure: NaiveDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            start_label: String::new(),
            end_label: String::new(),
            start,
            end,
            departure,
            preferences: Preferences::default(),
        }
    }

    #[must_use]
    pub fn with_labels(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_label = start.into();
        self.end_label = end.into();
        self
    }

    #[must_use]
    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }
}

/// A trip participant tagged with its registered role.
///
/// Only drivers and shifters own a vehicle, so only they carry a seat count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Participant {
    Driver { trip: Trip, seats: u32 },
    Rider { trip: Trip },
    Shifter { trip: Trip, seats: u32 },
}

impl Participant {
    /// Build a participant, enforcing the role's capacity and answer domain.
    ///
    /// `seats` is ignored for riders.
    ///
    /// # Errors
    ///
    /// Returns `DataValidationError::MissingField` or `InvalidSeats` when a
    /// driver or shifter has no positive seat count, and
    /// `InvalidPreference` when a driver or shifter answers `BOTH`.
    pub fn new(role: Role, trip: Trip, seats: Option<u32>) -> Result<Self, DataValidationError> {
        for (attribute, value) in trip.preferences.iter() {
            if !value.allowed_for(role) {
                return Err(DataValidationError::InvalidPreference {
                    role,
                    record: trip.id.clone(),
                    attribute,
                    value: value.to_string(),
                    allowed: "YES, NO",
                });
            }
        }

        if role == Role::Rider {
            return Ok(Self::Rider { trip });
        }

        let seats = match seats {
            Some(0) => {
                return Err(DataValidationError::InvalidSeats {
                    role,
                    record: trip.id,
                    value: "0".to_string(),
                })
            }
            Some(n) => n,
            None => {
                return Err(DataValidationError::MissingField {
                    role,
                    record: trip.id,
                    field: "seats",
                })
            }
        };

        Ok(match role {
            Role::Driver => Self::Driver { trip, seats },
            _ => Self::Shifter { trip, seats },
        })
    }

    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::Driver { .. } => Role::Driver,
            Self::Rider { .. } => Role::Rider,
            Self::Shifter { .. } => Role::Shifter,
        }
    }

    #[must_use]
    pub fn trip(&self) -> &Trip {
        match self {
            Self::Driver { trip, .. } | Self::Rider { trip } | Self::Shifter { trip, .. } => trip,
        }
    }

    /// Seat capacity, absent for riders
    #[must_use]
    pub fn seats(&self) -> Option<u32> {
        match self {
            Self::Driver { seats, .. } | Self::Shifter { seats, .. } => Some(*seats),
            Self::Rider { .. } => None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.trip().id
    }

    #[must_use]
    pub fn start(&self) -> Coordinate {
        self.trip().start
    }

    #[must_use]
    pub fn end(&self) -> Coordinate {
        self.trip().end
    }

    #[must_use]
    pub fn departure(&self) -> NaiveDateTime {
        self.trip().departure
    }

    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.trip().preferences
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.role(), self.id())
    }
}
