//! Distance and departure-time utilities shared by every matching stage.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::core::participant::Participant;
use crate::core::types::Coordinate;

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Maximum departure time difference for two participants to travel together
pub const TIME_WINDOW_MINUTES: i64 = 30;

/// Great-circle distance in kilometres between two points given in degrees
#[must_use]
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lon.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lon.to_radians());
    let sin_dlat = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon = ((lon2 - lon1) * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Absolute difference between two departure times
#[must_use]
pub fn time_delta(t1: NaiveDateTime, t2: NaiveDateTime) -> Duration {
    (t1 - t2).abs()
}

/// Whether two departures are at most `minutes` apart
#[must_use]
pub fn within_window(t1: NaiveDateTime, t2: NaiveDateTime, minutes: i64) -> bool {
    time_delta(t1, t2) <= Duration::minutes(minutes)
}

/// Distances and time gap between two participants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateEdge {
    /// Absolute departure gap in whole minutes
    pub delta_minutes: i64,
    /// Haversine distance between the two origins
    pub start_km: f64,
    /// Haversine distance between the two destinations
    pub end_km: f64,
    /// Departures are within [`TIME_WINDOW_MINUTES`]
    pub in_window: bool,
}

impl CandidateEdge {
    #[must_use]
    pub fn between(a: &Participant, b: &Participant) -> Self {
        Self {
            delta_minutes: time_delta(a.departure(), b.departure()).num_minutes(),
            start_km: distance_km(a.start(), b.start()),
            end_km: distance_km(a.end(), b.end()),
            in_window: within_window(a.departure(), b.departure(), TIME_WINDOW_MINUTES),
        }
    }

    /// Both endpoints lie within `tolerance_km` of each other
    #[must_use]
    pub fn within_tolerance(&self, tolerance_km: f64) -> bool {
        self.start_km <= tolerance_km && self.end_km <= tolerance_km
    }
}
