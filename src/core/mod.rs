//! Core data types for ride-sharing participants.
//!
//! - [`Participant`](participant::Participant): a role-tagged trip (Driver, Rider or Shifter)
//! - [`Trip`](participant::Trip): id, route labels, endpoints, departure and preferences
//! - [`Dataset`](dataset::Dataset): the three immutable participant pools of one run
//! - [`Preferences`](types::Preferences): Pet / Smoker / Disable answers
//! - [`geo`]: haversine distance and departure window checks
//!
//! ## Preference domains
//!
//! | Role    | Allowed answers |
//! |---------|-----------------|
//! | Driver  | YES, NO         |
//! | Shifter | YES, NO         |
//! | Rider   | YES, NO, BOTH   |
//!
//! A rider's BOTH means no objection either way.

pub mod dataset;
pub mod geo;
pub mod participant;
pub mod types;
