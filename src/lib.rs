//! # rideshare-solver
//!
//! A library for optimal batch matching of shared-ride participants.
//!
//! A batch holds three kinds of participants. Drivers own a vehicle with a
//! number of free seats, riders need a seat, and shifters own a vehicle but
//! may leave it at home and ride with someone else. `rideshare-solver` pairs
//! them so that as many participants as possible share a trip, without ever
//! overfilling a vehicle or letting a shifter drive and ride at once.
//!
//! ## Features
//!
//! - **Candidate filter**: Drops participants with no counterpart departing
//!   within 30 minutes and starting within 1 km
//! - **Hard rules**: Time window, start and end geofence, and pet, smoker and
//!   accessibility answers
//! - **Exact optimization**: A 0/1 model solved by branch and bound, with
//!   optional time and node limits
//! - **Validated results**: Every assignment is re-checked before it is reported
//! - **Datasets**: JSON files and CSV directories, read and written
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use rideshare_solver::{load_dataset, MatchingEngine};
//!
//! // Load drivers, riders and shifters
//! let dataset = load_dataset(Path::new("participants.json")).unwrap();
//!
//! // Filter, build, solve and decode
//! let report = MatchingEngine::new().run(&dataset).unwrap();
//!
//! println!("{} (objective {})", report.status_line(), report.objective);
//! for m in &report.matches {
//!     println!("{m}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Participants, datasets, distances and time windows
//! - [`matching`]: Candidate filter, model builder, backend and interpreter
//! - [`parsing`]: JSON and CSV dataset readers and writers
//! - [`cli`]: Command-line interface implementation
//! - [`utils`]: Field validation

pub mod cli;
pub mod core;
pub mod matching;
pub mod parsing;
pub mod utils;

// Re-export commonly used types for convenience
pub use crate::core::dataset::Dataset;
pub use crate::core::participant::{Participant, Trip};
pub use crate::core::types::*;
pub use crate::matching::backend::{Backend, BranchAndBound, Solution, SolveStatus, SolverConfig};
pub use crate::matching::engine::{MatchReport, MatchingConfig, MatchingEngine};
pub use crate::matching::interpret::{Match, MatchKind};
pub use crate::parsing::{load_dataset, save_dataset};
