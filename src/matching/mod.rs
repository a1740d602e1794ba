//! Batch ride-share matching.
//!
//! A run goes through four stages:
//!
//! 1. [`filter`]: drop participants with no plausible counterpart in time or space
//! 2. [`model`]: declare one 0/1 variable per candidate pairing, fix ineligible
//!    pairings to zero and emit capacity and exclusivity constraints
//! 3. [`backend`]: maximize the number of pairings subject to those constraints
//! 4. [`interpret`]: decode and re-validate the assignment
//!
//! [`MatchingEngine`] strings them together and records timings.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use rideshare_solver::{load_dataset, MatchingEngine};
//!
//! let dataset = load_dataset(Path::new("participants.json")).unwrap();
//! let report = MatchingEngine::new().run(&dataset).unwrap();
//!
//! println!("{}", report.status_line());
//! for m in &report.matches {
//!     println!("{m}");
//! }
//! ```

pub mod backend;
pub mod engine;
pub mod filter;
pub mod interpret;
pub mod model;

pub use backend::{Backend, BranchAndBound, SolveStatus, SolverConfig};
pub use engine::{MatchReport, MatchingConfig, MatchingEngine};
pub use interpret::{Match, MatchKind};
