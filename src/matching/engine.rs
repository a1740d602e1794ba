use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::dataset::{Dataset, RoleCounts};
use crate::matching::backend::{Backend, BranchAndBound, SolveStatus, SolverConfig};
use crate::matching::filter::{filter_candidates, FilterSummary};
use crate::matching::interpret::{interpret, InterpretError, Match, Timings};
use crate::matching::model::{build_model, ModelError, ModelStats};

/// Default geofence tolerance for model pairings
pub const DEFAULT_TOLERANCE_KM: f64 = 1.0;

/// Configuration for the matching engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingConfig {
    /// Maximum start and end distance of a pairing, in kilometres
    pub tolerance_km: f64,
    /// Run the candidate filter before building the model
    pub prefilter: bool,
    /// Link shifter pairings to the shifter activity indicator so no shifter
    /// both drives and rides
    pub exclusive_shifter_roles: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            tolerance_km: DEFAULT_TOLERANCE_KM,
            prefilter: true,
            exclusive_shifter_roles: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid model: {0}")]
    Model(#[from] ModelError),

    #[error("Solver returned an unusable assignment: {0}")]
    Interpret(#[from] InterpretError),
}

/// Everything known about one solved batch
#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub tolerance_km: f64,
    pub backend: &'static str,
    pub status: SolveStatus,
    pub objective: i64,
    pub nodes_explored: u64,
    /// Pool sizes fed to the model builder
    pub pools: RoleCounts,
    /// Present when the candidate filter ran
    pub filter: Option<FilterSummary>,
    pub model: ModelStats,
    pub matches: Vec<Match>,
    pub timings: Timings,
}

impl MatchReport {
    #[must_use]
    pub fn status_line(&self) -> &'static str {
        self.status.describe()
    }
}

/// The main matching engine
pub struct MatchingEngine<B: Backend = BranchAndBound> {
    backend: B,
    config: MatchingConfig,
    solver: SolverConfig,
}

impl MatchingEngine<BranchAndBound> {
    /// Create an engine with the exact backend and default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MatchingConfig::default(), SolverConfig::default())
    }

    /// Create an engine with the exact backend and custom configuration
    #[must_use]
    pub fn with_config(config: MatchingConfig, solver: SolverConfig) -> Self {
        Self::with_backend(BranchAndBound, config, solver)
    }
}

impl Default for MatchingEngine<BranchAndBound> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> MatchingEngine<B> {
    pub fn with_backend(backend: B, config: MatchingConfig, solver: SolverConfig) -> Self {
        Self {
            backend,
            config,
            solver,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    #[must_use]
    pub fn solver(&self) -> &SolverConfig {
        &self.solver
    }

    /// Filter (when enabled), build, solve and decode one batch
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the model is inconsistent or the backend's
    /// assignment fails validation.
    pub fn run(&self, dataset: &Dataset) -> Result<MatchReport, EngineError> {
        let start = Instant::now();
        let (pools, summary) = self.prepare(dataset);
        self.solve_at(&pools, summary, &self.config, start)
    }

    /// Build, solve and decode pools that were already filtered (or are meant
    /// to be used as-is)
    ///
    /// # Errors
    ///
    /// See [`MatchingEngine::run`].
    pub fn solve_pools(&self, pools: &Dataset) -> Result<MatchReport, EngineError> {
        self.solve_at(pools, None, &self.config, Instant::now())
    }

    /// Solve the same pools once per tolerance. The candidate filter, when
    /// enabled, runs once since its radius does not depend on the tolerance.
    ///
    /// # Errors
    ///
    /// Stops at the first failing run; see [`MatchingEngine::run`].
    pub fn sweep(
        &self,
        dataset: &Dataset,
        tolerances: &[f64],
    ) -> Result<Vec<MatchReport>, EngineError> {
        let (pools, summary) = self.prepare(dataset);
        tolerances
            .iter()
            .map(|&tolerance_km| {
                let config = MatchingConfig {
                    tolerance_km,
                    ..self.config
                };
                self.solve_at(&pools, summary, &config, Instant::now())
            })
            .collect()
    }

    fn prepare(&self, dataset: &Dataset) -> (Dataset, Option<FilterSummary>) {
        if !self.config.prefilter {
            return (dataset.clone(), None);
        }
        let filtered = filter_candidates(dataset);
        if filtered.dataset.is_empty() && !dataset.is_empty() {
            warn!(
                "All {} participants were removed by the candidate filter",
                dataset.counts().total()
            );
        }
        (filtered.dataset, Some(filtered.summary))
    }

    fn solve_at(
        &self,
        pools: &Dataset,
        filter: Option<FilterSummary>,
        config: &MatchingConfig,
        start: Instant,
    ) -> Result<MatchReport, EngineError> {
        let build_start = Instant::now();
        let model = build_model(pools, config);
        model.validate()?;
        let build = build_start.elapsed();

        let solution = self.backend.solve(&model, &self.solver);
        let matches = interpret(pools, &model, &solution)?;

        let timings = Timings {
            build,
            solve: solution.solve_time,
            total: start.elapsed(),
        };
        debug!(
            "Timings: build {:.3}s, solve {:.3}s, total {:.3}s",
            timings.build.as_secs_f64(),
            timings.solve.as_secs_f64(),
            timings.total.as_secs_f64()
        );
        info!(
            "{} at tolerance {} km: {} matches ({} nodes, {})",
            solution.status.describe(),
            config.tolerance_km,
            matches.len(),
            solution.nodes_explored,
            self.backend.name()
        );

        Ok(MatchReport {
            tolerance_km: config.tolerance_km,
            backend: self.backend.name(),
            status: solution.status,
            objective: solution.objective,
            nodes_explored: solution.nodes_explored,
            pools: pools.counts(),
            filter,
            model: model.stats(),
            matches,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::participant::{Participant, Trip};
    use crate::core::types::{Coordinate, Preference, Preferences, Role};
    use crate::matching::backend::Solution;
    use crate::matching::interpret::MatchKind;
    use crate::matching::model::MatchModel;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, 8)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn trip(id: &str, start: (f64, f64), end: (f64, f64), departure: NaiveDateTime) -> Trip {
        Trip::new(
            id,
            Coordinate::new(start.0, start.1),
            Coordinate::new(end.0, end.1),
            departure,
        )
    }

    const START: (f64, f64) = (51.45, -0.97);
    const END: (f64, f64) = (51.50, -0.90);
    // Within ~150 m of START and END
    const START_NEAR: (f64, f64) = (51.4510, -0.9710);
    const END_NEAR: (f64, f64) = (51.5010, -0.9010);

    fn driver(id: &str, departure: NaiveDateTime, seats: u32) -> Participant {
        Participant::new(Role::Driver, trip(id, START, END, departure), Some(seats)).unwrap()
    }

    fn rider(id: &str, departure: NaiveDateTime) -> Participant {
        Participant::new(Role::Rider, trip(id, START_NEAR, END_NEAR, departure), None).unwrap()
    }

    fn shifter(id: &str, departure: NaiveDateTime) -> Participant {
        Participant::new(Role::Shifter, trip(id, START_NEAR, END_NEAR, departure), Some(2))
            .unwrap()
    }

    #[test]
    fn test_single_driver_single_rider() {
        let dataset = Dataset::new(
            vec![driver("D1", at(12, 0), 2)],
            vec![rider("R1", at(12, 10))],
            vec![],
        )
        .unwrap();
        let report = MatchingEngine::new().run(&dataset).unwrap();

        assert_eq!(report.status, SolveStatus::Optimal);
        assert_eq!(report.objective, 1);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].kind, MatchKind::DriverRider);
        assert_eq!(report.matches[0].to_string(), "Driver D1 takes Rider R1");
        assert_eq!(report.filter.unwrap().removed(), 0);
    }

    #[test]
    fn test_preference_conflict_leaves_rider_unmatched() {
        let pet_rider = Participant::new(
            Role::Rider,
            trip("R1", START_NEAR, END_NEAR, at(12, 10)).with_preferences(Preferences::new(
                Preference::Yes,
                Preference::No,
                Preference::No,
            )),
            None,
        )
        .unwrap();
        let dataset =
            Dataset::new(vec![driver("D1", at(12, 0), 2)], vec![pet_rider], vec![]).unwrap();
        let report = MatchingEngine::new().run(&dataset).unwrap();

        assert_eq!(report.status, SolveStatus::Optimal);
        assert_eq!(report.objective, 0);
        assert!(report.matches.is_empty());
    }

    #[test]
    fn test_departures_an_hour_apart() {
        let dataset = Dataset::new(
            vec![driver("D1", at(12, 0), 2)],
            vec![rider("R1", at(13, 0))],
            vec![],
        )
        .unwrap();
        let report = MatchingEngine::new().run(&dataset).unwrap();

        // The filter already drops both, leaving an empty model
        assert_eq!(report.pools.total(), 0);
        assert_eq!(report.status, SolveStatus::Optimal);
        assert_eq!(report.objective, 0);

        let unfiltered = MatchingEngine::with_config(
            MatchingConfig {
                prefilter: false,
                ..MatchingConfig::default()
            },
            SolverConfig::default(),
        );
        let report = unfiltered.run(&dataset).unwrap();
        assert!(report.filter.is_none());
        assert_eq!(report.model.fixed_variables, 1);
        assert_eq!(report.objective, 0);
    }

    #[test]
    fn test_two_shifters_pair_up() {
        let dataset = Dataset::new(
            vec![],
            vec![],
            vec![shifter("S1", at(12, 0)), shifter("S2", at(12, 5))],
        )
        .unwrap();
        let report = MatchingEngine::new().run(&dataset).unwrap();

        assert_eq!(report.objective, 1);
        assert_eq!(report.matches[0].kind, MatchKind::ShifterPairing);
        assert!(report.matches[0].to_string().ends_with("acting as a rider"));
    }

    #[test]
    fn test_shifter_never_drives_and_rides() {
        // Every shifter could either drive or ride here
        let dataset = Dataset::new(
            vec![driver("D1", at(12, 0), 1)],
            vec![rider("R1", at(12, 0))],
            vec![shifter("S1", at(12, 5)), shifter("S2", at(12, 10))],
        )
        .unwrap();
        let report = MatchingEngine::new().run(&dataset).unwrap();
        assert_eq!(report.status, SolveStatus::Optimal);

        for m in &report.matches {
            if m.offering.role == Role::Shifter {
                assert!(
                    !report.matches.iter().any(|other| {
                        other.taken.role == Role::Shifter && other.taken.id == m.offering.id
                    }),
                    "{} both drives and rides",
                    m.offering.id
                );
            }
        }
    }

    #[test]
    fn test_one_seat_shifter_carries_one_party() {
        let one_seat = |id: &str, departure| {
            Participant::new(Role::Shifter, trip(id, START, END, departure), Some(1)).unwrap()
        };
        let dataset = Dataset::new(
            vec![],
            vec![rider("R1", at(12, 0))],
            vec![one_seat("S1", at(12, 0)), one_seat("S2", at(12, 5))],
        )
        .unwrap();
        let report = MatchingEngine::new().run(&dataset).unwrap();

        assert_eq!(report.status, SolveStatus::Optimal);
        assert_eq!(report.objective, 1);
        assert_eq!(report.matches.len(), 1);
    }

    #[test]
    fn test_sweep_is_monotonic() {
        let far_rider = Participant::new(
            Role::Rider,
            // ~0.7 km from START, ~1.5 km from END
            trip("R2", (51.4560, -0.9700), (51.5130, -0.8950), at(12, 5)),
            None,
        )
        .unwrap();
        let dataset = Dataset::new(
            vec![driver("D1", at(12, 0), 3)],
            vec![rider("R1", at(12, 0)), far_rider],
            vec![],
        )
        .unwrap();

        let reports = MatchingEngine::new()
            .sweep(&dataset, &[0.5, 1.0, 2.0])
            .unwrap();
        let objectives: Vec<i64> = reports.iter().map(|r| r.objective).collect();
        assert_eq!(objectives, vec![1, 1, 2]);
        assert_eq!(reports[2].tolerance_km, 2.0);
    }

    #[test]
    fn test_empty_dataset() {
        let report = MatchingEngine::new().run(&Dataset::default()).unwrap();
        assert_eq!(report.status, SolveStatus::Optimal);
        assert_eq!(report.objective, 0);
        assert_eq!(report.model.variables, 0);
    }

    struct Lying;

    impl Backend for Lying {
        fn name(&self) -> &'static str {
            "lying"
        }

        fn solve(&self, model: &MatchModel, _config: &SolverConfig) -> Solution {
            Solution {
                status: SolveStatus::Optimal,
                objective: 7,
                values: vec![false; model.variables().len()],
                nodes_explored: 0,
                solve_time: std::time::Duration::ZERO,
            }
        }
    }

    #[test]
    fn test_bad_backend_output_is_an_error() {
        let dataset = Dataset::new(
            vec![driver("D1", at(12, 0), 2)],
            vec![rider("R1", at(12, 10))],
            vec![],
        )
        .unwrap();
        let engine =
            MatchingEngine::with_backend(Lying, MatchingConfig::default(), SolverConfig::default());
        let err = engine.run(&dataset).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Interpret(InterpretError::ObjectiveMismatch { .. })
        ));
    }
}
