//! Candidate pruning ahead of model construction.
//!
//! Two passes, each keeping a participant only if some participant of a
//! counterpart role could plausibly share its trip:
//!
//! 1. **Time pass**: a counterpart departs within the time window.
//! 2. **Geofence pass**: against the time-filtered pools, a counterpart's start
//!    point lies within [`PRUNING_RADIUS_KM`] of the participant's start point.
//!
//! Counterpart roles come from [`Role::counterparts`]. The geofence pass only
//! looks at start points; the model checks both endpoints against its own
//! tolerance.
//!
//! Both passes compare all pairs, which is fine for tens to low hundreds of
//! participants per role.

use serde::Serialize;
use tracing::debug;

use crate::core::dataset::{Dataset, RoleCounts};
use crate::core::geo::{distance_km, within_window, TIME_WINDOW_MINUTES};
use crate::core::participant::Participant;
use crate::core::types::Role;

/// Start-point radius used by the geofence pass, independent of the model tolerance
pub const PRUNING_RADIUS_KM: f64 = 1.0;

/// Pool sizes before and after each pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub input: RoleCounts,
    pub after_time: RoleCounts,
    pub after_geofence: RoleCounts,
}

impl FilterSummary {
    /// Participants removed by the two passes combined
    #[must_use]
    pub fn removed(&self) -> usize {
        self.input.total() - self.after_geofence.total()
    }
}

/// Output of [`filter_candidates`]
#[derive(Debug, Clone)]
pub struct FilteredPools {
    pub dataset: Dataset,
    pub summary: FilterSummary,
}

/// Run the time pass then the geofence pass over `dataset`
#[must_use]
pub fn filter_candidates(dataset: &Dataset) -> FilteredPools {
    let time_filtered = retain_with_counterpart(dataset, |a, b| {
        within_window(a.departure(), b.departure(), TIME_WINDOW_MINUTES)
    });
    let geofenced = retain_with_counterpart(&time_filtered, |a, b| {
        distance_km(a.start(), b.start()) <= PRUNING_RADIUS_KM
    });

    let summary = FilterSummary {
        input: dataset.counts(),
        after_time: time_filtered.counts(),
        after_geofence: geofenced.counts(),
    };
    debug!(
        "Candidate filter: {} -> {} (time) -> {} (geofence) participants",
        summary.input.total(),
        summary.after_time.total(),
        summary.after_geofence.total()
    );

    FilteredPools {
        dataset: geofenced,
        summary,
    }
}

/// Keep each participant that `accepts` at least one counterpart in `pools`.
///
/// All roles are judged against the same input pools, so the order in which
/// roles are processed does not matter.
fn retain_with_counterpart<F>(pools: &Dataset, accepts: F) -> Dataset
where
    F: Fn(&Participant, &Participant) -> bool,
{
    let keep = |role: Role| -> Vec<Participant> {
        pools
            .pool(role)
            .iter()
            .enumerate()
            .filter(|&(index, participant)| {
                role.counterparts().iter().any(|&other_role| {
                    pools
                        .pool(other_role)
                        .iter()
                        .enumerate()
                        // A shifter is never its own counterpart
                        .filter(|&(other_index, _)| other_role != role || other_index != index)
                        .any(|(_, other)| accepts(participant, other))
                })
            })
            .map(|(_, participant)| participant.clone())
            .collect()
    };

    Dataset::from_validated(keep(Role::Driver), keep(Role::Rider), keep(Role::Shifter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::participant::Trip;
    use crate::core::types::Coordinate;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, 8)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn person(role: Role, id: &str, start: (f64, f64), departure: NaiveDateTime) -> Participant {
        let trip = Trip::new(
            id,
            Coordinate::new(start.0, start.1),
            Coordinate::new(51.50, -0.90),
            departure,
        );
        Participant::new(role, trip, Some(3)).unwrap()
    }

    const HOME: (f64, f64) = (51.4500, -0.9700);
    // ~0.3 km north of HOME
    const NEAR: (f64, f64) = (51.4527, -0.9700);
    // ~5.5 km north of HOME
    const FAR: (f64, f64) = (51.5000, -0.9700);

    fn ids(pool: &[Participant]) -> Vec<&str> {
        pool.iter().map(Participant::id).collect()
    }

    #[test]
    fn test_time_pass() {
        let dataset = Dataset::new(
            vec![person(Role::Driver, "D1", HOME, at(12, 0))],
            vec![
                person(Role::Rider, "R1", NEAR, at(12, 20)),
                person(Role::Rider, "R2", NEAR, at(14, 0)),
            ],
            vec![],
        )
        .unwrap();

        let filtered = filter_candidates(&dataset);
        assert_eq!(ids(filtered.dataset.drivers()), vec!["D1"]);
        assert_eq!(ids(filtered.dataset.riders()), vec!["R1"]);
        assert_eq!(filtered.summary.after_time.riders, 1);
        assert_eq!(filtered.summary.removed(), 1);
    }

    #[test]
    fn test_geofence_pass() {
        let dataset = Dataset::new(
            vec![person(Role::Driver, "D1", HOME, at(12, 0))],
            vec![
                person(Role::Rider, "R1", NEAR, at(12, 5)),
                person(Role::Rider, "R2", FAR, at(12, 5)),
            ],
            vec![],
        )
        .unwrap();

        let filtered = filter_candidates(&dataset);
        assert_eq!(ids(filtered.dataset.riders()), vec!["R1"]);
        assert_eq!(filtered.summary.after_time.riders, 2);
        assert_eq!(filtered.summary.after_geofence.riders, 1);
    }

    #[test]
    fn test_riders_do_not_keep_each_other() {
        let dataset = Dataset::new(
            vec![],
            vec![
                person(Role::Rider, "R1", HOME, at(12, 0)),
                person(Role::Rider, "R2", HOME, at(12, 0)),
            ],
            vec![],
        )
        .unwrap();

        let filtered = filter_candidates(&dataset);
        assert!(filtered.dataset.is_empty());
    }

    #[test]
    fn test_drivers_do_not_keep_each_other() {
        let dataset = Dataset::new(
            vec![
                person(Role::Driver, "D1", HOME, at(12, 0)),
                person(Role::Driver, "D2", HOME, at(12, 0)),
            ],
            vec![],
            vec![],
        )
        .unwrap();

        assert!(filter_candidates(&dataset).dataset.is_empty());
    }

    #[test]
    fn test_lone_shifter_is_not_its_own_counterpart() {
        let dataset = Dataset::new(
            vec![],
            vec![],
            vec![person(Role::Shifter, "S1", HOME, at(12, 0))],
        )
        .unwrap();

        assert!(filter_candidates(&dataset).dataset.is_empty());
    }

    #[test]
    fn test_shifters_keep_each_other() {
        let dataset = Dataset::new(
            vec![],
            vec![],
            vec![
                person(Role::Shifter, "S1", HOME, at(12, 0)),
                person(Role::Shifter, "S2", NEAR, at(12, 5)),
            ],
        )
        .unwrap();

        let filtered = filter_candidates(&dataset);
        assert_eq!(ids(filtered.dataset.shifters()), vec!["S1", "S2"]);
    }

    #[test]
    fn test_geofence_uses_time_filtered_pools() {
        // R1 sits next to D1 but departs hours later, so it is gone before the
        // geofence pass and cannot keep D1 alive.
        let dataset = Dataset::new(
            vec![person(Role::Driver, "D1", HOME, at(12, 0))],
            vec![
                person(Role::Rider, "R1", NEAR, at(15, 0)),
                person(Role::Rider, "R2", FAR, at(12, 10)),
            ],
            vec![],
        )
        .unwrap();

        let filtered = filter_candidates(&dataset);
        assert_eq!(filtered.summary.after_time.drivers, 1);
        assert_eq!(filtered.summary.after_time.riders, 1);
        assert!(filtered.dataset.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let filtered = filter_candidates(&Dataset::default());
        assert!(filtered.dataset.is_empty());
        assert_eq!(filtered.summary, FilterSummary::default());
    }
}
