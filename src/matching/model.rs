//! 0/1 constraint model of a ride-sharing batch.
//!
//! The builder declares one binary variable per candidate pairing and one
//! activity indicator per shifter, fixes to zero every pairing that breaks a
//! hard rule, and emits the capacity and exclusivity constraints as linear
//! inequalities `Σ coef·x ≤ rhs`. The objective maximizes the number of
//! pairings. No search happens here; see [`crate::matching::backend`].
//!
//! ## Variable families
//!
//! | Family | Meaning |
//! |--------|---------|
//! | `DriverTakesRider[d,r]` | driver `d` carries rider `r` |
//! | `ShifterAsDriverTakesRider[s,r]` | shifter `s` drives and carries rider `r` |
//! | `DriverTakesShifterAsRider[d,s]` | driver `d` carries shifter `s` as a rider |
//! | `ShifterPairing[i,j]` | shifter `i` drives and carries shifter `j` (`i != j`) |
//! | `ShifterActiveAsDriver[s]` | shifter `s` drives its own vehicle |
//!
//! ## Pairing eligibility
//!
//! Every pairing is fixed to zero when departures are more than
//! [`TIME_WINDOW_MINUTES`](crate::core::geo::TIME_WINDOW_MINUTES) apart or
//! either endpoint distance exceeds the tolerance. Preference rules then
//! differ by family:
//!
//! - vehicle → rider: excluded when one side answers YES and the other NO on
//!   any attribute; a rider's BOTH never excludes;
//! - driver → shifter and shifter → shifter: all three answers must be equal.
//!
//! Eligible pairings stay open; nothing is ever forced to one.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::core::dataset::Dataset;
use crate::core::geo::CandidateEdge;
use crate::core::participant::Participant;
use crate::core::types::{Attribute, Role};
use crate::matching::engine::MatchingConfig;

/// Index of a variable within a [`MatchModel`]
pub type VarId = usize;

/// The five variable families of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Family {
    DriverTakesRider,
    ShifterAsDriverTakesRider,
    DriverTakesShifterAsRider,
    ShifterPairing,
    ShifterActiveAsDriver,
}

/// Identity of a variable: its family plus pool indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VarKey {
    DriverTakesRider { driver: usize, rider: usize },
    ShifterAsDriverTakesRider { shifter: usize, rider: usize },
    DriverTakesShifterAsRider { driver: usize, shifter: usize },
    /// Both indices point into the shifter pool
    ShifterPairing { driver: usize, rider: usize },
    ShifterActiveAsDriver { shifter: usize },
}

impl VarKey {
    #[must_use]
    pub fn family(&self) -> Family {
        match self {
            Self::DriverTakesRider { .. } => Family::DriverTakesRider,
            Self::ShifterAsDriverTakesRider { .. } => Family::ShifterAsDriverTakesRider,
            Self::DriverTakesShifterAsRider { .. } => Family::DriverTakesShifterAsRider,
            Self::ShifterPairing { .. } => Family::ShifterPairing,
            Self::ShifterActiveAsDriver { .. } => Family::ShifterActiveAsDriver,
        }
    }

    /// The (role, index) of the party providing the vehicle and of the party
    /// being carried. `None` for the shifter activity indicator.
    #[must_use]
    pub fn parties(&self) -> Option<((Role, usize), (Role, usize))> {
        match *self {
            Self::DriverTakesRider { driver, rider } => {
                Some(((Role::Driver, driver), (Role::Rider, rider)))
            }
            Self::ShifterAsDriverTakesRider { shifter, rider } => {
                Some(((Role::Shifter, shifter), (Role::Rider, rider)))
            }
            Self::DriverTakesShifterAsRider { driver, shifter } => {
                Some(((Role::Driver, driver), (Role::Shifter, shifter)))
            }
            Self::ShifterPairing { driver, rider } => {
                Some(((Role::Shifter, driver), (Role::Shifter, rider)))
            }
            Self::ShifterActiveAsDriver { .. } => None,
        }
    }
}

impl std::fmt::Display for VarKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DriverTakesRider { driver, rider } => {
                write!(f, "DriverTakesRider[{driver},{rider}]")
            }
            Self::ShifterAsDriverTakesRider { shifter, rider } => {
                write!(f, "ShifterAsDriverTakesRider[{shifter},{rider}]")
            }
            Self::DriverTakesShifterAsRider { driver, shifter } => {
                write!(f, "DriverTakesShifterAsRider[{driver},{shifter}]")
            }
            Self::ShifterPairing { driver, rider } => write!(f, "ShifterPairing[{driver},{rider}]"),
            Self::ShifterActiveAsDriver { shifter } => {
                write!(f, "ShifterActiveAsDriver[{shifter}]")
            }
        }
    }
}

/// Why a pairing variable was fixed to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Exclusion {
    /// Departures more than the time window apart
    TimeWindow,
    /// Start points further apart than the tolerance
    StartDistance,
    /// End points further apart than the tolerance
    EndDistance,
    /// One side answers YES and the other NO
    PreferenceConflict(Attribute),
    /// Answers must be identical for this family and are not
    PreferenceMismatch(Attribute),
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimeWindow => write!(f, "departure times too far apart"),
            Self::StartDistance => write!(f, "start points beyond tolerance"),
            Self::EndDistance => write!(f, "end points beyond tolerance"),
            Self::PreferenceConflict(a) => write!(f, "{a} preferences conflict"),
            Self::PreferenceMismatch(a) => write!(f, "{a} preferences differ"),
        }
    }
}

/// A binary decision variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub key: VarKey,

    /// Weight in the maximized objective
    pub objective: i64,

    /// Set when a hard rule fixes the variable to zero
    pub fixed_zero: Option<Exclusion>,

    /// Gap and distances between the two parties (pairings only)
    pub edge: Option<CandidateEdge>,
}

impl Variable {
    /// Whether the optimizer may set this variable to one
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.fixed_zero.is_none()
    }
}

/// Which rule a linear constraint encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConstraintKind {
    /// A rider is carried by at most one vehicle
    RiderTakenOnce,
    /// A shifter is carried by at most one driver
    ShifterTakenOnce,
    /// A driver carries no more than its seats
    DriverCapacity,
    /// An active shifter carries no more riders than its seats; an inactive one carries none
    ShifterCapacity,
    /// A shifter is not both an active driver and a driver's passenger
    ShifterDriverOrRider,
    /// A shifter carries no more shifters than its seats
    PairingCapacity,
    /// Riders and shifters in a shifter's vehicle together fit its seats
    ShifterVehicleCapacity,
    /// A shifter rides with at most one other shifter
    PairingRiderOnce,
    /// A shifter appears on at most one side of the shifter pairings
    PairingOneSide,
    /// Driving another shifter makes a shifter an active driver
    PairingDriverActive,
    /// A shifter carried by another shifter is neither active nor carried by a driver
    PairingRiderExclusive,
}

/// `Σ coef · x ≤ rhs`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    /// Pool index of the participant the constraint is about
    pub subject: usize,
    pub terms: Vec<(VarId, i64)>,
    pub rhs: i64,
}

impl LinearConstraint {
    /// Left-hand side under a complete assignment
    #[must_use]
    pub fn lhs(&self, values: &[bool]) -> i64 {
        self.terms
            .iter()
            .filter(|&&(var, _)| values.get(var).copied().unwrap_or(false))
            .map(|&(_, coef)| coef)
            .sum()
    }

    #[must_use]
    pub fn is_satisfied(&self, values: &[bool]) -> bool {
        self.lhs(values) <= self.rhs
    }
}

/// Internal inconsistency found in a built model
#[derive(Error, Debug, PartialEq)]
pub enum ModelError {
    #[error("constraint {index} ({kind:?}) references unknown variable {var}")]
    UnknownVariable {
        index: usize,
        kind: ConstraintKind,
        var: VarId,
    },

    #[error("geofence tolerance must be a finite, non-negative distance, got {0}")]
    InvalidTolerance(f64),

    #[error("variable {0} is declared more than once")]
    DuplicateVariable(VarKey),
}

/// Size of a built model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub variables: usize,
    pub open_variables: usize,
    pub fixed_variables: usize,
    pub constraints: usize,
}

/// Variables, constraints and objective of one batch, ready for a backend
#[derive(Debug, Clone)]
pub struct MatchModel {
    variables: Vec<Variable>,
    index: HashMap<VarKey, VarId>,
    constraints: Vec<LinearConstraint>,
    tolerance_km: f64,
}

impl MatchModel {
    fn new(tolerance_km: f64) -> Self {
        Self {
            variables: Vec::new(),
            index: HashMap::new(),
            constraints: Vec::new(),
            tolerance_km,
        }
    }

    /// Assemble a model from prebuilt parts
    #[cfg(test)]
    pub(crate) fn from_parts(
        variables: Vec<Variable>,
        constraints: Vec<LinearConstraint>,
        tolerance_km: f64,
    ) -> Self {
        let mut model = Self::new(tolerance_km);
        for variable in variables {
            model.add_variable(variable);
        }
        model.constraints = constraints;
        model
    }

    fn add_variable(&mut self, variable: Variable) -> VarId {
        let id = self.variables.len();
        self.index.insert(variable.key, id);
        self.variables.push(variable);
        id
    }

    fn add_constraint(
        &mut self,
        kind: ConstraintKind,
        subject: usize,
        terms: Vec<(VarId, i64)>,
        rhs: i64,
    ) {
        self.constraints.push(LinearConstraint {
            kind,
            subject,
            terms,
            rhs,
        });
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    #[must_use]
    pub fn tolerance_km(&self) -> f64 {
        self.tolerance_km
    }

    #[must_use]
    pub fn id_of(&self, key: &VarKey) -> Option<VarId> {
        self.index.get(key).copied()
    }

    #[must_use]
    pub fn variable(&self, key: &VarKey) -> Option<&Variable> {
        self.id_of(key).map(|id| &self.variables[id])
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Objective value of a complete assignment
    #[must_use]
    pub fn objective_value(&self, values: &[bool]) -> i64 {
        self.variables
            .iter()
            .zip(values)
            .filter(|&(_, &on)| on)
            .map(|(v, _)| v.objective)
            .sum()
    }

    /// First constraint broken by `values`, if any
    #[must_use]
    pub fn violated_constraint(&self, values: &[bool]) -> Option<&LinearConstraint> {
        self.constraints.iter().find(|c| !c.is_satisfied(values))
    }

    #[must_use]
    pub fn stats(&self) -> ModelStats {
        let open_variables = self.variables.iter().filter(|v| v.is_open()).count();
        ModelStats {
            variables: self.variables.len(),
            open_variables,
            fixed_variables: self.variables.len() - open_variables,
            constraints: self.constraints.len(),
        }
    }

    /// Check internal consistency
    ///
    /// # Errors
    ///
    /// Returns a `ModelError` for a bad tolerance, a repeated variable key, or
    /// a constraint term pointing at a missing variable.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.tolerance_km.is_finite() || self.tolerance_km < 0.0 {
            return Err(ModelError::InvalidTolerance(self.tolerance_km));
        }
        if self.index.len() != self.variables.len() {
            let mut seen = HashMap::new();
            for v in &self.variables {
                if seen.insert(v.key, ()).is_some() {
                    return Err(ModelError::DuplicateVariable(v.key));
                }
            }
        }
        for (index, constraint) in self.constraints.iter().enumerate() {
            if let Some(&(var, _)) = constraint
                .terms
                .iter()
                .find(|&&(var, _)| var >= self.variables.len())
            {
                return Err(ModelError::UnknownVariable {
                    index,
                    kind: constraint.kind,
                    var,
                });
            }
        }
        Ok(())
    }
}

/// First hard rule shared by every pairing family that `edge` breaks
fn screen_edge(edge: &CandidateEdge, tolerance_km: f64) -> Option<Exclusion> {
    if !edge.in_window {
        Some(Exclusion::TimeWindow)
    } else if edge.within_tolerance(tolerance_km) {
        None
    } else if edge.start_km > tolerance_km {
        Some(Exclusion::StartDistance)
    } else {
        Some(Exclusion::EndDistance)
    }
}

/// Vehicle owner `offering` carrying a plain rider
fn rider_exclusion(
    edge: &CandidateEdge,
    tolerance_km: f64,
    offering: &Participant,
    rider: &Participant,
) -> Option<Exclusion> {
    screen_edge(edge, tolerance_km).or_else(|| {
        offering
            .preferences()
            .conflict_with_rider(rider.preferences())
            .map(Exclusion::PreferenceConflict)
    })
}

/// Driver or shifter carrying a shifter: answers must be identical
fn shifter_rider_exclusion(
    edge: &CandidateEdge,
    tolerance_km: f64,
    offering: &Participant,
    shifter: &Participant,
) -> Option<Exclusion> {
    screen_edge(edge, tolerance_km).or_else(|| {
        offering
            .preferences()
            .first_mismatch(shifter.preferences())
            .map(Exclusion::PreferenceMismatch)
    })
}

fn pairing(
    key: VarKey,
    offering: &Participant,
    taken: &Participant,
    tolerance_km: f64,
    rule: fn(&CandidateEdge, f64, &Participant, &Participant) -> Option<Exclusion>,
) -> Variable {
    let edge = CandidateEdge::between(offering, taken);
    Variable {
        key,
        objective: 1,
        fixed_zero: rule(&edge, tolerance_km, offering, taken),
        edge: Some(edge),
    }
}

fn seats_of(participant: &Participant) -> i64 {
    i64::from(participant.seats().unwrap_or(0))
}

/// Build the full model for `pools`.
///
/// Empty pools give an empty model, which any backend solves with objective 0.
#[must_use]
pub fn build_model(pools: &Dataset, config: &MatchingConfig) -> MatchModel {
    let tolerance = config.tolerance_km;
    let (drivers, riders, shifters) = (pools.drivers(), pools.riders(), pools.shifters());
    let mut model = MatchModel::new(tolerance);

    // Variables, family by family
    let mut x = vec![Vec::with_capacity(riders.len()); drivers.len()];
    for (d, driver) in drivers.iter().enumerate() {
        for (r, rider) in riders.iter().enumerate() {
            let key = VarKey::DriverTakesRider { driver: d, rider: r };
            x[d].push(model.add_variable(pairing(key, driver, rider, tolerance, rider_exclusion)));
        }
    }

    let mut y = vec![Vec::with_capacity(riders.len()); shifters.len()];
    for (s, shifter) in shifters.iter().enumerate() {
        for (r, rider) in riders.iter().enumerate() {
            let key = VarKey::ShifterAsDriverTakesRider { shifter: s, rider: r };
            y[s].push(model.add_variable(pairing(key, shifter, rider, tolerance, rider_exclusion)));
        }
    }

    let mut y_rider = vec![Vec::with_capacity(shifters.len()); drivers.len()];
    for (d, driver) in drivers.iter().enumerate() {
        for (s, shifter) in shifters.iter().enumerate() {
            let key = VarKey::DriverTakesShifterAsRider { driver: d, shifter: s };
            y_rider[d].push(model.add_variable(pairing(
                key,
                driver,
                shifter,
                tolerance,
                shifter_rider_exclusion,
            )));
        }
    }

    // w[i][j] is None on the diagonal
    let mut w = vec![vec![None; shifters.len()]; shifters.len()];
    for (i, offering) in shifters.iter().enumerate() {
        for (j, taken) in shifters.iter().enumerate() {
            if i == j {
                continue;
            }
            let key = VarKey::ShifterPairing { driver: i, rider: j };
            w[i][j] = Some(model.add_variable(pairing(
                key,
                offering,
                taken,
                tolerance,
                shifter_rider_exclusion,
            )));
        }
    }

    let z: Vec<VarId> = (0..shifters.len())
        .map(|s| {
            model.add_variable(Variable {
                key: VarKey::ShifterActiveAsDriver { shifter: s },
                objective: 0,
                fixed_zero: None,
                edge: None,
            })
        })
        .collect();

    // Each rider is taken at most once
    for r in 0..riders.len() {
        let terms = x
            .iter()
            .map(|row| row[r])
            .chain(y.iter().map(|row| row[r]))
            .map(|var| (var, 1))
            .collect();
        model.add_constraint(ConstraintKind::RiderTakenOnce, r, terms, 1);
    }

    // Each shifter is taken by at most one driver
    for s in 0..shifters.len() {
        let terms = y_rider.iter().map(|row| (row[s], 1)).collect();
        model.add_constraint(ConstraintKind::ShifterTakenOnce, s, terms, 1);
    }

    // Driver capacity over riders and shifters
    for (d, driver) in drivers.iter().enumerate() {
        let terms = x[d]
            .iter()
            .chain(y_rider[d].iter())
            .map(|&var| (var, 1))
            .collect();
        model.add_constraint(ConstraintKind::DriverCapacity, d, terms, seats_of(driver));
    }

    for (s, shifter) in shifters.iter().enumerate() {
        // Σ_r y[s,r] - seats(s)·z[s] ≤ 0
        let mut terms: Vec<(VarId, i64)> = y[s].iter().map(|&var| (var, 1)).collect();
        terms.push((z[s], -seats_of(shifter)));
        model.add_constraint(ConstraintKind::ShifterCapacity, s, terms, 0);

        // z[s] + Σ_d y_rider[d,s] ≤ 1
        let mut terms = vec![(z[s], 1)];
        terms.extend(y_rider.iter().map(|row| (row[s], 1)));
        model.add_constraint(ConstraintKind::ShifterDriverOrRider, s, terms, 1);
    }

    // Shifter pairings
    for (i, shifter) in shifters.iter().enumerate() {
        let as_driver: Vec<(VarId, i64)> = w[i].iter().flatten().map(|&var| (var, 1)).collect();
        let as_rider: Vec<(VarId, i64)> = w
            .iter()
            .filter_map(|row| row[i])
            .map(|var| (var, 1))
            .collect();

        model.add_constraint(
            ConstraintKind::PairingCapacity,
            i,
            as_driver.clone(),
            seats_of(shifter),
        );
        model.add_constraint(ConstraintKind::PairingRiderOnce, i, as_rider.clone(), 1);

        let both_sides = as_driver.iter().chain(as_rider.iter()).copied().collect();
        model.add_constraint(ConstraintKind::PairingOneSide, i, both_sides, 1);

        // Σ_r y[i,r] + Σ_j w[i,j] ≤ seats(i), and only while active when
        // pairings require the indicator
        let mut vehicle: Vec<(VarId, i64)> = y[i].iter().map(|&var| (var, 1)).collect();
        vehicle.extend(as_driver.iter().copied());
        if config.exclusive_shifter_roles {
            vehicle.push((z[i], -seats_of(shifter)));
            model.add_constraint(ConstraintKind::ShifterVehicleCapacity, i, vehicle, 0);
        } else {
            model.add_constraint(
                ConstraintKind::ShifterVehicleCapacity,
                i,
                vehicle,
                seats_of(shifter),
            );
        }

        if config.exclusive_shifter_roles {
            // w[i,j] - z[i] ≤ 0
            for &(var, _) in &as_driver {
                model.add_constraint(
                    ConstraintKind::PairingDriverActive,
                    i,
                    vec![(var, 1), (z[i], -1)],
                    0,
                );
            }
            // Σ_k w[k,i] + z[i] + Σ_d y_rider[d,i] ≤ 1
            let mut terms = as_rider;
            terms.push((z[i], 1));
            terms.extend(y_rider.iter().map(|row| (row[i], 1)));
            model.add_constraint(ConstraintKind::PairingRiderExclusive, i, terms, 1);
        }
    }

    let stats = model.stats();
    debug!(
        "Built model: {} variables ({} open, {} fixed to zero), {} constraints, tolerance {} km",
        stats.variables, stats.open_variables, stats.fixed_variables, stats.constraints, tolerance
    );

    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::participant::Trip;
    use crate::core::types::{Coordinate, Preference, Preferences};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, 8)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    const NONE: Preferences = Preferences {
        pet: Preference::No,
        smoker: Preference::No,
        disable: Preference::No,
    };

    fn person(
        role: Role,
        id: &str,
        departure: NaiveDateTime,
        prefs: Preferences,
        offset: f64,
    ) -> Participant {
        let trip = Trip::new(
            id,
            Coordinate::new(51.45 + offset, -0.97),
            Coordinate::new(51.50 + offset, -0.90),
            departure,
        )
        .with_preferences(prefs);
        Participant::new(role, trip, Some(2)).unwrap()
    }

    fn config() -> MatchingConfig {
        MatchingConfig::default()
    }

    #[test]
    fn test_empty_pools_give_empty_model() {
        let model = build_model(&Dataset::default(), &config());
        assert!(model.is_empty());
        assert!(model.constraints().is_empty());
        assert!(model.validate().is_ok());
        assert_eq!(model.objective_value(&[]), 0);
    }

    #[test]
    fn test_variable_counts() {
        let pools = Dataset::new(
            vec![
                person(Role::Driver, "D1", at(12, 0), NONE, 0.0),
                person(Role::Driver, "D2", at(12, 0), NONE, 0.0),
            ],
            vec![person(Role::Rider, "R1", at(12, 0), NONE, 0.0)],
            vec![
                person(Role::Shifter, "S1", at(12, 0), NONE, 0.0),
                person(Role::Shifter, "S2", at(12, 0), NONE, 0.0),
                person(Role::Shifter, "S3", at(12, 0), NONE, 0.0),
            ],
        )
        .unwrap();
        let model = build_model(&pools, &config());

        // 2x1 + 3x1 + 2x3 + 3x2 pairings + 3 indicators
        assert_eq!(model.variables().len(), 2 + 3 + 6 + 6 + 3);
        assert!(model
            .variable(&VarKey::ShifterPairing { driver: 1, rider: 1 })
            .is_none());
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_time_window_fixes_pair() {
        let pools = Dataset::new(
            vec![person(Role::Driver, "D1", at(12, 0), NONE, 0.0)],
            vec![person(Role::Rider, "R1", at(13, 1), NONE, 0.0)],
            vec![],
        )
        .unwrap();
        let model = build_model(&pools, &config());
        let var = model
            .variable(&VarKey::DriverTakesRider { driver: 0, rider: 0 })
            .unwrap();
        assert_eq!(var.fixed_zero, Some(Exclusion::TimeWindow));
        assert_eq!(var.edge.unwrap().delta_minutes, 61);
    }

    #[test]
    fn test_end_distance_fixes_pair() {
        let rider_trip = Trip::new(
            "R1",
            Coordinate::new(51.45, -0.97),
            // ~2.2 km away from the driver's destination
            Coordinate::new(51.52, -0.90),
            at(12, 0),
        );
        let pools = Dataset::new(
            vec![person(Role::Driver, "D1", at(12, 0), NONE, 0.0)],
            vec![Participant::new(Role::Rider, rider_trip, None).unwrap()],
            vec![],
        )
        .unwrap();

        let model = build_model(&pools, &config());
        let key = VarKey::DriverTakesRider { driver: 0, rider: 0 };
        assert_eq!(
            model.variable(&key).unwrap().fixed_zero,
            Some(Exclusion::EndDistance)
        );

        // A wider tolerance opens it
        let wide = MatchingConfig {
            tolerance_km: 3.0,
            ..MatchingConfig::default()
        };
        let model = build_model(&pools, &wide);
        assert!(model.variable(&key).unwrap().is_open());
    }

    #[test]
    fn test_rider_preference_rules() {
        let wants_pet = Preferences::new(Preference::Yes, Preference::No, Preference::No);
        let flexible = Preferences::new(Preference::Both, Preference::Both, Preference::No);
        let pools = Dataset::new(
            vec![person(Role::Driver, "D1", at(12, 0), NONE, 0.0)],
            vec![
                person(Role::Rider, "R1", at(12, 0), wants_pet, 0.0),
                person(Role::Rider, "R2", at(12, 0), flexible, 0.0),
            ],
            vec![],
        )
        .unwrap();
        let model = build_model(&pools, &config());

        let r1 = model
            .variable(&VarKey::DriverTakesRider { driver: 0, rider: 0 })
            .unwrap();
        assert_eq!(
            r1.fixed_zero,
            Some(Exclusion::PreferenceConflict(Attribute::Pet))
        );
        let r2 = model
            .variable(&VarKey::DriverTakesRider { driver: 0, rider: 1 })
            .unwrap();
        assert!(r2.is_open());
    }

    #[test]
    fn test_driver_takes_shifter_requires_identical_answers() {
        let smoker = Preferences::new(Preference::No, Preference::Yes, Preference::No);
        let pools = Dataset::new(
            vec![person(Role::Driver, "D1", at(12, 0), NONE, 0.0)],
            vec![],
            vec![
                person(Role::Shifter, "S1", at(12, 0), NONE, 0.0),
                person(Role::Shifter, "S2", at(12, 0), smoker, 0.0),
            ],
        )
        .unwrap();
        let model = build_model(&pools, &config());

        let same = model
            .variable(&VarKey::DriverTakesShifterAsRider { driver: 0, shifter: 0 })
            .unwrap();
        assert!(same.is_open());
        let differs = model
            .variable(&VarKey::DriverTakesShifterAsRider { driver: 0, shifter: 1 })
            .unwrap();
        assert_eq!(
            differs.fixed_zero,
            Some(Exclusion::PreferenceMismatch(Attribute::Smoker))
        );
    }

    #[test]
    fn test_shifter_pairing_left_open() {
        let pools = Dataset::new(
            vec![],
            vec![],
            vec![
                person(Role::Shifter, "S1", at(12, 0), NONE, 0.0),
                person(Role::Shifter, "S2", at(12, 5), NONE, 0.003),
            ],
        )
        .unwrap();
        let model = build_model(&pools, &config());

        for key in [
            VarKey::ShifterPairing { driver: 0, rider: 1 },
            VarKey::ShifterPairing { driver: 1, rider: 0 },
        ] {
            let var = model.variable(&key).unwrap();
            assert!(var.is_open(), "{key} should be open");
            assert_eq!(var.objective, 1);
        }
    }

    #[test]
    fn test_shifter_capacity_links_indicator() {
        let pools = Dataset::new(
            vec![],
            vec![person(Role::Rider, "R1", at(12, 0), NONE, 0.0)],
            vec![person(Role::Shifter, "S1", at(12, 0), NONE, 0.0)],
        )
        .unwrap();
        let model = build_model(&pools, &config());
        let y = model
            .id_of(&VarKey::ShifterAsDriverTakesRider { shifter: 0, rider: 0 })
            .unwrap();
        let z = model
            .id_of(&VarKey::ShifterActiveAsDriver { shifter: 0 })
            .unwrap();

        let mut values = vec![false; model.variables().len()];
        values[y] = true;
        let broken = model.violated_constraint(&values).unwrap();
        assert_eq!(broken.kind, ConstraintKind::ShifterCapacity);

        values[z] = true;
        assert!(model.violated_constraint(&values).is_none());
        assert_eq!(model.objective_value(&values), 1);
    }

    #[test]
    fn test_shifter_vehicle_capacity_counts_riders_and_shifters() {
        let one_seat = Participant::new(
            Role::Shifter,
            Trip::new(
                "S1",
                Coordinate::new(51.45, -0.97),
                Coordinate::new(51.50, -0.90),
                at(12, 0),
            )
            .with_preferences(NONE),
            Some(1),
        )
        .unwrap();
        let pools = Dataset::new(
            vec![],
            vec![person(Role::Rider, "R1", at(12, 5), NONE, 0.0)],
            vec![one_seat, person(Role::Shifter, "S2", at(12, 5), NONE, 0.0)],
        )
        .unwrap();

        for exclusive_shifter_roles in [true, false] {
            let config = MatchingConfig {
                exclusive_shifter_roles,
                ..MatchingConfig::default()
            };
            let model = build_model(&pools, &config);
            let mut values = vec![false; model.variables().len()];
            for key in [
                VarKey::ShifterAsDriverTakesRider { shifter: 0, rider: 0 },
                VarKey::ShifterPairing { driver: 0, rider: 1 },
                VarKey::ShifterActiveAsDriver { shifter: 0 },
            ] {
                values[model.id_of(&key).unwrap()] = true;
            }

            let broken = model.violated_constraint(&values).unwrap();
            assert_eq!(broken.kind, ConstraintKind::ShifterVehicleCapacity);
            assert_eq!(broken.subject, 0);
        }
    }

    #[test]
    fn test_exclusive_roles_toggle() {
        let pools = Dataset::new(
            vec![],
            vec![],
            vec![
                person(Role::Shifter, "S1", at(12, 0), NONE, 0.0),
                person(Role::Shifter, "S2", at(12, 0), NONE, 0.0),
            ],
        )
        .unwrap();

        let strict = build_model(&pools, &config());
        let loose = build_model(
            &pools,
            &MatchingConfig {
                exclusive_shifter_roles: false,
                ..MatchingConfig::default()
            },
        );
        assert!(strict.constraints().len() > loose.constraints().len());
        assert!(strict
            .constraints()
            .iter()
            .any(|c| c.kind == ConstraintKind::PairingDriverActive));
        assert!(!loose
            .constraints()
            .iter()
            .any(|c| c.kind == ConstraintKind::PairingDriverActive));
    }

    #[test]
    fn test_validate_rejects_bad_tolerance() {
        let pools = Dataset::default();
        let model = build_model(
            &pools,
            &MatchingConfig {
                tolerance_km: f64::NAN,
                ..MatchingConfig::default()
            },
        );
        assert!(matches!(
            model.validate(),
            Err(ModelError::InvalidTolerance(_))
        ));
    }
}
