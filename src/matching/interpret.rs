//! Turning a backend assignment into a validated list of matches.

use std::time::Duration;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::core::dataset::Dataset;
use crate::core::geo::CandidateEdge;
use crate::core::participant::Participant;
use crate::core::types::Role;
use crate::matching::backend::Solution;
use crate::matching::model::{ConstraintKind, Family, MatchModel, VarKey};

/// Kind of a decoded pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MatchKind {
    DriverRider,
    ShifterDriverRider,
    DriverShifterRider,
    ShifterPairing,
}

impl MatchKind {
    fn from_family(family: Family) -> Option<Self> {
        match family {
            Family::DriverTakesRider => Some(Self::DriverRider),
            Family::ShifterAsDriverTakesRider => Some(Self::ShifterDriverRider),
            Family::DriverTakesShifterAsRider => Some(Self::DriverShifterRider),
            Family::ShifterPairing => Some(Self::ShifterPairing),
            Family::ShifterActiveAsDriver => None,
        }
    }

    /// Whether the carried party is a shifter giving up its own vehicle
    #[must_use]
    pub fn carries_shifter(self) -> bool {
        matches!(self, Self::DriverShifterRider | Self::ShifterPairing)
    }
}

/// One side of a match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Party {
    pub role: Role,
    pub id: String,
    pub route_start: String,
    pub route_end: String,
}

impl From<&Participant> for Party {
    fn from(participant: &Participant) -> Self {
        Self {
            role: participant.role(),
            id: participant.id().to_string(),
            route_start: participant.trip().start_label.clone(),
            route_end: participant.trip().end_label.clone(),
        }
    }
}

/// A pairing selected by the optimizer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub kind: MatchKind,
    /// Party providing the vehicle
    pub offering: Party,
    /// Party being carried
    pub taken: Party,
    pub edge: CandidateEdge,
}

impl std::fmt::Display for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} takes {} {}",
            self.offering.role, self.offering.id, self.taken.role, self.taken.id
        )?;
        if self.kind.carries_shifter() {
            write!(f, " acting as a rider")?;
        }
        Ok(())
    }
}

/// An assignment that cannot be reported
#[derive(Error, Debug, PartialEq)]
pub enum InterpretError {
    #[error("solution has {found} values but the model has {expected} variables")]
    LengthMismatch { expected: usize, found: usize },

    #[error("{kind:?} constraint on participant {subject} violated: {lhs} > {rhs}")]
    ConstraintViolated {
        kind: ConstraintKind,
        subject: usize,
        lhs: i64,
        rhs: i64,
    },

    #[error("variable {0} is set although it was excluded")]
    ExcludedVariableSet(VarKey),

    #[error("reported objective {reported} does not match the {counted} selected pairings")]
    ObjectiveMismatch { reported: i64, counted: i64 },

    #[error("variable {0} refers to a participant missing from the pools")]
    UnknownParticipant(VarKey),
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Wall-clock time spent in each stage of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Timings {
    #[serde(serialize_with = "as_secs")]
    pub build: Duration,
    #[serde(serialize_with = "as_secs")]
    pub solve: Duration,
    #[serde(serialize_with = "as_secs")]
    pub total: Duration,
}

/// Decode and validate `solution` against `model`.
///
/// Matches come out in family order, then by pool index. A solution without
/// an assignment decodes to no matches.
///
/// # Errors
///
/// Returns an `InterpretError` if the assignment breaks any constraint, sets
/// an excluded pairing, or disagrees with the reported objective.
pub fn interpret(
    pools: &Dataset,
    model: &MatchModel,
    solution: &Solution,
) -> Result<Vec<Match>, InterpretError> {
    if !solution.status.has_assignment() {
        return Ok(Vec::new());
    }

    let values = &solution.values;
    if values.len() != model.variables().len() {
        return Err(InterpretError::LengthMismatch {
            expected: model.variables().len(),
            found: values.len(),
        });
    }

    for constraint in model.constraints() {
        let lhs = constraint.lhs(values);
        if lhs > constraint.rhs {
            return Err(InterpretError::ConstraintViolated {
                kind: constraint.kind,
                subject: constraint.subject,
                lhs,
                rhs: constraint.rhs,
            });
        }
    }

    let mut matches = Vec::new();
    for (variable, _) in model
        .variables()
        .iter()
        .zip(values)
        .filter(|&(_, &on)| on)
    {
        if !variable.is_open() {
            return Err(InterpretError::ExcludedVariableSet(variable.key));
        }
        let Some(kind) = MatchKind::from_family(variable.key.family()) else {
            continue;
        };
        let ((offering_role, i), (taken_role, j)) = variable
            .key
            .parties()
            .ok_or(InterpretError::UnknownParticipant(variable.key))?;
        let (Some(offering), Some(taken)) = (
            pools.pool(offering_role).get(i),
            pools.pool(taken_role).get(j),
        ) else {
            return Err(InterpretError::UnknownParticipant(variable.key));
        };

        matches.push(Match {
            kind,
            offering: Party::from(offering),
            taken: Party::from(taken),
            edge: variable
                .edge
                .unwrap_or_else(|| CandidateEdge::between(offering, taken)),
        });
    }

    let counted = matches.len() as i64;
    if counted != solution.objective || counted != model.objective_value(values) {
        return Err(InterpretError::ObjectiveMismatch {
            reported: solution.objective,
            counted,
        });
    }

    Ok(matches)
}
