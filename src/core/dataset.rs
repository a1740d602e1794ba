use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::core::participant::Participant;
use crate::core::types::Role;
use crate::utils::validation::{DataValidationError, MAX_PARTICIPANTS_PER_ROLE};

/// Number of participants per role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub drivers: usize,
    pub riders: usize,
    pub shifters: usize,
}

impl RoleCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.drivers + self.riders + self.shifters
    }

    #[must_use]
    pub fn get(&self, role: Role) -> usize {
        match role {
            Role::Driver => self.drivers,
            Role::Rider => self.riders,
            Role::Shifter => self.shifters,
        }
    }
}

/// The three participant pools of one batch run.
///
/// Pools are immutable once built: every pool holds only participants of its
/// own role and ids are unique within a role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    drivers: Vec<Participant>,
    riders: Vec<Participant>,
    shifters: Vec<Participant>,
}

impl Dataset {
    /// Assemble a dataset from per-role pools
    ///
    /// # Errors
    ///
    /// Returns `DataValidationError::WrongRole` if a participant sits in the
    /// wrong pool, `DuplicateId` for repeated ids within a role, or
    /// `TooManyParticipants` if a pool exceeds the per-role limit.
    pub fn new(
        drivers: Vec<Participant>,
        riders: Vec<Participant>,
        shifters: Vec<Participant>,
    ) -> Result<Self, DataValidationError> {
        check_pool(Role::Driver, &drivers)?;
        check_pool(Role::Rider, &riders)?;
        check_pool(Role::Shifter, &shifters)?;
        Ok(Self {
            drivers,
            riders,
            shifters,
        })
    }

    /// Build from pools already known to satisfy the dataset invariants
    /// (subsets of a validated dataset).
    pub(crate) fn from_validated(
        drivers: Vec<Participant>,
        riders: Vec<Participant>,
        shifters: Vec<Participant>,
    ) -> Self {
        Self {
            drivers,
            riders,
            shifters,
        }
    }

    #[must_use]
    pub fn drivers(&self) -> &[Participant] {
        &self.drivers
    }

    #[must_use]
    pub fn riders(&self) -> &[Participant] {
        &self.riders
    }

    #[must_use]
    pub fn shifters(&self) -> &[Participant] {
        &self.shifters
    }

    #[must_use]
    pub fn pool(&self, role: Role) -> &[Participant] {
        match role {
            Role::Driver => &self.drivers,
            Role::Rider => &self.riders,
            Role::Shifter => &self.shifters,
        }
    }

    #[must_use]
    pub fn counts(&self) -> RoleCounts {
        RoleCounts {
            drivers: self.drivers.len(),
            riders: self.riders.len(),
            shifters: self.shifters.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.drivers
            .iter()
            .chain(self.riders.iter())
            .chain(self.shifters.iter())
    }

    /// Total seats offered by drivers and shifters
    #[must_use]
    pub fn total_seats(&self) -> u64 {
        self.iter()
            .filter_map(Participant::seats)
            .map(u64::from)
            .sum()
    }

    /// Earliest and latest departure in the batch
    #[must_use]
    pub fn departure_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut departures = self.iter().map(Participant::departure);
        let first = departures.next()?;
        Some(departures.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }
}

fn check_pool(role: Role, pool: &[Participant]) -> Result<(), DataValidationError> {
    if pool.len() > MAX_PARTICIPANTS_PER_ROLE {
        return Err(DataValidationError::TooManyParticipants { role });
    }

    let mut seen = HashSet::with_capacity(pool.len());
    for participant in pool {
        if participant.role() != role {
            return Err(DataValidationError::WrongRole {
                role,
                found: participant.role(),
                id: participant.id().to_string(),
            });
        }
        if !seen.insert(participant.id()) {
            return Err(DataValidationError::DuplicateId {
                role,
                id: participant.id().to_string(),
            });
        }
    }
    Ok(())
}
