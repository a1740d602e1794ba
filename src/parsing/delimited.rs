//! CSV datasets.
//!
//! Two layouts are read:
//!
//! - a directory holding `Driver.csv`, `Rider.csv` and `Shifter.csv`
//!   (lowercase file names are accepted too), one role per file;
//! - a single CSV file whose `type` column names each row's role.
//!
//! Columns: `id,type,route_start,Start_lat,Start_lon,route_end,End_lat,End_lon,departure_time,seats,Pet,Smoker,Disable`.
//! `type` is optional in the per-role layout and `seats` may be empty for riders.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::core::dataset::Dataset;
use crate::core::participant::Participant;
use crate::core::types::Role;
use crate::parsing::record::{ParticipantRecord, RawRecord};
use crate::parsing::ParseError;
use crate::utils::validation::{check_participant_limit, DataValidationError};

/// Read a directory of per-role CSV files
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if a role file is missing, or any
/// read/validation error for the files themselves.
pub fn parse_dataset_dir(dir: &Path) -> Result<Dataset, ParseError> {
    let mut pools = Vec::with_capacity(3);
    for role in Role::ALL {
        let path = role_file(dir, role).ok_or_else(|| {
            ParseError::InvalidFormat(format!(
                "missing {role}.csv in {}",
                dir.display()
            ))
        })?;
        let reader = std::fs::File::open(&path)?;
        pools.push(parse_role_csv(reader, role)?);
    }

    let shifters = pools.pop().unwrap_or_default();
    let riders = pools.pop().unwrap_or_default();
    let drivers = pools.pop().unwrap_or_default();
    Ok(Dataset::new(drivers, riders, shifters)?)
}

fn role_file(dir: &Path, role: Role) -> Option<PathBuf> {
    [role.to_string(), role.as_type_str().to_string()]
        .into_iter()
        .map(|stem| dir.join(format!("{stem}.csv")))
        .find(|path| path.is_file())
}

/// Parse one role's CSV records
///
/// # Errors
///
/// Returns `ParseError::Csv` for malformed CSV and `ParseError::Validation`
/// for the first invalid record.
pub fn parse_role_csv<R: Read>(reader: R, role: Role) -> Result<Vec<Participant>, ParseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut participants = Vec::new();
    for (i, result) in csv_reader.deserialize::<RawRecord>().enumerate() {
        // Row numbers count the header line, matching what a spreadsheet shows
        let row = i + 2;
        let raw = result?;

        if check_participant_limit(participants.len()) {
            return Err(DataValidationError::TooManyParticipants { role }.into());
        }
        participants.push(raw.into_participant(role, row)?);
    }
    Ok(participants)
}

/// Parse a single CSV holding all roles, dispatching on the `type` column
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` for rows with a missing or unknown
/// `type`, plus any CSV or validation error.
pub fn parse_mixed_csv<R: Read>(reader: R) -> Result<Dataset, ParseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let (mut drivers, mut riders, mut shifters) = (Vec::new(), Vec::new(), Vec::new());
    for (i, result) in csv_reader.deserialize::<RawRecord>().enumerate() {
        let row = i + 2;
        let raw = result?;
        let role = match raw.kind.as_deref().map(|k| k.trim().to_lowercase()).as_deref() {
            Some("driver") => Role::Driver,
            Some("rider") => Role::Rider,
            Some("shifter") => Role::Shifter,
            other => {
                return Err(ParseError::InvalidFormat(format!(
                    "{}: unknown type '{}'",
                    raw.locator(row),
                    other.unwrap_or("")
                )))
            }
        };

        let pool = match role {
            Role::Driver => &mut drivers,
            Role::Rider => &mut riders,
            Role::Shifter => &mut shifters,
        };
        if check_participant_limit(pool.len()) {
            return Err(DataValidationError::TooManyParticipants { role }.into());
        }
        pool.push(raw.into_participant(role, row)?);
    }

    Ok(Dataset::new(drivers, riders, shifters)?)
}

/// Read a single mixed-role CSV file
///
/// # Errors
///
/// See [`parse_mixed_csv`].
pub fn parse_mixed_file(path: &Path) -> Result<Dataset, ParseError> {
    parse_mixed_csv(std::fs::File::open(path)?)
}

/// Write one role's participants as CSV
///
/// # Errors
///
/// Returns `ParseError::Csv` if a record cannot be written.
pub fn write_role_csv<W: std::io::Write>(
    writer: W,
    participants: &[Participant],
) -> Result<(), ParseError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for participant in participants {
        csv_writer.serialize(ParticipantRecord::from(participant))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a dataset as `Driver.csv`, `Rider.csv` and `Shifter.csv` in `dir`,
/// creating the directory if needed
///
/// # Errors
///
/// Returns `ParseError::Io` or `ParseError::Csv` on write failure.
pub fn write_dataset_dir(dataset: &Dataset, dir: &Path) -> Result<(), ParseError> {
    std::fs::create_dir_all(dir)?;
    for role in Role::ALL {
        let file = std::fs::File::create(dir.join(format!("{role}.csv")))?;
        write_role_csv(file, dataset.pool(role))?;
    }
    Ok(())
}
