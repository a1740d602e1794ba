use serde::{Deserialize, Serialize};

/// Role a participant is registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Driver,
    Rider,
    Shifter,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Driver, Role::Rider, Role::Shifter];

    /// Roles whose participants can share a trip with this one
    #[must_use]
    pub fn counterparts(self) -> &'static [Role] {
        match self {
            Self::Driver => &[Role::Rider, Role::Shifter],
            Self::Rider => &[Role::Driver, Role::Shifter],
            Self::Shifter => &[Role::Driver, Role::Rider, Role::Shifter],
        }
    }

    /// Whether participants of this role declare a seat capacity
    #[must_use]
    pub fn has_seats(self) -> bool {
        !matches!(self, Self::Rider)
    }

    /// Lowercase name used in the `type` column of datasets
    #[must_use]
    pub fn as_type_str(self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Rider => "rider",
            Self::Shifter => "shifter",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Driver => write!(f, "Driver"),
            Self::Rider => write!(f, "Rider"),
            Self::Shifter => write!(f, "Shifter"),
        }
    }
}

/// Accommodation attribute a participant states a preference for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Pet,
    Smoker,
    Disable,
}

impl Attribute {
    pub const ALL: [Attribute; 3] = [Attribute::Pet, Attribute::Smoker, Attribute::Disable];
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pet => write!(f, "Pet"),
            Self::Smoker => write!(f, "Smoker"),
            Self::Disable => write!(f, "Disable"),
        }
    }
}

/// Answer for a single attribute.
///
/// Drivers and shifters answer `Yes` or `No`; riders may also answer `Both`,
/// meaning they have no objection either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Preference {
    Yes,
    #[default]
    No,
    Both,
}

impl Preference {
    /// Parse a dataset value (case-insensitive `YES`, `NO`, `BOTH`)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "YES" => Some(Self::Yes),
            "NO" => Some(Self::No),
            "BOTH" => Some(Self::Both),
            _ => None,
        }
    }

    /// Whether a value is part of the answer domain of `role`
    #[must_use]
    pub fn allowed_for(self, role: Role) -> bool {
        role == Role::Rider || self != Self::Both
    }
}

impl std::fmt::Display for Preference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
            Self::Both => write!(f, "BOTH"),
        }
    }
}

/// The Pet / Smoker / Disable answers of one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Preferences {
    pub pet: Preference,
    pub smoker: Preference,
    pub disable: Preference,
}

impl Preferences {
    #[must_use]
    pub fn new(pet: Preference, smoker: Preference, disable: Preference) -> Self {
        Self {
            pet,
            smoker,
            disable,
        }
    }

    #[must_use]
    pub fn get(&self, attribute: Attribute) -> Preference {
        match attribute {
            Attribute::Pet => self.pet,
            Attribute::Smoker => self.smoker,
            Attribute::Disable => self.disable,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, Preference)> + '_ {
        Attribute::ALL.into_iter().map(|a| (a, self.get(a)))
    }

    /// First attribute on which a vehicle offered with these answers cannot
    /// carry a rider answering `rider`.
    ///
    /// A pair conflicts when one side says `Yes` and the other `No`. A rider's
    /// `Both` never conflicts.
    #[must_use]
    pub fn conflict_with_rider(&self, rider: &Preferences) -> Option<Attribute> {
        self.iter().map(|(a, offered)| (a, offered, rider.get(a))).find_map(
            |(a, offered, wanted)| match (offered, wanted) {
                (Preference::No, Preference::Yes) | (Preference::Yes, Preference::No) => Some(a),
                _ => None,
            },
        )
    }

    /// First attribute on which the two answer sets differ
    #[must_use]
    pub fn first_mismatch(&self, other: &Preferences) -> Option<Attribute> {
        self.iter()
            .find(|&(a, value)| other.get(a) != value)
            .map(|(a, _)| a)
    }
}

/// A point on the globe in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lon)
    }
}
