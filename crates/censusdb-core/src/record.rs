//! Record model: primary keys, attribute enums, and patches.
//!
//! A record is a 9-digit key plus two indexed attributes. Both attributes
//! serialize as their display strings so the on-disk index files stay
//! self-describing for the bulk-load collaborator.

use crate::error::{Error, Result};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of digits a record key must have.
pub const KEY_DIGITS: usize = 9;

/// The primary key of a record: a 9-digit numeric string.
///
/// Construction validates the format, so a `RecordKey` in hand is always
/// well-formed. Ordering is the lexicographic string order, which for
/// fixed-width digit strings matches numeric order — bucket files rely on
/// this for their sorted layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey(String);

impl RecordKey {
    /// Create a key from a string, validating that it is exactly nine
    /// ASCII digits.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.len() != KEY_DIGITS {
            return Err(Error::InvalidKey(format!(
                "expected {} digits, got {} characters",
                KEY_DIGITS,
                raw.len()
            )));
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidKey(format!(
                "key {:?} contains a non-digit character",
                raw
            )));
        }
        Ok(RecordKey(raw))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        RecordKey::new(s)
    }
}

impl Serialize for RecordKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordKey {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        RecordKey::new(raw).map_err(de::Error::custom)
    }
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $(
                #[allow(missing_docs)]
                $variant,
            )+
        }

        impl $name {
            /// All values, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The canonical display string for this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::Serialization(format!(
                        concat!("unknown ", stringify!($name), " value: {:?}"),
                        other
                    ))),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

string_enum! {
    /// The 50 US states a record can carry.
    State {
        Alabama => "Alabama",
        Alaska => "Alaska",
        Arizona => "Arizona",
        Arkansas => "Arkansas",
        California => "California",
        Colorado => "Colorado",
        Connecticut => "Connecticut",
        Delaware => "Delaware",
        Florida => "Florida",
        Georgia => "Georgia",
        Hawaii => "Hawaii",
        Idaho => "Idaho",
        Illinois => "Illinois",
        Indiana => "Indiana",
        Iowa => "Iowa",
        Kansas => "Kansas",
        Kentucky => "Kentucky",
        Louisiana => "Louisiana",
        Maine => "Maine",
        Maryland => "Maryland",
        Massachusetts => "Massachusetts",
        Michigan => "Michigan",
        Minnesota => "Minnesota",
        Mississippi => "Mississippi",
        Missouri => "Missouri",
        Montana => "Montana",
        Nebraska => "Nebraska",
        Nevada => "Nevada",
        NewHampshire => "New Hampshire",
        NewJersey => "New Jersey",
        NewMexico => "New Mexico",
        NewYork => "New York",
        NorthCarolina => "North Carolina",
        NorthDakota => "North Dakota",
        Ohio => "Ohio",
        Oklahoma => "Oklahoma",
        Oregon => "Oregon",
        Pennsylvania => "Pennsylvania",
        RhodeIsland => "Rhode Island",
        SouthCarolina => "South Carolina",
        SouthDakota => "South Dakota",
        Tennessee => "Tennessee",
        Texas => "Texas",
        Utah => "Utah",
        Vermont => "Vermont",
        Virginia => "Virginia",
        Washington => "Washington",
        WestVirginia => "West Virginia",
        Wisconsin => "Wisconsin",
        Wyoming => "Wyoming",
    }
}

string_enum! {
    /// The fixed set of occupations a record can carry.
    Occupation {
        Accountant => "Accountant",
        Engineer => "Engineer",
        Teacher => "Teacher",
        Nurse => "Nurse",
        Doctor => "Doctor",
        Lawyer => "Lawyer",
        Salesperson => "Salesperson",
        Manager => "Manager",
        Clerk => "Clerk",
        Mechanic => "Mechanic",
    }
}

/// A single demographic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Globally unique 9-digit primary key
    pub key: RecordKey,
    /// Indexed state attribute
    pub state: State,
    /// Indexed occupation attribute
    pub occupation: Occupation,
}

impl Record {
    /// Create a record from its parts.
    pub fn new(key: RecordKey, state: State, occupation: Occupation) -> Self {
        Self {
            key,
            state,
            occupation,
        }
    }
}

/// A partial update to a record's non-key attributes.
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    /// New state, if changing
    pub state: Option<State>,
    /// New occupation, if changing
    pub occupation: Option<Occupation>,
}

impl RecordPatch {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state attribute.
    pub fn state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    /// Set the occupation attribute.
    pub fn occupation(mut self, occupation: Occupation) -> Self {
        self.occupation = Some(occupation);
        self
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.occupation.is_none()
    }

    /// The record that results from applying this patch.
    pub fn apply(&self, record: &Record) -> Record {
        Record {
            key: record.key.clone(),
            state: self.state.unwrap_or(record.state),
            occupation: self.occupation.unwrap_or(record.occupation),
        }
    }
}
