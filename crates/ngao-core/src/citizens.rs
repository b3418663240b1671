//! # Citizens
//!
//! The citizen register. Records are created directly by chiefs or as the
//! outcome of an approved birth registration, and marked deceased by an
//! approved death registration.

use crate::primitives::{MAX_NAME_LENGTH, bounded};
use crate::storage::{self, Record};
use crate::{CitizenId, NgaoError, Timestamp, UnitId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Male => "M",
            Self::Female => "F",
        })
    }
}

impl FromStr for Gender {
    type Err = NgaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" | "m" | "male" => Ok(Self::Male),
            "F" | "f" | "female" => Ok(Self::Female),
            other => Err(NgaoError::Validation(format!("unknown gender '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citizen {
    pub id: CitizenId,
    /// National ID number, once issued.
    pub id_number: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub place_of_birth: String,
    pub father_id_number: Option<String>,
    pub mother_id_number: Option<String>,
    /// Admin unit of residence.
    pub area: UnitId,
    pub is_alive: bool,
    pub date_of_death: Option<NaiveDate>,
    pub created_at: Timestamp,
}

impl Citizen {
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.middle_name {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

impl Record for Citizen {
    const TABLE: &'static str = storage::CITIZENS;

    fn key(&self) -> u64 {
        self.id.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCitizen {
    #[serde(default)]
    pub id_number: Option<String>,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub place_of_birth: String,
    #[serde(default)]
    pub father_id_number: Option<String>,
    #[serde(default)]
    pub mother_id_number: Option<String>,
    pub area: UnitId,
}

impl NewCitizen {
    pub fn validate(&self) -> Result<(), NgaoError> {
        bounded("first name", &self.first_name, MAX_NAME_LENGTH)?;
        bounded("last name", &self.last_name, MAX_NAME_LENGTH)?;
        bounded("place of birth", &self.place_of_birth, MAX_NAME_LENGTH)?;
        if let Some(middle) = &self.middle_name {
            bounded("middle name", middle, MAX_NAME_LENGTH)?;
        }
        if let Some(number) = &self.id_number {
            bounded("id number", number, MAX_NAME_LENGTH)?;
        }
        Ok(())
    }

    pub(crate) fn into_citizen(self, id: CitizenId, now: Timestamp) -> Citizen {
        Citizen {
            id,
            id_number: self.id_number.map(|n| n.trim().to_string()),
            first_name: self.first_name.trim().to_string(),
            middle_name: self.middle_name,
            last_name: self.last_name.trim().to_string(),
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            place_of_birth: self.place_of_birth,
            father_id_number: self.father_id_number,
            mother_id_number: self.mother_id_number,
            area: self.area,
            is_alive: true,
            date_of_death: None,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_codes() {
        assert_eq!("F".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!("male".parse::<Gender>(), Ok(Gender::Male));
        assert!("x".parse::<Gender>().is_err());
        assert_eq!(Gender::Male.to_string(), "M");
    }
}
