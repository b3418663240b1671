//! # Registrations
//!
//! Civil registration records: births, deaths, marriages and national ID
//! requests. Each kind has its own table, id sequence and reference prefix.

use crate::citizens::Gender;
use crate::primitives::{
    BIRTH_PREFIX, DEATH_PREFIX, MARRIAGE_PREFIX, MAX_NAME_LENGTH, MAX_TEXT_LENGTH,
    NATIONAL_ID_PREFIX, REFERENCE_TIME_FORMAT, bounded,
};
use crate::status::{BirthStatus, NationalIdStatus, RegistrationStatus, WorkflowStatus};
use crate::storage::{self, Record};
use crate::{CitizenId, EntityKind, EntityRef, NgaoError, RegistrationId, Timestamp, UnitId, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `{PREFIX}-{YYYYmmddHHMMSS}-{id:05}`
#[must_use]
pub fn reference_number(prefix: &str, at: Timestamp, id: RegistrationId) -> String {
    format!("{prefix}-{}-{:05}", at.format(REFERENCE_TIME_FORMAT), id.0)
}

/// Shared view over the four registration record types.
pub trait RegistrationRecord: Record {
    const KIND: EntityKind;
    const PREFIX: &'static str;

    fn id(&self) -> RegistrationId;
    fn admin_unit(&self) -> UnitId;
    fn initiated_by(&self) -> UserId;
    fn status_slug(&self) -> &'static str;

    /// Anything not rejected still blocks a duplicate.
    fn is_live(&self) -> bool;

    fn entity(&self) -> EntityRef {
        EntityRef::new(Self::KIND, self.id().0)
    }
}

macro_rules! registration_record {
    ($ty:ty, $table:expr, $kind:expr, $prefix:expr, $rejected:expr) => {
        impl Record for $ty {
            const TABLE: &'static str = $table;

            fn key(&self) -> u64 {
                self.id.0
            }
        }

        impl RegistrationRecord for $ty {
            const KIND: EntityKind = $kind;
            const PREFIX: &'static str = $prefix;

            fn id(&self) -> RegistrationId {
                self.id
            }

            fn admin_unit(&self) -> UnitId {
                self.admin_unit
            }

            fn initiated_by(&self) -> UserId {
                self.initiated_by
            }

            fn status_slug(&self) -> &'static str {
                self.status.slug()
            }

            fn is_live(&self) -> bool {
                self.status != $rejected
            }
        }
    };
}

/// Outcome recorded when a registration is approved or rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub by: UserId,
    pub at: Timestamp,
    pub reason: Option<String>,
}

// =============================================================================
// BIRTH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthRegistration {
    pub id: RegistrationId,
    pub reference_number: String,
    pub child_first_name: String,
    pub child_middle_name: Option<String>,
    pub child_last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub place_of_birth: String,
    pub mother: CitizenId,
    pub father: Option<CitizenId>,
    pub admin_unit: UnitId,
    pub status: BirthStatus,
    pub initiated_by: UserId,
    pub assigned_approver: Option<UserId>,
    /// Citizen created on approval.
    pub child: Option<CitizenId>,
    pub created_at: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub decision: Option<DecisionRecord>,
}

registration_record!(
    BirthRegistration,
    storage::BIRTHS,
    EntityKind::BirthRegistration,
    BIRTH_PREFIX,
    BirthStatus::Rejected
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBirth {
    pub child_first_name: String,
    #[serde(default)]
    pub child_middle_name: Option<String>,
    pub child_last_name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub place_of_birth: String,
    pub mother: CitizenId,
    #[serde(default)]
    pub father: Option<CitizenId>,
    pub admin_unit: UnitId,
}

impl NewBirth {
    pub fn validate(&self, today: NaiveDate) -> Result<(), NgaoError> {
        bounded("child first name", &self.child_first_name, MAX_NAME_LENGTH)?;
        bounded("child last name", &self.child_last_name, MAX_NAME_LENGTH)?;
        bounded("place of birth", &self.place_of_birth, MAX_NAME_LENGTH)?;
        if self.date_of_birth > today {
            return Err(NgaoError::Validation(
                "date of birth is in the future".to_string(),
            ));
        }
        if self.father == Some(self.mother) {
            return Err(NgaoError::Validation(
                "mother and father must be different citizens".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// DEATH
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRegistration {
    pub id: RegistrationId,
    pub reference_number: String,
    pub citizen: CitizenId,
    pub date_of_death: NaiveDate,
    pub place_of_death: String,
    pub cause_of_death: String,
    pub admin_unit: UnitId,
    pub status: RegistrationStatus,
    pub initiated_by: UserId,
    pub assigned_approver: Option<UserId>,
    pub created_at: Timestamp,
    pub decision: Option<DecisionRecord>,
}

registration_record!(
    DeathRegistration,
    storage::DEATHS,
    EntityKind::DeathRegistration,
    DEATH_PREFIX,
    RegistrationStatus::Rejected
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeath {
    pub citizen: CitizenId,
    pub date_of_death: NaiveDate,
    pub place_of_death: String,
    pub cause_of_death: String,
    pub admin_unit: UnitId,
}

impl NewDeath {
    pub fn validate(&self, today: NaiveDate) -> Result<(), NgaoError> {
        bounded("place of death", &self.place_of_death, MAX_NAME_LENGTH)?;
        bounded("cause of death", &self.cause_of_death, MAX_TEXT_LENGTH)?;
        if self.date_of_death > today {
            return Err(NgaoError::Validation(
                "date of death is in the future".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// MARRIAGE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarriageRegistration {
    pub id: RegistrationId,
    pub reference_number: String,
    pub husband: CitizenId,
    pub wife: CitizenId,
    pub date_of_marriage: NaiveDate,
    pub place_of_marriage: String,
    pub admin_unit: UnitId,
    pub status: RegistrationStatus,
    pub initiated_by: UserId,
    pub assigned_approver: Option<UserId>,
    pub created_at: Timestamp,
    pub decision: Option<DecisionRecord>,
}

impl MarriageRegistration {
    #[must_use]
    pub fn involves(&self, citizen: CitizenId) -> bool {
        self.husband == citizen || self.wife == citizen
    }
}

registration_record!(
    MarriageRegistration,
    storage::MARRIAGES,
    EntityKind::MarriageRegistration,
    MARRIAGE_PREFIX,
    RegistrationStatus::Rejected
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMarriage {
    pub husband: CitizenId,
    pub wife: CitizenId,
    pub date_of_marriage: NaiveDate,
    pub place_of_marriage: String,
    pub admin_unit: UnitId,
}

impl NewMarriage {
    pub fn validate(&self, today: NaiveDate) -> Result<(), NgaoError> {
        bounded("place of marriage", &self.place_of_marriage, MAX_NAME_LENGTH)?;
        if self.husband == self.wife {
            return Err(NgaoError::Validation(
                "a citizen cannot marry themselves".to_string(),
            ));
        }
        if self.date_of_marriage > today {
            return Err(NgaoError::Validation(
                "date of marriage is in the future".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// NATIONAL ID
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalIdRequest {
    pub id: RegistrationId,
    pub reference_number: String,
    pub applicant: CitizenId,
    pub mother: CitizenId,
    pub father: Option<CitizenId>,
    pub admin_unit: UnitId,
    pub status: NationalIdStatus,
    pub initiated_by: UserId,
    pub mother_verified: bool,
    pub father_verified: bool,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<Timestamp>,
    pub submitted_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    /// Number issued by the registration bureau on completion.
    pub issued_id_number: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: Timestamp,
}

registration_record!(
    NationalIdRequest,
    storage::NATIONAL_IDS,
    EntityKind::NationalIdRequest,
    NATIONAL_ID_PREFIX,
    NationalIdStatus::Rejected
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNationalId {
    pub applicant: CitizenId,
    pub mother: CitizenId,
    #[serde(default)]
    pub father: Option<CitizenId>,
    pub admin_unit: UnitId,
}

// =============================================================================
// DECISIONS
// =============================================================================

/// A birth, death or marriage registration awaiting approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationRef {
    Birth(RegistrationId),
    Death(RegistrationId),
    Marriage(RegistrationId),
}

impl RegistrationRef {
    #[must_use]
    pub fn entity(self) -> EntityRef {
        match self {
            Self::Birth(id) => EntityRef::new(EntityKind::BirthRegistration, id.0),
            Self::Death(id) => EntityRef::new(EntityKind::DeathRegistration, id.0),
            Self::Marriage(id) => EntityRef::new(EntityKind::MarriageRegistration, id.0),
        }
    }

    /// Build from an entity kind slug and id; national ID requests have their own flow.
    pub fn from_slug(kind: &str, id: RegistrationId) -> Result<Self, NgaoError> {
        match EntityKind::from_slug(kind)? {
            EntityKind::BirthRegistration => Ok(Self::Birth(id)),
            EntityKind::DeathRegistration => Ok(Self::Death(id)),
            EntityKind::MarriageRegistration => Ok(Self::Marriage(id)),
            other => Err(NgaoError::Validation(format!(
                "{other} records are not decided through registration approval"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approve,
    Reject { reason: String },
}

impl Decision {
    pub fn validate(&self) -> Result<(), NgaoError> {
        match self {
            Self::Approve => Ok(()),
            Self::Reject { reason } => bounded("rejection reason", reason, MAX_TEXT_LENGTH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn reference_number_layout() {
        let at = Utc.with_ymd_and_hms(2024, 2, 29, 13, 5, 9).single().expect("time");
        assert_eq!(
            reference_number(BIRTH_PREFIX, at, RegistrationId(42)),
            "BIRTH-20240229130509-00042"
        );
        assert_eq!(
            reference_number(MARRIAGE_PREFIX, at, RegistrationId(123_456)),
            "MARR-20240229130509-123456"
        );
    }

    #[test]
    fn marriage_rejects_self_marriage() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).expect("date");
        let new = NewMarriage {
            husband: CitizenId(3),
            wife: CitizenId(3),
            date_of_marriage: today,
            place_of_marriage: "Nyeri".into(),
            admin_unit: UnitId(1),
        };
        assert!(matches!(new.validate(today), Err(NgaoError::Validation(_))));
    }

    #[test]
    fn registration_ref_from_slug() {
        assert_eq!(
            RegistrationRef::from_slug("death", RegistrationId(2)),
            Ok(RegistrationRef::Death(RegistrationId(2)))
        );
        assert!(RegistrationRef::from_slug("national_id", RegistrationId(2)).is_err());
        assert!(RegistrationRef::from_slug("incident", RegistrationId(2)).is_err());
    }
}
