//! # Officers
//!
//! System users: administration officers, police and the superuser.

use crate::primitives::{MAX_NAME_LENGTH, bounded, normalize_phone, valid_phone};
use crate::roles::Role;
use crate::storage::{self, Record};
use crate::{NgaoError, Timestamp, UnitId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub badge_number: Option<String>,
    pub role: Role,
    /// Unit the officer is posted to. Officers without a unit have no territorial scope.
    pub admin_unit: Option<UnitId>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: Timestamp,
}

impl Officer {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Record for Officer {
    const TABLE: &'static str = storage::OFFICERS;

    fn key(&self) -> u64 {
        self.id.0
    }
}

/// Input for creating an officer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOfficer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    #[serde(default)]
    pub badge_number: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub admin_unit: Option<UnitId>,
}

impl NewOfficer {
    /// Field-level checks that do not need the officer directory.
    pub fn validate(&self) -> Result<(), NgaoError> {
        bounded("first name", &self.first_name, MAX_NAME_LENGTH)?;
        bounded("last name", &self.last_name, MAX_NAME_LENGTH)?;
        bounded("email", &self.email, MAX_NAME_LENGTH)?;
        if !self.email.contains('@') {
            return Err(NgaoError::Validation(format!(
                "invalid email '{}'",
                self.email
            )));
        }
        if !valid_phone(&self.phone) {
            return Err(NgaoError::Validation(format!(
                "invalid phone number '{}'",
                self.phone
            )));
        }
        if let Some(badge) = &self.badge_number {
            bounded("badge number", badge, MAX_NAME_LENGTH)?;
        }
        Ok(())
    }

    /// Reject email, phone or badge numbers already held by another officer.
    pub fn check_unique<'a>(
        &self,
        existing: impl IntoIterator<Item = &'a Officer>,
    ) -> Result<(), NgaoError> {
        let email = self.email.trim().to_lowercase();
        let phone = normalize_phone(&self.phone);
        for officer in existing {
            if officer.email.trim().to_lowercase() == email {
                return Err(NgaoError::Duplicate(format!(
                    "email '{}' is already registered",
                    self.email
                )));
            }
            if normalize_phone(&officer.phone) == phone {
                return Err(NgaoError::Duplicate(format!(
                    "phone '{}' is already registered",
                    self.phone
                )));
            }
            if self.badge_number.is_some() && officer.badge_number == self.badge_number {
                return Err(NgaoError::Duplicate(
                    "badge number is already registered".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn into_officer(self, id: UserId, is_superuser: bool, now: Timestamp) -> Officer {
        Officer {
            id,
            email: self.email.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: self.phone,
            badge_number: self.badge_number,
            role: self.role,
            admin_unit: self.admin_unit,
            is_active: true,
            is_superuser,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn new_officer(email: &str, phone: &str) -> NewOfficer {
        NewOfficer {
            email: email.into(),
            first_name: "Wanjiku".into(),
            last_name: "Kamau".into(),
            phone: phone.into(),
            badge_number: None,
            role: Role::Chief,
            admin_unit: None,
        }
    }

    #[test]
    fn validation_rules() {
        assert!(new_officer("w@ngao.go.ke", "+254711000001").validate().is_ok());
        assert!(new_officer("not-an-email", "+254711000001").validate().is_err());
        assert!(new_officer("w@ngao.go.ke", "07-11").validate().is_err());
        let mut blank = new_officer("w@ngao.go.ke", "+254711000001");
        blank.first_name = "  ".into();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn uniqueness_is_case_insensitive_on_email() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).single().expect("time");
        let existing = new_officer("W@ngao.go.ke", "+254711000001").into_officer(UserId(1), false, now);
        let clash = new_officer("w@ngao.go.ke", "+254711000002");
        assert!(matches!(
            clash.check_unique([&existing]),
            Err(NgaoError::Duplicate(_))
        ));
        let phone_clash = new_officer("x@ngao.go.ke", "+254711000001");
        assert!(phone_clash.check_unique([&existing]).is_err());
        let fresh = new_officer("y@ngao.go.ke", "+254711000003");
        assert!(fresh.check_unique([&existing]).is_ok());
    }

    #[test]
    fn local_phone_form_clashes_with_international() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).single().expect("time");
        let existing = new_officer("w@ngao.go.ke", "+254711000001").into_officer(UserId(1), false, now);
        let local = new_officer("x@ngao.go.ke", "0711000001");
        assert!(matches!(
            local.check_unique([&existing]),
            Err(NgaoError::Duplicate(msg)) if msg.contains("phone")
        ));
    }
}
