//! # Duplicate Guard
//!
//! Stops the same person or event from being registered twice. A registration
//! blocks duplicates while it is live (any status except rejected).

use crate::citizens::Citizen;
use crate::registrations::{
    BirthRegistration, DeathRegistration, MarriageRegistration, NationalIdRequest, NewBirth,
    NewMarriage, RegistrationRecord,
};
use crate::NgaoError;

fn normalized(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Same mother, same date of birth and same child first and last name.
pub fn check_birth<'a>(
    new: &NewBirth,
    existing: impl IntoIterator<Item = &'a BirthRegistration>,
) -> Result<(), NgaoError> {
    let first = normalized(&new.child_first_name);
    let last = normalized(&new.child_last_name);
    let clash = existing.into_iter().find(|b| {
        b.is_live()
            && b.mother == new.mother
            && b.date_of_birth == new.date_of_birth
            && normalized(&b.child_first_name) == first
            && normalized(&b.child_last_name) == last
    });
    match clash {
        Some(b) => Err(NgaoError::Duplicate(format!(
            "birth of {} {} is already registered as {}",
            new.child_first_name.trim(),
            new.child_last_name.trim(),
            b.reference_number
        ))),
        None => Ok(()),
    }
}

/// Citizen already deceased, or a live death registration exists.
pub fn check_death<'a>(
    citizen: &Citizen,
    existing: impl IntoIterator<Item = &'a DeathRegistration>,
) -> Result<(), NgaoError> {
    if !citizen.is_alive {
        return Err(NgaoError::Duplicate(format!(
            "citizen {} is already recorded as deceased",
            citizen.id
        )));
    }
    match existing
        .into_iter()
        .find(|d| d.is_live() && d.citizen == citizen.id)
    {
        Some(d) => Err(NgaoError::Duplicate(format!(
            "death of citizen {} is already registered as {}",
            citizen.id, d.reference_number
        ))),
        None => Ok(()),
    }
}

/// Either spouse already appears in a live marriage registration.
pub fn check_marriage<'a>(
    new: &NewMarriage,
    existing: impl IntoIterator<Item = &'a MarriageRegistration>,
) -> Result<(), NgaoError> {
    if new.husband == new.wife {
        return Err(NgaoError::Validation(
            "a citizen cannot marry themselves".to_string(),
        ));
    }
    for m in existing.into_iter().filter(|m| m.is_live()) {
        for spouse in [new.husband, new.wife] {
            if m.involves(spouse) {
                return Err(NgaoError::Duplicate(format!(
                    "citizen {spouse} already has a marriage registration ({})",
                    m.reference_number
                )));
            }
        }
    }
    Ok(())
}

/// Applicant already holds a number or has a live request.
pub fn check_national_id<'a>(
    applicant: &Citizen,
    existing: impl IntoIterator<Item = &'a NationalIdRequest>,
) -> Result<(), NgaoError> {
    if applicant.id_number.is_some() {
        return Err(NgaoError::Duplicate(format!(
            "citizen {} already holds a national ID",
            applicant.id
        )));
    }
    match existing
        .into_iter()
        .find(|r| r.is_live() && r.applicant == applicant.id)
    {
        Some(r) => Err(NgaoError::Duplicate(format!(
            "citizen {} already has a national ID request ({})",
            applicant.id, r.reference_number
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citizens::Gender;
    use crate::status::{BirthStatus, RegistrationStatus};
    use crate::{CitizenId, RegistrationId, UnitId, UserId};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn birth(status: BirthStatus) -> BirthRegistration {
        BirthRegistration {
            id: RegistrationId(1),
            reference_number: "BIRTH-20240101000000-00001".into(),
            child_first_name: "Achieng".into(),
            child_middle_name: None,
            child_last_name: "Otieno".into(),
            gender: Gender::Female,
            date_of_birth: date(2024, 1, 1),
            place_of_birth: "Kisumu".into(),
            mother: CitizenId(5),
            father: None,
            admin_unit: UnitId(1),
            status,
            initiated_by: UserId(1),
            assigned_approver: None,
            child: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single().expect("time"),
            submitted_at: None,
            decision: None,
        }
    }

    fn new_birth(first: &str) -> NewBirth {
        NewBirth {
            child_first_name: first.into(),
            child_middle_name: None,
            child_last_name: "otieno ".into(),
            gender: Gender::Female,
            date_of_birth: date(2024, 1, 1),
            place_of_birth: "Kisumu".into(),
            mother: CitizenId(5),
            father: None,
            admin_unit: UnitId(1),
        }
    }

    #[test]
    fn birth_names_compare_normalized() {
        let existing = [birth(BirthStatus::Submitted)];
        assert!(matches!(
            check_birth(&new_birth(" ACHIENG"), &existing),
            Err(NgaoError::Duplicate(_))
        ));
        assert!(check_birth(&new_birth("Akinyi"), &existing).is_ok());
    }

    #[test]
    fn rejected_births_do_not_block() {
        let existing = [birth(BirthStatus::Rejected)];
        assert!(check_birth(&new_birth("Achieng"), &existing).is_ok());
    }

    #[test]
    fn marriage_blocks_either_spouse() {
        let existing = MarriageRegistration {
            id: RegistrationId(1),
            reference_number: "MARR-1".into(),
            husband: CitizenId(1),
            wife: CitizenId(2),
            date_of_marriage: date(2023, 12, 1),
            place_of_marriage: "Nakuru".into(),
            admin_unit: UnitId(1),
            status: RegistrationStatus::Approved,
            initiated_by: UserId(1),
            assigned_approver: None,
            created_at: Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).single().expect("time"),
            decision: None,
        };
        let new = NewMarriage {
            husband: CitizenId(3),
            wife: CitizenId(2),
            date_of_marriage: date(2024, 3, 1),
            place_of_marriage: "Nakuru".into(),
            admin_unit: UnitId(1),
        };
        assert!(matches!(
            check_marriage(&new, [&existing]),
            Err(NgaoError::Duplicate(_))
        ));

        let mut rejected = existing.clone();
        rejected.status = RegistrationStatus::Rejected;
        assert!(check_marriage(&new, [&rejected]).is_ok());
    }
}
