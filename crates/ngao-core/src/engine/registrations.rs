//! Birth, death, marriage and national ID workflows.

use super::{Change, Engine};
use crate::citizens::{Citizen, Gender};
use crate::duplicates;
use crate::escalation::next_approver;
use crate::officers::Officer;
use crate::permissions::Permission;
use crate::primitives::{MAX_NAME_LENGTH, MAX_TEXT_LENGTH, bounded};
use crate::registrations::{
    BirthRegistration, DeathRegistration, Decision, DecisionRecord, MarriageRegistration,
    NationalIdRequest, NewBirth, NewDeath, NewMarriage, NewNationalId, RegistrationRecord,
    RegistrationRef, reference_number,
};
use crate::status::{
    BirthStatus, NationalIdStatus, RegistrationStatus, WorkflowStatus, check_transition,
    check_transition_as,
};
use crate::storage::{self, RecordStore};
use crate::{CitizenId, EntityKind, EntityRef, NgaoError, RegistrationId, Timestamp, UnitId, UserId};
use serde::{Deserialize, Serialize};

/// Result of approving or rejecting a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub entity: EntityRef,
    pub status: String,
    /// Citizen created (birth) or updated (death) by an approval.
    pub citizen: Option<CitizenId>,
}

impl Engine {
    // =========================================================================
    // BIRTH
    // =========================================================================

    /// Open a birth registration as a draft.
    pub fn create_birth(
        &mut self,
        actor: UserId,
        new: NewBirth,
        now: Timestamp,
    ) -> Result<BirthRegistration, NgaoError> {
        let actor = self.actor(actor)?;
        self.gate().authorize(
            &actor,
            Permission::REGISTRATIONS_CREATE,
            Some(new.admin_unit),
        )?;
        self.tree.get(new.admin_unit)?;
        new.validate(now.date_naive())?;
        let mother = self.parent(new.mother, Gender::Female, "mother")?;
        if new.date_of_birth < mother.date_of_birth {
            return Err(NgaoError::Validation(
                "child cannot be born before the mother".to_string(),
            ));
        }
        if let Some(father) = new.father {
            self.parent(father, Gender::Male, "father")?;
        }
        duplicates::check_birth(&new, &self.store.all::<BirthRegistration>()?)?;

        let mut change = self.begin();
        let id = RegistrationId(change.allocate(&self.store, storage::BIRTHS)?);
        let birth = BirthRegistration {
            id,
            reference_number: reference_number(BirthRegistration::PREFIX, now, id),
            child_first_name: new.child_first_name.trim().to_string(),
            child_middle_name: new.child_middle_name,
            child_last_name: new.child_last_name.trim().to_string(),
            gender: new.gender,
            date_of_birth: new.date_of_birth,
            place_of_birth: new.place_of_birth,
            mother: new.mother,
            father: new.father,
            admin_unit: new.admin_unit,
            status: BirthStatus::Draft,
            initiated_by: actor.id,
            assigned_approver: None,
            child: None,
            created_at: now,
            submitted_at: None,
            decision: None,
        };
        change.put(&birth)?;
        change.transition(
            &self.store,
            birth.entity(),
            None,
            birth.status.slug(),
            actor.id,
            None,
            now,
        )?;
        self.commit(change)?;
        Ok(birth)
    }

    /// Submit a draft birth registration for approval.
    pub fn submit_birth(
        &mut self,
        actor: UserId,
        id: RegistrationId,
        now: Timestamp,
    ) -> Result<BirthRegistration, NgaoError> {
        let actor = self.actor(actor)?;
        let mut birth: BirthRegistration = self.load("birth registration", id.0)?;
        let from = birth.status;
        check_transition(from, BirthStatus::Submitted)?;
        self.gate().authorize(
            &actor,
            from.required_permission(BirthStatus::Submitted),
            Some(birth.admin_unit),
        )?;
        let initiator: Officer = self.load("officer", birth.initiated_by.0)?;

        birth.status = BirthStatus::Submitted;
        birth.submitted_at = Some(now);
        birth.assigned_approver = self.approver_for(birth.admin_unit, &initiator)?;

        let mut change = self.begin();
        change.put(&birth)?;
        change.transition(
            &self.store,
            birth.entity(),
            Some(from.slug()),
            birth.status.slug(),
            actor.id,
            None,
            now,
        )?;
        self.notify_approver(&mut change, &birth, birth.assigned_approver, now)?;
        self.commit(change)?;
        Ok(birth)
    }

    // =========================================================================
    // DEATH
    // =========================================================================

    /// File a death registration. It starts submitted.
    pub fn file_death(
        &mut self,
        actor: UserId,
        new: NewDeath,
        now: Timestamp,
    ) -> Result<DeathRegistration, NgaoError> {
        let actor = self.actor(actor)?;
        self.gate().authorize(
            &actor,
            Permission::REGISTRATIONS_CREATE,
            Some(new.admin_unit),
        )?;
        self.tree.get(new.admin_unit)?;
        new.validate(now.date_naive())?;
        let citizen = self.citizen(new.citizen)?;
        if new.date_of_death < citizen.date_of_birth {
            return Err(NgaoError::Validation(
                "date of death is before the date of birth".to_string(),
            ));
        }
        duplicates::check_death(&citizen, &self.store.all::<DeathRegistration>()?)?;

        let mut change = self.begin();
        let id = RegistrationId(change.allocate(&self.store, storage::DEATHS)?);
        let death = DeathRegistration {
            id,
            reference_number: reference_number(DeathRegistration::PREFIX, now, id),
            citizen: new.citizen,
            date_of_death: new.date_of_death,
            place_of_death: new.place_of_death,
            cause_of_death: new.cause_of_death,
            admin_unit: new.admin_unit,
            status: RegistrationStatus::Submitted,
            initiated_by: actor.id,
            assigned_approver: self.approver_for(new.admin_unit, &actor)?,
            created_at: now,
            decision: None,
        };
        change.put(&death)?;
        change.transition(
            &self.store,
            death.entity(),
            None,
            death.status.slug(),
            actor.id,
            None,
            now,
        )?;
        self.notify_approver(&mut change, &death, death.assigned_approver, now)?;
        self.commit(change)?;
        Ok(death)
    }

    // =========================================================================
    // MARRIAGE
    // =========================================================================

    /// File a marriage registration. It starts submitted.
    pub fn file_marriage(
        &mut self,
        actor: UserId,
        new: NewMarriage,
        now: Timestamp,
    ) -> Result<MarriageRegistration, NgaoError> {
        let actor = self.actor(actor)?;
        self.gate().authorize(
            &actor,
            Permission::REGISTRATIONS_CREATE,
            Some(new.admin_unit),
        )?;
        self.tree.get(new.admin_unit)?;
        new.validate(now.date_naive())?;
        for spouse in [new.husband, new.wife] {
            let citizen = self.citizen(spouse)?;
            if !citizen.is_alive {
                return Err(NgaoError::Validation(format!(
                    "citizen {spouse} is deceased"
                )));
            }
        }
        duplicates::check_marriage(&new, &self.store.all::<MarriageRegistration>()?)?;

        let mut change = self.begin();
        let id = RegistrationId(change.allocate(&self.store, storage::MARRIAGES)?);
        let marriage = MarriageRegistration {
            id,
            reference_number: reference_number(MarriageRegistration::PREFIX, now, id),
            husband: new.husband,
            wife: new.wife,
            date_of_marriage: new.date_of_marriage,
            place_of_marriage: new.place_of_marriage,
            admin_unit: new.admin_unit,
            status: RegistrationStatus::Submitted,
            initiated_by: actor.id,
            assigned_approver: self.approver_for(new.admin_unit, &actor)?,
            created_at: now,
            decision: None,
        };
        change.put(&marriage)?;
        change.transition(
            &self.store,
            marriage.entity(),
            None,
            marriage.status.slug(),
            actor.id,
            None,
            now,
        )?;
        self.notify_approver(&mut change, &marriage, marriage.assigned_approver, now)?;
        self.commit(change)?;
        Ok(marriage)
    }

    // =========================================================================
    // DECISIONS
    // =========================================================================

    /// Approve or reject a submitted birth, death or marriage registration.
    ///
    /// The initiating officer cannot decide their own registration unless
    /// they are a superuser.
    pub fn decide_registration(
        &mut self,
        actor: UserId,
        registration: RegistrationRef,
        decision: Decision,
        now: Timestamp,
    ) -> Result<DecisionOutcome, NgaoError> {
        let actor = self.actor(actor)?;
        decision.validate()?;
        let record = DecisionRecord {
            by: actor.id,
            at: now,
            reason: match &decision {
                Decision::Approve => None,
                Decision::Reject { reason } => Some(reason.trim().to_string()),
            },
        };
        let approve = decision == Decision::Approve;
        let mut change = self.begin();

        let outcome = match registration {
            RegistrationRef::Birth(id) => {
                let mut birth: BirthRegistration = self.load("birth registration", id.0)?;
                let from = birth.status;
                let to = if approve {
                    BirthStatus::Approved
                } else {
                    BirthStatus::Rejected
                };
                check_transition(from, to)?;
                self.check_decider(&actor, from.required_permission(to), &birth)?;

                if approve {
                    let child = self.child_citizen(&mut change, &birth, now)?;
                    birth.child = Some(child.id);
                    change.put(&child)?;
                }
                birth.status = to;
                birth.decision = Some(record);
                change.put(&birth)?;
                self.stage_decision(&mut change, &birth, from.slug(), &actor, now)?;
                DecisionOutcome {
                    entity: birth.entity(),
                    status: to.slug().to_string(),
                    citizen: birth.child,
                }
            }
            RegistrationRef::Death(id) => {
                let mut death: DeathRegistration = self.load("death registration", id.0)?;
                let from = death.status;
                let to = Self::registration_target(approve);
                check_transition_as(EntityKind::DeathRegistration, from, to)?;
                self.check_decider(&actor, from.required_permission(to), &death)?;

                let mut citizen = None;
                if approve {
                    let mut deceased = self.citizen(death.citizen)?;
                    deceased.is_alive = false;
                    deceased.date_of_death = Some(death.date_of_death);
                    change.put(&deceased)?;
                    citizen = Some(deceased.id);
                }
                death.status = to;
                death.decision = Some(record);
                change.put(&death)?;
                self.stage_decision(&mut change, &death, from.slug(), &actor, now)?;
                DecisionOutcome {
                    entity: death.entity(),
                    status: to.slug().to_string(),
                    citizen,
                }
            }
            RegistrationRef::Marriage(id) => {
                let mut marriage: MarriageRegistration =
                    self.load("marriage registration", id.0)?;
                let from = marriage.status;
                let to = Self::registration_target(approve);
                check_transition_as(EntityKind::MarriageRegistration, from, to)?;
                self.check_decider(&actor, from.required_permission(to), &marriage)?;

                marriage.status = to;
                marriage.decision = Some(record);
                change.put(&marriage)?;
                self.stage_decision(&mut change, &marriage, from.slug(), &actor, now)?;
                DecisionOutcome {
                    entity: marriage.entity(),
                    status: to.slug().to_string(),
                    citizen: None,
                }
            }
        };
        self.commit(change)?;
        Ok(outcome)
    }

    fn registration_target(approve: bool) -> RegistrationStatus {
        if approve {
            RegistrationStatus::Approved
        } else {
            RegistrationStatus::Rejected
        }
    }

    /// Permission, scope and maker-checker rule for a decision.
    fn check_decider<R: RegistrationRecord>(
        &self,
        actor: &Officer,
        permission: Permission,
        record: &R,
    ) -> Result<(), NgaoError> {
        self.gate()
            .authorize(actor, permission, Some(record.admin_unit()))?;
        if record.initiated_by() == actor.id && !actor.is_superuser {
            return Err(NgaoError::HierarchyViolation(format!(
                "officer {} initiated {} and cannot decide it",
                actor.id,
                record.entity()
            )));
        }
        Ok(())
    }

    /// Citizen record for the child of an approved birth.
    fn child_citizen(
        &self,
        change: &mut Change,
        birth: &BirthRegistration,
        now: Timestamp,
    ) -> Result<Citizen, NgaoError> {
        let mother = self.citizen(birth.mother)?;
        let father = birth.father.map(|f| self.citizen(f)).transpose()?;
        Ok(Citizen {
            id: CitizenId(change.allocate(&self.store, storage::CITIZENS)?),
            id_number: None,
            first_name: birth.child_first_name.clone(),
            middle_name: birth.child_middle_name.clone(),
            last_name: birth.child_last_name.clone(),
            gender: birth.gender,
            date_of_birth: birth.date_of_birth,
            place_of_birth: birth.place_of_birth.clone(),
            father_id_number: father.and_then(|f| f.id_number),
            mother_id_number: mother.id_number,
            area: birth.admin_unit,
            is_alive: true,
            date_of_death: None,
            created_at: now,
        })
    }

    fn stage_decision<R: RegistrationRecord>(
        &self,
        change: &mut Change,
        record: &R,
        from: &str,
        actor: &Officer,
        now: Timestamp,
    ) -> Result<(), NgaoError> {
        change.transition(
            &self.store,
            record.entity(),
            Some(from),
            record.status_slug(),
            actor.id,
            None,
            now,
        )?;
        change.notify(
            &self.store,
            [record.initiated_by()].into_iter().filter(|id| *id != actor.id),
            format!("Registration {}", record.status_slug()),
            format!(
                "{} was {} by {}.",
                record.entity(),
                record.status_slug(),
                actor.full_name()
            ),
            Some(record.admin_unit()),
            now,
        )
    }

    // =========================================================================
    // NATIONAL ID
    // =========================================================================

    /// Open a national ID request for a citizen without an id number.
    pub fn initiate_national_id(
        &mut self,
        actor: UserId,
        new: NewNationalId,
        now: Timestamp,
    ) -> Result<NationalIdRequest, NgaoError> {
        let actor = self.actor(actor)?;
        self.gate().authorize(
            &actor,
            Permission::REGISTRATIONS_CREATE,
            Some(new.admin_unit),
        )?;
        self.tree.get(new.admin_unit)?;
        if new.mother == new.applicant || new.father == Some(new.applicant) {
            return Err(NgaoError::Validation(
                "an applicant cannot be their own parent".to_string(),
            ));
        }
        let applicant = self.citizen(new.applicant)?;
        if !applicant.is_alive {
            return Err(NgaoError::Validation(format!(
                "citizen {} is deceased",
                applicant.id
            )));
        }
        self.parent(new.mother, Gender::Female, "mother")?;
        if let Some(father) = new.father {
            self.parent(father, Gender::Male, "father")?;
        }
        duplicates::check_national_id(&applicant, &self.store.all::<NationalIdRequest>()?)?;

        let mut change = self.begin();
        let id = RegistrationId(change.allocate(&self.store, storage::NATIONAL_IDS)?);
        let request = NationalIdRequest {
            id,
            reference_number: reference_number(NationalIdRequest::PREFIX, now, id),
            applicant: new.applicant,
            mother: new.mother,
            father: new.father,
            admin_unit: new.admin_unit,
            status: NationalIdStatus::Initiated,
            initiated_by: actor.id,
            mother_verified: false,
            father_verified: false,
            verified_by: None,
            verified_at: None,
            submitted_at: None,
            completed_at: None,
            issued_id_number: None,
            rejection_reason: None,
            created_at: now,
        };
        change.put(&request)?;
        change.transition(
            &self.store,
            request.entity(),
            None,
            request.status.slug(),
            actor.id,
            None,
            now,
        )?;
        self.commit(change)?;
        Ok(request)
    }

    /// Record the chief's verification of the applicant's parents.
    ///
    /// An unverified mother is an error and leaves the request untouched. An
    /// unverified father (when one is named) rejects the request.
    pub fn verify_national_id_parents(
        &mut self,
        actor: UserId,
        id: RegistrationId,
        mother_ok: bool,
        father_ok: bool,
        now: Timestamp,
    ) -> Result<NationalIdRequest, NgaoError> {
        let actor = self.actor(actor)?;
        let mut request: NationalIdRequest = self.load("national id request", id.0)?;
        let from = request.status;
        check_transition(from, NationalIdStatus::ChiefVerified)?;
        self.gate().authorize(
            &actor,
            from.required_permission(NationalIdStatus::ChiefVerified),
            Some(request.admin_unit),
        )?;
        if !mother_ok {
            return Err(NgaoError::Validation(
                "the mother's identity must be verified before the request can proceed"
                    .to_string(),
            ));
        }
        let father_ok = father_ok || request.father.is_none();

        request.mother_verified = true;
        request.father_verified = father_ok && request.father.is_some();
        request.verified_by = Some(actor.id);
        request.verified_at = Some(now);
        let note = if father_ok {
            request.status = NationalIdStatus::ChiefVerified;
            None
        } else {
            let reason = "father verification failed".to_string();
            request.status = NationalIdStatus::Rejected;
            request.rejection_reason = Some(reason.clone());
            Some(reason)
        };
        self.save_national_id(&request, from, &actor, note, now)?;
        Ok(request)
    }

    pub fn submit_national_id_to_nrb(
        &mut self,
        actor: UserId,
        id: RegistrationId,
        now: Timestamp,
    ) -> Result<NationalIdRequest, NgaoError> {
        let (actor, mut request, from) =
            self.national_id_step(actor, id, NationalIdStatus::SubmittedToNrb)?;
        request.status = NationalIdStatus::SubmittedToNrb;
        request.submitted_at = Some(now);
        self.save_national_id(&request, from, &actor, None, now)?;
        Ok(request)
    }

    /// Record the number issued by the registration bureau and copy it onto
    /// the applicant's citizen record.
    pub fn complete_national_id(
        &mut self,
        actor: UserId,
        id: RegistrationId,
        id_number: String,
        now: Timestamp,
    ) -> Result<NationalIdRequest, NgaoError> {
        let (actor, mut request, from) =
            self.national_id_step(actor, id, NationalIdStatus::Completed)?;
        bounded("id number", &id_number, MAX_NAME_LENGTH)?;
        let id_number = id_number.trim().to_string();
        self.check_id_number_free(&id_number)?;
        let mut applicant = self.citizen(request.applicant)?;
        applicant.id_number = Some(id_number.clone());

        request.status = NationalIdStatus::Completed;
        request.completed_at = Some(now);
        request.issued_id_number = Some(id_number);

        let mut change = self.begin();
        change.put(&applicant)?;
        self.stage_national_id(&mut change, &request, from, &actor, None, now)?;
        self.commit(change)?;
        Ok(request)
    }

    /// Reject a request at any non-terminal stage.
    pub fn reject_national_id(
        &mut self,
        actor: UserId,
        id: RegistrationId,
        reason: String,
        now: Timestamp,
    ) -> Result<NationalIdRequest, NgaoError> {
        let (actor, mut request, from) =
            self.national_id_step(actor, id, NationalIdStatus::Rejected)?;
        bounded("rejection reason", &reason, MAX_TEXT_LENGTH)?;
        let reason = reason.trim().to_string();
        request.status = NationalIdStatus::Rejected;
        request.rejection_reason = Some(reason.clone());
        self.save_national_id(&request, from, &actor, Some(reason), now)?;
        Ok(request)
    }

    /// Actor, request and current status after the edge and permission checks.
    fn national_id_step(
        &self,
        actor: UserId,
        id: RegistrationId,
        to: NationalIdStatus,
    ) -> Result<(Officer, NationalIdRequest, NationalIdStatus), NgaoError> {
        let actor = self.actor(actor)?;
        let request: NationalIdRequest = self.load("national id request", id.0)?;
        let from = request.status;
        check_transition(from, to)?;
        self.gate()
            .authorize(&actor, from.required_permission(to), Some(request.admin_unit))?;
        Ok((actor, request, from))
    }

    fn save_national_id(
        &mut self,
        request: &NationalIdRequest,
        from: NationalIdStatus,
        actor: &Officer,
        note: Option<String>,
        now: Timestamp,
    ) -> Result<(), NgaoError> {
        let mut change = self.begin();
        self.stage_national_id(&mut change, request, from, actor, note, now)?;
        self.commit(change)
    }

    fn stage_national_id(
        &self,
        change: &mut Change,
        request: &NationalIdRequest,
        from: NationalIdStatus,
        actor: &Officer,
        note: Option<String>,
        now: Timestamp,
    ) -> Result<(), NgaoError> {
        change.put(request)?;
        change.transition(
            &self.store,
            request.entity(),
            Some(from.slug()),
            request.status.slug(),
            actor.id,
            note,
            now,
        )?;
        change.notify(
            &self.store,
            [request.initiated_by].into_iter().filter(|id| *id != actor.id),
            "National ID request updated",
            format!(
                "National ID request {} is now {}.",
                request.reference_number, request.status
            ),
            Some(request.admin_unit),
            now,
        )
    }

    // =========================================================================
    // QUERIES & HELPERS
    // =========================================================================

    /// One registration of any kind, scoped by `registrations.view`.
    pub fn registration<R: RegistrationRecord>(
        &self,
        actor: UserId,
        id: RegistrationId,
    ) -> Result<R, NgaoError> {
        let actor = self.actor(actor)?;
        let record: R = self.load(R::KIND.slug(), id.0)?;
        if record.initiated_by() != actor.id {
            self.gate().authorize(
                &actor,
                Permission::REGISTRATIONS_VIEW,
                Some(record.admin_unit()),
            )?;
        }
        Ok(record)
    }

    fn parent(&self, id: CitizenId, gender: Gender, role: &str) -> Result<Citizen, NgaoError> {
        let citizen = self.citizen(id)?;
        if citizen.gender != gender {
            return Err(NgaoError::Validation(format!(
                "citizen {id} cannot be recorded as the {role}"
            )));
        }
        Ok(citizen)
    }

    fn approver_for(&self, unit: UnitId, initiator: &Officer) -> Result<Option<UserId>, NgaoError> {
        let officers = self.all_officers()?;
        Ok(
            next_approver(&self.tree, &officers, &self.permissions, unit, initiator.role)
                .map(|o| o.id),
        )
    }

    fn notify_approver<R: RegistrationRecord>(
        &self,
        change: &mut Change,
        record: &R,
        approver: Option<UserId>,
        now: Timestamp,
    ) -> Result<(), NgaoError> {
        change.notify(
            &self.store,
            approver,
            "Registration awaiting approval",
            format!("{} is waiting for your decision.", record.entity()),
            Some(record.admin_unit()),
            now,
        )
    }
}
