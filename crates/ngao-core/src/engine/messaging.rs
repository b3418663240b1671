//! Messages, announcements, audit history and the dashboard.

use super::Engine;
use crate::audit::{Timeline, TransitionRecord};
use crate::incidents::{Incident, Response};
use crate::messaging::{Communication, CommunicationKind, validate_text};
use crate::officers::Officer;
use crate::permissions::{Action, Permission, Resource};
use crate::registrations::{
    BirthRegistration, DeathRegistration, MarriageRegistration, NationalIdRequest,
    RegistrationRecord,
};
use crate::stats::Dashboard;
use crate::storage::RecordStore;
use crate::{CommunicationId, EntityKind, EntityRef, NgaoError, Timestamp, UnitId, UserId};
use std::collections::BTreeMap;

impl Engine {
    /// Send a direct message to one active officer.
    pub fn send_message(
        &mut self,
        actor: UserId,
        recipient: UserId,
        body: String,
        now: Timestamp,
    ) -> Result<Communication, NgaoError> {
        let actor = self.actor(actor)?;
        self.gate()
            .authorize(&actor, Permission::COMMUNICATIONS_CREATE, None)?;
        let recipient: Officer = self.load("officer", recipient.0)?;
        if !recipient.is_active {
            return Err(NgaoError::InactiveOfficer(recipient.id));
        }
        let title = format!("Message from {}", actor.full_name());
        validate_text(&title, &body)?;

        let mut change = self.begin();
        let communication = change.communicate(
            &self.store,
            CommunicationKind::Message,
            Some(actor.id),
            [recipient.id],
            title,
            body,
            actor.admin_unit,
            now,
        )?
        .ok_or_else(|| NgaoError::Validation("communication has no recipients".to_string()))?;
        self.commit(change)?;
        Ok(communication)
    }

    /// Broadcast to every active officer posted within `unit`.
    pub fn announce(
        &mut self,
        actor: UserId,
        unit: UnitId,
        title: String,
        body: String,
        now: Timestamp,
    ) -> Result<Communication, NgaoError> {
        let actor = self.actor(actor)?;
        self.gate()
            .authorize(&actor, Permission::COMMUNICATIONS_BROADCAST, Some(unit))?;
        self.tree.get(unit)?;
        validate_text(&title, &body)?;
        let recipients: Vec<UserId> = self
            .all_officers()?
            .into_iter()
            .filter(|o| o.is_active && o.id != actor.id)
            .filter(|o| o.admin_unit.is_some_and(|u| self.tree.is_within(unit, u)))
            .map(|o| o.id)
            .collect();

        let mut change = self.begin();
        let communication = change.communicate(
            &self.store,
            CommunicationKind::Announcement,
            Some(actor.id),
            recipients,
            title.trim().to_string(),
            body,
            Some(unit),
            now,
        )?
        .ok_or_else(|| NgaoError::Validation("communication has no recipients".to_string()))?;
        self.commit(change)?;
        Ok(communication)
    }

    /// Communications addressed to `user`, newest first.
    pub fn inbox(&self, user: UserId) -> Result<Vec<Communication>, NgaoError> {
        let user = self.actor(user)?;
        let mut out: Vec<Communication> = self
            .store
            .all::<Communication>()?
            .into_iter()
            .filter(|c| c.recipients.contains(&user.id))
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    /// Mark a communication read. Only recipients may do this.
    pub fn mark_read(
        &mut self,
        actor: UserId,
        id: CommunicationId,
    ) -> Result<Communication, NgaoError> {
        let actor = self.actor(actor)?;
        let mut communication: Communication = self.load("communication", id.0)?;
        if !communication.recipients.contains(&actor.id) {
            return Err(NgaoError::PermissionDenied {
                role: actor.role.slug().to_string(),
                permission: Permission::new(Resource::Communications, Action::View).to_string(),
            });
        }
        if communication.read_by.insert(actor.id) {
            let mut change = self.begin();
            change.put(&communication)?;
            self.commit(change)?;
        }
        Ok(communication)
    }

    // =========================================================================
    // AUDIT
    // =========================================================================

    /// Status history of one entity in the order it happened.
    ///
    /// The reporter and handlers of an incident, and the initiator of a
    /// registration, may read it without the view permission.
    pub fn history(
        &self,
        actor: UserId,
        entity: EntityRef,
    ) -> Result<Vec<TransitionRecord>, NgaoError> {
        let actor = self.actor(actor)?;
        let scope = self.entity_scope(&actor, entity)?;
        if !scope.involved {
            self.gate()
                .authorize(&actor, scope.permission, Some(scope.unit))?;
        }
        let Some(timeline) = self.store.get::<Timeline>(Timeline::key_for(entity))? else {
            return Ok(Vec::new());
        };
        timeline
            .transitions
            .into_iter()
            .map(|id| self.load("transition", id.0))
            .collect()
    }

    fn entity_scope(
        &self,
        actor: &Officer,
        entity: EntityRef,
    ) -> Result<EntityScope, NgaoError> {
        Ok(match entity.kind {
            EntityKind::Incident => {
                let incident: Incident = self.load("incident", entity.id)?;
                EntityScope {
                    permission: Permission::INCIDENTS_VIEW,
                    unit: incident.location,
                    involved: Self::involved(actor, &incident),
                }
            }
            EntityKind::BirthRegistration => self.registration_scope::<BirthRegistration>(
                actor,
                "birth registration",
                entity.id,
            )?,
            EntityKind::DeathRegistration => self.registration_scope::<DeathRegistration>(
                actor,
                "death registration",
                entity.id,
            )?,
            EntityKind::MarriageRegistration => self.registration_scope::<MarriageRegistration>(
                actor,
                "marriage registration",
                entity.id,
            )?,
            EntityKind::NationalIdRequest => self.registration_scope::<NationalIdRequest>(
                actor,
                "national id request",
                entity.id,
            )?,
        })
    }

    fn registration_scope<R: RegistrationRecord>(
        &self,
        actor: &Officer,
        what: &'static str,
        id: u64,
    ) -> Result<EntityScope, NgaoError> {
        let record: R = self.load(what, id)?;
        Ok(EntityScope {
            permission: Permission::REGISTRATIONS_VIEW,
            unit: record.admin_unit(),
            involved: record.initiated_by() == actor.id,
        })
    }

    // =========================================================================
    // DASHBOARD
    // =========================================================================

    /// Counts for the actor's unit (everything for superusers).
    pub fn dashboard(&self, actor: UserId) -> Result<Dashboard, NgaoError> {
        let actor = self.actor(actor)?;
        self.gate()
            .authorize(&actor, Permission::REPORTS_VIEW, None)?;
        let gate = self.gate();
        let visible = |unit: UnitId| gate.in_scope(&actor, unit);

        let mut responses: BTreeMap<_, u64> = BTreeMap::new();
        for response in self.store.all::<Response>()? {
            *responses.entry(response.incident).or_default() += 1;
        }

        let mut dashboard = Dashboard::new(if actor.is_superuser {
            None
        } else {
            actor.admin_unit
        });
        for incident in self.store.all::<Incident>()? {
            if visible(incident.location) {
                let count = responses.get(&incident.id).copied().unwrap_or(0);
                dashboard.count_incident(&incident, count);
            }
        }
        self.tally::<BirthRegistration>(&mut dashboard, &visible)?;
        self.tally::<DeathRegistration>(&mut dashboard, &visible)?;
        self.tally::<MarriageRegistration>(&mut dashboard, &visible)?;
        self.tally::<NationalIdRequest>(&mut dashboard, &visible)?;
        Ok(dashboard)
    }

    fn tally<R: RegistrationRecord>(
        &self,
        dashboard: &mut Dashboard,
        visible: &impl Fn(UnitId) -> bool,
    ) -> Result<(), NgaoError> {
        for record in self.store.all::<R>()? {
            if visible(record.admin_unit()) {
                dashboard.count_registration(&record);
            }
        }
        Ok(())
    }
}

/// Who may read an entity's history.
struct EntityScope {
    permission: Permission,
    unit: UnitId,
    involved: bool,
}
