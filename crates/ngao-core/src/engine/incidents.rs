//! Incident reporting, status changes, escalation and responses.

use super::{Change, Engine};
use crate::escalation::next_handler;
use crate::incidents::{
    EscalationOutcome, Incident, IncidentFilter, NewIncident, Response,
};
use crate::officers::Officer;
use crate::permissions::Permission;
use crate::primitives::{MAX_TEXT_LENGTH, bounded};
use crate::status::{IncidentStatus, WorkflowStatus, check_transition};
use crate::storage::{self, RecordStore};
use crate::{EntityRef, IncidentId, NgaoError, ResponseId, Timestamp, UserId};

impl Engine {
    /// Report an incident at `new.location` and hand it to the lowest
    /// available officer on the escalation chain.
    pub fn report_incident(
        &mut self,
        actor: UserId,
        new: NewIncident,
        now: Timestamp,
    ) -> Result<Incident, NgaoError> {
        let actor = self.actor(actor)?;
        self.gate()
            .authorize(&actor, Permission::INCIDENTS_CREATE, Some(new.location))?;
        self.tree.get(new.location)?;
        new.validate()?;

        let officers = self.all_officers()?;
        let handler = next_handler(&self.tree, &officers, new.location, None);

        let mut change = self.begin();
        let id = IncidentId(change.allocate(&self.store, storage::INCIDENTS)?);
        let mut incident = Incident {
            id,
            title: new.title.trim().to_string(),
            description: new.description,
            incident_type: new.incident_type,
            reporter_phone: new.reporter_phone,
            location: new.location,
            status: IncidentStatus::Reported,
            handlers: Vec::new(),
            current_handler: None,
            escalation_level: 0,
            chain_index: None,
            reported_by: actor.id,
            reported_at: now,
            resolved_at: None,
        };
        if let Some((index, officer)) = handler {
            incident.hand_to(officer.id);
            incident.chain_index = Some(index);
        }

        change.put(&incident)?;
        change.transition(
            &self.store,
            EntityRef::incident(id),
            None,
            incident.status.slug(),
            actor.id,
            None,
            now,
        )?;
        change.notify(
            &self.store,
            [actor.id],
            "Incident reported",
            format!(
                "Your incident '{}' was reported successfully (incident #{id}).",
                incident.title
            ),
            Some(incident.location),
            now,
        )?;
        if let Some(handler) = incident.current_handler {
            change.notify(
                &self.store,
                [handler],
                "Incident assigned",
                format!(
                    "Incident #{id} '{}' ({}) has been assigned to you.",
                    incident.title, incident.incident_type
                ),
                Some(incident.location),
                now,
            )?;
        }
        self.commit(change)?;
        Ok(incident)
    }

    /// Move an incident to `to`.
    ///
    /// The current handler may dispatch, mark on scene and resolve without
    /// `incidents.update`. Moving to `Escalated` runs [`Engine::escalate_incident`].
    pub fn transition_incident(
        &mut self,
        actor: UserId,
        id: IncidentId,
        to: IncidentStatus,
        note: Option<String>,
        now: Timestamp,
    ) -> Result<Incident, NgaoError> {
        if to == IncidentStatus::Escalated {
            self.escalate_with_note(actor, id, note, now)?;
            return self.load("incident", id.0);
        }
        let actor = self.actor(actor)?;
        let mut incident: Incident = self.load("incident", id.0)?;
        let from = incident.status;
        check_transition(from, to)?;
        if let Some(note) = &note {
            bounded("note", note, MAX_TEXT_LENGTH)?;
        }

        let handler_move = incident.is_handler(actor.id)
            && matches!(
                to,
                IncidentStatus::Dispatched | IncidentStatus::OnScene | IncidentStatus::Resolved
            );
        if !handler_move {
            self.gate()
                .authorize(&actor, from.required_permission(to), Some(incident.location))?;
        }

        incident.status = to;
        match to {
            IncidentStatus::Resolved => incident.resolved_at = Some(now),
            IncidentStatus::Closed => incident.current_handler = None,
            _ => {}
        }

        let mut change = self.begin();
        change.put(&incident)?;
        self.stage_status_change(&mut change, &incident, from, &actor, note, now)?;
        self.commit(change)?;
        Ok(incident)
    }

    /// Hand the incident to the next officer up the chain, or close it when
    /// nobody is left.
    pub fn escalate_incident(
        &mut self,
        actor: UserId,
        id: IncidentId,
        now: Timestamp,
    ) -> Result<EscalationOutcome, NgaoError> {
        self.escalate_with_note(actor, id, None, now)
    }

    fn escalate_with_note(
        &mut self,
        actor: UserId,
        id: IncidentId,
        note: Option<String>,
        now: Timestamp,
    ) -> Result<EscalationOutcome, NgaoError> {
        let actor = self.actor(actor)?;
        let mut incident: Incident = self.load("incident", id.0)?;
        let from = incident.status;
        check_transition(from, IncidentStatus::Escalated)?;
        if let Some(note) = &note {
            bounded("note", note, MAX_TEXT_LENGTH)?;
        }
        if !incident.is_handler(actor.id) {
            self.gate().authorize(
                &actor,
                Permission::INCIDENTS_ESCALATE,
                Some(incident.location),
            )?;
        }

        let officers = self.all_officers()?;
        let next = next_handler(&self.tree, &officers, incident.location, incident.chain_index)
            .map(|(index, officer)| (index, officer.id));

        let mut change = self.begin();
        let outcome = match next {
            Some((index, handler)) => {
                incident.status = IncidentStatus::Escalated;
                incident.escalation_level += 1;
                incident.chain_index = Some(index);
                incident.hand_to(handler);
                change.put(&incident)?;
                change.transition(
                    &self.store,
                    EntityRef::incident(id),
                    Some(from.slug()),
                    incident.status.slug(),
                    actor.id,
                    Some(note.unwrap_or_else(|| {
                        format!("escalation level {}", incident.escalation_level)
                    })),
                    now,
                )?;
                change.notify(
                    &self.store,
                    [handler],
                    "Incident escalated",
                    format!(
                        "Incident #{id} '{}' has been escalated to you by {}.",
                        incident.title,
                        actor.full_name()
                    ),
                    Some(incident.location),
                    now,
                )?;
                EscalationOutcome::Escalated {
                    handler,
                    chain_index: index,
                }
            }
            None => {
                check_transition(from, IncidentStatus::Closed)?;
                incident.status = IncidentStatus::Closed;
                incident.current_handler = None;
                change.put(&incident)?;
                self.stage_status_change(
                    &mut change,
                    &incident,
                    from,
                    &actor,
                    note.or_else(|| Some("escalation chain exhausted".to_string())),
                    now,
                )?;
                EscalationOutcome::Exhausted
            }
        };
        self.commit(change)?;
        Ok(outcome)
    }

    /// Make `officer` the current handler.
    pub fn assign_handler(
        &mut self,
        actor: UserId,
        id: IncidentId,
        officer: UserId,
        now: Timestamp,
    ) -> Result<Incident, NgaoError> {
        let actor = self.actor(actor)?;
        let mut incident: Incident = self.load("incident", id.0)?;
        self.gate()
            .authorize(&actor, Permission::INCIDENTS_ASSIGN, Some(incident.location))?;
        if !incident.status.is_open() {
            return Err(NgaoError::Validation(format!(
                "incident {id} is {} and cannot be reassigned",
                incident.status
            )));
        }
        let handler: Officer = self.load("officer", officer.0)?;
        if !handler.is_active {
            return Err(NgaoError::InactiveOfficer(handler.id));
        }
        if !self.gate().in_scope(&handler, incident.location) {
            return Err(NgaoError::OutOfScope {
                officer: handler.id,
                unit: incident.location,
            });
        }
        incident.hand_to(handler.id);
        if let Some(index) = handler.role.chain_index() {
            incident.chain_index = Some(index);
        }

        let mut change = self.begin();
        change.put(&incident)?;
        change.notify(
            &self.store,
            [handler.id],
            "Incident assigned",
            format!(
                "Incident #{id} '{}' has been assigned to you by {}.",
                incident.title,
                actor.full_name()
            ),
            Some(incident.location),
            now,
        )?;
        self.commit(change)?;
        Ok(incident)
    }

    /// Post a response. While the incident is open the current handler
    /// rotates to the next officer in `handlers`.
    pub fn add_response(
        &mut self,
        actor: UserId,
        id: IncidentId,
        comment: String,
        now: Timestamp,
    ) -> Result<Response, NgaoError> {
        let actor = self.actor(actor)?;
        let mut incident: Incident = self.load("incident", id.0)?;
        bounded("comment", &comment, MAX_TEXT_LENGTH)?;
        if !incident.is_handler(actor.id) {
            self.gate()
                .authorize(&actor, Permission::INCIDENTS_UPDATE, Some(incident.location))?;
        }

        let mut change = self.begin();
        let response = Response {
            id: ResponseId(change.allocate(&self.store, storage::RESPONSES)?),
            incident: id,
            responder: actor.id,
            comment,
            created_at: now,
        };
        change.put(&response)?;

        if incident.status.is_open() {
            let next = incident.next_in_rotation();
            if next != incident.current_handler {
                incident.current_handler = next;
                change.put(&incident)?;
                if let Some(handler) = next.filter(|h| *h != actor.id) {
                    change.notify(
                        &self.store,
                        [handler],
                        "Incident needs your attention",
                        format!(
                            "{} responded on incident #{id} '{}'. It is now with you.",
                            actor.full_name(),
                            incident.title
                        ),
                        Some(incident.location),
                        now,
                    )?;
                }
            }
        }
        self.commit(change)?;
        Ok(response)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// One incident. Reporters and handlers always see their own incidents.
    pub fn incident(&self, actor: UserId, id: IncidentId) -> Result<Incident, NgaoError> {
        let actor = self.actor(actor)?;
        let incident: Incident = self.load("incident", id.0)?;
        if !Self::involved(&actor, &incident) {
            self.gate()
                .authorize(&actor, Permission::INCIDENTS_VIEW, Some(incident.location))?;
        }
        Ok(incident)
    }

    /// Incidents the actor may see, newest first.
    pub fn incidents_visible_to(
        &self,
        actor: UserId,
        filter: IncidentFilter,
    ) -> Result<Vec<Incident>, NgaoError> {
        let actor = self.actor(actor)?;
        let gate = self.gate();
        let can_view = gate.has_permission(&actor, Permission::INCIDENTS_VIEW);
        let mut out: Vec<Incident> = self
            .store
            .all::<Incident>()?
            .into_iter()
            .filter(|i| {
                Self::involved(&actor, i) || (can_view && gate.in_scope(&actor, i.location))
            })
            .filter(|i| filter.status.is_none_or(|s| i.status == s))
            .filter(|i| filter.incident_type.is_none_or(|t| i.incident_type == t))
            .filter(|i| {
                filter
                    .within
                    .is_none_or(|unit| self.tree.is_within(unit, i.location))
            })
            .collect();
        out.sort_by(|a, b| b.reported_at.cmp(&a.reported_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    /// Open incidents currently handled by the actor, newest first.
    pub fn my_open_incidents(&self, actor: UserId) -> Result<Vec<Incident>, NgaoError> {
        let actor = self.actor(actor)?;
        let mut out: Vec<Incident> = self
            .store
            .all::<Incident>()?
            .into_iter()
            .filter(|i| i.is_handler(actor.id) && i.status.is_open())
            .collect();
        out.sort_by(|a, b| b.reported_at.cmp(&a.reported_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    /// Responses on an incident in posting order.
    pub fn responses(&self, actor: UserId, id: IncidentId) -> Result<Vec<Response>, NgaoError> {
        self.incident(actor, id)?;
        Ok(self
            .store
            .all::<Response>()?
            .into_iter()
            .filter(|r| r.incident == id)
            .collect())
    }

    pub(super) fn involved(actor: &Officer, incident: &Incident) -> bool {
        incident.reported_by == actor.id || incident.handlers.contains(&actor.id)
    }

    /// Audit entry plus status notification to the reporter and all handlers.
    fn stage_status_change(
        &self,
        change: &mut Change,
        incident: &Incident,
        from: IncidentStatus,
        actor: &Officer,
        note: Option<String>,
        now: Timestamp,
    ) -> Result<(), NgaoError> {
        change.transition(
            &self.store,
            EntityRef::incident(incident.id),
            Some(from.slug()),
            incident.status.slug(),
            actor.id,
            note,
            now,
        )?;
        let recipients = std::iter::once(incident.reported_by)
            .chain(incident.handlers.iter().copied())
            .filter(|id| *id != actor.id);
        change.notify(
            &self.store,
            recipients,
            "Incident status updated",
            format!(
                "Incident #{} '{}' is now {}.",
                incident.id, incident.title, incident.status
            ),
            Some(incident.location),
            now,
        )
    }
}
