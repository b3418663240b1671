//! # Incidents
//!
//! Incident records, responses and the handler rotation used when officers
//! respond to an incident.

use crate::primitives::{MAX_TEXT_LENGTH, MAX_TITLE_LENGTH, bounded, valid_phone};
use crate::status::IncidentStatus;
use crate::storage::{self, Record};
use crate::{IncidentId, NgaoError, ResponseId, Timestamp, UnitId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IncidentType {
    Fire,
    Accident,
    Crime,
    Medical,
    Other,
}

impl IncidentType {
    pub const ALL: [IncidentType; 5] = [
        IncidentType::Fire,
        IncidentType::Accident,
        IncidentType::Crime,
        IncidentType::Medical,
        IncidentType::Other,
    ];

    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Accident => "accident",
            Self::Crime => "crime",
            Self::Medical => "medical",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for IncidentType {
    type Err = NgaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.slug() == s)
            .ok_or_else(|| NgaoError::Validation(format!("unknown incident type '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub title: String,
    pub description: String,
    pub incident_type: IncidentType,
    pub reporter_phone: Option<String>,
    pub location: UnitId,
    pub status: IncidentStatus,
    /// Every officer who has handled the incident, in hand-off order, without repeats.
    pub handlers: Vec<UserId>,
    pub current_handler: Option<UserId>,
    /// Number of escalations so far.
    pub escalation_level: u32,
    /// Position in the escalation chain of the current handler's role.
    pub chain_index: Option<usize>,
    pub reported_by: UserId,
    pub reported_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl Incident {
    #[must_use]
    pub fn is_handler(&self, user: UserId) -> bool {
        self.current_handler == Some(user)
    }

    /// Record `user` as a handler (once) and make them current.
    pub fn hand_to(&mut self, user: UserId) {
        if !self.handlers.contains(&user) {
            self.handlers.push(user);
        }
        self.current_handler = Some(user);
    }

    /// Round-robin successor of the current handler among `handlers`.
    ///
    /// Falls back to the first handler when nobody (or an outsider) is current.
    #[must_use]
    pub fn next_in_rotation(&self) -> Option<UserId> {
        let first = self.handlers.first().copied()?;
        let position = self
            .current_handler
            .and_then(|current| self.handlers.iter().position(|h| *h == current));
        match position {
            Some(i) => self
                .handlers
                .get((i + 1) % self.handlers.len())
                .copied()
                .or(Some(first)),
            None => Some(first),
        }
    }
}

impl Record for Incident {
    const TABLE: &'static str = storage::INCIDENTS;

    fn key(&self) -> u64 {
        self.id.0
    }
}

/// Input for reporting an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIncident {
    pub title: String,
    pub description: String,
    pub incident_type: IncidentType,
    #[serde(default)]
    pub reporter_phone: Option<String>,
    pub location: UnitId,
}

impl NewIncident {
    pub fn validate(&self) -> Result<(), NgaoError> {
        bounded("title", &self.title, MAX_TITLE_LENGTH)?;
        bounded("description", &self.description, MAX_TEXT_LENGTH)?;
        match &self.reporter_phone {
            Some(phone) if !valid_phone(phone) => Err(NgaoError::Validation(format!(
                "invalid reporter phone '{phone}'"
            ))),
            _ => Ok(()),
        }
    }
}

/// A comment posted by an officer working an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: ResponseId,
    pub incident: IncidentId,
    pub responder: UserId,
    pub comment: String,
    pub created_at: Timestamp,
}

impl Record for Response {
    const TABLE: &'static str = storage::RESPONSES;

    fn key(&self) -> u64 {
        self.id.0
    }
}

/// Optional criteria for incident listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentFilter {
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    #[serde(default)]
    pub incident_type: Option<IncidentType>,
    /// Restrict to this unit and everything below it.
    #[serde(default)]
    pub within: Option<UnitId>,
}

/// Result of an escalation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationOutcome {
    /// Handed to the next officer up the chain.
    Escalated { handler: UserId, chain_index: usize },
    /// Nobody above the current handler; the incident was closed.
    Exhausted,
}
