//! # Dashboard Statistics
//!
//! Counts shown on the officer dashboard, limited to the viewer's scope.

use crate::incidents::Incident;
use crate::registrations::RegistrationRecord;
use crate::status::WorkflowStatus;
use crate::{EntityKind, UnitId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    /// Unit the counts are limited to. `None` means the whole country (superuser).
    pub scope: Option<UnitId>,
    pub total_incidents: u64,
    /// Incidents not yet resolved or closed.
    pub open_incidents: u64,
    pub incidents_by_status: BTreeMap<String, u64>,
    pub responses: u64,
    /// Registration kind slug → status slug → count.
    pub registrations: BTreeMap<String, BTreeMap<String, u64>>,
}

impl Dashboard {
    #[must_use]
    pub fn new(scope: Option<UnitId>) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    pub fn count_incident(&mut self, incident: &Incident, responses: u64) {
        self.total_incidents += 1;
        if incident.status.is_open() {
            self.open_incidents += 1;
        }
        *self
            .incidents_by_status
            .entry(incident.status.slug().to_string())
            .or_default() += 1;
        self.responses += responses;
    }

    pub fn count_registration<R: RegistrationRecord>(&mut self, record: &R) {
        *self
            .registrations
            .entry(R::KIND.slug().to_string())
            .or_default()
            .entry(record.status_slug().to_string())
            .or_default() += 1;
    }

    /// Count for one registration kind and status.
    #[must_use]
    pub fn registrations_in(&self, kind: EntityKind, status: &str) -> u64 {
        self.registrations
            .get(kind.slug())
            .and_then(|m| m.get(status))
            .copied()
            .unwrap_or(0)
    }
}
