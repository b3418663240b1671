//! # Audit Trail
//!
//! One `TransitionRecord` per status change, written in the same batch as
//! the change itself. A `Timeline` per entity lists its transition ids so a
//! history lookup reads only that entity's records.

use crate::storage::{self, Record};
use crate::{EntityKind, EntityRef, Timestamp, TransitionId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub id: TransitionId,
    pub entity: EntityRef,
    /// Status slug before the change. `None` when the record was created.
    pub from: Option<String>,
    pub to: String,
    pub actor: UserId,
    pub note: Option<String>,
    pub at: Timestamp,
}

impl Record for TransitionRecord {
    const TABLE: &'static str = storage::TRANSITIONS;

    fn key(&self) -> u64 {
        self.id.0
    }
}

/// Bits of a timeline key holding the entity id; the kind sits above them.
const ENTITY_ID_BITS: u32 = 56;

/// Transition ids of one entity, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeline {
    pub entity: EntityRef,
    pub transitions: Vec<TransitionId>,
}

impl Timeline {
    #[must_use]
    pub fn new(entity: EntityRef) -> Self {
        Self {
            entity,
            transitions: Vec::new(),
        }
    }

    /// Storage key: entity kind in the top byte, entity id below.
    #[must_use]
    pub fn key_for(entity: EntityRef) -> u64 {
        let kind: u64 = match entity.kind {
            EntityKind::Incident => 1,
            EntityKind::BirthRegistration => 2,
            EntityKind::DeathRegistration => 3,
            EntityKind::MarriageRegistration => 4,
            EntityKind::NationalIdRequest => 5,
        };
        (kind << ENTITY_ID_BITS) | (entity.id & ((1 << ENTITY_ID_BITS) - 1))
    }
}

impl Record for Timeline {
    const TABLE: &'static str = storage::TIMELINES;

    fn key(&self) -> u64 {
        Self::key_for(self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IncidentId;
    use std::collections::BTreeSet;

    #[test]
    fn timeline_keys_separate_kinds_with_the_same_id() {
        let keys: BTreeSet<u64> = EntityKind::ALL
            .into_iter()
            .map(|kind| Timeline::key_for(EntityRef::new(kind, 1)))
            .collect();
        assert_eq!(keys.len(), EntityKind::ALL.len());

        let first = Timeline::key_for(EntityRef::incident(IncidentId(1)));
        let second = Timeline::key_for(EntityRef::incident(IncidentId(2)));
        assert_eq!(second - first, 1);
    }
}
