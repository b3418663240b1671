//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the NGAO workflow engine:
//! - Record identifiers (`UserId`, `UnitId`, `CitizenId`, ...)
//! - Entity references used by the audit trail (`EntityKind`, `EntityRef`)
//! - Error types (`NgaoError`)
//!
//! ## Determinism Guarantees
//!
//! All identifiers:
//! - Are plain `u64` newtypes allocated per table, starting at 1
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Point in time used by every record. Callers supply it; the core never reads a clock.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// =============================================================================
// IDENTIFIERS
// =============================================================================

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Get the raw identifier value.
            #[must_use]
            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of an officer (system user).
    UserId
);
record_id!(
    /// Identifier of an administrative unit.
    UnitId
);
record_id!(
    /// Identifier of a citizen record.
    CitizenId
);
record_id!(
    /// Identifier of an incident.
    IncidentId
);
record_id!(
    /// Identifier of a response posted on an incident.
    ResponseId
);
record_id!(
    /// Identifier of a birth, death, marriage or national ID registration.
    /// Each registration kind has its own id sequence.
    RegistrationId
);
record_id!(
    /// Identifier of a message, announcement or notification.
    CommunicationId
);
record_id!(
    /// Identifier of an audit trail entry.
    TransitionId
);

// =============================================================================
// ENTITY REFERENCES
// =============================================================================

/// The entity types that carry a workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Incident,
    BirthRegistration,
    DeathRegistration,
    MarriageRegistration,
    NationalIdRequest,
}

impl EntityKind {
    /// All workflow entity kinds in declaration order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Incident,
        EntityKind::BirthRegistration,
        EntityKind::DeathRegistration,
        EntityKind::MarriageRegistration,
        EntityKind::NationalIdRequest,
    ];

    /// Stable slug used in URLs and CLI arguments.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Incident => "incident",
            Self::BirthRegistration => "birth",
            Self::DeathRegistration => "death",
            Self::MarriageRegistration => "marriage",
            Self::NationalIdRequest => "national_id",
        }
    }

    /// Parse a slug produced by [`EntityKind::slug`].
    pub fn from_slug(slug: &str) -> Result<Self, NgaoError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.slug() == slug)
            .ok_or_else(|| NgaoError::Validation(format!("unknown entity kind '{slug}'")))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A reference to one workflow entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: u64,
}

impl EntityRef {
    #[must_use]
    pub const fn new(kind: EntityKind, id: u64) -> Self {
        Self { kind, id }
    }

    #[must_use]
    pub const fn incident(id: IncidentId) -> Self {
        Self::new(EntityKind::Incident, id.0)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the NGAO engine.
///
/// - No silent failures
/// - Use `Result<T, NgaoError>` for fallible operations
/// - The engine never panics; all errors are recoverable
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NgaoError {
    /// A record was looked up by id and does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// The acting user is not a known officer.
    #[error("unknown officer {0}")]
    UnknownOfficer(UserId),

    /// The officer account is deactivated.
    #[error("officer {0} is inactive")]
    InactiveOfficer(UserId),

    /// The officer's role does not grant the permission.
    #[error("role '{role}' lacks permission '{permission}'")]
    PermissionDenied { role: String, permission: String },

    /// The target unit is outside the officer's administrative scope.
    #[error("unit {unit} is outside the scope of officer {officer}")]
    OutOfScope { officer: UserId, unit: UnitId },

    /// The actor does not outrank the officer or role being administered.
    #[error("hierarchy violation: {0}")]
    HierarchyViolation(String),

    /// The requested status change is not a legal edge of the state machine.
    #[error("invalid {kind} transition: {from} -> {to}")]
    InvalidTransition {
        kind: EntityKind,
        from: String,
        to: String,
    },

    /// The record would register the same person or event twice.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A permission or grant string could not be parsed.
    #[error("invalid permission '{0}'")]
    InvalidPermission(String),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl NgaoError {
    /// Shorthand for a missing record.
    #[must_use]
    pub fn not_found(kind: &'static str, id: u64) -> Self {
        Self::NotFound { kind, id }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_slug_roundtrip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_slug(kind.slug()), Ok(kind));
        }
        assert!(EntityKind::from_slug("baraza").is_err());
    }

    #[test]
    fn ids_order_deterministically() {
        let mut ids = vec![UserId(3), UserId(1), UserId(2)];
        ids.sort();
        assert_eq!(ids, vec![UserId(1), UserId(2), UserId(3)]);
    }

    #[test]
    fn entity_ref_display() {
        assert_eq!(EntityRef::incident(IncidentId(7)).to_string(), "incident#7");
    }
}
