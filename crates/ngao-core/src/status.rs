//! # Status State Machines
//!
//! Legal statuses and transitions for every workflow entity, plus the
//! permission each transition requires.
//!
//! The tables here are the single source of truth: the engine never moves a
//! record to a status unless [`check_transition`] accepts the edge.

use crate::permissions::Permission;
use crate::{EntityKind, NgaoError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Common behaviour of workflow status enums.
pub trait WorkflowStatus: Copy + Eq + fmt::Display + 'static {
    /// Entity kind whose lifecycle this status belongs to.
    fn entity_kind() -> EntityKind;

    /// Every status value, in lifecycle order.
    fn all() -> &'static [Self];

    fn slug(self) -> &'static str;

    fn can_transition_to(self, to: Self) -> bool;

    /// No outgoing edges.
    fn is_terminal(self) -> bool {
        Self::all().iter().all(|to| !self.can_transition_to(*to))
    }

    /// Permission needed to move into `to` from `self`.
    fn required_permission(self, to: Self) -> Permission;

    fn parse_slug(slug: &str) -> Result<Self, NgaoError> {
        Self::all()
            .iter()
            .copied()
            .find(|s| s.slug() == slug)
            .ok_or_else(|| {
                NgaoError::Validation(format!("unknown {} status '{slug}'", Self::entity_kind()))
            })
    }
}

/// Reject illegal edges with `InvalidTransition`.
pub fn check_transition<S: WorkflowStatus>(from: S, to: S) -> Result<(), NgaoError> {
    check_transition_as(S::entity_kind(), from, to)
}

/// [`check_transition`] reporting `kind` in the error, for status enums shared
/// by several entity kinds.
pub fn check_transition_as<S: WorkflowStatus>(
    kind: EntityKind,
    from: S,
    to: S,
) -> Result<(), NgaoError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(NgaoError::InvalidTransition {
            kind,
            from: from.slug().to_string(),
            to: to.slug().to_string(),
        })
    }
}

macro_rules! status_text {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(WorkflowStatus::slug(*self))
            }
        }

        impl FromStr for $ty {
            type Err = NgaoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as WorkflowStatus>::parse_slug(s)
            }
        }
    };
}

// =============================================================================
// INCIDENT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IncidentStatus {
    Reported,
    Escalated,
    Dispatched,
    OnScene,
    Resolved,
    Closed,
}

impl IncidentStatus {
    /// Reported, escalated, dispatched or on scene.
    #[must_use]
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Resolved | Self::Closed)
    }
}

impl WorkflowStatus for IncidentStatus {
    fn entity_kind() -> EntityKind {
        EntityKind::Incident
    }

    fn all() -> &'static [Self] {
        &[
            Self::Reported,
            Self::Escalated,
            Self::Dispatched,
            Self::OnScene,
            Self::Resolved,
            Self::Closed,
        ]
    }

    fn slug(self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::Escalated => "escalated",
            Self::Dispatched => "dispatched",
            Self::OnScene => "on_scene",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    fn can_transition_to(self, to: Self) -> bool {
        use IncidentStatus::{Closed, Dispatched, Escalated, OnScene, Reported, Resolved};
        match self {
            Reported | Escalated => matches!(to, Escalated | Dispatched | Resolved | Closed),
            Dispatched => matches!(to, OnScene | Escalated | Resolved | Closed),
            OnScene => matches!(to, Escalated | Resolved | Closed),
            Resolved => to == Closed,
            Closed => false,
        }
    }

    fn required_permission(self, to: Self) -> Permission {
        match to {
            Self::Escalated => Permission::INCIDENTS_ESCALATE,
            Self::Closed => Permission::INCIDENTS_CLOSE,
            Self::Reported | Self::Dispatched | Self::OnScene | Self::Resolved => {
                Permission::INCIDENTS_UPDATE
            }
        }
    }
}

status_text!(IncidentStatus);

// =============================================================================
// BIRTH REGISTRATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BirthStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl WorkflowStatus for BirthStatus {
    fn entity_kind() -> EntityKind {
        EntityKind::BirthRegistration
    }

    fn all() -> &'static [Self] {
        &[Self::Draft, Self::Submitted, Self::Approved, Self::Rejected]
    }

    fn slug(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Submitted) | (Self::Submitted, Self::Approved | Self::Rejected)
        )
    }

    fn required_permission(self, to: Self) -> Permission {
        match to {
            Self::Draft | Self::Submitted => Permission::REGISTRATIONS_CREATE,
            Self::Approved | Self::Rejected => Permission::REGISTRATIONS_APPROVE,
        }
    }
}

status_text!(BirthStatus);

// =============================================================================
// DEATH / MARRIAGE REGISTRATION
// =============================================================================

/// Status of death and marriage registrations, which are filed already submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegistrationStatus {
    Submitted,
    Approved,
    Rejected,
}

impl WorkflowStatus for RegistrationStatus {
    // Shared with marriage, which reports through `check_transition_as`.
    fn entity_kind() -> EntityKind {
        EntityKind::DeathRegistration
    }

    fn all() -> &'static [Self] {
        &[Self::Submitted, Self::Approved, Self::Rejected]
    }

    fn slug(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    fn can_transition_to(self, to: Self) -> bool {
        self == Self::Submitted && matches!(to, Self::Approved | Self::Rejected)
    }

    fn required_permission(self, _to: Self) -> Permission {
        Permission::REGISTRATIONS_APPROVE
    }
}

status_text!(RegistrationStatus);

// =============================================================================
// NATIONAL ID
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NationalIdStatus {
    Initiated,
    ChiefVerified,
    SubmittedToNrb,
    Completed,
    Rejected,
}

impl WorkflowStatus for NationalIdStatus {
    fn entity_kind() -> EntityKind {
        EntityKind::NationalIdRequest
    }

    fn all() -> &'static [Self] {
        &[
            Self::Initiated,
            Self::ChiefVerified,
            Self::SubmittedToNrb,
            Self::Completed,
            Self::Rejected,
        ]
    }

    fn slug(self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::ChiefVerified => "chief_verified",
            Self::SubmittedToNrb => "submitted_to_nrb",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Initiated, Self::ChiefVerified | Self::Rejected)
                | (Self::ChiefVerified, Self::SubmittedToNrb | Self::Rejected)
                | (Self::SubmittedToNrb, Self::Completed | Self::Rejected)
        )
    }

    fn required_permission(self, to: Self) -> Permission {
        match (self, to) {
            (Self::Initiated, _) => Permission::REGISTRATIONS_VERIFY,
            (_, Self::SubmittedToNrb) => Permission::REGISTRATIONS_SUBMIT,
            _ => Permission::REGISTRATIONS_APPROVE,
        }
    }
}

status_text!(NationalIdStatus);

// =============================================================================
// TESTS
// =============================================================================
