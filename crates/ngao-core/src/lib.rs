//! # ngao-core
//!
//! The deterministic workflow engine for NGAO MIS.
//!
//! This crate implements the incident escalation and registration approval
//! core of a civil-registration and incident-management backend:
//! - Status state machines per entity (`status`)
//! - Role-based permissions with admin-unit scoping (`permissions`)
//! - The role hierarchy resolver that finds the next handler (`escalation`)
//! - The duplicate guard for civil registrations (`duplicates`)
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Has NO async, NO network dependencies (pure Rust)
//! - Never reads the clock; callers pass `now`
//! - Uses `BTreeMap`/`BTreeSet` only, so every listing is deterministic
//! - Applies each status change as one atomic storage batch

// =============================================================================
// MODULES
// =============================================================================

pub mod admin;
pub mod audit;
pub mod citizens;
pub mod duplicates;
pub mod engine;
pub mod escalation;
pub mod incidents;
pub mod messaging;
pub mod officers;
pub mod permissions;
pub mod primitives;
pub mod registrations;
pub mod roles;
pub mod stats;
pub mod status;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CitizenId, CommunicationId, EntityKind, EntityRef, IncidentId, NgaoError, RegistrationId,
    ResponseId, Timestamp, TransitionId, UnitId, UserId,
};

// =============================================================================
// RE-EXPORTS: Workflow Engine
// =============================================================================

pub use admin::{AdminTree, AdminUnit, NewAdminUnit, UnitLevel};
pub use audit::TransitionRecord;
pub use citizens::{Citizen, Gender, NewCitizen};
pub use engine::{DecisionOutcome, Engine};
pub use incidents::{
    EscalationOutcome, Incident, IncidentFilter, IncidentType, NewIncident, Response,
};
pub use messaging::{Communication, CommunicationKind, DeliverySink, Recorder, Silent};
pub use officers::{NewOfficer, Officer};
pub use permissions::{Action, Grant, Permission, PermissionGate, PermissionTable, Resource};
pub use registrations::{
    BirthRegistration, DeathRegistration, Decision, MarriageRegistration, NationalIdRequest,
    NewBirth, NewDeath, NewMarriage, NewNationalId, RegistrationRecord, RegistrationRef,
};
pub use roles::{ESCALATION_CHAIN, Role};
pub use stats::Dashboard;
pub use status::{
    BirthStatus, IncidentStatus, NationalIdStatus, RegistrationStatus, WorkflowStatus,
    check_transition,
};
pub use storage::{MemoryStore, RecordStore, RedbStore, StorageBackend, WriteBatch};
