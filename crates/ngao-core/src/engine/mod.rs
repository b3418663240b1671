//! # Workflow Engine
//!
//! The `Engine` owns the record store, the admin-tree index, the permission
//! table and the delivery sink. Every public operation:
//!
//! 1. resolves the acting officer (unknown → `UnknownOfficer`, inactive →
//!    `InactiveOfficer`)
//! 2. checks the permission gate and the state machine
//! 3. stages all writes (record, audit entry, notifications) in one `Change`
//! 4. commits the change atomically, then hands notifications to the sink
//!
//! Nothing is written when any step fails.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (ACID, disk-backed)

mod admin;
mod incidents;
mod messaging;
mod registrations;

pub use registrations::DecisionOutcome;

use crate::admin::AdminTree;
use crate::audit::{Timeline, TransitionRecord};
use crate::messaging::{Communication, CommunicationKind, DeliverySink, Silent};
use crate::officers::Officer;
use crate::permissions::{PermissionGate, PermissionTable};
use crate::storage::{self, Record, RecordStore, StorageBackend, WriteBatch};
use crate::{
    CommunicationId, EntityRef, NgaoError, Timestamp, TransitionId, UnitId, UserId,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// The NGAO workflow engine.
pub struct Engine {
    store: StorageBackend,
    tree: AdminTree,
    permissions: PermissionTable,
    sink: Box<dyn DeliverySink>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("admin_units", &self.tree.len())
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Empty engine with in-memory storage, the built-in permission table and
    /// no delivery.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: StorageBackend::default(),
            tree: AdminTree::new(),
            permissions: PermissionTable::builtin(),
            sink: Box::new(Silent),
        }
    }

    /// Engine over an existing backend. Rebuilds the admin-tree index.
    pub fn open(store: StorageBackend) -> Result<Self, NgaoError> {
        let tree = AdminTree::from_units(store.all()?)?;
        Ok(Self {
            store,
            tree,
            permissions: PermissionTable::builtin(),
            sink: Box::new(Silent),
        })
    }

    /// Engine over a redb database at `path`, created when missing.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, NgaoError> {
        Self::open(StorageBackend::redb(path)?)
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: PermissionTable) -> Self {
        self.permissions = permissions;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl DeliverySink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.store.is_persistent()
    }

    #[must_use]
    pub fn tree(&self) -> &AdminTree {
        &self.tree
    }

    #[must_use]
    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    fn gate(&self) -> PermissionGate<'_> {
        PermissionGate::new(&self.permissions, &self.tree)
    }

    // =========================================================================
    // LOOKUP HELPERS
    // =========================================================================

    /// Load a record or fail with `NotFound { kind: what, .. }`.
    fn load<R: Record>(&self, what: &'static str, id: u64) -> Result<R, NgaoError> {
        self.store
            .get(id)?
            .ok_or_else(|| NgaoError::not_found(what, id))
    }

    /// The acting officer. Must exist and be active.
    fn actor(&self, id: UserId) -> Result<Officer, NgaoError> {
        let officer: Officer = self
            .store
            .get(id.0)?
            .ok_or(NgaoError::UnknownOfficer(id))?;
        if !officer.is_active {
            return Err(NgaoError::InactiveOfficer(id));
        }
        Ok(officer)
    }

    fn all_officers(&self) -> Result<Vec<Officer>, NgaoError> {
        self.store.all()
    }

    // =========================================================================
    // COMMIT
    // =========================================================================

    fn begin(&self) -> Change {
        Change::default()
    }

    /// Apply `change` atomically and deliver its communications.
    fn commit(&mut self, change: Change) -> Result<(), NgaoError> {
        // Resolve recipients first so a failed lookup aborts before anything is written.
        let mut outbox = Vec::with_capacity(change.outbox.len());
        for communication in change.outbox {
            let mut recipients = Vec::with_capacity(communication.recipients.len());
            for id in &communication.recipients {
                if let Some(officer) = self.store.get::<Officer>(id.0)? {
                    recipients.push(officer);
                }
            }
            outbox.push((communication, recipients));
        }
        self.store.commit(change.batch)?;
        for (communication, recipients) in &outbox {
            self.sink.deliver(communication, recipients);
        }
        Ok(())
    }
}

/// Writes and outbound communications staged by one operation.
#[derive(Debug, Default)]
struct Change {
    batch: WriteBatch,
    outbox: Vec<Communication>,
    timelines: BTreeMap<EntityRef, Timeline>,
}

impl Change {
    fn allocate(&mut self, store: &StorageBackend, table: &'static str) -> Result<u64, NgaoError> {
        self.batch.allocate(store, table)
    }

    fn put<R: Record>(&mut self, record: &R) -> Result<(), NgaoError> {
        self.batch.put(record)
    }

    /// Stage an audit entry for a status change.
    fn transition(
        &mut self,
        store: &StorageBackend,
        entity: EntityRef,
        from: Option<&str>,
        to: &str,
        actor: UserId,
        note: Option<String>,
        at: Timestamp,
    ) -> Result<(), NgaoError> {
        let id = TransitionId(self.allocate(store, storage::TRANSITIONS)?);
        self.put(&TransitionRecord {
            id,
            entity,
            from: from.map(str::to_string),
            to: to.to_string(),
            actor,
            note,
            at,
        })?;
        let timeline = match self.timelines.remove(&entity) {
            Some(staged) => staged,
            None => store
                .get::<Timeline>(Timeline::key_for(entity))?
                .unwrap_or_else(|| Timeline::new(entity)),
        };
        let timeline = self.timelines.entry(entity).or_insert(timeline);
        timeline.transitions.push(id);
        self.batch.put(&*timeline)
    }

    /// Stage a communication. Skipped when it has no recipients, unless it
    /// is an announcement (kept as a record of the broadcast).
    fn communicate(
        &mut self,
        store: &StorageBackend,
        kind: CommunicationKind,
        sender: Option<UserId>,
        recipients: impl IntoIterator<Item = UserId>,
        title: String,
        body: String,
        admin_unit: Option<UnitId>,
        at: Timestamp,
    ) -> Result<Option<Communication>, NgaoError> {
        let recipients: BTreeSet<UserId> = recipients.into_iter().collect();
        if recipients.is_empty() && kind != CommunicationKind::Announcement {
            return Ok(None);
        }
        let id = CommunicationId(self.allocate(store, storage::COMMUNICATIONS)?);
        let communication = Communication {
            id,
            kind,
            sender,
            recipients,
            title,
            body,
            admin_unit,
            read_by: BTreeSet::new(),
            created_at: at,
        };
        self.put(&communication)?;
        self.outbox.push(communication.clone());
        Ok(Some(communication))
    }

    /// Stage a system notification.
    fn notify(
        &mut self,
        store: &StorageBackend,
        recipients: impl IntoIterator<Item = UserId>,
        title: impl Into<String>,
        body: String,
        admin_unit: Option<UnitId>,
        at: Timestamp,
    ) -> Result<(), NgaoError> {
        self.communicate(
            store,
            CommunicationKind::Notification,
            None,
            recipients,
            title.into(),
            body,
            admin_unit,
            at,
        )
        .map(|_| ())
    }
}
