//! # Storage
//!
//! Record persistence for the NGAO engine.
//!
//! Every record type implements [`Record`] (table name + `u64` key) and is
//! stored as postcard bytes. Writes are staged in a [`WriteBatch`] and applied
//! by [`RecordStore::commit`] all-or-nothing, so a status change, its audit
//! entry and its notifications land together or not at all.
//!
//! ## Backends
//!
//! - `MemoryStore`: `BTreeMap` tables (fast, volatile)
//! - `RedbStore`: disk-backed redb database (ACID, persistent)

mod redb_store;

pub use redb_store::RedbStore;

use crate::NgaoError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// TABLES
// =============================================================================

pub const ADMIN_UNITS: &str = "admin_units";
pub const OFFICERS: &str = "officers";
pub const CITIZENS: &str = "citizens";
pub const INCIDENTS: &str = "incidents";
pub const RESPONSES: &str = "responses";
pub const BIRTHS: &str = "births";
pub const DEATHS: &str = "deaths";
pub const MARRIAGES: &str = "marriages";
pub const NATIONAL_IDS: &str = "national_ids";
pub const COMMUNICATIONS: &str = "communications";
pub const TRANSITIONS: &str = "transitions";
pub const TIMELINES: &str = "timelines";

/// Every table the engine writes. Backends create them all up front.
pub const ALL_TABLES: [&str; 12] = [
    ADMIN_UNITS,
    OFFICERS,
    CITIZENS,
    INCIDENTS,
    RESPONSES,
    BIRTHS,
    DEATHS,
    MARRIAGES,
    NATIONAL_IDS,
    COMMUNICATIONS,
    TRANSITIONS,
    TIMELINES,
];

/// A storable record.
pub trait Record: Serialize + DeserializeOwned {
    const TABLE: &'static str;

    fn key(&self) -> u64;
}

pub(crate) fn encode<R: Record>(record: &R) -> Result<Vec<u8>, NgaoError> {
    postcard::to_allocvec(record).map_err(|e| NgaoError::Serialization(e.to_string()))
}

pub(crate) fn decode<R: Record>(bytes: &[u8]) -> Result<R, NgaoError> {
    postcard::from_bytes(bytes).map_err(|e| {
        NgaoError::Serialization(format!("corrupt {} record: {e}", R::TABLE))
    })
}

// =============================================================================
// WRITE BATCH
// =============================================================================

/// Staged writes and id allocations applied by one commit.
#[derive(Debug, Default)]
pub struct WriteBatch {
    puts: BTreeMap<(&'static str, u64), Vec<u8>>,
    counters: BTreeMap<&'static str, u64>,
}

impl WriteBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `record`, replacing any earlier staged copy with the same key.
    pub fn put<R: Record>(&mut self, record: &R) -> Result<(), NgaoError> {
        let bytes = encode(record)?;
        self.puts.insert((R::TABLE, record.key()), bytes);
        Ok(())
    }

    /// Reserve the next id in `table`. Ids start at 1 and are never reused.
    pub fn allocate<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        table: &'static str,
    ) -> Result<u64, NgaoError> {
        let last = match self.counters.get(table) {
            Some(last) => *last,
            None => store.counter(table)?,
        };
        let next = last
            .checked_add(1)
            .ok_or_else(|| NgaoError::Storage(format!("id space of {table} exhausted")))?;
        self.counters.insert(table, next);
        Ok(next)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.counters.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.puts.len()
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        BTreeMap<(&'static str, u64), Vec<u8>>,
        BTreeMap<&'static str, u64>,
    ) {
        (self.puts, self.counters)
    }
}

// =============================================================================
// RECORD STORE TRAIT
// =============================================================================

/// Raw table access implemented by each backend.
pub trait RecordStore {
    fn load_raw(&self, table: &'static str, key: u64) -> Result<Option<Vec<u8>>, NgaoError>;

    /// All rows of `table` in key order.
    fn scan_raw(&self, table: &'static str) -> Result<Vec<(u64, Vec<u8>)>, NgaoError>;

    /// Last id allocated in `table` (0 when none).
    fn counter(&self, table: &'static str) -> Result<u64, NgaoError>;

    /// Apply the batch atomically.
    fn commit(&mut self, batch: WriteBatch) -> Result<(), NgaoError>;

    fn get<R: Record>(&self, key: u64) -> Result<Option<R>, NgaoError>
    where
        Self: Sized,
    {
        self.load_raw(R::TABLE, key)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn all<R: Record>(&self) -> Result<Vec<R>, NgaoError>
    where
        Self: Sized,
    {
        self.scan_raw(R::TABLE)?
            .iter()
            .map(|(_, bytes)| decode(bytes))
            .collect()
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory store. Uses `BTreeMap` for deterministic scans.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<&'static str, BTreeMap<u64, Vec<u8>>>,
    counters: BTreeMap<&'static str, u64>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn load_raw(&self, table: &'static str, key: u64) -> Result<Option<Vec<u8>>, NgaoError> {
        Ok(self.tables.get(table).and_then(|t| t.get(&key)).cloned())
    }

    fn scan_raw(&self, table: &'static str) -> Result<Vec<(u64, Vec<u8>)>, NgaoError> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.iter().map(|(k, v)| (*k, v.clone())).collect())
            .unwrap_or_default())
    }

    fn counter(&self, table: &'static str) -> Result<u64, NgaoError> {
        Ok(self.counters.get(table).copied().unwrap_or(0))
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), NgaoError> {
        let (puts, counters) = batch.into_parts();
        for ((table, key), bytes) in puts {
            self.tables.entry(table).or_default().insert(key, bytes);
        }
        self.counters.extend(counters);
        Ok(())
    }
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for an engine.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory tables (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed tables using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open or create a redb database at `path`.
    pub fn redb(path: impl AsRef<Path>) -> Result<Self, NgaoError> {
        RedbStore::open(path).map(Self::Persistent)
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

impl RecordStore for StorageBackend {
    fn load_raw(&self, table: &'static str, key: u64) -> Result<Option<Vec<u8>>, NgaoError> {
        match self {
            Self::InMemory(s) => s.load_raw(table, key),
            Self::Persistent(s) => s.load_raw(table, key),
        }
    }

    fn scan_raw(&self, table: &'static str) -> Result<Vec<(u64, Vec<u8>)>, NgaoError> {
        match self {
            Self::InMemory(s) => s.scan_raw(table),
            Self::Persistent(s) => s.scan_raw(table),
        }
    }

    fn counter(&self, table: &'static str) -> Result<u64, NgaoError> {
        match self {
            Self::InMemory(s) => s.counter(table),
            Self::Persistent(s) => s.counter(table),
        }
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), NgaoError> {
        match self {
            Self::InMemory(s) => s.commit(batch),
            Self::Persistent(s) => s.commit(batch),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
