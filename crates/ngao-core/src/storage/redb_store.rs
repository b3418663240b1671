//! # redb-backed Record Storage
//!
//! A disk-backed record store using the redb embedded database:
//! - ACID transactions (one write transaction per `WriteBatch`)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Each record table maps `u64` keys to postcard bytes. Id counters live in a
//! separate `metadata` table keyed by record table name.

use super::{ALL_TABLES, RecordStore, WriteBatch};
use crate::NgaoError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for id counters: record table name -> last allocated id
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

fn records(table: &str) -> TableDefinition<'_, u64, &'static [u8]> {
    TableDefinition::new(table)
}

fn io<E: std::fmt::Display>(e: E) -> NgaoError {
    NgaoError::Storage(e.to_string())
}

/// A disk-backed record store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NgaoError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io)?;
            for table in ALL_TABLES {
                let _ = write_txn.open_table(records(table)).map_err(io)?;
            }
            let _ = write_txn.open_table(METADATA).map_err(io)?;
            write_txn.commit().map_err(io)?;
        }

        Ok(Self { db })
    }
}

impl RecordStore for RedbStore {
    fn load_raw(&self, table: &'static str, key: u64) -> Result<Option<Vec<u8>>, NgaoError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let t = read_txn.open_table(records(table)).map_err(io)?;
        Ok(t.get(key).map_err(io)?.map(|v| v.value().to_vec()))
    }

    fn scan_raw(&self, table: &'static str) -> Result<Vec<(u64, Vec<u8>)>, NgaoError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let t = read_txn.open_table(records(table)).map_err(io)?;
        let mut out = Vec::new();
        for entry in t.iter().map_err(io)? {
            let (key, value) = entry.map_err(io)?;
            out.push((key.value(), value.value().to_vec()));
        }
        Ok(out)
    }

    fn counter(&self, table: &'static str) -> Result<u64, NgaoError> {
        let read_txn = self.db.begin_read().map_err(io)?;
        let meta = read_txn.open_table(METADATA).map_err(io)?;
        Ok(meta.get(table).map_err(io)?.map(|v| v.value()).unwrap_or(0))
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), NgaoError> {
        if batch.is_empty() {
            return Ok(());
        }
        let (puts, counters) = batch.into_parts();
        let write_txn = self.db.begin_write().map_err(io)?;
        {
            for ((table, key), bytes) in &puts {
                let mut t = write_txn.open_table(records(table)).map_err(io)?;
                t.insert(*key, bytes.as_slice()).map_err(io)?;
            }
            let mut meta = write_txn.open_table(METADATA).map_err(io)?;
            for (table, last) in &counters {
                meta.insert(*table, *last).map_err(io)?;
            }
        }
        // Dropping an uncommitted transaction aborts it.
        write_txn.commit().map_err(io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{COMMUNICATIONS, INCIDENTS, Record};
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: u64,
        body: String,
    }

    impl Record for Entry {
        const TABLE: &'static str = INCIDENTS;

        fn key(&self) -> u64 {
            self.id
        }
    }

    #[test]
    fn records_and_counters_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("ngao.redb");

        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            let mut batch = WriteBatch::new();
            for body in ["fire", "flood"] {
                let id = batch.allocate(&store, INCIDENTS).expect("id");
                batch
                    .put(&Entry {
                        id,
                        body: body.into(),
                    })
                    .expect("put");
            }
            store.commit(batch).expect("commit");
        }

        {
            let store = RedbStore::open(&db_path).expect("reopen db");
            let all: Vec<Entry> = store.all().expect("scan");
            assert_eq!(all.len(), 2);
            assert_eq!(all[1].body, "flood");
            assert_eq!(store.counter(INCIDENTS).expect("counter"), 2);
            assert_eq!(store.counter(COMMUNICATIONS).expect("counter"), 0);

            let mut batch = WriteBatch::new();
            assert_eq!(batch.allocate(&store, INCIDENTS).expect("id"), 3);
        }
    }

    #[test]
    fn missing_key_is_none() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path().join("ngao.redb")).expect("open db");
        assert_eq!(store.get::<Entry>(42).expect("get"), None);
    }
}
