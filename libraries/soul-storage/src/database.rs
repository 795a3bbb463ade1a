//! Embedded, file-backed key-value store

use crate::error::Result;
use redb::{Database, ReadableTable, TableDefinition};
use soul_core::KeyValueStore;
use std::path::Path;
use tracing::debug;

/// Single table holding every preference and the session snapshot
const KV_TABLE: TableDefinition<&str, &str> = TableDefinition::new("kv");

/// Durable store backed by a redb database file
///
/// Every write is its own committed transaction, so a crash never loses a
/// value that `set` has returned from.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path)?;

        // Create the table up front so read transactions never hit a missing table
        let txn = db.begin_write()?;
        txn.open_table(KV_TABLE)?;
        txn.commit()?;

        debug!(path = %path.display(), "Opened key-value store");
        Ok(Self { db })
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(KV_TABLE)?;
        let value = table.get(key)?.map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(KV_TABLE)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(KV_TABLE)?;
            table.remove(key)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// All stored keys, in key order
    pub fn keys(&self) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(KV_TABLE)?;
        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> soul_core::Result<Option<String>> {
        Ok(self.read(key)?)
    }

    fn set(&self, key: &str, value: &str) -> soul_core::Result<()> {
        Ok(self.write(key, value)?)
    }

    fn remove(&self, key: &str) -> soul_core::Result<()> {
        Ok(self.delete(key)?)
    }
}
