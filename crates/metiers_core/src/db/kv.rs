//! Raw key-value persistence contract and implementations.
//!
//! # Responsibility
//! - Define the substitution seam between collection logic and storage.
//! - Provide a SQLite-backed store and an in-memory store.
//!
//! # Invariants
//! - Values are opaque UTF-8 strings; this layer never parses them.
//! - `set_item` replaces the whole value for a key (no partial writes).

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type KvResult<T> = Result<T, KvError>;

/// Error from raw key-value access.
#[derive(Debug)]
pub enum KvError {
    /// Underlying database failure.
    Db(DbError),
    /// Store refused the write (quota, read-only medium, ...).
    WriteRejected { key: String, reason: String },
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::WriteRejected { key, reason } => {
                write!(f, "write rejected for key `{key}`: {reason}")
            }
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::WriteRejected { .. } => None,
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable string-keyed storage used by the collection layer.
pub trait KeyValueStore {
    /// Reads one value, `None` when the key was never written or was removed.
    fn get_item(&self, key: &str) -> KvResult<Option<String>>;
    /// Writes one value, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> KvResult<()>;
    /// Removes one key. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> KvResult<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get_item(&self, key: &str) -> KvResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> KvResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> KvResult<()> {
        (**self).remove_item(key)
    }
}

/// SQLite-backed key-value store over the `kv_entries` table.
pub struct SqliteKeyValueStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKeyValueStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl KeyValueStore for SqliteKeyValueStore<'_> {
    fn get_item(&self, key: &str) -> KvResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> KvResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> KvResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

/// Process-local key-value store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every stored key in ascending order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> KvResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> KvResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> KvResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
