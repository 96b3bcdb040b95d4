//! Durable key-value substrate behind the taxonomy collections.
//!
//! # Responsibility
//! - Own the SQLite connection lifecycle for the `kv_entries` table.
//! - Expose the `KeyValueStore` seam that collection code is written against.
//!
//! # Invariants
//! - A connection handed to `SqliteKeyValueStore` has its table schema applied.
//! - This layer stores opaque strings; collection shapes and their version
//!   marker belong to `repo::collections`.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod kv;
pub mod migrations;
mod open;

pub use kv::{KeyValueStore, KvError, KvResult, MemoryKeyValueStore, SqliteKeyValueStore};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Connection or schema failure below the key-value layer.
#[derive(Debug)]
pub enum DbError {
    /// SQLite rejected an open, pragma or statement.
    Sqlite(rusqlite::Error),
    /// The file was written by a newer binary; its `kv_entries` layout is unknown.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "key-value table schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
