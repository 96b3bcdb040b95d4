//! Table schema for the key-value store.
//!
//! Only the `kv_entries` layout is migrated here. Changes to the JSON shape
//! of a collection are handled by `repo::legacy` and the data version marker,
//! never by SQL.
//!
//! # Invariants
//! - Registered versions strictly increase and are applied in one transaction.
//! - The applied version is mirrored to `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::{debug, info, warn};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: include_str!("0001_kv_entries.sql"),
}];

/// Highest `kv_entries` schema version this binary can open.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the `kv_entries` schema up to `latest_version`.
///
/// Refuses databases stamped with a newer version instead of touching them.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current_version = stored_schema_version(conn)?;
    let latest = latest_version();

    if current_version > latest {
        warn!(
            "event=kv_schema module=db status=error error_code=schema_too_new stored={current_version} latest={latest}"
        );
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        debug!("event=kv_schema module=db status=skip version={current_version}");
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    info!("event=kv_schema module=db status=ok from={current_version} to={latest}");
    Ok(())
}

fn stored_schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
