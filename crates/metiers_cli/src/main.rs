//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `metiers_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use metiers_core::db::open_db_in_memory;
use metiers_core::{MemoryKeyValueStore, TaxonomyStore};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("metiers_core ping={}", metiers_core::ping());
    println!("metiers_core version={}", metiers_core::core_version());

    let schema_version = open_db_in_memory().and_then(|conn| {
        conn.query_row("PRAGMA user_version", [], |row| row.get::<_, u32>(0))
            .map_err(Into::into)
    });
    match schema_version {
        Ok(version) => println!("metiers_core schema_version={version}"),
        Err(err) => {
            eprintln!("metiers_core schema check failed: {err}");
            return ExitCode::FAILURE;
        }
    }

    let kv = MemoryKeyValueStore::new();
    let store = TaxonomyStore::new(&kv);
    match store.initialize() {
        Ok(outcome) => {
            println!("metiers_core data_version={:?}", store.data_version_status());
            println!("metiers_core needs_reset={}", outcome.needs_reset());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("metiers_core store check failed: {err}");
            ExitCode::FAILURE
        }
    }
}
