//! Domain model for the profession comparison taxonomy.
//!
//! # Responsibility
//! - Define the persisted records (professions, categories, criteria,
//!   per-profession weights) and the derived join view.
//!
//! # Invariants
//! - Ids are store-scoped, monotonically increasing and never reused.
//! - Names are stored trimmed.
//! - Weight and type are the only per-profession data; names are shared.

pub mod category;
pub mod criterion;
pub mod profession;
pub mod view;

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall clock as Unix epoch milliseconds.
///
/// Falls back to `0` if the clock is set before the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
