//! Typed JSON collections over a raw key-value store.
//!
//! # Responsibility
//! - Map each logical collection to its own storage key.
//! - Serialize whole collections with `serde_json`.
//!
//! # Invariants
//! - Reads never fail: missing or corrupt values recover to an empty
//!   collection (or `None`) and log a warning.
//! - Writes never propagate errors: they return `false` and log instead.

use crate::config::CURRENT_DATA_VERSION;
use crate::db::KeyValueStore;
use crate::model::category::Category;
use crate::model::criterion::{Criterion, CriterionWeight};
use crate::model::profession::Profession;
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const PROFESSIONS_KEY: &str = "metiers.professions";
pub const CATEGORIES_KEY: &str = "metiers.categories";
pub const CRITERIA_KEY: &str = "metiers.criteria";
pub const CRITERION_WEIGHTS_KEY: &str = "metiers.criterion_weights";
pub const DATA_VERSION_KEY: &str = "metiers.data_version";

/// Every key owned by this crate, used by full resets.
pub const ALL_KEYS: [&str; 8] = [
    PROFESSIONS_KEY,
    CATEGORIES_KEY,
    CRITERIA_KEY,
    CRITERION_WEIGHTS_KEY,
    IdCounter::Profession.key(),
    IdCounter::Category.key(),
    IdCounter::Criterion.key(),
    DATA_VERSION_KEY,
];

/// Monotonic id counters, one per id-bearing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdCounter {
    Profession,
    Category,
    Criterion,
}

impl IdCounter {
    pub const fn key(self) -> &'static str {
        match self {
            Self::Profession => "metiers.next_profession_id",
            Self::Category => "metiers.next_category_id",
            Self::Criterion => "metiers.next_criterion_id",
        }
    }
}

/// Result of comparing the stored data version with `CURRENT_DATA_VERSION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataVersionStatus {
    /// Stored version equals the current one.
    Current,
    /// No version marker stored (fresh install or pre-versioning data).
    Missing,
    /// A different version is stored; the UI offers a reset.
    Mismatch { stored: u32 },
}

/// Pure comparison of a stored version marker against the current version.
pub fn is_current_data_version(stored: Option<u32>) -> bool {
    stored == Some(CURRENT_DATA_VERSION)
}

/// Typed load/save access for every persisted collection.
pub struct CollectionStore<S: KeyValueStore> {
    kv: S,
}

impl<S: KeyValueStore> CollectionStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn load_professions(&self) -> Vec<Profession> {
        self.load_list(PROFESSIONS_KEY)
    }

    pub fn save_professions(&self, items: &[Profession]) -> bool {
        self.save_value(PROFESSIONS_KEY, items)
    }

    pub fn load_categories(&self) -> Vec<Category> {
        self.load_list(CATEGORIES_KEY)
    }

    pub fn save_categories(&self, items: &[Category]) -> bool {
        self.save_value(CATEGORIES_KEY, items)
    }

    pub fn load_criteria(&self) -> Vec<Criterion> {
        self.load_list(CRITERIA_KEY)
    }

    pub fn save_criteria(&self, items: &[Criterion]) -> bool {
        self.save_value(CRITERIA_KEY, items)
    }

    pub fn load_weights(&self) -> Vec<CriterionWeight> {
        self.load_list(CRITERION_WEIGHTS_KEY)
    }

    pub fn save_weights(&self, items: &[CriterionWeight]) -> bool {
        self.save_value(CRITERION_WEIGHTS_KEY, items)
    }

    /// Next id to hand out for `counter`; `1` when nothing was stored yet.
    pub fn load_next_id(&self, counter: IdCounter) -> u64 {
        self.load_value::<u64>(counter.key()).unwrap_or(1).max(1)
    }

    pub fn save_next_id(&self, counter: IdCounter, next_id: u64) -> bool {
        self.save_value(counter.key(), &next_id)
    }

    pub fn load_data_version(&self) -> Option<u32> {
        self.load_value(DATA_VERSION_KEY)
    }

    pub fn save_data_version(&self, version: u32) -> bool {
        self.save_value(DATA_VERSION_KEY, &version)
    }

    pub fn data_version_status(&self) -> DataVersionStatus {
        match self.load_data_version() {
            None => DataVersionStatus::Missing,
            stored if is_current_data_version(stored) => DataVersionStatus::Current,
            Some(stored) => DataVersionStatus::Mismatch { stored },
        }
    }

    /// Reads a raw stored value, used by the legacy migration.
    pub fn load_raw(&self, key: &str) -> Option<String> {
        match self.kv.get_item(key) {
            Ok(value) => value,
            Err(err) => {
                warn!("event=collection_load module=repo status=error key={key} error={err}");
                None
            }
        }
    }

    /// Removes every key owned by this crate. Returns `false` if any removal failed.
    pub fn clear_all(&self) -> bool {
        let mut ok = true;
        for key in ALL_KEYS {
            if let Err(err) = self.kv.remove_item(key) {
                error!("event=collection_clear module=repo status=error key={key} error={err}");
                ok = false;
            }
        }
        ok
    }

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.load_value(key).unwrap_or_default()
    }

    fn load_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.load_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    "event=collection_load module=repo status=error key={key} error_code=corrupt_json error={err}"
                );
                None
            }
        }
    }

    fn save_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                error!(
                    "event=collection_save module=repo status=error key={key} error_code=encode_failed error={err}"
                );
                return false;
            }
        };
        match self.kv.set_item(key, &encoded) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=collection_save module=repo status=error key={key} error_code=write_failed error={err}"
                );
                false
            }
        }
    }
}
