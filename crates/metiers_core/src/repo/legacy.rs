//! One-time migration from the single-profession schema.
//!
//! The legacy layout stored the weight (and sometimes the type) directly on
//! each criterion and had no profession collection. Field names were also
//! accepted in French (`nom`, `poids`); those aliases are resolved here and
//! nowhere deeper in the core.
//!
//! # Invariants
//! - Runs only when no profession exists; otherwise it is a no-op.
//! - The profession list is written last, so an interrupted run is retried
//!   on the next start instead of leaving a half-migrated dataset.

use crate::config::{DEFAULT_PROFESSION_NAME, DEFAULT_WEIGHT, MAX_WEIGHT, MIN_WEIGHT};
use crate::db::KeyValueStore;
use crate::model::category::CategoryId;
use crate::model::criterion::{Criterion, CriterionId, CriterionType, CriterionWeight};
use crate::model::now_epoch_ms;
use crate::model::profession::{Profession, ProfessionId};
use crate::repo::collections::{
    CollectionStore, IdCounter, CATEGORIES_KEY, CRITERIA_KEY, CRITERION_WEIGHTS_KEY,
    PROFESSIONS_KEY,
};
use crate::repo::taxonomy_store::{allocate_id, persist, StoreResult};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

/// Result of `migrate_legacy_data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyMigrationOutcome {
    /// Professions already exist; nothing to do.
    AlreadyMigrated,
    /// No categories or criteria are stored.
    NothingToMigrate,
    /// A default profession was created and weight rows back-filled.
    Migrated {
        profession_id: ProfessionId,
        criteria_count: usize,
        dropped_criteria: usize,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCriterion {
    id: CriterionId,
    category_id: CategoryId,
    #[serde(alias = "nom")]
    name: String,
    #[serde(default, alias = "poids")]
    weight: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    created_at: i64,
}

/// Folds single-profession data into the multi-profession layout.
pub fn migrate_legacy_data<S: KeyValueStore>(
    collections: &CollectionStore<S>,
) -> StoreResult<LegacyMigrationOutcome> {
    if !collections.load_professions().is_empty() {
        return Ok(LegacyMigrationOutcome::AlreadyMigrated);
    }

    let categories = collections.load_categories();
    let legacy_criteria = load_legacy_criteria(collections);
    if categories.is_empty() && legacy_criteria.is_empty() {
        return Ok(LegacyMigrationOutcome::NothingToMigrate);
    }

    let known_categories = categories.iter().map(|c| c.id).collect::<HashSet<_>>();
    let total = legacy_criteria.len();
    let legacy_criteria = legacy_criteria
        .into_iter()
        .filter(|criterion| known_categories.contains(&criterion.category_id))
        .collect::<Vec<_>>();
    let dropped_criteria = total - legacy_criteria.len();
    if dropped_criteria > 0 {
        warn!(
            "event=legacy_migrate module=repo status=warn dropped_criteria={dropped_criteria} reason=unknown_category"
        );
    }

    // Counters may be absent in legacy data; lift them past existing ids.
    allocate_id(
        collections,
        IdCounter::Category,
        categories.iter().map(|c| c.id).max(),
    )?;
    allocate_id(
        collections,
        IdCounter::Criterion,
        legacy_criteria.iter().map(|c| c.id).max(),
    )?;
    let profession_id = allocate_id(collections, IdCounter::Profession, None)?;

    let weights = legacy_criteria
        .iter()
        .map(|criterion| CriterionWeight {
            profession_id,
            category_id: criterion.category_id,
            criterion_id: criterion.id,
            weight: criterion
                .weight
                .as_ref()
                .and_then(coerce_legacy_weight)
                .unwrap_or(DEFAULT_WEIGHT),
            kind: criterion
                .kind
                .as_deref()
                .and_then(CriterionType::parse)
                .unwrap_or_default(),
        })
        .collect::<Vec<_>>();
    let criteria = legacy_criteria
        .into_iter()
        .map(|legacy| Criterion {
            id: legacy.id,
            category_id: legacy.category_id,
            name: legacy.name.trim().to_string(),
            created_at: legacy.created_at,
        })
        .collect::<Vec<_>>();
    let categories = categories
        .into_iter()
        .map(|mut category| {
            category.name = category.name.trim().to_string();
            category
        })
        .collect::<Vec<_>>();

    persist(collections.save_categories(&categories), CATEGORIES_KEY)?;
    persist(collections.save_criteria(&criteria), CRITERIA_KEY)?;
    persist(collections.save_weights(&weights), CRITERION_WEIGHTS_KEY)?;
    let profession = Profession {
        id: profession_id,
        name: DEFAULT_PROFESSION_NAME.to_string(),
        created_at: now_epoch_ms(),
    };
    persist(collections.save_professions(&[profession]), PROFESSIONS_KEY)?;

    info!(
        "event=legacy_migrate module=repo status=ok profession_id={profession_id} criteria={} categories={}",
        criteria.len(),
        categories.len()
    );
    Ok(LegacyMigrationOutcome::Migrated {
        profession_id,
        criteria_count: criteria.len(),
        dropped_criteria,
    })
}

fn load_legacy_criteria<S: KeyValueStore>(collections: &CollectionStore<S>) -> Vec<LegacyCriterion> {
    let Some(raw) = collections.load_raw(CRITERIA_KEY) else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(criteria) => criteria,
        Err(err) => {
            warn!(
                "event=legacy_migrate module=repo status=error error_code=corrupt_json key={CRITERIA_KEY} error={err}"
            );
            Vec::new()
        }
    }
}

/// Numbers and numeric strings, rounded and clamped into the weight range.
fn coerce_legacy_weight(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    let clamped = number
        .round()
        .clamp(f64::from(MIN_WEIGHT), f64::from(MAX_WEIGHT));
    Some(clamped as u32)
}
