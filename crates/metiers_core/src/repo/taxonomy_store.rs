//! Taxonomy store: CRUD over professions, categories, criteria and weights,
//! plus the per-profession join view.
//!
//! # Responsibility
//! - Sole owner of persisted taxonomy state.
//! - Keep multi-collection mutations sequenced so no orphan weight rows
//!   survive a delete.
//! - Assemble `CategoryForProfession` views for one or many professions.
//!
//! # Invariants
//! - Ids come from persisted monotonic counters and are never reused.
//! - Names are trimmed on every write path.
//! - Category color and cardinality rules are *not* checked here; callers
//!   run `validation` first.
//! - The last profession can never be deleted; the error distinguishes
//!   whether taxonomy data still exists.
//! - A category that still owns criteria cannot be deleted.

use crate::config::{TaxonomyLimits, CURRENT_DATA_VERSION, LEGACY_DATA_VERSION};
use crate::db::KeyValueStore;
use crate::model::category::{Category, CategoryId, CategoryPatch};
use crate::model::criterion::{Criterion, CriterionId, CriterionType, CriterionWeight};
use crate::model::now_epoch_ms;
use crate::model::profession::{Profession, ProfessionId, ProfessionPatch};
use crate::model::view::{CategoryForProfession, CriterionView};
use crate::repo::collections::{
    CollectionStore, DataVersionStatus, IdCounter, CATEGORIES_KEY, CRITERIA_KEY,
    CRITERION_WEIGHTS_KEY, DATA_VERSION_KEY, PROFESSIONS_KEY,
};
use crate::repo::legacy::{migrate_legacy_data, LegacyMigrationOutcome};
use log::{error, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity kinds addressed by store errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Profession,
    Category,
    Criterion,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profession => "profession",
            Self::Category => "category",
            Self::Criterion => "criterion",
        }
    }
}

/// Store-level failure with a machine-checkable `reason_code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Name is blank after trim.
    EmptyName(EntityKind),
    /// Profession count already at the configured maximum.
    ProfessionLimitReached { max: usize },
    /// Referenced entity does not exist.
    NotFound { kind: EntityKind, id: u64 },
    /// Deleting the only profession while no taxonomy data exists.
    CannotDeleteLastProfession,
    /// Deleting the only profession while categories/criteria still exist.
    CannotDeleteLastProfessionWithData,
    /// Category still owns criteria.
    CategoryHasCriteria {
        category_id: CategoryId,
        criteria_count: usize,
    },
    /// The backing store rejected a write.
    PersistFailed { key: &'static str },
}

impl StoreError {
    /// Stable code UI callers branch on.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::EmptyName(_) => "EMPTY_NAME",
            Self::ProfessionLimitReached { .. } => "PROFESSION_LIMIT_REACHED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::CannotDeleteLastProfession => "CANNOT_DELETE_LAST_PROFESSION",
            Self::CannotDeleteLastProfessionWithData => "CANNOT_DELETE_LAST_PROFESSION_WITH_DATA",
            Self::CategoryHasCriteria { .. } => "CATEGORY_HAS_CRITERIA",
            Self::PersistFailed { .. } => "PERSIST_FAILED",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName(kind) => write!(f, "{} name must not be blank", kind.as_str()),
            Self::ProfessionLimitReached { max } => {
                write!(f, "profession limit reached ({max})")
            }
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
            Self::CannotDeleteLastProfession => write!(f, "cannot delete the last profession"),
            Self::CannotDeleteLastProfessionWithData => write!(
                f,
                "cannot delete the last profession while categories or criteria exist"
            ),
            Self::CategoryHasCriteria {
                category_id,
                criteria_count,
            } => write!(
                f,
                "category {category_id} still has {criteria_count} criteria"
            ),
            Self::PersistFailed { key } => write!(f, "failed to persist `{key}`"),
        }
    }
}

impl Error for StoreError {}

/// What `TaxonomyStore::initialize` found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOutcome {
    /// Version status observed before any migration ran.
    pub version_status: DataVersionStatus,
    /// Legacy migration result; `None` when the migration was not attempted.
    pub legacy: Option<LegacyMigrationOutcome>,
}

impl InitOutcome {
    /// Whether the stored data has an unknown shape and the UI should offer a reset.
    pub fn needs_reset(&self) -> bool {
        matches!(self.version_status, DataVersionStatus::Mismatch { .. }) && self.legacy.is_none()
    }
}

/// Persistent taxonomy store over any `KeyValueStore`.
pub struct TaxonomyStore<S: KeyValueStore> {
    collections: CollectionStore<S>,
    limits: TaxonomyLimits,
}

impl<S: KeyValueStore> TaxonomyStore<S> {
    pub fn new(kv: S) -> Self {
        Self::with_limits(kv, TaxonomyLimits::default())
    }

    pub fn with_limits(kv: S, limits: TaxonomyLimits) -> Self {
        Self {
            collections: CollectionStore::new(kv),
            limits,
        }
    }

    pub fn limits(&self) -> &TaxonomyLimits {
        &self.limits
    }

    pub fn collections(&self) -> &CollectionStore<S> {
        &self.collections
    }

    /// Startup entry point: runs the legacy migration when the stored data
    /// predates the current shape, then stamps the current version.
    ///
    /// A mismatching version leaves data untouched; see `InitOutcome::needs_reset`.
    pub fn initialize(&self) -> StoreResult<InitOutcome> {
        let version_status = self.collections.data_version_status();
        let legacy = match version_status {
            DataVersionStatus::Current => None,
            DataVersionStatus::Mismatch { stored } if stored != LEGACY_DATA_VERSION => {
                warn!(
                    "event=store_init module=repo status=skip reason=version_mismatch stored={stored} current={CURRENT_DATA_VERSION}"
                );
                None
            }
            DataVersionStatus::Missing | DataVersionStatus::Mismatch { .. } => {
                let outcome = migrate_legacy_data(&self.collections)?;
                self.stamp_data_version()?;
                Some(outcome)
            }
        };
        info!("event=store_init module=repo status=ok version_status={version_status:?}");
        Ok(InitOutcome {
            version_status,
            legacy,
        })
    }

    pub fn data_version_status(&self) -> DataVersionStatus {
        self.collections.data_version_status()
    }

    pub fn stamp_data_version(&self) -> StoreResult<()> {
        persist(
            self.collections.save_data_version(CURRENT_DATA_VERSION),
            DATA_VERSION_KEY,
        )
    }

    /// Removes every persisted collection, counter and version marker.
    pub fn reset_all_data(&self) -> StoreResult<()> {
        if !self.collections.clear_all() {
            return Err(StoreError::PersistFailed {
                key: DATA_VERSION_KEY,
            });
        }
        info!("event=store_reset module=repo status=ok");
        Ok(())
    }

    // ---- professions -------------------------------------------------------

    pub fn list_professions(&self) -> Vec<Profession> {
        self.collections.load_professions()
    }

    pub fn get_profession(&self, id: ProfessionId) -> Option<Profession> {
        self.list_professions().into_iter().find(|p| p.id == id)
    }

    /// Creates a profession and seeds its weight rows from the most recently
    /// created existing profession.
    pub fn add_profession(&self, name: &str) -> StoreResult<Profession> {
        let name = trimmed_non_empty(name, EntityKind::Profession)?;
        let mut professions = self.collections.load_professions();
        if professions.len() >= self.limits.max_professions {
            return Err(StoreError::ProfessionLimitReached {
                max: self.limits.max_professions,
            });
        }

        let template = professions
            .iter()
            .max_by_key(|p| (p.created_at, p.id))
            .map(|p| p.id);
        let existing_max = professions.iter().map(|p| p.id).max();
        let id = allocate_id(&self.collections, IdCounter::Profession, existing_max)?;
        let profession = Profession {
            id,
            name,
            created_at: now_epoch_ms(),
        };

        // Weight rows first: the profession only becomes visible once its
        // rows are stored.
        let previous_weights = self.collections.load_weights();
        let seeded = template.map_or_else(Vec::new, |template_id| {
            previous_weights
                .iter()
                .filter(|row| row.profession_id == template_id)
                .map(|row| CriterionWeight {
                    profession_id: id,
                    ..row.clone()
                })
                .collect::<Vec<_>>()
        });
        let cloned = seeded.len();
        if cloned > 0 {
            let mut weights = previous_weights.clone();
            weights.extend(seeded);
            persist(self.collections.save_weights(&weights), CRITERION_WEIGHTS_KEY)?;
        }

        professions.push(profession.clone());
        if let Err(err) = persist(self.collections.save_professions(&professions), PROFESSIONS_KEY) {
            if cloned > 0 {
                self.restore_weights(&previous_weights, "profession_add");
            }
            return Err(err);
        }

        info!(
            "event=profession_add module=repo status=ok profession_id={id} template_id={} cloned_weights={cloned}",
            template.map_or_else(|| "none".to_string(), |t| t.to_string())
        );
        Ok(profession)
    }

    /// Applies a partial update; `Ok(None)` when the profession does not exist.
    pub fn update_profession(
        &self,
        id: ProfessionId,
        patch: &ProfessionPatch,
    ) -> StoreResult<Option<Profession>> {
        let mut professions = self.collections.load_professions();
        let Some(profession) = professions.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name.as_deref() {
            profession.name = trimmed_non_empty(name, EntityKind::Profession)?;
        }
        let updated = profession.clone();
        persist(self.collections.save_professions(&professions), PROFESSIONS_KEY)?;
        Ok(Some(updated))
    }

    /// Deletes a profession together with its weight rows.
    pub fn delete_profession(&self, id: ProfessionId) -> StoreResult<()> {
        let mut professions = self.collections.load_professions();
        let Some(index) = professions.iter().position(|p| p.id == id) else {
            return Err(StoreError::NotFound {
                kind: EntityKind::Profession,
                id,
            });
        };

        if professions.len() == 1 {
            let has_data = !self.collections.load_categories().is_empty()
                || !self.collections.load_criteria().is_empty();
            let err = if has_data {
                StoreError::CannotDeleteLastProfessionWithData
            } else {
                StoreError::CannotDeleteLastProfession
            };
            warn!(
                "event=profession_delete module=repo status=error profession_id={id} error_code={}",
                err.reason_code()
            );
            return Err(err);
        }

        let mut weights = self.collections.load_weights();
        let before = weights.len();
        weights.retain(|row| row.profession_id != id);
        if weights.len() != before {
            persist(self.collections.save_weights(&weights), CRITERION_WEIGHTS_KEY)?;
        }

        professions.remove(index);
        persist(self.collections.save_professions(&professions), PROFESSIONS_KEY)?;
        info!(
            "event=profession_delete module=repo status=ok profession_id={id} removed_weights={}",
            before - weights.len()
        );
        Ok(())
    }

    // ---- categories --------------------------------------------------------

    pub fn list_categories(&self) -> Vec<Category> {
        self.collections.load_categories()
    }

    pub fn get_category(&self, id: CategoryId) -> Option<Category> {
        self.list_categories().into_iter().find(|c| c.id == id)
    }

    /// Creates a category with no criteria. Color uniqueness and the
    /// category cap are validated by the caller.
    pub fn add_category(&self, name: &str, color: &str) -> StoreResult<Category> {
        let mut categories = self.collections.load_categories();
        let existing_max = categories.iter().map(|c| c.id).max();
        let id = allocate_id(&self.collections, IdCounter::Category, existing_max)?;
        let category = Category {
            id,
            name: name.trim().to_string(),
            color: color.trim().to_string(),
            created_at: now_epoch_ms(),
        };
        categories.push(category.clone());
        persist(self.collections.save_categories(&categories), CATEGORIES_KEY)?;
        info!("event=category_add module=repo status=ok category_id={id}");
        Ok(category)
    }

    /// Applies a partial update; `Ok(None)` when the category does not exist.
    pub fn update_category(
        &self,
        id: CategoryId,
        patch: &CategoryPatch,
    ) -> StoreResult<Option<Category>> {
        let mut categories = self.collections.load_categories();
        let Some(category) = categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name.as_deref() {
            category.name = name.trim().to_string();
        }
        if let Some(color) = patch.color.as_deref() {
            category.color = color.trim().to_string();
        }
        let updated = category.clone();
        persist(self.collections.save_categories(&categories), CATEGORIES_KEY)?;
        Ok(Some(updated))
    }

    /// Deletes an empty category.
    pub fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut categories = self.collections.load_categories();
        let Some(index) = categories.iter().position(|c| c.id == id) else {
            return Err(StoreError::NotFound {
                kind: EntityKind::Category,
                id,
            });
        };
        let criteria_count = self
            .collections
            .load_criteria()
            .iter()
            .filter(|criterion| criterion.category_id == id)
            .count();
        if criteria_count > 0 {
            return Err(StoreError::CategoryHasCriteria {
                category_id: id,
                criteria_count,
            });
        }

        categories.remove(index);
        persist(self.collections.save_categories(&categories), CATEGORIES_KEY)?;
        info!("event=category_delete module=repo status=ok category_id={id}");
        Ok(())
    }

    // ---- criteria ----------------------------------------------------------

    pub fn list_criteria(&self) -> Vec<Criterion> {
        self.collections.load_criteria()
    }

    pub fn list_criteria_for_category(&self, category_id: CategoryId) -> Vec<Criterion> {
        self.list_criteria()
            .into_iter()
            .filter(|criterion| criterion.category_id == category_id)
            .collect()
    }

    pub fn get_criterion(&self, id: CriterionId) -> Option<Criterion> {
        self.list_criteria().into_iter().find(|c| c.id == id)
    }

    /// Creates a criterion under an existing category.
    ///
    /// The new criterion has no weight row yet; callers follow up with
    /// `set_criterion_weight` for the active profession.
    pub fn add_criterion(&self, category_id: CategoryId, name: &str) -> StoreResult<Criterion> {
        if self.get_category(category_id).is_none() {
            return Err(StoreError::NotFound {
                kind: EntityKind::Category,
                id: category_id,
            });
        }
        let mut criteria = self.collections.load_criteria();
        let existing_max = criteria.iter().map(|c| c.id).max();
        let id = allocate_id(&self.collections, IdCounter::Criterion, existing_max)?;
        let criterion = Criterion {
            id,
            category_id,
            name: name.trim().to_string(),
            created_at: now_epoch_ms(),
        };
        criteria.push(criterion.clone());
        persist(self.collections.save_criteria(&criteria), CRITERIA_KEY)?;
        info!(
            "event=criterion_add module=repo status=ok criterion_id={id} category_id={category_id}"
        );
        Ok(criterion)
    }

    /// Renames a criterion for every profession. Weight and type are untouched.
    pub fn update_criterion(&self, id: CriterionId, name: &str) -> StoreResult<Option<Criterion>> {
        let mut criteria = self.collections.load_criteria();
        let Some(criterion) = criteria.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        criterion.name = name.trim().to_string();
        let updated = criterion.clone();
        persist(self.collections.save_criteria(&criteria), CRITERIA_KEY)?;
        Ok(Some(updated))
    }

    /// Deletes a criterion and its weight rows for every profession.
    pub fn delete_criterion(&self, id: CriterionId) -> StoreResult<()> {
        let mut criteria = self.collections.load_criteria();
        let Some(index) = criteria.iter().position(|c| c.id == id) else {
            return Err(StoreError::NotFound {
                kind: EntityKind::Criterion,
                id,
            });
        };

        let previous_weights = self.collections.load_weights();
        let mut weights = previous_weights.clone();
        let before = weights.len();
        weights.retain(|row| row.criterion_id != id);
        let removed_weights = weights.len() != before;
        if removed_weights {
            persist(self.collections.save_weights(&weights), CRITERION_WEIGHTS_KEY)?;
        }

        criteria.remove(index);
        if let Err(err) = persist(self.collections.save_criteria(&criteria), CRITERIA_KEY) {
            if removed_weights {
                self.restore_weights(&previous_weights, "criterion_delete");
            }
            return Err(err);
        }
        info!(
            "event=criterion_delete module=repo status=ok criterion_id={id} removed_weights={}",
            before - weights.len()
        );
        Ok(())
    }

    /// Puts back the weight rows saved before a multi-key mutation whose
    /// second write failed.
    fn restore_weights(&self, previous: &[CriterionWeight], event: &str) {
        if self.collections.save_weights(previous) {
            warn!("event={event} module=repo status=error rollback=weights_restored");
        } else {
            error!("event={event} module=repo status=error rollback=weights_restore_failed");
        }
    }

    // ---- weights -----------------------------------------------------------

    pub fn list_weights_for_profession(&self, profession_id: ProfessionId) -> Vec<CriterionWeight> {
        self.collections
            .load_weights()
            .into_iter()
            .filter(|row| row.profession_id == profession_id)
            .collect()
    }

    pub fn get_criterion_weight(
        &self,
        profession_id: ProfessionId,
        criterion_id: CriterionId,
    ) -> Option<CriterionWeight> {
        self.collections
            .load_weights()
            .into_iter()
            .find(|row| row.profession_id == profession_id && row.criterion_id == criterion_id)
    }

    /// Upserts the weight row of one `(profession, criterion)` pair.
    ///
    /// `kind = None` keeps the existing type, or `Neutral` for a new row.
    /// Rows of other professions are never touched.
    pub fn set_criterion_weight(
        &self,
        profession_id: ProfessionId,
        category_id: CategoryId,
        criterion_id: CriterionId,
        weight: u32,
        kind: Option<CriterionType>,
    ) -> StoreResult<CriterionWeight> {
        if self.get_profession(profession_id).is_none() {
            return Err(StoreError::NotFound {
                kind: EntityKind::Profession,
                id: profession_id,
            });
        }
        if self.get_criterion(criterion_id).is_none() {
            return Err(StoreError::NotFound {
                kind: EntityKind::Criterion,
                id: criterion_id,
            });
        }

        let mut weights = self.collections.load_weights();
        let row = match weights
            .iter_mut()
            .find(|row| row.profession_id == profession_id && row.criterion_id == criterion_id)
        {
            Some(row) => {
                row.category_id = category_id;
                row.weight = weight;
                if let Some(kind) = kind {
                    row.kind = kind;
                }
                row.clone()
            }
            None => {
                let row = CriterionWeight {
                    profession_id,
                    category_id,
                    criterion_id,
                    weight,
                    kind: kind.unwrap_or_default(),
                };
                weights.push(row.clone());
                row
            }
        };
        persist(self.collections.save_weights(&weights), CRITERION_WEIGHTS_KEY)?;
        Ok(row)
    }

    // ---- join --------------------------------------------------------------

    /// Join view for one profession.
    pub fn get_categories_for_profession(
        &self,
        profession_id: ProfessionId,
    ) -> Vec<CategoryForProfession> {
        self.get_categories_for_professions(&[profession_id])
            .remove(&profession_id)
            .unwrap_or_default()
    }

    /// Join views for many professions from one read of each collection.
    pub fn get_categories_for_professions(
        &self,
        profession_ids: &[ProfessionId],
    ) -> BTreeMap<ProfessionId, Vec<CategoryForProfession>> {
        let categories = self.collections.load_categories();
        let criteria = self.collections.load_criteria();
        let weights = self.collections.load_weights();
        join_categories(&categories, &criteria, &weights, profession_ids)
    }
}

/// Builds per-profession views with one pass over criteria and weights.
///
/// Each category carries only the criteria that have a weight row for the
/// profession, in criterion collection order.
fn join_categories(
    categories: &[Category],
    criteria: &[Criterion],
    weights: &[CriterionWeight],
    profession_ids: &[ProfessionId],
) -> BTreeMap<ProfessionId, Vec<CategoryForProfession>> {
    let mut criteria_by_category: HashMap<CategoryId, Vec<&Criterion>> = HashMap::new();
    for criterion in criteria {
        criteria_by_category
            .entry(criterion.category_id)
            .or_default()
            .push(criterion);
    }

    let mut rows_by_profession: HashMap<ProfessionId, HashMap<CriterionId, &CriterionWeight>> =
        profession_ids.iter().map(|id| (*id, HashMap::new())).collect();
    for row in weights {
        if let Some(rows) = rows_by_profession.get_mut(&row.profession_id) {
            rows.insert(row.criterion_id, row);
        }
    }

    rows_by_profession
        .into_iter()
        .map(|(profession_id, rows)| {
            let views = categories
                .iter()
                .map(|category| CategoryForProfession {
                    id: category.id,
                    name: category.name.clone(),
                    color: category.color.clone(),
                    criteria: criteria_by_category
                        .get(&category.id)
                        .map(|owned| {
                            owned
                                .iter()
                                .filter_map(|criterion| {
                                    rows.get(&criterion.id).map(|row| CriterionView {
                                        id: criterion.id,
                                        name: criterion.name.clone(),
                                        weight: row.weight,
                                        kind: row.kind,
                                    })
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                })
                .collect();
            (profession_id, views)
        })
        .collect()
}

/// Reserves the next id for `counter`, never below `existing_max + 1`.
///
/// The counter is persisted before the caller writes the entity, so a
/// failed entity write burns the id instead of risking reuse.
pub(crate) fn allocate_id<S: KeyValueStore>(
    collections: &CollectionStore<S>,
    counter: IdCounter,
    existing_max: Option<u64>,
) -> StoreResult<u64> {
    let floor = existing_max.map_or(1, |max| max + 1);
    let id = collections.load_next_id(counter).max(floor);
    persist(collections.save_next_id(counter, id + 1), counter.key())?;
    Ok(id)
}

pub(crate) fn persist(saved: bool, key: &'static str) -> StoreResult<()> {
    if saved {
        Ok(())
    } else {
        Err(StoreError::PersistFailed { key })
    }
}

fn trimmed_non_empty(name: &str, kind: EntityKind) -> StoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyName(kind));
    }
    Ok(trimmed.to_string())
}
