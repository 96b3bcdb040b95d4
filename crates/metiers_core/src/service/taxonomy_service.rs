//! Taxonomy mutation orchestration.
//!
//! # Responsibility
//! - Run `validation` rules before every store mutation.
//! - Track the active profession and scope weight edits to it.
//! - Seed the active profession's weight row whenever a criterion is added.
//!
//! # Invariants
//! - A criterion created here always has a weight row for the active
//!   profession; if seeding fails the criterion is removed again.
//! - The active profession, when set, exists in the store.
//! - Categories and criteria are only created while a profession exists.

use crate::config::{CATEGORY_PALETTE, DEFAULT_WEIGHT};
use crate::db::KeyValueStore;
use crate::model::category::{Category, CategoryId, CategoryPatch};
use crate::model::criterion::{Criterion, CriterionId, CriterionType, CriterionWeight};
use crate::model::profession::{Profession, ProfessionId, ProfessionPatch};
use crate::model::view::CategoryForProfession;
use crate::repo::taxonomy_store::{EntityKind, StoreError, TaxonomyStore};
use crate::validation::{
    is_color_in_use, validate_category_count, validate_color_available,
    validate_color_in_palette, validate_criteria_count, validate_name, validate_weight,
    validate_weight_input, ValidationError,
};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, TaxonomyServiceError>;

/// Errors from taxonomy orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyServiceError {
    /// Input rejected before reaching the store; message is user-facing.
    Validation(ValidationError),
    /// No profession is active (empty store).
    NoActiveProfession,
    /// Target entity does not exist.
    NotFound { kind: EntityKind, id: u64 },
    /// Every palette color is taken.
    PaletteExhausted,
    /// Store-level failure.
    Store(StoreError),
}

impl TaxonomyServiceError {
    /// Machine-checkable reason when the store produced one.
    pub fn reason_code(&self) -> Option<&'static str> {
        match self {
            Self::Store(err) => Some(err.reason_code()),
            Self::NotFound { .. } => Some("NOT_FOUND"),
            _ => None,
        }
    }
}

impl Display for TaxonomyServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NoActiveProfession => write!(f, "no active profession"),
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
            Self::PaletteExhausted => write!(f, "every palette color is already in use"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaxonomyServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for TaxonomyServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for TaxonomyServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::Store(other),
        }
    }
}

/// Validated mutation entry points over a `TaxonomyStore`.
pub struct TaxonomyService<S: KeyValueStore> {
    store: TaxonomyStore<S>,
    active_profession: Option<ProfessionId>,
}

impl<S: KeyValueStore> TaxonomyService<S> {
    /// Wraps an initialized store; the first profession becomes active.
    pub fn new(store: TaxonomyStore<S>) -> Self {
        let active_profession = store.list_professions().first().map(|p| p.id);
        Self {
            store,
            active_profession,
        }
    }

    pub fn store(&self) -> &TaxonomyStore<S> {
        &self.store
    }

    pub fn active_profession(&self) -> Option<ProfessionId> {
        self.active_profession
    }

    pub fn set_active_profession(&mut self, id: ProfessionId) -> ServiceResult<()> {
        if self.store.get_profession(id).is_none() {
            return Err(not_found(EntityKind::Profession, id));
        }
        self.active_profession = Some(id);
        Ok(())
    }

    // ---- professions -------------------------------------------------------

    /// Creates a profession (seeded from the latest one) and activates it.
    pub fn add_profession(&mut self, name: &str) -> ServiceResult<Profession> {
        validate_name(name)?;
        let profession = self.store.add_profession(name)?;
        self.active_profession = Some(profession.id);
        Ok(profession)
    }

    pub fn rename_profession(&self, id: ProfessionId, name: &str) -> ServiceResult<Profession> {
        validate_name(name)?;
        let patch = ProfessionPatch {
            name: Some(name.to_string()),
        };
        self.store
            .update_profession(id, &patch)?
            .ok_or(not_found(EntityKind::Profession, id))
    }

    /// Deletes a profession; the active one falls back to the first remaining.
    pub fn delete_profession(&mut self, id: ProfessionId) -> ServiceResult<()> {
        self.store.delete_profession(id)?;
        if self.active_profession == Some(id) {
            self.active_profession = self.store.list_professions().first().map(|p| p.id);
        }
        Ok(())
    }

    // ---- categories --------------------------------------------------------

    /// Creates a category; taxonomy data requires an existing profession.
    pub fn add_category(&self, name: &str, color: &str) -> ServiceResult<Category> {
        validate_name(name)?;
        self.require_active_profession()?;
        let categories = self.store.list_categories();
        validate_category_count(categories.len(), self.store.limits())?;
        validate_color_in_palette(color)?;
        validate_color_available(color, &categories, None)?;
        Ok(self.store.add_category(name, color)?)
    }

    /// First palette color no category uses yet.
    pub fn next_available_color(&self) -> Option<&'static str> {
        let categories = self.store.list_categories();
        CATEGORY_PALETTE
            .iter()
            .copied()
            .find(|color| !is_color_in_use(color, &categories, None))
    }

    pub fn add_category_with_next_color(&self, name: &str) -> ServiceResult<Category> {
        validate_name(name)?;
        self.require_active_profession()?;
        validate_category_count(self.store.list_categories().len(), self.store.limits())?;
        let color = self
            .next_available_color()
            .ok_or(TaxonomyServiceError::PaletteExhausted)?;
        self.add_category(name, color)
    }

    pub fn update_category(
        &self,
        id: CategoryId,
        name: Option<&str>,
        color: Option<&str>,
    ) -> ServiceResult<Category> {
        if let Some(name) = name {
            validate_name(name)?;
        }
        if let Some(color) = color {
            validate_color_in_palette(color)?;
            validate_color_available(color, &self.store.list_categories(), Some(id))?;
        }
        let patch = CategoryPatch {
            name: name.map(str::to_string),
            color: color.map(str::to_string),
        };
        self.store
            .update_category(id, &patch)?
            .ok_or(not_found(EntityKind::Category, id))
    }

    /// Deletes a category; fails while it still owns criteria.
    pub fn delete_category(&self, id: CategoryId) -> ServiceResult<()> {
        Ok(self.store.delete_category(id)?)
    }

    // ---- criteria ----------------------------------------------------------

    /// Adds a criterion and its weight row for the active profession.
    pub fn add_criterion(
        &self,
        category_id: CategoryId,
        name: &str,
        weight: u32,
        kind: CriterionType,
    ) -> ServiceResult<(Criterion, CriterionWeight)> {
        validate_name(name)?;
        let weight = validate_weight(i64::from(weight), self.store.limits())?;
        let profession_id = self.require_active_profession()?;
        validate_criteria_count(
            self.store.list_criteria_for_category(category_id).len(),
            self.store.limits(),
        )?;

        let criterion = self.store.add_criterion(category_id, name)?;
        match self.store.set_criterion_weight(
            profession_id,
            category_id,
            criterion.id,
            weight,
            Some(kind),
        ) {
            Ok(row) => Ok((criterion, row)),
            Err(err) => {
                error!(
                    "event=criterion_add module=service status=error criterion_id={} error_code={}",
                    criterion.id,
                    err.reason_code()
                );
                if let Err(rollback) = self.store.delete_criterion(criterion.id) {
                    error!(
                        "event=criterion_rollback module=service status=error criterion_id={} error_code={}",
                        criterion.id,
                        rollback.reason_code()
                    );
                }
                Err(err.into())
            }
        }
    }

    pub fn rename_criterion(&self, id: CriterionId, name: &str) -> ServiceResult<Criterion> {
        validate_name(name)?;
        self.store
            .update_criterion(id, name)?
            .ok_or(not_found(EntityKind::Criterion, id))
    }

    /// Sets weight (raw user input) and optionally type for the active profession.
    pub fn set_criterion_weight(
        &self,
        criterion_id: CriterionId,
        raw_weight: &str,
        kind: Option<CriterionType>,
    ) -> ServiceResult<CriterionWeight> {
        let weight = validate_weight_input(raw_weight, self.store.limits())?;
        let profession_id = self.require_active_profession()?;
        let criterion = self
            .store
            .get_criterion(criterion_id)
            .ok_or(not_found(EntityKind::Criterion, criterion_id))?;
        let row = self.store.set_criterion_weight(
            profession_id,
            criterion.category_id,
            criterion_id,
            weight,
            kind,
        )?;
        info!(
            "event=criterion_weight_set module=service status=ok profession_id={profession_id} criterion_id={criterion_id}"
        );
        Ok(row)
    }

    /// Changes only the type for the active profession, keeping its weight.
    pub fn set_criterion_type(
        &self,
        criterion_id: CriterionId,
        kind: CriterionType,
    ) -> ServiceResult<CriterionWeight> {
        let profession_id = self.require_active_profession()?;
        let criterion = self
            .store
            .get_criterion(criterion_id)
            .ok_or(not_found(EntityKind::Criterion, criterion_id))?;
        let weight = self
            .store
            .get_criterion_weight(profession_id, criterion_id)
            .map_or(DEFAULT_WEIGHT, |row| row.weight);
        Ok(self.store.set_criterion_weight(
            profession_id,
            criterion.category_id,
            criterion_id,
            weight,
            Some(kind),
        )?)
    }

    pub fn delete_criterion(&self, id: CriterionId) -> ServiceResult<()> {
        Ok(self.store.delete_criterion(id)?)
    }

    /// Join view for the active profession.
    pub fn categories_for_active_profession(&self) -> ServiceResult<Vec<CategoryForProfession>> {
        let profession_id = self.require_active_profession()?;
        Ok(self.store.get_categories_for_profession(profession_id))
    }

    fn require_active_profession(&self) -> ServiceResult<ProfessionId> {
        self.active_profession
            .ok_or(TaxonomyServiceError::NoActiveProfession)
    }
}

fn not_found(kind: EntityKind, id: u64) -> TaxonomyServiceError {
    TaxonomyServiceError::NotFound { kind, id }
}
