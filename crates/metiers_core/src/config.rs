//! Compile-time configuration for the taxonomy and scoring core.
//!
//! # Responsibility
//! - Own every tunable constant shared by validation, storage and scoring.
//! - Provide `TaxonomyLimits` so callers can pass limits explicitly.
//!
//! # Invariants
//! - `CATEGORY_PALETTE` has exactly `MAX_CATEGORIES` distinct entries, so the
//!   color-uniqueness rule caps the category count on its own.
//! - `MIN_WEIGHT <= DEFAULT_WEIGHT <= MAX_WEIGHT`.

/// Lowest accepted criterion weight.
pub const MIN_WEIGHT: u32 = 1;
/// Highest accepted criterion weight.
pub const MAX_WEIGHT: u32 = 30;
/// Weight used when a weight row or its value is missing.
pub const DEFAULT_WEIGHT: u32 = 15;

/// Maximum number of professions compared side by side.
pub const MAX_PROFESSIONS: usize = 5;
/// Maximum number of categories (professional interests).
pub const MAX_CATEGORIES: usize = 10;
/// Maximum number of criteria (key motivations) inside one category.
pub const MAX_CRITERIA_PER_CATEGORY: usize = 110;

/// Fixed category color palette.
pub const CATEGORY_PALETTE: [&str; MAX_CATEGORIES] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6", "#bcf60c",
    "#008080", "#9a6324",
];

/// Shape version of the persisted collections.
///
/// Bump when the JSON layout of any collection changes.
pub const CURRENT_DATA_VERSION: u32 = 2;

/// Version marker written by the single-profession schema, if any.
pub const LEGACY_DATA_VERSION: u32 = 1;

/// Name given to the profession synthesized by the legacy migration.
pub const DEFAULT_PROFESSION_NAME: &str = "Mon métier";

/// Cardinality limits applied before store mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxonomyLimits {
    pub max_professions: usize,
    pub max_categories: usize,
    pub max_criteria_per_category: usize,
    pub min_weight: u32,
    pub max_weight: u32,
}

impl Default for TaxonomyLimits {
    fn default() -> Self {
        Self {
            max_professions: MAX_PROFESSIONS,
            max_categories: MAX_CATEGORIES,
            max_criteria_per_category: MAX_CRITERIA_PER_CATEGORY,
            min_weight: MIN_WEIGHT,
            max_weight: MAX_WEIGHT,
        }
    }
}
