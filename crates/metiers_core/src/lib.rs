//! Core domain logic for the profession comparison app.
//! This crate is the single source of truth for taxonomy invariants and
//! the recommendation/comparison scoring built on top of them.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod scoring;
pub mod service;
pub mod validation;

pub use config::TaxonomyLimits;
pub use db::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{Category, CategoryId, CategoryPatch};
pub use model::criterion::{Criterion, CriterionId, CriterionType, CriterionWeight};
pub use model::profession::{Profession, ProfessionId, ProfessionPatch};
pub use model::view::{category_total_weight, CategoryForProfession, CriterionView};
pub use repo::collections::{is_current_data_version, DataVersionStatus};
pub use repo::legacy::LegacyMigrationOutcome;
pub use repo::taxonomy_store::{EntityKind, InitOutcome, StoreError, StoreResult, TaxonomyStore};
pub use scoring::comparison::{
    compare_professions, compute_metrics, profession_metrics, ProfessionMetrics,
    TypeDistribution,
};
pub use scoring::recommendation::{
    compute_confidence, recommend, recommend_for_professions, Confidence, ConfidenceLevel,
    Recommendation, RecommendationPreferences,
};
pub use service::taxonomy_service::{ServiceResult, TaxonomyService, TaxonomyServiceError};
pub use validation::ValidationError;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
