//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Open the database, run storage initialization and delegate to core.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are reported in response envelopes, never thrown.

use log::warn;
use metiers_core::db::open_db;
use metiers_core::{
    compare_professions as compare_professions_inner, core_version as core_version_inner,
    init_logging as init_logging_inner, ping as ping_inner, recommend_for_professions,
    CategoryForProfession, ProfessionMetrics, RecommendationPreferences,
    SqliteKeyValueStore, StoreError, TaxonomyStore,
};
use std::path::PathBuf;
use std::sync::OnceLock;

const DB_FILE_NAME: &str = "metiers.sqlite3";
const DB_PATH_ENV: &str = "METIERS_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfessionItem {
    pub id: u64,
    pub name: String,
    pub created_at: i64,
}

/// Profession listing envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfessionListResponse {
    pub items: Vec<ProfessionItem>,
    /// Set when stored data has an unknown shape and should be reset.
    pub needs_reset: bool,
    pub message: String,
}

/// Generic mutation envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    /// Id of the created entity, when any.
    pub id: Option<u64>,
    /// Machine-checkable reason on store refusals (e.g. `CANNOT_DELETE_LAST_PROFESSION`).
    pub reason_code: Option<String>,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>, id: Option<u64>) -> Self {
        Self {
            ok: true,
            id,
            reason_code: None,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>, reason_code: Option<&str>) -> Self {
        Self {
            ok: false,
            id: None,
            reason_code: reason_code.map(str::to_string),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionItem {
    pub id: u64,
    pub name: String,
    pub weight: u32,
    /// `advantage|small_advantage|neutral|small_disadvantage|disadvantage`.
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryItem {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub total_weight: u32,
    pub criteria: Vec<CriterionItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryListResponse {
    pub items: Vec<CategoryItem>,
    pub message: String,
}

/// User-chosen 1..=5 priority for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPriority {
    pub category_id: u64,
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfessionScoreItem {
    pub profession_id: u64,
    pub total_score: f64,
}

/// Recommendation envelope; `recommended_profession_id` is `None` on failure
/// or empty input.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationResponse {
    pub ok: bool,
    pub recommended_profession_id: Option<u64>,
    pub recommended_score: f64,
    pub confidence_percent: f64,
    pub confidence_label: String,
    /// Best first.
    pub scores: Vec<ProfessionScoreItem>,
    pub points: Vec<String>,
    pub warnings: Vec<String>,
    pub message: String,
}

impl RecommendationResponse {
    fn empty(ok: bool, message: impl Into<String>) -> Self {
        Self {
            ok,
            recommended_profession_id: None,
            recommended_score: 0.0,
            confidence_percent: 0.0,
            confidence_label: String::new(),
            scores: Vec::new(),
            points: Vec::new(),
            warnings: Vec::new(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonItem {
    pub profession_id: u64,
    pub global_score: u32,
    pub total_criteria_count: u32,
    pub categories_count: u32,
    pub advantage_weight: u32,
    pub small_advantage_weight: u32,
    pub neutral_weight: u32,
    pub small_disadvantage_weight: u32,
    pub disadvantage_weight: u32,
    pub top_category_ids: Vec<u64>,
    pub top_criterion_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonResponse {
    pub items: Vec<ComparisonItem>,
    pub message: String,
}

/// Lists professions after running storage initialization.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn list_professions() -> ProfessionListResponse {
    match with_store(|store, needs_reset| Ok((store.list_professions(), needs_reset))) {
        Ok((professions, needs_reset)) => ProfessionListResponse {
            message: format!("{} profession(s).", professions.len()),
            items: professions
                .into_iter()
                .map(|p| ProfessionItem {
                    id: p.id,
                    name: p.name,
                    created_at: p.created_at,
                })
                .collect(),
            needs_reset,
        },
        Err(err) => ProfessionListResponse {
            items: Vec::new(),
            needs_reset: false,
            message: format!("list_professions failed: {err}"),
        },
    }
}

/// Creates a profession seeded from the most recent one.
#[flutter_rust_bridge::frb(sync)]
pub fn add_profession(name: String) -> ActionResponse {
    match with_store(|store, _| store.add_profession(&name).map_err(FfiError::Store)) {
        Ok(profession) => ActionResponse::success("Profession created.", Some(profession.id)),
        Err(err) => err.into_action("add_profession"),
    }
}

/// Deletes a profession and its weight rows.
///
/// Refusing to delete the last profession is reported through `reason_code`.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_profession(profession_id: u64) -> ActionResponse {
    match with_store(|store, _| {
        store
            .delete_profession(profession_id)
            .map_err(FfiError::Store)
    }) {
        Ok(()) => ActionResponse::success("Profession deleted.", None),
        Err(err) => err.into_action("delete_profession"),
    }
}

/// Categories with the profession's criteria, weights and types.
#[flutter_rust_bridge::frb(sync)]
pub fn categories_for_profession(profession_id: u64) -> CategoryListResponse {
    match with_store(|store, _| Ok(store.get_categories_for_profession(profession_id))) {
        Ok(views) => CategoryListResponse {
            message: format!("{} category(ies).", views.len()),
            items: views.into_iter().map(to_category_item).collect(),
        },
        Err(err) => CategoryListResponse {
            items: Vec::new(),
            message: format!("categories_for_profession failed: {err}"),
        },
    }
}

/// Ranks the given professions.
///
/// `advantage_weight`/`disadvantage_weight` are echoed preferences; categories
/// missing from `priorities` use the default priority.
#[flutter_rust_bridge::frb(sync)]
pub fn recommend(
    profession_ids: Vec<u64>,
    advantage_weight: f64,
    disadvantage_weight: f64,
    priorities: Vec<CategoryPriority>,
) -> RecommendationResponse {
    let preferences = RecommendationPreferences {
        advantage_weight,
        disadvantage_weight,
        priority_categories: priorities
            .into_iter()
            .map(|entry| (entry.category_id, entry.priority))
            .collect(),
    };
    let result = with_store(|store, _| {
        Ok(recommend_for_professions(
            store,
            &profession_ids,
            &preferences,
        ))
    });
    match result {
        Ok(Some(recommendation)) => RecommendationResponse {
            ok: true,
            recommended_profession_id: Some(recommendation.recommended_profession_id),
            recommended_score: recommendation.recommended_score,
            confidence_percent: recommendation.confidence.percent,
            confidence_label: recommendation.confidence.label().to_string(),
            scores: recommendation
                .all_scores
                .iter()
                .map(|score| ProfessionScoreItem {
                    profession_id: score.profession_id,
                    total_score: score.total_score,
                })
                .collect(),
            points: recommendation.explanation.points,
            warnings: recommendation.explanation.warnings,
            message: "Recommendation computed.".to_string(),
        },
        Ok(None) => RecommendationResponse::empty(false, "No profession selected."),
        Err(err) => RecommendationResponse::empty(false, format!("recommend failed: {err}")),
    }
}

/// Side-by-side metrics, in request order.
#[flutter_rust_bridge::frb(sync)]
pub fn compare_professions(profession_ids: Vec<u64>) -> ComparisonResponse {
    match with_store(|store, _| Ok(compare_professions_inner(store, &profession_ids))) {
        Ok(metrics) => ComparisonResponse {
            message: format!("Compared {} profession(s).", metrics.len()),
            items: metrics.into_iter().map(to_comparison_item).collect(),
        },
        Err(err) => ComparisonResponse {
            items: Vec::new(),
            message: format!("compare_professions failed: {err}"),
        },
    }
}

enum FfiError {
    Setup(String),
    Store(StoreError),
}

impl std::fmt::Display for FfiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Setup(message) => write!(f, "{message}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl FfiError {
    fn into_action(self, operation: &str) -> ActionResponse {
        let reason_code = match &self {
            Self::Store(err) => Some(err.reason_code()),
            Self::Setup(_) => None,
        };
        ActionResponse::failure(format!("{operation} failed: {self}"), reason_code)
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            default_db_path()
        })
        .clone()
}

#[cfg(not(test))]
fn default_db_path() -> PathBuf {
    std::env::temp_dir().join(DB_FILE_NAME)
}

#[cfg(test)]
fn default_db_path() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos());
    std::env::temp_dir().join(format!("{}-{nanos}-{DB_FILE_NAME}", std::process::id()))
}

/// Opens the database, initializes storage and runs `f` against the store.
///
/// `f` also receives whether the stored data needs a reset.
fn with_store<T>(
    f: impl FnOnce(&TaxonomyStore<SqliteKeyValueStore<'_>>, bool) -> Result<T, FfiError>,
) -> Result<T, FfiError> {
    let db_path = resolve_db_path();
    let conn =
        open_db(&db_path).map_err(|err| FfiError::Setup(format!("DB open failed: {err}")))?;
    let store = TaxonomyStore::new(SqliteKeyValueStore::new(&conn));
    let outcome = store.initialize().map_err(FfiError::Store)?;
    if outcome.needs_reset() {
        warn!("event=ffi_store module=ffi status=skip reason=needs_reset");
    }
    f(&store, outcome.needs_reset())
}

fn to_category_item(view: CategoryForProfession) -> CategoryItem {
    CategoryItem {
        id: view.id,
        total_weight: view.total_weight(),
        name: view.name,
        color: view.color,
        criteria: view
            .criteria
            .into_iter()
            .map(|criterion| CriterionItem {
                id: criterion.id,
                name: criterion.name,
                weight: criterion.weight,
                kind: criterion.kind.as_str().to_string(),
            })
            .collect(),
    }
}

fn to_comparison_item(metrics: ProfessionMetrics) -> ComparisonItem {
    let distribution = metrics.type_distribution;
    ComparisonItem {
        profession_id: metrics.profession_id,
        global_score: metrics.global_score,
        total_criteria_count: count_u32(metrics.total_criteria_count),
        categories_count: count_u32(metrics.categories_count),
        advantage_weight: distribution.advantage,
        small_advantage_weight: distribution.small_advantage,
        neutral_weight: distribution.neutral,
        small_disadvantage_weight: distribution.small_disadvantage,
        disadvantage_weight: distribution.disadvantage,
        top_category_ids: metrics
            .top_categories
            .iter()
            .map(|category| category.category_id)
            .collect(),
        top_criterion_ids: metrics
            .top_criteria
            .iter()
            .map(|criterion| criterion.criterion_id)
            .collect(),
    }
}

fn count_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{
        add_profession, categories_for_profession, compare_professions, core_version,
        delete_profession, init_logging, list_professions, ping, recommend, resolve_db_path,
        CategoryPriority,
    };
    use metiers_core::db::open_db;
    use metiers_core::{CriterionType, SqliteKeyValueStore, TaxonomyStore};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn recommend_without_selection_is_not_ok() {
        let response = recommend(Vec::new(), 0.5, 0.5, Vec::new());
        assert!(!response.ok);
        assert!(response.recommended_profession_id.is_none());
    }

    #[test]
    fn profession_flow_round_trips_through_the_database() {
        let first = add_profession("Infirmier".to_string());
        assert!(first.ok, "{}", first.message);
        let first_id = first.id.expect("created profession should return id");

        // Seed taxonomy through core on the same database file.
        let conn = open_db(resolve_db_path()).expect("open db");
        let store = TaxonomyStore::new(SqliteKeyValueStore::new(&conn));
        let category = store
            .add_category("Ambiance", "#e6194b")
            .expect("add category");
        let criterion = store
            .add_criterion(category.id, "Équipe")
            .expect("add criterion");
        store
            .set_criterion_weight(
                first_id,
                category.id,
                criterion.id,
                20,
                Some(CriterionType::Advantage),
            )
            .expect("set weight");
        drop(store);
        drop(conn);

        let second = add_profession("Architecte".to_string());
        assert!(second.ok, "{}", second.message);
        let second_id = second.id.expect("created profession should return id");

        let listed = list_professions();
        assert!(listed.items.iter().any(|item| item.id == first_id));
        assert!(listed.items.iter().any(|item| item.id == second_id));
        assert!(!listed.needs_reset);

        let categories = categories_for_profession(second_id);
        let cloned = categories
            .items
            .iter()
            .find(|item| item.id == category.id)
            .expect("category should be listed");
        assert_eq!(cloned.total_weight, 20);
        assert_eq!(cloned.criteria[0].kind, "advantage");

        let response = recommend(
            vec![first_id, second_id],
            0.5,
            0.5,
            vec![CategoryPriority {
                category_id: category.id,
                priority: 5,
            }],
        );
        assert!(response.ok, "{}", response.message);
        assert_eq!(response.scores.len(), 2);
        assert_eq!(response.recommended_profession_id, Some(first_id));

        let comparison = compare_professions(vec![second_id, first_id]);
        assert_eq!(comparison.items[0].profession_id, second_id);
        assert_eq!(comparison.items[0].advantage_weight, 20);

        let deleted = delete_profession(second_id);
        assert!(deleted.ok, "{}", deleted.message);
        let missing = delete_profession(second_id);
        assert!(!missing.ok);
        assert_eq!(missing.reason_code.as_deref(), Some("NOT_FOUND"));
    }
}
