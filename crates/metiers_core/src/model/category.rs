//! Category ("professional interest") record.
//!
//! Categories are shared by every profession. The persisted form carries
//! identifying fields only; criteria live in their own collection.

use serde::{Deserialize, Serialize};

/// Store-scoped category identifier.
pub type CategoryId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    #[serde(alias = "nom")]
    pub name: String,
    /// Palette color, unique among categories.
    pub color: String,
    #[serde(default)]
    pub created_at: i64,
}

/// Partial update for a category. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}
