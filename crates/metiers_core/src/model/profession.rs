//! Profession record.

use serde::{Deserialize, Serialize};

/// Store-scoped profession identifier.
pub type ProfessionId = u64;

/// One of the roles being compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profession {
    pub id: ProfessionId,
    pub name: String,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
}

/// Partial update for a profession. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfessionPatch {
    pub name: Option<String>,
}
