//! Criterion ("key motivation") records and per-profession weights.
//!
//! # Invariants
//! - A criterion belongs to exactly one category for its whole life.
//! - At most one `CriterionWeight` exists per `(profession_id, criterion_id)`.
//! - Deserialized weight rows missing `weight`/`type` resolve to
//!   `DEFAULT_WEIGHT` / `CriterionType::Neutral`.

use crate::config::DEFAULT_WEIGHT;
use crate::model::category::CategoryId;
use crate::model::profession::ProfessionId;
use serde::{Deserialize, Serialize};

/// Store-scoped criterion identifier.
pub type CriterionId = u64;

/// Advantage/disadvantage classification of a criterion for one profession.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionType {
    Advantage,
    SmallAdvantage,
    #[default]
    Neutral,
    SmallDisadvantage,
    Disadvantage,
}

impl CriterionType {
    /// All variants, from most to least favorable.
    pub const ALL: [CriterionType; 5] = [
        Self::Advantage,
        Self::SmallAdvantage,
        Self::Neutral,
        Self::SmallDisadvantage,
        Self::Disadvantage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Advantage => "advantage",
            Self::SmallAdvantage => "small_advantage",
            Self::Neutral => "neutral",
            Self::SmallDisadvantage => "small_disadvantage",
            Self::Disadvantage => "disadvantage",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value.trim())
    }

    pub fn is_advantage_like(self) -> bool {
        matches!(self, Self::Advantage | Self::SmallAdvantage)
    }

    pub fn is_disadvantage_like(self) -> bool {
        matches!(self, Self::SmallDisadvantage | Self::Disadvantage)
    }
}

/// Shared criterion identity. Weight and type live in `CriterionWeight`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: CriterionId,
    pub category_id: CategoryId,
    #[serde(alias = "nom")]
    pub name: String,
    #[serde(default)]
    pub created_at: i64,
}

/// The per-profession overlay for one criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionWeight {
    pub profession_id: ProfessionId,
    pub category_id: CategoryId,
    pub criterion_id: CriterionId,
    #[serde(default = "default_weight", alias = "poids")]
    pub weight: u32,
    #[serde(rename = "type", default)]
    pub kind: CriterionType,
}

fn default_weight() -> u32 {
    DEFAULT_WEIGHT
}
