//! Derived per-profession join view.
//!
//! This is the only shape the comparison aggregator and the recommendation
//! engine consume.

use crate::model::category::CategoryId;
use crate::model::criterion::{CriterionId, CriterionType};
use serde::{Deserialize, Serialize};

/// One criterion with weight/type resolved for a single profession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionView {
    pub id: CriterionId,
    pub name: String,
    pub weight: u32,
    #[serde(rename = "type")]
    pub kind: CriterionType,
}

/// One category with the criteria visible to a single profession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryForProfession {
    pub id: CategoryId,
    pub name: String,
    pub color: String,
    pub criteria: Vec<CriterionView>,
}

impl CategoryForProfession {
    /// Sum of the resolved weights of this category's criteria.
    pub fn total_weight(&self) -> u32 {
        category_total_weight(self)
    }
}

/// Sum of the resolved weights of one category's criteria.
pub fn category_total_weight(category: &CategoryForProfession) -> u32 {
    category.criteria.iter().map(|criterion| criterion.weight).sum()
}
