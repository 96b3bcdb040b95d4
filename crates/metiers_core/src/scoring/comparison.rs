//! Comparison metrics aggregator.
//!
//! Side-by-side statistics per profession. `global_score` is the plain
//! weight total, a deliberately simpler figure than the recommendation
//! engine's `total_score`.

use crate::db::KeyValueStore;
use crate::model::category::CategoryId;
use crate::model::criterion::{CriterionId, CriterionType};
use crate::model::profession::ProfessionId;
use crate::model::view::CategoryForProfession;
use crate::repo::taxonomy_store::TaxonomyStore;
use serde::Serialize;

/// Length of the top-N rankings.
pub const TOP_N: usize = 3;

/// Weight sum per criterion type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDistribution {
    pub advantage: u32,
    pub small_advantage: u32,
    pub neutral: u32,
    pub small_disadvantage: u32,
    pub disadvantage: u32,
}

impl TypeDistribution {
    pub fn add(&mut self, kind: CriterionType, weight: u32) {
        *self.slot_mut(kind) += weight;
    }

    pub fn get(&self, kind: CriterionType) -> u32 {
        match kind {
            CriterionType::Advantage => self.advantage,
            CriterionType::SmallAdvantage => self.small_advantage,
            CriterionType::Neutral => self.neutral,
            CriterionType::SmallDisadvantage => self.small_disadvantage,
            CriterionType::Disadvantage => self.disadvantage,
        }
    }

    fn slot_mut(&mut self, kind: CriterionType) -> &mut u32 {
        match kind {
            CriterionType::Advantage => &mut self.advantage,
            CriterionType::SmallAdvantage => &mut self.small_advantage,
            CriterionType::Neutral => &mut self.neutral,
            CriterionType::SmallDisadvantage => &mut self.small_disadvantage,
            CriterionType::Disadvantage => &mut self.disadvantage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category_id: CategoryId,
    pub name: String,
    pub color: String,
    pub total_weight: u32,
    pub criteria_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionRank {
    pub criterion_id: CriterionId,
    pub name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub weight: u32,
    #[serde(rename = "type")]
    pub kind: CriterionType,
}

/// Aggregate statistics for one profession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionMetrics {
    pub profession_id: ProfessionId,
    pub total_weight: u32,
    pub total_criteria_count: usize,
    /// Categories holding at least one criterion.
    pub categories_count: usize,
    pub type_distribution: TypeDistribution,
    pub top_categories: Vec<CategoryTotal>,
    pub top_criteria: Vec<CriterionRank>,
    /// Equal to `total_weight`.
    pub global_score: u32,
}

/// Computes metrics from one profession's join view.
pub fn compute_metrics(
    profession_id: ProfessionId,
    categories: &[CategoryForProfession],
) -> ProfessionMetrics {
    let populated = categories
        .iter()
        .filter(|category| !category.criteria.is_empty())
        .collect::<Vec<_>>();

    let mut type_distribution = TypeDistribution::default();
    let mut category_totals = Vec::with_capacity(populated.len());
    let mut criteria = Vec::new();
    for category in &populated {
        for criterion in &category.criteria {
            type_distribution.add(criterion.kind, criterion.weight);
            criteria.push(CriterionRank {
                criterion_id: criterion.id,
                name: criterion.name.clone(),
                category_id: category.id,
                category_name: category.name.clone(),
                weight: criterion.weight,
                kind: criterion.kind,
            });
        }
        category_totals.push(CategoryTotal {
            category_id: category.id,
            name: category.name.clone(),
            color: category.color.clone(),
            total_weight: category.total_weight(),
            criteria_count: category.criteria.len(),
        });
    }

    let total_weight = category_totals.iter().map(|c| c.total_weight).sum();
    let total_criteria_count = criteria.len();
    let categories_count = category_totals.len();

    // `sort_by` is stable: equal weights keep collection order.
    category_totals.sort_by(|a, b| b.total_weight.cmp(&a.total_weight));
    category_totals.truncate(TOP_N);
    criteria.sort_by(|a, b| b.weight.cmp(&a.weight));
    criteria.truncate(TOP_N);

    ProfessionMetrics {
        profession_id,
        total_weight,
        total_criteria_count,
        categories_count,
        type_distribution,
        top_categories: category_totals,
        top_criteria: criteria,
        global_score: total_weight,
    }
}

/// Metrics for one profession.
pub fn profession_metrics<S: KeyValueStore>(
    store: &TaxonomyStore<S>,
    profession_id: ProfessionId,
) -> ProfessionMetrics {
    compute_metrics(
        profession_id,
        &store.get_categories_for_profession(profession_id),
    )
}

/// Metrics for many professions from a single batched join, in input order.
pub fn compare_professions<S: KeyValueStore>(
    store: &TaxonomyStore<S>,
    profession_ids: &[ProfessionId],
) -> Vec<ProfessionMetrics> {
    let views = store.get_categories_for_professions(profession_ids);
    profession_ids
        .iter()
        .map(|id| compute_metrics(*id, views.get(id).map_or(&[][..], Vec::as_slice)))
        .collect()
}
