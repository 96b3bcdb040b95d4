//! Recommendation engine: weighted multi-factor score per profession plus
//! a confidence metric on the winner's margin.
//!
//! # Algorithm
//! For every category with at least one criterion:
//! 1. `total_weight` = sum of the profession's resolved weights.
//! 2. Type multiplier from the share of `total_weight`, first match wins:
//!    advantage-like >= 50% -> 1.5, disadvantage-like >= 50% -> 0.5, else 1.0.
//! 3. Priority multiplier from `priority_categories` (default 3):
//!    5 -> 2.0, 4 -> 1.5, 3 -> 1.0, 2 -> 0.5, 1 -> 0.2.
//! 4. `score = total_weight * type_multiplier * priority_multiplier`.
//!
//! A profession's `total_score` is the unrounded sum of its category scores.
//!
//! # Invariants
//! - Categories without criteria never appear in `category_scores`.
//! - Ranking ties keep input order.
//! - Only the two best scores influence confidence.

use crate::db::KeyValueStore;
use crate::model::category::CategoryId;
use crate::model::profession::ProfessionId;
use crate::model::view::CategoryForProfession;
use crate::repo::taxonomy_store::TaxonomyStore;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Priority used for categories missing from `priority_categories`.
pub const DEFAULT_PRIORITY: u8 = 3;
/// Confidence (percent) under which a warning is attached.
pub const RELIABLE_CONFIDENCE_THRESHOLD: f64 = 40.0;
const TOP_CONTRIBUTORS: usize = 3;

/// User preferences for one recommendation run.
///
/// `advantage_weight`/`disadvantage_weight` are carried through to the
/// result unchanged; the scoring formula does not read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendationPreferences {
    pub advantage_weight: f64,
    pub disadvantage_weight: f64,
    pub priority_categories: BTreeMap<CategoryId, u8>,
}

impl Default for RecommendationPreferences {
    fn default() -> Self {
        Self {
            advantage_weight: 0.5,
            disadvantage_weight: 0.5,
            priority_categories: BTreeMap::new(),
        }
    }
}

impl RecommendationPreferences {
    pub fn priority_for(&self, category_id: CategoryId) -> u8 {
        self.priority_categories
            .get(&category_id)
            .copied()
            .unwrap_or(DEFAULT_PRIORITY)
    }
}

/// Score breakdown of one category for one profession.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category_id: CategoryId,
    pub name: String,
    pub color: String,
    pub total_weight: u32,
    pub advantage_weight: u32,
    pub disadvantage_weight: u32,
    pub neutral_weight: u32,
    pub type_multiplier: f64,
    pub priority: u8,
    pub priority_multiplier: f64,
    pub score: f64,
}

/// Aggregate score of one profession.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionScore {
    pub profession_id: ProfessionId,
    pub total_score: f64,
    pub category_scores: Vec<CategoryScore>,
}

/// Confidence tiers, from most to least decisive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryReliable,
    Reliable,
    Moderate,
    Low,
    Unreliable,
}

impl ConfidenceLevel {
    /// User-facing label.
    pub fn label(self) -> &'static str {
        match self {
            Self::VeryReliable => "Très fiable",
            Self::Reliable => "Fiable",
            Self::Moderate => "Moyennement fiable",
            Self::Low => "Peu fiable",
            Self::Unreliable => "Non fiable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confidence {
    /// 0..=100.
    pub percent: f64,
    pub level: ConfidenceLevel,
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        self.level.label()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Explanation {
    pub points: Vec<String>,
    pub warnings: Vec<String>,
}

/// Ranked outcome of a recommendation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub recommended_profession_id: ProfessionId,
    pub recommended_score: f64,
    pub confidence: Confidence,
    /// Every profession, best first.
    pub all_scores: Vec<ProfessionScore>,
    pub explanation: Explanation,
    pub preferences: RecommendationPreferences,
}

/// Multiplier from the advantage/disadvantage shares of `total`.
pub fn type_multiplier(advantage: u32, disadvantage: u32, total: u32) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let total = u64::from(total);
    if u64::from(advantage) * 2 >= total {
        1.5
    } else if u64::from(disadvantage) * 2 >= total {
        0.5
    } else {
        1.0
    }
}

/// Multiplier for a 1..=5 priority; anything else counts as the default.
pub fn priority_multiplier(priority: u8) -> f64 {
    match priority {
        5 => 2.0,
        4 => 1.5,
        2 => 0.5,
        1 => 0.2,
        _ => 1.0,
    }
}

/// Scores one category; `None` when it has no criteria.
pub fn score_category(
    category: &CategoryForProfession,
    preferences: &RecommendationPreferences,
) -> Option<CategoryScore> {
    if category.criteria.is_empty() {
        return None;
    }

    let (mut advantage, mut disadvantage, mut neutral) = (0u32, 0u32, 0u32);
    for criterion in &category.criteria {
        if criterion.kind.is_advantage_like() {
            advantage += criterion.weight;
        } else if criterion.kind.is_disadvantage_like() {
            disadvantage += criterion.weight;
        } else {
            neutral += criterion.weight;
        }
    }
    let total_weight = advantage + disadvantage + neutral;
    let type_multiplier = type_multiplier(advantage, disadvantage, total_weight);
    let priority = preferences.priority_for(category.id);
    let priority_multiplier = priority_multiplier(priority);

    Some(CategoryScore {
        category_id: category.id,
        name: category.name.clone(),
        color: category.color.clone(),
        total_weight,
        advantage_weight: advantage,
        disadvantage_weight: disadvantage,
        neutral_weight: neutral,
        type_multiplier,
        priority,
        priority_multiplier,
        score: f64::from(total_weight) * type_multiplier * priority_multiplier,
    })
}

pub fn score_profession(
    profession_id: ProfessionId,
    categories: &[CategoryForProfession],
    preferences: &RecommendationPreferences,
) -> ProfessionScore {
    let category_scores = categories
        .iter()
        .filter_map(|category| score_category(category, preferences))
        .collect::<Vec<_>>();
    // `f64::sum` over nothing yields -0.0.
    let total_score = category_scores
        .iter()
        .fold(0.0, |total, score| total + score.score);
    ProfessionScore {
        profession_id,
        total_score,
        category_scores,
    }
}

/// Confidence from the margin between the two best scores.
pub fn compute_confidence(scores: &[f64]) -> Confidence {
    if scores.len() < 2 {
        return Confidence {
            percent: 100.0,
            level: ConfidenceLevel::VeryReliable,
        };
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let (max, second) = (sorted[0], sorted[1]);
    if max <= 0.0 {
        return Confidence {
            percent: 0.0,
            level: ConfidenceLevel::Unreliable,
        };
    }

    let percent = (max - second) / max * 100.0;
    let level = if percent >= 80.0 {
        ConfidenceLevel::VeryReliable
    } else if percent >= 60.0 {
        ConfidenceLevel::Reliable
    } else if percent >= RELIABLE_CONFIDENCE_THRESHOLD {
        ConfidenceLevel::Moderate
    } else {
        ConfidenceLevel::Low
    };
    Confidence { percent, level }
}

/// Ranks professions from their join views.
///
/// Returns `None` for an empty input without computing anything.
pub fn recommend(
    inputs: &[(ProfessionId, &[CategoryForProfession])],
    preferences: &RecommendationPreferences,
) -> Option<Recommendation> {
    if inputs.is_empty() {
        return None;
    }

    let mut all_scores = inputs
        .iter()
        .map(|(profession_id, categories)| score_profession(*profession_id, categories, preferences))
        .collect::<Vec<_>>();
    // Stable: equal scores keep input order.
    all_scores.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));

    let totals = all_scores.iter().map(|s| s.total_score).collect::<Vec<_>>();
    let confidence = compute_confidence(&totals);
    let winner = &all_scores[0];
    let explanation = explain(winner, all_scores.get(1), &confidence);

    debug!(
        "event=recommendation module=scoring status=ok candidates={} winner={} confidence={:.1}",
        all_scores.len(),
        winner.profession_id,
        confidence.percent
    );

    Some(Recommendation {
        recommended_profession_id: winner.profession_id,
        recommended_score: winner.total_score,
        confidence,
        explanation,
        preferences: preferences.clone(),
        all_scores,
    })
}

/// Loads every requested join view in one batched read, then ranks.
pub fn recommend_for_professions<S: KeyValueStore>(
    store: &TaxonomyStore<S>,
    profession_ids: &[ProfessionId],
    preferences: &RecommendationPreferences,
) -> Option<Recommendation> {
    if profession_ids.is_empty() {
        return None;
    }
    let views = store.get_categories_for_professions(profession_ids);
    let inputs = profession_ids
        .iter()
        .map(|id| (*id, views.get(id).map_or(&[][..], Vec::as_slice)))
        .collect::<Vec<_>>();
    recommend(&inputs, preferences)
}

fn explain(
    winner: &ProfessionScore,
    runner_up: Option<&ProfessionScore>,
    confidence: &Confidence,
) -> Explanation {
    let mut contributors = winner.category_scores.iter().collect::<Vec<_>>();
    contributors.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut points = contributors
        .into_iter()
        .take(TOP_CONTRIBUTORS)
        .map(|category| format!("{} : {:.1} points", category.name, category.score))
        .collect::<Vec<_>>();

    if runner_up.is_some() && winner.total_score > 0.0 && confidence.percent > 0.0 {
        points.push(format!(
            "Score supérieur de {:.0} % à celui du deuxième métier.",
            confidence.percent
        ));
    }

    let mut warnings = Vec::new();
    if confidence.percent < RELIABLE_CONFIDENCE_THRESHOLD {
        warnings.push(
            "Les scores sont proches : la recommandation est peu fiable, affinez vos critères."
                .to_string(),
        );
    }

    Explanation { points, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::criterion::CriterionType;
    use crate::model::view::CriterionView;

    fn category(id: CategoryId, criteria: &[(u32, CriterionType)]) -> CategoryForProfession {
        CategoryForProfession {
            id,
            name: format!("Intérêt {id}"),
            color: "#e6194b".to_string(),
            criteria: criteria
                .iter()
                .enumerate()
                .map(|(index, (weight, kind))| CriterionView {
                    id: index as u64 + 1,
                    name: format!("m{index}"),
                    weight: *weight,
                    kind: *kind,
                })
                .collect(),
        }
    }

    #[test]
    fn advantage_majority_scores_one_and_a_half() {
        let cat = category(
            1,
            &[
                (60, CriterionType::Advantage),
                (30, CriterionType::SmallAdvantage),
                (10, CriterionType::Disadvantage),
            ],
        );
        let score = score_category(&cat, &RecommendationPreferences::default())
            .expect("category has criteria");
        assert_eq!(score.total_weight, 100);
        assert_eq!(score.type_multiplier, 1.5);
        assert_eq!(score.score, 150.0);
    }

    #[test]
    fn advantage_share_wins_over_disadvantage_at_exact_half() {
        assert_eq!(type_multiplier(50, 50, 100), 1.5);
        assert_eq!(type_multiplier(20, 50, 100), 0.5);
        assert_eq!(type_multiplier(20, 30, 100), 1.0);
        assert_eq!(type_multiplier(0, 0, 0), 1.0);
    }

    #[test]
    fn priority_scales_category_score() {
        let cat = category(7, &[(50, CriterionType::Advantage)]);
        let mut preferences = RecommendationPreferences::default();

        preferences.priority_categories.insert(7, 5);
        let high = score_category(&cat, &preferences).expect("scored");
        assert_eq!(high.score, 150.0);

        preferences.priority_categories.insert(7, 1);
        let low = score_category(&cat, &preferences).expect("scored");
        assert!((low.score - 15.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_priority_counts_as_default() {
        assert_eq!(priority_multiplier(0), 1.0);
        assert_eq!(priority_multiplier(9), 1.0);
        assert_eq!(priority_multiplier(DEFAULT_PRIORITY), 1.0);
    }

    #[test]
    fn empty_categories_are_left_out_of_scores() {
        let categories = vec![
            category(1, &[]),
            category(2, &[(10, CriterionType::Neutral)]),
        ];
        let score = score_profession(3, &categories, &RecommendationPreferences::default());
        assert_eq!(score.category_scores.len(), 1);
        assert_eq!(score.category_scores[0].category_id, 2);
        assert_eq!(score.total_score, 10.0);
    }

    #[test]
    fn confidence_boundaries() {
        let single = compute_confidence(&[42.0]);
        assert_eq!(single.percent, 100.0);
        assert_eq!(single.label(), "Très fiable");

        let decisive = compute_confidence(&[100.0, 20.0]);
        assert!((decisive.percent - 80.0).abs() < 1e-9);
        assert_eq!(decisive.level, ConfidenceLevel::VeryReliable);

        let tied = compute_confidence(&[100.0, 100.0]);
        assert_eq!(tied.percent, 0.0);
        assert_eq!(tied.level, ConfidenceLevel::Low);

        let zero = compute_confidence(&[0.0, 0.0]);
        assert_eq!(zero.percent, 0.0);
        assert_eq!(zero.level, ConfidenceLevel::Unreliable);
        assert!(!zero.percent.is_nan());
    }

    #[test]
    fn confidence_ignores_third_place() {
        let a = compute_confidence(&[100.0, 50.0, 0.0]);
        let b = compute_confidence(&[100.0, 50.0, 49.0]);
        assert_eq!(a, b);
        assert_eq!(a.level, ConfidenceLevel::Moderate);
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(recommend(&[], &RecommendationPreferences::default()).is_none());
    }

    #[test]
    fn ties_keep_input_order_and_warn() {
        let same = vec![category(1, &[(10, CriterionType::Neutral)])];
        let inputs = [(8, same.as_slice()), (4, same.as_slice())];
        let result = recommend(&inputs, &RecommendationPreferences::default()).expect("ranked");
        assert_eq!(result.recommended_profession_id, 8);
        assert_eq!(result.all_scores[1].profession_id, 4);
        assert_eq!(result.explanation.warnings.len(), 1);
        assert_eq!(result.explanation.points.len(), 1);
    }

    #[test]
    fn explanation_names_top_three_and_margin() {
        let winner = vec![
            category(1, &[(5, CriterionType::Neutral)]),
            category(2, &[(30, CriterionType::Advantage)]),
            category(3, &[(20, CriterionType::Neutral)]),
            category(4, &[(10, CriterionType::Neutral)]),
        ];
        let loser = vec![category(1, &[(5, CriterionType::Disadvantage)])];
        let mut preferences = RecommendationPreferences::default();
        preferences.advantage_weight = 0.7;
        preferences.disadvantage_weight = 0.3;
        let inputs = [(2, loser.as_slice()), (1, winner.as_slice())];

        let result = recommend(&inputs, &preferences).expect("ranked");
        assert_eq!(result.recommended_profession_id, 1);
        assert_eq!(result.recommended_score, 80.0);
        assert_eq!(result.preferences, preferences);
        assert_eq!(result.explanation.points.len(), 4);
        assert!(result.explanation.points[0].starts_with("Intérêt 2"));
        assert!(result.explanation.points[3].contains('%'));
        assert!(result.explanation.warnings.is_empty());
    }

    #[test]
    fn empty_profession_scores_positive_zero() {
        let empty: Vec<CategoryForProfession> = vec![category(1, &[])];
        let result = recommend(&[(1, empty.as_slice())], &RecommendationPreferences::default())
            .expect("ranked");
        assert_eq!(result.recommended_score, 0.0);
        assert!(result.recommended_score.is_sign_positive());
        let json = serde_json::to_string(&result.all_scores[0]).expect("serialize score");
        assert!(json.contains("\"totalScore\":0.0"), "{json}");
    }
}
