//! Pure validation rules applied before taxonomy mutations.
//!
//! # Responsibility
//! - Check field validity and cardinality limits without touching storage.
//! - Produce user-facing messages the UI displays verbatim.
//!
//! # Invariants
//! - No function here has side effects.
//! - The store does not re-validate; callers mutating the store call these
//!   first.

use crate::config::{TaxonomyLimits, CATEGORY_PALETTE};
use crate::model::category::{Category, CategoryId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation failure. `Display` renders the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName,
    WeightNotNumeric(String),
    WeightOutOfRange { min: u32, max: u32 },
    TooManyCategories { max: usize },
    TooManyCriteria { max: usize },
    ColorInUse(String),
    ColorNotInPalette(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Le nom ne peut pas être vide."),
            Self::WeightNotNumeric(raw) => {
                write!(f, "Le poids « {raw} » n'est pas un nombre valide.")
            }
            Self::WeightOutOfRange { min, max } => {
                write!(f, "Le poids doit être compris entre {min} et {max}.")
            }
            Self::TooManyCategories { max } => write!(
                f,
                "Nombre maximum d'intérêts professionnels atteint ({max})."
            ),
            Self::TooManyCriteria { max } => write!(
                f,
                "Nombre maximum de motivations clés atteint pour cet intérêt ({max})."
            ),
            Self::ColorInUse(color) => write!(
                f,
                "La couleur {color} est déjà utilisée par un autre intérêt professionnel."
            ),
            Self::ColorNotInPalette(color) => {
                write!(f, "La couleur {color} ne fait pas partie de la palette.")
            }
        }
    }
}

impl Error for ValidationError {}

/// Checks that a category, criterion or profession name is non-blank.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

/// Checks that an already numeric weight lies in the configured range.
pub fn validate_weight(weight: i64, limits: &TaxonomyLimits) -> Result<u32, ValidationError> {
    let out_of_range = ValidationError::WeightOutOfRange {
        min: limits.min_weight,
        max: limits.max_weight,
    };
    let weight = u32::try_from(weight).map_err(|_| out_of_range.clone())?;
    if weight < limits.min_weight || weight > limits.max_weight {
        return Err(out_of_range);
    }
    Ok(weight)
}

/// Coerces raw user input into a weight and range-checks it.
///
/// Accepts integers and integral decimals (`"12"`, `" 12 "`, `"12.0"`).
pub fn validate_weight_input(raw: &str, limits: &TaxonomyLimits) -> Result<u32, ValidationError> {
    let trimmed = raw.trim();
    let not_numeric = || ValidationError::WeightNotNumeric(trimmed.to_string());

    let value = match trimmed.parse::<i64>() {
        Ok(value) => value,
        Err(_) => {
            let decimal = trimmed.parse::<f64>().map_err(|_| not_numeric())?;
            if !decimal.is_finite() || decimal.fract() != 0.0 {
                return Err(not_numeric());
            }
            decimal as i64
        }
    };
    validate_weight(value, limits)
}

/// Checks that one more category fits under the cap.
pub fn validate_category_count(
    current_count: usize,
    limits: &TaxonomyLimits,
) -> Result<(), ValidationError> {
    if current_count >= limits.max_categories {
        return Err(ValidationError::TooManyCategories {
            max: limits.max_categories,
        });
    }
    Ok(())
}

/// Checks that one more criterion fits in a category.
pub fn validate_criteria_count(
    current_count: usize,
    limits: &TaxonomyLimits,
) -> Result<(), ValidationError> {
    if current_count >= limits.max_criteria_per_category {
        return Err(ValidationError::TooManyCriteria {
            max: limits.max_criteria_per_category,
        });
    }
    Ok(())
}

/// Returns whether a category other than `exclude_id` already uses `color`.
///
/// Comparison is case-insensitive so `#E6194B` and `#e6194b` collide.
pub fn is_color_in_use(
    color: &str,
    categories: &[Category],
    exclude_id: Option<CategoryId>,
) -> bool {
    let color = color.trim();
    categories
        .iter()
        .filter(|category| Some(category.id) != exclude_id)
        .any(|category| category.color.eq_ignore_ascii_case(color))
}

/// `is_color_in_use` as a validation rule.
pub fn validate_color_available(
    color: &str,
    categories: &[Category],
    exclude_id: Option<CategoryId>,
) -> Result<(), ValidationError> {
    if is_color_in_use(color, categories, exclude_id) {
        return Err(ValidationError::ColorInUse(color.trim().to_string()));
    }
    Ok(())
}

/// Checks that a color belongs to the fixed category palette.
pub fn validate_color_in_palette(color: &str) -> Result<(), ValidationError> {
    let color = color.trim();
    if CATEGORY_PALETTE
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(color))
    {
        return Ok(());
    }
    Err(ValidationError::ColorNotInPalette(color.to_string()))
}
