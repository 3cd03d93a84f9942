//! Resolver error and adjustment types

use serde::Serialize;
use thiserror::Error;

/// Errors that reject a resolver operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// Caller supplied a non-positive quantity or the food reference is malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// A computation would have produced NaN or Infinity
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Which value a ceiling was applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CappedField {
    Quantity,
    Calories,
    Protein,
    Carbs,
    Fats,
}

impl CappedField {
    pub fn label(&self) -> &'static str {
        match self {
            CappedField::Quantity => "quantity",
            CappedField::Calories => "calories",
            CappedField::Protein => "protein",
            CappedField::Carbs => "carbs",
            CappedField::Fats => "fats",
        }
    }
}

/// A value that was silently reduced to its ceiling
///
/// Not an error: the operation still succeeds with the clamped value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CappedAdjustment {
    pub field: CappedField,
    pub requested: f64,
    pub applied: f64,
    /// Unit tag for quantity caps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl CappedAdjustment {
    /// Short user-facing notice
    pub fn message(&self) -> String {
        match (&self.field, &self.unit) {
            (CappedField::Quantity, Some(unit)) => format!(
                "Quantity reduced from {} {} to the maximum of {} {}",
                self.requested, unit, self.applied, unit
            ),
            (field, _) => format!(
                "Meal {} total {} exceeds the limit and was capped at {}",
                field.label(),
                self.requested,
                self.applied
            ),
        }
    }
}

/// A resolver result paired with any ceilings that were applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved<T> {
    pub value: T,
    pub adjustments: Vec<CappedAdjustment>,
}

impl<T> Resolved<T> {
    pub fn was_capped(&self) -> bool {
        !self.adjustments.is_empty()
    }
}
