//! Nutrition calculation module
//!
//! Ingredient scaling, meal totals, unit limits and legacy ingredient parsing.

pub mod error;
pub mod legacy;
pub mod resolver;
pub mod units;

pub use error::{CappedAdjustment, CappedField, ResolveError, ResolveResult, Resolved};
pub use legacy::{parse_legacy_ingredient, FoodCategory, LegacyIngredient, MealDefaults};
pub use resolver::{IngredientQuantityResolver, MealCeilings, MealNutritionTotals, NutritionLimits};
pub use units::{Unit, UnitCaps};
