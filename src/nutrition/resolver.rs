//! Ingredient quantity resolver
//!
//! Turns a (food item, quantity, unit) triple into a bounded ingredient and an
//! ingredient list into bounded meal totals.

use serde::{Deserialize, Serialize};

use super::error::{CappedAdjustment, CappedField, ResolveError, ResolveResult, Resolved};
use super::units::{Unit, UnitCaps};
use crate::models::{round1, FoodItem, Macros, ReferenceSnapshot, StructuredIngredient};

/// Per-meal ceilings applied to summed totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealCeilings {
    pub calories: f64,
    pub protein: f64, // grams
    pub carbs: f64,   // grams
    pub fats: f64,    // grams
}

impl Default for MealCeilings {
    fn default() -> Self {
        Self {
            calories: 3000.0,
            protein: 250.0,
            carbs: 300.0,
            fats: 150.0,
        }
    }
}

/// All limits the resolver enforces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionLimits {
    pub unit_caps: UnitCaps,
    pub meal_ceilings: MealCeilings,
}

impl NutritionLimits {
    /// Check that every limit is a positive, finite number
    pub fn validate(&self) -> Result<(), String> {
        let ceilings = [
            ("meal_ceilings.calories", self.meal_ceilings.calories),
            ("meal_ceilings.protein", self.meal_ceilings.protein),
            ("meal_ceilings.carbs", self.meal_ceilings.carbs),
            ("meal_ceilings.fats", self.meal_ceilings.fats),
        ];
        let caps = self.unit_caps.entries();

        for (name, value) in ceilings.iter().chain(caps.iter()) {
            if !value.is_finite() || *value <= 0.0 {
                return Err(format!("{} must be a positive number, got {}", name, value));
            }
        }
        Ok(())
    }
}

/// Derived totals for one meal
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MealNutritionTotals {
    #[serde(flatten)]
    pub macros: Macros,
}

/// Stateless resolver holding only its limits; safe to share across threads
#[derive(Debug, Clone, Default)]
pub struct IngredientQuantityResolver {
    limits: NutritionLimits,
}

impl IngredientQuantityResolver {
    pub fn new(limits: NutritionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &NutritionLimits {
        &self.limits
    }

    /// Maximum allowed quantity for a unit
    pub fn max_quantity(&self, unit: &Unit) -> f64 {
        self.limits.unit_caps.max_quantity(unit)
    }

    /// Scale a catalog food item to the requested quantity
    ///
    /// Quantities above the unit's cap are clamped and reported; the macros
    /// are then derived from the clamped quantity.
    pub fn scale_food_item(
        &self,
        food: &FoodItem,
        requested_quantity: f64,
        requested_unit: &Unit,
    ) -> ResolveResult<Resolved<StructuredIngredient>> {
        if !requested_quantity.is_finite() {
            return Err(ResolveError::Arithmetic(format!(
                "requested quantity is not a finite number: {}",
                requested_quantity
            )));
        }
        if requested_quantity <= 0.0 {
            return Err(ResolveError::Validation(format!(
                "quantity must be greater than 0, got {}",
                requested_quantity
            )));
        }
        validate_reference(food)?;

        let cap = self.max_quantity(requested_unit);
        let mut adjustments = Vec::new();
        let quantity = if requested_quantity > cap {
            tracing::warn!(
                food_item_id = food.id,
                unit = %requested_unit,
                requested = requested_quantity,
                cap,
                "Ingredient quantity exceeds unit maximum, clamping"
            );
            adjustments.push(CappedAdjustment {
                field: CappedField::Quantity,
                requested: requested_quantity,
                applied: cap,
                unit: Some(requested_unit.to_string()),
            });
            cap
        } else {
            requested_quantity
        };

        let macros = scaled_macros(food, quantity)?;

        let ingredient = StructuredIngredient {
            name: food.name.clone(),
            quantity,
            unit: requested_unit.clone(),
            macros,
            food_item_id: Some(food.id),
            reference: ReferenceSnapshot { quantity, macros },
        };

        Ok(Resolved { value: ingredient, adjustments })
    }

    /// Sum an ingredient list into clamped meal totals
    ///
    /// Summation is order independent up to floating point tolerance; rounding
    /// happens once, after the sum.
    pub fn compute_meal_totals(
        &self,
        ingredients: &[StructuredIngredient],
    ) -> ResolveResult<Resolved<MealNutritionTotals>> {
        let sum: Macros = ingredients.iter().map(|i| i.macros).sum();
        if !sum.is_finite() {
            return Err(ResolveError::Arithmetic(
                "ingredient totals are not finite numbers".to_string(),
            ));
        }

        let rounded = sum.rounded().non_negative();
        let ceilings = &self.limits.meal_ceilings;
        let mut adjustments = Vec::new();

        let mut clamp = |field: CappedField, value: f64, ceiling: f64| -> f64 {
            if value > ceiling {
                adjustments.push(CappedAdjustment {
                    field,
                    requested: value,
                    applied: ceiling,
                    unit: None,
                });
                ceiling
            } else {
                value
            }
        };

        let macros = Macros {
            calories: clamp(CappedField::Calories, rounded.calories, ceilings.calories),
            protein: clamp(CappedField::Protein, rounded.protein, ceilings.protein),
            carbs: clamp(CappedField::Carbs, rounded.carbs, ceilings.carbs),
            fats: clamp(CappedField::Fats, rounded.fats, ceilings.fats),
        };

        for adjustment in &adjustments {
            tracing::warn!(
                field = adjustment.field.label(),
                requested = adjustment.requested,
                applied = adjustment.applied,
                "Meal total exceeds ceiling, capping"
            );
        }

        Ok(Resolved {
            value: MealNutritionTotals { macros },
            adjustments,
        })
    }
}

/// Reject reference data that cannot be scaled safely
fn validate_reference(food: &FoodItem) -> ResolveResult<()> {
    if !food.base_quantity.is_finite() || food.base_quantity <= 0.0 {
        return Err(ResolveError::Validation(format!(
            "food item {} has invalid base quantity {}",
            food.id, food.base_quantity
        )));
    }
    if !food.macros.is_finite() || food.macros.has_negative() {
        return Err(ResolveError::Validation(format!(
            "food item {} has invalid macro values",
            food.id
        )));
    }
    Ok(())
}

fn scaled_macros(food: &FoodItem, quantity: f64) -> ResolveResult<Macros> {
    let scale_factor = quantity / food.base_quantity;
    if !scale_factor.is_finite() {
        return Err(ResolveError::Arithmetic(format!(
            "scale factor for food item {} is not finite",
            food.id
        )));
    }

    let raw = food.macros.scale(scale_factor);
    let macros = Macros {
        calories: raw.calories.round(),
        protein: round1(raw.protein),
        carbs: round1(raw.carbs),
        fats: round1(raw.fats),
    }
    .non_negative();

    if !macros.is_finite() {
        return Err(ResolveError::Arithmetic(format!(
            "scaled macros for food item {} overflowed",
            food.id
        )));
    }
    Ok(macros)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 0.01;

    fn chicken_breast() -> FoodItem {
        FoodItem::reference(
            1,
            "Chicken breast",
            100.0,
            Unit::Gram,
            Macros::new(165.0, 31.0, 0.0, 3.6),
        )
    }

    fn ingredient(calories: f64, protein: f64, carbs: f64, fats: f64) -> StructuredIngredient {
        StructuredIngredient::manual("test", 1.0, Unit::Serving, Macros::new(calories, protein, carbs, fats))
    }

    #[test]
    fn test_scale_chicken_breast_150g() {
        let resolver = IngredientQuantityResolver::default();
        let result = resolver.scale_food_item(&chicken_breast(), 150.0, &Unit::Gram).unwrap();

        assert!(!result.was_capped());
        let ing = result.value;
        assert_eq!(ing.quantity, 150.0);
        assert_eq!(ing.unit, Unit::Gram);
        assert_eq!(ing.macros.calories, 248.0);
        assert!((ing.macros.protein - 46.5).abs() < EPS);
        assert_eq!(ing.macros.carbs, 0.0);
        assert!((ing.macros.fats - 5.4).abs() < EPS);
        assert_eq!(ing.food_item_id, Some(1));
        assert_eq!(ing.name, "Chicken breast");
        assert_eq!(ing.reference.quantity, 150.0);
        assert_eq!(ing.reference.macros, ing.macros);
    }

    #[test]
    fn test_scale_clamps_to_unit_cap() {
        let resolver = IngredientQuantityResolver::default();
        let result = resolver.scale_food_item(&chicken_breast(), 5000.0, &Unit::Gram).unwrap();

        assert_eq!(result.adjustments.len(), 1);
        let adj = &result.adjustments[0];
        assert_eq!(adj.field, CappedField::Quantity);
        assert_eq!(adj.requested, 5000.0);
        assert_eq!(adj.applied, 2000.0);
        assert_eq!(adj.unit.as_deref(), Some("g"));

        let ing = &result.value;
        assert_eq!(ing.quantity, 2000.0);
        assert_eq!(ing.macros.calories, 3300.0);
        assert!((ing.macros.protein - 620.0).abs() < EPS);
        assert_eq!(ing.reference.quantity, 2000.0);

        let totals = resolver.compute_meal_totals(std::slice::from_ref(ing)).unwrap();
        assert_eq!(totals.value.macros.calories, 3000.0);
        assert_eq!(totals.value.macros.protein, 250.0);
    }

    #[test]
    fn test_capping_is_idempotent() {
        let resolver = IngredientQuantityResolver::default();
        let food = chicken_breast();
        for unit in Unit::KNOWN.iter() {
            let cap = resolver.max_quantity(unit);
            let over = resolver.scale_food_item(&food, cap * 3.0, unit).unwrap();
            assert_eq!(over.value.quantity, cap);

            let at_cap = resolver.scale_food_item(&food, cap, unit).unwrap();
            assert!(!at_cap.was_capped());
            assert_eq!(at_cap.value, over.value);
        }
    }

    #[test]
    fn test_linear_scaling() {
        let resolver = IngredientQuantityResolver::default();
        let food = FoodItem::reference(7, "Oats", 40.0, Unit::Gram, Macros::new(150.0, 5.0, 27.0, 3.0));
        for q in [1.0, 12.5, 40.0, 80.0, 333.3, 2000.0] {
            let ing = resolver.scale_food_item(&food, q, &Unit::Gram).unwrap().value;
            assert_eq!(ing.macros.calories, (150.0 * q / 40.0_f64).round());
            assert!((ing.macros.protein - round1(5.0 * q / 40.0)).abs() < EPS);
            assert!((ing.macros.carbs - round1(27.0 * q / 40.0)).abs() < EPS);
            assert!((ing.macros.fats - round1(3.0 * q / 40.0)).abs() < EPS);
        }
    }

    #[test]
    fn test_unknown_unit_uses_fallback_cap() {
        let resolver = IngredientQuantityResolver::default();
        let food = FoodItem::reference(3, "Protein powder", 1.0, Unit::Other("scoop".into()), Macros::new(120.0, 24.0, 3.0, 1.0));
        let result = resolver.scale_food_item(&food, 25.0, &Unit::Other("scoop".into())).unwrap();
        assert_eq!(result.value.quantity, 10.0);
        assert_eq!(result.value.macros.calories, 1200.0);
        assert!(result.was_capped());
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let resolver = IngredientQuantityResolver::default();
        let food = chicken_breast();
        assert!(matches!(
            resolver.scale_food_item(&food, 0.0, &Unit::Gram),
            Err(ResolveError::Validation(_))
        ));
        assert!(matches!(
            resolver.scale_food_item(&food, -5.0, &Unit::Gram),
            Err(ResolveError::Validation(_))
        ));
        assert!(matches!(
            resolver.scale_food_item(&food, f64::NAN, &Unit::Gram),
            Err(ResolveError::Arithmetic(_))
        ));
        assert!(matches!(
            resolver.scale_food_item(&food, f64::INFINITY, &Unit::Gram),
            Err(ResolveError::Arithmetic(_))
        ));
    }

    #[test]
    fn test_rejects_zero_base_quantity() {
        let resolver = IngredientQuantityResolver::default();
        let mut food = chicken_breast();
        food.base_quantity = 0.0;
        assert!(matches!(
            resolver.scale_food_item(&food, 100.0, &Unit::Gram),
            Err(ResolveError::Validation(_))
        ));

        let mut food = chicken_breast();
        food.macros.fats = -1.0;
        assert!(matches!(
            resolver.scale_food_item(&food, 100.0, &Unit::Gram),
            Err(ResolveError::Validation(_))
        ));
    }

    #[test]
    fn test_tiny_base_quantity_overflow_is_arithmetic_error() {
        let resolver = IngredientQuantityResolver::default();
        let food = FoodItem::reference(9, "Dense", f64::MIN_POSITIVE, Unit::Gram, Macros::new(f64::MAX, 1.0, 1.0, 1.0));
        assert!(matches!(
            resolver.scale_food_item(&food, 100.0, &Unit::Gram),
            Err(ResolveError::Arithmetic(_))
        ));
    }

    #[test]
    fn test_results_are_never_negative() {
        let resolver = IngredientQuantityResolver::default();
        let food = FoodItem::reference(4, "Water", 250.0, Unit::Milliliter, Macros::zero());
        let ing = resolver.scale_food_item(&food, 0.01, &Unit::Milliliter).unwrap().value;
        assert!(ing.macros.calories >= 0.0 && ing.macros.calories.is_sign_positive());
        assert!(ing.macros.protein >= 0.0);
        assert!(ing.macros.carbs >= 0.0);
        assert!(ing.macros.fats >= 0.0);
    }

    #[test]
    fn test_meal_totals_sum_and_round() {
        let resolver = IngredientQuantityResolver::default();
        let list = vec![
            ingredient(248.0, 46.5, 0.0, 5.4),
            ingredient(195.0, 4.5, 37.5, 1.5),
            ingredient(30.0, 2.0, 6.0, 0.0),
        ];
        let totals = resolver.compute_meal_totals(&list).unwrap();
        assert!(!totals.was_capped());
        assert_eq!(totals.value.macros.calories, 473.0);
        assert!((totals.value.macros.protein - 53.0).abs() < EPS);
        assert!((totals.value.macros.carbs - 43.5).abs() < EPS);
        assert!((totals.value.macros.fats - 6.9).abs() < EPS);
    }

    #[test]
    fn test_meal_totals_capped_calories() {
        let resolver = IngredientQuantityResolver::default();
        let list = vec![
            ingredient(1500.0, 50.0, 100.0, 40.0),
            ingredient(1200.0, 40.0, 80.0, 30.0),
            ingredient(800.0, 20.0, 60.0, 20.0),
        ];
        let totals = resolver.compute_meal_totals(&list).unwrap();
        assert_eq!(totals.value.macros.calories, 3000.0);
        assert_eq!(totals.value.macros.protein, 110.0);
        assert_eq!(totals.adjustments.len(), 1);
        assert_eq!(totals.adjustments[0].field, CappedField::Calories);
        assert_eq!(totals.adjustments[0].requested, 3500.0);
    }

    #[test]
    fn test_meal_totals_every_ceiling() {
        let resolver = IngredientQuantityResolver::default();
        let list = vec![ingredient(9000.0, 900.0, 900.0, 900.0)];
        let totals = resolver.compute_meal_totals(&list).unwrap();
        assert_eq!(totals.value.macros, Macros::new(3000.0, 250.0, 300.0, 150.0));
        assert_eq!(totals.adjustments.len(), 4);
    }

    #[test]
    fn test_meal_totals_order_independent() {
        let resolver = IngredientQuantityResolver::default();
        let list = vec![
            ingredient(101.0, 0.1, 10.3, 0.7),
            ingredient(55.0, 3.3, 0.2, 1.1),
            ingredient(12.0, 0.7, 2.9, 0.3),
            ingredient(480.0, 22.2, 61.4, 9.9),
        ];
        let forward = resolver.compute_meal_totals(&list).unwrap().value;

        let mut reversed = list.clone();
        reversed.reverse();
        let backward = resolver.compute_meal_totals(&reversed).unwrap().value;

        let mut rotated = list.clone();
        rotated.rotate_left(2);
        let rotated = resolver.compute_meal_totals(&rotated).unwrap().value;

        for other in [backward, rotated] {
            assert!((forward.macros.calories - other.macros.calories).abs() < EPS);
            assert!((forward.macros.protein - other.macros.protein).abs() < EPS);
            assert!((forward.macros.carbs - other.macros.carbs).abs() < EPS);
            assert!((forward.macros.fats - other.macros.fats).abs() < EPS);
        }
    }

    #[test]
    fn test_meal_totals_empty_and_non_finite() {
        let resolver = IngredientQuantityResolver::default();
        let empty = resolver.compute_meal_totals(&[]).unwrap();
        assert_eq!(empty.value.macros, Macros::zero());

        let bad = vec![ingredient(f64::NAN, 0.0, 0.0, 0.0)];
        assert!(matches!(
            resolver.compute_meal_totals(&bad),
            Err(ResolveError::Arithmetic(_))
        ));
    }

    #[test]
    fn test_custom_limits() {
        let mut limits = NutritionLimits::default();
        limits.unit_caps.g = 500.0;
        limits.meal_ceilings.calories = 600.0;
        let resolver = IngredientQuantityResolver::new(limits);

        let ing = resolver.scale_food_item(&chicken_breast(), 800.0, &Unit::Gram).unwrap().value;
        assert_eq!(ing.quantity, 500.0);
        let totals = resolver.compute_meal_totals(&[ing]).unwrap();
        assert_eq!(totals.value.macros.calories, 600.0);
    }

    #[test]
    fn test_resolver_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IngredientQuantityResolver>();
    }

    #[test]
    fn test_limits_validation() {
        assert!(NutritionLimits::default().validate().is_ok());

        let mut limits = NutritionLimits::default();
        limits.unit_caps.cup = 0.0;
        assert!(limits.validate().unwrap_err().contains("cup"));

        let mut limits = NutritionLimits::default();
        limits.meal_ceilings.fats = f64::NAN;
        assert!(limits.validate().is_err());
    }
}
