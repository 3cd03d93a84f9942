//! Meal MCP Tools
//!
//! Ingredient editing, totals and meal swaps. Every write goes through
//! `persist_ingredients`, which re-resolves the whole list and recomputes the
//! totals before storing them, so the stored totals never come from the caller.
//! Edits read and rewrite the list inside one immediate transaction.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;

use crate::db::{Database, DbError};
use crate::events::{EventBus, PlanEvent};
use crate::models::{
    DietPlan, FoodItem, Macros, Meal, MealDetail, ReferenceSnapshot, StructuredIngredient,
};
use crate::nutrition::{
    parse_legacy_ingredient, CappedAdjustment, FoodCategory, IngredientQuantityResolver,
    LegacyIngredient, MealDefaults, MealNutritionTotals, Resolved, Unit,
};

/// A capped value with a user-facing notice
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentNotice {
    /// Ingredient position, None for meal-level ceilings
    pub position: Option<usize>,
    #[serde(flatten)]
    pub adjustment: CappedAdjustment,
    pub message: String,
}

impl AdjustmentNotice {
    fn new(position: Option<usize>, adjustment: CappedAdjustment) -> Self {
        let message = adjustment.message();
        Self { position, adjustment, message }
    }
}

/// Response for preview_ingredient
#[derive(Debug, Serialize)]
pub struct PreviewIngredientResponse {
    pub ingredient: StructuredIngredient,
    pub max_quantity: f64,
    pub adjustments: Vec<AdjustmentNotice>,
}

/// Response for preview_meal_totals
#[derive(Debug, Serialize)]
pub struct PreviewMealTotalsResponse {
    pub totals: MealNutritionTotals,
    pub ingredients: Vec<StructuredIngredient>,
    pub adjustments: Vec<AdjustmentNotice>,
}

/// Response for every tool that rewrites a meal's ingredient list
#[derive(Debug, Serialize)]
pub struct SaveMealResponse {
    pub meal: MealDetail,
    pub adjustments: Vec<AdjustmentNotice>,
}

/// Name and totals of one side of a swap
#[derive(Debug, Serialize)]
pub struct MealSummary {
    pub id: i64,
    pub name: String,
    pub totals: Macros,
}

impl From<&Meal> for MealSummary {
    fn from(meal: &Meal) -> Self {
        Self {
            id: meal.id,
            name: meal.name.clone(),
            totals: meal.totals,
        }
    }
}

/// Response for swap_meal
#[derive(Debug, Serialize)]
pub struct SwapMealResponse {
    pub plan_id: i64,
    /// False when this is only the comparison shown before confirming
    pub applied: bool,
    pub current: MealSummary,
    pub replacement: MealSummary,
    /// Replacement minus current, per slot
    pub difference: Macros,
    /// Plan slots holding the current meal
    pub slots: usize,
}

/// How one free-text line was converted
#[derive(Debug, Serialize)]
pub struct LegacyLineReport {
    pub position: usize,
    pub text: String,
    pub fallback: bool,
    pub category: Option<FoodCategory>,
}

/// Response for migrate_legacy_ingredients
#[derive(Debug, Serialize)]
pub struct MigrateLegacyResponse {
    /// False when the meal already had structured ingredients or nothing to convert
    pub migrated: bool,
    pub meal: MealDetail,
    pub lines: Vec<LegacyLineReport>,
    pub fallback_positions: Vec<usize>,
    pub adjustments: Vec<AdjustmentNotice>,
}

fn meal_error(meal_id: i64, e: DbError) -> String {
    match e {
        DbError::NotFound(..) => format!("Meal not found with id: {}", meal_id),
        other => format!("Failed to save meal: {}", other),
    }
}

fn load_meal(conn: &Connection, meal_id: i64) -> Result<MealDetail, String> {
    Meal::get_detail(conn, meal_id)
        .map_err(|e| format!("Failed to get meal: {}", e))?
        .ok_or_else(|| format!("Meal not found with id: {}", meal_id))
}

/// Re-resolve one submitted line
///
/// Catalog-derived lines are rescaled from the current catalog entry; other
/// lines are rescaled from their own reference snapshot.
fn resolve_line(
    conn: &Connection,
    resolver: &IngredientQuantityResolver,
    ingredient: &StructuredIngredient,
    position: usize,
) -> Result<Resolved<StructuredIngredient>, String> {
    let name = match ingredient.name.trim() {
        "" => format!("Ingredient {}", position + 1),
        name => name.to_string(),
    };

    let catalog = match ingredient.food_item_id {
        Some(id) => FoodItem::get_by_id(conn, id)
            .map_err(|e| format!("Failed to get food item: {}", e))?,
        None => None,
    };
    let from_catalog = catalog.is_some();

    let food = catalog.unwrap_or_else(|| {
        let reference = if ingredient.reference.quantity > 0.0 {
            ingredient.reference
        } else {
            ReferenceSnapshot {
                quantity: ingredient.quantity,
                macros: ingredient.macros,
            }
        };
        FoodItem::reference(0, &name, reference.quantity, ingredient.unit.clone(), reference.macros)
    });

    let mut resolved = resolver
        .scale_food_item(&food, ingredient.quantity, &ingredient.unit)
        .map_err(|e| format!("Ingredient {} ({}): {}", position + 1, name, e))?;

    resolved.value.name = name;
    if !from_catalog {
        resolved.value.food_item_id = None;
    }
    Ok(resolved)
}

/// Resolve a list and compute its totals without touching the database
fn resolve_list(
    conn: &Connection,
    resolver: &IngredientQuantityResolver,
    ingredients: &[StructuredIngredient],
) -> Result<(Vec<StructuredIngredient>, MealNutritionTotals, Vec<AdjustmentNotice>), String> {
    let mut lines = Vec::with_capacity(ingredients.len());
    let mut notices = Vec::new();

    for (position, ingredient) in ingredients.iter().enumerate() {
        let resolved = resolve_line(conn, resolver, ingredient, position)?;
        notices.extend(
            resolved
                .adjustments
                .into_iter()
                .map(|a| AdjustmentNotice::new(Some(position), a)),
        );
        lines.push(resolved.value);
    }

    let totals = resolver
        .compute_meal_totals(&lines)
        .map_err(|e| format!("Failed to compute meal totals: {}", e))?;
    notices.extend(totals.adjustments.into_iter().map(|a| AdjustmentNotice::new(None, a)));

    Ok((lines, totals.value, notices))
}

/// Take the write lock before reading anything that will be rewritten
fn begin_write(conn: &mut Connection) -> Result<Transaction<'_>, String> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| format!("Database error: {}", e))
}

/// Resolve and store a meal's list; the caller commits
fn persist_ingredients(
    conn: &Connection,
    resolver: &IngredientQuantityResolver,
    meal_id: i64,
    ingredients: &[StructuredIngredient],
) -> Result<SaveMealResponse, String> {
    let (lines, totals, adjustments) = resolve_list(conn, resolver, ingredients)?;

    let meal = Meal::save_ingredients(conn, meal_id, &lines, &totals.macros)
        .map_err(|e| meal_error(meal_id, e))?;

    Ok(SaveMealResponse { meal, adjustments })
}

/// Commit a rewritten list, then announce its totals
fn commit_ingredients(
    tx: Transaction<'_>,
    events: &EventBus,
    saved: SaveMealResponse,
) -> Result<SaveMealResponse, String> {
    tx.commit().map_err(|e| format!("Failed to save meal: {}", e))?;

    let meal_id = saved.meal.meal.id;
    let totals = saved.meal.meal.totals;
    tracing::info!(
        meal_id,
        ingredients = saved.meal.ingredients.len(),
        calories = totals.calories,
        capped = saved.adjustments.len(),
        "Saved meal ingredients"
    );
    events.publish(PlanEvent::MealTotalsChanged { meal_id, totals });

    Ok(saved)
}

/// Get a meal with its structured ingredients
pub fn get_meal(db: &Database, meal_id: i64) -> Result<Option<MealDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Meal::get_detail(&conn, meal_id).map_err(|e| format!("Failed to get meal: {}", e))
}

/// Scale a catalog item without saving anything
pub fn preview_ingredient(
    db: &Database,
    resolver: &IngredientQuantityResolver,
    food_item_id: i64,
    quantity: f64,
    unit: &Unit,
) -> Result<PreviewIngredientResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let food = FoodItem::get_by_id(&conn, food_item_id)
        .map_err(|e| format!("Failed to get food item: {}", e))?
        .ok_or_else(|| format!("Food item not found with id: {}", food_item_id))?;

    let resolved = resolver
        .scale_food_item(&food, quantity, unit)
        .map_err(|e| e.to_string())?;

    Ok(PreviewIngredientResponse {
        ingredient: resolved.value,
        max_quantity: resolver.max_quantity(unit),
        adjustments: resolved
            .adjustments
            .into_iter()
            .map(|a| AdjustmentNotice::new(Some(0), a))
            .collect(),
    })
}

/// Totals for an unsaved ingredient list, as they would be stored
pub fn preview_meal_totals(
    db: &Database,
    resolver: &IngredientQuantityResolver,
    ingredients: &[StructuredIngredient],
) -> Result<PreviewMealTotalsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let (ingredients, totals, adjustments) = resolve_list(&conn, resolver, ingredients)?;
    Ok(PreviewMealTotalsResponse { totals, ingredients, adjustments })
}

/// Replace a meal's whole ingredient list
pub fn save_meal_ingredients(
    db: &Database,
    resolver: &IngredientQuantityResolver,
    events: &EventBus,
    meal_id: i64,
    ingredients: &[StructuredIngredient],
) -> Result<SaveMealResponse, String> {
    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let tx = begin_write(&mut conn)?;
    let saved = persist_ingredients(&tx, resolver, meal_id, ingredients)?;
    commit_ingredients(tx, events, saved)
}

/// Scale a catalog item and append it to a meal
pub fn add_ingredient(
    db: &Database,
    resolver: &IngredientQuantityResolver,
    events: &EventBus,
    meal_id: i64,
    food_item_id: i64,
    quantity: f64,
    unit: Unit,
) -> Result<SaveMealResponse, String> {
    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let tx = begin_write(&mut conn)?;

    let detail = load_meal(&tx, meal_id)?;
    let food = FoodItem::get_by_id(&tx, food_item_id)
        .map_err(|e| format!("Failed to get food item: {}", e))?
        .ok_or_else(|| format!("Food item not found with id: {}", food_item_id))?;

    // Unscaled on purpose: persisting resolves it from the catalog and reports any cap
    let mut ingredients = detail.ingredients;
    ingredients.push(StructuredIngredient {
        name: food.name.clone(),
        quantity,
        unit,
        macros: Macros::zero(),
        food_item_id: Some(food.id),
        reference: Default::default(),
    });

    let saved = persist_ingredients(&tx, resolver, meal_id, &ingredients)?;
    commit_ingredients(tx, events, saved)
}

/// Remove the ingredient at a 0-based position
pub fn remove_ingredient(
    db: &Database,
    resolver: &IngredientQuantityResolver,
    events: &EventBus,
    meal_id: i64,
    position: usize,
) -> Result<SaveMealResponse, String> {
    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let tx = begin_write(&mut conn)?;

    let mut ingredients = load_meal(&tx, meal_id)?.ingredients;
    if position >= ingredients.len() {
        return Err(format!(
            "Meal {} has no ingredient at position {} ({} ingredients)",
            meal_id,
            position,
            ingredients.len()
        ));
    }
    ingredients.remove(position);

    let saved = persist_ingredients(&tx, resolver, meal_id, &ingredients)?;
    commit_ingredients(tx, events, saved)
}

/// Swap one meal in a plan for another
///
/// Without `confirm` this only compares the two meals.
pub fn swap_meal(
    db: &Database,
    events: &EventBus,
    plan_id: i64,
    current_meal_id: i64,
    replacement_meal_id: i64,
    confirm: bool,
) -> Result<SwapMealResponse, String> {
    if current_meal_id == replacement_meal_id {
        return Err("Replacement meal is the same as the current meal".to_string());
    }

    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let tx = if confirm {
        begin_write(&mut conn)?
    } else {
        conn.transaction().map_err(|e| format!("Database error: {}", e))?
    };

    DietPlan::get_by_id(&tx, plan_id)
        .map_err(|e| format!("Failed to get diet plan: {}", e))?
        .ok_or_else(|| format!("Diet plan not found with id: {}", plan_id))?;

    let slots = DietPlan::meal_ids(&tx, plan_id)
        .map_err(|e| format!("Failed to get plan meals: {}", e))?
        .into_iter()
        .filter(|id| *id == current_meal_id)
        .count();
    if slots == 0 {
        return Err(format!("Meal {} is not part of plan {}", current_meal_id, plan_id));
    }

    let current = load_meal(&tx, current_meal_id)?.meal;
    let replacement = load_meal(&tx, replacement_meal_id)?.meal;
    let difference = (replacement.totals + current.totals * -1.0).rounded();

    let mut response = SwapMealResponse {
        plan_id,
        applied: false,
        current: MealSummary::from(&current),
        replacement: MealSummary::from(&replacement),
        difference,
        slots,
    };

    if !confirm {
        return Ok(response);
    }

    DietPlan::replace_meal(&tx, plan_id, current_meal_id, replacement_meal_id)
        .map_err(|e| format!("Failed to swap meal: {}", e))?;
    tx.commit().map_err(|e| format!("Failed to swap meal: {}", e))?;

    tracing::info!(plan_id, current_meal_id, replacement_meal_id, slots, "Swapped meal");
    events.publish(PlanEvent::MealSwapped {
        plan_id,
        old_meal_id: current_meal_id,
        new_meal_id: replacement_meal_id,
    });

    response.applied = true;
    Ok(response)
}

/// Convert a meal's free-text ingredients into structured ones
///
/// A meal that already has structured ingredients is returned unchanged.
pub fn migrate_legacy_ingredients(
    db: &Database,
    resolver: &IngredientQuantityResolver,
    events: &EventBus,
    defaults: &MealDefaults,
    meal_id: i64,
) -> Result<MigrateLegacyResponse, String> {
    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let tx = begin_write(&mut conn)?;

    let detail = load_meal(&tx, meal_id)?;
    if !detail.ingredients.is_empty() || detail.meal.legacy_ingredients.is_empty() {
        return Ok(MigrateLegacyResponse {
            migrated: false,
            meal: detail,
            lines: Vec::new(),
            fallback_positions: Vec::new(),
            adjustments: Vec::new(),
        });
    }

    let mut lines = Vec::with_capacity(detail.meal.legacy_ingredients.len());
    let mut ingredients = Vec::with_capacity(detail.meal.legacy_ingredients.len());
    for (position, text) in detail.meal.legacy_ingredients.iter().enumerate() {
        let parsed = parse_legacy_ingredient(text, position, defaults);
        let category = match &parsed {
            LegacyIngredient::Parsed { category, .. } => *category,
            LegacyIngredient::Fallback { .. } => None,
        };
        lines.push(LegacyLineReport {
            position,
            text: text.clone(),
            fallback: parsed.is_fallback(),
            category,
        });
        ingredients.push(parsed.into_ingredient());
    }

    let fallback_positions: Vec<usize> = lines.iter().filter(|l| l.fallback).map(|l| l.position).collect();
    if !fallback_positions.is_empty() {
        tracing::warn!(meal_id, ?fallback_positions, "Legacy lines could not be parsed, using placeholders");
    }

    let saved = persist_ingredients(&tx, resolver, meal_id, &ingredients)?;
    let saved = commit_ingredients(tx, events, saved)?;

    Ok(MigrateLegacyResponse {
        migrated: true,
        meal: saved.meal,
        lines,
        fallback_positions,
        adjustments: saved.adjustments,
    })
}
