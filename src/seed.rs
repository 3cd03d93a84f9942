//! Seed content loading
//!
//! Catalog, meal, plan and exercise content lives in JSON files as a list of
//! records tagged by `kind`. Files are validated once at load time, then
//! inserted idempotently: a record whose name already exists is skipped.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbError;
use crate::models::{
    DietPlan, DietPlanCreate, Exercise, ExerciseCreate, FoodItem, FoodItemCreate, Meal,
    MealCreate, MealType, StructuredIngredient,
};
use crate::nutrition::{IngredientQuantityResolver, ResolveError, Unit};

/// Seed error types
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Seed file is not valid: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Seed content failed validation:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Failed to resolve ingredient: {0}")]
    Resolve(#[from] ResolveError),
}

impl From<rusqlite::Error> for SeedError {
    fn from(e: rusqlite::Error) -> Self {
        SeedError::Db(DbError::Sqlite(e))
    }
}

/// A catalog reference inside a seeded meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedIngredient {
    /// Name of a food item seeded in the same file
    pub food: String,
    pub quantity: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedMeal {
    pub name: String,
    #[serde(default)]
    pub meal_type: MealType,
    #[serde(default)]
    pub ingredients: Vec<SeedIngredient>,
    #[serde(default)]
    pub legacy_ingredients: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPlan {
    pub name: String,
    pub description: Option<String>,
    /// Meal names, in slot order
    #[serde(default)]
    pub meals: Vec<String>,
    /// Exercise names, in order
    #[serde(default)]
    pub exercises: Vec<String>,
}

/// One entity in a seed file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeedRecord {
    FoodItem(FoodItemCreate),
    Meal(SeedMeal),
    DietPlan(SeedPlan),
    Exercise(ExerciseCreate),
}

/// Validated seed content, grouped by kind in insertion order
#[derive(Debug, Clone, Default)]
pub struct SeedContent {
    pub food_items: Vec<FoodItemCreate>,
    pub meals: Vec<SeedMeal>,
    pub plans: Vec<SeedPlan>,
    pub exercises: Vec<ExerciseCreate>,
}

/// Counts of what a seeding run did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedReport {
    pub food_items_inserted: usize,
    pub meals_inserted: usize,
    pub plans_inserted: usize,
    pub exercises_inserted: usize,
    pub skipped_existing: usize,
}

/// Read, parse and validate a seed file
pub fn load_seed_file(path: &Path) -> Result<SeedContent, SeedError> {
    let contents = std::fs::read_to_string(path)?;
    parse_seed(&contents)
}

/// Parse and validate seed JSON
pub fn parse_seed(contents: &str) -> Result<SeedContent, SeedError> {
    let records: Vec<SeedRecord> = serde_json::from_str(contents)?;

    let mut content = SeedContent::default();
    for record in records {
        match record {
            SeedRecord::FoodItem(item) => content.food_items.push(item),
            SeedRecord::Meal(meal) => content.meals.push(meal),
            SeedRecord::DietPlan(plan) => content.plans.push(plan),
            SeedRecord::Exercise(exercise) => content.exercises.push(exercise),
        }
    }

    let problems = validate(&content);
    if problems.is_empty() {
        Ok(content)
    } else {
        Err(SeedError::Invalid(problems))
    }
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>, problems: &mut Vec<String>) -> HashSet<String> {
    let mut seen = HashSet::new();
    for name in names {
        if name.trim().is_empty() {
            problems.push(format!("{} with an empty name", kind));
        } else if !seen.insert(name.to_lowercase()) {
            problems.push(format!("duplicate {} '{}'", kind, name));
        }
    }
    seen
}

fn validate(content: &SeedContent) -> Vec<String> {
    let mut problems = Vec::new();

    let foods = check_unique("food item", content.food_items.iter().map(|f| f.name.as_str()), &mut problems);
    let meals = check_unique("meal", content.meals.iter().map(|m| m.name.as_str()), &mut problems);
    let exercises = check_unique("exercise", content.exercises.iter().map(|e| e.name.as_str()), &mut problems);
    check_unique("diet plan", content.plans.iter().map(|p| p.name.as_str()), &mut problems);

    for item in &content.food_items {
        if !item.base_quantity.is_finite() || item.base_quantity <= 0.0 {
            problems.push(format!("food item '{}' needs a positive base_quantity", item.name));
        }
        if !item.macros.is_finite() || item.macros.has_negative() {
            problems.push(format!("food item '{}' has negative or invalid macros", item.name));
        }
    }

    for meal in &content.meals {
        for ing in &meal.ingredients {
            if !foods.contains(&ing.food.to_lowercase()) {
                problems.push(format!("meal '{}' uses unknown food item '{}'", meal.name, ing.food));
            }
            if !ing.quantity.is_finite() || ing.quantity <= 0.0 {
                problems.push(format!("meal '{}' has a non-positive quantity for '{}'", meal.name, ing.food));
            }
        }
    }

    for plan in &content.plans {
        for meal in &plan.meals {
            if !meals.contains(&meal.to_lowercase()) {
                problems.push(format!("plan '{}' uses unknown meal '{}'", plan.name, meal));
            }
        }
        for exercise in &plan.exercises {
            if !exercises.contains(&exercise.to_lowercase()) {
                problems.push(format!("plan '{}' uses unknown exercise '{}'", plan.name, exercise));
            }
        }
    }

    problems
}

/// Insert validated content, skipping anything that already exists by name
pub fn apply_seed(
    conn: &mut Connection,
    resolver: &IngredientQuantityResolver,
    content: &SeedContent,
) -> Result<SeedReport, SeedError> {
    let tx = conn.transaction()?;
    let mut report = SeedReport::default();

    for item in &content.food_items {
        if FoodItem::get_by_name(&tx, &item.name)?.is_some() {
            report.skipped_existing += 1;
            continue;
        }
        FoodItem::create(&tx, item)?;
        report.food_items_inserted += 1;
    }

    for exercise in &content.exercises {
        if Exercise::get_by_name(&tx, &exercise.name)?.is_some() {
            report.skipped_existing += 1;
            continue;
        }
        Exercise::create(&tx, exercise)?;
        report.exercises_inserted += 1;
    }

    for seed_meal in &content.meals {
        if Meal::get_by_name(&tx, &seed_meal.name)?.is_some() {
            report.skipped_existing += 1;
            continue;
        }
        let meal = Meal::create(
            &tx,
            &MealCreate {
                name: seed_meal.name.clone(),
                meal_type: seed_meal.meal_type,
                legacy_ingredients: seed_meal.legacy_ingredients.clone(),
                notes: seed_meal.notes.clone(),
            },
        )?;

        let mut ingredients: Vec<StructuredIngredient> = Vec::with_capacity(seed_meal.ingredients.len());
        for ing in &seed_meal.ingredients {
            let food = FoodItem::get_by_name(&tx, &ing.food)?.ok_or_else(|| {
                SeedError::Invalid(vec![format!("food item '{}' is missing", ing.food)])
            })?;
            let scaled = resolver.scale_food_item(&food, ing.quantity, &ing.unit)?;
            for adjustment in &scaled.adjustments {
                tracing::warn!(meal = %seed_meal.name, "{}", adjustment.message());
            }
            ingredients.push(scaled.value);
        }

        if !ingredients.is_empty() {
            let totals = resolver.compute_meal_totals(&ingredients)?.value;
            tx.execute(
                "UPDATE meals SET calories = ?1, protein = ?2, carbs = ?3, fats = ?4 WHERE id = ?5",
                rusqlite::params![
                    totals.macros.calories,
                    totals.macros.protein,
                    totals.macros.carbs,
                    totals.macros.fats,
                    meal.id
                ],
            )?;
            StructuredIngredient::replace_for_meal(&tx, meal.id, &ingredients)?;
        }
        report.meals_inserted += 1;
    }

    for seed_plan in &content.plans {
        if DietPlan::get_by_name(&tx, &seed_plan.name)?.is_some() {
            report.skipped_existing += 1;
            continue;
        }
        let plan = DietPlan::create(
            &tx,
            &DietPlanCreate {
                name: seed_plan.name.clone(),
                description: seed_plan.description.clone(),
            },
        )?;
        for meal_name in &seed_plan.meals {
            let meal = Meal::get_by_name(&tx, meal_name)?.ok_or_else(|| {
                SeedError::Invalid(vec![format!("meal '{}' is missing", meal_name)])
            })?;
            DietPlan::add_meal(&tx, plan.id, meal.id)?;
        }
        for exercise_name in &seed_plan.exercises {
            let exercise = Exercise::get_by_name(&tx, exercise_name)?.ok_or_else(|| {
                SeedError::Invalid(vec![format!("exercise '{}' is missing", exercise_name)])
            })?;
            DietPlan::add_exercise(&tx, plan.id, exercise.id)?;
        }
        report.plans_inserted += 1;
    }

    tx.commit()?;
    tracing::info!(?report, "Seeding complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_connection;

    const SEED: &str = r#"[
        {"kind": "food_item", "name": "Chicken breast", "category": "protein", "base_quantity": 100, "base_unit": "g",
         "calories": 165, "protein": 31, "carbs": 0, "fats": 3.6},
        {"kind": "food_item", "name": "White rice", "category": "grain", "base_quantity": 1, "base_unit": "cup",
         "calories": 205, "protein": 4.3, "carbs": 45, "fats": 0.4},
        {"kind": "exercise", "name": "Deadlift", "muscle_group": "back", "sets": 3, "reps": "5"},
        {"kind": "meal", "name": "Chicken and rice", "meal_type": "lunch",
         "ingredients": [
            {"food": "Chicken breast", "quantity": 150, "unit": "g"},
            {"food": "White rice", "quantity": 1, "unit": "cup"}
         ]},
        {"kind": "meal", "name": "Old oatmeal", "meal_type": "breakfast",
         "legacy_ingredients": ["1 cup oats", "1 banana"]},
        {"kind": "diet_plan", "name": "Training day", "meals": ["Old oatmeal", "Chicken and rice"],
         "exercises": ["Deadlift"]}
    ]"#;

    #[test]
    fn test_parse_groups_records() {
        let content = parse_seed(SEED).unwrap();
        assert_eq!(content.food_items.len(), 2);
        assert_eq!(content.meals.len(), 2);
        assert_eq!(content.plans.len(), 1);
        assert_eq!(content.exercises.len(), 1);
        assert_eq!(content.food_items[1].base_unit, Unit::Cup);
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let bad = r#"[
            {"kind": "food_item", "name": "Broken", "base_quantity": 0, "base_unit": "g", "calories": -5},
            {"kind": "food_item", "name": "broken", "base_quantity": 1, "base_unit": "g"},
            {"kind": "meal", "name": "M", "ingredients": [{"food": "Ghost", "quantity": 1, "unit": "g"}]},
            {"kind": "diet_plan", "name": "P", "meals": ["Nope"], "exercises": ["Nada"]}
        ]"#;
        match parse_seed(bad) {
            Err(SeedError::Invalid(problems)) => {
                assert!(problems.iter().any(|p| p.contains("duplicate food item")));
                assert!(problems.iter().any(|p| p.contains("positive base_quantity")));
                assert!(problems.iter().any(|p| p.contains("negative or invalid macros")));
                assert!(problems.iter().any(|p| p.contains("unknown food item 'Ghost'")));
                assert!(problems.iter().any(|p| p.contains("unknown meal 'Nope'")));
                assert!(problems.iter().any(|p| p.contains("unknown exercise 'Nada'")));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_demo_seed_file_is_valid() {
        let content = parse_seed(include_str!("../demos/seed.json")).unwrap();
        assert_eq!(content.plans.len(), 2);

        let mut conn = test_connection();
        let report = apply_seed(&mut conn, &IngredientQuantityResolver::default(), &content).unwrap();
        assert_eq!(report.meals_inserted, content.meals.len());
        assert_eq!(report.skipped_existing, 0);
    }

    #[test]
    fn test_unknown_kind_is_a_parse_error() {
        let result = parse_seed(r#"[{"kind": "workout_video", "name": "x"}]"#);
        assert!(matches!(result, Err(SeedError::Parse(_))));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut conn = test_connection();
        let resolver = IngredientQuantityResolver::default();
        let content = parse_seed(SEED).unwrap();

        let first = apply_seed(&mut conn, &resolver, &content).unwrap();
        assert_eq!(first.food_items_inserted, 2);
        assert_eq!(first.meals_inserted, 2);
        assert_eq!(first.plans_inserted, 1);
        assert_eq!(first.exercises_inserted, 1);
        assert_eq!(first.skipped_existing, 0);

        let second = apply_seed(&mut conn, &resolver, &content).unwrap();
        assert_eq!(second.food_items_inserted, 0);
        assert_eq!(second.skipped_existing, 6);

        let meal = Meal::get_by_name(&conn, "Chicken and rice").unwrap().unwrap();
        // 248 kcal chicken + 205 kcal rice
        assert_eq!(meal.totals.calories, 453.0);
        let detail = Meal::get_detail(&conn, meal.id).unwrap().unwrap();
        assert_eq!(detail.ingredients.len(), 2);
        assert_eq!(detail.ingredients[0].name, "Chicken breast");

        let plan = DietPlan::get_by_name(&conn, "Training day").unwrap().unwrap();
        let plan = DietPlan::get_detail(&conn, plan.id).unwrap().unwrap();
        assert_eq!(plan.meals[0].meal.name, "Old oatmeal");
        assert_eq!(plan.exercises[0].name, "Deadlift");
    }
}
