//! Meal model
//!
//! A named meal owning an ordered ingredient list and its cached totals.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::{Macros, StructuredIngredient};

/// Meal type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    #[default]
    Unspecified,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
            MealType::Unspecified => "unspecified",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "breakfast" => MealType::Breakfast,
            "lunch" => MealType::Lunch,
            "dinner" => MealType::Dinner,
            "snack" => MealType::Snack,
            _ => MealType::Unspecified,
        }
    }
}

/// A meal with its cached totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub name: String,
    pub meal_type: MealType,
    /// Free-text ingredients predating structured ones
    pub legacy_ingredients: Vec<String>,
    pub totals: Macros,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Meal with its structured ingredient list
#[derive(Debug, Clone, Serialize)]
pub struct MealDetail {
    #[serde(flatten)]
    pub meal: Meal,
    pub ingredients: Vec<StructuredIngredient>,
}

/// Data for creating a meal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MealCreate {
    pub name: String,
    #[serde(default)]
    pub meal_type: MealType,
    #[serde(default)]
    pub legacy_ingredients: Vec<String>,
    pub notes: Option<String>,
}

impl Meal {
    /// Create from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let meal_type: String = row.get("meal_type")?;
        let legacy: String = row.get("legacy_ingredients")?;
        let legacy_ingredients = serde_json::from_str(&legacy).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            meal_type: MealType::from_str(&meal_type),
            legacy_ingredients,
            totals: Macros {
                calories: row.get("calories")?,
                protein: row.get("protein")?,
                carbs: row.get("carbs")?,
                fats: row.get("fats")?,
            },
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Create a new meal with an empty structured ingredient list
    pub fn create(conn: &Connection, data: &MealCreate) -> DbResult<Self> {
        let legacy = serde_json::to_string(&data.legacy_ingredients)?;
        conn.execute(
            r#"
            INSERT INTO meals (name, meal_type, legacy_ingredients, notes)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![data.name, data.meal_type.as_str(), legacy, data.notes],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound("Meal", id))
    }

    /// Get a meal by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meals WHERE id = ?1")?;
        Ok(stmt.query_row([id], Self::from_row).optional()?)
    }

    /// Get the first meal with exactly this name
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM meals WHERE name = ?1 COLLATE NOCASE ORDER BY id LIMIT 1",
        )?;
        Ok(stmt.query_row([name], Self::from_row).optional()?)
    }

    /// Get a meal together with its ingredients
    pub fn get_detail(conn: &Connection, id: i64) -> DbResult<Option<MealDetail>> {
        let Some(meal) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };
        let ingredients = StructuredIngredient::list_for_meal(conn, id)?;
        Ok(Some(MealDetail { meal, ingredients }))
    }

    /// Replace the ingredient list and its totals
    ///
    /// Run this inside the transaction that read the list being replaced,
    /// otherwise a concurrent edit can be overwritten.
    pub fn save_ingredients(
        conn: &Connection,
        id: i64,
        ingredients: &[StructuredIngredient],
        totals: &Macros,
    ) -> DbResult<MealDetail> {
        let updated = conn.execute(
            r#"
            UPDATE meals
            SET calories = ?1, protein = ?2, carbs = ?3, fats = ?4, updated_at = datetime('now')
            WHERE id = ?5
            "#,
            params![totals.calories, totals.protein, totals.carbs, totals.fats, id],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound("Meal", id));
        }

        StructuredIngredient::replace_for_meal(conn, id, ingredients)?;

        Self::get_detail(conn, id)?.ok_or(DbError::NotFound("Meal", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_connection;
    use crate::nutrition::Unit;

    #[test]
    fn test_create_with_legacy_ingredients() {
        let conn = test_connection();
        let meal = Meal::create(
            &conn,
            &MealCreate {
                name: "Oatmeal bowl".to_string(),
                meal_type: MealType::Breakfast,
                legacy_ingredients: vec!["1 cup oats".to_string(), "1 banana".to_string()],
                notes: None,
            },
        )
        .unwrap();

        assert_eq!(meal.meal_type, MealType::Breakfast);
        assert_eq!(meal.legacy_ingredients.len(), 2);
        assert_eq!(meal.totals, Macros::zero());

        let detail = Meal::get_detail(&conn, meal.id).unwrap().unwrap();
        assert!(detail.ingredients.is_empty());
        assert!(Meal::get_detail(&conn, 404).unwrap().is_none());
    }

    #[test]
    fn test_save_ingredients_replaces_list() {
        let mut conn = test_connection();
        let meal = Meal::create(&conn, &MealCreate { name: "Lunch".into(), ..Default::default() }).unwrap();

        let first = vec![
            StructuredIngredient::manual("Rice", 1.0, Unit::Cup, Macros::new(200.0, 4.0, 45.0, 0.5)),
            StructuredIngredient::manual("Beans", 0.5, Unit::Cup, Macros::new(110.0, 7.0, 20.0, 0.5)),
        ];
        let tx = conn.transaction().unwrap();
        let saved = Meal::save_ingredients(&tx, meal.id, &first, &Macros::new(310.0, 11.0, 65.0, 1.0)).unwrap();
        tx.commit().unwrap();
        assert_eq!(saved.ingredients, first);
        assert_eq!(saved.meal.totals.calories, 310.0);

        let second = vec![first[1].clone()];
        let tx = conn.transaction().unwrap();
        let saved = Meal::save_ingredients(&tx, meal.id, &second, &Macros::new(110.0, 7.0, 20.0, 0.5)).unwrap();
        tx.commit().unwrap();
        assert_eq!(Meal::get_detail(&conn, meal.id).unwrap().unwrap().ingredients, second);
        assert_eq!(saved.ingredients.len(), 1);
        assert_eq!(saved.ingredients[0].name, "Beans");
        assert_eq!(saved.meal.totals.calories, 110.0);
    }

    #[test]
    fn test_save_ingredients_missing_meal() {
        let conn = test_connection();
        let result = Meal::save_ingredients(&conn, 77, &[], &Macros::zero());
        assert!(matches!(result, Err(DbError::NotFound("Meal", 77))));
    }

    #[test]
    fn test_save_ingredients_rolls_back_with_transaction() {
        let mut conn = test_connection();
        let meal = Meal::create(&conn, &MealCreate { name: "Brunch".into(), ..Default::default() }).unwrap();
        let list = vec![StructuredIngredient::manual("Toast", 2.0, Unit::Slice, Macros::new(160.0, 6.0, 30.0, 2.0))];

        let tx = conn.transaction().unwrap();
        Meal::save_ingredients(&tx, meal.id, &list, &Macros::new(160.0, 6.0, 30.0, 2.0)).unwrap();
        drop(tx);

        let detail = Meal::get_detail(&conn, meal.id).unwrap().unwrap();
        assert!(detail.ingredients.is_empty());
        assert_eq!(detail.meal.totals, Macros::zero());
    }

    #[test]
    fn test_meal_type_round_trip() {
        assert_eq!(MealType::from_str("DINNER"), MealType::Dinner);
        assert_eq!(MealType::from_str("brunch"), MealType::Unspecified);
        assert_eq!(MealType::Snack.as_str(), "snack");
    }
}
