//! Meal Ingredient model
//!
//! Structured line items owned by a meal. The list is only ever replaced as a
//! whole, never patched row by row.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::nutrition::Unit;
use super::Macros;

/// Values frozen when an ingredient was added or last rescaled
///
/// Serialized as flat `reference_*` fields next to the ingredient's own values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ReferenceFields", into = "ReferenceFields")]
pub struct ReferenceSnapshot {
    pub quantity: f64,
    pub macros: Macros,
}

/// Wire form of `ReferenceSnapshot`, matching the column names
#[derive(Serialize, Deserialize)]
#[serde(default)]
struct ReferenceFields {
    reference_quantity: f64,
    reference_calories: f64,
    reference_protein: f64,
    reference_carbs: f64,
    reference_fats: f64,
}

impl Default for ReferenceFields {
    fn default() -> Self {
        ReferenceSnapshot::default().into()
    }
}

impl From<ReferenceSnapshot> for ReferenceFields {
    fn from(snapshot: ReferenceSnapshot) -> Self {
        Self {
            reference_quantity: snapshot.quantity,
            reference_calories: snapshot.macros.calories,
            reference_protein: snapshot.macros.protein,
            reference_carbs: snapshot.macros.carbs,
            reference_fats: snapshot.macros.fats,
        }
    }
}

impl From<ReferenceFields> for ReferenceSnapshot {
    fn from(fields: ReferenceFields) -> Self {
        Self {
            quantity: fields.reference_quantity,
            macros: Macros::new(
                fields.reference_calories,
                fields.reference_protein,
                fields.reference_carbs,
                fields.reference_fats,
            ),
        }
    }
}

/// One ingredient line inside a meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredIngredient {
    #[serde(default)]
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: Unit,
    #[serde(flatten)]
    pub macros: Macros,
    /// Catalog entry this was derived from, lookup only
    #[serde(default)]
    pub food_item_id: Option<i64>,
    #[serde(flatten)]
    pub reference: ReferenceSnapshot,
}

impl StructuredIngredient {
    /// An ingredient not derived from the catalog; the snapshot mirrors the values
    pub fn manual(name: impl Into<String>, quantity: f64, unit: Unit, macros: Macros) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit,
            macros,
            food_item_id: None,
            reference: ReferenceSnapshot { quantity, macros },
        }
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            quantity: row.get("quantity")?,
            unit: Unit::from_str(&row.get::<_, String>("unit")?),
            macros: Macros {
                calories: row.get("calories")?,
                protein: row.get("protein")?,
                carbs: row.get("carbs")?,
                fats: row.get("fats")?,
            },
            food_item_id: row.get("food_item_id")?,
            reference: ReferenceSnapshot {
                quantity: row.get("reference_quantity")?,
                macros: Macros {
                    calories: row.get("reference_calories")?,
                    protein: row.get("reference_protein")?,
                    carbs: row.get("reference_carbs")?,
                    fats: row.get("reference_fats")?,
                },
            },
        })
    }

    /// Get a meal's ingredients in order
    pub fn list_for_meal(conn: &Connection, meal_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM meal_ingredients WHERE meal_id = ?1 ORDER BY position",
        )?;

        let ingredients = stmt
            .query_map([meal_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ingredients)
    }

    /// Replace a meal's ingredient list
    ///
    /// Callers run this inside the same transaction that rewrites the meal totals.
    pub fn replace_for_meal(conn: &Connection, meal_id: i64, ingredients: &[Self]) -> DbResult<()> {
        conn.execute("DELETE FROM meal_ingredients WHERE meal_id = ?1", [meal_id])?;

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO meal_ingredients (
                meal_id, position, name, quantity, unit,
                calories, protein, carbs, fats, food_item_id,
                reference_quantity, reference_calories, reference_protein,
                reference_carbs, reference_fats
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )?;

        for (position, ing) in ingredients.iter().enumerate() {
            stmt.execute(params![
                meal_id,
                position as i64,
                ing.name,
                ing.quantity,
                ing.unit.as_str(),
                ing.macros.calories,
                ing.macros.protein,
                ing.macros.carbs,
                ing.macros.fats,
                ing.food_item_id,
                ing.reference.quantity,
                ing.reference.macros.calories,
                ing.reference.macros.protein,
                ing.reference.macros.carbs,
                ing.reference.macros.fats,
            ])?;
        }

        Ok(())
    }
}
