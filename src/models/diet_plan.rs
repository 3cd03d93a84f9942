//! Diet Plan model
//!
//! A day's plan: an ordered list of meal slots plus the exercises scheduled
//! alongside them.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::{Exercise, Macros, Meal};

/// A diet plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DietPlan {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One meal slot in a plan
#[derive(Debug, Clone, Serialize)]
pub struct PlanMealSlot {
    pub position: i64,
    pub meal: Meal,
}

/// Plan with its meals, exercises and day totals
#[derive(Debug, Clone, Serialize)]
pub struct DietPlanDetail {
    #[serde(flatten)]
    pub plan: DietPlan,
    pub meals: Vec<PlanMealSlot>,
    pub exercises: Vec<Exercise>,
    /// Sum of the meals' cached totals
    pub totals: Macros,
}

/// Data for creating a diet plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DietPlanCreate {
    pub name: String,
    pub description: Option<String>,
}

impl DietPlan {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Create a new, empty plan
    pub fn create(conn: &Connection, data: &DietPlanCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO diet_plans (name, description) VALUES (?1, ?2)",
            params![data.name, data.description],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound("Diet plan", id))
    }

    /// Get a plan by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM diet_plans WHERE id = ?1")?;
        Ok(stmt.query_row([id], Self::from_row).optional()?)
    }

    /// Get a plan by its unique name
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM diet_plans WHERE name = ?1")?;
        Ok(stmt.query_row([name], Self::from_row).optional()?)
    }

    /// List all plans by name
    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM diet_plans ORDER BY name ASC")?;
        let plans = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    /// Append a meal slot to the end of a plan
    pub fn add_meal(conn: &Connection, plan_id: i64, meal_id: i64) -> DbResult<i64> {
        conn.execute(
            r#"
            INSERT INTO plan_meals (plan_id, meal_id, position)
            VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM plan_meals WHERE plan_id = ?1))
            "#,
            params![plan_id, meal_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Append an exercise to the end of a plan
    pub fn add_exercise(conn: &Connection, plan_id: i64, exercise_id: i64) -> DbResult<()> {
        conn.execute(
            r#"
            INSERT INTO plan_exercises (plan_id, exercise_id, position)
            VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM plan_exercises WHERE plan_id = ?1))
            "#,
            params![plan_id, exercise_id],
        )?;
        Ok(())
    }

    /// Meal IDs scheduled in a plan, in slot order
    pub fn meal_ids(conn: &Connection, plan_id: i64) -> DbResult<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT meal_id FROM plan_meals WHERE plan_id = ?1 ORDER BY position",
        )?;
        let ids = stmt
            .query_map([plan_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Point every slot holding `old_meal_id` at `new_meal_id`
    ///
    /// Returns the number of slots changed.
    pub fn replace_meal(
        conn: &Connection,
        plan_id: i64,
        old_meal_id: i64,
        new_meal_id: i64,
    ) -> DbResult<usize> {
        let rows = conn.execute(
            "UPDATE plan_meals SET meal_id = ?1 WHERE plan_id = ?2 AND meal_id = ?3",
            params![new_meal_id, plan_id, old_meal_id],
        )?;
        if rows > 0 {
            conn.execute(
                "UPDATE diet_plans SET updated_at = datetime('now') WHERE id = ?1",
                [plan_id],
            )?;
        }
        Ok(rows)
    }

    /// Get a plan with its meals and exercises
    pub fn get_detail(conn: &Connection, id: i64) -> DbResult<Option<DietPlanDetail>> {
        let Some(plan) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };

        let slots: Vec<(i64, i64)> = {
            let mut stmt = conn.prepare(
                "SELECT position, meal_id FROM plan_meals WHERE plan_id = ?1 ORDER BY position",
            )?;
            let rows = stmt.query_map([id], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut meals = Vec::with_capacity(slots.len());
        for (position, meal_id) in slots {
            let meal = Meal::get_by_id(conn, meal_id)?.ok_or(DbError::NotFound("Meal", meal_id))?;
            meals.push(PlanMealSlot { position, meal });
        }

        let totals: Macros = meals.iter().map(|slot| slot.meal.totals).sum();
        let exercises = Exercise::list_for_plan(conn, id)?;

        Ok(Some(DietPlanDetail { plan, meals, exercises, totals }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_connection;
    use crate::models::{ExerciseCreate, MealCreate};

    fn meal(conn: &Connection, name: &str, calories: f64) -> Meal {
        let meal = Meal::create(conn, &MealCreate { name: name.into(), ..Default::default() }).unwrap();
        conn.execute("UPDATE meals SET calories = ?1 WHERE id = ?2", params![calories, meal.id]).unwrap();
        Meal::get_by_id(conn, meal.id).unwrap().unwrap()
    }

    #[test]
    fn test_plan_detail_orders_slots_and_sums() {
        let conn = test_connection();
        let plan = DietPlan::create(&conn, &DietPlanCreate { name: "Cut day".into(), description: None }).unwrap();
        let breakfast = meal(&conn, "Eggs", 300.0);
        let lunch = meal(&conn, "Salad", 450.0);
        DietPlan::add_meal(&conn, plan.id, breakfast.id).unwrap();
        DietPlan::add_meal(&conn, plan.id, lunch.id).unwrap();

        let squat = Exercise::create(&conn, &ExerciseCreate { name: "Squat".into(), muscle_group: Some("legs".into()), sets: Some(5), reps: Some("5".into()), instructions: None }).unwrap();
        DietPlan::add_exercise(&conn, plan.id, squat.id).unwrap();

        let detail = DietPlan::get_detail(&conn, plan.id).unwrap().unwrap();
        assert_eq!(detail.meals.len(), 2);
        assert_eq!(detail.meals[0].position, 0);
        assert_eq!(detail.meals[0].meal.name, "Eggs");
        assert_eq!(detail.meals[1].meal.name, "Salad");
        assert_eq!(detail.totals.calories, 750.0);
        assert_eq!(detail.exercises.len(), 1);
        assert_eq!(DietPlan::meal_ids(&conn, plan.id).unwrap(), vec![breakfast.id, lunch.id]);
    }

    #[test]
    fn test_replace_meal() {
        let conn = test_connection();
        let plan = DietPlan::create(&conn, &DietPlanCreate { name: "Bulk day".into(), description: None }).unwrap();
        let a = meal(&conn, "A", 100.0);
        let b = meal(&conn, "B", 200.0);
        DietPlan::add_meal(&conn, plan.id, a.id).unwrap();

        assert_eq!(DietPlan::replace_meal(&conn, plan.id, a.id, b.id).unwrap(), 1);
        assert_eq!(DietPlan::meal_ids(&conn, plan.id).unwrap(), vec![b.id]);
        assert_eq!(DietPlan::replace_meal(&conn, plan.id, a.id, b.id).unwrap(), 0);
    }
}
