//! Exercise model
//!
//! Workout content is opaque to this service: it is stored and listed, never
//! interpreted.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};

/// An exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub muscle_group: Option<String>,
    pub sets: Option<i64>,
    pub reps: Option<String>,
    pub instructions: Option<String>,
}

/// Data for creating an exercise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseCreate {
    pub name: String,
    pub muscle_group: Option<String>,
    pub sets: Option<i64>,
    pub reps: Option<String>,
    pub instructions: Option<String>,
}

impl Exercise {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            muscle_group: row.get("muscle_group")?,
            sets: row.get("sets")?,
            reps: row.get("reps")?,
            instructions: row.get("instructions")?,
        })
    }

    pub fn create(conn: &Connection, data: &ExerciseCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO exercises (name, muscle_group, sets, reps, instructions)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![data.name, data.muscle_group, data.sets, data.reps, data.instructions],
        )?;

        let id = conn.last_insert_rowid();
        let mut stmt = conn.prepare("SELECT * FROM exercises WHERE id = ?1")?;
        stmt.query_row([id], Self::from_row)
            .optional()?
            .ok_or(DbError::NotFound("Exercise", id))
    }

    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM exercises WHERE name = ?1")?;
        Ok(stmt.query_row([name], Self::from_row).optional()?)
    }

    /// Exercises scheduled in a plan, in order
    pub fn list_for_plan(conn: &Connection, plan_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT e.* FROM exercises e
            INNER JOIN plan_exercises pe ON pe.exercise_id = e.id
            WHERE pe.plan_id = ?1
            ORDER BY pe.position
            "#,
        )?;
        let exercises = stmt
            .query_map([plan_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exercises)
    }
}
