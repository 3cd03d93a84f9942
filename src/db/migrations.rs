//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!(version = 1, "Applied schema migration");
    }

    Ok(())
}

/// Migration v1: Initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- FOOD ITEMS
        -- Catalog entries; macros are per base quantity
        -- ============================================
        CREATE TABLE food_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category TEXT,                       -- search filter, e.g. "protein"
            base_quantity REAL NOT NULL CHECK(base_quantity > 0),
            base_unit TEXT NOT NULL,             -- e.g. "g", "ml", "piece"

            calories REAL NOT NULL DEFAULT 0,
            protein REAL NOT NULL DEFAULT 0,     -- grams
            carbs REAL NOT NULL DEFAULT 0,       -- grams
            fats REAL NOT NULL DEFAULT 0,        -- grams

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_food_items_name ON food_items(name);
        CREATE INDEX idx_food_items_category ON food_items(category);

        -- ============================================
        -- MEALS
        -- A meal owns its ordered ingredient list
        -- ============================================
        CREATE TABLE meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            meal_type TEXT NOT NULL CHECK(meal_type IN ('breakfast', 'lunch', 'dinner', 'snack', 'unspecified')),

            -- Free-text ingredients from before structured ingredients existed (JSON array)
            legacy_ingredients TEXT NOT NULL DEFAULT '[]',

            -- Cached totals - rewritten together with meal_ingredients
            calories REAL NOT NULL DEFAULT 0,
            protein REAL NOT NULL DEFAULT 0,
            carbs REAL NOT NULL DEFAULT 0,
            fats REAL NOT NULL DEFAULT 0,

            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_meals_name ON meals(name);

        -- ============================================
        -- MEAL INGREDIENTS
        -- Structured line items, replaced as a whole on save
        -- ============================================
        CREATE TABLE meal_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            quantity REAL NOT NULL CHECK(quantity > 0),
            unit TEXT NOT NULL,

            calories REAL NOT NULL DEFAULT 0,
            protein REAL NOT NULL DEFAULT 0,
            carbs REAL NOT NULL DEFAULT 0,
            fats REAL NOT NULL DEFAULT 0,

            -- Weak back-reference; catalog rows may be removed
            food_item_id INTEGER REFERENCES food_items(id) ON DELETE SET NULL,

            -- Snapshot at the time the ingredient was added or rescaled
            reference_quantity REAL NOT NULL,
            reference_calories REAL NOT NULL DEFAULT 0,
            reference_protein REAL NOT NULL DEFAULT 0,
            reference_carbs REAL NOT NULL DEFAULT 0,
            reference_fats REAL NOT NULL DEFAULT 0,

            UNIQUE(meal_id, position)
        );

        CREATE INDEX idx_meal_ingredients_meal ON meal_ingredients(meal_id);
        CREATE INDEX idx_meal_ingredients_food ON meal_ingredients(food_item_id);

        -- ============================================
        -- DIET PLANS
        -- A day's plan: ordered slots pointing at meals
        -- ============================================
        CREATE TABLE diet_plans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE plan_meals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plan_id INTEGER NOT NULL REFERENCES diet_plans(id) ON DELETE CASCADE,
            meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE RESTRICT,
            position INTEGER NOT NULL,
            UNIQUE(plan_id, position)
        );

        CREATE INDEX idx_plan_meals_plan ON plan_meals(plan_id);
        CREATE INDEX idx_plan_meals_meal ON plan_meals(meal_id);

        -- ============================================
        -- EXERCISES
        -- Opaque workout content referenced by plans
        -- ============================================
        CREATE TABLE exercises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            muscle_group TEXT,
            sets INTEGER,
            reps TEXT,                           -- "8-12", "AMRAP", ...
            instructions TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE plan_exercises (
            plan_id INTEGER NOT NULL REFERENCES diet_plans(id) ON DELETE CASCADE,
            exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE RESTRICT,
            position INTEGER NOT NULL,
            PRIMARY KEY (plan_id, position)
        );
        "#,
    )?;

    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(needs_migration(&conn).unwrap());

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!needs_migration(&conn).unwrap());
    }
}
