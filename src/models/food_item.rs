//! Food Item model
//!
//! A catalog entry whose macros describe one base quantity of the food.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::nutrition::Unit;
use super::Macros;

/// A food item in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub base_quantity: f64,
    pub base_unit: Unit,
    #[serde(flatten)]
    pub macros: Macros,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new food item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodItemCreate {
    pub name: String,
    pub category: Option<String>,
    pub base_quantity: f64,
    pub base_unit: Unit,
    #[serde(flatten)]
    pub macros: Macros,
}

/// Pagination metadata for catalog pages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let pages = if total == 0 { 0 } else { (total + per_page - 1) / per_page };
        Self { page, per_page, total, pages }
    }

    /// Row offset of the page; saturates for pages far past the end
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.per_page)
    }
}

/// One page of catalog results
#[derive(Debug, Clone, Serialize)]
pub struct FoodItemPage {
    pub items: Vec<FoodItem>,
    pub pagination: Pagination,
}

impl FoodItem {
    /// Build an unsaved reference, mostly useful for previews and tests
    pub fn reference(id: i64, name: &str, base_quantity: f64, base_unit: Unit, macros: Macros) -> Self {
        Self {
            id,
            name: name.to_string(),
            category: None,
            base_quantity,
            base_unit,
            macros,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    /// Create a FoodItem from a database row
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            category: row.get("category")?,
            base_quantity: row.get("base_quantity")?,
            base_unit: Unit::from_str(&row.get::<_, String>("base_unit")?),
            macros: Macros {
                calories: row.get("calories")?,
                protein: row.get("protein")?,
                carbs: row.get("carbs")?,
                fats: row.get("fats")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new food item into the database
    pub fn create(conn: &Connection, data: &FoodItemCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO food_items (
                name, category, base_quantity, base_unit, calories, protein, carbs, fats
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                data.name,
                data.category,
                data.base_quantity,
                data.base_unit.as_str(),
                data.macros.calories,
                data.macros.protein,
                data.macros.carbs,
                data.macros.fats,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound("Food item", id))
    }

    /// Get a food item by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM food_items WHERE id = ?1")?;
        Ok(stmt.query_row([id], Self::from_row).optional()?)
    }

    /// Get the first food item with exactly this name
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM food_items WHERE name = ?1 COLLATE NOCASE ORDER BY id LIMIT 1",
        )?;
        Ok(stmt.query_row([name], Self::from_row).optional()?)
    }

    /// Search food items by name with an optional category filter, one page at a time
    pub fn search(
        conn: &Connection,
        query: &str,
        category: Option<&str>,
        page: i64,
        per_page: i64,
    ) -> DbResult<FoodItemPage> {
        let search_pattern = format!("%{}%", query.trim());

        let total: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM food_items
            WHERE name LIKE ?1 AND (?2 IS NULL OR category = ?2 COLLATE NOCASE)
            "#,
            params![search_pattern, category],
            |row| row.get(0),
        )?;

        let pagination = Pagination::new(page, per_page, total);

        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM food_items
            WHERE name LIKE ?1 AND (?2 IS NULL OR category = ?2 COLLATE NOCASE)
            ORDER BY name ASC, id ASC
            LIMIT ?3 OFFSET ?4
            "#,
        )?;

        let items = stmt
            .query_map(
                params![search_pattern, category, per_page, pagination.offset()],
                Self::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FoodItemPage { items, pagination })
    }

    /// Count meal ingredients that were derived from this food item
    pub fn get_usage_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM meal_ingredients WHERE food_item_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_connection;

    #[test]
    fn test_pagination_offset() {
        assert_eq!(Pagination::new(1, 20, 45).offset(), 0);
        assert_eq!(Pagination::new(3, 20, 45).offset(), 40);
        assert_eq!(Pagination::new(3, 20, 45).pages, 3);
        assert_eq!(Pagination::new(i64::MAX, 20, 45).offset(), i64::MAX);
        assert_eq!(Pagination::new(0, 20, 0).offset(), 0);
    }

    fn create(conn: &Connection, name: &str, category: Option<&str>) -> FoodItem {
        FoodItem::create(
            conn,
            &FoodItemCreate {
                name: name.to_string(),
                category: category.map(str::to_string),
                base_quantity: 100.0,
                base_unit: Unit::Gram,
                macros: Macros::new(100.0, 10.0, 10.0, 1.0),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let conn = test_connection();
        let item = create(&conn, "Chicken breast", Some("protein"));
        assert!(item.id > 0);
        assert_eq!(item.base_unit, Unit::Gram);
        assert_eq!(item.category.as_deref(), Some("protein"));

        let fetched = FoodItem::get_by_id(&conn, item.id).unwrap().unwrap();
        assert_eq!(fetched, item);
        assert!(FoodItem::get_by_id(&conn, 999).unwrap().is_none());

        let by_name = FoodItem::get_by_name(&conn, "chicken BREAST").unwrap().unwrap();
        assert_eq!(by_name.id, item.id);
    }

    #[test]
    fn test_search_pagination_and_category() {
        let conn = test_connection();
        for i in 0..5 {
            create(&conn, &format!("Rice variety {}", i), Some("grain"));
        }
        create(&conn, "Rice cake", Some("snack"));
        create(&conn, "Salmon", Some("protein"));

        let page = FoodItem::search(&conn, "rice", None, 1, 4).unwrap();
        assert_eq!(page.items.len(), 4);
        assert_eq!(page.pagination, Pagination { page: 1, per_page: 4, total: 6, pages: 2 });

        let page2 = FoodItem::search(&conn, "rice", None, 2, 4).unwrap();
        assert_eq!(page2.items.len(), 2);

        let grains = FoodItem::search(&conn, "rice", Some("Grain"), 1, 20).unwrap();
        assert_eq!(grains.pagination.total, 5);
        assert!(grains.items.iter().all(|i| i.category.as_deref() == Some("grain")));

        let none = FoodItem::search(&conn, "tofu", None, 1, 20).unwrap();
        assert!(none.items.is_empty());
        assert_eq!(none.pagination.pages, 0);
    }
}
