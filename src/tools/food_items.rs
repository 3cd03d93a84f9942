//! Food Item MCP Tools
//!
//! Catalog lookup and entry.

use serde::Serialize;

use crate::db::Database;
use crate::models::{FoodItem, FoodItemCreate, Pagination};
use crate::nutrition::Unit;

/// Default and maximum catalog page sizes
pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

/// Response for add_food_item
#[derive(Debug, Serialize)]
pub struct AddFoodItemResponse {
    pub id: i64,
    pub name: String,
    pub base_quantity: f64,
    pub base_unit: Unit,
    pub created_at: String,
}

/// Summary of a food item for search results
#[derive(Debug, Serialize)]
pub struct FoodItemSummary {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub base_quantity: f64,
    pub base_unit: Unit,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl From<&FoodItem> for FoodItemSummary {
    fn from(item: &FoodItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            category: item.category.clone(),
            base_quantity: item.base_quantity,
            base_unit: item.base_unit.clone(),
            calories: item.macros.calories,
            protein: item.macros.protein,
            carbs: item.macros.carbs,
            fats: item.macros.fats,
        }
    }
}

/// Response for search_food_items
#[derive(Debug, Serialize)]
pub struct SearchFoodItemsResponse {
    pub items: Vec<FoodItemSummary>,
    pub pagination: Pagination,
}

/// Full food item with usage information
#[derive(Debug, Serialize)]
pub struct FoodItemDetail {
    #[serde(flatten)]
    pub item: FoodItem,
    /// Meal ingredient lines derived from this item
    pub usage_count: i64,
}

/// Add a new food item to the catalog
pub fn add_food_item(db: &Database, mut data: FoodItemCreate) -> Result<AddFoodItemResponse, String> {
    let name = data.name.trim();
    if name.is_empty() {
        return Err("Food item name cannot be empty".to_string());
    }
    data.name = name.to_string();

    if !data.base_quantity.is_finite() || data.base_quantity <= 0.0 {
        return Err("base_quantity must be greater than 0".to_string());
    }

    let macros = [
        ("calories", data.macros.calories),
        ("protein", data.macros.protein),
        ("carbs", data.macros.carbs),
        ("fats", data.macros.fats),
    ];
    for (field, value) in macros {
        if !value.is_finite() {
            return Err(format!("{} must be a number", field));
        }
        if value < 0.0 {
            return Err(format!("{} cannot be negative", field));
        }
    }

    if !data.base_unit.is_known() {
        tracing::warn!(unit = %data.base_unit, "Unrecognized unit, the fallback quantity cap will apply");
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let item = FoodItem::create(&conn, &data)
        .map_err(|e| format!("Failed to create food item: {}", e))?;

    tracing::info!(id = item.id, name = %item.name, "Added food item");

    Ok(AddFoodItemResponse {
        id: item.id,
        name: item.name,
        base_quantity: item.base_quantity,
        base_unit: item.base_unit,
        created_at: item.created_at,
    })
}

/// Search the catalog by name, optionally within one category
pub fn search_food_items(
    db: &Database,
    query: &str,
    category: Option<&str>,
    page: i64,
    per_page: i64,
) -> Result<SearchFoodItemsResponse, String> {
    let page = page.max(1);
    let per_page = per_page.min(MAX_PER_PAGE).max(1);
    let category = category.map(str::trim).filter(|c| !c.is_empty());

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let result = FoodItem::search(&conn, query, category, page, per_page)
        .map_err(|e| format!("Search failed: {}", e))?;

    Ok(SearchFoodItemsResponse {
        items: result.items.iter().map(FoodItemSummary::from).collect(),
        pagination: result.pagination,
    })
}

/// Get a food item by ID with usage information
pub fn get_food_item(db: &Database, id: i64) -> Result<Option<FoodItemDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let item = FoodItem::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get food item: {}", e))?;

    match item {
        Some(item) => {
            let usage_count = FoodItem::get_usage_count(&conn, id)
                .map_err(|e| format!("Failed to get usage count: {}", e))?;
            Ok(Some(FoodItemDetail { item, usage_count }))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Macros;

    fn food(name: &str, category: &str, calories: f64) -> FoodItemCreate {
        FoodItemCreate {
            name: name.to_string(),
            category: Some(category.to_string()),
            base_quantity: 100.0,
            base_unit: Unit::Gram,
            macros: Macros::new(calories, 10.0, 10.0, 1.0),
        }
    }

    #[test]
    fn test_add_food_item_validation() {
        let db = Database::in_memory().unwrap();

        let err = add_food_item(&db, food("   ", "protein", 100.0)).unwrap_err();
        assert!(err.contains("name"));

        let mut zero = food("Tofu", "protein", 76.0);
        zero.base_quantity = 0.0;
        assert!(add_food_item(&db, zero).unwrap_err().contains("base_quantity"));

        let mut negative = food("Tofu", "protein", 76.0);
        negative.macros.fats = -2.0;
        assert_eq!(add_food_item(&db, negative).unwrap_err(), "fats cannot be negative");

        let added = add_food_item(&db, food("  Tofu ", "protein", 76.0)).unwrap();
        assert_eq!(added.name, "Tofu");
        assert_eq!(added.base_unit, Unit::Gram);
    }

    #[test]
    fn test_search_paginates_and_filters() {
        let db = Database::in_memory().unwrap();
        for i in 0..5 {
            add_food_item(&db, food(&format!("Bean {}", i), "legume", 100.0)).unwrap();
        }
        add_food_item(&db, food("Green bean", "vegetable", 31.0)).unwrap();

        let first = search_food_items(&db, "bean", None, 1, 4).unwrap();
        assert_eq!(first.items.len(), 4);
        assert_eq!(first.pagination.total, 6);
        assert_eq!(first.pagination.pages, 2);

        let second = search_food_items(&db, "bean", None, 2, 4).unwrap();
        assert_eq!(second.items.len(), 2);

        let veg = search_food_items(&db, "bean", Some("Vegetable"), 1, 20).unwrap();
        assert_eq!(veg.items.len(), 1);
        assert_eq!(veg.items[0].name, "Green bean");

        // Out of range inputs are clamped
        let clamped = search_food_items(&db, "", Some("  "), 0, 1000).unwrap();
        assert_eq!(clamped.pagination.page, 1);
        assert_eq!(clamped.pagination.per_page, MAX_PER_PAGE);
        assert_eq!(clamped.items.len(), 6);
    }

    #[test]
    fn test_search_far_past_last_page() {
        let db = Database::in_memory().unwrap();
        add_food_item(&db, food("Tofu", "protein", 76.0)).unwrap();

        let page = search_food_items(&db, "", None, i64::MAX, DEFAULT_PER_PAGE).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.page, i64::MAX);
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.pagination.pages, 1);
    }

    #[test]
    fn test_get_food_item() {
        let db = Database::in_memory().unwrap();
        let added = add_food_item(&db, food("Lentils", "legume", 116.0)).unwrap();

        let detail = get_food_item(&db, added.id).unwrap().unwrap();
        assert_eq!(detail.item.name, "Lentils");
        assert_eq!(detail.usage_count, 0);
        assert!(get_food_item(&db, 999).unwrap().is_none());
    }
}
