//! Nutriplan MCP Server Implementation
//!
//! Implements the MCP server with all Nutriplan tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::events::EventBus;
use crate::models::{FoodItemCreate, Macros, StructuredIngredient};
use crate::nutrition::{IngredientQuantityResolver, MealDefaults, Unit};
use crate::tools::food_items;
use crate::tools::meals;
use crate::tools::plans;
use crate::tools::status::StatusTracker;

/// Nutriplan MCP Service
#[derive(Clone)]
pub struct NutriplanService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    resolver: Arc<IngredientQuantityResolver>,
    meal_defaults: MealDefaults,
    events: EventBus,
    tool_router: ToolRouter<NutriplanService>,
}

impl NutriplanService {
    pub fn new(
        database_path: PathBuf,
        database: Database,
        resolver: IngredientQuantityResolver,
        events: EventBus,
    ) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(
                database_path,
                resolver.limits().clone(),
            ))),
            database,
            resolver: Arc::new(resolver),
            meal_defaults: MealDefaults::default(),
            events,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(entity: &str, id: i64) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        entity, id
    ))]))
}

// ============================================================================
// Food Item Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddFoodItemParams {
    pub name: String,
    /// Optional grouping such as "protein" or "grain"
    pub category: Option<String>,
    /// Quantity the macros below are given for, e.g. 100
    pub base_quantity: f64,
    /// Unit of base_quantity: g, ml, oz, lb, cup, tbsp, tsp, serving, piece, slice
    pub base_unit: String,
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fats: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchFoodItemsParams {
    /// Substring of the food name; empty matches everything
    #[serde(default)]
    pub query: String,
    pub category: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page() -> i64 { 1 }
fn default_per_page() -> i64 { food_items::DEFAULT_PER_PAGE }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetFoodItemParams {
    pub id: i64,
}

// ============================================================================
// Meal Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetMealParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScaleIngredientParams {
    pub food_item_id: i64,
    pub quantity: f64,
    /// g, ml, oz, lb, cup, tbsp, tsp, serving, piece, slice
    pub unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddIngredientParams {
    pub meal_id: i64,
    pub food_item_id: i64,
    pub quantity: f64,
    /// g, ml, oz, lb, cup, tbsp, tsp, serving, piece, slice
    pub unit: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveIngredientParams {
    pub meal_id: i64,
    /// 0-based position in the meal's ingredient list
    pub position: usize,
}

/// One ingredient line as submitted by a client
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IngredientParams {
    /// Left empty, a placeholder name is assigned
    #[serde(default)]
    pub name: String,
    pub quantity: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Catalog entry; when set, macros are recomputed from the catalog
    pub food_item_id: Option<i64>,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fats: f64,
}

fn default_unit() -> String { Unit::Serving.as_str().to_string() }

impl From<IngredientParams> for StructuredIngredient {
    fn from(p: IngredientParams) -> Self {
        let mut ingredient = StructuredIngredient::manual(
            p.name,
            p.quantity,
            Unit::from_str(&p.unit),
            Macros::new(p.calories, p.protein, p.carbs, p.fats),
        );
        ingredient.food_item_id = p.food_item_id;
        ingredient
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveMealIngredientsParams {
    pub meal_id: i64,
    /// The complete new ingredient list
    pub ingredients: Vec<IngredientParams>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PreviewMealTotalsParams {
    pub ingredients: Vec<IngredientParams>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SwapMealParams {
    pub plan_id: i64,
    pub current_meal_id: i64,
    pub replacement_meal_id: i64,
    /// Must be true to apply the swap; otherwise only a comparison is returned
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MigrateLegacyParams {
    pub meal_id: i64,
}

// ============================================================================
// Diet Plan Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetDietPlanParams {
    pub id: i64,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl NutriplanService {
    // --- Status ---

    #[tool(description = "Get the current status of the Nutriplan service including build info, database status, active nutrition limits and process information")]
    async fn nutriplan_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        to_json(&tracker.get_status())
    }

    #[tool(description = "Get instructions for editing meals: unit caps, meal ceilings, previews and swaps. Call this before changing a meal.")]
    fn meal_editing_instructions(&self) -> Result<CallToolResult, McpError> {
        let text = crate::tools::status::meal_editing_instructions(self.resolver.limits());
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    // --- Food Items ---

    #[tool(description = "Add a food item to the catalog. Macros are given per base_quantity of base_unit.")]
    fn add_food_item(&self, Parameters(p): Parameters<AddFoodItemParams>) -> Result<CallToolResult, McpError> {
        let data = FoodItemCreate {
            name: p.name,
            category: p.category,
            base_quantity: p.base_quantity,
            base_unit: Unit::from_str(&p.base_unit),
            macros: Macros::new(p.calories, p.protein, p.carbs, p.fats),
        };
        let result = food_items::add_food_item(&self.database, data).map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Search the food catalog by name with optional category filter and pagination")]
    fn search_food_items(&self, Parameters(p): Parameters<SearchFoodItemsParams>) -> Result<CallToolResult, McpError> {
        let result = food_items::search_food_items(&self.database, &p.query, p.category.as_deref(), p.page, p.per_page)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a food item by ID with its usage count")]
    fn get_food_item(&self, Parameters(p): Parameters<GetFoodItemParams>) -> Result<CallToolResult, McpError> {
        match food_items::get_food_item(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(item) => to_json(&item),
            None => not_found("Food item", p.id),
        }
    }

    // --- Meals ---

    #[tool(description = "Get a meal with its structured ingredients and stored totals")]
    fn get_meal(&self, Parameters(p): Parameters<GetMealParams>) -> Result<CallToolResult, McpError> {
        match meals::get_meal(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(meal) => to_json(&meal),
            None => not_found("Meal", p.id),
        }
    }

    #[tool(description = "Scale a catalog food item to a quantity and unit without saving. Reports any clamping to the unit maximum.")]
    fn preview_ingredient(&self, Parameters(p): Parameters<ScaleIngredientParams>) -> Result<CallToolResult, McpError> {
        let result = meals::preview_ingredient(&self.database, &self.resolver, p.food_item_id, p.quantity, &Unit::from_str(&p.unit))
            .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Compute meal totals for an ingredient list without saving")]
    fn preview_meal_totals(&self, Parameters(p): Parameters<PreviewMealTotalsParams>) -> Result<CallToolResult, McpError> {
        let ingredients: Vec<StructuredIngredient> = p.ingredients.into_iter().map(Into::into).collect();
        let result = meals::preview_meal_totals(&self.database, &self.resolver, &ingredients)
            .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Scale a catalog food item and append it to a meal. Meal totals are recomputed.")]
    fn add_ingredient(&self, Parameters(p): Parameters<AddIngredientParams>) -> Result<CallToolResult, McpError> {
        let result = meals::add_ingredient(
            &self.database, &self.resolver, &self.events,
            p.meal_id, p.food_item_id, p.quantity, Unit::from_str(&p.unit),
        )
        .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Remove the ingredient at a 0-based position from a meal. Meal totals are recomputed.")]
    fn remove_ingredient(&self, Parameters(p): Parameters<RemoveIngredientParams>) -> Result<CallToolResult, McpError> {
        let result = meals::remove_ingredient(&self.database, &self.resolver, &self.events, p.meal_id, p.position)
            .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Replace a meal's entire ingredient list. Every line is revalidated and totals are recomputed on the server.")]
    fn save_meal_ingredients(&self, Parameters(p): Parameters<SaveMealIngredientsParams>) -> Result<CallToolResult, McpError> {
        let ingredients: Vec<StructuredIngredient> = p.ingredients.into_iter().map(Into::into).collect();
        let result = meals::save_meal_ingredients(&self.database, &self.resolver, &self.events, p.meal_id, &ingredients)
            .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Swap a meal in a diet plan for another. Without confirm=true only a comparison is returned and nothing changes.")]
    fn swap_meal(&self, Parameters(p): Parameters<SwapMealParams>) -> Result<CallToolResult, McpError> {
        let result = meals::swap_meal(
            &self.database, &self.events,
            p.plan_id, p.current_meal_id, p.replacement_meal_id, p.confirm,
        )
        .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Convert a meal's free-text ingredients into structured ingredients with estimated macros. Meals that already have structured ingredients are left unchanged.")]
    fn migrate_legacy_ingredients(&self, Parameters(p): Parameters<MigrateLegacyParams>) -> Result<CallToolResult, McpError> {
        let result = meals::migrate_legacy_ingredients(
            &self.database, &self.resolver, &self.events, &self.meal_defaults, p.meal_id,
        )
        .map_err(|e| McpError::invalid_params(e, None))?;
        to_json(&result)
    }

    // --- Diet Plans ---

    #[tool(description = "Get a diet plan with its meals in order, exercises and day totals")]
    fn get_diet_plan(&self, Parameters(p): Parameters<GetDietPlanParams>) -> Result<CallToolResult, McpError> {
        match plans::get_diet_plan(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(plan) => to_json(&plan),
            None => not_found("Diet plan", p.id),
        }
    }

    #[tool(description = "List all diet plans")]
    fn list_diet_plans(&self) -> Result<CallToolResult, McpError> {
        let result = plans::list_diet_plans(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }
}

#[tool_handler]
impl ServerHandler for NutriplanService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutriplan".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Nutriplan".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Nutriplan - diet plans, meals and a food catalog with bounded nutrition math. \
                 Call meal_editing_instructions before changing meals. \
                 Food: add_food_item/search_food_items/get_food_item. \
                 Meals: get_meal, preview_ingredient, preview_meal_totals, add_ingredient, remove_ingredient, \
                 save_meal_ingredients, migrate_legacy_ingredients. \
                 Plans: list_diet_plans/get_diet_plan, swap_meal (requires confirm=true to apply)."
                    .into(),
            ),
        }
    }
}
