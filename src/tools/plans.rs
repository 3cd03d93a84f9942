//! Diet Plan MCP Tools

use serde::Serialize;

use crate::db::Database;
use crate::models::{DietPlan, DietPlanDetail};

/// Plan entry in list_diet_plans
#[derive(Debug, Serialize)]
pub struct DietPlanSummary {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub meal_count: usize,
    pub updated_at: String,
}

/// Response for list_diet_plans
#[derive(Debug, Serialize)]
pub struct ListDietPlansResponse {
    pub plans: Vec<DietPlanSummary>,
    pub total: usize,
}

/// Get a plan with its meals in slot order
pub fn get_diet_plan(db: &Database, id: i64) -> Result<Option<DietPlanDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    DietPlan::get_detail(&conn, id).map_err(|e| format!("Failed to get diet plan: {}", e))
}

/// List every plan by name
pub fn list_diet_plans(db: &Database) -> Result<ListDietPlansResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let plans = DietPlan::list(&conn).map_err(|e| format!("Failed to list diet plans: {}", e))?;

    let mut summaries = Vec::with_capacity(plans.len());
    for plan in plans {
        let meal_count = DietPlan::meal_ids(&conn, plan.id)
            .map_err(|e| format!("Failed to get plan meals: {}", e))?
            .len();
        summaries.push(DietPlanSummary {
            id: plan.id,
            name: plan.name,
            description: plan.description,
            meal_count,
            updated_at: plan.updated_at,
        });
    }

    let total = summaries.len();
    Ok(ListDietPlansResponse { plans: summaries, total })
}
