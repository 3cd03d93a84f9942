//! Data models
//!
//! Rust structs representing database entities.

mod diet_plan;
mod exercise;
mod food_item;
mod meal;
mod meal_ingredient;
mod nutrition;

pub use diet_plan::{DietPlan, DietPlanCreate, DietPlanDetail, PlanMealSlot};
pub use exercise::{Exercise, ExerciseCreate};
pub use food_item::{FoodItem, FoodItemCreate, FoodItemPage, Pagination};
pub use meal::{Meal, MealCreate, MealDetail, MealType};
pub use meal_ingredient::{ReferenceSnapshot, StructuredIngredient};
pub use nutrition::{round1, Macros};
