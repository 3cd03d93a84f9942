//! Nutriplan Tools module
//!
//! MCP tool implementations, one module per entity.

pub mod food_items;
pub mod meals;
pub mod plans;
pub mod status;
