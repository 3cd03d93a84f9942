//! Nutriplan Library
//!
//! Diet plans, meals and a food catalog with bounded nutrition calculations.

pub mod build_info;
pub mod config;
pub mod db;
pub mod events;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod seed;
pub mod tools;
