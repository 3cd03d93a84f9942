//! Nutriplan
//!
//! An MCP server for browsing and editing diet plans.

use std::path::PathBuf;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use nutriplan::build_info;
use nutriplan::config::{AppConfig, LIMITS_PATH_VAR};
use nutriplan::db;
use nutriplan::events::{log_events, EventBus};
use nutriplan::mcp::NutriplanService;
use nutriplan::nutrition::IngredientQuantityResolver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging goes to stderr so it can't interfere with MCP stdio
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutriplan=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    let limits_path = std::env::var(LIMITS_PATH_VAR).ok().map(PathBuf::from);

    build_info::print_startup_banner(&config.database_path, limits_path.as_deref());

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = db::Database::new(&config.database_path)?;
    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        tracing::info!(version, "Database ready");
        Ok(())
    })?;

    let events = EventBus::new();
    tokio::spawn(log_events(events.subscribe()));

    let resolver = IngredientQuantityResolver::new(config.limits);
    let service = NutriplanService::new(config.database_path, database, resolver, events);

    tracing::info!("Starting MCP server on stdio");
    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
