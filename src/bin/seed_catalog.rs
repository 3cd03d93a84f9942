//! Load seed content into the database
//! Usage: cargo run --bin seed_catalog -- <seed.json>

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use nutriplan::config::AppConfig;
use nutriplan::db::Database;
use nutriplan::nutrition::IngredientQuantityResolver;
use nutriplan::seed;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nutriplan=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let Some(seed_path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("Usage: seed_catalog <seed.json>");
        std::process::exit(2);
    };

    let config = AppConfig::from_env()?;
    println!("Database: {}", config.database_path.display());
    println!("Seed file: {}", seed_path.display());

    // Validate everything before touching the database
    let content = seed::load_seed_file(&seed_path)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let database = Database::new(&config.database_path)?;
    database.with_conn(nutriplan::db::migrations::run_migrations)?;

    let resolver = IngredientQuantityResolver::new(config.limits);
    let mut conn = database.get_conn()?;
    let report = seed::apply_seed(&mut conn, &resolver, &content)?;

    println!("Food items inserted: {}", report.food_items_inserted);
    println!("Exercises inserted:  {}", report.exercises_inserted);
    println!("Meals inserted:      {}", report.meals_inserted);
    println!("Diet plans inserted: {}", report.plans_inserted);
    println!("Already present:     {}", report.skipped_existing);

    Ok(())
}
