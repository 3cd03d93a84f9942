//! Runtime configuration
//!
//! Read from environment variables; nutrition limits can be overridden with a
//! JSON file.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::nutrition::NutritionLimits;

pub const DATABASE_PATH_VAR: &str = "NUTRIPLAN_DATABASE_PATH";
pub const LIMITS_PATH_VAR: &str = "NUTRIPLAN_LIMITS_PATH";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid limits file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid limits: {0}")]
    Invalid(String),
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub limits: NutritionLimits,
}

impl AppConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_path = std::env::var(DATABASE_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_database_path());

        let limits = match std::env::var(LIMITS_PATH_VAR) {
            Ok(path) => load_limits(Path::new(&path))?,
            Err(_) => NutritionLimits::default(),
        };

        Ok(Self { database_path, limits })
    }
}

/// Load and validate a limits override file
///
/// Keys left out of the file keep their default values.
pub fn load_limits(path: &Path) -> Result<NutritionLimits, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let limits = parse_limits(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    limits.validate().map_err(ConfigError::Invalid)?;

    tracing::info!(path = %path.display(), "Loaded nutrition limits");
    Ok(limits)
}

fn parse_limits(contents: &str) -> Result<NutritionLimits, serde_json::Error> {
    serde_json::from_str(contents)
}

/// `data/nutriplan.db` next to the project root when run from target/, else cwd
pub fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(parent) = path.parent() {
            if let Some(grandparent) = parent.parent() {
                path = grandparent.to_path_buf();
            }
        }
    }

    path.push("data");
    path.push("nutriplan.db");
    path
}
