//! Build information
//!
//! Compile-time build number and timestamp embedded by build.rs.

use std::path::Path;

use serde::Serialize;

/// Build number, incremented on each recompilation
pub const BUILD_NUMBER: u64 = match option_env!("NUTRIPLAN_BUILD_NUMBER") {
    Some(s) => parse_build_number(s),
    None => 0,
};

/// Build timestamp in ISO 8601 format
pub const BUILD_TIMESTAMP: &str = match option_env!("NUTRIPLAN_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Digits only; anything else makes the build number 0
const fn parse_build_number(s: &str) -> u64 {
    let bytes = s.as_bytes();
    let mut result: u64 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if !b.is_ascii_digit() {
            return 0;
        }
        result = result * 10 + (b - b'0') as u64;
        i += 1;
    }
    result
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub description: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            build_number: BUILD_NUMBER,
            build_timestamp: BUILD_TIMESTAMP,
            description: DESCRIPTION,
        }
    }

    /// One-line form used in banners and logs
    pub fn label(&self) -> String {
        format!("{} {} (build {}, {})", self.name, self.version, self.build_number, self.build_timestamp)
    }
}

/// Print the startup banner to stderr; stdout carries the MCP protocol
pub fn print_startup_banner(database_path: &Path, limits_path: Option<&Path>) {
    let info = BuildInfo::current();
    eprintln!("===============================================");
    eprintln!("  Nutriplan meal plan service");
    eprintln!("  {}", info.label());
    eprintln!("  Database: {}", database_path.display());
    match limits_path {
        Some(path) => eprintln!("  Limits:   {}", path.display()),
        None => eprintln!("  Limits:   built-in defaults"),
    }
    eprintln!("===============================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_number() {
        assert_eq!(parse_build_number("0"), 0);
        assert_eq!(parse_build_number("1234"), 1234);
        assert_eq!(parse_build_number("12a"), 0);
    }

    #[test]
    fn test_label() {
        let info = BuildInfo::current();
        assert_eq!(info.name, "nutriplan");
        assert!(info.label().starts_with(&format!("nutriplan {}", VERSION)));
    }
}
