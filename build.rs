//! Build script for Nutriplan
//!
//! Bumps the build number on each recompilation and embeds build metadata.

use std::fs;
use std::path::Path;

const BUILD_NUMBER_FILE: &str = "build_number.txt";

fn main() {
    println!("cargo:rerun-if-changed=src");

    let path = Path::new(BUILD_NUMBER_FILE);
    let previous: u64 = fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let build_number = previous + 1;

    // A read-only checkout still builds, the number just doesn't advance
    if let Err(e) = fs::write(path, build_number.to_string()) {
        println!("cargo:warning=Could not update {}: {}", BUILD_NUMBER_FILE, e);
    }

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    println!("cargo:rustc-env=NUTRIPLAN_BUILD_NUMBER={}", build_number);
    println!("cargo:rustc-env=NUTRIPLAN_BUILD_TIMESTAMP={}", timestamp);
}
