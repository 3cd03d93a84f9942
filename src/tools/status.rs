//! Nutriplan Status Tool
//!
//! Provides runtime status information about the service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::nutrition::NutritionLimits;

const INSTRUCTIONS_HEADER: &str = r#"
# Nutriplan Meal Editing

## Ingredients

Every structured ingredient is a food item from the catalog scaled to a
quantity and unit. Use `search_food_items` to find the catalog entry, then
`preview_ingredient` to see the scaled macros before committing.
"#;

const INSTRUCTIONS_EDITING: &str = r#"
## Editing

- `add_ingredient` scales a food item and appends it
- `remove_ingredient` removes one line by position (0-based)
- `save_meal_ingredients` replaces the whole list
- `preview_meal_totals` computes totals for a list without saving

## Legacy Meals

Meals created before structured ingredients only have free-text lines.
`migrate_legacy_ingredients` converts them. Macros for converted lines are
estimates; lines reported as `fallback` could not be parsed at all.

## Swapping Meals

`swap_meal` without `confirm: true` only returns a comparison of the two
meals. Show it to the user and call again with `confirm: true` once they
agree.
"#;

/// Instructions for assistants editing meals, with the limits in force
pub fn meal_editing_instructions(limits: &NutritionLimits) -> String {
    let mut text = String::from(INSTRUCTIONS_HEADER);

    text.push_str("\n## Unit Caps\n\nQuantities are clamped to a maximum per unit:\n\n| Unit | Max |\n|------|-----|\n");
    for (unit, max) in limits.unit_caps.entries() {
        let unit = if unit == "unrecognized" { "anything else" } else { unit };
        text.push_str(&format!("| {} | {} |\n", unit, max));
    }
    text.push_str(
        "\nClamping is not an error. The response lists an `adjustments` entry for\n\
         every value that was reduced; tell the user about them.\n",
    );

    let ceilings = &limits.meal_ceilings;
    text.push_str(&format!(
        "\n## Meal Ceilings\n\nMeal totals are capped at {} kcal, {} g protein, {} g carbs and {} g\n\
         fats. Totals are always recomputed on the server when a meal is saved.\n",
        ceilings.calories, ceilings.protein, ceilings.carbs, ceilings.fats
    ));

    text.push_str(INSTRUCTIONS_EDITING);
    text
}

/// Runtime status of the service
#[derive(Debug, Clone, Serialize)]
pub struct NutriplanStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    /// Limits the resolver is enforcing
    pub limits: NutritionLimits,

    /// Process information
    pub started_at: String,
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    started_at: String,
    database_path: PathBuf,
    limits: NutritionLimits,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, limits: NutritionLimits) -> Self {
        Self {
            start_time: Instant::now(),
            started_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            database_path,
            limits,
        }
    }

    /// Get the current status
    pub fn get_status(&self) -> NutriplanStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        NutriplanStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            limits: self.limits.clone(),
            started_at: self.started_at.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_missing_database() {
        let tracker = StatusTracker::new(PathBuf::from("/no/such/nutriplan.db"), NutritionLimits::default());
        let status = tracker.get_status();
        assert_eq!(status.database_size_bytes, None);
        assert_eq!(status.process_id, std::process::id());
        assert_eq!(status.limits.unit_caps.tsp, 96.0);
        assert!(status.started_at.ends_with('Z'));
    }

    #[test]
    fn test_instructions_show_limits_in_force() {
        let text = meal_editing_instructions(&NutritionLimits::default());
        assert!(text.contains("| g | 2000 |"));
        assert!(text.contains("| lb | 4.4 |"));
        assert!(text.contains("| anything else | 10 |"));
        assert!(text.contains("3000 kcal, 250 g protein, 300 g carbs and 150 g\nfats"));

        let mut limits = NutritionLimits::default();
        limits.unit_caps.g = 1500.0;
        limits.meal_ceilings.calories = 2200.0;
        let text = meal_editing_instructions(&limits);
        assert!(text.contains("| g | 1500 |"));
        assert!(!text.contains("| g | 2000 |"));
        assert!(text.contains("2200 kcal"));
        assert!(text.contains("## Swapping Meals"));
    }
}
