//! Legacy free-text ingredient parsing
//!
//! Best-effort recovery of structure from ingredient strings like
//! "1.5 cups of rice" on meals that predate structured ingredients. The output
//! is always tagged so it can't be mistaken for catalog-derived data.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::units::Unit;
use crate::models::{round1, Macros, StructuredIngredient};

/// Low-confidence macros used when nothing better is known
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MealDefaults {
    pub macros: Macros,
}

impl Default for MealDefaults {
    fn default() -> Self {
        Self {
            macros: Macros::new(50.0, 2.0, 5.0, 2.0),
        }
    }
}

/// Food group guessed from keywords in an ingredient name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodCategory {
    Protein,
    Starch,
    Fat,
    Vegetable,
    Fruit,
}

impl FoodCategory {
    /// Rough macros for one unit quantity of this food group
    pub fn macros_per_unit(&self) -> Macros {
        match self {
            FoodCategory::Protein => Macros::new(150.0, 25.0, 0.0, 5.0),
            FoodCategory::Starch => Macros::new(130.0, 3.0, 25.0, 1.0),
            FoodCategory::Fat => Macros::new(120.0, 0.0, 0.0, 14.0),
            FoodCategory::Vegetable => Macros::new(30.0, 2.0, 6.0, 0.0),
            FoodCategory::Fruit => Macros::new(60.0, 1.0, 15.0, 0.0),
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            FoodCategory::Protein => &[
                "chicken", "beef", "turkey", "pork", "steak", "fish", "salmon", "tuna", "cod",
                "shrimp", "egg", "eggs", "tofu", "tempeh", "whey", "protein", "lamb", "ham",
            ],
            FoodCategory::Starch => &[
                "rice", "pasta", "bread", "potato", "potatoes", "oat", "oats", "oatmeal",
                "quinoa", "noodle", "noodles", "tortilla", "bagel", "couscous", "cereal",
            ],
            FoodCategory::Fat => &[
                "oil", "butter", "avocado", "nut", "nuts", "almond", "almonds", "peanut",
                "cheese", "mayo", "mayonnaise", "seeds", "ghee",
            ],
            FoodCategory::Vegetable => &[
                "broccoli", "spinach", "lettuce", "kale", "carrot", "carrots", "pepper",
                "peppers", "onion", "onions", "tomato", "tomatoes", "cucumber", "zucchini",
                "asparagus", "salad", "vegetables", "veggies", "greens",
            ],
            FoodCategory::Fruit => &[
                "apple", "banana", "berries", "blueberries", "strawberries", "orange",
                "grapes", "mango", "pineapple", "fruit", "pear", "peach",
            ],
        }
    }

    /// Guess a category from the words of a name; earlier categories win ties
    pub fn sniff(name: &str) -> Option<Self> {
        const ORDER: [FoodCategory; 5] = [
            FoodCategory::Protein,
            FoodCategory::Starch,
            FoodCategory::Fat,
            FoodCategory::Vegetable,
            FoodCategory::Fruit,
        ];

        let lower = name.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        ORDER
            .into_iter()
            .find(|category| words.iter().any(|w| category.keywords().contains(w)))
    }
}

/// Result of parsing a legacy ingredient string
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LegacyIngredient {
    /// Structure was recovered from the text; macros are still estimates
    Parsed {
        ingredient: StructuredIngredient,
        /// Food group the estimate came from, None for the flat default
        category: Option<FoodCategory>,
    },
    /// Nothing usable in the text; placeholder values only
    Fallback { ingredient: StructuredIngredient },
}

impl LegacyIngredient {
    pub fn ingredient(&self) -> &StructuredIngredient {
        match self {
            LegacyIngredient::Parsed { ingredient, .. } => ingredient,
            LegacyIngredient::Fallback { ingredient } => ingredient,
        }
    }

    pub fn into_ingredient(self) -> StructuredIngredient {
        match self {
            LegacyIngredient::Parsed { ingredient, .. } => ingredient,
            LegacyIngredient::Fallback { ingredient } => ingredient,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, LegacyIngredient::Fallback { .. })
    }
}

fn ingredient_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(?P<qty>\d+\s*/\s*\d+|\d*\.\d+|\d+)?\s*(?P<unit>[a-z]+\.?)?\s*(?P<rest>.*)$",
        )
        .expect("ingredient pattern is valid")
    })
}

/// Parse a quantity token: plain decimals or simple a/b fractions
///
/// Anything unparseable, zero or non-finite becomes 1.
pub fn parse_quantity(token: &str) -> f64 {
    let value = match token.split_once('/') {
        Some((num, den)) => match (num.trim().parse::<f64>(), den.trim().parse::<f64>()) {
            (Ok(n), Ok(d)) if d != 0.0 => n / d,
            _ => f64::NAN,
        },
        None => token.trim().parse::<f64>().unwrap_or(f64::NAN),
    };

    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

/// Recover a structured ingredient from free text
///
/// `index` is the zero-based line position, used to name placeholders.
pub fn parse_legacy_ingredient(text: &str, index: usize, defaults: &MealDefaults) -> LegacyIngredient {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return LegacyIngredient::Fallback {
            ingredient: estimated(format!("Ingredient {}", index + 1), 1.0, Unit::Serving, defaults.macros),
        };
    }

    let (quantity, unit, name) = match ingredient_pattern().captures(trimmed) {
        Some(caps) => {
            let quantity = caps.name("qty").map(|m| parse_quantity(m.as_str())).unwrap_or(1.0);
            let unit_word = caps.name("unit").map(|m| m.as_str());
            let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");

            // An unrecognized word after the number is part of the name
            let (unit, rest) = match unit_word.and_then(Unit::from_synonym) {
                Some(unit) => (unit, rest.to_string()),
                None => (
                    Unit::Serving,
                    match unit_word {
                        Some(word) => format!("{} {}", word, rest),
                        None => rest.to_string(),
                    },
                ),
            };

            (quantity, unit, strip_of(&rest))
        }
        None => (1.0, Unit::Serving, trimmed.to_string()),
    };

    let name = if name.is_empty() { trimmed.to_string() } else { name };

    let category = FoodCategory::sniff(&name);
    let per_unit = category.map(|c| c.macros_per_unit()).unwrap_or(defaults.macros);
    if category.is_none() {
        tracing::debug!(ingredient = %name, "No food group matched, using default estimate");
    }

    // A quantity too large to scale is read as a single unit
    let scaled = per_unit.scale(quantity);
    let (quantity, scaled) = if scaled.is_finite() {
        (quantity, scaled)
    } else {
        tracing::warn!(ingredient = %name, quantity, "Quantity overflows macro estimate, using 1");
        (1.0, per_unit)
    };

    LegacyIngredient::Parsed {
        ingredient: estimated(name, quantity, unit, scaled),
        category,
    }
}

fn strip_of(rest: &str) -> String {
    let rest = rest.trim();
    let lower = rest.to_lowercase();
    if lower == "of" {
        String::new()
    } else if lower.starts_with("of ") {
        rest[3..].trim().to_string()
    } else {
        rest.to_string()
    }
}

fn estimated(name: String, quantity: f64, unit: Unit, raw: Macros) -> StructuredIngredient {
    let macros = Macros {
        calories: raw.calories.round(),
        protein: round1(raw.protein),
        carbs: round1(raw.carbs),
        fats: round1(raw.fats),
    }
    .non_negative();

    StructuredIngredient::manual(name, quantity, unit, macros)
}
