//! Unit types and quantity limits
//!
//! Provides the closed set of ingredient units and the per-unit maximum
//! quantities applied when scaling a food item.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unit of measure for an ingredient quantity
///
/// The named variants are the units a client unit picker offers. Anything
/// else is kept verbatim in `Other` so drifted data still round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Unit {
    Gram,
    Milliliter,
    Ounce,
    Pound,
    Cup,
    Tablespoon,
    Teaspoon,
    Serving,
    Piece,
    Slice,
    Other(String),
}

impl Unit {
    /// All units offered to clients, in picker order
    pub const KNOWN: [Unit; 10] = [
        Unit::Gram,
        Unit::Milliliter,
        Unit::Ounce,
        Unit::Pound,
        Unit::Cup,
        Unit::Tablespoon,
        Unit::Teaspoon,
        Unit::Serving,
        Unit::Piece,
        Unit::Slice,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Unit::Gram => "g",
            Unit::Milliliter => "ml",
            Unit::Ounce => "oz",
            Unit::Pound => "lb",
            Unit::Cup => "cup",
            Unit::Tablespoon => "tbsp",
            Unit::Teaspoon => "tsp",
            Unit::Serving => "serving",
            Unit::Piece => "piece",
            Unit::Slice => "slice",
            Unit::Other(s) => s.as_str(),
        }
    }

    /// Parse a canonical unit tag. Unknown tags are tolerated, not rejected.
    pub fn from_str(s: &str) -> Self {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "g" => Unit::Gram,
            "ml" => Unit::Milliliter,
            "oz" => Unit::Ounce,
            "lb" => Unit::Pound,
            "cup" => Unit::Cup,
            "tbsp" => Unit::Tablespoon,
            "tsp" => Unit::Teaspoon,
            "serving" => Unit::Serving,
            "piece" => Unit::Piece,
            "slice" => Unit::Slice,
            _ => Unit::Other(lower),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Unit::Other(_))
    }

    /// Map a free-text unit word to a canonical unit
    ///
    /// Only names the unit; magnitudes are never converted, so "2 kg" becomes
    /// 2 g. Returns None for words that are not unit synonyms.
    pub fn from_synonym(word: &str) -> Option<Self> {
        let lower = word.trim().trim_end_matches('.').to_lowercase();
        match lower.as_str() {
            "g" | "gram" | "grams" => Some(Unit::Gram),
            "kg" | "kilogram" | "kilograms" => Some(Unit::Gram),
            "ml" | "milliliter" | "milliliters" => Some(Unit::Milliliter),
            "l" | "liter" | "liters" => Some(Unit::Milliliter),
            "tbsp" | "tablespoon" | "tablespoons" => Some(Unit::Tablespoon),
            "tsp" | "teaspoon" | "teaspoons" => Some(Unit::Teaspoon),
            "cup" | "cups" => Some(Unit::Cup),
            "oz" | "ounce" | "ounces" => Some(Unit::Ounce),
            "piece" | "pieces" => Some(Unit::Piece),
            "serving" | "servings" => Some(Unit::Serving),
            _ => None,
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::Serving
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Unit::from_str(&s))
    }
}

// ============================================================================
// Quantity Limits
// ============================================================================

/// Maximum quantity per unit before an ingredient is clamped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitCaps {
    pub g: f64,
    pub ml: f64,
    pub oz: f64,
    pub lb: f64,
    pub cup: f64,
    pub tbsp: f64,
    pub tsp: f64,
    pub serving: f64,
    pub piece: f64,
    pub slice: f64,
    /// Applied to any unit outside the known set
    pub unrecognized: f64,
}

impl Default for UnitCaps {
    fn default() -> Self {
        Self {
            g: 2000.0,
            ml: 2000.0,
            oz: 70.0,
            lb: 4.4,
            cup: 8.0,
            tbsp: 32.0,
            tsp: 96.0,
            serving: 10.0,
            piece: 50.0,
            slice: 50.0,
            unrecognized: 10.0,
        }
    }
}

impl UnitCaps {
    /// Get the maximum allowed quantity for a unit
    pub fn max_quantity(&self, unit: &Unit) -> f64 {
        match unit {
            Unit::Gram => self.g,
            Unit::Milliliter => self.ml,
            Unit::Ounce => self.oz,
            Unit::Pound => self.lb,
            Unit::Cup => self.cup,
            Unit::Tablespoon => self.tbsp,
            Unit::Teaspoon => self.tsp,
            Unit::Serving => self.serving,
            Unit::Piece => self.piece,
            Unit::Slice => self.slice,
            Unit::Other(_) => self.unrecognized,
        }
    }

    pub(crate) fn entries(&self) -> [(&'static str, f64); 11] {
        [
            ("g", self.g),
            ("ml", self.ml),
            ("oz", self.oz),
            ("lb", self.lb),
            ("cup", self.cup),
            ("tbsp", self.tbsp),
            ("tsp", self.tsp),
            ("serving", self.serving),
            ("piece", self.piece),
            ("slice", self.slice),
            ("unrecognized", self.unrecognized),
        ]
    }
}
