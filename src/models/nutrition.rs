//! Shared macro data structure
//!
//! Used across food items, ingredients, meals, and plans.

use serde::{Deserialize, Serialize};

/// The four tracked macros
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64, // grams
    #[serde(default)]
    pub carbs: f64, // grams
    #[serde(default)]
    pub fats: f64, // grams
}

impl Macros {
    pub fn new(calories: f64, protein: f64, carbs: f64, fats: f64) -> Self {
        Self { calories, protein, carbs, fats }
    }

    /// Create a new Macros with all zeros
    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale macro values by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        Self {
            calories: self.calories * multiplier,
            protein: self.protein * multiplier,
            carbs: self.carbs * multiplier,
            fats: self.fats * multiplier,
        }
    }

    /// Add another set of macros to this one
    pub fn add(&self, other: &Macros) -> Self {
        Self {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fats: self.fats + other.fats,
        }
    }

    /// Round for display: calories to an integer, the rest to one decimal
    pub fn rounded(&self) -> Self {
        Self {
            calories: self.calories.round(),
            protein: round1(self.protein),
            carbs: round1(self.carbs),
            fats: round1(self.fats),
        }
    }

    /// Clamp every field to be at least zero (also folds -0.0 into 0.0)
    pub fn non_negative(&self) -> Self {
        Self {
            calories: self.calories.max(0.0) + 0.0,
            protein: self.protein.max(0.0) + 0.0,
            carbs: self.carbs.max(0.0) + 0.0,
            fats: self.fats.max(0.0) + 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.calories.is_finite()
            && self.protein.is_finite()
            && self.carbs.is_finite()
            && self.fats.is_finite()
    }

    pub fn has_negative(&self) -> bool {
        self.calories < 0.0 || self.protein < 0.0 || self.carbs < 0.0 || self.fats < 0.0
    }
}

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl std::ops::Add for Macros {
    type Output = Macros;

    fn add(self, other: Macros) -> Macros {
        Macros::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for Macros {
    type Output = Macros;

    fn mul(self, multiplier: f64) -> Macros {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for Macros {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Macros::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_and_sum() {
        let a = Macros::new(100.0, 10.0, 5.0, 2.0);
        let b = a * 2.0;
        assert_eq!(b, Macros::new(200.0, 20.0, 10.0, 4.0));

        let total: Macros = vec![a, b].into_iter().sum();
        assert_eq!(total, Macros::new(300.0, 30.0, 15.0, 6.0));
    }

    #[test]
    fn test_rounded() {
        let m = Macros::new(247.5, 46.49, 0.04, 5.4000000000000004).rounded();
        assert_eq!(m.calories, 248.0);
        assert_eq!(m.protein, 46.5);
        assert_eq!(m.carbs, 0.0);
        assert_eq!(m.fats, 5.4);
    }

    #[test]
    fn test_non_negative() {
        let m = Macros::new(-0.0, -1.0, 3.0, 0.0).non_negative();
        assert_eq!(m, Macros::new(0.0, 0.0, 3.0, 0.0));
        assert!(m.calories.is_sign_positive());
    }

    #[test]
    fn test_missing_fields_deserialize_as_zero() {
        let m: Macros = serde_json::from_str(r#"{"calories": 120}"#).unwrap();
        assert_eq!(m, Macros::new(120.0, 0.0, 0.0, 0.0));
    }
}
