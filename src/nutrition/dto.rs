use serde::{Deserialize, Serialize};

use crate::analytics::macros::{MacroProgress, MacroTarget};
use crate::analytics::scoring::WeeklyScore;

/// Optional per-field target override taken from the query string.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct TargetOverride {
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

impl TargetOverride {
    pub fn apply(&self, base: MacroTarget) -> MacroTarget {
        MacroTarget {
            calories: self.calories.unwrap_or(base.calories),
            protein: self.protein.unwrap_or(base.protein),
            carbs: self.carbs.unwrap_or(base.carbs),
            fat: self.fat.unwrap_or(base.fat),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    pub date: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

impl DailyQuery {
    pub fn target_override(&self) -> TargetOverride {
        TargetOverride {
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WeeklyQuery {
    /// Last day of the week, inclusive. Defaults to today (UTC).
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub year: i32,
    pub month: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionSummary {
    pub date: String,
    pub calories: MacroProgress,
    pub protein: MacroProgress,
    pub carbs: MacroProgress,
    pub fat: MacroProgress,
    pub meal_count: usize,
    pub score: u8,
    /// Meals whose food could not be found; they contributed nothing.
    pub missing_foods: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyNutritionData {
    pub start_date: String,
    pub end_date: String,
    #[serde(flatten)]
    pub week: WeeklyScore,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthDay {
    pub date: String,
    pub meals: usize,
    pub calories: f64,
    pub score: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyOverview {
    pub year: i32,
    pub month: u8,
    /// Only days with at least one meal.
    pub days: Vec<MonthDay>,
}
