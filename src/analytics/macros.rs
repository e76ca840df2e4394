//! Macro totals across logged meals, compared against a target.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::repo_types::{FoodItem, LoggedMeal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroTarget {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroTarget {
    pub fn validate(&self) -> AppResult<()> {
        for (name, value) in self.fields() {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::invalid(format!(
                    "target {} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacroProgress {
    pub current: f64,
    pub target: f64,
    pub percentage: f64,
}

impl MacroProgress {
    fn new(current: f64, target: f64) -> Self {
        Self {
            current: round1(current),
            target: round1(target),
            percentage: round1(percent_of(current, target)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacroAggregate {
    pub calories: MacroProgress,
    pub protein: MacroProgress,
    pub carbs: MacroProgress,
    pub fat: MacroProgress,
    /// Meals skipped because their food row was not found.
    pub missing_foods: usize,
}

impl MacroAggregate {
    pub fn from_totals(totals: &MacroTotals, missing_foods: usize, target: &MacroTarget) -> Self {
        Self {
            calories: MacroProgress::new(totals.calories, target.calories),
            protein: MacroProgress::new(totals.protein, target.protein),
            carbs: MacroProgress::new(totals.carbs, target.carbs),
            fat: MacroProgress::new(totals.fat, target.fat),
            missing_foods,
        }
    }
}

/// Food rows keyed by id.
#[derive(Debug, Default, Clone)]
pub struct FoodIndex(HashMap<Uuid, FoodItem>);

impl FoodIndex {
    pub fn get(&self, id: &Uuid) -> Option<&FoodItem> {
        self.0.get(id)
    }
}

impl From<Vec<FoodItem>> for FoodIndex {
    fn from(items: Vec<FoodItem>) -> Self {
        Self(items.into_iter().map(|f| (f.id, f)).collect())
    }
}

/// Round half up to one decimal. Inputs are non-negative, so `round` (half away from zero) matches.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `100 * current / target`, or 0 when the target is 0.
pub fn percent_of(current: f64, target: f64) -> f64 {
    if target > 0.0 {
        100.0 * current / target
    } else {
        0.0
    }
}

/// Unrounded sums of servings-scaled macros, plus the number of meals whose food was missing.
pub fn sum_macros<'a>(
    meals: impl IntoIterator<Item = &'a LoggedMeal>,
    foods: &FoodIndex,
) -> AppResult<(MacroTotals, usize)> {
    let mut totals = MacroTotals::default();
    let mut missing = 0;
    for meal in meals {
        if !meal.servings.is_finite() || meal.servings < 0.0 {
            return Err(AppError::invalid(format!(
                "meal {} has invalid servings {}",
                meal.id, meal.servings
            )));
        }
        let Some(food) = foods.get(&meal.food_id) else {
            warn!(
                user_id = %meal.user_id,
                meal_id = %meal.id,
                food_id = %meal.food_id,
                "logged meal references unknown food; counted as zero"
            );
            missing += 1;
            continue;
        };
        totals.calories += food.calories * meal.servings;
        totals.protein += food.protein * meal.servings;
        totals.carbs += food.carbs * meal.servings;
        totals.fat += food.fat * meal.servings;
    }
    Ok((totals, missing))
}

pub fn aggregate<'a>(
    meals: impl IntoIterator<Item = &'a LoggedMeal>,
    foods: &FoodIndex,
    target: &MacroTarget,
) -> AppResult<MacroAggregate> {
    let (totals, missing_foods) = sum_macros(meals, foods)?;
    Ok(MacroAggregate::from_totals(&totals, missing_foods, target))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::repo_types::MealType;
    use time::macros::datetime;

    pub(crate) fn food(calories: f64, protein: f64, carbs: f64, fat: f64) -> FoodItem {
        FoodItem {
            id: Uuid::new_v4(),
            name: "test food".into(),
            calories,
            protein,
            carbs,
            fat,
            serving_size: 100.0,
            serving_unit: "g".into(),
        }
    }

    pub(crate) fn meal(food_id: Uuid, servings: f64) -> LoggedMeal {
        LoggedMeal {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            food_id,
            meal_type: MealType::Lunch,
            servings,
            logged_at: datetime!(2024-03-01 12:00 UTC),
        }
    }

    fn target() -> MacroTarget {
        MacroTarget {
            calories: 2000.0,
            protein: 150.0,
            carbs: 250.0,
            fat: 75.0,
        }
    }

    #[test]
    fn scales_by_servings_and_sums() {
        let f = food(100.0, 10.0, 10.0, 5.0);
        let meals = vec![meal(f.id, 1.0), meal(f.id, 2.0)];
        let foods = FoodIndex::from(vec![f]);

        let agg = aggregate(&meals, &foods, &target()).unwrap();
        assert_eq!(agg.calories.current, 300.0);
        assert_eq!(agg.protein.current, 30.0);
        assert_eq!(agg.fat.current, 15.0);
        assert_eq!(agg.calories.percentage, 15.0);
        assert_eq!(agg.missing_foods, 0);
    }

    #[test]
    fn rounds_half_up_to_one_decimal() {
        let f = food(10.25, 1.25, 0.0, 0.0);
        let meals = vec![meal(f.id, 1.5), meal(f.id, 1.5)];
        let foods = FoodIndex::from(vec![f]);

        let agg = aggregate(&meals, &foods, &target()).unwrap();
        // 10.25 * 3 = 30.75
        assert_eq!(agg.calories.current, 30.8);
        // 1.25 * 3 = 3.75
        assert_eq!(agg.protein.current, 3.8);
        // 3.75 / 150 = 2.5%
        assert_eq!(agg.protein.percentage, 2.5);
        assert_eq!(agg.carbs.current, 0.0);
    }

    #[test]
    fn zero_target_yields_zero_percentage() {
        let f = food(100.0, 10.0, 10.0, 5.0);
        let meals = vec![meal(f.id, 1.0)];
        let foods = FoodIndex::from(vec![f]);
        let t = MacroTarget {
            protein: 0.0,
            ..target()
        };

        let agg = aggregate(&meals, &foods, &t).unwrap();
        assert_eq!(agg.protein.percentage, 0.0);
        assert!(agg.protein.percentage.is_finite());
        assert_eq!(agg.protein.current, 10.0);
    }

    #[test]
    fn missing_food_counts_as_zero() {
        let f = food(100.0, 10.0, 10.0, 5.0);
        let meals = vec![meal(f.id, 1.0), meal(Uuid::new_v4(), 3.0)];
        let foods = FoodIndex::from(vec![f]);

        let agg = aggregate(&meals, &foods, &target()).unwrap();
        assert_eq!(agg.calories.current, 100.0);
        assert_eq!(agg.missing_foods, 1);
    }

    #[test]
    fn negative_servings_are_rejected() {
        let f = food(100.0, 10.0, 10.0, 5.0);
        let meals = vec![meal(f.id, -1.0)];
        let foods = FoodIndex::from(vec![f]);

        let err = aggregate(&meals, &foods, &target()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn target_validation() {
        assert!(target().validate().is_ok());
        let bad = MacroTarget {
            fat: -5.0,
            ..target()
        };
        assert!(bad.validate().is_err());
        let nan = MacroTarget {
            calories: f64::NAN,
            ..target()
        };
        assert!(nan.validate().is_err());
    }
}
