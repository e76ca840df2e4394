//! 0-100 nutrition balance scores.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use super::macros::{percent_of, sum_macros, FoodIndex, MacroTarget, MacroTotals};
use crate::error::AppResult;
use crate::store::repo_types::LoggedMeal;

/// Days scoring at or above this count as balanced.
pub const BALANCED_DAY_THRESHOLD: u8 = 70;
/// Mean difference (in points) between the two halves of a week needed to call a trend.
const TREND_MARGIN: f64 = 5.0;
const VARIETY_POINTS_PER_TYPE: f64 = 5.0;
const VARIETY_CAP: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayScore {
    pub date: String,
    pub meals: usize,
    /// `None` for days without meals.
    pub score: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyScore {
    pub score: u8,
    pub balanced_days: usize,
    pub total_days: usize,
    pub trend: Trend,
    pub days: Vec<DayScore>,
}

pub fn daily_score<'a>(
    meals: impl IntoIterator<Item = &'a LoggedMeal>,
    foods: &FoodIndex,
    target: &MacroTarget,
) -> AppResult<u8> {
    let meals: Vec<&LoggedMeal> = meals.into_iter().collect();
    let (totals, _) = sum_macros(meals.iter().copied(), foods)?;
    Ok(score_totals(&totals, meals, target))
}

/// [`daily_score`] for callers that already summed the day's macros.
pub fn score_totals<'a>(
    totals: &MacroTotals,
    meals: impl IntoIterator<Item = &'a LoggedMeal>,
    target: &MacroTarget,
) -> u8 {
    let ratios = [
        percent_of(totals.protein, target.protein).min(100.0),
        percent_of(totals.carbs, target.carbs).min(100.0),
        percent_of(totals.fat, target.fat).min(100.0),
        percent_of(totals.calories, target.calories).min(100.0),
    ];
    let achievement = ratios.iter().sum::<f64>() / ratios.len() as f64;

    let meal_types: HashSet<_> = meals.into_iter().map(|m| m.meal_type).collect();
    let variety = (VARIETY_POINTS_PER_TYPE * meal_types.len() as f64).min(VARIETY_CAP);

    to_score(achievement + variety)
}

/// Scores a zero-filled map of day buckets. Days without meals are left out of the
/// average rather than counted as 0.
pub fn weekly_score(
    buckets: &BTreeMap<String, Vec<&LoggedMeal>>,
    foods: &FoodIndex,
    target: &MacroTarget,
) -> AppResult<WeeklyScore> {
    let mut days = Vec::with_capacity(buckets.len());
    let mut scored = Vec::new();
    for (date, meals) in buckets {
        let score = if meals.is_empty() {
            None
        } else {
            let s = daily_score(meals.iter().copied(), foods, target)?;
            scored.push(f64::from(s));
            Some(s)
        };
        days.push(DayScore {
            date: date.clone(),
            meals: meals.len(),
            score,
        });
    }

    let balanced_days = days
        .iter()
        .filter(|d| d.score.is_some_and(|s| s >= BALANCED_DAY_THRESHOLD))
        .count();

    Ok(WeeklyScore {
        score: mean(&scored).map(to_score).unwrap_or(0),
        balanced_days,
        total_days: days.len(),
        trend: trend(&scored),
        days,
    })
}

/// Compares the first and second half of the scored days. With an odd count the
/// middle day belongs to the second half.
fn trend(scores: &[f64]) -> Trend {
    if scores.len() < 2 {
        return Trend::Stable;
    }
    let (first, second) = scores.split_at(scores.len() / 2);
    match (mean(first), mean(second)) {
        (Some(a), Some(b)) if b - a > TREND_MARGIN => Trend::Up,
        (Some(a), Some(b)) if a - b > TREND_MARGIN => Trend::Down,
        _ => Trend::Stable,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn to_score(raw: f64) -> u8 {
    raw.clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::bucketing::{bucket_zero_filled, DateWindow};
    use crate::analytics::macros::tests::{food, meal};
    use crate::store::repo_types::MealType;
    use time::macros::date;
    use time::{Duration, OffsetDateTime};

    fn target() -> MacroTarget {
        MacroTarget {
            calories: 2000.0,
            protein: 150.0,
            carbs: 250.0,
            fat: 75.0,
        }
    }

    fn logged(
        food_id: uuid::Uuid,
        servings: f64,
        meal_type: MealType,
        at: OffsetDateTime,
    ) -> LoggedMeal {
        LoggedMeal {
            meal_type,
            logged_at: at,
            ..meal(food_id, servings)
        }
    }

    #[test]
    fn perfect_day_with_variety_caps_at_100() {
        let f = food(500.0, 37.5, 62.5, 18.75);
        let foods = FoodIndex::from(vec![f.clone()]);
        let at = date!(2024-03-01).midnight().assume_utc();
        let meals: Vec<_> = [MealType::Breakfast, MealType::Lunch, MealType::Dinner, MealType::Snack]
            .into_iter()
            .map(|t| logged(f.id, 1.0, t, at))
            .collect();

        assert_eq!(daily_score(&meals, &foods, &target()).unwrap(), 100);
    }

    #[test]
    fn ratios_are_capped_per_macro() {
        // 4x the protein goal, nothing else: protein ratio is 100, not 400
        let f = food(0.0, 600.0, 0.0, 0.0);
        let foods = FoodIndex::from(vec![f.clone()]);
        let meals = vec![meal(f.id, 1.0)];

        // (100 + 0 + 0 + 0) / 4 + 5 variety
        assert_eq!(daily_score(&meals, &foods, &target()).unwrap(), 30);
    }

    #[test]
    fn empty_day_scores_zero() {
        let foods = FoodIndex::default();
        let meals: Vec<LoggedMeal> = Vec::new();
        assert_eq!(daily_score(&meals, &foods, &target()).unwrap(), 0);
    }

    #[test]
    fn weekly_skips_days_without_meals() {
        let f = food(500.0, 37.5, 62.5, 18.75);
        let foods = FoodIndex::from(vec![f.clone()]);
        let day1 = date!(2024-03-01).midnight().assume_utc() + Duration::hours(9);
        let day3 = day1 + Duration::days(2);
        // two days, each 25% of every target plus one meal type: 25 + 5 = 30
        let meals = vec![
            logged(f.id, 1.0, MealType::Lunch, day1),
            logged(f.id, 1.0, MealType::Lunch, day3),
        ];
        let window = DateWindow::trailing_days(date!(2024-03-07), 7).unwrap();
        let buckets = bucket_zero_filled(&meals, &window).unwrap();

        let week = weekly_score(&buckets, &foods, &target()).unwrap();
        assert_eq!(week.score, 30);
        assert_eq!(week.total_days, 7);
        assert_eq!(week.balanced_days, 0);
        assert_eq!(week.trend, Trend::Stable);
        assert_eq!(week.days.iter().filter(|d| d.score.is_none()).count(), 5);
    }

    #[test]
    fn weekly_trend_and_balanced_days() {
        let f = food(500.0, 37.5, 62.5, 18.75);
        let foods = FoodIndex::from(vec![f.clone()]);
        let start = date!(2024-03-01).midnight().assume_utc() + Duration::hours(12);
        let mut meals = Vec::new();
        // days 0-1: one serving (30); days 2-3: four servings, all meal types (100)
        for day in 0..4 {
            let at = start + Duration::days(day);
            if day < 2 {
                meals.push(logged(f.id, 1.0, MealType::Lunch, at));
            } else {
                for t in [MealType::Breakfast, MealType::Lunch, MealType::Dinner, MealType::Snack] {
                    meals.push(logged(f.id, 1.0, t, at));
                }
            }
        }
        let window = DateWindow::trailing_days(date!(2024-03-07), 7).unwrap();
        let buckets = bucket_zero_filled(&meals, &window).unwrap();

        let week = weekly_score(&buckets, &foods, &target()).unwrap();
        assert_eq!(week.score, 65);
        assert_eq!(week.balanced_days, 2);
        assert_eq!(week.trend, Trend::Up);
        assert!(week.balanced_days <= week.total_days);
    }

    #[test]
    fn trend_splits_odd_counts_with_middle_in_second_half() {
        assert_eq!(trend(&[50.0]), Trend::Stable);
        assert_eq!(trend(&[80.0, 70.0, 70.0]), Trend::Down);
        assert_eq!(trend(&[60.0, 64.0, 66.0]), Trend::Stable);
        assert_eq!(trend(&[60.0, 70.0, 68.0]), Trend::Up);
    }

    #[test]
    fn empty_week_is_zero_and_stable() {
        let foods = FoodIndex::default();
        let meals: Vec<LoggedMeal> = Vec::new();
        let window = DateWindow::trailing_days(date!(2024-03-07), 7).unwrap();
        let buckets = bucket_zero_filled(&meals, &window).unwrap();

        let week = weekly_score(&buckets, &foods, &target()).unwrap();
        assert_eq!(week.score, 0);
        assert_eq!(week.balanced_days, 0);
        assert_eq!(week.total_days, 7);
        assert_eq!(week.trend, Trend::Stable);
    }
}
