use std::collections::HashSet;

use time::{Date, OffsetDateTime};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::dto::{MonthDay, MonthlyOverview, NutritionSummary, TargetOverride, WeeklyNutritionData};
use crate::analytics::bucketing::{
    bucket_by_day, bucket_zero_filled, iso_date, utc_date, DateWindow,
};
use crate::analytics::macros::{round1, sum_macros, FoodIndex, MacroAggregate, MacroTarget};
use crate::analytics::scoring::{score_totals, weekly_score};
use crate::analytics::timing::{analyze, MealTimingInsights};
use crate::error::{AppError, AppResult};
use crate::store::repo_types::LoggedMeal;
use crate::store::FitnessStore;

/// Days covered by the weekly score and the timing insights.
pub const TRAILING_DAYS: u8 = 7;

/// Request override, then the user's goal, then `fallback`, field by field.
pub async fn resolve_target(
    store: &dyn FitnessStore,
    user_id: Uuid,
    overrides: TargetOverride,
    fallback: MacroTarget,
) -> AppResult<MacroTarget> {
    let base = store.macro_target(user_id).await?.unwrap_or(fallback);
    let target = overrides.apply(base);
    target.validate()?;
    Ok(target)
}

async fn load_foods(store: &dyn FitnessStore, meals: &[LoggedMeal]) -> AppResult<FoodIndex> {
    let ids: HashSet<Uuid> = meals.iter().map(|m| m.food_id).collect();
    let foods = store.food_items_by_ids(&ids).await?;
    Ok(FoodIndex::from(foods))
}

/// A score is a mean of ratios against the target; with nothing to divide by it is meaningless.
fn ensure_scorable(target: &MacroTarget) -> AppResult<()> {
    if target.calories == 0.0 && target.protein == 0.0 && target.carbs == 0.0 && target.fat == 0.0 {
        return Err(AppError::invalid("target needs at least one positive field to score against"));
    }
    Ok(())
}

#[instrument(skip(store, target))]
pub async fn compute_daily_macros(
    store: &dyn FitnessStore,
    user_id: Uuid,
    date: Date,
    target: MacroTarget,
) -> AppResult<NutritionSummary> {
    target.validate()?;
    let meals = store.logged_meals(user_id, DateWindow::Day(date)).await?;
    let foods = load_foods(store, &meals).await?;

    let (totals, missing_foods) = sum_macros(&meals, &foods)?;
    let agg = MacroAggregate::from_totals(&totals, missing_foods, &target);
    let score = score_totals(&totals, &meals, &target);
    debug!(%user_id, meals = meals.len(), score, "daily macros computed");

    Ok(NutritionSummary {
        date: iso_date(date),
        calories: agg.calories,
        protein: agg.protein,
        carbs: agg.carbs,
        fat: agg.fat,
        meal_count: meals.len(),
        score,
        missing_foods: agg.missing_foods,
    })
}

/// Scores the `TRAILING_DAYS` UTC days ending at `last_day`.
#[instrument(skip(store, target))]
pub async fn compute_weekly_score(
    store: &dyn FitnessStore,
    user_id: Uuid,
    last_day: Date,
    target: MacroTarget,
) -> AppResult<WeeklyNutritionData> {
    target.validate()?;
    ensure_scorable(&target)?;
    let window = DateWindow::trailing_days(last_day, TRAILING_DAYS)?;
    let (start, end) = window.bounds()?;

    let meals = store.logged_meals(user_id, window).await?;
    let foods = load_foods(store, &meals).await?;
    let buckets = bucket_zero_filled(&meals, &window)?;
    let week = weekly_score(&buckets, &foods, &target)?;
    debug!(%user_id, score = week.score, balanced = week.balanced_days, "weekly score computed");

    Ok(WeeklyNutritionData {
        start_date: iso_date(start),
        end_date: iso_date(end.previous_day().unwrap_or(start)),
        week,
    })
}

#[instrument(skip(store, target))]
pub async fn compute_monthly_overview(
    store: &dyn FitnessStore,
    user_id: Uuid,
    year: i32,
    month: u8,
    target: MacroTarget,
) -> AppResult<MonthlyOverview> {
    target.validate()?;
    ensure_scorable(&target)?;
    let window = DateWindow::month(year, month)?;

    let meals = store.logged_meals(user_id, window).await?;
    let foods = load_foods(store, &meals).await?;
    let buckets = bucket_by_day(&meals, &window)?;

    let mut days = Vec::with_capacity(buckets.len());
    for (date, day_meals) in &buckets {
        let (totals, _) = sum_macros(day_meals.iter().copied(), &foods)?;
        days.push(MonthDay {
            date: date.clone(),
            meals: day_meals.len(),
            calories: round1(totals.calories),
            score: score_totals(&totals, day_meals.iter().copied(), &target),
        });
    }

    Ok(MonthlyOverview { year, month, days })
}

/// Timing insights over the `TRAILING_DAYS` UTC days ending on `now`'s date.
#[instrument(skip(store))]
pub async fn compute_meal_timing_insights(
    store: &dyn FitnessStore,
    user_id: Uuid,
    now: OffsetDateTime,
) -> AppResult<MealTimingInsights> {
    let window = DateWindow::trailing_days(utc_date(now), TRAILING_DAYS)?;
    let meals = store.logged_meals(user_id, window).await?;
    Ok(analyze(&meals, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::macros::tests::food;
    use crate::analytics::scoring::Trend;
    use crate::store::memory::InMemoryStore;
    use crate::store::repo_types::MealType;
    use time::macros::{date, datetime};
    use time::Duration;

    fn target() -> MacroTarget {
        MacroTarget {
            calories: 2000.0,
            protein: 150.0,
            carbs: 250.0,
            fat: 75.0,
        }
    }

    fn log(store: &InMemoryStore, user_id: Uuid, food_id: Uuid, meal_type: MealType, at: OffsetDateTime) {
        store
            .insert_meal(LoggedMeal {
                id: Uuid::new_v4(),
                user_id,
                food_id,
                meal_type,
                servings: 1.0,
                logged_at: at,
            })
            .unwrap();
    }

    #[tokio::test]
    async fn end_to_end_single_day() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let f = food(100.0, 10.0, 10.0, 5.0);
        store.insert_food(f.clone()).unwrap();
        log(&store, user, f.id, MealType::Breakfast, datetime!(2024-03-01 08:05 UTC));
        log(&store, user, f.id, MealType::Breakfast, datetime!(2024-03-01 08:40 UTC));
        log(&store, user, f.id, MealType::Lunch, datetime!(2024-03-01 13:00 UTC));
        log(&store, user, f.id, MealType::Dinner, datetime!(2024-03-01 19:00 UTC));
        // someone else's meal must not leak in
        log(&store, Uuid::new_v4(), f.id, MealType::Dinner, datetime!(2024-03-01 19:00 UTC));

        let daily = compute_daily_macros(&store, user, date!(2024-03-01), target())
            .await
            .unwrap();
        assert_eq!(daily.calories.current, 400.0);
        assert_eq!(daily.protein.current, 40.0);
        assert_eq!(daily.calories.percentage, 20.0);
        assert_eq!(daily.meal_count, 4);
        assert_eq!(daily.missing_foods, 0);

        let timing = compute_meal_timing_insights(&store, user, datetime!(2024-03-01 20:00 UTC))
            .await
            .unwrap();
        assert_eq!(timing.most_active_eating_time, "8:00 AM");
        assert_eq!(timing.average_meals_per_day, 4.0);
        assert_eq!(timing.longest_gap_between_meals, 6.0);
        assert_eq!(timing.last_meal_time, "1 hour ago");
    }

    #[tokio::test]
    async fn user_without_activity_gets_zero_results() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();

        let daily = compute_daily_macros(&store, user, date!(2024-03-01), target())
            .await
            .unwrap();
        assert_eq!(daily.score, 0);
        assert_eq!(daily.calories.current, 0.0);

        let week = compute_weekly_score(&store, user, date!(2024-03-07), target())
            .await
            .unwrap();
        assert_eq!(week.week.score, 0);
        assert_eq!(week.week.total_days, 7);
        assert_eq!(week.start_date, "2024-03-01");
        assert_eq!(week.end_date, "2024-03-07");

        let timing = compute_meal_timing_insights(&store, user, datetime!(2024-03-07 12:00 UTC))
            .await
            .unwrap();
        assert_eq!(timing, MealTimingInsights::empty());

        let month = compute_monthly_overview(&store, user, 2024, 3, target())
            .await
            .unwrap();
        assert!(month.days.is_empty());
    }

    #[tokio::test]
    async fn weekly_only_counts_days_inside_window() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let f = food(500.0, 37.5, 62.5, 18.75);
        store.insert_food(f.clone()).unwrap();
        let first = datetime!(2024-03-01 12:00 UTC);
        for day in 0..7 {
            log(&store, user, f.id, MealType::Lunch, first + Duration::days(day));
        }
        // outside the window on both sides
        log(&store, user, f.id, MealType::Lunch, datetime!(2024-02-29 12:00 UTC));
        log(&store, user, f.id, MealType::Lunch, datetime!(2024-03-08 12:00 UTC));

        let week = compute_weekly_score(&store, user, date!(2024-03-07), target())
            .await
            .unwrap();
        assert_eq!(week.week.score, 30);
        assert!(week.week.days.iter().all(|d| d.meals == 1));
        assert_eq!(week.week.trend, Trend::Stable);
        assert!(week.week.score <= 100);
        assert!(week.week.balanced_days <= week.week.total_days);
    }

    #[tokio::test]
    async fn missing_food_is_a_warning_not_an_error() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let f = food(100.0, 10.0, 10.0, 5.0);
        store.insert_food(f.clone()).unwrap();
        log(&store, user, f.id, MealType::Lunch, datetime!(2024-03-01 12:00 UTC));
        log(&store, user, Uuid::new_v4(), MealType::Dinner, datetime!(2024-03-01 18:00 UTC));

        let daily = compute_daily_macros(&store, user, date!(2024-03-01), target())
            .await
            .unwrap();
        assert_eq!(daily.calories.current, 100.0);
        assert_eq!(daily.meal_count, 2);
        assert_eq!(daily.missing_foods, 1);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn missing_food_is_warned_once_per_daily_summary() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        log(&store, user, Uuid::new_v4(), MealType::Dinner, datetime!(2024-03-01 18:00 UTC));

        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        let daily = tracing::subscriber::with_default(subscriber, || {
            rt.block_on(compute_daily_macros(&store, user, date!(2024-03-01), target()))
        })
        .unwrap();
        assert_eq!(daily.missing_foods, 1);

        let out = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(out.matches("references unknown food").count(), 1);
    }

    #[tokio::test]
    async fn monthly_lists_only_days_with_meals() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let f = food(250.0, 10.0, 10.0, 5.0);
        store.insert_food(f.clone()).unwrap();
        log(&store, user, f.id, MealType::Breakfast, datetime!(2024-02-03 07:00 UTC));
        log(&store, user, f.id, MealType::Dinner, datetime!(2024-02-03 19:00 UTC));
        log(&store, user, f.id, MealType::Lunch, datetime!(2024-02-29 12:00 UTC));
        log(&store, user, f.id, MealType::Lunch, datetime!(2024-03-01 12:00 UTC));

        let month = compute_monthly_overview(&store, user, 2024, 2, target())
            .await
            .unwrap();
        assert_eq!(month.days.len(), 2);
        assert_eq!(month.days[0].date, "2024-02-03");
        assert_eq!(month.days[0].meals, 2);
        assert_eq!(month.days[0].calories, 500.0);
        assert_eq!(month.days[1].date, "2024-02-29");
    }

    #[tokio::test]
    async fn invalid_targets_are_rejected() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();

        let negative = MacroTarget {
            protein: -1.0,
            ..target()
        };
        let err = compute_daily_macros(&store, user, date!(2024-03-01), negative)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let zero = MacroTarget {
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
        };
        let err = compute_weekly_score(&store, user, date!(2024-03-07), zero)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = compute_monthly_overview(&store, user, 2024, 0, target())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn target_resolution_order() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let fallback = target();

        let t = resolve_target(&store, user, TargetOverride::default(), fallback)
            .await
            .unwrap();
        assert_eq!(t, fallback);

        let goal = MacroTarget {
            calories: 1800.0,
            protein: 120.0,
            carbs: 200.0,
            fat: 60.0,
        };
        store.set_goal(user, goal).unwrap();
        let overrides = TargetOverride {
            protein: Some(180.0),
            ..TargetOverride::default()
        };
        let t = resolve_target(&store, user, overrides, fallback).await.unwrap();
        assert_eq!(t.protein, 180.0);
        assert_eq!(t.calories, 1800.0);

        let bad = TargetOverride {
            fat: Some(-3.0),
            ..TargetOverride::default()
        };
        assert!(resolve_target(&store, user, bad, fallback).await.is_err());
    }
}
