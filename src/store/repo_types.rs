use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::analytics::bucketing::Timestamped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            other => anyhow::bail!("unknown meal type '{}'", other),
        }
    }
}

/// A single food logged by a user at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedMeal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_id: Uuid,
    pub meal_type: MealType,
    pub servings: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
}

impl Timestamped for LoggedMeal {
    fn timestamp(&self) -> OffsetDateTime {
        self.logged_at
    }
}

#[derive(Debug, FromRow)]
pub struct LoggedMealRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_id: Uuid,
    pub meal_type: String,
    pub servings: f64,
    pub logged_at: OffsetDateTime,
}

impl TryFrom<LoggedMealRow> for LoggedMeal {
    type Error = anyhow::Error;

    fn try_from(r: LoggedMealRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            food_id: r.food_id,
            meal_type: r.meal_type.parse()?,
            servings: r.servings,
            logged_at: r.logged_at,
        })
    }
}

/// Per-serving nutrition facts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FoodItem {
    pub id: Uuid,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub serving_size: f64,
    pub serving_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub reward: i64,
}

/// Append-only record of one "plan completed" action.
#[derive(Debug, Clone)]
pub struct WorkoutCompletionEvent {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub completed_at: Date,
    pub exercises_completed: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStreakState {
    pub user_id: Uuid,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_workout_date: Option<Date>,
}

impl UserStreakState {
    /// State of a user who has never completed a workout.
    pub fn fresh(user_id: Uuid) -> Self {
        Self {
            user_id,
            current_streak: 0,
            longest_streak: 0,
            last_workout_date: None,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct UserStreakRow {
    pub user_id: Uuid,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_workout_date: Option<Date>,
}

impl TryFrom<UserStreakRow> for UserStreakState {
    type Error = anyhow::Error;

    fn try_from(r: UserStreakRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: r.user_id,
            current_streak: u32::try_from(r.current_streak)?,
            longest_streak: u32::try_from(r.longest_streak)?,
            last_workout_date: r.last_workout_date,
        })
    }
}
