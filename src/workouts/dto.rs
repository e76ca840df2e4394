use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analytics::streak::MilestoneProgress;

#[derive(Debug, Deserialize)]
pub struct CompleteWorkoutRequest {
    #[serde(default)]
    pub exercises_completed: Vec<Uuid>,
    /// `YYYY-MM-DD`; defaults to today (UTC).
    pub completed_on: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompletionReward {
    pub reward_earned: i64,
    pub streak_bonus: i64,
    pub total_reward: i64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub is_new_record: bool,
    pub new_balance: i64,
    pub milestone: MilestoneProgress,
}

#[derive(Debug, Serialize)]
pub struct StreakStatus {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_workout_date: Option<String>,
    /// False once a full day has passed without a workout.
    pub streak_active: bool,
    /// Bonus a completion today would earn.
    pub next_bonus: i64,
    pub milestone: MilestoneProgress,
}
