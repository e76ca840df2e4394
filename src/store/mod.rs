//! Data-access seam. Services only ever see `dyn FitnessStore`.

use std::collections::HashSet;

use async_trait::async_trait;
use uuid::Uuid;

use crate::analytics::bucketing::DateWindow;
use crate::analytics::macros::MacroTarget;
use crate::analytics::streak::StreakOutcome;

pub mod memory;
pub mod postgres;
pub mod repo_types;

use repo_types::{FoodItem, LoggedMeal, UserStreakState, WorkoutCompletionEvent, WorkoutPlan};

#[async_trait]
pub trait FitnessStore: Send + Sync {
    /// Meals logged by `user_id` within the window's UTC bounds.
    async fn logged_meals(&self, user_id: Uuid, window: DateWindow) -> anyhow::Result<Vec<LoggedMeal>>;
    async fn food_items_by_ids(&self, ids: &HashSet<Uuid>) -> anyhow::Result<Vec<FoodItem>>;
    /// The user's own macro goal, if they have set one.
    async fn macro_target(&self, user_id: Uuid) -> anyhow::Result<Option<MacroTarget>>;
    async fn workout_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<WorkoutPlan>>;
    /// Users who never completed a workout get [`UserStreakState::fresh`].
    async fn user_streak_state(&self, user_id: Uuid) -> anyhow::Result<UserStreakState>;
    /// Applies one completion as a unit: advances the streak, logs the event and
    /// credits `base_reward` plus the streak bonus. Either all of it commits or
    /// none of it does. Completions for the same user are serialised.
    async fn complete_workout(
        &self,
        event: &WorkoutCompletionEvent,
        base_reward: i64,
    ) -> anyhow::Result<CompletionReceipt>;
}

/// What a committed completion changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionReceipt {
    pub streak: StreakOutcome,
    pub new_balance: i64,
}
