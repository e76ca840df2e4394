use time::Date;
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{CompletionReward, StreakStatus};
use crate::analytics::bucketing::iso_date;
use crate::analytics::streak::{milestone_progress, preview_bonus};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::repo_types::WorkoutCompletionEvent;

/// Records one completion of `plan_id`, advances the user's streak and credits
/// the plan reward plus the streak bonus.
///
/// A failed call leaves nothing behind. Repeating a call that succeeded logs a
/// second completion and credits again; deduplicating client retries is the
/// caller's job.
#[instrument(skip(state, exercises_completed))]
pub async fn complete_workout_plan(
    state: &AppState,
    user_id: Uuid,
    plan_id: Uuid,
    exercises_completed: Vec<Uuid>,
    completed_on: Date,
) -> AppResult<CompletionReward> {
    let store = state.store.as_ref();
    let plan = store
        .workout_plan(user_id, plan_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("workout plan {}", plan_id)))?;

    let event = WorkoutCompletionEvent {
        user_id,
        plan_id,
        completed_at: completed_on,
        exercises_completed,
    };
    let receipt = store.complete_workout(&event, plan.reward).await?;
    let outcome = receipt.streak;
    let total_reward = plan.reward + outcome.bonus;

    info!(
        %user_id,
        %plan_id,
        transition = ?outcome.transition,
        streak = outcome.current_streak,
        total_reward,
        "workout plan completed"
    );

    Ok(CompletionReward {
        reward_earned: plan.reward,
        streak_bonus: outcome.bonus,
        total_reward,
        current_streak: outcome.current_streak,
        longest_streak: outcome.longest_streak,
        is_new_record: outcome.is_new_record,
        new_balance: receipt.new_balance,
        milestone: milestone_progress(outcome.current_streak),
    })
}

/// Read-only view of the streak as of `today`. Nothing is persisted.
#[instrument(skip(state))]
pub async fn streak_status(state: &AppState, user_id: Uuid, today: Date) -> AppResult<StreakStatus> {
    let current = state.store.user_streak_state(user_id).await?;

    let streak_active = current
        .last_workout_date
        .is_some_and(|last| last == today || last.next_day() == Some(today));

    let next_bonus = preview_bonus(&current, today);

    Ok(StreakStatus {
        current_streak: current.current_streak,
        longest_streak: current.longest_streak,
        last_workout_date: current.last_workout_date.map(iso_date),
        streak_active,
        next_bonus,
        milestone: milestone_progress(current.current_streak),
    })
}
