use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CompleteWorkoutRequest, CompletionReward, StreakStatus};
use super::services::{complete_workout_plan, streak_status};
use crate::analytics::bucketing::parse_iso_date;
use crate::auth::AuthUser;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/workouts/streak", get(get_streak))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/workouts/plans/:plan_id/complete", post(complete_plan))
}

#[instrument(skip(state, body))]
pub async fn complete_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(plan_id): Path<Uuid>,
    Json(body): Json<CompleteWorkoutRequest>,
) -> Result<(StatusCode, Json<CompletionReward>), (StatusCode, String)> {
    let completed_on = match body.completed_on.as_deref() {
        Some(s) => parse_iso_date(s)?,
        None => OffsetDateTime::now_utc().date(),
    };

    let reward =
        complete_workout_plan(&state, user_id, plan_id, body.exercises_completed, completed_on)
            .await?;
    Ok((StatusCode::CREATED, Json(reward)))
}

#[instrument(skip(state))]
pub async fn get_streak(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<StreakStatus>, (StatusCode, String)> {
    let status = streak_status(&state, user_id, OffsetDateTime::now_utc().date()).await?;
    Ok(Json(status))
}
