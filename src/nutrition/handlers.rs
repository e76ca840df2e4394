use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::dto::{
    DailyQuery, MonthlyOverview, MonthlyQuery, NutritionSummary, TargetOverride,
    WeeklyNutritionData, WeeklyQuery,
};
use super::services::{
    compute_daily_macros, compute_meal_timing_insights, compute_monthly_overview,
    compute_weekly_score, resolve_target,
};
use crate::analytics::bucketing::parse_iso_date;
use crate::analytics::timing::MealTimingInsights;
use crate::auth::AuthUser;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/nutrition/daily", get(daily_macros))
        .route("/nutrition/weekly", get(weekly_score))
        .route("/nutrition/monthly", get(monthly_overview))
        .route("/nutrition/timing", get(meal_timing))
}

#[instrument(skip(state))]
pub async fn daily_macros(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<DailyQuery>,
) -> Result<Json<NutritionSummary>, (StatusCode, String)> {
    let date = match q.date.as_deref() {
        Some(s) => parse_iso_date(s)?,
        None => OffsetDateTime::now_utc().date(),
    };
    let target = resolve_target(
        state.store.as_ref(),
        user_id,
        q.target_override(),
        state.config.default_target,
    )
    .await?;
    let summary = compute_daily_macros(state.store.as_ref(), user_id, date, target).await?;
    Ok(Json(summary))
}

#[instrument(skip(state))]
pub async fn weekly_score(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<WeeklyQuery>,
) -> Result<Json<WeeklyNutritionData>, (StatusCode, String)> {
    let last_day = match q.end.as_deref() {
        Some(s) => parse_iso_date(s)?,
        None => OffsetDateTime::now_utc().date(),
    };
    let target = resolve_target(
        state.store.as_ref(),
        user_id,
        TargetOverride::default(),
        state.config.default_target,
    )
    .await?;
    let week = compute_weekly_score(state.store.as_ref(), user_id, last_day, target).await?;
    Ok(Json(week))
}

#[instrument(skip(state))]
pub async fn monthly_overview(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<MonthlyQuery>,
) -> Result<Json<MonthlyOverview>, (StatusCode, String)> {
    let target = resolve_target(
        state.store.as_ref(),
        user_id,
        TargetOverride::default(),
        state.config.default_target,
    )
    .await?;
    let overview =
        compute_monthly_overview(state.store.as_ref(), user_id, q.year, q.month, target).await?;
    Ok(Json(overview))
}

#[instrument(skip(state))]
pub async fn meal_timing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MealTimingInsights>, (StatusCode, String)> {
    let insights =
        compute_meal_timing_insights(state.store.as_ref(), user_id, OffsetDateTime::now_utc())
            .await?;
    Ok(Json(insights))
}
