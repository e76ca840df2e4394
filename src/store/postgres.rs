use std::collections::HashSet;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{
    FoodItem, LoggedMeal, LoggedMealRow, UserStreakRow, UserStreakState, WorkoutCompletionEvent,
    WorkoutPlan,
};
use super::{CompletionReceipt, FitnessStore};
use crate::analytics::bucketing::DateWindow;
use crate::analytics::macros::MacroTarget;
use crate::analytics::streak::record_completion;

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl FitnessStore for PgStore {
    async fn logged_meals(&self, user_id: Uuid, window: DateWindow) -> anyhow::Result<Vec<LoggedMeal>> {
        let (start, end) = window.instants()?;
        let rows = sqlx::query_as::<_, LoggedMealRow>(
            r#"
            SELECT id, user_id, food_id, meal_type, servings, logged_at
              FROM meal_logs
             WHERE user_id = $1
               AND logged_at >= $2
               AND logged_at < $3
             ORDER BY logged_at ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .context("list meal logs")?;

        rows.into_iter().map(LoggedMeal::try_from).collect()
    }

    async fn food_items_by_ids(&self, ids: &HashSet<Uuid>) -> anyhow::Result<Vec<FoodItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().copied().collect();
        let foods = sqlx::query_as::<_, FoodItem>(
            r#"
            SELECT id, name, calories, protein, carbs, fat, serving_size, serving_unit
              FROM food_items
             WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("load food items")?;
        Ok(foods)
    }

    async fn macro_target(&self, user_id: Uuid) -> anyhow::Result<Option<MacroTarget>> {
        let row = sqlx::query_as::<_, (f64, f64, f64, f64)>(
            r#"
            SELECT calories, protein, carbs, fat
              FROM goals
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("load macro goal")?;

        Ok(row.map(|(calories, protein, carbs, fat)| MacroTarget {
            calories,
            protein,
            carbs,
            fat,
        }))
    }

    async fn workout_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<WorkoutPlan>> {
        let plan = sqlx::query_as::<_, WorkoutPlan>(
            r#"
            SELECT id, user_id, name, reward
              FROM workout_plans
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("load workout plan")?;
        Ok(plan)
    }

    async fn user_streak_state(&self, user_id: Uuid) -> anyhow::Result<UserStreakState> {
        let row = sqlx::query_as::<_, UserStreakRow>(
            r#"
            SELECT id AS user_id, current_streak, longest_streak, last_workout_date
              FROM users
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("load streak state")?;

        match row {
            Some(r) => UserStreakState::try_from(r),
            None => Ok(UserStreakState::fresh(user_id)),
        }
    }

    async fn complete_workout(
        &self,
        event: &WorkoutCompletionEvent,
        base_reward: i64,
    ) -> anyhow::Result<CompletionReceipt> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let row = sqlx::query_as::<_, UserStreakRow>(
            r#"
            SELECT id AS user_id, current_streak, longest_streak, last_workout_date
              FROM users
             WHERE id = $1
               FOR UPDATE
            "#,
        )
        .bind(event.user_id)
        .fetch_optional(&mut *tx)
        .await
        .context("lock streak state")?
        .with_context(|| format!("user {} not found while completing workout", event.user_id))?;

        let mut streak = UserStreakState::try_from(row)?;
        let outcome = record_completion(&mut streak, event.completed_at);

        persist_user_streak_state_tx(&mut tx, &streak).await?;
        record_completion_tx(&mut tx, event).await?;
        let new_balance =
            credit_user_currency_tx(&mut tx, event.user_id, base_reward + outcome.bonus).await?;

        tx.commit().await.context("commit tx")?;

        Ok(CompletionReceipt {
            streak: outcome,
            new_balance,
        })
    }
}

async fn persist_user_streak_state_tx(
    tx: &mut Transaction<'_, Postgres>,
    state: &UserStreakState,
) -> anyhow::Result<()> {
    let current = i32::try_from(state.current_streak).context("current_streak overflow")?;
    let longest = i32::try_from(state.longest_streak).context("longest_streak overflow")?;
    let res = sqlx::query(
        r#"
        UPDATE users
           SET current_streak = $2,
               longest_streak = $3,
               last_workout_date = $4
         WHERE id = $1
        "#,
    )
    .bind(state.user_id)
    .bind(current)
    .bind(longest)
    .bind(state.last_workout_date)
    .execute(&mut **tx)
    .await
    .context("persist streak state")?;

    anyhow::ensure!(
        res.rows_affected() == 1,
        "user {} not found while persisting streak",
        state.user_id
    );
    Ok(())
}

async fn record_completion_tx(
    tx: &mut Transaction<'_, Postgres>,
    event: &WorkoutCompletionEvent,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO workout_completions (user_id, plan_id, completed_at, exercises_completed)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(event.user_id)
    .bind(event.plan_id)
    .bind(event.completed_at)
    .bind(event.exercises_completed.clone())
    .execute(&mut **tx)
    .await
    .context("insert workout completion")?;
    Ok(())
}

/// Returns the balance after the credit.
async fn credit_user_currency_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: i64,
) -> anyhow::Result<i64> {
    let balance = sqlx::query_scalar::<_, i64>(
        r#"
        UPDATE users
           SET currency = currency + $2
         WHERE id = $1
        RETURNING currency
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .fetch_optional(&mut **tx)
    .await
    .context("credit currency")?;

    balance.with_context(|| format!("user {} not found while crediting currency", user_id))
}
