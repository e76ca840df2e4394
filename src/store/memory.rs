use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::repo_types::{FoodItem, LoggedMeal, UserStreakState, WorkoutCompletionEvent, WorkoutPlan};
use super::{CompletionReceipt, FitnessStore};
use crate::analytics::bucketing::DateWindow;
use crate::analytics::macros::MacroTarget;
use crate::analytics::streak::record_completion;

#[derive(Default)]
struct Tables {
    meals: Vec<LoggedMeal>,
    foods: HashMap<Uuid, FoodItem>,
    goals: HashMap<Uuid, MacroTarget>,
    plans: HashMap<Uuid, WorkoutPlan>,
    streaks: HashMap<Uuid, UserStreakState>,
    completions: Vec<WorkoutCompletionEvent>,
    balances: HashMap<Uuid, i64>,
}

/// One write inside [`FitnessStore::complete_workout`], for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    Streak,
    Completion,
    Credit,
}

/// Process-local store backing `AppState::fake()` and the service tests.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    failing_step: Mutex<Option<WriteStep>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> anyhow::Result<R> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| anyhow::anyhow!("in-memory store poisoned"))?;
        Ok(f(&mut tables))
    }

    pub fn insert_food(&self, food: FoodItem) -> anyhow::Result<()> {
        self.with(|t| {
            t.foods.insert(food.id, food);
        })
    }

    pub fn insert_meal(&self, meal: LoggedMeal) -> anyhow::Result<()> {
        self.with(|t| t.meals.push(meal))
    }

    pub fn set_goal(&self, user_id: Uuid, target: MacroTarget) -> anyhow::Result<()> {
        self.with(|t| {
            t.goals.insert(user_id, target);
        })
    }

    pub fn insert_plan(&self, plan: WorkoutPlan) -> anyhow::Result<()> {
        self.with(|t| {
            t.plans.insert(plan.id, plan);
        })
    }

    pub fn completions(&self, user_id: Uuid) -> anyhow::Result<Vec<WorkoutCompletionEvent>> {
        self.with(|t| {
            t.completions
                .iter()
                .filter(|c| c.user_id == user_id)
                .cloned()
                .collect()
        })
    }

    pub fn balance(&self, user_id: Uuid) -> anyhow::Result<i64> {
        self.with(|t| t.balances.get(&user_id).copied().unwrap_or(0))
    }

    /// Makes `step` fail on every subsequent completion until cleared with `None`.
    pub fn fail_at(&self, step: Option<WriteStep>) -> anyhow::Result<()> {
        let mut failing = self
            .failing_step
            .lock()
            .map_err(|_| anyhow::anyhow!("in-memory store poisoned"))?;
        *failing = step;
        Ok(())
    }

    fn failing_step(&self) -> anyhow::Result<Option<WriteStep>> {
        self.failing_step
            .lock()
            .map(|f| *f)
            .map_err(|_| anyhow::anyhow!("in-memory store poisoned"))
    }
}

#[async_trait]
impl FitnessStore for InMemoryStore {
    async fn logged_meals(&self, user_id: Uuid, window: DateWindow) -> anyhow::Result<Vec<LoggedMeal>> {
        let (start, end) = window.instants()?;
        self.with(|t| {
            let mut meals: Vec<LoggedMeal> = t
                .meals
                .iter()
                .filter(|m| m.user_id == user_id && m.logged_at >= start && m.logged_at < end)
                .cloned()
                .collect();
            meals.sort_by_key(|m| m.logged_at);
            meals
        })
    }

    async fn food_items_by_ids(&self, ids: &HashSet<Uuid>) -> anyhow::Result<Vec<FoodItem>> {
        self.with(|t| ids.iter().filter_map(|id| t.foods.get(id).cloned()).collect())
    }

    async fn macro_target(&self, user_id: Uuid) -> anyhow::Result<Option<MacroTarget>> {
        self.with(|t| t.goals.get(&user_id).copied())
    }

    async fn workout_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<WorkoutPlan>> {
        self.with(|t| {
            t.plans
                .get(&plan_id)
                .filter(|p| p.user_id == user_id)
                .cloned()
        })
    }

    async fn user_streak_state(&self, user_id: Uuid) -> anyhow::Result<UserStreakState> {
        self.with(|t| {
            t.streaks
                .get(&user_id)
                .cloned()
                .unwrap_or_else(|| UserStreakState::fresh(user_id))
        })
    }

    async fn complete_workout(
        &self,
        event: &WorkoutCompletionEvent,
        base_reward: i64,
    ) -> anyhow::Result<CompletionReceipt> {
        let failing = self.failing_step()?;
        let user_id = event.user_id;

        // staged against the locked tables, written back only once every step passed
        self.with(|t| {
            let mut streak = t
                .streaks
                .get(&user_id)
                .cloned()
                .unwrap_or_else(|| UserStreakState::fresh(user_id));
            let outcome = record_completion(&mut streak, event.completed_at);
            anyhow::ensure!(failing != Some(WriteStep::Streak), "streak write rejected");
            anyhow::ensure!(failing != Some(WriteStep::Completion), "completion insert rejected");

            let balance = t.balances.get(&user_id).copied().unwrap_or(0);
            let new_balance = balance + base_reward + outcome.bonus;
            anyhow::ensure!(failing != Some(WriteStep::Credit), "currency credit rejected");

            t.streaks.insert(user_id, streak);
            t.completions.push(event.clone());
            t.balances.insert(user_id, new_balance);
            Ok(CompletionReceipt {
                streak: outcome,
                new_balance,
            })
        })?
    }
}
