//! Consecutive-day workout streaks and the currency bonus they earn.
//!
//! The only stateful piece of the engine: [`record_completion`] is the single
//! transition on [`UserStreakState`]. Persisting the result, and serialising
//! concurrent completions for the same user, is up to the caller.

use serde::Serialize;
use time::Date;
use tracing::{debug, warn};

use crate::store::repo_types::UserStreakState;

/// `(minimum streak, bonus)`, ascending. The highest entry whose minimum is met applies.
pub const BONUS_TIERS: &[(u32, i64)] = &[(3, 2), (7, 5), (14, 10), (30, 20)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub days: u32,
    pub title: &'static str,
    pub bonus: i64,
}

pub const MILESTONES: &[Milestone] = &[
    Milestone { days: 3, title: "Getting Started", bonus: 2 },
    Milestone { days: 7, title: "One Week Strong", bonus: 5 },
    Milestone { days: 14, title: "Two Week Warrior", bonus: 10 },
    Milestone { days: 30, title: "Monthly Master", bonus: 20 },
    Milestone { days: 50, title: "Unstoppable", bonus: 30 },
    Milestone { days: 100, title: "Centurion", bonus: 50 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakTransition {
    /// First completion ever.
    Started,
    /// Already completed on this date.
    SameDay,
    Extended,
    /// Gap of two or more days, or a date before the last workout.
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakOutcome {
    pub transition: StreakTransition,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub bonus: i64,
    pub is_new_record: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilestoneProgress {
    pub current: Option<Milestone>,
    pub next: Option<Milestone>,
    /// Fraction of the way to `next`; 1.0 once every milestone is reached.
    pub progress: f64,
}

fn classify(state: &UserStreakState, completed_on: Date) -> StreakTransition {
    match state.last_workout_date {
        None => StreakTransition::Started,
        Some(last) if completed_on == last => StreakTransition::SameDay,
        Some(last) if last.next_day() == Some(completed_on) => StreakTransition::Extended,
        Some(_) => StreakTransition::Reset,
    }
}

fn streak_after(current: u32, transition: StreakTransition) -> u32 {
    match transition {
        StreakTransition::Started | StreakTransition::Reset => 1,
        StreakTransition::SameDay => current,
        StreakTransition::Extended => current.saturating_add(1),
    }
}

pub fn record_completion(state: &mut UserStreakState, completed_on: Date) -> StreakOutcome {
    let transition = classify(state, completed_on);
    if let Some(last) = state.last_workout_date.filter(|last| completed_on < *last) {
        warn!(
            user_id = %state.user_id,
            %last,
            %completed_on,
            "completion dated before last workout; resetting streak"
        );
    }

    state.current_streak = streak_after(state.current_streak, transition);
    state.longest_streak = state.longest_streak.max(state.current_streak);
    state.last_workout_date = Some(completed_on);

    debug!(
        user_id = %state.user_id,
        ?transition,
        current = state.current_streak,
        longest = state.longest_streak,
        "streak updated"
    );

    StreakOutcome {
        transition,
        current_streak: state.current_streak,
        longest_streak: state.longest_streak,
        bonus: streak_bonus(state.current_streak),
        is_new_record: state.current_streak == state.longest_streak && state.current_streak > 1,
    }
}

/// Bonus a completion on `completed_on` would earn. Leaves `state` alone and logs nothing.
pub fn preview_bonus(state: &UserStreakState, completed_on: Date) -> i64 {
    let transition = classify(state, completed_on);
    streak_bonus(streak_after(state.current_streak, transition))
}

pub fn streak_bonus(streak: u32) -> i64 {
    BONUS_TIERS
        .iter()
        .rev()
        .find(|(min, _)| streak >= *min)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0)
}

pub fn milestone_progress(streak: u32) -> MilestoneProgress {
    let current = MILESTONES.iter().rev().find(|m| m.days <= streak).copied();
    let next = MILESTONES.iter().find(|m| m.days > streak).copied();
    let progress = match next {
        Some(n) => f64::from(streak) / f64::from(n.days),
        None => 1.0,
    };
    MilestoneProgress {
        current,
        next,
        progress,
    }
}
