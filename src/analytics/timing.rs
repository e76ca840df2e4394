//! When a user eats: peak hour, longest fast, meal frequency and recency.

use std::collections::HashSet;

use serde::Serialize;
use time::OffsetDateTime;

use super::bucketing::{utc_date, utc_hour};
use super::macros::round1;
use crate::store::repo_types::LoggedMeal;

pub const NO_DATA: &str = "No data";
pub const NO_MEALS_LOGGED: &str = "No meals logged";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealTimingInsights {
    pub most_active_eating_time: String,
    /// Hours, one decimal.
    pub longest_gap_between_meals: f64,
    pub average_meals_per_day: f64,
    pub last_meal_time: String,
}

impl MealTimingInsights {
    pub fn empty() -> Self {
        Self {
            most_active_eating_time: NO_DATA.to_string(),
            longest_gap_between_meals: 0.0,
            average_meals_per_day: 0.0,
            last_meal_time: NO_MEALS_LOGGED.to_string(),
        }
    }
}

pub fn analyze(meals: &[LoggedMeal], now: OffsetDateTime) -> MealTimingInsights {
    if meals.is_empty() {
        return MealTimingInsights::empty();
    }

    let mut times: Vec<OffsetDateTime> = meals.iter().map(|m| m.logged_at).collect();
    times.sort();

    let days: HashSet<_> = times.iter().map(|t| utc_date(*t)).collect();
    let average = times.len() as f64 / days.len() as f64;

    MealTimingInsights {
        most_active_eating_time: most_active_hour(&times)
            .map(format_hour)
            .unwrap_or_else(|| NO_DATA.to_string()),
        longest_gap_between_meals: round1(longest_gap_hours(&times)),
        average_meals_per_day: round1(average),
        last_meal_time: times
            .last()
            .map(|last| humanize_since(*last, now))
            .unwrap_or_else(|| NO_MEALS_LOGGED.to_string()),
    }
}

/// UTC hour with the most meals; ties go to the earliest hour.
fn most_active_hour(times: &[OffsetDateTime]) -> Option<u8> {
    let mut counts = [0usize; 24];
    for t in times {
        counts[usize::from(utc_hour(*t))] += 1;
    }
    let mut best: Option<(u8, usize)> = None;
    for (hour, &count) in (0u8..).zip(counts.iter()) {
        if count > 0 && best.map_or(true, |(_, c)| count > c) {
            best = Some((hour, count));
        }
    }
    best.map(|(hour, _)| hour)
}

/// Expects `times` sorted ascending.
fn longest_gap_hours(times: &[OffsetDateTime]) -> f64 {
    times
        .windows(2)
        .map(|w| (w[1] - w[0]).as_seconds_f64() / 3600.0)
        .fold(0.0, f64::max)
}

/// 12-hour clock, on the hour: `0 -> "12:00 AM"`, `13 -> "1:00 PM"`.
pub fn format_hour(hour: u8) -> String {
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}:00 {}", display, suffix)
}

pub fn humanize_since(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let elapsed = now - then;
    let minutes = elapsed.whole_minutes().max(0);
    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        plural(minutes, "minute")
    } else if minutes < 24 * 60 {
        plural(minutes / 60, "hour")
    } else {
        plural(minutes / (24 * 60), "day")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}
