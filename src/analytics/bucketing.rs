//! Grouping of timestamped events into UTC calendar-day buckets.
//!
//! Every day boundary in the engine is a UTC midnight. Callers that want a
//! user's local day must shift timestamps before handing them over.

use std::collections::BTreeMap;

use time::{macros::format_description, Date, Duration, Month, OffsetDateTime, UtcOffset};

use crate::error::{AppError, AppResult};

pub trait Timestamped {
    fn timestamp(&self) -> OffsetDateTime;
}

/// Day-granular window. Every variant resolves to a half-open `[start, end)` range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Day(Date),
    Month { year: i32, month: Month },
    Range { start: Date, end: Date },
}

impl DateWindow {
    /// `days` calendar days ending at (and including) `last`.
    pub fn trailing_days(last: Date, days: u8) -> AppResult<Self> {
        if days == 0 {
            return Err(AppError::invalid("window must span at least one day"));
        }
        let start = last
            .checked_sub(Duration::days(i64::from(days) - 1))
            .ok_or_else(|| AppError::invalid("window start out of range"))?;
        let end = next_day(last)?;
        Ok(DateWindow::Range { start, end })
    }

    pub fn month(year: i32, month: u8) -> AppResult<Self> {
        let month = Month::try_from(month)
            .map_err(|_| AppError::invalid(format!("month must be 1-12, got {}", month)))?;
        Ok(DateWindow::Month { year, month })
    }

    /// Resolves the window into `[start, end)`.
    pub fn bounds(&self) -> AppResult<(Date, Date)> {
        match *self {
            DateWindow::Day(day) => Ok((day, next_day(day)?)),
            DateWindow::Month { year, month } => {
                let start = Date::from_calendar_date(year, month, 1)
                    .map_err(|e| AppError::invalid(format!("invalid month: {}", e)))?;
                let (next_year, next_month) = match month {
                    Month::December => (year + 1, Month::January),
                    m => (year, m.next()),
                };
                let end = Date::from_calendar_date(next_year, next_month, 1)
                    .map_err(|e| AppError::invalid(format!("invalid month: {}", e)))?;
                Ok((start, end))
            }
            DateWindow::Range { start, end } => {
                if start >= end {
                    return Err(AppError::invalid(format!(
                        "empty date range [{}, {})",
                        iso_date(start),
                        iso_date(end)
                    )));
                }
                Ok((start, end))
            }
        }
    }

    /// UTC instants bounding the window, for range queries against storage.
    pub fn instants(&self) -> AppResult<(OffsetDateTime, OffsetDateTime)> {
        let (start, end) = self.bounds()?;
        Ok((start.midnight().assume_utc(), end.midnight().assume_utc()))
    }

    /// Every date in the window, in order.
    pub fn days(&self) -> AppResult<Vec<Date>> {
        let (start, end) = self.bounds()?;
        let mut out = Vec::new();
        let mut day = start;
        while day < end {
            out.push(day);
            day = next_day(day)?;
        }
        Ok(out)
    }
}

pub fn utc_date(ts: OffsetDateTime) -> Date {
    ts.to_offset(UtcOffset::UTC).date()
}

pub fn utc_hour(ts: OffsetDateTime) -> u8 {
    ts.to_offset(UtcOffset::UTC).hour()
}

pub fn iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

pub fn parse_iso_date(s: &str) -> AppResult<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| AppError::invalid(format!("malformed date '{}': {}", s, e)))
}

fn next_day(date: Date) -> AppResult<Date> {
    date.next_day()
        .ok_or_else(|| AppError::invalid("date out of range"))
}

/// Groups events by UTC day. Days without events are absent.
pub fn bucket_by_day<'a, T: Timestamped>(
    events: &'a [T],
    window: &DateWindow,
) -> AppResult<BTreeMap<String, Vec<&'a T>>> {
    let (start, end) = window.bounds()?;
    let mut buckets: BTreeMap<String, Vec<&'a T>> = BTreeMap::new();
    for event in events {
        let day = utc_date(event.timestamp());
        if day >= start && day < end {
            buckets.entry(iso_date(day)).or_default().push(event);
        }
    }
    Ok(buckets)
}

/// Like [`bucket_by_day`] but every day of the window has an entry, empty or not.
pub fn bucket_zero_filled<'a, T: Timestamped>(
    events: &'a [T],
    window: &DateWindow,
) -> AppResult<BTreeMap<String, Vec<&'a T>>> {
    let mut buckets = bucket_by_day(events, window)?;
    for day in window.days()? {
        buckets.entry(iso_date(day)).or_default();
    }
    Ok(buckets)
}
