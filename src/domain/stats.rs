/// Streak and completion-rate statistics
///
/// The functions in this module are pure: they take an entry history and a
/// reference date and never touch storage. Given the same entries they return
/// the same numbers, which is what lets a `StatsSnapshot` be thrown away and
/// regenerated from scratch at any time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use chrono::{Duration, NaiveDate};
use crate::domain::{HabitEntry, HabitId};

/// Statistics for one habit as of one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub habit_id: HabitId,
    /// Date the statistics were computed for (inclusive)
    pub date: NaiveDate,
    /// Consecutive completed days ending at `date`
    pub streak_length: u32,
    /// Longest run of consecutive completed days up to `date`
    pub best_streak: u32,
    /// Share of completed entries in the last 7 days, if any entries exist
    pub rolling_7d: Option<f64>,
    /// Share of completed entries in the last 30 days, if any entries exist
    pub rolling_30d: Option<f64>,
}

impl StatsSnapshot {
    /// Compute a snapshot from the entry history up to and including `date`
    ///
    /// Entries dated after `date` are ignored, so the history may be longer
    /// than needed.
    pub fn compute(habit_id: HabitId, history: &[HabitEntry], date: NaiveDate) -> Self {
        let relevant: Vec<HabitEntry> = history
            .iter()
            .filter(|e| e.date <= date)
            .cloned()
            .collect();

        Self {
            habit_id,
            date,
            streak_length: streak(&relevant, date),
            best_streak: best_streak(&relevant),
            rolling_7d: rolling_completion(&relevant, date, 7),
            rolling_30d: rolling_completion(&relevant, date, 30),
        }
    }
}

/// Completion flag per date; a later duplicate for the same date wins
fn index_by_date(history: &[HabitEntry]) -> BTreeMap<NaiveDate, bool> {
    history.iter().map(|e| (e.date, e.completed)).collect()
}

/// Walk backward from `date` while `keep_going` holds for each day
///
/// The walk stops at the earliest date present in the history.
fn walk_back<F>(history: &[HabitEntry], date: NaiveDate, keep_going: F) -> u32
where
    F: Fn(Option<&bool>) -> bool,
{
    let by_date = index_by_date(history);
    let earliest = match by_date.keys().next() {
        Some(d) => *d,
        None => return 0,
    };

    let mut count = 0;
    let mut check_date = date;

    while check_date >= earliest {
        if !keep_going(by_date.get(&check_date)) {
            break;
        }
        count += 1;
        check_date = match check_date.pred_opt() {
            Some(prev) => prev,
            None => break,
        };
    }

    count
}

/// Current streak ending at `date`
///
/// A day with no entry breaks the streak just like a day marked not completed.
pub fn streak(history: &[HabitEntry], date: NaiveDate) -> u32 {
    walk_back(history, date, |completed| completed == Some(&true))
}

/// Consecutive missed days ending at `date`
///
/// Mirror image of [`streak`]: counts days that are missing or not completed.
pub fn consecutive_misses(history: &[HabitEntry], date: NaiveDate) -> u32 {
    walk_back(history, date, |completed| completed != Some(&true))
}

/// Longest run of consecutive completed days anywhere in the history
pub fn best_streak(history: &[HabitEntry]) -> u32 {
    let mut best = 0;
    let mut running = 0;
    let mut last_completed: Option<NaiveDate> = None;

    for (date, completed) in index_by_date(history) {
        if completed {
            running = match last_completed {
                Some(prev) if prev.succ_opt() == Some(date) => running + 1,
                _ => 1,
            };
            last_completed = Some(date);
            best = best.max(running);
        } else {
            running = 0;
            last_completed = None;
        }
    }

    best
}

/// Completion rate over the window `[date - window_days + 1, date]`
///
/// The denominator is the number of entries present in the window, not the
/// number of calendar days. Returns `None` when the window holds no entries.
pub fn rolling_completion(history: &[HabitEntry], date: NaiveDate, window_days: u32) -> Option<f64> {
    if window_days == 0 {
        return None;
    }
    // A window reaching past the start of the calendar covers everything before `date`
    let start = date
        .checked_sub_signed(Duration::days(i64::from(window_days) - 1))
        .unwrap_or(NaiveDate::MIN);

    let (completed, total) = history
        .iter()
        .filter(|e| e.date >= start && e.date <= date)
        .fold((0u32, 0u32), |(done, total), e| {
            (done + u32::from(e.completed), total + 1)
        });

    if total == 0 {
        None
    } else {
        Some(f64::from(completed) / f64::from(total))
    }
}

/// Share of all entries that are completed, 0.0 for an empty history
pub fn completion_rate_all_time(history: &[HabitEntry]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let completed = history.iter().filter(|e| e.completed).count();
    completed as f64 / history.len() as f64
}
