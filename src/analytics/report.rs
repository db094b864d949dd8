/// Weekly summary report
///
/// Summarizes every active habit of one owner over a Monday-to-Sunday week:
/// completion over the last seven days, current streak, and the 7-day
/// maintenance prediction at the end of the week.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::analytics::cache::{get_or_compute, PredictionRequest};
use crate::analytics::model::ModelSelector;
use crate::analytics::PredictionError;
use crate::domain::{
    shift_days, validate_date, DomainError, Habit, OwnerId, PredictionResponse, StatsSnapshot, AT_RISK_THRESHOLD,
};
use crate::storage::HabitStorage;

/// Horizon used for the per-habit prediction in a report
pub const REPORT_HORIZON_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyHabitSummary {
    pub habit: Habit,
    pub completion_rate: f64,
    pub streak: u32,
    pub prediction: Option<PredictionResponse>,
    pub at_risk: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_habits: usize,
    pub active_habits: usize,
    pub overall_completion_rate: f64,
    pub habits: Vec<WeeklyHabitSummary>,
    pub at_risk_count: usize,
}

/// Monday of the week containing `date`
pub fn week_start_for(date: NaiveDate) -> Result<NaiveDate, DomainError> {
    shift_days(date, -i64::from(date.weekday().num_days_from_monday()))
}

/// Build the report for the week beginning `start_date`
///
/// A habit whose prediction cannot be produced is reported without one and
/// is not counted as at risk. Storage failures while listing habits or
/// reading entries fail the whole report.
pub fn weekly_report<S: HabitStorage>(
    storage: &S,
    models: &ModelSelector,
    owner_id: &OwnerId,
    start_date: NaiveDate,
) -> Result<WeeklyReport, PredictionError> {
    let end_date = shift_days(start_date, 6)?;
    validate_date(start_date)?;
    validate_date(end_date)?;

    let active = storage.list_habits_for_owner(owner_id, true)?;
    let total_habits = active.len();

    let mut habits = Vec::with_capacity(active.len());
    for habit in active {
        let entries = storage.entries_for(&habit.id, end_date)?;
        let stats = StatsSnapshot::compute(habit.id.clone(), &entries, end_date);

        let request = PredictionRequest {
            habit_id: habit.id.clone(),
            owner_id: *owner_id,
            predict_date: end_date,
            horizon_days: REPORT_HORIZON_DAYS,
            use_cached: true,
        };
        let prediction = match get_or_compute(storage, models, &request) {
            Ok(prediction) => Some(prediction),
            Err(e) => {
                tracing::warn!("No prediction for habit {} in weekly report: {}", habit.id, e);
                None
            }
        };

        let at_risk = prediction
            .as_ref()
            .is_some_and(|p| p.prob_maintain < AT_RISK_THRESHOLD);

        habits.push(WeeklyHabitSummary {
            habit,
            completion_rate: stats.rolling_7d.unwrap_or(0.0),
            streak: stats.streak_length,
            prediction,
            at_risk,
        });
    }

    let overall_completion_rate = if habits.is_empty() {
        0.0
    } else {
        habits.iter().map(|h| h.completion_rate).sum::<f64>() / habits.len() as f64
    };
    let at_risk_count = habits.iter().filter(|h| h.at_risk).count();

    Ok(WeeklyReport {
        start_date,
        end_date,
        total_habits,
        active_habits: habits.len(),
        overall_completion_rate,
        habits,
        at_risk_count,
    })
}
