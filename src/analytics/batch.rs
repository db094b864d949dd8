/// Batch prediction runs
///
/// A batch fills in predictions for every active habit that does not yet
/// have one for the (date, horizon) key. One habit failing never stops the
/// run; the failure is logged and the habit is skipped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analytics::cache::compute_and_store;
use crate::analytics::model::ModelSelector;
use crate::analytics::PredictionError;
use crate::domain::{validate_date, validate_horizon, Habit, HabitId};
use crate::storage::HabitStorage;

/// Default horizons for the nightly run
pub const DEFAULT_BATCH_HORIZONS: [u32; 3] = [3, 7, 14];

/// Outcome of one horizon within a nightly run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonOutcome {
    pub horizon_days: u32,
    /// `None` when the horizon could not run at all
    pub created: Option<usize>,
}

/// Outcome of a nightly run across horizons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub predict_date: NaiveDate,
    pub horizons: Vec<HorizonOutcome>,
}

impl BatchSummary {
    pub fn total_created(&self) -> usize {
        self.horizons.iter().filter_map(|h| h.created).sum()
    }
}

/// Create missing predictions for one (date, horizon) key
///
/// `habit_ids` restricts the run; `None` or an empty list means every active
/// habit. Returns how many predictions were created. Only selecting the
/// habits can fail the run as a whole.
pub fn run_batch<S: HabitStorage>(
    storage: &S,
    models: &ModelSelector,
    predict_date: NaiveDate,
    horizon_days: u32,
    habit_ids: Option<&[HabitId]>,
) -> Result<usize, PredictionError> {
    validate_horizon(horizon_days)?;
    validate_date(predict_date)?;

    let filter = habit_ids.filter(|ids| !ids.is_empty());
    let habits = storage.list_active_habits(filter)?;
    tracing::debug!(
        "Batch for {} ({} days): {} candidate habits",
        predict_date,
        horizon_days,
        habits.len()
    );

    let mut created = 0;
    for habit in &habits {
        match predict_if_missing(storage, models, habit, predict_date, horizon_days) {
            Ok(true) => created += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Batch prediction failed for habit {}: {}", habit.id, e);
            }
        }
    }

    tracing::info!(
        "Batch for {} ({} days) created {} of {} predictions",
        predict_date,
        horizon_days,
        created,
        habits.len()
    );
    Ok(created)
}

/// Run [`run_batch`] once per horizon
///
/// A horizon that fails outright is logged and recorded with `created: None`;
/// the remaining horizons still run.
pub fn run_nightly<S: HabitStorage>(
    storage: &S,
    models: &ModelSelector,
    predict_date: NaiveDate,
    horizons: &[u32],
) -> BatchSummary {
    let horizons = horizons
        .iter()
        .map(|&horizon_days| {
            let created = match run_batch(storage, models, predict_date, horizon_days, None) {
                Ok(count) => Some(count),
                Err(e) => {
                    tracing::error!("Nightly batch for {} days failed: {}", horizon_days, e);
                    None
                }
            };
            HorizonOutcome { horizon_days, created }
        })
        .collect();

    let summary = BatchSummary { predict_date, horizons };
    tracing::info!("Nightly batch for {} created {} predictions", predict_date, summary.total_created());
    summary
}

// Existence check only: any row for the key counts, however old
fn predict_if_missing<S: HabitStorage>(
    storage: &S,
    models: &ModelSelector,
    habit: &Habit,
    predict_date: NaiveDate,
    horizon_days: u32,
) -> Result<bool, PredictionError> {
    if !storage.find_predictions(&habit.id, predict_date, horizon_days)?.is_empty() {
        return Ok(false);
    }
    compute_and_store(storage, models, habit, predict_date, horizon_days)?;
    Ok(true)
}
