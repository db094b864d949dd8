/// Prediction lookup-or-compute
///
/// Predictions are stored per (habit, predict date, horizon). Storage does
/// not enforce uniqueness on that key: every compute appends a row, and the
/// cached value is whichever row was created last. Two callers computing the
/// same key at once will both insert; that duplicate is tolerated.

use chrono::NaiveDate;

use crate::analytics::features::FeatureBuilder;
use crate::analytics::model::ModelSelector;
use crate::analytics::strategy::score_or_fallback;
use crate::analytics::PredictionError;
use crate::domain::{validate_date, validate_horizon, Habit, HabitId, NewPrediction, OwnerId, Prediction, PredictionResponse};
use crate::storage::HabitStorage;

/// Parameters for one on-demand prediction
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub habit_id: HabitId,
    pub owner_id: OwnerId,
    pub predict_date: NaiveDate,
    pub horizon_days: u32,
    pub use_cached: bool,
}

/// Most recently created row among `rows`
pub fn most_recent(rows: Vec<Prediction>) -> Option<Prediction> {
    rows.into_iter().max_by_key(Prediction::recency_key)
}

/// Return the cached prediction for the request's key, or compute a new one
///
/// The habit must exist, be active and belong to the requesting owner;
/// anything else is `NotFound`. Scoring failures never surface here.
pub fn get_or_compute<S: HabitStorage>(
    storage: &S,
    models: &ModelSelector,
    request: &PredictionRequest,
) -> Result<PredictionResponse, PredictionError> {
    validate_horizon(request.horizon_days)?;
    validate_date(request.predict_date)?;

    let habit = storage
        .habit_metadata(&request.habit_id)?
        .filter(|h| h.is_visible_to(&request.owner_id))
        .ok_or_else(|| PredictionError::NotFound { habit_id: request.habit_id.to_string() })?;

    if request.use_cached {
        let cached = storage.find_predictions(&habit.id, request.predict_date, request.horizon_days)?;
        if let Some(prediction) = most_recent(cached) {
            tracing::debug!("Serving cached prediction {} for habit {}", prediction.id, habit.id);
            return Ok(prediction.into());
        }
    }

    let prediction = compute_and_store(storage, models, &habit, request.predict_date, request.horizon_days)?;
    Ok(prediction.into())
}

/// Featurize, score with the active strategy, and append a prediction row
pub(crate) fn compute_and_store<S: HabitStorage>(
    storage: &S,
    models: &ModelSelector,
    habit: &Habit,
    predict_date: NaiveDate,
    horizon_days: u32,
) -> Result<Prediction, PredictionError> {
    let features = FeatureBuilder::build_for_habit(storage, habit, predict_date)?;

    // One snapshot for the whole call; a concurrent reload does not affect it
    let snapshot = models.current();
    let scored = score_or_fallback(&snapshot.strategy, &features, &habit.id);

    let prediction = storage.insert_prediction(&NewPrediction {
        habit_id: habit.id.clone(),
        owner_id: habit.owner_id,
        predict_date,
        horizon_days,
        prob_maintain: scored.prob_maintain,
        explanation: scored.explanation,
    })?;

    tracing::debug!(
        "Stored prediction {} for habit {} ({} days from {}): {:.3}",
        prediction.id,
        habit.id,
        horizon_days,
        predict_date,
        prediction.prob_maintain
    );
    Ok(prediction)
}
