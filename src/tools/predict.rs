/// Tool for maintenance predictions
///
/// This module implements the habit_predict MCP tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analytics::PredictionRequest;
use crate::domain::PredictionResponse;
use crate::storage::HabitStorage;
use crate::tools::{parse_date, parse_habit_id, plural, ToolContext, ToolError};

/// Horizon used when the caller does not pass one
pub const DEFAULT_HORIZON_DAYS: u32 = 7;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PredictParams {
    /// ID of the habit
    pub habit_id: String,
    /// Date the prediction starts from (YYYY-MM-DD, defaults to today)
    pub date: Option<String>,
    /// Number of days ahead, 1-30 (default: 7)
    pub horizon_days: Option<u32>,
    /// Reuse a stored prediction for the same day and horizon (default: true)
    pub use_cached: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: PredictionResponse,
    pub message: String,
}

pub fn predict_habit<S: HabitStorage>(
    ctx: &ToolContext<'_, S>,
    params: PredictParams,
) -> Result<PredictResponse, ToolError> {
    let request = PredictionRequest {
        habit_id: parse_habit_id(&params.habit_id)?,
        owner_id: ctx.owner_id,
        predict_date: parse_date(params.date.as_deref(), ctx.today)?,
        horizon_days: params.horizon_days.unwrap_or(DEFAULT_HORIZON_DAYS),
        use_cached: params.use_cached.unwrap_or(true),
    };

    let prediction = ctx.engine.predict(ctx.storage, &request)?;

    let factors = prediction
        .explanation
        .iter()
        .map(|e| format!("- {}: {:.2} (weight {:.2})", e.description, e.value, e.importance))
        .collect::<Vec<_>>()
        .join("\n");

    let message = format!(
        "🔮 {:.0}% chance of keeping this habit over the next {} ({} risk)\nTop factors:\n{}",
        prediction.prob_maintain * 100.0,
        plural(prediction.horizon_days as usize, "day"),
        prediction.risk_level.as_str(),
        factors
    );

    Ok(PredictResponse { prediction, message })
}
