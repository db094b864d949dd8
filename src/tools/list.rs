/// Tool for listing stored predictions
///
/// This module implements the predictions_list MCP tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::Prediction;
use crate::storage::{HabitStorage, PredictionQuery};
use crate::tools::{parse_date, ToolContext, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPredictionsParams {
    /// Only predictions for this date (YYYY-MM-DD)
    pub predict_date: Option<String>,
    /// Only predictions with this horizon
    pub horizon_days: Option<u32>,
    /// Number of rows to skip (default: 0)
    pub skip: Option<usize>,
    /// Page size, 1-100 (default: 100)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListPredictionsResponse {
    pub predictions: Vec<Prediction>,
    pub total: usize,
    pub message: String,
}

pub fn list_predictions<S: HabitStorage>(
    ctx: &ToolContext<'_, S>,
    params: ListPredictionsParams,
) -> Result<ListPredictionsResponse, ToolError> {
    let predict_date = match params.predict_date.as_deref() {
        Some(raw) => Some(parse_date(Some(raw), ctx.today)?),
        None => None,
    };

    let mut query = PredictionQuery::for_owner(ctx.owner_id);
    query.predict_date = predict_date;
    query.horizon_days = params.horizon_days;
    query.skip = params.skip.unwrap_or(0);
    if let Some(limit) = params.limit {
        query.limit = limit;
    }

    let (predictions, total) = ctx.engine.list_predictions(ctx.storage, query)?;

    let message = if predictions.is_empty() {
        "No predictions found. Run predictions_batch or habit_predict first.".to_string()
    } else {
        let lines = predictions
            .iter()
            .map(|p| {
                format!(
                    "- {} | {} | {}d | {:.0}% ({})",
                    p.predict_date,
                    p.habit_id,
                    p.horizon_days,
                    p.prob_maintain * 100.0,
                    p.risk_level().as_str()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("📋 Showing {} of {} predictions\n{}", predictions.len(), total, lines)
    };

    Ok(ListPredictionsResponse { predictions, total, message })
}
