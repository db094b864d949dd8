/// Tool for batch predictions
///
/// This module implements the predictions_batch MCP tool. With a horizon it
/// runs a single batch; without one it runs every configured nightly horizon.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analytics::{BatchSummary, HorizonOutcome};
use crate::storage::HabitStorage;
use crate::tools::{parse_date, parse_habit_id, ToolContext, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BatchParams {
    /// Date to predict from (YYYY-MM-DD, defaults to today)
    pub predict_date: Option<String>,
    /// Single horizon to run; omit to run all configured horizons
    pub horizon_days: Option<u32>,
    /// Restrict to these habit IDs; omit or leave empty for all active habits
    #[serde(default)]
    pub habit_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub summary: BatchSummary,
    pub message: String,
}

pub fn run_predictions_batch<S: HabitStorage>(
    ctx: &ToolContext<'_, S>,
    params: BatchParams,
) -> Result<BatchResponse, ToolError> {
    let predict_date = parse_date(params.predict_date.as_deref(), ctx.today)?;

    let summary = match params.horizon_days {
        Some(horizon_days) => {
            let habit_ids = params
                .habit_ids
                .iter()
                .map(|raw| parse_habit_id(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let created = ctx.engine.run_batch(ctx.storage, predict_date, horizon_days, Some(&habit_ids))?;
            BatchSummary {
                predict_date,
                horizons: vec![HorizonOutcome { horizon_days, created: Some(created) }],
            }
        }
        None => {
            if !params.habit_ids.is_empty() {
                return Err(ToolError::InvalidArgument(
                    "habit_ids requires horizon_days".to_string(),
                ));
            }
            ctx.engine.run_nightly(ctx.storage, predict_date, ctx.batch_horizons)
        }
    };

    let lines = summary
        .horizons
        .iter()
        .map(|h| match h.created {
            Some(n) => format!("- {}d: {} created", h.horizon_days, n),
            None => format!("- {}d: failed (see server log)", h.horizon_days),
        })
        .collect::<Vec<_>>()
        .join("\n");
    let message = format!(
        "⚙️ Batch for {} created {} predictions\n{}",
        predict_date,
        summary.total_created(),
        lines
    );

    Ok(BatchResponse { summary, message })
}
