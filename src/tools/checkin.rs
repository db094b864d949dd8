/// Tool for recording daily check-ins
///
/// This module implements the habit_checkin MCP tool. A check-in replaces any
/// earlier check-in for the same day, and refreshes that day's statistics.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{HabitEntry, StatsSnapshot};
use crate::storage::HabitStorage;
use crate::tools::{parse_date, parse_habit_id, plural, ToolContext, ToolError};

/// Parameters for a check-in
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CheckinParams {
    /// ID of the habit
    pub habit_id: String,
    /// Date of the check-in (YYYY-MM-DD, defaults to today)
    pub date: Option<String>,
    /// Whether the habit was done (default: true)
    pub completed: Option<bool>,
    /// Amount achieved, for numeric habits
    pub value: Option<f64>,
    /// Optional note (max 500 characters)
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    pub stats: StatsSnapshot,
    pub message: String,
}

pub fn record_checkin<S: HabitStorage>(
    ctx: &ToolContext<'_, S>,
    params: CheckinParams,
) -> Result<CheckinResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let date = parse_date(params.date.as_deref(), ctx.today)?;
    let completed = params.completed.unwrap_or(true);

    let entry = HabitEntry::new(habit_id, date, completed, params.value, params.note, ctx.today)?;
    let stats = ctx.engine.record_checkin(ctx.storage, &ctx.owner_id, &entry)?;

    let message = if completed {
        format!(
            "🔥 Checked in for {}! Current streak: {} (best: {})",
            date,
            plural(stats.streak_length as usize, "day"),
            plural(stats.best_streak as usize, "day")
        )
    } else {
        format!("📝 Recorded a miss for {}. Best streak so far: {}", date, plural(stats.best_streak as usize, "day"))
    };

    Ok(CheckinResponse { stats, message })
}
