/// Tool for habit statistics
///
/// This module implements the habit_stats MCP tool: the statistics as of a
/// date plus the stored snapshot series for a range ending at that date.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analytics::StatsRange;
use crate::domain::StatsSnapshot;
use crate::storage::HabitStorage;
use crate::tools::{parse_date, parse_habit_id, plural, ToolContext, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StatsParams {
    /// ID of the habit
    pub habit_id: String,
    /// Date to compute statistics for (YYYY-MM-DD, defaults to today)
    pub date: Option<String>,
    /// Series range: 7d, 30d, 90d or all (default: 30d)
    pub range: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub current: StatsSnapshot,
    pub series: Vec<StatsSnapshot>,
    pub message: String,
}

pub fn get_habit_stats<S: HabitStorage>(
    ctx: &ToolContext<'_, S>,
    params: StatsParams,
) -> Result<StatsResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let date = parse_date(params.date.as_deref(), ctx.today)?;
    let range = StatsRange::parse(params.range.as_deref().unwrap_or("30d"))?;

    // Ownership is checked by the series lookup
    let series = ctx.engine.stats_series(ctx.storage, &ctx.owner_id, &habit_id, range, date)?;
    let current = ctx.engine.compute_stats(ctx.storage, &habit_id, date)?;

    let message = format!(
        "📊 Stats for {}\n- Current streak: {}\n- Best streak: {}\n- 7-day completion: {}\n- 30-day completion: {}\n- Snapshots in range: {}",
        date,
        plural(current.streak_length as usize, "day"),
        plural(current.best_streak as usize, "day"),
        format_rate(current.rolling_7d),
        format_rate(current.rolling_30d),
        series.len()
    );

    Ok(StatsResponse { current, series, message })
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.1}%", r * 100.0),
        None => "no entries".to_string(),
    }
}
