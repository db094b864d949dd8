/// Tool for the weekly summary report
///
/// This module implements the weekly_report MCP tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analytics::WeeklyReport;
use crate::storage::HabitStorage;
use crate::tools::{parse_date, ToolContext, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WeeklyReportParams {
    /// First day of the week (YYYY-MM-DD, defaults to Monday of this week)
    pub start: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyReportResponse {
    pub report: WeeklyReport,
    pub message: String,
}

pub fn get_weekly_report<S: HabitStorage>(
    ctx: &ToolContext<'_, S>,
    params: WeeklyReportParams,
) -> Result<WeeklyReportResponse, ToolError> {
    let week_start = match params.start.as_deref() {
        Some(raw) => Some(parse_date(Some(raw), ctx.today)?),
        None => None,
    };

    let report = ctx.engine.weekly_report(ctx.storage, &ctx.owner_id, week_start, ctx.today)?;

    let mut message = format!(
        "📅 Week of {} to {}\n- Active habits: {}\n- Average completion: {:.1}%\n- At risk: {}",
        report.start_date,
        report.end_date,
        report.active_habits,
        report.overall_completion_rate * 100.0,
        report.at_risk_count
    );

    for summary in &report.habits {
        let outlook = match &summary.prediction {
            Some(p) => format!("{:.0}% to keep", p.prob_maintain * 100.0),
            None => "no prediction".to_string(),
        };
        message.push_str(&format!(
            "\n{} {}: {:.0}% done, streak {}, {}",
            if summary.at_risk { "⚠️" } else { "•" },
            summary.habit.name,
            summary.completion_rate * 100.0,
            summary.streak,
            outlook
        ));
    }

    Ok(WeeklyReportResponse { report, message })
}
