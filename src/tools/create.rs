/// Tool for creating new habits
///
/// This module implements the habit_create MCP tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{Difficulty, Frequency, Habit, HabitKind};
use crate::storage::HabitStorage;
use crate::tools::{ToolContext, ToolError};

/// Parameters for creating a new habit
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateHabitParams {
    /// Name of the habit
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// "binary" (done / not done) or "numeric" (default: binary)
    pub kind: Option<String>,
    /// Target value per day, numeric habits only
    pub target_value: Option<f64>,
    /// How often: daily, weekdays, weekends, weekly (default: daily)
    pub frequency: Option<String>,
    /// easy, medium or hard (default: medium)
    pub difficulty: Option<String>,
}

/// Response from creating a habit
#[derive(Debug, Serialize)]
pub struct CreateHabitResponse {
    pub habit: Habit,
    pub message: String,
}

/// Create a new habit for the context's owner
pub fn create_habit<S: HabitStorage>(
    ctx: &ToolContext<'_, S>,
    params: CreateHabitParams,
) -> Result<CreateHabitResponse, ToolError> {
    let kind = match params.kind.as_deref() {
        Some(raw) => HabitKind::parse(raw)?,
        None => HabitKind::Binary,
    };
    let frequency = match params.frequency.as_deref() {
        Some(raw) => Frequency::parse(raw)?,
        None => Frequency::Daily,
    };
    let difficulty = match params.difficulty.as_deref() {
        Some(raw) => Difficulty::parse(raw)?,
        None => Difficulty::default(),
    };

    let habit = Habit::new(
        ctx.owner_id,
        params.name,
        params.description,
        kind,
        params.target_value,
        frequency,
        difficulty,
    )?;

    ctx.storage.create_habit(&habit)?;
    tracing::info!("Created habit {} ({})", habit.id, habit.name);

    Ok(CreateHabitResponse {
        message: format!(
            "✅ Created {} habit '{}' ({}, {})\nHabit ID: {}",
            habit.kind.as_str(),
            habit.name,
            habit.difficulty.as_str(),
            frequency_label(&habit.frequency),
            habit.id
        ),
        habit,
    })
}

fn frequency_label(frequency: &Frequency) -> &'static str {
    match frequency {
        Frequency::Daily => "daily",
        Frequency::Weekly(_) => "weekly",
        Frequency::Weekdays => "weekdays",
        Frequency::Weekends => "weekends",
        Frequency::Custom(_) => "custom days",
    }
}
