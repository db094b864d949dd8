/// MCP tools for habit analytics
///
/// This module contains all the MCP tools that external clients can call.
/// Every tool takes a `ToolContext` and its own parameter struct, and returns
/// a response carrying a human-readable `message` plus structured data.

pub mod create;
pub mod checkin;
pub mod stats;
pub mod predict;
pub mod list;
pub mod batch;
pub mod report;
pub mod model;

// Re-export tool functions for easy access
pub use create::*;
pub use checkin::*;
pub use stats::*;
pub use predict::*;
pub use list::*;
pub use batch::*;
pub use report::*;
pub use model::*;

use chrono::NaiveDate;
use thiserror::Error;

use crate::analytics::{AnalyticsEngine, PredictionError};
use crate::domain::{validate_date, DomainError, HabitId, OwnerId};
use crate::storage::{HabitStorage, StorageError};

/// Errors returned to the MCP client as tool error results
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Everything a tool call needs besides its parameters
pub struct ToolContext<'a, S: HabitStorage> {
    pub storage: &'a S,
    pub engine: &'a AnalyticsEngine,
    /// The owner the server acts for
    pub owner_id: OwnerId,
    pub today: NaiveDate,
    pub batch_horizons: &'a [u32],
}

pub(crate) fn parse_habit_id(raw: &str) -> Result<HabitId, ToolError> {
    if raw.trim().is_empty() {
        return Err(ToolError::InvalidArgument("Habit ID cannot be empty".to_string()));
    }
    HabitId::from_string(raw)
        .map_err(|_| ToolError::InvalidArgument(format!("Invalid habit ID format: '{}'", raw)))
}

/// Parse an optional `YYYY-MM-DD` argument, defaulting when absent
pub(crate) fn parse_date(raw: Option<&str>, default: NaiveDate) -> Result<NaiveDate, ToolError> {
    match raw {
        Some(s) => {
            let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| ToolError::InvalidArgument(format!("Invalid date '{}', expected YYYY-MM-DD", s)))?;
            validate_date(date)?;
            Ok(date)
        }
        None => Ok(default),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}
