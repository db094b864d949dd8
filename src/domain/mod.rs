/// Domain module containing core business logic and data types
///
/// This module defines the core entities (Habit, HabitEntry, StatsSnapshot,
/// Prediction) and their validation rules, plus the pure statistics functions
/// that everything else in the engine is built on.

pub mod habit;
pub mod entry;
pub mod stats;
pub mod prediction;
pub mod types;

// Re-export public types for easy access
pub use habit::*;
pub use entry::*;
pub use stats::StatsSnapshot;
pub use prediction::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("Invalid horizon: {0} days (must be 1-30)")]
    InvalidHorizon(u32),
}
