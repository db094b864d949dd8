/// Storage layer for persisting habit data
///
/// This module defines the storage collaborator the analytics engine reads
/// entries, habits and snapshots from and writes predictions to. The SQLite
/// implementation lives in `sqlite`; tests swap in their own implementations
/// of the trait.

pub mod sqlite;
pub mod migrations;

// Re-export the main storage types
pub use sqlite::*;

use thiserror::Error;
use chrono::NaiveDate;
use crate::domain::{Habit, HabitEntry, HabitId, NewPrediction, OwnerId, Prediction, StatsSnapshot};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Migration error: {0}")]
    Migration(String),
}

/// Filters for listing an owner's predictions
#[derive(Debug, Clone)]
pub struct PredictionQuery {
    pub owner_id: OwnerId,
    pub predict_date: Option<NaiveDate>,
    pub horizon_days: Option<u32>,
    pub skip: usize,
    pub limit: usize,
}

impl PredictionQuery {
    /// All predictions for an owner, first page
    pub fn for_owner(owner_id: OwnerId) -> Self {
        Self {
            owner_id,
            predict_date: None,
            horizon_days: None,
            skip: 0,
            limit: 100,
        }
    }
}

/// Trait defining the storage interface used by the analytics engine
///
/// Implementations must be shareable across threads: on-demand predictions
/// and batch runs may hit the same store concurrently. None of these methods
/// retry; failures are returned to the caller as-is.
pub trait HabitStorage: Send + Sync {
    /// Create a new habit
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    /// Look up a habit by ID, active or not
    fn habit_metadata(&self, habit_id: &HabitId) -> Result<Option<Habit>, StorageError>;

    /// Active habits, optionally restricted to the given IDs
    fn list_active_habits(&self, habit_ids: Option<&[HabitId]>) -> Result<Vec<Habit>, StorageError>;

    /// Habits belonging to one owner
    fn list_habits_for_owner(&self, owner_id: &OwnerId, active_only: bool) -> Result<Vec<Habit>, StorageError>;

    /// Insert or replace the entry for (habit, date)
    fn upsert_entry(&self, entry: &HabitEntry) -> Result<(), StorageError>;

    /// Entries dated on or before `up_to`, newest first
    fn entries_for(&self, habit_id: &HabitId, up_to: NaiveDate) -> Result<Vec<HabitEntry>, StorageError>;

    /// Insert or replace the snapshot for (habit, date)
    fn save_stats_snapshot(&self, snapshot: &StatsSnapshot) -> Result<(), StorageError>;

    /// Most recent snapshot dated on or before `up_to`
    fn latest_stats_snapshot(&self, habit_id: &HabitId, up_to: NaiveDate) -> Result<Option<StatsSnapshot>, StorageError>;

    /// Stored snapshots in `[from, to]`, oldest first
    fn stats_series(&self, habit_id: &HabitId, from: NaiveDate, to: NaiveDate) -> Result<Vec<StatsSnapshot>, StorageError>;

    /// All predictions stored under the exact key, newest first
    fn find_predictions(
        &self,
        habit_id: &HabitId,
        predict_date: NaiveDate,
        horizon_days: u32,
    ) -> Result<Vec<Prediction>, StorageError>;

    /// Append a prediction row; never replaces existing rows for the same key
    fn insert_prediction(&self, prediction: &NewPrediction) -> Result<Prediction, StorageError>;

    /// One page of an owner's predictions, newest first, plus the total count
    fn list_predictions(&self, query: &PredictionQuery) -> Result<(Vec<Prediction>, usize), StorageError>;
}
