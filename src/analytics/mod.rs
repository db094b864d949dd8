/// Analytics engine: statistics, features and maintenance predictions
///
/// The engine ties together the pure statistics in `domain::stats`, the
/// feature builder, the prediction strategies and the prediction cache. It
/// owns no data itself apart from the active model; every operation takes the
/// storage collaborator as an argument.

pub mod features;
pub mod strategy;
pub mod model;
pub mod cache;
pub mod batch;
pub mod report;

pub use batch::{BatchSummary, HorizonOutcome, DEFAULT_BATCH_HORIZONS};
pub use cache::PredictionRequest;
pub use features::{FeatureBuilder, FeatureVector, FEATURE_NAMES};
pub use model::{Classifier, LinearModel, ModelArtifact, ModelLoadError, ModelSelector, ModelStatus, TrainedModel};
pub use report::{WeeklyHabitSummary, WeeklyReport};
pub use strategy::{FallbackHeuristic, PredictionStrategy, Scored, ScoringError};

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{
    latest_supported_date, shift_days, validate_date, DomainError, Habit, HabitEntry, HabitId, OwnerId,
    Prediction, PredictionResponse, StatsSnapshot,
};
use crate::storage::{HabitStorage, PredictionQuery, StorageError};

/// Largest page size for prediction listings
pub const MAX_PAGE_SIZE: usize = 100;

/// Errors surfaced by analytics operations
///
/// Scoring failures are deliberately absent: they are handled inside the
/// engine by falling back to the heuristic.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Habit not found: {habit_id}")]
    NotFound { habit_id: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

/// Date ranges for a stats series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsRange {
    Week,
    Month,
    Quarter,
    All,
}

impl StatsRange {
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "7d" => Ok(StatsRange::Week),
            "30d" => Ok(StatsRange::Month),
            "90d" => Ok(StatsRange::Quarter),
            "all" => Ok(StatsRange::All),
            other => Err(DomainError::Validation {
                message: format!("Unknown stats range '{}' (expected 7d, 30d, 90d or all)", other),
            }),
        }
    }

    /// First date of the range ending at `to`
    fn start(&self, habit: &Habit, to: NaiveDate) -> Result<NaiveDate, DomainError> {
        let days = match self {
            StatsRange::Week => 7,
            StatsRange::Month => 30,
            StatsRange::Quarter => 90,
            StatsRange::All => return Ok(habit.created_at.date_naive()),
        };
        shift_days(to, 1 - days)
    }
}

/// Entry point for every analytics operation
#[derive(Debug, Default)]
pub struct AnalyticsEngine {
    models: ModelSelector,
}

impl AnalyticsEngine {
    pub fn new(models: ModelSelector) -> Self {
        Self { models }
    }

    /// Engine without a trained model
    pub fn fallback_only() -> Self {
        Self::new(ModelSelector::fallback_only())
    }

    pub fn models(&self) -> &ModelSelector {
        &self.models
    }

    /// Cached or freshly computed prediction for one habit
    pub fn predict<S: HabitStorage>(
        &self,
        storage: &S,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, PredictionError> {
        cache::get_or_compute(storage, &self.models, request)
    }

    pub fn build_features<S: HabitStorage>(
        &self,
        storage: &S,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> Result<FeatureVector, PredictionError> {
        FeatureBuilder::build(storage, habit_id, date)
    }

    /// Statistics for a habit as of `date`, computed from its entries
    pub fn compute_stats<S: HabitStorage>(
        &self,
        storage: &S,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> Result<StatsSnapshot, PredictionError> {
        if storage.habit_metadata(habit_id)?.is_none() {
            return Err(PredictionError::NotFound { habit_id: habit_id.to_string() });
        }
        let entries = storage.entries_for(habit_id, date)?;
        Ok(StatsSnapshot::compute(habit_id.clone(), &entries, date))
    }

    /// Store a check-in and refresh the snapshots it affects
    ///
    /// The snapshot for the entry's date is written, and every stored
    /// snapshot dated after it is recomputed, since each one covers the
    /// whole history up to its own date.
    pub fn record_checkin<S: HabitStorage>(
        &self,
        storage: &S,
        owner_id: &OwnerId,
        entry: &HabitEntry,
    ) -> Result<StatsSnapshot, PredictionError> {
        validate_date(entry.date)?;
        visible_habit(storage, owner_id, &entry.habit_id)?;

        storage.upsert_entry(entry)?;

        let later: Vec<NaiveDate> = storage
            .stats_series(&entry.habit_id, entry.date, latest_supported_date())?
            .into_iter()
            .map(|s| s.date)
            .filter(|date| *date > entry.date)
            .collect();
        let up_to = later.last().copied().unwrap_or(entry.date);
        let history = storage.entries_for(&entry.habit_id, up_to)?;

        let snapshot = StatsSnapshot::compute(entry.habit_id.clone(), &history, entry.date);
        storage.save_stats_snapshot(&snapshot)?;
        for date in &later {
            storage.save_stats_snapshot(&StatsSnapshot::compute(entry.habit_id.clone(), &history, *date))?;
        }
        if !later.is_empty() {
            tracing::debug!("Refreshed {} later snapshots for habit {}", later.len(), entry.habit_id);
        }

        tracing::info!(
            "Recorded check-in for habit {} on {} (streak {})",
            entry.habit_id,
            entry.date,
            snapshot.streak_length
        );
        Ok(snapshot)
    }

    /// Stored snapshots for the range ending at `to`, oldest first
    pub fn stats_series<S: HabitStorage>(
        &self,
        storage: &S,
        owner_id: &OwnerId,
        habit_id: &HabitId,
        range: StatsRange,
        to: NaiveDate,
    ) -> Result<Vec<StatsSnapshot>, PredictionError> {
        validate_date(to)?;
        let habit = visible_habit(storage, owner_id, habit_id)?;
        let from = range.start(&habit, to)?;
        Ok(storage.stats_series(habit_id, from, to)?)
    }

    /// One page of stored predictions, newest first, plus the total count
    ///
    /// `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn list_predictions<S: HabitStorage>(
        &self,
        storage: &S,
        mut query: PredictionQuery,
    ) -> Result<(Vec<Prediction>, usize), PredictionError> {
        query.limit = query.limit.clamp(1, MAX_PAGE_SIZE);
        Ok(storage.list_predictions(&query)?)
    }

    pub fn run_batch<S: HabitStorage>(
        &self,
        storage: &S,
        predict_date: NaiveDate,
        horizon_days: u32,
        habit_ids: Option<&[HabitId]>,
    ) -> Result<usize, PredictionError> {
        batch::run_batch(storage, &self.models, predict_date, horizon_days, habit_ids)
    }

    pub fn run_nightly<S: HabitStorage>(
        &self,
        storage: &S,
        predict_date: NaiveDate,
        horizons: &[u32],
    ) -> BatchSummary {
        batch::run_nightly(storage, &self.models, predict_date, horizons)
    }

    /// Weekly report; `week_start` defaults to the Monday of `today`'s week
    pub fn weekly_report<S: HabitStorage>(
        &self,
        storage: &S,
        owner_id: &OwnerId,
        week_start: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<WeeklyReport, PredictionError> {
        let start = match week_start {
            Some(start) => start,
            None => report::week_start_for(today)?,
        };
        report::weekly_report(storage, &self.models, owner_id, start)
    }

    pub fn reload_model(&self) -> bool {
        self.models.reload()
    }

    pub fn is_model_loaded(&self) -> bool {
        self.models.is_model_loaded()
    }

    pub fn model_status(&self) -> ModelStatus {
        self.models.status()
    }
}

/// Habit that exists, is active and belongs to `owner_id`
fn visible_habit<S: HabitStorage>(
    storage: &S,
    owner_id: &OwnerId,
    habit_id: &HabitId,
) -> Result<Habit, PredictionError> {
    storage
        .habit_metadata(habit_id)?
        .filter(|h| h.is_visible_to(owner_id))
        .ok_or_else(|| PredictionError::NotFound { habit_id: habit_id.to_string() })
}
