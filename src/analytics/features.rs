/// Feature engineering for maintenance predictions
///
/// Builds the fixed-schema feature vector a classifier scores. Feature names
/// are part of the contract with trained model artifacts, so they never change
/// within a schema version.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use chrono::{Datelike, NaiveDate};

use crate::analytics::PredictionError;
use crate::domain::stats::{
    best_streak, completion_rate_all_time, consecutive_misses, rolling_completion, streak,
};
use crate::domain::{Habit, HabitEntry, HabitId, HabitKind, StatsSnapshot};
use crate::storage::HabitStorage;

/// Version of the feature schema below
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Every feature the builder emits
pub const FEATURE_NAMES: [&str; 13] = [
    "rolling_7d_completion",
    "rolling_14d_completion",
    "rolling_30d_completion",
    "current_streak",
    "consecutive_misses",
    "day_of_week",
    "time_since_creation",
    "difficulty",
    "is_numeric",
    "streak_length",
    "best_streak",
    "total_entries",
    "completion_rate_all_time",
];

/// Value used for a feature that is absent at scoring time
///
/// The schema has no "missing" representation, so an empty rolling window
/// becomes 0.0 here as well.
pub const SCHEMA_MISSING_DEFAULT: f64 = 0.0;

/// Named numeric features for one habit on one date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Raw lookup; `None` when the feature was never set
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Lookup with the schema default for absent features
    pub fn value_or_default(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(SCHEMA_MISSING_DEFAULT)
    }

    /// Values in the order of `names`, defaulting absent ones
    pub fn ordered_by<S: AsRef<str>>(&self, names: &[S]) -> Vec<f64> {
        names.iter().map(|n| self.value_or_default(n.as_ref())).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

/// Assembles feature vectors from storage
pub struct FeatureBuilder;

impl FeatureBuilder {
    /// Build the feature vector for a habit as of `date`
    ///
    /// Fails with `NotFound` when the habit does not exist. Inactive habits
    /// are still featurized; visibility is checked by the caller.
    pub fn build<S: HabitStorage>(
        storage: &S,
        habit_id: &HabitId,
        date: NaiveDate,
    ) -> Result<FeatureVector, PredictionError> {
        let habit = storage
            .habit_metadata(habit_id)?
            .ok_or_else(|| PredictionError::NotFound { habit_id: habit_id.to_string() })?;
        Self::build_for_habit(storage, &habit, date)
    }

    /// Same as [`FeatureBuilder::build`] for a habit that is already loaded
    pub fn build_for_habit<S: HabitStorage>(
        storage: &S,
        habit: &Habit,
        date: NaiveDate,
    ) -> Result<FeatureVector, PredictionError> {
        let entries = storage.entries_for(&habit.id, date)?;
        let snapshot = storage.latest_stats_snapshot(&habit.id, date)?;
        Ok(Self::from_parts(habit, &entries, snapshot.as_ref(), date))
    }

    /// Pure assembly from already-fetched inputs
    ///
    /// `entries` may include rows after `date`; they are ignored. When a
    /// snapshot is supplied its streak figures replace the fresh computation.
    pub fn from_parts(
        habit: &Habit,
        entries: &[HabitEntry],
        snapshot: Option<&StatsSnapshot>,
        date: NaiveDate,
    ) -> FeatureVector {
        let history: Vec<HabitEntry> = entries.iter().filter(|e| e.date <= date).cloned().collect();
        let mut features = FeatureVector::new();

        for (name, window) in [
            ("rolling_7d_completion", 7),
            ("rolling_14d_completion", 14),
            ("rolling_30d_completion", 30),
        ] {
            let rate = rolling_completion(&history, date, window).unwrap_or(SCHEMA_MISSING_DEFAULT);
            features.insert(name, rate);
        }

        let current_streak = f64::from(streak(&history, date));
        features.insert("current_streak", current_streak);
        features.insert("consecutive_misses", f64::from(consecutive_misses(&history, date)));
        features.insert("day_of_week", f64::from(date.weekday().num_days_from_monday()));

        let days_since_creation = (date - habit.created_at.date_naive()).num_days();
        features.insert("time_since_creation", days_since_creation as f64);

        features.insert("difficulty", habit.difficulty.encode());
        features.insert("is_numeric", if habit.kind == HabitKind::Numeric { 1.0 } else { 0.0 });

        match snapshot {
            Some(s) => {
                features.insert("streak_length", f64::from(s.streak_length));
                features.insert("best_streak", f64::from(s.best_streak));
            }
            None => {
                features.insert("streak_length", current_streak);
                features.insert("best_streak", f64::from(best_streak(&history)));
            }
        }

        features.insert("total_entries", history.len() as f64);
        features.insert("completion_rate_all_time", completion_rate_all_time(&history));

        features
    }
}
