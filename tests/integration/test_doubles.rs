/// Failure handling exercised through hand-written storage and classifier doubles
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use habit_coach_mcp::*;

use chrono::{NaiveDate, Utc};

/// SQLite-backed storage that fails on demand
///
/// Reads of entries fail for the habits in `broken`; listing habits fails
/// while `listing_down` is set.
struct FlakyStorage {
    inner: SqliteStorage,
    broken: HashSet<HabitId>,
    listing_down: AtomicBool,
}

impl FlakyStorage {
    fn new() -> Self {
        Self {
            inner: SqliteStorage::open_in_memory().unwrap(),
            broken: HashSet::new(),
            listing_down: AtomicBool::new(false),
        }
    }

    fn outage() -> StorageError {
        StorageError::Connection("simulated outage".to_string())
    }
}

impl HabitStorage for FlakyStorage {
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        self.inner.create_habit(habit)
    }

    fn habit_metadata(&self, habit_id: &HabitId) -> Result<Option<Habit>, StorageError> {
        self.inner.habit_metadata(habit_id)
    }

    fn list_active_habits(&self, habit_ids: Option<&[HabitId]>) -> Result<Vec<Habit>, StorageError> {
        if self.listing_down.load(Ordering::SeqCst) {
            return Err(Self::outage());
        }
        self.inner.list_active_habits(habit_ids)
    }

    fn list_habits_for_owner(&self, owner_id: &OwnerId, active_only: bool) -> Result<Vec<Habit>, StorageError> {
        self.inner.list_habits_for_owner(owner_id, active_only)
    }

    fn upsert_entry(&self, entry: &HabitEntry) -> Result<(), StorageError> {
        self.inner.upsert_entry(entry)
    }

    fn entries_for(&self, habit_id: &HabitId, up_to: NaiveDate) -> Result<Vec<HabitEntry>, StorageError> {
        if self.broken.contains(habit_id) {
            return Err(Self::outage());
        }
        self.inner.entries_for(habit_id, up_to)
    }

    fn save_stats_snapshot(&self, snapshot: &StatsSnapshot) -> Result<(), StorageError> {
        self.inner.save_stats_snapshot(snapshot)
    }

    fn latest_stats_snapshot(&self, habit_id: &HabitId, up_to: NaiveDate) -> Result<Option<StatsSnapshot>, StorageError> {
        self.inner.latest_stats_snapshot(habit_id, up_to)
    }

    fn stats_series(&self, habit_id: &HabitId, from: NaiveDate, to: NaiveDate) -> Result<Vec<StatsSnapshot>, StorageError> {
        self.inner.stats_series(habit_id, from, to)
    }

    fn find_predictions(
        &self,
        habit_id: &HabitId,
        predict_date: NaiveDate,
        horizon_days: u32,
    ) -> Result<Vec<Prediction>, StorageError> {
        self.inner.find_predictions(habit_id, predict_date, horizon_days)
    }

    fn insert_prediction(&self, prediction: &NewPrediction) -> Result<Prediction, StorageError> {
        self.inner.insert_prediction(prediction)
    }

    fn list_predictions(&self, query: &PredictionQuery) -> Result<(Vec<Prediction>, usize), StorageError> {
        self.inner.list_predictions(query)
    }
}

/// Classifier that always errors
#[derive(Debug)]
struct ExplodingClassifier {
    features: usize,
}

impl Classifier for ExplodingClassifier {
    fn n_features(&self) -> usize {
        self.features
    }

    fn predict_proba(&self, _row: &[f64]) -> Result<f64, ScoringError> {
        Err(ScoringError::Classifier("model backend unavailable".to_string()))
    }
}

fn new_habit(name: &str) -> Habit {
    Habit::new(
        OwnerId::local(),
        name.to_string(),
        None,
        HabitKind::Binary,
        None,
        Frequency::Daily,
        Difficulty::Easy,
    )
    .unwrap()
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 2).unwrap()
}

#[test]
fn test_batch_skips_failing_habit() {
    let mut storage = FlakyStorage::new();
    let healthy = new_habit("Healthy");
    let broken = new_habit("Broken");
    storage.create_habit(&healthy).unwrap();
    storage.create_habit(&broken).unwrap();
    storage.broken.insert(broken.id.clone());

    let engine = AnalyticsEngine::fallback_only();
    let created = engine.run_batch(&storage, date(), 7, None).unwrap();

    assert_eq!(created, 1);
    assert!(storage.find_predictions(&broken.id, date(), 7).unwrap().is_empty());
    assert_eq!(storage.find_predictions(&healthy.id, date(), 7).unwrap().len(), 1);
}

#[test]
fn test_storage_failure_propagates_from_predict() {
    let mut storage = FlakyStorage::new();
    let habit = new_habit("Broken");
    storage.create_habit(&habit).unwrap();
    storage.broken.insert(habit.id.clone());

    let engine = AnalyticsEngine::fallback_only();
    let request = PredictionRequest {
        habit_id: habit.id.clone(),
        owner_id: OwnerId::local(),
        predict_date: date(),
        horizon_days: 7,
        use_cached: true,
    };

    let result = engine.predict(&storage, &request);
    assert!(matches!(result, Err(PredictionError::Storage(StorageError::Connection(_)))));
}

#[test]
fn test_nightly_continues_after_listing_failure() {
    let storage = FlakyStorage::new();
    storage.create_habit(&new_habit("Any")).unwrap();
    storage.listing_down.store(true, Ordering::SeqCst);

    let engine = AnalyticsEngine::fallback_only();
    assert!(matches!(
        engine.run_batch(&storage, date(), 7, None),
        Err(PredictionError::Storage(_))
    ));

    let summary = engine.run_nightly(&storage, date(), &DEFAULT_BATCH_HORIZONS);
    assert_eq!(summary.horizons.len(), 3);
    assert!(summary.horizons.iter().all(|h| h.created.is_none()));

    storage.listing_down.store(false, Ordering::SeqCst);
    let summary = engine.run_nightly(&storage, date(), &DEFAULT_BATCH_HORIZONS);
    assert_eq!(summary.total_created(), 3);
}

#[test]
fn test_classifier_failure_falls_back_silently() {
    let storage = FlakyStorage::new();
    let habit = new_habit("Flaky model");
    storage.create_habit(&habit).unwrap();
    let entry = HabitEntry::from_existing(habit.id.clone(), date(), true, None, None, Utc::now());
    storage.upsert_entry(&entry).unwrap();

    let names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    let model = TrainedModel::new(Arc::new(ExplodingClassifier { features: names.len() }), names, None).unwrap();
    let selector = ModelSelector::fallback_only();
    selector.install(model, None);
    let engine = AnalyticsEngine::new(selector);

    let request = PredictionRequest {
        habit_id: habit.id.clone(),
        owner_id: OwnerId::local(),
        predict_date: date(),
        horizon_days: 3,
        use_cached: false,
    };
    let prediction = engine.predict(&storage, &request).unwrap();

    // rolling_7d = rolling_30d = 1.0, streak 1: 0.5 + 0.3 + 0.2 / 30
    let expected = 0.5 + 0.3 + 0.2 * (1.0 / 30.0);
    assert!((prediction.prob_maintain - expected).abs() < 1e-12);
    let importances: Vec<f64> = prediction.explanation.iter().map(|e| e.importance).collect();
    assert_eq!(importances, vec![0.5, 0.3, 0.2]);

    // The trained model stays active for later calls
    assert!(engine.is_model_loaded());
}

#[test]
fn test_not_found_for_foreign_owner() {
    let storage = FlakyStorage::new();
    let habit = new_habit("Mine");
    storage.create_habit(&habit).unwrap();

    let engine = AnalyticsEngine::fallback_only();
    let request = PredictionRequest {
        habit_id: habit.id.clone(),
        owner_id: OwnerId::new(),
        predict_date: date(),
        horizon_days: 7,
        use_cached: true,
    };
    assert!(matches!(
        engine.predict(&storage, &request),
        Err(PredictionError::NotFound { .. })
    ));
}
