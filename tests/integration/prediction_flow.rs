/// End-to-end prediction pipeline against a real SQLite store
use std::sync::Arc;

use habit_coach_mcp::*;

use chrono::{Duration, NaiveDate, Utc};

fn predict_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 8, 20).unwrap()
}

fn add_habit(storage: &SqliteStorage, name: &str) -> Habit {
    let habit = Habit::new(
        OwnerId::local(),
        name.to_string(),
        None,
        HabitKind::Binary,
        None,
        Frequency::Daily,
        Difficulty::Medium,
    )
    .unwrap();
    storage.create_habit(&habit).unwrap();
    habit
}

fn log_days(storage: &SqliteStorage, habit: &Habit, days: i64, completed: bool) {
    for offset in 0..days {
        let entry = HabitEntry::from_existing(
            habit.id.clone(),
            predict_date() - Duration::days(offset),
            completed,
            None,
            None,
            Utc::now(),
        );
        storage.upsert_entry(&entry).unwrap();
    }
}

fn request(habit: &Habit, use_cached: bool) -> PredictionRequest {
    PredictionRequest {
        habit_id: habit.id.clone(),
        owner_id: OwnerId::local(),
        predict_date: predict_date(),
        horizon_days: 7,
        use_cached,
    }
}

#[test]
fn test_cached_fetch_returns_latest_insert() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let engine = AnalyticsEngine::fallback_only();
    let habit = add_habit(&storage, "Walk");

    let first = engine.predict(&storage, &request(&habit, false)).unwrap();
    log_days(&storage, &habit, 10, true);
    let second = engine.predict(&storage, &request(&habit, false)).unwrap();
    assert_ne!(first.prob_maintain, second.prob_maintain);

    let cached = engine.predict(&storage, &request(&habit, true)).unwrap();
    assert_eq!(cached.prob_maintain, second.prob_maintain);
    assert_eq!(cached.created_at, second.created_at);
    assert_eq!(storage.find_predictions(&habit.id, predict_date(), 7).unwrap().len(), 2);
}

#[test]
fn test_fallback_explanation_is_fixed() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let engine = AnalyticsEngine::fallback_only();
    let habit = add_habit(&storage, "Read");
    log_days(&storage, &habit, 3, true);

    let prediction = engine.predict(&storage, &request(&habit, true)).unwrap();
    let features: Vec<&str> = prediction.explanation.iter().map(|e| e.feature.as_str()).collect();
    let importances: Vec<f64> = prediction.explanation.iter().map(|e| e.importance).collect();

    assert_eq!(features, vec!["rolling_7d_completion", "rolling_30d_completion", "current_streak"]);
    assert_eq!(importances, vec![0.5, 0.3, 0.2]);
    assert_eq!(prediction.explanation[2].value, 3.0);
}

#[test]
fn test_batch_skips_habits_with_cached_predictions() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let engine = AnalyticsEngine::fallback_only();
    let a = add_habit(&storage, "A");
    let b = add_habit(&storage, "B");

    let before = engine.predict(&storage, &request(&a, false)).unwrap();

    let ids = vec![a.id.clone(), b.id.clone()];
    let created = engine.run_batch(&storage, predict_date(), 7, Some(ids.as_slice())).unwrap();
    assert_eq!(created, 1);

    let a_rows = storage.find_predictions(&a.id, predict_date(), 7).unwrap();
    assert_eq!(a_rows.len(), 1);
    assert_eq!(a_rows[0].created_at, before.created_at);
    assert_eq!(storage.find_predictions(&b.id, predict_date(), 7).unwrap().len(), 1);
}

#[test]
fn test_trained_model_drives_prediction() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let habit = add_habit(&storage, "Code");
    log_days(&storage, &habit, 14, true);

    let names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    let mut importances = vec![0.01; names.len()];
    importances[4] = 0.9; // consecutive_misses
    importances[10] = 0.5; // best_streak
    importances[0] = 0.3; // rolling_7d_completion

    let model = TrainedModel::new(
        Arc::new(LinearModel::Logistic { intercept: 0.0, coefficients: vec![0.0; names.len()] }),
        names,
        Some(importances),
    )
    .unwrap();
    let selector = ModelSelector::fallback_only();
    selector.install(model, None);
    let engine = AnalyticsEngine::new(selector);
    assert!(engine.is_model_loaded());

    let prediction = engine.predict(&storage, &request(&habit, true)).unwrap();
    assert_eq!(prediction.prob_maintain, 0.5);
    assert_eq!(prediction.risk_level, RiskLevel::Medium);

    let ranked: Vec<&str> = prediction.explanation.iter().map(|e| e.feature.as_str()).collect();
    assert_eq!(ranked, vec!["consecutive_misses", "best_streak", "rolling_7d_completion"]);
    assert_eq!(prediction.explanation[1].value, 14.0);
    assert_eq!(prediction.explanation[0].description, "Consecutive missed days");
}

#[test]
fn test_model_without_probabilities_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latest_model.json");
    let artifact = serde_json::json!({
        "model": {"kind": "linear", "intercept": 0.2, "coefficients": [1.0, 1.0]},
        "feature_metadata": {"feature_names": ["rolling_7d_completion", "current_streak"]}
    });
    std::fs::write(&path, artifact.to_string()).unwrap();

    let storage = SqliteStorage::open_in_memory().unwrap();
    let habit = add_habit(&storage, "Swim");
    let engine = AnalyticsEngine::new(ModelSelector::load(path));

    // The artifact loads, but scoring it cannot produce a probability
    assert!(engine.is_model_loaded());
    let prediction = engine.predict(&storage, &request(&habit, true)).unwrap();
    let importances: Vec<f64> = prediction.explanation.iter().map(|e| e.importance).collect();
    assert_eq!(importances, vec![0.5, 0.3, 0.2]);
}

#[test]
fn test_reload_swaps_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latest_model.json");
    let engine = AnalyticsEngine::new(ModelSelector::load(path.clone()));
    assert!(!engine.is_model_loaded());

    let artifact = serde_json::json!({
        "model": {"kind": "logistic", "intercept": 1.0, "coefficients": [0.0]},
        "feature_metadata": {"feature_names": ["day_of_week"]},
        "feature_importances": [1.0]
    });
    std::fs::write(&path, artifact.to_string()).unwrap();

    assert!(engine.reload_model());
    let status = engine.model_status();
    assert!(status.loaded);
    assert_eq!(status.feature_count, 1);
    assert_eq!(status.source, Some(path.display().to_string()));

    std::fs::remove_file(&path).unwrap();
    assert!(!engine.reload_model());
    assert!(!engine.is_model_loaded());
}

#[test]
fn test_weekly_report_through_engine() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let engine = AnalyticsEngine::fallback_only();
    let habit = add_habit(&storage, "Sleep early");
    log_days(&storage, &habit, 7, true);

    // 2024-08-20 is a Tuesday
    let report = engine
        .weekly_report(&storage, &OwnerId::local(), None, predict_date())
        .unwrap();
    assert_eq!(report.start_date, NaiveDate::from_ymd_opt(2024, 8, 19).unwrap());
    assert_eq!(report.end_date, NaiveDate::from_ymd_opt(2024, 8, 25).unwrap());
    assert_eq!(report.habits.len(), 1);
}
