/// SQLite implementation of the habit storage interface
///
/// This module provides the concrete SQLite implementation for storing
/// and retrieving habit data. It handles all SQL queries and data conversion.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use chrono::{DateTime, NaiveDate, SecondsFormat, Timelike, Utc};

use crate::domain::{
    Difficulty, ExplanationItem, Habit, HabitEntry, HabitId, HabitKind, NewPrediction, OwnerId,
    Prediction, StatsSnapshot,
};
use crate::storage::{migrations, HabitStorage, PredictionQuery, StorageError};

const HABIT_COLUMNS: &str =
    "id, owner_id, name, description, kind, target_value, frequency_data, difficulty, created_at, is_active";

const ENTRY_COLUMNS: &str = "habit_id, date, completed, value, note, logged_at";

const STATS_COLUMNS: &str = "habit_id, date, streak_length, best_streak, rolling_7d, rolling_30d";

const PREDICTION_COLUMNS: &str =
    "id, habit_id, owner_id, predict_date, horizon_days, prob_maintain, explanation, created_at";

/// SQLite-based storage implementation
///
/// The connection sits behind a mutex so one storage value can be shared by
/// the MCP request loop and batch runs on other threads.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    ///
    /// This opens the database file and runs any necessary migrations
    /// to ensure the schema is up to date.
    pub fn new(db_path: PathBuf) -> Result<Self, StorageError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StorageError::Connection(format!("Failed to open database: {}", e)))?;

        let storage = Self::from_connection(conn)?;
        tracing::info!("SQLite storage initialized at: {:?}", db_path);
        Ok(storage)
    }

    /// Open a private in-memory database (used by tests)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Connection(format!("Failed to open in-memory database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(|e| StorageError::Connection(format!("Failed to enable foreign keys: {}", e)))?;

        migrations::initialize_database(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Connection("Database connection lock poisoned".to_string()))
    }
}

// Row conversion helpers

fn invalid_column(idx: usize, what: &str) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(idx, what.to_string(), Type::Text)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid_column(idx, "Invalid datetime"))
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time truncated to the precision stored in the database
fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(now.nanosecond() / 1_000 * 1_000).unwrap_or(now)
}

fn habit_from_row(row: &Row<'_>) -> rusqlite::Result<Habit> {
    let id_str: String = row.get(0)?;
    let id = HabitId::from_string(&id_str).map_err(|_| invalid_column(0, "Invalid UUID"))?;

    let owner_str: String = row.get(1)?;
    let owner_id = OwnerId::from_string(&owner_str).map_err(|_| invalid_column(1, "Invalid UUID"))?;

    let kind_str: String = row.get(4)?;
    let kind = HabitKind::parse(&kind_str).map_err(|_| invalid_column(4, "Invalid habit kind"))?;

    let frequency_json: String = row.get(6)?;
    let frequency = serde_json::from_str(&frequency_json)
        .map_err(|_| invalid_column(6, "Invalid frequency"))?;

    let difficulty_str: String = row.get(7)?;
    let difficulty = Difficulty::parse(&difficulty_str)
        .map_err(|_| invalid_column(7, "Invalid difficulty"))?;

    let created_at_str: String = row.get(8)?;
    let created_at = parse_timestamp(8, &created_at_str)?;

    Ok(Habit {
        id,
        owner_id,
        name: row.get(2)?,
        description: row.get(3)?,
        kind,
        target_value: row.get(5)?,
        frequency,
        difficulty,
        created_at,
        is_active: row.get(9)?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<HabitEntry> {
    let habit_id_str: String = row.get(0)?;
    let habit_id = HabitId::from_string(&habit_id_str).map_err(|_| invalid_column(0, "Invalid UUID"))?;

    let logged_at_str: String = row.get(5)?;

    Ok(HabitEntry::from_existing(
        habit_id,
        row.get::<_, NaiveDate>(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        parse_timestamp(5, &logged_at_str)?,
    ))
}

fn stats_from_row(row: &Row<'_>) -> rusqlite::Result<StatsSnapshot> {
    let habit_id_str: String = row.get(0)?;
    let habit_id = HabitId::from_string(&habit_id_str).map_err(|_| invalid_column(0, "Invalid UUID"))?;

    Ok(StatsSnapshot {
        habit_id,
        date: row.get(1)?,
        streak_length: row.get(2)?,
        best_streak: row.get(3)?,
        rolling_7d: row.get(4)?,
        rolling_30d: row.get(5)?,
    })
}

fn prediction_from_row(row: &Row<'_>) -> rusqlite::Result<Prediction> {
    let habit_id_str: String = row.get(1)?;
    let habit_id = HabitId::from_string(&habit_id_str).map_err(|_| invalid_column(1, "Invalid UUID"))?;

    let owner_str: String = row.get(2)?;
    let owner_id = OwnerId::from_string(&owner_str).map_err(|_| invalid_column(2, "Invalid UUID"))?;

    let explanation_json: String = row.get(6)?;
    let explanation: Vec<ExplanationItem> = serde_json::from_str(&explanation_json)
        .map_err(|_| invalid_column(6, "Invalid explanation"))?;

    let created_at_str: String = row.get(7)?;

    Ok(Prediction {
        id: row.get(0)?,
        habit_id,
        owner_id,
        predict_date: row.get(3)?,
        horizon_days: row.get(4)?,
        prob_maintain: row.get(5)?,
        explanation,
        created_at: parse_timestamp(7, &created_at_str)?,
    })
}

impl HabitStorage for SqliteStorage {
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError> {
        let frequency_json = serde_json::to_string(&habit.frequency)?;

        self.conn()?.execute(
            "INSERT INTO habits (
                id, owner_id, name, description, kind, target_value,
                frequency_data, difficulty, created_at, is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                habit.id.to_string(),
                habit.owner_id.to_string(),
                habit.name,
                habit.description,
                habit.kind.as_str(),
                habit.target_value,
                frequency_json,
                habit.difficulty.as_str(),
                format_timestamp(&habit.created_at),
                habit.is_active
            ],
        )?;

        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(())
    }

    fn habit_metadata(&self, habit_id: &HabitId) -> Result<Option<Habit>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM habits WHERE id = ?1", HABIT_COLUMNS))?;
        let habit = stmt
            .query_row(params![habit_id.to_string()], habit_from_row)
            .optional()?;
        Ok(habit)
    }

    fn list_active_habits(&self, habit_ids: Option<&[HabitId]>) -> Result<Vec<Habit>, StorageError> {
        let mut sql = format!("SELECT {} FROM habits WHERE is_active = 1", HABIT_COLUMNS);
        let mut values: Vec<Value> = Vec::new();

        if let Some(ids) = habit_ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = (1..=ids.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" AND id IN ({})", placeholders));
            values.extend(ids.iter().map(|id| Value::Text(id.to_string())));
        }

        sql.push_str(" ORDER BY created_at ASC");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let habits = stmt
            .query_map(params_from_iter(values), habit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    fn list_habits_for_owner(&self, owner_id: &OwnerId, active_only: bool) -> Result<Vec<Habit>, StorageError> {
        let mut sql = format!("SELECT {} FROM habits WHERE owner_id = ?1", HABIT_COLUMNS);
        if active_only {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(" ORDER BY created_at ASC");

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let habits = stmt
            .query_map(params![owner_id.to_string()], habit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(habits)
    }

    fn upsert_entry(&self, entry: &HabitEntry) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM habits WHERE id = ?1)",
            params![entry.habit_id.to_string()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::HabitNotFound { habit_id: entry.habit_id.to_string() });
        }

        conn.execute(
            "INSERT INTO habit_entries (habit_id, date, completed, value, note, logged_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (habit_id, date) DO UPDATE SET
                completed = excluded.completed,
                value = excluded.value,
                note = excluded.note,
                logged_at = excluded.logged_at",
            params![
                entry.habit_id.to_string(),
                entry.date,
                entry.completed,
                entry.value,
                entry.note,
                format_timestamp(&entry.logged_at)
            ],
        )?;

        tracing::debug!("Upserted entry for habit {} on {}", entry.habit_id, entry.date);
        Ok(())
    }

    fn entries_for(&self, habit_id: &HabitId, up_to: NaiveDate) -> Result<Vec<HabitEntry>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habit_entries
             WHERE habit_id = ?1 AND date <= ?2
             ORDER BY date DESC",
            ENTRY_COLUMNS
        ))?;
        let entries = stmt
            .query_map(params![habit_id.to_string(), up_to], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn save_stats_snapshot(&self, snapshot: &StatsSnapshot) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT INTO habit_stats (
                habit_id, date, streak_length, best_streak, rolling_7d, rolling_30d, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (habit_id, date) DO UPDATE SET
                streak_length = excluded.streak_length,
                best_streak = excluded.best_streak,
                rolling_7d = excluded.rolling_7d,
                rolling_30d = excluded.rolling_30d,
                updated_at = excluded.updated_at",
            params![
                snapshot.habit_id.to_string(),
                snapshot.date,
                snapshot.streak_length,
                snapshot.best_streak,
                snapshot.rolling_7d,
                snapshot.rolling_30d,
                format_timestamp(&Utc::now())
            ],
        )?;

        tracing::debug!("Saved stats snapshot for habit {} on {}", snapshot.habit_id, snapshot.date);
        Ok(())
    }

    fn latest_stats_snapshot(&self, habit_id: &HabitId, up_to: NaiveDate) -> Result<Option<StatsSnapshot>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habit_stats
             WHERE habit_id = ?1 AND date <= ?2
             ORDER BY date DESC LIMIT 1",
            STATS_COLUMNS
        ))?;
        let snapshot = stmt
            .query_row(params![habit_id.to_string(), up_to], stats_from_row)
            .optional()?;
        Ok(snapshot)
    }

    fn stats_series(&self, habit_id: &HabitId, from: NaiveDate, to: NaiveDate) -> Result<Vec<StatsSnapshot>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM habit_stats
             WHERE habit_id = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date ASC",
            STATS_COLUMNS
        ))?;
        let series = stmt
            .query_map(params![habit_id.to_string(), from, to], stats_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(series)
    }

    fn find_predictions(
        &self,
        habit_id: &HabitId,
        predict_date: NaiveDate,
        horizon_days: u32,
    ) -> Result<Vec<Prediction>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM predictions
             WHERE habit_id = ?1 AND predict_date = ?2 AND horizon_days = ?3
             ORDER BY id DESC",
            PREDICTION_COLUMNS
        ))?;
        let predictions = stmt
            .query_map(params![habit_id.to_string(), predict_date, horizon_days], prediction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(predictions)
    }

    fn insert_prediction(&self, prediction: &NewPrediction) -> Result<Prediction, StorageError> {
        let explanation_json = serde_json::to_string(&prediction.explanation)?;
        let created_at = now_micros();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO predictions (
                habit_id, owner_id, predict_date, horizon_days, prob_maintain, explanation, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                prediction.habit_id.to_string(),
                prediction.owner_id.to_string(),
                prediction.predict_date,
                prediction.horizon_days,
                prediction.prob_maintain,
                explanation_json,
                format_timestamp(&created_at)
            ],
        )?;
        let id = conn.last_insert_rowid();

        tracing::debug!(
            "Inserted prediction {} for habit {} ({} / {}d)",
            id, prediction.habit_id, prediction.predict_date, prediction.horizon_days
        );

        Ok(Prediction {
            id,
            habit_id: prediction.habit_id.clone(),
            owner_id: prediction.owner_id,
            predict_date: prediction.predict_date,
            horizon_days: prediction.horizon_days,
            prob_maintain: prediction.prob_maintain,
            explanation: prediction.explanation.clone(),
            created_at,
        })
    }

    fn list_predictions(&self, query: &PredictionQuery) -> Result<(Vec<Prediction>, usize), StorageError> {
        let mut filters = String::from("owner_id = ?1");
        let mut values: Vec<Value> = vec![Value::Text(query.owner_id.to_string())];

        if let Some(date) = query.predict_date {
            values.push(Value::Text(date.format("%Y-%m-%d").to_string()));
            filters.push_str(&format!(" AND predict_date = ?{}", values.len()));
        }
        if let Some(horizon) = query.horizon_days {
            values.push(Value::Integer(i64::from(horizon)));
            filters.push_str(&format!(" AND horizon_days = ?{}", values.len()));
        }

        let conn = self.conn()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM predictions WHERE {}", filters),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let limit_idx = values.len() + 1;
        let sql = format!(
            "SELECT {} FROM predictions WHERE {}
             ORDER BY id DESC
             LIMIT ?{} OFFSET ?{}",
            PREDICTION_COLUMNS,
            filters,
            limit_idx,
            limit_idx + 1
        );
        values.push(Value::Integer(query.limit as i64));
        values.push(Value::Integer(query.skip as i64));

        let mut stmt = conn.prepare(&sql)?;
        let predictions = stmt
            .query_map(params_from_iter(values.iter()), prediction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((predictions, total.max(0) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;

    fn storage_with_habit() -> (SqliteStorage, Habit) {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let habit = Habit::new(
            OwnerId::local(),
            "Read".to_string(),
            None,
            HabitKind::Numeric,
            Some(20.0),
            Frequency::Daily,
            Difficulty::Easy,
        )
        .unwrap();
        storage.create_habit(&habit).unwrap();
        (storage, habit)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn new_prediction(habit: &Habit, prob: f64) -> NewPrediction {
        NewPrediction {
            habit_id: habit.id.clone(),
            owner_id: habit.owner_id,
            predict_date: day(10),
            horizon_days: 7,
            prob_maintain: prob,
            explanation: vec![ExplanationItem {
                feature: "current_streak".to_string(),
                importance: 0.2,
                value: 3.0,
                description: "Current streak length".to_string(),
            }],
        }
    }

    #[test]
    fn test_habit_round_trip() {
        let (storage, habit) = storage_with_habit();
        let loaded = storage.habit_metadata(&habit.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Read");
        assert_eq!(loaded.kind, HabitKind::Numeric);
        assert_eq!(loaded.difficulty, Difficulty::Easy);
        assert_eq!(loaded.owner_id, OwnerId::local());

        assert!(storage.habit_metadata(&HabitId::new()).unwrap().is_none());
    }

    #[test]
    fn test_entry_upsert_replaces_same_day() {
        let (storage, habit) = storage_with_habit();
        let first = HabitEntry::from_existing(habit.id.clone(), day(3), false, None, None, Utc::now());
        let second = HabitEntry::from_existing(habit.id.clone(), day(3), true, Some(25.0), Some("done".into()), Utc::now());
        storage.upsert_entry(&first).unwrap();
        storage.upsert_entry(&second).unwrap();

        let entries = storage.entries_for(&habit.id, day(30)).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].completed);
        assert_eq!(entries[0].value, Some(25.0));
    }

    #[test]
    fn test_entry_for_unknown_habit_is_rejected() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let entry = HabitEntry::from_existing(HabitId::new(), day(3), true, None, None, Utc::now());

        assert!(matches!(
            storage.upsert_entry(&entry),
            Err(StorageError::HabitNotFound { .. })
        ));
    }

    #[test]
    fn test_entries_are_bounded_and_descending() {
        let (storage, habit) = storage_with_habit();
        for d in [1, 4, 2, 8] {
            let e = HabitEntry::from_existing(habit.id.clone(), day(d), true, None, None, Utc::now());
            storage.upsert_entry(&e).unwrap();
        }

        let entries = storage.entries_for(&habit.id, day(4)).unwrap();
        let dates: Vec<NaiveDate> = entries.iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![day(4), day(2), day(1)]);
    }

    #[test]
    fn test_latest_snapshot_at_or_before() {
        let (storage, habit) = storage_with_habit();
        for (d, streak) in [(2, 1), (5, 3)] {
            storage
                .save_stats_snapshot(&StatsSnapshot {
                    habit_id: habit.id.clone(),
                    date: day(d),
                    streak_length: streak,
                    best_streak: streak,
                    rolling_7d: Some(0.5),
                    rolling_30d: None,
                })
                .unwrap();
        }

        assert!(storage.latest_stats_snapshot(&habit.id, day(1)).unwrap().is_none());
        assert_eq!(storage.latest_stats_snapshot(&habit.id, day(4)).unwrap().unwrap().streak_length, 1);
        let latest = storage.latest_stats_snapshot(&habit.id, day(9)).unwrap().unwrap();
        assert_eq!(latest.streak_length, 3);
        assert_eq!(latest.rolling_30d, None);

        assert_eq!(storage.stats_series(&habit.id, day(1), day(9)).unwrap().len(), 2);
    }

    #[test]
    fn test_predictions_append_not_replace() {
        let (storage, habit) = storage_with_habit();
        let first = storage.insert_prediction(&new_prediction(&habit, 0.2)).unwrap();
        let second = storage.insert_prediction(&new_prediction(&habit, 0.9)).unwrap();
        assert!(second.id > first.id);

        let rows = storage.find_predictions(&habit.id, day(10), 7).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].prob_maintain, 0.9);
        assert_eq!(rows[0], second);

        assert!(storage.find_predictions(&habit.id, day(10), 14).unwrap().is_empty());
    }

    #[test]
    fn test_list_predictions_filters_and_pages() {
        let (storage, habit) = storage_with_habit();
        for i in 0..5 {
            storage.insert_prediction(&new_prediction(&habit, f64::from(i) / 10.0)).unwrap();
        }

        let mut query = PredictionQuery::for_owner(OwnerId::local());
        query.limit = 2;
        query.skip = 1;
        let (page, total) = storage.list_predictions(&query).unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].prob_maintain, 0.3);

        query.horizon_days = Some(3);
        let (page, total) = storage.list_predictions(&query).unwrap();
        assert_eq!(total, 0);
        assert!(page.is_empty());

        let (_, other_total) = storage.list_predictions(&PredictionQuery::for_owner(OwnerId::new())).unwrap();
        assert_eq!(other_total, 0);
    }

    #[test]
    fn test_active_habit_filter() {
        let (storage, habit) = storage_with_habit();
        assert_eq!(storage.list_active_habits(None).unwrap().len(), 1);
        assert_eq!(storage.list_active_habits(Some(&[habit.id.clone()])).unwrap().len(), 1);
        assert!(storage.list_active_habits(Some(&[HabitId::new()])).unwrap().is_empty());
    }

    #[test]
    fn test_predictions_newest_by_insert_order() {
        let (storage, habit) = storage_with_habit();
        let first = storage.insert_prediction(&new_prediction(&habit, 0.2)).unwrap();
        let second = storage.insert_prediction(&new_prediction(&habit, 0.8)).unwrap();

        // Backdate the later row as if the clock had stepped back
        storage
            .conn()
            .unwrap()
            .execute(
                "UPDATE predictions SET created_at = '2000-01-01T00:00:00.000000Z' WHERE id = ?1",
                params![second.id],
            )
            .unwrap();

        let rows = storage.find_predictions(&habit.id, day(10), 7).unwrap();
        let ids: Vec<i64> = rows.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let (page, total) = storage.list_predictions(&PredictionQuery::for_owner(OwnerId::local())).unwrap();
        assert_eq!(total, 2);
        assert_eq!(page[0].id, second.id);
    }
}
