/// Basic integration tests
use habit_coach_mcp::*;
use tempfile::{tempdir, NamedTempFile};

#[cfg(test)]
mod basic_integration_tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn habit(name: &str) -> Habit {
        Habit::new(
            OwnerId::local(),
            name.to_string(),
            None,
            HabitKind::Binary,
            None,
            Frequency::Daily,
            Difficulty::Medium,
        )
        .expect("valid habit")
    }

    #[tokio::test]
    async fn test_server_basic_workflow() {
        let dir = tempdir().expect("Failed to create temp dir");
        let server = HabitCoachServer::new(Settings::for_database(dir.path().join("habits.db")))
            .await
            .expect("Failed to create server");

        let h = habit("Stretch");
        server.storage().create_habit(&h).unwrap();

        let summary = server.run_nightly(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(summary.horizons.len(), DEFAULT_BATCH_HORIZONS.len());
        assert_eq!(summary.total_created(), 3);
        assert_eq!(*server.owner_id(), OwnerId::local());
    }

    #[tokio::test]
    async fn test_database_persistence() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let db_path = temp_file.path().to_path_buf();
        let h = habit("Journal");

        {
            let server = HabitCoachServer::new(Settings::for_database(db_path.clone()))
                .await
                .expect("Failed to create first server");
            server.storage().create_habit(&h).unwrap();
            let entry = HabitEntry::from_existing(
                h.id.clone(),
                NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                true,
                None,
                None,
                Utc::now(),
            );
            server
                .analytics()
                .record_checkin(server.storage(), &OwnerId::local(), &entry)
                .unwrap();
        }

        let server2 = HabitCoachServer::new(Settings::for_database(db_path))
            .await
            .expect("Failed to create second server");

        let loaded = server2.storage().habit_metadata(&h.id).unwrap().expect("habit persisted");
        assert_eq!(loaded.name, "Journal");
        let snapshot = server2
            .storage()
            .latest_stats_snapshot(&h.id, NaiveDate::from_ymd_opt(2024, 7, 31).unwrap())
            .unwrap()
            .expect("snapshot persisted");
        assert_eq!(snapshot.streak_length, 1);
    }

    #[test]
    fn test_storage_interface() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let storage = SqliteStorage::new(temp_file.path().to_path_buf())
            .expect("Failed to create storage");

        // SqliteStorage is usable behind the trait object
        let dynamic: &dyn HabitStorage = &storage;
        assert!(dynamic.list_active_habits(None).unwrap().is_empty());
    }
}
