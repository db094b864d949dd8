/// Basic unit tests to verify core functionality
use habit_coach_mcp::*;
use tempfile::NamedTempFile;

#[cfg(test)]
mod basic_unit_tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_habit_creation() {
        let habit = Habit::new(
            OwnerId::local(),
            "Test Habit".to_string(),
            Some("A test habit".to_string()),
            HabitKind::Numeric,
            Some(20.0),
            Frequency::Daily,
            Difficulty::Hard,
        );

        assert!(habit.is_ok());
        let habit = habit.unwrap();
        assert_eq!(habit.name, "Test Habit");
        assert!(habit.is_active);
        assert!(habit.is_visible_to(&OwnerId::local()));
        assert!(!habit.is_visible_to(&OwnerId::new()));
    }

    #[test]
    fn test_habit_entry_creation() {
        let habit_id = HabitId::new();
        let today = Utc::now().date_naive();

        let entry = HabitEntry::new(
            habit_id.clone(),
            today,
            true,
            Some(12.5),
            Some("Great work!".to_string()),
            today,
        );

        assert!(entry.is_ok());
        let entry = entry.unwrap();
        assert_eq!(entry.habit_id, habit_id);
        assert_eq!(entry.date, today);
        assert!(entry.has_note());
    }

    #[test]
    fn test_future_entry_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let tomorrow = today.succ_opt().unwrap();
        assert!(HabitEntry::new(HabitId::new(), tomorrow, true, None, None, today).is_err());
    }

    #[test]
    fn test_parsing_enums() {
        assert_eq!(Frequency::parse("Weekdays").unwrap(), Frequency::Weekdays);
        assert_eq!(Difficulty::parse("easy").unwrap().encode(), 0.0);
        assert_eq!(HabitKind::parse("numeric").unwrap(), HabitKind::Numeric);
        assert!(Difficulty::parse("brutal").is_err());
    }

    #[test]
    fn test_horizon_validation() {
        assert!(validate_horizon(1).is_ok());
        assert!(validate_horizon(30).is_ok());
        assert!(validate_horizon(0).is_err());
        assert!(validate_horizon(31).is_err());
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_probability(0.70), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.6999), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.40), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.3999), RiskLevel::High);
    }

    #[tokio::test]
    async fn test_server_creation() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let settings = Settings::for_database(temp_file.path().to_path_buf());
        let server = HabitCoachServer::new(settings).await;
        assert!(server.is_ok());
        assert!(!server.unwrap().analytics().is_model_loaded());
    }

    #[test]
    fn test_storage_creation() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        let storage = SqliteStorage::new(temp_file.path().to_path_buf());
        assert!(storage.is_ok());
    }
}
