/// Core types and enums used throughout the domain layer
///
/// This module defines the identifier wrappers and the small enums (habit kind,
/// difficulty, schedule) that describe a habit to the analytics engine.

use serde::{Deserialize, Serialize};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use uuid::Uuid;

use crate::domain::DomainError;

/// Unique identifier for a habit
///
/// This is a wrapper around UUID to provide type safety - you can't accidentally
/// pass a habit ID where an owner ID is expected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HabitId(pub Uuid);

impl HabitId {
    /// Generate a new random habit ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a habit ID from a string (useful for database loading)
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HabitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user who owns a habit
///
/// Authentication lives outside this crate; the engine only compares owner
/// IDs when deciding whether a caller may see a habit's predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub Uuid);

impl OwnerId {
    /// Generate a new random owner ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The single local owner used when the server runs without an explicit owner
    pub fn local() -> Self {
        Self(Uuid::nil())
    }

    /// Create an owner ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a habit is tracked as a yes/no check-in or with a numeric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitKind {
    Binary,
    Numeric,
}

impl HabitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HabitKind::Binary => "binary",
            HabitKind::Numeric => "numeric",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s.trim().to_lowercase().as_str() {
            "binary" => Ok(HabitKind::Binary),
            "numeric" => Ok(HabitKind::Numeric),
            other => Err(DomainError::Validation {
                message: format!("Invalid habit type '{}'. Valid options: binary, numeric", other),
            }),
        }
    }
}

/// Self-reported difficulty of a habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Numeric encoding used by the feature vector
    pub fn encode(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.0,
            Difficulty::Medium => 0.5,
            Difficulty::Hard => 1.0,
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(DomainError::Validation {
                message: format!("Invalid difficulty '{}'. Valid options: easy, medium, hard", other),
            }),
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

/// How often a habit should be performed
///
/// The schedule is stored with the habit as metadata. The analytics engine
/// walks calendar days regardless of schedule, so this is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// Every single day
    Daily,
    /// A specific number of times per week (1-7)
    Weekly(u8),
    /// Monday through Friday only
    Weekdays,
    /// Saturday and Sunday only
    Weekends,
    /// Specific days of the week (e.g., Monday, Wednesday, Friday)
    Custom(Vec<Weekday>),
}

impl Frequency {
    /// Validate that a frequency value is reasonable
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Frequency::Weekly(times) => {
                if *times == 0 || *times > 7 {
                    return Err(DomainError::InvalidFrequency(
                        format!("Weekly frequency must be 1-7, got {}", times)
                    ));
                }
            }
            Frequency::Custom(days) => {
                if days.is_empty() {
                    return Err(DomainError::InvalidFrequency(
                        "Custom frequency must specify at least one day".to_string()
                    ));
                }
                if days.len() > 7 {
                    return Err(DomainError::InvalidFrequency(
                        "Custom frequency cannot have more than 7 days".to_string()
                    ));
                }
            }
            _ => {} // Daily, Weekdays, Weekends are always valid
        }
        Ok(())
    }

    /// Parse the short names accepted by the habit_create tool
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekdays" => Ok(Frequency::Weekdays),
            "weekends" => Ok(Frequency::Weekends),
            "weekly" => Ok(Frequency::Weekly(3)),
            other => Err(DomainError::InvalidFrequency(
                format!("Invalid frequency '{}'. Valid options: daily, weekdays, weekends, weekly", other)
            )),
        }
    }
}

/// Check that a prediction horizon is within the supported range
pub fn validate_horizon(horizon_days: u32) -> Result<(), DomainError> {
    if !(1..=30).contains(&horizon_days) {
        return Err(DomainError::InvalidHorizon(horizon_days));
    }
    Ok(())
}

/// Years the engine accepts
///
/// Dates are stored as `YYYY-MM-DD` text and compared as strings, which only
/// orders correctly for four-digit, non-negative years.
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// Last date inside [`SUPPORTED_YEARS`]
pub fn latest_supported_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(*SUPPORTED_YEARS.end(), 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Reject dates outside [`SUPPORTED_YEARS`]
pub fn validate_date(date: NaiveDate) -> Result<(), DomainError> {
    if !SUPPORTED_YEARS.contains(&date.year()) {
        return Err(DomainError::InvalidDate(format!(
            "{} is outside the supported years {}-{}",
            date,
            SUPPORTED_YEARS.start(),
            SUPPORTED_YEARS.end()
        )));
    }
    Ok(())
}

/// `date` moved by `days`, or an error instead of overflowing the calendar
pub fn shift_days(date: NaiveDate, days: i64) -> Result<NaiveDate, DomainError> {
    date.checked_add_signed(Duration::days(days))
        .ok_or_else(|| DomainError::InvalidDate(format!("{} shifted by {} days is out of range", date, days)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_bounds() {
        let last = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap();
        assert_eq!(latest_supported_date(), last);
        assert!(validate_date(last).is_ok());
        assert!(validate_date(NaiveDate::from_ymd_opt(10000, 1, 1).unwrap()).is_err());
        assert!(validate_date(NaiveDate::from_ymd_opt(0, 12, 31).unwrap()).is_err());

        assert_eq!(shift_days(last, -1).unwrap(), NaiveDate::from_ymd_opt(9999, 12, 30).unwrap());
        assert!(matches!(shift_days(NaiveDate::MAX, 6), Err(DomainError::InvalidDate(_))));
        assert!(matches!(shift_days(NaiveDate::MIN, -1), Err(DomainError::InvalidDate(_))));
    }

    #[test]
    fn test_difficulty_encoding() {
        assert_eq!(Difficulty::Easy.encode(), 0.0);
        assert_eq!(Difficulty::Medium.encode(), 0.5);
        assert_eq!(Difficulty::Hard.encode(), 1.0);
        assert_eq!(Difficulty::parse(" HARD ").unwrap(), Difficulty::Hard);
        assert!(Difficulty::parse("extreme").is_err());
    }

    #[test]
    fn test_habit_kind_parse() {
        assert_eq!(HabitKind::parse("numeric").unwrap(), HabitKind::Numeric);
        assert!(HabitKind::parse("scalar").is_err());
    }

    #[test]
    fn test_frequency_validation() {
        assert!(Frequency::Weekly(0).validate().is_err());
        assert!(Frequency::Weekly(8).validate().is_err());
        assert!(Frequency::Custom(vec![]).validate().is_err());
        assert!(Frequency::Daily.validate().is_ok());
    }

    #[test]
    fn test_horizon_bounds() {
        assert!(validate_horizon(0).is_err());
        assert!(validate_horizon(1).is_ok());
        assert!(validate_horizon(14).is_ok());
        assert!(validate_horizon(30).is_ok());
        assert!(validate_horizon(31).is_err());
    }
}
