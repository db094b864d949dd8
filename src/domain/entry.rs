/// HabitEntry entity for daily check-ins
///
/// This module defines the HabitEntry struct that represents the check-in for
/// one habit on one calendar day: whether it was completed, plus an optional
/// numeric value and note.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use crate::domain::{HabitId, DomainError};

/// A check-in for a habit on a specific day
///
/// Entries are unique per (habit, date). Logging the same day again replaces
/// `completed`, `value` and `note` rather than creating a second entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitEntry {
    /// Which habit this entry is for
    pub habit_id: HabitId,
    /// Which day this check-in is for
    pub date: NaiveDate,
    /// Whether the habit was done that day
    pub completed: bool,
    /// Amount achieved for numeric habits
    pub value: Option<f64>,
    /// User's notes about this day
    pub note: Option<String>,
    /// When this entry was last written
    pub logged_at: DateTime<Utc>,
}

impl HabitEntry {
    /// Create a new habit entry with validation
    ///
    /// `today` is passed in so validation stays deterministic under test.
    pub fn new(
        habit_id: HabitId,
        date: NaiveDate,
        completed: bool,
        value: Option<f64>,
        note: Option<String>,
        today: NaiveDate,
    ) -> Result<Self, DomainError> {
        Self::validate_date(&date, today)?;
        Self::validate_value(&value)?;
        Self::validate_note(&note)?;

        Ok(Self {
            habit_id,
            date,
            completed,
            value,
            note,
            logged_at: Utc::now(),
        })
    }

    /// Create an entry without validation
    ///
    /// Used by the storage layer when loading rows and by tests that build
    /// histories directly.
    pub fn from_existing(
        habit_id: HabitId,
        date: NaiveDate,
        completed: bool,
        value: Option<f64>,
        note: Option<String>,
        logged_at: DateTime<Utc>,
    ) -> Self {
        Self {
            habit_id,
            date,
            completed,
            value,
            note,
            logged_at,
        }
    }

    /// Check if this entry has notes
    pub fn has_note(&self) -> bool {
        self.note.as_ref().map_or(false, |n| !n.trim().is_empty())
    }

    // Validation helper methods

    /// Check-ins cannot be logged for future dates
    fn validate_date(date: &NaiveDate, today: NaiveDate) -> Result<(), DomainError> {
        if *date > today {
            return Err(DomainError::InvalidDate(
                "Cannot log habits for future dates".to_string()
            ));
        }
        Ok(())
    }

    fn validate_value(value: &Option<f64>) -> Result<(), DomainError> {
        if let Some(val) = value {
            if !val.is_finite() || *val < 0.0 {
                return Err(DomainError::InvalidValue {
                    message: "Value must be a non-negative number".to_string()
                });
            }
        }
        Ok(())
    }

    fn validate_note(note: &Option<String>) -> Result<(), DomainError> {
        if let Some(note_text) = note {
            if note_text.len() > 500 {
                return Err(DomainError::InvalidValue {
                    message: "Notes cannot be longer than 500 characters".to_string()
                });
            }
        }
        Ok(())
    }
}
