/// Habit entity and related functionality
///
/// This module defines the Habit struct. The analytics engine only reads
/// habits: ownership, active flag, kind, difficulty and creation date feed
/// into ownership checks and the feature vector.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::domain::{Difficulty, DomainError, Frequency, HabitId, HabitKind, OwnerId};

/// A habit represents something the user wants to do regularly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier for this habit
    pub id: HabitId,
    /// User who owns this habit
    pub owner_id: OwnerId,
    /// Display name (e.g., "Morning Run", "Read for 30min")
    pub name: String,
    /// Optional detailed description
    pub description: Option<String>,
    /// Binary check-in or numeric value
    pub kind: HabitKind,
    /// Optional numeric target for numeric habits
    pub target_value: Option<f64>,
    /// How often this habit should be performed
    pub frequency: Frequency,
    pub difficulty: Difficulty,
    /// When this habit was created
    pub created_at: DateTime<Utc>,
    /// Whether this habit is currently active (can be paused)
    pub is_active: bool,
}

impl Habit {
    /// Create a new habit with validation
    ///
    /// This is the main constructor that validates all fields and returns
    /// an error if any validation fails.
    pub fn new(
        owner_id: OwnerId,
        name: String,
        description: Option<String>,
        kind: HabitKind,
        target_value: Option<f64>,
        frequency: Frequency,
        difficulty: Difficulty,
    ) -> Result<Self, DomainError> {
        Self::validate_name(&name)?;
        Self::validate_description(&description)?;
        frequency.validate()?;
        Self::validate_target(kind, &target_value)?;

        Ok(Self {
            id: HabitId::new(),
            owner_id,
            name: name.trim().to_string(),
            description,
            kind,
            target_value,
            frequency,
            difficulty,
            created_at: Utc::now(),
            is_active: true,
        })
    }

    /// Whether the given owner may read this habit's analytics
    pub fn is_visible_to(&self, owner_id: &OwnerId) -> bool {
        self.is_active && self.owner_id == *owner_id
    }

    // Validation helper methods

    fn validate_name(name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string()
            ));
        }

        if trimmed.len() > 255 {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be longer than 255 characters".to_string()
            ));
        }

        Ok(())
    }

    fn validate_description(description: &Option<String>) -> Result<(), DomainError> {
        if let Some(desc) = description {
            if desc.len() > 500 {
                return Err(DomainError::Validation {
                    message: "Description cannot be longer than 500 characters".to_string()
                });
            }
        }
        Ok(())
    }

    /// A target only makes sense for numeric habits and must be positive
    fn validate_target(kind: HabitKind, target_value: &Option<f64>) -> Result<(), DomainError> {
        if let Some(value) = target_value {
            if kind == HabitKind::Binary {
                return Err(DomainError::InvalidValue {
                    message: "Binary habits cannot have a target value".to_string()
                });
            }
            if !value.is_finite() || *value <= 0.0 {
                return Err(DomainError::InvalidValue {
                    message: "Target value must be greater than 0".to_string()
                });
            }
        }
        Ok(())
    }
}
