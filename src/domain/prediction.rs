/// Prediction records and risk tiers
///
/// A prediction is the probability that a habit will be maintained over the
/// next `horizon_days`, together with up to three explanation items naming
/// the features that drove it.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use crate::domain::{HabitId, OwnerId};

/// Probability at or above which a habit is low risk
pub const LOW_RISK_THRESHOLD: f64 = 0.70;

/// Probability at or above which a habit is medium risk
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.40;

/// Probability below which weekly reports flag a habit as at risk
pub const AT_RISK_THRESHOLD: f64 = MEDIUM_RISK_THRESHOLD;

/// Maximum number of explanation items attached to a prediction
pub const MAX_EXPLANATION_ITEMS: usize = 3;

/// Risk bucket derived from the maintenance probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_probability(prob_maintain: f64) -> Self {
        if prob_maintain >= LOW_RISK_THRESHOLD {
            RiskLevel::Low
        } else if prob_maintain >= MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// One feature's contribution to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationItem {
    pub feature: String,
    pub importance: f64,
    pub value: f64,
    pub description: String,
}

/// A prediction that has not been stored yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewPrediction {
    pub habit_id: HabitId,
    pub owner_id: OwnerId,
    pub predict_date: NaiveDate,
    pub horizon_days: u32,
    pub prob_maintain: f64,
    pub explanation: Vec<ExplanationItem>,
}

/// A stored prediction row
///
/// Several rows may share the same (habit, predict_date, horizon_days) key.
/// The most recently created one is the cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: i64,
    pub habit_id: HabitId,
    pub owner_id: OwnerId,
    pub predict_date: NaiveDate,
    pub horizon_days: u32,
    pub prob_maintain: f64,
    pub explanation: Vec<ExplanationItem>,
    pub created_at: DateTime<Utc>,
}

impl Prediction {
    /// Ordering key for "most recently created"
    ///
    /// Row ids follow insert order; `created_at` does not if the clock steps back.
    pub fn recency_key(&self) -> i64 {
        self.id
    }

    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_probability(self.prob_maintain)
    }
}

/// What callers receive for a prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub habit_id: HabitId,
    pub predict_date: NaiveDate,
    pub horizon_days: u32,
    pub prob_maintain: f64,
    pub risk_level: RiskLevel,
    pub explanation: Vec<ExplanationItem>,
    pub created_at: DateTime<Utc>,
}

impl From<Prediction> for PredictionResponse {
    fn from(p: Prediction) -> Self {
        Self {
            risk_level: p.risk_level(),
            habit_id: p.habit_id,
            predict_date: p.predict_date,
            horizon_days: p.horizon_days,
            prob_maintain: p.prob_maintain,
            explanation: p.explanation,
            created_at: p.created_at,
        }
    }
}
