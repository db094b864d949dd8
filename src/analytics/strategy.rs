/// Prediction strategies
///
/// A strategy turns a feature vector into a maintenance probability plus an
/// explanation. There are exactly two: a trained classifier, and a fixed
/// heuristic used whenever no classifier is available or the classifier
/// fails on a particular call.

use thiserror::Error;

use crate::analytics::features::FeatureVector;
use crate::analytics::model::TrainedModel;
use crate::domain::{ExplanationItem, HabitId};

/// Value the heuristic assumes for an absent input feature
///
/// Deliberately different from the feature schema's 0.0 default.
pub const HEURISTIC_MISSING_DEFAULT: f64 = 0.5;

/// Heuristic weights, in explanation order
const HEURISTIC_TERMS: [(&str, f64); 3] = [
    ("rolling_7d_completion", 0.5),
    ("rolling_30d_completion", 0.3),
    ("current_streak", 0.2),
];

/// Streak length at which the streak term saturates
const STREAK_SATURATION_DAYS: f64 = 30.0;

/// Why a classifier could not produce a usable probability
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("feature row has {got} values, classifier expects {expected}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("classifier does not provide probabilities")]
    NoProbability,

    #[error("classifier returned a probability outside [0, 1]: {0}")]
    NonFinite(f64),

    #[error("classifier failed: {0}")]
    Classifier(String),
}

/// Result of scoring one feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub prob_maintain: f64,
    pub explanation: Vec<ExplanationItem>,
}

/// The active way of producing predictions
#[derive(Debug, Clone)]
pub enum PredictionStrategy {
    Trained(TrainedModel),
    Fallback,
}

impl PredictionStrategy {
    pub fn score(&self, features: &FeatureVector) -> Result<Scored, ScoringError> {
        match self {
            PredictionStrategy::Trained(model) => model.score(features),
            PredictionStrategy::Fallback => Ok(FallbackHeuristic::score(features)),
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self, PredictionStrategy::Trained(_))
    }
}

/// Score with the given strategy, falling back to the heuristic on failure
///
/// Scoring errors stop here: they are logged and never reach the caller.
pub fn score_or_fallback(strategy: &PredictionStrategy, features: &FeatureVector, habit_id: &HabitId) -> Scored {
    match strategy.score(features) {
        Ok(scored) => scored,
        Err(e) => {
            tracing::error!("Prediction error for habit {}: {}; using fallback heuristic", habit_id, e);
            FallbackHeuristic::score(features)
        }
    }
}

/// Closed-form predictor over recent completion and streak
pub struct FallbackHeuristic;

impl FallbackHeuristic {
    /// `0.5 * rolling_7d + 0.3 * rolling_30d + 0.2 * min(streak / 30, 1)`, clamped to [0, 1]
    pub fn score(features: &FeatureVector) -> Scored {
        let values: Vec<f64> = HEURISTIC_TERMS
            .iter()
            .map(|(name, _)| features.get(name).unwrap_or(HEURISTIC_MISSING_DEFAULT))
            .collect();

        let (rolling_7d, rolling_30d, current_streak) = (values[0], values[1], values[2]);
        let streak_term = (current_streak / STREAK_SATURATION_DAYS).min(1.0);

        let raw = rolling_7d * 0.5 + rolling_30d * 0.3 + streak_term * 0.2;
        // NaN inputs would otherwise escape clamp
        let prob_maintain = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };

        let explanation = HEURISTIC_TERMS
            .iter()
            .zip(values)
            .map(|((name, weight), value)| ExplanationItem {
                feature: name.to_string(),
                importance: *weight,
                value,
                description: describe_feature(name),
            })
            .collect();

        Scored { prob_maintain, explanation }
    }
}

/// Human-readable description for a feature name
pub fn describe_feature(name: &str) -> String {
    let known = match name {
        "rolling_7d_completion" => Some("7-day completion rate"),
        "rolling_30d_completion" => Some("30-day completion rate"),
        "current_streak" => Some("Current streak length"),
        "consecutive_misses" => Some("Consecutive missed days"),
        "day_of_week" => Some("Day of week"),
        "difficulty" => Some("Habit difficulty level"),
        "time_since_creation" => Some("Days since habit creation"),
        _ => None,
    };

    match known {
        Some(description) => description.to_string(),
        None => title_case(&name.replace('_', " ")),
    }
}

/// Uppercase letters that follow a non-letter, lowercase the rest
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}
