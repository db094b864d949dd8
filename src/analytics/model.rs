/// Trained classifier support
///
/// A trained model is a classifier plus the feature order it was trained on
/// and a global importance table. Models are read from a JSON artifact and
/// published through a `ModelSelector`, which hands out immutable snapshots
/// so a reload never changes a strategy that a caller is already using.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::features::FeatureVector;
use crate::analytics::strategy::{describe_feature, PredictionStrategy, Scored, ScoringError};
use crate::domain::{ExplanationItem, MAX_EXPLANATION_ITEMS};

/// Errors raised while loading a model artifact
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model artifact not found: {}", .path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read model artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt model artifact: {0}")]
    Corrupt(String),
}

/// Anything that maps an ordered feature row to a maintenance probability
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Number of values expected in a feature row
    fn n_features(&self) -> usize;

    fn predict_proba(&self, row: &[f64]) -> Result<f64, ScoringError>;
}

/// Linear models stored in artifacts
///
/// Only the logistic variant has a probability output; a plain linear
/// regressor is accepted at load time but cannot score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LinearModel {
    Logistic { intercept: f64, coefficients: Vec<f64> },
    Linear { intercept: f64, coefficients: Vec<f64> },
}

impl LinearModel {
    fn coefficients(&self) -> &[f64] {
        match self {
            LinearModel::Logistic { coefficients, .. } | LinearModel::Linear { coefficients, .. } => coefficients,
        }
    }
}

impl Classifier for LinearModel {
    fn n_features(&self) -> usize {
        self.coefficients().len()
    }

    fn predict_proba(&self, row: &[f64]) -> Result<f64, ScoringError> {
        if row.len() != self.n_features() {
            return Err(ScoringError::ShapeMismatch { expected: self.n_features(), got: row.len() });
        }

        match self {
            LinearModel::Logistic { intercept, coefficients } => {
                let z = intercept + coefficients.iter().zip(row).map(|(c, x)| c * x).sum::<f64>();
                Ok(1.0 / (1.0 + (-z).exp()))
            }
            LinearModel::Linear { .. } => Err(ScoringError::NoProbability),
        }
    }
}

/// A classifier bound to its feature order and importance ranking
#[derive(Debug, Clone)]
pub struct TrainedModel {
    classifier: Arc<dyn Classifier>,
    feature_names: Vec<String>,
    // Sorted by importance, descending; ties keep feature order
    ranked_importances: Vec<(String, f64)>,
}

impl TrainedModel {
    /// Bind a classifier to its feature names
    ///
    /// Without an importance table every feature weighs `1/n`.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        feature_names: Vec<String>,
        importances: Option<Vec<f64>>,
    ) -> Result<Self, ModelLoadError> {
        let n = feature_names.len();
        if n == 0 {
            return Err(ModelLoadError::Corrupt("model declares no feature names".to_string()));
        }
        if classifier.n_features() != n {
            return Err(ModelLoadError::Corrupt(format!(
                "model expects {} features but {} names are declared",
                classifier.n_features(),
                n
            )));
        }

        let importances = match importances {
            Some(values) if values.len() != n => {
                return Err(ModelLoadError::Corrupt(format!(
                    "{} feature importances for {} features",
                    values.len(),
                    n
                )));
            }
            Some(values) if values.iter().any(|v| !v.is_finite()) => {
                return Err(ModelLoadError::Corrupt("feature importances must be finite".to_string()));
            }
            Some(values) => values,
            None => vec![1.0 / n as f64; n],
        };

        let mut ranked_importances: Vec<(String, f64)> = feature_names.iter().cloned().zip(importances).collect();
        ranked_importances.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(Self { classifier, feature_names, ranked_importances })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Score a feature vector
    ///
    /// Features the model knows but the vector lacks are read as 0.0. The
    /// explanation lists the globally most important features, not the ones
    /// that mattered most for this particular row.
    pub fn score(&self, features: &FeatureVector) -> Result<Scored, ScoringError> {
        let row = features.ordered_by(&self.feature_names);
        let prob_maintain = self.classifier.predict_proba(&row)?;
        if !prob_maintain.is_finite() || !(0.0..=1.0).contains(&prob_maintain) {
            return Err(ScoringError::NonFinite(prob_maintain));
        }

        let explanation = self
            .ranked_importances
            .iter()
            .take(MAX_EXPLANATION_ITEMS)
            .map(|(name, importance)| ExplanationItem {
                feature: name.clone(),
                importance: *importance,
                value: features.value_or_default(name),
                description: describe_feature(name),
            })
            .collect();

        Ok(Scored { prob_maintain, explanation })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureMetadata {
    pub feature_names: Vec<String>,
}

/// On-disk model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: LinearModel,
    pub feature_metadata: FeatureMetadata,
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: Option<serde_json::Value>,
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        if !path.exists() {
            return Err(ModelLoadError::Missing { path: path.to_path_buf() });
        }

        let raw = fs::read_to_string(path)
            .map_err(|source| ModelLoadError::Io { path: path.to_path_buf(), source })?;

        serde_json::from_str(&raw).map_err(|e| ModelLoadError::Corrupt(e.to_string()))
    }

    pub fn into_trained(self) -> Result<TrainedModel, ModelLoadError> {
        TrainedModel::new(
            Arc::new(self.model),
            self.feature_metadata.feature_names,
            self.feature_importances,
        )
    }
}

/// The strategy in effect, with where it came from
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    pub strategy: PredictionStrategy,
    pub source: Option<PathBuf>,
    pub loaded_at: DateTime<Utc>,
}

impl ModelSnapshot {
    fn fallback() -> Self {
        Self { strategy: PredictionStrategy::Fallback, source: None, loaded_at: Utc::now() }
    }
}

/// Health view of the active model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub loaded: bool,
    pub source: Option<String>,
    pub feature_count: usize,
    pub loaded_at: DateTime<Utc>,
}

/// Holds the active prediction strategy and swaps it on reload
#[derive(Debug)]
pub struct ModelSelector {
    artifact_path: Option<PathBuf>,
    current: RwLock<Arc<ModelSnapshot>>,
}

impl ModelSelector {
    /// Selector that only ever uses the fallback heuristic
    pub fn fallback_only() -> Self {
        Self { artifact_path: None, current: RwLock::new(Arc::new(ModelSnapshot::fallback())) }
    }

    /// Selector bound to an artifact path, loaded immediately
    ///
    /// A load failure is not an error here; the selector starts in fallback mode.
    pub fn load(artifact_path: PathBuf) -> Self {
        let selector = Self {
            artifact_path: Some(artifact_path),
            current: RwLock::new(Arc::new(ModelSnapshot::fallback())),
        };
        selector.reload();
        selector
    }

    /// Re-read the artifact and publish the result
    ///
    /// Returns whether a trained model is now active. On failure the
    /// fallback heuristic replaces whatever was active before.
    pub fn reload(&self) -> bool {
        let Some(path) = self.artifact_path.as_ref() else {
            tracing::warn!("No model artifact configured, using fallback heuristic");
            self.publish(ModelSnapshot::fallback());
            return false;
        };

        match ModelArtifact::load(path).and_then(ModelArtifact::into_trained) {
            Ok(model) => {
                tracing::info!(
                    "Loaded model from {} with {} features",
                    path.display(),
                    model.feature_count()
                );
                self.install(model, Some(path.clone()));
                true
            }
            Err(e @ ModelLoadError::Missing { .. }) => {
                tracing::warn!("{}; using fallback heuristic", e);
                self.publish(ModelSnapshot::fallback());
                false
            }
            Err(e) => {
                tracing::error!("Failed to load model: {}; using fallback heuristic", e);
                self.publish(ModelSnapshot::fallback());
                false
            }
        }
    }

    /// Publish an already-built model
    pub fn install(&self, model: TrainedModel, source: Option<PathBuf>) {
        self.publish(ModelSnapshot {
            strategy: PredictionStrategy::Trained(model),
            source,
            loaded_at: Utc::now(),
        });
    }

    /// The snapshot in effect right now
    pub fn current(&self) -> Arc<ModelSnapshot> {
        // Writers only ever replace the Arc, so a poisoned lock still holds a valid snapshot
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn is_model_loaded(&self) -> bool {
        self.current().strategy.is_trained()
    }

    pub fn status(&self) -> ModelStatus {
        let snapshot = self.current();
        let feature_count = match &snapshot.strategy {
            PredictionStrategy::Trained(model) => model.feature_count(),
            PredictionStrategy::Fallback => 0,
        };
        ModelStatus {
            loaded: snapshot.strategy.is_trained(),
            source: snapshot.source.as_ref().map(|p| p.display().to_string()),
            feature_count,
            loaded_at: snapshot.loaded_at,
        }
    }

    fn publish(&self, snapshot: ModelSnapshot) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(snapshot);
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::fallback_only()
    }
}
