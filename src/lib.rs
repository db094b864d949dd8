/// Public library interface for the Habit Coach MCP server
///
/// This module exports the server, the analytics engine and the domain and
/// storage types used by the binary and by tests.

use chrono::NaiveDate;
use thiserror::Error;

// Internal modules
mod domain;
mod storage;
mod analytics;
mod config;
mod tools;
mod mcp;

// Re-export public modules and types
pub use domain::*;
pub use storage::{HabitStorage, PredictionQuery, SqliteStorage, StorageError};
pub use analytics::{
    AnalyticsEngine, BatchSummary, Classifier, FallbackHeuristic, FeatureBuilder, FeatureVector,
    HorizonOutcome, LinearModel, ModelArtifact, ModelLoadError, ModelSelector, ModelStatus,
    PredictionError, PredictionRequest, PredictionStrategy, Scored, ScoringError, StatsRange,
    TrainedModel, WeeklyHabitSummary, WeeklyReport, DEFAULT_BATCH_HORIZONS, FEATURE_NAMES,
};
pub use config::{Args, Settings};

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] storage::StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] domain::DomainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Habit coach server that implements the MCP protocol
///
/// Owns the SQLite store and the analytics engine, and acts for the single
/// owner named in its settings.
pub struct HabitCoachServer {
    storage: SqliteStorage,
    analytics: AnalyticsEngine,
    settings: Settings,
}

impl HabitCoachServer {
    /// Create a server from resolved settings
    ///
    /// Opens (and migrates) the database and loads the model artifact. A
    /// missing or unreadable artifact leaves the engine on the fallback
    /// heuristic rather than failing startup.
    pub async fn new(settings: Settings) -> Result<Self, ServerError> {
        tracing::info!("Initializing Habit Coach server with database: {:?}", settings.database_path);

        let storage = SqliteStorage::new(settings.database_path.clone())?;

        let models = match &settings.model_path {
            Some(path) => ModelSelector::load(path.clone()),
            None => ModelSelector::fallback_only(),
        };

        Ok(Self {
            storage,
            analytics: AnalyticsEngine::new(models),
            settings,
        })
    }

    /// Run the MCP server, handling JSON-RPC requests over stdin/stdout
    ///
    /// This method will block until stdin is closed or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Starting MCP server...");

        let habits = self.storage.list_habits_for_owner(&self.settings.owner_id, true)?;
        tracing::info!(
            "Server started for owner {}, {} active habits, trained model loaded: {}",
            self.settings.owner_id,
            habits.len(),
            self.analytics.is_model_loaded()
        );

        let mut mcp_server = mcp::McpServer::new(self);
        mcp_server.run().await?;

        Ok(())
    }

    /// Run the nightly batch once for the configured horizons
    pub fn run_nightly(&self, predict_date: NaiveDate) -> BatchSummary {
        self.analytics
            .run_nightly(&self.storage, predict_date, &self.settings.batch_horizons)
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn analytics(&self) -> &AnalyticsEngine {
        &self.analytics
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.settings.owner_id
    }
}
