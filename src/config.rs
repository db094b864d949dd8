/// Server configuration
///
/// Command line flags (each also readable from a `HABIT_COACH_*` environment
/// variable) are resolved into a `Settings` value once at startup.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::analytics::DEFAULT_BATCH_HORIZONS;
use crate::domain::{validate_horizon, OwnerId};
use crate::ServerError;

/// File name of the model artifact inside `<data dir>/models`
pub const DEFAULT_MODEL_FILE: &str = "latest_model.json";

/// Command line arguments for the Habit Coach MCP server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, env = "HABIT_COACH_DATABASE")]
    pub database: Option<PathBuf>,

    /// Path to the trained model artifact (JSON)
    /// Defaults to models/latest_model.json next to the database
    #[arg(long, env = "HABIT_COACH_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Owner the server acts for (UUID); defaults to the local owner
    #[arg(long, env = "HABIT_COACH_OWNER_ID")]
    pub owner_id: Option<String>,

    /// Horizons used by nightly batch runs
    #[arg(long, env = "HABIT_COACH_BATCH_HORIZONS", value_delimiter = ',', default_value = "3,7,14")]
    pub batch_horizons: Vec<u32>,

    /// Run the nightly batch for today and exit instead of serving
    #[arg(long)]
    pub run_nightly: bool,

    /// Enable debug logging
    #[arg(short, long, env = "HABIT_COACH_DEBUG")]
    pub debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long, env = "HABIT_COACH_VERBOSE")]
    pub verbose: bool,
}

impl Args {
    /// Log filter directive for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.debug {
            "info"
        } else {
            "warn"
        }
    }
}

/// Resolved runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    pub model_path: Option<PathBuf>,
    pub owner_id: OwnerId,
    pub batch_horizons: Vec<u32>,
}

impl Settings {
    /// Settings for a database path with every other value defaulted
    pub fn for_database(database_path: PathBuf) -> Self {
        Self {
            model_path: Some(default_model_path(&database_path)),
            database_path,
            owner_id: OwnerId::local(),
            batch_horizons: DEFAULT_BATCH_HORIZONS.to_vec(),
        }
    }

    pub fn from_args(args: &Args) -> Result<Self, ServerError> {
        let database_path = match &args.database {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                path.clone()
            }
            None => default_database_path()?,
        };

        let model_path = args
            .model_path
            .clone()
            .unwrap_or_else(|| default_model_path(&database_path));

        let owner_id = match &args.owner_id {
            Some(raw) => OwnerId::from_string(raw)
                .map_err(|e| ServerError::Config(format!("Invalid owner id '{}': {}", raw, e)))?,
            None => OwnerId::local(),
        };

        let batch_horizons = if args.batch_horizons.is_empty() {
            DEFAULT_BATCH_HORIZONS.to_vec()
        } else {
            args.batch_horizons.clone()
        };
        for horizon in &batch_horizons {
            validate_horizon(*horizon)?;
        }

        Ok(Self {
            database_path,
            model_path: Some(model_path),
            owner_id,
            batch_horizons,
        })
    }
}

/// `<data dir>/models/latest_model.json`, where the data dir holds the database
pub fn default_model_path(database_path: &Path) -> PathBuf {
    let data_dir = database_path.parent().unwrap_or_else(|| Path::new("."));
    data_dir.join("models").join(DEFAULT_MODEL_FILE)
}

/// Get the default database path with robust fallback strategy
pub fn default_database_path() -> Result<PathBuf, std::io::Error> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::home_dir().map(|p| p.join(".habit_coach")),
        dirs::data_dir().map(|p| p.join("habit_coach")),
        dirs::config_dir().map(|p| p.join("habit_coach")),
        std::env::current_dir().ok().map(|p| p.join(".habit_coach")),
    ];

    for dir in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(dir).is_ok() {
            let probe = dir.join(".test_write");
            if std::fs::write(&probe, "test").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return Ok(dir.join("habits.db"));
            }
        }
    }

    let temp_dir = std::env::temp_dir().join("habit_coach");
    std::fs::create_dir_all(&temp_dir)?;
    let db_path = temp_dir.join("habits.db");

    tracing::warn!("Using temporary directory for database: {}", db_path.display());
    Ok(db_path)
}
