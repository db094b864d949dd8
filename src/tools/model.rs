/// Tools for the prediction model lifecycle
///
/// This module implements the model_reload and model_status MCP tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analytics::ModelStatus;
use crate::storage::HabitStorage;
use crate::tools::ToolContext;

/// Both model tools take no arguments
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ModelParams {}

#[derive(Debug, Serialize)]
pub struct ModelResponse {
    pub status: ModelStatus,
    pub message: String,
}

/// Re-read the model artifact; failure leaves the fallback heuristic active
pub fn reload_model<S: HabitStorage>(ctx: &ToolContext<'_, S>, _params: ModelParams) -> ModelResponse {
    let loaded = ctx.engine.reload_model();
    let status = ctx.engine.model_status();
    let message = if loaded {
        format!("✅ Model reloaded ({} features)", status.feature_count)
    } else {
        "⚠️ Model could not be loaded; predictions use the fallback heuristic".to_string()
    };
    ModelResponse { status, message }
}

pub fn model_status<S: HabitStorage>(ctx: &ToolContext<'_, S>, _params: ModelParams) -> ModelResponse {
    let status = ctx.engine.model_status();
    let message = match (&status.loaded, &status.source) {
        (true, Some(source)) => format!("Trained model active from {} ({} features)", source, status.feature_count),
        (true, None) => format!("Trained model active ({} features)", status.feature_count),
        (false, _) => "No trained model loaded; using fallback heuristic".to_string(),
    };
    ModelResponse { status, message }
}
