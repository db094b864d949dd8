/// MCP server implementation that handles JSON-RPC communication
///
/// This module implements the actual MCP server that:
/// 1. Reads JSON-RPC requests from stdin, one per line
/// 2. Routes tool calls to the habit coach tools
/// 3. Sends JSON-RPC responses to stdout

use std::collections::HashMap;

use chrono::Utc;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::mcp::protocol::*;
use crate::storage::SqliteStorage;
use crate::tools::{self, ToolContext, ToolError};
use crate::{HabitCoachServer, ServerError};

/// MCP server wrapping a habit coach instance
pub struct McpServer {
    coach: HabitCoachServer,
    initialized: bool,
}

impl McpServer {
    pub fn new(coach: HabitCoachServer) -> Self {
        Self {
            coach,
            initialized: false,
        }
    }

    /// Run the MCP server, handling JSON-RPC over stdin/stdout
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!("Starting MCP server, waiting for JSON-RPC requests...");

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut stdout = tokio::io::stdout();

        let mut line = String::new();

        loop {
            line.clear();

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("MCP server shutting down (stdin closed)");
                    break;
                }
                Ok(_) => {
                    if let Some(response) = self.process_line(&line) {
                        let response_str = serde_json::to_string(&response)?;

                        stdout.write_all(response_str.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                        stdout.flush().await?;

                        debug!("Sent response: {}", response_str);
                    }
                }
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Process a single line of JSON-RPC input
    ///
    /// Returns `None` for blank lines and notifications.
    pub fn process_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                    None,
                ));
            }
        };

        if request.is_notification() {
            self.handle_notification(&request.method);
            return None;
        }

        Some(self.handle_request(request))
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "notifications/initialized" | "initialized" => {
                self.initialized = true;
                info!("MCP client finished initialization");
            }
            other => debug!("Ignoring notification '{}'", other),
        }
    }

    fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Value::Null);
        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tools_call(id, request.params),
            _ => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", request.method),
                None,
            ),
        }
    }

    fn handle_initialize(&mut self, id: Value) -> JsonRpcResponse {
        info!("MCP client connected");

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "Habit Coach MCP".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        to_response(id, &result)
    }

    fn handle_tools_call(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let tool_params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid parameters: {}", e),
                    None,
                );
            }
            None => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    "Missing parameters".to_string(),
                    None,
                );
            }
        };

        if !self.initialized {
            debug!("Tool call '{}' before client sent initialized", tool_params.name);
        }

        let result = self.call_tool(&tool_params.name, tool_params.arguments);
        to_response(id, &result)
    }

    /// Route a tool call by name
    pub fn call_tool(&self, name: &str, args: HashMap<String, Value>) -> ToolCallResult {
        let ctx = self.context();
        debug!("Calling tool {}", name);

        match name {
            "habit_create" => dispatch(args, |p| tools::create_habit(&ctx, p)),
            "habit_checkin" => dispatch(args, |p| tools::record_checkin(&ctx, p)),
            "habit_stats" => dispatch(args, |p| tools::get_habit_stats(&ctx, p)),
            "habit_predict" => dispatch(args, |p| tools::predict_habit(&ctx, p)),
            "predictions_list" => dispatch(args, |p| tools::list_predictions(&ctx, p)),
            "predictions_batch" => dispatch(args, |p| tools::run_predictions_batch(&ctx, p)),
            "weekly_report" => dispatch(args, |p| tools::get_weekly_report(&ctx, p)),
            "model_reload" => dispatch(args, |p| Ok(tools::reload_model(&ctx, p))),
            "model_status" => dispatch(args, |p| Ok(tools::model_status(&ctx, p))),
            _ => ToolCallResult::error(format!("Unknown tool: {}", name)),
        }
    }

    fn context(&self) -> ToolContext<'_, SqliteStorage> {
        ToolContext {
            storage: self.coach.storage(),
            engine: self.coach.analytics(),
            owner_id: *self.coach.owner_id(),
            today: Utc::now().date_naive(),
            batch_horizons: &self.coach.settings().batch_horizons,
        }
    }
}

fn to_response<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            id,
            error_codes::INTERNAL_ERROR,
            format!("Failed to serialize result: {}", e),
            None,
        ),
    }
}

/// Deserialize tool arguments, run the tool and render its response
///
/// The response's `message` field becomes the text content; the remaining
/// fields are attached as a JSON payload.
fn dispatch<P, R, F>(args: HashMap<String, Value>, run: F) -> ToolCallResult
where
    P: DeserializeOwned,
    R: Serialize,
    F: FnOnce(P) -> Result<R, ToolError>,
{
    let params: P = match serde_json::from_value(Value::Object(args.into_iter().collect())) {
        Ok(p) => p,
        Err(e) => return ToolCallResult::error(format!("Invalid arguments: {}", e)),
    };

    let response = match run(params) {
        Ok(response) => response,
        Err(e) => return e.into(),
    };

    let mut data = match serde_json::to_value(&response) {
        Ok(data) => data,
        Err(e) => return ToolCallResult::error(format!("Failed to serialize response: {}", e)),
    };
    let message = data
        .as_object_mut()
        .and_then(|fields| fields.remove("message"))
        .and_then(|m| m.as_str().map(str::to_string))
        .unwrap_or_default();

    ToolCallResult::success_with_data(message, &data)
}

fn schema<P: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(P)).unwrap_or_else(|_| json!({ "type": "object" }))
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Every tool the server offers
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "habit_create",
            "Create a new habit to track",
            schema::<tools::CreateHabitParams>(),
        ),
        tool(
            "habit_checkin",
            "Record a check-in (done or missed) for a habit on a day",
            schema::<tools::CheckinParams>(),
        ),
        tool(
            "habit_stats",
            "Streaks, completion rates and the stats history of a habit",
            schema::<tools::StatsParams>(),
        ),
        tool(
            "habit_predict",
            "Probability of keeping a habit over the next days, with risk level and top factors",
            schema::<tools::PredictParams>(),
        ),
        tool(
            "predictions_list",
            "List stored predictions, newest first",
            schema::<tools::ListPredictionsParams>(),
        ),
        tool(
            "predictions_batch",
            "Create missing predictions for all active habits",
            schema::<tools::BatchParams>(),
        ),
        tool(
            "weekly_report",
            "Weekly summary with completion, streaks and at-risk habits",
            schema::<tools::WeeklyReportParams>(),
        ),
        tool(
            "model_reload",
            "Reload the trained prediction model from disk",
            schema::<tools::ModelParams>(),
        ),
        tool(
            "model_status",
            "Show whether a trained model or the fallback heuristic is active",
            schema::<tools::ModelParams>(),
        ),
    ]
}
