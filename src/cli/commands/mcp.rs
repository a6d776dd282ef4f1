//! recall mcp - MCP (Model Context Protocol) server mode
//!
//! Exposes the search coordinator as MCP tools over stdio. One JSON-RPC 2.0
//! message per line in, one response per line out; logs go to stderr.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::app::AppContext;
use crate::cli::output::{emit_json, search_payload};
use crate::error::{RecallError, Result};
use crate::search::{
    ExpansionLevel, FallbackOptions, MemoryLayer, SearchCoordinator, SearchRequest, StrategyKind,
};

/// MCP server protocol version
const PROTOCOL_VERSION: &str = "2024-11-05";
/// Server name for identification
const SERVER_NAME: &str = "recall";
/// Server version (from cargo)
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const TOOL_SEARCH: &str = "memory_search";
pub const TOOL_SEARCH_FALLBACK: &str = "memory_search_fallback";

#[derive(Args, Debug)]
pub struct McpArgs {
    #[command(subcommand)]
    pub command: McpCommand,
}

#[derive(Subcommand, Debug)]
pub enum McpCommand {
    /// Start MCP server with stdio transport
    Serve,
    /// List available MCP tools
    Tools,
}

// ============================================================================
// JSON-RPC 2.0 Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    /// Error reply for an argument error, with the structured error as `data`.
    fn invalid_params(id: Option<Value>, err: &RecallError) -> Self {
        let data = serde_json::to_value(err.to_structured()).ok();
        Self::error(id, INVALID_PARAMS, err.to_string(), data)
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// JSON-RPC 2.0 error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

// ============================================================================
// MCP Protocol Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
struct ToolsCapability {
    #[serde(rename = "listChanged")]
    list_changed: bool,
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: &'static str,
    capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ToolResult {
    content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ToolContent {
    #[serde(rename = "type")]
    content_type: &'static str,
    text: String,
}

impl ToolResult {
    fn text(text: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text",
                text,
            }],
            is_error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text",
                text: message,
            }],
            is_error: Some(true),
        }
    }
}

// ============================================================================
// Tool Definitions
// ============================================================================

fn search_properties(max_limit: usize) -> serde_json::Map<String, Value> {
    let schema = serde_json::json!({
        "query": {
            "type": "string",
            "description": "What to look for"
        },
        "layer": {
            "type": "string",
            "enum": ["rules", "transcripts", "summaries", "team"],
            "description": "Memory layer to search (default: transcripts)"
        },
        "limit": {
            "type": "integer",
            "minimum": 1,
            "maximum": max_limit,
            "description": "Maximum number of results (default: 10)"
        },
        "expansion": {
            "type": "string",
            "enum": ["none", "minimal", "full"],
            "description": "Query expansion level (default: minimal)"
        },
        "timeout": {
            "type": "integer",
            "minimum": 1,
            "description": "Per-strategy timeout in milliseconds (default: 5000)"
        },
        "strategies": {
            "type": "array",
            "items": {
                "type": "string",
                "enum": ["direct_fts", "expanded_fts", "semantic", "summaries"]
            },
            "description": "Strategies to run (default: every strategy bound to the layer)"
        }
    });
    match schema {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

#[must_use]
pub fn define_tools(max_limit: usize) -> Vec<Tool> {
    let plain = search_properties(max_limit);
    let mut with_fallbacks = search_properties(max_limit);
    with_fallbacks.insert(
        "recency".to_string(),
        serde_json::json!({
            "type": "boolean",
            "description": "Scan the most recent sessions when strategies come up short (default: true)"
        }),
    );
    with_fallbacks.insert(
        "brute_force".to_string(),
        serde_json::json!({
            "type": "boolean",
            "description": "Allow a bounded full scan of raw sessions (default: false)"
        }),
    );

    vec![
        Tool {
            name: TOOL_SEARCH,
            description: "Search project memory with several strategies in parallel and fuse the rankings",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": plain,
                "required": ["query"]
            }),
        },
        Tool {
            name: TOOL_SEARCH_FALLBACK,
            description: "Like memory_search, but falls back to recency and raw scans, then asks for clarification, when confidence is low",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": with_fallbacks,
                "required": ["query"]
            }),
        },
    ]
}

/// `tools/call` arguments of both search tools
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchToolArgs {
    pub query: Option<String>,
    pub layer: Option<String>,
    pub limit: Option<usize>,
    pub expansion: Option<String>,
    /// Milliseconds
    pub timeout: Option<u64>,
    pub strategies: Option<Vec<String>>,
    pub brute_force: Option<bool>,
    pub recency: Option<bool>,
}

impl SearchToolArgs {
    /// Validate and convert into a coordinator request.
    pub fn to_request(&self) -> Result<SearchRequest> {
        let query = self
            .query
            .as_deref()
            .ok_or_else(|| RecallError::InvalidArgument("missing required argument: query".to_string()))?;

        let mut request = SearchRequest::new(query);
        if let Some(layer) = &self.layer {
            request = request.layer(layer.parse::<MemoryLayer>()?);
        }
        if let Some(limit) = self.limit {
            request = request.limit(limit);
        }
        if let Some(level) = &self.expansion {
            request = request.expansion(level.parse::<ExpansionLevel>()?);
        }
        if let Some(ms) = self.timeout {
            request = request.timeout(Duration::from_millis(ms));
        }
        if let Some(names) = &self.strategies {
            let kinds = names
                .iter()
                .map(|name| name.parse::<StrategyKind>())
                .collect::<Result<Vec<_>>>()?;
            request = request.strategies(kinds);
        }
        Ok(request)
    }
}

// ============================================================================
// MCP Server Implementation
// ============================================================================

/// Request handler, independent of the transport
pub struct McpServer {
    coordinator: Arc<SearchCoordinator>,
    shutdown: AtomicBool,
}

impl McpServer {
    #[must_use]
    pub const fn new(coordinator: Arc<SearchCoordinator>) -> Self {
        Self {
            coordinator,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Whether a `shutdown` request has been answered
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Handle one line. Notifications produce no response.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str::<Value>(line) {
            Err(err) => {
                return Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {err}"),
                    None,
                ));
            }
            Ok(value) => {
                let id = value.get("id").cloned();
                match serde_json::from_value(value) {
                    Ok(request) => request,
                    Err(err) => {
                        return Some(JsonRpcResponse::error(
                            id,
                            INVALID_REQUEST,
                            format!("Invalid request: {err}"),
                            None,
                        ));
                    }
                }
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                "Invalid JSON-RPC version",
                None,
            ));
        }

        let is_notification = request.id.is_none();
        let response = match request.method.as_str() {
            "initialize" => Self::handle_initialize(request.id),
            "initialized" | "notifications/initialized" => {
                JsonRpcResponse::success(request.id, serde_json::json!({}))
            }
            "tools/list" => JsonRpcResponse::success(
                request.id,
                serde_json::json!({ "tools": define_tools(self.coordinator.search_config().max_limit) }),
            ),
            "tools/call" => self.handle_tools_call(request.id, &request.params).await,
            "ping" => JsonRpcResponse::success(request.id, serde_json::json!({})),
            "shutdown" => {
                self.shutdown.store(true, Ordering::Release);
                JsonRpcResponse::success(request.id, serde_json::json!({}))
            }
            other => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
                None,
            ),
        };

        if is_notification {
            debug!(method = %request.method, "notification handled");
            None
        } else {
            Some(response)
        }
    }

    fn handle_initialize(id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME,
                version: SERVER_VERSION,
            },
        };
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or(Value::Null))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: &Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                "Missing required parameter: name",
                None,
            );
        };

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        let args: SearchToolArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(err) => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid arguments: {err}"),
                    None,
                );
            }
        };

        debug!(tool = name, ?args, "tool call");

        let request = match args.to_request() {
            Ok(request) => request,
            Err(err) => return JsonRpcResponse::invalid_params(id, &err),
        };

        let outcome = match name {
            TOOL_SEARCH => self.coordinator.search(&request).await,
            TOOL_SEARCH_FALLBACK => {
                let options = FallbackOptions::from_config(self.coordinator.fallback_config())
                    .with_recency(
                        args.recency
                            .unwrap_or(self.coordinator.fallback_config().recency_enabled),
                    )
                    .with_brute_force(
                        args.brute_force
                            .unwrap_or(self.coordinator.fallback_config().brute_force_enabled),
                    );
                self.coordinator
                    .search_with_fallbacks(&request, &options)
                    .await
            }
            other => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Unknown tool: {other}"),
                    None,
                );
            }
        };

        let tool_result = match outcome {
            Ok(result) => {
                let payload = search_payload(&result);
                match serde_json::to_string_pretty(&payload) {
                    Ok(text) => ToolResult::text(text),
                    Err(err) => ToolResult::error(err.to_string()),
                }
            }
            Err(err) if err.is_argument_error() => {
                return JsonRpcResponse::invalid_params(id, &err);
            }
            Err(err) => {
                warn!(tool = name, error = %err, "tool call failed");
                ToolResult::error(err.to_string())
            }
        };

        JsonRpcResponse::success(id, serde_json::to_value(tool_result).unwrap_or(Value::Null))
    }
}

pub async fn run(ctx: &AppContext, args: &McpArgs) -> Result<()> {
    match &args.command {
        McpCommand::Serve => run_serve(ctx).await,
        McpCommand::Tools => run_tools(ctx),
    }
}

fn run_tools(ctx: &AppContext) -> Result<()> {
    let tools = define_tools(ctx.config.search.max_limit);
    if ctx.robot_mode {
        emit_json(&serde_json::json!({
            "tools": tools,
            "count": tools.len()
        }))
    } else {
        println!("Available MCP Tools:\n");
        for tool in &tools {
            println!("  {} - {}", tool.name, tool.description);
        }
        println!("\n{} tools available.", tools.len());
        Ok(())
    }
}

async fn run_serve(ctx: &AppContext) -> Result<()> {
    let coordinator = Arc::new(ctx.coordinator()?);
    info!(
        server = SERVER_NAME,
        version = SERVER_VERSION,
        protocol = PROTOCOL_VERSION,
        "starting MCP server on stdio"
    );
    let server = McpServer::new(coordinator);
    serve(&server, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Line loop over any async reader/writer pair. Ends at EOF or after
/// answering `shutdown`.
pub async fn serve<R, W>(server: &McpServer, reader: R, mut writer: W) -> Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!(request = %line, "<-");

        if let Some(response) = server.handle_line(&line).await {
            let mut encoded = serde_json::to_string(&response)?;
            debug!(response = %encoded, "->");
            encoded.push('\n');
            writer.write_all(encoded.as_bytes()).await?;
            writer.flush().await?;
        }

        if server.is_shutdown() {
            break;
        }
    }

    info!("MCP server shutting down");
    Ok(())
}
