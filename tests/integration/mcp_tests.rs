use std::sync::Arc;

use serde_json::{Value, json};

use recall::cli::commands::mcp::{
    INVALID_PARAMS, INVALID_REQUEST, McpServer, METHOD_NOT_FOUND, PARSE_ERROR, serve,
};

use crate::fixture::{FixedRecency, auth_flow_coordinator, empty_coordinator};

fn server() -> McpServer {
    McpServer::new(Arc::new(auth_flow_coordinator()))
}

async fn call(server: &McpServer, request: Value) -> Value {
    server
        .handle_line(&request.to_string())
        .await
        .expect("request with id gets a response")
        .to_value()
}

fn tool_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn initialize_and_list_tools() {
    let server = server();

    let init = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    )
    .await;
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["result"]["serverInfo"]["name"], "recall");

    let tools = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
    let names: Vec<&str> = tools["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["memory_search", "memory_search_fallback"]);
}

#[tokio::test]
async fn memory_search_returns_camel_case_payload() {
    let response = call(
        &server(),
        json!({
            "jsonrpc": "2.0",
            "id": "q1",
            "method": "tools/call",
            "params": {
                "name": "memory_search",
                "arguments": {
                    "query": "auth flow",
                    "strategies": ["direct_fts", "semantic"]
                }
            }
        }),
    )
    .await;

    assert!(response.get("error").is_none());
    let payload = tool_payload(&response);
    assert_eq!(payload["searchType"], "multi_strategy");
    assert_eq!(payload["confidence"], "high");
    assert_eq!(payload["resultCount"], 3);
    assert_eq!(payload["strategiesAttempted"], 2);
    assert_eq!(payload["strategiesSucceeded"], 2);
    assert_eq!(payload["strategies"][0]["strategy"], "direct_fts");
    assert_eq!(payload["strategies"][1]["strategy"], "semantic");
    let ids: Vec<&str> = payload["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["B", "A", "C"]);
    assert_eq!(payload["strategies"][0]["success"], true);
    assert_eq!(payload["strategies"][0]["resultCount"], 2);
    assert!(payload["clarificationPrompt"].is_null());
}

#[tokio::test]
async fn fallback_tool_reports_clarification() {
    let coordinator =
        empty_coordinator().with_recency_scanner(Arc::new(FixedRecency(Vec::new())));
    let server = McpServer::new(Arc::new(coordinator));

    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {
                "name": "memory_search_fallback",
                "arguments": {"query": "flaky test", "brute_force": false}
            }
        }),
    )
    .await;

    let payload = tool_payload(&response);
    assert_eq!(payload["searchType"], "with_fallbacks");
    assert_eq!(payload["confidence"], "low");
    assert_eq!(payload["resultCount"], 0);
    assert_eq!(
        payload["fallbacksAttempted"],
        json!(["recency_scan", "clarification"])
    );
    assert!(
        payload["clarificationPrompt"]
            .as_str()
            .unwrap()
            .contains("flaky test")
    );
}

#[tokio::test]
async fn malformed_requests_map_to_json_rpc_codes() {
    let server = server();

    let parse = server.handle_line("{not json").await.unwrap().to_value();
    assert_eq!(parse["error"]["code"], PARSE_ERROR);
    assert!(parse["id"].is_null());

    let version = call(&server, json!({"jsonrpc": "1.0", "id": 1, "method": "ping"})).await;
    assert_eq!(version["error"]["code"], INVALID_REQUEST);

    let no_method = call(&server, json!({"jsonrpc": "2.0", "id": 2})).await;
    assert_eq!(no_method["error"]["code"], INVALID_REQUEST);

    let unknown = call(&server, json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"})).await;
    assert_eq!(unknown["error"]["code"], METHOD_NOT_FOUND);

    let no_tool = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {}}),
    )
    .await;
    assert_eq!(no_tool["error"]["code"], INVALID_PARAMS);
}

#[tokio::test]
async fn argument_errors_carry_structured_data() {
    let server = server();

    let empty = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": {"name": "memory_search", "arguments": {"query": "  "}}
        }),
    )
    .await;
    assert_eq!(empty["error"]["code"], INVALID_PARAMS);
    assert_eq!(empty["error"]["data"]["numeric_code"], 101);
    assert_eq!(empty["error"]["data"]["category"], "argument");

    let layer = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "tools/call",
            "params": {"name": "memory_search", "arguments": {"query": "x", "layer": "wiki"}}
        }),
    )
    .await;
    assert_eq!(layer["error"]["code"], INVALID_PARAMS);
    assert_eq!(layer["error"]["data"]["code"], "UNKNOWN_LAYER");

    let zero = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 8,
            "method": "tools/call",
            "params": {"name": "memory_search", "arguments": {"query": "x", "limit": 0}}
        }),
    )
    .await;
    assert_eq!(zero["error"]["code"], INVALID_PARAMS);

    let huge = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "tools/call",
            "params": {"name": "memory_search", "arguments": {"query": "x", "limit": 1_u64 << 40}}
        }),
    )
    .await;
    assert_eq!(huge["error"]["code"], INVALID_PARAMS);
    assert_eq!(huge["error"]["data"]["category"], "argument");
}

#[tokio::test]
async fn notifications_get_no_response() {
    let server = server();
    let line = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
    assert!(server.handle_line(&line).await.is_none());
}

#[tokio::test]
async fn serve_loop_answers_each_line_and_stops_at_shutdown() {
    let server = server();
    let input = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string(),
        String::new(),
        json!({"jsonrpc": "2.0", "method": "initialized"}).to_string(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "shutdown"}).to_string(),
        json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}).to_string(),
    ]
    .join("\n");

    let mut output = Vec::new();
    serve(&server, input.as_bytes(), &mut output).await.unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["id"], 2);
    assert!(server.is_shutdown());
}
