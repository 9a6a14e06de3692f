//! MCP request dispatch.
//!
//! [`McpServer`] is transport-agnostic: it turns one incoming line into at
//! most one outgoing line. Tool calls run synchronously on the caller's
//! thread, so async transports must invoke it from a blocking context.

use std::sync::Arc;

use serde_json::{Value, json};

use super::protocol::{
    INVALID_PARAMS, INVALID_REQUEST, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::tools::ToolRegistry;

/// Dispatches MCP methods to a [`ToolRegistry`].
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    name: String,
    version: String,
}

impl McpServer {
    /// Serve `registry` under the advertised server `name`.
    pub fn new(registry: Arc<ToolRegistry>, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// The registry backing `tools/list` and `tools/call`.
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Handle one raw line. Returns the serialized response, or `None` for
    /// notifications and blank lines.
    pub fn handle_line(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<Value>(trimmed) {
            Err(e) => {
                tracing::warn!(error = %e, "unparsable JSON-RPC line");
                Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ))
            }
            Ok(value) => {
                let id = value.get("id").cloned().unwrap_or(Value::Null);
                match serde_json::from_value::<JsonRpcRequest>(value) {
                    Ok(request) => self.handle_request(request),
                    Err(e) => Some(JsonRpcResponse::error(
                        id,
                        INVALID_REQUEST,
                        format!("Invalid request: {e}"),
                    )),
                }
            }
        }?;

        match serde_json::to_string(&response) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize JSON-RPC response");
                None
            }
        }
    }

    /// Handle a parsed request. Notifications never produce a response.
    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            tracing::debug!(method = %request.method, "notification received");
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize_result()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.registry.descriptors() })),
            "tools/call" => self.call_tool(&request.params),
            other => Err((METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err((code, message)) => JsonRpcResponse::error(id, code, message),
        })
    }

    fn initialize_result(&self) -> Value {
        tracing::info!(server = %self.name, version = %self.version, "client initialized session");
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": self.name, "version": self.version },
        })
    }

    fn call_tool(&self, params: &Value) -> Result<Value, (i64, String)> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| (INVALID_PARAMS, "tools/call requires a string 'name'".to_owned()))?;
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args @ Value::Object(_)) => args.clone(),
            Some(_) => {
                return Err((INVALID_PARAMS, "'arguments' must be an object".to_owned()));
            }
        };

        let Some(result) = self.registry.call(name, arguments) else {
            let message = if self.registry.is_blocked_by_mode(name) {
                format!("Tool not available in read-only mode: {name}")
            } else {
                format!("Unknown tool: {name}")
            };
            return Err((INVALID_PARAMS, message));
        };

        let envelope = result.to_envelope();
        Ok(json!({
            "content": [{ "type": "text", "text": envelope.to_string() }],
            "structuredContent": envelope,
            "isError": !result.success,
        }))
    }
}
