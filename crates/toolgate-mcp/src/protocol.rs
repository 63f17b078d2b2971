// crates/toolgate-mcp/src/protocol.rs
// ============================================================================
// Module: Protocol Wire Types
// Description: Request and response envelopes for the MCP exchange.
// Purpose: Reproduce the wire shapes bit-for-bit.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The protocol is a small JSON-RPC-like exchange: requests are
//! `{id, method, params}`, successes are `{id, result}`, failures are
//! `{id, error:{code, message}}`. Request ids are echoed back as text;
//! a missing or undecodable request echoes a null id. Error codes form a
//! two-value taxonomy at this layer: method-not-found and internal-error.
//! Finer-grained backend failures travel inside successful envelopes as
//! text content.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Error code for unrecognized protocol methods.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Error code for internal failures surfaced at the dispatch boundary.
pub const INTERNAL_ERROR: i64 = -32603;

/// Protocol version advertised in the handshake.
pub const PROTOCOL_VERSION: &str = "2025-06-18";
/// Server name advertised in the handshake.
pub const SERVER_NAME: &str = "Toolgate-MCP";
/// Server version advertised in the handshake.
pub const SERVER_VERSION: &str = "1.0.0";

// ============================================================================
// SECTION: Requests
// ============================================================================

/// Inbound protocol request.
#[derive(Debug, Deserialize)]
pub struct McpRequest {
    /// Caller-supplied request identifier, echoed in responses.
    #[serde(default)]
    pub id: Option<Value>,
    /// Protocol method name.
    #[serde(default)]
    pub method: Option<String>,
    /// Method parameters payload.
    #[serde(default)]
    pub params: Option<Value>,
}

/// The closed set of protocol methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpMethod {
    /// Handshake returning the capability descriptor.
    Initialize,
    /// Liveness probe.
    Ping,
    /// Tool enumeration.
    ToolsList,
    /// Tool invocation.
    ToolsCall,
}

impl McpMethod {
    /// Parses a wire method name into the closed method set.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "initialize" => Some(Self::Initialize),
            "ping" => Some(Self::Ping),
            "tools/list" => Some(Self::ToolsList),
            "tools/call" => Some(Self::ToolsCall),
            _ => None,
        }
    }
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to invoke.
    pub name: String,
    /// Structured tool arguments forwarded to the backend.
    #[serde(default)]
    pub arguments: Value,
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Outbound protocol response envelope.
#[derive(Debug, Serialize)]
pub struct McpResponse {
    /// Echoed request identifier (text form, or null when unavailable).
    pub id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl McpResponse {
    /// Builds a success response.
    #[must_use]
    pub const fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Structured protocol error payload.
#[derive(Debug, Serialize)]
pub struct McpError {
    /// Stable numeric error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
}

/// Result payload of `tools/call`: the raw backend body wrapped as a single
/// text content block.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    /// Tool output content blocks.
    pub content: Vec<ContentBlock>,
}

impl ToolCallResult {
    /// Wraps a raw backend body as one text content block.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock {
                kind: "text",
                text: text.into(),
            }],
        }
    }
}

/// One content block in a tool call result.
#[derive(Debug, Serialize)]
pub struct ContentBlock {
    /// Content block type tag.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Raw text payload.
    pub text: String,
}

// ============================================================================
// SECTION: Identifier Echo
// ============================================================================

/// Echoes a caller-supplied id as text, or null when unavailable.
#[must_use]
pub fn id_text(id: Option<&Value>) -> Value {
    match id {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(text)) => Value::String(text.clone()),
        Some(other) => Value::String(other.to_string()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use serde_json::json;

    use super::*;

    #[test]
    fn method_parsing_covers_the_closed_set() {
        assert_eq!(McpMethod::parse("initialize"), Some(McpMethod::Initialize));
        assert_eq!(McpMethod::parse("ping"), Some(McpMethod::Ping));
        assert_eq!(McpMethod::parse("tools/list"), Some(McpMethod::ToolsList));
        assert_eq!(McpMethod::parse("tools/call"), Some(McpMethod::ToolsCall));
        assert_eq!(McpMethod::parse("tools/watch"), None);
    }

    #[test]
    fn success_envelope_omits_the_error_field() {
        let response = McpResponse::success(json!("7"), json!({"ok": true}));
        let payload = serde_json::to_value(&response).unwrap();
        assert_eq!(payload, json!({"id": "7", "result": {"ok": true}}));
    }

    #[test]
    fn error_envelope_omits_the_result_field() {
        let response = McpResponse::failure(Value::Null, INTERNAL_ERROR, "Empty request");
        let payload = serde_json::to_value(&response).unwrap();
        assert_eq!(
            payload,
            json!({"id": null, "error": {"code": -32603, "message": "Empty request"}})
        );
    }

    #[test]
    fn ids_echo_as_text() {
        assert_eq!(id_text(Some(&json!(42))), json!("42"));
        assert_eq!(id_text(Some(&json!("alpha"))), json!("alpha"));
        assert_eq!(id_text(Some(&Value::Null)), Value::Null);
        assert_eq!(id_text(None), Value::Null);
    }

    #[test]
    fn tool_call_result_wraps_raw_text() {
        let payload = serde_json::to_value(ToolCallResult::from_text("{\"rows\":3}")).unwrap();
        assert_eq!(payload, json!({"content": [{"type": "text", "text": "{\"rows\":3}"}]}));
    }
}
