// crates/toolgate-mcp/src/dispatcher.rs
// ============================================================================
// Module: Protocol Dispatcher
// Description: Method dispatch over the fixed protocol and tool forwarding.
// Purpose: Map decoded protocol messages onto registry lookups and backend
// calls.
// Dependencies: serde_json, tokio
// ============================================================================

//! ## Overview
//! The dispatcher interprets one protocol message per request: the three
//! fixed methods answer from the current registry snapshot, and
//! `tools/call` resolves the tool name to its backend route, forwards the
//! arguments through the signed channel, and wraps the raw backend body as
//! a single text content block. Every failure raised while handling a
//! method is caught at the dispatch boundary and converted into an
//! internal-error envelope; nothing escapes to the transport layer.
//!
//! ## Invariants
//! - Dispatch is stateless per request beyond the immutable snapshot.
//! - Unknown tools fail before any backend call is attempted.
//! - Backend failures carry status and body but never retry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::openapi::OpenApiClient;
use crate::openapi::OpenApiError;
use crate::protocol::INTERNAL_ERROR;
use crate::protocol::METHOD_NOT_FOUND;
use crate::protocol::McpMethod;
use crate::protocol::McpRequest;
use crate::protocol::McpResponse;
use crate::protocol::ToolCallParams;
use crate::protocol::ToolCallResult;
use crate::protocol::id_text;
use crate::registry::RegistrySnapshot;
use crate::registry::ToolRegistry;
use crate::session::SessionContext;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fallback backend host used when the request context carries none.
pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1:8111";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures raised while handling a tool call.
#[derive(Debug, Error)]
enum DispatchError {
    /// The tool call parameters could not be decoded.
    #[error("invalid tool call params: {0}")]
    InvalidParams(String),
    /// The tool name is absent from the registry.
    #[error("Tool {0} not found.")]
    ToolNotFound(String),
    /// The request context carries no usable credentials.
    #[error("AccessKey/SecretKey is missing.")]
    MissingCredentials,
    /// The forwarded backend call failed.
    #[error(transparent)]
    Backend(#[from] OpenApiError),
    /// The tool call result could not be serialized.
    #[error("tool result serialization failed")]
    Serialize,
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Stateless dispatcher over the fixed protocol methods.
pub struct ProtocolDispatcher {
    /// Registry consulted for listings and route resolution.
    registry: Arc<ToolRegistry>,
    /// Bounded timeout applied to forwarded backend calls.
    openapi_timeout: Duration,
}

impl ProtocolDispatcher {
    /// Builds a dispatcher over a registry with the given forwarding
    /// timeout.
    #[must_use]
    pub const fn new(registry: Arc<ToolRegistry>, openapi_timeout: Duration) -> Self {
        Self {
            registry,
            openapi_timeout,
        }
    }

    /// Handles one decoded protocol request.
    ///
    /// A `None` request models an absent or undecodable payload and yields
    /// an internal-error envelope with a null id.
    #[must_use]
    pub fn handle(
        &self,
        session: Option<&SessionContext>,
        request: Option<McpRequest>,
    ) -> McpResponse {
        let Some(request) = request else {
            return McpResponse::failure(Value::Null, INTERNAL_ERROR, "Empty request");
        };

        let id = id_text(request.id.as_ref());
        let method_name = request.method.unwrap_or_default();
        let Some(method) = McpMethod::parse(&method_name) else {
            return McpResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("Unknown method: {method_name}"),
            );
        };

        let snapshot = self.registry.snapshot();
        let outcome = match method {
            McpMethod::Initialize => Ok(snapshot.initialize_payload.clone()),
            McpMethod::Ping => Ok(snapshot.ping_payload.clone()),
            McpMethod::ToolsList => Ok(snapshot.tools_payload.clone()),
            McpMethod::ToolsCall => self.handle_tool_call(session, &snapshot, request.params),
        };

        match outcome {
            Ok(result) => McpResponse::success(id, result),
            Err(error) => {
                McpResponse::failure(id, INTERNAL_ERROR, format!("Internal error: {error}"))
            }
        }
    }

    /// Resolves and forwards one tool invocation.
    fn handle_tool_call(
        &self,
        session: Option<&SessionContext>,
        snapshot: &RegistrySnapshot,
        params: Option<Value>,
    ) -> Result<Value, DispatchError> {
        let call: ToolCallParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|err| DispatchError::InvalidParams(err.to_string()))?;

        let Some(route) = snapshot.resolve(&call.name) else {
            return Err(DispatchError::ToolNotFound(call.name));
        };

        let session = session.ok_or(DispatchError::MissingCredentials)?;
        if session.access_key.trim().is_empty() || session.secret_key.trim().is_empty() {
            return Err(DispatchError::MissingCredentials);
        }
        let host = if session.api_host.trim().is_empty() {
            DEFAULT_BACKEND_HOST
        } else {
            session.api_host.as_str()
        };

        let client = OpenApiClient::new(
            host,
            self.openapi_timeout,
            session.access_key.clone(),
            session.secret_key.clone(),
        )?;
        let content = serde_json::to_string(&call.arguments)
            .map_err(|_| DispatchError::Serialize)?;
        let body = call_with_blocking(|| client.post_json(route, &content))?;

        serde_json::to_value(ToolCallResult::from_text(body))
            .map_err(|_| DispatchError::Serialize)
    }
}

/// Runs a blocking closure, shifting to a blocking context when the caller
/// sits on a multi-thread runtime.
fn call_with_blocking<T>(operation: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(operation)
        }
        _ => operation(),
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

    use std::collections::BTreeMap;

    use serde_json::json;
    use toolgate_schema::KeyResolver;

    use super::*;
    use crate::registry::OperationDescriptor;

    /// Builds a dispatcher over a single echo tool.
    fn dispatcher() -> ProtocolDispatcher {
        let registry = ToolRegistry::build(
            &[OperationDescriptor {
                name: Some("echo".to_string()),
                method_id: "echoMessage".to_string(),
                label_key: "tool.echo".to_string(),
                base_path: "/api".to_string(),
                method_path: "echo".to_string(),
                input: None,
            }],
            &KeyResolver,
        )
        .unwrap();
        ProtocolDispatcher::new(Arc::new(registry), Duration::from_secs(1))
    }

    /// Builds a request with the given method and params.
    fn request(id: Value, method: &str, params: Option<Value>) -> Option<McpRequest> {
        Some(McpRequest {
            id: Some(id),
            method: Some(method.to_string()),
            params,
        })
    }

    /// Builds a session context pointing at an unreachable backend.
    fn session() -> SessionContext {
        SessionContext {
            request_id: "req-1".to_string(),
            access_key: "ak-1".to_string(),
            secret_key: "sk-1".to_string(),
            api_host: "127.0.0.1:1".to_string(),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn ping_returns_exactly_ok_true_regardless_of_params() {
        let response =
            dispatcher().handle(None, request(json!(1), "ping", Some(json!({"x": 1}))));
        assert_eq!(response.id, json!("1"));
        assert_eq!(response.result, Some(json!({"ok": true})));
        assert!(response.error.is_none());
    }

    #[test]
    fn initialize_returns_the_fixed_handshake() {
        let response = dispatcher().handle(None, request(json!("a"), "initialize", None));
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], json!("2025-06-18"));
        assert_eq!(result["serverInfo"]["name"], json!("Toolgate-MCP"));
    }

    #[test]
    fn tools_list_returns_the_snapshot_payload() {
        let response = dispatcher().handle(None, request(json!(2), "tools/list", None));
        let result = response.result.unwrap();
        assert_eq!(result["tools"][0]["name"], json!("echo"));
    }

    #[test]
    fn unknown_methods_fail_with_the_method_not_found_code() {
        let response = dispatcher().handle(None, request(json!(3), "tools/watch", None));
        let error = response.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert!(error.message.contains("tools/watch"));
        assert_eq!(response.id, json!("3"));
    }

    #[test]
    fn absent_requests_fail_internally_with_a_null_id() {
        let response = dispatcher().handle(None, None);
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, INTERNAL_ERROR);
    }

    #[test]
    fn unknown_tools_fail_without_reaching_the_backend() {
        let response = dispatcher().handle(
            Some(&session()),
            request(json!(4), "tools/call", Some(json!({"name": "missing", "arguments": {}}))),
        );
        let error = response.error.unwrap();
        assert_eq!(error.code, INTERNAL_ERROR);
        assert!(error.message.contains("Tool missing not found."));
    }

    #[test]
    fn tool_calls_without_credentials_fail_internally() {
        let response = dispatcher().handle(
            None,
            request(json!(5), "tools/call", Some(json!({"name": "echo", "arguments": {}}))),
        );
        let error = response.error.unwrap();
        assert_eq!(error.code, INTERNAL_ERROR);
        assert!(error.message.contains("AccessKey/SecretKey is missing."));
    }
}
