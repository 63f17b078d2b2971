// crates/toolgate-mcp/src/server.rs
// ============================================================================
// Module: Gateway Server
// Description: HTTP wiring for the session gate and protocol dispatcher.
// Purpose: Serve the MCP exchange over a single signed POST endpoint.
// Dependencies: axum, serde_json, tokio, url
// ============================================================================

//! ## Overview
//! The gateway server binds one POST route for the protocol endpoint and
//! runs every request through the session gate middleware first. Rejected
//! requests never reach the dispatcher; verified requests carry their
//! [`SessionContext`] in the request extensions. Protocol responses are
//! always `200 OK` envelopes; only the gate answers with bare status codes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::HOST;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use thiserror::Error;

use crate::audit::GateAuditSink;
use crate::config::ToolgateConfig;
use crate::dispatcher::ProtocolDispatcher;
use crate::identity::IdentityProvider;
use crate::protocol::INTERNAL_ERROR;
use crate::protocol::McpRequest;
use crate::protocol::McpResponse;
use crate::registry::RegistryError;
use crate::registry::ToolRegistry;
use crate::session::GateDecision;
use crate::session::REJECTION_BODY;
use crate::session::SessionContext;
use crate::session::SessionGate;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway construction and serving failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Registry build errors.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// Gateway instance wiring the gate, registry, and dispatcher.
pub struct McpGateway {
    /// Bind address parsed from configuration.
    bind: String,
    /// Shared handler state.
    state: Arc<GatewayState>,
    /// Protocol endpoint path.
    mcp_path: String,
}

/// Shared state for HTTP handlers.
struct GatewayState {
    /// Inbound signed-request verifier.
    gate: SessionGate,
    /// Protocol dispatcher.
    dispatcher: ProtocolDispatcher,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
    /// Fallback serving host when the request carries no Host header.
    serving_host: String,
}

impl McpGateway {
    /// Builds a gateway from configuration and its external collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when validation or registry build fails.
    pub fn from_config(
        config: &ToolgateConfig,
        identities: Arc<dyn IdentityProvider>,
        audit: Arc<dyn GateAuditSink>,
    ) -> Result<Self, GatewayError> {
        config.validate().map_err(|err| GatewayError::Config(err.to_string()))?;
        let resolver = config.message_resolver();
        let registry = ToolRegistry::build(&config.operations(), &resolver)?;
        let dispatcher = ProtocolDispatcher::new(
            Arc::new(registry),
            Duration::from_secs(config.gateway.openapi_timeout_secs),
        );
        let gate = SessionGate::new(config.gateway.protected_prefix.clone(), identities, audit);
        Ok(Self {
            bind: config.server.bind.clone(),
            mcp_path: config.gateway.mcp_path.clone(),
            state: Arc::new(GatewayState {
                gate,
                dispatcher,
                max_body_bytes: config.server.max_body_bytes,
                serving_host: config.server.bind.clone(),
            }),
        })
    }

    /// Returns the router for embedding or tests.
    #[must_use]
    pub fn into_router(self) -> Router {
        let state = Arc::clone(&self.state);
        Router::new()
            .route(&self.mcp_path, post(handle_mcp))
            .layer(middleware::from_fn_with_state(state, gate_middleware))
            .with_state(self.state)
    }

    /// Binds the configured address and serves requests until failure.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|_| GatewayError::Config("invalid bind address".to_string()))?;
        let app = self.into_router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| GatewayError::Transport("http bind failed".to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|_| GatewayError::Transport("http server failed".to_string()))
    }
}

// ============================================================================
// SECTION: Middleware
// ============================================================================

/// Runs the session gate ahead of every route.
async fn gate_middleware(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let query = parse_query(request.uri().query());
    let serving_host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(&state.serving_host)
        .to_string();

    match state.gate.evaluate(&path, &query, request.headers(), &serving_host) {
        GateDecision::Bypass => next.run(request).await,
        GateDecision::Allow(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        GateDecision::Reject(status) => rejection_response(status),
    }
}

/// Builds the constant-shape rejection response for a gate denial.
fn rejection_response(status: u16) -> Response {
    let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (code, REJECTION_BODY).into_response()
}

/// Decodes the query string into a parameter map, keeping the first value
/// per key.
fn parse_query(query: Option<&str>) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
    }
    params
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles the protocol endpoint.
async fn handle_mcp(State(state): State<Arc<GatewayState>>, request: Request) -> Response {
    let session = request.extensions().get::<SessionContext>().cloned();
    let bytes = match axum::body::to_bytes(request.into_body(), state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => {
            let response = McpResponse::failure(
                serde_json::Value::Null,
                INTERNAL_ERROR,
                "request body too large",
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, axum::Json(response)).into_response();
        }
    };

    let decoded: Option<McpRequest> = serde_json::from_slice(&bytes).ok();
    let response = state.dispatcher.handle(session.as_ref(), decoded);
    (StatusCode::OK, axum::Json(response)).into_response()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
