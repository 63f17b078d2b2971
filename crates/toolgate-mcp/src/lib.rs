// crates/toolgate-mcp/src/lib.rs
// ============================================================================
// Module: Toolgate MCP
// Description: Signed MCP gateway over an internal OpenAPI backend.
// Purpose: Authenticate, dispatch, and forward tool calls.
// Dependencies: axum, reqwest, serde, tokio, toolgate-schema
// ============================================================================

//! ## Overview
//! Toolgate exposes configured backend operations as MCP tools. Inbound
//! requests pass the session gate (signed-parameter verification against
//! resolved identities), the protocol dispatcher interprets the four fixed
//! methods, and tool invocations are forwarded to the backend as signed
//! JSON POSTs through the OpenAPI client. The tool registry materializes
//! operations into an immutable snapshot consulted by every request.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod config;
pub mod dispatcher;
pub mod identity;
pub mod openapi;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod signing;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::GateAuditEvent;
pub use audit::GateAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use config::ConfigError;
pub use config::ToolgateConfig;
pub use dispatcher::DEFAULT_BACKEND_HOST;
pub use dispatcher::ProtocolDispatcher;
pub use identity::Identity;
pub use identity::IdentityProvider;
pub use identity::StaticIdentityProvider;
pub use openapi::DEFAULT_OPENAPI_TIMEOUT_SECS;
pub use openapi::OpenApiClient;
pub use openapi::OpenApiError;
pub use protocol::McpMethod;
pub use protocol::McpRequest;
pub use protocol::McpResponse;
pub use registry::OperationDescriptor;
pub use registry::RegistryError;
pub use registry::RegistrySnapshot;
pub use registry::ToolRegistry;
pub use server::GatewayError;
pub use server::McpGateway;
pub use session::GateDecision;
pub use session::SessionContext;
pub use session::SessionGate;
