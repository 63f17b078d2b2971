// crates/toolgate-mcp/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Name-to-route table and fixed protocol payloads.
// Purpose: Materialize discovered operations into an immutable snapshot.
// Dependencies: serde, serde_json, toolgate-schema
// ============================================================================

//! ## Overview
//! The registry turns the declarative list of discovered operations into an
//! immutable snapshot: the ordered tool list served by `tools/list`, the
//! name-to-route table consulted by `tools/call`, and the fixed handshake
//! and liveness payloads. Rebuilds are wholesale: a new snapshot is built
//! completely, then swapped in atomically, so readers never observe a
//! partially populated registry.
//!
//! ## Invariants
//! - Tool names are unique and non-empty; violations abort the build.
//! - Routes join the base path and method path with exactly one slash.
//! - Snapshots are immutable after construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use toolgate_schema::MessageResolver;
use toolgate_schema::TypeShape;
use toolgate_schema::compile;
use toolgate_schema::render;

use crate::protocol::PROTOCOL_VERSION;
use crate::protocol::SERVER_NAME;
use crate::protocol::SERVER_VERSION;

// ============================================================================
// SECTION: Operations
// ============================================================================

/// One discovered backend operation supplied by the embedding application.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    /// Explicit tool name; blank or absent falls back to `method_id`.
    pub name: Option<String>,
    /// Identifier of the backing operation, used as the fallback tool name
    /// and in configuration-error messages.
    pub method_id: String,
    /// Label key resolved into the tool description.
    pub label_key: String,
    /// Base path of the owning API group.
    pub base_path: String,
    /// Relative path of the operation.
    pub method_path: String,
    /// Structured input shape; absent means the tool takes no structured
    /// arguments.
    pub input: Option<TypeShape>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry build failures; all are fatal configuration errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two operations resolved to the same tool name.
    #[error(
        "duplicate tool name '{name}' (operations '{first}' and '{second}'); tool names must be \
         unique"
    )]
    DuplicateToolName {
        /// The conflicting tool name.
        name: String,
        /// Identifier of the operation that registered the name first.
        first: String,
        /// Identifier of the operation that collided with it.
        second: String,
    },
    /// An operation resolved to an empty tool name.
    #[error("tool name resolved empty for operation '{operation}'")]
    EmptyToolName {
        /// Identifier of the offending operation.
        operation: String,
    },
    /// The tool list payload could not be serialized.
    #[error("tool list serialization failed")]
    Serialize,
}

// ============================================================================
// SECTION: Tool Descriptors
// ============================================================================

/// One registered tool, created at build time and immutable thereafter.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    /// Unique, non-empty tool name.
    pub name: String,
    /// Human description resolved from the operation label key.
    pub description: String,
    /// Compiled input schema; null means the tool accepts no structured
    /// arguments but is still callable.
    #[serde(rename = "inputSchema")]
    pub input_schema: Option<Value>,
    /// Backend route the tool forwards to.
    #[serde(skip)]
    pub route: String,
}

/// Serialized `tools/list` result with the always-null cursor omitted.
#[derive(Debug, Serialize)]
struct ToolsListResult<'a> {
    /// Registered tools in registration order.
    tools: &'a [ToolDescriptor],
    /// Pagination cursor; always absent in this design.
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    next_cursor: Option<String>,
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

/// Fully built, immutable registry state.
#[derive(Debug)]
pub struct RegistrySnapshot {
    /// Registered tools in registration order.
    pub tools: Vec<ToolDescriptor>,
    /// Tool name to backend route table.
    routes: BTreeMap<String, String>,
    /// Fixed `tools/list` result payload.
    pub tools_payload: Value,
    /// Fixed handshake payload.
    pub initialize_payload: Value,
    /// Fixed liveness payload.
    pub ping_payload: Value,
}

impl RegistrySnapshot {
    /// Builds a snapshot from discovered operations.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for duplicate or empty tool names; nothing
    /// is partially published on failure.
    pub fn build(
        operations: &[OperationDescriptor],
        resolver: &dyn MessageResolver,
    ) -> Result<Self, RegistryError> {
        let mut tools = Vec::with_capacity(operations.len());
        let mut routes = BTreeMap::new();
        let mut owners: BTreeMap<String, String> = BTreeMap::new();

        for operation in operations {
            let name = operation
                .name
                .as_deref()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(&operation.method_id)
                .to_string();
            if name.trim().is_empty() {
                return Err(RegistryError::EmptyToolName {
                    operation: operation.method_id.clone(),
                });
            }
            if let Some(first) = owners.get(&name) {
                return Err(RegistryError::DuplicateToolName {
                    name,
                    first: first.clone(),
                    second: operation.method_id.clone(),
                });
            }

            let description = resolver.resolve(&operation.label_key);
            let input_schema = operation
                .input
                .as_ref()
                .map(|shape| render(&compile(shape, resolver), false));
            let route = join_route(&operation.base_path, &operation.method_path);

            owners.insert(name.clone(), operation.method_id.clone());
            routes.insert(name.clone(), route.clone());
            tools.push(ToolDescriptor {
                name,
                description,
                input_schema,
                route,
            });
        }

        let tools_payload = serde_json::to_value(ToolsListResult {
            tools: &tools,
            next_cursor: None,
        })
        .map_err(|_| RegistryError::Serialize)?;

        Ok(Self {
            tools,
            routes,
            tools_payload,
            initialize_payload: initialize_payload(),
            ping_payload: ping_payload(),
        })
    }

    /// Resolves a tool name to its backend route.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.routes.get(name).map(String::as_str)
    }
}

/// Fixed handshake payload advertised by `initialize`.
fn initialize_payload() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": true } },
        "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
    })
}

/// Fixed liveness payload advertised by `ping`.
fn ping_payload() -> Value {
    json!({ "ok": true })
}

/// Joins a base path and method path with exactly one separating slash.
fn join_route(base_path: &str, method_path: &str) -> String {
    let mut base = base_path.trim().to_string();
    if !base.starts_with('/') {
        base.insert(0, '/');
    }
    if base.ends_with('/') {
        base.pop();
    }
    let mut method = method_path.trim().to_string();
    if !method.starts_with('/') {
        method.insert(0, '/');
    }
    format!("{base}{method}")
}

// ============================================================================
// SECTION: Registry Handle
// ============================================================================

/// Swappable handle over the current registry snapshot.
///
/// Readers clone the snapshot Arc and never block writers; rebuilds replace
/// the whole snapshot atomically.
#[derive(Debug)]
pub struct ToolRegistry {
    /// Current snapshot behind the swappable handle.
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl ToolRegistry {
    /// Builds a registry and publishes its first snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the snapshot cannot be built.
    pub fn build(
        operations: &[OperationDescriptor],
        resolver: &dyn MessageResolver,
    ) -> Result<Self, RegistryError> {
        let snapshot = RegistrySnapshot::build(operations, resolver)?;
        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        let guard = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Rebuilds the registry wholesale and swaps the snapshot atomically.
    ///
    /// The previous snapshot stays published when the rebuild fails.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the new snapshot cannot be built.
    pub fn rebuild(
        &self,
        operations: &[OperationDescriptor],
        resolver: &dyn MessageResolver,
    ) -> Result<(), RegistryError> {
        let next = Arc::new(RegistrySnapshot::build(operations, resolver)?);
        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
