// crates/toolgate-mcp/src/audit.rs
// ============================================================================
// Module: Gate Audit
// Description: Audit events and sinks for session gate decisions.
// Purpose: Emit structured allow/deny records for signed-request checks.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every session gate decision produces a [`GateAuditEvent`] routed through
//! a [`GateAuditSink`]. The default sink writes JSON lines to stderr;
//! the no-op sink keeps tests quiet. Events carry the rejection status code
//! so operators can correlate denials with the constant-shape responses the
//! gate returns to callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use serde::Serialize;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Audit record for one session gate decision.
#[derive(Debug, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision outcome.
    decision: &'static str,
    /// Request path evaluated by the gate.
    path: String,
    /// Caller access key, when one was supplied.
    access_key: Option<String>,
    /// Rejection status code (for deny events).
    status: Option<u16>,
    /// Failure reason (for deny events).
    reason: Option<&'static str>,
    /// Request identifier assigned on allow.
    request_id: Option<String>,
}

impl GateAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(path: &str, access_key: &str, request_id: &str) -> Self {
        Self {
            event: "mcp_session_gate",
            decision: "allow",
            path: path.to_string(),
            access_key: Some(access_key.to_string()),
            status: None,
            reason: None,
            request_id: Some(request_id.to_string()),
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(
        path: &str,
        access_key: Option<&str>,
        status: u16,
        reason: &'static str,
    ) -> Self {
        Self {
            event: "mcp_session_gate",
            decision: "deny",
            path: path.to_string(),
            access_key: access_key.map(str::to_string),
            status: Some(status),
            reason: Some(reason),
            request_id: None,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for gate decisions.
pub trait GateAuditSink: Send + Sync {
    /// Records a gate audit event.
    fn record(&self, event: &GateAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl GateAuditSink for StderrAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl GateAuditSink for NoopAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
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

    use super::*;

    #[test]
    fn deny_events_serialize_the_status_code() {
        let event = GateAuditEvent::denied("/mcp", Some("ak-1"), 497, "signature mismatch");
        let payload = serde_json::to_string(&event).unwrap();
        assert!(payload.contains("\"decision\":\"deny\""));
        assert!(payload.contains("\"status\":497"));
        assert!(payload.contains("\"access_key\":\"ak-1\""));
    }

    #[test]
    fn allow_events_carry_the_request_id() {
        let event = GateAuditEvent::allowed("/mcp", "ak-1", "req-1");
        let payload = serde_json::to_string(&event).unwrap();
        assert!(payload.contains("\"decision\":\"allow\""));
        assert!(payload.contains("\"request_id\":\"req-1\""));
    }
}
