// crates/toolgate-mcp/src/session.rs
// ============================================================================
// Module: Session Gate
// Description: Inbound signed-request verification for protected paths.
// Purpose: Authenticate callers before requests reach the dispatcher.
// Dependencies: axum, subtle, uuid
// ============================================================================

//! ## Overview
//! The session gate intercepts requests whose path falls under the
//! protected prefix, extracts the four signed parameters from the query
//! string (falling back to headers when any is blank), and verifies the
//! signature against the identity resolved for the access key. All three
//! rejection paths answer with an empty JSON object body; only the status
//! code differs, so callers must rely on the status code to distinguish
//! failure kinds. Successful verification attaches a [`SessionContext`]
//! carrying the resolved identity attributes, a fresh request id, and the
//! serving host used as the forwarding target.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::audit::GateAuditEvent;
use crate::audit::GateAuditSink;
use crate::identity::IdentityProvider;
use crate::signing::PARAM_ACCESS_KEY_ID;
use crate::signing::PARAM_SIGNATURE;
use crate::signing::PARAM_SIGNATURE_METHOD;
use crate::signing::PARAM_SIGNATURE_NONCE;
use crate::signing::compose_string_to_sign;
use crate::signing::sign_string;
use crate::signing::signatures_match;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rejection status when any signed parameter is missing or blank.
pub const STATUS_COMMON_PARAMS_EMPTY: u16 = 499;
/// Rejection status when the access key resolves to no identity.
pub const STATUS_USER_NOT_FOUND: u16 = 498;
/// Rejection status when the recomputed signature does not match.
pub const STATUS_SIGNATURE_ERROR: u16 = 497;

/// Constant-shape body written on every rejection.
pub const REJECTION_BODY: &str = "{}";

// ============================================================================
// SECTION: Session Context
// ============================================================================

/// Per-request context attached after successful verification.
///
/// Created per request and never persisted beyond it.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Fresh request identifier assigned by the gate.
    pub request_id: String,
    /// Verified caller access key.
    pub access_key: String,
    /// Resolved caller secret, used to sign the outbound forward.
    pub secret_key: String,
    /// Serving host and port recorded as the forwarding target.
    pub api_host: String,
    /// Identity attributes injected into the request context.
    pub attributes: BTreeMap<String, String>,
}

/// Outcome of evaluating one request against the gate.
#[derive(Debug)]
pub enum GateDecision {
    /// The path is not protected; the request passes untouched.
    Bypass,
    /// Verification succeeded; the context travels downstream.
    Allow(SessionContext),
    /// Verification failed with the given status code.
    Reject(u16),
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Inbound verifier for signed requests under a protected prefix.
pub struct SessionGate {
    /// Path prefix under which requests must be signed.
    protected_prefix: String,
    /// External identity lookup.
    identities: Arc<dyn IdentityProvider>,
    /// Audit sink for gate decisions.
    audit: Arc<dyn GateAuditSink>,
}

impl SessionGate {
    /// Builds a gate for one protected prefix.
    #[must_use]
    pub fn new(
        protected_prefix: impl Into<String>,
        identities: Arc<dyn IdentityProvider>,
        audit: Arc<dyn GateAuditSink>,
    ) -> Self {
        Self {
            protected_prefix: protected_prefix.into(),
            identities,
            audit,
        }
    }

    /// Evaluates one request against the gate.
    ///
    /// `query` holds the decoded query parameters; `headers` supplies the
    /// fallback values; `serving_host` is the host:port the request arrived
    /// on, recorded as the forwarding target.
    #[must_use]
    pub fn evaluate(
        &self,
        path: &str,
        query: &BTreeMap<String, String>,
        headers: &HeaderMap,
        serving_host: &str,
    ) -> GateDecision {
        if !path.starts_with(&self.protected_prefix) {
            return GateDecision::Bypass;
        }

        let mut access_key = query_value(query, PARAM_ACCESS_KEY_ID);
        let mut signature = query_value(query, PARAM_SIGNATURE);
        let mut signature_method = query_value(query, PARAM_SIGNATURE_METHOD);
        let mut signature_nonce = query_value(query, PARAM_SIGNATURE_NONCE);

        if is_blank(&access_key)
            || is_blank(&signature)
            || is_blank(&signature_method)
            || is_blank(&signature_nonce)
        {
            access_key = header_value(headers, PARAM_ACCESS_KEY_ID);
            signature = header_value(headers, PARAM_SIGNATURE);
            signature_method = header_value(headers, PARAM_SIGNATURE_METHOD);
            signature_nonce = header_value(headers, PARAM_SIGNATURE_NONCE);
        }

        if is_blank(&access_key)
            || is_blank(&signature)
            || is_blank(&signature_method)
            || is_blank(&signature_nonce)
        {
            self.deny(path, None, STATUS_COMMON_PARAMS_EMPTY, "missing common parameters")
        } else if let Some(identity) = self.identities.lookup(&access_key) {
            let mut params_to_sign = BTreeMap::new();
            params_to_sign.insert(PARAM_SIGNATURE_METHOD.to_string(), signature_method);
            params_to_sign.insert(PARAM_SIGNATURE_NONCE.to_string(), signature_nonce);
            params_to_sign.insert(PARAM_ACCESS_KEY_ID.to_string(), access_key.clone());

            let string_to_sign = compose_string_to_sign(&params_to_sign);
            // Key setup cannot fail for HMAC; fail closed if it ever does.
            let Ok(regenerated) = sign_string(&string_to_sign, &identity.secret_key) else {
                return self.deny(
                    path,
                    Some(&access_key),
                    STATUS_SIGNATURE_ERROR,
                    "signature mismatch",
                );
            };
            if signatures_match(&signature, &regenerated) {
                let context = SessionContext {
                    request_id: generate_request_id(),
                    access_key: access_key.clone(),
                    secret_key: identity.secret_key,
                    api_host: serving_host.to_string(),
                    attributes: identity.attributes,
                };
                self.audit.record(&GateAuditEvent::allowed(
                    path,
                    &access_key,
                    &context.request_id,
                ));
                GateDecision::Allow(context)
            } else {
                self.deny(path, Some(&access_key), STATUS_SIGNATURE_ERROR, "signature mismatch")
            }
        } else {
            self.deny(path, Some(&access_key), STATUS_USER_NOT_FOUND, "user not found")
        }
    }

    /// Records and returns a rejection.
    fn deny(
        &self,
        path: &str,
        access_key: Option<&str>,
        status: u16,
        reason: &'static str,
    ) -> GateDecision {
        self.audit.record(&GateAuditEvent::denied(path, access_key, status, reason));
        GateDecision::Reject(status)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Generates a fresh time-ordered request identifier.
fn generate_request_id() -> String {
    Uuid::now_v7().to_string()
}

/// Returns true when the value is empty or whitespace only.
fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Reads a query parameter, defaulting to empty.
fn query_value(query: &BTreeMap<String, String>, name: &str) -> String {
    query.get(name).cloned().unwrap_or_default()
}

/// Reads a header value, defaulting to empty.
fn header_value(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
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
    use crate::audit::NoopAuditSink;
    use crate::identity::Identity;
    use crate::identity::StaticIdentityProvider;
    use crate::signing::SIGNATURE_METHOD;

    /// Builds a gate protecting `/mcp` with one registered identity.
    fn gate() -> SessionGate {
        let mut attributes = BTreeMap::new();
        attributes.insert("tenant".to_string(), "blue".to_string());
        let provider = StaticIdentityProvider::new([("ak-1".to_string(), Identity {
            secret_key: "sk-1".to_string(),
            attributes,
        })]);
        SessionGate::new("/mcp", Arc::new(provider), Arc::new(NoopAuditSink))
    }

    /// Builds a fully signed query for the registered identity.
    fn signed_query(secret: &str) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert(PARAM_SIGNATURE_METHOD.to_string(), SIGNATURE_METHOD.to_string());
        params.insert(PARAM_SIGNATURE_NONCE.to_string(), "nonce-1".to_string());
        params.insert(PARAM_ACCESS_KEY_ID.to_string(), "ak-1".to_string());
        let signature =
            sign_string(&compose_string_to_sign(&params), secret).unwrap();
        params.insert(PARAM_SIGNATURE.to_string(), signature);
        params
    }

    #[test]
    fn unprotected_paths_bypass_the_gate() {
        let decision =
            gate().evaluate("/health", &BTreeMap::new(), &HeaderMap::new(), "127.0.0.1:8111");
        assert!(matches!(decision, GateDecision::Bypass));
    }

    #[test]
    fn missing_signature_rejects_with_the_missing_params_status() {
        let mut query = signed_query("sk-1");
        query.remove(PARAM_SIGNATURE);
        let decision = gate().evaluate("/mcp", &query, &HeaderMap::new(), "127.0.0.1:8111");
        assert!(matches!(decision, GateDecision::Reject(STATUS_COMMON_PARAMS_EMPTY)));
    }

    #[test]
    fn unknown_access_keys_reject_with_the_user_not_found_status() {
        let mut query = signed_query("sk-1");
        query.insert(PARAM_ACCESS_KEY_ID.to_string(), "ak-unknown".to_string());
        let decision = gate().evaluate("/mcp", &query, &HeaderMap::new(), "127.0.0.1:8111");
        assert!(matches!(decision, GateDecision::Reject(STATUS_USER_NOT_FOUND)));
    }

    #[test]
    fn wrong_signatures_reject_with_the_signature_error_status() {
        let query = signed_query("sk-wrong");
        let decision = gate().evaluate("/mcp", &query, &HeaderMap::new(), "127.0.0.1:8111");
        assert!(matches!(decision, GateDecision::Reject(STATUS_SIGNATURE_ERROR)));
    }

    #[test]
    fn valid_requests_pass_with_injected_attributes() {
        let query = signed_query("sk-1");
        let decision = gate().evaluate("/mcp", &query, &HeaderMap::new(), "127.0.0.1:9000");
        let GateDecision::Allow(context) = decision else {
            panic!("expected the gate to allow the request");
        };
        assert_eq!(context.access_key, "ak-1");
        assert_eq!(context.secret_key, "sk-1");
        assert_eq!(context.api_host, "127.0.0.1:9000");
        assert_eq!(context.attributes.get("tenant").map(String::as_str), Some("blue"));
        assert!(!context.request_id.is_empty());
    }

    #[test]
    fn blank_query_params_fall_back_to_headers() {
        let signed = signed_query("sk-1");
        let mut headers = HeaderMap::new();
        for (name, value) in &signed {
            headers.insert(
                axum::http::HeaderName::try_from(name.as_str()).unwrap(),
                axum::http::HeaderValue::try_from(value.as_str()).unwrap(),
            );
        }
        let decision = gate().evaluate("/mcp", &BTreeMap::new(), &headers, "127.0.0.1:8111");
        assert!(matches!(decision, GateDecision::Allow(_)));
    }
}
