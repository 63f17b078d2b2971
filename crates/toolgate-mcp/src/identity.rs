// crates/toolgate-mcp/src/identity.rs
// ============================================================================
// Module: Identity Resolution
// Description: Access-key identity lookup for the session gate.
// Purpose: Resolve caller secrets and injected attributes per request.
// Dependencies: Standard library collections
// ============================================================================

//! ## Overview
//! Identities map an access key to the shared secret used for signature
//! verification plus the attributes injected into the request context after
//! a successful check. Storage is external to the gateway: the gate only
//! sees the [`IdentityProvider`] trait and resolves identities fresh per
//! request. No caching is mandated; correctness never depends on one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Shared secret used to verify and produce signatures.
    pub secret_key: String,
    /// Attributes injected into the request context on successful
    /// verification, in deterministic order.
    pub attributes: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// External identity lookup consulted by the session gate.
///
/// Lookups are idempotent and safe to call concurrently.
pub trait IdentityProvider: Send + Sync {
    /// Resolves the identity for an access key, when one exists.
    fn lookup(&self, access_key: &str) -> Option<Identity>;
}

// ============================================================================
// SECTION: Static Provider
// ============================================================================

/// Identity provider backed by a fixed accesskey-to-identity map.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    /// Identities keyed by access key.
    identities: BTreeMap<String, Identity>,
}

impl StaticIdentityProvider {
    /// Builds a provider from access key and identity pairs.
    #[must_use]
    pub fn new(identities: impl IntoIterator<Item = (String, Identity)>) -> Self {
        Self {
            identities: identities.into_iter().collect(),
        }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn lookup(&self, access_key: &str) -> Option<Identity> {
        self.identities.get(access_key).cloned()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
