// crates/toolgate-schema/src/i18n.rs
// ============================================================================
// Module: Message Resolution
// Description: Label-key resolution for tool and field descriptions.
// Purpose: Decouple schema compilation from message catalog storage.
// Dependencies: Standard library collections
// ============================================================================

//! ## Overview
//! Tool labels and field descriptions are authored as label keys and
//! resolved into human text through a [`MessageResolver`]. The catalog
//! resolver falls back to the key itself when no entry exists, so missing
//! translations degrade to readable identifiers instead of failing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Resolves a label key into human-readable text.
pub trait MessageResolver: Send + Sync {
    /// Returns the resolved text for `key`.
    fn resolve(&self, key: &str) -> String;
}

// ============================================================================
// SECTION: Resolvers
// ============================================================================

/// Resolver that returns every key unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyResolver;

impl MessageResolver for KeyResolver {
    fn resolve(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Catalog-backed resolver with key fallback for missing entries.
#[derive(Debug, Clone, Default)]
pub struct CatalogResolver {
    /// Catalog entries keyed by label key.
    entries: BTreeMap<String, String>,
}

impl CatalogResolver {
    /// Builds a resolver from catalog entries.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

impl MessageResolver for CatalogResolver {
    fn resolve(&self, key: &str) -> String {
        self.entries.get(key).cloned().unwrap_or_else(|| key.to_string())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
