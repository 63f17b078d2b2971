// crates/toolgate-schema/src/element.rs
// ============================================================================
// Module: Schema Elements
// Description: Compiled JSON-Schema-shaped tree produced by the compiler.
// Purpose: Provide the intermediate schema model between shapes and wire JSON.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`SchemaElement`] is the compiled counterpart of a
//! [`crate::shape::TypeShape`]: a closed tree of schema nodes that
//! [`crate::render::render`] turns into wire JSON. Reference nodes point
//! into the definitions block attached to the top-level object; definitions
//! are populated only for types flagged as cyclic during compilation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

// ============================================================================
// SECTION: Schema Elements
// ============================================================================

/// A node in the compiled schema tree.
///
/// The enum is closed, so rendering is total: there is no unknown-variant
/// failure path, and `Raw` payloads are parsed before they enter the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaElement {
    /// String schema node.
    Str {
        /// Human description, when present.
        description: Option<String>,
    },
    /// Integer schema node.
    Int {
        /// Human description, when present.
        description: Option<String>,
    },
    /// Number schema node.
    Num {
        /// Human description, when present.
        description: Option<String>,
    },
    /// Boolean schema node.
    Bool {
        /// Human description, when present.
        description: Option<String>,
    },
    /// Enumeration schema node with ordered member labels.
    Enum {
        /// Human description, when present.
        description: Option<String>,
        /// Ordered member labels.
        values: Vec<String>,
    },
    /// Array schema node; `items` is `None` for unparameterized collections.
    Array {
        /// Human description, when present.
        description: Option<String>,
        /// Element schema, when the collection is parameterized.
        items: Option<Box<SchemaElement>>,
    },
    /// Object schema node with ordered properties.
    Object(ObjectElement),
    /// Pointer to an entry in the top-level definitions block.
    Ref {
        /// Reference token of the definition entry.
        reference: String,
    },
    /// Opaque pre-built schema fragment emitted verbatim.
    Raw {
        /// The pre-built schema payload.
        schema: Value,
    },
}

/// Compiled object schema with ordered properties and a required set.
///
/// # Invariants
/// - `properties` preserves field declaration order.
/// - `definitions` is non-empty only on top-level objects, and only for
///   types flagged as cyclic during compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectElement {
    /// Human description, when present.
    pub description: Option<String>,
    /// Ordered property name and schema pairs.
    pub properties: Vec<(String, SchemaElement)>,
    /// Names of required properties.
    pub required: Vec<String>,
    /// Definitions block entries keyed by reference token.
    pub definitions: Vec<(String, SchemaElement)>,
}
