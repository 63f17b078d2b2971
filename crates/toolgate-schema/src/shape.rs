// crates/toolgate-schema/src/shape.rs
// ============================================================================
// Module: Type Shapes
// Description: Declarative descriptions of tool input data shapes.
// Purpose: Provide the authorable input model consumed by the compiler.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`TypeShape`] describes the shape of a tool input the way the embedding
//! application sees it: primitives, enumerations, collections, structured
//! objects with ordered fields, and opaque pre-built schema fragments.
//! Shapes deserialize from configuration files so operation registration is
//! declarative data rather than runtime introspection.
//!
//! ## Invariants
//! - Object field order is declaration order and is preserved through
//!   compilation and rendering.
//! - An object's `name` is its stable identity; two objects with the same
//!   name are treated as the same type by the cycle-tracking compiler.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// SECTION: Type Shapes
// ============================================================================

/// Declarative description of a data shape used as tool input.
///
/// # Invariants
/// - `Object` names are unique per logical type; the compiler keys its
///   visited set on them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeShape {
    /// Text-like kind rendered as a string schema.
    Text,
    /// Identifier kind rendered as a string schema with a default
    /// description when no explicit description is supplied.
    Uuid,
    /// Integral numeric kind rendered as an integer schema.
    Integer,
    /// Fractional numeric kind rendered as a number schema.
    Number,
    /// Boolean kind rendered as a boolean schema.
    Boolean,
    /// Enumeration kind carrying an ordered set of member labels.
    Enumeration {
        /// Stable name of the enumeration type.
        name: String,
        /// Ordered member labels, stringified.
        labels: Vec<String>,
        /// Optional label key resolved into a human description.
        #[serde(default)]
        description_key: Option<String>,
    },
    /// Collection kind wrapping an element shape; `None` models an
    /// unparameterized collection and renders an empty items schema.
    List {
        /// Element shape, when the collection is parameterized.
        #[serde(default)]
        element: Option<Box<TypeShape>>,
    },
    /// Structured object with ordered fields.
    Object {
        /// Fully-qualified, stable name identifying this object type.
        name: String,
        /// Optional label key resolved into a human description.
        #[serde(default)]
        description_key: Option<String>,
        /// Declared fields, in declaration order.
        #[serde(default)]
        fields: Vec<FieldShape>,
    },
    /// Opaque pre-built schema fragment emitted verbatim.
    Raw {
        /// The pre-built schema payload.
        schema: Value,
    },
}

/// A declared field of an [`TypeShape::Object`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldShape {
    /// Field name as it appears in the schema properties.
    pub name: String,
    /// Shape of the field value.
    pub shape: TypeShape,
    /// Explicit required override; absent means the caller-supplied default
    /// applies.
    #[serde(default)]
    pub required: Option<bool>,
    /// Optional label key resolved into a human description.
    #[serde(default)]
    pub description_key: Option<String>,
    /// Synthetic fields are skipped during compilation.
    #[serde(default)]
    pub synthetic: bool,
}
