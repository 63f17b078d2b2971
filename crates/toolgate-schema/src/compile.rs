// crates/toolgate-schema/src/compile.rs
// ============================================================================
// Module: Schema Compiler
// Description: Visited-set compiler from type shapes to schema elements.
// Purpose: Compile possibly-cyclic shape graphs without infinite recursion.
// Dependencies: serde_json, sha2, uuid
// ============================================================================

//! ## Overview
//! The compiler walks a [`TypeShape`] graph and produces a
//! [`SchemaElement`] tree. Object types are tracked in a per-compilation
//! [`VisitedSet`]: a placeholder reference is registered before an object's
//! fields are walked, so a re-encounter of an in-progress type returns the
//! placeholder and flags the type as cyclic. Completed objects are stored
//! back into the set so sibling (non-cyclic) encounters reuse the finished
//! schema inline. At the top level, cyclic types are moved into the
//! definitions block and replaced by `$ref` pointers at their use sites.
//!
//! ## Invariants
//! - The visited set lives for exactly one top-level compilation.
//! - Reference tokens are content-derived from the type name and stable
//!   across processes.
//! - Compilation terminates for every shape graph, cyclic or not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use sha2::Digest;
use sha2::Sha256;
use uuid::Uuid;

use crate::element::ObjectElement;
use crate::element::SchemaElement;
use crate::i18n::MessageResolver;
use crate::shape::FieldShape;
use crate::shape::TypeShape;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default description applied to identifier-kind shapes without an explicit
/// description.
const DEFAULT_UUID_DESCRIPTION: &str = "String in a UUID format";

// ============================================================================
// SECTION: Visited Set
// ============================================================================

/// Compilation-scoped record for one object type.
#[derive(Debug, Clone)]
pub struct VisitedEntry {
    /// In-progress placeholder or completed schema for the type.
    pub element: SchemaElement,
    /// Reference token derived from the type name.
    pub reference: String,
    /// Set when the type was re-encountered while still in progress.
    pub recursion_detected: bool,
}

/// Transient mapping from type identity to its compilation record.
///
/// Created fresh per top-level compile call and discarded afterwards; never
/// persisted.
pub type VisitedSet = BTreeMap<String, VisitedEntry>;

// ============================================================================
// SECTION: Reference Tokens
// ============================================================================

/// Derives the stable reference token for a type name.
///
/// The token is the leading 16 bytes of SHA-256 over the name, formatted as
/// a UUID, so it is independent of process runs and compilation order.
#[must_use]
pub fn reference_token(type_name: &str) -> String {
    let digest = Sha256::digest(type_name.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes).to_string()
}

// ============================================================================
// SECTION: Compilation
// ============================================================================

/// Compiles a top-level shape with a fresh visited set.
///
/// Cyclic types encountered anywhere in the graph are collected into the
/// definitions block of the returned top-level object.
#[must_use]
pub fn compile(shape: &TypeShape, resolver: &dyn MessageResolver) -> SchemaElement {
    let mut visited = VisitedSet::new();
    if let TypeShape::Object {
        name,
        description_key,
        fields,
    } = shape
    {
        return object_or_reference_from(
            name,
            description_key.as_deref(),
            fields,
            None,
            false,
            &mut visited,
            true,
            resolver,
        );
    }
    element_from(shape, None, false, &mut visited, resolver)
}

/// Compiles one shape into a schema element.
///
/// `field_description` overrides any type-level description;
/// `sub_fields_required` is the required default applied to fields without
/// an explicit override. Object shapes route through the visited set so
/// cycles resolve to reference placeholders.
#[must_use]
pub fn element_from(
    shape: &TypeShape,
    field_description: Option<String>,
    sub_fields_required: bool,
    visited: &mut VisitedSet,
    resolver: &dyn MessageResolver,
) -> SchemaElement {
    match shape {
        TypeShape::Text => SchemaElement::Str {
            description: field_description,
        },
        TypeShape::Uuid => SchemaElement::Str {
            description: field_description.or_else(|| Some(DEFAULT_UUID_DESCRIPTION.to_string())),
        },
        TypeShape::Integer => SchemaElement::Int {
            description: field_description,
        },
        TypeShape::Number => SchemaElement::Num {
            description: field_description,
        },
        TypeShape::Boolean => SchemaElement::Bool {
            description: field_description,
        },
        TypeShape::Enumeration {
            labels,
            description_key,
            ..
        } => SchemaElement::Enum {
            description: field_description
                .or_else(|| description_key.as_deref().map(|key| resolver.resolve(key))),
            values: labels.clone(),
        },
        TypeShape::List {
            element,
        } => SchemaElement::Array {
            description: field_description,
            items: element.as_deref().map(|element| {
                Box::new(element_from(element, None, sub_fields_required, visited, resolver))
            }),
        },
        TypeShape::Object {
            name,
            description_key,
            fields,
        } => object_or_reference_from(
            name,
            description_key.as_deref(),
            fields,
            field_description,
            sub_fields_required,
            visited,
            false,
            resolver,
        ),
        TypeShape::Raw {
            schema,
        } => SchemaElement::Raw {
            schema: schema.clone(),
        },
    }
}

/// Compiles an object type, returning either its schema or a reference
/// placeholder when the type is already in progress.
#[allow(clippy::too_many_arguments, reason = "Mirrors the full compilation context.")]
fn object_or_reference_from(
    name: &str,
    description_key: Option<&str>,
    fields: &[FieldShape],
    description: Option<String>,
    sub_fields_required: bool,
    visited: &mut VisitedSet,
    set_definitions: bool,
    resolver: &dyn MessageResolver,
) -> SchemaElement {
    if let Some(entry) = visited.get_mut(name) {
        match &entry.element {
            SchemaElement::Ref {
                ..
            } => {
                entry.recursion_detected = true;
                return entry.element.clone();
            }
            SchemaElement::Object(object) => {
                if object.description == description {
                    return entry.element.clone();
                }
                let mut object = object.clone();
                object.description = description;
                return SchemaElement::Object(object);
            }
            _ => return entry.element.clone(),
        }
    }

    let reference = reference_token(name);
    visited.insert(name.to_string(), VisitedEntry {
        element: SchemaElement::Ref {
            reference: reference.clone(),
        },
        reference,
        recursion_detected: false,
    });

    let mut properties = Vec::with_capacity(fields.len());
    let mut required = Vec::new();
    for field in fields {
        if field.synthetic {
            continue;
        }
        if field.required.unwrap_or(sub_fields_required) {
            required.push(field.name.clone());
        }
        let field_description =
            field.description_key.as_deref().map(|key| resolver.resolve(key));
        let element =
            element_from(&field.shape, field_description, sub_fields_required, visited, resolver);
        properties.push((field.name.clone(), element));
    }

    let description =
        description.or_else(|| description_key.map(|key| resolver.resolve(key)));
    let mut object = ObjectElement {
        description,
        properties,
        required,
        definitions: Vec::new(),
    };

    // Completed schema replaces the placeholder so siblings reuse it inline.
    if let Some(entry) = visited.get_mut(name) {
        entry.element = SchemaElement::Object(object.clone());
    }

    if set_definitions {
        for entry in visited.values() {
            if entry.recursion_detected {
                object.definitions.push((entry.reference.clone(), entry.element.clone()));
            }
        }
    }

    SchemaElement::Object(object)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
