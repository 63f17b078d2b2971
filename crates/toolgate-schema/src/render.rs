// crates/toolgate-schema/src/render.rs
// ============================================================================
// Module: Schema Rendering
// Description: Wire rendering of compiled schema elements.
// Purpose: Turn schema trees into JSON payloads for tool listings.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Rendering flattens a [`SchemaElement`] tree into a generic JSON value
//! suitable for wire transmission. Two modes exist: permissive rendering
//! keeps each field's own required flag, while strict rendering forces every
//! field required, types logically-optional fields as a union with null,
//! and forbids additional properties. Definitions render as a `$defs` block
//! and only appear on the top-level object.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::element::ObjectElement;
use crate::element::SchemaElement;

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a schema element into its wire JSON form.
///
/// The top-level element is treated as required; nested fields consult the
/// owning object's required set.
#[must_use]
pub fn render(element: &SchemaElement, strict: bool) -> Value {
    render_with(element, strict, true)
}

/// Renders one element, tracking whether the surrounding context requires it.
fn render_with(element: &SchemaElement, strict: bool, required: bool) -> Value {
    match element {
        SchemaElement::Str {
            description,
        } => scalar("string", description.as_deref(), strict, required),
        SchemaElement::Int {
            description,
        } => scalar("integer", description.as_deref(), strict, required),
        SchemaElement::Num {
            description,
        } => scalar("number", description.as_deref(), strict, required),
        SchemaElement::Bool {
            description,
        } => scalar("boolean", description.as_deref(), strict, required),
        SchemaElement::Enum {
            description,
            values,
        } => {
            let mut map = Map::new();
            map.insert("type".to_string(), type_value("string", strict, required));
            if let Some(description) = description {
                map.insert("description".to_string(), Value::String(description.clone()));
            }
            map.insert(
                "enum".to_string(),
                Value::Array(values.iter().cloned().map(Value::String).collect()),
            );
            Value::Object(map)
        }
        SchemaElement::Array {
            description,
            items,
        } => {
            let mut map = Map::new();
            map.insert("type".to_string(), type_value("array", strict, required));
            if let Some(description) = description {
                map.insert("description".to_string(), Value::String(description.clone()));
            }
            let items = items
                .as_deref()
                .map_or_else(|| Value::Object(Map::new()), |items| render_with(items, strict, true));
            map.insert("items".to_string(), items);
            Value::Object(map)
        }
        SchemaElement::Object(object) => render_object(object, strict, required),
        SchemaElement::Ref {
            reference,
        } => {
            let mut map = Map::new();
            map.insert("$ref".to_string(), Value::String(format!("#/$defs/{reference}")));
            Value::Object(map)
        }
        SchemaElement::Raw {
            schema,
        } => schema.clone(),
    }
}

/// Renders an object element with its properties, required set, and any
/// top-level definitions.
fn render_object(object: &ObjectElement, strict: bool, required: bool) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), type_value("object", strict, required));
    if let Some(description) = &object.description {
        map.insert("description".to_string(), Value::String(description.clone()));
    }

    let mut properties = Map::new();
    for (name, element) in &object.properties {
        let field_required = object.required.iter().any(|entry| entry == name);
        properties.insert(name.clone(), render_with(element, strict, field_required));
    }
    map.insert("properties".to_string(), Value::Object(properties));

    if strict {
        // Strict mode forces every declared field into the required set.
        map.insert(
            "required".to_string(),
            Value::Array(
                object.properties.iter().map(|(name, _)| Value::String(name.clone())).collect(),
            ),
        );
        map.insert("additionalProperties".to_string(), Value::Bool(false));
    } else {
        map.insert(
            "required".to_string(),
            Value::Array(object.required.iter().cloned().map(Value::String).collect()),
        );
    }

    if !object.definitions.is_empty() {
        let mut definitions = Map::new();
        for (reference, element) in &object.definitions {
            definitions.insert(reference.clone(), render_with(element, strict, true));
        }
        map.insert("$defs".to_string(), Value::Object(definitions));
    }

    Value::Object(map)
}

/// Renders a scalar schema node.
fn scalar(kind: &str, description: Option<&str>, strict: bool, required: bool) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), type_value(kind, strict, required));
    if let Some(description) = description {
        map.insert("description".to_string(), Value::String(description.to_string()));
    }
    Value::Object(map)
}

/// Builds the `type` value, widening to a union with null for optional
/// fields in strict mode.
fn type_value(kind: &str, strict: bool, required: bool) -> Value {
    if strict && !required {
        Value::Array(vec![Value::String(kind.to_string()), Value::String("null".to_string())])
    } else {
        Value::String(kind.to_string())
    }
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

    use serde_json::json;

    use super::*;
    use crate::compile::compile;
    use crate::i18n::KeyResolver;
    use crate::shape::FieldShape;
    use crate::shape::TypeShape;

    /// Builds an object shape with one required and one optional field.
    fn mixed_object() -> TypeShape {
        TypeShape::Object {
            name: "demo.Payload".to_string(),
            description_key: None,
            fields: vec![
                FieldShape {
                    name: "id".to_string(),
                    shape: TypeShape::Text,
                    required: Some(true),
                    description_key: None,
                    synthetic: false,
                },
                FieldShape {
                    name: "note".to_string(),
                    shape: TypeShape::Text,
                    required: Some(false),
                    description_key: None,
                    synthetic: false,
                },
            ],
        }
    }

    #[test]
    fn permissive_mode_keeps_optional_fields() {
        let value = render(&compile(&mixed_object(), &KeyResolver), false);
        assert_eq!(value, json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "note": { "type": "string" },
            },
            "required": ["id"],
        }));
    }

    #[test]
    fn strict_mode_forces_required_and_null_unions() {
        let value = render(&compile(&mixed_object(), &KeyResolver), true);
        assert_eq!(value, json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "note": { "type": ["string", "null"] },
            },
            "required": ["id", "note"],
            "additionalProperties": false,
        }));
    }

    #[test]
    fn enum_renders_ordered_labels() {
        let shape = TypeShape::Enumeration {
            name: "demo.Mode".to_string(),
            labels: vec!["FULL".to_string(), "INCREMENT".to_string()],
            description_key: None,
        };
        let value = render(&compile(&shape, &KeyResolver), false);
        assert_eq!(value, json!({
            "type": "string",
            "enum": ["FULL", "INCREMENT"],
        }));
    }

    #[test]
    fn unparameterized_list_renders_empty_items() {
        let value = render(
            &compile(
                &TypeShape::List {
                    element: None,
                },
                &KeyResolver,
            ),
            false,
        );
        assert_eq!(value, json!({ "type": "array", "items": {} }));
    }

    #[test]
    fn raw_fragment_renders_verbatim() {
        let fragment = json!({ "type": "string", "format": "ip" });
        let value = render(
            &compile(
                &TypeShape::Raw {
                    schema: fragment.clone(),
                },
                &KeyResolver,
            ),
            false,
        );
        assert_eq!(value, fragment);
    }

    #[test]
    fn cyclic_type_renders_single_ref_and_definition() {
        let shape = TypeShape::Object {
            name: "demo.Tree".to_string(),
            description_key: None,
            fields: vec![FieldShape {
                name: "child".to_string(),
                shape: TypeShape::Object {
                    name: "demo.Tree".to_string(),
                    description_key: None,
                    fields: Vec::new(),
                },
                required: None,
                description_key: None,
                synthetic: false,
            }],
        };
        let value = render(&compile(&shape, &KeyResolver), false);
        let token = crate::compile::reference_token("demo.Tree");
        let pointer = format!("#/$defs/{token}");
        assert_eq!(value["properties"]["child"]["$ref"], json!(pointer));
        let definitions = value["$defs"].as_object().unwrap();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[&token]["properties"]["child"]["$ref"], json!(pointer));
    }
}
