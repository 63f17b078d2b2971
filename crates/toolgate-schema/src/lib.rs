// crates/toolgate-schema/src/lib.rs
// ============================================================================
// Module: Toolgate Schema
// Description: Type shape descriptions and JSON schema compilation.
// Purpose: Compile declarative tool input shapes into JSON-Schema payloads.
// Dependencies: serde, serde_json, sha2, uuid
// ============================================================================

//! ## Overview
//! Toolgate describes tool inputs as a declarative graph of [`TypeShape`]
//! values and compiles that graph into a JSON-Schema-shaped tree of
//! [`SchemaElement`] values. The compiler tolerates cyclic shape graphs by
//! tracking visited types and emitting `$ref` pointers into a top-level
//! `$defs` block for any type that participates in a cycle. Rendering
//! supports a permissive mode (optional fields stay optional) and a strict
//! mode (all fields required, optional fields typed as a union with null).

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod compile;
pub mod element;
pub mod i18n;
pub mod render;
pub mod shape;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use compile::VisitedEntry;
pub use compile::VisitedSet;
pub use compile::compile;
pub use compile::element_from;
pub use compile::reference_token;
pub use element::ObjectElement;
pub use element::SchemaElement;
pub use i18n::CatalogResolver;
pub use i18n::KeyResolver;
pub use i18n::MessageResolver;
pub use render::render;
pub use shape::FieldShape;
pub use shape::TypeShape;
