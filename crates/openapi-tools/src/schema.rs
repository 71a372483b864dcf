//! Schema translation.
//!
//! Maps a [`SchemaNode`] onto the restricted vocabulary of MCP tool input schemas:
//! a [`PropertyNode`] per property, collected into an object-typed [`InputSchema`].
//!
//! Nested structure is flattened into the description. Arrays get `(array of T)`, objects get
//! `(object with N properties) - properties: a, b`. Children are still translated recursively so
//! that structural errors deep in a schema surface as a [`TranslationError`].

use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::error::TranslationError;
use crate::model::SchemaNode;
use indexmap::IndexMap;
use rmcp::model::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const OBJECT_TYPE: &str = "object";

/// Map a document type string onto a tool property type. Unknown and empty types map to `string`.
#[must_use]
pub fn map_schema_type(schema_type: &str) -> &'static str {
    match schema_type {
        "integer" => "integer",
        "number" => "number",
        "boolean" => "boolean",
        "array" => "array",
        "object" => "object",
        _ => "string",
    }
}

/// One property of a tool's input schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyNode {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl PropertyNode {
    #[must_use]
    pub fn of_type(property_type: impl Into<String>) -> Self {
        Self {
            property_type: property_type.into(),
            ..Self::default()
        }
    }

    /// Object property with no declared shape.
    #[must_use]
    pub fn opaque_object(description: Option<String>) -> Self {
        Self {
            description: description.filter(|d| !d.is_empty()),
            ..Self::of_type(OBJECT_TYPE)
        }
    }
}

/// The input schema of a tool. Always object-typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: IndexMap<String, PropertyNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self::object()
    }
}

impl InputSchema {
    #[must_use]
    pub fn object() -> Self {
        Self {
            schema_type: OBJECT_TYPE.to_string(),
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }

    /// Insert or replace a property. A replaced property keeps its position.
    pub fn insert_property(&mut self, name: impl Into<String>, property: PropertyNode) {
        self.properties.insert(name.into(), property);
    }

    /// Add `name` to the required list unless already present.
    pub fn mark_required(&mut self, name: &str) {
        if !self.required.iter().any(|r| r == name) {
            self.required.push(name.to_string());
        }
    }

    /// Merge another schema's properties and required names into this one.
    pub fn merge(&mut self, other: Self) {
        for (name, property) in other.properties {
            self.insert_property(name, property);
        }
        for name in &other.required {
            self.mark_required(name);
        }
    }

    #[must_use]
    pub fn to_json_object(&self) -> JsonObject {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => JsonObject::new(),
        }
    }
}

/// Translates [`SchemaNode`] trees into [`PropertyNode`]s.
#[derive(Clone)]
pub struct SchemaTranslator {
    sink: Arc<dyn DiagnosticsSink>,
}

impl SchemaTranslator {
    #[must_use]
    pub fn new(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self { sink }
    }

    /// Translate a schema node.
    ///
    /// # Errors
    ///
    /// Returns [`TranslationError::MissingItems`] if the node, or any node below it, is an array
    /// without an items schema.
    pub fn translate(&self, node: &SchemaNode) -> Result<PropertyNode, TranslationError> {
        self.translate_at(node, "$", None)
    }

    /// Translate `node`, naming it `location` in errors and diagnostics.
    ///
    /// A non-empty `description` replaces the node's own description.
    pub(crate) fn translate_at(
        &self,
        node: &SchemaNode,
        location: &str,
        description: Option<&str>,
    ) -> Result<PropertyNode, TranslationError> {
        let property_type = map_schema_type(&node.schema_type);
        let description = description
            .filter(|d| !d.is_empty())
            .or(node.description.as_deref())
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let mut property = PropertyNode {
            property_type: property_type.to_string(),
            description,
            format: non_empty(node.format.as_ref()),
            enum_values: self.enum_tokens(node, location),
            default: node.default.clone(),
            minimum: node.minimum,
            maximum: node.maximum,
            min_length: node.min_length,
            max_length: node.max_length,
            pattern: non_empty(node.pattern.as_ref()),
        };

        match property_type {
            "array" => {
                let items = node
                    .items
                    .as_deref()
                    .ok_or_else(|| TranslationError::MissingItems {
                        location: location.to_string(),
                    })?;
                let item = self.translate_at(items, &format!("{location}[]"), None)?;
                append_note(
                    &mut property.description,
                    &format!("(array of {})", item.property_type),
                );
            }
            OBJECT_TYPE if !node.properties.is_empty() => {
                for (name, child) in &node.properties {
                    self.translate_at(child, &format!("{location}.{name}"), None)?;
                }
                let names: Vec<&str> = node.properties.keys().map(String::as_str).collect();
                append_note(
                    &mut property.description,
                    &format!(
                        "(object with {} properties) - properties: {}",
                        names.len(),
                        names.join(", ")
                    ),
                );
            }
            _ => {}
        }

        Ok(property)
    }

    fn enum_tokens(&self, node: &SchemaNode, location: &str) -> Option<Vec<String>> {
        if node.enum_values.is_empty() {
            return None;
        }
        if node.enum_values.iter().any(|v| !v.is_string()) {
            self.sink.record(Diagnostic::EnumCoerced {
                location: location.to_string(),
            });
        }
        Some(node.enum_values.iter().map(enum_token).collect())
    }
}

fn enum_token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

fn append_note(description: &mut Option<String>, note: &str) {
    *description = Some(match description.take() {
        Some(existing) if !existing.is_empty() => format!("{existing} {note}"),
        _ => note.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use serde_json::json;

    fn translator() -> (SchemaTranslator, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        (SchemaTranslator::new(sink.clone()), sink)
    }

    #[test]
    fn type_mapping_is_total() {
        for t in ["integer", "number", "boolean", "array", "object", "string"] {
            assert_eq!(map_schema_type(t), t);
        }
        assert_eq!(map_schema_type(""), "string");
        assert_eq!(map_schema_type("file"), "string");
        assert_eq!(map_schema_type("null"), "string");
    }

    #[test]
    fn copies_scalar_constraints() {
        let (t, _) = translator();
        let node: SchemaNode = serde_json::from_value(json!({
            "type": "string",
            "format": "email",
            "description": "Contact address",
            "default": "a@b.c",
            "minLength": 3,
            "maxLength": 64,
            "pattern": "^.+@.+$"
        }))
        .unwrap();

        let p = t.translate(&node).unwrap();
        assert_eq!(p.property_type, "string");
        assert_eq!(p.format.as_deref(), Some("email"));
        assert_eq!(p.description.as_deref(), Some("Contact address"));
        assert_eq!(p.default, Some(json!("a@b.c")));
        assert_eq!(p.min_length, Some(3));
        assert_eq!(p.max_length, Some(64));
        assert_eq!(p.pattern.as_deref(), Some("^.+@.+$"));
        assert_eq!(p.enum_values, None);
    }

    #[test]
    fn array_description_names_item_type() {
        let (t, _) = translator();
        let node = SchemaNode::array_of(SchemaNode::of_type("string")).with_description("Tags");
        let p = t.translate(&node).unwrap();
        assert_eq!(p.property_type, "array");
        assert_eq!(p.description.as_deref(), Some("Tags (array of string)"));
    }

    #[test]
    fn array_note_stands_alone_without_description() {
        let (t, _) = translator();
        let p = t
            .translate(&SchemaNode::array_of(SchemaNode::of_type("integer")))
            .unwrap();
        assert_eq!(p.description.as_deref(), Some("(array of integer)"));
    }

    #[test]
    fn array_without_items_fails() {
        let (t, _) = translator();
        let err = t
            .translate_at(&SchemaNode::of_type("array"), "tags", None)
            .unwrap_err();
        assert_eq!(
            err,
            TranslationError::MissingItems {
                location: "tags".to_string()
            }
        );
    }

    #[test]
    fn nested_missing_items_fails_the_whole_translation() {
        let (t, _) = translator();
        let node = SchemaNode::of_type("object")
            .with_property("name", SchemaNode::of_type("string"))
            .with_property("aliases", SchemaNode::of_type("array"));
        let err = t.translate_at(&node, "body", None).unwrap_err();
        assert_eq!(
            err,
            TranslationError::MissingItems {
                location: "body.aliases".to_string()
            }
        );
    }

    #[test]
    fn object_description_lists_property_names_in_order() {
        let (t, _) = translator();
        let node = SchemaNode::of_type("object")
            .with_description("Owner")
            .with_property("name", SchemaNode::of_type("string"))
            .with_property("age", SchemaNode::of_type("integer"));
        let p = t.translate(&node).unwrap();
        assert_eq!(p.property_type, "object");
        assert_eq!(
            p.description.as_deref(),
            Some("Owner (object with 2 properties) - properties: name, age")
        );
    }

    #[test]
    fn empty_object_gets_no_note() {
        let (t, _) = translator();
        let p = t.translate(&SchemaNode::of_type("object")).unwrap();
        assert_eq!(p.description, None);
    }

    #[test]
    fn description_override_wins_when_non_empty() {
        let (t, _) = translator();
        let node = SchemaNode::of_type("integer").with_description("from schema");
        let p = t.translate_at(&node, "limit", Some("from parameter")).unwrap();
        assert_eq!(p.description.as_deref(), Some("from parameter"));
        let p = t.translate_at(&node, "limit", Some("")).unwrap();
        assert_eq!(p.description.as_deref(), Some("from schema"));
    }

    #[test]
    fn enum_values_are_coerced_and_flagged() {
        let (t, sink) = translator();
        let node: SchemaNode =
            serde_json::from_value(json!({"type": "integer", "enum": [1, 2, 3]})).unwrap();
        let p = t.translate_at(&node, "level", None).unwrap();
        assert_eq!(
            p.enum_values,
            Some(vec!["1".to_string(), "2".to_string(), "3".to_string()])
        );
        assert_eq!(
            sink.snapshot(),
            vec![Diagnostic::EnumCoerced {
                location: "level".to_string()
            }]
        );
    }

    #[test]
    fn string_enums_are_not_flagged() {
        let (t, sink) = translator();
        let node: SchemaNode =
            serde_json::from_value(json!({"type": "string", "enum": ["asc", "desc"]})).unwrap();
        let p = t.translate(&node).unwrap();
        assert_eq!(
            p.enum_values,
            Some(vec!["asc".to_string(), "desc".to_string()])
        );
        assert!(sink.snapshot().is_empty());
    }

    #[test]
    fn unknown_type_becomes_string() {
        let (t, _) = translator();
        let p = t.translate(&SchemaNode::default()).unwrap();
        assert_eq!(p.property_type, "string");
    }

    #[test]
    fn input_schema_serializes_without_empty_fields() {
        let mut schema = InputSchema::object();
        schema.insert_property("id", PropertyNode::of_type("integer"));
        schema.mark_required("id");
        schema.mark_required("id");
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "type": "object",
                "properties": {"id": {"type": "integer"}},
                "required": ["id"]
            })
        );
    }

    #[test]
    fn merge_unions_required_and_overrides_properties() {
        let mut base = InputSchema::object();
        base.insert_property("id", PropertyNode::of_type("integer"));
        base.mark_required("id");

        let mut body = InputSchema::object();
        body.insert_property("id", PropertyNode::of_type("string"));
        body.insert_property("name", PropertyNode::of_type("string"));
        body.mark_required("id");
        body.mark_required("name");

        base.merge(body);
        assert_eq!(base.properties["id"].property_type, "string");
        assert_eq!(
            base.properties.keys().collect::<Vec<_>>(),
            vec!["id", "name"]
        );
        assert_eq!(base.required, vec!["id", "name"]);
    }
}
