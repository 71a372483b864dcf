//! Structural checks on a loaded [`ApiSpec`].
//!
//! Every issue is collected with a field path (`paths[0].parameters[1].schema.items`), so callers
//! can either report them all or refuse the document.

use crate::error::{SpecIssue, SpecValidationError};
use crate::model::{ApiSpec, Endpoint, SchemaNode};

const KNOWN_TYPES: [&str; 6] = ["string", "integer", "number", "boolean", "array", "object"];

/// Validate a loaded spec.
///
/// # Errors
///
/// Returns every issue found, in document order.
pub fn validate_spec(spec: &ApiSpec) -> Result<(), SpecValidationError> {
    let mut issues = Issues::default();

    if spec.info.title.is_empty() {
        issues.push("info.title", "title is required");
    }
    if spec.info.version.is_empty() {
        issues.push("info.version", "version is required");
    }

    if spec.endpoints.is_empty() {
        issues.push("paths", "at least one endpoint is required");
    }
    for (i, endpoint) in spec.endpoints.iter().enumerate() {
        check_endpoint(&mut issues, endpoint, &format!("paths[{i}]"));
    }

    for (name, schema) in &spec.components {
        check_schema(&mut issues, schema, &format!("components.schemas.{name}"));
    }

    if issues.0.is_empty() {
        Ok(())
    } else {
        Err(SpecValidationError { issues: issues.0 })
    }
}

#[derive(Default)]
struct Issues(Vec<SpecIssue>);

impl Issues {
    fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(SpecIssue {
            field: field.into(),
            message: message.into(),
        });
    }
}

fn check_endpoint(issues: &mut Issues, endpoint: &Endpoint, field: &str) {
    if endpoint.path.is_empty() {
        issues.push(format!("{field}.path"), "path is required");
    }

    for (j, param) in endpoint.parameters.iter().enumerate() {
        let param_field = format!("{field}.parameters[{j}]");
        if param.name.is_empty() {
            issues.push(format!("{param_field}.name"), "parameter name is required");
        }
        check_schema(issues, &param.schema, &format!("{param_field}.schema"));
    }

    if let Some(body) = &endpoint.request_body {
        for (content_type, media) in &body.content {
            if let Some(schema) = &media.schema {
                check_schema(
                    issues,
                    schema,
                    &format!("{field}.requestBody.content.{content_type}.schema"),
                );
            }
        }
    }

    if endpoint.responses.is_empty() {
        issues.push(
            format!("{field}.responses"),
            "at least one response is required",
        );
    }
}

fn check_schema(issues: &mut Issues, schema: &SchemaNode, field: &str) {
    let schema_type = schema.schema_type.to_ascii_lowercase();
    if schema_type.is_empty() {
        issues.push(field, "schema type is required");
    } else if !KNOWN_TYPES.contains(&schema_type.as_str()) {
        issues.push(
            field,
            format!("invalid schema type: {}", schema.schema_type),
        );
    }

    match schema_type.as_str() {
        "integer" | "number" => {
            if let (Some(min), Some(max)) = (schema.minimum, schema.maximum)
                && min > max
            {
                issues.push(field, "minimum cannot be greater than maximum");
            }
        }
        "string" => {
            if let (Some(min), Some(max)) = (schema.min_length, schema.max_length)
                && min > max
            {
                issues.push(field, "minLength cannot be greater than maxLength");
            }
        }
        _ => {}
    }

    if !schema.enum_values.is_empty() && schema_type != "string" {
        issues.push(field, "enum values can only be used with string type");
    }

    for name in &schema.required {
        if !schema.properties.contains_key(name) {
            issues.push(
                field,
                format!("required field '{name}' not found in properties"),
            );
        }
    }

    for (name, child) in &schema.properties {
        check_schema(issues, child, &format!("{field}.properties.{name}"));
    }
    if let Some(items) = &schema.items {
        check_schema(issues, items, &format!("{field}.items"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> ApiSpec {
        serde_json::from_value(value).unwrap()
    }

    fn fields(err: &SpecValidationError) -> Vec<&str> {
        err.issues.iter().map(|i| i.field.as_str()).collect()
    }

    #[test]
    fn accepts_a_complete_spec() {
        let s = spec(json!({
            "info": {"title": "T", "version": "1"},
            "endpoints": [{
                "path": "/users/{id}",
                "method": "GET",
                "parameters": [{"name": "id", "in": "path", "required": true, "schema": {"type": "integer"}}],
                "responses": {"200": {"description": "ok"}}
            }]
        }));
        assert_eq!(validate_spec(&s), Ok(()));
    }

    #[test]
    fn collects_every_issue() {
        let s = spec(json!({
            "info": {"title": "", "version": ""},
            "endpoints": [{
                "path": "/x",
                "method": "GET",
                "parameters": [
                    {"name": "", "in": "query", "schema": {"type": "string"}},
                    {"name": "n", "in": "query", "schema": {"type": "integer", "minimum": 5, "maximum": 1}}
                ]
            }]
        }));
        let err = validate_spec(&s).unwrap_err();
        assert_eq!(
            fields(&err),
            vec![
                "info.title",
                "info.version",
                "paths[0].parameters[0].name",
                "paths[0].parameters[1].schema",
                "paths[0].responses",
            ]
        );
        assert_eq!(
            err.issues[3].message,
            "minimum cannot be greater than maximum"
        );
    }

    #[test]
    fn empty_specs_need_endpoints() {
        let s = spec(json!({"info": {"title": "T", "version": "1"}}));
        let err = validate_spec(&s).unwrap_err();
        assert_eq!(fields(&err), vec!["paths"]);
    }

    #[test]
    fn nested_schemas_are_checked_with_dotted_paths() {
        let s = spec(json!({
            "info": {"title": "T", "version": "1"},
            "endpoints": [{
                "path": "/x",
                "method": "POST",
                "requestBody": {"content": {"application/json": {"schema": {
                    "type": "object",
                    "required": ["missing"],
                    "properties": {
                        "tags": {"type": "array", "items": {"type": "invalid"}},
                        "code": {"type": "string", "minLength": 4, "maxLength": 2},
                        "level": {"type": "integer", "enum": [1, 2]}
                    }
                }}}},
                "responses": {"201": {}}
            }],
            "components": {"Thing": {}}
        }));
        let err = validate_spec(&s).unwrap_err();
        let base = "paths[0].requestBody.content.application/json.schema";
        assert_eq!(
            fields(&err),
            vec![
                base.to_string(),
                format!("{base}.properties.tags.items"),
                format!("{base}.properties.code"),
                format!("{base}.properties.level"),
                "components.schemas.Thing".to_string(),
            ]
        );
        assert_eq!(
            err.issues[0].message,
            "required field 'missing' not found in properties"
        );
        assert_eq!(err.issues[1].message, "invalid schema type: invalid");
        assert_eq!(err.issues[4].message, "schema type is required");
    }

    #[test]
    fn type_names_are_case_insensitive() {
        let s = spec(json!({
            "info": {"title": "T", "version": "1"},
            "endpoints": [{
                "path": "/x",
                "method": "GET",
                "parameters": [{"name": "q", "in": "query", "schema": {"type": "String"}}],
                "responses": {"200": {}}
            }]
        }));
        assert_eq!(validate_spec(&s), Ok(()));
    }
}
