//! Tool synthesis: one [`Endpoint`] in, one [`Tool`] out.
//!
//! - Name: the lowercased `operationId`, else `<method>_<path>` with `/` → `_` and braces removed.
//! - Description: summary, else description, else `"<METHOD> <path>"`.
//! - Input schema: path parameters, then query parameters, then the request body. Header and
//!   cookie parameters are not exposed.
//!
//! The handler substitutes percent-encoded `{name}` placeholders from the arguments, moves
//! declared query parameters onto the URL, and forwards the rest to the [`HttpExecutor`]. A query
//! parameter shadowed by a body property of the same name stays with the body.

use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::error::{BodySchemaError, TranslationError};
use crate::model::{Endpoint, HttpMethod, MediaType, ParameterLocation, RequestBody};
use crate::schema::{InputSchema, OBJECT_TYPE, PropertyNode, SchemaTranslator};
use crate::tool::{Tool, ToolHandler};
use apimcp_http_tools::runtime::{
    ExecutionError, HttpExecutor, append_query, encode_path_segment, value_to_string,
};
use futures::FutureExt;
use mime::Mime;
use rmcp::model::JsonObject;
use std::sync::Arc;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Property that carries an opaque request body.
pub const BODY_PROPERTY: &str = "body";

/// Property that carries a non-object request body.
pub const VALUE_PROPERTY: &str = "value";

pub struct ToolSynthesizer {
    translator: SchemaTranslator,
    executor: Arc<dyn HttpExecutor>,
    base_url: String,
    sink: Arc<dyn DiagnosticsSink>,
}

impl ToolSynthesizer {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        executor: Arc<dyn HttpExecutor>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            translator: SchemaTranslator::new(Arc::clone(&sink)),
            executor,
            base_url: base_url.into(),
            sink,
        }
    }

    /// Build the tool for `endpoint`.
    ///
    /// # Errors
    ///
    /// Fails if a path or query parameter schema cannot be translated. Request body problems
    /// never fail; they fall back to an opaque `body` property.
    pub fn synthesize(&self, endpoint: &Endpoint) -> Result<Tool, TranslationError> {
        let (input_schema, query_names) = self.assemble(endpoint)?;
        Ok(Tool {
            name: derive_tool_name(endpoint),
            description: derive_description(endpoint),
            input_schema,
            method: endpoint.method,
            path: endpoint.path.clone(),
            handler: bind_handler(
                endpoint.method,
                endpoint.path.clone(),
                query_names,
                self.base_url.clone(),
                Arc::clone(&self.executor),
            ),
        })
    }

    /// Build the input schema for `endpoint`.
    ///
    /// # Errors
    ///
    /// See [`ToolSynthesizer::synthesize`].
    pub fn build_input_schema(&self, endpoint: &Endpoint) -> Result<InputSchema, TranslationError> {
        self.assemble(endpoint).map(|(schema, _)| schema)
    }

    /// Input schema plus the argument names that belong in the query string.
    fn assemble(&self, endpoint: &Endpoint) -> Result<(InputSchema, Vec<String>), TranslationError> {
        let mut schema = InputSchema::object();
        let mut query_names = Vec::new();

        for location in [ParameterLocation::Path, ParameterLocation::Query] {
            for param in endpoint.parameters.iter().filter(|p| p.location == location) {
                let property = self.translator.translate_at(
                    &param.schema,
                    &param.name,
                    param.description.as_deref(),
                )?;
                schema.insert_property(param.name.clone(), property);
                if param.required {
                    schema.mark_required(&param.name);
                }
                if location == ParameterLocation::Query {
                    query_names.push(param.name.clone());
                }
            }
        }

        if let Some(body) = &endpoint.request_body {
            match self.body_schema(body) {
                Ok(body_schema) => {
                    query_names.retain(|name| !body_schema.properties.contains_key(name));
                    schema.merge(body_schema);
                }
                Err(reason) => {
                    query_names.retain(|name| name != BODY_PROPERTY);
                    self.sink.record(Diagnostic::BodyFallback {
                        method: endpoint.method,
                        path: endpoint.path.clone(),
                        reason: reason.to_string(),
                    });
                    schema.insert_property(
                        BODY_PROPERTY,
                        PropertyNode::opaque_object(body.description.clone()),
                    );
                }
            }
        }

        Ok((schema, query_names))
    }

    fn body_schema(&self, body: &RequestBody) -> Result<InputSchema, BodySchemaError> {
        let (content_type, media) =
            select_json_content(body).ok_or_else(|| BodySchemaError::NoJsonContent {
                available: body
                    .content
                    .keys()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;
        let root = media
            .schema
            .as_ref()
            .ok_or_else(|| BodySchemaError::MissingSchema {
                content_type: content_type.to_string(),
            })?;

        let mut schema = InputSchema::object();
        if root.schema_type == OBJECT_TYPE {
            for (name, child) in &root.properties {
                let property = self.translator.translate_at(child, name, None)?;
                schema.insert_property(name.clone(), property);
            }
            for name in &root.required {
                schema.mark_required(name);
            }
        } else {
            let property = self.translator.translate_at(root, VALUE_PROPERTY, None)?;
            schema.insert_property(VALUE_PROPERTY, property);
            if !root.required.is_empty() {
                schema.mark_required(VALUE_PROPERTY);
            }
        }
        Ok(schema)
    }
}

/// `operationId` (lowercased) if present, else `<method>_<sanitized path>`.
#[must_use]
pub fn derive_tool_name(endpoint: &Endpoint) -> String {
    if let Some(operation_id) = endpoint
        .operation_id
        .as_deref()
        .filter(|id| !id.is_empty())
    {
        return operation_id.to_lowercase();
    }

    let path = endpoint.path.strip_prefix('/').unwrap_or(&endpoint.path);
    let sanitized: String = path
        .chars()
        .filter(|c| !matches!(c, '{' | '}'))
        .map(|c| if c == '/' { '_' } else { c })
        .collect();
    format!("{}_{sanitized}", endpoint.method.as_str().to_lowercase())
}

#[must_use]
pub fn derive_description(endpoint: &Endpoint) -> String {
    [&endpoint.summary, &endpoint.description]
        .into_iter()
        .find_map(|text| text.as_deref().filter(|t| !t.is_empty()))
        .map_or_else(
            || format!("{} {}", endpoint.method, endpoint.path),
            str::to_string,
        )
}

/// `application/json` if declared, else the first JSON-compatible media type in document order.
fn select_json_content(body: &RequestBody) -> Option<(&str, &MediaType)> {
    if let Some(media) = body.content.get(JSON_CONTENT_TYPE) {
        return Some((JSON_CONTENT_TYPE, media));
    }
    body.content
        .iter()
        .find(|(content_type, _)| is_json_compatible(content_type))
        .map(|(content_type, media)| (content_type.as_str(), media))
}

fn is_json_compatible(content_type: &str) -> bool {
    let Ok(mime) = content_type.parse::<Mime>() else {
        return false;
    };
    let (ty, subtype) = (mime.type_(), mime.subtype());
    if ty == mime::STAR && subtype == mime::STAR {
        return true;
    }
    ty == mime::APPLICATION
        && (subtype == mime::JSON || subtype == mime::STAR || mime.suffix() == Some(mime::JSON))
}

fn bind_handler(
    method: HttpMethod,
    path_template: String,
    query_names: Vec<String>,
    base_url: String,
    executor: Arc<dyn HttpExecutor>,
) -> ToolHandler {
    ToolHandler::new(move |arguments| {
        let request = resolve_request(&base_url, &path_template, &query_names, arguments);
        let executor = Arc::clone(&executor);
        async move {
            let (url, remaining) = request?;
            executor.execute(method.to_reqwest(), &url, remaining).await
        }
        .boxed()
    })
}

/// Full request URL for one call, plus the arguments left for the executor to place.
fn resolve_request(
    base_url: &str,
    path_template: &str,
    query_names: &[String],
    arguments: JsonObject,
) -> Result<(String, JsonObject), ExecutionError> {
    let (path, mut remaining) = substitute_path(path_template, arguments)?;
    let mut query = JsonObject::new();
    for name in query_names {
        if let Some(value) = remaining.remove(name) {
            query.insert(name.clone(), value);
        }
    }
    let url = append_query(&join_url(base_url, &path), &query)?;
    Ok((url, remaining))
}

/// Replace `{name}` placeholders with percent-encoded argument values and remove the consumed
/// arguments.
///
/// Placeholders without a matching argument are left in place.
///
/// # Errors
///
/// [`ExecutionError::InvalidUrl`] if a value is `.` or `..`, which would rewrite the path.
pub fn substitute_path(
    template: &str,
    mut arguments: JsonObject,
) -> Result<(String, JsonObject), ExecutionError> {
    let mut path = template.to_string();
    let placeholders: Vec<String> = arguments
        .keys()
        .filter(|name| template.contains(&format!("{{{name}}}")))
        .cloned()
        .collect();
    for name in placeholders {
        if let Some(value) = arguments.remove(&name) {
            let raw = value_to_string(&value);
            if raw == "." || raw == ".." {
                return Err(ExecutionError::InvalidUrl {
                    url: template.to_string(),
                    message: format!("path parameter '{name}' cannot be '{raw}'"),
                });
            }
            path = path.replace(&format!("{{{name}}}"), &encode_path_segment(&raw));
        }
    }
    Ok((path, arguments))
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
