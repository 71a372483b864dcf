//! `OpenAPI` document loading and normalization.
//!
//! Documents are read from a local file or an `http(s)` URL and parsed with `serde_yaml` into
//! `openapiv3` types (JSON is a YAML subset). They are then flattened into the [`ApiSpec`] model:
//!
//! - local `$ref`s (`#/...`) are resolved by JSON pointer against the whole document;
//! - a schema reference that points back into its own ancestry becomes an opaque object node;
//! - path-item parameters are merged with operation parameters (operation wins per `(in, name)`);
//! - operations of a path are emitted as GET, POST, PUT, DELETE, PATCH, HEAD, OPTIONS.
//!
//! References to other documents are not followed.

use crate::error::LoadError;
use crate::model::{
    ApiSpec, Endpoint, HttpMethod, Info, MediaType, Parameter, ParameterLocation, RequestBody,
    ResponseInfo, SchemaNode, Server,
};
use apimcp_http_tools::safety::sanitize_reqwest_error;
use indexmap::IndexMap;
use openapiv3::{
    OpenAPI, Operation, Parameter as OaParameter, ParameterSchemaOrContent, PathItem, ReferenceOr,
    RequestBody as OaRequestBody, Response as OaResponse, Schema, StatusCode,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

const MAX_REF_DEPTH: usize = 32;

fn is_http_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Reads and normalizes `OpenAPI` documents.
#[derive(Debug, Clone, Default)]
pub struct SpecLoader {
    client: Client,
}

impl SpecLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Load the document at `location` (file path or `http(s)` URL).
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the document cannot be read, parsed or normalized.
    pub async fn load(&self, location: &str) -> Result<ApiSpec, LoadError> {
        let content = self.read(location).await?;
        let spec = parse_spec(location, &content)?;
        tracing::info!(
            location,
            title = %spec.info.title,
            version = %spec.info.version,
            endpoints = spec.endpoints.len(),
            "loaded OpenAPI spec"
        );
        Ok(spec)
    }

    async fn read(&self, location: &str) -> Result<String, LoadError> {
        if is_http_url(location) {
            tracing::info!(url = location, "fetching OpenAPI spec");
            let fetch_error = |e: reqwest::Error| LoadError::Fetch {
                url: location.to_string(),
                message: sanitize_reqwest_error(&e),
            };
            let response = self
                .client
                .get(location)
                .send()
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(fetch_error)?;
            response.text().await.map_err(fetch_error)
        } else {
            tracing::info!(path = location, "reading OpenAPI spec");
            tokio::fs::read_to_string(location)
                .await
                .map_err(|source| LoadError::ReadFile {
                    path: location.to_string(),
                    source,
                })
        }
    }
}

/// Parse and normalize an already-read document. `location` is only used in errors.
///
/// # Errors
///
/// Returns a [`LoadError`] if the content is not an `OpenAPI` 3 document or contains a
/// non-schema reference that cannot be resolved.
pub fn parse_spec(location: &str, content: &str) -> Result<ApiSpec, LoadError> {
    let document: OpenAPI =
        serde_yaml::from_str(content).map_err(|source| LoadError::Parse {
            location: location.to_string(),
            source,
        })?;
    let root = serde_json::to_value(&document)?;
    Normalizer { root: &root }.normalize(&document)
}

/// Resolve a server URL into an absolute base URL.
///
/// Relative server URLs (e.g. `/api/v3`) are resolved against the document URL when the document
/// itself was loaded over HTTP.
///
/// # Errors
///
/// Returns [`LoadError::InvalidBaseUrl`] if no absolute URL can be derived.
pub fn resolve_base_url(spec_location: &str, base_url: &str) -> Result<String, LoadError> {
    if is_http_url(base_url) {
        return Ok(base_url.to_string());
    }
    let invalid = |reason: String| LoadError::InvalidBaseUrl {
        base_url: base_url.to_string(),
        reason,
    };
    if !is_http_url(spec_location) {
        return Err(invalid(
            "must be an absolute http(s) URL (set base_url explicitly)".to_string(),
        ));
    }
    let mut spec_url = Url::parse(spec_location).map_err(|e| invalid(e.to_string()))?;
    spec_url.set_fragment(None);
    spec_url
        .join(base_url)
        .map(String::from)
        .map_err(|e| invalid(format!("{e} (set base_url explicitly)")))
}

struct Normalizer<'a> {
    root: &'a Value,
}

impl Normalizer<'_> {
    fn normalize(&self, document: &OpenAPI) -> Result<ApiSpec, LoadError> {
        let info = Info {
            title: document.info.title.clone(),
            version: document.info.version.clone(),
            description: document.info.description.clone(),
        };
        let servers = document
            .servers
            .iter()
            .map(|s| Server {
                url: s.url.clone(),
                description: s.description.clone(),
            })
            .collect();

        let mut endpoints = Vec::new();
        for (path, item) in &document.paths.paths {
            let item: PathItem = self.resolve(item)?;
            for method in HttpMethod::ALL {
                if let Some(operation) = operation_for(&item, method) {
                    endpoints.push(self.endpoint(path, method, &item, operation)?);
                }
            }
        }

        let mut components = IndexMap::new();
        if let Some(c) = &document.components {
            for (name, schema) in &c.schemas {
                components.insert(name.clone(), self.schema(schema)?);
            }
        }

        Ok(ApiSpec {
            info,
            servers,
            endpoints,
            components,
        })
    }

    fn endpoint(
        &self,
        path: &str,
        method: HttpMethod,
        item: &PathItem,
        operation: &Operation,
    ) -> Result<Endpoint, LoadError> {
        let parameters = self.merge_parameters(&item.parameters, &operation.parameters)?;

        let request_body = match &operation.request_body {
            Some(body) => Some(self.request_body(&self.resolve::<OaRequestBody>(body)?)?),
            None => None,
        };

        let mut responses = IndexMap::new();
        if let Some(default) = &operation.responses.default {
            responses.insert("default".to_string(), self.response(default)?);
        }
        for (status, response) in &operation.responses.responses {
            responses.insert(status_key(status), self.response(response)?);
        }

        Ok(Endpoint {
            path: path.to_string(),
            method,
            operation_id: operation.operation_id.clone(),
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            parameters,
            request_body,
            responses,
        })
    }

    fn merge_parameters(
        &self,
        path_item_params: &[ReferenceOr<OaParameter>],
        operation_params: &[ReferenceOr<OaParameter>],
    ) -> Result<Vec<Parameter>, LoadError> {
        let mut merged: Vec<Parameter> = Vec::new();
        let mut index: HashMap<(ParameterLocation, String), usize> = HashMap::new();

        for p in path_item_params.iter().chain(operation_params) {
            let param = self.parameter(&self.resolve(p)?)?;
            let key = (param.location, param.name.clone());
            if let Some(&i) = index.get(&key) {
                merged[i] = param;
            } else {
                index.insert(key, merged.len());
                merged.push(param);
            }
        }

        Ok(merged)
    }

    fn parameter(&self, param: &OaParameter) -> Result<Parameter, LoadError> {
        let (data, location) = match param {
            OaParameter::Path { parameter_data, .. } => (parameter_data, ParameterLocation::Path),
            OaParameter::Query { parameter_data, .. } => (parameter_data, ParameterLocation::Query),
            OaParameter::Header { parameter_data, .. } => {
                (parameter_data, ParameterLocation::Header)
            }
            OaParameter::Cookie { parameter_data, .. } => {
                (parameter_data, ParameterLocation::Cookie)
            }
        };
        let schema = match &data.format {
            ParameterSchemaOrContent::Schema(schema) => self.schema(schema)?,
            // Content-style parameters are serialized by the caller.
            ParameterSchemaOrContent::Content(_) => SchemaNode::of_type("string"),
        };
        Ok(Parameter {
            name: data.name.clone(),
            location,
            description: data.description.clone(),
            // Path parameters are always required.
            required: data.required || location == ParameterLocation::Path,
            schema,
        })
    }

    fn request_body(&self, body: &OaRequestBody) -> Result<RequestBody, LoadError> {
        let mut content = IndexMap::new();
        for (content_type, media) in &body.content {
            let schema = match &media.schema {
                Some(schema) => Some(self.schema(schema)?),
                None => None,
            };
            content.insert(content_type.clone(), MediaType { schema });
        }
        Ok(RequestBody {
            description: body.description.clone(),
            required: body.required,
            content,
        })
    }

    fn response(&self, response: &ReferenceOr<OaResponse>) -> Result<ResponseInfo, LoadError> {
        let response: OaResponse = self.resolve(response)?;
        Ok(ResponseInfo {
            description: Some(response.description).filter(|d| !d.is_empty()),
        })
    }

    fn schema(&self, schema: &ReferenceOr<Schema>) -> Result<SchemaNode, LoadError> {
        let value = serde_json::to_value(schema)?;
        Ok(self.schema_node(&value, &mut Vec::new()))
    }

    /// Build a schema node from its JSON form. `visiting` holds the references being expanded
    /// above this node.
    fn schema_node(&self, value: &Value, visiting: &mut Vec<String>) -> SchemaNode {
        if let Some(reference) = value.get("$ref").and_then(Value::as_str) {
            if visiting.iter().any(|r| r == reference) {
                tracing::debug!(reference, "recursive schema reference; emitting opaque object");
                return opaque_reference(reference);
            }
            return match self.follow(reference) {
                Ok(target) => {
                    visiting.push(reference.to_string());
                    let node = self.schema_node(target, visiting);
                    visiting.pop();
                    node
                }
                Err(e) => {
                    tracing::warn!(reference, error = %e, "unresolvable schema reference; emitting opaque object");
                    opaque_reference(reference)
                }
            };
        }

        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        SchemaNode {
            schema_type: schema_type(value),
            format: text("format"),
            description: text("description"),
            properties: value
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, child)| (name.clone(), self.schema_node(child, visiting)))
                        .collect()
                })
                .unwrap_or_default(),
            required: value
                .get("required")
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            items: value
                .get("items")
                .filter(|items| !items.is_null())
                .map(|items| Box::new(self.schema_node(items, visiting))),
            enum_values: value
                .get("enum")
                .and_then(Value::as_array)
                .map(|values| values.iter().filter(|v| !v.is_null()).cloned().collect())
                .unwrap_or_default(),
            default: value.get("default").cloned(),
            minimum: value.get("minimum").and_then(Value::as_f64),
            maximum: value.get("maximum").and_then(Value::as_f64),
            min_length: value.get("minLength").and_then(Value::as_u64),
            max_length: value.get("maxLength").and_then(Value::as_u64),
            pattern: text("pattern"),
        }
    }

    /// Follow a local reference (and any reference chain it starts) to its target.
    fn follow(&self, reference: &str) -> Result<&Value, LoadError> {
        let unsupported = |reference: &str, reason: &str| LoadError::UnsupportedReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let mut current = reference;
        for _ in 0..MAX_REF_DEPTH {
            let Some(pointer) = current.strip_prefix('#') else {
                return Err(unsupported(current, "only local references are supported"));
            };
            let target = self
                .root
                .pointer(pointer)
                .ok_or_else(|| unsupported(current, "target not found"))?;
            match target.get("$ref").and_then(Value::as_str) {
                Some(next) => current = next,
                None => return Ok(target),
            }
        }
        Err(unsupported(reference, "reference chain too deep"))
    }

    fn resolve<T: DeserializeOwned + Clone>(&self, item: &ReferenceOr<T>) -> Result<T, LoadError> {
        match item {
            ReferenceOr::Item(value) => Ok(value.clone()),
            ReferenceOr::Reference { reference } => {
                let target = self.follow(reference)?;
                serde_json::from_value(target.clone()).map_err(|source| LoadError::Decode {
                    reference: reference.clone(),
                    source,
                })
            }
        }
    }
}

fn operation_for(item: &PathItem, method: HttpMethod) -> Option<&Operation> {
    match method {
        HttpMethod::Get => item.get.as_ref(),
        HttpMethod::Post => item.post.as_ref(),
        HttpMethod::Put => item.put.as_ref(),
        HttpMethod::Delete => item.delete.as_ref(),
        HttpMethod::Patch => item.patch.as_ref(),
        HttpMethod::Head => item.head.as_ref(),
        HttpMethod::Options => item.options.as_ref(),
    }
}

fn status_key(status: &StatusCode) -> String {
    match status {
        StatusCode::Code(code) => code.to_string(),
        StatusCode::Range(range) => format!("{range}XX"),
    }
}

/// `type` as a plain string. For a 3.1-style type list, the first non-null entry.
fn schema_type(value: &Value) -> String {
    match value.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn opaque_reference(reference: &str) -> SchemaNode {
    let name = reference.rsplit('/').next().unwrap_or(reference);
    SchemaNode::of_type("object").with_description(format!("Reference to {name}"))
}
