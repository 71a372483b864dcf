//! Error types for `apimcp-openapi-tools`.
//!
//! Errors are layered the way generation fails: a schema translation failure or a validation
//! failure is fatal to one endpoint only ([`EndpointError`]), and [`GenerationError`] is reserved
//! for whole-run failures.

use crate::model::HttpMethod;
use thiserror::Error;

/// A schema could not be translated into a tool property.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    /// An `array` schema without an `items` schema.
    #[error("array schema at '{location}' has no items schema")]
    MissingItems { location: String },
}

/// A request body could not be mapped onto the tool's input schema.
///
/// Never fatal: the synthesizer falls back to an opaque `body` property.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BodySchemaError {
    /// No media type in the body content map accepts JSON.
    #[error("no JSON-compatible content type (available: {available})")]
    NoJsonContent { available: String },

    /// The selected media type carries no schema.
    #[error("content type '{content_type}' has no schema")]
    MissingSchema { content_type: String },

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

/// A synthesized tool is structurally invalid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("tool name cannot be empty")]
    EmptyName,

    #[error("tool description cannot be empty")]
    EmptyDescription,

    #[error("input schema type cannot be empty")]
    EmptySchemaType,

    #[error("input schema type must be 'object', got '{0}'")]
    NonObjectSchema(String),

    #[error("property name cannot be empty")]
    EmptyPropertyName,

    #[error("property '{property}': type cannot be empty")]
    EmptyPropertyType { property: String },

    #[error("property '{property}': minLength ({min}) cannot be greater than maxLength ({max})")]
    LengthBounds { property: String, min: u64, max: u64 },

    #[error("property '{property}': minimum ({min}) cannot be greater than maximum ({max})")]
    NumericBounds { property: String, min: f64, max: f64 },

    #[error("property '{property}': enum values can only be used with string type, got '{property_type}'")]
    EnumOnNonString {
        property: String,
        property_type: String,
    },

    #[error("required field name cannot be empty")]
    EmptyRequiredName,

    #[error("required field '{0}' not found in properties")]
    MissingRequired(String),
}

// f64 bounds never hold NaN: they come from JSON numbers.
impl Eq for ValidationError {}

/// Why a single endpoint produced no tool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointErrorKind {
    #[error("failed to generate tool: {0}")]
    Translation(#[from] TranslationError),

    #[error("generated tool validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Per-endpoint failure, collected into the generation report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{method} {path}: {kind}")]
pub struct EndpointError {
    pub method: HttpMethod,
    pub path: String,
    #[source]
    pub kind: EndpointErrorKind,
}

/// Whole-run generation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("input validation failed: no endpoints found in specification")]
    NoEndpoints,

    #[error("input validation failed: base URL is required")]
    MissingBaseUrl,

    /// Every endpoint was rejected by the filter policy.
    #[error("no tools could be generated: all {total} endpoints were filtered out")]
    AllFiltered { total: usize },

    /// Nothing survived and at least one endpoint failed.
    #[error("no tools could be generated: {} errors occurred (first: {})", .errors.len(), first_error(.errors))]
    AllFailed { errors: Vec<EndpointError> },
}

fn first_error(errors: &[EndpointError]) -> String {
    errors
        .first()
        .map_or_else(|| "none".to_string(), ToString::to_string)
}

/// Loading or normalizing an `OpenAPI` document failed.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to fetch spec from '{url}': {message}")]
    Fetch { url: String, message: String },

    #[error("failed to read spec file '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse OpenAPI spec from '{location}': {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unsupported reference '{reference}': {reason}")]
    UnsupportedReference { reference: String, reason: String },

    #[error("reference '{reference}' does not resolve to the expected object: {source}")]
    Decode {
        reference: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One structural problem found by [`crate::spec_validation::validate_spec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for SpecIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation error in field '{}': {}", self.field, self.message)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("spec validation failed with {} issue(s): {}", .issues.len(), join_issues(.issues))]
pub struct SpecValidationError {
    pub issues: Vec<SpecIssue>,
}

fn join_issues(issues: &[SpecIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
