use serde::{Deserialize, Serialize};

/// Which endpoints become tools.
///
/// Path patterns are literal prefixes; method patterns are compared case-insensitively.
/// Empty lists do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterPolicy {
    /// If non-empty, the endpoint path must start with at least one of these.
    pub include_paths: Vec<String>,

    /// The endpoint path must not start with any of these.
    pub exclude_paths: Vec<String>,

    /// If non-empty, the endpoint method must equal one of these.
    pub include_methods: Vec<String>,

    /// The endpoint method must not equal any of these.
    pub exclude_methods: Vec<String>,
}

/// Inputs of a generation run besides the document itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL that tool handlers prepend to endpoint paths. Must be non-blank.
    pub base_url: String,

    pub filters: FilterPolicy,
}

impl GeneratorConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            filters: FilterPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: FilterPolicy) -> Self {
        self.filters = filters;
        self
    }
}
