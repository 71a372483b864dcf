//! Endpoint filtering.

use crate::config::FilterPolicy;
use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::model::Endpoint;
use std::fmt;
use std::sync::Arc;

/// Why the policy rejected an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRejection {
    PathNotIncluded,
    PathExcluded(String),
    MethodNotIncluded,
    MethodExcluded(String),
}

impl fmt::Display for FilterRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathNotIncluded => f.write_str("path matches no include pattern"),
            Self::PathExcluded(p) => write!(f, "path matches exclude pattern '{p}'"),
            Self::MethodNotIncluded => f.write_str("method matches no include pattern"),
            Self::MethodExcluded(m) => write!(f, "method matches exclude pattern '{m}'"),
        }
    }
}

impl FilterPolicy {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include_paths.is_empty()
            && self.exclude_paths.is_empty()
            && self.include_methods.is_empty()
            && self.exclude_methods.is_empty()
    }

    /// The first check `endpoint` fails, or `None` if it is admitted.
    #[must_use]
    pub fn rejection(&self, endpoint: &Endpoint) -> Option<FilterRejection> {
        let path = endpoint.path.as_str();
        let method = endpoint.method.as_str();

        if !self.include_paths.is_empty()
            && !self
                .include_paths
                .iter()
                .any(|p| path.starts_with(p.as_str()))
        {
            return Some(FilterRejection::PathNotIncluded);
        }
        if let Some(p) = self.exclude_paths.iter().find(|p| path.starts_with(p.as_str())) {
            return Some(FilterRejection::PathExcluded(p.clone()));
        }
        if !self.include_methods.is_empty()
            && !self.include_methods.iter().any(|m| m.eq_ignore_ascii_case(method))
        {
            return Some(FilterRejection::MethodNotIncluded);
        }
        if let Some(m) = self.exclude_methods.iter().find(|m| m.eq_ignore_ascii_case(method)) {
            return Some(FilterRejection::MethodExcluded(m.clone()));
        }
        None
    }

    #[must_use]
    pub fn admits(&self, endpoint: &Endpoint) -> bool {
        self.rejection(endpoint).is_none()
    }
}

/// Applies a [`FilterPolicy`] and reports rejections.
pub struct EndpointFilter {
    policy: FilterPolicy,
    sink: Arc<dyn DiagnosticsSink>,
}

impl EndpointFilter {
    #[must_use]
    pub fn new(policy: FilterPolicy, sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self { policy, sink }
    }

    #[must_use]
    pub fn include(&self, endpoint: &Endpoint) -> bool {
        match self.policy.rejection(endpoint) {
            None => true,
            Some(reason) => {
                self.sink.record(Diagnostic::EndpointFiltered {
                    method: endpoint.method,
                    path: endpoint.path.clone(),
                    reason: reason.to_string(),
                });
                false
            }
        }
    }
}
