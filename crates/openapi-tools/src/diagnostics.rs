//! Generation diagnostics.
//!
//! Components never log directly; they record a [`Diagnostic`] on an injected
//! [`DiagnosticsSink`]. The binary wires in [`TracingSink`], tests use [`CollectingSink`].

use crate::model::HttpMethod;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The filter policy rejected an endpoint.
    EndpointFiltered {
        method: HttpMethod,
        path: String,
        reason: String,
    },
    /// The request body could not be translated; an opaque `body` property was used instead.
    BodyFallback {
        method: HttpMethod,
        path: String,
        reason: String,
    },
    /// Non-string enum values were converted to their string form.
    EnumCoerced { location: String },
    /// A tool name collided with an earlier one and was suffixed.
    ToolRenamed {
        method: HttpMethod,
        path: String,
        requested: String,
        assigned: String,
    },
    ToolGenerated {
        method: HttpMethod,
        path: String,
        tool: String,
    },
    /// An endpoint produced no tool.
    EndpointFailed {
        method: HttpMethod,
        path: String,
        error: String,
    },
    GenerationSummary {
        total: usize,
        generated: usize,
        filtered: usize,
        errored: usize,
    },
}

impl Diagnostic {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::EndpointFiltered { .. } | Self::EnumCoerced { .. } | Self::ToolGenerated { .. } => {
                Severity::Debug
            }
            Self::GenerationSummary { .. } => Severity::Info,
            Self::BodyFallback { .. } | Self::ToolRenamed { .. } => Severity::Warn,
            Self::EndpointFailed { .. } => Severity::Error,
        }
    }
}

pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::EndpointFiltered {
                method,
                path,
                reason,
            } => tracing::debug!(%method, %path, %reason, "endpoint filtered out"),
            Diagnostic::BodyFallback {
                method,
                path,
                reason,
            } => tracing::warn!(
                %method,
                %path,
                %reason,
                "request body schema not translatable; exposing opaque 'body' property"
            ),
            Diagnostic::EnumCoerced { location } => {
                tracing::debug!(%location, "non-string enum values coerced to strings");
            }
            Diagnostic::ToolRenamed {
                method,
                path,
                requested,
                assigned,
            } => tracing::warn!(
                %method,
                %path,
                %requested,
                %assigned,
                "tool name collision; renamed"
            ),
            Diagnostic::ToolGenerated { method, path, tool } => {
                tracing::debug!(%method, %path, %tool, "generated tool");
            }
            Diagnostic::EndpointFailed {
                method,
                path,
                error,
            } => tracing::error!(%method, %path, %error, "failed to generate tool for endpoint"),
            Diagnostic::GenerationSummary {
                total,
                generated,
                filtered,
                errored,
            } => tracing::info!(total, generated, filtered, errored, "tool generation finished"),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.events.lock().clone()
    }

    /// Diagnostics at or above `severity`.
    #[must_use]
    pub fn at_least(&self, severity: Severity) -> Vec<Diagnostic> {
        self.events
            .lock()
            .iter()
            .filter(|d| d.severity() >= severity)
            .cloned()
            .collect()
    }
}

impl DiagnosticsSink for CollectingSink {
    fn record(&self, diagnostic: Diagnostic) {
        self.events.lock().push(diagnostic);
    }
}
