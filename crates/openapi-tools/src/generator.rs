//! Tool generation over a whole spec.
//!
//! Endpoints are processed in document order. Each one is filtered, synthesized, validated and
//! given a unique name; a failure skips that endpoint only. The run fails as a whole only when the
//! input is unusable or nothing survives.

use crate::config::{FilterPolicy, GeneratorConfig};
use crate::diagnostics::{Diagnostic, DiagnosticsSink, TracingSink};
use crate::error::{EndpointError, EndpointErrorKind, GenerationError};
use crate::filter::EndpointFilter;
use crate::model::{ApiSpec, Endpoint};
use crate::synthesize::ToolSynthesizer;
use crate::tool::Tool;
use crate::validate::validate_tool;
use apimcp_http_tools::runtime::HttpExecutor;
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of a successful generation run.
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// Generated tools, in document order. Names are unique.
    pub tools: Vec<Tool>,
    /// Endpoints that produced no tool because of an error.
    pub errors: Vec<EndpointError>,
    /// Endpoints in the document.
    pub total: usize,
    /// Endpoints rejected by the filter policy.
    pub filtered: usize,
}

impl GenerationReport {
    #[must_use]
    pub fn generated(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn errored(&self) -> usize {
        self.errors.len()
    }

    /// Endpoints that produced no tool, for any reason.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.filtered + self.errors.len()
    }
}

pub struct ToolGenerator {
    config: GeneratorConfig,
    executor: Arc<dyn HttpExecutor>,
    sink: Arc<dyn DiagnosticsSink>,
}

impl ToolGenerator {
    #[must_use]
    pub fn new(
        config: GeneratorConfig,
        executor: Arc<dyn HttpExecutor>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            config,
            executor,
            sink,
        }
    }

    /// Generate one tool per admitted endpoint.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::NoEndpoints`] / [`GenerationError::MissingBaseUrl`] for unusable input.
    /// - [`GenerationError::AllFiltered`] when the policy rejects every endpoint.
    /// - [`GenerationError::AllFailed`] when no tool survives and at least one endpoint failed.
    pub fn generate(&self, spec: &ApiSpec) -> Result<GenerationReport, GenerationError> {
        if spec.endpoints.is_empty() {
            return Err(GenerationError::NoEndpoints);
        }
        if self.config.base_url.trim().is_empty() {
            return Err(GenerationError::MissingBaseUrl);
        }

        let filter = EndpointFilter::new(self.config.filters.clone(), Arc::clone(&self.sink));
        let synthesizer = ToolSynthesizer::new(
            self.config.base_url.clone(),
            Arc::clone(&self.executor),
            Arc::clone(&self.sink),
        );

        let mut report = GenerationReport {
            tools: Vec::new(),
            errors: Vec::new(),
            total: spec.endpoints.len(),
            filtered: 0,
        };
        let mut names = HashSet::new();

        for endpoint in &spec.endpoints {
            if !filter.include(endpoint) {
                report.filtered += 1;
                continue;
            }

            let mut tool = match self.build_tool(&synthesizer, endpoint) {
                Ok(tool) => tool,
                Err(e) => {
                    self.sink.record(Diagnostic::EndpointFailed {
                        method: endpoint.method,
                        path: endpoint.path.clone(),
                        error: e.kind.to_string(),
                    });
                    report.errors.push(e);
                    continue;
                }
            };

            let assigned = reserve_unique_tool_name(&mut names, &tool.name);
            if assigned != tool.name {
                self.sink.record(Diagnostic::ToolRenamed {
                    method: endpoint.method,
                    path: endpoint.path.clone(),
                    requested: tool.name.clone(),
                    assigned: assigned.clone(),
                });
                tool.name = assigned;
            }

            self.sink.record(Diagnostic::ToolGenerated {
                method: endpoint.method,
                path: endpoint.path.clone(),
                tool: tool.name.clone(),
            });
            report.tools.push(tool);
        }

        self.sink.record(Diagnostic::GenerationSummary {
            total: report.total,
            generated: report.generated(),
            filtered: report.filtered,
            errored: report.errored(),
        });

        if report.tools.is_empty() {
            return Err(if report.errors.is_empty() {
                GenerationError::AllFiltered {
                    total: report.total,
                }
            } else {
                GenerationError::AllFailed {
                    errors: report.errors,
                }
            });
        }

        Ok(report)
    }

    fn build_tool(
        &self,
        synthesizer: &ToolSynthesizer,
        endpoint: &Endpoint,
    ) -> Result<Tool, EndpointError> {
        let fail = |kind: EndpointErrorKind| EndpointError {
            method: endpoint.method,
            path: endpoint.path.clone(),
            kind,
        };
        let tool = synthesizer
            .synthesize(endpoint)
            .map_err(|e| fail(e.into()))?;
        validate_tool(&tool).map_err(|e| fail(e.into()))?;
        Ok(tool)
    }
}

/// Generate tools with diagnostics routed to `tracing`.
///
/// # Errors
///
/// See [`ToolGenerator::generate`].
pub fn generate_tools(
    spec: &ApiSpec,
    filters: &FilterPolicy,
    base_url: &str,
    executor: Arc<dyn HttpExecutor>,
) -> Result<GenerationReport, GenerationError> {
    let config = GeneratorConfig::new(base_url).with_filters(filters.clone());
    ToolGenerator::new(config, executor, Arc::new(TracingSink)).generate(spec)
}

fn reserve_unique_tool_name(names: &mut HashSet<String>, base: &str) -> String {
    if names.insert(base.to_string()) {
        return base.to_string();
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{base}_{counter}");
        if names.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}
