//! OpenAPI->MCP tool generation.
//!
//! Pipeline: [`loader`] reads a document into the [`model`], [`spec_validation`] reports
//! structural problems, and [`generator`] turns every admitted endpoint into a [`tool::Tool`]
//! bound to an [`apimcp_http_tools::runtime::HttpExecutor`].
//!
//! Generation is synchronous and deterministic: the same spec, policy and base URL always yield
//! the same tools, in document order.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod generator;
pub mod loader;
pub mod model;
pub mod schema;
pub mod spec_validation;
pub mod synthesize;
pub mod tool;
pub mod validate;

#[cfg(test)]
mod test_support;

pub use config::{FilterPolicy, GeneratorConfig};
pub use error::{GenerationError, LoadError};
pub use generator::{GenerationReport, ToolGenerator, generate_tools};
pub use loader::SpecLoader;
pub use model::ApiSpec;
pub use tool::Tool;
