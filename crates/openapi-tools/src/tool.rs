//! Generated tools.

use crate::model::HttpMethod;
use crate::schema::InputSchema;
use apimcp_http_tools::runtime::ExecutionError;
use apimcp_http_tools::semantics::annotations_for_method;
use futures::future::BoxFuture;
use rmcp::model::JsonObject;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub type HandlerFuture = BoxFuture<'static, Result<Value, ExecutionError>>;

/// Invokes the upstream endpoint for one tool.
///
/// Cheap to clone; safe to call concurrently.
#[derive(Clone)]
pub struct ToolHandler(Arc<dyn Fn(JsonObject) -> HandlerFuture + Send + Sync>);

impl ToolHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(JsonObject) -> HandlerFuture + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the handler.
    ///
    /// # Errors
    ///
    /// Returns whatever the bound executor reports.
    pub async fn call(&self, arguments: JsonObject) -> Result<Value, ExecutionError> {
        (self.0)(arguments).await
    }
}

impl fmt::Debug for ToolHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ToolHandler(..)")
    }
}

/// An MCP tool generated from one endpoint. Immutable once generated.
#[derive(Debug, Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
    pub method: HttpMethod,
    pub path: String,
    pub handler: ToolHandler,
}

impl Tool {
    /// Invoke the tool's handler.
    ///
    /// # Errors
    ///
    /// Propagates the handler's [`ExecutionError`].
    pub async fn call(&self, arguments: JsonObject) -> Result<Value, ExecutionError> {
        self.handler.call(arguments).await
    }

    /// The tool as advertised over MCP (`tools/list`).
    #[must_use]
    pub fn to_mcp_tool(&self) -> rmcp::model::Tool {
        let mut tool = rmcp::model::Tool::new(
            self.name.clone(),
            self.description.clone(),
            Arc::new(self.input_schema.to_json_object()),
        );
        tool.annotations = Some(annotations_for_method(&self.method.to_reqwest()));
        tool
    }
}
