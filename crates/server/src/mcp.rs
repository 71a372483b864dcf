//! MCP tool surface over the generated tools.
//!
//! [`McpService`] implements rmcp's [`ServerHandler`]; rmcp owns the JSON-RPC framing, the
//! `initialize` handshake and protocol version negotiation. The service is cheap to clone so the
//! HTTP transport can hand one to every session.

use apimcp_openapi_tools::Tool;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData as McpError, RoleServer, ServerHandler};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
}

#[derive(Clone)]
pub struct McpService {
    inner: Arc<Inner>,
}

struct Inner {
    identity: ServerIdentity,
    tools: Vec<Tool>,
    advertised: Vec<rmcp::model::Tool>,
    by_name: HashMap<String, usize>,
}

impl McpService {
    pub fn new(identity: ServerIdentity, tools: Vec<Tool>) -> Self {
        let advertised = tools.iter().map(Tool::to_mcp_tool).collect();
        let by_name = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
        Self {
            inner: Arc::new(Inner {
                identity,
                tools,
                advertised,
                by_name,
            }),
        }
    }

    pub fn tool_count(&self) -> usize {
        self.inner.tools.len()
    }

    fn tool(&self, name: &str) -> Option<&Tool> {
        self.inner.by_name.get(name).map(|&i| &self.inner.tools[i])
    }
}

impl ServerHandler for McpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.inner.identity.name.clone(),
                version: self.inner.identity.version.clone(),
                ..Default::default()
            },
            instructions: Some(
                "Each tool calls one operation of the upstream REST API and returns its response body."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(self.inner.advertised.clone()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let Some(tool) = self.tool(&request.name) else {
            let message = format!("unknown tool: {}", request.name);
            return Err(McpError::invalid_params(message, None));
        };
        let arguments = request.arguments.unwrap_or_else(JsonObject::new);

        tracing::debug!(tool = %tool.name, "calling tool");
        match tool.call(arguments).await {
            Ok(body) => Ok(CallToolResult::success(vec![Content::text(render_body(&body))])),
            Err(e) => {
                tracing::warn!(tool = %tool.name, error = %e, "tool call failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }

    fn get_tool(&self, name: &str) -> Option<rmcp::model::Tool> {
        self.inner
            .by_name
            .get(name)
            .map(|&i| self.inner.advertised[i].clone())
    }
}

fn render_body(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use apimcp_http_tools::runtime::{ExecutionError, HttpExecutor};
    use apimcp_openapi_tools::diagnostics::CollectingSink;
    use apimcp_openapi_tools::loader::parse_spec;
    use apimcp_openapi_tools::{GeneratorConfig, ToolGenerator};
    use async_trait::async_trait;
    use rmcp::model::ErrorCode;
    use rmcp::service::RunningService;
    use rmcp::{RoleClient, ServiceError, ServiceExt};
    use serde_json::json;

    struct EchoExecutor;

    #[async_trait]
    impl HttpExecutor for EchoExecutor {
        async fn execute(
            &self,
            method: reqwest::Method,
            url: &str,
            arguments: JsonObject,
        ) -> Result<Value, ExecutionError> {
            if url.ends_with("/fail") {
                return Err(ExecutionError::Status {
                    status: 404,
                    body: "not found".to_string(),
                });
            }
            Ok(json!({ "method": method.as_str(), "url": url, "arguments": arguments }))
        }
    }

    const SPEC: &str = r#"
openapi: 3.0.0
info: { title: T, version: "1" }
paths:
  /users/{id}:
    get:
      operationId: getUser
      parameters:
        - { name: id, in: path, required: true, schema: { type: integer } }
        - { name: fields, in: query, schema: { type: string } }
      responses: { "200": { description: ok } }
  /fail:
    post:
      responses: { "200": { description: ok } }
"#;

    pub(crate) fn service() -> McpService {
        let spec = parse_spec("spec.yaml", SPEC).unwrap();
        let report = ToolGenerator::new(
            GeneratorConfig::new("https://api.example.com"),
            Arc::new(EchoExecutor),
            Arc::new(CollectingSink::new()),
        )
        .generate(&spec)
        .unwrap();
        McpService::new(
            ServerIdentity {
                name: "test".to_string(),
                version: "0.0.1".to_string(),
            },
            report.tools,
        )
    }

    /// Serve [`service`] over an in-memory pipe and return a connected client.
    async fn connect() -> RunningService<RoleClient, ()> {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            let running = service().serve(server_io).await.unwrap();
            let _ = running.waiting().await;
        });
        ().serve(client_io).await.unwrap()
    }

    fn call(name: &str, arguments: Value) -> CallToolRequestParams {
        CallToolRequestParams {
            meta: None,
            name: name.to_string().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        }
    }

    fn text(result: &CallToolResult) -> &str {
        result.content[0].as_text().map(|t| t.text.as_str()).unwrap()
    }

    #[tokio::test]
    async fn handshake_reports_identity_and_tools_capability() {
        let client = connect().await;
        let info = client.peer_info().unwrap();
        assert_eq!(info.server_info.name, "test");
        assert_eq!(info.server_info.version, "0.0.1");
        assert!(info.capabilities.tools.is_some());
        client.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn lists_tools_with_schemas_and_annotations() {
        let client = connect().await;
        let tools = client.list_all_tools().await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names, vec!["getuser", "post_fail"]);

        let get_user = &tools[0];
        assert_eq!(get_user.input_schema["required"], json!(["id"]));
        let annotations = get_user.annotations.as_ref().unwrap();
        assert_eq!(annotations.read_only_hint, Some(true));
        client.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn calls_tools_by_name() {
        let client = connect().await;
        let result = client
            .call_tool(call("getuser", json!({"id": 9, "fields": "name"})))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
        let body: Value = serde_json::from_str(text(&result)).unwrap();
        assert_eq!(body["url"], "https://api.example.com/users/9?fields=name");
        assert_eq!(body["arguments"], json!({}));
        client.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn handler_errors_become_error_results() {
        let client = connect().await;
        let result = client
            .call_tool(call("post_fail", Value::Null))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(text(&result), "HTTP error 404: not found");
        client.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_tools_are_invalid_params() {
        let client = connect().await;
        let err = client.call_tool(call("nope", json!({}))).await.unwrap_err();
        match err {
            ServiceError::McpError(e) => {
                assert_eq!(e.code, ErrorCode::INVALID_PARAMS);
                assert_eq!(e.message, "unknown tool: nope");
            }
            other => panic!("unexpected error: {other}"),
        }
        client.cancel().await.unwrap();
    }

    #[test]
    fn get_tool_returns_the_advertised_definition() {
        let svc = service();
        assert_eq!(svc.tool_count(), 2);
        let tool = svc.get_tool("post_fail").unwrap();
        assert_eq!(tool.annotations.unwrap().idempotent_hint, Some(false));
        assert!(svc.get_tool("nope").is_none());
    }
}
