use crate::mcp::McpService;
use anyhow::Context as _;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use rmcp::ServiceExt as _;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

/// Serve MCP on stdin/stdout until the client disconnects.
pub async fn serve_stdio(service: McpService) -> anyhow::Result<()> {
    tracing::info!(tools = service.tool_count(), "serving MCP over stdio");
    let running = service
        .serve(rmcp::transport::stdio())
        .await
        .context("MCP handshake over stdio")?;
    let reason = running.waiting().await.context("MCP stdio service")?;
    tracing::info!(?reason, "stdio session closed; shutting down");
    Ok(())
}

/// Streamable HTTP MCP endpoint at `/mcp` plus `GET /health`.
pub fn router(service: McpService, config: StreamableHttpServerConfig) -> Router {
    let factory = service.clone();
    let mcp = StreamableHttpService::new(
        move || Ok(factory.clone()),
        Arc::new(LocalSessionManager::default()),
        config,
    );
    Router::new()
        .nest_service("/mcp", mcp)
        .route("/health", get(health))
        .with_state(service)
}

async fn health(State(service): State<McpService>) -> Json<Value> {
    Json(json!({ "status": "ok", "tools": service.tool_count() }))
}

/// Serve MCP over HTTP until Ctrl-C. Open sessions are cancelled on shutdown.
pub async fn serve_http(service: McpService, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, tools = service.tool_count(), "serving MCP over HTTP at /mcp");

    let config = StreamableHttpServerConfig::default();
    let sessions = config.cancellation_token.clone();
    axum::serve(listener, router(service, config))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            sessions.cancel();
        })
        .await
        .context("http server")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
