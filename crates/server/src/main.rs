//! `api-to-mcp`: expose an `OpenAPI`-described REST API as MCP tools.

mod config;
mod logging;
mod mcp;
mod transport;

use anyhow::Context as _;
use apimcp_http_tools::runtime::ReqwestExecutor;
use apimcp_openapi_tools::diagnostics::TracingSink;
use apimcp_openapi_tools::loader::resolve_base_url;
use apimcp_openapi_tools::spec_validation::validate_spec;
use apimcp_openapi_tools::{ApiSpec, GeneratorConfig, SpecLoader, ToolGenerator};
use clap::Parser;
use config::{AppConfig, LogFormat, Transport};
use mcp::{McpService, ServerIdentity};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "api-to-mcp", version, about)]
struct Cli {
    /// YAML configuration file. Missing files fall back to defaults.
    #[arg(long, env = "API_TO_MCP_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// `OpenAPI` document (file path or http(s) URL).
    #[arg(long, env = "API_TO_MCP_SPEC")]
    spec: Option<String>,

    /// Base URL of the upstream API. Defaults to the document's first server.
    #[arg(long, env = "API_TO_MCP_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, value_enum)]
    transport: Option<Transport>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Write a default configuration file to this path and exit.
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,
}

impl Cli {
    fn apply(self, cfg: &mut AppConfig) {
        if let Some(spec) = self.spec {
            cfg.openapi.spec_path = spec;
        }
        if let Some(base_url) = self.base_url {
            cfg.openapi.base_url = base_url;
        }
        if let Some(transport) = self.transport {
            cfg.server.transport = transport;
        }
        if let Some(host) = self.host {
            cfg.server.host = host;
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
        if let Some(level) = self.log_level {
            cfg.logging.level = level;
        }
        if let Some(format) = self.log_format {
            cfg.logging.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.init_config {
        config::save_config(path, &AppConfig::default())?;
        println!("wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut cfg = config::load_config(&cli.config)?;
    cli.apply(&mut cfg);
    cfg.validate()?;
    logging::init(&cfg.logging)?;

    let service = build_service(&cfg).await?;
    match cfg.server.transport {
        Transport::Stdio => transport::serve_stdio(service).await,
        Transport::Http => {
            let ip: IpAddr = if cfg.server.host == "localhost" {
                IpAddr::from([127, 0, 0, 1])
            } else {
                cfg.server
                    .host
                    .parse()
                    .with_context(|| format!("invalid server.host '{}'", cfg.server.host))?
            };
            transport::serve_http(service, SocketAddr::new(ip, cfg.server.port)).await
        }
    }
}

async fn build_service(cfg: &AppConfig) -> anyhow::Result<McpService> {
    let spec = SpecLoader::new()
        .load(&cfg.openapi.spec_path)
        .await
        .context("load OpenAPI spec")?;

    if let Err(e) = validate_spec(&spec) {
        if cfg.openapi.strict_validation {
            return Err(e).context("OpenAPI spec failed strict validation");
        }
        for issue in &e.issues {
            tracing::warn!(field = %issue.field, message = %issue.message, "spec validation issue");
        }
    }

    let base_url = upstream_base_url(cfg, &spec)?;
    tracing::info!(%base_url, "resolved upstream base URL");

    let executor = ReqwestExecutor::new(cfg.http.executor_options())?;
    let generator = ToolGenerator::new(
        GeneratorConfig::new(base_url).with_filters(cfg.filters.clone()),
        Arc::new(executor),
        Arc::new(TracingSink),
    );
    let report = generator.generate(&spec).context("generate tools")?;
    for error in &report.errors {
        tracing::warn!(%error, "endpoint skipped");
    }
    tracing::info!(
        generated = report.generated(),
        skipped = report.skipped(),
        errored = report.errored(),
        "tools ready"
    );

    Ok(McpService::new(
        ServerIdentity {
            name: cfg.mcp.server_name.clone(),
            version: cfg.mcp.version.clone(),
        },
        report.tools,
    ))
}

/// Configured base URL, else the document's first server. Empty if neither is set.
fn upstream_base_url(cfg: &AppConfig, spec: &ApiSpec) -> anyhow::Result<String> {
    let candidate = if cfg.openapi.base_url.trim().is_empty() {
        spec.default_server_url().unwrap_or_default()
    } else {
        cfg.openapi.base_url.as_str()
    };
    if candidate.is_empty() {
        return Ok(String::new());
    }
    Ok(resolve_base_url(&cfg.openapi.spec_path, candidate)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apimcp_openapi_tools::model::Server;

    fn spec_with_server(url: &str) -> ApiSpec {
        ApiSpec {
            servers: vec![Server {
                url: url.to_string(),
                description: None,
            }],
            ..ApiSpec::default()
        }
    }

    #[test]
    fn cli_overrides_config() {
        let cli = Cli::parse_from([
            "api-to-mcp",
            "--spec",
            "petstore.yaml",
            "--transport",
            "http",
            "--port",
            "9999",
            "--log-format",
            "text",
        ]);
        let mut cfg = AppConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.openapi.spec_path, "petstore.yaml");
        assert_eq!(cfg.server.transport, Transport::Http);
        assert_eq!(cfg.server.port, 9999);
        assert_eq!(cfg.logging.format, LogFormat::Text);
        assert_eq!(cfg.server.host, "127.0.0.1");
    }

    #[test]
    fn base_url_prefers_configuration() {
        let mut cfg = AppConfig::default();
        cfg.openapi.base_url = "https://override.example.com".to_string();
        let spec = spec_with_server("https://spec.example.com");
        assert_eq!(
            upstream_base_url(&cfg, &spec).unwrap(),
            "https://override.example.com"
        );
    }

    #[test]
    fn base_url_falls_back_to_first_server() {
        let cfg = AppConfig::default();
        let spec = spec_with_server("https://spec.example.com/v2");
        assert_eq!(
            upstream_base_url(&cfg, &spec).unwrap(),
            "https://spec.example.com/v2"
        );
        assert_eq!(upstream_base_url(&cfg, &ApiSpec::default()).unwrap(), "");
    }

    #[test]
    fn relative_servers_need_a_remote_spec() {
        let mut cfg = AppConfig::default();
        let spec = spec_with_server("/api/v3");
        assert!(upstream_base_url(&cfg, &spec).is_err());

        cfg.openapi.spec_path = "https://petstore3.swagger.io/api/v3/openapi.json".to_string();
        assert_eq!(
            upstream_base_url(&cfg, &spec).unwrap(),
            "https://petstore3.swagger.io/api/v3"
        );
    }

    #[tokio::test]
    async fn builds_a_service_from_a_spec_file() {
        let dir = tempfile::tempdir().unwrap();
        let spec_path = dir.path().join("openapi.yaml");
        std::fs::write(
            &spec_path,
            r#"
openapi: 3.0.0
info: { title: T, version: "1" }
servers: [{ url: "https://api.example.com" }]
paths:
  /a: { get: { responses: { "200": { description: ok } } } }
  /b: { delete: { responses: { "204": { description: gone } } } }
"#,
        )
        .unwrap();

        let mut cfg = AppConfig::default();
        cfg.openapi.spec_path = spec_path.to_string_lossy().into_owned();
        cfg.filters.exclude_methods = vec!["delete".to_string()];

        let service = build_service(&cfg).await.unwrap();
        assert_eq!(service.tool_count(), 1);
    }

    #[tokio::test]
    async fn strict_validation_rejects_flawed_specs() {
        let dir = tempfile::tempdir().unwrap();
        let spec_path = dir.path().join("openapi.yaml");
        std::fs::write(
            &spec_path,
            r#"
openapi: 3.0.0
info: { title: T, version: "1" }
servers: [{ url: "https://api.example.com" }]
paths:
  /a:
    get:
      parameters: [{ name: q, in: query, schema: { description: untyped } }]
      responses: { "200": { description: ok } }
"#,
        )
        .unwrap();

        let mut cfg = AppConfig::default();
        cfg.openapi.spec_path = spec_path.to_string_lossy().into_owned();
        assert!(build_service(&cfg).await.is_ok());

        cfg.openapi.strict_validation = true;
        assert!(build_service(&cfg).await.is_err());
    }
}
