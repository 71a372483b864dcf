use anyhow::Context as _;
use apimcp_http_tools::runtime::ExecutorOptions;
use apimcp_openapi_tools::FilterPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openapi: OpenApiConfig,
    pub mcp: McpConfig,
    pub filters: FilterPolicy,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Line-delimited JSON-RPC on stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST.
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub transport: Transport,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            transport: Transport::Stdio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenApiConfig {
    /// File path or `http(s)` URL of the `OpenAPI` document.
    pub spec_path: String,
    /// Overrides the document's first server URL.
    pub base_url: String,
    /// Abort startup on spec validation issues instead of logging them.
    pub strict_validation: bool,
}

impl Default for OpenApiConfig {
    fn default() -> Self {
        Self {
            spec_path: "openapi.yaml".to_string(),
            base_url: String::new(),
            strict_validation: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub server_name: String,
    pub version: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server_name: "api-to-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Sent with every upstream request (e.g. an API key).
    pub headers: HashMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            headers: HashMap::new(),
        }
    }
}

impl HttpConfig {
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            headers: self.headers.clone(),
            ..ExecutorOptions::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `apimcp_openapi_tools=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.openapi.spec_path.trim().is_empty() {
            anyhow::bail!("openapi.spec_path is required");
        }
        if self.server.port == 0 {
            anyhow::bail!("server.port must be between 1 and 65535");
        }
        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be positive");
        }
        Ok(())
    }
}

/// Read a YAML config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => return Err(e).with_context(|| format!("read config {}", path.display())),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(AppConfig::default());
    }
    let cfg: AppConfig =
        serde_yaml::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &AppConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }
    let yaml = serde_yaml::to_string(cfg).context("serialize config as yaml")?;
    std::fs::write(path, yaml).with_context(|| format!("write config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.server.transport, Transport::Stdio);
        assert_eq!(cfg.http.timeout_secs, 30);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
server:
  transport: http
  port: 9000
openapi:
  spec_path: ./petstore.yaml
filters:
  exclude_methods: [DELETE]
http:
  headers:
    X-Api-Key: secret
logging:
  format: text
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server.transport, Transport::Http);
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.openapi.spec_path, "./petstore.yaml");
        assert_eq!(cfg.filters.exclude_methods, vec!["DELETE"]);
        assert_eq!(cfg.http.headers["X-Api-Key"], "secret");
        assert_eq!(cfg.http.max_retries, 3);
        assert_eq!(cfg.logging.format, LogFormat::Text);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn empty_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(load_config(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn invalid_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server: [").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.yaml"));
    }

    #[test]
    fn saved_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut cfg = AppConfig::default();
        cfg.openapi.base_url = "https://api.example.com".to_string();
        save_config(&path, &cfg).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg);
    }

    #[test]
    fn validation_rejects_unusable_values() {
        let mut cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.openapi.spec_path = " ".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.server.port = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.http.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn executor_options_follow_http_config() {
        let cfg = HttpConfig {
            timeout_secs: 7,
            max_retries: 1,
            headers: HashMap::from([("a".to_string(), "b".to_string())]),
        };
        let options = cfg.executor_options();
        assert_eq!(options.timeout, Duration::from_secs(7));
        assert_eq!(options.max_retries, 1);
        assert_eq!(options.headers["a"], "b");
    }
}
