//! Outbound HTTP execution for generated tools.
//!
//! A tool handler resolves its own URL (base URL, substituted path template and declared query
//! parameters via [`append_query`]) and hands the leftover arguments to an [`HttpExecutor`]. The
//! executor decides where those arguments go:
//!
//! - `GET`, `DELETE`, `HEAD`, `OPTIONS`: every argument becomes a query parameter.
//! - `POST`, `PUT`, `PATCH`: a `body` argument is the JSON payload and the rest go to the query;
//!   otherwise a lone `value` argument is the payload; otherwise all arguments form a JSON
//!   object payload.
//!
//! Array values repeat their query key. `null` values are dropped.

use crate::safety::{is_retryable, redact_url, sanitize_reqwest_error};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, Response};
use rmcp::model::JsonObject;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors surfaced by an [`HttpExecutor`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The resolved request URL could not be parsed.
    #[error("invalid request url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The method has no argument-placement rule.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The request could not be sent, or the response body could not be read.
    #[error("request failed: {0}")]
    Transport(String),

    /// The upstream API answered with a 4xx/5xx status.
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Capability used by tool handlers to perform the actual HTTP request.
///
/// Implementations must be shareable across concurrently running handlers.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute(&self, method: Method, url: &str, arguments: JsonObject) -> Result<Value>;
}

/// Tunables for [`ReqwestExecutor`].
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Additional attempts after a retryable transport failure.
    pub max_retries: u32,
    /// Delay before the first retry; doubled after each attempt.
    pub retry_backoff: Duration,
    /// Upper bound for the retry delay.
    pub max_retry_backoff: Duration,
    /// Headers attached to every request.
    pub headers: HashMap<String, String>,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            max_retry_backoff: Duration::from_secs(5),
            headers: HashMap::new(),
        }
    }
}

/// [`HttpExecutor`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestExecutor {
    client: Client,
    options: ExecutorOptions,
}

impl ReqwestExecutor {
    /// Build an executor with its own client.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::Client`] if the TLS backend cannot be initialized.
    pub fn new(options: ExecutorOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ExecutionError::Client(sanitize_reqwest_error(&e)))?;
        Ok(Self { client, options })
    }

    /// Build an executor around an existing client. `options.timeout` is still applied per request.
    #[must_use]
    pub fn with_client(client: Client, options: ExecutorOptions) -> Self {
        Self { client, options }
    }

    #[must_use]
    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        payload: Option<&Value>,
    ) -> std::result::Result<Response, reqwest::Error> {
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .timeout(self.options.timeout)
            .header(ACCEPT, "application/json");
        for (name, value) in &self.options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(payload) = payload {
            request = request.json(payload);
        }
        request.send().await
    }

    async fn send_with_retry(
        &self,
        method: &Method,
        url: &Url,
        payload: Option<&Value>,
    ) -> Result<Response> {
        let mut attempt: u32 = 0;
        let mut backoff = self.options.retry_backoff;
        loop {
            match self.send_once(method, url, payload).await {
                Ok(response) => return Ok(response),
                Err(e) if is_retryable(&e) && attempt < self.options.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        method = %method,
                        url = %redact_url(url),
                        attempt,
                        max_retries = self.options.max_retries,
                        error = %sanitize_reqwest_error(&e),
                        "HTTP request failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.options.max_retry_backoff);
                }
                Err(e) => return Err(ExecutionError::Transport(sanitize_reqwest_error(&e))),
            }
        }
    }
}

#[async_trait]
impl HttpExecutor for ReqwestExecutor {
    async fn execute(&self, method: Method, url: &str, arguments: JsonObject) -> Result<Value> {
        let mut url = parse_url(url)?;
        let plan = plan_request(&method, arguments)?;
        extend_query(&mut url, &plan.query);

        tracing::debug!(method = %method, url = %redact_url(&url), "executing HTTP request");
        let response = self
            .send_with_retry(&method, &url, plan.payload.as_ref())
            .await?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExecutionError::Transport(sanitize_reqwest_error(&e)))?;

        if status.is_client_error() || status.is_server_error() {
            return Err(ExecutionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(parse_body(text))
    }
}

/// Where a request's arguments end up.
#[derive(Debug, Default, PartialEq)]
struct RequestPlan {
    query: Vec<(String, String)>,
    payload: Option<Value>,
}

fn plan_request(method: &Method, mut arguments: JsonObject) -> Result<RequestPlan> {
    match method.as_str() {
        "GET" | "DELETE" | "HEAD" | "OPTIONS" => Ok(RequestPlan {
            query: query_pairs(&arguments),
            payload: None,
        }),
        "POST" | "PUT" | "PATCH" => {
            if let Some(body) = arguments.remove("body") {
                return Ok(RequestPlan {
                    query: query_pairs(&arguments),
                    payload: Some(body),
                });
            }
            if arguments.len() == 1
                && let Some(value) = arguments.remove("value")
            {
                return Ok(RequestPlan {
                    query: Vec::new(),
                    payload: Some(value),
                });
            }
            Ok(RequestPlan {
                query: Vec::new(),
                payload: (!arguments.is_empty()).then(|| Value::Object(arguments)),
            })
        }
        other => Err(ExecutionError::UnsupportedMethod(other.to_string())),
    }
}

fn query_pairs(arguments: &JsonObject) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in arguments {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter(|v| !v.is_null()) {
                    pairs.push((key.clone(), value_to_string(item)));
                }
            }
            _ => pairs.push((key.clone(), value_to_string(value))),
        }
    }
    pairs
}

/// Append `arguments` to `url` as query parameters.
///
/// Values are rendered like executor-placed query arguments: arrays repeat the key and `null`
/// is dropped. Any query already on `url` is kept.
///
/// # Errors
///
/// [`ExecutionError::InvalidUrl`] if `url` does not parse.
pub fn append_query(url: &str, arguments: &JsonObject) -> Result<String> {
    let pairs = query_pairs(arguments);
    if pairs.is_empty() {
        return Ok(url.to_string());
    }
    let mut parsed = parse_url(url)?;
    extend_query(&mut parsed, &pairs);
    Ok(parsed.into())
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| ExecutionError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn extend_query(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        return;
    }
    let mut serializer = url.query_pairs_mut();
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
}

/// Percent-encode `s` for use as a single path segment.
///
/// Only RFC 3986 unreserved characters are kept, so `/`, `?` and `#` cannot escape the segment.
#[must_use]
pub fn encode_path_segment(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

/// Render a JSON argument the way it appears in a URL.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

fn parse_body(text: String) -> Value {
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}
