use apimcp_http_tools::runtime::{ExecutionError, HttpExecutor};
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use rmcp::model::JsonObject;
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: Method,
    pub url: String,
    pub arguments: JsonObject,
}

/// Executor that records every request and answers `{"ok": true}`.
#[derive(Debug, Default)]
pub(crate) struct RecordingExecutor {
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingExecutor {
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl HttpExecutor for RecordingExecutor {
    async fn execute(
        &self,
        method: Method,
        url: &str,
        arguments: JsonObject,
    ) -> Result<Value, ExecutionError> {
        self.calls.lock().push(RecordedCall {
            method,
            url: url.to_string(),
            arguments,
        });
        Ok(json!({"ok": true}))
    }
}
