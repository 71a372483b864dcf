//! Redaction helpers for outbound HTTP diagnostics.
//!
//! Tool arguments frequently end up in query strings, and base URLs may carry credentials.
//! Anything that reaches logs or tool results goes through these helpers first.

use url::Url;

/// Render a URL without userinfo, query, or fragment.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    let _ = redacted.set_username("");
    let _ = redacted.set_password(None);
    redacted.set_query(None);
    redacted.set_fragment(None);
    redacted.to_string()
}

/// Render a `reqwest` error with its URL (if any) redacted.
#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let message = e.to_string();
    match e.url() {
        Some(url) => message.replace(url.as_str(), &redact_url(url)),
        None => message,
    }
}

/// Classify transport failures worth retrying (connection setup or timeouts).
#[must_use]
pub fn is_retryable(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}
