//! Shared plumbing for the HTTP provider clients.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::time::Duration;

use super::registry::ProviderKind;
use crate::errors::{ConfigurationError, ProviderCallError};

/// Longest error body excerpt kept in a failure message.
const ERROR_EXCERPT_CHARS: usize = 200;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, ConfigurationError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| ConfigurationError::invalid(format!("Failed to create HTTP client: {e}")))
}

pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Sends the request and returns the body of a 2xx response.
pub(crate) async fn send(
    kind: ProviderKind,
    model: &str,
    request: reqwest::RequestBuilder,
) -> Result<String, ProviderCallError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderCallError::new(kind, model, format!("request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderCallError::new(kind, model, format!("failed to read body: {e}")))?;

    if !status.is_success() {
        let excerpt: String = body.chars().take(ERROR_EXCERPT_CHARS).collect();
        return Err(ProviderCallError::new(
            kind,
            model,
            format!("HTTP {}: {excerpt}", status.as_u16()),
        ));
    }
    Ok(body)
}

/// Rejects blank completions.
pub(crate) fn non_empty(
    kind: ProviderKind,
    model: &str,
    text: Option<String>,
) -> Result<String, ProviderCallError> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t.trim().to_string()),
        _ => Err(ProviderCallError::new(kind, model, "empty completion")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_base_url() {
        assert_eq!(trim_base_url("http://x/v1/"), "http://x/v1");
        assert_eq!(trim_base_url("http://x"), "http://x");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(ProviderKind::Groq, "m", Some(" hi ".into())).unwrap(), "hi");
        assert!(non_empty(ProviderKind::Groq, "m", Some("  ".into())).is_err());
        assert!(non_empty(ProviderKind::Groq, "m", None).is_err());
    }
}
