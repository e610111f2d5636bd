//! Client for a local Ollama-compatible `/api/chat` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{ChatMessage, ClientSettings, ProviderClient};
use super::http::{build_client, non_empty, send, trim_base_url};
use super::registry::ProviderKind;
use crate::errors::{ConfigurationError, ProviderCallError};

/// Offline fallback; needs no credential.
#[derive(Debug, Clone)]
pub struct LocalModelClient {
    client: reqwest::Client,
    base_url: String,
    temperature: f32,
}

impl LocalModelClient {
    /// Creates a client rooted at `base_url`.
    pub fn new(base_url: impl AsRef<str>, settings: &ClientSettings) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client: build_client(settings.timeout)?,
            base_url: trim_base_url(base_url.as_ref()),
            temperature: settings.temperature,
        })
    }
}

#[derive(Serialize)]
struct LocalChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: LocalOptions,
}

#[derive(Serialize)]
struct LocalOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct LocalChatResponse {
    message: Option<LocalMessage>,
}

#[derive(Deserialize)]
struct LocalMessage {
    content: Option<String>,
}

#[async_trait]
impl ProviderClient for LocalModelClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LocalModel
    }

    async fn call(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderCallError> {
        let kind = ProviderKind::LocalModel;
        let request = self.client.post(format!("{}/api/chat", self.base_url)).json(&LocalChatRequest {
            model,
            messages,
            stream: false,
            options: LocalOptions { temperature: self.temperature },
        });

        debug!(provider = %kind, model, "Sending local chat");
        let body = send(kind, model, request).await?;
        let parsed: LocalChatResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderCallError::new(kind, model, format!("malformed response: {e}")))?;
        non_empty(kind, model, parsed.message.and_then(|m| m.content))
    }
}
