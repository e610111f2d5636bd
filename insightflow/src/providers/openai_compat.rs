//! Client for OpenAI-style `/chat/completions` endpoints (Groq, OpenRouter).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{ChatMessage, ClientSettings, ProviderClient};
use super::http::{build_client, non_empty, send, trim_base_url};
use super::registry::{CredentialRef, ProviderKind};
use crate::errors::{ConfigurationError, ProviderCallError};

/// Chat-completions client keyed by provider kind.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    kind: ProviderKind,
    client: reqwest::Client,
    base_url: String,
    credential: CredentialRef,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleClient {
    /// Creates a client for `kind` rooted at `base_url`.
    pub fn new(
        kind: ProviderKind,
        base_url: impl AsRef<str>,
        credential: CredentialRef,
        settings: &ClientSettings,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            kind,
            client: build_client(settings.timeout)?,
            base_url: trim_base_url(base_url.as_ref()),
            credential,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ProviderClient for OpenAiCompatibleClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn call(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderCallError> {
        let mut request = self.client.post(self.chat_url()).json(&ChatApiRequest {
            model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        });
        if self.credential.is_required() {
            let key = self.credential.resolve().ok_or_else(|| {
                ProviderCallError::new(
                    self.kind,
                    model,
                    format!("missing credential {}", self.credential.env_var().unwrap_or_default()),
                )
            })?;
            request = request.bearer_auth(key);
        }

        debug!(provider = %self.kind, model, "Sending chat completion");
        let body = send(self.kind, model, request).await?;
        let parsed: ChatApiResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderCallError::new(self.kind, model, format!("malformed response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content);
        non_empty(self.kind, model, content)
    }
}
