//! Client for the Hugging Face hosted inference API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::client::{flatten_messages, ChatMessage, ClientSettings, ProviderClient};
use super::http::{build_client, non_empty, send, trim_base_url};
use super::registry::{CredentialRef, ProviderKind};
use crate::errors::{ConfigurationError, ProviderCallError};

/// Text-generation client; the conversation is flattened into one prompt.
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    client: reqwest::Client,
    base_url: String,
    credential: CredentialRef,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl HuggingFaceClient {
    /// Creates a client rooted at `base_url`.
    pub fn new(
        base_url: impl AsRef<str>,
        credential: CredentialRef,
        settings: &ClientSettings,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            client: build_client(settings.timeout)?,
            base_url: trim_base_url(base_url.as_ref()),
            credential,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Batch(Vec<Generated>),
    Single(Generated),
}

#[derive(Deserialize)]
struct Generated {
    generated_text: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl ProviderClient for HuggingFaceClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    async fn call(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderCallError> {
        let kind = ProviderKind::HuggingFace;
        let key = self.credential.resolve();
        if self.credential.is_required() && key.is_none() {
            return Err(ProviderCallError::new(
                kind,
                model,
                format!("missing credential {}", self.credential.env_var().unwrap_or_default()),
            ));
        }

        let mut parameters = json!({ "temperature": self.temperature, "return_full_text": false });
        if let Some(max) = self.max_tokens {
            parameters["max_new_tokens"] = json!(max);
        }
        let mut request = self
            .client
            .post(format!("{}/models/{model}", self.base_url))
            .json(&json!({ "inputs": flatten_messages(messages), "parameters": parameters }));
        if let Some(key) = key {
            request = request.bearer_auth(key);
        }

        debug!(provider = %kind, model, "Sending text generation");
        let body = send(kind, model, request).await?;
        let parsed: GenerationResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderCallError::new(kind, model, format!("malformed response: {e}")))?;

        let first = match parsed {
            GenerationResponse::Batch(items) => items.into_iter().next(),
            GenerationResponse::Single(item) => Some(item),
        };
        if let Some(error) = first.as_ref().and_then(|g| g.error.clone()) {
            return Err(ProviderCallError::new(kind, model, error));
        }
        non_empty(kind, model, first.and_then(|g| g.generated_text))
    }
}
