//! The provider capability and the lookup table that selects clients.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::registry::ProviderKind;
use crate::errors::ProviderCallError;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions to the model.
    System,
    /// The question being asked.
    User,
    /// A prior model reply.
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: Role,
    /// Message body.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    /// An assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Flattens a conversation into a single prompt for completion-style APIs.
#[must_use]
pub fn flatten_messages(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| m.content.trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Sends a message list to one named model.
///
/// Every failure mode maps to [`ProviderCallError`]; callers never branch
/// on the cause.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// The provider this client talks to.
    fn kind(&self) -> ProviderKind;

    /// Returns the generated text, or fails.
    async fn call(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderCallError>;
}

/// Request settings shared by every HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion length cap.
    pub max_tokens: Option<u32>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            temperature: 0.0,
            max_tokens: Some(2000),
        }
    }
}

/// Lookup table from provider kind to client.
#[derive(Clone, Default)]
pub struct ClientTable {
    clients: HashMap<ProviderKind, Arc<dyn ProviderClient>>,
}

impl ClientTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client under its own kind, replacing any previous one.
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.insert(client);
        self
    }

    /// Adds a client under its own kind, replacing any previous one.
    pub fn insert(&mut self, client: Arc<dyn ProviderClient>) {
        self.clients.insert(client.kind(), client);
    }

    /// The client registered for `kind`.
    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderClient>> {
        self.clients.get(&kind).cloned()
    }

    /// Whether a client is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.clients.contains_key(&kind)
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// True when no clients are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl fmt::Debug for ClientTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.clients.keys().copied().collect();
        kinds.sort();
        f.debug_struct("ClientTable").field("kinds", &kinds).finish()
    }
}

#[cfg(feature = "http")]
mod http_table {
    use std::sync::Arc;

    use super::{ClientSettings, ClientTable, ProviderClient};
    use crate::config::{InsightflowConfig, ProviderConfig};
    use crate::errors::ConfigurationError;
    use crate::providers::{HuggingFaceClient, LocalModelClient, OpenAiCompatibleClient, ProviderKind};

    type ClientConstructor =
        fn(&ProviderConfig, &ClientSettings) -> Result<Arc<dyn ProviderClient>, ConfigurationError>;

    fn openai_compatible(
        config: &ProviderConfig,
        settings: &ClientSettings,
    ) -> Result<Arc<dyn ProviderClient>, ConfigurationError> {
        Ok(Arc::new(OpenAiCompatibleClient::new(
            config.kind,
            config.base_url(),
            config.credential(),
            settings,
        )?))
    }

    fn huggingface(
        config: &ProviderConfig,
        settings: &ClientSettings,
    ) -> Result<Arc<dyn ProviderClient>, ConfigurationError> {
        Ok(Arc::new(HuggingFaceClient::new(config.base_url(), config.credential(), settings)?))
    }

    fn local_model(
        config: &ProviderConfig,
        settings: &ClientSettings,
    ) -> Result<Arc<dyn ProviderClient>, ConfigurationError> {
        Ok(Arc::new(LocalModelClient::new(config.base_url(), settings)?))
    }

    const CONSTRUCTORS: &[(ProviderKind, ClientConstructor)] = &[
        (ProviderKind::Groq, openai_compatible),
        (ProviderKind::OpenRouter, openai_compatible),
        (ProviderKind::HuggingFace, huggingface),
        (ProviderKind::LocalModel, local_model),
    ];

    impl ClientTable {
        /// Builds one HTTP client per configured provider.
        pub fn from_config(config: &InsightflowConfig) -> Result<Self, ConfigurationError> {
            let settings = config.client_settings();
            let mut table = Self::new();
            for provider in &config.providers {
                let (_, construct) = CONSTRUCTORS
                    .iter()
                    .find(|(kind, _)| *kind == provider.kind)
                    .ok_or_else(|| {
                        ConfigurationError::invalid(format!("No client for provider '{}'", provider.kind))
                    })?;
                table.insert(construct(provider, &settings)?);
            }
            Ok(table)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_messages_skips_blank() {
        let messages = vec![
            ChatMessage::system("You are terse."),
            ChatMessage::user("   "),
            ChatMessage::user("Describe the data."),
        ];
        assert_eq!(flatten_messages(&messages), "You are terse.\n\nDescribe the data.");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn test_client_table_keys_by_kind() {
        let mut groq = MockProviderClient::new();
        groq.expect_kind().return_const(ProviderKind::Groq);
        let mut local = MockProviderClient::new();
        local.expect_kind().return_const(ProviderKind::LocalModel);

        let table = ClientTable::new()
            .with_client(Arc::new(groq))
            .with_client(Arc::new(local));

        assert_eq!(table.len(), 2);
        assert!(table.contains(ProviderKind::Groq));
        assert!(table.get(ProviderKind::OpenRouter).is_none());
        assert_eq!(format!("{table:?}"), "ClientTable { kinds: [Groq, LocalModel] }");
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_client_table_from_default_config() {
        let config = crate::config::InsightflowConfig::default();
        let table = ClientTable::from_config(&config).unwrap();
        for kind in ProviderKind::ALL {
            assert!(table.contains(kind), "missing client for {kind}");
        }
    }
}
