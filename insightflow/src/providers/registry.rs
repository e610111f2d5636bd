//! Static provider catalog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ConfigurationError;

/// Groq chat models, fastest first.
pub const GROQ_MODELS: &[&str] = &[
    "llama-3.1-8b-instant",
    "qwen/qwen3-32b",
    "meta-llama/llama-4-scout-17b-16e-instruct",
    "meta-llama/llama-4-maverick-17b-128e-instruct",
    "openai/gpt-oss-120b",
    "gemma2-9b-it",
    "llama-3.3-70b-versatile",
];

/// OpenRouter free-tier models.
pub const OPENROUTER_MODELS: &[&str] = &[
    "google/gemini-2.0-flash-exp:free",
    "meta-llama/llama-3.3-70b-instruct:free",
    "deepseek/deepseek-r1:free",
    "qwen/qwen-2.5-72b-instruct:free",
    "nousresearch/hermes-3-llama-3.1-405b:free",
    "mistralai/mistral-nemo:free",
    "microsoft/phi-3-mini-128k-instruct:free",
];

/// Hugging Face hosted inference models.
pub const HUGGINGFACE_MODELS: &[&str] = &[
    "google/flan-t5-large",
    "google/flan-t5-base",
    "google/flan-t5-small",
];

/// Models served by the local Ollama-compatible endpoint.
pub const LOCAL_MODELS: &[&str] = &["qwen2.5:7b"];

/// The closed set of recognised providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Primary cloud provider.
    #[serde(rename = "groq")]
    Groq,
    /// Secondary free-tier aggregator.
    #[serde(rename = "openrouter")]
    OpenRouter,
    /// Tertiary hosted inference endpoint.
    #[serde(rename = "huggingface")]
    HuggingFace,
    /// Offline model behind an Ollama-compatible API.
    #[serde(rename = "local-model")]
    LocalModel,
}

impl ProviderKind {
    /// Every provider kind, in default priority order.
    pub const ALL: [Self; 4] = [Self::Groq, Self::OpenRouter, Self::HuggingFace, Self::LocalModel];

    /// Wire name of the provider.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenRouter => "openrouter",
            Self::HuggingFace => "huggingface",
            Self::LocalModel => "local-model",
        }
    }

    /// Environment variable holding the API key, if the provider needs one.
    #[must_use]
    pub const fn default_credential_env(self) -> Option<&'static str> {
        match self {
            Self::Groq => Some("GROQ_API_KEY"),
            Self::OpenRouter => Some("OPENROUTER_API_KEY"),
            Self::HuggingFace => Some("HUGGINGFACE_API_KEY"),
            Self::LocalModel => None,
        }
    }

    /// Base URL used when the configuration does not override it.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::HuggingFace => "https://api-inference.huggingface.co",
            Self::LocalModel => "http://localhost:11434",
        }
    }

    /// Built-in model list for the provider.
    #[must_use]
    pub const fn default_models(self) -> &'static [&'static str] {
        match self {
            Self::Groq => GROQ_MODELS,
            Self::OpenRouter => OPENROUTER_MODELS,
            Self::HuggingFace => HUGGINGFACE_MODELS,
            Self::LocalModel => LOCAL_MODELS,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ConfigurationError::invalid(format!("Unknown provider kind '{s}'")))
    }
}

/// Name of the environment variable holding a provider credential.
///
/// The value is read on every call, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef {
    env_var: Option<String>,
}

impl CredentialRef {
    /// A credential read from `env_var`.
    #[must_use]
    pub fn env(env_var: impl Into<String>) -> Self {
        Self {
            env_var: Some(env_var.into()),
        }
    }

    /// No credential required.
    #[must_use]
    pub const fn none() -> Self {
        Self { env_var: None }
    }

    /// The environment variable name.
    #[must_use]
    pub fn env_var(&self) -> Option<&str> {
        self.env_var.as_deref()
    }

    /// Whether a key must be present for calls to succeed.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.env_var.is_some()
    }

    /// Reads the key now. Blank values count as missing.
    #[must_use]
    pub fn resolve(&self) -> Option<String> {
        let name = self.env_var.as_deref()?;
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

/// One provider and its models, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Provider identity.
    pub kind: ProviderKind,
    /// Model identifiers, best first.
    pub models: Vec<String>,
    /// Where the API key lives.
    pub credential: CredentialRef,
}

impl Provider {
    /// Creates a provider with its default credential reference.
    #[must_use]
    pub fn new<I, S>(kind: ProviderKind, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credential = kind
            .default_credential_env()
            .map_or_else(CredentialRef::none, CredentialRef::env);
        Self {
            kind,
            models: models.into_iter().map(Into::into).collect(),
            credential,
        }
    }

    /// Overrides the credential reference.
    #[must_use]
    pub fn with_credential(mut self, credential: CredentialRef) -> Self {
        self.credential = credential;
        self
    }
}

/// Ordered, validated provider catalog. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRegistry {
    providers: Vec<Provider>,
}

impl ProviderRegistry {
    /// Validates and wraps an ordered provider list.
    ///
    /// Rejects an empty list, providers without models, blank model ids and
    /// repeated provider kinds.
    pub fn new(providers: Vec<Provider>) -> Result<Self, ConfigurationError> {
        if providers.is_empty() {
            return Err(ConfigurationError::no_providers());
        }
        for (i, provider) in providers.iter().enumerate() {
            if providers[..i].iter().any(|p| p.kind == provider.kind) {
                return Err(ConfigurationError::duplicate_provider(provider.kind));
            }
            if provider.models.is_empty() {
                return Err(ConfigurationError::no_models(provider.kind));
            }
            if let Some(index) = provider.models.iter().position(|m| m.trim().is_empty()) {
                return Err(ConfigurationError::empty_model(provider.kind, index));
            }
        }
        Ok(Self { providers })
    }

    /// The built-in catalog: groq, openrouter, huggingface, local-model.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            providers: ProviderKind::ALL
                .into_iter()
                .map(|kind| Provider::new(kind, kind.default_models().iter().copied()))
                .collect(),
        }
    }

    /// Providers in priority order.
    #[must_use]
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Looks up a provider by kind.
    #[must_use]
    pub fn get(&self, kind: ProviderKind) -> Option<&Provider> {
        self.providers.iter().find(|p| p.kind == kind)
    }

    /// Number of providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Always false for a validated registry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Total number of models across all providers.
    #[must_use]
    pub fn model_count(&self) -> usize {
        self.providers.iter().map(|p| p.models.len()).sum()
    }
}
