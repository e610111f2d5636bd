//! Runtime configuration: the provider catalog, request settings and logging.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

use crate::errors::{ConfigurationError, InsightflowError};
use crate::observability::{init_tracing, parse_level};
use crate::providers::{ClientSettings, CredentialRef, Provider, ProviderKind, ProviderRegistry};

/// Comma-separated provider kinds, highest priority first.
pub const ENV_PROVIDER_ORDER: &str = "INSIGHTFLOW_PROVIDER_ORDER";
/// Per-request timeout in seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "INSIGHTFLOW_REQUEST_TIMEOUT_SECONDS";
/// Base URL of the local model endpoint.
pub const ENV_LOCAL_MODEL_URL: &str = "INSIGHTFLOW_LOCAL_MODEL_URL";
/// `true`/`1` switches log output to JSON.
pub const ENV_LOG_JSON: &str = "INSIGHTFLOW_LOG_JSON";

/// One provider entry. Position in the list is its priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider identity.
    pub kind: ProviderKind,
    /// Models, best first.
    #[serde(default)]
    pub models: Vec<String>,
    /// Overrides the default API key variable.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Overrides the default endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// A provider entry with explicit models.
    #[must_use]
    pub fn new<I, S>(kind: ProviderKind, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            models: models.into_iter().map(Into::into).collect(),
            api_key_env: None,
            base_url: None,
        }
    }

    /// The built-in entry for `kind`.
    #[must_use]
    pub fn builtin(kind: ProviderKind) -> Self {
        Self::new(kind, kind.default_models().iter().copied())
    }

    /// Sets the API key variable.
    #[must_use]
    pub fn with_api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = Some(name.into());
        self
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Effective endpoint.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.kind.default_base_url().to_string())
    }

    /// Effective credential reference.
    #[must_use]
    pub fn credential(&self) -> CredentialRef {
        match (&self.api_key_env, self.kind.default_credential_env()) {
            (Some(name), _) => CredentialRef::env(name.clone()),
            (None, Some(name)) => CredentialRef::env(name),
            (None, None) => CredentialRef::none(),
        }
    }

    /// Converts into a registry entry.
    #[must_use]
    pub fn to_provider(&self) -> Provider {
        Provider::new(self.kind, self.models.iter().cloned()).with_credential(self.credential())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Emit JSON log lines.
    #[serde(default)]
    pub json: bool,
    /// Default level when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: default_level(),
        }
    }
}

impl TelemetryConfig {
    /// Parsed log level.
    #[must_use]
    pub fn level(&self) -> Level {
        parse_level(&self.level)
    }

    /// Installs the global subscriber with these settings.
    pub fn install(&self) {
        init_tracing(self.json, self.level());
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightflowConfig {
    /// Providers in priority order.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: f64,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
    /// Completion length cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
    /// Logging.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_providers() -> Vec<ProviderConfig> {
    ProviderKind::ALL.into_iter().map(ProviderConfig::builtin).collect()
}

fn default_timeout() -> f64 {
    60.0
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_tokens() -> Option<u32> {
    Some(2000)
}

impl Default for InsightflowConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            request_timeout_seconds: default_timeout(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl InsightflowConfig {
    /// Built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the provider list.
    #[must_use]
    pub fn with_providers(mut self, providers: Vec<ProviderConfig>) -> Self {
        self.providers = providers;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    /// Parses JSON overrides on top of the defaults, then validates.
    pub fn from_json_str(json: &str) -> Result<Self, InsightflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, InsightflowError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Defaults adjusted by the `INSIGHTFLOW_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults adjusted by variables resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(order) = lookup(ENV_PROVIDER_ORDER) {
            let kinds = order
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse::<ProviderKind>)
                .collect::<Result<Vec<_>, _>>()?;
            config.providers = kinds.into_iter().map(ProviderConfig::builtin).collect();
        }

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT) {
            config.request_timeout_seconds = raw.trim().parse().map_err(|_| {
                ConfigurationError::invalid(format!("{ENV_REQUEST_TIMEOUT} is not a number: '{raw}'"))
            })?;
        }

        if let Some(url) = lookup(ENV_LOCAL_MODEL_URL) {
            for provider in &mut config.providers {
                if provider.kind == ProviderKind::LocalModel {
                    provider.base_url = Some(url.clone());
                }
            }
        }

        if let Some(raw) = lookup(ENV_LOG_JSON) {
            config.telemetry.json = matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the provider catalog and request settings.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let seconds = self.request_timeout_seconds;
        if !(seconds > 0.0 && Duration::try_from_secs_f64(seconds).is_ok()) {
            return Err(ConfigurationError::invalid(format!(
                "request_timeout_seconds must be a positive duration, got {seconds}"
            )));
        }
        self.registry().map(|_| ())
    }

    /// Builds the validated provider registry.
    pub fn registry(&self) -> Result<ProviderRegistry, ConfigurationError> {
        ProviderRegistry::new(self.providers.iter().map(ProviderConfig::to_provider).collect())
    }

    /// Request timeout as a `Duration`. Falls back to the default timeout
    /// when the configured value was never validated.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_timeout_seconds)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_timeout()))
    }

    /// Settings handed to every HTTP client.
    #[must_use]
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            timeout: self.request_timeout(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}
