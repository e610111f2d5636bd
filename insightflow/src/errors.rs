//! Error types for insightflow.
//!
//! Provider call failures are recovered inside the fallback invoker and
//! never reach callers; configuration errors fail fast before any run;
//! stage-fatal errors halt a run but keep its partial state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::providers::ProviderKind;
use crate::stages::StageId;

/// The main error type for insightflow operations.
#[derive(Debug, Error)]
pub enum InsightflowError {
    /// Provider catalog or pipeline configuration is invalid.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The dataset could not be built or loaded.
    #[error("{0}")]
    Dataset(#[from] DatasetError),

    /// A stage record was merged twice into the same shared state.
    #[error("{0}")]
    StateConflict(#[from] StateConflictError),

    /// A run with this identifier was already triggered.
    #[error("Run already exists: {0}")]
    RunAlreadyExists(Uuid),

    /// No run is registered under this identifier.
    #[error("Run not found: {0}")]
    RunNotFound(Uuid),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Diagnostic metadata attached to configuration errors.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "CONFIG-001-NO-PROVIDERS").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("summary".to_string(), serde_json::json!(self.summary));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        if !self.context.is_empty() {
            map.insert("context".to_string(), serde_json::json!(self.context));
        }
        map
    }
}

/// Error codes for configuration failures.
pub mod codes {
    /// The provider list is empty.
    pub const NO_PROVIDERS: &str = "CONFIG-001-NO-PROVIDERS";
    /// A provider declares no models.
    pub const NO_MODELS: &str = "CONFIG-002-NO-MODELS";
    /// A provider kind appears twice.
    pub const DUPLICATE_PROVIDER: &str = "CONFIG-003-DUPLICATE-PROVIDER";
    /// A model identifier is blank.
    pub const EMPTY_MODEL: &str = "CONFIG-004-EMPTY-MODEL";
    /// A pipeline has no stages.
    pub const EMPTY_PIPELINE: &str = "CONFIG-005-EMPTY-PIPELINE";
    /// Pipeline stages are duplicated or out of dependency order.
    pub const STAGE_ORDER: &str = "CONFIG-006-STAGE-ORDER";
    /// Any other malformed value.
    pub const INVALID: &str = "CONFIG-000-INVALID";
}

/// Raised at startup when the provider catalog or pipeline is malformed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ConfigurationError {
    /// The error message.
    pub message: String,
    /// Diagnostic metadata.
    pub error_info: ErrorInfo,
}

impl ConfigurationError {
    fn with_info(message: String, info: ErrorInfo) -> Self {
        Self {
            message,
            error_info: info,
        }
    }

    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.error_info.code
    }

    /// The provider list is empty.
    #[must_use]
    pub fn no_providers() -> Self {
        Self::with_info(
            "No providers configured".to_string(),
            ErrorInfo::new(codes::NO_PROVIDERS, "The escalation ladder would be empty")
                .with_fix_hint("Configure at least one provider with at least one model."),
        )
    }

    /// A provider declares no models.
    #[must_use]
    pub fn no_models(provider: ProviderKind) -> Self {
        Self::with_info(
            format!("Provider '{provider}' has no models"),
            ErrorInfo::new(codes::NO_MODELS, "Provider contributes nothing to the ladder")
                .with_fix_hint("List at least one model or remove the provider.")
                .with_context_entry("provider", provider.as_str()),
        )
    }

    /// A provider kind appears more than once.
    #[must_use]
    pub fn duplicate_provider(provider: ProviderKind) -> Self {
        Self::with_info(
            format!("Provider '{provider}' is configured more than once"),
            ErrorInfo::new(codes::DUPLICATE_PROVIDER, "Provider order would be ambiguous")
                .with_fix_hint("Merge the model lists into a single provider entry.")
                .with_context_entry("provider", provider.as_str()),
        )
    }

    /// A model identifier is blank.
    #[must_use]
    pub fn empty_model(provider: ProviderKind, index: usize) -> Self {
        Self::with_info(
            format!("Provider '{provider}' has a blank model id at index {index}"),
            ErrorInfo::new(codes::EMPTY_MODEL, "Model identifiers must be non-empty")
                .with_context_entry("provider", provider.as_str())
                .with_context_entry("index", index.to_string()),
        )
    }

    /// A pipeline has no stages.
    #[must_use]
    pub fn empty_pipeline(name: &str) -> Self {
        Self::with_info(
            format!("Pipeline '{name}' has no stages"),
            ErrorInfo::new(codes::EMPTY_PIPELINE, "Cannot build an empty pipeline")
                .with_fix_hint("Add at least one stage to the pipeline before building."),
        )
    }

    /// A stage was added at or before the position of the previous stage.
    #[must_use]
    pub fn stage_order(previous: StageId, next: StageId) -> Self {
        Self::with_info(
            format!("Stage '{next}' cannot follow '{previous}'"),
            ErrorInfo::new(codes::STAGE_ORDER, "Stages must be unique and in dependency order")
                .with_fix_hint("Add stages in the order interpret, quality, statistics, visualization, forecast, report.")
                .with_context_entry("previous", previous.as_str())
                .with_context_entry("next", next.as_str()),
        )
    }

    /// Any other malformed configuration value.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::with_info(message.clone(), ErrorInfo::new(codes::INVALID, message))
    }
}

/// A single provider call failed.
///
/// Transport, authentication, quota and parse problems are all folded into
/// this one kind; the cause survives only in `message`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{provider}/{model} call failed: {message}")]
pub struct ProviderCallError {
    /// The provider that was called.
    pub provider: ProviderKind,
    /// The model that was requested.
    pub model: String,
    /// Human-readable cause, for logs only.
    pub message: String,
}

impl ProviderCallError {
    /// Creates a new provider call error.
    #[must_use]
    pub fn new(provider: ProviderKind, model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            message: message.into(),
        }
    }
}

/// A stage could not produce even a degraded fragment.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Stage {stage} failed: {message}")]
pub struct StageFatalError {
    /// Stage that failed.
    pub stage: StageId,
    /// Original error message.
    pub message: String,
}

impl StageFatalError {
    /// Creates a new stage fatal error.
    #[must_use]
    pub fn new(stage: StageId, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Raised when a stage record is merged twice.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("State conflict: stage '{stage}' already has a record")]
pub struct StateConflictError {
    /// The conflicting stage.
    pub stage: StageId,
}

impl StateConflictError {
    /// Creates a new state conflict error.
    #[must_use]
    pub fn new(stage: StageId) -> Self {
        Self { stage }
    }
}

/// Raised when a stage reads a fragment that is not produced before it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Stage order violation: stage '{stage}' attempted to read '{requested}', which does not run before it")]
pub struct StageOrderError {
    /// The stage attempting access.
    pub stage: StageId,
    /// The stage whose fragment was requested.
    pub requested: StageId,
}

impl StageOrderError {
    /// Creates a new stage order error.
    #[must_use]
    pub fn new(stage: StageId, requested: StageId) -> Self {
        Self { stage, requested }
    }
}

/// Errors building or loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The JSON document is not an array of records.
    #[error("Dataset must be a JSON array of records")]
    NotAnArray,

    /// A record is not a JSON object.
    #[error("Record {index} is not a JSON object")]
    NotAnObject {
        /// Zero-based record index.
        index: usize,
    },

    /// A row has the wrong number of cells.
    #[error("Row {index} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Zero-based row index.
        index: usize,
        /// Column count.
        expected: usize,
        /// Cells found in the row.
        found: usize,
    },

    /// A column name appears twice.
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// Malformed JSON.
    #[error("Invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The file could not be read.
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_creation() {
        let info = ErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("provider", "groq");

        assert_eq!(info.code, "TEST-001");
        assert_eq!(info.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(info.context.get("provider"), Some(&"groq".to_string()));

        let dict = info.to_dict();
        assert_eq!(dict.get("code").unwrap(), "TEST-001");
        assert!(dict.contains_key("context"));
    }

    #[test]
    fn test_configuration_error_codes() {
        assert_eq!(ConfigurationError::no_providers().code(), codes::NO_PROVIDERS);
        assert_eq!(
            ConfigurationError::no_models(ProviderKind::Groq).code(),
            codes::NO_MODELS
        );
        assert_eq!(
            ConfigurationError::stage_order(StageId::Report, StageId::Quality).code(),
            codes::STAGE_ORDER
        );
    }

    #[test]
    fn test_stage_order_message_names_both_stages() {
        let err = ConfigurationError::stage_order(StageId::Forecast, StageId::Statistics);
        assert!(err.to_string().contains("statistics"));
        assert!(err.to_string().contains("forecast"));
    }

    #[test]
    fn test_provider_call_error_display() {
        let err = ProviderCallError::new(ProviderKind::OpenRouter, "m1", "HTTP 429");
        assert_eq!(err.to_string(), "openrouter/m1 call failed: HTTP 429");
    }

    #[test]
    fn test_insightflow_error_from_configuration() {
        let err: InsightflowError = ConfigurationError::no_providers().into();
        assert!(matches!(err, InsightflowError::Configuration(_)));
    }

    #[test]
    fn test_stage_fatal_error() {
        let error = StageFatalError::new(StageId::Quality, "dataset has no rows");
        assert_eq!(error.stage, StageId::Quality);
        assert!(error.to_string().contains("quality"));
        assert!(error.to_string().contains("dataset has no rows"));
    }
}
