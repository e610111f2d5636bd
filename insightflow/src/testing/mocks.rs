//! Scripted providers and stages for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::context::StageContext;
use crate::errors::ProviderCallError;
use crate::providers::{flatten_messages, ChatMessage, ProviderClient, ProviderKind};
use crate::stages::{Stage, StageId, StageResult};

/// What a scripted provider does for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// Answer with this text.
    Reply(String),
    /// Fail with this message.
    Fail(String),
}

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Model requested.
    pub model: String,
    /// Flattened prompt.
    pub prompt: String,
}

/// A provider client whose behaviour is scripted per model.
///
/// Models without a script use the default behaviour, which fails unless
/// changed with [`ScriptedProviderClient::replying_by_default`].
#[derive(Debug)]
pub struct ScriptedProviderClient {
    kind: ProviderKind,
    scripts: HashMap<String, ScriptedReply>,
    default: ScriptedReply,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProviderClient {
    /// A client for `kind` that fails every model.
    #[must_use]
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            scripts: HashMap::new(),
            default: ScriptedReply::Fail("unscripted model".to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A client for `kind` that answers every model with `text`.
    #[must_use]
    pub fn always_replying(kind: ProviderKind, text: impl Into<String>) -> Self {
        Self::new(kind).replying_by_default(text)
    }

    /// Answers `model` with `text`.
    #[must_use]
    pub fn replying(mut self, model: impl Into<String>, text: impl Into<String>) -> Self {
        self.scripts.insert(model.into(), ScriptedReply::Reply(text.into()));
        self
    }

    /// Fails `model` with `message`.
    #[must_use]
    pub fn failing(mut self, model: impl Into<String>, message: impl Into<String>) -> Self {
        self.scripts.insert(model.into(), ScriptedReply::Fail(message.into()));
        self
    }

    /// Answers unscripted models with `text`.
    #[must_use]
    pub fn replying_by_default(mut self, text: impl Into<String>) -> Self {
        self.default = ScriptedReply::Reply(text.into());
        self
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Models called so far, in order.
    #[must_use]
    pub fn called_models(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.model.clone()).collect()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl ProviderClient for ScriptedProviderClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn call(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ProviderCallError> {
        self.calls.lock().push(RecordedCall {
            model: model.to_string(),
            prompt: flatten_messages(messages),
        });
        match self.scripts.get(model).unwrap_or(&self.default) {
            ScriptedReply::Reply(text) => Ok(text.clone()),
            ScriptedReply::Fail(message) => Err(ProviderCallError::new(self.kind, model, message.clone())),
        }
    }
}

/// A stage that returns a fixed result and records what it could see.
#[derive(Debug)]
pub struct ScriptedStage {
    id: StageId,
    result: Mutex<StageResult>,
    delay: Option<Duration>,
    visible: Mutex<Vec<Vec<StageId>>>,
}

impl ScriptedStage {
    /// A stage `id` that returns `result`.
    #[must_use]
    pub fn new(id: StageId, result: StageResult) -> Self {
        Self {
            id,
            result: Mutex::new(result),
            delay: None,
            visible: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps for `delay` before returning.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replaces the result returned by later runs.
    pub fn set_result(&self, result: StageResult) {
        *self.result.lock() = result;
    }

    /// Number of runs.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.visible.lock().len()
    }

    /// For each run, the earlier stages that had a record.
    #[must_use]
    pub fn visible_stages(&self) -> Vec<Vec<StageId>> {
        self.visible.lock().clone()
    }
}

#[async_trait]
impl Stage for ScriptedStage {
    fn id(&self) -> StageId {
        self.id
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        let seen = StageId::ALL
            .into_iter()
            .filter(|&stage| matches!(ctx.record(stage), Ok(Some(_))))
            .collect();
        self.visible.lock().push(seen);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.lock().clone()
    }
}
