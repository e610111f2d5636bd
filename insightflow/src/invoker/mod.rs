//! The fallback cascade.
//!
//! [`FallbackInvoker::invoke`] walks the escalation ladder from a starting
//! position, one call per rung, until a provider answers or the ladder runs
//! out. Exhaustion is not an error: it yields [`SAFE_MODE_TEXT`].

mod session;

pub use session::InvocationSession;

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::ProviderCallError;
use crate::events::{names, EventSink, NoOpEventSink};
use crate::providers::{ChatMessage, ClientTable, EscalationLadder, LadderEntry, LadderPosition};

/// Static reply returned when every provider failed.
pub const SAFE_MODE_TEXT: &str =
    "**System Notice:** All AI providers are currently at capacity. Please try again in a few minutes.";

/// Result of one cascade walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    /// Generated text, or the safe-mode notice.
    pub text: String,
    /// Position that produced `text`.
    pub position: LadderPosition,
    /// Attempts made, counting the safe-mode check.
    pub attempts: usize,
}

impl Invocation {
    /// True when no provider answered.
    #[must_use]
    pub const fn is_safe_mode(&self) -> bool {
        self.position.is_safe_mode()
    }
}

/// Drives provider calls down the ladder.
#[derive(Clone)]
pub struct FallbackInvoker {
    ladder: Arc<EscalationLadder>,
    clients: ClientTable,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for FallbackInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackInvoker")
            .field("ladder_len", &self.ladder.len())
            .field("clients", &self.clients)
            .finish_non_exhaustive()
    }
}

impl FallbackInvoker {
    /// Creates an invoker over `ladder` using `clients`.
    #[must_use]
    pub fn new(ladder: EscalationLadder, clients: ClientTable) -> Self {
        Self {
            ladder: Arc::new(ladder),
            clients,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// An invoker with no rungs; every request answers in safe mode.
    #[must_use]
    pub fn safe_mode_only() -> Self {
        Self::new(EscalationLadder::default(), ClientTable::new())
    }

    /// Sets the event sink for `provider.*` events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// The ladder being walked.
    #[must_use]
    pub fn ladder(&self) -> &EscalationLadder {
        &self.ladder
    }

    /// Walks the ladder from `start` until a provider answers.
    ///
    /// Positions strictly increase and none repeats, so at most
    /// `ladder.len() + 1` attempts are made.
    pub async fn invoke(&self, messages: &[ChatMessage], start: LadderPosition) -> Invocation {
        let mut position = self.ladder.normalize(start);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let Some(entry) = self.ladder.entry(position) else {
                warn!(attempts, "All providers failed; answering in safe mode");
                self.event_sink
                    .try_emit(names::PROVIDER_EXHAUSTED, Some(json!({ "attempts": attempts })));
                return Invocation {
                    text: SAFE_MODE_TEXT.to_string(),
                    position: LadderPosition::SafeMode,
                    attempts,
                };
            };

            let index = position.index().unwrap_or_default();
            self.event_sink.try_emit(names::PROVIDER_ATTEMPT, Some(event_data(entry, index, None)));
            debug!(provider = %entry.provider, model = %entry.model, position = index, "Attempting provider");

            match self.call_entry(entry, messages).await {
                Ok(text) => {
                    self.event_sink
                        .try_emit(names::PROVIDER_SUCCEEDED, Some(event_data(entry, index, None)));
                    return Invocation { text, position, attempts };
                }
                Err(err) => {
                    warn!(
                        provider = %entry.provider,
                        model = %entry.model,
                        position = index,
                        error = %err,
                        "Provider call failed, advancing"
                    );
                    self.event_sink.try_emit(
                        names::PROVIDER_FAILED,
                        Some(event_data(entry, index, Some(&err.message))),
                    );
                    position = self.ladder.advance(position);
                }
            }
        }
    }

    async fn call_entry(
        &self,
        entry: &LadderEntry,
        messages: &[ChatMessage],
    ) -> Result<String, ProviderCallError> {
        let client = self.clients.get(entry.provider).ok_or_else(|| {
            ProviderCallError::new(entry.provider, &entry.model, "no client registered")
        })?;
        client.call(&entry.model, messages).await
    }
}

fn event_data(entry: &LadderEntry, position: usize, error: Option<&str>) -> serde_json::Value {
    let mut data = json!({
        "provider": entry.provider.as_str(),
        "model": entry.model,
        "position": position,
    });
    if let Some(error) = error {
        data["error"] = json!(error);
    }
    data
}
