use super::{FallbackInvoker, Invocation};
use crate::providers::{ChatMessage, LadderPosition};

/// Threads the last good ladder position from one request to the next.
///
/// A request that ends in safe mode resets the session to the first rung.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvocationSession {
    position: LadderPosition,
}

impl InvocationSession {
    /// A session starting at the first rung.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session starting at `position`.
    #[must_use]
    pub const fn starting_at(position: LadderPosition) -> Self {
        Self { position }
    }

    /// Where the next request will start.
    #[must_use]
    pub const fn position(&self) -> LadderPosition {
        self.position
    }

    /// Goes back to the first rung.
    pub fn reset(&mut self) {
        self.position = LadderPosition::START;
    }

    /// Invokes from the remembered position and records the outcome.
    pub async fn invoke(&mut self, invoker: &FallbackInvoker, messages: &[ChatMessage]) -> Invocation {
        let invocation = invoker.invoke(messages, self.position).await;
        self.position = if invocation.is_safe_mode() {
            LadderPosition::START
        } else {
            invocation.position
        };
        invocation
    }
}
