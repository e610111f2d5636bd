//! The read-only view a stage runs against.

use crate::core::Fragment;
use crate::dataset::Dataset;
use crate::errors::StageOrderError;
use crate::invoker::{FallbackInvoker, Invocation};
use crate::providers::{ChatMessage, LadderPosition};
use crate::stages::StageId;

use super::{RunIdentity, SharedState, StageRecord};

/// Everything a stage may see while it runs.
///
/// Reads of the current or a later stage are rejected.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    stage: StageId,
    identity: &'a RunIdentity,
    dataset: &'a Dataset,
    state: &'a SharedState,
    invoker: &'a FallbackInvoker,
}

impl<'a> StageContext<'a> {
    /// Creates the view for `stage`.
    #[must_use]
    pub const fn new(
        stage: StageId,
        identity: &'a RunIdentity,
        dataset: &'a Dataset,
        state: &'a SharedState,
        invoker: &'a FallbackInvoker,
    ) -> Self {
        Self { stage, identity, dataset, state, invoker }
    }

    /// The stage this context belongs to.
    #[must_use]
    pub const fn stage(&self) -> StageId {
        self.stage
    }

    /// The run identity.
    #[must_use]
    pub const fn identity(&self) -> &'a RunIdentity {
        self.identity
    }

    /// The dataset under analysis.
    #[must_use]
    pub const fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// The provider cascade.
    #[must_use]
    pub const fn invoker(&self) -> &'a FallbackInvoker {
        self.invoker
    }

    /// The record of an earlier stage, if it ran.
    ///
    /// # Errors
    ///
    /// Returns `StageOrderError` if `stage` does not precede this one.
    pub fn record(&self, stage: StageId) -> Result<Option<&'a StageRecord>, StageOrderError> {
        if stage >= self.stage {
            return Err(StageOrderError::new(self.stage, stage));
        }
        Ok(self.state.get(stage))
    }

    /// The fragment of an earlier stage, if it ran.
    ///
    /// # Errors
    ///
    /// Returns `StageOrderError` if `stage` does not precede this one.
    pub fn fragment(&self, stage: StageId) -> Result<Option<&'a Fragment>, StageOrderError> {
        Ok(self.record(stage)?.map(|r| &r.fragment))
    }

    /// Asks the cascade, starting from the first rung.
    pub async fn generate(&self, messages: &[ChatMessage]) -> Invocation {
        self.invoker.invoke(messages, LadderPosition::START).await
    }
}
