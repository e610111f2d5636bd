//! Lifecycle event emission.
//!
//! The executor and the fallback invoker report what they do through an
//! [`EventSink`]. Event names are dotted: `pipeline.*`, `stage.*` and
//! `provider.*`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Event names emitted by insightflow.
pub mod names {
    /// A run began executing its first stage.
    pub const PIPELINE_STARTED: &str = "pipeline.started";
    /// Every stage finished without a fatal result.
    pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
    /// A stage returned a fatal result.
    pub const PIPELINE_FAILED: &str = "pipeline.failed";
    /// A stage is about to run.
    pub const STAGE_STARTED: &str = "stage.started";
    /// A stage produced a fragment.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// A stage had nothing to do.
    pub const STAGE_SKIPPED: &str = "stage.skipped";
    /// A stage returned a fatal result.
    pub const STAGE_FAILED: &str = "stage.failed";
    /// A provider call is about to be made.
    pub const PROVIDER_ATTEMPT: &str = "provider.attempt";
    /// A provider call failed and the ladder advances.
    pub const PROVIDER_FAILED: &str = "provider.failed";
    /// A provider call returned text.
    pub const PROVIDER_SUCCEEDED: &str = "provider.succeeded";
    /// The ladder ran out and safe mode answered.
    pub const PROVIDER_EXHAUSTED: &str = "provider.exhausted";
}
