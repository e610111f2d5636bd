//! # Insightflow
//!
//! Automated dataset analysis with a resilient text-generation cascade.
//!
//! Insightflow runs a fixed sequence of analysis stages over a tabular
//! dataset and merges their fragments into one shared state:
//!
//! - **Escalation ladder**: every configured provider model in priority
//!   order, with a static safe-mode reply at the end
//! - **Fallback invoker**: walks the ladder forward on any provider failure
//!   and never fails the caller
//! - **Stage pipeline**: interpret, quality, statistics, visualization,
//!   forecast and report, each reading only what earlier stages produced
//! - **Run manager**: background runs with pollable status and partial
//!   results on failure
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use insightflow::prelude::*;
//!
//! let config = InsightflowConfig::from_env()?;
//! let executor = PipelineExecutor::from_config(&config)?;
//! let dataset = Dataset::from_json_file("sales.json")?;
//!
//! let outcome = executor.execute(RunIdentity::for_dataset(&dataset), &dataset).await;
//! println!("{}", outcome.status);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod dataset;
pub mod errors;
pub mod events;
pub mod invoker;
pub mod observability;
pub mod pipeline;
pub mod providers;
pub mod runs;
pub mod semantic;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::InsightflowConfig;
    pub use crate::context::{RunIdentity, SharedState, StageContext, StageRecord};
    pub use crate::core::{Fragment, RunStatus, StageStatus};
    pub use crate::dataset::{Dataset, DatasetHandle};
    pub use crate::errors::{
        ConfigurationError, InsightflowError, ProviderCallError, StageFatalError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::invoker::{FallbackInvoker, Invocation, InvocationSession, SAFE_MODE_TEXT};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, PipelineExecutor, RunOutcome};
    pub use crate::providers::{
        build_ladder, ChatMessage, ClientTable, EscalationLadder, LadderPosition, ProviderClient,
        ProviderKind, ProviderRegistry,
    };
    pub use crate::runs::{RunManager, RunTicket};
    pub use crate::semantic::{QueryAnswer, SemanticQuery};
    pub use crate::stages::{Stage, StageId, StageResult};
}
