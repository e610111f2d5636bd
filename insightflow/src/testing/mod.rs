//! Testing utilities for insightflow pipelines.
//!
//! This module provides:
//! - Scripted provider clients and stages
//! - Dataset and invoker fixtures
//! - Assertions for run outcomes

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_completed, assert_failed_at, assert_fragment_contains, assert_skipped_with,
};
pub use fixtures::{
    empty_dataset, exhausted_invoker, no_dates_dataset, sales_dataset, succeeding_invoker,
};
pub use mocks::{RecordedCall, ScriptedProviderClient, ScriptedReply, ScriptedStage};
