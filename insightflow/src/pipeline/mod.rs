//! Pipeline building and execution.
//!
//! A [`Pipeline`] is an ordered list of stages validated by
//! [`PipelineBuilder`]; a [`PipelineExecutor`] runs it against one dataset
//! and returns a [`RunOutcome`].

mod builder;
mod executor;
mod outcome;

pub use builder::{Pipeline, PipelineBuilder};
pub use executor::PipelineExecutor;
pub use outcome::{RunOutcome, StageSummary};
