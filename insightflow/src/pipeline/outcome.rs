//! Result of one pipeline execution.

use serde::Serialize;

use crate::context::{RunIdentity, SharedState};
use crate::core::{RunStatus, StageStatus};
use crate::errors::StageFatalError;
use crate::stages::StageId;

/// Timing and status of one executed stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    /// The stage.
    pub stage: StageId,
    /// How it ended.
    pub status: StageStatus,
    /// Wall-clock duration.
    pub duration_ms: f64,
    /// True if its fragment carries the degraded marker.
    pub degraded: bool,
    /// Skip reason or fatal error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Everything a run produced, including partial state on failure.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    /// Who ran against what.
    pub identity: RunIdentity,
    /// Terminal status.
    pub status: RunStatus,
    /// Records of every stage that returned a non-fatal result.
    pub state: SharedState,
    /// One entry per stage that was started.
    pub stages: Vec<StageSummary>,
    /// Total wall-clock duration.
    pub duration_ms: f64,
}

impl RunOutcome {
    /// True if every stage returned.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed)
    }

    /// True if a stage halted the run.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.status, RunStatus::Failed { .. })
    }

    /// The stage that halted the run.
    #[must_use]
    pub const fn failed_stage(&self) -> Option<StageId> {
        match &self.status {
            RunStatus::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The fatal error as a typed value.
    #[must_use]
    pub fn failure(&self) -> Option<StageFatalError> {
        match &self.status {
            RunStatus::Failed { stage, error } => Some(StageFatalError::new(*stage, error.clone())),
            _ => None,
        }
    }

    /// Stages whose fragment is marked degraded.
    #[must_use]
    pub fn degraded_stages(&self) -> Vec<StageId> {
        self.state.degraded_stages()
    }

    /// Summary of `stage`, if it was started.
    #[must_use]
    pub fn summary(&self, stage: StageId) -> Option<&StageSummary> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}
