//! Stage and run status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stages::StageId;

/// How a single stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage produced a fragment.
    Ok,
    /// The stage had nothing to do.
    Skip,
    /// The stage halted the run.
    Fail,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skip => write!(f, "skip"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Lifecycle of a pipeline run.
///
/// `Pending -> Running(stage) -> Completed | Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// Triggered but not started.
    Pending,
    /// Executing `stage`.
    Running {
        /// The stage currently executing.
        stage: StageId,
    },
    /// Every stage returned.
    Completed,
    /// `stage` returned a fatal result.
    Failed {
        /// The stage that failed.
        stage: StageId,
        /// Its error message.
        error: String,
    },
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl RunStatus {
    /// Completed or Failed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. })
    }

    /// Short tag used in logs and events.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running { .. } => "running",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { stage } => write!(f, "running({stage})"),
            Self::Failed { stage, error } => write!(f, "failed({stage}): {error}"),
            other => f.write_str(other.tag()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_status_display() {
        assert_eq!(StageStatus::Ok.to_string(), "ok");
        assert_eq!(StageStatus::Skip.to_string(), "skip");
        assert_eq!(StageStatus::Fail.to_string(), "fail");
    }

    #[test]
    fn test_run_status_terminal() {
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Running { stage: StageId::Quality }.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed { stage: StageId::Forecast, error: "x".into() }.is_terminal());
    }

    #[test]
    fn test_run_status_serialization() {
        let status = RunStatus::Failed { stage: StageId::Visualization, error: "boom".into() };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"state": "failed", "stage": "visualization", "error": "boom"})
        );
        assert_eq!(status.to_string(), "failed(visualization): boom");
    }
}
