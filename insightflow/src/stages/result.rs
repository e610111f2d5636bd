//! What a stage returns.

use crate::core::{Fragment, StageStatus};

/// Outcome of one stage.
///
/// `Skipped` behaves like `Success` with an empty fragment plus a reason.
/// `Fatal` halts the run.
#[derive(Debug, Clone, PartialEq)]
pub enum StageResult {
    /// The stage's own fragment.
    Success(Fragment),
    /// Nothing applicable in the input.
    Skipped(String),
    /// Not even a degraded fragment could be produced.
    Fatal(String),
}

impl StageResult {
    /// A successful result.
    #[must_use]
    pub const fn success(fragment: Fragment) -> Self {
        Self::Success(fragment)
    }

    /// A skipped result.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped(reason.into())
    }

    /// A fatal result.
    #[must_use]
    pub fn fatal(error: impl Into<String>) -> Self {
        Self::Fatal(error.into())
    }

    /// Builds a success from a serializable report, or a fatal result if it
    /// does not serialize to an object.
    pub fn from_report<T: serde::Serialize>(report: &T, degraded: bool) -> Self {
        match Fragment::from_serializable(report) {
            Ok(fragment) => Self::Success(fragment.degraded_if(degraded)),
            Err(e) => Self::Fatal(format!("failed to serialize stage output: {e}")),
        }
    }

    /// The status this result maps to.
    #[must_use]
    pub const fn status(&self) -> StageStatus {
        match self {
            Self::Success(_) => StageStatus::Ok,
            Self::Skipped(_) => StageStatus::Skip,
            Self::Fatal(_) => StageStatus::Fail,
        }
    }

    /// True for `Fatal`.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
