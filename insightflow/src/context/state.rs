//! Append-only shared state threaded through a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::Fragment;
use crate::errors::StateConflictError;
use crate::stages::StageId;

/// What one stage left in the shared state.
///
/// A skipped stage has an empty fragment and a recorded reason.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage output.
    pub fragment: Fragment,
    /// Why the stage skipped, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl StageRecord {
    /// Record of a successful stage.
    #[must_use]
    pub fn completed(fragment: Fragment) -> Self {
        Self { fragment, skip_reason: None }
    }

    /// Record of a skipped stage.
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            fragment: Fragment::new(),
            skip_reason: Some(reason.into()),
        }
    }

    /// True when the stage skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.skip_reason.is_some()
    }
}

/// Mapping from stage to its record, in stage order.
///
/// Only the executor writes; a stage id can be written once.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SharedState {
    records: BTreeMap<StageId, StageRecord>,
}

impl SharedState {
    /// An empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage record.
    ///
    /// # Errors
    ///
    /// Returns `StateConflictError` if the stage already has a record.
    pub(crate) fn merge(&mut self, stage: StageId, record: StageRecord) -> Result<(), StateConflictError> {
        if self.records.contains_key(&stage) {
            return Err(StateConflictError::new(stage));
        }
        self.records.insert(stage, record);
        Ok(())
    }

    /// The record of `stage`.
    #[must_use]
    pub fn get(&self, stage: StageId) -> Option<&StageRecord> {
        self.records.get(&stage)
    }

    /// The fragment of `stage`.
    #[must_use]
    pub fn fragment(&self, stage: StageId) -> Option<&Fragment> {
        self.records.get(&stage).map(|r| &r.fragment)
    }

    /// The skip reason of `stage`.
    #[must_use]
    pub fn skip_reason(&self, stage: StageId) -> Option<&str> {
        self.records.get(&stage).and_then(|r| r.skip_reason.as_deref())
    }

    /// Whether `stage` has a record.
    #[must_use]
    pub fn contains(&self, stage: StageId) -> bool {
        self.records.contains_key(&stage)
    }

    /// Stages with records, in order.
    pub fn stages(&self) -> impl Iterator<Item = StageId> + '_ {
        self.records.keys().copied()
    }

    /// Stages whose fragments are degraded.
    #[must_use]
    pub fn degraded_stages(&self) -> Vec<StageId> {
        self.records
            .iter()
            .filter(|(_, r)| r.fragment.is_degraded())
            .map(|(s, _)| *s)
            .collect()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no stage has reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// JSON rendering of every record.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
