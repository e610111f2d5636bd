//! Assertions for run outcomes and fragments.

use crate::core::{Fragment, RunStatus};
use crate::pipeline::RunOutcome;
use crate::stages::StageId;

/// Asserts that the run completed.
pub fn assert_completed(outcome: &RunOutcome) {
    assert!(
        outcome.is_completed(),
        "Expected completed run, got status: {}",
        outcome.status
    );
}

/// Asserts that the run failed at `stage`.
pub fn assert_failed_at(outcome: &RunOutcome, stage: StageId) {
    match &outcome.status {
        RunStatus::Failed { stage: failed, .. } => assert_eq!(
            *failed, stage,
            "Expected failure at '{stage}', got failure at '{failed}'"
        ),
        other => panic!("Expected failure at '{stage}', got status: {other}"),
    }
}

/// Asserts that `stage` was recorded as skipped with `reason`.
pub fn assert_skipped_with(outcome: &RunOutcome, stage: StageId, reason: &str) {
    assert_eq!(
        outcome.state.skip_reason(stage),
        Some(reason),
        "Expected '{stage}' to be skipped with '{reason}'"
    );
}

/// Asserts that the fragment carries `key`.
pub fn assert_fragment_contains(fragment: &Fragment, key: &str) {
    assert!(
        fragment.get(key).is_some(),
        "Expected fragment to contain key '{}', keys: {:?}",
        key,
        fragment.data().keys().collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RunIdentity, SharedState, StageRecord};
    use crate::testing::empty_dataset;

    fn outcome(status: RunStatus, state: SharedState) -> RunOutcome {
        RunOutcome {
            identity: RunIdentity::for_dataset(&empty_dataset()),
            status,
            state,
            stages: Vec::new(),
            duration_ms: 0.0,
        }
    }

    #[test]
    fn test_assert_completed() {
        assert_completed(&outcome(RunStatus::Completed, SharedState::new()));
    }

    #[test]
    #[should_panic(expected = "Expected completed run")]
    fn test_assert_completed_fails() {
        assert_completed(&outcome(RunStatus::Pending, SharedState::new()));
    }

    #[test]
    fn test_assert_failed_at() {
        let failed = RunStatus::Failed {
            stage: StageId::Visualization,
            error: "boom".to_string(),
        };
        assert_failed_at(&outcome(failed, SharedState::new()), StageId::Visualization);
    }

    #[test]
    #[should_panic(expected = "Expected failure at 'forecast'")]
    fn test_assert_failed_at_wrong_status() {
        assert_failed_at(&outcome(RunStatus::Completed, SharedState::new()), StageId::Forecast);
    }

    #[test]
    fn test_assert_skipped_with() {
        let mut state = SharedState::new();
        state.merge(StageId::Forecast, StageRecord::skipped("no dates")).unwrap();
        assert_skipped_with(&outcome(RunStatus::Completed, state), StageId::Forecast, "no dates");
    }

    #[test]
    fn test_assert_fragment_contains() {
        assert_fragment_contains(&Fragment::new().with("rows", 3), "rows");
    }
}
