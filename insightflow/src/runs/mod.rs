//! Run registry: triggers pipeline runs in the background and exposes their
//! progress.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::context::{RunIdentity, SharedState};
use crate::core::RunStatus;
use crate::dataset::DatasetHandle;
use crate::errors::InsightflowError;
use crate::observability::SpanTimer;
use crate::pipeline::{PipelineExecutor, RunOutcome};
use crate::stages::StageId;

type OutcomeSlot = Arc<RwLock<Option<RunOutcome>>>;

/// Registry entry for one run.
struct RunEntry {
    status: watch::Receiver<RunStatus>,
    outcome: OutcomeSlot,
}

/// Handle returned by [`RunManager::trigger`].
#[derive(Debug)]
pub struct RunTicket {
    run_id: Uuid,
    status: watch::Receiver<RunStatus>,
    outcome: OutcomeSlot,
}

impl RunTicket {
    /// The run this ticket tracks.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Latest status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status.borrow().clone()
    }

    /// Waits for the run to reach a terminal status and returns its outcome.
    ///
    /// Returns `None` if the run task ended without publishing one.
    pub async fn wait(mut self) -> Option<RunOutcome> {
        if self.status.wait_for(RunStatus::is_terminal).await.is_err() {
            return None;
        }
        self.outcome.read().clone()
    }
}

/// Starts runs on the Tokio runtime and tracks them by id.
///
/// Each run gets its own task and its own shared state. The outcome is
/// stored before the terminal status is published, so a caller that observes
/// `Completed` or `Failed` can always read it. A run whose task panics is
/// reported as failed at the stage it was running, with an empty state.
#[derive(Clone)]
pub struct RunManager {
    executor: Arc<PipelineExecutor>,
    runs: Arc<DashMap<Uuid, RunEntry>>,
}

impl std::fmt::Debug for RunManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunManager")
            .field("executor", &self.executor)
            .field("runs", &self.runs.len())
            .finish()
    }
}

impl RunManager {
    /// Creates a manager that runs `executor`.
    #[must_use]
    pub fn new(executor: PipelineExecutor) -> Self {
        Self::from_shared(Arc::new(executor))
    }

    /// Creates a manager around an already shared executor.
    #[must_use]
    pub fn from_shared(executor: Arc<PipelineExecutor>) -> Self {
        Self {
            executor,
            runs: Arc::new(DashMap::new()),
        }
    }

    /// Starts a run of `dataset` under `run_id` and returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `RunAlreadyExists` if `run_id` was triggered before.
    pub fn trigger(&self, dataset: DatasetHandle, run_id: Uuid) -> Result<RunTicket, InsightflowError> {
        let (tx, rx) = watch::channel(RunStatus::Pending);
        let outcome: OutcomeSlot = Arc::new(RwLock::new(None));

        match self.runs.entry(run_id) {
            Entry::Occupied(_) => {
                warn!(run_id = %run_id, "Rejected duplicate run trigger");
                return Err(InsightflowError::RunAlreadyExists(run_id));
            }
            Entry::Vacant(slot) => {
                slot.insert(RunEntry {
                    status: rx.clone(),
                    outcome: Arc::clone(&outcome),
                });
            }
        }

        info!(run_id = %run_id, dataset = dataset.name(), "Run triggered");
        let executor = Arc::clone(&self.executor);
        let slot = Arc::clone(&outcome);
        let tx = Arc::new(tx);
        tokio::spawn(async move {
            let timer = SpanTimer::start(format!("run:{run_id}"));
            let identity = RunIdentity::new(run_id, &dataset);
            let task = {
                let identity = identity.clone();
                let progress = Arc::clone(&tx);
                tokio::spawn(async move {
                    executor
                        .execute_with_progress(identity, &dataset, Some(progress.as_ref()))
                        .await
                })
            };

            let result = match task.await {
                Ok(result) => result,
                Err(e) => {
                    let stage = match &*tx.borrow() {
                        RunStatus::Running { stage } => *stage,
                        _ => StageId::Interpret,
                    };
                    let error = format!("Task join error: {e}");
                    error!(run_id = %run_id, stage = %stage, error = %error, "Run task aborted");
                    RunOutcome {
                        identity,
                        status: RunStatus::Failed { stage, error },
                        state: SharedState::new(),
                        stages: Vec::new(),
                        duration_ms: timer.finish(),
                    }
                }
            };
            let terminal = result.status.clone();
            *slot.write() = Some(result);
            tx.send_replace(terminal);
        });

        Ok(RunTicket {
            run_id,
            status: rx,
            outcome,
        })
    }

    /// Starts a run under a fresh id.
    pub fn trigger_new(&self, dataset: DatasetHandle) -> Result<RunTicket, InsightflowError> {
        self.trigger(dataset, Uuid::new_v4())
    }

    /// Latest status of `run_id`.
    ///
    /// # Errors
    ///
    /// Returns `RunNotFound` for an unknown id.
    pub fn status(&self, run_id: Uuid) -> Result<RunStatus, InsightflowError> {
        self.runs
            .get(&run_id)
            .map(|entry| entry.status.borrow().clone())
            .ok_or(InsightflowError::RunNotFound(run_id))
    }

    /// The outcome of `run_id`, once it is terminal.
    ///
    /// # Errors
    ///
    /// Returns `RunNotFound` for an unknown id.
    pub fn outcome(&self, run_id: Uuid) -> Result<Option<RunOutcome>, InsightflowError> {
        self.runs
            .get(&run_id)
            .map(|entry| entry.outcome.read().clone())
            .ok_or(InsightflowError::RunNotFound(run_id))
    }

    /// A receiver that observes every status change of `run_id`.
    ///
    /// # Errors
    ///
    /// Returns `RunNotFound` for an unknown id.
    pub fn subscribe(&self, run_id: Uuid) -> Result<watch::Receiver<RunStatus>, InsightflowError> {
        self.runs
            .get(&run_id)
            .map(|entry| entry.status.clone())
            .ok_or(InsightflowError::RunNotFound(run_id))
    }

    /// Ids of every triggered run.
    #[must_use]
    pub fn run_ids(&self) -> Vec<Uuid> {
        self.runs.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of triggered runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// True if nothing was triggered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StageContext;
    use crate::core::Fragment;
    use crate::dataset::Dataset;
    use crate::invoker::FallbackInvoker;
    use crate::pipeline::PipelineBuilder;
    use crate::stages::{FnStage, StageResult};
    use serde_json::json;

    fn manager() -> RunManager {
        let pipeline = PipelineBuilder::new("p")
            .stage(Arc::new(FnStage::new(StageId::Interpret, |ctx: &StageContext<'_>| {
                StageResult::success(Fragment::new().with("rows", ctx.dataset().row_count()))
            })))
            .and_then(PipelineBuilder::build)
            .unwrap();
        RunManager::new(PipelineExecutor::new(pipeline, FallbackInvoker::safe_mode_only()))
    }

    fn handle() -> DatasetHandle {
        Dataset::from_records("d", vec![json!({"x": 1})]).unwrap().into_handle()
    }

    #[tokio::test]
    async fn test_trigger_and_wait() {
        let manager = manager();
        let run_id = Uuid::new_v4();
        let ticket = manager.trigger(handle(), run_id).unwrap();
        assert_eq!(ticket.run_id(), run_id);

        let outcome = ticket.wait().await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(manager.status(run_id).unwrap(), RunStatus::Completed);
        assert!(manager.outcome(run_id).unwrap().is_some());
        assert_eq!(manager.run_ids(), vec![run_id]);
    }

    #[tokio::test]
    async fn test_duplicate_run_id_rejected() {
        let manager = manager();
        let run_id = Uuid::new_v4();
        let _ticket = manager.trigger(handle(), run_id).unwrap();

        let err = manager.trigger(handle(), run_id).unwrap_err();
        assert!(matches!(err, InsightflowError::RunAlreadyExists(id) if id == run_id));
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_stage_reports_failure() {
        let pipeline = PipelineBuilder::new("p")
            .stage(Arc::new(FnStage::new(StageId::Interpret, |_: &StageContext<'_>| {
                StageResult::success(Fragment::new())
            })))
            .and_then(|b| {
                b.stage(Arc::new(FnStage::new(StageId::Quality, |_: &StageContext<'_>| -> StageResult {
                    panic!("quality exploded")
                })))
            })
            .and_then(PipelineBuilder::build)
            .unwrap();
        let manager = RunManager::new(PipelineExecutor::new(pipeline, FallbackInvoker::safe_mode_only()));
        let run_id = Uuid::new_v4();

        let outcome = manager.trigger(handle(), run_id).unwrap().wait().await.unwrap();

        assert_eq!(outcome.failed_stage(), Some(StageId::Quality));
        assert!(outcome.state.is_empty());
        match manager.status(run_id).unwrap() {
            RunStatus::Failed { stage, error } => {
                assert_eq!(stage, StageId::Quality);
                assert!(error.contains("Task join error"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_run() {
        let manager = manager();
        let missing = Uuid::new_v4();
        assert!(matches!(manager.status(missing), Err(InsightflowError::RunNotFound(_))));
        assert!(matches!(manager.outcome(missing), Err(InsightflowError::RunNotFound(_))));
        assert!(manager.subscribe(missing).is_err());
        assert!(manager.is_empty());
    }
}
