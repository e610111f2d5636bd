//! Sequential pipeline execution.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::context::{RunIdentity, SharedState, StageContext, StageRecord};
use crate::core::{RunStatus, StageStatus};
use crate::dataset::Dataset;
use crate::events::{names, EventSink, NoOpEventSink};
use crate::invoker::FallbackInvoker;
use crate::observability::SpanTimer;
use crate::stages::{StageId, StageResult};

use super::{Pipeline, RunOutcome, StageSummary};

/// Runs a pipeline's stages one after another against a dataset.
///
/// Each stage sees the records of the stages before it. Skipped stages are
/// recorded with their reason and execution continues. A fatal result stops
/// the run; the records produced so far are kept in the outcome.
pub struct PipelineExecutor {
    pipeline: Pipeline,
    invoker: FallbackInvoker,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("pipeline", &self.pipeline)
            .field("invoker", &self.invoker)
            .finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(pipeline: Pipeline, invoker: FallbackInvoker) -> Self {
        Self {
            pipeline,
            invoker,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Builds the standard pipeline with HTTP clients for every configured
    /// provider.
    #[cfg(feature = "http")]
    pub fn from_config(
        config: &crate::config::InsightflowConfig,
    ) -> Result<Self, crate::errors::ConfigurationError> {
        let registry = config.registry()?;
        let clients = crate::providers::ClientTable::from_config(config)?;
        let invoker = FallbackInvoker::new(crate::providers::build_ladder(&registry), clients);
        Ok(Self::new(Pipeline::standard(), invoker))
    }

    /// Sends `pipeline.*`, `stage.*` and `provider.*` events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.invoker = self.invoker.with_event_sink(Arc::clone(&sink));
        self.event_sink = sink;
        self
    }

    /// The pipeline being run.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The invoker stages generate text through.
    #[must_use]
    pub const fn invoker(&self) -> &FallbackInvoker {
        &self.invoker
    }

    /// Runs every stage against `dataset`.
    pub async fn execute(&self, identity: RunIdentity, dataset: &Dataset) -> RunOutcome {
        self.execute_with_progress(identity, dataset, None).await
    }

    /// Runs every stage, publishing `Running(stage)` to `progress` before
    /// each one. The terminal status is only reported in the outcome.
    pub async fn execute_with_progress(
        &self,
        identity: RunIdentity,
        dataset: &Dataset,
        progress: Option<&watch::Sender<RunStatus>>,
    ) -> RunOutcome {
        let run_timer = SpanTimer::start(format!("run:{}", identity.run_id));
        let run_id = identity.run_id.to_string();
        let mut state = SharedState::new();
        let mut summaries = Vec::with_capacity(self.pipeline.len());

        info!(
            run_id = %run_id,
            pipeline = self.pipeline.name(),
            dataset = %identity.dataset_name,
            stages = self.pipeline.len(),
            "Starting pipeline run"
        );
        self.event_sink.try_emit(
            names::PIPELINE_STARTED,
            Some(json!({
                "run_id": run_id,
                "pipeline": self.pipeline.name(),
                "dataset": identity.dataset_name,
                "stages": self.pipeline.stage_ids(),
            })),
        );

        for stage in self.pipeline.stages() {
            let id = stage.id();
            if let Some(tx) = progress {
                tx.send_replace(RunStatus::Running { stage: id });
            }
            self.event_sink
                .try_emit(names::STAGE_STARTED, Some(json!({ "run_id": run_id, "stage": id })));
            debug!(run_id = %run_id, stage = %id, "Running stage");

            let timer = SpanTimer::start(id.as_str());
            let result = {
                let ctx = StageContext::new(id, &identity, dataset, &state, &self.invoker);
                stage.run(&ctx).await
            };
            let duration_ms = timer.finish();

            let (record, summary) = match result {
                StageResult::Success(fragment) => {
                    let degraded = fragment.is_degraded();
                    self.event_sink.try_emit(
                        names::STAGE_COMPLETED,
                        Some(json!({
                            "run_id": run_id,
                            "stage": id,
                            "duration_ms": duration_ms,
                            "degraded": degraded,
                        })),
                    );
                    if degraded {
                        warn!(run_id = %run_id, stage = %id, "Stage completed with degraded output");
                    }
                    (
                        StageRecord::completed(fragment),
                        StageSummary { stage: id, status: StageStatus::Ok, duration_ms, degraded, detail: None },
                    )
                }
                StageResult::Skipped(reason) => {
                    self.event_sink.try_emit(
                        names::STAGE_SKIPPED,
                        Some(json!({
                            "run_id": run_id,
                            "stage": id,
                            "duration_ms": duration_ms,
                            "reason": reason,
                        })),
                    );
                    info!(run_id = %run_id, stage = %id, reason = %reason, "Stage skipped");
                    (
                        StageRecord::skipped(reason.clone()),
                        StageSummary {
                            stage: id,
                            status: StageStatus::Skip,
                            duration_ms,
                            degraded: false,
                            detail: Some(reason),
                        },
                    )
                }
                StageResult::Fatal(message) => {
                    summaries.push(StageSummary {
                        stage: id,
                        status: StageStatus::Fail,
                        duration_ms,
                        degraded: false,
                        detail: Some(message.clone()),
                    });
                    return self.fail(identity, state, summaries, run_timer, id, message);
                }
            };

            if let Err(conflict) = state.merge(id, record) {
                summaries.push(StageSummary {
                    status: StageStatus::Fail,
                    detail: Some(conflict.to_string()),
                    ..summary
                });
                return self.fail(identity, state, summaries, run_timer, id, conflict.to_string());
            }
            summaries.push(summary);
        }

        let duration_ms = run_timer.finish();
        info!(run_id = %run_id, duration_ms, "Pipeline run completed");
        self.event_sink.try_emit(
            names::PIPELINE_COMPLETED,
            Some(json!({
                "run_id": run_id,
                "duration_ms": duration_ms,
                "degraded_stages": state.degraded_stages(),
            })),
        );

        RunOutcome {
            identity,
            status: RunStatus::Completed,
            state,
            stages: summaries,
            duration_ms,
        }
    }

    fn fail(
        &self,
        identity: RunIdentity,
        state: SharedState,
        stages: Vec<StageSummary>,
        run_timer: SpanTimer,
        stage: StageId,
        message: String,
    ) -> RunOutcome {
        let duration_ms = run_timer.finish();
        let run_id = identity.run_id.to_string();
        error!(run_id = %run_id, stage = %stage, error = %message, "Stage failed, halting run");
        self.event_sink.try_emit(
            names::STAGE_FAILED,
            Some(json!({ "run_id": run_id, "stage": stage, "error": message })),
        );
        self.event_sink.try_emit(
            names::PIPELINE_FAILED,
            Some(json!({
                "run_id": run_id,
                "stage": stage,
                "error": message,
                "duration_ms": duration_ms,
            })),
        );

        RunOutcome {
            identity,
            status: RunStatus::Failed { stage, error: message },
            state,
            stages,
            duration_ms,
        }
    }
}
