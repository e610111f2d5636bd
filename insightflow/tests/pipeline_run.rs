use std::sync::Arc;

use insightflow::context::RunIdentity;
use insightflow::core::{Fragment, RunStatus, StageStatus};
use insightflow::dataset::Dataset;
use insightflow::events::{names, CollectingEventSink};
use insightflow::invoker::SAFE_MODE_TEXT;
use insightflow::pipeline::{Pipeline, PipelineBuilder, PipelineExecutor};
use insightflow::stages::{
    ForecastReport, QualityReport, ReportFragment, Stage, StageId, StageResult,
    NO_DATE_NUMERIC_PAIR,
};
use insightflow::testing::{
    assert_completed, assert_failed_at, assert_fragment_contains, assert_skipped_with,
    empty_dataset, exhausted_invoker, no_dates_dataset, sales_dataset, succeeding_invoker,
    ScriptedStage,
};
use pretty_assertions::assert_eq;

const SUMMARY_REPLY: &str = r#"{"description": "Daily regional sales", "key_entities": ["Region", "Orders"], "potential_analyses": ["Trend by region"]}"#;

fn standard(reply: &str) -> PipelineExecutor {
    PipelineExecutor::new(Pipeline::standard(), succeeding_invoker(reply))
}

#[tokio::test]
async fn standard_pipeline_completes_on_sales_data() {
    let dataset = sales_dataset();
    let outcome = standard(SUMMARY_REPLY)
        .execute(RunIdentity::for_dataset(&dataset), &dataset)
        .await;

    assert_completed(&outcome);
    assert_eq!(outcome.state.stages().collect::<Vec<_>>(), StageId::ALL.to_vec());
    assert!(outcome.degraded_stages().is_empty());

    let interpret = outcome.state.fragment(StageId::Interpret).unwrap();
    assert_fragment_contains(interpret, "semantic");

    let forecast: ForecastReport = outcome.state.fragment(StageId::Forecast).unwrap().decode().unwrap();
    assert_eq!(forecast.date_column, "order_date");
    assert_eq!(forecast.target_column, "sales");
    assert_eq!(forecast.forecast.len(), 30);
    assert!((forecast.slope_per_day - 10.0).abs() < 1e-6);

    let quality: QualityReport = outcome.state.fragment(StageId::Quality).unwrap().decode().unwrap();
    assert_eq!(quality.missing_values.total_missing, 0);
}

#[tokio::test]
async fn forecast_skip_reason_reaches_report() {
    let dataset = no_dates_dataset();
    let outcome = standard(SUMMARY_REPLY)
        .execute(RunIdentity::for_dataset(&dataset), &dataset)
        .await;

    assert_completed(&outcome);
    assert_skipped_with(&outcome, StageId::Forecast, NO_DATE_NUMERIC_PAIR);
    assert_eq!(
        outcome.summary(StageId::Forecast).map(|s| s.status),
        Some(StageStatus::Skip)
    );

    let report: ReportFragment = outcome.state.fragment(StageId::Report).unwrap().decode().unwrap();
    assert_eq!(report.skipped_sections.len(), 1);
    assert_eq!(report.skipped_sections[0].stage, StageId::Forecast);
    assert_eq!(report.skipped_sections[0].reason, NO_DATE_NUMERIC_PAIR);
    assert!(!report.sections_included.contains(&StageId::Forecast));
}

#[tokio::test]
async fn exhausted_cascade_completes_with_degraded_sections() {
    let dataset = sales_dataset();
    let executor = PipelineExecutor::new(Pipeline::standard(), exhausted_invoker());
    let outcome = executor.execute(RunIdentity::for_dataset(&dataset), &dataset).await;

    assert_completed(&outcome);
    assert_eq!(outcome.degraded_stages(), vec![StageId::Interpret, StageId::Report]);

    let report: ReportFragment = outcome.state.fragment(StageId::Report).unwrap().decode().unwrap();
    assert_eq!(report.narrative, SAFE_MODE_TEXT);
    assert_eq!(report.degraded_sections, vec![StageId::Interpret, StageId::Report]);
    assert!(outcome.state.fragment(StageId::Statistics).is_some());
}

#[tokio::test]
async fn fatal_stage_four_keeps_first_three_fragments() {
    let forecast = Arc::new(ScriptedStage::new(StageId::Forecast, StageResult::success(Fragment::new())));
    let report = Arc::new(ScriptedStage::new(StageId::Report, StageResult::success(Fragment::new())));
    let stages: Vec<Arc<dyn Stage>> = vec![
        Arc::new(ScriptedStage::new(StageId::Interpret, StageResult::success(Fragment::new().with("a", 1)))),
        Arc::new(ScriptedStage::new(StageId::Quality, StageResult::success(Fragment::new().with("b", 2)))),
        Arc::new(ScriptedStage::new(StageId::Statistics, StageResult::skipped("no numeric columns"))),
        Arc::new(ScriptedStage::new(StageId::Visualization, StageResult::fatal("renderer crashed"))),
        forecast.clone(),
        report.clone(),
    ];
    let pipeline = PipelineBuilder::new("six").stages(stages).unwrap().build().unwrap();
    let sink = Arc::new(CollectingEventSink::new());
    let executor = PipelineExecutor::new(pipeline, succeeding_invoker("unused")).with_event_sink(sink.clone());

    let dataset = sales_dataset();
    let outcome = executor.execute(RunIdentity::for_dataset(&dataset), &dataset).await;

    assert_failed_at(&outcome, StageId::Visualization);
    assert_eq!(
        outcome.status,
        RunStatus::Failed {
            stage: StageId::Visualization,
            error: "renderer crashed".to_string(),
        }
    );
    assert_eq!(
        outcome.state.stages().collect::<Vec<_>>(),
        vec![StageId::Interpret, StageId::Quality, StageId::Statistics]
    );
    assert_eq!(forecast.call_count(), 0);
    assert_eq!(report.call_count(), 0);
    assert_eq!(outcome.failure().unwrap().message, "renderer crashed");
    assert_eq!(sink.events_of_type(names::PIPELINE_FAILED).len(), 1);
    assert!(sink.events_of_type(names::PIPELINE_COMPLETED).is_empty());
}

#[tokio::test]
async fn stages_only_see_earlier_records() {
    let interpret = Arc::new(ScriptedStage::new(StageId::Interpret, StageResult::success(Fragment::new())));
    let quality = Arc::new(ScriptedStage::new(StageId::Quality, StageResult::skipped("clean")));
    let report = Arc::new(ScriptedStage::new(StageId::Report, StageResult::success(Fragment::new())));
    let pipeline = PipelineBuilder::new("visibility")
        .stages(vec![
            interpret.clone() as Arc<dyn Stage>,
            quality.clone() as Arc<dyn Stage>,
            report.clone() as Arc<dyn Stage>,
        ])
        .unwrap()
        .build()
        .unwrap();

    let dataset = sales_dataset();
    PipelineExecutor::new(pipeline, exhausted_invoker())
        .execute(RunIdentity::for_dataset(&dataset), &dataset)
        .await;

    assert_eq!(interpret.visible_stages(), vec![Vec::<StageId>::new()]);
    assert_eq!(quality.visible_stages(), vec![vec![StageId::Interpret]]);
    assert_eq!(report.visible_stages(), vec![vec![StageId::Interpret, StageId::Quality]]);
}

#[tokio::test]
async fn identical_inputs_produce_identical_state() {
    let dataset = sales_dataset();
    let executor = standard(SUMMARY_REPLY);

    let first = executor.execute(RunIdentity::for_dataset(&dataset), &dataset).await;
    let second = executor.execute(RunIdentity::for_dataset(&dataset), &dataset).await;

    assert_eq!(first.state, second.state);
    assert_eq!(first.identity.dataset_fingerprint, second.identity.dataset_fingerprint);
    assert_ne!(first.identity.run_id, second.identity.run_id);
}

#[tokio::test]
async fn empty_dataset_fails_at_interpret() {
    let dataset = empty_dataset();
    let outcome = standard(SUMMARY_REPLY)
        .execute(RunIdentity::for_dataset(&dataset), &dataset)
        .await;

    assert_failed_at(&outcome, StageId::Interpret);
    assert!(outcome.state.is_empty());
}

#[tokio::test]
async fn header_only_dataset_fails_at_quality() {
    let dataset = Dataset::new("header_only", vec!["region".to_string(), "sales".to_string()], vec![]).unwrap();
    let outcome = standard(SUMMARY_REPLY)
        .execute(RunIdentity::for_dataset(&dataset), &dataset)
        .await;

    assert_failed_at(&outcome, StageId::Quality);
    assert_eq!(outcome.state.len(), 1);
    assert!(outcome.state.contains(StageId::Interpret));
    assert!(!outcome.state.contains(StageId::Statistics));
}
