//! Stage trait, the closed set of stage ids and the built-in analyses.
//!
//! A stage reads the dataset and the fragments of earlier stages through a
//! [`StageContext`] and returns a [`StageResult`]. It never writes shared
//! state itself; the executor merges what it returns.

mod forecast;
mod interpret;
mod quality;
mod report;
mod result;
mod statistics;
mod text;
mod visualization;

pub use forecast::{detect_time_series, ForecastPoint, ForecastReport, ForecastStage, NO_DATE_NUMERIC_PAIR};
pub use interpret::{DatasetSummary, InterpretStage, SemanticSummary};
pub use quality::{Duplicates, MissingValues, QualityReport, QualityStage};
pub use report::{ReportFragment, ReportStage, SkippedSection};
pub use result::StageResult;
pub use statistics::{
    describe_categorical, describe_numeric, CategoricalSummary, NumericSummary, OutlierSummary,
    StatisticsReport, StatisticsStage, StrongCorrelation,
};
pub use text::extract_json_block;
pub(crate) use text::truncate_chars;
pub use visualization::{ChartKind, ChartPlan, ChartSpec, VisualizationStage};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::context::StageContext;

/// Identifies a stage. Declaration order is dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Shape, schema and semantic summary.
    Interpret,
    /// Missing values, duplicates and consistency.
    Quality,
    /// Descriptive statistics and correlations.
    Statistics,
    /// Chart planning.
    Visualization,
    /// Trend projection.
    Forecast,
    /// Executive narrative.
    Report,
}

impl StageId {
    /// Every stage, in execution order.
    pub const ALL: [Self; 6] = [
        Self::Interpret,
        Self::Quality,
        Self::Statistics,
        Self::Visualization,
        Self::Forecast,
        Self::Report,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interpret => "interpret",
            Self::Quality => "quality",
            Self::Statistics => "statistics",
            Self::Visualization => "visualization",
            Self::Forecast => "forecast",
            Self::Report => "report",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analysis step.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// The slot this stage fills.
    fn id(&self) -> StageId;

    /// Runs against the dataset and earlier fragments.
    async fn run(&self, ctx: &StageContext<'_>) -> StageResult;
}

/// A stage backed by a synchronous closure.
pub struct FnStage<F>
where
    F: Fn(&StageContext<'_>) -> StageResult + Send + Sync,
{
    id: StageId,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&StageContext<'_>) -> StageResult + Send + Sync,
{
    /// Wraps `func` as the stage `id`.
    pub const fn new(id: StageId, func: F) -> Self {
        Self { id, func }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&StageContext<'_>) -> StageResult + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage").field("id", &self.id).finish()
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&StageContext<'_>) -> StageResult + Send + Sync,
{
    fn id(&self) -> StageId {
        self.id
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        (self.func)(ctx)
    }
}

/// The six built-in stages, in order.
#[must_use]
pub fn standard_stages() -> Vec<Arc<dyn Stage>> {
    vec![
        Arc::new(InterpretStage::new()),
        Arc::new(QualityStage::new()),
        Arc::new(StatisticsStage::new()),
        Arc::new(VisualizationStage::new()),
        Arc::new(ForecastStage::new()),
        Arc::new(ReportStage::new()),
    ]
}
