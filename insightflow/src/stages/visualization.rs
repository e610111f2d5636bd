//! Chart planning. Produces specs; rendering happens elsewhere.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Stage, StageId, StageResult};
use crate::context::StageContext;
use crate::dataset::Dataset;

const MAX_CHARTS_PER_GROUP: usize = 3;
const MAX_CATEGORIES: usize = 20;

/// Chart type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Correlation matrix.
    Heatmap,
    /// Value distribution.
    Histogram,
    /// Category counts.
    Bar,
    /// Value over time.
    Line,
}

/// A chart to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Derived from the title, stable across runs.
    pub id: String,
    /// Chart type.
    pub kind: ChartKind,
    /// Display title.
    pub title: String,
    /// Columns plotted; for lines, `[x, y]`.
    pub columns: Vec<String>,
}

impl ChartSpec {
    fn new(kind: ChartKind, title: String, columns: Vec<String>) -> Self {
        Self {
            id: slug(&title),
            kind,
            title,
            columns,
        }
    }
}

fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Fragment of the visualization stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPlan {
    /// Correlation heatmap, if any numeric column exists.
    pub correlation: Vec<ChartSpec>,
    /// Histograms of the first numeric columns.
    pub distributions: Vec<ChartSpec>,
    /// Bar charts of low-cardinality text columns.
    pub categorical: Vec<ChartSpec>,
    /// One time-series line.
    pub time_series: Vec<ChartSpec>,
}

impl ChartPlan {
    /// Plans charts for `dataset`.
    #[must_use]
    pub fn plan(dataset: &Dataset) -> Self {
        let names = dataset.columns();
        let numeric = dataset.numeric_columns();
        let mut plan = Self::default();

        if !numeric.is_empty() {
            plan.correlation.push(ChartSpec::new(
                ChartKind::Heatmap,
                "Correlation Matrix".to_string(),
                numeric.iter().map(|&i| names[i].clone()).collect(),
            ));
        }

        plan.distributions = numeric
            .iter()
            .take(MAX_CHARTS_PER_GROUP)
            .map(|&i| {
                ChartSpec::new(
                    ChartKind::Histogram,
                    format!("Distribution of {}", names[i]),
                    vec![names[i].clone()],
                )
            })
            .collect();

        plan.categorical = dataset
            .categorical_columns()
            .into_iter()
            .take(MAX_CHARTS_PER_GROUP)
            .filter(|&i| distinct_count(dataset, i) <= MAX_CATEGORIES)
            .map(|i| {
                ChartSpec::new(ChartKind::Bar, format!("Count of {}", names[i]), vec![names[i].clone()])
            })
            .collect();

        if let (Some(&date), Some(&value)) = (dataset.date_columns().first(), numeric.first()) {
            plan.time_series.push(ChartSpec::new(
                ChartKind::Line,
                format!("Trend of {} over Time", names[value]),
                vec![names[date].clone(), names[value].clone()],
            ));
        }
        plan
    }

    /// Total number of charts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.correlation.len() + self.distributions.len() + self.categorical.len() + self.time_series.len()
    }

    /// True when nothing can be charted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn distinct_count(dataset: &Dataset, column: usize) -> usize {
    dataset
        .column_values(column)
        .filter(|v| !v.is_null())
        .map(ToString::to_string)
        .collect::<HashSet<_>>()
        .len()
}

/// Fourth stage: what to plot.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisualizationStage;

impl VisualizationStage {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for VisualizationStage {
    fn id(&self) -> StageId {
        StageId::Visualization
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        let plan = ChartPlan::plan(ctx.dataset());
        if plan.is_empty() {
            return StageResult::skipped("No chartable columns found");
        }
        StageResult::from_report(&plan, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Trend of sales over Time"), "trend_of_sales_over_time");
        assert_eq!(slug("Count of  ship-mode!"), "count_of_ship_mode");
    }

    #[test]
    fn test_plan_for_sales_like_data() {
        let records = (0..25)
            .map(|i| {
                json!({
                    "order_date": format!("2024-01-{:02}", i % 28 + 1),
                    "customer": format!("c{i}"),
                    "region": if i % 2 == 0 { "north" } else { "south" },
                    "sales": i * 3,
                    "qty": i,
                    "discount": 0.1,
                    "margin": i * 2,
                })
            })
            .collect();
        let ds = Dataset::from_records("sales", records).unwrap();
        let plan = ChartPlan::plan(&ds);

        assert_eq!(plan.correlation.len(), 1);
        assert_eq!(plan.correlation[0].columns.len(), 4);
        let dist: Vec<_> = plan.distributions.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(dist, vec!["distribution_of_sales", "distribution_of_qty", "distribution_of_discount"]);
        // order_date has 25 distinct values, customer 25, region 2.
        let bars: Vec<_> = plan.categorical.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(bars, vec!["Count of region"]);
        assert_eq!(plan.time_series[0].columns, vec!["order_date".to_string(), "sales".to_string()]);
        assert_eq!(plan.len(), 6);
    }

    #[test]
    fn test_plan_without_numbers() {
        let ds = Dataset::from_records("d", vec![json!({"tag": "a"})]).unwrap();
        let plan = ChartPlan::plan(&ds);
        assert!(plan.correlation.is_empty());
        assert!(plan.time_series.is_empty());
        assert_eq!(plan.categorical.len(), 1);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let ds = Dataset::from_records("d", vec![json!({"x": 1, "y": 2})]).unwrap();
        assert_eq!(ChartPlan::plan(&ds), ChartPlan::plan(&ds));
    }
}
