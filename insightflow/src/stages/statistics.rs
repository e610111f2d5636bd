//! Descriptive statistics, correlations and outliers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::{Stage, StageId, StageResult};
use crate::context::StageContext;
use crate::dataset::stats::{mean, pearson, quantile_sorted, round_to, sample_std, sorted};
use crate::dataset::{display_cell, Dataset};

const STRONG_CORRELATION: f64 = 0.7;
const IQR_FENCE: f64 = 1.5;

/// Summary of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    /// Non-null numeric cells.
    pub count: usize,
    /// Mean.
    pub mean: Option<f64>,
    /// Sample standard deviation.
    pub std: Option<f64>,
    /// Minimum.
    pub min: Option<f64>,
    /// First quartile.
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    /// Median.
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    /// Third quartile.
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    /// Maximum.
    pub max: Option<f64>,
}

impl NumericSummary {
    fn of(values: &[f64]) -> Self {
        let s = sorted(values);
        Self {
            count: s.len(),
            mean: mean(&s),
            std: sample_std(&s),
            min: s.first().copied(),
            p25: quantile_sorted(&s, 0.25),
            p50: quantile_sorted(&s, 0.5),
            p75: quantile_sorted(&s, 0.75),
            max: s.last().copied(),
        }
    }
}

/// Summary of one text column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    /// Distinct non-null values.
    pub unique_count: usize,
    /// Most frequent value; ties go to the smallest.
    pub top_value: Option<String>,
    /// Frequency of `top_value`.
    pub top_freq: usize,
}

/// A pair of columns with |r| above 0.7.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongCorrelation {
    /// Later column.
    pub col1: String,
    /// Earlier column.
    pub col2: String,
    /// Pearson r, three decimals.
    pub correlation: f64,
}

/// IQR outliers in one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierSummary {
    /// Cells outside the fences.
    pub count: usize,
    /// Share of rows, in percent.
    pub percentage: f64,
    /// Q1 - 1.5 IQR.
    pub lower_bound: f64,
    /// Q3 + 1.5 IQR.
    pub upper_bound: f64,
}

/// Fragment of the statistics stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    /// Numeric describe, per column.
    pub numeric: BTreeMap<String, NumericSummary>,
    /// Categorical describe, per column.
    pub categorical: BTreeMap<String, CategoricalSummary>,
    /// Pearson matrix; `None` where undefined.
    pub correlation_matrix: BTreeMap<String, BTreeMap<String, Option<f64>>>,
    /// Pairs with strong correlation.
    pub strong_correlations: Vec<StrongCorrelation>,
    /// Columns with IQR outliers.
    pub outliers: BTreeMap<String, OutlierSummary>,
}

/// Describes every numeric column.
#[must_use]
pub fn describe_numeric(dataset: &Dataset) -> BTreeMap<String, NumericSummary> {
    dataset
        .numeric_columns()
        .into_iter()
        .map(|i| (dataset.columns()[i].clone(), NumericSummary::of(&dataset.numeric_values(i))))
        .collect()
}

/// Describes every text and date-string column.
#[must_use]
pub fn describe_categorical(dataset: &Dataset) -> BTreeMap<String, CategoricalSummary> {
    dataset
        .categorical_columns()
        .into_iter()
        .map(|i| {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for value in dataset.column_values(i).filter(|v| !v.is_null()) {
                *counts.entry(display_cell(value)).or_default() += 1;
            }
            let top = counts
                .iter()
                .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
                .map(|(v, c)| (v.clone(), *c));
            let summary = CategoricalSummary {
                unique_count: counts.len(),
                top_freq: top.as_ref().map_or(0, |(_, c)| *c),
                top_value: top.map(|(v, _)| v),
            };
            (dataset.columns()[i].clone(), summary)
        })
        .collect()
}

fn correlations(
    dataset: &Dataset,
) -> (BTreeMap<String, BTreeMap<String, Option<f64>>>, Vec<StrongCorrelation>) {
    let numeric = dataset.numeric_columns();
    let names = dataset.columns();
    let mut matrix: BTreeMap<String, BTreeMap<String, Option<f64>>> = BTreeMap::new();
    let mut strong = Vec::new();

    for (pos_i, &i) in numeric.iter().enumerate() {
        for (pos_j, &j) in numeric.iter().enumerate() {
            let (xs, ys) = dataset.paired_numeric(i, j);
            let r = pearson(&xs, &ys);
            matrix.entry(names[i].clone()).or_default().insert(names[j].clone(), r);

            if pos_j < pos_i {
                if let Some(r) = r.filter(|r| r.abs() > STRONG_CORRELATION) {
                    strong.push(StrongCorrelation {
                        col1: names[i].clone(),
                        col2: names[j].clone(),
                        correlation: round_to(r, 3),
                    });
                }
            }
        }
    }
    (matrix, strong)
}

#[allow(clippy::cast_precision_loss)]
fn outliers(dataset: &Dataset) -> BTreeMap<String, OutlierSummary> {
    let rows = dataset.row_count().max(1);
    let mut out = BTreeMap::new();
    for i in dataset.numeric_columns() {
        let values = sorted(&dataset.numeric_values(i));
        let (Some(q1), Some(q3)) = (quantile_sorted(&values, 0.25), quantile_sorted(&values, 0.75)) else {
            continue;
        };
        let iqr = q3 - q1;
        let lower = q1 - IQR_FENCE * iqr;
        let upper = q3 + IQR_FENCE * iqr;
        let count = values.iter().filter(|v| **v < lower || **v > upper).count();
        if count > 0 {
            out.insert(
                dataset.columns()[i].clone(),
                OutlierSummary {
                    count,
                    percentage: round_to(count as f64 / rows as f64 * 100.0, 2),
                    lower_bound: lower,
                    upper_bound: upper,
                },
            );
        }
    }
    out
}

impl StatisticsReport {
    /// Computes every statistic for `dataset`.
    #[must_use]
    pub fn analyze(dataset: &Dataset) -> Self {
        let (correlation_matrix, strong_correlations) = correlations(dataset);
        Self {
            numeric: describe_numeric(dataset),
            categorical: describe_categorical(dataset),
            correlation_matrix,
            strong_correlations,
            outliers: outliers(dataset),
        }
    }
}

/// Third stage: the numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsStage;

impl StatisticsStage {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for StatisticsStage {
    fn id(&self) -> StageId {
        StageId::Statistics
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        let report = StatisticsReport::analyze(ctx.dataset());
        tracing::debug!(
            numeric = report.numeric.len(),
            strong = report.strong_correlations.len(),
            "Statistics computed"
        );
        StageResult::from_report(&report, false)
    }
}
