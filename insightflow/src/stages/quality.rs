//! Missing values, duplicates and consistency checks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use super::{Stage, StageId, StageResult};
use crate::context::StageContext;
use crate::dataset::stats::round_to;
use crate::dataset::{ColumnKind, Dataset};

const MAX_PENALTY: f64 = 20.0;
const INCONSISTENCY_PENALTY: f64 = 5.0;
const CLEAN_THRESHOLD: f64 = 90.0;
const NON_NEGATIVE_HINTS: &[&str] = &["price", "cost", "qty"];

/// Missing value counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValues {
    /// Null cells across the table.
    pub total_missing: usize,
    /// Null cells per column, only columns with some.
    pub by_column: BTreeMap<String, usize>,
    /// Share of rows missing per column, in percent.
    pub percentage: BTreeMap<String, f64>,
}

/// Duplicate row counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duplicates {
    /// Rows identical to an earlier row.
    pub count: usize,
    /// Share of rows, in percent.
    pub percentage: f64,
}

/// Fragment of the quality stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// 0 to 100.
    pub quality_score: f64,
    /// Missing value counts.
    pub missing_values: MissingValues,
    /// Duplicate row counts.
    pub duplicates: Duplicates,
    /// Human-readable issues.
    pub inconsistencies: Vec<String>,
    /// Score above 90.
    pub is_clean: bool,
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64 * 100.0
}

impl QualityReport {
    /// Scores `dataset`. The dataset must have at least one row.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn analyze(dataset: &Dataset) -> Self {
        let rows = dataset.row_count().max(1);

        let mut by_column = BTreeMap::new();
        let mut percentage = BTreeMap::new();
        for (i, name) in dataset.columns().iter().enumerate() {
            let missing = dataset.missing_count(i);
            if missing > 0 {
                by_column.insert(name.clone(), missing);
                percentage.insert(name.clone(), percent(missing, rows));
            }
        }
        let total_missing: usize = by_column.values().sum();
        let duplicate_count = dataset.duplicate_row_count();
        let inconsistencies = find_inconsistencies(dataset);

        let mut score = 100.0;
        score -= MAX_PENALTY.min(percent(total_missing, rows));
        score -= MAX_PENALTY.min(percent(duplicate_count, rows));
        score -= inconsistencies.len() as f64 * INCONSISTENCY_PENALTY;

        Self {
            quality_score: round_to(score, 2).max(0.0),
            missing_values: MissingValues { total_missing, by_column, percentage },
            duplicates: Duplicates {
                count: duplicate_count,
                percentage: percent(duplicate_count, rows),
            },
            inconsistencies,
            is_clean: score > CLEAN_THRESHOLD,
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn find_inconsistencies(dataset: &Dataset) -> Vec<String> {
    let mut issues = Vec::new();
    let schema = dataset.schema();

    for (i, column) in schema.iter().enumerate() {
        if column.kind == ColumnKind::Text {
            let types: HashSet<&str> = dataset
                .column_values(i)
                .filter(|v| !v.is_null())
                .map(json_type)
                .collect();
            if types.len() > 1 {
                issues.push(format!("Column '{}' contains mixed data types.", column.name));
            }
        }
    }

    for (i, column) in schema.iter().enumerate() {
        let lower = column.name.to_lowercase();
        if column.kind.is_numeric()
            && NON_NEGATIVE_HINTS.iter().any(|hint| lower.contains(hint))
            && dataset.numeric_values(i).iter().any(|v| *v < 0.0)
        {
            issues.push(format!(
                "Column '{}' has negative values which might be invalid.",
                column.name
            ));
        }
    }
    issues
}

/// Second stage: how trustworthy is the data.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityStage;

impl QualityStage {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for QualityStage {
    fn id(&self) -> StageId {
        StageId::Quality
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        if ctx.dataset().is_empty() {
            return StageResult::fatal("dataset has no rows");
        }
        let report = QualityReport::analyze(ctx.dataset());
        tracing::info!(score = report.quality_score, clean = report.is_clean, "Quality analysed");
        StageResult::from_report(&report, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_clean_dataset_scores_full() {
        let ds = Dataset::from_records(
            "clean",
            vec![json!({"a": 1, "b": "x"}), json!({"a": 2, "b": "y"})],
        )
        .unwrap();
        let report = QualityReport::analyze(&ds);
        assert_eq!(report.quality_score, 100.0);
        assert!(report.is_clean);
        assert!(report.inconsistencies.is_empty());
        assert!(report.missing_values.by_column.is_empty());
    }

    #[test]
    fn test_penalties() {
        // 4 rows: one missing cell (25% -> capped 20), one duplicate (25% -> 20),
        // negative price (5) and mixed types in `label` (5).
        let ds = Dataset::from_records(
            "dirty",
            vec![
                json!({"unit_price": 3, "label": "a"}),
                json!({"unit_price": 3, "label": "a"}),
                json!({"unit_price": -1, "label": 7}),
                json!({"unit_price": null, "label": "b"}),
            ],
        )
        .unwrap();
        let report = QualityReport::analyze(&ds);

        assert_eq!(report.missing_values.total_missing, 1);
        assert_eq!(report.missing_values.percentage.get("unit_price"), Some(&25.0));
        assert_eq!(report.duplicates.count, 1);
        assert_eq!(report.inconsistencies.len(), 2);
        assert_eq!(report.quality_score, 50.0);
        assert!(!report.is_clean);
    }

    #[test]
    fn test_score_never_negative() {
        let ds = Dataset::from_records(
            "bad",
            vec![
                json!({"price": -1, "cost": -2, "qty": -3, "m1": [1], "m2": null}),
                json!({"price": -1, "cost": -2, "qty": -3, "m1": [1], "m2": null}),
                json!({"price": -1, "cost": -2, "qty": -3, "m1": "x", "m2": null}),
            ],
        )
        .unwrap();
        let report = QualityReport::analyze(&ds);
        assert!(report.quality_score >= 0.0);
    }
}
