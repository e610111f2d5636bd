//! Executive narrative over every earlier fragment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::text::truncate_chars;
use super::{Stage, StageId, StageResult};
use crate::context::StageContext;
use crate::core::Fragment;
use crate::providers::ChatMessage;

const MAX_CONTEXT_CHARS: usize = 12_000;

/// An earlier stage that skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSection {
    /// The stage.
    pub stage: StageId,
    /// Its reason.
    pub reason: String,
}

/// Fragment of the report stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFragment {
    /// Markdown narrative.
    pub narrative: String,
    /// Stages whose findings fed the narrative.
    pub sections_included: Vec<StageId>,
    /// Stages that had nothing to report.
    pub skipped_sections: Vec<SkippedSection>,
    /// Sections whose generated text is the safe-mode notice.
    pub degraded_sections: Vec<StageId>,
}

/// Keys worth handing to the model from each fragment.
fn highlights(stage: StageId, fragment: &Fragment) -> Value {
    let keys: &[&str] = match stage {
        StageId::Interpret => &["rows", "columns", "schema", "semantic"],
        StageId::Quality => &["quality_score", "is_clean", "inconsistencies", "missing_values", "duplicates"],
        StageId::Statistics => &["numeric", "categorical", "strong_correlations", "outliers"],
        StageId::Visualization => &["correlation", "distributions", "categorical", "time_series"],
        StageId::Forecast => &["target_column", "date_column", "slope_per_day", "history_points"],
        StageId::Report => &[],
    };
    let selected: Map<String, Value> = keys
        .iter()
        .filter_map(|k| fragment.get(k).map(|v| ((*k).to_string(), v.clone())))
        .collect();
    Value::Object(selected)
}

/// Last stage: the write-up.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportStage;

impl ReportStage {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn prompt(dataset_name: &str, findings: &Value) -> Vec<ChatMessage> {
        let findings = truncate_chars(
            &serde_json::to_string_pretty(findings).unwrap_or_default(),
            MAX_CONTEXT_CHARS,
        );
        vec![
            ChatMessage::system(
                "You are a senior business intelligence analyst. Write clear, factual reports in Markdown.",
            ),
            ChatMessage::user(format!(
                "Write an executive report for the dataset '{dataset_name}'.\n\n\
                 Findings (JSON):\n{findings}\n\n\
                 Structure it as: Overview, Data Quality, Key Findings, Forecast, Recommendations. \
                 Only use the numbers given above."
            )),
        ]
    }
}

#[async_trait]
impl Stage for ReportStage {
    fn id(&self) -> StageId {
        StageId::Report
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        let mut findings = Map::new();
        let mut sections_included = Vec::new();
        let mut skipped_sections = Vec::new();
        let mut degraded_sections = Vec::new();

        for stage in StageId::ALL.into_iter().filter(|s| *s < StageId::Report) {
            let record = match ctx.record(stage) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => return StageResult::fatal(e.to_string()),
            };
            if let Some(reason) = &record.skip_reason {
                skipped_sections.push(SkippedSection { stage, reason: reason.clone() });
                findings.insert(stage.to_string(), json!({ "skipped": reason }));
                continue;
            }
            if record.fragment.is_degraded() {
                degraded_sections.push(stage);
            }
            sections_included.push(stage);
            findings.insert(stage.to_string(), highlights(stage, &record.fragment));
        }

        let invocation = ctx
            .generate(&Self::prompt(&ctx.identity().dataset_name, &Value::Object(findings)))
            .await;
        let degraded = invocation.is_safe_mode();
        if degraded {
            degraded_sections.push(StageId::Report);
        }

        let report = ReportFragment {
            narrative: invocation.text,
            sections_included,
            skipped_sections,
            degraded_sections,
        };
        StageResult::from_report(&report, degraded)
    }
}
