//! Shape, schema and an LLM-written description of the dataset.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::statistics::describe_numeric;
use super::text::extract_json_block;
use super::{Stage, StageId, StageResult};
use crate::context::StageContext;
use crate::dataset::{ColumnSchema, Dataset};
use crate::providers::ChatMessage;

const PREVIEW_ROWS: usize = 5;
const FALLBACK_DESCRIPTION: &str = "Could not generate summary.";

/// What the model says the data is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticSummary {
    /// One-paragraph overview.
    #[serde(default)]
    pub description: String,
    /// Business entities found in the data.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub key_entities: Vec<String>,
    /// Suggested follow-up analyses.
    #[serde(default, deserialize_with = "lenient_strings")]
    pub potential_analyses: Vec<String>,
}

impl SemanticSummary {
    /// Used when the reply is unusable or every provider failed.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            description: FALLBACK_DESCRIPTION.to_string(),
            key_entities: Vec::new(),
            potential_analyses: Vec::new(),
        }
    }

    /// Parses a model reply, tolerating code fences.
    #[must_use]
    pub fn parse(reply: &str) -> Option<Self> {
        serde_json::from_str::<Self>(extract_json_block(reply))
            .ok()
            .filter(|s| !s.description.trim().is_empty())
    }
}

// Models sometimes return objects instead of plain strings in lists.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

/// Fragment of the interpret stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Row count.
    pub rows: usize,
    /// Column count.
    pub columns: usize,
    /// Inferred schema in column order.
    pub schema: Vec<ColumnSchema>,
    /// Null cells per column.
    pub missing_values: BTreeMap<String, usize>,
    /// Column names in order.
    pub columns_list: Vec<String>,
    /// Model-written summary.
    pub semantic: SemanticSummary,
}

impl DatasetSummary {
    fn structural(dataset: &Dataset) -> Self {
        Self {
            rows: dataset.row_count(),
            columns: dataset.column_count(),
            schema: dataset.schema(),
            missing_values: dataset
                .columns()
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), dataset.missing_count(i)))
                .collect(),
            columns_list: dataset.columns().to_vec(),
            semantic: SemanticSummary::fallback(),
        }
    }
}

/// First stage: describes what the dataset is.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpretStage;

impl InterpretStage {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn prompt(summary: &DatasetSummary, dataset: &Dataset) -> Vec<ChatMessage> {
        let schema: BTreeMap<&str, String> = summary
            .schema
            .iter()
            .map(|c| (c.name.as_str(), c.kind.to_string()))
            .collect();
        let stats = serde_json::to_string_pretty(&describe_numeric(dataset)).unwrap_or_default();
        let schema = serde_json::to_string_pretty(&schema).unwrap_or_default();

        let body = format!(
            "Analyze this dataset preview and schema.\n\n\
             Schema:\n{schema}\n\n\
             Preview:\n{preview}\n\
             Statistics:\n{stats}\n\n\
             Reply with a JSON object holding:\n\
             1. \"description\": a short overview of what the data represents.\n\
             2. \"key_entities\": the main business entities (e.g. Customers, Orders).\n\
             3. \"potential_analyses\": 3-5 recommended analyses.\n\n\
             Return ONLY valid JSON.",
            preview = dataset.preview(PREVIEW_ROWS),
        );
        vec![
            ChatMessage::system("You are a data scientist who summarises datasets."),
            ChatMessage::user(body),
        ]
    }
}

#[async_trait]
impl Stage for InterpretStage {
    fn id(&self) -> StageId {
        StageId::Interpret
    }

    async fn run(&self, ctx: &StageContext<'_>) -> StageResult {
        let dataset = ctx.dataset();
        if dataset.column_count() == 0 {
            return StageResult::fatal("dataset has no columns");
        }

        let mut summary = DatasetSummary::structural(dataset);
        let invocation = ctx.generate(&Self::prompt(&summary, dataset)).await;

        let degraded = if invocation.is_safe_mode() {
            true
        } else if let Some(semantic) = SemanticSummary::parse(&invocation.text) {
            debug!(position = %invocation.position, "Parsed semantic summary");
            summary.semantic = semantic;
            false
        } else {
            warn!(position = %invocation.position, "Semantic summary reply was not valid JSON");
            true
        };

        StageResult::from_report(&summary, degraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"description\": \"Retail orders\", \"key_entities\": [\"Orders\", {\"name\": \"Region\"}], \"potential_analyses\": [\"Trend\"]}\n```";
        let summary = SemanticSummary::parse(reply).unwrap();
        assert_eq!(summary.description, "Retail orders");
        assert_eq!(summary.key_entities, vec!["Orders".to_string(), "{\"name\":\"Region\"}".to_string()]);
        assert_eq!(summary.potential_analyses, vec!["Trend".to_string()]);
    }

    #[test]
    fn test_parse_rejects_prose_and_blank_description() {
        assert!(SemanticSummary::parse("The data is about sales.").is_none());
        assert!(SemanticSummary::parse("{\"description\": \"  \"}").is_none());
    }

    #[test]
    fn test_fallback() {
        let fallback = SemanticSummary::fallback();
        assert_eq!(fallback.description, "Could not generate summary.");
        assert!(fallback.key_entities.is_empty());
    }
}
