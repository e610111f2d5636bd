//! Free-form questions about a dataset.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::dataset::Dataset;
use crate::invoker::{FallbackInvoker, InvocationSession};
use crate::providers::{ChatMessage, LadderPosition};
use crate::stages::{describe_categorical, describe_numeric, truncate_chars};

const PREVIEW_ROWS: usize = 5;
const MAX_STATS_CHARS: usize = 6000;

/// Answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// The question as asked.
    pub question: String,
    /// The generated answer, or the safe-mode notice.
    pub answer: String,
    /// True if no provider answered.
    pub degraded: bool,
    /// Ladder position that produced the answer.
    pub position: LadderPosition,
}

/// Answers questions about datasets through the cascade.
///
/// Consecutive questions resume at the last provider that answered.
#[derive(Debug, Clone)]
pub struct SemanticQuery {
    invoker: Arc<FallbackInvoker>,
    session: InvocationSession,
}

impl SemanticQuery {
    /// Creates a query helper over `invoker`.
    #[must_use]
    pub fn new(invoker: Arc<FallbackInvoker>) -> Self {
        Self {
            invoker,
            session: InvocationSession::new(),
        }
    }

    /// Where the next question will start on the ladder.
    #[must_use]
    pub const fn position(&self) -> LadderPosition {
        self.session.position()
    }

    /// Answers `question` using a preview and summary statistics of
    /// `dataset`. `context` is passed through verbatim when present.
    pub async fn ask(&mut self, dataset: &Dataset, question: &str, context: Option<&Value>) -> QueryAnswer {
        let messages = vec![
            ChatMessage::system("You are a helpful business intelligence analyst."),
            ChatMessage::user(build_prompt(dataset, question, context)),
        ];
        debug!(dataset = dataset.name(), "Answering dataset question");

        let invocation = self.session.invoke(&self.invoker, &messages).await;
        QueryAnswer {
            question: question.to_string(),
            degraded: invocation.is_safe_mode(),
            position: invocation.position,
            answer: invocation.text,
        }
    }
}

fn build_prompt(dataset: &Dataset, question: &str, context: Option<&Value>) -> String {
    let stats = serde_json::json!({
        "numeric": describe_numeric(dataset),
        "categorical": describe_categorical(dataset),
    });
    let stats = serde_json::to_string_pretty(&stats).unwrap_or_default();
    let stats = truncate_chars(&stats, MAX_STATS_CHARS);

    let context = context.map_or_else(|| "none".to_string(), |extra| format!("\n{extra}"));
    format!(
        "Answer the question using only the dataset preview and statistics below.\n\n\
         Question: \"{question}\"\n\n\
         Dataset preview:\n{preview}\n\
         Dataset statistics:\n{stats}\n\n\
         Additional context: {context}\n\n\
         Give a clear, concise, data-driven explanation. If the data cannot answer the question, say so.",
        preview = dataset.preview(PREVIEW_ROWS),
    )
}
