//! Helpers for turning model replies into structured data.

use regex::Regex;
use std::sync::OnceLock;

fn fence_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").ok())
        .as_ref()
}

/// Strips a Markdown code fence around a JSON reply, if there is one.
///
/// Falls back to the outermost `{ ... }` span, then to the trimmed text.
#[must_use]
pub fn extract_json_block(text: &str) -> &str {
    if let Some(inner) = fence_pattern()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
    {
        return inner.as_str();
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

/// Truncates to at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
