//! Column kind inference.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Whole numbers.
    Integer,
    /// Numbers with a fractional part.
    Float,
    /// Date or timestamp strings.
    Datetime,
    /// Free text or categories.
    #[serde(rename = "Categorical/Text")]
    Text,
    /// Booleans, empty columns and anything else.
    Unknown,
}

impl ColumnKind {
    /// Integer or Float.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Datetime => "Datetime",
            Self::Text => "Categorical/Text",
            Self::Unknown => "Unknown",
        })
    }
}

/// Parses the timestamp and date layouts found in exported spreadsheets.
#[must_use]
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parses a cell as a timestamp; only strings qualify.
#[must_use]
pub fn cell_datetime(value: &Value) -> Option<NaiveDateTime> {
    value.as_str().and_then(parse_datetime)
}

/// Infers the kind of a column from its non-null cells.
pub fn infer_kind<'a, I>(values: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen = 0usize;
    let mut integers = 0usize;
    let mut floats = 0usize;
    let mut dates = 0usize;
    let mut strings = 0usize;

    for value in values {
        match value {
            Value::Null => continue,
            Value::Number(n) if n.is_i64() || n.is_u64() => integers += 1,
            Value::Number(_) => floats += 1,
            Value::String(s) => {
                strings += 1;
                if parse_datetime(s).is_some() {
                    dates += 1;
                }
            }
            _ => {}
        }
        seen += 1;
    }

    if seen == 0 {
        ColumnKind::Unknown
    } else if integers == seen {
        ColumnKind::Integer
    } else if integers + floats == seen {
        ColumnKind::Float
    } else if dates == seen {
        ColumnKind::Datetime
    } else if strings > 0 {
        ColumnKind::Text
    } else {
        ColumnKind::Unknown
    }
}
