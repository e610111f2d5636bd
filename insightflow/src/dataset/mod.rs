//! The tabular dataset handed to a pipeline run.
//!
//! A [`Dataset`] is a column-ordered table of JSON cell values. `null` is
//! the only missing marker. Datasets are immutable once built and shared
//! between runs through [`DatasetHandle`].

mod column;
pub mod stats;

pub use column::{cell_datetime, infer_kind, parse_datetime, ColumnKind};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use crate::errors::DatasetError;

/// Shared, immutable dataset.
pub type DatasetHandle = Arc<Dataset>;

/// Name and inferred kind of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Inferred kind.
    pub kind: ColumnKind,
}

/// A named table of JSON cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Unchecked wire form of a [`Dataset`].
#[derive(Deserialize)]
struct RawDataset {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = DatasetError;

    fn try_from(raw: RawDataset) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.columns, raw.rows)
    }
}

impl Dataset {
    /// Builds a dataset from explicit columns and rows.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, DatasetError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(DatasetError::DuplicateColumn(column.clone()));
            }
        }
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DatasetError::RaggedRow {
                    index,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            columns,
            rows,
        })
    }

    /// Builds a dataset from JSON objects.
    ///
    /// Columns appear in first-seen order; keys missing from a record
    /// become `null`.
    pub fn from_records(name: impl Into<String>, records: Vec<Value>) -> Result<Self, DatasetError> {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut objects = Vec::with_capacity(records.len());

        for (i, record) in records.into_iter().enumerate() {
            let Value::Object(map) = record else {
                return Err(DatasetError::NotAnObject { index: i });
            };
            for key in map.keys() {
                if !index.contains_key(key) {
                    index.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
            objects.push(map);
        }

        let rows = objects
            .into_iter()
            .map(|mut map| {
                columns
                    .iter()
                    .map(|c| map.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self::new(name, columns, rows)
    }

    /// Parses a JSON array of records.
    pub fn from_json_str(name: impl Into<String>, json: &str) -> Result<Self, DatasetError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Array(records) => Self::from_records(name, records),
            _ => Err(DatasetError::NotAnArray),
        }
    }

    /// Loads a JSON-records file; the file stem becomes the dataset name.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().into_owned());
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(name, &text)
    }

    /// Wraps the dataset in a shareable handle.
    #[must_use]
    pub fn into_handle(self) -> DatasetHandle {
        Arc::new(self)
    }

    /// Dataset label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Numeric cells of one column, skipping nulls and non-numbers.
    #[must_use]
    pub fn numeric_values(&self, index: usize) -> Vec<f64> {
        self.column_values(index).filter_map(Value::as_f64).collect()
    }

    /// Rows where both columns hold numbers.
    #[must_use]
    pub fn paired_numeric(&self, a: usize, b: usize) -> (Vec<f64>, Vec<f64>) {
        self.rows
            .iter()
            .filter_map(|row| Some((row.get(a)?.as_f64()?, row.get(b)?.as_f64()?)))
            .unzip()
    }

    /// Null cells in one column.
    #[must_use]
    pub fn missing_count(&self, index: usize) -> usize {
        self.column_values(index).filter(|v| v.is_null()).count()
    }

    /// Rows identical to an earlier row.
    #[must_use]
    pub fn duplicate_row_count(&self) -> usize {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|row| !seen.insert(Value::Array((*row).clone()).to_string()))
            .count()
    }

    /// Inferred schema, in column order.
    #[must_use]
    pub fn schema(&self) -> Vec<ColumnSchema> {
        (0..self.columns.len())
            .map(|i| ColumnSchema {
                name: self.columns[i].clone(),
                kind: infer_kind(self.column_values(i)),
            })
            .collect()
    }

    /// Indices of numeric columns.
    #[must_use]
    pub fn numeric_columns(&self) -> Vec<usize> {
        self.columns_where(ColumnKind::is_numeric)
    }

    /// Indices of text and date-string columns.
    #[must_use]
    pub fn categorical_columns(&self) -> Vec<usize> {
        self.columns_where(|k| matches!(k, ColumnKind::Text | ColumnKind::Datetime))
    }

    /// Columns whose name mentions a date or time and whose cells parse as
    /// timestamps.
    #[must_use]
    pub fn date_columns(&self) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| {
                let name = self.columns[i].to_lowercase();
                (name.contains("date") || name.contains("time"))
                    && infer_kind(self.column_values(i)) == ColumnKind::Datetime
            })
            .collect()
    }

    fn columns_where(&self, pred: impl Fn(ColumnKind) -> bool) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| pred(infer_kind(self.column_values(i))))
            .collect()
    }

    /// SHA-256 over the column names and cells, hex encoded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for column in &self.columns {
            hasher.update(column.as_bytes());
            hasher.update([0x1f]);
        }
        for row in &self.rows {
            for cell in row {
                hasher.update(cell.to_string().as_bytes());
                hasher.update([0x1f]);
            }
            hasher.update([0x1e]);
        }
        hex::encode(hasher.finalize())
    }

    /// Markdown table of the first `limit` rows, for prompts.
    #[must_use]
    pub fn preview(&self, limit: usize) -> String {
        let mut out = format!(
            "| {} |\n|{}\n",
            self.columns.join(" | "),
            " --- |".repeat(self.columns.len())
        );
        for row in self.rows.iter().take(limit) {
            let cells: Vec<String> = row.iter().map(display_cell).collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        out
    }
}

/// Renders a cell without JSON quoting.
#[must_use]
pub fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
