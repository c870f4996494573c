use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ReportError, Result};
use crate::util::parse_f64_safe;

/// One provider row: dimension values followed by metric values, all in the
/// provider's string wire format and in the order the request declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

impl RawRow {
    pub fn new<D, M>(dimensions: D, metrics: M) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        RawRow {
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            metrics: metrics.into_iter().map(Into::into).collect(),
        }
    }
}

/// A single cell. Normalized tables hold `Text` and `Date`; coercion turns
/// designated columns into `Number`, or `Missing` when the value is junk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Date(NaiveDate),
    Number(f64),
    Missing,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Numeric view of the cell. Uncoerced text is parsed leniently so
    /// derivations can run before or after coercion.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_f64_safe(Some(s)),
            Value::Date(_) | Value::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Key used when this cell is a grouping value.
    pub fn group_key(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Number(n) => n.to_string(),
            Value::Missing => NOT_SET.to_string(),
        }
    }
}

/// Placeholder GA itself uses for absent dimension values.
pub const NOT_SET: &str = "(not set)";

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => write!(f, ""),
            other => write!(f, "{}", other.group_key()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

/// Ordered records sharing one column list. Every record has exactly one
/// value per column, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            records: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like `column_index`, but a missing column is an error naming `context`.
    pub fn require_column(&self, name: &str, context: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ReportError::missing_column(name, context))
    }

    pub fn push(&mut self, record: Record) -> Result<()> {
        if record.values.len() != self.columns.len() {
            return Err(ReportError::SchemaMismatch {
                report: "table".to_string(),
                field: "column",
                row: self.records.len(),
                expected: self.columns.len(),
                found: record.values.len(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// All values of one column, in record order.
    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.require_column(name, "column lookup")?;
        Ok(self.records.iter().map(|r| &r.values[idx]).collect())
    }

    pub(crate) fn records_mut(&mut self) -> &mut Vec<Record> {
        &mut self.records
    }

    pub(crate) fn from_parts(columns: Vec<String>, records: Vec<Record>) -> Self {
        Table { columns, records }
    }
}

/// How an aggregated column is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellFormat {
    /// Whole number (sums of counts).
    Count,
    /// Already a percentage; shown with two decimals and a `%` suffix.
    Percent,
    /// A 0..1 fraction; scaled by 100 for display.
    Fraction,
    /// Two-decimal number without suffix.
    Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedColumn {
    pub name: String,
    pub format: CellFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub key: String,
    /// One entry per `AggregatedTable::columns`. `None` means a mean with no
    /// usable input values.
    pub values: Vec<Option<f64>>,
}

/// One row per distinct grouping value, already in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedTable {
    pub group_column: String,
    pub columns: Vec<AggregatedColumn>,
    pub rows: Vec<AggregatedRow>,
}

impl AggregatedTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value of `column` for the row keyed `key`.
    pub fn value(&self, key: &str, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r.key == key)
            .and_then(|r| r.values[idx])
    }

    pub fn keys(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.key.as_str()).collect()
    }
}

/// Rendered summary handed to both the chat model and the display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportText(pub String);

impl ReportText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
