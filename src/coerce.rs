//! Metric coercion: string metrics into numbers, without ever failing on
//! dirty values.
//!
//! Unparseable numbers and percentages become [`Value::Missing`]; malformed
//! durations become 0 seconds. Both are counted in [`CoercionReport`] and
//! logged, never raised. A column named in the plan that the table does not
//! have is a caller bug and is raised.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::schema::columns::{EVENT_COUNT, EVENT_NAME, LEADS};
use crate::types::{Record, Table, Value};
use crate::util::parse_f64_safe;

/// Event name that counts as a lead.
pub const LEAD_EVENT: &str = "generate_lead";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericKind {
    Number,
    /// Percent points, optional trailing `%`. With `as_fraction` every value
    /// is divided by 100 (`"50%"` and `"50"` -> 0.5); otherwise kept as is.
    Percent { as_fraction: bool },
    /// Already a 0..1 ratio (`"0.5"`), as the GA4 Data API reports rates. A
    /// `%` suffix does not belong in such a column and falls back to missing.
    Fraction,
    /// Integer micros (Google Ads money), converted to currency units.
    Micros,
    /// `H:MM:SS`, `MM:SS`, or plain seconds, converted to seconds.
    Duration,
}

/// Which columns to coerce and how. Order does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionPlan {
    columns: Vec<(String, NumericKind)>,
}

impl CoercionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, kind: NumericKind) -> Self {
        self.columns.retain(|(c, _)| c != column);
        self.columns.push((column.to_string(), kind));
        self
    }

    pub fn number(self, column: &str) -> Self {
        self.with(column, NumericKind::Number)
    }

    pub fn percent(self, column: &str, as_fraction: bool) -> Self {
        self.with(column, NumericKind::Percent { as_fraction })
    }

    pub fn fraction(self, column: &str) -> Self {
        self.with(column, NumericKind::Fraction)
    }

    pub fn micros(self, column: &str) -> Self {
        self.with(column, NumericKind::Micros)
    }

    pub fn duration(self, column: &str) -> Self {
        self.with(column, NumericKind::Duration)
    }

    pub fn columns(&self) -> &[(String, NumericKind)] {
        &self.columns
    }

    pub fn kind_of(&self, column: &str) -> Option<NumericKind> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, k)| *k)
    }

    /// Split the plan into the entries whose column exists in `table` and
    /// the names of those that do not.
    pub fn restricted_to(&self, table: &Table) -> (Self, Vec<String>) {
        let (kept, dropped): (Vec<_>, Vec<_>) = self
            .columns
            .iter()
            .cloned()
            .partition(|(c, _)| table.column_index(c).is_some());
        let dropped: Vec<String> = dropped.into_iter().map(|(c, _)| c).collect();
        if !dropped.is_empty() {
            debug!(columns = ?dropped, "plan columns absent from table, not coerced");
        }
        (CoercionPlan { columns: kept }, dropped)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionReport {
    /// (column, number of values that fell back), only for columns with fallbacks.
    pub fallbacks: Vec<(String, usize)>,
}

impl CoercionReport {
    pub fn total(&self) -> usize {
        self.fallbacks.iter().map(|(_, n)| n).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.fallbacks.is_empty()
    }
}

/// Produce a new table with the planned columns converted to numbers.
///
/// Cells that are already numeric pass through untouched, so coercing a
/// coerced table is a no-op.
pub fn coerce(table: &Table, plan: &CoercionPlan) -> Result<(Table, CoercionReport)> {
    let mut targets = Vec::with_capacity(plan.columns.len());
    for (column, kind) in &plan.columns {
        let idx = table.require_column(column, "coercion plan")?;
        targets.push((idx, column.as_str(), *kind));
    }

    let mut records: Vec<Record> = table.records().to_vec();
    let mut report = CoercionReport::default();

    for (idx, column, kind) in targets {
        let mut fallbacks = 0usize;
        for (row_no, record) in records.iter_mut().enumerate() {
            let (value, fell_back) = coerce_value(&record.values[idx], kind);
            if fell_back {
                debug!(column, row = row_no, raw = %record.values[idx], "coercion fallback");
                fallbacks += 1;
            }
            record.values[idx] = value;
        }
        if fallbacks > 0 {
            warn!(column, count = fallbacks, "unparseable values replaced during coercion");
            report.fallbacks.push((column.to_string(), fallbacks));
        }
    }

    Ok((Table::from_parts(table.columns().to_vec(), records), report))
}

/// Returns the coerced cell and whether a fallback was taken.
pub fn coerce_value(value: &Value, kind: NumericKind) -> (Value, bool) {
    let raw = match value {
        Value::Number(n) => return (Value::Number(*n), false),
        Value::Missing => return (Value::Missing, false),
        Value::Date(_) => "",
        Value::Text(s) => s.as_str(),
    };
    match kind {
        NumericKind::Number => match parse_f64_safe(Some(raw)) {
            Some(n) => (Value::Number(n), false),
            None => (Value::Missing, true),
        },
        NumericKind::Percent { as_fraction } => match parse_percent(raw, as_fraction) {
            Some(n) => (Value::Number(n), false),
            None => (Value::Missing, true),
        },
        NumericKind::Fraction => match parse_f64_safe(Some(raw)) {
            Some(n) => (Value::Number(n), false),
            None => (Value::Missing, true),
        },
        NumericKind::Micros => match parse_f64_safe(Some(raw)) {
            Some(n) => (Value::Number(n / 1_000_000.0), false),
            None => (Value::Missing, true),
        },
        NumericKind::Duration => match parse_duration(raw) {
            Some(secs) => (Value::Number(secs), false),
            None => (Value::Number(0.0), true),
        },
    }
}

pub fn parse_percent(raw: &str, as_fraction: bool) -> Option<f64> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix('%').unwrap_or(trimmed);
    let n = parse_f64_safe(Some(digits))?;
    Some(if as_fraction { n / 100.0 } else { n })
}

/// Positional duration parsing: three parts are hours/minutes/seconds, two
/// are minutes/seconds, a single number is seconds. Anything else is `None`.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (whole(h)?, whole(m)?, secs(s)?),
        [m, s] => (0.0, whole(m)?, secs(s)?),
        [s] => (0.0, 0.0, secs(s)?),
        _ => return None,
    };
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn whole(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<u64>().ok().map(|n| n as f64)
}

fn secs(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Append a `Leads` column: the row's event count when its event name is
/// `generate_lead`, otherwise 0.
pub fn derive_leads(table: &Table) -> Result<Table> {
    let name_idx = table.require_column(EVENT_NAME, "leads derivation")?;
    let count_idx = table.require_column(EVENT_COUNT, "leads derivation")?;

    let mut columns = table.columns().to_vec();
    columns.push(LEADS.to_string());

    let mut unparsed = 0usize;
    let records = table
        .records()
        .iter()
        .map(|r| {
            let is_lead = r.values[name_idx].as_str() == Some(LEAD_EVENT);
            let leads = if is_lead {
                r.values[count_idx].as_f64().unwrap_or_else(|| {
                    unparsed += 1;
                    0.0
                })
            } else {
                0.0
            };
            let mut values = r.values.clone();
            values.push(Value::Number(leads));
            Record { values }
        })
        .collect();

    if unparsed > 0 {
        warn!(count = unparsed, "lead rows with unusable event counts counted as 0");
    }
    Ok(Table::from_parts(columns, records))
}
