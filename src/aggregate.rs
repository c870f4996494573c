use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::error::Result;
use crate::types::{
    AggregatedColumn, AggregatedRow, AggregatedTable, CellFormat, Record, Table, NOT_SET,
};
use crate::util::{average, percent_rate, weighted_average};

/// First day of a reporting week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }
}

/// Start of the week containing `date`.
pub fn week_start(date: NaiveDate, start: WeekStart) -> NaiveDate {
    let offset = (date.weekday().num_days_from_monday() + 7
        - start.weekday().num_days_from_monday())
        % 7;
    date - Duration::days(offset as i64)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKey {
    Column(String),
    /// Bucket the date column by week start; keys are `YYYY-MM-DD`.
    Week { date_column: String, start: WeekStart },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Measure {
    /// Missing cells count as 0.
    Sum { column: String, name: String, format: CellFormat },
    /// Missing cells are skipped. With `weight`, a weighted mean over rows
    /// where both value and weight are present.
    Mean {
        column: String,
        name: String,
        weight: Option<String>,
        format: CellFormat,
    },
    /// `sum(numerator) / sum(denominator) * 100`, two places, 0 on a zero
    /// denominator.
    Rate {
        name: String,
        numerator: String,
        denominator: String,
    },
}

impl Measure {
    pub fn sum(column: &str, name: &str) -> Self {
        Measure::Sum {
            column: column.to_string(),
            name: name.to_string(),
            format: CellFormat::Count,
        }
    }

    pub fn mean(column: &str, format: CellFormat, weight: Option<&str>) -> Self {
        Measure::Mean {
            column: column.to_string(),
            name: column.to_string(),
            weight: weight.map(str::to_string),
            format,
        }
    }

    pub fn rate(name: &str, numerator: &str, denominator: &str) -> Self {
        Measure::Rate {
            name: name.to_string(),
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
        }
    }

    fn output(&self) -> AggregatedColumn {
        let (name, format) = match self {
            Measure::Sum { name, format, .. } | Measure::Mean { name, format, .. } => {
                (name.clone(), *format)
            }
            Measure::Rate { name, .. } => (name.clone(), CellFormat::Percent),
        };
        AggregatedColumn { name, format }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOrder {
    /// Descending on an output column, ties by key ascending.
    Descending(String),
    /// Key ascending. In both orders the `(not set)` key sorts after every
    /// real key.
    KeyAscending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSpec {
    pub group: GroupKey,
    /// Header used for the key column.
    pub group_label: String,
    pub measures: Vec<Measure>,
    pub order: RowOrder,
}

enum Resolved {
    Sum(usize),
    Mean(usize, Option<usize>),
    Rate(usize, usize),
}

pub fn aggregate(table: &Table, spec: &AggregationSpec) -> Result<AggregatedTable> {
    let context = format!("aggregation by {}", spec.group_label);

    let group_idx = match &spec.group {
        GroupKey::Column(c) => table.require_column(c, &context)?,
        GroupKey::Week { date_column, .. } => table.require_column(date_column, &context)?,
    };

    let mut resolved = Vec::with_capacity(spec.measures.len());
    for m in &spec.measures {
        resolved.push(match m {
            Measure::Sum { column, .. } => Resolved::Sum(table.require_column(column, &context)?),
            Measure::Mean { column, weight, .. } => {
                let w = match weight {
                    Some(w) => Some(table.require_column(w, &context)?),
                    None => None,
                };
                Resolved::Mean(table.require_column(column, &context)?, w)
            }
            Measure::Rate {
                numerator,
                denominator,
                ..
            } => Resolved::Rate(
                table.require_column(numerator, &context)?,
                table.require_column(denominator, &context)?,
            ),
        });
    }

    let columns: Vec<AggregatedColumn> = spec.measures.iter().map(Measure::output).collect();

    // Order of first appearance is irrelevant; the sort below fixes it.
    let mut groups: HashMap<String, Vec<&Record>> = HashMap::new();
    for r in table.records() {
        let key = group_key(&r.values[group_idx], &spec.group);
        groups.entry(key).or_default().push(r);
    }

    let mut rows: Vec<AggregatedRow> = groups
        .into_iter()
        .map(|(key, members)| {
            let values = resolved
                .iter()
                .map(|m| match m {
                    Resolved::Sum(idx) => Some(column_sum(&members, *idx)),
                    Resolved::Mean(idx, None) => {
                        let present: Vec<f64> =
                            members.iter().filter_map(|r| r.values[*idx].as_f64()).collect();
                        average(&present)
                    }
                    Resolved::Mean(idx, Some(w)) => {
                        let pairs: Vec<(f64, f64)> = members
                            .iter()
                            .filter_map(|r| Some((r.values[*idx].as_f64()?, r.values[*w].as_f64()?)))
                            .collect();
                        weighted_average(&pairs)
                    }
                    Resolved::Rate(num, den) => Some(percent_rate(
                        column_sum(&members, *num),
                        column_sum(&members, *den),
                    )),
                })
                .collect();
            AggregatedRow { key, values }
        })
        .collect();

    sort_rows(&mut rows, &columns, &spec.order);

    debug!(
        group = %spec.group_label,
        input_rows = table.len(),
        groups = rows.len(),
        "aggregated table"
    );

    Ok(AggregatedTable {
        group_column: spec.group_label.clone(),
        columns,
        rows,
    })
}

fn group_key(value: &crate::types::Value, group: &GroupKey) -> String {
    match group {
        GroupKey::Column(_) => value.group_key(),
        GroupKey::Week { start, .. } => match value.as_date() {
            Some(d) => week_start(d, *start).format("%Y-%m-%d").to_string(),
            None => NOT_SET.to_string(),
        },
    }
}

fn column_sum(members: &[&Record], idx: usize) -> f64 {
    members
        .iter()
        .map(|r| r.values[idx].as_f64().unwrap_or(0.0))
        .sum()
}

fn sort_rows(rows: &mut [AggregatedRow], columns: &[AggregatedColumn], order: &RowOrder) {
    match order {
        RowOrder::KeyAscending => rows.sort_by(|a, b| key_cmp(&a.key, &b.key)),
        RowOrder::Descending(name) => {
            let idx = columns.iter().position(|c| &c.name == name);
            rows.sort_by(|a, b| {
                let primary = match idx {
                    Some(i) => {
                        let x = a.values[i].unwrap_or(f64::NEG_INFINITY);
                        let y = b.values[i].unwrap_or(f64::NEG_INFINITY);
                        y.partial_cmp(&x).unwrap_or(Ordering::Equal)
                    }
                    None => Ordering::Equal,
                };
                primary.then_with(|| key_cmp(&a.key, &b.key))
            });
        }
    }
}

fn key_cmp(a: &str, b: &str) -> Ordering {
    (a == NOT_SET).cmp(&(b == NOT_SET)).then_with(|| a.cmp(b))
}
