use crate::error::{ReportError, Result};
use crate::schema::{ColumnKind, ReportSchema};
use crate::types::{RawRow, Record, Table, Value};
use crate::util::parse_date_safe;
use std::cmp::Ordering;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub total_rows: usize,
    pub unparsed_dates: usize,
}

/// Turn one provider row into a record laid out as `schema.column_names()`.
///
/// Dimension and metric counts must match the schema exactly; `row_no` is
/// only used in the error.
pub fn normalize_row(row: &RawRow, schema: &ReportSchema, row_no: usize) -> Result<Record> {
    check_arity(schema, "dimension", row_no, schema.dimensions.len(), row.dimensions.len())?;
    check_arity(schema, "metric", row_no, schema.metrics.len(), row.metrics.len())?;

    let mut values = Vec::with_capacity(schema.width());
    for (spec, raw) in schema.dimensions.iter().zip(&row.dimensions) {
        let value = match spec.kind {
            ColumnKind::Date => match parse_date_safe(Some(raw)) {
                Some(d) => Value::Date(d),
                None => Value::Missing,
            },
            _ => Value::Text(raw.clone()),
        };
        values.push(value);
    }
    values.extend(row.metrics.iter().map(|m| Value::Text(m.clone())));
    Ok(Record { values })
}

fn check_arity(
    schema: &ReportSchema,
    field: &'static str,
    row: usize,
    expected: usize,
    found: usize,
) -> Result<()> {
    if expected == found {
        return Ok(());
    }
    Err(ReportError::SchemaMismatch {
        report: schema.name.clone(),
        field,
        row,
        expected,
        found,
    })
}

/// Normalize a whole batch. Any arity mismatch rejects the batch.
///
/// When the schema has a date column the result is stably sorted by date,
/// with unparseable dates kept after all real ones.
pub fn normalize_rows(rows: &[RawRow], schema: &ReportSchema) -> Result<(Table, NormalizeReport)> {
    let mut table = Table::new(schema.column_names());
    for (i, row) in rows.iter().enumerate() {
        table.push(normalize_row(row, schema, i)?)?;
    }

    let mut report = NormalizeReport {
        total_rows: rows.len(),
        unparsed_dates: 0,
    };

    let date_idx = schema
        .dimensions
        .iter()
        .position(|c| c.kind == ColumnKind::Date);
    if let Some(idx) = date_idx {
        report.unparsed_dates = table
            .records()
            .iter()
            .filter(|r| r.values[idx].is_missing())
            .count();
        if report.unparsed_dates > 0 {
            warn!(
                report = %schema.name,
                count = report.unparsed_dates,
                "rows with unparseable dates"
            );
        }
        sort_by_date(&mut table, idx);
    }

    debug!(report = %schema.name, rows = table.len(), "normalized rows");
    Ok((table, report))
}

/// Stable ascending sort on the date column; ties keep arrival order.
pub fn sort_by_date(table: &mut Table, date_idx: usize) {
    table.records_mut().sort_by(|a, b| {
        match (a.values[date_idx].as_date(), b.values[date_idx].as_date()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}
