use crate::error::Result;
use crate::render::format_cell;
use crate::types::AggregatedTable;
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

fn header_row(table: &AggregatedTable) -> Vec<String> {
    std::iter::once(table.group_column.clone())
        .chain(table.columns.iter().map(|c| c.name.clone()))
        .collect()
}

/// CSV export with raw numbers (empty cell for a missing mean).
pub fn write_csv(path: &Path, table: &AggregatedTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(header_row(table))?;
    for row in &table.rows {
        let mut record = vec![row.key.clone()];
        record.extend(
            row.values
                .iter()
                .map(|v| v.map(|n| n.to_string()).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Markdown table of the first `max_rows` rows, formatted like the report text.
pub fn preview_table(table: &AggregatedTable, max_rows: usize) -> String {
    if table.rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(header_row(table));
    for row in table.rows.iter().take(max_rows) {
        let mut record = vec![row.key.clone()];
        record.extend(
            row.values
                .iter()
                .zip(&table.columns)
                .map(|(v, c)| format_cell(*v, c.format)),
        );
        builder.push_record(record);
    }
    builder.build().with(Style::markdown()).to_string()
}
