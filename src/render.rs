//! Fixed-format text rendering of aggregated tables.
//!
//! Output is byte-for-byte deterministic: no locale, `.` decimals, two places
//! for rates and means, whole numbers for counts. Every line ends in `\n` and
//! every data line keeps the historical trailing comma.

use crate::error::{ReportError, Result};
use crate::types::{AggregatedTable, CellFormat, ReportText};
use crate::util::format_fixed;

const MISSING_CELL: &str = "n/a";

/// Render `table` under `title`, showing the key column followed by
/// `display` columns in the given order.
pub fn render_report(table: &AggregatedTable, title: &str, display: &[&str]) -> Result<ReportText> {
    let mut selected = Vec::with_capacity(display.len());
    for name in display {
        let idx = table
            .column_index(name)
            .ok_or_else(|| ReportError::missing_column(name, format!("rendering '{}'", title)))?;
        selected.push((idx, table.columns[idx].format));
    }

    let mut header = table.group_column.clone();
    for name in display {
        header.push_str(" | ");
        header.push_str(name);
    }

    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"-".repeat(header.chars().count()));
    out.push('\n');

    for row in &table.rows {
        out.push_str(&row.key);
        for (idx, format) in &selected {
            out.push_str(" | ");
            out.push_str(&format_cell(row.values[*idx], *format));
        }
        out.push_str(",\n");
    }

    Ok(ReportText(out))
}

pub fn format_cell(value: Option<f64>, format: CellFormat) -> String {
    let Some(v) = value else {
        return MISSING_CELL.to_string();
    };
    match format {
        CellFormat::Count => format_fixed(v, 0),
        CellFormat::Percent => format!("{}%", format_fixed(v, 2)),
        CellFormat::Fraction => format!("{}%", format_fixed(v * 100.0, 2)),
        CellFormat::Decimal => format_fixed(v, 2),
    }
}
