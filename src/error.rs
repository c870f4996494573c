//! Error types for the report pipeline.
//!
//! Structural problems (schema drift, missing columns, bad configuration)
//! surface here. Dirty metric values never do: coercion absorbs them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(
        "Schema mismatch in {report} row {row}: expected {expected} {field} values, found {found}"
    )]
    SchemaMismatch {
        report: String,
        field: &'static str,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Column '{column}' not found ({context})")]
    MissingColumn { column: String, context: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Chat request failed: {0}")]
    Chat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    pub fn missing_column(column: &str, context: impl Into<String>) -> Self {
        ReportError::MissingColumn {
            column: column.to_string(),
            context: context.into(),
        }
    }

    /// True for errors caused by the shape of the input rather than I/O or
    /// collaborators. The UI layer uses this to say "refused" instead of "failed".
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            ReportError::SchemaMismatch { .. } | ReportError::MissingColumn { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
