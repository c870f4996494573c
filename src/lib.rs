//! Turns analytics provider rows (GA4, Search Console) into deterministic
//! report summaries: a normalized table, an aggregated table, and a
//! fixed-format text block suitable for display and as chat-model context.
//!
//! Data flows one way: raw rows -> normalized table -> coerced table ->
//! aggregated table -> report text. Nothing here performs network I/O.

pub mod aggregate;
pub mod cli;
pub mod coerce;
pub mod config;
pub mod error;
pub mod insights;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod render;
pub mod reports;
pub mod schema;
pub mod types;
pub mod util;

pub use error::{ReportError, Result};
pub use reports::{
    build_acquisition_report, build_keyword_report, build_landing_page_report,
    build_search_console_report, build_search_query_report, build_time_series_report,
    BounceRateUnit, ReportKind, ReportOptions, WeekOrder,
};
pub use types::{AggregatedTable, RawRow, ReportText, Table, Value};
