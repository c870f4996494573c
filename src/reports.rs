//! One entry point per report type.
//!
//! Each builder aggregates once and renders from that same aggregation, so the
//! text sent to the chat model and the table shown to the user always agree.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::{aggregate, AggregationSpec, GroupKey, Measure, RowOrder, WeekStart};
use crate::coerce::{coerce, derive_leads, CoercionPlan, CoercionReport, NumericKind};
use crate::error::Result;
use crate::normalize::{normalize_rows, NormalizeReport};
use crate::render::render_report;
use crate::schema::columns::*;
use crate::schema::ReportSchema;
use crate::types::{AggregatedTable, CellFormat, RawRow, ReportText, Table};

/// How per-row bounce rates are combined within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BounceRateWeighting {
    /// Plain mean of row values; what the historical dashboards showed.
    Unweighted,
    /// Mean weighted by each row's sessions.
    Sessions,
}

/// Unit the Bounce Rate cells arrive in, and how they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BounceRateUnit {
    /// Percent points (`"50%"` or `"50"`), stored as 50.
    Percent,
    /// Percent points, stored as the fraction 0.5.
    PercentAsFraction,
    /// Already 0..1 (`"0.5"`), as the GA4 Data API returns it.
    Fraction,
}

impl BounceRateUnit {
    pub fn numeric_kind(self) -> NumericKind {
        match self {
            BounceRateUnit::Percent => NumericKind::Percent { as_fraction: false },
            BounceRateUnit::PercentAsFraction => NumericKind::Percent { as_fraction: true },
            BounceRateUnit::Fraction => NumericKind::Fraction,
        }
    }

    fn cell_format(self) -> CellFormat {
        match self {
            BounceRateUnit::Percent => CellFormat::Percent,
            BounceRateUnit::PercentAsFraction | BounceRateUnit::Fraction => CellFormat::Fraction,
        }
    }
}

/// Row order of the weekly report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekOrder {
    /// Sessions descending, ties by week ascending, like every other report.
    #[default]
    BySessions,
    /// Oldest week first; undated rows last.
    Chronological,
}

/// Conventions that used to differ between dashboards. Callers state them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOptions {
    pub bounce_rate_unit: BounceRateUnit,
    pub bounce_rate_weighting: BounceRateWeighting,
    /// Only used by the time series report.
    pub week_start: WeekStart,
    /// Only used by the time series report.
    pub week_order: WeekOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Acquisition,
    LandingPage,
    SearchQuery,
    TimeSeries,
    SearchConsole,
    KeywordIdeas,
}

impl ReportKind {
    /// Schema the report is requested with by default.
    pub fn default_schema(self) -> &'static ReportSchema {
        match self {
            ReportKind::Acquisition => ReportSchema::acquisition(),
            ReportKind::LandingPage => ReportSchema::landing_page(),
            ReportKind::SearchQuery => ReportSchema::search_query(),
            ReportKind::TimeSeries => ReportSchema::time_series(),
            ReportKind::SearchConsole => ReportSchema::search_console(),
            ReportKind::KeywordIdeas => ReportSchema::keyword_ideas(),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Acquisition => "Traffic Acquisition Summary",
            ReportKind::LandingPage => "Landing Page Performance Summary",
            ReportKind::SearchQuery => "Search Query Performance Summary",
            ReportKind::TimeSeries => "Weekly Traffic Summary",
            ReportKind::SearchConsole => "Search Console Query Summary",
            ReportKind::KeywordIdeas => "Keyword Ideas Summary",
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            ReportKind::Acquisition => "acquisition",
            ReportKind::LandingPage => "landing_page",
            ReportKind::SearchQuery => "search_query",
            ReportKind::TimeSeries => "time_series",
            ReportKind::SearchConsole => "search_console",
            ReportKind::KeywordIdeas => "keyword_ideas",
        }
    }

    /// Whether the report reads GA session rows and so depends on the
    /// bounce rate unit.
    pub fn uses_bounce_rate(self) -> bool {
        !matches!(self, ReportKind::SearchConsole | ReportKind::KeywordIdeas)
    }
}

/// Data-quality notes from turning raw rows into a coerced table. Non-empty
/// fallbacks mean "report rendered, some values were missing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareReport {
    pub normalize: NormalizeReport,
    pub coercion: CoercionReport,
    /// Plan columns the schema does not carry; left uncoerced.
    pub absent_columns: Vec<String>,
}

pub fn session_coercion_plan(options: &ReportOptions) -> CoercionPlan {
    CoercionPlan::new()
        .number(SESSIONS)
        .number(PAGEVIEWS)
        .with(BOUNCE_RATE, options.bounce_rate_unit.numeric_kind())
        .duration(AVG_SESSION_DURATION)
        .number(NEW_USERS)
        .number(EVENT_COUNT)
        .number(LEADS)
}

pub fn search_console_coercion_plan() -> CoercionPlan {
    CoercionPlan::new()
        .number(IMPRESSIONS)
        .number(CLICKS)
        .fraction(CTR)
        .number(AVG_POSITION)
}

pub fn keyword_coercion_plan() -> CoercionPlan {
    CoercionPlan::new()
        .number(AVG_MONTHLY_SEARCHES)
        .micros(LOW_TOP_BID)
        .micros(HIGH_TOP_BID)
}

/// Normalize, coerce and (for GA session rows) derive `Leads`.
///
/// Only plan columns present in the schema are coerced, so any schema that
/// carries the needed columns works; the rest are listed in
/// [`PrepareReport::absent_columns`].
pub fn prepare_table(
    rows: &[RawRow],
    schema: &ReportSchema,
    plan: &CoercionPlan,
) -> Result<(Table, PrepareReport)> {
    let (normalized, normalize_report) = normalize_rows(rows, schema)?;
    let (plan, absent_columns) = plan.restricted_to(&normalized);
    let (mut table, coercion_report) = coerce(&normalized, &plan)?;

    let has_events =
        table.column_index(EVENT_NAME).is_some() && table.column_index(EVENT_COUNT).is_some();
    if has_events && table.column_index(LEADS).is_none() {
        table = derive_leads(&table)?;
    }

    debug!(
        schema = %schema.name,
        rows = table.len(),
        fallbacks = coercion_report.total(),
        "prepared table"
    );
    Ok((
        table,
        PrepareReport {
            normalize: normalize_report,
            coercion: coercion_report,
            absent_columns,
        },
    ))
}

fn with_leads(table: &Table) -> Result<std::borrow::Cow<'_, Table>> {
    if table.column_index(LEADS).is_some() {
        Ok(std::borrow::Cow::Borrowed(table))
    } else {
        Ok(std::borrow::Cow::Owned(derive_leads(table)?))
    }
}

fn session_measures(options: &ReportOptions) -> Vec<Measure> {
    let format = options.bounce_rate_unit.cell_format();
    let weight = match options.bounce_rate_weighting {
        BounceRateWeighting::Unweighted => None,
        BounceRateWeighting::Sessions => Some(SESSIONS),
    };
    vec![
        Measure::sum(SESSIONS, SESSIONS),
        Measure::mean(BOUNCE_RATE, format, weight),
        Measure::sum(LEADS, CONVERSIONS),
        Measure::rate(CONVERSION_RATE, LEADS, SESSIONS),
    ]
}

const SESSION_DISPLAY: [&str; 3] = [SESSIONS, BOUNCE_RATE, CONVERSION_RATE];

fn build_session_report(
    table: &Table,
    group: GroupKey,
    group_label: &str,
    order: RowOrder,
    title: &str,
    options: &ReportOptions,
) -> Result<(ReportText, AggregatedTable)> {
    let table = with_leads(table)?;
    let spec = AggregationSpec {
        group,
        group_label: group_label.to_string(),
        measures: session_measures(options),
        order,
    };
    let aggregated = aggregate(&table, &spec)?;
    let text = render_report(&aggregated, title, &SESSION_DISPLAY)?;
    info!(report = title, groups = aggregated.rows.len(), "built report");
    Ok((text, aggregated))
}

/// Sessions, bounce rate and conversions per traffic source. `group_by` is
/// the acquisition dimension column, e.g. `Session Source` or `Source/Medium`.
pub fn build_acquisition_report(
    table: &Table,
    group_by: &str,
    options: &ReportOptions,
) -> Result<(ReportText, AggregatedTable)> {
    build_session_report(
        table,
        GroupKey::Column(group_by.to_string()),
        group_by,
        RowOrder::Descending(SESSIONS.to_string()),
        ReportKind::Acquisition.title(),
        options,
    )
}

pub fn build_landing_page_report(
    table: &Table,
    options: &ReportOptions,
) -> Result<(ReportText, AggregatedTable)> {
    build_session_report(
        table,
        GroupKey::Column(PAGE_PATH.to_string()),
        PAGE_PATH,
        RowOrder::Descending(SESSIONS.to_string()),
        ReportKind::LandingPage.title(),
        options,
    )
}

/// Per landing page plus query string, the closest GA4 gets to search terms.
pub fn build_search_query_report(
    table: &Table,
    options: &ReportOptions,
) -> Result<(ReportText, AggregatedTable)> {
    build_session_report(
        table,
        GroupKey::Column(LANDING_PAGE_QUERY.to_string()),
        LANDING_PAGE_QUERY,
        RowOrder::Descending(SESSIONS.to_string()),
        ReportKind::SearchQuery.title(),
        options,
    )
}

/// Weekly buckets, ordered per [`ReportOptions::week_order`].
pub fn build_time_series_report(
    table: &Table,
    options: &ReportOptions,
) -> Result<(ReportText, AggregatedTable)> {
    build_session_report(
        table,
        GroupKey::Week {
            date_column: DATE.to_string(),
            start: options.week_start,
        },
        WEEK,
        match options.week_order {
            WeekOrder::BySessions => RowOrder::Descending(SESSIONS.to_string()),
            WeekOrder::Chronological => RowOrder::KeyAscending,
        },
        ReportKind::TimeSeries.title(),
        options,
    )
}

/// Clicks, impressions, CTR and average position per Search Console query.
pub fn build_search_console_report(table: &Table) -> Result<(ReportText, AggregatedTable)> {
    let spec = AggregationSpec {
        group: GroupKey::Column(SEARCH_QUERY.to_string()),
        group_label: SEARCH_QUERY.to_string(),
        measures: vec![
            Measure::sum(CLICKS, CLICKS),
            Measure::sum(IMPRESSIONS, IMPRESSIONS),
            Measure::rate(CTR, CLICKS, IMPRESSIONS),
            Measure::mean(AVG_POSITION, CellFormat::Decimal, None),
        ],
        order: RowOrder::Descending(CLICKS.to_string()),
    };
    let aggregated = aggregate(table, &spec)?;
    let title = ReportKind::SearchConsole.title();
    let text = render_report(&aggregated, title, &[CLICKS, IMPRESSIONS, CTR, AVG_POSITION])?;
    info!(report = title, groups = aggregated.rows.len(), "built report");
    Ok((text, aggregated))
}

/// Monthly searches and top-of-page bid range per Google Ads keyword idea.
pub fn build_keyword_report(table: &Table) -> Result<(ReportText, AggregatedTable)> {
    let spec = AggregationSpec {
        group: GroupKey::Column(KEYWORD.to_string()),
        group_label: KEYWORD.to_string(),
        measures: vec![
            Measure::sum(AVG_MONTHLY_SEARCHES, AVG_MONTHLY_SEARCHES),
            Measure::mean(LOW_TOP_BID, CellFormat::Decimal, None),
            Measure::mean(HIGH_TOP_BID, CellFormat::Decimal, None),
        ],
        order: RowOrder::Descending(AVG_MONTHLY_SEARCHES.to_string()),
    };
    let aggregated = aggregate(table, &spec)?;
    let title = ReportKind::KeywordIdeas.title();
    let text = render_report(
        &aggregated,
        title,
        &[AVG_MONTHLY_SEARCHES, LOW_TOP_BID, HIGH_TOP_BID],
    )?;
    info!(report = title, groups = aggregated.rows.len(), "built report");
    Ok((text, aggregated))
}

/// Run a report straight from provider rows.
pub fn build_from_rows(
    kind: ReportKind,
    rows: &[RawRow],
    schema: &ReportSchema,
    acquisition_group: &str,
    options: &ReportOptions,
) -> Result<(ReportText, AggregatedTable, PrepareReport)> {
    let plan = match kind {
        ReportKind::SearchConsole => search_console_coercion_plan(),
        ReportKind::KeywordIdeas => keyword_coercion_plan(),
        _ => session_coercion_plan(options),
    };
    let (table, prepared) = prepare_table(rows, schema, &plan)?;
    let (text, aggregated) = match kind {
        ReportKind::Acquisition => build_acquisition_report(&table, acquisition_group, options)?,
        ReportKind::LandingPage => build_landing_page_report(&table, options)?,
        ReportKind::SearchQuery => build_search_query_report(&table, options)?,
        ReportKind::TimeSeries => build_time_series_report(&table, options)?,
        ReportKind::SearchConsole => build_search_console_report(&table)?,
        ReportKind::KeywordIdeas => build_keyword_report(&table)?,
    };
    Ok((text, aggregated, prepared))
}
