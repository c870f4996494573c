use analytics_report::aggregate::WeekStart;
use analytics_report::coerce::{coerce, derive_leads, parse_duration, CoercionPlan};
use analytics_report::loader::{parse_ga4_response, parse_keyword_ideas_response};
use analytics_report::normalize::normalize_rows;
use analytics_report::reports::{
    build_from_rows, build_keyword_report, keyword_coercion_plan, prepare_table,
    session_coercion_plan, BounceRateUnit, BounceRateWeighting, WeekOrder,
};
use analytics_report::schema::columns::*;
use analytics_report::schema::{ColumnSpec, ReportSchema};
use analytics_report::*;

fn options() -> ReportOptions {
    ReportOptions {
        bounce_rate_unit: BounceRateUnit::Percent,
        bounce_rate_weighting: BounceRateWeighting::Unweighted,
        week_start: WeekStart::Monday,
        week_order: WeekOrder::BySessions,
    }
}

fn source_schema() -> ReportSchema {
    ReportSchema::new(
        "source_leads",
        vec![ColumnSpec::dimension("sessionSource", SESSION_SOURCE)],
        vec![
            ColumnSpec::metric("sessions", SESSIONS),
            ColumnSpec::metric("bounceRate", BOUNCE_RATE),
            ColumnSpec::metric("leads", LEADS),
        ],
    )
}

fn source_rows() -> Vec<RawRow> {
    vec![
        RawRow::new(["google"], ["10", "50%", "2"]),
        RawRow::new(["google"], ["5", "30%", "0"]),
        RawRow::new(["direct"], ["20", "10%", "4"]),
    ]
}

#[test]
fn acquisition_by_source() {
    let opts = options();
    let (table, prepared) =
        prepare_table(&source_rows(), &source_schema(), &session_coercion_plan(&opts)).unwrap();
    assert!(prepared.coercion.is_clean());

    let (text, agg) = build_acquisition_report(&table, SESSION_SOURCE, &opts).unwrap();
    assert_eq!(agg.keys(), vec!["direct", "google"]);
    assert_eq!(agg.value("direct", SESSIONS), Some(20.0));
    assert_eq!(agg.value("direct", BOUNCE_RATE), Some(10.0));
    assert_eq!(agg.value("direct", CONVERSION_RATE), Some(20.0));
    assert_eq!(agg.value("google", SESSIONS), Some(15.0));
    assert_eq!(agg.value("google", BOUNCE_RATE), Some(40.0));
    assert_eq!(agg.value("google", CONVERSIONS), Some(2.0));
    assert_eq!(agg.value("google", CONVERSION_RATE), Some(13.33));

    let lines: Vec<&str> = text.as_str().lines().collect();
    assert_eq!(lines[0], "Traffic Acquisition Summary");
    assert_eq!(lines[1], "Session Source | Sessions | Bounce Rate | Conversion Rate");
    assert!(lines[2].chars().all(|c| c == '-'));
    assert_eq!(lines[2].len(), lines[1].len());
    assert_eq!(lines[3], "direct | 20 | 10.00% | 20.00%,");
    assert_eq!(lines[4], "google | 15 | 40.00% | 13.33%,");

    let (again, _) = build_acquisition_report(&table, SESSION_SOURCE, &opts).unwrap();
    assert_eq!(text, again);
}

#[test]
fn fraction_mode_renders_the_same_text() {
    let opts = ReportOptions {
        bounce_rate_unit: BounceRateUnit::PercentAsFraction,
        ..options()
    };
    let (table, _) =
        prepare_table(&source_rows(), &source_schema(), &session_coercion_plan(&opts)).unwrap();
    let (text, agg) = build_acquisition_report(&table, SESSION_SOURCE, &opts).unwrap();
    let v = agg.value("google", BOUNCE_RATE).unwrap();
    assert!((v - 0.4).abs() < 1e-12);
    assert!(text.as_str().contains("google | 15 | 40.00% | 13.33%,"));
}

#[test]
fn fraction_mode_treats_suffixed_and_bare_cells_alike() {
    let rows = vec![
        RawRow::new(["google"], ["10", "50%", "0"]),
        RawRow::new(["google"], ["10", "30", "0"]),
    ];
    let opts = ReportOptions {
        bounce_rate_unit: BounceRateUnit::PercentAsFraction,
        ..options()
    };
    let (text, agg, prepared) = build_from_rows(
        ReportKind::Acquisition,
        &rows,
        &source_schema(),
        SESSION_SOURCE,
        &opts,
    )
    .unwrap();
    assert!(prepared.coercion.is_clean());
    let v = agg.value("google", BOUNCE_RATE).unwrap();
    assert!((v - 0.4).abs() < 1e-12);
    assert!(text.as_str().contains("google | 20 | 40.00% | 0.00%,"));
}

#[test]
fn sessions_weighted_bounce_rate() {
    let opts = ReportOptions {
        bounce_rate_weighting: BounceRateWeighting::Sessions,
        ..options()
    };
    let (table, _) =
        prepare_table(&source_rows(), &source_schema(), &session_coercion_plan(&opts)).unwrap();
    let (text, _) = build_acquisition_report(&table, SESSION_SOURCE, &opts).unwrap();
    assert!(text.as_str().contains("google | 15 | 43.33% | 13.33%,"));
}

#[test]
fn zero_sessions_convert_at_zero_percent() {
    let rows = vec![RawRow::new(["newsletter"], ["0", "0%", "3"])];
    let (_, agg, _) = build_from_rows(
        ReportKind::Acquisition,
        &rows,
        &source_schema(),
        SESSION_SOURCE,
        &options(),
    )
    .unwrap();
    assert_eq!(agg.value("newsletter", CONVERSION_RATE), Some(0.0));
}

#[test]
fn durations_and_leads() {
    assert_eq!(parse_duration("1:02:30"), Some(3750.0));
    assert_eq!(parse_duration("2:15"), Some(135.0));

    let schema = ReportSchema::new(
        "events",
        vec![ColumnSpec::dimension("eventName", EVENT_NAME)],
        vec![
            ColumnSpec::metric("eventCount", EVENT_COUNT),
            ColumnSpec::metric("averageSessionDuration", AVG_SESSION_DURATION),
        ],
    );
    let rows = vec![
        RawRow::new(["generate_lead"], ["3", "1:02:30"]),
        RawRow::new(["page_view"], ["7", "garbage"]),
    ];
    let (normalized, _) = normalize_rows(&rows, &schema).unwrap();
    let plan = CoercionPlan::new()
        .number(EVENT_COUNT)
        .duration(AVG_SESSION_DURATION);
    let (coerced, report) = coerce(&normalized, &plan).unwrap();
    assert_eq!(report.total(), 1);

    let durations: Vec<Option<f64>> = coerced
        .column_values(AVG_SESSION_DURATION)
        .unwrap()
        .iter()
        .map(|v| v.as_f64())
        .collect();
    assert_eq!(durations, vec![Some(3750.0), Some(0.0)]);

    let with_leads = derive_leads(&coerced).unwrap();
    let leads: Vec<Option<f64>> = with_leads
        .column_values(LEADS)
        .unwrap()
        .iter()
        .map(|v| v.as_f64())
        .collect();
    assert_eq!(leads, vec![Some(3.0), Some(0.0)]);
}

#[test]
fn schema_drift_is_refused() {
    let rows = vec![RawRow::new(["google", "cpc"], ["10", "50%", "2"])];
    let err = build_from_rows(
        ReportKind::Acquisition,
        &rows,
        &source_schema(),
        SESSION_SOURCE,
        &options(),
    )
    .unwrap_err();
    assert!(matches!(err, ReportError::SchemaMismatch { .. }));
    assert!(err.is_schema_error());
}

fn ga4_extended_body() -> String {
    let row = |date: &str, page: &str, source: &str, lp: &str, event: &str, m: [&str; 6]| {
        format!(
            r#"{{"dimensionValues": [{{"value": "{}"}}, {{"value": "{}"}}, {{"value": "{}"}}, {{"value": "(not set)"}}, {{"value": "{} / organic"}}, {{"value": "{}"}}, {{"value": "{}"}}],
                "metricValues": [{{"value": "{}"}}, {{"value": "{}"}}, {{"value": "{}"}}, {{"value": "{}"}}, {{"value": "{}"}}, {{"value": "{}"}}]}}"#,
            date, page, source, source, lp, event, m[0], m[1], m[2], m[3], m[4], m[5]
        )
    };
    let rows = [
        row("20240306", "/", "google", "/?utm=a", "generate_lead", ["8", "10", "0.25", "95.5", "3", "2"]),
        row("20240304", "/blog", "google", "/blog", "page_view", ["12", "30", "0.5", "40", "6", "30"]),
        row("20240311", "/", "direct", "/?utm=a", "generate_lead", ["4", "4", "0.75", "12", "1", "1"]),
    ];
    format!(r#"{{"rows": [{}], "rowCount": 3}}"#, rows.join(","))
}

#[test]
fn extended_ga4_pull_feeds_every_session_report() {
    let rows = parse_ga4_response(&ga4_extended_body()).unwrap();
    let schema = ReportSchema::ga4_extended();
    let opts = ReportOptions {
        bounce_rate_unit: BounceRateUnit::Fraction,
        ..options()
    };

    let (_, acq, _) =
        build_from_rows(ReportKind::Acquisition, &rows, schema, SESSION_SOURCE, &opts).unwrap();
    assert_eq!(acq.keys(), vec!["google", "direct"]);
    assert_eq!(acq.value("google", CONVERSIONS), Some(2.0));
    assert_eq!(acq.value("google", CONVERSION_RATE), Some(10.0));

    let (_, by_medium, _) =
        build_from_rows(ReportKind::Acquisition, &rows, schema, SOURCE_MEDIUM, &opts).unwrap();
    assert_eq!(by_medium.group_column, SOURCE_MEDIUM);
    assert_eq!(by_medium.keys(), vec!["google / organic", "direct / organic"]);

    let (_, pages, _) =
        build_from_rows(ReportKind::LandingPage, &rows, schema, SESSION_SOURCE, &opts).unwrap();
    // Tied on sessions, so key order decides.
    assert_eq!(pages.keys(), vec!["/", "/blog"]);
    assert_eq!(pages.value("/", SESSIONS), Some(12.0));

    let (_, queries, _) =
        build_from_rows(ReportKind::SearchQuery, &rows, schema, SESSION_SOURCE, &opts).unwrap();
    assert_eq!(queries.keys(), vec!["/?utm=a", "/blog"]);

    let (text, weeks, _) =
        build_from_rows(ReportKind::TimeSeries, &rows, schema, SESSION_SOURCE, &opts).unwrap();
    assert_eq!(weeks.keys(), vec!["2024-03-04", "2024-03-11"]);
    assert_eq!(weeks.value("2024-03-04", SESSIONS), Some(20.0));
    assert!(text.as_str().contains("2024-03-04 | 20 | 37.50% | 10.00%,"));
    assert!(text.as_str().contains("2024-03-11 | 4 | 75.00% | 25.00%,"));
}

#[test]
fn keyword_ideas_from_provider_json() {
    let body = r#"{"results": [
        {"text": "seattle dietitian",
         "keywordIdeaMetrics": {"competition": "LOW", "avgMonthlySearches": "480",
                                "lowTopOfPageBidMicros": "1800000", "highTopOfPageBidMicros": "7200000"}},
        {"text": "nutritionist",
         "keywordIdeaMetrics": {"competition": "HIGH", "avgMonthlySearches": "5400",
                                "lowTopOfPageBidMicros": "2450000", "highTopOfPageBidMicros": "9990000"}}
    ]}"#;
    let rows = parse_keyword_ideas_response(body).unwrap();
    let (table, prepared) =
        prepare_table(&rows, ReportSchema::keyword_ideas(), &keyword_coercion_plan()).unwrap();
    assert!(prepared.coercion.is_clean());

    let (text, agg) = build_keyword_report(&table).unwrap();
    assert_eq!(agg.keys(), vec!["nutritionist", "seattle dietitian"]);
    assert_eq!(agg.value("seattle dietitian", HIGH_TOP_BID), Some(7.2));
    let lines: Vec<&str> = text.as_str().lines().collect();
    assert_eq!(lines[3], "nutritionist | 5400 | 2.45 | 9.99,");
    assert_eq!(lines[4], "seattle dietitian | 480 | 1.80 | 7.20,");
}
