use crate::error::Result;
use crate::schema::ReportSchema;
use crate::types::RawRow;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub parse_errors: usize,
}

/// Saved provider responses end in `.json`; anything else is read as CSV.
pub fn is_json_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Load rows for `schema` from a CSV export or a saved provider JSON response,
/// picked by file extension.
pub fn load_rows(path: &Path, schema: &ReportSchema) -> Result<(Vec<RawRow>, LoadReport)> {
    if !is_json_input(path) {
        return load_csv_rows(path, schema);
    }
    let body = std::fs::read_to_string(path)?;
    let rows = if schema.name == ReportSchema::search_console().name {
        parse_search_console_response(&body)?
    } else if schema.name == ReportSchema::keyword_ideas().name {
        parse_keyword_ideas_response(&body)?
    } else {
        parse_ga4_response(&body)?
    };
    let report = LoadReport {
        total_rows: rows.len(),
        parse_errors: 0,
    };
    Ok((rows, report))
}

/// Positional CSV: the first `schema.dimensions.len()` fields are dimensions,
/// the rest metrics. Field counts are not checked here; the normalizer
/// rejects rows that do not fit the schema.
pub fn load_csv_rows(path: &Path, schema: &ReportSchema) -> Result<(Vec<RawRow>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = rdr.headers()?.clone();
    let expected = schema.column_names();
    let matches_header = headers.len() == schema.width()
        && headers.iter().enumerate().all(|(i, h)| {
            let h = h.trim();
            h == expected[i] || h == api_name_at(schema, i)
        });
    if !matches_header {
        warn!(
            report = %schema.name,
            header = ?headers.iter().collect::<Vec<_>>(),
            "CSV header differs from schema; reading positionally"
        );
    }

    let dims = schema.dimensions.len();
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut rows = Vec::new();

    for result in rdr.records() {
        total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(row = total_rows, error = %e, "skipping unreadable CSV record");
                parse_errors += 1;
                continue;
            }
        };
        let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        let split = dims.min(fields.len());
        rows.push(RawRow {
            dimensions: fields[..split].to_vec(),
            metrics: fields[split..].to_vec(),
        });
    }

    if parse_errors > 0 {
        warn!(count = parse_errors, "CSV records skipped");
    }
    Ok((rows, LoadReport { total_rows, parse_errors }))
}

fn api_name_at(schema: &ReportSchema, i: usize) -> &str {
    schema
        .dimensions
        .iter()
        .chain(schema.metrics.iter())
        .nth(i)
        .map(|c| c.api_name.as_str())
        .unwrap_or("")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ga4Response {
    #[serde(default)]
    rows: Vec<Ga4Row>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ga4Row {
    #[serde(default)]
    dimension_values: Vec<Ga4Value>,
    #[serde(default)]
    metric_values: Vec<Ga4Value>,
}

#[derive(Debug, Deserialize)]
struct Ga4Value {
    #[serde(default)]
    value: String,
}

/// GA4 Data API `runReport` response body.
pub fn parse_ga4_response(body: &str) -> Result<Vec<RawRow>> {
    let response: Ga4Response = serde_json::from_str(body)?;
    Ok(response
        .rows
        .into_iter()
        .map(|r| RawRow {
            dimensions: r.dimension_values.into_iter().map(|v| v.value).collect(),
            metrics: r.metric_values.into_iter().map(|v| v.value).collect(),
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct SearchConsoleResponse {
    #[serde(default)]
    rows: Vec<SearchConsoleRow>,
}

#[derive(Debug, Deserialize)]
struct SearchConsoleRow {
    #[serde(default)]
    keys: Vec<String>,
    #[serde(default)]
    impressions: f64,
    #[serde(default)]
    clicks: f64,
    #[serde(default)]
    ctr: f64,
    #[serde(default)]
    position: f64,
}

/// Search Console `searchanalytics.query` response body. Metrics come back
/// in the order impressions, clicks, ctr, position; absent ones are 0.
pub fn parse_search_console_response(body: &str) -> Result<Vec<RawRow>> {
    let response: SearchConsoleResponse = serde_json::from_str(body)?;
    Ok(response
        .rows
        .into_iter()
        .map(|r| RawRow {
            dimensions: r.keys,
            metrics: vec![
                r.impressions.to_string(),
                r.clicks.to_string(),
                r.ctr.to_string(),
                r.position.to_string(),
            ],
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct KeywordIdeasResponse {
    #[serde(default)]
    results: Vec<KeywordIdea>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeywordIdea {
    #[serde(default)]
    text: String,
    #[serde(default)]
    keyword_idea_metrics: KeywordIdeaMetrics,
}

// int64 fields arrive as JSON strings from the REST API, as numbers elsewhere.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeywordIdeaMetrics {
    #[serde(default)]
    competition: Option<String>,
    #[serde(default)]
    avg_monthly_searches: Option<serde_json::Value>,
    #[serde(default)]
    low_top_of_page_bid_micros: Option<serde_json::Value>,
    #[serde(default)]
    high_top_of_page_bid_micros: Option<serde_json::Value>,
}

fn scalar_text(value: Option<serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Google Ads `generateKeywordIdeas` response body. Dimensions are keyword
/// text and competition; metrics are monthly searches and the low/high
/// top-of-page bids in micros. Absent metrics become empty cells.
pub fn parse_keyword_ideas_response(body: &str) -> Result<Vec<RawRow>> {
    let response: KeywordIdeasResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .into_iter()
        .map(|idea| {
            let m = idea.keyword_idea_metrics;
            RawRow {
                dimensions: vec![idea.text, m.competition.unwrap_or_default()],
                metrics: vec![
                    scalar_text(m.avg_monthly_searches),
                    scalar_text(m.low_top_of_page_bid_micros),
                    scalar_text(m.high_top_of_page_bid_micros),
                ],
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn ga4_response_rows() {
        let body = r#"{
            "dimensionHeaders": [{"name": "date"}, {"name": "sessionSource"}],
            "rows": [
                {"dimensionValues": [{"value": "20240101"}, {"value": "google"}],
                 "metricValues": [{"value": "12"}, {"value": "0.45"}]}
            ],
            "rowCount": 1
        }"#;
        let rows = parse_ga4_response(body).unwrap();
        assert_eq!(rows, vec![RawRow::new(["20240101", "google"], ["12", "0.45"])]);
        assert!(parse_ga4_response("{}").unwrap().is_empty());
    }

    #[test]
    fn search_console_response_rows() {
        let body = r#"{"rows": [{"keys": ["dietitian"], "clicks": 3, "impressions": 120, "ctr": 0.025, "position": 4.5}]}"#;
        let rows = parse_search_console_response(body).unwrap();
        assert_eq!(rows[0].dimensions, vec!["dietitian"]);
        assert_eq!(rows[0].metrics, vec!["120", "3", "0.025", "4.5"]);
    }

    #[test]
    fn keyword_ideas_response_rows() {
        let body = r#"{
            "results": [
                {"text": "dietitian seattle",
                 "keywordIdeaMetrics": {"competition": "MEDIUM", "avgMonthlySearches": "320",
                                        "lowTopOfPageBidMicros": "2100000",
                                        "highTopOfPageBidMicros": 6400000}},
                {"text": "meal plan"}
            ],
            "nextPageToken": ""
        }"#;
        let rows = parse_keyword_ideas_response(body).unwrap();
        assert_eq!(
            rows[0],
            RawRow::new(["dietitian seattle", "MEDIUM"], ["320", "2100000", "6400000"])
        );
        assert_eq!(rows[1], RawRow::new(["meal plan", ""], ["", "", ""]));
    }

    #[test]
    fn csv_rows_split_positionally() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "query,impressions,clicks,ctr,position").unwrap();
        writeln!(file, "meal plan,100,4,0.04,7.1").unwrap();
        writeln!(file, "short row,1").unwrap();
        file.flush().unwrap();

        let (rows, report) = load_rows(file.path(), ReportSchema::search_console()).unwrap();
        assert_eq!(report.total_rows, 2);
        assert_eq!(report.parse_errors, 0);
        assert_eq!(rows[0], RawRow::new(["meal plan"], ["100", "4", "0.04", "7.1"]));
        assert_eq!(rows[1].metrics, vec!["1"]);
    }

    #[test]
    fn json_extension_uses_provider_parser() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"rows": [{{"keys": ["q"], "clicks": 1, "impressions": 2}}]}}"#).unwrap();
        file.flush().unwrap();
        let (rows, _) = load_rows(file.path(), ReportSchema::search_console()).unwrap();
        assert_eq!(rows[0].metrics, vec!["2", "1", "0", "0"]);
    }
}
