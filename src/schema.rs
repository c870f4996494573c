//! Report schemas: which provider fields a report requests, in which order,
//! and the column names they become in the normalized table.
//!
//! Provider identifiers (`sessionSource`, `bounceRate`, ...) are passed
//! through unchanged; only the display column names are ours.

use once_cell::sync::Lazy;
use serde::Serialize;

pub mod columns {
    pub const DATE: &str = "Date";
    pub const PAGE_PATH: &str = "Page Path";
    pub const SESSION_SOURCE: &str = "Session Source";
    pub const CAMPAIGN_NAME: &str = "Campaign Name";
    pub const SOURCE_MEDIUM: &str = "Source/Medium";
    pub const LANDING_PAGE_QUERY: &str = "Landing Page+Query";
    pub const EVENT_NAME: &str = "Event Name";
    pub const SESSIONS: &str = "Sessions";
    pub const PAGEVIEWS: &str = "Pageviews";
    pub const BOUNCE_RATE: &str = "Bounce Rate";
    pub const AVG_SESSION_DURATION: &str = "Avg. Session Duration";
    pub const NEW_USERS: &str = "New Users";
    pub const EVENT_COUNT: &str = "Event Count";
    pub const LEADS: &str = "Leads";
    pub const CONVERSIONS: &str = "Conversions";
    pub const CONVERSION_RATE: &str = "Conversion Rate";
    pub const WEEK: &str = "Week";

    pub const SEARCH_QUERY: &str = "Search Query";
    pub const IMPRESSIONS: &str = "Impressions";
    pub const CLICKS: &str = "Clicks";
    pub const CTR: &str = "CTR";
    pub const AVG_POSITION: &str = "Avg. Position";

    pub const KEYWORD: &str = "Keyword";
    pub const COMPETITION: &str = "Competition";
    pub const AVG_MONTHLY_SEARCHES: &str = "Avg Monthly Searches";
    /// Bids are converted from micros to currency units during coercion.
    pub const LOW_TOP_BID: &str = "Low Top of Page Bid";
    pub const HIGH_TOP_BID: &str = "High Top of Page Bid";
}

use columns::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Dimension,
    /// Dimension parsed into a calendar date during normalization.
    Date,
    Metric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    /// Provider field identifier, e.g. `sessionSource`.
    pub api_name: String,
    /// Normalized column name, e.g. `Session Source`.
    pub column: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn dimension(api_name: &str, column: &str) -> Self {
        let kind = if column == DATE {
            ColumnKind::Date
        } else {
            ColumnKind::Dimension
        };
        ColumnSpec {
            api_name: api_name.to_string(),
            column: column.to_string(),
            kind,
        }
    }

    pub fn metric(api_name: &str, column: &str) -> Self {
        ColumnSpec {
            api_name: api_name.to_string(),
            column: column.to_string(),
            kind: ColumnKind::Metric,
        }
    }
}

/// Declared dimension/metric order for one report request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSchema {
    pub name: String,
    pub dimensions: Vec<ColumnSpec>,
    pub metrics: Vec<ColumnSpec>,
}

impl ReportSchema {
    pub fn new(name: &str, dimensions: Vec<ColumnSpec>, metrics: Vec<ColumnSpec>) -> Self {
        ReportSchema {
            name: name.to_string(),
            dimensions,
            metrics,
        }
    }

    /// Column names in table order: dimensions first, then metrics.
    pub fn column_names(&self) -> Vec<String> {
        self.dimensions
            .iter()
            .chain(self.metrics.iter())
            .map(|c| c.column.clone())
            .collect()
    }

    pub fn width(&self) -> usize {
        self.dimensions.len() + self.metrics.len()
    }

    pub fn by_name(name: &str) -> Option<&'static ReportSchema> {
        BUILT_IN.iter().find(|s| s.name == name).copied()
    }

    pub fn built_in_names() -> Vec<&'static str> {
        BUILT_IN.iter().map(|s| s.name.as_str()).collect()
    }

    /// Full session-level GA4 pull; every GA report builder accepts it.
    pub fn ga4_extended() -> &'static ReportSchema {
        &GA4_EXTENDED
    }

    pub fn acquisition() -> &'static ReportSchema {
        &ACQUISITION
    }

    pub fn landing_page() -> &'static ReportSchema {
        &LANDING_PAGE
    }

    pub fn search_query() -> &'static ReportSchema {
        &SEARCH_QUERY_GA
    }

    pub fn time_series() -> &'static ReportSchema {
        &TIME_SERIES
    }

    pub fn search_console() -> &'static ReportSchema {
        &SEARCH_CONSOLE
    }

    /// Google Ads `generateKeywordIdeas` results.
    pub fn keyword_ideas() -> &'static ReportSchema {
        &KEYWORD_IDEAS
    }
}

static GA4_EXTENDED: Lazy<ReportSchema> = Lazy::new(|| {
    ReportSchema::new(
        "ga4_extended",
        vec![
            ColumnSpec::dimension("date", DATE),
            ColumnSpec::dimension("pagePath", PAGE_PATH),
            ColumnSpec::dimension("sessionSource", SESSION_SOURCE),
            ColumnSpec::dimension("firstUserCampaignName", CAMPAIGN_NAME),
            ColumnSpec::dimension("firstUserSourceMedium", SOURCE_MEDIUM),
            ColumnSpec::dimension("landingPagePlusQueryString", LANDING_PAGE_QUERY),
            ColumnSpec::dimension("eventName", EVENT_NAME),
        ],
        vec![
            ColumnSpec::metric("sessions", SESSIONS),
            ColumnSpec::metric("screenPageViews", PAGEVIEWS),
            ColumnSpec::metric("bounceRate", BOUNCE_RATE),
            ColumnSpec::metric("averageSessionDuration", AVG_SESSION_DURATION),
            ColumnSpec::metric("newUsers", NEW_USERS),
            ColumnSpec::metric("eventCount", EVENT_COUNT),
        ],
    )
});

static ACQUISITION: Lazy<ReportSchema> = Lazy::new(|| {
    ReportSchema::new(
        "acquisition",
        vec![
            ColumnSpec::dimension("date", DATE),
            ColumnSpec::dimension("sessionSource", SESSION_SOURCE),
            ColumnSpec::dimension("firstUserSourceMedium", SOURCE_MEDIUM),
            ColumnSpec::dimension("firstUserCampaignName", CAMPAIGN_NAME),
            ColumnSpec::dimension("eventName", EVENT_NAME),
        ],
        vec![
            ColumnSpec::metric("sessions", SESSIONS),
            ColumnSpec::metric("bounceRate", BOUNCE_RATE),
            ColumnSpec::metric("newUsers", NEW_USERS),
            ColumnSpec::metric("eventCount", EVENT_COUNT),
        ],
    )
});

static LANDING_PAGE: Lazy<ReportSchema> = Lazy::new(|| {
    ReportSchema::new(
        "landing_page",
        vec![
            ColumnSpec::dimension("date", DATE),
            ColumnSpec::dimension("pagePath", PAGE_PATH),
            ColumnSpec::dimension("eventName", EVENT_NAME),
        ],
        vec![
            ColumnSpec::metric("sessions", SESSIONS),
            ColumnSpec::metric("screenPageViews", PAGEVIEWS),
            ColumnSpec::metric("bounceRate", BOUNCE_RATE),
            ColumnSpec::metric("averageSessionDuration", AVG_SESSION_DURATION),
            ColumnSpec::metric("eventCount", EVENT_COUNT),
        ],
    )
});

static SEARCH_QUERY_GA: Lazy<ReportSchema> = Lazy::new(|| {
    ReportSchema::new(
        "search_query",
        vec![
            ColumnSpec::dimension("date", DATE),
            ColumnSpec::dimension("landingPagePlusQueryString", LANDING_PAGE_QUERY),
            ColumnSpec::dimension("eventName", EVENT_NAME),
        ],
        vec![
            ColumnSpec::metric("sessions", SESSIONS),
            ColumnSpec::metric("bounceRate", BOUNCE_RATE),
            ColumnSpec::metric("eventCount", EVENT_COUNT),
        ],
    )
});

static TIME_SERIES: Lazy<ReportSchema> = Lazy::new(|| {
    ReportSchema::new(
        "time_series",
        vec![
            ColumnSpec::dimension("date", DATE),
            ColumnSpec::dimension("eventName", EVENT_NAME),
        ],
        vec![
            ColumnSpec::metric("sessions", SESSIONS),
            ColumnSpec::metric("screenPageViews", PAGEVIEWS),
            ColumnSpec::metric("bounceRate", BOUNCE_RATE),
            ColumnSpec::metric("averageSessionDuration", AVG_SESSION_DURATION),
            ColumnSpec::metric("newUsers", NEW_USERS),
            ColumnSpec::metric("eventCount", EVENT_COUNT),
        ],
    )
});

static SEARCH_CONSOLE: Lazy<ReportSchema> = Lazy::new(|| {
    ReportSchema::new(
        "search_console",
        vec![ColumnSpec::dimension("query", SEARCH_QUERY)],
        vec![
            ColumnSpec::metric("impressions", IMPRESSIONS),
            ColumnSpec::metric("clicks", CLICKS),
            ColumnSpec::metric("ctr", CTR),
            ColumnSpec::metric("position", AVG_POSITION),
        ],
    )
});

static KEYWORD_IDEAS: Lazy<ReportSchema> = Lazy::new(|| {
    ReportSchema::new(
        "keyword_ideas",
        vec![
            ColumnSpec::dimension("text", KEYWORD),
            ColumnSpec::dimension("competition", COMPETITION),
        ],
        vec![
            ColumnSpec::metric("avgMonthlySearches", AVG_MONTHLY_SEARCHES),
            ColumnSpec::metric("lowTopOfPageBidMicros", LOW_TOP_BID),
            ColumnSpec::metric("highTopOfPageBidMicros", HIGH_TOP_BID),
        ],
    )
});

static BUILT_IN: Lazy<Vec<&'static ReportSchema>> = Lazy::new(|| {
    vec![
        &*GA4_EXTENDED,
        &*ACQUISITION,
        &*LANDING_PAGE,
        &*SEARCH_QUERY_GA,
        &*TIME_SERIES,
        &*SEARCH_CONSOLE,
        &*KEYWORD_IDEAS,
    ]
});
