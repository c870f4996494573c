//! Command-line interface: load provider rows, build one report, print it.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::aggregate::WeekStart;
use crate::config::{ReportConfig, DEFAULT_BUSINESS_CONTEXT};
use crate::error::{ReportError, Result};
use crate::insights::{compose_prompt, ConversationLog};
use crate::loader::{is_json_input, load_rows, LoadReport};
use crate::output;
use crate::reports::{
    build_from_rows, BounceRateUnit, BounceRateWeighting, PrepareReport, ReportKind, WeekOrder,
};
use crate::schema::columns::SESSION_SOURCE;
use crate::schema::ReportSchema;
use crate::types::{AggregatedTable, ReportText};
use crate::util::format_int;

#[derive(Debug, Parser)]
#[command(
    name = "analytics_report",
    version,
    about = "Summarize GA4 and Search Console rows into fixed-format reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sessions, bounce rate and conversion rate per traffic source
    Acquisition {
        #[command(flatten)]
        common: CommonArgs,
        /// Acquisition column to group by (e.g. "Source/Medium", "Campaign Name")
        #[arg(long, default_value = SESSION_SOURCE)]
        group_by: String,
    },
    /// Per page path
    LandingPage(CommonArgs),
    /// Per landing page plus query string
    SearchQuery(CommonArgs),
    /// Per week
    TimeSeries(CommonArgs),
    /// Clicks, impressions, CTR and position per Search Console query
    SearchConsole(CommonArgs),
    /// Monthly searches and top-of-page bid range per Google Ads keyword idea
    KeywordIdeas(CommonArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WeekStartArg {
    Monday,
    Sunday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WeekOrderArg {
    BySessions,
    Chronological,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    /// "50%" or "50" means 50 percent
    Percent,
    /// "50%" or "50" means 50 percent, stored as 0.5
    PercentAsFraction,
    /// "0.5" means 50 percent (GA4 Data API)
    Fraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WeightingArg {
    Unweighted,
    Sessions,
}

#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// CSV export or saved provider JSON response
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Built-in schema the input was requested with (defaults to the report's own)
    #[arg(long)]
    pub schema: Option<String>,

    /// JSON config file; flags given explicitly override it
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// First day of the reporting week [default: monday]
    #[arg(long, value_enum)]
    pub week_start: Option<WeekStartArg>,

    /// Weekly rows by sessions or oldest first [default: by-sessions]
    #[arg(long, value_enum)]
    pub week_order: Option<WeekOrderArg>,

    /// Unit of the Bounce Rate cells [default: fraction for JSON input;
    /// required for CSV input unless the config file names it]
    #[arg(long, value_enum)]
    pub bounce_rate_unit: Option<UnitArg>,

    /// How bounce rates are averaged within a group [default: unweighted]
    #[arg(long, value_enum)]
    pub bounce_rate_weighting: Option<WeightingArg>,

    /// Write <report>_summary.{txt,csv,json} here
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Rows shown in the console preview table
    #[arg(long, default_value_t = 5)]
    pub preview: usize,

    /// Print the prompt that would be sent to the chat model for this question
    #[arg(long)]
    pub question: Option<String>,
}

impl Command {
    fn parts(&self) -> (ReportKind, &CommonArgs, &str) {
        match self {
            Command::Acquisition { common, group_by } => {
                (ReportKind::Acquisition, common, group_by.as_str())
            }
            Command::LandingPage(c) => (ReportKind::LandingPage, c, SESSION_SOURCE),
            Command::SearchQuery(c) => (ReportKind::SearchQuery, c, SESSION_SOURCE),
            Command::TimeSeries(c) => (ReportKind::TimeSeries, c, SESSION_SOURCE),
            Command::SearchConsole(c) => (ReportKind::SearchConsole, c, SESSION_SOURCE),
            Command::KeywordIdeas(c) => (ReportKind::KeywordIdeas, c, SESSION_SOURCE),
        }
    }
}

/// Config file first, explicit flags on top, documented defaults otherwise.
pub fn resolve_config(args: &CommonArgs, kind: ReportKind) -> Result<ReportConfig> {
    let file = match &args.config {
        Some(path) => Some(ReportConfig::load(path)?),
        None => None,
    };
    let bounce_rate_unit = match (args.bounce_rate_unit, &file) {
        (Some(unit), _) => match unit {
            UnitArg::Percent => BounceRateUnit::Percent,
            UnitArg::PercentAsFraction => BounceRateUnit::PercentAsFraction,
            UnitArg::Fraction => BounceRateUnit::Fraction,
        },
        (None, Some(config)) => config.bounce_rate_unit,
        (None, None) => input_bounce_rate_unit(&args.input, kind)?,
    };
    let mut config = file.unwrap_or(ReportConfig {
        week_start: WeekStart::Monday,
        week_order: WeekOrder::BySessions,
        bounce_rate_unit,
        bounce_rate_weighting: BounceRateWeighting::Unweighted,
        context_budget: 16_000,
    });
    config.bounce_rate_unit = bounce_rate_unit;
    if let Some(ws) = args.week_start {
        config.week_start = match ws {
            WeekStartArg::Monday => WeekStart::Monday,
            WeekStartArg::Sunday => WeekStart::Sunday,
        };
    }
    if let Some(order) = args.week_order {
        config.week_order = match order {
            WeekOrderArg::BySessions => WeekOrder::BySessions,
            WeekOrderArg::Chronological => WeekOrder::Chronological,
        };
    }
    if let Some(w) = args.bounce_rate_weighting {
        config.bounce_rate_weighting = match w {
            WeightingArg::Unweighted => BounceRateWeighting::Unweighted,
            WeightingArg::Sessions => BounceRateWeighting::Sessions,
        };
    }
    config.validate()?;
    Ok(config)
}

/// Saved GA4 Data API responses always carry bounce rate as a 0..1 fraction.
/// CSV exports differ by tool, so for them the unit has to be stated.
fn input_bounce_rate_unit(input: &Path, kind: ReportKind) -> Result<BounceRateUnit> {
    if !kind.uses_bounce_rate() || is_json_input(input) {
        return Ok(BounceRateUnit::Fraction);
    }
    Err(ReportError::InvalidConfig(format!(
        "bounce rate unit of '{}' is unknown; pass --bounce-rate-unit or a config file",
        input.display()
    )))
}

pub fn resolve_schema(kind: ReportKind, name: Option<&str>) -> Result<&'static ReportSchema> {
    match name {
        None => Ok(kind.default_schema()),
        Some(n) => ReportSchema::by_name(n).ok_or_else(|| {
            ReportError::InvalidConfig(format!(
                "unknown schema '{}', expected one of: {}",
                n,
                ReportSchema::built_in_names().join(", ")
            ))
        }),
    }
}

/// Everything one invocation produces before anything is printed.
#[derive(Debug)]
pub struct CliReport {
    pub kind: ReportKind,
    pub config: ReportConfig,
    pub load: LoadReport,
    pub text: ReportText,
    pub table: AggregatedTable,
    pub prepared: PrepareReport,
}

pub fn build(command: &Command) -> Result<CliReport> {
    let (kind, common, group_by) = command.parts();
    let config = resolve_config(common, kind)?;
    let schema = resolve_schema(kind, common.schema.as_deref())?;
    debug!(?kind, schema = %schema.name, ?config, "resolved report settings");

    let (rows, load) = load_rows(&common.input, schema)?;
    info!(
        rows = load.total_rows,
        skipped = load.parse_errors,
        input = %common.input.display(),
        "loaded rows"
    );

    let options = config.report_options();
    let (text, table, prepared) = build_from_rows(kind, &rows, schema, group_by, &options)?;
    Ok(CliReport {
        kind,
        config,
        load,
        text,
        table,
        prepared,
    })
}

pub fn run(cli: &Cli) -> Result<()> {
    let (_, common, _) = cli.command.parts();
    let report = build(&cli.command)?;

    println!(
        "Processing dataset... ({} rows loaded)",
        format_int(report.load.total_rows as u64)
    );
    if report.load.parse_errors > 0 {
        println!(
            "Note: {} rows skipped due to read errors.",
            format_int(report.load.parse_errors as u64)
        );
    }

    println!();
    print!("{}", report.text);
    println!();
    println!("{}", output::preview_table(&report.table, common.preview));
    if !report.prepared.coercion.is_clean() {
        println!(
            "Note: {} values could not be parsed and were treated as missing.",
            format_int(report.prepared.coercion.total() as u64)
        );
    }
    if report.prepared.normalize.unparsed_dates > 0 {
        println!(
            "Note: {} rows had unreadable dates.",
            format_int(report.prepared.normalize.unparsed_dates as u64)
        );
    }

    if let Some(dir) = &common.out_dir {
        export(dir, report.kind, &report.text, &report.table)?;
    }

    if let Some(question) = &common.question {
        let log = ConversationLog::new(DEFAULT_BUSINESS_CONTEXT, report.config.context_budget);
        println!(
            "\nPrompt for chat model:\n{}",
            compose_prompt(&log.render(), &report.text, question)
        );
    }
    Ok(())
}

fn export(dir: &Path, kind: ReportKind, text: &ReportText, table: &AggregatedTable) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let stem = format!("{}_summary", kind.file_stem());
    std::fs::write(dir.join(format!("{}.txt", stem)), text.as_str())?;
    output::write_csv(&dir.join(format!("{}.csv", stem)), table)?;
    output::write_json(&dir.join(format!("{}.json", stem)), table)?;
    println!("(Full table exported to {})", dir.display());
    Ok(())
}

/// Structured logging to stderr. `RUST_LOG` wins over the flags.
pub fn setup_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("analytics_report={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn common(input: &str, extra: &[&str]) -> CommonArgs {
        let mut argv = vec!["analytics_report", "landing-page", "--input", input];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::LandingPage(c) => c,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn json_input_defaults_to_fraction_unit() {
        let config = resolve_config(&common("rows.json", &[]), ReportKind::LandingPage).unwrap();
        assert_eq!(config.week_start, WeekStart::Monday);
        assert_eq!(config.week_order, WeekOrder::BySessions);
        assert_eq!(config.bounce_rate_unit, BounceRateUnit::Fraction);
        assert_eq!(config.bounce_rate_weighting, BounceRateWeighting::Unweighted);
    }

    #[test]
    fn csv_input_needs_a_stated_unit() {
        let err = resolve_config(&common("rows.csv", &[]), ReportKind::LandingPage).unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig(_)));

        let config = resolve_config(
            &common("rows.csv", &["--bounce-rate-unit", "percent"]),
            ReportKind::LandingPage,
        )
        .unwrap();
        assert_eq!(config.bounce_rate_unit, BounceRateUnit::Percent);

        // No bounce rate in Search Console rows.
        assert!(resolve_config(&common("rows.csv", &[]), ReportKind::SearchConsole).is_ok());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"week_start": "monday", "bounce_rate_unit": "percent_as_fraction",
                "bounce_rate_weighting": "sessions", "context_budget": 100}"#,
        )
        .unwrap();
        let path_str = path.to_str().unwrap();
        let config = resolve_config(
            &common(
                "rows.csv",
                &["--config", path_str, "--week-start", "sunday", "--week-order", "chronological"],
            ),
            ReportKind::LandingPage,
        )
        .unwrap();
        assert_eq!(config.week_start, WeekStart::Sunday);
        assert_eq!(config.week_order, WeekOrder::Chronological);
        assert_eq!(config.bounce_rate_unit, BounceRateUnit::PercentAsFraction);
        assert_eq!(config.context_budget, 100);
    }

    #[test]
    fn ga4_json_renders_bounce_rate_as_percent() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let row = |date: &str, bounce: &str| {
            format!(
                r#"{{"dimensionValues": [{{"value": "{}"}}, {{"value": "google"}}, {{"value": "google / organic"}}, {{"value": "(not set)"}}, {{"value": "page_view"}}],
                    "metricValues": [{{"value": "10"}}, {{"value": "{}"}}, {{"value": "2"}}, {{"value": "5"}}]}}"#,
                date, bounce
            )
        };
        write!(
            file,
            r#"{{"rows": [{}, {}]}}"#,
            row("20240304", "0.5"),
            row("20240305", "0.25")
        )
        .unwrap();
        file.flush().unwrap();

        let path = file.path().to_str().unwrap();
        let cli = Cli::parse_from(["analytics_report", "acquisition", "-i", path]);
        let report = build(&cli.command).unwrap();
        assert_eq!(report.load.total_rows, 2);
        assert!(report.text.as_str().contains("google | 20 | 37.50% | 0.00%,"));
    }

    #[test]
    fn acquisition_group_default() {
        let cli = Cli::parse_from(["analytics_report", "acquisition", "-i", "x.csv"]);
        let (kind, _, group) = cli.command.parts();
        assert_eq!(kind, ReportKind::Acquisition);
        assert_eq!(group, SESSION_SOURCE);
    }

    #[test]
    fn unknown_schema_is_a_config_error() {
        let err = resolve_schema(ReportKind::Acquisition, Some("ga3")).unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig(_)));
        assert_eq!(
            resolve_schema(ReportKind::Acquisition, Some("ga4_extended")).unwrap().name,
            "ga4_extended"
        );
    }
}
