//! CLI configuration file (JSON).
//!
//! Every field is required: the conventions it carries used to be guessed
//! differently per dashboard, so the file has to spell them out.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::aggregate::WeekStart;
use crate::error::{ReportError, Result};
use crate::reports::{BounceRateUnit, BounceRateWeighting, ReportOptions, WeekOrder};

/// Business context seeded into every conversation with the chat model.
pub const DEFAULT_BUSINESS_CONTEXT: &str = "Answer these prompts with this context in mind. \
The data comes from the website of a small, owner-run business that is trying to use its \
analytics to improve site performance and grow. Keep all feedback simple and actionable, \
with no unnecessary business jargon.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    pub week_start: WeekStart,
    /// Sessions descending unless the file asks for chronological weeks.
    #[serde(default)]
    pub week_order: WeekOrder,
    pub bounce_rate_unit: BounceRateUnit,
    pub bounce_rate_weighting: BounceRateWeighting,
    /// Maximum characters kept in the conversation log.
    pub context_budget: usize,
}

impl ReportConfig {
    pub fn from_json(body: &str) -> Result<Self> {
        let config: ReportConfig = serde_json::from_str(body)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)?;
        let config = Self::from_json(&body)?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.context_budget == 0 {
            return Err(ReportError::InvalidConfig(
                "context_budget must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            bounce_rate_unit: self.bounce_rate_unit,
            bounce_rate_weighting: self.bounce_rate_weighting,
            week_start: self.week_start,
            week_order: self.week_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_config() {
        let config = ReportConfig::from_json(
            r#"{"week_start": "sunday", "week_order": "chronological",
                "bounce_rate_unit": "percent_as_fraction",
                "bounce_rate_weighting": "sessions", "context_budget": 8000}"#,
        )
        .unwrap();
        assert_eq!(config.week_start, WeekStart::Sunday);
        let options = config.report_options();
        assert_eq!(options.bounce_rate_unit, BounceRateUnit::PercentAsFraction);
        assert_eq!(options.bounce_rate_weighting, BounceRateWeighting::Sessions);
        assert_eq!(options.week_order, WeekOrder::Chronological);
    }

    #[test]
    fn week_order_defaults_to_sessions() {
        let config = ReportConfig::from_json(
            r#"{"week_start": "monday", "bounce_rate_unit": "fraction",
                "bounce_rate_weighting": "unweighted", "context_budget": 10}"#,
        )
        .unwrap();
        assert_eq!(config.week_order, WeekOrder::BySessions);
    }

    #[test]
    fn old_boolean_unit_key_is_rejected() {
        let err = ReportConfig::from_json(
            r#"{"week_start": "monday", "bounce_rate_as_fraction": true,
                "bounce_rate_weighting": "unweighted", "context_budget": 10}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::Json(_)));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let err = ReportConfig::from_json(r#"{"week_start": "monday"}"#).unwrap_err();
        assert!(matches!(err, ReportError::Json(_)));
    }

    #[test]
    fn zero_budget_is_invalid() {
        let err = ReportConfig::from_json(
            r#"{"week_start": "monday", "bounce_rate_unit": "percent",
                "bounce_rate_weighting": "unweighted", "context_budget": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig(_)));
    }
}
