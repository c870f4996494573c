// Utility helpers for parsing and basic statistics.
//
// All the forgiving string handling lives here so the pipeline stages can
// work with typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues common in analytics exports.
///
/// - Trims whitespace.
/// - Rejects values containing alphabetic characters (so `NaN`, `inf` and
///   `(not set)` never sneak through as numbers).
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok()
}

/// GA4 sends `date` as `YYYYMMDD`; CSV exports usually carry `YYYY-MM-DD`.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

pub fn average(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Weighted mean; `None` when there is nothing to weigh.
pub fn weighted_average(pairs: &[(f64, f64)]) -> Option<f64> {
    let total_weight: f64 = pairs.iter().map(|(_, w)| *w).sum();
    if pairs.is_empty() || total_weight == 0.0 {
        return None;
    }
    let sum: f64 = pairs.iter().map(|(v, w)| v * w).sum();
    Some(sum / total_weight)
}

/// Half-up rounding to `decimals` places (ties move away from zero).
pub fn round_half_up(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    // Nudge by a relative epsilon so binary representations like
    // 1.005 (stored as 1.00499...) still round up.
    let scaled = n * factor;
    let nudged = scaled + scaled.signum() * scaled.abs() * f64::EPSILON * 4.0;
    nudged.round() / factor
}

/// `numerator / denominator * 100`, rounded to two places. A zero
/// denominator yields 0.
pub fn percent_rate(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let rate = numerator / denominator * 100.0;
    if !rate.is_finite() {
        return 0.0;
    }
    round_half_up(rate, 2)
}

/// Fixed-point formatting with `.` as the separator and no grouping.
pub fn format_fixed(n: f64, decimals: usize) -> String {
    let rounded = round_half_up(n, decimals as i32);
    // Avoid rendering "-0.00".
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.*}", decimals, rounded)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Console messages only (e.g. `9,855 rows loaded`); report text never
    // goes through here.
    n.to_formatted_string(&Locale::en)
}
