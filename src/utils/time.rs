//! Time utilities: timestamp storage format, parsing and hour arithmetic.

use crate::errors::{AppError, AppResult};
use chrono::{Local, NaiveDateTime};

/// Storage format of `time_entries.punch_in` / `punch_out`.
pub const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const ACCEPTED_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Parse a stored timestamp. Older rows carry fractional seconds or a
/// space separator, both are accepted.
pub fn parse_ts(s: &str) -> Option<NaiveDateTime> {
    ACCEPTED_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s.trim(), f).ok())
}

pub fn parse_ts_arg(s: &str) -> AppResult<NaiveDateTime> {
    parse_ts(s)
        .or_else(|| NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M").ok())
        .ok_or_else(|| AppError::InvalidTimestamp(s.to_string()))
}

/// Elapsed time in hours, second resolution.
pub fn hours_between(start: &NaiveDateTime, end: &NaiveDateTime) -> f64 {
    (*end - *start).num_seconds() as f64 / 3600.0
}

/// `2.25` → `"02h 15m"`
pub fn format_hours(hours: f64) -> String {
    let mins = (hours * 60.0).round() as i64;
    let sign = if mins < 0 { "-" } else { "" };
    let m = mins.abs();
    format!("{}{:02}h {:02}m", sign, m / 60, m % 60)
}
