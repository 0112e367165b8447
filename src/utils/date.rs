use crate::errors::{AppError, AppResult};
use chrono::{Duration, NaiveDate, NaiveDateTime};

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub fn parse_date_arg(s: &str) -> AppResult<NaiveDate> {
    parse_date(s).ok_or_else(|| AppError::InvalidDate(s.to_string()))
}

pub fn date_str(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// First day of a look-back window of `days` days ending at `today`.
pub fn window_start(today: NaiveDate, days: i64) -> NaiveDate {
    today - Duration::days(days.max(0))
}

/// Cut-off instant for retention rules: anything punched in before it is
/// older than `days` days.
pub fn retention_cutoff(now: NaiveDateTime, days: i64) -> NaiveDateTime {
    now - Duration::days(days.max(0))
}

/// Parse a `YYYY-MM-DD:YYYY-MM-DD` range (or a single day).
pub fn parse_range(s: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let (start, end) = match s.split_once(':') {
        Some((a, b)) => (parse_date_arg(a)?, parse_date_arg(b)?),
        None => {
            let d = parse_date_arg(s)?;
            (d, d)
        }
    };

    if end < start {
        return Err(AppError::InvalidDate(format!(
            "range end {} is before start {}",
            end, start
        )));
    }
    Ok((start, end))
}
