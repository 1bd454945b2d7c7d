//! Time expressions for execution parameters.
//!
//! Timestamps (`start`, `stop`) accept `now`, relative offsets like `-15s` or
//! `-1h30m`, epoch milliseconds, or RFC 3339 datetimes. Durations
//! (`resolution`, `max_delay`) accept unit sequences like `1s`, `500ms` or
//! `1m30s`; a bare number is milliseconds.

use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeExprError {
    #[error("empty time expression")]
    Empty,
    #[error("invalid duration '{0}'")]
    InvalidDuration(String),
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Parses a duration expression into milliseconds.
///
/// A leading `=` is accepted and ignored.
pub fn parse_duration(expr: &str) -> Result<i64, TimeExprError> {
    let trimmed = expr.trim();
    let body = trimmed.strip_prefix('=').unwrap_or(trimmed).trim();
    if body.is_empty() {
        return Err(TimeExprError::Empty);
    }
    if let Ok(ms) = body.parse::<i64>() {
        return Ok(ms);
    }

    let invalid = || TimeExprError::InvalidDuration(expr.to_string());
    let mut total: i64 = 0;
    let mut rest = body;
    while !rest.is_empty() {
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        if digits_end == 0 {
            return Err(invalid());
        }
        let amount: i64 = rest[..digits_end].parse().map_err(|_| invalid())?;
        rest = &rest[digits_end..];

        let unit_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        let unit = unit_multiplier(&rest[..unit_end]).ok_or_else(invalid)?;
        rest = &rest[unit_end..];

        total = amount
            .checked_mul(unit)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(invalid)?;
    }
    Ok(total)
}

fn unit_multiplier(unit: &str) -> Option<i64> {
    match unit {
        "ms" => Some(1),
        "s" => Some(MS_PER_SECOND),
        "m" => Some(MS_PER_MINUTE),
        "h" => Some(MS_PER_HOUR),
        "d" => Some(MS_PER_DAY),
        "w" => Some(MS_PER_WEEK),
        _ => None,
    }
}

/// Parses a timestamp expression into epoch milliseconds, relative to `now_ms`.
pub fn parse_timestamp(expr: &str, now_ms: i64) -> Result<i64, TimeExprError> {
    let body = expr.trim();
    if body.is_empty() {
        return Err(TimeExprError::Empty);
    }
    if body.eq_ignore_ascii_case("now") {
        return Ok(now_ms);
    }
    let out_of_range = || TimeExprError::InvalidTimestamp(expr.to_string());
    if let Some(offset) = body.strip_prefix('-') {
        return parse_offset(offset, expr)
            .and_then(|ms| now_ms.checked_sub(ms).ok_or_else(out_of_range));
    }
    if let Some(offset) = body.strip_prefix('+') {
        return parse_offset(offset, expr)
            .and_then(|ms| now_ms.checked_add(ms).ok_or_else(out_of_range));
    }
    if let Ok(ms) = body.parse::<i64>() {
        return Ok(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(body) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(body, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc().timestamp_millis());
    }
    Err(TimeExprError::InvalidTimestamp(expr.to_string()))
}

fn parse_offset(offset: &str, expr: &str) -> Result<i64, TimeExprError> {
    parse_duration(offset).map_err(|_| TimeExprError::InvalidTimestamp(expr.to_string()))
}

/// Renders a millisecond duration compactly, e.g. `1m30s` or `250ms`.
pub fn render_delta(ms: i64) -> String {
    if ms == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if ms < 0 {
        out.push('-');
    }
    let mut rest = ms.unsigned_abs();
    for (unit, size) in [
        ("d", MS_PER_DAY),
        ("h", MS_PER_HOUR),
        ("m", MS_PER_MINUTE),
        ("s", MS_PER_SECOND),
        ("ms", 1),
    ] {
        let size = size as u64;
        let count = rest / size;
        if count > 0 {
            out.push_str(&format!("{count}{unit}"));
            rest %= size;
        }
    }
    out
}

/// Renders how far `timestamp_ms` lags behind `now_ms`.
pub fn render_lag(timestamp_ms: i64, now_ms: i64) -> String {
    render_delta(now_ms.saturating_sub(timestamp_ms))
}
