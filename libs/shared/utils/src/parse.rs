use chrono::{NaiveDate, NaiveTime};

use shared_models::error::AppError;

const MAX_ID_LEN: usize = 128;

/// Accepts a record identifier made of ASCII letters, digits, `-` and `_`.
/// Ids are interpolated into store query strings, so PostgREST operators and
/// separators (`&`, `,`, `(`, `)`, `.`) are rejected.
pub fn parse_id<'a>(field: &str, raw: &'a str) -> Result<&'a str, AppError> {
    let id = raw.trim();
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(id)
    } else {
        Err(AppError::ValidationError(format!("Invalid {} '{}'", field, raw)))
    }
}

/// Parses a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::ValidationError(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

/// Parses a wall-clock time in `HH:MM` or `HH:MM:SS` form.
pub fn parse_time(raw: &str) -> Result<NaiveTime, AppError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .map_err(|_| AppError::ValidationError(format!("Invalid time '{}', expected HH:MM", raw)))
}
