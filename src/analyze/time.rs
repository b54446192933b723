//! Resolution of the analysis window from CLI flags.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::spec::window::parse_window;

/// Errors from resolving the analysis window.
#[derive(Debug, Error)]
pub enum TimeError {
    /// `--last` was malformed or non-positive.
    #[error("invalid --last value {0:?}; expected a positive window like 90m or 7d")]
    InvalidLast(String),

    /// A timestamp flag was missing.
    #[error("--start and --end are required unless --last is given")]
    MissingRange,

    /// A timestamp flag was not RFC 3339.
    #[error("invalid {flag} timestamp {value:?}: {source}")]
    InvalidTimestamp {
        /// The offending flag name.
        flag: &'static str,
        /// The raw value.
        value: String,
        /// The parse failure.
        source: chrono::ParseError,
    },

    /// The range was empty or inverted.
    #[error("--end must be after --start")]
    EmptyRange,
}

/// Parses `--last` using the shared window grammar.
pub fn parse_last(input: &str) -> Result<Duration, TimeError> {
    let duration = parse_window(input).map_err(|_| TimeError::InvalidLast(input.to_string()))?;
    if duration <= Duration::zero() {
        return Err(TimeError::InvalidLast(input.to_string()));
    }
    Ok(duration)
}

/// Resolves the half-open window `[start, end)` to analyze.
///
/// When `last` is given it wins and the window ends at `now`; otherwise both
/// timestamps are required and the range must be non-empty.
pub fn resolve_window(
    start: &str,
    end: &str,
    last: Option<Duration>,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), TimeError> {
    if let Some(last) = last {
        if last <= Duration::zero() {
            return Err(TimeError::InvalidLast(last.to_string()));
        }
        return Ok((now - last, now));
    }

    if start.trim().is_empty() || end.trim().is_empty() {
        return Err(TimeError::MissingRange);
    }
    let start = parse_timestamp("--start", start)?;
    let end = parse_timestamp("--end", end)?;
    if end <= start {
        return Err(TimeError::EmptyRange);
    }
    Ok((start, end))
}

fn parse_timestamp(flag: &'static str, value: &str) -> Result<DateTime<Utc>, TimeError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| TimeError::InvalidTimestamp {
            flag,
            value: value.to_string(),
            source,
        })
}
