//! Parsing for the compact window grammar (`30d`, `1h`, `15m`) shared by SLO
//! windows, alert windows, and the analyzer's `--last` flag.

use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;
use thiserror::Error;

static WINDOW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)([smhdw])$").expect("window regex is valid"));

static THRESHOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(ms|s|m|h)$").expect("threshold regex is valid"));

/// Errors produced while parsing window or threshold strings.
#[derive(Debug, Error)]
pub enum WindowError {
    /// The window string was empty.
    #[error("window is empty")]
    Empty,

    /// The window string did not match the `<digits><unit>` grammar.
    #[error("invalid window {0:?}")]
    Invalid(String),

    /// The latency threshold string was empty or malformed.
    #[error("invalid threshold {0:?}")]
    InvalidThreshold(String),
}

/// Returns true when `window` matches the `^\d+[smhdw]$` grammar.
pub fn is_valid_window(window: &str) -> bool {
    !window.is_empty() && WINDOW_RE.is_match(window)
}

/// Returns true when `window` is one of the calendar-period windows.
pub fn is_calendar_window(window: &str) -> bool {
    matches!(window, "1d" | "1w" | "2w" | "30d")
}

/// Parses a window string into a duration.
pub fn parse_window(window: &str) -> Result<Duration, WindowError> {
    if window.is_empty() {
        return Err(WindowError::Empty);
    }
    let captures = WINDOW_RE
        .captures(window)
        .ok_or_else(|| WindowError::Invalid(window.to_string()))?;
    let amount: i64 = captures[1]
        .parse()
        .map_err(|_| WindowError::Invalid(window.to_string()))?;
    let duration = match &captures[2] {
        "s" => Duration::seconds(amount),
        "m" => Duration::minutes(amount),
        "h" => Duration::hours(amount),
        "d" => Duration::days(amount),
        "w" => Duration::weeks(amount),
        _ => return Err(WindowError::Invalid(window.to_string())),
    };
    Ok(duration)
}

/// Parses a latency threshold such as `500ms` or `1s` into seconds.
pub fn parse_threshold(threshold: &str) -> Result<f64, WindowError> {
    let trimmed = threshold.trim();
    if trimmed.is_empty() {
        return Err(WindowError::InvalidThreshold(threshold.to_string()));
    }
    let captures = THRESHOLD_RE
        .captures(trimmed)
        .ok_or_else(|| WindowError::InvalidThreshold(threshold.to_string()))?;
    let amount: f64 = captures[1]
        .parse()
        .map_err(|_| WindowError::InvalidThreshold(threshold.to_string()))?;
    let seconds = match &captures[2] {
        "ms" => amount / 1000.0,
        "s" => amount,
        "m" => amount * 60.0,
        "h" => amount * 3600.0,
        _ => return Err(WindowError::InvalidThreshold(threshold.to_string())),
    };
    Ok(seconds)
}
