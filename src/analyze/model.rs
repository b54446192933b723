//! Serialized shapes for analysis results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema version stamped on every result document.
pub const SCHEMA_VERSION: &str = "1.1";

/// Health status for an SLO, a service, or a whole report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Budget healthy and all data available.
    Ok,
    /// Some SLOs could not be fully analyzed.
    Partial,
    /// Analysis failed for at least one SLO.
    Error,
    /// The error budget is exhausted.
    Breach,
}

impl Status {
    fn rank(self) -> u8 {
        match self {
            Status::Breach => 3,
            Status::Partial | Status::Error => 2,
            Status::Ok => 1,
        }
    }

    /// Combines two statuses, keeping the worse one. Breach dominates;
    /// partial and error both outrank ok.
    pub fn merge(self, other: Status) -> Status {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Status::Ok => "ok",
            Status::Partial => "partial",
            Status::Error => "error",
            Status::Breach => "breach",
        };
        write!(f, "{text}")
    }
}

/// The analyzed window, resolved to concrete instants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWindow {
    /// Inclusive start of the window.
    pub start: DateTime<Utc>,

    /// Exclusive end of the window.
    pub end: DateTime<Utc>,

    /// Window length in seconds.
    pub duration_seconds: i64,
}

/// Error budget math for one SLO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloResult {
    /// Full resource name of the SLO.
    pub slo_resource_name: String,

    /// Trailing ID segment of the resource name.
    pub slo_id: String,

    /// Display name, empty when unset.
    pub display_name: String,

    /// Goal as a fraction in (0, 1].
    pub goal: f64,

    /// Rolling window length in days, zero for calendar SLOs.
    pub rolling_period_days: i64,

    /// Calendar period name for calendar SLOs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_period: Option<String>,

    /// Measured compliance fraction over the window.
    pub compliance: f64,

    /// Bad fraction: `1 - compliance`.
    pub bad_fraction: f64,

    /// Allowed bad fraction: `1 - goal`.
    pub allowed_bad_fraction: f64,

    /// Budget consumed over the window, as a percentage.
    pub consumed_percent_of_budget: f64,

    /// Status for this SLO alone.
    pub status: Status,

    /// Formula and notes, present with `--explain`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<Explain>,

    /// Failure detail when this SLO could not be analyzed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The budget formula and any adjustments applied while computing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explain {
    /// The budget formula, spelled out.
    pub formula: String,

    /// Notes about clamping or unsupported shapes.
    pub notes: Vec<String>,
}

/// Where the analyzed data came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sources {
    /// Monitoring API endpoint queried.
    pub endpoint: String,

    /// Number of SLOs listed before filtering.
    pub slos_listed: usize,

    /// Number of SLOs analyzed after filtering and the cap.
    pub slos_analyzed: usize,
}

/// A full analysis result for one service over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Result schema version; always [`SCHEMA_VERSION`] on write.
    #[serde(default)]
    pub schema_version: String,

    /// Project the service lives in.
    pub project: String,

    /// Full resource name of the analyzed service.
    pub service: String,

    /// The analyzed window.
    pub window: ReportWindow,

    /// Worst status across all SLOs, escalated to at least partial when
    /// any errors occurred.
    pub status: Status,

    /// Per-SLO results, sorted by display name then resource name.
    pub slos: Vec<SloResult>,

    /// Non-fatal problems encountered during analysis.
    #[serde(default)]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_merge_lattice() {
        assert_eq!(Status::Ok.merge(Status::Ok), Status::Ok);
        assert_eq!(Status::Ok.merge(Status::Partial), Status::Partial);
        assert_eq!(Status::Partial.merge(Status::Breach), Status::Breach);
        assert_eq!(Status::Breach.merge(Status::Error), Status::Breach);
        // Partial and error share a rank; the left side wins ties.
        assert_eq!(Status::Partial.merge(Status::Error), Status::Partial);
        assert_eq!(Status::Error.merge(Status::Partial), Status::Error);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Breach).unwrap(), "\"breach\"");
        assert_eq!(
            serde_json::from_str::<Status>("\"partial\"").unwrap(),
            Status::Partial
        );
    }
}
