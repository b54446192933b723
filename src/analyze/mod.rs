//! Read-only error budget analysis over live monitoring data.
//!
//! The analyzer never writes to Cloud Monitoring. It lists the SLOs under a
//! service, fetches compliance for each over the requested window, and turns
//! the numbers into budget consumption with an explicit status per SLO.

pub mod compute;
pub mod fetch;
pub mod model;
pub mod service;
pub mod time;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
#[cfg(test)]
use mockall::automock;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::monitoring::BackendError;

use self::compute::{compute_budget, round4, BUDGET_FORMULA};
use self::model::{
    AnalysisResult, Explain, ReportWindow, SloResult, Sources, Status, SCHEMA_VERSION,
};
use self::service::{normalize_service, ServiceError};
use self::time::{resolve_window, TimeError};

/// Errors that abort an analysis run outright.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The analysis window could not be resolved.
    #[error(transparent)]
    Time(#[from] TimeError),

    /// The service flags could not be resolved.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Listing SLOs failed; without the list there is nothing to analyze.
    #[error("Failed to list SLOs: {0}")]
    Backend(#[from] BackendError),
}

/// An SLO as listed from the monitoring API.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSlo {
    /// Full resource name.
    pub name: String,
    /// Display name, empty when unset.
    pub display_name: String,
    /// Goal as a fraction in (0, 1].
    pub goal: f64,
    /// Rolling window length in days, zero for calendar SLOs.
    pub rolling_days: i64,
    /// Calendar period name for calendar SLOs.
    pub calendar: Option<String>,
    /// Top-level SLI kind, e.g. `requestBased`.
    pub sli_type: String,
    /// SLI method under the kind, e.g. `goodTotalRatio`.
    pub sli_method: String,
}

/// Read access to live SLO data.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Reader: Send + Sync {
    /// Lists up to `max` SLOs under a service resource name.
    async fn list_service_level_objectives(
        &self,
        service: &str,
        max: usize,
    ) -> Result<Vec<RemoteSlo>, BackendError>;

    /// Fetches the mean compliance fraction for an SLO over a window.
    async fn fetch_compliance(
        &self,
        slo_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, BackendError>;

    /// The endpoint queried, recorded in the result's sources.
    fn endpoint(&self) -> String;
}

/// Flags controlling an analysis run.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Target project; may be empty when `service` is a full resource name.
    pub project: String,
    /// Service ID or full resource name.
    pub service: String,
    /// RFC 3339 window start; ignored when `last` is set.
    pub start: String,
    /// RFC 3339 window end; ignored when `last` is set.
    pub end: String,
    /// Trailing window ending now; wins over start/end.
    pub last: Option<Duration>,
    /// Include the budget formula and notes per SLO.
    pub explain: bool,
    /// Listing cap passed to the reader.
    pub max_slos: usize,
    /// When set, only SLOs whose display name or resource name matches.
    pub only: Option<Regex>,
}

/// Default for [`Options::max_slos`].
pub const DEFAULT_MAX_SLOS: usize = 50;

/// The outcome of an analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// The result document.
    pub result: AnalysisResult,
    /// Where the data came from.
    pub sources: Sources,
}

/// Runs a full analysis. Per-SLO failures degrade the result instead of
/// aborting it; only window resolution and the initial listing are fatal.
pub async fn run(
    reader: &dyn Reader,
    options: &Options,
    now: DateTime<Utc>,
) -> Result<Analysis, AnalyzeError> {
    let (project, service) = normalize_service(&options.project, &options.service)?;
    let (start, end) = resolve_window(&options.start, &options.end, options.last, now)?;
    let max_slos = if options.max_slos == 0 {
        DEFAULT_MAX_SLOS
    } else {
        options.max_slos
    };

    info!(%service, %start, %end, "Analyzing error budgets.");
    let mut listed = reader
        .list_service_level_objectives(&service, max_slos)
        .await?;
    let listed_count = listed.len();

    if let Some(only) = &options.only {
        listed.retain(|slo| only.is_match(&slo.display_name) || only.is_match(&slo.name));
    }
    listed.sort_by(|a, b| {
        (a.display_name.as_str(), a.name.as_str()).cmp(&(b.display_name.as_str(), b.name.as_str()))
    });

    let mut errors = Vec::new();
    let mut slos = Vec::with_capacity(listed.len());
    let mut status = Status::Ok;
    for remote in &listed {
        let result = analyze_slo(reader, remote, start, end, options.explain).await;
        // Breaches are findings, not failures; only degraded SLOs land in
        // the error list.
        if let Some(error) = &result.error {
            if result.status != Status::Breach {
                errors.push(format!("{}: {error}", result_label(&result)));
            }
        }
        status = status.merge(result.status);
        slos.push(result);
    }

    if !errors.is_empty() {
        status = status.merge(Status::Partial);
    }

    let result = AnalysisResult {
        schema_version: SCHEMA_VERSION.to_string(),
        project,
        service,
        window: ReportWindow {
            start,
            end,
            duration_seconds: (end - start).num_seconds(),
        },
        status,
        slos,
        errors,
    };
    let sources = Sources {
        endpoint: reader.endpoint(),
        slos_listed: listed_count,
        slos_analyzed: result.slos.len(),
    };
    Ok(Analysis { result, sources })
}

fn result_label(result: &SloResult) -> &str {
    if result.display_name.is_empty() {
        &result.slo_resource_name
    } else {
        &result.display_name
    }
}

fn slo_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

fn supported_sli(remote: &RemoteSlo) -> bool {
    remote.sli_type == "requestBased"
        && matches!(remote.sli_method.as_str(), "goodTotalRatio" | "distributionCut")
}

async fn analyze_slo(
    reader: &dyn Reader,
    remote: &RemoteSlo,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    explain: bool,
) -> SloResult {
    let mut base = SloResult {
        slo_resource_name: remote.name.clone(),
        slo_id: slo_id(&remote.name),
        display_name: remote.display_name.clone(),
        goal: round4(remote.goal),
        rolling_period_days: remote.rolling_days,
        calendar_period: remote.calendar.clone(),
        compliance: 0.0,
        bad_fraction: 0.0,
        allowed_bad_fraction: round4(1.0 - remote.goal),
        consumed_percent_of_budget: 0.0,
        status: Status::Ok,
        explain: None,
        error: None,
    };

    if !supported_sli(remote) {
        warn!(slo = %remote.name, sli_type = %remote.sli_type, "Skipping unsupported SLI.");
        base.status = Status::Partial;
        base.error = Some(format!(
            "unsupported SLI ({}/{}); only request-based good-total-ratio and distribution-cut are analyzed",
            remote.sli_type, remote.sli_method
        ));
        return base;
    }

    let compliance = match reader.fetch_compliance(&remote.name, start, end).await {
        Ok(compliance) => compliance,
        Err(err) => {
            base.status = Status::Error;
            base.error = Some(format!("failed to fetch compliance: {err}"));
            return base;
        }
    };

    let budget = compute_budget(remote.goal, compliance);
    base.compliance = budget.compliance;
    base.bad_fraction = budget.bad_fraction;
    base.allowed_bad_fraction = budget.allowed_bad_fraction;
    base.consumed_percent_of_budget = budget.consumed_percent;
    base.status = budget.status;
    if matches!(budget.status, Status::Partial | Status::Breach) {
        base.error = budget.notes.last().cloned();
    }
    if explain {
        base.explain = Some(Explain {
            formula: BUDGET_FORMULA.to_string(),
            notes: budget.notes,
        });
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockall::predicate::eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn options() -> Options {
        Options {
            project: "acme-prod".to_string(),
            service: "checkout-api".to_string(),
            last: Some(Duration::days(7)),
            ..Default::default()
        }
    }

    fn remote(name: &str, display: &str, goal: f64) -> RemoteSlo {
        RemoteSlo {
            name: format!("projects/acme-prod/services/checkout-api/serviceLevelObjectives/{name}"),
            display_name: display.to_string(),
            goal,
            rolling_days: 30,
            calendar: None,
            sli_type: "requestBased".to_string(),
            sli_method: "goodTotalRatio".to_string(),
        }
    }

    fn reader_with(slos: Vec<RemoteSlo>) -> MockReader {
        let mut reader = MockReader::new();
        reader
            .expect_list_service_level_objectives()
            .with(eq("projects/acme-prod/services/checkout-api"), eq(DEFAULT_MAX_SLOS))
            .returning(move |_, _| Ok(slos.clone()));
        reader
            .expect_endpoint()
            .returning(|| "https://monitoring.googleapis.com".to_string());
        reader
    }

    #[tokio::test]
    async fn test_breach_dominates() {
        let mut reader = reader_with(vec![
            remote("avail", "availability", 0.999),
            remote("lat", "latency", 0.99),
        ]);
        reader.expect_fetch_compliance().returning(|name, _, _| {
            if name.ends_with("avail") {
                Ok(0.995)
            } else {
                Ok(0.999)
            }
        });

        let analysis = run(&reader, &options(), now()).await.unwrap();
        assert_eq!(analysis.result.status, Status::Breach);
        assert_eq!(analysis.result.slos.len(), 2);
        // Sorted by display name: availability first.
        assert_eq!(analysis.result.slos[0].display_name, "availability");
        assert_eq!(analysis.result.slos[0].consumed_percent_of_budget, 500.0);
        assert_eq!(analysis.result.slos[0].status, Status::Breach);
        assert_eq!(
            analysis.result.slos[0].error.as_deref(),
            Some("error budget exceeded in window")
        );
        // A breach is a finding, not an analysis failure.
        assert!(analysis.result.errors.is_empty());
        assert_eq!(analysis.result.slos[1].status, Status::Ok);
        assert_eq!(analysis.sources.slos_analyzed, 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_partial() {
        let mut reader = reader_with(vec![remote("avail", "availability", 0.999)]);
        reader.expect_fetch_compliance().returning(|name, _, _| {
            Err(BackendError::NotFound(format!(
                "no compliance points returned for {name}"
            )))
        });

        let analysis = run(&reader, &options(), now()).await.unwrap();
        assert_eq!(analysis.result.slos[0].status, Status::Error);
        assert_eq!(analysis.result.status, Status::Partial);
        assert!(!analysis.result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_sli_is_partial_without_fetch() {
        let mut slo = remote("win", "windowed", 0.999);
        slo.sli_type = "windowsBased".to_string();
        slo.sli_method = "goodBadMetricFilter".to_string();
        let mut reader = reader_with(vec![slo]);
        reader.expect_fetch_compliance().never();

        let analysis = run(&reader, &options(), now()).await.unwrap();
        assert_eq!(analysis.result.status, Status::Partial);
        let result = &analysis.result.slos[0];
        assert!(result.error.as_deref().unwrap_or("").contains("unsupported SLI"));
    }

    #[tokio::test]
    async fn test_only_filter() {
        let mut opts = options();
        opts.only = Some(Regex::new("latency").unwrap());
        let mut reader = reader_with(vec![
            remote("avail", "availability", 0.999),
            remote("lat", "latency", 0.99),
        ]);
        reader
            .expect_fetch_compliance()
            .times(1)
            .returning(|_, _, _| Ok(0.999));

        let analysis = run(&reader, &opts, now()).await.unwrap();
        assert_eq!(analysis.result.slos.len(), 1);
        assert_eq!(analysis.result.slos[0].display_name, "latency");
        assert_eq!(analysis.sources.slos_listed, 2);
    }

    #[tokio::test]
    async fn test_empty_listing_is_ok() {
        let reader = reader_with(vec![]);
        let analysis = run(&reader, &options(), now()).await.unwrap();
        assert_eq!(analysis.result.status, Status::Ok);
        assert!(analysis.result.slos.is_empty());
        assert!(analysis.result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_max_slos_is_passed_to_the_reader() {
        let mut opts = options();
        opts.max_slos = 1;
        let mut reader = MockReader::new();
        reader
            .expect_list_service_level_objectives()
            .with(eq("projects/acme-prod/services/checkout-api"), eq(1usize))
            .returning(|_, _| Ok(vec![]));
        reader
            .expect_endpoint()
            .returning(|| "https://monitoring.googleapis.com".to_string());

        let analysis = run(&reader, &opts, now()).await.unwrap();
        assert_eq!(analysis.result.status, Status::Ok);
    }

    #[tokio::test]
    async fn test_explain_carries_formula_and_notes() {
        let mut opts = options();
        opts.explain = true;
        let mut reader = reader_with(vec![remote("avail", "availability", 0.999)]);
        reader
            .expect_fetch_compliance()
            .returning(|_, _, _| Ok(1.2));

        let analysis = run(&reader, &opts, now()).await.unwrap();
        let explain = analysis.result.slos[0].explain.as_ref().unwrap();
        assert_eq!(explain.formula, BUDGET_FORMULA);
        assert!(explain.notes.iter().any(|n| n == "compliance clamped to 1"));
    }
}
