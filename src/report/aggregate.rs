//! Aggregation of multiple analysis results into one fleet report.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analyze::model::{AnalysisResult, ReportWindow, SloResult, Status, SCHEMA_VERSION};

/// Errors from reading and aggregating result files.
#[derive(Debug, Error)]
pub enum ReportError {
    /// An input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// The input path.
        path: String,
        /// The IO failure.
        source: std::io::Error,
    },

    /// An input file was not a valid result document.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// The input path.
        path: String,
        /// The JSON failure.
        source: serde_json::Error,
    },

    /// An input file carried no schema version.
    #[error("{0} has no schemaVersion; refusing to aggregate")]
    MissingSchemaVersion(String),

    /// No inputs were given or none survived reading.
    #[error("no result files to aggregate")]
    Empty,

    /// Writing an output file failed.
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// One service's merged view across all inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAggregate {
    /// Project the service lives in.
    pub project: String,

    /// Full service resource name.
    pub service: String,

    /// Worst status across the merged inputs.
    pub status: Status,

    /// Window from the first input for this service.
    pub window: ReportWindow,

    /// All SLO results, sorted by display name then resource name.
    pub slos: Vec<SloResult>,

    /// Problems carried over or discovered while merging.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// The merged fleet report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    /// Result schema version.
    pub schema_version: String,

    /// Input paths, in the order given.
    pub inputs: Vec<String>,

    /// Worst status across all services.
    pub status: Status,

    /// Per-service aggregates, ordered by project then service.
    pub services: Vec<ServiceAggregate>,

    /// Report-level problems.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Reads and decodes every input file, rejecting documents without a schema
/// version.
pub fn read_results(paths: &[String]) -> Result<Vec<(String, AnalysisResult)>, ReportError> {
    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = fs::read_to_string(Path::new(path)).map_err(|source| ReportError::Read {
            path: path.clone(),
            source,
        })?;
        let result: AnalysisResult =
            serde_json::from_str(&raw).map_err(|source| ReportError::Parse {
                path: path.clone(),
                source,
            })?;
        if result.schema_version.trim().is_empty() {
            return Err(ReportError::MissingSchemaVersion(path.clone()));
        }
        results.push((path.clone(), result));
    }
    Ok(results)
}

/// Merges results by `(project, service)`. Window mismatches within a group
/// are recorded as report-level warnings without degrading any status; the
/// first window wins. Per-result error strings are carried onto the group.
pub fn aggregate(results: &[(String, AnalysisResult)]) -> Result<AggregateResult, ReportError> {
    if results.is_empty() {
        return Err(ReportError::Empty);
    }

    let mut groups: BTreeMap<(String, String), ServiceAggregate> = BTreeMap::new();
    let mut errors = Vec::new();
    for (input, result) in results {
        let key = (result.project.clone(), result.service.clone());
        let entry = groups.entry(key).or_insert_with(|| ServiceAggregate {
            project: result.project.clone(),
            service: result.service.clone(),
            status: Status::Ok,
            window: result.window.clone(),
            slos: Vec::new(),
            errors: Vec::new(),
        });
        // A soft warning only; the first input's window stands for the group.
        if entry.window != result.window {
            errors.push(format!(
                "window mismatch for {}/{} between inputs",
                result.project, result.service
            ));
        }
        if !result.errors.is_empty() {
            errors.push(format!("{input}: {} error(s)", result.errors.len()));
        }
        entry.status = entry.status.merge(result.status);
        entry.slos.extend(result.slos.iter().cloned());
        entry.errors.extend(result.errors.iter().cloned());
    }

    let mut services: Vec<ServiceAggregate> = groups.into_values().collect();
    let mut status = Status::Ok;
    for service in &mut services {
        service.slos.sort_by(|a, b| {
            (a.display_name.as_str(), a.slo_resource_name.as_str())
                .cmp(&(b.display_name.as_str(), b.slo_resource_name.as_str()))
        });
        status = status.merge(service.status);
    }

    Ok(AggregateResult {
        schema_version: SCHEMA_VERSION.to_string(),
        inputs: results.iter().map(|(input, _)| input.clone()).collect(),
        status,
        services,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn window(day: u32) -> ReportWindow {
        let start = Utc.with_ymd_and_hms(2025, 5, day, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 5, day + 1, 0, 0, 0).unwrap();
        ReportWindow {
            start,
            end,
            duration_seconds: 86_400,
        }
    }

    fn result(service: &str, status: Status, day: u32) -> AnalysisResult {
        AnalysisResult {
            schema_version: SCHEMA_VERSION.to_string(),
            project: "acme-prod".to_string(),
            service: format!("projects/acme-prod/services/{service}"),
            window: window(day),
            status,
            slos: vec![],
            errors: vec![],
        }
    }

    #[test]
    fn test_aggregate_groups_and_merges_status() {
        let inputs = vec![
            ("a.json".to_string(), result("checkout", Status::Ok, 1)),
            ("b.json".to_string(), result("checkout", Status::Breach, 1)),
            ("c.json".to_string(), result("search", Status::Partial, 1)),
        ];
        let report = aggregate(&inputs).unwrap();
        assert_eq!(report.services.len(), 2);
        assert_eq!(report.status, Status::Breach);
        let checkout = &report.services[0];
        assert!(checkout.service.ends_with("checkout"));
        assert_eq!(checkout.status, Status::Breach);
    }

    #[test]
    fn test_window_mismatch_is_soft() {
        let inputs = vec![
            ("a.json".to_string(), result("checkout", Status::Ok, 1)),
            ("b.json".to_string(), result("checkout", Status::Ok, 2)),
        ];
        let report = aggregate(&inputs).unwrap();
        let checkout = &report.services[0];
        // The mismatch is a warning; statuses stay untouched.
        assert_eq!(checkout.status, Status::Ok);
        assert_eq!(report.status, Status::Ok);
        assert!(report.errors[0].starts_with("window mismatch"));
        // The first input's window stands for the group.
        assert_eq!(checkout.window, window(1));
    }

    #[test]
    fn test_input_errors_are_carried_and_counted() {
        let mut failing = result("checkout", Status::Partial, 1);
        failing.errors = vec!["x".to_string(), "y".to_string()];
        let inputs = vec![("a.json".to_string(), failing)];
        let report = aggregate(&inputs).unwrap();
        // The group keeps the raw error strings; the report counts them.
        assert_eq!(report.services[0].errors, vec!["x", "y"]);
        assert!(report.errors.iter().any(|e| e == "a.json: 2 error(s)"));
        assert_eq!(report.services[0].status, Status::Partial);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(matches!(aggregate(&[]), Err(ReportError::Empty)));
    }

    #[test]
    fn test_read_results_requires_schema_version() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("old.json");
        std::fs::write(
            &path,
            r#"{"project":"p","service":"s","window":{"start":"2025-05-01T00:00:00Z","end":"2025-05-02T00:00:00Z","durationSeconds":86400},"status":"ok","slos":[]}"#,
        )
        .unwrap();
        let err = read_results(&[path.to_string_lossy().to_string()]).unwrap_err();
        assert!(matches!(err, ReportError::MissingSchemaVersion(_)));
    }
}
