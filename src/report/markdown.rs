//! Markdown rendering for analysis and aggregate results.

use std::fs;
use std::path::Path;

use crate::analyze::model::{AnalysisResult, SloResult};

use super::aggregate::{AggregateResult, ReportError};

fn write_file(path: &Path, body: String) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, body)?;
    Ok(())
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn slo_table(out: &mut String, slos: &[SloResult]) {
    out.push_str("| SLO | Goal | Compliance | Budget consumed | Status |\n");
    out.push_str("| --- | --- | --- | --- | --- |\n");
    for slo in slos {
        let name = if slo.display_name.is_empty() {
            slo.slo_id.as_str()
        } else {
            slo.display_name.as_str()
        };
        out.push_str(&format!(
            "| {name} | {} | {} | {:.2}% | {} |\n",
            percent(slo.goal),
            percent(slo.compliance),
            slo.consumed_percent_of_budget,
            slo.status
        ));
    }
}

fn errors_section(out: &mut String, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    out.push_str("\n## Errors\n\n");
    for error in errors {
        out.push_str(&format!("- {error}\n"));
    }
}

/// Writes the single-service summary. With `explain` set, each SLO's formula
/// and notes are appended.
pub fn write_markdown_summary(
    path: &Path,
    result: &AnalysisResult,
    explain: bool,
) -> Result<(), ReportError> {
    let mut out = String::new();
    out.push_str("# Error budget report\n\n");
    out.push_str(&format!("- Service: `{}`\n", result.service));
    out.push_str(&format!("- Project: `{}`\n", result.project));
    out.push_str(&format!(
        "- Window: {} to {} ({}s)\n",
        result.window.start.to_rfc3339(),
        result.window.end.to_rfc3339(),
        result.window.duration_seconds
    ));
    out.push_str(&format!("- Status: **{}**\n\n", result.status));

    slo_table(&mut out, &result.slos);

    if explain {
        let explained: Vec<&SloResult> = result
            .slos
            .iter()
            .filter(|slo| slo.explain.is_some())
            .collect();
        if !explained.is_empty() {
            out.push_str("\n## How the numbers were computed\n\n");
            for slo in explained {
                if let Some(detail) = &slo.explain {
                    out.push_str(&format!("### {}\n\n", slo.display_name));
                    out.push_str(&format!("`{}`\n", detail.formula));
                    for note in &detail.notes {
                        out.push_str(&format!("- {note}\n"));
                    }
                    out.push('\n');
                }
            }
        }
    }

    errors_section(&mut out, &result.errors);
    write_file(path, out)
}

/// Writes the fleet summary, one section per service.
pub fn write_aggregate_markdown(path: &Path, report: &AggregateResult) -> Result<(), ReportError> {
    let mut out = String::new();
    out.push_str("# Fleet error budget report\n\n");
    out.push_str(&format!("- Inputs: {}\n", report.inputs.len()));
    out.push_str(&format!("- Status: **{}**\n\n", report.status));

    out.push_str("| Service | Project | Status | SLOs |\n");
    out.push_str("| --- | --- | --- | --- |\n");
    for service in &report.services {
        out.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            service.service,
            service.project,
            service.status,
            service.slos.len()
        ));
    }

    for service in &report.services {
        out.push_str(&format!("\n## {}\n\n", service.service));
        out.push_str(&format!(
            "Window: {} to {}\n\n",
            service.window.start.to_rfc3339(),
            service.window.end.to_rfc3339()
        ));
        slo_table(&mut out, &service.slos);
        errors_section(&mut out, &service.errors);
    }

    errors_section(&mut out, &report.errors);
    write_file(path, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::model::{ReportWindow, Status, SCHEMA_VERSION};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            schema_version: SCHEMA_VERSION.to_string(),
            project: "acme-prod".to_string(),
            service: "projects/acme-prod/services/checkout-api".to_string(),
            window: ReportWindow {
                start: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2025, 5, 8, 0, 0, 0).unwrap(),
                duration_seconds: 604_800,
            },
            status: Status::Breach,
            slos: vec![SloResult {
                slo_resource_name:
                    "projects/acme-prod/services/checkout-api/serviceLevelObjectives/avail"
                        .to_string(),
                slo_id: "avail".to_string(),
                display_name: "availability".to_string(),
                goal: 0.999,
                rolling_period_days: 30,
                calendar_period: None,
                compliance: 0.995,
                bad_fraction: 0.005,
                allowed_bad_fraction: 0.001,
                consumed_percent_of_budget: 500.0,
                status: Status::Breach,
                explain: None,
                error: None,
            }],
            errors: vec!["something minor".to_string()],
        }
    }

    #[test]
    fn test_markdown_summary_renders_table_and_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.md");
        write_markdown_summary(&path, &sample_result(), false).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("| availability | 99.90% | 99.50% | 500.00% | breach |"));
        assert!(body.contains("- Status: **breach**"));
        assert!(body.contains("- something minor"));
    }

    #[test]
    fn test_aggregate_markdown_has_section_per_service() {
        let inputs = vec![("a.json".to_string(), sample_result())];
        let report = crate::report::aggregate::aggregate(&inputs).unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fleet.md");
        write_aggregate_markdown(&path, &report).unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("# Fleet error budget report"));
        assert!(body.contains("## projects/acme-prod/services/checkout-api"));
    }
}
