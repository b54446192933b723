//! Human-readable rendering of a plan for `plan` and `--dry-run`.

use std::io::{self, Write};

use crate::spec::model::Period;

use super::Plan;

/// Writes a readable summary of everything the plan would reconcile.
pub fn render_plan(out: &mut dyn Write, plan: &Plan) -> io::Result<()> {
    writeln!(
        out,
        "Plan for service {:?} in project {:?}",
        plan.service_name, plan.project
    )?;
    writeln!(out)?;
    writeln!(out, "Service: {} (template: {})", plan.service_id, plan.service)?;
    let labels: Vec<String> = plan
        .labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    writeln!(out, "Labels: {}", labels.join(", "))?;
    writeln!(out)?;

    writeln!(out, "SLOs ({}):", plan.slos.len())?;
    for slo in &plan.slos {
        let period = match slo.period {
            Period::Rolling => "rolling",
            Period::Calendar => "calendar",
        };
        writeln!(
            out,
            "  - {} ({}): {}% over {} ({period})",
            slo.display_name, slo.id, slo.objective, slo.window
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Alerts ({}):", plan.alerts.len())?;
    for alert in &plan.alerts {
        writeln!(
            out,
            "  - {} ({}): {} x{} over {}/{}, severity {}",
            alert.display_name,
            alert.id,
            alert.alert_type,
            alert.burn_rate,
            alert.windows[0],
            alert.windows[1],
            alert.severity
        )?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "Dashboard: {} ({})",
        plan.dashboard.display_name, plan.dashboard.id
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{build, Options};
    use crate::spec::model::{
        Metadata, MetricRef, Sli, Slo, SloAlerting, Spec, API_VERSION_V1, KIND_SERVICE_SLO,
    };

    fn sample_plan() -> Plan {
        let spec = Spec {
            api_version: API_VERSION_V1.to_string(),
            kind: KIND_SERVICE_SLO.to_string(),
            metadata: Metadata {
                name: "checkout-api".to_string(),
                service: "cloud-run".to_string(),
                project: "acme-prod".to_string(),
                labels: Default::default(),
                runbook: String::new(),
            },
            alerting: Default::default(),
            slos: vec![Slo {
                name: "availability".to_string(),
                objective: 99.9,
                window: "30d".to_string(),
                period: None,
                sli: Sli::RequestBased {
                    good: MetricRef {
                        metric: "run.googleapis.com/request_count".to_string(),
                        filter: "resource.type=\"cloud_run_revision\"".to_string(),
                    },
                    total: MetricRef {
                        metric: "run.googleapis.com/request_count".to_string(),
                        filter: String::new(),
                    },
                },
                alerting: SloAlerting::default(),
            }],
        };
        build(&spec, &Options::default())
    }

    #[test]
    fn test_render_plan_mentions_every_resource() {
        let plan = sample_plan();
        let mut buffer = Vec::new();
        render_plan(&mut buffer, &plan).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("Plan for service \"checkout-api\" in project \"acme-prod\""));
        assert!(text.contains("checkout-api-availability"));
        assert!(text.contains("fast-burn"));
        assert!(text.contains("slow-burn"));
        assert!(text.contains("checkout-api-dashboard"));
        assert!(text.contains("managed-by=margin"));
    }
}
