//! Deterministic planning: turns a validated spec into the full set of
//! resources to reconcile.
//!
//! The plan is a pure function of the spec document and the invocation
//! options. Building the same spec twice yields byte-identical plans; all
//! label maps are ordered.

pub mod render;

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::model::{Period, Sli, Spec};

/// Label stamped on every managed resource.
pub const MANAGED_BY_LABEL: &str = "managed-by";

/// Value of the [`MANAGED_BY_LABEL`] label.
pub const MANAGED_BY_VALUE: &str = "margin";

/// Label carrying the spec's service name on every managed resource.
pub const SERVICE_NAME_LABEL: &str = "service-name";

/// Default monitored-resource type for burn-rate alert filters.
pub const DEFAULT_BURN_RATE_RESOURCE_TYPE: &str = "global";

/// Burn-rate profile applied to every SLO unless overridden.
struct AlertProfile {
    windows: [&'static str; 2],
    burn_rate: f64,
    severity: Severity,
}

const FAST_BURN: AlertProfile = AlertProfile {
    windows: ["5m", "1h"],
    burn_rate: 14.4,
    severity: Severity::Page,
};

const SLOW_BURN: AlertProfile = AlertProfile {
    windows: ["30m", "6h"],
    burn_rate: 6.0,
    severity: Severity::Ticket,
};

/// Invocation options that influence planning.
#[derive(Debug, Default, Clone)]
pub struct Options {
    /// Overrides `metadata.project` when non-empty.
    pub project_override: String,

    /// Extra labels merged over the spec's labels.
    pub labels: BTreeMap<String, String>,
}

/// Everything the reconciler will create or update, in apply order.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Target GCP project ID.
    pub project: String,

    /// Service template key from `metadata.service`.
    pub service: String,

    /// Slug identifier for the monitoring service resource.
    pub service_id: String,

    /// Human-readable service name from `metadata.name`.
    pub service_name: String,

    /// Monitored-resource type used in burn-rate alert filters.
    pub burn_rate_resource_type: String,

    /// Labels applied to every managed resource, in key order.
    pub labels: BTreeMap<String, String>,

    /// SLOs in spec order.
    pub slos: Vec<SloPlan>,

    /// Burn-rate alerts, a fast/slow pair per SLO in spec order.
    pub alerts: Vec<AlertPlan>,

    /// The single service dashboard.
    pub dashboard: DashboardPlan,
}

/// A single SLO to reconcile.
#[derive(Debug, Clone, PartialEq)]
pub struct SloPlan {
    /// Logical identifier, `{service name}-{slo name}` verbatim.
    pub id: String,

    /// Slug of [`SloPlan::id`], used as the SLO resource ID on create.
    pub resource_id: String,

    /// Display name, equal to [`SloPlan::id`]; the idempotency key against
    /// live state.
    pub display_name: String,

    /// SLO name from the spec.
    pub name: String,

    /// Target compliance percentage.
    pub objective: f64,

    /// Compliance window, e.g. `30d`.
    pub window: String,

    /// Resolved period kind; absent in the spec means rolling.
    pub period: Period,

    /// The measurement backing this SLO.
    pub sli: Sli,

    /// Labels for this SLO resource.
    pub labels: BTreeMap<String, String>,

    /// Runbook URL, empty when the spec has none.
    pub runbook: String,
}

/// Burn-rate alert kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    /// Short-window, high-threshold paging alert.
    FastBurn,
    /// Long-window, low-threshold ticketing alert.
    SlowBurn,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertType::FastBurn => write!(f, "fast-burn"),
            AlertType::SlowBurn => write!(f, "slow-burn"),
        }
    }
}

/// Notification severity for a burn-rate alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Wake someone up.
    Page,
    /// File a ticket.
    Ticket,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Page => write!(f, "page"),
            Severity::Ticket => write!(f, "ticket"),
        }
    }
}

/// A burn-rate alert policy to reconcile.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPlan {
    /// Logical identifier, `{service name}-{slo name}-{alert type}` verbatim.
    pub id: String,

    /// Display name, equal to the identifier; the idempotency key against
    /// live state.
    pub display_name: String,

    /// Name of the SLO this alert watches.
    pub slo_name: String,

    /// Fast or slow burn.
    pub alert_type: AlertType,

    /// Two evaluation windows, short then long.
    pub windows: [String; 2],

    /// Burn-rate threshold.
    pub burn_rate: f64,

    /// Notification severity.
    pub severity: Severity,

    /// Labels for this alert policy.
    pub labels: BTreeMap<String, String>,

    /// Runbook URL included in the alert documentation.
    pub runbook: String,

    /// One-line alert description.
    pub description: String,

    /// Monitored-resource type used in the burn-rate filter.
    pub burn_rate_resource_type: String,
}

/// The service dashboard to reconcile.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardPlan {
    /// Logical identifier, `{service name}-dashboard` verbatim.
    pub id: String,

    /// Display name, used as the idempotency key against live state.
    pub display_name: String,

    /// Service template key, used to pick dashboard content.
    pub service: String,

    /// Labels for the dashboard resource.
    pub labels: BTreeMap<String, String>,
}

/// Builds the full plan for a validated spec. Deterministic: the output
/// depends only on the arguments.
pub fn build(spec: &Spec, options: &Options) -> Plan {
    let project = if options.project_override.trim().is_empty() {
        spec.metadata.project.clone()
    } else {
        options.project_override.trim().to_string()
    };

    let mut labels = spec.metadata.labels.clone();
    for (key, value) in &options.labels {
        labels.insert(key.clone(), value.clone());
    }
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
    labels.insert(
        SERVICE_NAME_LABEL.to_string(),
        spec.metadata.name.clone(),
    );

    let burn_rate_resource_type = if spec.alerting.burn_rate_resource_type.trim().is_empty() {
        DEFAULT_BURN_RATE_RESOURCE_TYPE.to_string()
    } else {
        spec.alerting.burn_rate_resource_type.trim().to_string()
    };

    let service_id = sanitize_id(&spec.metadata.name);

    let mut slos = Vec::with_capacity(spec.slos.len());
    let mut alerts = Vec::with_capacity(spec.slos.len() * 2);
    for slo in &spec.slos {
        let slo_id = format!("{}-{}", spec.metadata.name, slo.name);
        slos.push(SloPlan {
            resource_id: sanitize_id(&slo_id),
            display_name: slo_id.clone(),
            id: slo_id,
            name: slo.name.clone(),
            objective: slo.objective,
            window: slo.window.clone(),
            period: slo.period.unwrap_or(Period::Rolling),
            sli: slo.sli.clone(),
            labels: labels.clone(),
            runbook: spec.metadata.runbook.trim().to_string(),
        });

        for (profile, override_, alert_type) in [
            (&FAST_BURN, slo.alerting.fast.as_ref(), AlertType::FastBurn),
            (&SLOW_BURN, slo.alerting.slow.as_ref(), AlertType::SlowBurn),
        ] {
            let (windows, burn_rate) = match override_ {
                Some(o) if o.windows.len() == 2 => (
                    [o.windows[0].clone(), o.windows[1].clone()],
                    o.burn_rate,
                ),
                _ => (
                    [profile.windows[0].to_string(), profile.windows[1].to_string()],
                    profile.burn_rate,
                ),
            };
            let alert_id = format!("{}-{}-{alert_type}", spec.metadata.name, slo.name);
            alerts.push(AlertPlan {
                display_name: alert_id.clone(),
                id: alert_id,
                slo_name: slo.name.clone(),
                alert_type,
                windows,
                burn_rate,
                severity: profile.severity,
                labels: labels.clone(),
                runbook: spec.metadata.runbook.trim().to_string(),
                description: format!("{alert_type} burn alert for {}", slo.name),
                burn_rate_resource_type: burn_rate_resource_type.clone(),
            });
        }
    }

    let dashboard = DashboardPlan {
        id: format!("{}-dashboard", spec.metadata.name),
        display_name: format!("{} service dashboard", spec.metadata.name),
        service: spec.metadata.service.clone(),
        labels: labels.clone(),
    };

    Plan {
        project,
        service: spec.metadata.service.clone(),
        service_id,
        service_name: spec.metadata.name.clone(),
        burn_rate_resource_type,
        labels,
        slos,
        alerts,
        dashboard,
    }
}

/// Lowercases `input` and collapses every run of non-alphanumeric characters
/// into a single `-`, trimming leading and trailing dashes. An input with no
/// usable characters yields `service`.
pub fn sanitize_id(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() {
        "service".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::model::{
        AlertOverride, Metadata, MetricRef, Slo, SloAlerting, API_VERSION_V1, KIND_SERVICE_SLO,
    };

    fn spec_with_slos(slos: Vec<Slo>) -> Spec {
        Spec {
            api_version: API_VERSION_V1.to_string(),
            kind: KIND_SERVICE_SLO.to_string(),
            metadata: Metadata {
                name: "Checkout API".to_string(),
                service: "cloud-run".to_string(),
                project: "acme-prod".to_string(),
                labels: BTreeMap::from([("team".to_string(), "payments".to_string())]),
                runbook: "https://example.com/runbook".to_string(),
            },
            alerting: Default::default(),
            slos,
        }
    }

    fn availability_slo() -> Slo {
        Slo {
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
        }
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("Checkout API"), "checkout-api");
        assert_eq!(sanitize_id("  weird__name!! "), "weird-name");
        assert_eq!(sanitize_id("!!!"), "service");
        assert_eq!(sanitize_id("already-clean"), "already-clean");
    }

    #[test]
    fn test_build_is_deterministic() {
        let spec = spec_with_slos(vec![availability_slo()]);
        let options = Options::default();
        assert_eq!(build(&spec, &options), build(&spec, &options));
    }

    #[test]
    fn test_build_forces_ownership_labels() {
        let spec = spec_with_slos(vec![availability_slo()]);
        let options = Options {
            labels: BTreeMap::from([
                ("env".to_string(), "prod".to_string()),
                (MANAGED_BY_LABEL.to_string(), "someone-else".to_string()),
            ]),
            ..Default::default()
        };
        let plan = build(&spec, &options);
        assert_eq!(
            plan.labels.get(MANAGED_BY_LABEL).map(String::as_str),
            Some(MANAGED_BY_VALUE)
        );
        assert_eq!(
            plan.labels.get(SERVICE_NAME_LABEL).map(String::as_str),
            Some("Checkout API")
        );
        assert_eq!(plan.labels.get("env").map(String::as_str), Some("prod"));
        assert_eq!(plan.labels.get("team").map(String::as_str), Some("payments"));
    }

    #[test]
    fn test_build_default_alert_pair_per_slo() {
        let spec = spec_with_slos(vec![availability_slo()]);
        let plan = build(&spec, &Options::default());

        assert_eq!(plan.service_id, "checkout-api");
        assert_eq!(plan.slos.len(), 1);
        assert_eq!(plan.slos[0].id, "Checkout API-availability");
        assert_eq!(plan.slos[0].resource_id, "checkout-api-availability");
        assert_eq!(plan.slos[0].display_name, "Checkout API-availability");

        assert_eq!(plan.alerts.len(), 2);
        let fast = &plan.alerts[0];
        assert_eq!(fast.alert_type, AlertType::FastBurn);
        assert_eq!(fast.windows, ["5m".to_string(), "1h".to_string()]);
        assert_eq!(fast.burn_rate, 14.4);
        assert_eq!(fast.severity, Severity::Page);
        assert_eq!(fast.id, "Checkout API-availability-fast-burn");
        assert_eq!(fast.display_name, fast.id);

        let slow = &plan.alerts[1];
        assert_eq!(slow.alert_type, AlertType::SlowBurn);
        assert_eq!(slow.windows, ["30m".to_string(), "6h".to_string()]);
        assert_eq!(slow.burn_rate, 6.0);
        assert_eq!(slow.severity, Severity::Ticket);

        assert_eq!(plan.dashboard.id, "Checkout API-dashboard");
        assert_eq!(plan.dashboard.display_name, "Checkout API service dashboard");
    }

    #[test]
    fn test_display_names_are_hyphen_joined() {
        // Display-name equality is the idempotency key against live state,
        // so the derivation must stay stable across releases.
        let mut spec = spec_with_slos(vec![availability_slo()]);
        spec.metadata.name = "checkout-api".to_string();
        let plan = build(&spec, &Options::default());

        assert_eq!(plan.slos[0].display_name, "checkout-api-availability");
        assert_eq!(plan.slos[0].display_name, plan.slos[0].id);
        assert_eq!(
            plan.alerts[0].display_name,
            "checkout-api-availability-fast-burn"
        );
        assert_eq!(
            plan.alerts[1].display_name,
            "checkout-api-availability-slow-burn"
        );
        assert_eq!(plan.dashboard.id, "checkout-api-dashboard");
    }

    #[test]
    fn test_build_applies_per_slo_overrides() {
        let mut slo = availability_slo();
        slo.alerting.fast = Some(AlertOverride {
            windows: vec!["2m".to_string(), "30m".to_string()],
            burn_rate: 20.0,
        });
        let spec = spec_with_slos(vec![slo]);
        let plan = build(&spec, &Options::default());

        let fast = &plan.alerts[0];
        assert_eq!(fast.windows, ["2m".to_string(), "30m".to_string()]);
        assert_eq!(fast.burn_rate, 20.0);
        // Severity stays with the profile even when overridden.
        assert_eq!(fast.severity, Severity::Page);

        let slow = &plan.alerts[1];
        assert_eq!(slow.windows, ["30m".to_string(), "6h".to_string()]);
        assert_eq!(slow.burn_rate, 6.0);
    }

    #[test]
    fn test_build_project_override() {
        let spec = spec_with_slos(vec![availability_slo()]);
        let plan = build(
            &spec,
            &Options {
                project_override: "acme-staging".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(plan.project, "acme-staging");
    }

    #[test]
    fn test_alerts_follow_slo_order() {
        let mut latency = availability_slo();
        latency.name = "latency".to_string();
        let spec = spec_with_slos(vec![availability_slo(), latency]);
        let plan = build(&spec, &Options::default());
        let ids: Vec<&str> = plan.alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "Checkout API-availability-fast-burn",
                "Checkout API-availability-slow-burn",
                "Checkout API-latency-fast-burn",
                "Checkout API-latency-slow-burn",
            ]
        );
    }
}
