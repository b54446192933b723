//! Typed model for the `margin/v1` `ServiceSLO` specification document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The only accepted `apiVersion` value.
pub const API_VERSION_V1: &str = "margin/v1";

/// The only accepted `kind` value.
pub const KIND_SERVICE_SLO: &str = "ServiceSLO";

/// A loaded SLO specification. Immutable once loaded; every invocation
/// re-derives everything it needs from this document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    /// Document schema version; must equal [`API_VERSION_V1`].
    pub api_version: String,

    /// Document kind; must equal [`KIND_SERVICE_SLO`].
    pub kind: String,

    /// Service identity, project, labels, and runbook.
    pub metadata: Metadata,

    /// Optional alerting overrides that apply to the whole document.
    #[serde(default)]
    pub alerting: Alerting,

    /// The ordered list of SLOs to manage.
    #[serde(default)]
    pub slos: Vec<Slo>,
}

/// Identity and shared attributes for the managed service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Human-chosen service name; the source of all derived resource IDs.
    pub name: String,

    /// Service template type (e.g. `cloud-run`); must name a known template.
    pub service: String,

    /// GCP project ID. May be overridden by `--project`.
    #[serde(default)]
    pub project: String,

    /// Labels attached to every managed resource.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Runbook URL included in alert documentation.
    #[serde(default)]
    pub runbook: String,
}

/// Document-level alerting configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alerting {
    /// Monitored-resource type used in burn-rate alert filters. Defaults to
    /// `global` when empty.
    #[serde(default)]
    pub burn_rate_resource_type: String,
}

/// A single service level objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slo {
    /// SLO name, unique within the document.
    pub name: String,

    /// Target compliance percentage, strictly between 0 and 100.
    pub objective: f64,

    /// Compliance window, e.g. `30d`.
    pub window: String,

    /// Period kind. Absent means rolling.
    #[serde(default)]
    pub period: Option<Period>,

    /// The measurement backing this SLO.
    pub sli: Sli,

    /// Optional per-SLO alert overrides.
    #[serde(default)]
    pub alerting: SloAlerting,
}

/// How the SLO window is anchored in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// A rolling window ending now.
    Rolling,
    /// A calendar-aligned window (day, week, fortnight, month).
    Calendar,
}

/// A service level indicator. The closed variant set replaces the original
/// string-tagged struct so the type checker enforces shape per SLI kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Sli {
    /// Ratio of good requests to total requests.
    RequestBased {
        /// Metric counting good events.
        good: MetricRef,
        /// Metric counting all events.
        total: MetricRef,
    },
    /// Fraction of requests under a latency threshold, cut from a
    /// distribution metric.
    Latency {
        /// The latency distribution metric.
        metric: String,
        /// Optional additional filter clause.
        #[serde(default)]
        filter: String,
        /// Latency threshold, e.g. `500ms` or `1s`.
        threshold: String,
    },
}

/// A metric reference with an optional filter clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRef {
    /// Fully qualified metric type name.
    pub metric: String,

    /// Monitoring filter clause restricting the metric.
    #[serde(default)]
    pub filter: String,
}

/// Per-SLO burn-rate alert overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SloAlerting {
    /// Replacement for the fast-burn profile, applied wholesale.
    #[serde(default)]
    pub fast: Option<AlertOverride>,

    /// Replacement for the slow-burn profile, applied wholesale.
    #[serde(default)]
    pub slow: Option<AlertOverride>,
}

/// A replacement burn-rate alert profile. When present it replaces the
/// corresponding default pair entirely; there is no partial override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertOverride {
    /// Exactly two windows, ordered short then long.
    #[serde(default)]
    pub windows: Vec<String>,

    /// Burn-rate threshold, at least 1.
    #[serde(default)]
    pub burn_rate: f64,
}
