//! Structural and semantic validation for loaded specifications.
//!
//! Validation collects every violation before reporting, so an operator can
//! fix a spec in one pass instead of replaying the tool error by error.

use chrono::Duration;
use thiserror::Error;
use url::Url;

use super::{
    model::{AlertOverride, Period, Sli, Spec, API_VERSION_V1, KIND_SERVICE_SLO},
    templates::{template_for_service, ServiceTemplate},
    window::{is_calendar_window, is_valid_window, parse_threshold, parse_window},
};

/// A spec failed one or more invariants. Every violation found is listed.
#[derive(Debug, Error)]
#[error("invalid spec: {}", reasons.join("; "))]
pub struct ValidationError {
    /// All violations found, in document order.
    pub reasons: Vec<String>,
}

impl Spec {
    /// Checks every invariant the rest of the pipeline relies on. Returns all
    /// violations at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut reasons = Vec::new();

        if self.api_version != API_VERSION_V1 {
            reasons.push(format!("apiVersion must be {API_VERSION_V1:?}"));
        }
        if self.kind != KIND_SERVICE_SLO {
            reasons.push(format!("kind must be {KIND_SERVICE_SLO:?}"));
        }
        if self.metadata.name.trim().is_empty() {
            reasons.push("metadata.name is required".to_string());
        }
        if self.metadata.service.trim().is_empty() {
            reasons.push("metadata.service is required".to_string());
        }
        if self.metadata.project.trim().is_empty() {
            reasons.push("metadata.project is required".to_string());
        }
        if !self.metadata.runbook.trim().is_empty() && !valid_runbook(&self.metadata.runbook) {
            reasons.push("metadata.runbook must be an http:// or https:// URL".to_string());
        }
        if self.slos.is_empty() {
            reasons.push("at least one SLO is required".to_string());
        }

        let template = match template_for_service(&self.metadata.service) {
            Ok(template) => Some(template),
            Err(err) => {
                reasons.push(err.to_string());
                None
            }
        };

        if let Some(reason) = validate_resource_type(&self.alerting.burn_rate_resource_type, template)
        {
            reasons.push(reason);
        }

        for (index, slo) in self.slos.iter().enumerate() {
            let prefix = format!("slos[{index}]");
            if slo.name.trim().is_empty() {
                reasons.push(format!("{prefix}.name is required"));
            }
            if slo.objective <= 0.0 || slo.objective >= 100.0 {
                reasons.push(format!("{prefix}.objective must be between 0 and 100"));
            }
            if slo.period == Some(Period::Calendar) && !is_calendar_window(&slo.window) {
                reasons.push(format!(
                    "{prefix}.period: calendar period requires window of 1d, 1w, 2w, or 30d"
                ));
            }
            if !is_valid_window(&slo.window) {
                reasons.push(format!("{prefix}.window must look like 30d, 1h, or 15m"));
            } else if let Some(reason) = validate_window_bounds(&slo.window) {
                reasons.push(format!("{prefix}.window: {reason}"));
            }
            for (name, override_) in [
                ("fast", slo.alerting.fast.as_ref()),
                ("slow", slo.alerting.slow.as_ref()),
            ] {
                if let Some(override_) = override_ {
                    for reason in validate_alert_override(name, override_) {
                        reasons.push(format!("{prefix}.alerting: {reason}"));
                    }
                }
            }
            for reason in validate_sli(&slo.sli, template) {
                reasons.push(format!("{prefix}.sli: {reason}"));
            }
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { reasons })
        }
    }
}

fn valid_runbook(value: &str) -> bool {
    match Url::parse(value.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

fn validate_resource_type(
    resource_type: &str,
    template: Option<&ServiceTemplate>,
) -> Option<String> {
    let trimmed = resource_type.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(template) = template {
        if !template.resource_type.is_empty() && trimmed != template.resource_type {
            return Some(format!(
                "alerting.burnRateResourceType must match template resource.type {:?}",
                template.resource_type
            ));
        }
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Some(
            "burnRateResourceType must contain only lowercase letters, digits, or underscores"
                .to_string(),
        );
    }
    None
}

fn validate_window_bounds(window: &str) -> Option<String> {
    let duration = match parse_window(window) {
        Ok(duration) => duration,
        Err(err) => return Some(err.to_string()),
    };
    if duration < Duration::minutes(1) {
        return Some("window must be at least 1m".to_string());
    }
    if duration > Duration::days(90) {
        return Some("window must be 90d or less".to_string());
    }
    None
}

fn validate_alert_override(name: &str, override_: &AlertOverride) -> Vec<String> {
    let mut reasons = Vec::new();
    if !override_.windows.is_empty() {
        if override_.windows.len() != 2 {
            reasons.push(format!("{name}.windows must have exactly 2 entries"));
        } else {
            match (
                parse_window(&override_.windows[0]),
                parse_window(&override_.windows[1]),
            ) {
                (Ok(short), Ok(long)) => {
                    if short == long {
                        reasons.push(format!(
                            "{name}.windows must have distinct short/long windows"
                        ));
                    }
                    if short >= long {
                        reasons.push(format!("{name}.windows must be ordered short, long"));
                    }
                }
                _ => reasons.push(format!("{name}.windows must look like 30d, 1h, or 15m")),
            }
        }
        for window in &override_.windows {
            if !is_valid_window(window) {
                reasons.push(format!(
                    "{name}.windows value {window:?} must look like 30d, 1h, or 15m"
                ));
            }
        }
    }
    if override_.burn_rate < 1.0 {
        reasons.push(format!("{name}.burnRate must be >= 1"));
    }
    reasons
}

fn validate_sli(sli: &Sli, template: Option<&ServiceTemplate>) -> Vec<String> {
    let mut reasons = Vec::new();
    match sli {
        Sli::RequestBased { good, total } => {
            if good.metric.trim().is_empty() {
                reasons.push("good.metric is required".to_string());
            }
            if total.metric.trim().is_empty() {
                reasons.push("total.metric is required".to_string());
            }
            if good.filter.trim().is_empty() {
                reasons.push("good.filter is required".to_string());
            } else if !qualified_filter(&good.filter) {
                reasons.push(
                    "good.filter must reference metric., resource., project., metadata., or group."
                        .to_string(),
                );
            }
            if !total.filter.trim().is_empty() && !qualified_filter(&total.filter) {
                reasons.push(
                    "total.filter must reference metric., resource., project., metadata., or group."
                        .to_string(),
                );
            }
            if let Some(template) = template {
                if let Err(err) = template.validate_metric(&good.metric) {
                    reasons.push(err.to_string());
                }
                if let Err(err) = template.validate_metric(&total.metric) {
                    reasons.push(err.to_string());
                }
                if !filter_has_resource(&good.filter, &template.resource_type) {
                    reasons.push(format!(
                        "good.filter must include resource.type={:?}",
                        template.resource_type
                    ));
                }
                if !total.filter.trim().is_empty()
                    && !filter_has_resource(&total.filter, &template.resource_type)
                {
                    reasons.push(format!(
                        "total.filter must include resource.type={:?}",
                        template.resource_type
                    ));
                }
            }
        }
        Sli::Latency {
            metric,
            filter,
            threshold,
        } => {
            if metric.trim().is_empty() {
                reasons.push("metric is required".to_string());
            }
            if threshold.trim().is_empty() {
                reasons.push("threshold is required".to_string());
            } else if parse_threshold(threshold).is_err() {
                reasons.push("threshold must be a valid duration like 500ms or 1s".to_string());
            }
            if !filter.trim().is_empty() && !qualified_filter(filter) {
                reasons.push(
                    "filter must reference metric., resource., project., metadata., or group."
                        .to_string(),
                );
            }
            if let Some(template) = template {
                if let Err(err) = template.validate_metric(metric) {
                    reasons.push(err.to_string());
                }
                if !filter_has_resource(filter, &template.resource_type) {
                    reasons.push(format!(
                        "filter must include resource.type={:?}",
                        template.resource_type
                    ));
                }
            }
        }
    }
    reasons
}

fn qualified_filter(filter: &str) -> bool {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return false;
    }
    ["metric.", "resource.", "project.", "metadata.", "group."]
        .iter()
        .any(|prefix| trimmed.contains(prefix))
}

fn filter_has_resource(filter: &str, resource_type: &str) -> bool {
    if resource_type.trim().is_empty() {
        return true;
    }
    filter.contains(&format!("resource.type=\"{resource_type}\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::model::{Metadata, MetricRef, Slo, SloAlerting};

    fn request_based_sli() -> Sli {
        Sli::RequestBased {
            good: MetricRef {
                metric: "run.googleapis.com/request_count".to_string(),
                filter: "resource.type=\"cloud_run_revision\" AND metric.labels.response_code_class=\"2xx\"".to_string(),
            },
            total: MetricRef {
                metric: "run.googleapis.com/request_count".to_string(),
                filter: "resource.type=\"cloud_run_revision\"".to_string(),
            },
        }
    }

    fn valid_spec() -> Spec {
        Spec {
            api_version: API_VERSION_V1.to_string(),
            kind: KIND_SERVICE_SLO.to_string(),
            metadata: Metadata {
                name: "checkout-api".to_string(),
                service: "cloud-run".to_string(),
                project: "acme-prod".to_string(),
                labels: Default::default(),
                runbook: "https://example.com/runbook".to_string(),
            },
            alerting: Default::default(),
            slos: vec![Slo {
                name: "availability".to_string(),
                objective: 99.9,
                window: "30d".to_string(),
                period: None,
                sli: request_based_sli(),
                alerting: SloAlerting::default(),
            }],
        }
    }

    #[test]
    fn test_valid_spec_passes() {
        valid_spec().validate().unwrap();
    }

    #[test]
    fn test_collects_multiple_violations() {
        let mut spec = valid_spec();
        spec.slos[0].objective = 100.0;
        spec.slos[0].window = "7d".to_string();
        spec.slos[0].period = Some(Period::Calendar);
        spec.slos[0].alerting.fast = Some(AlertOverride {
            windows: vec!["1h".to_string(), "5m".to_string()],
            burn_rate: 14.4,
        });

        let err = spec.validate().unwrap_err();
        assert!(err.reasons.len() >= 3, "reasons: {:?}", err.reasons);
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("objective must be between 0 and 100")));
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("calendar period requires window of 1d, 1w, 2w, or 30d")));
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("fast.windows must be ordered short, long")));
    }

    #[test]
    fn test_rejects_equal_override_windows() {
        let mut spec = valid_spec();
        spec.slos[0].alerting.slow = Some(AlertOverride {
            windows: vec!["1h".to_string(), "1h".to_string()],
            burn_rate: 6.0,
        });
        let err = spec.validate().unwrap_err();
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("slow.windows must have distinct short/long windows")));
    }

    #[test]
    fn test_rejects_low_burn_rate() {
        let mut spec = valid_spec();
        spec.slos[0].alerting.fast = Some(AlertOverride {
            windows: vec!["5m".to_string(), "1h".to_string()],
            burn_rate: 0.5,
        });
        let err = spec.validate().unwrap_err();
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("fast.burnRate must be >= 1")));
    }

    #[test]
    fn test_rejects_unknown_service_template() {
        let mut spec = valid_spec();
        spec.metadata.service = "heroku".to_string();
        let err = spec.validate().unwrap_err();
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("metadata.service must be one of")));
    }

    #[test]
    fn test_rejects_unsupported_metric_for_template() {
        let mut spec = valid_spec();
        if let Sli::RequestBased { good, .. } = &mut spec.slos[0].sli {
            good.metric = "run.googleapis.com/billable_instance_time".to_string();
        }
        let err = spec.validate().unwrap_err();
        assert!(err.reasons.iter().any(|r| r.contains("is not supported")));
    }

    #[test]
    fn test_rejects_missing_resource_type_in_filter() {
        let mut spec = valid_spec();
        if let Sli::RequestBased { good, .. } = &mut spec.slos[0].sli {
            good.filter = "metric.labels.response_code_class=\"2xx\"".to_string();
        }
        let err = spec.validate().unwrap_err();
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("good.filter must include resource.type")));
    }

    #[test]
    fn test_rejects_bad_runbook_and_resource_type() {
        let mut spec = valid_spec();
        spec.metadata.runbook = "ftp://example.com".to_string();
        spec.alerting.burn_rate_resource_type = "Cloud-Run!".to_string();
        let err = spec.validate().unwrap_err();
        assert!(err.reasons.iter().any(|r| r.contains("metadata.runbook")));
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("must match template resource.type")));
    }

    #[test]
    fn test_rejects_window_bounds() {
        let mut spec = valid_spec();
        spec.slos[0].window = "30s".to_string();
        let err = spec.validate().unwrap_err();
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("window must be at least 1m")));

        spec.slos[0].window = "120d".to_string();
        let err = spec.validate().unwrap_err();
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("window must be 90d or less")));
    }

    #[test]
    fn test_latency_threshold_validation() {
        let mut spec = valid_spec();
        spec.slos[0].sli = Sli::Latency {
            metric: "run.googleapis.com/request_latencies".to_string(),
            filter: "resource.type=\"cloud_run_revision\"".to_string(),
            threshold: "fast".to_string(),
        };
        let err = spec.validate().unwrap_err();
        assert!(err
            .reasons
            .iter()
            .any(|r| r.contains("threshold must be a valid duration")));
    }
}
