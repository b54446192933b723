//! The reconciler: drives a plan against a backend in dependency order.
//!
//! Order matters. The service resource must exist before its SLOs, and every
//! alert references the live resource name of an SLO reconciled earlier in
//! the same pass. Failures stop the pass; a later retry converges because
//! every backend operation is idempotent.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::info;

use crate::planner::Plan;
use crate::spec::templates::{template_for_service, TemplateError};

use super::error::BackendError;
use super::ownership::OwnershipFilter;
use super::traits::{
    ApplyAlertRequest, ApplyDashboardRequest, ApplySloRequest, Backend, DeleteRequest,
    DeleteSummary, EnsureServiceRequest,
};

/// Errors from an apply or delete pass. Each variant names the resource that
/// failed so the operator knows where the pass stopped.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The spec's service type has no template.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Creating or updating the service resource failed.
    #[error("Failed to ensure service {service_id:?}: {source}")]
    EnsureService {
        /// The service resource ID.
        service_id: String,
        /// The backend failure.
        source: BackendError,
    },

    /// Creating or updating an SLO failed.
    #[error("Failed to apply SLO {name:?}: {source}")]
    Slo {
        /// The SLO name from the plan.
        name: String,
        /// The backend failure.
        source: BackendError,
    },

    /// An alert references an SLO that was not part of the plan.
    #[error("Alert {alert:?} references unknown SLO {slo:?}")]
    UnknownSloReference {
        /// The alert ID.
        alert: String,
        /// The missing SLO name.
        slo: String,
    },

    /// Creating or updating an alert policy failed.
    #[error("Failed to apply alert {id:?}: {source}")]
    Alert {
        /// The alert ID from the plan.
        id: String,
        /// The backend failure.
        source: BackendError,
    },

    /// Creating or updating the dashboard failed.
    #[error("Failed to apply dashboard: {0}")]
    Dashboard(BackendError),

    /// The deletion pass failed.
    #[error("Failed to delete managed resources: {0}")]
    Delete(BackendError),
}

/// Applies the plan: service, then SLOs in order, then alerts, then the
/// dashboard.
pub async fn apply_plan(backend: &dyn Backend, plan: &Plan) -> Result<(), ApplyError> {
    let template = template_for_service(&plan.service)?;

    info!(
        project = %plan.project,
        service_id = %plan.service_id,
        "Ensuring monitoring service exists."
    );
    backend
        .ensure_service(EnsureServiceRequest {
            project: plan.project.clone(),
            service_id: plan.service_id.clone(),
            display_name: plan.service_name.clone(),
            labels: plan.labels.clone(),
        })
        .await
        .map_err(|source| ApplyError::EnsureService {
            service_id: plan.service_id.clone(),
            source,
        })?;

    let mut slo_refs: BTreeMap<String, String> = BTreeMap::new();
    for slo in &plan.slos {
        info!(slo = %slo.id, "Applying SLO.");
        let resource_name = backend
            .apply_slo(ApplySloRequest {
                project: plan.project.clone(),
                service_id: plan.service_id.clone(),
                slo: slo.clone(),
                template: template.clone(),
                labels: plan.labels.clone(),
            })
            .await
            .map_err(|source| ApplyError::Slo {
                name: slo.name.clone(),
                source,
            })?;
        slo_refs.insert(slo.name.clone(), resource_name);
    }

    for alert in &plan.alerts {
        let slo_ref = slo_refs
            .get(&alert.slo_name)
            .ok_or_else(|| ApplyError::UnknownSloReference {
                alert: alert.id.clone(),
                slo: alert.slo_name.clone(),
            })?
            .clone();
        info!(alert = %alert.id, "Applying burn-rate alert.");
        backend
            .apply_alert(ApplyAlertRequest {
                project: plan.project.clone(),
                slo_name: alert.slo_name.clone(),
                slo_ref,
                alert: alert.clone(),
                labels: plan.labels.clone(),
            })
            .await
            .map_err(|source| ApplyError::Alert {
                id: alert.id.clone(),
                source,
            })?;
    }

    info!(dashboard = %plan.dashboard.id, "Applying dashboard.");
    backend
        .apply_dashboard(ApplyDashboardRequest {
            project: plan.project.clone(),
            service_id: plan.service_id.clone(),
            dashboard: plan.dashboard.clone(),
            slos: plan.slos.clone(),
            template: template.clone(),
            labels: plan.labels.clone(),
        })
        .await
        .map_err(ApplyError::Dashboard)?;

    Ok(())
}

/// Deletes every resource the plan owns, leaving anything that does not
/// carry the plan's ownership labels untouched.
pub async fn delete_plan(backend: &dyn Backend, plan: &Plan) -> Result<DeleteSummary, ApplyError> {
    let ownership = OwnershipFilter::new(plan.labels.clone());
    info!(
        project = %plan.project,
        service_id = %plan.service_id,
        "Deleting managed resources."
    );
    backend
        .delete_managed_resources(DeleteRequest {
            project: plan.project.clone(),
            service_id: plan.service_id.clone(),
            ownership,
        })
        .await
        .map_err(ApplyError::Delete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{build, Options};
    use crate::spec::model::{
        Metadata, MetricRef, Sli, Slo, SloAlerting, Spec, API_VERSION_V1, KIND_SERVICE_SLO,
    };
    use crate::monitoring::traits::MockBackend;
    use mockall::predicate::function;
    use mockall::Sequence;

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

    #[tokio::test]
    async fn test_apply_runs_in_dependency_order() {
        let plan = sample_plan();
        let mut backend = MockBackend::new();
        let mut sequence = Sequence::new();

        backend
            .expect_ensure_service()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));
        backend
            .expect_apply_slo()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|request| {
                Ok(format!(
                    "projects/acme-prod/services/{}/serviceLevelObjectives/{}",
                    request.service_id, request.slo.id
                ))
            });
        backend
            .expect_apply_alert()
            .with(function(|request: &ApplyAlertRequest| {
                request.slo_ref.contains("serviceLevelObjectives")
            }))
            .times(2)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));
        backend
            .expect_apply_dashboard()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(()));

        apply_plan(&backend, &plan).await.unwrap();
    }

    #[tokio::test]
    async fn test_apply_stops_on_slo_failure() {
        let plan = sample_plan();
        let mut backend = MockBackend::new();

        backend.expect_ensure_service().returning(|_| Ok(()));
        backend.expect_apply_slo().returning(|request| {
            Err(BackendError::Api {
                operation: "create SLO",
                resource: request.slo.id.clone(),
                status: 403,
                message: "permission denied".to_string(),
            })
        });
        backend.expect_apply_alert().never();
        backend.expect_apply_dashboard().never();

        let err = apply_plan(&backend, &plan).await.unwrap_err();
        assert!(matches!(err, ApplyError::Slo { ref name, .. } if name == "availability"));
    }

    #[tokio::test]
    async fn test_alert_with_unknown_slo_reference_is_fatal() {
        let mut plan = sample_plan();
        plan.alerts[0].slo_name = "no-such-slo".to_string();

        let mut backend = MockBackend::new();
        backend.expect_ensure_service().returning(|_| Ok(()));
        backend
            .expect_apply_slo()
            .returning(|_| Ok("projects/p/services/s/serviceLevelObjectives/x".to_string()));
        backend.expect_apply_alert().never();
        backend.expect_apply_dashboard().never();

        let err = apply_plan(&backend, &plan).await.unwrap_err();
        assert!(matches!(err, ApplyError::UnknownSloReference { .. }));
    }

    #[tokio::test]
    async fn test_delete_passes_ownership_labels() {
        let plan = sample_plan();
        let expected = plan.labels.clone();
        let mut backend = MockBackend::new();
        backend
            .expect_delete_managed_resources()
            .with(function(move |request: &DeleteRequest| {
                request.ownership.required == expected
            }))
            .times(1)
            .returning(|_| {
                Ok(DeleteSummary {
                    slos: 1,
                    alerts: 2,
                    dashboards: 1,
                })
            });

        let summary = delete_plan(&backend, &plan).await.unwrap();
        assert_eq!(summary.slos, 1);
        assert_eq!(summary.alerts, 2);
    }
}
