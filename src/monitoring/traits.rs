//! The backend interface the reconciler drives.

use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::planner::{AlertPlan, DashboardPlan, SloPlan};
use crate::spec::templates::ServiceTemplate;

use super::error::BackendError;
use super::ownership::OwnershipFilter;

/// Request to create or update a monitoring service resource.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsureServiceRequest {
    /// Target project ID.
    pub project: String,
    /// Slug used as the service resource ID.
    pub service_id: String,
    /// Desired display name.
    pub display_name: String,
    /// Desired user labels.
    pub labels: BTreeMap<String, String>,
}

/// Request to reconcile a single SLO under a service.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplySloRequest {
    /// Target project ID.
    pub project: String,
    /// Parent service resource ID.
    pub service_id: String,
    /// The planned SLO.
    pub slo: SloPlan,
    /// Template for the service kind, used to build SLI filters.
    pub template: ServiceTemplate,
    /// Desired user labels.
    pub labels: BTreeMap<String, String>,
}

/// Request to reconcile a burn-rate alert policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyAlertRequest {
    /// Target project ID.
    pub project: String,
    /// Name of the SLO the alert watches.
    pub slo_name: String,
    /// Full resource name of the reconciled SLO, as returned by the backend.
    pub slo_ref: String,
    /// The planned alert.
    pub alert: AlertPlan,
    /// Desired user labels.
    pub labels: BTreeMap<String, String>,
}

/// Request to reconcile the service dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyDashboardRequest {
    /// Target project ID.
    pub project: String,
    /// Parent service resource ID.
    pub service_id: String,
    /// The planned dashboard.
    pub dashboard: DashboardPlan,
    /// The planned SLOs, listed on the dashboard.
    pub slos: Vec<SloPlan>,
    /// Template for the service kind, providing pitfall notes.
    pub template: ServiceTemplate,
    /// Desired user labels.
    pub labels: BTreeMap<String, String>,
}

/// Request to delete every managed resource for a service.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRequest {
    /// Target project ID.
    pub project: String,
    /// Service resource ID whose resources are candidates.
    pub service_id: String,
    /// Ownership filter; only matching resources are deleted.
    pub ownership: OwnershipFilter,
}

/// Summary of a deletion pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteSummary {
    /// Number of SLOs deleted.
    pub slos: usize,
    /// Number of alert policies deleted.
    pub alerts: usize,
    /// Number of dashboards deleted.
    pub dashboards: usize,
}

/// A monitoring service visible in a project.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSummary {
    /// Full resource name.
    pub name: String,
    /// Display name, empty when unset.
    pub display_name: String,
    /// User labels on the service.
    pub labels: BTreeMap<String, String>,
}

/// The operations the reconciler needs from Cloud Monitoring. Implementations
/// must be idempotent: applying the same request twice converges on the same
/// live state.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Creates the service resource or updates its display name and labels.
    async fn ensure_service(&self, request: EnsureServiceRequest) -> Result<(), BackendError>;

    /// Creates or updates the SLO, returning its full resource name.
    async fn apply_slo(&self, request: ApplySloRequest) -> Result<String, BackendError>;

    /// Creates or updates the burn-rate alert policy.
    async fn apply_alert(&self, request: ApplyAlertRequest) -> Result<(), BackendError>;

    /// Creates or updates the service dashboard.
    async fn apply_dashboard(&self, request: ApplyDashboardRequest) -> Result<(), BackendError>;

    /// Deletes every resource matching the ownership filter.
    async fn delete_managed_resources(
        &self,
        request: DeleteRequest,
    ) -> Result<DeleteSummary, BackendError>;

    /// Lists the monitoring services in a project.
    async fn list_services(&self, project: &str) -> Result<Vec<ServiceSummary>, BackendError>;
}
