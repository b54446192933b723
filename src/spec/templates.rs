//! Static catalog of supported service templates.
//!
//! A template names the monitored-resource type and the metric names that are
//! valid for a given service kind, plus the pitfalls surfaced on generated
//! dashboards.

use std::sync::LazyLock;

use thiserror::Error;

/// A supported service type and its known-good metric surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTemplate {
    /// Template key, matched against `metadata.service`.
    pub name: String,

    /// Monitored-resource type used in filters.
    pub resource_type: String,

    /// Metrics known to be valid for this service type.
    pub metrics: Vec<MetricTemplate>,

    /// Common measurement pitfalls, surfaced on the dashboard.
    pub pitfalls: Vec<String>,
}

/// A known metric for a service template.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTemplate {
    /// Fully qualified metric type name.
    pub name: String,

    /// Short human description.
    pub description: String,
}

/// Errors from template lookup and metric validation.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// `metadata.service` does not name a known template.
    #[error("metadata.service must be one of [{known}]")]
    UnknownService {
        /// Sorted, comma-separated list of known template names.
        known: String,
    },

    /// The metric name was empty.
    #[error("metric must not be empty")]
    EmptyMetric,

    /// The metric is not in the template's known set.
    #[error("metric {metric:?} is not supported for service {service:?}")]
    UnsupportedMetric {
        /// The rejected metric name.
        metric: String,
        /// The template the metric was checked against.
        service: String,
    },
}

impl ServiceTemplate {
    fn new(
        name: &str,
        resource_type: &str,
        metrics: [(&str, &str); 2],
        pitfalls: [&str; 2],
    ) -> Self {
        Self {
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            metrics: metrics
                .into_iter()
                .map(|(metric, description)| MetricTemplate {
                    name: metric.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            pitfalls: pitfalls.into_iter().map(str::to_string).collect(),
        }
    }

    /// Checks that `metric` is one of this template's known metrics.
    pub fn validate_metric(&self, metric: &str) -> Result<(), TemplateError> {
        if metric.is_empty() {
            return Err(TemplateError::EmptyMetric);
        }
        if !self.metrics.iter().any(|known| known.name == metric) {
            return Err(TemplateError::UnsupportedMetric {
                metric: metric.to_string(),
                service: self.name.clone(),
            });
        }
        Ok(())
    }
}

static CATALOG: LazyLock<Vec<ServiceTemplate>> = LazyLock::new(|| {
    vec![
        ServiceTemplate::new(
            "cloud-run",
            "cloud_run_revision",
            [
                (
                    "run.googleapis.com/request_count",
                    "Request count for Cloud Run services",
                ),
                (
                    "run.googleapis.com/request_latencies",
                    "Request latency distribution for Cloud Run",
                ),
            ],
            [
                "Cold starts can skew latency SLOs for low-traffic services.",
                "Retries can double-count failed requests unless filters exclude them.",
            ],
        ),
        ServiceTemplate::new(
            "https-load-balancer",
            "https_lb_rule",
            [
                (
                    "loadbalancing.googleapis.com/https/request_count",
                    "HTTPS load balancer request count",
                ),
                (
                    "loadbalancing.googleapis.com/https/total_latencies",
                    "HTTPS load balancer total latency distribution",
                ),
            ],
            [
                "Backends returning 404s can hide real availability issues.",
                "Retry policies may inflate request counts.",
            ],
        ),
        ServiceTemplate::new(
            "gke-ingress",
            "k8s_ingress",
            [
                (
                    "kubernetes.io/ingress/request_count",
                    "GKE ingress request count",
                ),
                (
                    "kubernetes.io/ingress/latency",
                    "GKE ingress request latency distribution",
                ),
            ],
            [
                "Default backend 404s can mask real availability issues.",
                "Ingress metrics are per-cluster; multi-cluster routing may need multiple SLOs.",
            ],
        ),
        ServiceTemplate::new(
            "cloud-sql",
            "cloudsql_database",
            [
                (
                    "cloudsql.googleapis.com/database/queries",
                    "Cloud SQL query count",
                ),
                (
                    "cloudsql.googleapis.com/database/query_latency",
                    "Cloud SQL query latency distribution",
                ),
            ],
            [
                "Long-running queries can skew latency SLOs without proper filters.",
                "Replica failover can create transient errors that impact availability.",
            ],
        ),
        ServiceTemplate::new(
            "gke-service",
            "k8s_service",
            [
                (
                    "kubernetes.io/service/request_count",
                    "GKE service request count",
                ),
                (
                    "kubernetes.io/service/latency",
                    "GKE service request latency distribution",
                ),
            ],
            [
                "Service metrics are per-cluster; multi-cluster services need multiple SLOs.",
                "Mixing readiness probe failures with user traffic can skew availability.",
            ],
        ),
        ServiceTemplate::new(
            "gke-gateway",
            "k8s_gateway",
            [
                (
                    "kubernetes.io/gateway/request_count",
                    "GKE Gateway request count",
                ),
                (
                    "kubernetes.io/gateway/latency",
                    "GKE Gateway request latency distribution",
                ),
            ],
            [
                "Gateway metrics can include internal health checks unless filtered.",
                "Gateway routing rules may mask backend-specific latency issues.",
            ],
        ),
        ServiceTemplate::new(
            "gce-lb",
            "gce_forwarding_rule",
            [
                (
                    "loadbalancing.googleapis.com/https/request_count",
                    "HTTPS load balancer request count (GCE)",
                ),
                (
                    "loadbalancing.googleapis.com/https/total_latencies",
                    "HTTPS load balancer latency distribution (GCE)",
                ),
            ],
            [
                "Backend errors can be masked by cache hits without proper filters.",
                "Global vs regional load balancers may use different resource labels.",
            ],
        ),
        ServiceTemplate::new(
            "cloud-functions",
            "cloud_function",
            [
                (
                    "cloudfunctions.googleapis.com/function/execution_count",
                    "Cloud Functions execution count",
                ),
                (
                    "cloudfunctions.googleapis.com/function/execution_times",
                    "Cloud Functions execution time distribution",
                ),
            ],
            [
                "Cold starts can inflate latency for low-traffic functions.",
                "Retries can double-count failures unless filtered.",
            ],
        ),
        ServiceTemplate::new(
            "pubsub-subscription",
            "pubsub_subscription",
            [
                (
                    "pubsub.googleapis.com/subscription/ack_message_count",
                    "Pub/Sub acked message count",
                ),
                (
                    "pubsub.googleapis.com/subscription/ack_message_delay",
                    "Pub/Sub ack delay distribution",
                ),
            ],
            [
                "Backlog spikes can be caused by subscriber scaling, not publisher errors.",
                "Dead-letter policies can hide underlying delivery failures.",
            ],
        ),
        ServiceTemplate::new(
            "cloud-storage",
            "gcs_bucket",
            [
                (
                    "storage.googleapis.com/api/request_count",
                    "Cloud Storage API request count",
                ),
                (
                    "storage.googleapis.com/api/request_latencies",
                    "Cloud Storage API request latency distribution",
                ),
            ],
            [
                "Multi-region buckets can have higher tail latency without an incident.",
                "Requester-pays or IAM errors can look like availability issues.",
            ],
        ),
        ServiceTemplate::new(
            "cloud-tasks",
            "cloud_tasks_queue",
            [
                (
                    "cloudtasks.googleapis.com/queue/task_attempt_count",
                    "Cloud Tasks task attempt count",
                ),
                (
                    "cloudtasks.googleapis.com/queue/task_attempt_latencies",
                    "Cloud Tasks task attempt latency distribution",
                ),
            ],
            [
                "High retry rates can inflate attempts without real user impact.",
                "Queue throttling may increase latency during bursts.",
            ],
        ),
        ServiceTemplate::new(
            "bigquery",
            "bigquery_project",
            [
                (
                    "bigquery.googleapis.com/query/count",
                    "BigQuery query count",
                ),
                (
                    "bigquery.googleapis.com/query/latency",
                    "BigQuery query latency distribution",
                ),
            ],
            [
                "Batch queries have higher latency and should be filtered separately.",
                "Resource-heavy queries can dominate latency even when the service is healthy.",
            ],
        ),
        ServiceTemplate::new(
            "spanner",
            "spanner_instance",
            [
                (
                    "spanner.googleapis.com/api/request_count",
                    "Spanner API request count",
                ),
                (
                    "spanner.googleapis.com/api/latency",
                    "Spanner API latency distribution",
                ),
            ],
            [
                "Hot partitions can cause latency spikes without full outage.",
                "Client-side timeouts can appear as service errors unless filtered.",
            ],
        ),
    ]
});

/// Looks up the template for a service type. Unknown service types are a hard
/// validation failure listing the known types.
pub fn template_for_service(service: &str) -> Result<&'static ServiceTemplate, TemplateError> {
    CATALOG
        .iter()
        .find(|template| template.name == service)
        .ok_or_else(|| {
            let mut known: Vec<&str> = CATALOG.iter().map(|t| t.name.as_str()).collect();
            known.sort_unstable();
            TemplateError::UnknownService {
                known: known.join(", "),
            }
        })
}
