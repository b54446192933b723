//! Cloud Monitoring REST backend.
//!
//! Talks to the Monitoring v3 API (services, SLOs, alert policies) and the
//! Dashboards v1 API over plain REST. The base URL is injectable so
//! integration tests can point the backend at a local mock server.

use std::collections::BTreeMap;
use std::env;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use crate::planner::Severity;
use crate::spec::model::{Period, Sli};
use crate::spec::window::{parse_threshold, parse_window};

use super::error::BackendError;
use super::traits::{
    ApplyAlertRequest, ApplyDashboardRequest, ApplySloRequest, Backend, DeleteRequest,
    DeleteSummary, EnsureServiceRequest, ServiceSummary,
};

/// Production endpoint for both the v3 and v1 APIs.
pub const DEFAULT_BASE_URL: &str = "https://monitoring.googleapis.com";

/// Environment variable holding the OAuth2 access token.
pub const TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Thin authenticated JSON client shared by the backend and the analyzer.
#[derive(Debug, Clone)]
pub(crate) struct RestClient {
    http: Client,
    base_url: String,
    token: String,
}

impl RestClient {
    /// Builds a client against `base_url`, reading the access token from the
    /// environment.
    pub(crate) fn from_env(base_url: &str) -> Result<Self, BackendError> {
        let token = env::var(TOKEN_ENV).unwrap_or_default();
        if token.trim().is_empty() {
            return Err(BackendError::MissingToken);
        }
        Ok(Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Response, BackendError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, method = %method, "Sending Cloud Monitoring request.");
        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.token)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn into_api_error(
        operation: &'static str,
        resource: &str,
        response: Response,
    ) -> BackendError {
        let status = response.status().as_u16();
        let message = match response.text().await {
            Ok(text) if !text.is_empty() => text,
            _ => "no response body".to_string(),
        };
        BackendError::Api {
            operation,
            resource: resource.to_string(),
            status,
            message,
        }
    }

    /// GET that treats 404 as "resource absent".
    pub(crate) async fn get_optional(
        &self,
        operation: &'static str,
        resource: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>, BackendError> {
        let response = self.send(Method::GET, path, query, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::into_api_error(operation, resource, response).await);
        }
        Ok(Some(response.json().await?))
    }

    /// GET that fails on 404.
    pub(crate) async fn get_required(
        &self,
        operation: &'static str,
        resource: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, BackendError> {
        self.get_optional(operation, resource, path, query)
            .await?
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    pub(crate) async fn post_json(
        &self,
        operation: &'static str,
        resource: &str,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, BackendError> {
        let response = self.send(Method::POST, path, query, Some(body)).await?;
        if !response.status().is_success() {
            return Err(Self::into_api_error(operation, resource, response).await);
        }
        Ok(response.json().await?)
    }

    pub(crate) async fn patch_json(
        &self,
        operation: &'static str,
        resource: &str,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<Value, BackendError> {
        let response = self.send(Method::PATCH, path, query, Some(body)).await?;
        if !response.status().is_success() {
            return Err(Self::into_api_error(operation, resource, response).await);
        }
        Ok(response.json().await?)
    }

    /// DELETE that treats 404 as already gone.
    pub(crate) async fn delete_missing_ok(
        &self,
        operation: &'static str,
        resource: &str,
        path: &str,
    ) -> Result<(), BackendError> {
        let response = self.send(Method::DELETE, path, &[], None).await?;
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }
        Err(Self::into_api_error(operation, resource, response).await)
    }

    /// Collects pages of a list endpoint, stopping once `limit` items have
    /// been gathered. A 404 on the first page yields an empty list when
    /// `missing_ok` is set.
    pub(crate) async fn list_paginated(
        &self,
        operation: &'static str,
        resource: &str,
        path: &str,
        items_field: &str,
        missing_ok: bool,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, BackendError> {
        let page_size = limit.map(|limit| limit.to_string());
        let mut items = Vec::new();
        let mut page_token = String::new();
        loop {
            let page = {
                let mut query: Vec<(&str, &str)> = Vec::new();
                if let Some(page_size) = &page_size {
                    query.push(("pageSize", page_size.as_str()));
                }
                if !page_token.is_empty() {
                    query.push(("pageToken", page_token.as_str()));
                }
                self.get_optional(operation, resource, path, &query).await?
            };
            let page = match page {
                Some(page) => page,
                None if missing_ok => return Ok(items),
                None => return Err(BackendError::NotFound(resource.to_string())),
            };
            if let Some(page_items) = page.get(items_field).and_then(Value::as_array) {
                items.extend(page_items.iter().cloned());
            }
            if let Some(limit) = limit {
                if items.len() >= limit {
                    items.truncate(limit);
                    return Ok(items);
                }
            }
            page_token = page
                .get("nextPageToken")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            if page_token.is_empty() {
                return Ok(items);
            }
        }
    }
}

/// Cloud Monitoring implementation of [`Backend`].
#[derive(Debug, Clone)]
pub struct GcpBackend {
    client: RestClient,
}

impl GcpBackend {
    /// Builds a backend against the production endpoint.
    pub fn from_env() -> Result<Self, BackendError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Builds a backend against an explicit endpoint. Used by tests.
    pub fn with_base_url(base_url: &str) -> Result<Self, BackendError> {
        Ok(Self {
            client: RestClient::from_env(base_url)?,
        })
    }

    pub(crate) fn client(&self) -> &RestClient {
        &self.client
    }

    async fn find_by_display_name(
        &self,
        operation: &'static str,
        resource: &str,
        path: &str,
        items_field: &str,
        display_name: &str,
    ) -> Result<Option<Value>, BackendError> {
        let items = self
            .client
            .list_paginated(operation, resource, path, items_field, false, None)
            .await?;
        Ok(items.into_iter().find(|item| {
            item.get("displayName").and_then(Value::as_str) == Some(display_name)
        }))
    }
}

fn labels_json(labels: &BTreeMap<String, String>) -> Value {
    json!(labels)
}

fn labels_from_json(value: Option<&Value>) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    if let Some(map) = value.and_then(Value::as_object) {
        for (key, value) in map {
            if let Some(value) = value.as_str() {
                labels.insert(key.clone(), value.to_string());
            }
        }
    }
    labels
}

/// Rounds to four decimal places; the API rejects goals with excess precision.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn calendar_period(window: &str) -> Result<&'static str, BackendError> {
    match window {
        "1d" => Ok("DAY"),
        "1w" => Ok("WEEK"),
        "2w" => Ok("FORTNIGHT"),
        "30d" => Ok("MONTH"),
        other => Err(BackendError::InvalidRequest(format!(
            "window {other:?} has no calendar period"
        ))),
    }
}

fn window_seconds(window: &str) -> Result<i64, BackendError> {
    let duration =
        parse_window(window).map_err(|err| BackendError::InvalidRequest(err.to_string()))?;
    Ok(duration.num_seconds())
}

/// Combines a metric type with the spec's filter clause into a full
/// monitoring filter.
fn build_filter(metric: &str, clause: &str, resource_type: &str) -> String {
    if clause.trim().is_empty() {
        format!("metric.type=\"{metric}\" AND resource.type=\"{resource_type}\"")
    } else {
        format!("metric.type=\"{metric}\" AND {}", clause.trim())
    }
}

fn sli_json(request: &ApplySloRequest) -> Result<Value, BackendError> {
    let resource_type = &request.template.resource_type;
    match &request.slo.sli {
        Sli::RequestBased { good, total } => Ok(json!({
            "requestBased": {
                "goodTotalRatio": {
                    "goodServiceFilter": build_filter(&good.metric, &good.filter, resource_type),
                    "totalServiceFilter": build_filter(&total.metric, &total.filter, resource_type),
                }
            }
        })),
        Sli::Latency {
            metric,
            filter,
            threshold,
        } => {
            let max_seconds = parse_threshold(threshold)
                .map_err(|err| BackendError::InvalidRequest(err.to_string()))?;
            Ok(json!({
                "requestBased": {
                    "distributionCut": {
                        "distributionFilter": build_filter(metric, filter, resource_type),
                        "range": { "max": max_seconds }
                    }
                }
            }))
        }
    }
}

fn slo_body(request: &ApplySloRequest) -> Result<Value, BackendError> {
    let mut body = json!({
        "displayName": request.slo.display_name,
        "goal": round4(request.slo.objective / 100.0),
        "serviceLevelIndicator": sli_json(request)?,
        "userLabels": labels_json(&request.labels),
    });
    match request.slo.period {
        Period::Rolling => {
            body["rollingPeriod"] = json!(format!("{}s", window_seconds(&request.slo.window)?));
        }
        Period::Calendar => {
            body["calendarPeriod"] = json!(calendar_period(&request.slo.window)?);
        }
    }
    Ok(body)
}

fn alert_documentation(request: &ApplyAlertRequest) -> String {
    let alert = &request.alert;
    let mut lines = vec![
        format!("SLO: {}", alert.slo_name),
        format!("Alert type: {}", alert.alert_type),
        format!("Burn rate threshold: {}", alert.burn_rate),
        format!("Windows: {} / {}", alert.windows[0], alert.windows[1]),
    ];
    if !alert.runbook.is_empty() {
        lines.push(format!("Runbook: {}", alert.runbook));
    }
    lines.join("\n")
}

fn alert_body(request: &ApplyAlertRequest) -> Result<Value, BackendError> {
    let alert = &request.alert;
    let severity = match alert.severity {
        Severity::Page => "CRITICAL",
        Severity::Ticket => "WARNING",
    };
    let mut conditions = Vec::with_capacity(alert.windows.len());
    for window in &alert.windows {
        conditions.push(json!({
            "displayName": format!("{} {window}", alert.display_name),
            "conditionThreshold": {
                "filter": format!(
                    "select_slo_burn_rate(\"{}\", \"{window}\")",
                    request.slo_ref
                ),
                "comparison": "COMPARISON_GT",
                "thresholdValue": alert.burn_rate,
                "duration": format!("{}s", window_seconds(window)?),
                "evaluationMissingData": "EVALUATION_MISSING_DATA_NO_OP",
            }
        }));
    }
    Ok(json!({
        "displayName": alert.display_name,
        "combiner": "AND",
        "enabled": true,
        "severity": severity,
        "documentation": {
            "content": alert_documentation(request),
            "mimeType": "text/markdown",
        },
        "conditions": conditions,
        "userLabels": labels_json(&request.labels),
    }))
}

fn dashboard_body(request: &ApplyDashboardRequest, etag: Option<&str>) -> Value {
    let mut slo_lines = vec!["## Service level objectives".to_string()];
    for slo in &request.slos {
        slo_lines.push(format!(
            "- **{}**: {}% over {}",
            slo.display_name, slo.objective, slo.window
        ));
    }
    let mut pitfall_lines = vec!["## Measurement pitfalls".to_string()];
    for pitfall in &request.template.pitfalls {
        pitfall_lines.push(format!("- {pitfall}"));
    }
    let mut body = json!({
        "displayName": request.dashboard.display_name,
        "labels": labels_json(&request.labels),
        "gridLayout": {
            "columns": "2",
            "widgets": [
                { "title": "SLOs", "text": { "content": slo_lines.join("\n"), "format": "MARKDOWN" } },
                { "title": "Pitfalls", "text": { "content": pitfall_lines.join("\n"), "format": "MARKDOWN" } },
            ]
        }
    });
    if let Some(etag) = etag {
        body["etag"] = json!(etag);
    }
    body
}

#[async_trait]
impl Backend for GcpBackend {
    async fn ensure_service(&self, request: EnsureServiceRequest) -> Result<(), BackendError> {
        let path = format!(
            "/v3/projects/{}/services/{}",
            request.project, request.service_id
        );
        let existing = self
            .client
            .get_optional("get service", &request.service_id, &path, &[])
            .await?;
        let body = json!({
            "displayName": request.display_name,
            "custom": {},
            "userLabels": labels_json(&request.labels),
        });
        if existing.is_some() {
            self.client
                .patch_json(
                    "update service",
                    &request.service_id,
                    &path,
                    &[("updateMask", "displayName,userLabels")],
                    &body,
                )
                .await?;
        } else {
            self.client
                .post_json(
                    "create service",
                    &request.service_id,
                    &format!("/v3/projects/{}/services", request.project),
                    &[("serviceId", request.service_id.as_str())],
                    &body,
                )
                .await?;
        }
        Ok(())
    }

    async fn apply_slo(&self, request: ApplySloRequest) -> Result<String, BackendError> {
        let list_path = format!(
            "/v3/projects/{}/services/{}/serviceLevelObjectives",
            request.project, request.service_id
        );
        let existing = self
            .find_by_display_name(
                "list SLOs",
                &request.slo.id,
                &list_path,
                "serviceLevelObjectives",
                &request.slo.display_name,
            )
            .await?;
        let body = slo_body(&request)?;

        let applied = match existing.as_ref().and_then(|slo| slo.get("name")).and_then(Value::as_str)
        {
            Some(name) => {
                let mask = match request.slo.period {
                    Period::Rolling => {
                        "displayName,goal,serviceLevelIndicator,rollingPeriod,userLabels"
                    }
                    Period::Calendar => {
                        "displayName,goal,serviceLevelIndicator,calendarPeriod,userLabels"
                    }
                };
                self.client
                    .patch_json(
                        "update SLO",
                        &request.slo.id,
                        &format!("/v3/{name}"),
                        &[("updateMask", mask)],
                        &body,
                    )
                    .await?
            }
            None => {
                self.client
                    .post_json(
                        "create SLO",
                        &request.slo.id,
                        &list_path,
                        &[("serviceLevelObjectiveId", request.slo.resource_id.as_str())],
                        &body,
                    )
                    .await?
            }
        };

        applied
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                BackendError::InvalidRequest(format!(
                    "SLO response for {:?} carried no resource name",
                    request.slo.id
                ))
            })
    }

    async fn apply_alert(&self, request: ApplyAlertRequest) -> Result<(), BackendError> {
        let list_path = format!("/v3/projects/{}/alertPolicies", request.project);
        let existing = self
            .find_by_display_name(
                "list alert policies",
                &request.alert.id,
                &list_path,
                "alertPolicies",
                &request.alert.display_name,
            )
            .await?;
        let body = alert_body(&request)?;

        match existing.as_ref().and_then(|policy| policy.get("name")).and_then(Value::as_str) {
            Some(name) => {
                self.client
                    .patch_json(
                        "update alert policy",
                        &request.alert.id,
                        &format!("/v3/{name}"),
                        &[(
                            "updateMask",
                            "displayName,combiner,enabled,severity,documentation,conditions,userLabels",
                        )],
                        &body,
                    )
                    .await?;
            }
            None => {
                self.client
                    .post_json("create alert policy", &request.alert.id, &list_path, &[], &body)
                    .await?;
            }
        }
        Ok(())
    }

    async fn apply_dashboard(&self, request: ApplyDashboardRequest) -> Result<(), BackendError> {
        let list_path = format!("/v1/projects/{}/dashboards", request.project);
        let existing = self
            .find_by_display_name(
                "list dashboards",
                &request.dashboard.id,
                &list_path,
                "dashboards",
                &request.dashboard.display_name,
            )
            .await?;

        match existing.as_ref() {
            Some(dashboard) => {
                let name = dashboard
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        BackendError::InvalidRequest(
                            "dashboard listing carried no resource name".to_string(),
                        )
                    })?;
                let etag = dashboard.get("etag").and_then(Value::as_str);
                let body = dashboard_body(&request, etag);
                self.client
                    .patch_json(
                        "update dashboard",
                        &request.dashboard.id,
                        &format!("/v1/{name}"),
                        &[],
                        &body,
                    )
                    .await?;
            }
            None => {
                let body = dashboard_body(&request, None);
                self.client
                    .post_json("create dashboard", &request.dashboard.id, &list_path, &[], &body)
                    .await?;
            }
        }
        Ok(())
    }

    async fn delete_managed_resources(
        &self,
        request: DeleteRequest,
    ) -> Result<DeleteSummary, BackendError> {
        let mut summary = DeleteSummary::default();

        // A service that was never created (or is already gone) simply has
        // no SLOs to delete.
        let slo_path = format!(
            "/v3/projects/{}/services/{}/serviceLevelObjectives",
            request.project, request.service_id
        );
        let slos = self
            .client
            .list_paginated(
                "list SLOs",
                &request.service_id,
                &slo_path,
                "serviceLevelObjectives",
                true,
                None,
            )
            .await?;
        for slo in slos {
            let labels = labels_from_json(slo.get("userLabels"));
            if !request.ownership.is_owned_by(&labels) {
                continue;
            }
            if let Some(name) = slo.get("name").and_then(Value::as_str) {
                self.client
                    .delete_missing_ok("delete SLO", name, &format!("/v3/{name}"))
                    .await?;
                summary.slos += 1;
            }
        }

        let policies = self
            .client
            .list_paginated(
                "list alert policies",
                &request.project,
                &format!("/v3/projects/{}/alertPolicies", request.project),
                "alertPolicies",
                false,
                None,
            )
            .await?;
        for policy in policies {
            let labels = labels_from_json(policy.get("userLabels"));
            if !request.ownership.is_owned_by(&labels) {
                continue;
            }
            if let Some(name) = policy.get("name").and_then(Value::as_str) {
                self.client
                    .delete_missing_ok("delete alert policy", name, &format!("/v3/{name}"))
                    .await?;
                summary.alerts += 1;
            }
        }

        let dashboards = self
            .client
            .list_paginated(
                "list dashboards",
                &request.project,
                &format!("/v1/projects/{}/dashboards", request.project),
                "dashboards",
                false,
                None,
            )
            .await?;
        for dashboard in dashboards {
            let labels = labels_from_json(dashboard.get("labels"));
            if !request.ownership.is_owned_by(&labels) {
                continue;
            }
            if let Some(name) = dashboard.get("name").and_then(Value::as_str) {
                self.client
                    .delete_missing_ok("delete dashboard", name, &format!("/v1/{name}"))
                    .await?;
                summary.dashboards += 1;
            }
        }

        Ok(summary)
    }

    async fn list_services(&self, project: &str) -> Result<Vec<ServiceSummary>, BackendError> {
        let services = self
            .client
            .list_paginated(
                "list services",
                project,
                &format!("/v3/projects/{project}/services"),
                "services",
                false,
                None,
            )
            .await?;
        Ok(services
            .into_iter()
            .filter_map(|service| {
                let name = service.get("name").and_then(Value::as_str)?.to_string();
                Some(ServiceSummary {
                    name,
                    display_name: service
                        .get("displayName")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    labels: labels_from_json(service.get("userLabels")),
                })
            })
            .collect())
    }
}
