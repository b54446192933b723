//! Cloud Monitoring implementation of the analyzer's [`Reader`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::monitoring::error::BackendError;
use crate::monitoring::gcp::{RestClient, DEFAULT_BASE_URL};

use super::{Reader, RemoteSlo};

const SECONDS_PER_DAY: i64 = 86_400;

/// Read-only client over the Monitoring v3 API.
#[derive(Debug, Clone)]
pub struct GcpReader {
    client: RestClient,
}

impl GcpReader {
    /// Builds a reader against the production endpoint.
    pub fn from_env() -> Result<Self, BackendError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Builds a reader against an explicit endpoint. Used by tests.
    pub fn with_base_url(base_url: &str) -> Result<Self, BackendError> {
        Ok(Self {
            client: RestClient::from_env(base_url)?,
        })
    }
}

fn rolling_days(value: Option<&Value>) -> i64 {
    let period = value.and_then(Value::as_str).unwrap_or_default();
    period
        .strip_suffix('s')
        .and_then(|secs| secs.parse::<i64>().ok())
        .map(|secs| secs / SECONDS_PER_DAY)
        .unwrap_or(0)
}

fn sli_shape(indicator: Option<&Value>) -> (String, String) {
    let Some(indicator) = indicator.and_then(Value::as_object) else {
        return (String::new(), String::new());
    };
    for kind in ["requestBased", "windowsBased", "basicSli"] {
        if let Some(inner) = indicator.get(kind) {
            let method = inner
                .as_object()
                .and_then(|map| map.keys().next())
                .cloned()
                .unwrap_or_default();
            return (kind.to_string(), method);
        }
    }
    (String::new(), String::new())
}

fn remote_slo(value: &Value) -> Option<RemoteSlo> {
    let name = value.get("name").and_then(Value::as_str)?.to_string();
    let (sli_type, sli_method) = sli_shape(value.get("serviceLevelIndicator"));
    Some(RemoteSlo {
        name,
        display_name: value
            .get("displayName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        goal: value.get("goal").and_then(Value::as_f64).unwrap_or(0.0),
        rolling_days: rolling_days(value.get("rollingPeriod")),
        calendar: value
            .get("calendarPeriod")
            .and_then(Value::as_str)
            .map(str::to_string),
        sli_type,
        sli_method,
    })
}

fn project_of(slo_name: &str) -> Result<&str, BackendError> {
    slo_name
        .strip_prefix("projects/")
        .and_then(|rest| rest.split('/').next())
        .filter(|project| !project.is_empty())
        .ok_or_else(|| {
            BackendError::InvalidRequest(format!("SLO name {slo_name:?} has no project segment"))
        })
}

fn first_point_value(body: &Value) -> Option<f64> {
    let value = body
        .get("timeSeries")?
        .as_array()?
        .first()?
        .get("points")?
        .as_array()?
        .first()?
        .get("value")?;
    if let Some(double) = value.get("doubleValue").and_then(Value::as_f64) {
        return Some(double);
    }
    value
        .get("int64Value")
        .and_then(Value::as_str)
        .and_then(|text| text.parse::<f64>().ok())
}

#[async_trait]
impl Reader for GcpReader {
    async fn list_service_level_objectives(
        &self,
        service: &str,
        max: usize,
    ) -> Result<Vec<RemoteSlo>, BackendError> {
        let limit = if max > 0 { Some(max) } else { None };
        let items = self
            .client
            .list_paginated(
                "list SLOs",
                service,
                &format!("/v3/{service}/serviceLevelObjectives"),
                "serviceLevelObjectives",
                false,
                limit,
            )
            .await?;
        Ok(items.iter().filter_map(remote_slo).collect())
    }

    async fn fetch_compliance(
        &self,
        slo_name: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<f64, BackendError> {
        let project = project_of(slo_name)?;
        let window_seconds = (end - start).num_seconds().max(60);
        let filter = format!("select_slo_compliance(\"{slo_name}\")");
        let alignment = format!("{window_seconds}s");
        let start_time = start.to_rfc3339();
        let end_time = end.to_rfc3339();
        let query: Vec<(&str, &str)> = vec![
            ("filter", filter.as_str()),
            ("interval.startTime", start_time.as_str()),
            ("interval.endTime", end_time.as_str()),
            ("aggregation.alignmentPeriod", alignment.as_str()),
            ("aggregation.perSeriesAligner", "ALIGN_MEAN"),
            ("aggregation.crossSeriesReducer", "REDUCE_MEAN"),
            ("view", "FULL"),
        ];
        let body = self
            .client
            .get_required(
                "query compliance",
                slo_name,
                &format!("/v3/projects/{project}/timeSeries"),
                &query,
            )
            .await?;
        first_point_value(&body).ok_or_else(|| {
            BackendError::NotFound(format!("no compliance points returned for {slo_name}"))
        })
    }

    fn endpoint(&self) -> String {
        self.client.base_url().to_string()
    }
}
