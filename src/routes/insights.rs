use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{map_upstream_error, AppError, AppResult};
use crate::ga4::filter::{self, FilterExpression};
use crate::ga4::report::{RunReportRequest, RunReportResponse};
use crate::state::AppState;

const DEFAULT_LOOKBACK_DAYS: u32 = 60;
const MAX_LOOKBACK_DAYS: u32 = 365;
const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub enum InsightsMetric {
    #[default]
    #[serde(rename = "sessions")]
    Sessions,
    #[serde(rename = "engagedSessions")]
    EngagedSessions,
}

impl InsightsMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightsMetric::Sessions => "sessions",
            InsightsMetric::EngagedSessions => "engagedSessions",
        }
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct InsightsParams {
    pub lookback_days: u32,
    pub limit: u32,
    pub metric: InsightsMetric,
    pub domain: Option<String>,
    pub path_contains: Option<String>,
    /// Drop localhost traffic unless a domain filter already scopes hosts.
    pub exclude_localhost: bool,
    pub return_quota: bool,
}

impl Default for InsightsParams {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            limit: DEFAULT_LIMIT,
            metric: InsightsMetric::default(),
            domain: None,
            path_contains: None,
            exclude_localhost: true,
            return_quota: true,
        }
    }
}

impl InsightsParams {
    fn validate(&self) -> Result<(), String> {
        if self.lookback_days < 1 || self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(format!(
                "lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}, got {}",
                self.lookback_days
            ));
        }
        if self.limit == 0 {
            return Err("limit must be positive, got 0".to_string());
        }
        Ok(())
    }

    fn host_filter(&self) -> Option<FilterExpression> {
        if let Some(domain) = self.domain.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            return Some(FilterExpression::host_in(filter::host_variants(domain)));
        }
        if self.exclude_localhost {
            return Some(FilterExpression::not_localhost());
        }
        None
    }
}

fn landing_pages_filter(params: &InsightsParams) -> Option<FilterExpression> {
    let mut parts = Vec::new();
    if let Some(host) = params.host_filter() {
        parts.push(host);
    }
    if let Some(path) = params
        .path_contains
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        parts.push(FilterExpression::path_matches(path));
    }
    FilterExpression::all(parts)
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct LandingPageEntry {
    pub host: String,
    pub path: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ReferrerEntry {
    pub source: String,
    pub medium: String,
    pub channel_group: String,
    pub sessions: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsResponse<T> {
    pub entries: Vec<T>,
    pub metric: String,
    pub lookback_days: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_quota: Option<JsonValue>,
}

async fn run_top_list(
    state: &AppState,
    property_id: &str,
    params: &InsightsParams,
    dimensions: &[&str],
    metric: &str,
    dimension_filter: Option<FilterExpression>,
) -> AppResult<(RunReportResponse, Option<JsonValue>)> {
    let request = RunReportRequest::top_list(
        params.lookback_days,
        dimensions,
        metric,
        dimension_filter,
        params.limit,
        params.return_quota,
    );
    let raw = state
        .ga4
        .run_report(property_id, &request)
        .await
        .map_err(map_upstream_error)?;
    let report: RunReportResponse = serde_json::from_value(raw.clone())
        .map_err(|err| map_upstream_error(anyhow::anyhow!("unexpected report shape: {err}")))?;
    let quota = raw
        .get("propertyQuota")
        .cloned()
        .filter(|value| !value.is_null());
    Ok((report, quota))
}

#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/insights/landing-pages",
    params(("property_id" = String, Path, description = "Numeric GA4 property id")),
    request_body = InsightsParams,
    responses(
        (status = 200, description = "Top landing pages by the chosen metric"),
        (status = 400, description = "Invalid parameters"),
        (status = 502, description = "GA4 rejected the request")
    )
)]
pub(crate) async fn landing_pages_handler(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    body: Option<Json<InsightsParams>>,
) -> AppResult<Json<InsightsResponse<LandingPageEntry>>> {
    let params = body.map(|Json(p)| p).unwrap_or_default();
    params.validate().map_err(AppError::bad_request)?;

    let metric = params.metric.as_str();
    let (report, property_quota) = run_top_list(
        &state,
        &property_id,
        &params,
        &["landingPage", "hostName"],
        metric,
        landing_pages_filter(&params),
    )
    .await?;

    let entries = report
        .rows
        .iter()
        .map(|row| LandingPageEntry {
            host: row.dimension(1).to_string(),
            path: row.dimension(0).to_string(),
            value: row.metric_f64(0),
        })
        .collect();

    Ok(Json(InsightsResponse {
        entries,
        metric: metric.to_string(),
        lookback_days: params.lookback_days,
        property_quota,
    }))
}

#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/insights/referrers",
    params(("property_id" = String, Path, description = "Numeric GA4 property id")),
    request_body = InsightsParams,
    responses(
        (status = 200, description = "Top referrers by sessions"),
        (status = 400, description = "Invalid parameters"),
        (status = 502, description = "GA4 rejected the request")
    )
)]
pub(crate) async fn referrers_handler(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    body: Option<Json<InsightsParams>>,
) -> AppResult<Json<InsightsResponse<ReferrerEntry>>> {
    let params = body.map(|Json(p)| p).unwrap_or_default();
    params.validate().map_err(AppError::bad_request)?;

    let metric = params.metric.as_str();
    let (report, property_quota) = run_top_list(
        &state,
        &property_id,
        &params,
        &["sessionSource", "sessionMedium", "defaultChannelGroup"],
        metric,
        params.host_filter(),
    )
    .await?;

    let entries = report
        .rows
        .iter()
        .map(|row| ReferrerEntry {
            source: row.dimension(0).to_string(),
            medium: row.dimension(1).to_string(),
            channel_group: row.dimension(2).to_string(),
            sessions: row.metric_f64(0),
        })
        .collect();

    Ok(Json(InsightsResponse {
        entries,
        metric: metric.to_string(),
        lookback_days: params.lookback_days,
        property_quota,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/insights/landing-pages", post(landing_pages_handler))
        .route("/insights/referrers", post(referrers_handler))
}
