use std::str::FromStr;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{map_upstream_error, AppError, AppResult};
use crate::ga4::filter::{self, FilterExpression};
use crate::ga4::report::{metric_rows, RunReportRequest, RunReportResponse};
use crate::services::timing::buckets::Bucket;
use crate::services::timing::project::{OccurrenceMode, ProjectionConfig};
use crate::services::timing::recommend::build_recommendation;
use crate::state::AppState;

const DEFAULT_LOOKBACK_DAYS: u32 = 60;
const MAX_LOOKBACK_DAYS: u32 = 365;
const DEFAULT_TOP_K: usize = 3;
const DEFAULT_HORIZON_DAYS: u32 = 14;
const DEFAULT_MAX_OCCURRENCES: u32 = 9;
const DEFAULT_BLOG_PATH: &str = "/blog";
const DEFAULT_CHANNEL_GROUP: &str = "Organic Social";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub enum TimingMetric {
    #[default]
    #[serde(rename = "screenPageViews")]
    ScreenPageViews,
    #[serde(rename = "sessions")]
    Sessions,
    #[serde(rename = "engagedSessions")]
    EngagedSessions,
}

impl TimingMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimingMetric::ScreenPageViews => "screenPageViews",
            TimingMetric::Sessions => "sessions",
            TimingMetric::EngagedSessions => "engagedSessions",
        }
    }

    /// Channel and source reports aggregate at session scope, where
    /// page views are not meaningful.
    pub fn session_scoped(&self) -> Self {
        match self {
            TimingMetric::ScreenPageViews => TimingMetric::Sessions,
            other => *other,
        }
    }
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct TimingParams {
    pub lookback_days: u32,
    pub top_k: usize,
    pub horizon_days: u32,
    /// IANA zone override; when absent the property's reporting zone wins.
    pub time_zone: Option<String>,
    pub occurrence_mode: OccurrenceMode,
    pub max_occurrences: u32,
    pub metric: TimingMetric,
    pub return_quota: bool,
    pub include_raw: bool,
    /// Restrict to one site; the www and apex spellings both match.
    pub domain: Option<String>,
    pub path_contains: Option<String>,
    pub channel_group: Option<String>,
    /// Comma-separated source names for the source operation.
    pub sources: Option<String>,
    pub use_source_medium: bool,
}

impl Default for TimingParams {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            top_k: DEFAULT_TOP_K,
            horizon_days: DEFAULT_HORIZON_DAYS,
            time_zone: None,
            occurrence_mode: OccurrenceMode::default(),
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
            metric: TimingMetric::default(),
            return_quota: true,
            include_raw: false,
            domain: None,
            path_contains: None,
            channel_group: None,
            sources: None,
            use_source_medium: false,
        }
    }
}

impl TimingParams {
    fn validate(&self) -> Result<(), String> {
        if self.lookback_days < 1 || self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(format!(
                "lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}, got {}",
                self.lookback_days
            ));
        }
        if self.top_k == 0 {
            return Err("top_k must be positive, got 0".to_string());
        }
        if self.horizon_days == 0 {
            return Err("horizon_days must be positive, got 0".to_string());
        }
        if self.max_occurrences == 0 {
            return Err("max_occurrences must be positive, got 0".to_string());
        }
        Ok(())
    }

    fn requested_time_zone(&self) -> Result<Option<Tz>, String> {
        match self.time_zone.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => Tz::from_str(name)
                .map(Some)
                .map_err(|_| format!("unknown time zone {name:?}")),
        }
    }

    fn source_list(&self) -> Vec<String> {
        self.sources
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingOp {
    Blog,
    Page,
    Channel,
    Source,
}

impl TimingOp {
    fn name(&self) -> &'static str {
        match self {
            TimingOp::Blog => "blog",
            TimingOp::Page => "page",
            TimingOp::Channel => "channel",
            TimingOp::Source => "source",
        }
    }

    /// Effective metric for this operation, after scope adjustment.
    fn metric(&self, requested: TimingMetric) -> TimingMetric {
        match self {
            TimingOp::Blog | TimingOp::Page => requested,
            TimingOp::Channel | TimingOp::Source => requested.session_scoped(),
        }
    }
}

fn build_filter(op: TimingOp, params: &TimingParams) -> Result<Option<FilterExpression>, String> {
    let mut parts = Vec::new();
    if let Some(domain) = params.domain.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        parts.push(FilterExpression::host_in(filter::host_variants(domain)));
    }
    match op {
        TimingOp::Blog => {
            let path = params
                .path_contains
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_BLOG_PATH);
            parts.push(FilterExpression::path_matches(path));
        }
        TimingOp::Page => {
            if let Some(path) = params
                .path_contains
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
            {
                parts.push(FilterExpression::path_matches(path));
            }
        }
        TimingOp::Channel => {
            let group = params
                .channel_group
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_CHANNEL_GROUP);
            parts.push(FilterExpression::channel_group(group));
        }
        TimingOp::Source => {
            let sources = params.source_list();
            if sources.is_empty() {
                return Err("sources must name at least one traffic source".to_string());
            }
            parts.push(FilterExpression::source_in(sources, params.use_source_medium));
        }
    }
    Ok(FilterExpression::all(parts))
}

/// Zone preference order: explicit request, then the property's reporting
/// zone from the response metadata, then the configured default.
fn resolve_time_zone(
    requested: Option<Tz>,
    report: &RunReportResponse,
    default: Tz,
) -> Tz {
    if let Some(tz) = requested {
        return tz;
    }
    if let Some(name) = report
        .metadata
        .as_ref()
        .and_then(|meta| meta.time_zone.as_deref())
    {
        match Tz::from_str(name) {
            Ok(tz) => return tz,
            Err(_) => {
                tracing::warn!(zone = %name, "property reported an unknown time zone; using default")
            }
        }
    }
    default
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TimingResponse {
    pub operation: String,
    pub buckets: Vec<Bucket>,
    pub candidates: Vec<String>,
    pub labels: Vec<String>,
    pub report_used_metric: String,
    pub lookback_days: u32,
    pub horizon_days: u32,
    pub time_zone: String,
    pub occurrence_mode: OccurrenceMode,
    pub top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_quota: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<JsonValue>,
}

async fn run_timing(
    op: TimingOp,
    state: AppState,
    property_id: String,
    params: TimingParams,
) -> AppResult<Json<TimingResponse>> {
    params.validate().map_err(AppError::bad_request)?;
    let requested_tz = params.requested_time_zone().map_err(AppError::bad_request)?;
    let dimension_filter = build_filter(op, &params).map_err(AppError::bad_request)?;

    let metric = op.metric(params.metric);
    let request = RunReportRequest::hourly(
        params.lookback_days,
        metric.as_str(),
        dimension_filter,
        params.return_quota,
    );
    let raw = state
        .ga4
        .run_report(&property_id, &request)
        .await
        .map_err(map_upstream_error)?;
    let report: RunReportResponse = serde_json::from_value(raw.clone())
        .map_err(|err| map_upstream_error(anyhow::anyhow!("unexpected report shape: {err}")))?;

    let time_zone = resolve_time_zone(requested_tz, &report, state.config.default_time_zone);
    let rows = metric_rows(&report).map_err(map_upstream_error)?;

    let now = Utc::now();
    let config = ProjectionConfig {
        horizon_days: params.horizon_days,
        occurrence_mode: params.occurrence_mode,
        max_occurrences_per_bucket: params.max_occurrences,
        time_zone,
    };
    let result = build_recommendation(&rows, &config, params.top_k, now)
        .map_err(AppError::bad_request)?;

    let property_quota = raw
        .get("propertyQuota")
        .cloned()
        .filter(|value| !value.is_null());

    Ok(Json(TimingResponse {
        operation: op.name().to_string(),
        buckets: result.buckets,
        candidates: result.candidates,
        labels: result.labels,
        report_used_metric: metric.as_str().to_string(),
        lookback_days: params.lookback_days,
        horizon_days: params.horizon_days,
        time_zone: time_zone.name().to_string(),
        occurrence_mode: params.occurrence_mode,
        top_k: params.top_k,
        property_quota,
        raw: params.include_raw.then_some(raw),
    }))
}

#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/timing/blog",
    params(("property_id" = String, Path, description = "Numeric GA4 property id")),
    request_body = TimingParams,
    responses(
        (status = 200, description = "Posting-time recommendation for blog pages", body = TimingResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 502, description = "GA4 rejected the request")
    )
)]
pub(crate) async fn blog_handler(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    body: Option<Json<TimingParams>>,
) -> AppResult<Json<TimingResponse>> {
    let params = body.map(|Json(p)| p).unwrap_or_default();
    run_timing(TimingOp::Blog, state, property_id, params).await
}

#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/timing/page",
    params(("property_id" = String, Path, description = "Numeric GA4 property id")),
    request_body = TimingParams,
    responses(
        (status = 200, description = "Posting-time recommendation for arbitrary pages", body = TimingResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 502, description = "GA4 rejected the request")
    )
)]
pub(crate) async fn page_handler(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    body: Option<Json<TimingParams>>,
) -> AppResult<Json<TimingResponse>> {
    let params = body.map(|Json(p)| p).unwrap_or_default();
    run_timing(TimingOp::Page, state, property_id, params).await
}

#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/timing/channel",
    params(("property_id" = String, Path, description = "Numeric GA4 property id")),
    request_body = TimingParams,
    responses(
        (status = 200, description = "Posting-time recommendation for a channel group", body = TimingResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 502, description = "GA4 rejected the request")
    )
)]
pub(crate) async fn channel_handler(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    body: Option<Json<TimingParams>>,
) -> AppResult<Json<TimingResponse>> {
    let params = body.map(|Json(p)| p).unwrap_or_default();
    run_timing(TimingOp::Channel, state, property_id, params).await
}

#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/timing/source",
    params(("property_id" = String, Path, description = "Numeric GA4 property id")),
    request_body = TimingParams,
    responses(
        (status = 200, description = "Posting-time recommendation for traffic sources", body = TimingResponse),
        (status = 400, description = "Invalid parameters"),
        (status = 502, description = "GA4 rejected the request")
    )
)]
pub(crate) async fn source_handler(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    body: Option<Json<TimingParams>>,
) -> AppResult<Json<TimingResponse>> {
    let params = body.map(|Json(p)| p).unwrap_or_default();
    run_timing(TimingOp::Source, state, property_id, params).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/timing/blog", post(blog_handler))
        .route("/timing/page", post(page_handler))
        .route("/timing/channel", post(channel_handler))
        .route("/timing/source", post(source_handler))
}
