use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::error::{map_upstream_error, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ReportQuery {
    /// Attach `returnPropertyQuota` to the request body.
    #[serde(default)]
    pub quota: bool,
}

/// Body used when a report is requested without one: sessions per
/// hour and weekday over the last 60 days.
fn default_report_body() -> JsonValue {
    json!({
        "dateRanges": [{ "startDate": "60daysAgo", "endDate": "today" }],
        "dimensions": [{ "name": "hour" }, { "name": "dayOfWeek" }],
        "metrics": [{ "name": "sessions" }]
    })
}

fn default_realtime_body() -> JsonValue {
    json!({ "metrics": [{ "name": "activeUsers" }] })
}

#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/report",
    params(
        ("property_id" = String, Path, description = "Numeric GA4 property id"),
        ReportQuery
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Raw runReport response", body = serde_json::Value),
        (status = 502, description = "GA4 rejected the request")
    )
)]
pub(crate) async fn run_report_handler(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    Query(query): Query<ReportQuery>,
    body: Option<Json<JsonValue>>,
) -> AppResult<Json<JsonValue>> {
    let mut body = body.map(|Json(value)| value).unwrap_or_else(default_report_body);
    if query.quota {
        if let Some(map) = body.as_object_mut() {
            map.insert("returnPropertyQuota".to_string(), JsonValue::Bool(true));
        }
    }
    let response = state
        .ga4
        .run_report(&property_id, &body)
        .await
        .map_err(map_upstream_error)?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/properties/{property_id}/realtime",
    params(("property_id" = String, Path, description = "Numeric GA4 property id")),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Raw runRealtimeReport response", body = serde_json::Value),
        (status = 502, description = "GA4 rejected the request")
    )
)]
pub(crate) async fn run_realtime_handler(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
    body: Option<Json<JsonValue>>,
) -> AppResult<Json<JsonValue>> {
    let body = body
        .map(|Json(value)| value)
        .unwrap_or_else(default_realtime_body);
    let response = state
        .ga4
        .run_realtime_report(&property_id, &body)
        .await
        .map_err(map_upstream_error)?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/properties/{property_id}/metadata",
    params(("property_id" = String, Path, description = "Numeric GA4 property id")),
    responses(
        (status = 200, description = "Property metadata", body = serde_json::Value),
        (status = 502, description = "GA4 rejected the request")
    )
)]
pub(crate) async fn metadata_handler(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> AppResult<Json<JsonValue>> {
    let response = state
        .ga4
        .metadata(&property_id)
        .await
        .map_err(map_upstream_error)?;
    Ok(Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/report", post(run_report_handler))
        .route("/realtime", post(run_realtime_handler))
        .route("/metadata", get(metadata_handler))
}
