use utoipa::OpenApi;

use crate::routes;
use crate::services::timing::buckets::Bucket;
use crate::services::timing::project::OccurrenceMode;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ga4-insights-rs",
        description = "GA4 Data API reporting and posting-time recommendations"
    ),
    paths(
        routes::health::healthz_handler,
        routes::reports::run_report_handler,
        routes::reports::run_realtime_handler,
        routes::reports::metadata_handler,
        routes::timing::blog_handler,
        routes::timing::page_handler,
        routes::timing::channel_handler,
        routes::timing::source_handler,
        routes::insights::landing_pages_handler,
        routes::insights::referrers_handler,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::timing::TimingParams,
        routes::timing::TimingMetric,
        routes::timing::TimingResponse,
        routes::insights::InsightsParams,
        routes::insights::InsightsMetric,
        routes::insights::LandingPageEntry,
        routes::insights::ReferrerEntry,
        Bucket,
        OccurrenceMode,
    ))
)]
pub struct ApiDoc;

pub fn openapi_json() -> serde_json::Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap_or_default()
}
