use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::filter::FilterExpression;
use crate::services::timing::buckets::MetricRow;

/// Typed GA4 RunReport request body. Field names serialize to the
/// camelCase wire names the Data API expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportRequest {
    pub date_ranges: Vec<DateRange>,
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension_filter: Option<FilterExpression>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_bys: Option<Vec<OrderBy>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    pub return_property_quota: bool,
}

impl RunReportRequest {
    /// The hour-by-weekday aggregation every timing helper runs.
    pub fn hourly(
        lookback_days: u32,
        metric: &str,
        dimension_filter: Option<FilterExpression>,
        return_property_quota: bool,
    ) -> Self {
        Self {
            date_ranges: vec![DateRange::last_days(lookback_days)],
            dimensions: vec![Dimension::new("hour"), Dimension::new("dayOfWeek")],
            metrics: vec![Metric::new(metric)],
            dimension_filter,
            order_bys: None,
            limit: None,
            return_property_quota,
        }
    }

    /// A top-N list ordered descending by `metric`.
    pub fn top_list(
        lookback_days: u32,
        dimensions: &[&str],
        metric: &str,
        dimension_filter: Option<FilterExpression>,
        limit: u32,
        return_property_quota: bool,
    ) -> Self {
        Self {
            date_ranges: vec![DateRange::last_days(lookback_days)],
            dimensions: dimensions.iter().map(|name| Dimension::new(name)).collect(),
            metrics: vec![Metric::new(metric)],
            dimension_filter,
            order_bys: Some(vec![OrderBy::metric_desc(metric)]),
            limit: Some(limit),
            return_property_quota,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl DateRange {
    pub fn last_days(days: u32) -> Self {
        Self {
            start_date: format!("{days}daysAgo"),
            end_date: "today".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dimension {
    pub name: String,
}

impl Dimension {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Metric {
    pub name: String,
}

impl Metric {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBy {
    pub metric: MetricOrderBy,
    pub desc: bool,
}

impl OrderBy {
    pub fn metric_desc(metric_name: &str) -> Self {
        Self {
            metric: MetricOrderBy {
                metric_name: metric_name.to_string(),
            },
            desc: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricOrderBy {
    pub metric_name: String,
}

/// The parts of a RunReport response the helpers care about. Everything
/// else stays in the raw JSON the client hands back alongside this.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReportResponse {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
    #[serde(default)]
    pub metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(default)]
    pub dimension_values: Vec<CellValue>,
    #[serde(default)]
    pub metric_values: Vec<CellValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CellValue {
    #[serde(default)]
    pub value: String,
}

impl ReportRow {
    pub fn dimension(&self, idx: usize) -> &str {
        self.dimension_values
            .get(idx)
            .map(|cell| cell.value.as_str())
            .unwrap_or("")
    }

    pub fn metric_f64(&self, idx: usize) -> f64 {
        self.metric_values
            .get(idx)
            .and_then(|cell| cell.value.parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

/// Extract hour-by-weekday metric rows from an hourly report, validating
/// ranges so malformed upstream data is reported with the offending field
/// and value instead of poisoning the aggregation.
pub fn metric_rows(report: &RunReportResponse) -> Result<Vec<MetricRow>> {
    let mut rows = Vec::with_capacity(report.rows.len());
    for (idx, row) in report.rows.iter().enumerate() {
        let hour_raw = row.dimension(0);
        let Ok(hour) = hour_raw.parse::<u32>() else {
            bail!("report row {idx}: hour is not an integer, got {hour_raw:?}");
        };
        if hour > 23 {
            bail!("report row {idx}: hour out of range 0..=23, got {hour}");
        }

        let weekday_raw = row.dimension(1);
        let Ok(weekday) = weekday_raw.parse::<u32>() else {
            bail!("report row {idx}: dayOfWeek is not an integer, got {weekday_raw:?}");
        };
        if weekday > 6 {
            bail!("report row {idx}: dayOfWeek out of range 0..=6, got {weekday}");
        }

        let value_raw = row
            .metric_values
            .first()
            .map(|cell| cell.value.as_str())
            .unwrap_or("");
        let Ok(value) = value_raw.parse::<f64>() else {
            bail!("report row {idx}: metric value is not a number, got {value_raw:?}");
        };
        if !value.is_finite() || value < 0.0 {
            bail!("report row {idx}: metric value must be non-negative, got {value}");
        }

        rows.push(MetricRow {
            hour,
            weekday,
            value,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hourly_request_serializes_to_wire_names() {
        let request = RunReportRequest::hourly(
            60,
            "screenPageViews",
            Some(FilterExpression::path_matches("/blog")),
            true,
        );
        let value = serde_json::to_value(&request).expect("json");

        assert_eq!(
            value["dateRanges"],
            json!([{ "startDate": "60daysAgo", "endDate": "today" }])
        );
        assert_eq!(
            value["dimensions"],
            json!([{ "name": "hour" }, { "name": "dayOfWeek" }])
        );
        assert_eq!(value["metrics"], json!([{ "name": "screenPageViews" }]));
        assert_eq!(value["returnPropertyQuota"], json!(true));
        assert!(value.get("orderBys").is_none());
        assert!(value.get("limit").is_none());
        assert!(value.get("dimensionFilter").is_some());
    }

    #[test]
    fn top_list_request_orders_descending() {
        let request = RunReportRequest::top_list(
            30,
            &["landingPage", "hostName"],
            "sessions",
            None,
            10,
            false,
        );
        let value = serde_json::to_value(&request).expect("json");

        assert_eq!(
            value["orderBys"],
            json!([{ "metric": { "metricName": "sessions" }, "desc": true }])
        );
        assert_eq!(value["limit"], json!(10));
        assert!(value.get("dimensionFilter").is_none());
    }

    #[test]
    fn metric_rows_parses_hour_weekday_value() {
        let report: RunReportResponse = serde_json::from_value(json!({
            "rows": [
                {
                    "dimensionValues": [{ "value": "10" }, { "value": "1" }],
                    "metricValues": [{ "value": "50" }]
                },
                {
                    "dimensionValues": [{ "value": "9" }, { "value": "2" }],
                    "metricValues": [{ "value": "40.5" }]
                }
            ],
            "metadata": { "timeZone": "Europe/Berlin" }
        }))
        .expect("response");

        let rows = metric_rows(&report).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hour, 10);
        assert_eq!(rows[0].weekday, 1);
        assert_eq!(rows[0].value, 50.0);
        assert_eq!(rows[1].value, 40.5);
        assert_eq!(
            report.metadata.and_then(|m| m.time_zone).as_deref(),
            Some("Europe/Berlin")
        );
    }

    #[test]
    fn metric_rows_names_offending_field() {
        let report: RunReportResponse = serde_json::from_value(json!({
            "rows": [{
                "dimensionValues": [{ "value": "25" }, { "value": "1" }],
                "metricValues": [{ "value": "50" }]
            }]
        }))
        .expect("response");
        let err = metric_rows(&report).unwrap_err().to_string();
        assert!(err.contains("hour out of range"));
        assert!(err.contains("25"));

        let report: RunReportResponse = serde_json::from_value(json!({
            "rows": [{
                "dimensionValues": [{ "value": "10" }, { "value": "7" }],
                "metricValues": [{ "value": "50" }]
            }]
        }))
        .expect("response");
        let err = metric_rows(&report).unwrap_err().to_string();
        assert!(err.contains("dayOfWeek out of range"));

        let report: RunReportResponse = serde_json::from_value(json!({
            "rows": [{
                "dimensionValues": [{ "value": "10" }, { "value": "1" }],
                "metricValues": [{ "value": "-3" }]
            }]
        }))
        .expect("response");
        let err = metric_rows(&report).unwrap_err().to_string();
        assert!(err.contains("non-negative"));
    }

    #[test]
    fn missing_rows_deserialize_to_empty() {
        let report: RunReportResponse =
            serde_json::from_value(json!({})).expect("response");
        assert!(report.rows.is_empty());
        assert!(metric_rows(&report).expect("rows").is_empty());
    }
}
