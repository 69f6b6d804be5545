use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::buckets::{aggregate, Bucket, MetricRow};
use super::project::{project, OccurrenceMode, ProjectionConfig};
use crate::time;

/// Final recommendation payload: ranked buckets, their projected future
/// instants merged/deduplicated/sorted, localized labels parallel to the
/// instants, and the echoed configuration for traceability.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct RecommendationResult {
    pub buckets: Vec<Bucket>,
    /// RFC 3339 UTC instants, ascending.
    pub candidates: Vec<String>,
    /// Display labels rendered in the target zone, parallel to `candidates`.
    pub labels: Vec<String>,
    pub horizon_days: u32,
    #[schema(value_type = String)]
    pub time_zone: chrono_tz::Tz,
    pub occurrence_mode: OccurrenceMode,
    pub top_k: usize,
}

/// Pure assembly of the whole pipeline: validate, aggregate, project each
/// top-K bucket, merge. No I/O; identical inputs and `now` give identical
/// output.
pub fn build_recommendation(
    rows: &[MetricRow],
    config: &ProjectionConfig,
    top_k: usize,
    now: DateTime<Utc>,
) -> Result<RecommendationResult, String> {
    config.validate()?;
    if top_k == 0 {
        return Err("top_k must be positive, got 0".to_string());
    }

    let buckets = aggregate(rows, top_k);

    let mut instants: Vec<DateTime<Utc>> = buckets
        .iter()
        .flat_map(|bucket| project(bucket, config, now))
        .collect();
    instants.sort_unstable();
    instants.dedup();

    let labels = instants
        .iter()
        .map(|instant| time::human_label(*instant, config.time_zone))
        .collect();
    let candidates = instants
        .iter()
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Secs, true))
        .collect();

    Ok(RecommendationResult {
        buckets,
        candidates,
        labels,
        horizon_days: config.horizon_days,
        time_zone: config.time_zone,
        occurrence_mode: config.occurrence_mode,
        top_k,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(hour: u32, weekday: u32, value: f64) -> MetricRow {
        MetricRow {
            hour,
            weekday,
            value,
        }
    }

    fn config(mode: OccurrenceMode) -> ProjectionConfig {
        ProjectionConfig {
            horizon_days: 14,
            occurrence_mode: mode,
            max_occurrences_per_bucket: 9,
            time_zone: chrono_tz::Europe::Berlin,
        }
    }

    fn frozen_now() -> DateTime<Utc> {
        // A Monday noon.
        Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0)
            .single()
            .expect("now")
    }

    #[test]
    fn assembles_ranked_buckets_with_candidates_and_labels() {
        let rows = [row(10, 1, 50.0), row(10, 1, 30.0), row(9, 2, 40.0)];
        let result =
            build_recommendation(&rows, &config(OccurrenceMode::First), 2, frozen_now())
                .expect("recommendation");

        assert_eq!(result.buckets.len(), 2);
        assert_eq!(
            (result.buckets[0].weekday, result.buckets[0].hour),
            (1, 10)
        );
        assert!((result.buckets[0].share - 2.0 / 3.0).abs() < 1e-9);

        // Next Tuesday 09:00 Berlin comes before next Monday 10:00.
        assert_eq!(
            result.candidates,
            vec!["2026-01-06T08:00:00Z", "2026-01-12T09:00:00Z"]
        );
        assert_eq!(
            result.labels,
            vec!["Di., 06.01., 09:00", "Mo., 12.01., 10:00"]
        );
        assert_eq!(result.top_k, 2);
        assert_eq!(result.horizon_days, 14);
    }

    #[test]
    fn empty_rows_yield_empty_result() {
        let result = build_recommendation(&[], &config(OccurrenceMode::First), 3, frozen_now())
            .expect("recommendation");
        assert!(result.buckets.is_empty());
        assert!(result.candidates.is_empty());
        assert!(result.labels.is_empty());
    }

    #[test]
    fn candidates_are_deduplicated_and_ascending() {
        let rows = [
            row(10, 1, 50.0),
            row(9, 2, 40.0),
            row(8, 3, 30.0),
        ];
        let result =
            build_recommendation(&rows, &config(OccurrenceMode::Expand), 3, frozen_now())
                .expect("recommendation");

        let mut sorted = result.candidates.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(result.candidates, sorted);
        assert_eq!(result.labels.len(), result.candidates.len());
    }

    #[test]
    fn idempotent_for_a_frozen_now() {
        let rows = [row(10, 1, 50.0), row(9, 2, 40.0)];
        let first = build_recommendation(&rows, &config(OccurrenceMode::Expand), 2, frozen_now())
            .expect("first");
        let second = build_recommendation(&rows, &config(OccurrenceMode::Expand), 2, frozen_now())
            .expect("second");

        assert_eq!(first.buckets, second.buckets);
        assert_eq!(first.candidates, second.candidates);
        assert_eq!(first.labels, second.labels);
    }

    #[test]
    fn rejects_invalid_configuration_before_aggregating() {
        let rows = [row(10, 1, 50.0)];
        let err = build_recommendation(&rows, &config(OccurrenceMode::First), 0, frozen_now())
            .unwrap_err();
        assert!(err.contains("top_k"));

        let mut bad = config(OccurrenceMode::First);
        bad.horizon_days = 0;
        let err = build_recommendation(&rows, &bad, 2, frozen_now()).unwrap_err();
        assert!(err.contains("horizon_days"));
    }
}
