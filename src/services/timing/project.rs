use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::buckets::Bucket;
use crate::time;

const WEEK_SECONDS: i64 = 7 * 24 * 3600;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum OccurrenceMode {
    /// Only the next slot per bucket.
    #[default]
    First,
    /// Repeat weekly within the horizon.
    Expand,
}

/// Governs how many future instants a single bucket yields.
#[derive(Debug, Clone)]
pub struct ProjectionConfig {
    pub horizon_days: u32,
    pub occurrence_mode: OccurrenceMode,
    pub max_occurrences_per_bucket: u32,
    pub time_zone: Tz,
}

impl ProjectionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.horizon_days == 0 {
            return Err("horizon_days must be positive, got 0".to_string());
        }
        if self.max_occurrences_per_bucket == 0 {
            return Err("max_occurrences must be positive, got 0".to_string());
        }
        Ok(())
    }
}

/// Expand a bucket into zero or more future UTC instants per the config.
/// A bucket whose weekday never appears within the horizon yields an empty
/// list; it never fails the batch.
pub fn project(bucket: &Bucket, config: &ProjectionConfig, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let Some(first) = time::next_occurrence_within_horizon(
        bucket.weekday,
        bucket.hour,
        config.horizon_days,
        config.time_zone,
        now,
    ) else {
        return Vec::new();
    };

    match config.occurrence_mode {
        OccurrenceMode::First => vec![first],
        OccurrenceMode::Expand => {
            // Fixed seven-day steps, not zone-aware calendar weeks: in
            // DST-observing zones later occurrences drift by the offset
            // change. The horizon boundary is computed once up front.
            let horizon_end = now + Duration::days(i64::from(config.horizon_days));
            let mut out = vec![first];
            let mut cursor = first;
            while out.len() < config.max_occurrences_per_bucket as usize {
                cursor += Duration::seconds(WEEK_SECONDS);
                if cursor > horizon_end {
                    break;
                }
                out.push(cursor);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bucket(weekday: u32, hour: u32) -> Bucket {
        Bucket {
            rank: 1,
            weekday,
            hour,
            score: 1.0,
            share: 1.0,
        }
    }

    fn config(horizon_days: u32, mode: OccurrenceMode, max: u32, tz: Tz) -> ProjectionConfig {
        ProjectionConfig {
            horizon_days,
            occurrence_mode: mode,
            max_occurrences_per_bucket: max,
            time_zone: tz,
        }
    }

    fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
            .single()
            .expect("utc instant")
    }

    #[test]
    fn validate_rejects_non_positive_fields() {
        let err = config(0, OccurrenceMode::First, 9, chrono_tz::UTC)
            .validate()
            .unwrap_err();
        assert!(err.contains("horizon_days"));

        let err = config(14, OccurrenceMode::Expand, 0, chrono_tz::UTC)
            .validate()
            .unwrap_err();
        assert!(err.contains("max_occurrences"));
    }

    #[test]
    fn first_mode_yields_single_instant() {
        // Wednesday; Saturday 10:00 Berlin three days out.
        let now = utc(2026, 3, 18, 0);
        let out = project(
            &bucket(6, 10),
            &config(14, OccurrenceMode::First, 9, chrono_tz::Europe::Berlin),
            now,
        );
        assert_eq!(out, vec![utc(2026, 3, 21, 9)]);
    }

    #[test]
    fn missing_weekday_inside_short_horizon_yields_empty() {
        // Wednesday with a two-day horizon never reaches Saturday.
        let now = utc(2026, 3, 18, 0);
        let out = project(
            &bucket(6, 10),
            &config(2, OccurrenceMode::First, 9, chrono_tz::Europe::Berlin),
            now,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn expand_caps_at_max_occurrences() {
        let now = utc(2026, 3, 18, 0);
        let out = project(
            &bucket(6, 10),
            &config(21, OccurrenceMode::Expand, 2, chrono_tz::Europe::Berlin),
            now,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[1] - out[0], Duration::days(7));
    }

    #[test]
    fn expand_stops_at_horizon_boundary() {
        // Horizon admits the first two weekly repeats but not the third.
        let now = utc(2026, 3, 18, 0);
        let out = project(
            &bucket(6, 10),
            &config(14, OccurrenceMode::Expand, 9, chrono_tz::Europe::Berlin),
            now,
        );
        assert_eq!(out.len(), 2);
        let horizon_end = now + Duration::days(14);
        assert!(out.iter().all(|instant| *instant <= horizon_end));
    }

    #[test]
    fn expand_drifts_one_hour_across_dst_start() {
        // Berlin switches to CEST on 2026-03-29. Fixed 7-day steps keep the
        // UTC spacing and let the local wall-clock hour drift.
        let tz = chrono_tz::Europe::Berlin;
        let now = utc(2026, 3, 18, 0);
        let out = project(&bucket(6, 10), &config(21, OccurrenceMode::Expand, 3, tz), now);

        assert_eq!(out.len(), 3);
        assert_eq!(crate::time::wall_clock_in_zone(out[0], tz).hour, 10);
        assert_eq!(crate::time::wall_clock_in_zone(out[1], tz).hour, 10);
        assert_eq!(crate::time::wall_clock_in_zone(out[2], tz).hour, 11);
        assert_eq!(out[2] - out[0], Duration::days(14));
    }
}
