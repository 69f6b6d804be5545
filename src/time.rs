use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Weekday abbreviations for display labels, Sunday-first to match the
/// GA4 dayOfWeek convention. Labels follow German conventions, like the
/// de-DE rendering the recommendation payload always used.
const WEEKDAY_ABBREV: [&str; 7] = ["So", "Mo", "Di", "Mi", "Do", "Fr", "Sa"];

/// Local wall-clock fields as observed in a named time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WallClock {
    pub(crate) year: i32,
    pub(crate) month: u32,
    pub(crate) day: u32,
    pub(crate) hour: u32,
    pub(crate) minute: u32,
    pub(crate) second: u32,
}

/// Weekday of a UTC instant as observed in `tz`, mapped onto GA4's
/// 0..=6 Sunday-first numbering. Uses real IANA rules, not a fixed offset.
pub(crate) fn weekday_in_zone(instant: DateTime<Utc>, tz: Tz) -> u32 {
    instant.with_timezone(&tz).weekday().num_days_from_sunday()
}

/// Decompose a UTC instant into the calendar/clock fields it renders as
/// in `tz`.
pub(crate) fn wall_clock_in_zone(instant: DateTime<Utc>, tz: Tz) -> WallClock {
    let local = instant.with_timezone(&tz);
    WallClock {
        year: local.year(),
        month: local.month(),
        day: local.day(),
        hour: local.hour(),
        minute: local.minute(),
        second: local.second(),
    }
}

/// Resolve desired local wall-clock fields in `tz` to the UTC instant that
/// renders as exactly those fields.
///
/// Works by guessing the fields as if they were UTC, rendering the guess
/// back into the zone, and adding the correction delta onto the guess. A
/// single correction is exact unless the requested wall time falls inside a
/// DST gap or overlap, in which case the result is shifted by the
/// transition's offset delta; there is no transition-table lookahead.
pub(crate) fn zoned_wall_time_to_utc(wall: WallClock, tz: Tz) -> Result<DateTime<Utc>, String> {
    let desired = NaiveDate::from_ymd_opt(wall.year, wall.month, wall.day)
        .and_then(|date| date.and_hms_opt(wall.hour, wall.minute, wall.second))
        .ok_or_else(|| format!("invalid wall-clock fields {wall:?}"))?;
    let guess = Utc.from_utc_datetime(&desired);
    let rendered = guess.with_timezone(&tz).naive_local();
    Ok(guess + (desired - rendered))
}

/// Scan forward day by day, starting tomorrow, for the next instant whose
/// weekday in `tz` matches `weekday`, pinned to `hour`:00:00 local time.
/// Returns `None` when no match exists within the horizon, which can only
/// happen for horizons shorter than a week.
pub(crate) fn next_occurrence_within_horizon(
    weekday: u32,
    hour: u32,
    horizon_days: u32,
    tz: Tz,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    for offset in 1..=i64::from(horizon_days) {
        let candidate = now + Duration::days(offset);
        if weekday_in_zone(candidate, tz) != weekday {
            continue;
        }
        let mut wall = wall_clock_in_zone(candidate, tz);
        wall.hour = hour;
        wall.minute = 0;
        wall.second = 0;
        return zoned_wall_time_to_utc(wall, tz).ok();
    }
    None
}

/// Short display label for an instant as seen in `tz`,
/// e.g. `"Mo., 05.01., 10:00"`.
pub(crate) fn human_label(instant: DateTime<Utc>, tz: Tz) -> String {
    let local = instant.with_timezone(&tz);
    let weekday = WEEKDAY_ABBREV[local.weekday().num_days_from_sunday() as usize];
    format!(
        "{weekday}., {:02}.{:02}., {:02}:{:02}",
        local.day(),
        local.month(),
        local.hour(),
        local.minute()
    )
}
