use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One aggregation unit from an hour-by-weekday GA4 report.
/// `weekday` follows GA4's dayOfWeek numbering: 0..=6, Sunday first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRow {
    pub hour: u32,
    pub weekday: u32,
    pub value: f64,
}

/// An aggregated, ranked (weekday, hour) slot. `share` is this bucket's
/// score relative to the total across ALL buckets, not just the retained
/// top-K ones.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct Bucket {
    pub rank: usize,
    pub weekday: u32,
    pub hour: u32,
    pub score: f64,
    pub share: f64,
}

/// Group rows by (weekday, hour), summing values per key, and return the
/// `top_k` highest-scoring slots ranked 1-based. Rows with the same key
/// accumulate additively: paginated or filtered sub-queries may
/// legitimately repeat a weekday/hour pair.
pub fn aggregate(rows: &[MetricRow], top_k: usize) -> Vec<Bucket> {
    let mut grouped: BTreeMap<(u32, u32), f64> = BTreeMap::new();
    for row in rows {
        *grouped.entry((row.weekday, row.hour)).or_insert(0.0) += row.value;
    }

    let total: f64 = grouped.values().sum();

    let mut ordered: Vec<((u32, u32), f64)> = grouped.into_iter().collect();
    // Descending score; equal scores fall back to ascending weekday then
    // hour so the ordering is reproducible.
    ordered.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    ordered
        .into_iter()
        .take(top_k)
        .enumerate()
        .map(|(idx, ((weekday, hour), score))| Bucket {
            rank: idx + 1,
            weekday,
            hour,
            score,
            share: if total > 0.0 { score / total } else { 0.0 },
        })
        .collect()
}
