//! In-memory quality metrics
//!
//! Small, pure calculations over columns that are already loaded: the same
//! measures the warehouse checks compute in SQL, usable on local CSV
//! fixtures without a warehouse session.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Share of present values (0.0 for an empty column)
pub fn completeness<T>(values: &[Option<T>]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let present = values.iter().filter(|v| v.is_some()).count();
    present as f64 / values.len() as f64
}

/// Share of missing values (0.0 for an empty column)
pub fn null_fraction<T>(values: &[Option<T>]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let missing = values.iter().filter(|v| v.is_none()).count();
    missing as f64 / values.len() as f64
}

/// Indices of every row whose key occurs more than once
///
/// All members of a duplicated group are flagged, the first occurrence
/// included.
pub fn duplicate_rows<K: Eq + Hash>(keys: &[K]) -> Vec<usize> {
    let mut counts: HashMap<&K, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }

    keys.iter()
        .enumerate()
        .filter(|(_, key)| counts.get(key).copied().unwrap_or(0) > 1)
        .map(|(idx, _)| idx)
        .collect()
}

/// Number of rows that repeat an earlier key
///
/// This is `rows - distinct keys`, i.e. how many rows a deduplication
/// would drop.
pub fn surplus_duplicates<K: Eq + Hash>(keys: &[K]) -> usize {
    let distinct: std::collections::HashSet<&K> = keys.iter().collect();
    keys.len() - distinct.len()
}

/// Count values strictly outside `[min, max]`
pub fn out_of_range(values: &[f64], min: f64, max: f64) -> usize {
    values.iter().filter(|v| **v < min || **v > max).count()
}

/// Count timestamps older than `max_age` relative to `now`
pub fn stale_records(timestamps: &[DateTime<Utc>], now: DateTime<Utc>, max_age: Duration) -> usize {
    timestamps.iter().filter(|ts| now - **ts > max_age).count()
}

/// `1 - invalid / total`; a table with no rows scores 1.0
pub fn quality_score(total: usize, invalid: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    1.0 - (invalid as f64 / total as f64)
}

/// Purchases per session (0.0 without sessions)
pub fn conversion_rate(purchases: usize, sessions: usize) -> f64 {
    if sessions == 0 {
        return 0.0;
    }
    purchases as f64 / sessions as f64
}

/// Whole days between the last order and `now` (the R in RFM)
pub fn recency_days(last_order: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last_order).num_days()
}

/// Whole days between first and last order
pub fn lifetime_days(first_order: DateTime<Utc>, last_order: DateTime<Utc>) -> i64 {
    (last_order - first_order).num_days()
}

/// Lower-case and trim an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Count/sum/mean of a numeric column per key
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aggregate {
    pub count: usize,
    pub sum: f64,
}

impl Aggregate {
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Group `(key, amount)` pairs and aggregate the amounts
pub fn aggregate_by_key<K, I>(pairs: I) -> BTreeMap<K, Aggregate>
where
    K: Ord,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut groups: BTreeMap<K, Aggregate> = BTreeMap::new();
    for (key, amount) in pairs {
        let agg = groups.entry(key).or_default();
        agg.count += 1;
        agg.sum += amount;
    }
    groups
}
