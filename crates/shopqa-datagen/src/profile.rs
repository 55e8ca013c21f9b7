//! Local profiling of generated CSVs
//!
//! Reads the three files back and measures the injected defects with the
//! in-memory metrics from `shopqa_core::metrics`, without a warehouse.

use crate::generator::GenerateError;
use crate::records::{Customer, Event, Order};
use crate::vocab;
use crate::{CUSTOMERS_FILE, EVENTS_FILE, ORDERS_FILE};
use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shopqa_core::metrics;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Measurements for one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableProfile {
    pub table: String,
    pub rows: usize,

    /// Rows a deduplication on the primary key would drop
    pub duplicate_rows: usize,

    /// Null fraction per nullable column
    pub null_fractions: BTreeMap<String, f64>,

    /// Rows whose category is outside the valid vocabulary
    pub invalid_values: usize,

    /// `1 - invalid_values / rows`
    pub quality_score: f64,
}

/// Measurements across the three generated files
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub customers: TableProfile,
    pub orders: TableProfile,
    pub events: TableProfile,

    /// Present emails that collide after normalization
    pub duplicate_emails: usize,

    /// Order amounts outside `[0, 500]`
    pub out_of_range_amounts: usize,

    /// Events older than 30 days at profiling time
    pub stale_events: usize,

    /// Purchases per distinct session
    pub conversion_rate: f64,

    /// Mean order amount per payment method
    pub avg_order_value: BTreeMap<String, f64>,
}

impl DatasetProfile {
    pub fn tables(&self) -> [&TableProfile; 3] {
        [&self.customers, &self.orders, &self.events]
    }
}

/// Profile `customers.csv`, `orders.csv` and `events.csv` in `dir`
///
/// Staleness is measured against the newest `_loaded_at` in the files,
/// which is the generator's reference time.
pub fn profile_dir(dir: &Path) -> Result<DatasetProfile, GenerateError> {
    let customers: Vec<Customer> = read_csv(&dir.join(CUSTOMERS_FILE))?;
    let orders: Vec<Order> = read_csv(&dir.join(ORDERS_FILE))?;
    let events: Vec<Event> = read_csv(&dir.join(EVENTS_FILE))?;

    let now = customers
        .iter()
        .map(|c| c.loaded_at)
        .chain(orders.iter().map(|o| o.loaded_at))
        .chain(events.iter().map(|e| e.loaded_at))
        .max()
        .unwrap_or_else(|| Utc::now().naive_utc());

    Ok(profile(&customers, &orders, &events, now))
}

/// Profile already-loaded records
pub fn profile(customers: &[Customer], orders: &[Order], events: &[Event], now: NaiveDateTime) -> DatasetProfile {
    let customer_profile = table_profile(
        CUSTOMERS_FILE,
        &customers.iter().map(|c| c.customer_id.as_str()).collect::<Vec<_>>(),
        vec![
            ("email", null_fraction(customers, |c| c.email.is_some())),
            ("first_name", null_fraction(customers, |c| c.first_name.is_some())),
            ("last_name", null_fraction(customers, |c| c.last_name.is_some())),
            ("date_of_birth", null_fraction(customers, |c| c.date_of_birth.is_some())),
        ],
        customers
            .iter()
            .filter(|c| !vocab::CUSTOMER_SEGMENTS.contains(&c.customer_segment.as_str()))
            .count(),
    );

    let order_profile = table_profile(
        ORDERS_FILE,
        &orders.iter().map(|o| o.order_id.as_str()).collect::<Vec<_>>(),
        vec![
            ("customer_id", null_fraction(orders, |o| o.customer_id.is_some())),
            ("total_amount", null_fraction(orders, |o| o.total_amount.is_some())),
        ],
        orders
            .iter()
            .filter(|o| !vocab::ORDER_STATUSES.contains(&o.order_status.as_str()))
            .count(),
    );

    let event_profile = table_profile(
        EVENTS_FILE,
        &events.iter().map(|e| e.event_id.as_str()).collect::<Vec<_>>(),
        vec![
            ("customer_id", null_fraction(events, |e| e.customer_id.is_some())),
            ("product_id", null_fraction(events, |e| e.product_id.is_some())),
        ],
        events
            .iter()
            .filter(|e| !vocab::EVENT_TYPES.contains(&e.event_type.as_str()))
            .count(),
    );

    let emails: Vec<String> = customers
        .iter()
        .filter_map(|c| c.email.as_deref())
        .map(metrics::normalize_email)
        .collect();

    let amounts: Vec<f64> = orders.iter().filter_map(|o| o.total_amount).collect();

    let now_utc = Utc.from_utc_datetime(&now);
    let event_times: Vec<_> = events
        .iter()
        .map(|e| Utc.from_utc_datetime(&e.event_timestamp))
        .collect();

    let sessions: HashSet<&str> = events.iter().map(|e| e.session_id.as_str()).collect();
    let purchases = events.iter().filter(|e| e.event_type == "PURCHASE").count();

    let avg_order_value = metrics::aggregate_by_key(
        orders
            .iter()
            .filter_map(|o| o.total_amount.map(|a| (o.payment_method.clone(), a))),
    )
    .into_iter()
    .map(|(method, agg)| (method, agg.mean()))
    .collect();

    DatasetProfile {
        customers: customer_profile,
        orders: order_profile,
        events: event_profile,
        duplicate_emails: metrics::surplus_duplicates(&emails),
        out_of_range_amounts: metrics::out_of_range(&amounts, 0.0, 500.0),
        stale_events: metrics::stale_records(&event_times, now_utc, Duration::days(30)),
        conversion_rate: metrics::conversion_rate(purchases, sessions.len()),
        avg_order_value,
    }
}

fn table_profile(
    table: &str,
    keys: &[&str],
    null_fractions: Vec<(&str, f64)>,
    invalid_values: usize,
) -> TableProfile {
    TableProfile {
        table: table.to_string(),
        rows: keys.len(),
        duplicate_rows: metrics::surplus_duplicates(keys),
        null_fractions: null_fractions
            .into_iter()
            .map(|(column, fraction)| (column.to_string(), fraction))
            .collect(),
        invalid_values,
        quality_score: metrics::quality_score(keys.len(), invalid_values),
    }
}

fn null_fraction<T>(rows: &[T], present: impl Fn(&T) -> bool) -> f64 {
    let column: Vec<Option<()>> = rows.iter().map(|r| present(r).then_some(())).collect();
    metrics::null_fraction(&column)
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, GenerateError> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, _>>()?;
    Ok(rows)
}
