//! Results of the aggregate quality checks
//!
//! One [`QualityCheckResult`] is produced per pipeline run by the quality
//! gate and handed, by value, to the alert decision and the run report.

use serde::{Deserialize, Serialize};

/// `customers_completeness` check over `staging.stg_customers`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomerCompleteness {
    pub total_rows: i64,
    pub non_null_customer_id: i64,
    pub non_null_email: i64,

    /// `non_null_email / total_rows`, 0 for an empty table
    pub email_completeness: f64,
}

/// `orders_validity` check over `staging.stg_orders`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderValidity {
    pub total_orders: i64,

    /// Rows with `total_amount < 0`
    pub negative_amounts: i64,

    /// Rows with `invalid_status_flag = 1`
    pub invalid_statuses: i64,
}

/// `events_quality` check over `staging.stg_events`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EventQuality {
    pub total_events: i64,

    /// Rows with `invalid_event_type_flag = 1`
    pub invalid_event_types: i64,

    pub unique_customers: i64,
}

/// All check results of one run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QualityCheckResult {
    pub customers_completeness: CustomerCompleteness,
    pub orders_validity: OrderValidity,
    pub events_quality: EventQuality,
}

impl QualityCheckResult {
    /// Names of the checks, in execution order
    pub const CHECK_NAMES: [&'static str; 3] =
        ["customers_completeness", "orders_validity", "events_quality"];
}
