//! Aggregate checks over `staging.stg_*`
//!
//! Each check is a single-row aggregate. Empty tables yield zero counts and
//! zero completeness rather than NULL or a division error.

use crate::QualityError;
use shopqa_core::{CustomerCompleteness, EventQuality, OrderValidity, QualityCheckResult, Row};
use shopqa_warehouse::Session;

pub const CUSTOMERS_COMPLETENESS_SQL: &str = "\
SELECT
    COUNT(*) AS total_rows,
    COUNT(customer_id) AS non_null_customer_id,
    COUNT(email) AS non_null_email,
    COALESCE(COUNT(email)::FLOAT / NULLIF(COUNT(*), 0), 0) AS email_completeness
FROM staging.stg_customers";

pub const ORDERS_VALIDITY_SQL: &str = "\
SELECT
    COUNT(*) AS total_orders,
    COALESCE(SUM(CASE WHEN total_amount < 0 THEN 1 ELSE 0 END), 0) AS negative_amounts,
    COALESCE(SUM(CASE WHEN invalid_status_flag = 1 THEN 1 ELSE 0 END), 0) AS invalid_statuses
FROM staging.stg_orders";

pub const EVENTS_QUALITY_SQL: &str = "\
SELECT
    COUNT(*) AS total_events,
    COALESCE(SUM(CASE WHEN invalid_event_type_flag = 1 THEN 1 ELSE 0 END), 0) AS invalid_event_types,
    COUNT(DISTINCT customer_id) AS unique_customers
FROM staging.stg_events";

/// Run the three checks on one session, in order
pub async fn run_checks(session: &mut dyn Session) -> Result<QualityCheckResult, QualityError> {
    let customers = query(session, "customers_completeness", CUSTOMERS_COMPLETENESS_SQL).await?;
    let customers_completeness = CustomerCompleteness {
        total_rows: int(&customers, "customers_completeness", "total_rows")?,
        non_null_customer_id: int(&customers, "customers_completeness", "non_null_customer_id")?,
        non_null_email: int(&customers, "customers_completeness", "non_null_email")?,
        email_completeness: float(&customers, "customers_completeness", "email_completeness")?,
    };

    let orders = query(session, "orders_validity", ORDERS_VALIDITY_SQL).await?;
    let orders_validity = OrderValidity {
        total_orders: int(&orders, "orders_validity", "total_orders")?,
        negative_amounts: int(&orders, "orders_validity", "negative_amounts")?,
        invalid_statuses: int(&orders, "orders_validity", "invalid_statuses")?,
    };

    let events = query(session, "events_quality", EVENTS_QUALITY_SQL).await?;
    let events_quality = EventQuality {
        total_events: int(&events, "events_quality", "total_events")?,
        invalid_event_types: int(&events, "events_quality", "invalid_event_types")?,
        unique_customers: int(&events, "events_quality", "unique_customers")?,
    };

    Ok(QualityCheckResult {
        customers_completeness,
        orders_validity,
        events_quality,
    })
}

async fn query(session: &mut dyn Session, check: &'static str, sql: &str) -> Result<Row, QualityError> {
    let row = session
        .query_first(sql)
        .await?
        .ok_or(QualityError::MissingResult(check))?;
    tracing::info!(check, result = ?row.values, "quality check finished");
    Ok(row)
}

/// Integer column; NULL counts as 0
fn int(row: &Row, check: &'static str, column: &'static str) -> Result<i64, QualityError> {
    let value = row
        .get(column)
        .ok_or(QualityError::MissingColumn { check, column })?;
    Ok(value.as_i64().unwrap_or(0))
}

/// Ratio column; NULL counts as 0
fn float(row: &Row, check: &'static str, column: &'static str) -> Result<f64, QualityError> {
    let value = row
        .get(column)
        .ok_or(QualityError::MissingColumn { check, column })?;
    Ok(value.as_f64().unwrap_or(0.0))
}
