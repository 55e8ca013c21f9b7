//! Scripted answers for the three staging checks

use shopqa_core::{Row, SqlValue};
use shopqa_warehouse::{MockConnector, MockConnectorBuilder};

pub fn customers(total: i64, with_email: i64) -> Row {
    let completeness = if total == 0 { 0.0 } else { with_email as f64 / total as f64 };
    Row::from_pairs([
        ("TOTAL_ROWS", SqlValue::Int(total)),
        ("NON_NULL_CUSTOMER_ID", SqlValue::Int(total)),
        ("NON_NULL_EMAIL", SqlValue::Int(with_email)),
        ("EMAIL_COMPLETENESS", SqlValue::Float(completeness)),
    ])
}

pub fn orders(total: i64, negative: i64, invalid_status: i64) -> Row {
    Row::from_pairs([
        ("TOTAL_ORDERS", SqlValue::Int(total)),
        ("NEGATIVE_AMOUNTS", SqlValue::Int(negative)),
        ("INVALID_STATUSES", SqlValue::Int(invalid_status)),
    ])
}

pub fn events(total: i64, invalid_types: i64, unique_customers: i64) -> Row {
    Row::from_pairs([
        ("TOTAL_EVENTS", SqlValue::Int(total)),
        ("INVALID_EVENT_TYPES", SqlValue::Int(invalid_types)),
        ("UNIQUE_CUSTOMERS", SqlValue::Int(unique_customers)),
    ])
}

/// Warehouse whose staging layer answers with the given rows
pub fn warehouse(customers: Row, orders: Row, events: Row) -> MockConnector {
    MockConnectorBuilder::new()
        .with_response("FROM staging.stg_customers", customers)
        .with_response("FROM staging.stg_orders", orders)
        .with_response("FROM staging.stg_events", events)
        .build()
}
