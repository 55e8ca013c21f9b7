//! Test fixtures for warehouse session tests
//!
//! Rows shaped like the answers of the staging-layer quality queries.

use shopqa_core::{Row, SqlValue};

/// Answer of the customer completeness query
pub fn customer_completeness_row(total: i64, with_email: i64) -> Row {
    Row::from_pairs([
        ("TOTAL_ROWS", SqlValue::Int(total)),
        ("NON_NULL_CUSTOMER_ID", SqlValue::Int(total)),
        ("NON_NULL_EMAIL", SqlValue::Int(with_email)),
        ("EMAIL_COMPLETENESS", SqlValue::Float(with_email as f64 / total as f64)),
    ])
}

/// Answer of the order validity query
pub fn order_validity_row(total: i64, negative: i64, invalid_status: i64) -> Row {
    Row::from_pairs([
        ("TOTAL_ORDERS", SqlValue::Int(total)),
        ("NEGATIVE_AMOUNTS", SqlValue::Int(negative)),
        ("INVALID_STATUSES", SqlValue::Int(invalid_status)),
    ])
}

/// A small slice of raw customer rows, one with a missing email
pub fn customer_rows() -> (Vec<String>, Vec<Vec<Option<String>>>) {
    let columns = ["customer_id", "email", "country"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let rows = vec![
        vec![Some("CUST000001".into()), Some("ava.smith@example.com".into()), Some("US".into())],
        vec![Some("CUST000002".into()), None, Some("DE".into())],
        vec![Some("CUST000003".into()), Some("o'neil@example.com".into()), Some("FR".into())],
    ];
    (columns, rows)
}
