//! Checks, gate and alert against a scripted warehouse

mod fixtures;

use pretty_assertions::assert_eq;
use shopqa_core::{IssueCode, Severity, Thresholds};
use shopqa_quality::{alert_on_issues, run_checks, write_quality_report, CollectingSink};
use shopqa_warehouse::{Connector, Dialect};

#[tokio::test]
async fn negative_amounts_raise_one_error() {
    let connector = fixtures::warehouse(
        fixtures::customers(1000, 1000),
        fixtures::orders(4000, 3, 0),
        fixtures::events(8000, 0, 900),
    );
    let mut session = connector.connect().await.unwrap();

    let result = run_checks(session.as_mut()).await.unwrap();
    let sink = CollectingSink::new();
    let issues = alert_on_issues(&result, &Thresholds::default(), &sink).await.unwrap();

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].code, IssueCode::NegativeOrderAmounts);
    assert_eq!(issues[0].severity, Severity::Error);
    assert_eq!(issues[0].message, "Found 3 orders with negative amounts");
    assert_eq!(sink.deliveries().await.len(), 1);
}

#[tokio::test]
async fn every_breach_is_reported_in_check_order() {
    let connector = fixtures::warehouse(
        fixtures::customers(1000, 942),
        fixtures::orders(4000, 12, 40),
        fixtures::events(8000, 80, 900),
    );
    let mut session = connector.connect().await.unwrap();

    let result = run_checks(session.as_mut()).await.unwrap();
    let sink = CollectingSink::new();
    let issues = alert_on_issues(&result, &Thresholds::default(), &sink).await.unwrap();

    let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
    assert_eq!(
        codes,
        vec![
            IssueCode::EmailCompletenessBelowThreshold,
            IssueCode::NegativeOrderAmounts,
            IssueCode::InvalidOrderStatus,
            IssueCode::InvalidEventType,
        ]
    );
    assert_eq!(issues[0].message, "Customer email completeness: 94.20%");
}

#[tokio::test]
async fn empty_staging_fails_completeness_only() {
    let connector = fixtures::warehouse(
        fixtures::customers(0, 0),
        fixtures::orders(0, 0, 0),
        fixtures::events(0, 0, 0),
    );
    let mut session = connector.connect().await.unwrap();

    let result = run_checks(session.as_mut()).await.unwrap();
    assert_eq!(result.customers_completeness.email_completeness, 0.0);

    let sink = CollectingSink::new();
    let issues = alert_on_issues(&result, &Thresholds::default(), &sink).await.unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].code, IssueCode::EmailCompletenessBelowThreshold);
}

#[tokio::test]
async fn relaxed_thresholds_pass() {
    let connector = fixtures::warehouse(
        fixtures::customers(100, 90),
        fixtures::orders(400, 2, 1),
        fixtures::events(800, 4, 90),
    );
    let mut session = connector.connect().await.unwrap();
    let result = run_checks(session.as_mut()).await.unwrap();

    let thresholds = Thresholds {
        min_email_completeness: 0.9,
        max_negative_amounts: 2,
        max_invalid_statuses: 1,
        max_invalid_event_types: 4,
    };
    let sink = CollectingSink::new();
    let issues = alert_on_issues(&result, &thresholds, &sink).await.unwrap();
    assert!(issues.is_empty());
}

#[tokio::test]
async fn report_row_uses_the_session_dialect_quoting() {
    let connector = shopqa_warehouse::MockConnector::builder()
        .with_dialect(Dialect::Postgres)
        .build();
    let mut session = connector.connect().await.unwrap();

    write_quality_report(session.as_mut(), connector.dialect(), "DAILY_PIPELINE")
        .await
        .unwrap();
    write_quality_report(session.as_mut(), connector.dialect(), "DAILY_PIPELINE")
        .await
        .unwrap();

    assert_eq!(connector.statements_matching("INSERT INTO mart.data_quality_report").await.len(), 2);
}
